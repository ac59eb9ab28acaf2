use crate::client::parse_target_url;
use crate::error::{RelayError, Result};
use reqforge_protocol::ProxyRequest;

/// Parse raw HTTP/1.x request text, as copied from a proxy or devtools, into a [`ProxyRequest`].
///
/// Accepts CRLF or LF line endings. When the request target is origin-form (`/path?q`), the URL
/// is rebuilt from the `Host` header and `default_scheme`.
pub fn parse_raw_request(text: &str, default_scheme: &str) -> Result<ProxyRequest> {
    let text = text.trim_start_matches(&['\r', '\n'][..]);
    let (head, body) = split_head_body(text);

    let mut lines = head.lines().map(|line| line.trim_end_matches('\r'));
    let request_line = lines
        .next()
        .filter(|line| !line.trim().is_empty())
        .ok_or_else(|| RelayError::invalid("raw request is empty"))?;

    let mut parts = request_line.split_whitespace();
    let (Some(method), Some(target)) = (parts.next(), parts.next()) else {
        return Err(RelayError::invalid(format!(
            "malformed request line '{request_line}'"
        )));
    };

    let mut request = ProxyRequest::new(method.to_ascii_uppercase(), String::new());
    for (index, line) in lines.enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        let Some((name, value)) = line.split_once(':') else {
            return Err(RelayError::invalid(format!(
                "malformed header on line {}: '{line}'",
                index + 2
            )));
        };
        request.set_header(name.trim(), value.trim());
    }

    let url = if target.starts_with("http://") || target.starts_with("https://") {
        target.to_string()
    } else if target.starts_with('/') {
        let host = request
            .header("host")
            .ok_or_else(|| RelayError::invalid("origin-form request target needs a Host header"))?;
        format!("{default_scheme}://{host}{target}")
    } else {
        return Err(RelayError::invalid(format!(
            "unsupported request target '{target}'"
        )));
    };
    parse_target_url(&url)?;
    request.url = url;

    if !body.is_empty() {
        request.body = Some(body.to_string());
    }
    Ok(request)
}

/// Render a request back into raw HTTP/1.1 text.
pub fn render_raw_request(request: &ProxyRequest) -> Result<String> {
    let url = parse_target_url(&request.url)?;
    let mut target = url.path().to_string();
    if let Some(query) = url.query() {
        target.push('?');
        target.push_str(query);
    }

    let mut out = format!("{} {target} HTTP/1.1\r\n", request.method);
    if request.header("host").is_none() {
        let host = match url.port() {
            Some(port) => format!("{}:{port}", url.host_str().unwrap_or_default()),
            None => url.host_str().unwrap_or_default().to_string(),
        };
        out.push_str(&format!("Host: {host}\r\n"));
    }
    for (name, value) in &request.headers {
        out.push_str(&format!("{name}: {value}\r\n"));
    }
    out.push_str("\r\n");
    if let Some(body) = &request.body {
        out.push_str(body);
    }
    Ok(out)
}

fn split_head_body(text: &str) -> (&str, &str) {
    let crlf = text.find("\r\n\r\n").map(|at| (at, 4));
    let lf = text.find("\n\n").map(|at| (at, 2));
    let split = match (crlf, lf) {
        (Some(a), Some(b)) => Some(if a.0 <= b.0 { a } else { b }),
        (a, b) => a.or(b),
    };
    match split {
        Some((at, len)) => (&text[..at], &text[at + len..]),
        None => (text, ""),
    }
}
