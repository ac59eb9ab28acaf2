use crate::client::parse_target_url;
use crate::error::{RelayError, Result};
use reqforge_protocol::ProxyRequest;
use serde_json::Value;
use std::fmt;
use std::str::FromStr;
use url::form_urlencoded;

/// Where in a request an injection point lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Location {
    Query,
    Body,
    Header,
    Cookie,
    Path,
}

impl FromStr for Location {
    type Err = RelayError;

    fn from_str(raw: &str) -> Result<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "query" | "url" | "param" | "parameter" | "get" => Ok(Self::Query),
            "body" | "form" | "json" | "post" => Ok(Self::Body),
            "header" | "headers" => Ok(Self::Header),
            "cookie" | "cookies" => Ok(Self::Cookie),
            "path" => Ok(Self::Path),
            _ => Err(RelayError::invalid(format!(
                "unknown injection location '{raw}' (expected query, body, header, cookie or path)"
            ))),
        }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Query => "query",
            Self::Body => "body",
            Self::Header => "header",
            Self::Cookie => "cookie",
            Self::Path => "path",
        })
    }
}

/// Return a copy of `request` with `payload` substituted for parameter `name` at `location`.
///
/// Query, body and cookie parameters that do not exist yet are appended.
pub fn inject(
    request: &ProxyRequest,
    name: &str,
    location: Location,
    payload: &str,
) -> Result<ProxyRequest> {
    let mut injected = request.clone();
    match location {
        Location::Query => {
            let mut url = parse_target_url(&request.url)?;
            let pairs = replace_pair(
                url.query_pairs()
                    .map(|(k, v)| (k.into_owned(), v.into_owned()))
                    .collect(),
                name,
                payload,
            );
            url.query_pairs_mut().clear().extend_pairs(pairs);
            injected.url = url.to_string();
        }
        Location::Body => {
            injected.body = Some(inject_body(request, name, payload)?);
            if injected.header("content-length").is_some() {
                let length = injected.body.as_deref().map_or(0, str::len);
                injected.set_header("Content-Length", length.to_string());
            }
        }
        Location::Header => injected.set_header(name, payload),
        Location::Cookie => {
            let pairs: Vec<(String, String)> = request
                .header("cookie")
                .unwrap_or_default()
                .split(';')
                .filter_map(|part| {
                    let part = part.trim();
                    if part.is_empty() {
                        return None;
                    }
                    let (k, v) = part.split_once('=').unwrap_or((part, ""));
                    Some((k.trim().to_string(), v.trim().to_string()))
                })
                .collect();
            let cookie = replace_pair(pairs, name, payload)
                .into_iter()
                .map(|(k, v)| format!("{k}={v}"))
                .collect::<Vec<_>>()
                .join("; ");
            injected.set_header("Cookie", cookie);
        }
        Location::Path => {
            let mut url = parse_target_url(&request.url)?;
            // `{` and `}` arrive percent-encoded once the URL is parsed.
            let placeholder = format!("%7B{name}%7D");
            let mut segments: Vec<String> = url.path().split('/').map(str::to_string).collect();
            let Some(index) = segments
                .iter()
                .position(|segment| segment == name || segment.eq_ignore_ascii_case(&placeholder))
            else {
                return Err(RelayError::invalid(format!(
                    "path segment '{name}' not found in {}",
                    url.path()
                )));
            };
            segments[index] = encode_path_segment(payload);
            url.set_path(&segments.join("/"));
            injected.url = url.to_string();
        }
    }
    Ok(injected)
}

fn inject_body(request: &ProxyRequest, name: &str, payload: &str) -> Result<String> {
    let body = request.body.as_deref().unwrap_or_default();
    let is_json = request
        .header("content-type")
        .is_some_and(|ct| ct.to_ascii_lowercase().contains("json"))
        || body.trim_start().starts_with('{');

    if is_json {
        let mut value: Value = if body.trim().is_empty() {
            Value::Object(Default::default())
        } else {
            serde_json::from_str(body)
                .map_err(|err| RelayError::invalid(format!("JSON body does not parse: {err}")))?
        };
        let Some(object) = value.as_object_mut() else {
            return Err(RelayError::invalid("JSON body is not an object"));
        };
        object.insert(name.to_string(), Value::String(payload.to_string()));
        return serde_json::to_string(&value)
            .map_err(|err| RelayError::invalid(format!("cannot serialize JSON body: {err}")));
    }

    let pairs = replace_pair(
        form_urlencoded::parse(body.as_bytes())
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect(),
        name,
        payload,
    );
    Ok(form_urlencoded::Serializer::new(String::new())
        .extend_pairs(pairs)
        .finish())
}

/// Percent-encode everything but RFC 3986 unreserved characters, so `/` and `..` stay inside
/// the segment.
fn encode_path_segment(payload: &str) -> String {
    let mut out = String::with_capacity(payload.len());
    for byte in payload.bytes() {
        if byte.is_ascii_alphanumeric() || matches!(byte, b'-' | b'.' | b'_' | b'~') {
            out.push(byte as char);
        } else {
            out.push_str(&format!("%{byte:02X}"));
        }
    }
    out
}

fn replace_pair(
    mut pairs: Vec<(String, String)>,
    name: &str,
    payload: &str,
) -> Vec<(String, String)> {
    let mut found = false;
    for (key, value) in pairs.iter_mut() {
        if key == name {
            *value = payload.to_string();
            found = true;
        }
    }
    if !found {
        pairs.push((name.to_string(), payload.to_string()));
    }
    pairs
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn request(url: &str) -> ProxyRequest {
        ProxyRequest::new("GET", url)
    }

    #[test]
    fn replaces_existing_query_parameter() {
        let injected = inject(
            &request("http://app.test/item?id=1&sort=asc"),
            "id",
            Location::Query,
            "1' OR '1'='1",
        )
        .unwrap();
        assert_eq!(
            injected.url,
            "http://app.test/item?id=1%27+OR+%271%27%3D%271&sort=asc"
        );
    }

    #[test]
    fn appends_missing_query_parameter() {
        let injected = inject(&request("http://app.test/"), "q", Location::Query, "x").unwrap();
        assert_eq!(injected.url, "http://app.test/?q=x");
    }

    #[test]
    fn injects_into_form_body_and_fixes_length() {
        let mut base = ProxyRequest::new("POST", "http://app.test/login");
        base.set_header("Content-Type", "application/x-www-form-urlencoded");
        base.set_header("Content-Length", "21");
        base.body = Some("user=admin&pass=secret".to_string());

        let injected = inject(&base, "user", Location::Body, "admin'--").unwrap();
        assert_eq!(injected.body.as_deref(), Some("user=admin%27--&pass=secret"));
        assert_eq!(injected.header("content-length"), Some("27"));
    }

    #[test]
    fn injects_into_json_body() {
        let mut base = ProxyRequest::new("POST", "http://app.test/api");
        base.set_header("Content-Type", "application/json");
        base.body = Some(r#"{"name":"bob","age":3}"#.to_string());

        let injected = inject(&base, "name", Location::Body, "<script>").unwrap();
        let body: Value = serde_json::from_str(injected.body.as_deref().unwrap()).unwrap();
        assert_eq!(body["name"], "<script>");
        assert_eq!(body["age"], 3);
    }

    #[test]
    fn injects_header_and_cookie() {
        let mut base = request("http://app.test/");
        base.set_header("Cookie", "session=abc; theme=dark");

        let injected = inject(&base, "theme", Location::Cookie, "x\"y").unwrap();
        assert_eq!(injected.header("cookie"), Some("session=abc; theme=x\"y"));

        let injected = inject(&base, "X-Forwarded-For", Location::Header, "127.0.0.1").unwrap();
        assert_eq!(injected.header("x-forwarded-for"), Some("127.0.0.1"));
    }

    #[test]
    fn injects_into_path_placeholder() {
        let injected = inject(
            &request("http://app.test/users/{id}/profile"),
            "id",
            Location::Path,
            "../admin",
        )
        .unwrap();
        assert_eq!(injected.url, "http://app.test/users/..%2Fadmin/profile");

        let err = inject(&request("http://app.test/a"), "id", Location::Path, "1").unwrap_err();
        assert_eq!(err.code(), "invalid_request");
    }

    #[test]
    fn location_parsing_accepts_aliases() {
        assert_eq!("URL".parse::<Location>().unwrap(), Location::Query);
        assert_eq!("json".parse::<Location>().unwrap(), Location::Body);
        assert!("fragment".parse::<Location>().is_err());
    }
}
