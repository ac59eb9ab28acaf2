use crate::error::{RelayError, Result};
use reqforge_protocol::{ProxyRequest, ProxyResponse};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::{redirect::Policy, Client, Method};
use std::collections::BTreeMap;
use std::time::{Duration, Instant};
use url::Url;

const ALLOWED_METHODS: [&str; 8] = [
    "GET", "POST", "PUT", "PATCH", "DELETE", "HEAD", "OPTIONS", "TRACE",
];

// Recomputed or managed by the client; forwarding them verbatim corrupts the request.
const SKIPPED_HEADERS: [&str; 4] = [
    "content-length",
    "connection",
    "transfer-encoding",
    "keep-alive",
];

#[derive(Debug, Clone)]
pub struct RelayConfig {
    pub timeout: Duration,
    pub follow_redirects: bool,
    /// Targets are usually test systems with self-signed certificates.
    pub accept_invalid_certs: bool,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            follow_redirects: false,
            accept_invalid_certs: true,
        }
    }
}

/// Sends arbitrary HTTP requests on behalf of the browser UI.
#[derive(Debug, Clone)]
pub struct Relay {
    client: Client,
    config: RelayConfig,
}

impl Relay {
    pub fn new(config: RelayConfig) -> Result<Self> {
        let redirect = if config.follow_redirects {
            Policy::limited(10)
        } else {
            Policy::none()
        };
        let client = Client::builder()
            .timeout(config.timeout)
            .redirect(redirect)
            .danger_accept_invalid_certs(config.accept_invalid_certs)
            .build()
            .map_err(|err| RelayError::RequestFailed(format!("cannot build HTTP client: {err}")))?;
        Ok(Self { client, config })
    }

    /// Send `request` and return the target's answer, whatever its status code.
    ///
    /// Only transport-level failures are errors; a 500 from the target is a normal response.
    pub async fn send(&self, request: &ProxyRequest) -> Result<ProxyResponse> {
        let method = parse_method(&request.method)?;
        let url = parse_target_url(&request.url)?;
        let headers = build_headers(request)?;
        let host = url.host_str().unwrap_or_default().to_string();

        let mut builder = self.client.request(method.clone(), url.clone()).headers(headers);
        if let Some(body) = request.body.as_ref().filter(|body| !body.is_empty()) {
            builder = builder.body(body.clone());
        }

        let started = Instant::now();
        let response = builder
            .send()
            .await
            .map_err(|err| RelayError::from_transport(&err, &host, self.config.timeout))?;

        let status = response.status();
        let headers = flatten_headers(response.headers());
        let bytes = response
            .bytes()
            .await
            .map_err(|err| RelayError::from_transport(&err, &host, self.config.timeout))?;
        let elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);

        log::info!(
            "{method} {url} -> {} in {elapsed_ms}ms ({} bytes)",
            status.as_u16(),
            bytes.len()
        );

        Ok(ProxyResponse {
            status: status.as_u16(),
            status_text: status.canonical_reason().unwrap_or_default().to_string(),
            headers,
            body: String::from_utf8_lossy(&bytes).into_owned(),
            time: elapsed_ms,
            size: bytes.len() as u64,
        })
    }
}

fn parse_method(raw: &str) -> Result<Method> {
    let upper = raw.trim().to_ascii_uppercase();
    if !ALLOWED_METHODS.contains(&upper.as_str()) {
        return Err(RelayError::invalid(format!("unsupported method '{raw}'")));
    }
    Method::from_bytes(upper.as_bytes())
        .map_err(|_| RelayError::invalid(format!("unsupported method '{raw}'")))
}

pub(crate) fn parse_target_url(raw: &str) -> Result<Url> {
    let url = Url::parse(raw.trim())
        .map_err(|err| RelayError::invalid(format!("invalid URL '{raw}': {err}")))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(RelayError::invalid(format!(
            "unsupported URL scheme '{}' (expected http or https)",
            url.scheme()
        )));
    }
    if url.host_str().map_or(true, str::is_empty) {
        return Err(RelayError::invalid(format!("URL has no host: '{raw}'")));
    }
    Ok(url)
}

fn build_headers(request: &ProxyRequest) -> Result<HeaderMap> {
    let mut headers = HeaderMap::new();
    for (name, value) in &request.headers {
        if SKIPPED_HEADERS
            .iter()
            .any(|skipped| skipped.eq_ignore_ascii_case(name.trim()))
        {
            continue;
        }
        let header_name = HeaderName::from_bytes(name.trim().as_bytes())
            .map_err(|_| RelayError::invalid(format!("invalid header name '{name}'")))?;
        let header_value = HeaderValue::from_str(value.trim())
            .map_err(|_| RelayError::invalid(format!("invalid value for header '{name}'")))?;
        headers.append(header_name, header_value);
    }
    Ok(headers)
}

fn flatten_headers(headers: &HeaderMap) -> BTreeMap<String, String> {
    let mut flat: BTreeMap<String, String> = BTreeMap::new();
    for (name, value) in headers {
        let value = String::from_utf8_lossy(value.as_bytes()).into_owned();
        flat.entry(name.as_str().to_string())
            .and_modify(|existing| {
                existing.push_str(", ");
                existing.push_str(&value);
            })
            .or_insert(value);
    }
    flat
}
