//! Who may reach the HTTP server: the bind policy and the bearer token check.

use anyhow::{Context as AnyhowContext, Result};
use axum::http::{header::AUTHORIZATION, HeaderMap};
use std::fmt;
use std::net::SocketAddr;

pub(crate) const TOKEN_ENV: &str = "REQFORGE_AUTH_TOKEN";

/// Bearer secret required on every `/api/*` call when the server is started with one.
#[derive(Clone)]
pub(crate) struct ApiToken(String);

impl fmt::Debug for ApiToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ApiToken(..)")
    }
}

impl ApiToken {
    pub(crate) fn new(secret: &str) -> Result<Self> {
        let secret = secret.trim();
        anyhow::ensure!(!secret.is_empty(), "auth token must be non-empty");
        Ok(Self(secret.to_owned()))
    }

    /// `true` when `headers` carry `Authorization: Bearer <token>`. The scheme is matched
    /// case-insensitively.
    pub(crate) fn admits(&self, headers: &HeaderMap) -> bool {
        headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(bearer_credential)
            .is_some_and(|presented| same_secret(presented.as_bytes(), self.0.as_bytes()))
    }
}

fn bearer_credential(header: &str) -> Option<&str> {
    let (scheme, credential) = header.trim().split_once(' ')?;
    scheme.eq_ignore_ascii_case("bearer").then(|| credential.trim())
}

/// Compares every byte of equal-length secrets, wherever the first mismatch is.
fn same_secret(presented: &[u8], expected: &[u8]) -> bool {
    presented.len() == expected.len()
        && presented
            .iter()
            .zip(expected)
            .fold(0u8, |acc, (a, b)| acc | (a ^ b))
            == 0
}

/// Addresses the server may listen on and the token it enforces there.
#[derive(Debug)]
pub(crate) struct Exposure {
    pub addrs: Vec<SocketAddr>,
    pub token: Option<ApiToken>,
}

impl Exposure {
    /// Resolve `bind` and validate it against `public` and `token`.
    ///
    /// Non-loopback addresses need `public`; `public` needs a token.
    pub(crate) async fn check(bind: &str, public: bool, token: Option<&str>) -> Result<Self> {
        let addrs = resolve_bind(bind).await?;
        let exposed: Vec<String> = addrs
            .iter()
            .filter(|addr| !addr.ip().is_loopback())
            .map(ToString::to_string)
            .collect();
        if !exposed.is_empty() && !public {
            anyhow::bail!(
                "Refusing to bind {bind}: {} is reachable from other hosts and the relay sends arbitrary requests for its callers. Pass --public with --auth-token (or {TOKEN_ENV}) to expose it.",
                exposed.join(", ")
            )
        }

        let token = token.map(ApiToken::new).transpose()?;
        if public && token.is_none() {
            anyhow::bail!("--public requires an auth token: set --auth-token or export {TOKEN_ENV}")
        }
        Ok(Self { addrs, token })
    }
}

async fn resolve_bind(bind: &str) -> Result<Vec<SocketAddr>> {
    let addrs: Vec<SocketAddr> = tokio::net::lookup_host(bind)
        .await
        .with_context(|| format!("Failed to resolve bind address: {bind}"))?
        .collect();
    anyhow::ensure!(!addrs.is_empty(), "Bind address {bind} resolved to nothing");
    Ok(addrs)
}
