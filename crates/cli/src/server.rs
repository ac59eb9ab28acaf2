use crate::access::{self, ApiToken, Exposure};
use crate::config::AppConfig;
use crate::http_api;
use crate::print_stdout;
use crate::ServeArgs;
use anyhow::{Context as AnyhowContext, Result};
use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::Response,
    routing::{get, post},
    Router,
};
use reqforge_assistant::Assistant;
use reqforge_protocol::{AiRequest, NormalizeRequest, ProxyRequest, API_VERSION};
use reqforge_relay::Relay;
use serde::de::DeserializeOwned;
use std::sync::Arc;

pub(crate) struct HttpState {
    pub assistant: Assistant,
    pub relay: Relay,
    pub auth_token: Option<ApiToken>,
}

impl HttpState {
    pub(crate) fn new(config: &AppConfig, auth_token: Option<ApiToken>) -> Result<Self> {
        Ok(Self {
            assistant: Assistant::new(config.llm.clone())
                .context("Failed to build the model client")?,
            relay: Relay::new(config.proxy.relay_config())
                .context("Failed to build the relay client")?,
            auth_token,
        })
    }
}

pub(crate) fn router(state: Arc<HttpState>) -> Router {
    Router::new()
        .route("/api/proxy", post(http_proxy))
        .route("/api/ai", post(http_ai))
        .route("/api/normalize", post(http_normalize))
        .route("/health", get(http_health))
        .with_state(state)
}

pub(crate) async fn serve_http(args: ServeArgs, config: AppConfig) -> Result<()> {
    let Exposure { addrs, token } =
        Exposure::check(&args.bind, args.public, args.auth_token.as_deref()).await?;

    let state = Arc::new(HttpState::new(&config, token)?);
    let auth_enabled = state.auth_token.is_some();
    let app = router(state);

    let listener = tokio::net::TcpListener::bind(&args.bind).await?;
    let local_addr = listener.local_addr()?;
    let base_url = format!("http://{local_addr}");

    print_stdout(&format!("Serving reqforge API: {base_url}/api"))?;
    print_stdout(&format!("Health endpoint: {base_url}/health"))?;
    log::info!(
        "model endpoint {} ({}), relay timeout {}s",
        config.llm.endpoint,
        config.llm.model,
        config.proxy.timeout_secs
    );

    if auth_enabled {
        print_stdout(&format!(
            "Auth enabled: add header 'Authorization: Bearer ${}'",
            access::TOKEN_ENV
        ))?;
    }
    if args.public {
        let addrs = addrs
            .iter()
            .map(|a| a.to_string())
            .collect::<Vec<_>>()
            .join(", ");
        print_stdout(&format!(
            "Public bind enabled (--public). Resolved addresses: {addrs}"
        ))?;
    }

    print_stdout(&format!("Try: curl {base_url}/health"))?;
    print_stdout(&format!(
        "Try: curl -X POST {base_url}/api/normalize -H 'Content-Type: application/json' -d '{{\"text\": \"...\"}}'"
    ))?;
    axum::serve(listener, app).await?;
    Ok(())
}

fn reject_unauthorized(state: &HttpState, headers: &HeaderMap) -> Option<Response> {
    let token = state.auth_token.as_ref()?;
    if token.admits(headers) {
        return None;
    }
    let body = http_api::error_response(
        "unauthorized",
        "Missing or invalid Authorization header".to_string(),
    );
    Some(http_api::build_response(StatusCode::UNAUTHORIZED, &body))
}

fn parse_body<T: DeserializeOwned>(body: &[u8]) -> std::result::Result<T, Response> {
    serde_json::from_slice(body).map_err(|err| {
        let body =
            http_api::error_response("invalid_request", format!("Invalid JSON request: {err}"));
        http_api::build_response(StatusCode::BAD_REQUEST, &body)
    })
}

async fn http_proxy(
    State(state): State<Arc<HttpState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    if let Some(denied) = reject_unauthorized(&state, &headers) {
        return denied;
    }
    let request: ProxyRequest = match parse_body(&body) {
        Ok(request) => request,
        Err(response) => return response,
    };

    match state.relay.send(&request).await {
        Ok(response) => http_api::build_response(StatusCode::OK, &response),
        Err(err) => {
            log::warn!("proxy {} {} failed: {err}", request.method, request.url);
            let (status, body) = http_api::relay_error(&err);
            http_api::build_response(status, &body)
        }
    }
}

async fn http_ai(State(state): State<Arc<HttpState>>, headers: HeaderMap, body: Bytes) -> Response {
    if let Some(denied) = reject_unauthorized(&state, &headers) {
        return denied;
    }
    let request: AiRequest = match parse_body(&body) {
        Ok(request) => request,
        Err(response) => return response,
    };

    match state.assistant.ask(&request).await {
        Ok(answer) => {
            let reply = http_api::ai_reply(&answer.content, Some(answer.mode));
            if let Some(warning) = &reply.warning {
                log::debug!("normalized {} reply with warning: {warning}", answer.mode);
            }
            http_api::build_response(StatusCode::OK, &reply)
        }
        Err(err) => {
            log::warn!("model request failed: {err}");
            let (status, body) = http_api::assistant_error(&err);
            http_api::build_response(status, &body)
        }
    }
}

async fn http_normalize(
    State(state): State<Arc<HttpState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    if let Some(denied) = reject_unauthorized(&state, &headers) {
        return denied;
    }
    match parse_body::<NormalizeRequest>(&body) {
        Ok(request) => {
            http_api::build_response(StatusCode::OK, &http_api::ai_reply(&request.text, None))
        }
        Err(response) => response,
    }
}

async fn http_health(State(state): State<Arc<HttpState>>, headers: HeaderMap) -> Response {
    if let Some(denied) = reject_unauthorized(&state, &headers) {
        return denied;
    }
    let report = serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "apiVersion": API_VERSION,
        "model": state.assistant.defaults().model,
    });
    http_api::build_response(StatusCode::OK, &report)
}
