use axum::{
    http::{
        header::{CONTENT_TYPE, WWW_AUTHENTICATE},
        HeaderValue, StatusCode,
    },
    response::{IntoResponse, Response},
};
use reqforge_assistant::AssistantError;
use reqforge_normalizer::Outcome;
use reqforge_protocol::{serialize_json, AiMode, AiReply, ApiError, ErrorEnvelope};
use reqforge_relay::RelayError;
use serde::Serialize;

pub(crate) fn error_response(code: &str, message: String) -> ApiError {
    let hint = match code {
        "unauthorized" => "If the server is started with REQFORGE_AUTH_TOKEN, include Authorization: Bearer <token>. To disable auth, unset REQFORGE_AUTH_TOKEN and restart the server.",
        "invalid_request" => "Verify the request is valid JSON and matches the endpoint's body schema.",
        _ => "Check the server log for details.",
    };
    ErrorEnvelope::new(code, message).with_hint(hint).into()
}

pub(crate) fn relay_error(err: &RelayError) -> (StatusCode, ApiError) {
    let status = match err {
        RelayError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
        RelayError::Timeout { .. } => StatusCode::GATEWAY_TIMEOUT,
        _ => StatusCode::BAD_GATEWAY,
    };
    let envelope = ErrorEnvelope::new(err.code(), err.to_string()).with_hint(err.hint());
    (status, envelope.into())
}

pub(crate) fn assistant_error(err: &AssistantError) -> (StatusCode, ApiError) {
    let status = match err {
        AssistantError::EmptyPrompt | AssistantError::InvalidConfig(_) => StatusCode::BAD_REQUEST,
        AssistantError::Timeout { .. } => StatusCode::GATEWAY_TIMEOUT,
        _ => StatusCode::BAD_GATEWAY,
    };
    let mut envelope = ErrorEnvelope::new(err.code(), err.to_string()).with_hint(err.hint());
    if let AssistantError::Status { status, .. } = err {
        envelope = envelope.with_details(serde_json::json!({ "upstreamStatus": status }));
    }
    (status, envelope.into())
}

/// Run a model reply through the normalizer and wrap it for the UI.
pub(crate) fn ai_reply(raw: &str, mode: Option<AiMode>) -> AiReply<Outcome> {
    let normalized = reqforge_normalizer::normalize(raw);
    AiReply {
        success: true,
        warning: normalized.warning(),
        data: normalized.outcome,
        raw_message: raw.to_string(),
        mode,
    }
}

pub(crate) fn build_response<T: Serialize>(status: StatusCode, body: &T) -> Response {
    let Ok(json) = serialize_json(body) else {
        return StatusCode::INTERNAL_SERVER_ERROR.into_response();
    };

    let mut response = (
        status,
        [(CONTENT_TYPE, HeaderValue::from_static("application/json"))],
        json,
    )
        .into_response();
    if status == StatusCode::UNAUTHORIZED {
        response
            .headers_mut()
            .insert(WWW_AUTHENTICATE, HeaderValue::from_static("Bearer"));
    }
    response
}
