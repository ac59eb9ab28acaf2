use axum::{
    http::{HeaderMap, StatusCode},
    routing::post,
    Json, Router,
};
use pretty_assertions::assert_eq;
use reqforge_assistant::{Assistant, AssistantError, LlmConfig};
use reqforge_protocol::{AiContext, AiMode, AiRequest};
use serde_json::{json, Value};
use std::time::Duration;

/// Echoes what it received back inside the completion so tests can inspect the request.
async fn completions(headers: HeaderMap, Json(body): Json<Value>) -> Json<Value> {
    let auth = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
        .to_string();
    let content = json!({"auth": auth, "request": body}).to_string();
    Json(json!({"choices": [{"index": 0, "message": {"role": "assistant", "content": content}}]}))
}

async fn spawn_model() -> String {
    let app = Router::new()
        .route("/v1/chat/completions", post(completions))
        .route(
            "/broken",
            post(|| async { (StatusCode::UNAUTHORIZED, "invalid api key") }),
        )
        .route("/empty", post(|| async { Json(json!({"choices": []})) }))
        .route(
            "/slow",
            post(|| async {
                tokio::time::sleep(Duration::from_secs(3)).await;
                "late"
            }),
        );
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}")
}

fn config(endpoint: String) -> LlmConfig {
    LlmConfig {
        endpoint,
        api_key: Some("sk-test".to_string()),
        model: "fake-model".to_string(),
        ..LlmConfig::default()
    }
}

fn ask(prompt: &str, mode: Option<AiMode>) -> AiRequest {
    AiRequest {
        prompt: prompt.to_string(),
        mode,
        context: AiContext {
            request: Some("GET /item?id=7 HTTP/1.1".to_string()),
            response: None,
        },
        config: None,
    }
}

#[tokio::test]
async fn sends_chat_completion_request() {
    let base = spawn_model().await;
    let assistant = Assistant::new(config(format!("{base}/v1/chat/completions"))).unwrap();

    let answer = assistant
        .ask(&ask("find injection points", None))
        .await
        .unwrap();
    assert_eq!(answer.mode, AiMode::Discovery);

    let echoed: Value = serde_json::from_str(&answer.content).unwrap();
    assert_eq!(echoed["auth"], "Bearer sk-test");
    let sent = &echoed["request"];
    assert_eq!(sent["model"], "fake-model");
    assert_eq!(sent["stream"], false);
    assert_eq!(sent["max_tokens"], 2000);
    assert_eq!(sent["messages"][0]["role"], "system");
    assert_eq!(sent["messages"][1]["role"], "user");
    assert!(sent["messages"][1]["content"]
        .as_str()
        .unwrap()
        .contains("### HTTP Request\nGET /item?id=7 HTTP/1.1"));
}

#[tokio::test]
async fn key_is_optional() {
    let base = spawn_model().await;
    let assistant = Assistant::new(LlmConfig {
        api_key: None,
        ..config(format!("{base}/v1/chat/completions"))
    })
    .unwrap();
    let answer = assistant
        .ask(&ask("hello", Some(AiMode::General)))
        .await
        .unwrap();
    let echoed: Value = serde_json::from_str(&answer.content).unwrap();
    assert_eq!(echoed["auth"], "");
}

#[tokio::test]
async fn non_success_status_carries_body() {
    let base = spawn_model().await;
    let assistant = Assistant::new(config(format!("{base}/broken"))).unwrap();
    let err = assistant.ask(&ask("hello", None)).await.unwrap_err();
    match err {
        AssistantError::Status { status, ref body } => {
            assert_eq!(status, 401);
            assert_eq!(body, "invalid api key");
        }
        other => panic!("expected status error, got {other:?}"),
    }
}

#[tokio::test]
async fn empty_choices_are_malformed() {
    let base = spawn_model().await;
    let assistant = Assistant::new(config(format!("{base}/empty"))).unwrap();
    let err = assistant.ask(&ask("hello", None)).await.unwrap_err();
    assert_eq!(err.code(), "llm_bad_response");
}

#[tokio::test]
async fn unreachable_and_misconfigured_endpoints() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let assistant = Assistant::new(config(format!("http://{addr}/v1/chat/completions"))).unwrap();
    let err = assistant.ask(&ask("hello", None)).await.unwrap_err();
    assert_eq!(err.code(), "llm_unreachable", "{err:?}");

    let assistant = Assistant::new(config(String::new())).unwrap();
    let err = assistant.ask(&ask("hello", None)).await.unwrap_err();
    assert_eq!(err.code(), "llm_not_configured");
}

#[tokio::test]
async fn slow_model_times_out() {
    let base = spawn_model().await;
    let assistant = Assistant::new(LlmConfig {
        timeout_secs: 1,
        ..config(format!("{base}/slow"))
    })
    .unwrap();
    let err = assistant.ask(&ask("hello", None)).await.unwrap_err();
    assert!(matches!(err, AssistantError::Timeout { .. }), "{err:?}");
}
