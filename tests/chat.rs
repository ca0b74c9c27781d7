use std::net::TcpListener;

use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use serde_json::{json, Value};

use portal_server::chat::{ChatCompletion, OpenAiClient};

async fn completions(headers: HeaderMap, Json(body): Json<Value>) -> Response {
    let authorized = headers
        .get("authorization")
        .and_then(|value| value.to_str().ok())
        == Some("Bearer test-key");
    if !authorized {
        return (StatusCode::UNAUTHORIZED, "invalid api key").into_response();
    }

    let prompt = body["messages"][0]["content"].as_str().unwrap_or_default();
    Json(json!({
        "choices": [{
            "message": {
                "role": "assistant",
                "content": format!("{} via {}", prompt, body["model"].as_str().unwrap_or_default())
            }
        }]
    }))
    .into_response()
}

async fn serve() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    let app = Router::new().route("/v1/chat/completions", post(completions));
    let server = axum::Server::from_tcp(listener)
        .unwrap()
        .serve(app.into_make_service());
    tokio::spawn(server);
    format!("http://{}/v1/chat/completions", addr)
}

#[tokio::test]
async fn sends_prompt_and_reads_first_choice() {
    let client = OpenAiClient::new("test-key", "gpt-5").with_url(serve().await);
    let text = client.complete("When is the career fair?").await.unwrap();
    assert_eq!(text, "When is the career fair? via gpt-5");
}

#[tokio::test]
async fn upstream_error_status_is_reported() {
    let client = OpenAiClient::new("wrong-key", "gpt-5").with_url(serve().await);
    let err = client.complete("hello").await.unwrap_err();
    let message = err.to_string();
    assert!(message.contains("401"), "{}", message);
    assert!(message.contains("invalid api key"), "{}", message);
}
