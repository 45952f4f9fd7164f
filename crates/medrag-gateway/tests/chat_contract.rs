use std::sync::Arc;

use axum::body::Body;
use axum::http::Request;
use http_body_util::BodyExt;
use medrag_gateway::{BackendError, BoxFuture, ChatBackend, build_router};
use tower::ServiceExt;

/// Fails every message mentioning "outage".
struct FlakyBackend;

impl ChatBackend for FlakyBackend {
    fn reply(
        &self,
        _session_id: Option<String>,
        message: String,
    ) -> BoxFuture<'_, Result<String, BackendError>> {
        Box::pin(async move {
            if message.contains("outage") {
                Err("vector search unavailable".into())
            } else {
                Ok(format!("answer to {message}"))
            }
        })
    }
}

async fn post(app: axum::Router, body: String) -> (u16, serde_json::Value) {
    let req = Request::builder()
        .method("POST")
        .uri("/chat")
        .header("content-type", "application/json")
        .body(Body::from(body))
        .unwrap();
    let resp = app.oneshot(req).await.unwrap();
    let status = resp.status().as_u16();
    let bytes = resp.into_body().collect().await.unwrap().to_bytes();
    (status, serde_json::from_slice(&bytes).unwrap())
}

#[tokio::test]
async fn every_response_carries_exactly_one_of_reply_or_error() {
    let app = build_router(Arc::new(FlakyBackend), 0, 65_536);
    let messages = [
        "What is hypertension?",
        "",
        "   ",
        "report an outage",
        "What causes migraine?",
    ];

    let mut tasks = Vec::new();
    for (i, message) in messages.iter().enumerate() {
        let app = app.clone();
        let body = serde_json::json!({ "message": message, "session_id": format!("s{i}") });
        tasks.push(tokio::spawn(post(app, body.to_string())));
    }

    for (message, task) in messages.iter().zip(tasks) {
        let (status, json) = task.await.unwrap();
        let has_reply = json.get("reply").is_some();
        let has_error = json.get("error").is_some();
        assert!(has_reply ^ has_error, "{message:?}: {json}");
        match status {
            200 => assert!(has_reply),
            400 => assert!(message.trim().is_empty()),
            500 => assert!(message.contains("outage")),
            other => panic!("unexpected status {other}"),
        }
    }
}
