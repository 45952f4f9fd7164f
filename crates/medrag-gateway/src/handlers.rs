use axum::Json;
use axum::body::Bytes;
use axum::extract::State;
use axum::extract::rejection::BytesRejection;
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};
use serde_json::Value;

use super::server::AppState;

pub(crate) const INVALID_BODY: &str = "Invalid request body";
pub(crate) const EMPTY_MESSAGE: &str = "Message cannot be empty";
pub(crate) const INTERNAL_ERROR: &str = "Internal server error";
pub(crate) const BODY_TOO_LARGE: &str = "Request body too large";

const INDEX_HTML: &str = include_str!("../assets/index.html");
const CHAT_HTML: &str = include_str!("../assets/chat.html");

#[derive(serde::Deserialize)]
pub(crate) struct ChatRequest {
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub session_id: Option<String>,
}

#[derive(serde::Serialize)]
struct ChatReply {
    reply: String,
}

#[derive(serde::Serialize)]
struct ErrorBody {
    error: &'static str,
}

#[derive(serde::Serialize)]
struct HealthResponse {
    status: &'static str,
    uptime_secs: u64,
}

pub(crate) fn error_response(status: StatusCode, error: &'static str) -> Response {
    (status, Json(ErrorBody { error })).into_response()
}

/// Accepts only a JSON object; arrays and scalars are rejected.
fn parse_request(body: &[u8]) -> Option<ChatRequest> {
    match serde_json::from_slice::<Value>(body).ok()? {
        object @ Value::Object(_) => serde_json::from_value(object).ok(),
        _ => None,
    }
}

fn error_chain(err: &(dyn std::error::Error + 'static)) -> String {
    let mut out = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        out.push_str(": ");
        out.push_str(&cause.to_string());
        source = cause.source();
    }
    out
}

pub(crate) async fn index_handler() -> Html<&'static str> {
    Html(INDEX_HTML)
}

pub(crate) async fn chat_page_handler() -> Html<&'static str> {
    Html(CHAT_HTML)
}

/// Body read failures keep the JSON error shape; only the size limit maps to 413.
fn rejection_response(rejection: &BytesRejection) -> Response {
    if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
        tracing::warn!("chat body over size limit");
        error_response(StatusCode::PAYLOAD_TOO_LARGE, BODY_TOO_LARGE)
    } else {
        error_response(StatusCode::BAD_REQUEST, INVALID_BODY)
    }
}

pub(crate) async fn chat_handler(
    State(state): State<AppState>,
    body: Result<Bytes, BytesRejection>,
) -> Response {
    let body = match body {
        Ok(body) => body,
        Err(rejection) => return rejection_response(&rejection),
    };
    let Some(request) = parse_request(&body) else {
        return error_response(StatusCode::BAD_REQUEST, INVALID_BODY);
    };
    let message = request.message.trim();
    if message.is_empty() {
        return error_response(StatusCode::BAD_REQUEST, EMPTY_MESSAGE);
    }
    let session_id = request.session_id.filter(|id| !id.trim().is_empty());
    tracing::info!(
        input_len = message.len(),
        has_session = session_id.is_some(),
        "chat request"
    );

    match state.backend.reply(session_id, message.to_owned()).await {
        Ok(reply) => {
            tracing::debug!(reply_len = reply.len(), "chat reply");
            Json(ChatReply { reply }).into_response()
        }
        Err(e) => {
            tracing::error!(error = %error_chain(e.as_ref()), "chat backend failed");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, INTERNAL_ERROR)
        }
    }
}

pub(crate) async fn health_handler(State(state): State<AppState>) -> impl IntoResponse {
    Json(HealthResponse {
        status: "ok",
        uptime_secs: state.started_at.elapsed().as_secs(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn health_response_serializes() {
        let resp = HealthResponse {
            status: "ok",
            uptime_secs: 42,
        };
        let json = serde_json::to_string(&resp).unwrap();
        assert!(json.contains("\"status\":\"ok\""));
    }

    #[test]
    fn parse_request_reads_message_and_session() {
        let req = parse_request(br#"{"message":"What is gout?","session_id":"abc"}"#).unwrap();
        assert_eq!(req.message, "What is gout?");
        assert_eq!(req.session_id.as_deref(), Some("abc"));
    }

    #[test]
    fn parse_request_defaults_missing_fields() {
        let req = parse_request(b"{}").unwrap();
        assert!(req.message.is_empty());
        assert!(req.session_id.is_none());
    }

    #[test]
    fn parse_request_rejects_non_objects() {
        assert!(parse_request(b"not json").is_none());
        assert!(parse_request(br#"["What is gout?"]"#).is_none());
        assert!(parse_request(b"\"hello\"").is_none());
        assert!(parse_request(br#"{"message": 42}"#).is_none());
    }

    #[derive(Debug)]
    struct Wrapped(std::io::Error);

    impl std::fmt::Display for Wrapped {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            f.write_str("completion failed")
        }
    }

    impl std::error::Error for Wrapped {
        fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
            Some(&self.0)
        }
    }

    #[test]
    fn error_chain_includes_sources() {
        let err = Wrapped(std::io::Error::other("connection reset"));
        assert_eq!(error_chain(&err), "completion failed: connection reset");
    }

    #[test]
    fn pages_are_embedded() {
        assert!(INDEX_HTML.contains("<html"));
        assert!(CHAT_HTML.contains("localStorage"));
    }
}
