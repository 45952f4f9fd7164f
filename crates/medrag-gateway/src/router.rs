use std::collections::HashMap;
use std::net::IpAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::Router;
use axum::body::Body;
use axum::extract::{ConnectInfo, DefaultBodyLimit, State};
use axum::http::{Request, StatusCode};
use axum::middleware::{self, Next};
use axum::response::Response;
use axum::routing::get;
use tokio::sync::Mutex;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use super::backend::ChatBackend;
use super::handlers::{
    chat_handler, chat_page_handler, error_response, health_handler, index_handler,
};
use super::server::AppState;

const MAX_RATE_LIMIT_ENTRIES: usize = 10_000;
const RATE_WINDOW: Duration = Duration::from_secs(60);

#[derive(Clone)]
struct RateLimitState {
    limit: u32,
    counters: Arc<Mutex<HashMap<IpAddr, (u32, Instant)>>>,
}

/// Full application router. `rate_limit` is requests per minute per client IP
/// on `POST /chat` (0 disables it).
pub fn build_router(
    backend: Arc<dyn ChatBackend>,
    rate_limit: u32,
    max_body_size: usize,
) -> Router {
    let state = AppState {
        backend,
        started_at: Instant::now(),
    };
    let rate_state = RateLimitState {
        limit: rate_limit,
        counters: Arc::new(Mutex::new(HashMap::new())),
    };

    let chat = Router::new()
        .route("/chat", get(chat_page_handler).post(chat_handler))
        .layer(middleware::from_fn_with_state(
            rate_state,
            rate_limit_middleware,
        ))
        .layer(DefaultBodyLimit::max(max_body_size));

    Router::new()
        .route("/", get(index_handler))
        .route("/health", get(health_handler))
        .merge(chat)
        .with_state(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

async fn rate_limit_middleware(
    State(state): State<RateLimitState>,
    req: Request<Body>,
    next: Next,
) -> Response {
    if state.limit == 0 || req.method() != axum::http::Method::POST {
        return next.run(req).await;
    }

    let ip = req
        .extensions()
        .get::<ConnectInfo<std::net::SocketAddr>>()
        .map_or(IpAddr::V4(std::net::Ipv4Addr::UNSPECIFIED), |ci| ci.0.ip());

    let now = Instant::now();
    let mut counters = state.counters.lock().await;

    if counters.len() >= MAX_RATE_LIMIT_ENTRIES && !counters.contains_key(&ip) {
        counters.retain(|_, (_, ts)| now.duration_since(*ts) < RATE_WINDOW);
    }

    let entry = counters.entry(ip).or_insert((0, now));
    if now.duration_since(entry.1) >= RATE_WINDOW {
        *entry = (1, now);
    } else {
        entry.0 += 1;
        if entry.0 > state.limit {
            tracing::warn!(%ip, "chat rate limit exceeded");
            return error_response(StatusCode::TOO_MANY_REQUESTS, "Too many requests");
        }
    }
    drop(counters);

    next.run(req).await
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use axum::body::Body;
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    use super::*;
    use crate::backend::{BackendError, BoxFuture};

    #[derive(Default)]
    struct EchoBackend {
        calls: AtomicUsize,
    }

    impl ChatBackend for EchoBackend {
        fn reply(
            &self,
            session_id: Option<String>,
            message: String,
        ) -> BoxFuture<'_, Result<String, BackendError>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Box::pin(async move {
                Ok(format!(
                    "{}|{message}",
                    session_id.as_deref().unwrap_or("-")
                ))
            })
        }
    }

    struct FailingBackend;

    impl ChatBackend for FailingBackend {
        fn reply(
            &self,
            _session_id: Option<String>,
            _message: String,
        ) -> BoxFuture<'_, Result<String, BackendError>> {
            Box::pin(async { Err("completion endpoint returned 502".into()) })
        }
    }

    fn make_router(rate_limit: u32) -> (Router, Arc<EchoBackend>) {
        let backend = Arc::new(EchoBackend::default());
        (
            build_router(backend.clone(), rate_limit, 1_048_576),
            backend,
        )
    }

    fn chat_request(body: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/chat")
            .header("content-type", "application/json")
            .body(Body::from(body.to_owned()))
            .unwrap()
    }

    async fn json_body(resp: Response) -> serde_json::Value {
        let body = resp.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&body).unwrap()
    }

    #[tokio::test]
    async fn health_returns_ok() {
        let (app, _) = make_router(0);
        let req = Request::builder()
            .uri("/health")
            .body(Body::empty())
            .unwrap();
        let resp = app.oneshot(req).await.unwrap();
        assert_eq!(resp.status(), 200);
        let json = json_body(resp).await;
        assert_eq!(json["status"], "ok");
        assert!(json["uptime_secs"].is_u64());
    }

    #[tokio::test]
    async fn pages_are_html() {
        for uri in ["/", "/chat"] {
            let (app, _) = make_router(0);
            let req = Request::builder().uri(uri).body(Body::empty()).unwrap();
            let resp = app.oneshot(req).await.unwrap();
            assert_eq!(resp.status(), 200, "{uri}");
            let content_type = resp.headers()["content-type"].to_str().unwrap();
            assert!(content_type.starts_with("text/html"), "{uri}");
        }
    }

    #[tokio::test]
    async fn chat_returns_reply() {
        let (app, backend) = make_router(0);
        let resp = app
            .oneshot(chat_request(
                r#"{"message":"  What is hypertension?  ","session_id":"s1"}"#,
            ))
            .await
            .unwrap();
        assert_eq!(resp.status(), 200);
        let json = json_body(resp).await;
        assert_eq!(json["reply"], "s1|What is hypertension?");
        assert!(json.get("error").is_none());
        assert_eq!(backend.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn chat_without_session_is_stateless() {
        let (app, _) = make_router(0);
        let resp = app
            .oneshot(chat_request(r#"{"message":"What is gout?"}"#))
            .await
            .unwrap();
        let json = json_body(resp).await;
        assert_eq!(json["reply"], "-|What is gout?");
    }

    #[tokio::test]
    async fn blank_session_id_counts_as_missing() {
        let (app, _) = make_router(0);
        let resp = app
            .oneshot(chat_request(r#"{"message":"hi","session_id":"  "}"#))
            .await
            .unwrap();
        let json = json_body(resp).await;
        assert_eq!(json["reply"], "-|hi");
    }

    #[tokio::test]
    async fn empty_message_is_rejected_without_calling_backend() {
        for body in [
            r#"{"message":""}"#,
            r#"{"message":"   \n\t","session_id":"s1"}"#,
            "{}",
        ] {
            let (app, backend) = make_router(0);
            let resp = app.oneshot(chat_request(body)).await.unwrap();
            assert_eq!(resp.status(), 400, "{body}");
            let json = json_body(resp).await;
            assert_eq!(json["error"], "Message cannot be empty");
            assert!(json.get("reply").is_none());
            assert_eq!(backend.calls.load(Ordering::SeqCst), 0);
        }
    }

    #[tokio::test]
    async fn malformed_body_is_rejected() {
        for body in ["not json", "[1, 2]", r#"{"message": 7}"#] {
            let (app, _) = make_router(0);
            let resp = app.oneshot(chat_request(body)).await.unwrap();
            assert_eq!(resp.status(), 400, "{body}");
            let json = json_body(resp).await;
            assert_eq!(json["error"], "Invalid request body");
        }
    }

    #[tokio::test]
    async fn backend_failure_is_opaque_500() {
        let app = build_router(Arc::new(FailingBackend), 0, 1_048_576);
        let resp = app
            .oneshot(chat_request(r#"{"message":"What is anemia?"}"#))
            .await
            .unwrap();
        assert_eq!(resp.status(), 500);
        let json = json_body(resp).await;
        assert_eq!(json["error"], "Internal server error");
        assert!(json.get("reply").is_none());
        assert!(!json.to_string().contains("502"));
    }

    #[tokio::test]
    async fn rate_limit_enforced() {
        use tower::Service;

        let (mut app, _) = make_router(2);
        let make_req = || chat_request(r#"{"message":"hello"}"#);

        let resp = app.call(make_req()).await.unwrap();
        assert_eq!(resp.status(), 200);
        let resp = app.call(make_req()).await.unwrap();
        assert_eq!(resp.status(), 200);
        let resp = app.call(make_req()).await.unwrap();
        assert_eq!(resp.status(), 429);
    }

    #[tokio::test]
    async fn rate_limit_ignores_page_loads() {
        use tower::Service;

        let (mut app, _) = make_router(1);
        for _ in 0..3 {
            let req = Request::builder().uri("/chat").body(Body::empty()).unwrap();
            let resp = app.call(req).await.unwrap();
            assert_eq!(resp.status(), 200);
        }
    }

    #[tokio::test]
    async fn body_size_limit() {
        let app = build_router(Arc::new(EchoBackend::default()), 0, 64);
        let oversized = format!(r#"{{"message":"{}"}}"#, "a".repeat(128));
        let resp = app.oneshot(chat_request(&oversized)).await.unwrap();
        assert_eq!(resp.status(), 413);
        let json = json_body(resp).await;
        assert_eq!(json["error"], "Request body too large");
        assert!(json.get("reply").is_none());
    }

    #[tokio::test]
    async fn body_size_limit_with_declared_length() {
        let app = build_router(Arc::new(EchoBackend::default()), 0, 64);
        let oversized = format!(r#"{{"message":"{}"}}"#, "a".repeat(128));
        let req = Request::builder()
            .method("POST")
            .uri("/chat")
            .header("content-type", "application/json")
            .header("content-length", oversized.len())
            .body(Body::from(oversized))
            .unwrap();
        let resp = app.oneshot(req).await.unwrap();
        assert_eq!(resp.status(), 413);
        assert_eq!(json_body(resp).await["error"], "Request body too large");
    }

    #[tokio::test]
    async fn cors_preflight_is_allowed() {
        let (app, _) = make_router(0);
        let req = Request::builder()
            .method("OPTIONS")
            .uri("/chat")
            .header("origin", "https://example.org")
            .header("access-control-request-method", "POST")
            .body(Body::empty())
            .unwrap();
        let resp = app.oneshot(req).await.unwrap();
        assert!(resp.headers().contains_key("access-control-allow-origin"));
    }
}
