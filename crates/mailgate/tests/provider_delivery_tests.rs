//! Integration tests for provider delivery over real HTTP.
//!
//! Each test starts an axum stub of a provider API on a random port and
//! drives it through `HttpTransport`, the retrying executor and the sender.

use axum::{
    extract::{Multipart, Path, State},
    http::{header::AUTHORIZATION, HeaderMap, StatusCode},
    response::IntoResponse,
    routing::post,
    Json, Router,
};
use mailgate::{
    DeliveryError, EmailMessage, EmailSender, HttpTransport, MailGunProvider, Provider,
    RetryPolicy, RetryableExecutor, SendEmail, SendGridProvider,
};
use serde_json::{json, Value};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::Mutex;

// =============================================================================
// Stub provider server
// =============================================================================

/// A request as seen by the stub.
#[derive(Debug, Clone)]
struct Recorded {
    authorization: Option<String>,
    content_type: Option<String>,
    path: String,
    fields: Vec<(String, String)>,
    json: Option<Value>,
}

/// Shared state for the stub provider.
struct StubState {
    hits: AtomicUsize,
    status: StatusCode,
    delay: Duration,
    slow_hits: usize,
    requests: Mutex<Vec<Recorded>>,
}

impl StubState {
    fn new(status: StatusCode) -> Arc<Self> {
        Self::slow_first(status, 0, Duration::ZERO)
    }

    /// Every request is answered only after `delay`.
    fn with_delay(status: StatusCode, delay: Duration) -> Arc<Self> {
        Self::slow_first(status, usize::MAX, delay)
    }

    /// The first `slow_hits` requests are answered only after `delay`.
    fn slow_first(status: StatusCode, slow_hits: usize, delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            hits: AtomicUsize::new(0),
            status,
            delay,
            slow_hits,
            requests: Mutex::new(Vec::new()),
        })
    }

    /// Count a request and return its 1-based number.
    fn hit(&self) -> usize {
        self.hits.fetch_add(1, Ordering::SeqCst) + 1
    }

    async fn stall(&self, hit: usize) {
        if hit <= self.slow_hits {
            tokio::time::sleep(self.delay).await;
        }
    }

    fn hits(&self) -> usize {
        self.hits.load(Ordering::SeqCst)
    }
}

fn header(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(ToString::to_string)
}

async fn mail_gun_messages(
    State(state): State<Arc<StubState>>,
    Path(domain): Path<String>,
    headers: HeaderMap,
    mut multipart: Multipart,
) -> impl IntoResponse {
    let hit = state.hit();

    let mut fields = vec![];
    while let Some(field) = multipart.next_field().await.unwrap() {
        let name = field.name().unwrap().to_string();
        let value = field.text().await.unwrap();
        fields.push((name, value));
    }

    state.requests.lock().await.push(Recorded {
        authorization: header(&headers, AUTHORIZATION.as_str()),
        content_type: header(&headers, "content-type"),
        path: format!("/v3/{domain}/messages"),
        fields,
        json: None,
    });
    state.stall(hit).await;

    (state.status, Json(json!({ "id": "<20240101.mailgun>" })))
}

async fn send_grid_mail_send(
    State(state): State<Arc<StubState>>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> impl IntoResponse {
    let hit = state.hit();

    state.requests.lock().await.push(Recorded {
        authorization: header(&headers, AUTHORIZATION.as_str()),
        content_type: header(&headers, "content-type"),
        path: "/v3/mail/send".to_string(),
        fields: vec![],
        json: Some(body),
    });
    state.stall(hit).await;

    state.status
}

/// Start a stub serving both provider APIs on a random port.
async fn start_stub(state: Arc<StubState>) -> SocketAddr {
    let app = Router::new()
        .route("/v3/mail/send", post(send_grid_mail_send))
        .route("/v3/{domain}/messages", post(mail_gun_messages))
        .with_state(state);

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    addr
}

/// An address nothing is listening on.
async fn closed_addr() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    listener.local_addr().unwrap()
}

// =============================================================================
// Helpers
// =============================================================================

fn email() -> EmailMessage {
    EmailMessage {
        from_address: "a@x.com".to_string(),
        from_name: "Alice".to_string(),
        to_address: "b@y.com".to_string(),
        to_name: "Bob".to_string(),
        subject: "S".to_string(),
        body: "B".to_string(),
    }
}

fn send_grid(addr: SocketAddr) -> Provider {
    SendGridProvider::new(&format!("http://{addr}"), "v3", "SG.test-key")
        .unwrap()
        .into()
}

fn mail_gun(addr: SocketAddr) -> Provider {
    MailGunProvider::new(&format!("http://{addr}"), "v3", "mg.example.com", "api", "key-123")
        .unwrap()
        .into()
}

fn sender(provider: Provider, retries: u32, timeout: Duration) -> EmailSender {
    let transport = HttpTransport::new(timeout).unwrap();
    let executor = RetryableExecutor::new(
        Arc::new(transport),
        RetryPolicy::new(retries, Duration::from_millis(10)),
    );
    EmailSender::new(provider, executor)
}

// =============================================================================
// Tests
// =============================================================================

#[tokio::test]
async fn test_send_grid_receives_json_payload() {
    let state = StubState::new(StatusCode::ACCEPTED);
    let addr = start_stub(state.clone()).await;

    sender(send_grid(addr), 2, Duration::from_secs(2))
        .send(email())
        .await
        .unwrap();

    assert_eq!(state.hits(), 1);
    let requests = state.requests.lock().await;
    let recorded = &requests[0];

    assert_eq!(recorded.path, "/v3/mail/send");
    assert_eq!(recorded.authorization.as_deref(), Some("Bearer SG.test-key"));
    assert_eq!(recorded.content_type.as_deref(), Some("application/json"));
    assert_eq!(
        recorded.json,
        Some(json!({
            "personalizations": [{"to": [{"email": "b@y.com", "name": "Bob"}], "subject": "S"}],
            "from": {"email": "a@x.com", "name": "Alice"},
            "content": [{"type": "text/plain", "value": "B"}]
        }))
    );
}

#[tokio::test]
async fn test_mail_gun_receives_multipart_form() {
    let state = StubState::new(StatusCode::OK);
    let addr = start_stub(state.clone()).await;

    sender(mail_gun(addr), 0, Duration::from_secs(2))
        .send(email())
        .await
        .unwrap();

    let requests = state.requests.lock().await;
    let recorded = &requests[0];

    assert_eq!(recorded.path, "/v3/mg.example.com/messages");
    // base64("api:key-123")
    assert_eq!(
        recorded.authorization.as_deref(),
        Some("Basic YXBpOmtleS0xMjM=")
    );
    assert!(recorded
        .content_type
        .as_deref()
        .unwrap()
        .starts_with("multipart/form-data; boundary="));
    assert_eq!(
        recorded.fields,
        vec![
            ("from".to_string(), "a@x.com".to_string()),
            ("to".to_string(), "b@y.com".to_string()),
            ("subject".to_string(), "S".to_string()),
            ("text".to_string(), "B".to_string()),
        ]
    );
}

#[tokio::test]
async fn test_error_status_is_rejected_without_retry() {
    let state = StubState::new(StatusCode::INTERNAL_SERVER_ERROR);
    let addr = start_stub(state.clone()).await;

    let result = sender(send_grid(addr), 3, Duration::from_secs(2))
        .send(email())
        .await;

    assert!(matches!(
        result,
        Err(DeliveryError::Rejected { status }) if status == StatusCode::INTERNAL_SERVER_ERROR
    ));
    assert_eq!(state.hits(), 1);
}

#[tokio::test]
async fn test_client_error_status_is_rejected() {
    let state = StubState::new(StatusCode::UNAUTHORIZED);
    let addr = start_stub(state.clone()).await;

    let result = sender(mail_gun(addr), 2, Duration::from_secs(2))
        .send(email())
        .await;

    assert!(matches!(result, Err(DeliveryError::Rejected { .. })));
    assert_eq!(state.hits(), 1);
}

#[tokio::test]
async fn test_connection_refused_exhausts_attempts() {
    let addr = closed_addr().await;

    let result = sender(send_grid(addr), 2, Duration::from_secs(2))
        .send(email())
        .await;

    assert!(matches!(
        result,
        Err(DeliveryError::TransportExhausted { attempts: 3 })
    ));
}

#[tokio::test]
async fn test_timeouts_are_retried() {
    let state = StubState::with_delay(StatusCode::ACCEPTED, Duration::from_millis(500));
    let addr = start_stub(state.clone()).await;

    let result = sender(send_grid(addr), 1, Duration::from_millis(100))
        .send(email())
        .await;

    assert!(matches!(
        result,
        Err(DeliveryError::TransportExhausted { attempts: 2 })
    ));
    assert_eq!(state.hits(), 2);
}

#[tokio::test]
async fn test_mail_gun_form_is_encoded_again_on_retry() {
    let state = StubState::slow_first(StatusCode::OK, 1, Duration::from_millis(500));
    let addr = start_stub(state.clone()).await;

    sender(mail_gun(addr), 1, Duration::from_millis(100))
        .send(email())
        .await
        .unwrap();

    assert_eq!(state.hits(), 2);
    let requests = state.requests.lock().await;
    assert_eq!(requests.len(), 2);
    assert_eq!(requests[0].fields.len(), 4);
    assert_eq!(requests[0].fields, requests[1].fields);
    assert_eq!(requests[0].authorization, requests[1].authorization);
}

#[tokio::test]
async fn test_concurrent_sends_share_one_sender() {
    let state = StubState::new(StatusCode::ACCEPTED);
    let addr = start_stub(state.clone()).await;
    let sender = Arc::new(sender(send_grid(addr), 1, Duration::from_secs(2)));

    let handles: Vec<_> = (0..8)
        .map(|i| {
            let sender = Arc::clone(&sender);
            tokio::spawn(async move {
                let mut email = email();
                email.subject = format!("message {i}");
                sender.send(email).await
            })
        })
        .collect();

    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    assert_eq!(state.hits(), 8);
    let mut subjects: Vec<String> = state
        .requests
        .lock()
        .await
        .iter()
        .map(|r| r.json.as_ref().unwrap()["personalizations"][0]["subject"].to_string())
        .collect();
    subjects.sort();
    subjects.dedup();
    assert_eq!(subjects.len(), 8);
}
