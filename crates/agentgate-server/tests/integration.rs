#![allow(clippy::panic, clippy::expect_used, clippy::unwrap_used)]

use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use serde_json::{Value, json};
use tower::ServiceExt;

use agentgate_core::Config;
use agentgate_core::oauth::Identity;
use agentgate_core::warehouse::{
    WarehouseConnection, WarehouseConnector, WarehouseError, WarehouseLogin,
};
use agentgate_server::relay::{
    AgentTarget, AgentTransport, ChunkSource, RelayError, UpstreamResponse,
};
use agentgate_server::server::{AppState, build_router};
use agentgate_server::session::{Session, unix_now};

const SESSION_ID: &str = "test-session";

// =============================================================================
// Fakes
// =============================================================================

struct FakeConnection {
    closes: Arc<AtomicUsize>,
}

impl WarehouseConnection for FakeConnection {
    fn rest_token(&self) -> &str {
        "rest-token"
    }

    fn host(&self) -> &str {
        "acct.snowflakecomputing.com"
    }

    async fn close(self) {
        self.closes.fetch_add(1, Ordering::SeqCst);
    }
}

struct FakeConnector {
    accept: bool,
    closes: Arc<AtomicUsize>,
    logins: Mutex<Vec<String>>,
}

impl WarehouseConnector for FakeConnector {
    type Connection = FakeConnection;

    async fn connect(&self, login: &WarehouseLogin) -> Result<FakeConnection, WarehouseError> {
        self.logins.lock().unwrap().push(login.login_name.clone());
        if !self.accept {
            return Err(WarehouseError::LoginRejected {
                code: "390303".into(),
                message: "Invalid OAuth access token".into(),
            });
        }
        Ok(FakeConnection {
            closes: Arc::clone(&self.closes),
        })
    }
}

struct FakeBody {
    chunks: Vec<Vec<u8>>,
}

impl ChunkSource for FakeBody {
    async fn next_chunk(&mut self) -> Result<Option<Vec<u8>>, RelayError> {
        if self.chunks.is_empty() {
            Ok(None)
        } else {
            Ok(Some(self.chunks.remove(0)))
        }
    }
}

#[derive(Clone)]
enum Reply {
    Stream(&'static str),
    Reject(u16, &'static str),
}

struct FakeTransport {
    reply: Reply,
}

impl AgentTransport for FakeTransport {
    type Body = FakeBody;

    async fn run_agent(
        &self,
        _host: &str,
        _rest_token: &str,
        _target: &AgentTarget,
        _message: &str,
    ) -> Result<UpstreamResponse<FakeBody>, RelayError> {
        Ok(match self.reply.clone() {
            Reply::Stream(text) => UpstreamResponse::Streaming(FakeBody {
                chunks: vec![text.as_bytes().to_vec()],
            }),
            Reply::Reject(status, body) => UpstreamResponse::Rejected {
                status,
                body: body.to_string(),
            },
        })
    }
}

// =============================================================================
// Helpers
// =============================================================================

fn test_config() -> Config {
    let mut config = Config::default();
    config.oauth.issuer = "https://idp.example.com/oauth2/default".into();
    config.oauth.client_id = "0oa1testclient42".into();
    config.oauth.client_secret = "secret".into();
    config.oauth.redirect_uri = "http://localhost:8002/callback".into();
    config.warehouse.account = "myorg-acct".into();
    config.warehouse.database = "SALES".into();
    config.warehouse.schema = "PUBLIC".into();
    config.server.app_name = "Test Gate".into();
    config
}

struct Harness {
    state: AppState<FakeConnector, FakeTransport>,
    closes: Arc<AtomicUsize>,
}

fn harness(accept_login: bool, reply: Reply) -> Harness {
    let closes = Arc::new(AtomicUsize::new(0));
    let connector = FakeConnector {
        accept: accept_login,
        closes: Arc::clone(&closes),
        logins: Mutex::new(Vec::new()),
    };
    let state =
        AppState::with_backends(test_config(), connector, FakeTransport { reply }).unwrap();
    Harness { state, closes }
}

async fn sign_in(state: &AppState<FakeConnector, FakeTransport>) {
    let identity: Identity = serde_json::from_value(json!({
        "sub": "00u1",
        "email": "ada@example.com",
        "name": "Ada Lovelace",
    }))
    .unwrap();
    state
        .sessions
        .create(Session {
            id: SESSION_ID.into(),
            access_token: "user-access-token".into(),
            refresh_token: None,
            id_token: None,
            identity,
            client_id: "0oa1testclient42".into(),
            created_at: unix_now(),
        })
        .await;
}

fn session_cookie() -> String {
    format!("session_id={SESSION_ID}")
}

/// Send a request to the app and return (status, headers, body text).
async fn send_request(
    state: &AppState<FakeConnector, FakeTransport>,
    request: Request<Body>,
) -> (StatusCode, axum::http::HeaderMap, String) {
    let resp = build_router(state.clone()).oneshot(request).await.unwrap();
    let status = resp.status();
    let headers = resp.headers().clone();
    let body = axum::body::to_bytes(resp.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, headers, String::from_utf8_lossy(&body).into_owned())
}

fn get(uri: &str, cookie: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().uri(uri);
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    builder.body(Body::empty()).unwrap()
}

fn chat(body: &Value, cookie: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri("/agent/chat")
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

fn chat_body() -> Value {
    json!({
        "agent_database": "SALES",
        "agent_schema": "AGENTS",
        "agent_name": "Revenue Bot",
        "message": "How did Q3 go?",
    })
}

/// Payloads of every `data:` line, in order.
fn data_lines(body: &str) -> Vec<&str> {
    body.lines()
        .filter_map(|line| line.strip_prefix("data: "))
        .collect()
}

const UPSTREAM: &str = "event: response.thinking.delta\n\
data: {\"text\":\"Looking at revenue\"}\n\
\n\
event: response.status\n\
data: {\"message\":\"Running query\"}\n\
\n\
event: response.text.delta\n\
data: {\"text\":\"Q3 was up 12%.\"}\n\
\n\
event: response.table\n\
data: {\"table\":{\"rows\":[[1]]}}\n\
\n\
event: response.mystery\n\
data: {\"x\":1}\n\
\n";

// =============================================================================
// Chat relay
// =============================================================================

#[tokio::test]
async fn chat_requires_session_cookie() {
    let h = harness(true, Reply::Stream(UPSTREAM));
    let (status, _, body) = send_request(&h.state, chat(&chat_body(), None)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(body.contains("detail"), "body: {body}");
}

#[tokio::test]
async fn chat_with_unknown_session_is_unauthorized() {
    let h = harness(true, Reply::Stream(UPSTREAM));
    let (status, _, _) = send_request(&h.state, chat(&chat_body(), Some("session_id=nope"))).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn chat_rejects_missing_fields() {
    let h = harness(true, Reply::Stream(UPSTREAM));
    sign_in(&h.state).await;
    let cookie = session_cookie();
    let body = json!({ "agent_database": "SALES", "message": "hi" });
    let (status, _, text) = send_request(&h.state, chat(&body, Some(&cookie))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(text.contains("agent_schema"), "body: {text}");
    assert!(text.contains("agent_name"), "body: {text}");
    assert_eq!(h.closes.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn chat_reports_warehouse_login_failure() {
    let h = harness(false, Reply::Stream(UPSTREAM));
    sign_in(&h.state).await;
    let cookie = session_cookie();
    let (status, _, text) = send_request(&h.state, chat(&chat_body(), Some(&cookie))).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(text.contains("Could not connect to Snowflake"), "body: {text}");
    assert_eq!(
        h.state.connector.logins.lock().unwrap().as_slice(),
        ["ada@example.com".to_string()]
    );
}

#[tokio::test]
async fn chat_streams_frames_then_done() {
    let h = harness(true, Reply::Stream(UPSTREAM));
    sign_in(&h.state).await;
    let cookie = session_cookie();
    let (status, headers, text) =
        send_request(&h.state, chat(&chat_body(), Some(&cookie))).await;

    assert_eq!(status, StatusCode::OK);
    assert!(
        headers[header::CONTENT_TYPE]
            .to_str()
            .unwrap()
            .starts_with("text/event-stream")
    );
    assert_eq!(headers["x-accel-buffering"], "no");

    let frames: Vec<Value> = data_lines(&text)
        .iter()
        .filter(|d| **d != "[DONE]")
        .map(|d| serde_json::from_str(d).unwrap())
        .collect();
    assert_eq!(
        frames,
        vec![
            json!({"type": "thinking", "content": "Looking at revenue"}),
            json!({"type": "status", "content": "⏳ Running query"}),
            json!({"type": "message", "content": "Q3 was up 12%."}),
            json!({"type": "table", "data": {"rows": [[1]]}}),
        ]
    );
    assert_eq!(data_lines(&text).last(), Some(&"[DONE]"));
    assert_eq!(h.closes.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn chat_relays_upstream_rejection_as_error_frame() {
    let h = harness(true, Reply::Reject(500, r#"{"message":"rate limited"}"#));
    sign_in(&h.state).await;
    let cookie = session_cookie();
    let (status, _, text) = send_request(&h.state, chat(&chat_body(), Some(&cookie))).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        data_lines(&text),
        vec![r#"{"error":"rate limited"}"#, "[DONE]"]
    );
    assert_eq!(h.closes.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn legacy_chat_path_is_routed() {
    let h = harness(true, Reply::Stream(""));
    sign_in(&h.state).await;
    let request = Request::builder()
        .method("POST")
        .uri("/api/cortex/agent/chat")
        .header(header::CONTENT_TYPE, "application/json")
        .header(header::COOKIE, session_cookie())
        .body(Body::from(chat_body().to_string()))
        .unwrap();
    let (status, _, text) = send_request(&h.state, request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(data_lines(&text), vec!["[DONE]"]);
}

// =============================================================================
// Auth and pages
// =============================================================================

#[tokio::test]
async fn login_redirects_to_authorize_endpoint() {
    let h = harness(true, Reply::Stream(""));
    let (status, headers, _) = send_request(&h.state, get("/login", None)).await;
    assert_eq!(status, StatusCode::SEE_OTHER);
    let location = headers[header::LOCATION].to_str().unwrap();
    assert!(
        location.starts_with("https://idp.example.com/oauth2/default/v1/authorize?"),
        "location: {location}"
    );
    assert!(location.contains("code_challenge_method=S256"), "location: {location}");
    assert!(location.contains("client_id=0oa1testclient42"), "location: {location}");
}

#[tokio::test]
async fn callback_with_unknown_state_is_rejected() {
    let h = harness(true, Reply::Stream(""));
    let (status, _, text) =
        send_request(&h.state, get("/callback?code=abc&state=forged", None)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(text.contains("Invalid or expired state"), "body: {text}");
}

#[tokio::test]
async fn callback_with_idp_error_is_rejected() {
    let h = harness(true, Reply::Stream(""));
    let (status, _, text) = send_request(
        &h.state,
        get("/callback?error=access_denied&error_description=nope", None),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(text.contains("access_denied"), "body: {text}");
}

#[tokio::test]
async fn logout_clears_session_and_cookie() {
    let h = harness(true, Reply::Stream(""));
    sign_in(&h.state).await;
    let cookie = session_cookie();
    let (status, headers, _) = send_request(&h.state, get("/logout", Some(&cookie))).await;
    assert_eq!(status, StatusCode::SEE_OTHER);
    assert_eq!(headers[header::LOCATION], "/");
    let set_cookie = headers[header::SET_COOKIE].to_str().unwrap();
    assert!(set_cookie.starts_with("session_id="), "set-cookie: {set_cookie}");
    assert!(h.state.sessions.get(SESSION_ID).await.is_none());
}

#[tokio::test]
async fn root_shows_landing_page_when_signed_out() {
    let h = harness(true, Reply::Stream(""));
    let (status, _, text) = send_request(&h.state, get("/", None)).await;
    assert_eq!(status, StatusCode::OK);
    assert!(text.contains("<!DOCTYPE html>"));
    assert!(text.contains("Test Gate"));
    assert!(text.contains("href=\"/login\""));
    assert!(!text.contains("{{"), "unreplaced placeholder");
}

#[tokio::test]
async fn root_shows_chat_page_when_signed_in() {
    let h = harness(true, Reply::Stream(""));
    sign_in(&h.state).await;
    let cookie = session_cookie();
    let (status, _, text) = send_request(&h.state, get("/", Some(&cookie))).await;
    assert_eq!(status, StatusCode::OK);
    assert!(text.contains("Ada Lovelace"));
    assert!(text.contains("SALES.PUBLIC"));
    assert!(!text.contains("{{"), "unreplaced placeholder");
}

#[tokio::test]
async fn user_endpoint_returns_claims() {
    let h = harness(true, Reply::Stream(""));
    sign_in(&h.state).await;
    let cookie = session_cookie();
    let (status, _, text) = send_request(&h.state, get("/api/user", Some(&cookie))).await;
    assert_eq!(status, StatusCode::OK);
    let body: Value = serde_json::from_str(&text).unwrap();
    assert_eq!(body["login_name"], "ada@example.com");
    assert_eq!(body["claims"]["name"], "Ada Lovelace");
    assert_eq!(body["issuer"], "https://idp.example.com/oauth2/default");
}

#[tokio::test]
async fn refresh_without_refresh_token_is_bad_request() {
    let h = harness(true, Reply::Stream(""));
    sign_in(&h.state).await;
    let cookie = session_cookie();
    let (status, _, text) =
        send_request(&h.state, get("/api/token/refresh", Some(&cookie))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(text.contains("No refresh token"), "body: {text}");
}

#[tokio::test]
async fn health_reports_status() {
    let h = harness(true, Reply::Stream(""));
    sign_in(&h.state).await;
    let (status, _, text) = send_request(&h.state, get("/health", None)).await;
    assert_eq!(status, StatusCode::OK);
    let body: Value = serde_json::from_str(&text).unwrap();
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["app"], "Test Gate");
    assert_eq!(body["client_id"], "0oa1testclie...");
    assert_eq!(body["active_sessions"], 1);
}
