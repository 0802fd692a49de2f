//! Shared harness for integration tests.

#![allow(dead_code)]

use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use kbx_client::api::types::Credentials;
use kbx_client::client::ApiClient;
use kbx_client::config::ClientConfig;
use kbx_client::events::{ClientEventRx, EventSender, create_event_channel};
use kbx_client::session::{SessionContext, SessionManager};
use kbx_client::store::SessionStore;

/// Everything a test needs: a mock backend, an isolated store under a temp
/// home, the wired-up client/manager pair, and the event stream.
pub struct Harness {
    pub server: MockServer,
    pub home: TempDir,
    pub session: Arc<SessionContext>,
    pub client: Arc<ApiClient>,
    pub manager: SessionManager,
    pub events: ClientEventRx,
}

/// Builds a harness pointed at a fresh mock server.
pub async fn harness() -> Harness {
    harness_with(|server| ClientConfig::with_base_url(server.uri())).await
}

/// Builds a harness with a caller-controlled client config (custom timeout,
/// dead origin, ...). The mock server is started either way.
pub async fn harness_with(config: impl FnOnce(&MockServer) -> ClientConfig) -> Harness {
    init_tracing();

    let server = MockServer::start().await;
    let home = tempfile::tempdir().unwrap();
    let store = SessionStore::open(home.path().join("session.json"));
    let session = Arc::new(SessionContext::new(store));
    let (tx, events) = create_event_channel();
    let client = Arc::new(ApiClient::new(
        config(&server),
        Arc::clone(&session),
        EventSender::new(tx),
    ));
    let manager = SessionManager::new(Arc::clone(&client));

    Harness {
        server,
        home,
        session,
        client,
        manager,
        events,
    }
}

/// Stub login response body: `{token, user}`.
pub fn auth_body(token: &str) -> serde_json::Value {
    serde_json::json!({
        "token": token,
        "user": {
            "id": 1,
            "username": "alice",
            "email": "alice@example.com",
            "roles": ["user"],
        },
    })
}

/// Mounts a permissive login stub and signs the harness in.
pub async fn sign_in(harness: &Harness, token: &str) {
    Mock::given(method("POST"))
        .and(path("/auth/login"))
        .respond_with(ResponseTemplate::new(200).set_body_json(auth_body(token)))
        .mount(&harness.server)
        .await;

    harness
        .manager
        .login(&Credentials::new("alice", "pw"))
        .await
        .expect("login against stub");
}

/// Builds an unsigned JWT whose payload carries the given `exp` claim.
pub fn make_jwt(exp: u64) -> String {
    let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"HS256","typ":"JWT"}"#);
    let payload = URL_SAFE_NO_PAD.encode(format!(r#"{{"sub":"alice","exp":{exp}}}"#));
    format!("{header}.{payload}.sig")
}

pub fn now_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_secs()
}

/// Counts the requests the mock server saw for a given path.
pub async fn requests_to(server: &MockServer, target: &str) -> usize {
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .iter()
        .filter(|req| req.url.path() == target)
        .count()
}

fn init_tracing() {
    use tracing_subscriber::EnvFilter;
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}
