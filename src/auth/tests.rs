//! Tests for the auth module

use super::*;
use crate::error::Error;
use crate::pipeline::{Body, Handler, RequestEnvelope, ResponseEnvelope};
use async_trait::async_trait;
use pretty_assertions::assert_eq;
use reqwest::header::HeaderMap;
use reqwest::StatusCode;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use test_case::test_case;
use tokio_test::{assert_err, assert_ok};
use wiremock::matchers::{body_string_contains, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Terminal stage that records what it was handed
#[derive(Default)]
struct Recorder {
    requests: Mutex<Vec<RequestEnvelope>>,
}

impl Recorder {
    fn requests(&self) -> Vec<RequestEnvelope> {
        self.requests.lock().unwrap().clone()
    }

    fn last(&self) -> RequestEnvelope {
        self.requests().pop().expect("no request reached the next stage")
    }
}

#[async_trait]
impl Handler for Recorder {
    async fn call(&self, request: RequestEnvelope) -> crate::Result<ResponseEnvelope> {
        let url = request.url.clone();
        self.requests.lock().unwrap().push(request);

        let mut headers = HeaderMap::new();
        headers.insert("x-recorded", "yes".parse().unwrap());
        Ok(ResponseEnvelope::new(
            StatusCode::ACCEPTED,
            headers,
            "downstream",
            url,
        ))
    }
}

fn login_config(server: &MockServer) -> LoginConfig {
    LoginConfig::with_auth_domain(server.uri()).retry(5, Duration::from_millis(10))
}

fn login_success() -> ResponseTemplate {
    ResponseTemplate::new(200)
        .insert_header("set-cookie", "session=xyz")
        .set_body_json(serde_json::json!({
            "json": {
                "errors": [],
                "data": {"modhash": "abc123", "cookie": "xyz"}
            }
        }))
}

// ============================================================================
// Construction
// ============================================================================

#[tokio::test]
async fn test_missing_credentials_fails_without_network() {
    let mock_server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(login_success())
        .expect(0)
        .mount(&mock_server)
        .await;

    let recorder = Arc::new(Recorder::default());
    let config = AuthConfig {
        user: Some("alice".to_string()),
        remember: Some(true),
        ..AuthConfig::default()
    };

    let result = Authenticator::with_login_config(recorder.clone(), config, login_config(&mock_server));

    let err = assert_err!(result);
    assert!(err.is_config());
    assert_eq!(err.to_string(), "Configuration error: missing credentials");
    assert!(recorder.requests().is_empty());
}

#[test]
fn test_invalid_login_domain_is_config_error() {
    let recorder = Arc::new(Recorder::default());
    let result = Authenticator::with_login_config(
        recorder,
        AuthConfig::with_credentials("alice", "hunter2"),
        LoginConfig::with_auth_domain("not a domain"),
    );
    let err = result.unwrap_err();
    assert!(err.is_config());
    assert!(err
        .to_string()
        .contains("invalid login endpoint 'not a domain/api/login'"));
}

#[tokio::test]
async fn test_initial_strategy() {
    let recorder: Arc<dyn Handler> = Arc::new(Recorder::default());

    let auth = Authenticator::new(recorder.clone(), AuthConfig::with_access_token("t")).unwrap();
    assert_eq!(auth.strategy().await, Strategy::Token);

    let auth = Authenticator::new(recorder.clone(), AuthConfig::with_cookie("c=1")).unwrap();
    assert_eq!(auth.strategy().await, Strategy::Cookie);

    let auth =
        Authenticator::new(recorder, AuthConfig::with_credentials("alice", "hunter2")).unwrap();
    assert_eq!(auth.strategy().await, Strategy::Login);
    assert_eq!(auth.session_cookie().await, None);
}

// ============================================================================
// Token strategy
// ============================================================================

#[test_case("http://www.reddit.com/api/v1/me", "/api/v1/me", None ; "plain http")]
#[test_case("https://reddit.com:8443/r/rust/hot.json?limit=5", "/r/rust/hot.json", Some("limit=5") ; "custom port and query")]
#[test_case("http://127.0.0.1:3000/api/comment", "/api/comment", None ; "ip address")]
#[tokio::test]
async fn test_token_strategy_rewrites_target(original: &str, path: &str, query: Option<&str>) {
    let recorder = Arc::new(Recorder::default());
    let auth =
        Authenticator::new(recorder.clone(), AuthConfig::with_access_token("tok-123")).unwrap();

    let request = RequestEnvelope::get(original).unwrap();
    let response = auth.intercept(request).await.unwrap();
    assert_eq!(response.status, StatusCode::ACCEPTED);

    let sent = recorder.last();
    assert_eq!(sent.url.scheme(), "https");
    assert_eq!(sent.url.host_str(), Some("oauth.reddit.com"));
    assert_eq!(sent.url.port_or_known_default(), Some(443));
    assert_eq!(sent.url.path(), path);
    assert_eq!(sent.url.query(), query);
    assert_eq!(sent.header_str("authorization"), Some("bearer tok-123"));
}

#[tokio::test]
async fn test_token_strategy_is_idempotent_and_keeps_headers() {
    let recorder = Arc::new(Recorder::default());
    let auth =
        Authenticator::new(recorder.clone(), AuthConfig::with_access_token("tok-123")).unwrap();

    let mut request = RequestEnvelope::get("http://www.reddit.com/api/v1/me")
        .unwrap()
        .header("User-Agent", "my-bot/0.1")
        .unwrap();

    assert_eq!(auth.authenticate(&mut request).await.unwrap(), Strategy::Token);
    let first = request.url.clone();
    assert_eq!(auth.authenticate(&mut request).await.unwrap(), Strategy::Token);

    assert_eq!(request.url, first);
    assert_eq!(request.header_str("authorization"), Some("bearer tok-123"));
    assert_eq!(request.headers.get_all("authorization").iter().count(), 1);
    assert_eq!(request.header_str("user-agent"), Some("my-bot/0.1"));
    assert!(request.context.modhash().is_none());
}

#[tokio::test]
async fn test_token_wins_over_cookie_and_credentials() {
    let mock_server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(login_success())
        .expect(0)
        .mount(&mock_server)
        .await;

    let recorder = Arc::new(Recorder::default());
    let config = AuthConfig {
        access_token: Some("tok".to_string()),
        cookie: Some("reddit_session=old".to_string()),
        ..AuthConfig::with_credentials("alice", "hunter2")
    };
    let auth =
        Authenticator::with_login_config(recorder.clone(), config, login_config(&mock_server))
            .unwrap();

    auth.intercept(RequestEnvelope::get("https://www.reddit.com/").unwrap())
        .await
        .unwrap();

    let sent = recorder.last();
    assert_eq!(sent.header_str("authorization"), Some("bearer tok"));
    assert!(sent.header_str("cookie").is_none());
}

// ============================================================================
// Cookie strategy
// ============================================================================

#[tokio::test]
async fn test_cookie_strategy_without_upstream_cookie() {
    let recorder = Arc::new(Recorder::default());
    let auth = Authenticator::new(
        recorder.clone(),
        AuthConfig::with_cookie("reddit_session=abc"),
    )
    .unwrap();

    auth.intercept(RequestEnvelope::get("https://www.reddit.com/api/me.json").unwrap())
        .await
        .unwrap();

    let sent = recorder.last();
    assert_eq!(sent.header_str("cookie"), Some("reddit_session=abc"));
    assert_eq!(sent.url.host_str(), Some("www.reddit.com"));
    assert!(sent.header_str("authorization").is_none());
    assert!(sent.context.modhash().is_none());
}

#[tokio::test]
async fn test_cookie_strategy_appends_to_upstream_cookie() {
    let recorder = Arc::new(Recorder::default());
    let auth = Authenticator::new(
        recorder.clone(),
        AuthConfig::with_cookie("reddit_session=abc"),
    )
    .unwrap();

    let request = RequestEnvelope::get("https://www.reddit.com/")
        .unwrap()
        .header("Cookie", "over18=1")
        .unwrap();
    auth.intercept(request).await.unwrap();

    assert_eq!(
        recorder.last().header_str("cookie"),
        Some("over18=1; reddit_session=abc")
    );
}

#[tokio::test]
async fn test_cookie_strategy_twice_does_not_double_append() {
    let recorder = Arc::new(Recorder::default());
    let auth = Authenticator::new(
        recorder.clone(),
        AuthConfig::with_cookie("reddit_session=abc"),
    )
    .unwrap();

    for _ in 0..2 {
        auth.intercept(RequestEnvelope::get("https://www.reddit.com/").unwrap())
            .await
            .unwrap();
    }

    let cookies: Vec<_> = recorder
        .requests()
        .iter()
        .map(|r| r.header_str("cookie").map(String::from))
        .collect();
    assert_eq!(
        cookies,
        vec![
            Some("reddit_session=abc".to_string()),
            Some("reddit_session=abc".to_string())
        ]
    );
}

#[tokio::test]
async fn test_response_passes_through_unchanged() {
    let recorder = Arc::new(Recorder::default());
    let auth = Authenticator::new(recorder, AuthConfig::with_cookie("c=1")).unwrap();

    let response = auth
        .intercept(RequestEnvelope::get("https://www.reddit.com/").unwrap())
        .await
        .unwrap();

    assert_eq!(response.status, StatusCode::ACCEPTED);
    assert_eq!(response.header_str("x-recorded"), Some("yes"));
    assert_eq!(response.text(), "downstream");
}

// ============================================================================
// Login strategy
// ============================================================================

#[tokio::test]
async fn test_login_then_cookie() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/login"))
        .and(header("user-agent", "my-bot/0.1"))
        .and(header("content-type", "application/x-www-form-urlencoded"))
        .and(body_string_contains("user=alice"))
        .and(body_string_contains("passwd=hunter2"))
        .and(body_string_contains("rem=true"))
        .and(body_string_contains("api_type=json"))
        .respond_with(login_success())
        .expect(1)
        .mount(&mock_server)
        .await;

    let recorder = Arc::new(Recorder::default());
    let config = AuthConfig::with_credentials("alice", "hunter2").remember(true);
    let auth =
        Authenticator::with_login_config(recorder.clone(), config, login_config(&mock_server))
            .unwrap();

    let request = RequestEnvelope::get("https://www.reddit.com/api/me.json")
        .unwrap()
        .header("User-Agent", "my-bot/0.1")
        .unwrap();
    let response = auth.intercept(request).await.unwrap();
    assert_eq!(response.status, StatusCode::ACCEPTED);

    let sent = recorder.last();
    assert!(sent.header_str("cookie").unwrap().contains("session=xyz"));
    assert_eq!(sent.context.modhash(), Some("abc123"));
    assert_eq!(sent.url.host_str(), Some("www.reddit.com"));

    assert_eq!(auth.session_cookie().await, Some("session=xyz".to_string()));
    assert_eq!(auth.modhash().await, Some("abc123".to_string()));
    assert_eq!(auth.strategy().await, Strategy::Cookie);
}

#[tokio::test]
async fn test_login_sends_rem_false_when_unset() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/login"))
        .and(body_string_contains("rem=false"))
        .respond_with(login_success())
        .expect(1)
        .mount(&mock_server)
        .await;

    let recorder = Arc::new(Recorder::default());
    let auth = Authenticator::with_login_config(
        recorder,
        AuthConfig::with_credentials("alice", "hunter2"),
        login_config(&mock_server),
    )
    .unwrap();

    let mut request = RequestEnvelope::get("https://www.reddit.com/").unwrap();
    assert_eq!(auth.authenticate(&mut request).await.unwrap(), Strategy::Login);
}

#[tokio::test]
async fn test_login_drops_body_framing_headers() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/login"))
        .and(header("content-type", "application/x-www-form-urlencoded"))
        .and(header("x-trace", "t-1"))
        .respond_with(login_success())
        .expect(1)
        .mount(&mock_server)
        .await;

    let recorder = Arc::new(Recorder::default());
    let auth = Authenticator::with_login_config(
        recorder.clone(),
        AuthConfig::with_credentials("alice", "hunter2"),
        login_config(&mock_server),
    )
    .unwrap();

    let request = RequestEnvelope::parse(reqwest::Method::POST, "https://www.reddit.com/api/comment")
        .unwrap()
        .header("Content-Type", "application/json")
        .unwrap()
        .header("Content-Length", "2")
        .unwrap()
        .header("Host", "www.reddit.com")
        .unwrap()
        .header("X-Trace", "t-1")
        .unwrap()
        .body(Body::Json(serde_json::json!({})));
    auth.intercept(request).await.unwrap();

    let received = mock_server.received_requests().await.unwrap();
    assert_eq!(received.len(), 1);
    let login = &received[0];
    assert_eq!(
        login.headers.get("content-type").unwrap(),
        "application/x-www-form-urlencoded"
    );
    assert_ne!(login.headers.get("host").unwrap(), "www.reddit.com");
    let length: usize = login
        .headers
        .get("content-length")
        .unwrap()
        .to_str()
        .unwrap()
        .parse()
        .unwrap();
    assert_eq!(length, login.body.len());

    let sent = recorder.last();
    assert_eq!(sent.header_str("content-type"), Some("application/json"));
    assert_eq!(sent.header_str("host"), Some("www.reddit.com"));
}

#[tokio::test]
async fn test_login_happens_once_then_cookie_is_reused() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/login"))
        .respond_with(login_success())
        .expect(1)
        .mount(&mock_server)
        .await;

    let recorder = Arc::new(Recorder::default());
    let auth = Authenticator::with_login_config(
        recorder.clone(),
        AuthConfig::with_credentials("alice", "hunter2"),
        login_config(&mock_server),
    )
    .unwrap();

    let mut first = RequestEnvelope::get("https://www.reddit.com/a").unwrap();
    let mut second = RequestEnvelope::get("https://www.reddit.com/b").unwrap();
    assert_eq!(auth.authenticate(&mut first).await.unwrap(), Strategy::Login);
    assert_eq!(auth.authenticate(&mut second).await.unwrap(), Strategy::Cookie);

    assert_eq!(second.header_str("cookie"), Some("session=xyz"));
    assert_eq!(second.context.modhash(), Some("abc123"));
}

#[tokio::test]
async fn test_login_merges_with_upstream_cookie() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/login"))
        .and(header("cookie", "over18=1"))
        .respond_with(login_success())
        .expect(1)
        .mount(&mock_server)
        .await;

    let recorder = Arc::new(Recorder::default());
    let auth = Authenticator::with_login_config(
        recorder.clone(),
        AuthConfig::with_credentials("alice", "hunter2"),
        login_config(&mock_server),
    )
    .unwrap();

    let request = RequestEnvelope::get("https://www.reddit.com/")
        .unwrap()
        .header("Cookie", "over18=1")
        .unwrap();
    auth.intercept(request).await.unwrap();

    assert_eq!(
        recorder.last().header_str("cookie"),
        Some("over18=1; session=xyz")
    );
}

#[tokio::test]
async fn test_login_joins_multiple_set_cookie_values() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/login"))
        .respond_with(
            ResponseTemplate::new(200)
                .append_header("set-cookie", "reddit_session=xyz; Domain=reddit.com")
                .append_header("set-cookie", "secure_session=1")
                .set_body_json(serde_json::json!({"json": {"errors": [], "data": {}}})),
        )
        .mount(&mock_server)
        .await;

    let recorder = Arc::new(Recorder::default());
    let auth = Authenticator::with_login_config(
        recorder.clone(),
        AuthConfig::with_credentials("alice", "hunter2"),
        login_config(&mock_server),
    )
    .unwrap();

    auth.intercept(RequestEnvelope::get("https://www.reddit.com/").unwrap())
        .await
        .unwrap();

    let sent = recorder.last();
    assert_eq!(
        sent.header_str("cookie"),
        Some("reddit_session=xyz; Domain=reddit.com, secure_session=1")
    );
    assert!(sent.context.modhash().is_none());
}

#[tokio::test]
async fn test_login_modhash_from_header() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/login"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("set-cookie", "session=xyz")
                .insert_header("x-modhash", "hdr-mod")
                .set_body_string("ok"),
        )
        .mount(&mock_server)
        .await;

    let recorder = Arc::new(Recorder::default());
    let auth = Authenticator::with_login_config(
        recorder.clone(),
        AuthConfig::with_credentials("alice", "hunter2"),
        login_config(&mock_server),
    )
    .unwrap();

    auth.intercept(RequestEnvelope::get("https://www.reddit.com/").unwrap())
        .await
        .unwrap();

    assert_eq!(recorder.last().context.modhash(), Some("hdr-mod"));
}

#[tokio::test]
async fn test_concurrent_first_use_logs_in_once() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/login"))
        .respond_with(login_success().set_delay(Duration::from_millis(100)))
        .expect(1)
        .mount(&mock_server)
        .await;

    let recorder = Arc::new(Recorder::default());
    let auth = Authenticator::with_login_config(
        recorder.clone(),
        AuthConfig::with_credentials("alice", "hunter2"),
        login_config(&mock_server),
    )
    .unwrap();

    let (a, b, c) = tokio::join!(
        auth.intercept(RequestEnvelope::get("https://www.reddit.com/a").unwrap()),
        auth.intercept(RequestEnvelope::get("https://www.reddit.com/b").unwrap()),
        auth.intercept(RequestEnvelope::get("https://www.reddit.com/c").unwrap()),
    );
    assert_ok!(a);
    assert_ok!(b);
    assert_ok!(c);

    let requests = recorder.requests();
    assert_eq!(requests.len(), 3);
    for request in requests {
        assert_eq!(request.header_str("cookie"), Some("session=xyz"));
        assert_eq!(request.context.modhash(), Some("abc123"));
    }
}

// ============================================================================
// Login failures
// ============================================================================

#[tokio::test]
async fn test_login_failure_after_retries() {
    let mock_server = MockServer::start().await;

    // One attempt plus five retries
    Mock::given(method("POST"))
        .and(path("/api/login"))
        .respond_with(ResponseTemplate::new(500))
        .expect(6)
        .mount(&mock_server)
        .await;

    let recorder = Arc::new(Recorder::default());
    let auth = Authenticator::with_login_config(
        recorder.clone(),
        AuthConfig::with_credentials("alice", "hunter2"),
        login_config(&mock_server),
    )
    .unwrap();

    let err = auth
        .intercept(RequestEnvelope::get("https://www.reddit.com/").unwrap())
        .await
        .unwrap_err();

    assert!(err.is_login_failed());
    match err {
        Error::LoginFailed {
            source: Some(source),
            ..
        } => assert!(matches!(*source, Error::HttpStatus { status: 500, .. })),
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(auth.session_cookie().await, None);
    assert_eq!(auth.strategy().await, Strategy::Login);
    assert!(recorder.requests().is_empty());
}

#[tokio::test]
async fn test_login_client_error_is_not_retried() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/login"))
        .respond_with(ResponseTemplate::new(403).set_body_string("forbidden"))
        .expect(1)
        .mount(&mock_server)
        .await;

    let recorder = Arc::new(Recorder::default());
    let auth = Authenticator::with_login_config(
        recorder.clone(),
        AuthConfig::with_credentials("alice", "hunter2"),
        login_config(&mock_server),
    )
    .unwrap();

    let err = auth
        .intercept(RequestEnvelope::get("https://www.reddit.com/").unwrap())
        .await
        .unwrap_err();

    assert!(err.is_login_failed());
    assert!(recorder.requests().is_empty());
}

#[tokio::test]
async fn test_login_reported_errors() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/login"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("set-cookie", "session=; expires=Thu, 01 Jan 1970 00:00:00 GMT")
                .set_body_json(serde_json::json!({
                    "json": {"errors": [["WRONG_PASSWORD", "wrong password", "passwd"]]}
                })),
        )
        .mount(&mock_server)
        .await;

    let recorder = Arc::new(Recorder::default());
    let auth = Authenticator::with_login_config(
        recorder.clone(),
        AuthConfig::with_credentials("alice", "wrong"),
        login_config(&mock_server),
    )
    .unwrap();

    let err = auth
        .intercept(RequestEnvelope::get("https://www.reddit.com/").unwrap())
        .await
        .unwrap_err();

    assert_eq!(err.to_string(), "Login failed: WRONG_PASSWORD: wrong password");
    assert_eq!(auth.session_cookie().await, None);
    assert!(recorder.requests().is_empty());
}

#[tokio::test]
async fn test_login_without_set_cookie_fails() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/login"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "json": {"errors": [], "data": {"modhash": "abc123"}}
        })))
        .mount(&mock_server)
        .await;

    let recorder = Arc::new(Recorder::default());
    let auth = Authenticator::with_login_config(
        recorder.clone(),
        AuthConfig::with_credentials("alice", "hunter2"),
        login_config(&mock_server),
    )
    .unwrap();

    let mut request = RequestEnvelope::get("https://www.reddit.com/").unwrap();
    let err = auth.authenticate(&mut request).await.unwrap_err();

    assert!(err.is_login_failed());
    assert!(request.header_str("cookie").is_none());
    assert!(request.context.modhash().is_none());
    assert_eq!(auth.session().await, SessionState::default());
}

#[test]
fn test_authenticator_debug_hides_secrets() {
    let recorder = Arc::new(Recorder::default());
    let auth = Authenticator::new(
        recorder,
        AuthConfig::with_credentials("alice", "hunter2"),
    )
    .unwrap();

    let debug = format!("{auth:?}");
    assert!(debug.contains("Authenticator"));
    assert!(debug.contains("ssl.reddit.com"));
    assert!(!debug.contains("hunter2"));
}
