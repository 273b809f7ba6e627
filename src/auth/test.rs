use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::{STANDARD, URL_SAFE_NO_PAD};
use serde_json::json;
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;
use url::Url;
use wiremock::matchers::{any, body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use super::browser::{Browser, RedirectBrowser};
use super::cache::{TokenCache, cache_key};
use super::credentials::{BasicCredentials, JwtCredentials, MachineCredentials};
use super::error::AuthError;
use super::exchange::TokenClient;
use super::flow::{LoginFlow, LoginSettings};
use super::session::{Authenticator, SessionStatus};
use super::token::{TokenSet, unix_now};

/// Browser that only counts how often it was asked to open something
#[derive(Clone, Default)]
struct RecordingBrowser {
    opened: Arc<AtomicUsize>,
}

#[async_trait]
impl Browser for RecordingBrowser {
    async fn open(&self, _url: &Url) -> Result<(), AuthError> {
        self.opened.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

struct BrokenBrowser;

#[async_trait]
impl Browser for BrokenBrowser {
    async fn open(&self, _url: &Url) -> Result<(), AuthError> {
        Err(AuthError::Open("no display".into()))
    }
}

struct Harness {
    server: MockServer,
    settings: LoginSettings,
    cache: TokenCache,
    client: TokenClient,
    dir: TempDir,
}

async fn harness() -> Harness {
    let server = MockServer::start().await;
    let mut settings = LoginSettings::new(&server.uri(), "consolectl", "github");
    settings.callback_port = 0;
    settings.timeout = Duration::from_secs(5);

    let dir = tempfile::tempdir().unwrap();
    let cache = TokenCache::new(dir.path().join("credentials"));
    let client = TokenClient::new(&settings.endpoint);

    Harness {
        server,
        settings,
        cache,
        client,
        dir,
    }
}

impl Harness {
    fn flow<'a>(&'a self, browser: &'a dyn Browser) -> LoginFlow<'a> {
        LoginFlow {
            settings: &self.settings,
            client: &self.client,
            cache: &self.cache,
            browser,
        }
    }

    fn authenticator(&self, browser: Box<dyn Browser>) -> Authenticator {
        Authenticator::new(self.settings.clone(), self.cache.clone(), browser)
    }
}

fn issued_token() -> serde_json::Value {
    json!({"accessToken": "AT", "refreshToken": "RT", "expiresAt": 9999999999i64})
}

#[tokio::test]
async fn interactive_login_exchanges_code_and_caches_token() {
    let h = harness().await;

    Mock::given(method("POST"))
        .and(path("/api/oauth/token"))
        .and(query_param("providerId", "github"))
        .and(body_json(json!({"code": "my-code", "state": "my-state"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(issued_token()))
        .expect(1)
        .mount(&h.server)
        .await;

    let browser = RedirectBrowser::new("my-code");
    let token = h
        .flow(&browser)
        .run(Some("my-state".into()), &CancellationToken::new())
        .await
        .unwrap();

    let expected = TokenSet {
        access_token: "AT".into(),
        refresh_token: Some("RT".into()),
        expires_at: 9_999_999_999,
    };
    assert_eq!(token, expected);

    let file = h.dir.path().join("credentials").join(cache_key(&h.settings.endpoint));
    assert!(file.exists());
    assert_eq!(h.cache.load(&h.settings.endpoint).unwrap(), expected);
}

#[tokio::test]
async fn forged_state_never_reaches_token_endpoint() {
    let h = harness().await;

    Mock::given(any())
        .respond_with(ResponseTemplate::new(200).set_body_json(issued_token()))
        .expect(0)
        .mount(&h.server)
        .await;

    let browser = RedirectBrowser::new("my-code").with_state("someone-else");
    let result = h
        .flow(&browser)
        .run(Some("my-state".into()), &CancellationToken::new())
        .await;

    assert!(matches!(result, Err(AuthError::StateMismatch)));
    assert!(matches!(
        h.cache.load(&h.settings.endpoint),
        Err(AuthError::NotFound)
    ));
}

#[tokio::test]
async fn busy_callback_port_aborts_before_browser_opens() {
    let mut h = harness().await;
    let taken = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    h.settings.callback_port = taken.local_addr().unwrap().port();

    let browser = RecordingBrowser::default();
    let result = h.flow(&browser).run(None, &CancellationToken::new()).await;

    assert!(matches!(result, Err(AuthError::PortUnavailable { .. })));
    assert_eq!(browser.opened.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn browser_failure_keeps_waiting_for_callback() {
    let mut h = harness().await;
    h.settings.timeout = Duration::from_millis(200);

    let result = h
        .flow(&BrokenBrowser)
        .run(None, &CancellationToken::new())
        .await;

    assert!(matches!(result, Err(AuthError::Timeout(_))));
}

#[tokio::test]
async fn cancelled_login_stops_waiting() {
    let h = harness().await;
    let cancel = CancellationToken::new();
    cancel.cancel();

    let browser = RecordingBrowser::default();
    let result = h.flow(&browser).run(None, &cancel).await;

    assert!(matches!(result, Err(AuthError::Cancelled)));
    assert_eq!(browser.opened.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn rejected_code_exchange_is_not_cached() {
    let h = harness().await;

    Mock::given(method("POST"))
        .and(path("/api/oauth/token"))
        .respond_with(ResponseTemplate::new(400).set_body_string("invalid code"))
        .expect(1)
        .mount(&h.server)
        .await;

    let browser = RedirectBrowser::new("stale-code");
    let result = h.flow(&browser).run(None, &CancellationToken::new()).await;

    match result {
        Err(AuthError::Rejected { status, body }) => {
            assert_eq!(status, 400);
            assert_eq!(body, "invalid code");
        }
        other => panic!("expected Rejected, got {other:?}"),
    }
    assert!(matches!(
        h.cache.load(&h.settings.endpoint),
        Err(AuthError::NotFound)
    ));
}

#[tokio::test]
async fn malformed_token_payload_is_a_parse_error() {
    let h = harness().await;

    Mock::given(method("POST"))
        .and(path("/api/oauth/token"))
        .respond_with(ResponseTemplate::new(200).set_body_string("{\"accessToken\":"))
        .mount(&h.server)
        .await;

    let result = h.client.exchange_authorization_code("github", "c", "s").await;
    assert!(matches!(result, Err(AuthError::Parse { .. })));
}

#[tokio::test]
async fn client_credentials_rejection_mentions_status() {
    let h = harness().await;
    let basic = format!("Basic {}", STANDARD.encode("ci-bot:s3cret"));

    Mock::given(method("POST"))
        .and(path("/api/oauth/token"))
        .and(header("authorization", basic.as_str()))
        .and(body_json(json!({"grantType": "client_credentials"})))
        .respond_with(ResponseTemplate::new(401).set_body_string("unknown client"))
        .expect(1)
        .mount(&h.server)
        .await;

    let credentials = MachineCredentials::Basic(BasicCredentials {
        client_id: "ci-bot".into(),
        client_secret: "s3cret".into(),
    });
    let auth = h
        .authenticator(Box::new(RecordingBrowser::default()))
        .with_machine_credentials("default", credentials);

    let err = auth.login_machine().await.unwrap_err();
    assert!(matches!(err, AuthError::Rejected { status: 401, .. }));
    assert!(err.to_string().contains("401"));
    assert!(matches!(
        h.cache.load(&h.settings.endpoint),
        Err(AuthError::NotFound)
    ));
}

#[tokio::test]
async fn client_credentials_success_is_cached() {
    let h = harness().await;

    Mock::given(method("POST"))
        .and(path("/api/oauth/token"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"accessToken": "M2M", "expiresAt": 9999999999i64})),
        )
        .expect(1)
        .mount(&h.server)
        .await;

    let credentials = MachineCredentials::Basic(BasicCredentials {
        client_id: "ci-bot".into(),
        client_secret: "s3cret".into(),
    });
    let browser = RecordingBrowser::default();
    let auth = h
        .authenticator(Box::new(browser.clone()))
        .with_machine_credentials("default", credentials);

    let token = auth.token().await.unwrap();
    assert_eq!(token.access_token, "M2M");
    assert_eq!(token.refresh_token, None);
    assert_eq!(browser.opened.load(Ordering::SeqCst), 0);
    assert_eq!(h.cache.load(&h.settings.endpoint).unwrap(), token);
}

#[tokio::test]
async fn cached_token_is_used_without_network() {
    let h = harness().await;
    Mock::given(any())
        .respond_with(ResponseTemplate::new(500))
        .expect(0)
        .mount(&h.server)
        .await;

    let cached = TokenSet {
        access_token: "cached".into(),
        refresh_token: None,
        expires_at: unix_now() + 600,
    };
    h.cache.store(&h.settings.endpoint, &cached).unwrap();

    let auth = h.authenticator(Box::new(BrokenBrowser));
    assert_eq!(auth.token().await.unwrap(), cached);
    assert!(matches!(auth.status(), SessionStatus::Valid(_)));
}

#[tokio::test]
async fn expired_token_is_refreshed() {
    let h = harness().await;

    Mock::given(method("POST"))
        .and(path("/api/oauth/token"))
        .and(body_json(
            json!({"grantType": "refresh_token", "refreshToken": "old-rt"}),
        ))
        .respond_with(ResponseTemplate::new(200).set_body_json(issued_token()))
        .expect(1)
        .mount(&h.server)
        .await;

    let expired = TokenSet {
        access_token: "old".into(),
        refresh_token: Some("old-rt".into()),
        expires_at: unix_now() - 1,
    };
    h.cache.store(&h.settings.endpoint, &expired).unwrap();

    let auth = h.authenticator(Box::new(BrokenBrowser));
    assert!(matches!(
        auth.status(),
        SessionStatus::Expired { refreshable: true }
    ));

    let token = auth.token().await.unwrap();
    assert_eq!(token.access_token, "AT");
    assert_eq!(h.cache.load(&h.settings.endpoint).unwrap(), token);
}

#[tokio::test]
async fn jwt_credentials_are_cached_as_is() {
    let h = harness().await;
    let jwt = format!(
        "{}.{}.sig",
        URL_SAFE_NO_PAD.encode(r#"{"alg":"RS256"}"#),
        URL_SAFE_NO_PAD.encode(format!(r#"{{"exp":{}}}"#, unix_now() + 600))
    );

    let auth = h
        .authenticator(Box::new(BrokenBrowser))
        .with_machine_credentials(
            "ci",
            MachineCredentials::Jwt(JwtCredentials { token: jwt.clone() }),
        );

    let token = auth.token().await.unwrap();
    assert_eq!(token.access_token, jwt);
    assert_eq!(h.cache.load(&h.settings.endpoint).unwrap(), token);
}

#[tokio::test]
async fn logout_removes_cached_token() {
    let h = harness().await;
    let auth = h.authenticator(Box::new(BrokenBrowser));

    h.cache
        .store(
            &h.settings.endpoint,
            &TokenSet {
                access_token: "AT".into(),
                refresh_token: None,
                expires_at: unix_now() + 60,
            },
        )
        .unwrap();

    assert!(auth.logout().unwrap());
    assert!(matches!(auth.status(), SessionStatus::LoggedOut));
}

#[tokio::test]
async fn corrupt_cache_entry_is_replaced_by_new_login() {
    let h = harness().await;

    Mock::given(method("POST"))
        .and(path("/api/oauth/token"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"accessToken": "M2M", "expiresAt": 9999999999i64})),
        )
        .expect(1)
        .mount(&h.server)
        .await;

    let cache_file = h.cache.path_for(&h.settings.endpoint);
    std::fs::create_dir_all(cache_file.parent().unwrap()).unwrap();
    std::fs::write(&cache_file, "{\"accessToken\": ").unwrap();

    let credentials = MachineCredentials::Basic(BasicCredentials {
        client_id: "ci-bot".into(),
        client_secret: "s3cret".into(),
    });
    let auth = h
        .authenticator(Box::new(BrokenBrowser))
        .with_machine_credentials("default", credentials);
    assert!(matches!(auth.status(), SessionStatus::Unreadable(AuthError::Parse { .. })));

    let token = auth.token().await.unwrap();
    assert_eq!(token.access_token, "M2M");
    assert_eq!(h.cache.load(&h.settings.endpoint).unwrap(), token);
    assert!(matches!(auth.status(), SessionStatus::Valid(_)));
}

#[tokio::test]
async fn shared_cancellation_aborts_interactive_login() {
    let h = harness().await;
    Mock::given(any())
        .respond_with(ResponseTemplate::new(500))
        .expect(0)
        .mount(&h.server)
        .await;

    let interrupted = CancellationToken::new();
    let browser = RecordingBrowser::default();
    let auth = h
        .authenticator(Box::new(browser.clone()))
        .with_cancellation(interrupted.clone());

    interrupted.cancel();
    let result = auth.token().await;

    assert!(matches!(result, Err(AuthError::Cancelled)));
    assert!(matches!(auth.status(), SessionStatus::LoggedOut));
}
