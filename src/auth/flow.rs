use std::time::Duration;

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use rand::Rng;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use url::Url;

use super::browser::Browser;
use super::cache::TokenCache;
use super::callback::{CallbackListener, DEFAULT_CALLBACK_PORT};
use super::error::AuthError;
use super::exchange::TokenClient;
use super::token::TokenSet;

pub const AUTHORIZE_PATH: &str = "/api/authorize";
pub const DEFAULT_LOGIN_TIMEOUT: Duration = Duration::from_secs(120);

/// Where and how to run an interactive login.
#[derive(Debug, Clone)]
pub struct LoginSettings {
    /// Normalized console base URL; also the cache key input.
    pub endpoint: String,
    pub app_id: String,
    pub provider_id: String,
    pub callback_port: u16,
    pub timeout: Duration,
}

impl LoginSettings {
    pub fn new(endpoint: &str, app_id: &str, provider_id: &str) -> Self {
        Self {
            endpoint: endpoint.trim_end_matches('/').to_string(),
            app_id: app_id.to_string(),
            provider_id: provider_id.to_string(),
            callback_port: DEFAULT_CALLBACK_PORT,
            timeout: DEFAULT_LOGIN_TIMEOUT,
        }
    }

    /// Browser URL for the provider's consent page.
    pub fn authorize_url(&self, state: &str, redirect_uri: &str) -> Result<Url, AuthError> {
        let raw = format!("{}{}", self.endpoint, AUTHORIZE_PATH);
        let mut url = Url::parse(&raw).map_err(|source| AuthError::Url { url: raw, source })?;
        url.query_pairs_mut()
            .append_pair("appId", &self.app_id)
            .append_pair("providerId", &self.provider_id)
            .append_pair("state", state)
            .append_pair("redirectUri", redirect_uri);
        Ok(url)
    }
}

/// Anti-CSRF nonce: 32 random bytes, base64url without padding.
pub fn generate_state() -> String {
    let mut bytes = [0u8; 32];
    rand::rng().fill(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

/// What we sent and what came back, held only until verified.
#[derive(Debug)]
pub struct PendingAuthorization {
    pub expected_state: String,
    pub received_code: String,
    pub received_state: String,
}

impl PendingAuthorization {
    /// Yields the code only when the returned state matches ours.
    pub fn verify(self) -> Result<(String, String), AuthError> {
        if self.received_state != self.expected_state {
            return Err(AuthError::StateMismatch);
        }
        Ok((self.received_code, self.received_state))
    }
}

/// One interactive login: listener, browser, callback, exchange, cache.
pub struct LoginFlow<'a> {
    pub settings: &'a LoginSettings,
    pub client: &'a TokenClient,
    pub cache: &'a TokenCache,
    pub browser: &'a dyn Browser,
}

impl LoginFlow<'_> {
    /// Run the flow. `state` is generated when not supplied.
    pub async fn run(
        &self,
        state: Option<String>,
        cancel: &CancellationToken,
    ) -> Result<TokenSet, AuthError> {
        let expected_state = state.unwrap_or_else(generate_state);

        // Must be accepting before the browser can possibly redirect.
        let listener = CallbackListener::bind(self.settings.callback_port).await?;
        let authorize_url = self
            .settings
            .authorize_url(&expected_state, &listener.redirect_uri())?;

        debug!(port = listener.port(), "waiting for login redirect");
        info!("opening browser for login");
        let opened = match self.browser.open(&authorize_url).await {
            Ok(()) => true,
            Err(e) => {
                warn!("{e}");
                false
            }
        };
        eprint!("{}", login_prompt(&authorize_url, opened));

        let callback = listener.wait(self.settings.timeout, cancel).await?;
        if let Some(error) = callback.error {
            return Err(AuthError::Denied(error));
        }

        let (code, state) = PendingAuthorization {
            expected_state,
            received_code: callback.code,
            received_state: callback.state,
        }
        .verify()?;

        let token = self
            .client
            .exchange_authorization_code(&self.settings.provider_id, &code, &state)
            .await?;
        self.cache.store(&self.settings.endpoint, &token)?;

        info!("login complete");
        Ok(token)
    }
}

/// What the user sees on stderr while the login waits. The URL is always
/// shown since a launched browser may still never appear.
pub fn login_prompt(authorize_url: &Url, opened: bool) -> String {
    if opened {
        format!("Opened a browser to log in. If nothing appears, visit:\n\n  {authorize_url}\n\n")
    } else {
        format!("Open this URL in your browser to continue:\n\n  {authorize_url}\n\n")
    }
}
