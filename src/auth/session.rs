use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::browser::Browser;
use super::cache::TokenCache;
use super::credentials::MachineCredentials;
use super::error::AuthError;
use super::exchange::TokenClient;
use super::flow::{LoginFlow, LoginSettings};
use super::token::TokenSet;

/// Cache state as reported by `auth status`.
#[derive(Debug)]
pub enum SessionStatus {
    Valid(TokenSet),
    Expired { refreshable: bool },
    LoggedOut,
    Unreadable(AuthError),
}

/// Hands out valid tokens for one endpoint, logging in when needed.
pub struct Authenticator {
    settings: LoginSettings,
    cache: TokenCache,
    client: TokenClient,
    browser: Box<dyn Browser>,
    /// Context name and the machine credentials resolved for it.
    machine: Option<(String, MachineCredentials)>,
    /// Aborts an interactive login that is waiting for the browser.
    cancel: CancellationToken,
}

impl Authenticator {
    pub fn new(settings: LoginSettings, cache: TokenCache, browser: Box<dyn Browser>) -> Self {
        let client = TokenClient::new(&settings.endpoint);
        Self {
            settings,
            cache,
            client,
            browser,
            machine: None,
            cancel: CancellationToken::new(),
        }
    }

    /// Log in with `credentials` instead of the browser.
    pub fn with_machine_credentials(
        mut self,
        context: impl Into<String>,
        credentials: MachineCredentials,
    ) -> Self {
        self.machine = Some((context.into(), credentials));
        self
    }

    /// Share `cancel` with the caller, typically the process-wide Ctrl-C handler.
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn endpoint(&self) -> &str {
        &self.settings.endpoint
    }

    pub fn cache(&self) -> &TokenCache {
        &self.cache
    }

    pub fn machine_context(&self) -> Option<&str> {
        self.machine.as_ref().map(|(context, _)| context.as_str())
    }

    /// A valid token: cached, refreshed, or freshly obtained.
    pub async fn token(&self) -> Result<TokenSet, AuthError> {
        match self.cache.load(self.endpoint()) {
            Ok(token) => {
                debug!("using cached token");
                return Ok(token);
            }
            Err(AuthError::NotFound) => debug!("no cached token"),
            Err(AuthError::Expired {
                refresh_token: Some(refresh_token),
            }) => match self.refresh(&refresh_token).await {
                Ok(token) => return Ok(token),
                Err(e) => warn!("token refresh failed, logging in again: {e}"),
            },
            Err(AuthError::Expired {
                refresh_token: None,
            }) => debug!("cached token expired"),
            Err(e @ AuthError::Parse { .. }) => warn!("{e}; logging in again"),
            Err(e) => return Err(e),
        }

        self.login().await
    }

    /// Replace `current` after the API rejected it.
    pub async fn renew(&self, current: &TokenSet) -> Result<TokenSet, AuthError> {
        if let Some(refresh_token) = &current.refresh_token {
            match self.refresh(refresh_token).await {
                Ok(token) => return Ok(token),
                Err(e) => warn!("token refresh failed, logging in again: {e}"),
            }
        }
        self.login().await
    }

    /// Obtain a new token without consulting the cache.
    pub async fn login(&self) -> Result<TokenSet, AuthError> {
        match self.machine {
            Some(_) => self.login_machine().await,
            None => self.login_interactive(None).await,
        }
    }

    /// Machine login with the configured credentials.
    pub async fn login_machine(&self) -> Result<TokenSet, AuthError> {
        let (context, credentials) = self
            .machine
            .as_ref()
            .ok_or_else(|| AuthError::NoCredentials(String::from("(none configured)")))?;

        let token = match credentials {
            MachineCredentials::Basic(basic) => {
                self.client.exchange_client_credentials(basic).await?
            }
            MachineCredentials::Jwt(jwt) => {
                let token = jwt.to_token_set()?;
                if !token.is_valid() {
                    return Err(AuthError::Credentials {
                        context: context.clone(),
                        reason: "jwt has expired".to_string(),
                    });
                }
                token
            }
        };
        self.cache.store(self.endpoint(), &token)?;
        info!(context = %context, "machine login complete");
        Ok(token)
    }

    /// Interactive browser login. Cancelling the shared token aborts the wait.
    pub async fn login_interactive(&self, state: Option<String>) -> Result<TokenSet, AuthError> {
        LoginFlow {
            settings: &self.settings,
            client: &self.client,
            cache: &self.cache,
            browser: self.browser.as_ref(),
        }
        .run(state, &self.cancel)
        .await
    }

    pub async fn refresh(&self, refresh_token: &str) -> Result<TokenSet, AuthError> {
        let token = self.client.refresh(refresh_token).await?;
        self.cache.store(self.endpoint(), &token)?;
        info!("access token refreshed");
        Ok(token)
    }

    pub fn status(&self) -> SessionStatus {
        match self.cache.load(self.endpoint()) {
            Ok(token) => SessionStatus::Valid(token),
            Err(AuthError::NotFound) => SessionStatus::LoggedOut,
            Err(AuthError::Expired { refresh_token }) => SessionStatus::Expired {
                refreshable: refresh_token.is_some(),
            },
            Err(e) => SessionStatus::Unreadable(e),
        }
    }

    pub fn logout(&self) -> Result<bool, AuthError> {
        self.cache.remove(self.endpoint())
    }
}
