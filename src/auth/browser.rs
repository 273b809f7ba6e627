use async_trait::async_trait;
use tracing::debug;
use url::Url;

use super::error::AuthError;

/// Presents the authorize URL to the user.
#[async_trait]
pub trait Browser: Send + Sync {
    /// Open `url`. Fails with [`AuthError::Open`] when no handler is
    /// available; callers fall back to printing the URL.
    async fn open(&self, url: &Url) -> Result<(), AuthError>;
}

/// Opens URLs with the platform's default handler.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemBrowser;

#[async_trait]
impl Browser for SystemBrowser {
    async fn open(&self, url: &Url) -> Result<(), AuthError> {
        debug!("opening browser");
        open::that_detached(url.as_str()).map_err(|e| AuthError::Open(e.to_string()))
    }
}

/// Plays the part of the identity provider: reads `state` and `redirectUri`
/// from the authorize URL and calls the redirect target directly.
#[cfg(test)]
#[derive(Debug, Clone)]
pub struct RedirectBrowser {
    pub code: String,
    /// Sent instead of the state from the authorize URL when set.
    pub state_override: Option<String>,
}

#[cfg(test)]
impl RedirectBrowser {
    pub fn new(code: &str) -> Self {
        Self {
            code: code.to_string(),
            state_override: None,
        }
    }

    pub fn with_state(mut self, state: &str) -> Self {
        self.state_override = Some(state.to_string());
        self
    }
}

#[cfg(test)]
#[async_trait]
impl Browser for RedirectBrowser {
    async fn open(&self, url: &Url) -> Result<(), AuthError> {
        let param = |name: &str| {
            url.query_pairs()
                .find(|(key, _)| key == name)
                .map(|(_, value)| value.into_owned())
        };
        let redirect = param("redirectUri")
            .ok_or_else(|| AuthError::Open("authorize URL has no redirectUri".into()))?;
        let state = match &self.state_override {
            Some(state) => state.clone(),
            None => param("state").unwrap_or_default(),
        };

        let response = reqwest::Client::new()
            .get(&redirect)
            .query(&[("code", self.code.as_str()), ("state", state.as_str())])
            .send()
            .await
            .map_err(|e| AuthError::Open(e.to_string()))?;
        if !response.status().is_success() {
            return Err(AuthError::Open(format!(
                "callback answered HTTP {}",
                response.status()
            )));
        }
        Ok(())
    }
}
