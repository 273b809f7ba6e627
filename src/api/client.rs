use std::sync::Arc;
use std::time::Duration;

use reqwest::{Client, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use thiserror::Error;
use tokio::sync::RwLock;
use tokio::time::sleep;
use tracing::{info, warn};

use crate::auth::{AuthError, Authenticator, TokenSet};

const MAX_RETRIES: u32 = 3;
const RETRY_DELAY: Duration = Duration::from_millis(1000);

#[derive(Error, Debug, Clone)]
pub enum ApiError {
    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("HTTP {0}: {1}")]
    HttpError(u16, String),

    #[error("HTTP 404: {0} not found")]
    NotFound(String),

    #[error("HTTP 403: You are not allowed to access this resource")]
    Forbidden,

    #[error("HTTP 401: Please check your authentication credentials")]
    Unauthorized,

    #[error("HTTP 401: Token rejected")]
    TokenExpired,

    #[error("HTTP {0}: Server timeout")]
    Timeout(u16),

    #[error("HTTP {0}: {1}")]
    ServerError(u16, String),

    #[error("Authentication failed: {0}")]
    Authentication(String),

    #[error("Unexpected response from console: {0}")]
    InvalidResponse(String),
}

impl From<reqwest::Error> for ApiError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            ApiError::Timeout(0) // no HTTP response at all
        } else if e.is_connect() {
            ApiError::NetworkError(format!("Connection failed: {}", e))
        } else {
            ApiError::NetworkError(e.to_string())
        }
    }
}

impl From<AuthError> for ApiError {
    fn from(e: AuthError) -> Self {
        ApiError::Authentication(e.to_string())
    }
}

/// Console API client with retry and token renewal.
///
/// The first request obtains a token from the [`Authenticator`]; a 401
/// triggers one renewal and a retry with the new token.
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
    auth: Arc<Authenticator>,
    token: Arc<RwLock<Option<TokenSet>>>,
    retry_delay: Duration,
}

impl ApiClient {
    pub fn new(base_url: &str, auth: Arc<Authenticator>) -> Self {
        let base_url = base_url.trim_end_matches('/').to_string();

        Self {
            client: Client::builder()
                .timeout(Duration::from_secs(60))
                .build()
                .unwrap_or_else(|_| Client::new()),
            base_url,
            auth,
            token: Arc::new(RwLock::new(None)),
            retry_delay: RETRY_DELAY,
        }
    }

    pub fn with_retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = delay;
        self
    }

    /// Build the full API URL
    pub fn url(&self, path: &str) -> String {
        format!("{}/api{}", self.base_url, path)
    }

    async fn current_token(&self) -> Result<TokenSet, ApiError> {
        if let Some(token) = self.token.read().await.as_ref().filter(|t| t.is_valid()) {
            return Ok(token.clone());
        }

        let mut slot = self.token.write().await;
        if let Some(token) = slot.as_ref().filter(|t| t.is_valid()) {
            return Ok(token.clone());
        }
        let token = self.auth.token().await?;
        *slot = Some(token.clone());
        Ok(token)
    }

    /// Attach the bearer token, logging in first if needed
    async fn authorize(&self, request: RequestBuilder) -> Result<RequestBuilder, ApiError> {
        let token = self.current_token().await?;
        Ok(request.bearer_auth(&token.access_token))
    }

    /// Replace the rejected token
    async fn renew_token(&self) -> Result<(), ApiError> {
        let mut slot = self.token.write().await;
        let rejected = slot.clone().ok_or(ApiError::Unauthorized)?;

        info!("token rejected by console, renewing");
        match self.auth.renew(&rejected).await {
            Ok(token) => {
                *slot = Some(token);
                Ok(())
            }
            Err(e) => {
                warn!("failed to renew token: {e}");
                Err(e.into())
            }
        }
    }

    /// Perform a GET request with retry logic
    pub async fn get(&self, path: &str) -> Result<String, ApiError> {
        self.execute_with_retry(|| async {
            let request = self.client.get(self.url(path));
            let response = self.authorize(request).await?.send().await?;
            self.handle_response(response).await
        })
        .await
    }

    /// Perform a GET request with query parameters and retry logic
    pub async fn get_with_query<T: serde::Serialize + ?Sized + Sync>(
        &self,
        path: &str,
        query: &T,
    ) -> Result<String, ApiError> {
        self.execute_with_retry(|| async {
            let request = self.client.get(self.url(path)).query(query);
            let response = self.authorize(request).await?.send().await?;
            self.handle_response(response).await
        })
        .await
    }

    /// Perform a DELETE request with retry logic
    pub async fn delete(&self, path: &str) -> Result<String, ApiError> {
        self.execute_with_retry(|| async {
            let request = self.client.delete(self.url(path));
            let response = self.authorize(request).await?.send().await?;
            self.handle_response(response).await
        })
        .await
    }

    /// GET and decode the JSON body
    pub async fn get_json<R: DeserializeOwned>(&self, path: &str) -> Result<R, ApiError> {
        let body = self.get(path).await?;
        decode(&body)
    }

    /// GET with query parameters and decode the JSON body
    pub async fn get_json_with_query<R, T>(&self, path: &str, query: &T) -> Result<R, ApiError>
    where
        R: DeserializeOwned,
        T: serde::Serialize + ?Sized + Sync,
    {
        let body = self.get_with_query(path, query).await?;
        decode(&body)
    }

    /// Execute a request with retry logic for timeouts and token renewal
    async fn execute_with_retry<F, Fut>(&self, f: F) -> Result<String, ApiError>
    where
        F: Fn() -> Fut,
        Fut: std::future::Future<Output = Result<String, ApiError>>,
    {
        let mut last_error = ApiError::NetworkError("No attempts made".to_string());
        let mut token_renewed = false;
        let mut attempt = 0;

        while attempt < MAX_RETRIES {
            match f().await {
                Ok(result) => return Ok(result),
                Err(ApiError::TokenExpired) => {
                    if !token_renewed {
                        self.renew_token().await?;
                        token_renewed = true;
                        continue; // Retry with new token, not counted as an attempt
                    }
                    return Err(ApiError::Unauthorized);
                }
                Err(ref e @ ApiError::Timeout(_))
                | Err(ref e @ ApiError::ServerError(_, _))
                | Err(ref e @ ApiError::NetworkError(_))
                    if attempt < MAX_RETRIES - 1 =>
                {
                    let delay = self.retry_delay * (attempt + 1);
                    warn!(
                        "{}, retrying in {}ms... (attempt {}/{})",
                        e,
                        delay.as_millis(),
                        attempt + 1,
                        MAX_RETRIES
                    );
                    sleep(delay).await;
                    last_error = e.clone();
                }
                Err(e) => return Err(e),
            }
            attempt += 1;
        }

        Err(last_error)
    }

    async fn handle_response(&self, response: reqwest::Response) -> Result<String, ApiError> {
        let status = response.status();
        let status_code = status.as_u16();

        if status.is_success() {
            Ok(response.text().await?)
        } else if status == StatusCode::NOT_FOUND {
            Err(ApiError::NotFound(response.url().path().to_string()))
        } else if status == StatusCode::UNAUTHORIZED {
            Err(ApiError::TokenExpired)
        } else if status == StatusCode::FORBIDDEN {
            Err(ApiError::Forbidden)
        } else if status == StatusCode::GATEWAY_TIMEOUT || status == StatusCode::REQUEST_TIMEOUT {
            Err(ApiError::Timeout(status_code))
        } else {
            let body = response.text().await.unwrap_or_default();
            if status.is_server_error() {
                Err(ApiError::ServerError(status_code, body))
            } else {
                Err(ApiError::HttpError(status_code, body))
            }
        }
    }
}

fn decode<R: DeserializeOwned>(body: &str) -> Result<R, ApiError> {
    serde_json::from_str(body).map_err(|e| ApiError::InvalidResponse(e.to_string()))
}
