use std::time::Duration;

use reqwest::{Client, RequestBuilder};
use serde::Serialize;
use tracing::debug;

use super::credentials::BasicCredentials;
use super::error::AuthError;
use super::token::TokenSet;

pub const TOKEN_PATH: &str = "/api/oauth/token";

#[derive(Serialize)]
struct CodeRequest<'a> {
    code: &'a str,
    state: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GrantRequest<'a> {
    grant_type: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    refresh_token: Option<&'a str>,
}

/// Client for the console's token endpoint.
///
/// Every call is single-shot: failures are returned as-is and never retried.
#[derive(Debug, Clone)]
pub struct TokenClient {
    client: Client,
    token_url: String,
}

impl TokenClient {
    pub fn new(endpoint: &str) -> Self {
        Self {
            client: Client::builder()
                .timeout(Duration::from_secs(30))
                .build()
                .unwrap_or_else(|_| Client::new()),
            token_url: build_token_url(endpoint),
        }
    }

    /// Trade an authorization code from the interactive flow for tokens.
    pub async fn exchange_authorization_code(
        &self,
        provider_id: &str,
        code: &str,
        state: &str,
    ) -> Result<TokenSet, AuthError> {
        debug!(provider_id, "exchanging authorization code");
        let request = self
            .client
            .post(&self.token_url)
            .query(&[("providerId", provider_id)])
            .json(&CodeRequest { code, state });
        self.send(request).await
    }

    /// Client-credentials grant for machine accounts.
    pub async fn exchange_client_credentials(
        &self,
        credentials: &BasicCredentials,
    ) -> Result<TokenSet, AuthError> {
        debug!(client_id = %credentials.client_id, "exchanging client credentials");
        let request = self
            .client
            .post(&self.token_url)
            .basic_auth(&credentials.client_id, Some(&credentials.client_secret))
            .json(&GrantRequest {
                grant_type: "client_credentials",
                refresh_token: None,
            });
        self.send(request).await
    }

    pub async fn refresh(&self, refresh_token: &str) -> Result<TokenSet, AuthError> {
        debug!("refreshing access token");
        let request = self.client.post(&self.token_url).json(&GrantRequest {
            grant_type: "refresh_token",
            refresh_token: Some(refresh_token),
        });
        self.send(request).await
    }

    async fn send(&self, request: RequestBuilder) -> Result<TokenSet, AuthError> {
        let response = request.send().await?;
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(AuthError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        serde_json::from_str(&body).map_err(|e| AuthError::parse("token response", e))
    }
}

/// Build the token URL from the console base URL
pub fn build_token_url(endpoint: &str) -> String {
    format!("{}{}", endpoint.trim_end_matches('/'), TOKEN_PATH)
}
