//! Machine-to-machine credentials, stored as a YAML mapping of context name
//! to credential record:
//!
//! ```yaml
//! default:
//!   type: basic
//!   basic:
//!     clientId: ci-bot
//!     clientSecret: s3cret
//! staging:
//!   type: jwt
//!   jwt:
//!     token: eyJhbGciOi...
//! ```

use std::collections::BTreeMap;
use std::fs;
use std::io::ErrorKind;
use std::path::Path;

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use serde::Deserialize;

use super::error::AuthError;
use super::token::TokenSet;

pub const DEFAULT_CONTEXT: &str = "default";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CredentialKind {
    Basic,
    Jwt,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CredentialRecord {
    #[serde(rename = "type")]
    pub kind: CredentialKind,
    #[serde(default)]
    pub basic: Option<BasicCredentials>,
    #[serde(default)]
    pub jwt: Option<JwtCredentials>,
}

#[derive(Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BasicCredentials {
    pub client_id: String,
    pub client_secret: String,
}

impl std::fmt::Debug for BasicCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BasicCredentials")
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .finish()
    }
}

#[derive(Clone, Deserialize)]
pub struct JwtCredentials {
    pub token: String,
}

impl std::fmt::Debug for JwtCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtCredentials")
            .field("token", &"<redacted>")
            .finish()
    }
}

/// Credentials resolved for one context.
#[derive(Debug, Clone)]
pub enum MachineCredentials {
    /// Exchanged at the token endpoint with HTTP basic auth.
    Basic(BasicCredentials),
    /// Pre-issued bearer token, used as-is until its `exp` claim.
    Jwt(JwtCredentials),
}

#[derive(Debug, Default, Clone, Deserialize)]
#[serde(transparent)]
pub struct CredentialsFile {
    contexts: BTreeMap<String, CredentialRecord>,
}

impl CredentialsFile {
    /// Read the credentials file. A missing file yields `None`.
    pub fn load(path: &Path) -> Result<Option<Self>, AuthError> {
        let contents = match fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(AuthError::io(path, e)),
        };
        Self::parse(&contents)
            .map(Some)
            .map_err(|e| AuthError::parse(format!("credentials file {}", path.display()), e))
    }

    pub fn parse(contents: &str) -> Result<Self, serde_yml::Error> {
        // An empty document deserializes to unit, not to a map.
        if contents.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yml::from_str(contents)
    }

    /// Look up `context`, falling back to the `default` entry.
    pub fn lookup(&self, context: &str) -> Option<(&str, &CredentialRecord)> {
        self.contexts
            .get_key_value(context)
            .or_else(|| self.contexts.get_key_value(DEFAULT_CONTEXT))
            .map(|(name, record)| (name.as_str(), record))
    }

    /// Resolve `context` into usable credentials.
    pub fn resolve(&self, context: &str) -> Result<MachineCredentials, AuthError> {
        let (name, record) = self
            .lookup(context)
            .ok_or_else(|| AuthError::NoCredentials(context.to_string()))?;
        record.resolve(name)
    }
}

impl CredentialRecord {
    fn resolve(&self, context: &str) -> Result<MachineCredentials, AuthError> {
        let invalid = |reason: &str| AuthError::Credentials {
            context: context.to_string(),
            reason: reason.to_string(),
        };

        match self.kind {
            CredentialKind::Basic => {
                let basic = self
                    .basic
                    .clone()
                    .ok_or_else(|| invalid("type is 'basic' but the 'basic' section is missing"))?;
                if basic.client_id.is_empty() || basic.client_secret.is_empty() {
                    return Err(invalid("clientId and clientSecret must not be empty"));
                }
                Ok(MachineCredentials::Basic(basic))
            }
            CredentialKind::Jwt => {
                let jwt = self
                    .jwt
                    .clone()
                    .ok_or_else(|| invalid("type is 'jwt' but the 'jwt' section is missing"))?;
                if jwt.token.is_empty() {
                    return Err(invalid("jwt token must not be empty"));
                }
                Ok(MachineCredentials::Jwt(jwt))
            }
        }
    }
}

#[derive(Deserialize)]
struct JwtClaims {
    exp: Option<i64>,
}

impl JwtCredentials {
    /// Wrap the pre-issued token in a [`TokenSet`], taking the expiry from
    /// its `exp` claim. The signature is not checked here; the console does
    /// that when the token is presented.
    pub fn to_token_set(&self) -> Result<TokenSet, AuthError> {
        let payload = self
            .token
            .split('.')
            .nth(1)
            .ok_or_else(|| AuthError::parse("jwt", "token is not in header.payload.signature form"))?;
        let bytes = URL_SAFE_NO_PAD
            .decode(payload.trim_end_matches('='))
            .map_err(|e| AuthError::parse("jwt payload", e))?;
        let claims: JwtClaims =
            serde_json::from_slice(&bytes).map_err(|e| AuthError::parse("jwt claims", e))?;
        let expires_at = claims
            .exp
            .ok_or_else(|| AuthError::parse("jwt claims", "missing 'exp' claim"))?;

        Ok(TokenSet {
            access_token: self.token.clone(),
            refresh_token: None,
            expires_at,
        })
    }
}
