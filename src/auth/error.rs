use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum AuthError {
    #[error("No cached token for this endpoint")]
    NotFound,

    /// The cached token is past its expiry. Only the refresh token survives,
    /// the stale access token is never handed out.
    #[error("Cached token has expired")]
    Expired { refresh_token: Option<String> },

    #[error("Failed to parse {context}: {message}")]
    Parse { context: String, message: String },

    #[error(
        "Callback port {port} is unavailable ({source}). Is another consolectl login running?"
    )]
    PortUnavailable {
        port: u16,
        #[source]
        source: std::io::Error,
    },

    #[error("OAuth state mismatch: the callback does not belong to this login attempt")]
    StateMismatch,

    #[error("Token endpoint rejected the request with HTTP {status}: {body}")]
    Rejected { status: u16, body: String },

    #[error("Failed to open browser: {0}")]
    Open(String),

    #[error("Failed to connect to token endpoint: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Login was not completed within {}", humantime::format_duration(*.0))]
    Timeout(Duration),

    #[error("Login cancelled")]
    Cancelled,

    #[error("Authorization was denied by the provider: {0}")]
    Denied(String),

    #[error("Credential file error at {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid machine credentials for context '{context}': {reason}")]
    Credentials { context: String, reason: String },

    #[error("No machine credentials for context '{0}' and no 'default' entry")]
    NoCredentials(String),

    #[error("Invalid URL '{url}': {source}")]
    Url {
        url: String,
        #[source]
        source: url::ParseError,
    },
}

impl AuthError {
    pub(crate) fn parse(context: impl Into<String>, err: impl std::fmt::Display) -> Self {
        AuthError::Parse {
            context: context.into(),
            message: err.to_string(),
        }
    }

    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        AuthError::Io {
            path: path.into(),
            source,
        }
    }
}
