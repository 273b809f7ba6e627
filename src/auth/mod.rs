//! Login and token management for the console API.

pub mod browser;
pub mod cache;
pub mod callback;
pub mod credentials;
pub mod error;
pub mod exchange;
pub mod flow;
pub mod session;
pub mod token;

#[cfg(test)]
mod test;

pub use browser::{Browser, SystemBrowser};
pub use cache::TokenCache;
pub use credentials::{CredentialsFile, MachineCredentials};
pub use error::AuthError;
pub use flow::LoginSettings;
pub use session::{Authenticator, SessionStatus};
pub use token::TokenSet;
