use std::path::PathBuf;
use std::time::Duration;

use clap::Args;

use crate::auth::callback::DEFAULT_CALLBACK_PORT;
use crate::auth::credentials::DEFAULT_CONTEXT;
use crate::auth::LoginSettings;

const APP_DIR: &str = ".consolectl";

/// Configuration for connecting to the console API
#[derive(Args, Clone, Debug)]
pub struct Config {
    /// Console URL (required)
    #[arg(short = 'u', long = "url", env = "CONSOLECTL_URL")]
    pub url: String,

    /// Application ID registered with the console for this CLI
    #[arg(long = "app-id", env = "CONSOLECTL_APP_ID", default_value = "consolectl")]
    pub app_id: String,

    /// Identity provider to log in with
    #[arg(long = "provider-id", env = "CONSOLECTL_PROVIDER_ID", default_value = "default")]
    pub provider_id: String,

    /// Context used to pick machine credentials
    #[arg(long = "context", env = "CONSOLECTL_CONTEXT", default_value = DEFAULT_CONTEXT)]
    pub context: String,

    /// Machine credentials file [default: ~/.consolectl/m2m.yaml]
    #[arg(long = "credentials-file", env = "CONSOLECTL_CREDENTIALS_FILE")]
    pub credentials_file: Option<PathBuf>,

    /// Token cache directory [default: ~/.consolectl/credentials]
    #[arg(long = "cache-dir", env = "CONSOLECTL_CACHE_DIR")]
    pub cache_dir: Option<PathBuf>,

    /// Local port receiving the login redirect (0 picks a free port)
    #[arg(long = "callback-port", env = "CONSOLECTL_CALLBACK_PORT", default_value_t = DEFAULT_CALLBACK_PORT)]
    pub callback_port: u16,

    /// How long to wait for the browser login, e.g. `90s` or `5m`
    #[arg(
        long = "login-timeout",
        env = "CONSOLECTL_LOGIN_TIMEOUT",
        default_value = "120s",
        value_parser = humantime::parse_duration
    )]
    pub login_timeout: Duration,

    /// Increase log verbosity (-v, -vv, -vvv)
    #[arg(short = 'v', long = "verbose", action = clap::ArgAction::Count)]
    pub verbose: u8,
}

impl Config {
    /// Console URL without trailing slashes, used as the cache key
    pub fn base_url(&self) -> String {
        self.url.trim_end_matches('/').to_string()
    }

    pub fn cache_dir(&self) -> PathBuf {
        self.cache_dir
            .clone()
            .unwrap_or_else(|| app_dir().join("credentials"))
    }

    pub fn credentials_file(&self) -> PathBuf {
        self.credentials_file
            .clone()
            .unwrap_or_else(|| app_dir().join("m2m.yaml"))
    }

    pub fn login_settings(&self) -> LoginSettings {
        let mut settings = LoginSettings::new(&self.base_url(), &self.app_id, &self.provider_id);
        settings.callback_port = self.callback_port;
        settings.timeout = self.login_timeout;
        settings
    }
}

fn app_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIR)
}
