mod api;
mod auth;
mod cli;
mod commands;
mod config;
mod logging;
mod output;

use std::process;
use std::sync::Arc;

use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use api::ApiClient;
use auth::{
    AuthError, Authenticator, CredentialsFile, MachineCredentials, SystemBrowser, TokenCache,
};
use cli::Cli;

/// Runtime context containing config, authenticator and API client
pub struct Context {
    pub config: config::Config,
    pub auth: Arc<Authenticator>,
    pub client: ApiClient,
    /// Why the machine credentials could not be used, if they were configured but broken.
    pub credentials_error: Option<AuthError>,
}

impl Context {
    fn new(config: config::Config, cancel: CancellationToken) -> Self {
        let cache = TokenCache::new(config.cache_dir());
        let mut auth = Authenticator::new(config.login_settings(), cache, Box::new(SystemBrowser))
            .with_cancellation(cancel);

        // Machine credentials replace the browser login when the file has an
        // entry for this context (or a default one).
        let mut credentials_error = None;
        match load_machine_credentials(&config) {
            Ok(Some(credentials)) => {
                debug!(context = %config.context, "using machine credentials");
                auth = auth.with_machine_credentials(config.context.clone(), credentials);
            }
            Ok(None) => {}
            Err(e) => {
                warn!("ignoring machine credentials: {e}");
                credentials_error = Some(e);
            }
        }

        let auth = Arc::new(auth);
        let client = ApiClient::new(&config.base_url(), Arc::clone(&auth));

        Self {
            config,
            auth,
            client,
            credentials_error,
        }
    }
}

fn load_machine_credentials(
    config: &config::Config,
) -> Result<Option<MachineCredentials>, AuthError> {
    let Some(file) = CredentialsFile::load(&config.credentials_file())? else {
        return Ok(None);
    };
    if file.lookup(&config.context).is_none() {
        return Ok(None);
    }
    file.resolve(&config.context).map(Some)
}

#[tokio::main]
async fn main() {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();
    logging::init(cli.config.verbose);

    // Sole SIGINT handler; once tokio registers it, it stays for the process.
    let interrupted = CancellationToken::new();
    tokio::spawn({
        let interrupted = interrupted.clone();
        async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                interrupted.cancel();
            }
        }
    });

    let ctx = Context::new(cli.config, interrupted.clone());

    tokio::select! {
        biased;
        _ = interrupted.cancelled() => {
            eprintln!("Error: {}", AuthError::Cancelled);
            process::exit(130);
        }
        _ = cli.command.run(&ctx) => {}
    }
}
