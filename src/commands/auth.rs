use std::time::{Duration, SystemTime};

use clap::Subcommand;

use super::fail;
use crate::Context;
use crate::auth::{AuthError, SessionStatus};

#[derive(Subcommand)]
pub enum AuthCommands {
    /// Log in and cache a token for the console URL
    Login {
        /// Use the machine credentials of the current context instead of the browser
        #[arg(long)]
        machine: bool,
    },
    /// Forget the cached token for the console URL
    Logout {},
    /// Print a valid access token, logging in if needed
    Token {},
    /// Show whether a valid token is cached
    Status {},
}

impl AuthCommands {
    pub async fn run(&self, ctx: &Context) {
        match self {
            AuthCommands::Login { machine } => {
                let result = if *machine {
                    match (ctx.auth.machine_context(), &ctx.credentials_error) {
                        (Some(_), _) => ctx.auth.login_machine().await,
                        (None, Some(e)) => fail(e),
                        (None, None) => Err(AuthError::NoCredentials(ctx.config.context.clone())),
                    }
                } else {
                    ctx.auth.login_interactive(None).await
                };

                match result {
                    Ok(token) => println!(
                        "Logged in to {} (token valid for {})",
                        ctx.auth.endpoint(),
                        remaining(token.expires_at_time())
                    ),
                    Err(e) => fail(e),
                }
            }
            AuthCommands::Logout {} => match ctx.auth.logout() {
                Ok(true) => println!("Logged out of {}", ctx.auth.endpoint()),
                Ok(false) => println!("Not logged in to {}", ctx.auth.endpoint()),
                Err(e) => fail(e),
            },
            AuthCommands::Token {} => match ctx.auth.token().await {
                Ok(token) => println!("{}", token.access_token),
                Err(e) => fail(e),
            },
            AuthCommands::Status {} => {
                let endpoint = ctx.auth.endpoint();
                match ctx.auth.status() {
                    SessionStatus::Valid(token) => println!(
                        "Logged in to {} until {} ({} left)",
                        endpoint,
                        humantime::format_rfc3339_seconds(token.expires_at_time()),
                        remaining(token.expires_at_time())
                    ),
                    SessionStatus::Expired { refreshable } => println!(
                        "Token for {} has expired{}",
                        endpoint,
                        if refreshable {
                            "; it will be refreshed on next use"
                        } else {
                            "; run `consolectl auth login`"
                        }
                    ),
                    SessionStatus::LoggedOut => println!("Not logged in to {}", endpoint),
                    SessionStatus::Unreadable(e) => fail(format!(
                        "{} ({})",
                        e,
                        ctx.auth.cache().path_for(endpoint).display()
                    )),
                }
                if let Some(context) = ctx.auth.machine_context() {
                    println!("Machine credentials: context '{}'", context);
                }
            }
        }
    }
}

/// Time left until `expires`, rounded to seconds
fn remaining(expires: SystemTime) -> humantime::FormattedDuration {
    let left = expires
        .duration_since(SystemTime::now())
        .unwrap_or(Duration::ZERO);
    humantime::format_duration(Duration::from_secs(left.as_secs()))
}
