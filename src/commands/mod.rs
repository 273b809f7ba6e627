pub mod auth;
pub mod company;
pub mod deployment;
pub mod project;

use std::fmt::Display;
use std::process;

use clap::Subcommand;

use crate::Context;
pub use auth::AuthCommands;
pub use company::CompanyCommands;
pub use deployment::DeploymentCommands;
pub use project::ProjectCommands;

#[derive(Subcommand)]
pub enum Commands {
    /// Login, logout and token commands
    Auth {
        #[command(subcommand)]
        command: AuthCommands,
    },

    /// Company commands
    Company {
        #[command(subcommand)]
        command: CompanyCommands,
    },

    /// Project commands
    Project {
        #[command(subcommand)]
        command: ProjectCommands,
    },

    /// Deployment commands
    Deployment {
        #[command(subcommand)]
        command: DeploymentCommands,
    },
}

impl Commands {
    pub async fn run(&self, ctx: &Context) {
        match self {
            Commands::Auth { command } => command.run(ctx).await,
            Commands::Company { command } => command.run(ctx).await,
            Commands::Project { command } => command.run(ctx).await,
            Commands::Deployment { command } => command.run(ctx).await,
        }
    }
}

/// Print a single-line error and exit non-zero
fn fail(e: impl Display) -> ! {
    eprintln!("Error: {}", e);
    process::exit(1);
}
