use clap::Parser;

use crate::commands::Commands;
use crate::config::Config;

/// consolectl - manage companies, projects and deployments from the terminal
#[derive(Parser)]
#[command(name = "consolectl")]
#[command(about = "CLI for interacting with the console API", long_about = None)]
#[command(version)]
pub struct Cli {
    #[command(flatten)]
    pub config: Config,

    #[command(subcommand)]
    pub command: Commands,
}
