use clap::Subcommand;

use super::fail;
use crate::Context;
use crate::api::ListParams;
use crate::api::deployment::{self, Deployment};
use crate::output::{self, OutputFormat, Tabular, cell};

#[derive(Subcommand)]
pub enum DeploymentCommands {
    /// List the deployments of a project
    List {
        /// Project owning the deployments
        #[arg(short = 'p', long = "project")]
        project: String,
        /// Maximum number of deployments to return
        #[arg(long)]
        limit: Option<u32>,
        /// Number of deployments to skip
        #[arg(long)]
        offset: Option<u32>,
        #[arg(short = 'o', long = "output", value_enum, default_value_t)]
        output: OutputFormat,
    },
    /// Show one deployment
    Get {
        id: String,
        #[arg(short = 'o', long = "output", value_enum, default_value_t)]
        output: OutputFormat,
    },
    /// Delete one or more deployments
    Delete {
        #[arg(required = true)]
        ids: Vec<String>,
    },
}

impl Tabular for Deployment {
    const HEADERS: &'static [&'static str] =
        &["ID", "NAME", "STATUS", "REPLICAS", "IMAGE", "UPDATED"];

    fn id(&self) -> &str {
        &self.id
    }

    fn row(&self) -> Vec<String> {
        vec![
            self.id.clone(),
            self.name.clone(),
            cell(&self.status),
            cell(&self.replicas),
            cell(&self.image),
            cell(&self.updated_at),
        ]
    }
}

impl DeploymentCommands {
    pub async fn run(&self, ctx: &Context) {
        match self {
            DeploymentCommands::List {
                project,
                limit,
                offset,
                output,
            } => {
                let params = ListParams {
                    limit: *limit,
                    offset: *offset,
                };
                match deployment::list(&ctx.client, project, &params).await {
                    Ok(page) => {
                        if let Err(e) = output::print(&page.items, *output) {
                            fail(e);
                        }
                    }
                    Err(e) => fail(e),
                }
            }
            DeploymentCommands::Get { id, output } => {
                match deployment::get(&ctx.client, id).await {
                    Ok(deployment) => {
                        if let Err(e) = output::print(&[deployment], *output) {
                            fail(e);
                        }
                    }
                    Err(e) => fail(e),
                }
            }
            DeploymentCommands::Delete { ids } => {
                let mut failed = 0;
                for id in ids {
                    match deployment::delete(&ctx.client, id).await {
                        Ok(()) => println!("Deleted deployment {}", id),
                        Err(e) => {
                            eprintln!("Error deleting {}: {}", id, e);
                            failed += 1;
                        }
                    }
                }
                if failed > 0 {
                    fail(format!("{} of {} deletions failed", failed, ids.len()));
                }
            }
        }
    }
}
