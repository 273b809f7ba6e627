use clap::Subcommand;

use super::fail;
use crate::Context;
use crate::api::project::{self, Project, ProjectQuery};
use crate::output::{self, OutputFormat, Tabular, cell};

#[derive(Subcommand)]
pub enum ProjectCommands {
    /// List projects, optionally of a single company
    List {
        /// Only list projects owned by this company
        #[arg(long = "company-id")]
        company_id: Option<String>,
        /// Maximum number of projects to return
        #[arg(long)]
        limit: Option<u32>,
        /// Number of projects to skip
        #[arg(long)]
        offset: Option<u32>,
        #[arg(short = 'o', long = "output", value_enum, default_value_t)]
        output: OutputFormat,
    },
    /// Show one project
    Get {
        id: String,
        #[arg(short = 'o', long = "output", value_enum, default_value_t)]
        output: OutputFormat,
    },
}

impl Tabular for Project {
    const HEADERS: &'static [&'static str] = &["ID", "NAME", "COMPANY", "CREATED", "DESCRIPTION"];

    fn id(&self) -> &str {
        &self.id
    }

    fn row(&self) -> Vec<String> {
        vec![
            self.id.clone(),
            self.name.clone(),
            cell(&self.company_id),
            cell(&self.created_at),
            cell(&self.description),
        ]
    }
}

impl ProjectCommands {
    pub async fn run(&self, ctx: &Context) {
        match self {
            ProjectCommands::List {
                company_id,
                limit,
                offset,
                output,
            } => {
                let query = ProjectQuery {
                    company_id: company_id.clone(),
                    limit: *limit,
                    offset: *offset,
                };
                match project::list(&ctx.client, &query).await {
                    Ok(page) => {
                        if let Err(e) = output::print(&page.items, *output) {
                            fail(e);
                        }
                    }
                    Err(e) => fail(e),
                }
            }
            ProjectCommands::Get { id, output } => match project::get(&ctx.client, id).await {
                Ok(project) => {
                    if let Err(e) = output::print(&[project], *output) {
                        fail(e);
                    }
                }
                Err(e) => fail(e),
            },
        }
    }
}
