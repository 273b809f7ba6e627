use clap::Subcommand;

use super::fail;
use crate::Context;
use crate::api::company::{self, Company};
use crate::api::ListParams;
use crate::output::{self, OutputFormat, Tabular, cell};

#[derive(Subcommand)]
pub enum CompanyCommands {
    /// List companies visible to the logged-in user
    List {
        /// Maximum number of companies to return
        #[arg(long)]
        limit: Option<u32>,
        /// Number of companies to skip
        #[arg(long)]
        offset: Option<u32>,
        #[arg(short = 'o', long = "output", value_enum, default_value_t)]
        output: OutputFormat,
    },
    /// Show one company
    Get {
        id: String,
        #[arg(short = 'o', long = "output", value_enum, default_value_t)]
        output: OutputFormat,
    },
}

impl Tabular for Company {
    const HEADERS: &'static [&'static str] = &["ID", "NAME", "PLAN", "CREATED"];

    fn id(&self) -> &str {
        &self.id
    }

    fn row(&self) -> Vec<String> {
        vec![
            self.id.clone(),
            self.name.clone(),
            cell(&self.plan),
            cell(&self.created_at),
        ]
    }
}

impl CompanyCommands {
    pub async fn run(&self, ctx: &Context) {
        match self {
            CompanyCommands::List {
                limit,
                offset,
                output,
            } => {
                let params = ListParams {
                    limit: *limit,
                    offset: *offset,
                };
                match company::list(&ctx.client, &params).await {
                    Ok(page) => {
                        if let Err(e) = output::print(&page.items, *output) {
                            fail(e);
                        }
                    }
                    Err(e) => fail(e),
                }
            }
            CompanyCommands::Get { id, output } => match company::get(&ctx.client, id).await {
                Ok(company) => {
                    if let Err(e) = output::print(&[company], *output) {
                        fail(e);
                    }
                }
                Err(e) => fail(e),
            },
        }
    }
}
