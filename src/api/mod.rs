pub mod client;
pub mod company;
pub mod deployment;
pub mod project;


use serde::{Deserialize, Serialize};

pub use client::{ApiClient, ApiError};

/// List envelope returned by the console: `{ "items": [...], "total": N }`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    #[serde(default)]
    pub total: u64,
}

/// Paging parameters shared by list endpoints
#[derive(Debug, Default, Clone, Serialize)]
pub struct ListParams {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub offset: Option<u32>,
}
