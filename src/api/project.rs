use serde::{Deserialize, Serialize};

use super::client::{ApiClient, ApiError};
use super::Page;

const PROJECT_PATH: &str = "/projects";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub company_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
}

/// Query parameters for listing projects
#[derive(Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectQuery {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub company_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub offset: Option<u32>,
}

pub async fn list(client: &ApiClient, query: &ProjectQuery) -> Result<Page<Project>, ApiError> {
    client.get_json_with_query(PROJECT_PATH, query).await
}

pub async fn get(client: &ApiClient, id: &str) -> Result<Project, ApiError> {
    let path = format!("{}/{}", PROJECT_PATH, id);
    client.get_json(&path).await
}
