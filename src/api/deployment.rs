use serde::{Deserialize, Serialize};

use super::client::{ApiClient, ApiError};
use super::{ListParams, Page};

const DEPLOYMENT_PATH: &str = "/deployments";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Deployment {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub replicas: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
}

/// List the deployments of one project
pub async fn list(
    client: &ApiClient,
    project_id: &str,
    params: &ListParams,
) -> Result<Page<Deployment>, ApiError> {
    let path = format!("/projects/{}{}", project_id, DEPLOYMENT_PATH);
    client.get_json_with_query(&path, params).await
}

pub async fn get(client: &ApiClient, id: &str) -> Result<Deployment, ApiError> {
    let path = format!("{}/{}", DEPLOYMENT_PATH, id);
    client.get_json(&path).await
}

/// Delete a deployment by ID
pub async fn delete(client: &ApiClient, id: &str) -> Result<(), ApiError> {
    let path = format!("{}/{}", DEPLOYMENT_PATH, id);
    client.delete(&path).await?;
    Ok(())
}
