use serde::{Deserialize, Serialize};

use super::client::{ApiClient, ApiError};
use super::{ListParams, Page};

const COMPANY_PATH: &str = "/companies";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Company {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plan: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
}

pub async fn list(client: &ApiClient, params: &ListParams) -> Result<Page<Company>, ApiError> {
    client.get_json_with_query(COMPANY_PATH, params).await
}

pub async fn get(client: &ApiClient, id: &str) -> Result<Company, ApiError> {
    let path = format!("{}/{}", COMPANY_PATH, id);
    client.get_json(&path).await
}
