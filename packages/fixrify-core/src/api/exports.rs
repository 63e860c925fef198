//! Retrieval of server-built export artifacts.
//!
//! The server builds the CSV in a background job; creation and retrieval are
//! two independent calls made by the caller, with no in-band polling here.

use crate::api::pipeline::ApiClient;
use crate::api::transport::ApiRequest;
use crate::error::ApiError;
use serde::Deserialize;

/// `POST /admin/exports/service-requests` response.
#[derive(Debug, Clone, Deserialize)]
pub struct ExportCreated {
    /// Job identifier used to fetch the artifact once the server is done.
    pub task_id: String,
}

#[derive(Clone)]
pub struct Exports {
    client: ApiClient,
}

impl Exports {
    pub fn new(client: ApiClient) -> Self {
        Self { client }
    }

    /// Ask the server to start building the service-requests export.
    pub async fn create_service_request_export(&self) -> Result<ExportCreated, ApiError> {
        self.client
            .post_json("/admin/exports/service-requests", serde_json::json!({}))
            .await
    }

    /// Fetch a previously created export artifact as raw bytes.
    pub async fn fetch(&self, task_id: &str) -> Result<Vec<u8>, ApiError> {
        let response = self
            .client
            .execute(ApiRequest::get(format!("/admin/exports/{}", task_id)))
            .await?;
        Ok(response.body)
    }
}
