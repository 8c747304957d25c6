//! REST client for the Piazza gateway HTTP endpoints.
//!
//! Wraps job submission, job status, and file retrieval using
//! [`reqwest`].

use async_trait::async_trait;

use crate::client::{ExecutionClient, PiazzaError};
use crate::messages::{
    Envelope, ExecutionDescriptor, JobRequest, StatusReport, SubmitData, EXECUTE_SERVICE,
};

/// HTTP client for a single Piazza gateway.
#[derive(Debug, Clone)]
pub struct PiazzaApi {
    client: reqwest::Client,
    api_url: String,
    api_key: Option<String>,
}

impl PiazzaApi {
    /// Create a new API client for a gateway.
    ///
    /// * `api_url` - Base HTTP URL, e.g. `https://pz-gateway.example`.
    /// * `api_key` - Sent as the basic-auth username when present.
    pub fn new(api_url: impl Into<String>, api_key: Option<String>) -> Self {
        Self::with_client(reqwest::Client::new(), api_url, api_key)
    }

    /// Create an API client reusing an existing [`reqwest::Client`].
    pub fn with_client(
        client: reqwest::Client,
        api_url: impl Into<String>,
        api_key: Option<String>,
    ) -> Self {
        let api_url = api_url.into().trim_end_matches('/').to_string();
        Self {
            client,
            api_url,
            api_key,
        }
    }

    /// HTTP base URL of the gateway.
    pub fn api_url(&self) -> &str {
        &self.api_url
    }

    // ---- private helpers ----

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.api_key {
            Some(key) => request.basic_auth(key, Some("")),
            None => request,
        }
    }

    /// Ensure the response has a success status code. Returns the
    /// response unchanged on success, or a [`PiazzaError::Api`]
    /// containing the status and body text on failure.
    async fn ensure_success(response: reqwest::Response) -> Result<reqwest::Response, PiazzaError> {
        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable body>".to_string());
            return Err(PiazzaError::Api {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response)
    }

    /// Parse a successful enveloped JSON response into the expected type.
    async fn parse_response<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, PiazzaError> {
        let response = Self::ensure_success(response).await?;
        Ok(response.json::<Envelope<T>>().await?.data)
    }
}

#[async_trait]
impl ExecutionClient for PiazzaApi {
    /// Sends `POST /job` with an `execute-service` request.
    async fn submit(&self, descriptor: &ExecutionDescriptor) -> Result<String, PiazzaError> {
        let body = JobRequest {
            kind: EXECUTE_SERVICE,
            data: descriptor,
        };

        let response = self
            .authorize(self.client.post(format!("{}/job", self.api_url)))
            .json(&body)
            .send()
            .await?;

        let submitted: SubmitData = Self::parse_response(response).await?;
        if submitted.job_id.is_empty() {
            return Err(PiazzaError::Decode("empty jobId in submit response".into()));
        }

        tracing::debug!(job_id = %submitted.job_id, service_id = %descriptor.service_id, "Job submitted to Piazza");
        Ok(submitted.job_id)
    }

    /// Sends `GET /job/{id}`.
    async fn poll_status(&self, job_id: &str) -> Result<StatusReport, PiazzaError> {
        let response = self
            .authorize(self.client.get(format!("{}/job/{}", self.api_url, job_id)))
            .send()
            .await?;

        Self::parse_response(response).await
    }

    /// Sends `GET /file/{id}` and returns the body as text.
    async fn fetch_file(&self, data_id: &str) -> Result<String, PiazzaError> {
        let response = self
            .authorize(self.client.get(format!("{}/file/{}", self.api_url, data_id)))
            .send()
            .await?;

        let response = Self::ensure_success(response).await?;
        Ok(response.text().await?)
    }
}
