//! The remote execution contract.
//!
//! [`ExecutionClient`] is the seam between job tracking and the network.
//! [`PiazzaApi`](crate::api::PiazzaApi) implements it over HTTP; tests
//! substitute scripted implementations.

use async_trait::async_trait;

use crate::messages::{ExecutionDescriptor, StatusReport};

/// Submits jobs, polls their status, and fetches their files.
#[async_trait]
pub trait ExecutionClient: Send + Sync {
    /// Submit a job. Returns the id assigned by the remote service.
    async fn submit(&self, descriptor: &ExecutionDescriptor) -> Result<String, PiazzaError>;

    /// Fetch the current status of a previously submitted job.
    async fn poll_status(&self, job_id: &str) -> Result<StatusReport, PiazzaError>;

    /// Fetch the raw content of a stored file.
    async fn fetch_file(&self, data_id: &str) -> Result<String, PiazzaError>;
}

/// Errors from the remote execution layer.
#[derive(Debug, thiserror::Error)]
pub enum PiazzaError {
    /// The HTTP request itself failed (network, DNS, TLS, body decode).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The gateway returned a non-2xx status code.
    #[error("Piazza API error ({status}): {body}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Raw response body for debugging.
        body: String,
    },

    /// The gateway answered with a body of unexpected shape.
    #[error("Unexpected Piazza response: {0}")]
    Decode(String),
}
