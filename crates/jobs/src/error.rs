use beachfront_core::error::ParseError;
use beachfront_piazza::client::PiazzaError;

/// Errors from job tracking and history import.
///
/// `Poll` and `Resolution` never escape a sweep: they are logged and the
/// affected job is marked failed. The rest are returned to the caller.
#[derive(Debug, thiserror::Error)]
pub enum JobError {
    #[error("Job submission failed: {0}")]
    Submission(#[source] PiazzaError),

    #[error("Remote service returned job id {0}, which is already tracked")]
    Duplicate(String),

    #[error("Failed to poll job {job_id}: {source}")]
    Poll {
        job_id: String,
        #[source]
        source: PiazzaError,
    },

    #[error("Failed to resolve output of job {job_id}: {reason}")]
    Resolution { job_id: String, reason: String },

    #[error("Failed to retrieve result {result_id}: {source}")]
    Retrieval {
        result_id: String,
        #[source]
        source: PiazzaError,
    },

    #[error("Failed to import {id}: {source}")]
    Import {
        id: String,
        #[source]
        source: ImportCause,
    },
}

/// Why a single history record could not be imported.
#[derive(Debug, thiserror::Error)]
pub enum ImportCause {
    #[error("fetch failed: {0}")]
    Fetch(#[from] PiazzaError),

    #[error("parse failed: {0}")]
    Parse(#[from] ParseError),
}
