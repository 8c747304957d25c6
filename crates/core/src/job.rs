//! Tracked remote jobs and their status lifecycle.
//!
//! A [`Job`] starts out [`JobStatus::Running`] and moves to exactly one
//! terminal status. The transition helpers on [`Job`] refuse to touch a
//! job that has already left `Running`, so a terminal status can never
//! regress and `result_id` is only ever set together with
//! [`JobStatus::Success`].

use serde::{Deserialize, Serialize};

use crate::types::Timestamp;

// ---------------------------------------------------------------------------
// JobStatus
// ---------------------------------------------------------------------------

/// Lifecycle status of a tracked job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum JobStatus {
    Running,
    Success,
    Error,
    TimedOut,
}

impl JobStatus {
    /// Every status name, in lifecycle order.
    pub const ALL: &'static [&'static str] = &["Running", "Success", "Error", "TimedOut"];

    /// Return the status name as persisted.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Running => "Running",
            Self::Success => "Success",
            Self::Error => "Error",
            Self::TimedOut => "TimedOut",
        }
    }

    /// Parse a persisted status name.
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "Running" => Some(Self::Running),
            "Success" => Some(Self::Success),
            "Error" => Some(Self::Error),
            "TimedOut" => Some(Self::TimedOut),
            _ => None,
        }
    }

    /// Whether this status is final.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Running)
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Job
// ---------------------------------------------------------------------------

/// One submitted remote computation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Job {
    /// Identifier assigned by the remote service at submission.
    pub id: String,
    /// User-supplied display name.
    #[serde(default)]
    pub name: String,
    /// Display name of the algorithm that was run.
    #[serde(default)]
    pub algorithm_name: String,
    /// Source image identifiers, in submission order.
    #[serde(default)]
    pub image_ids: Vec<String>,
    pub created_on: Timestamp,
    pub status: JobStatus,
    /// Artifact id of the resolved output. Present only on success.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result_id: Option<String>,
}

impl Job {
    /// Create a freshly submitted job in the `Running` state.
    pub fn running(
        id: impl Into<String>,
        name: impl Into<String>,
        algorithm_name: impl Into<String>,
        image_ids: Vec<String>,
        created_on: Timestamp,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            algorithm_name: algorithm_name.into(),
            image_ids,
            created_on,
            status: JobStatus::Running,
            result_id: None,
        }
    }

    pub fn is_running(&self) -> bool {
        self.status == JobStatus::Running
    }

    /// Mark the job successful with its resolved artifact id.
    ///
    /// Returns `false` (and changes nothing) if the job is not running.
    pub fn succeed(&mut self, result_id: impl Into<String>) -> bool {
        if !self.is_running() {
            return false;
        }
        self.status = JobStatus::Success;
        self.result_id = Some(result_id.into());
        true
    }

    /// Mark the job failed. Returns `false` if the job is not running.
    pub fn fail(&mut self) -> bool {
        self.finish(JobStatus::Error)
    }

    /// Mark the job timed out. Returns `false` if the job is not running.
    pub fn time_out(&mut self) -> bool {
        self.finish(JobStatus::TimedOut)
    }

    /// `result_id` is present if and only if the job succeeded.
    pub fn is_consistent(&self) -> bool {
        (self.status == JobStatus::Success) == self.result_id.is_some()
    }

    /// Whether the job has been running for longer than `ttl` as of `now`.
    /// A `created_on` in the future never counts as expired.
    pub fn is_expired(&self, now: Timestamp, ttl: std::time::Duration) -> bool {
        (now - self.created_on)
            .to_std()
            .map(|elapsed| elapsed > ttl)
            .unwrap_or(false)
    }

    fn finish(&mut self, status: JobStatus) -> bool {
        if !self.is_running() {
            return false;
        }
        self.status = status;
        self.result_id = None;
        true
    }
}

/// Sort jobs newest-first by `created_on`. Stable for equal timestamps.
pub fn sort_newest_first(jobs: &mut [Job]) {
    jobs.sort_by(|a, b| b.created_on.cmp(&a.created_on));
}
