//! The job cache.
//!
//! [`JobTracker`] owns the newest-first list of every job submitted in
//! the session. It is created by [`JobTracker::initialize`], which
//! restores the persisted snapshot and starts the background sweep, and
//! is shared as an `Arc` with every caller.
//!
//! Every mutation persists the whole cache while still holding the
//! write lock, so the stored snapshot always matches the most recent
//! completed mutation.

use std::collections::HashSet;
use std::sync::Arc;

use beachfront_core::job::{sort_newest_first, Job};
use beachfront_core::output::{output_filename, resolve_artifact_id};
use beachfront_piazza::client::ExecutionClient;
use beachfront_piazza::messages::{ExecutionDescriptor, StatusReport};
use chrono::Utc;
use futures::future::join_all;
use tokio::sync::RwLock;

use crate::config::TrackerConfig;
use crate::error::JobError;
use crate::store::JobStore;
use crate::sweep::{self, SweepHandle};

/// A resolved output artifact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobResult {
    /// Artifact id the content was fetched from.
    pub id: String,
    /// Display name: the owning job's name, or the id if no cached job
    /// references this artifact.
    pub name: String,
    /// Raw artifact content (GeoJSON).
    pub content: String,
}

/// Counts from one sweep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepSummary {
    pub polled: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub timed_out: usize,
    pub still_running: usize,
}

/// What one job's poll decided.
#[derive(Debug)]
enum Outcome {
    StillRunning,
    Succeeded(String),
    Failed,
    TimedOut,
}

/// Tracks submitted jobs for one session.
pub struct JobTracker {
    client: Arc<dyn ExecutionClient>,
    store: Arc<dyn JobStore>,
    config: TrackerConfig,
    jobs: RwLock<Vec<Job>>,
}

impl JobTracker {
    /// Restore the cache from `store` and start the background sweep.
    ///
    /// The first sweep runs immediately. Must be called from within a
    /// Tokio runtime.
    pub async fn initialize(
        client: Arc<dyn ExecutionClient>,
        store: Arc<dyn JobStore>,
        config: TrackerConfig,
    ) -> (Arc<Self>, SweepHandle) {
        let interval = config.sweep_interval;
        let tracker = Arc::new(Self::restore(client, store, config).await);
        let handle = sweep::spawn(Arc::clone(&tracker), interval);
        (tracker, handle)
    }

    /// Restore the cache from `store` without starting a sweep.
    ///
    /// Missing, unreadable, or corrupt snapshots yield an empty cache.
    pub async fn restore(
        client: Arc<dyn ExecutionClient>,
        store: Arc<dyn JobStore>,
        config: TrackerConfig,
    ) -> Self {
        let jobs = match store.load(&config.session_key).await {
            Ok(Some(contents)) => decode_snapshot(&contents),
            Ok(None) => Vec::new(),
            Err(e) => {
                tracing::warn!(error = %e, key = %config.session_key, "Failed to read job cache, starting empty");
                Vec::new()
            }
        };

        tracing::info!(
            count = jobs.len(),
            running = jobs.iter().filter(|j| j.is_running()).count(),
            "Job cache restored",
        );

        Self {
            client,
            store,
            config,
            jobs: RwLock::new(jobs),
        }
    }

    pub fn config(&self) -> &TrackerConfig {
        &self.config
    }

    /// Submit a new job and start tracking it.
    ///
    /// On failure the cache is left unchanged.
    pub async fn submit(
        &self,
        name: &str,
        algorithm_id: &str,
        algorithm_name: &str,
        image_ids: Vec<String>,
    ) -> Result<String, JobError> {
        let now = Utc::now();
        let descriptor =
            ExecutionDescriptor::for_images(algorithm_id, &image_ids, &output_filename(now));

        let job_id = self
            .client
            .submit(&descriptor)
            .await
            .map_err(JobError::Submission)?;

        let mut jobs = self.jobs.write().await;
        if jobs.iter().any(|j| j.id == job_id) {
            return Err(JobError::Duplicate(job_id));
        }

        jobs.push(Job::running(&job_id, name, algorithm_name, image_ids, now));
        sort_newest_first(&mut jobs);
        self.persist(&jobs).await;

        tracing::info!(
            job_id = %job_id,
            job_name = %name,
            algorithm_id = %algorithm_id,
            "Job submitted",
        );

        Ok(job_id)
    }

    /// Fetch the content of a resolved artifact.
    pub async fn get_result(&self, result_id: &str) -> Result<JobResult, JobError> {
        let content =
            self.client
                .fetch_file(result_id)
                .await
                .map_err(|source| JobError::Retrieval {
                    result_id: result_id.to_string(),
                    source,
                })?;

        let name = self
            .jobs
            .read()
            .await
            .iter()
            .find(|j| j.result_id.as_deref() == Some(result_id))
            .map(|j| j.name.clone())
            .unwrap_or_else(|| result_id.to_string());

        Ok(JobResult {
            id: result_id.to_string(),
            name,
            content,
        })
    }

    /// Snapshot of every tracked job, newest first.
    pub async fn list(&self) -> Vec<Job> {
        self.jobs.read().await.clone()
    }

    /// Snapshot of a single tracked job.
    pub async fn get_job(&self, job_id: &str) -> Option<Job> {
        self.jobs
            .read()
            .await
            .iter()
            .find(|j| j.id == job_id)
            .cloned()
    }

    /// Advance every running job by one poll.
    ///
    /// Jobs are polled concurrently. A failure on one job only marks that
    /// job failed. Once every poll has settled the outcomes are applied
    /// and the cache is persisted once.
    pub async fn sweep(&self) -> SweepSummary {
        let running: Vec<Job> = self
            .jobs
            .read()
            .await
            .iter()
            .filter(|j| j.is_running())
            .cloned()
            .collect();

        if running.is_empty() {
            tracing::debug!("No running jobs to sweep");
            return SweepSummary::default();
        }

        tracing::debug!(count = running.len(), "Sweeping running jobs");

        let outcomes = join_all(running.iter().map(|job| async move {
            (job.id.clone(), self.check(job).await)
        }))
        .await;

        let mut summary = SweepSummary {
            polled: outcomes.len(),
            ..Default::default()
        };

        let mut jobs = self.jobs.write().await;
        for (job_id, outcome) in outcomes {
            let Some(job) = jobs.iter_mut().find(|j| j.id == job_id) else {
                continue;
            };

            let applied = match outcome {
                Outcome::StillRunning => {
                    summary.still_running += 1;
                    continue;
                }
                Outcome::Succeeded(result_id) => {
                    summary.succeeded += 1;
                    job.succeed(result_id)
                }
                Outcome::Failed => {
                    summary.failed += 1;
                    job.fail()
                }
                Outcome::TimedOut => {
                    summary.timed_out += 1;
                    job.time_out()
                }
            };

            if applied {
                tracing::info!(
                    job_id = %job.id,
                    status = %job.status,
                    result_id = job.result_id.as_deref().unwrap_or(""),
                    "Job finished",
                );
            }
        }
        self.persist(&jobs).await;
        drop(jobs);

        tracing::info!(
            polled = summary.polled,
            succeeded = summary.succeeded,
            failed = summary.failed,
            timed_out = summary.timed_out,
            still_running = summary.still_running,
            "Sweep complete",
        );

        summary
    }

    // ---- private helpers ----

    /// Poll one job and decide its next state. Status check first, then
    /// artifact resolution for successful jobs.
    async fn check(&self, job: &Job) -> Outcome {
        let report = match self.client.poll_status(&job.id).await {
            Ok(report) => report,
            Err(source) => {
                let err = JobError::Poll {
                    job_id: job.id.clone(),
                    source,
                };
                tracing::warn!(error = %err, "Poll failed, marking job failed");
                return Outcome::Failed;
            }
        };

        if report.status.is_success() {
            return match self.resolve(&job.id, &report).await {
                Ok(result_id) => Outcome::Succeeded(result_id),
                Err(err) => {
                    tracing::warn!(error = %err, "Resolution failed, marking job failed");
                    Outcome::Failed
                }
            };
        }

        if report.status.is_failure() {
            tracing::debug!(job_id = %job.id, status = ?report.status, "Remote reported failure");
            return Outcome::Failed;
        }

        if job.is_expired(Utc::now(), self.config.job_ttl) {
            return Outcome::TimedOut;
        }

        Outcome::StillRunning
    }

    /// Locate the artifact id of a successful job's GeoJSON output.
    async fn resolve(&self, job_id: &str, report: &StatusReport) -> Result<String, JobError> {
        let resolution_error = |reason: String| JobError::Resolution {
            job_id: job_id.to_string(),
            reason,
        };

        let data_id = report
            .output_data_id()
            .ok_or_else(|| resolution_error("status carries no output reference".into()))?;

        let content = self
            .client
            .fetch_file(data_id)
            .await
            .map_err(|e| resolution_error(e.to_string()))?;

        resolve_artifact_id(&content).map_err(|e| resolution_error(e.to_string()))
    }

    /// Write the full cache. Failures are logged; the next mutation
    /// writes a fresh snapshot.
    async fn persist(&self, jobs: &[Job]) {
        let contents = match serde_json::to_string(jobs) {
            Ok(contents) => contents,
            Err(e) => {
                tracing::error!(error = %e, "Failed to serialize job cache");
                return;
            }
        };

        if let Err(e) = self.store.save(&self.config.session_key, &contents).await {
            tracing::error!(error = %e, key = %self.config.session_key, "Failed to persist job cache");
        }
    }
}

/// Decode a persisted snapshot.
///
/// A document that does not decode yields an empty list. Entries that
/// break the `result_id`/`Success` pairing or repeat an earlier id are
/// dropped. The result is sorted newest-first.
pub fn decode_snapshot(contents: &str) -> Vec<Job> {
    let decoded: Vec<Job> = match serde_json::from_str(contents) {
        Ok(jobs) => jobs,
        Err(e) => {
            tracing::warn!(error = %e, "Corrupt job cache, starting empty");
            return Vec::new();
        }
    };

    let mut seen = HashSet::new();
    let mut jobs: Vec<Job> = decoded
        .into_iter()
        .filter(|job| {
            if !job.is_consistent() {
                tracing::warn!(job_id = %job.id, status = %job.status, "Dropping inconsistent cached job");
                return false;
            }
            if !seen.insert(job.id.clone()) {
                tracing::warn!(job_id = %job.id, "Dropping duplicate cached job");
                return false;
            }
            true
        })
        .collect();

    sort_newest_first(&mut jobs);
    jobs
}
