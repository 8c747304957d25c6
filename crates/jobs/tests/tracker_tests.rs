//! Integration tests for the job cache and its sweep.

mod common;

use std::sync::Arc;
use std::time::Duration;

use assert_matches::assert_matches;
use beachfront_core::job::{Job, JobStatus};
use beachfront_core::output::is_output_filename;
use beachfront_jobs::config::TrackerConfig;
use beachfront_jobs::error::JobError;
use beachfront_jobs::store::MemoryJobStore;
use beachfront_jobs::tracker::{decode_snapshot, JobTracker, SweepSummary};
use beachfront_piazza::messages::{ExecutionDescriptor, RemoteStatus};
use chrono::Utc;

use common::{manifest_document, Poll, ScriptedClient};

const KEY: &str = "jobs";

fn config() -> TrackerConfig {
    TrackerConfig {
        sweep_interval: Duration::from_secs(3600),
        job_ttl: Duration::from_secs(3600),
        session_key: KEY.to_string(),
    }
}

fn running_job(id: &str, minutes_ago: i64) -> Job {
    Job::running(
        id,
        format!("job {id}"),
        "NDWI",
        vec!["img-1".into()],
        Utc::now() - chrono::Duration::minutes(minutes_ago),
    )
}

fn store_with(jobs: &[Job]) -> Arc<MemoryJobStore> {
    Arc::new(MemoryJobStore::with_snapshot(
        KEY,
        serde_json::to_string(jobs).unwrap(),
    ))
}

async fn tracker(client: &Arc<ScriptedClient>, store: &Arc<MemoryJobStore>) -> JobTracker {
    JobTracker::restore(client.clone(), store.clone(), config()).await
}

fn persisted(store: &MemoryJobStore) -> Vec<Job> {
    decode_snapshot(&store.snapshot(KEY).expect("snapshot should exist"))
}

fn assert_newest_first(jobs: &[Job]) {
    assert!(
        jobs.windows(2).all(|w| w[0].created_on >= w[1].created_on),
        "jobs are not sorted newest-first"
    );
}

// ---------------------------------------------------------------------------
// Initialization
// ---------------------------------------------------------------------------

#[tokio::test]
async fn restore_reconstructs_persisted_running_job() {
    let client = Arc::new(ScriptedClient::new());
    let store = store_with(&[running_job("a", 5)]);

    let tracker = tracker(&client, &store).await;
    let jobs = tracker.list().await;

    assert_eq!(jobs.len(), 1);
    assert_eq!(jobs[0].id, "a");
    assert_eq!(jobs[0].status, JobStatus::Running);
}

#[tokio::test]
async fn initialize_restores_minimal_persisted_record() {
    let client = Arc::new(ScriptedClient::new());
    let contents = serde_json::json!([{
        "id": "a",
        "status": "Running",
        "createdOn": Utc::now().to_rfc3339()
    }])
    .to_string();
    let store = Arc::new(MemoryJobStore::with_snapshot(KEY, contents));

    let (tracker, handle) = JobTracker::initialize(client.clone(), store.clone(), config()).await;
    handle.join().await;

    let jobs = tracker.list().await;
    assert_eq!(jobs.len(), 1);
    assert_eq!(jobs[0].id, "a");
    assert_eq!(jobs[0].status, JobStatus::Running);
    assert!(jobs[0].name.is_empty());
    assert!(jobs[0].image_ids.is_empty());
}

#[tokio::test]
async fn restore_with_corrupt_snapshot_starts_empty() {
    let client = Arc::new(ScriptedClient::new());
    let store = Arc::new(MemoryJobStore::with_snapshot(KEY, "{{ definitely not json"));

    let tracker = tracker(&client, &store).await;
    assert!(tracker.list().await.is_empty());
}

#[tokio::test]
async fn restore_without_snapshot_starts_empty() {
    let client = Arc::new(ScriptedClient::new());
    let store = Arc::new(MemoryJobStore::new());

    let tracker = tracker(&client, &store).await;
    assert!(tracker.list().await.is_empty());
    assert_eq!(store.writes(), 0);
}

// ---------------------------------------------------------------------------
// Submit
// ---------------------------------------------------------------------------

#[tokio::test]
async fn submit_tracks_running_job_and_persists() {
    let client = Arc::new(ScriptedClient::new());
    client.accept_submit("job-1");
    let store = Arc::new(MemoryJobStore::new());
    let tracker = tracker(&client, &store).await;

    let id = tracker
        .submit("coastline", "algo-ndwi", "NDWI", vec!["img-a".into(), "img-b".into()])
        .await
        .expect("submit should succeed");
    assert_eq!(id, "job-1");

    let jobs = tracker.list().await;
    assert_eq!(jobs.len(), 1);
    assert_eq!(jobs[0].status, JobStatus::Running);
    assert_eq!(jobs[0].name, "coastline");
    assert_eq!(jobs[0].algorithm_name, "NDWI");
    assert_eq!(jobs[0].image_ids, ["img-a", "img-b"]);
    assert!(jobs[0].result_id.is_none());

    assert_eq!(store.writes(), 1);
    assert_eq!(persisted(&store), jobs);

    let submitted = client.submitted.lock().unwrap();
    let descriptor = &submitted[0];
    assert_eq!(descriptor.service_id, "algo-ndwi");
    assert_eq!(
        descriptor.data_inputs[ExecutionDescriptor::IN_FILES].content,
        "img-a.TIF,img-b.TIF"
    );
    assert!(is_output_filename(descriptor.output_filename().unwrap()));
}

#[tokio::test]
async fn submit_keeps_cache_newest_first() {
    let client = Arc::new(ScriptedClient::new());
    let store = store_with(&[running_job("old", 30), running_job("older", 60)]);
    let tracker = tracker(&client, &store).await;

    client.accept_submit("fresh");
    tracker
        .submit("fresh", "algo-ndwi", "NDWI", vec!["img-a".into()])
        .await
        .unwrap();

    let jobs = tracker.list().await;
    let ids: Vec<_> = jobs.iter().map(|j| j.id.as_str()).collect();
    assert_eq!(ids, ["fresh", "old", "older"]);
    assert_newest_first(&jobs);
    assert_newest_first(&persisted(&store));
}

#[tokio::test]
async fn rejected_submit_leaves_cache_untouched() {
    let client = Arc::new(ScriptedClient::new());
    client.reject_submit();
    let store = store_with(&[running_job("a", 5)]);
    let tracker = tracker(&client, &store).await;

    let err = tracker
        .submit("coastline", "algo-ndwi", "NDWI", vec!["img-a".into()])
        .await
        .unwrap_err();

    assert_matches!(err, JobError::Submission(_));
    assert_eq!(tracker.list().await.len(), 1);
    assert_eq!(store.writes(), 0);
}

#[tokio::test]
async fn duplicate_job_id_is_rejected() {
    let client = Arc::new(ScriptedClient::new());
    client.accept_submit("a");
    let store = store_with(&[running_job("a", 5)]);
    let tracker = tracker(&client, &store).await;

    let err = tracker
        .submit("again", "algo-ndwi", "NDWI", vec![])
        .await
        .unwrap_err();

    assert_matches!(err, JobError::Duplicate(ref id) if id == "a");
    assert_eq!(tracker.list().await.len(), 1);
    assert_eq!(store.writes(), 0);
}

// ---------------------------------------------------------------------------
// Sweep
// ---------------------------------------------------------------------------

#[tokio::test]
async fn sweep_isolates_poll_failure_and_persists_once() {
    let client = Arc::new(ScriptedClient::new());
    client.on_poll("a", Poll::Fail);
    client.on_poll(
        "b",
        Poll::Success {
            output_id: Some("output-b".into()),
        },
    );
    client.put_file("output-b", manifest_document("artifact-7"));

    let store = store_with(&[running_job("a", 5), running_job("b", 10)]);
    let tracker = tracker(&client, &store).await;

    let summary = tracker.sweep().await;
    assert_eq!(
        summary,
        SweepSummary {
            polled: 2,
            succeeded: 1,
            failed: 1,
            timed_out: 0,
            still_running: 0,
        }
    );

    let a = tracker.get_job("a").await.unwrap();
    let b = tracker.get_job("b").await.unwrap();
    assert_eq!(a.status, JobStatus::Error);
    assert!(a.result_id.is_none());
    assert_eq!(b.status, JobStatus::Success);
    assert_eq!(b.result_id.as_deref(), Some("artifact-7"));

    assert_eq!(store.writes(), 1);
    let saved = persisted(&store);
    assert_eq!(saved, tracker.list().await);
}

#[tokio::test]
async fn success_without_output_reference_is_error() {
    let client = Arc::new(ScriptedClient::new());
    client.on_poll("a", Poll::Success { output_id: None });
    let store = store_with(&[running_job("a", 5)]);
    let tracker = tracker(&client, &store).await;

    tracker.sweep().await;

    let job = tracker.get_job("a").await.unwrap();
    assert_eq!(job.status, JobStatus::Error);
    assert!(job.result_id.is_none());
}

#[tokio::test]
async fn success_without_matching_manifest_entry_is_error() {
    let client = Arc::new(ScriptedClient::new());
    client.on_poll(
        "a",
        Poll::Success {
            output_id: Some("output-a".into()),
        },
    );
    client.put_file("output-a", r#"{"OutFiles": {"other.txt": "x"}}"#);
    let store = store_with(&[running_job("a", 5)]);
    let tracker = tracker(&client, &store).await;

    tracker.sweep().await;

    let job = tracker.get_job("a").await.unwrap();
    assert_eq!(job.status, JobStatus::Error);
    assert!(job.result_id.is_none());
}

#[tokio::test]
async fn success_with_unfetchable_output_is_error() {
    let client = Arc::new(ScriptedClient::new());
    client.on_poll(
        "a",
        Poll::Success {
            output_id: Some("missing".into()),
        },
    );
    let store = store_with(&[running_job("a", 5)]);
    let tracker = tracker(&client, &store).await;

    tracker.sweep().await;

    assert_eq!(tracker.get_job("a").await.unwrap().status, JobStatus::Error);
}

#[tokio::test]
async fn remote_failures_mark_job_error() {
    let client = Arc::new(ScriptedClient::new());
    client.on_poll("a", Poll::Status(RemoteStatus::Error));
    client.on_poll("b", Poll::Status(RemoteStatus::Cancelled));
    let store = store_with(&[running_job("a", 5), running_job("b", 6)]);
    let tracker = tracker(&client, &store).await;

    tracker.sweep().await;

    assert_eq!(tracker.get_job("a").await.unwrap().status, JobStatus::Error);
    assert_eq!(tracker.get_job("b").await.unwrap().status, JobStatus::Error);
}

#[tokio::test]
async fn running_job_past_ttl_times_out() {
    let client = Arc::new(ScriptedClient::new());
    let store = store_with(&[running_job("young", 10), running_job("stale", 120)]);
    let tracker = tracker(&client, &store).await;

    let summary = tracker.sweep().await;
    assert_eq!(summary.timed_out, 1);
    assert_eq!(summary.still_running, 1);

    assert_eq!(tracker.get_job("young").await.unwrap().status, JobStatus::Running);
    let stale = tracker.get_job("stale").await.unwrap();
    assert_eq!(stale.status, JobStatus::TimedOut);
    assert!(stale.result_id.is_none());
}

#[tokio::test]
async fn sweep_without_running_jobs_is_a_no_op() {
    let client = Arc::new(ScriptedClient::new());
    let mut done = running_job("done", 5);
    done.succeed("artifact-1");
    let store = store_with(&[done]);
    let tracker = tracker(&client, &store).await;

    assert_eq!(tracker.sweep().await, SweepSummary::default());
    assert_eq!(store.writes(), 0);
    assert!(client.polled.lock().unwrap().is_empty());
}

#[tokio::test]
async fn terminal_jobs_are_never_polled_again() {
    let client = Arc::new(ScriptedClient::new());
    client.on_poll("a", Poll::Status(RemoteStatus::Error));
    let store = store_with(&[running_job("a", 5)]);
    let tracker = tracker(&client, &store).await;

    tracker.sweep().await;
    client.on_poll(
        "a",
        Poll::Success {
            output_id: Some("output-a".into()),
        },
    );
    client.put_file("output-a", manifest_document("artifact-7"));
    tracker.sweep().await;

    assert_eq!(*client.polled.lock().unwrap(), ["a"]);
    let job = tracker.get_job("a").await.unwrap();
    assert_eq!(job.status, JobStatus::Error);
    assert!(job.result_id.is_none());
}

// ---------------------------------------------------------------------------
// Results
// ---------------------------------------------------------------------------

#[tokio::test]
async fn get_result_uses_owning_job_name() {
    let client = Arc::new(ScriptedClient::new());
    client.put_file("artifact-7", r#"{"type":"FeatureCollection","features":[]}"#);
    let mut done = running_job("a", 5);
    done.succeed("artifact-7");
    let store = store_with(&[done]);
    let tracker = tracker(&client, &store).await;

    let result = tracker.get_result("artifact-7").await.unwrap();
    assert_eq!(result.id, "artifact-7");
    assert_eq!(result.name, "job a");
    assert_eq!(result.content, r#"{"type":"FeatureCollection","features":[]}"#);

    client.put_file("orphan", "{}");
    assert_eq!(tracker.get_result("orphan").await.unwrap().name, "orphan");
}

#[tokio::test]
async fn get_result_failure_is_surfaced_without_mutation() {
    let client = Arc::new(ScriptedClient::new());
    let store = store_with(&[running_job("a", 5)]);
    let tracker = tracker(&client, &store).await;
    let before = tracker.list().await;

    let err = tracker.get_result("missing").await.unwrap_err();

    assert_matches!(err, JobError::Retrieval { ref result_id, .. } if result_id == "missing");
    assert_eq!(tracker.list().await, before);
    assert_eq!(store.writes(), 0);
}

// ---------------------------------------------------------------------------
// Background loop
// ---------------------------------------------------------------------------

#[tokio::test]
async fn initialize_sweeps_immediately_and_terminates() {
    let client = Arc::new(ScriptedClient::new());
    client.on_poll("a", Poll::Status(RemoteStatus::Fail));
    let store = store_with(&[running_job("a", 5)]);

    let (tracker, handle) = JobTracker::initialize(client.clone(), store.clone(), config()).await;

    let mut status = JobStatus::Running;
    for _ in 0..200 {
        status = tracker.get_job("a").await.unwrap().status;
        if status != JobStatus::Running {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert_eq!(status, JobStatus::Error);

    handle.terminate();
    handle.terminate();
    assert!(handle.is_terminated());
    handle.join().await;

    assert_eq!(*client.polled.lock().unwrap(), ["a"]);
    assert_eq!(persisted(&store)[0].status, JobStatus::Error);
}

#[tokio::test]
async fn terminate_lets_in_flight_sweep_finish_and_persist() {
    let client = Arc::new(ScriptedClient::new());
    client.on_poll("a", Poll::Status(RemoteStatus::Fail));
    let gate = client.gate_polls();
    let store = store_with(&[running_job("a", 5)]);

    let (tracker, handle) = JobTracker::initialize(client.clone(), store.clone(), config()).await;

    for _ in 0..200 {
        if !client.polled().is_empty() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert_eq!(client.polled(), ["a"], "sweep should be blocked in its poll");

    handle.terminate();
    client.accept_submit("mid");
    let id = tracker
        .submit("mid-sweep", "svc-ndwi", "NDWI", vec!["img-2".into()])
        .await
        .unwrap();
    assert_eq!(id, "mid");

    gate.notify_one();
    handle.join().await;

    assert_eq!(tracker.get_job("a").await.unwrap().status, JobStatus::Error);
    assert_eq!(client.polled(), ["a"], "no sweep may start after terminate");
    assert_eq!(store.writes(), 2);

    let saved = persisted(&store);
    let status_of = |id: &str| saved.iter().find(|j| j.id == id).map(|j| j.status);
    assert_eq!(status_of("mid"), Some(JobStatus::Running));
    assert_eq!(status_of("a"), Some(JobStatus::Error));
}
