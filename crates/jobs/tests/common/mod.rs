//! Shared test doubles for the tracker and importer tests.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use beachfront_piazza::client::{ExecutionClient, PiazzaError};
use beachfront_piazza::messages::{ExecutionDescriptor, RemoteStatus, ResultRef, StatusReport};
use serde_json::json;
use tokio::sync::Notify;

/// Scripted reply to a status poll.
#[derive(Debug, Clone)]
pub enum Poll {
    Status(RemoteStatus),
    Success { output_id: Option<String> },
    Fail,
}

/// An [`ExecutionClient`] driven by in-memory scripts.
///
/// Unknown job ids poll as `Running`; unknown file ids fail with 404.
/// Once [`ScriptedClient::gate_polls`] is called, every poll blocks until
/// the returned gate is notified.
#[derive(Debug, Default)]
pub struct ScriptedClient {
    next_job_id: Mutex<Option<String>>,
    reject_submit: Mutex<bool>,
    polls: Mutex<HashMap<String, Poll>>,
    files: Mutex<HashMap<String, String>>,
    poll_gate: Mutex<Option<Arc<Notify>>>,
    pub submitted: Mutex<Vec<ExecutionDescriptor>>,
    pub fetched: Mutex<Vec<String>>,
    pub polled: Mutex<Vec<String>>,
}

impl ScriptedClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn accept_submit(&self, job_id: &str) {
        *self.next_job_id.lock().unwrap() = Some(job_id.to_string());
        *self.reject_submit.lock().unwrap() = false;
    }

    pub fn reject_submit(&self) {
        *self.reject_submit.lock().unwrap() = true;
    }

    pub fn on_poll(&self, job_id: &str, poll: Poll) {
        self.polls.lock().unwrap().insert(job_id.to_string(), poll);
    }

    pub fn put_file(&self, data_id: &str, content: impl Into<String>) {
        self.files
            .lock()
            .unwrap()
            .insert(data_id.to_string(), content.into());
    }

    pub fn gate_polls(&self) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        *self.poll_gate.lock().unwrap() = Some(gate.clone());
        gate
    }

    pub fn polled(&self) -> Vec<String> {
        self.polled.lock().unwrap().clone()
    }

    pub fn fetched(&self) -> Vec<String> {
        self.fetched.lock().unwrap().clone()
    }
}

#[async_trait]
impl ExecutionClient for ScriptedClient {
    async fn submit(&self, descriptor: &ExecutionDescriptor) -> Result<String, PiazzaError> {
        if *self.reject_submit.lock().unwrap() {
            return Err(PiazzaError::Api {
                status: 400,
                body: "service not found".into(),
            });
        }
        self.submitted.lock().unwrap().push(descriptor.clone());
        self.next_job_id
            .lock()
            .unwrap()
            .clone()
            .ok_or_else(|| PiazzaError::Decode("no job id scripted".into()))
    }

    async fn poll_status(&self, job_id: &str) -> Result<StatusReport, PiazzaError> {
        self.polled.lock().unwrap().push(job_id.to_string());
        let gate = self.poll_gate.lock().unwrap().clone();
        if let Some(gate) = gate {
            gate.notified().await;
        }
        let poll = self
            .polls
            .lock()
            .unwrap()
            .get(job_id)
            .cloned()
            .unwrap_or(Poll::Status(RemoteStatus::Running));

        match poll {
            Poll::Status(status) => Ok(StatusReport {
                status,
                result: None,
            }),
            Poll::Success { output_id } => Ok(StatusReport {
                status: RemoteStatus::Success,
                result: Some(ResultRef { data_id: output_id }),
            }),
            Poll::Fail => Err(PiazzaError::Api {
                status: 503,
                body: "gateway unavailable".into(),
            }),
        }
    }

    async fn fetch_file(&self, data_id: &str) -> Result<String, PiazzaError> {
        self.fetched.lock().unwrap().push(data_id.to_string());
        self.files
            .lock()
            .unwrap()
            .get(data_id)
            .cloned()
            .ok_or_else(|| PiazzaError::Api {
                status: 404,
                body: format!("no file {data_id}"),
            })
    }
}

/// Execution-output document carrying only a manifest.
pub fn manifest_document(artifact_id: &str) -> String {
    json!({
        "OutFiles": {
            "Beachfront_20180101.120000.geojson": artifact_id,
            "other.txt": "x"
        }
    })
    .to_string()
}

/// Full execution-output document for importer tests.
pub fn output_document(created_on: &str, algorithm_url: &str) -> String {
    json!({
        "OutFiles": {"Beachfront_20180101.120000.geojson": format!("artifact-{created_on}")},
        "geometry": {"type": "Point", "coordinates": [-75.5, 39.1]},
        "algorithmUrl": algorithm_url,
        "createdOn": created_on,
        "imageCaptureDate": "2017-06-01T00:00:00Z",
        "imageId": "LC80090472014280LGN00",
        "sensorName": "Landsat8",
        "name": "history"
    })
    .to_string()
}
