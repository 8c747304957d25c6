//! Piazza gateway request and response types.
//!
//! The gateway wraps every JSON response in a `{"data": {...}}`
//! envelope. Job submissions carry an [`ExecutionDescriptor`] naming the
//! algorithm service and its URL-parameter inputs.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// `type` of the job request that runs a registered service.
pub const EXECUTE_SERVICE: &str = "execute-service";

/// Input type understood by the algorithm services.
const URL_PARAMETER: &str = "urlparameter";

/// File extension of the image-file references handed to algorithms.
const IMAGE_FILE_EXTENSION: &str = "TIF";

// ---------------------------------------------------------------------------
// Requests
// ---------------------------------------------------------------------------

/// A single named input of an execution descriptor.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DataInput {
    pub content: String,
    #[serde(rename = "type")]
    pub kind: String,
}

impl DataInput {
    fn url_parameter(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            kind: URL_PARAMETER.to_string(),
        }
    }
}

/// Expected output shape of an execution.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DataOutput {
    pub mime_type: String,
    #[serde(rename = "type")]
    pub kind: String,
}

/// Invocation descriptor for one algorithm run.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionDescriptor {
    /// Registered service id of the algorithm.
    pub service_id: String,
    pub data_inputs: BTreeMap<String, DataInput>,
    pub data_output: Vec<DataOutput>,
}

impl ExecutionDescriptor {
    /// Input key carrying the comma-separated image-file references.
    pub const IN_FILES: &'static str = "inFiles";
    /// Input key carrying the requested output filename.
    pub const OUT_GEOJSON: &'static str = "outGeoJson";

    /// Build a descriptor that runs `algorithm_id` over `image_ids` and
    /// writes its GeoJSON result to `output_filename`.
    pub fn for_images(algorithm_id: &str, image_ids: &[String], output_filename: &str) -> Self {
        let in_files = image_ids
            .iter()
            .map(|id| format!("{id}.{IMAGE_FILE_EXTENSION}"))
            .collect::<Vec<_>>()
            .join(",");

        let mut data_inputs = BTreeMap::new();
        data_inputs.insert(Self::IN_FILES.to_string(), DataInput::url_parameter(in_files));
        data_inputs.insert(
            Self::OUT_GEOJSON.to_string(),
            DataInput::url_parameter(output_filename),
        );

        Self {
            service_id: algorithm_id.to_string(),
            data_inputs,
            data_output: vec![DataOutput {
                mime_type: "application/json".to_string(),
                kind: "text".to_string(),
            }],
        }
    }

    /// The output filename this descriptor asks the algorithm to write.
    pub fn output_filename(&self) -> Option<&str> {
        self.data_inputs
            .get(Self::OUT_GEOJSON)
            .map(|input| input.content.as_str())
    }
}

/// Body of a `POST /job` request.
#[derive(Debug, Serialize)]
pub(crate) struct JobRequest<'a> {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub data: &'a ExecutionDescriptor,
}

// ---------------------------------------------------------------------------
// Responses
// ---------------------------------------------------------------------------

/// The `{"data": ...}` envelope around every gateway response.
#[derive(Debug, Deserialize)]
pub(crate) struct Envelope<T> {
    pub data: T,
}

/// Payload returned by `POST /job`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct SubmitData {
    pub job_id: String,
}

/// Remote execution status as reported by `GET /job/{id}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub enum RemoteStatus {
    Pending,
    Submitted,
    Running,
    Success,
    Error,
    Fail,
    Cancelled,
    /// Any status this client does not know about.
    #[serde(other)]
    Unknown,
}

impl RemoteStatus {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success)
    }

    /// Whether the remote run ended without producing a result.
    pub fn is_failure(&self) -> bool {
        matches!(self, Self::Error | Self::Fail | Self::Cancelled)
    }
}

/// Reference to the execution-output document of a finished job.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultRef {
    pub data_id: Option<String>,
}

/// Status of one remote job.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct StatusReport {
    pub status: RemoteStatus,
    #[serde(default)]
    pub result: Option<ResultRef>,
}

impl StatusReport {
    /// Id of the execution-output document, if the gateway reported one.
    pub fn output_data_id(&self) -> Option<&str> {
        self.result
            .as_ref()
            .and_then(|r| r.data_id.as_deref())
            .filter(|id| !id.is_empty())
    }
}
