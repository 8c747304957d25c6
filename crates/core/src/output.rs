//! Execution output naming and parsing.
//!
//! Every submitted job asks the remote algorithm to write its GeoJSON
//! result under a name produced by [`output_filename`]. When the job
//! finishes, the remote service publishes an execution-output document
//! whose `OutFiles` manifest maps produced file names to artifact ids.
//! [`resolve_artifact_id`] finds the GeoJSON entry in that manifest, and
//! [`JsonOutputParser`] extracts the full set of fields the importer
//! needs.

use std::sync::LazyLock;

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::Deserialize;
use serde_json::{Map, Value};

use crate::error::ParseError;
use crate::types::Timestamp;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Fixed prefix of every generated output filename.
pub const OUTPUT_PREFIX: &str = "Beachfront_";

/// Fixed suffix of every generated output filename.
pub const OUTPUT_SUFFIX: &str = ".geojson";

/// `chrono` format of the timestamp component: date and time digits
/// with a single `.` between them.
const OUTPUT_TIMESTAMP_FORMAT: &str = "%Y%m%d.%H%M%S";

/// Manifest key the remote service uses for the output-file map.
const MANIFEST_FIELD: &str = "OutFiles";

static OUTPUT_NAME_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^Beachfront_\d+\.\d+\.geojson$").expect("valid regex")
});

// ---------------------------------------------------------------------------
// Naming
// ---------------------------------------------------------------------------

/// Build the output filename for a job submitted at `now`.
///
/// e.g. `Beachfront_20180101.120000.geojson`.
pub fn output_filename(now: Timestamp) -> String {
    format!(
        "{OUTPUT_PREFIX}{}{OUTPUT_SUFFIX}",
        now.format(OUTPUT_TIMESTAMP_FORMAT)
    )
}

/// Whether `name` looks like a filename produced by [`output_filename`].
pub fn is_output_filename(name: &str) -> bool {
    OUTPUT_NAME_RE.is_match(name)
}

// ---------------------------------------------------------------------------
// Manifest lookup
// ---------------------------------------------------------------------------

/// Find the artifact id of the GeoJSON output within a manifest.
///
/// Keys are visited in sorted order; the first matching key with a string
/// value wins.
pub fn find_output_artifact(manifest: &Map<String, Value>) -> Result<String, ParseError> {
    manifest
        .iter()
        .find_map(|(name, id)| is_output_filename(name).then(|| id.as_str()).flatten())
        .map(str::to_string)
        .ok_or(ParseError::NoMatchingOutput)
}

/// Parse an execution-output document and return the artifact id of its
/// GeoJSON output.
pub fn resolve_artifact_id(content: &str) -> Result<String, ParseError> {
    let document: Value = serde_json::from_str(content)?;
    let manifest = document
        .get(MANIFEST_FIELD)
        .and_then(Value::as_object)
        .ok_or(ParseError::MissingManifest)?;
    find_output_artifact(manifest)
}

// ---------------------------------------------------------------------------
// Parser contract
// ---------------------------------------------------------------------------

/// Structured fields extracted from an execution-output document.
#[derive(Debug, Clone, PartialEq)]
pub struct ExecutionOutput {
    /// GeoJSON geometry object covering the processed scene.
    pub geometry: Value,
    pub algorithm_url: String,
    pub created_on: Timestamp,
    pub image_capture_date: Timestamp,
    /// Artifact id of the GeoJSON output file.
    pub geojson_data_id: String,
    pub image_id: String,
    pub sensor_name: String,
    pub name: String,
}

/// Turns raw execution-output content into an [`ExecutionOutput`].
pub trait OutputParser: Send + Sync {
    fn parse(&self, content: &str) -> Result<ExecutionOutput, ParseError>;
}

/// Parser for the JSON execution-output documents published by the
/// remote service.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonOutputParser;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawOutput {
    #[serde(rename = "OutFiles")]
    out_files: Option<Map<String, Value>>,
    geometry: Option<Value>,
    algorithm_url: Option<String>,
    created_on: Option<String>,
    image_capture_date: Option<String>,
    image_id: Option<String>,
    sensor_name: Option<String>,
    name: Option<String>,
}

impl OutputParser for JsonOutputParser {
    fn parse(&self, content: &str) -> Result<ExecutionOutput, ParseError> {
        let raw: RawOutput = serde_json::from_str(content)?;

        let manifest = raw.out_files.ok_or(ParseError::MissingManifest)?;
        let geojson_data_id = find_output_artifact(&manifest)?;

        let geometry = raw
            .geometry
            .filter(|g| g.get("type").and_then(Value::as_str).is_some())
            .ok_or(ParseError::MissingField("geometry"))?;

        Ok(ExecutionOutput {
            geometry,
            algorithm_url: required("algorithmUrl", raw.algorithm_url)?,
            created_on: timestamp("createdOn", raw.created_on)?,
            image_capture_date: timestamp("imageCaptureDate", raw.image_capture_date)?,
            geojson_data_id,
            image_id: required("imageId", raw.image_id)?,
            sensor_name: required("sensorName", raw.sensor_name)?,
            name: raw.name.unwrap_or_default(),
        })
    }
}

fn required(field: &'static str, value: Option<String>) -> Result<String, ParseError> {
    value
        .filter(|v| !v.is_empty())
        .ok_or(ParseError::MissingField(field))
}

fn timestamp(field: &'static str, value: Option<String>) -> Result<Timestamp, ParseError> {
    let value = required(field, value)?;
    DateTime::parse_from_rfc3339(&value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|_| ParseError::InvalidTimestamp { field, value })
}
