//! Normalized job-history records.
//!
//! An [`ImportedRecord`] is built from one execution-output document and
//! serializes as a GeoJSON `Feature` so the map layer can render it
//! directly.

use serde::Serialize;

use crate::output::ExecutionOutput;
use crate::types::Timestamp;

/// Schema version stamped on every imported record.
pub const RECORD_SCHEMA_VERSION: u32 = 1;

/// Record-type tag stamped on every imported record.
pub const RECORD_TYPE_JOB: &str = "JOB";

/// Status carried by imported records. Only finished, successful jobs
/// publish an execution-output document.
pub const RECORD_STATUS_SUCCESS: &str = "Success";

/// Property set of an [`ImportedRecord`].
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordProperties {
    pub algorithm_name: String,
    pub created_on: Timestamp,
    pub image_id: String,
    pub image_capture_date: Timestamp,
    pub name: String,
    pub sensor_name: String,
    /// Artifact id of the GeoJSON output.
    pub result_id: String,
    pub status: String,
    #[serde(rename = "__schemaVersion__")]
    pub schema_version: u32,
    #[serde(rename = "type")]
    pub record_type: String,
}

/// One historical job, reconstructed from its execution output.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename = "Feature")]
pub struct ImportedRecord {
    /// Id the record was imported from.
    pub id: String,
    pub geometry: serde_json::Value,
    pub properties: RecordProperties,
}

impl ImportedRecord {
    /// Build a record from parsed output and the resolved algorithm name.
    pub fn from_output(
        id: impl Into<String>,
        output: ExecutionOutput,
        algorithm_name: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            geometry: output.geometry,
            properties: RecordProperties {
                algorithm_name: algorithm_name.into(),
                created_on: output.created_on,
                image_id: output.image_id,
                image_capture_date: output.image_capture_date,
                name: output.name,
                sensor_name: output.sensor_name,
                result_id: output.geojson_data_id,
                status: RECORD_STATUS_SUCCESS.to_string(),
                schema_version: RECORD_SCHEMA_VERSION,
                record_type: RECORD_TYPE_JOB.to_string(),
            },
        }
    }

    pub fn created_on(&self) -> Timestamp {
        self.properties.created_on
    }
}
