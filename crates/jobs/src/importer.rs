//! Cutoff-bounded batch import of job history.
//!
//! The remote service cannot filter by date, so history is walked from
//! a newest-first id list in small batches. Each batch is fetched
//! concurrently, then scanned in id order; the first record at or before
//! the cutoff ends the walk. At most one batch past the cutoff is
//! fetched, and later batches are never requested.

use std::collections::HashMap;

use beachfront_core::output::{JsonOutputParser, OutputParser};
use beachfront_core::record::ImportedRecord;
use beachfront_core::types::Timestamp;
use beachfront_piazza::client::ExecutionClient;
use futures::future::try_join_all;

use crate::error::{ImportCause, JobError};

/// Number of ids fetched concurrently per batch.
pub const DEFAULT_BATCH_SIZE: usize = 10;

/// Walks an id list and reconstructs records newer than a cutoff.
pub struct BatchImporter<'a> {
    client: &'a dyn ExecutionClient,
    parser: &'a dyn OutputParser,
    batch_size: usize,
}

impl<'a> BatchImporter<'a> {
    /// Importer using [`JsonOutputParser`] and [`DEFAULT_BATCH_SIZE`].
    pub fn new(client: &'a dyn ExecutionClient) -> Self {
        Self {
            client,
            parser: &JsonOutputParser,
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }

    pub fn with_parser(mut self, parser: &'a dyn OutputParser) -> Self {
        self.parser = parser;
        self
    }

    /// Override the batch size. Values below 1 are treated as 1.
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    /// Import records for `ids` (newest first) created strictly after
    /// `cutoff`, preserving input order.
    ///
    /// Any single import failure aborts the whole walk.
    pub async fn fetch_since(
        &self,
        ids: &[String],
        algorithm_names: &HashMap<String, String>,
        cutoff: Timestamp,
    ) -> Result<Vec<ImportedRecord>, JobError> {
        let mut records = Vec::new();

        for (batch_index, batch) in ids.chunks(self.batch_size).enumerate() {
            tracing::debug!(batch_index, size = batch.len(), "Importing history batch");

            let imported =
                try_join_all(batch.iter().map(|id| self.import(id, algorithm_names))).await?;

            for record in imported {
                if record.created_on() <= cutoff {
                    tracing::info!(
                        batch_index,
                        imported = records.len(),
                        cutoff = %cutoff,
                        "Reached history cutoff",
                    );
                    return Ok(records);
                }
                records.push(record);
            }
        }

        tracing::info!(imported = records.len(), "History exhausted before cutoff");
        Ok(records)
    }

    async fn import(
        &self,
        id: &str,
        algorithm_names: &HashMap<String, String>,
    ) -> Result<ImportedRecord, JobError> {
        let import_error = |source: ImportCause| JobError::Import {
            id: id.to_string(),
            source,
        };

        let content = self
            .client
            .fetch_file(id)
            .await
            .map_err(|e| import_error(e.into()))?;
        let output = self
            .parser
            .parse(&content)
            .map_err(|e| import_error(e.into()))?;

        let algorithm_name = algorithm_names
            .get(&output.algorithm_url)
            .cloned()
            .unwrap_or_else(|| output.algorithm_url.clone());

        Ok(ImportedRecord::from_output(id, output, algorithm_name))
    }
}

/// Import records newer than `cutoff` with the default parser and
/// batch size.
pub async fn fetch_since(
    client: &dyn ExecutionClient,
    ids: &[String],
    algorithm_names: &HashMap<String, String>,
    cutoff: Timestamp,
) -> Result<Vec<ImportedRecord>, JobError> {
    BatchImporter::new(client)
        .fetch_since(ids, algorithm_names, cutoff)
        .await
}
