//! Core types and pure parsing logic for Beachfront job tracking.
//!
//! This crate has no I/O. It provides:
//!
//! - [`job`]: the tracked [`Job`](job::Job) and its status lifecycle.
//! - [`record`]: normalized job-history records produced by the importer.
//! - [`output`]: output-filename generation, output-manifest lookup, and
//!   the execution output parser contract.

pub mod error;
pub mod job;
pub mod output;
pub mod record;
pub mod types;
