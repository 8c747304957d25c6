//! Client-side tracking of remote Beachfront jobs.
//!
//! - [`tracker`]: the job cache. Submits jobs, answers queries, and
//!   advances running jobs one sweep at a time.
//! - [`sweep`]: the cancellable background task that runs sweeps on a
//!   fixed interval.
//! - [`importer`]: the cutoff-bounded batch importer for job history.
//! - [`store`]: persistence of the job cache snapshot.

pub mod config;
pub mod error;
pub mod importer;
pub mod store;
pub mod sweep;
pub mod tracker;
