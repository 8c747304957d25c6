//! Remote execution client for the Piazza job gateway.
//!
//! Provides the [`ExecutionClient`](client::ExecutionClient) contract the
//! job tracker and importer are written against, typed request and
//! response messages, and a [`reqwest`]-backed implementation
//! ([`PiazzaApi`](api::PiazzaApi)).

pub mod api;
pub mod client;
pub mod messages;
