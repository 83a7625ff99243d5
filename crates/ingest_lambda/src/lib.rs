//! AWS-oriented adapters and handlers for idempotent unit ingestion.
//!
//! This crate owns runtime integration details (queue batch dispatch, the
//! conditional-write store boundary and process-scoped state). Key derivation
//! and record construction live in `ingest_core`.

pub mod adapters;
pub mod config;
pub mod handlers;
pub mod logging;
pub mod runtime;

#[cfg(test)]
mod test_support;
