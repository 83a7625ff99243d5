//! Pure ingestion domain primitives.
//!
//! This crate owns the unit contract, deterministic record key derivation and
//! record construction. It intentionally excludes AWS SDK and Lambda runtime
//! concerns so redelivery behavior can be reasoned about without I/O.

pub mod contract;
pub mod record;
pub mod storage_keys;
