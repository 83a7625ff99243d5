pub mod memory_store;
pub mod record_store;
