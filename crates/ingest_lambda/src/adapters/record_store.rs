use ingest_core::record::ItemRecord;

/// Store error from a conditional insert.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PutError {
    /// The insert precondition failed because the key is already present.
    #[error("conditional check failed: record already exists")]
    ConditionFailed,
    #[error("{0}")]
    Store(String),
}

pub trait RecordStore {
    /// Inserts `record` only if neither key component exists yet.
    fn put_if_absent(&self, record: &ItemRecord) -> Result<(), PutError>;
}
