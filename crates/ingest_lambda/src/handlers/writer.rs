use ingest_core::record::ItemRecord;

use crate::adapters::record_store::{PutError, RecordStore};

/// Classified result of one conditional write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteOutcome {
    Applied,
    /// A previous delivery already wrote this key; stored state is unchanged.
    AlreadyPresent,
    Failed(String),
}

impl WriteOutcome {
    pub fn is_success(&self) -> bool {
        !matches!(self, Self::Failed(_))
    }
}

pub fn write_record(store: &dyn RecordStore, record: &ItemRecord) -> WriteOutcome {
    match store.put_if_absent(record) {
        Ok(()) => WriteOutcome::Applied,
        Err(PutError::ConditionFailed) => WriteOutcome::AlreadyPresent,
        Err(PutError::Store(message)) => WriteOutcome::Failed(message),
    }
}
