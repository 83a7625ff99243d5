use ingest_core::record::{InvocationMeta, ItemRecord};

use crate::adapters::memory_store::MemoryRecordStore;
use crate::adapters::record_store::{PutError, RecordStore};
use crate::handlers::unit::ProcessContext;
use crate::runtime::ColdStart;

static NO_INVOCATION: InvocationMeta = InvocationMeta {
    request_id: None,
    memory_mb: None,
};

/// Memory store that rejects one sequence position with a generic store error.
pub struct FailingStore {
    pub inner: MemoryRecordStore,
    fail_sequence: usize,
}

impl FailingStore {
    pub fn failing_at(fail_sequence: usize) -> Self {
        Self {
            inner: MemoryRecordStore::new(),
            fail_sequence,
        }
    }
}

impl RecordStore for FailingStore {
    fn put_if_absent(&self, record: &ItemRecord) -> Result<(), PutError> {
        if record.sequence == self.fail_sequence {
            return Err(PutError::Store(format!(
                "simulated throttling for {}",
                record.key.sort_key
            )));
        }
        self.inner.put_if_absent(record)
    }
}

pub fn context<'a>(store: &'a dyn RecordStore, cold_start: &'a ColdStart) -> ProcessContext<'a> {
    ProcessContext {
        store,
        cold_start,
        origin_label: "rust",
        invocation: &NO_INVOCATION,
        deadline_ms: None,
    }
}
