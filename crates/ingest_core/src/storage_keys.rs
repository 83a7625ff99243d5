use serde::{Deserialize, Serialize};

pub const PARTITION_KEY_PREFIX: &str = "unit#";
pub const SORT_KEY_PREFIX: &str = "seq#";

/// Composite storage key of one record.
///
/// Derived only from the unit id and the item sequence, never from the clock,
/// so a redelivered unit maps onto the keys of its earlier attempts.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RecordKey {
    pub partition_key: String,
    pub sort_key: String,
}

pub fn partition_key(unit_id: &str) -> String {
    format!("{PARTITION_KEY_PREFIX}{unit_id}")
}

pub fn sort_key(sequence: usize) -> String {
    format!("{SORT_KEY_PREFIX}{sequence}")
}

pub fn record_key(unit_id: &str, sequence: usize) -> RecordKey {
    RecordKey {
        partition_key: partition_key(unit_id),
        sort_key: sort_key(sequence),
    }
}
