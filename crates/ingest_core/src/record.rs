use serde::{Deserialize, Serialize};

use crate::contract::Unit;
use crate::storage_keys::{record_key, RecordKey};

pub const FILLER_BYTE: u8 = b'x';

/// One durable row produced for one sequence position of a unit.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ItemRecord {
    pub key: RecordKey,
    pub origin_label: String,
    pub label: String,
    pub item_size: usize,
    pub sequence: usize,
    pub start_time_ms: i64,
    pub payload: String,
    pub is_cold_start: bool,
    pub request_id: Option<String>,
    pub memory_mb: Option<u32>,
}

/// Host details of the invocation that first wrote a record.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InvocationMeta {
    pub request_id: Option<String>,
    pub memory_mb: Option<u32>,
}

/// Builds the records of a single unit, sharing its filler payload.
#[derive(Debug, Clone)]
pub struct RecordBuilder<'a> {
    unit: &'a Unit,
    origin_label: &'a str,
    invocation: &'a InvocationMeta,
    payload: String,
}

impl<'a> RecordBuilder<'a> {
    pub fn new(unit: &'a Unit, origin_label: &'a str, invocation: &'a InvocationMeta) -> Self {
        Self {
            unit,
            origin_label,
            invocation,
            payload: synthetic_payload(unit.item_size),
        }
    }

    pub fn build(&self, sequence: usize, is_cold_start: bool, start_time_ms: i64) -> ItemRecord {
        ItemRecord {
            key: record_key(&self.unit.unit_id, sequence),
            origin_label: self.origin_label.to_string(),
            label: self.unit.label.clone(),
            item_size: self.unit.item_size,
            sequence,
            start_time_ms,
            payload: self.payload.clone(),
            is_cold_start,
            request_id: self.invocation.request_id.clone(),
            memory_mb: self.invocation.memory_mb,
        }
    }
}

pub fn synthetic_payload(item_size: usize) -> String {
    char::from(FILLER_BYTE).to_string().repeat(item_size)
}
