use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const DEFAULT_ITEM_SIZE: usize = 1024;
pub const DEFAULT_ITEM_COUNT: usize = 100;
pub const DEFAULT_ORIGIN_LABEL: &str = "rust";
/// DynamoDB item size limit. Payloads close to it may still be rejected by
/// the store once attribute names are counted, which fails only that unit.
pub const MAX_ITEM_SIZE: usize = 400 * 1024;

/// Unit of work as it arrives on the wire. Every field is optional.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct UnitRequest {
    #[serde(default, alias = "batch_id", skip_serializing_if = "Option::is_none")]
    pub unit_id: Option<String>,
    #[serde(default, alias = "size_bytes", skip_serializing_if = "Option::is_none")]
    pub item_size: Option<i64>,
    #[serde(default, alias = "count", skip_serializing_if = "Option::is_none")]
    pub item_count: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Unit {
    pub unit_id: String,
    pub item_size: usize,
    pub item_count: usize,
    pub label: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UnitSummary {
    pub unit_id: String,
    pub label: String,
    pub item_size: usize,
    pub item_count: usize,
    pub batch_elapsed_ms: u64,
    /// Mean store round-trip over every attempted item, duplicates included.
    pub per_item_avg_ms: f64,
    pub records_applied: usize,
    pub records_already_present: usize,
}

/// Summary returned to direct (non-queue) callers.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SingletonResponse {
    pub unit_id: String,
    pub lang: String,
    pub label: String,
    pub item_size: usize,
    pub item_count: usize,
    pub batch_elapsed_ms: u64,
    pub per_item_avg_ms: f64,
}

impl SingletonResponse {
    pub fn from_summary(summary: UnitSummary, lang: impl Into<String>) -> Self {
        Self {
            unit_id: summary.unit_id,
            lang: lang.into(),
            label: summary.label,
            item_size: summary.item_size,
            item_count: summary.item_count,
            batch_elapsed_ms: summary.batch_elapsed_ms,
            per_item_avg_ms: summary.per_item_avg_ms,
        }
    }
}

/// SQS batch delivery envelope.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct QueueEnvelope {
    #[serde(rename = "Records")]
    pub records: Vec<QueueMessage>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct QueueMessage {
    #[serde(rename = "messageId")]
    pub message_id: String,
    #[serde(default)]
    pub body: Value,
}

/// SQS partial batch response. Members absent from the list are acknowledged.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct BatchResponse {
    #[serde(rename = "batchItemFailures")]
    pub batch_item_failures: Vec<BatchItemFailure>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BatchItemFailure {
    #[serde(rename = "itemIdentifier")]
    pub item_identifier: String,
}

impl BatchResponse {
    pub fn record_failure(&mut self, item_identifier: impl Into<String>) {
        self.batch_item_failures.push(BatchItemFailure {
            item_identifier: item_identifier.into(),
        });
    }

    pub fn failed_identifiers(&self) -> Vec<&str> {
        self.batch_item_failures
            .iter()
            .map(|failure| failure.item_identifier.as_str())
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("item_size {requested} exceeds the per-record limit of {MAX_ITEM_SIZE} bytes")]
    ItemSizeTooLarge { requested: i64 },
}

pub fn default_label(item_size: usize, item_count: usize) -> String {
    format!("{item_size}Bx{item_count}")
}

/// Applies defaults to every missing, blank or non-positive field.
///
/// The only rejected input is an `item_size` no store record could hold.
/// `generate_id` is only called when the request carries no usable unit id.
pub fn normalize_unit(
    request: UnitRequest,
    generate_id: impl FnOnce() -> String,
) -> Result<Unit, ValidationError> {
    let item_size = match positive(request.item_size) {
        Some(size) if size > MAX_ITEM_SIZE => {
            return Err(ValidationError::ItemSizeTooLarge {
                requested: request.item_size.unwrap_or_default(),
            });
        }
        Some(size) => size,
        None => DEFAULT_ITEM_SIZE,
    };
    let unit_id = non_blank(request.unit_id).unwrap_or_else(generate_id);
    let item_count = positive(request.item_count).unwrap_or(DEFAULT_ITEM_COUNT);
    let label = non_blank(request.label).unwrap_or_else(|| default_label(item_size, item_count));

    Ok(Unit {
        unit_id,
        item_size,
        item_count,
        label,
    })
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|text| !text.trim().is_empty())
}

fn positive(value: Option<i64>) -> Option<usize> {
    value
        .filter(|number| *number > 0)
        .map(|number| usize::try_from(number).unwrap_or(usize::MAX))
}
