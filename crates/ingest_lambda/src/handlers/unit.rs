use std::time::{Duration, Instant};

use chrono::Utc;
use ingest_core::contract::{Unit, UnitSummary};
use ingest_core::record::{InvocationMeta, RecordBuilder};
use serde_json::json;

use crate::adapters::record_store::RecordStore;
use crate::handlers::writer::{write_record, WriteOutcome};
use crate::logging::{log_error, log_info};
use crate::runtime::ColdStart;

const COMPONENT: &str = "unit_processor";

/// Per-invocation collaborators shared by every unit of a delivery.
#[derive(Clone, Copy)]
pub struct ProcessContext<'a> {
    pub store: &'a dyn RecordStore,
    pub cold_start: &'a ColdStart,
    pub origin_label: &'a str,
    pub invocation: &'a InvocationMeta,
    /// Invocation deadline in epoch milliseconds, if the host supplies one.
    pub deadline_ms: Option<i64>,
}

impl ProcessContext<'_> {
    fn deadline_reached(&self, now_ms: i64) -> bool {
        self.deadline_ms
            .is_some_and(|deadline_ms| now_ms >= deadline_ms)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum UnitFailure {
    #[error("failed to persist {sort_key} of unit {unit_id}: {message}")]
    Store {
        unit_id: String,
        sort_key: String,
        message: String,
    },
    #[error("invocation deadline reached before item {sequence} of unit {unit_id}")]
    DeadlineExceeded { unit_id: String, sequence: usize },
}

/// Writes every item of `unit` in sequence order and summarizes the pass.
///
/// The first failed write aborts the unit; records written before it stay in
/// the store and are skipped as already present when the unit is redelivered.
/// The process is only marked warm once a unit completes.
pub fn process_unit(unit: &Unit, ctx: &ProcessContext<'_>) -> Result<UnitSummary, UnitFailure> {
    let is_cold_start = ctx.cold_start.is_cold();
    log_info(
        COMPONENT,
        "unit_started",
        json!({
            "unit_id": unit.unit_id.clone(),
            "label": unit.label.clone(),
            "item_size": unit.item_size,
            "item_count": unit.item_count,
            "cold_start": is_cold_start,
        }),
    );

    let builder = RecordBuilder::new(unit, ctx.origin_label, ctx.invocation);
    let mut write_time = Duration::ZERO;
    let mut applied = 0usize;
    let mut already_present = 0usize;
    let unit_started_at = Instant::now();

    for sequence in 0..unit.item_count {
        let now_ms = Utc::now().timestamp_millis();
        if ctx.deadline_reached(now_ms) {
            let failure = UnitFailure::DeadlineExceeded {
                unit_id: unit.unit_id.clone(),
                sequence,
            };
            log_unit_failure(unit, &failure, applied, already_present);
            return Err(failure);
        }

        let record = builder.build(sequence, is_cold_start, now_ms);
        let item_started_at = Instant::now();
        let outcome = write_record(ctx.store, &record);
        write_time += item_started_at.elapsed();

        match outcome {
            WriteOutcome::Applied => applied += 1,
            WriteOutcome::AlreadyPresent => already_present += 1,
            WriteOutcome::Failed(message) => {
                let failure = UnitFailure::Store {
                    unit_id: unit.unit_id.clone(),
                    sort_key: record.key.sort_key,
                    message,
                };
                log_unit_failure(unit, &failure, applied, already_present);
                return Err(failure);
            }
        }
    }

    let batch_elapsed_ms = u64::try_from(unit_started_at.elapsed().as_millis()).unwrap_or(u64::MAX);
    let per_item_avg_ms = duration_ms(write_time) / unit.item_count.max(1) as f64;

    if is_cold_start {
        ctx.cold_start.clear();
    }

    log_info(
        COMPONENT,
        "unit_completed",
        json!({
            "unit_id": unit.unit_id.clone(),
            "applied": applied,
            "already_present": already_present,
            "batch_elapsed_ms": batch_elapsed_ms,
            "per_item_avg_ms": per_item_avg_ms,
        }),
    );

    Ok(UnitSummary {
        unit_id: unit.unit_id.clone(),
        label: unit.label.clone(),
        item_size: unit.item_size,
        item_count: unit.item_count,
        batch_elapsed_ms,
        per_item_avg_ms,
        records_applied: applied,
        records_already_present: already_present,
    })
}

fn duration_ms(duration: Duration) -> f64 {
    duration.as_secs_f64() * 1_000.0
}

fn log_unit_failure(unit: &Unit, failure: &UnitFailure, applied: usize, already_present: usize) {
    log_error(
        COMPONENT,
        "unit_failed",
        json!({
            "unit_id": unit.unit_id.clone(),
            "applied": applied,
            "already_present": already_present,
            "error": failure.to_string(),
        }),
    );
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use ingest_core::record::ItemRecord;
    use ingest_core::storage_keys::record_key;

    use super::*;
    use crate::adapters::memory_store::MemoryRecordStore;
    use crate::adapters::record_store::PutError;
    use crate::test_support::{context, FailingStore};

    fn unit(unit_id: &str, item_count: usize) -> Unit {
        Unit {
            unit_id: unit_id.to_string(),
            item_size: 32,
            item_count,
            label: format!("32Bx{item_count}"),
        }
    }

    #[test]
    fn writes_one_record_per_sequence() {
        let store = MemoryRecordStore::new();
        let cold_start = ColdStart::new();

        let summary =
            process_unit(&unit("u-1", 12), &context(&store, &cold_start)).expect("unit should succeed");

        assert_eq!(summary.item_count, 12);
        let sort_keys: BTreeSet<String> = store.keys().into_iter().map(|key| key.sort_key).collect();
        let expected: BTreeSet<String> = (0..12).map(|sequence| format!("seq#{sequence}")).collect();
        assert_eq!(sort_keys, expected);
        assert!(store
            .keys()
            .iter()
            .all(|key| key.partition_key == "unit#u-1"));
    }

    /// Adds a fixed latency to every put, duplicates included.
    struct SlowStore {
        inner: MemoryRecordStore,
        latency: Duration,
    }

    impl RecordStore for SlowStore {
        fn put_if_absent(&self, record: &ItemRecord) -> Result<(), PutError> {
            std::thread::sleep(self.latency);
            self.inner.put_if_absent(record)
        }
    }

    #[test]
    fn redelivered_unit_creates_no_new_records() {
        let store = MemoryRecordStore::new();
        let cold_start = ColdStart::new();
        let ctx = context(&store, &cold_start);
        let job = unit("u-2", 5);

        let first = process_unit(&job, &ctx).expect("first delivery should succeed");
        assert_eq!(first.records_applied, 5);
        assert_eq!(first.records_already_present, 0);
        let first_pass = store.records();

        let summary = process_unit(&job, &ctx).expect("redelivery should succeed");

        assert_eq!(store.records(), first_pass);
        assert_eq!(summary.item_count, 5);
        assert_eq!(summary.records_applied, 0);
        assert_eq!(summary.records_already_present, 5);
    }

    #[test]
    fn redelivery_average_covers_every_attempted_item() {
        let store = SlowStore {
            inner: MemoryRecordStore::new(),
            latency: Duration::from_millis(2),
        };
        let cold_start = ColdStart::new();
        let ctx = context(&store, &cold_start);
        let job = unit("u-timed", 4);

        process_unit(&job, &ctx).expect("first delivery should succeed");
        let summary = process_unit(&job, &ctx).expect("redelivery should succeed");

        assert_eq!(summary.records_already_present, job.item_count);
        assert_eq!(summary.records_applied, 0);
        assert!(
            summary.per_item_avg_ms >= 2.0,
            "duplicate round-trips should be timed, got {}",
            summary.per_item_avg_ms
        );
        let timed_total = summary.per_item_avg_ms * job.item_count as f64;
        assert!(
            timed_total <= summary.batch_elapsed_ms as f64 + 1.0,
            "timed writes {timed_total}ms exceed elapsed {}ms",
            summary.batch_elapsed_ms
        );
    }

    #[test]
    fn store_failure_aborts_and_keeps_earlier_writes() {
        let store = FailingStore::failing_at(3);
        let cold_start = ColdStart::new();

        let failure = process_unit(&unit("u-3", 6), &context(&store, &cold_start))
            .expect_err("unit should fail at sequence 3");

        assert!(matches!(
            &failure,
            UnitFailure::Store { unit_id, sort_key, .. } if unit_id == "u-3" && sort_key == "seq#3"
        ));
        assert_eq!(store.inner.len(), 3);
        assert!(store.inner.get(&record_key("u-3", 4)).is_none());
    }

    #[test]
    fn passed_deadline_fails_before_writing() {
        let store = MemoryRecordStore::new();
        let cold_start = ColdStart::new();
        let ctx = ProcessContext {
            deadline_ms: Some(1),
            ..context(&store, &cold_start)
        };

        let failure = process_unit(&unit("u-4", 3), &ctx).expect_err("deadline should fail unit");

        assert_eq!(
            failure,
            UnitFailure::DeadlineExceeded {
                unit_id: "u-4".to_string(),
                sequence: 0,
            }
        );
        assert!(store.is_empty());
    }

    #[test]
    fn future_deadline_does_not_interrupt() {
        let store = MemoryRecordStore::new();
        let cold_start = ColdStart::new();
        let ctx = ProcessContext {
            deadline_ms: Some(Utc::now().timestamp_millis() + 60_000),
            ..context(&store, &cold_start)
        };

        process_unit(&unit("u-5", 4), &ctx).expect("unit should finish before deadline");
        assert_eq!(store.len(), 4);
    }

    #[test]
    fn only_first_unit_is_stamped_cold() {
        let store = MemoryRecordStore::new();
        let cold_start = ColdStart::new();
        let ctx = context(&store, &cold_start);

        process_unit(&unit("first", 3), &ctx).expect("first unit");
        process_unit(&unit("second", 3), &ctx).expect("second unit");

        for record in store.records() {
            let expected = record.key.partition_key == "unit#first";
            assert_eq!(record.is_cold_start, expected, "{:?}", record.key);
        }
        assert!(!cold_start.is_cold());
    }

    #[test]
    fn failed_first_unit_leaves_redelivery_stamped_cold() {
        let cold_start = ColdStart::new();
        let job = unit("retry-me", 4);

        let flaky = FailingStore::failing_at(0);
        process_unit(&job, &context(&flaky, &cold_start)).expect_err("first attempt should fail");
        assert!(cold_start.is_cold());

        let store = MemoryRecordStore::new();
        let ctx = context(&store, &cold_start);
        process_unit(&job, &ctx).expect("redelivery should succeed");
        process_unit(&unit("later", 2), &ctx).expect("later unit");

        for record in store.records() {
            let expected = record.key.partition_key == "unit#retry-me";
            assert_eq!(record.is_cold_start, expected, "{:?}", record.key);
        }
    }

    #[test]
    fn deadline_failure_keeps_process_cold() {
        let store = MemoryRecordStore::new();
        let cold_start = ColdStart::new();
        let expired = ProcessContext {
            deadline_ms: Some(1),
            ..context(&store, &cold_start)
        };

        process_unit(&unit("late", 2), &expired).expect_err("deadline should fail unit");
        process_unit(&unit("late", 2), &context(&store, &cold_start)).expect("redelivery");

        assert!(store.records().iter().all(|record| record.is_cold_start));
        assert!(!cold_start.is_cold());
    }
}
