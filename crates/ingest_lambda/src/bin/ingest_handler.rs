use std::collections::HashMap;

use aws_sdk_dynamodb::error::SdkError;
use aws_sdk_dynamodb::operation::put_item::PutItemError;
use aws_sdk_dynamodb::types::AttributeValue;
use ingest_core::record::{InvocationMeta, ItemRecord};
use ingest_lambda::adapters::record_store::{PutError, RecordStore};
use ingest_lambda::config::IngestConfig;
use ingest_lambda::handlers::dispatch::{handle_event, HandlerResponse};
use ingest_lambda::handlers::unit::ProcessContext;
use ingest_lambda::logging::{log_error, log_info};
use ingest_lambda::runtime::RuntimeState;
use lambda_runtime::{service_fn, Error, LambdaEvent};
use serde_json::{json, Value};

const INSERT_IF_ABSENT: &str = "attribute_not_exists(pk) AND attribute_not_exists(sk)";

struct DynamoRecordStore {
    table_name: String,
    client: aws_sdk_dynamodb::Client,
}

impl RecordStore for DynamoRecordStore {
    fn put_if_absent(&self, record: &ItemRecord) -> Result<(), PutError> {
        let table_name = self.table_name.clone();
        let item = record_item(record);
        let client = self.client.clone();

        tokio::task::block_in_place(|| {
            tokio::runtime::Handle::current().block_on(async move {
                client
                    .put_item()
                    .table_name(table_name)
                    .set_item(Some(item))
                    .condition_expression(INSERT_IF_ABSENT)
                    .send()
                    .await
                    .map(|_| ())
                    .map_err(classify_put_error)
            })
        })
    }
}

fn classify_put_error<R>(error: SdkError<PutItemError, R>) -> PutError {
    match error.as_service_error() {
        Some(service_error) if service_error.is_conditional_check_failed_exception() => {
            PutError::ConditionFailed
        }
        _ => PutError::Store(format!("failed to put record to dynamodb: {error}")),
    }
}

fn record_item(record: &ItemRecord) -> HashMap<String, AttributeValue> {
    let mut item = HashMap::from([
        (
            "pk".to_string(),
            AttributeValue::S(record.key.partition_key.clone()),
        ),
        (
            "sk".to_string(),
            AttributeValue::S(record.key.sort_key.clone()),
        ),
        (
            "origin".to_string(),
            AttributeValue::S(record.origin_label.clone()),
        ),
        ("label".to_string(), AttributeValue::S(record.label.clone())),
        (
            "item_size".to_string(),
            AttributeValue::N(record.item_size.to_string()),
        ),
        (
            "seq".to_string(),
            AttributeValue::N(record.sequence.to_string()),
        ),
        (
            "start_time_ms".to_string(),
            AttributeValue::N(record.start_time_ms.to_string()),
        ),
        (
            "payload".to_string(),
            AttributeValue::S(record.payload.clone()),
        ),
        (
            "cold_start".to_string(),
            AttributeValue::Bool(record.is_cold_start),
        ),
    ]);
    if let Some(request_id) = &record.request_id {
        item.insert("request_id".to_string(), AttributeValue::S(request_id.clone()));
    }
    if let Some(memory_mb) = record.memory_mb {
        item.insert("mem_mb".to_string(), AttributeValue::N(memory_mb.to_string()));
    }
    item
}

async fn handle_request(
    event: LambdaEvent<Value>,
    config: &IngestConfig,
    state: &RuntimeState<aws_sdk_dynamodb::Client>,
) -> Result<HandlerResponse, Error> {
    let client = state
        .client_or_init(|| async {
            let aws_config = aws_config::load_defaults(aws_config::BehaviorVersion::latest()).await;
            aws_sdk_dynamodb::Client::new(&aws_config)
        })
        .await;

    let store = DynamoRecordStore {
        table_name: config.table_name.clone(),
        client: client.clone(),
    };
    let invocation = InvocationMeta {
        request_id: Some(event.context.request_id.clone()),
        memory_mb: config.memory_mb,
    };
    let ctx = ProcessContext {
        store: &store,
        cold_start: state.cold_start(),
        origin_label: &config.origin_label,
        invocation: &invocation,
        deadline_ms: i64::try_from(event.context.deadline).ok(),
    };

    handle_event(event.payload, &ctx).map_err(|error| {
        log_error(
            "ingest_handler",
            "invocation_failed",
            json!({
                "request_id": event.context.request_id.clone(),
                "error": error.to_string(),
            }),
        );
        Error::from(error.to_string())
    })
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    let config = IngestConfig::from_env().map_err(|error| Error::from(error.to_string()))?;
    log_info(
        "ingest_handler",
        "runtime_started",
        json!({
            "table_name": config.table_name.clone(),
            "origin_label": config.origin_label.clone(),
            "memory_mb": config.memory_mb,
        }),
    );

    let state = RuntimeState::new();
    let config = &config;
    let state = &state;
    lambda_runtime::run(service_fn(move |event| handle_request(event, config, state))).await
}
