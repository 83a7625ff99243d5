use chrono::Utc;
use ingest_core::contract::{
    normalize_unit, BatchResponse, QueueEnvelope, QueueMessage, SingletonResponse, Unit,
    UnitRequest,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::handlers::unit::{process_unit, ProcessContext, UnitFailure};
use crate::logging::{log_error, log_info};

const COMPONENT: &str = "batch_dispatcher";

/// Inbound payload after shape detection.
#[derive(Debug, Clone, PartialEq)]
pub enum InboundPayload {
    Batch(Vec<QueueMessage>),
    Singleton(UnitRequest),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum HandlerResponse {
    Summary(SingletonResponse),
    Batch(BatchResponse),
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HandlerError {
    #[error("invalid unit payload: {0}")]
    Decode(String),
    #[error(transparent)]
    Unit(#[from] UnitFailure),
}

/// Decodes a queue envelope when the payload carries one with at least one
/// record, otherwise decodes the payload as a single unit.
pub fn classify_payload(event: Value) -> Result<InboundPayload, HandlerError> {
    if let Ok(envelope) = QueueEnvelope::deserialize(&event) {
        if !envelope.records.is_empty() {
            return Ok(InboundPayload::Batch(envelope.records));
        }
    }

    let payload = unwrap_http_body(event)?;
    serde_json::from_value::<UnitRequest>(payload)
        .map(InboundPayload::Singleton)
        .map_err(|error| HandlerError::Decode(error.to_string()))
}

pub fn handle_event(event: Value, ctx: &ProcessContext<'_>) -> Result<HandlerResponse, HandlerError> {
    match classify_payload(event)? {
        InboundPayload::Batch(messages) => Ok(HandlerResponse::Batch(handle_batch(&messages, ctx))),
        InboundPayload::Singleton(request) => {
            let unit = normalize_unit(request, generate_unit_id)
                .map_err(|error| HandlerError::Decode(error.to_string()))?;
            let summary = process_unit(&unit, ctx)?;
            Ok(HandlerResponse::Summary(SingletonResponse::from_summary(
                summary,
                ctx.origin_label,
            )))
        }
    }
}

/// Processes members in delivery order and lists the ones needing redelivery.
pub fn handle_batch(messages: &[QueueMessage], ctx: &ProcessContext<'_>) -> BatchResponse {
    let mut response = BatchResponse::default();

    for message in messages {
        let unit = match decode_member(message) {
            Ok(value) => value,
            Err(error) => {
                log_error(
                    COMPONENT,
                    "member_decode_failed",
                    json!({
                        "message_id": message.message_id.clone(),
                        "error": error,
                    }),
                );
                response.record_failure(message.message_id.clone());
                continue;
            }
        };

        if let Err(failure) = process_unit(&unit, ctx) {
            log_error(
                COMPONENT,
                "member_failed",
                json!({
                    "message_id": message.message_id.clone(),
                    "unit_id": unit.unit_id,
                    "error": failure.to_string(),
                }),
            );
            response.record_failure(message.message_id.clone());
        }
    }

    log_info(
        COMPONENT,
        "batch_completed",
        json!({
            "members": messages.len(),
            "failed": response.batch_item_failures.len(),
        }),
    );
    response
}

/// A member without its own unit id falls back to the message id, which the
/// queue keeps stable across redeliveries.
fn decode_member(message: &QueueMessage) -> Result<Unit, String> {
    let Some(body) = message.body.as_str() else {
        return Err("queue message body must be a string".to_string());
    };
    let request: UnitRequest = serde_json::from_str(body)
        .map_err(|error| format!("invalid unit payload in message body: {error}"))?;
    normalize_unit(request, || message.message_id.clone()).map_err(|error| error.to_string())
}

fn generate_unit_id() -> String {
    let nanos = Utc::now().timestamp_nanos_opt().unwrap_or_default();
    format!("unit-{nanos}")
}

/// Function URL and API Gateway deliveries wrap the unit in `body`.
fn unwrap_http_body(event: Value) -> Result<Value, HandlerError> {
    let Some(object) = event.as_object() else {
        return Err(HandlerError::Decode(
            "payload must be a JSON object".to_string(),
        ));
    };

    let Some(body) = object.get("body") else {
        return Ok(event);
    };

    match body {
        Value::Null => Ok(json!({})),
        Value::Object(_) => Ok(body.clone()),
        Value::String(text) => serde_json::from_str(text)
            .map_err(|error| HandlerError::Decode(format!("malformed JSON body: {error}"))),
        _ => Err(HandlerError::Decode(
            "request body must be a JSON object".to_string(),
        )),
    }
}
