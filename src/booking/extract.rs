//! Pull ids out of upstream responses whose shape varies between endpoints.

use serde_json::Value;

type Extractor = fn(&Value) -> Option<&Value>;

fn top_level_id(payload: &Value) -> Option<&Value> {
    payload.get("id")
}

fn nested_id(payload: &Value) -> Option<&Value> {
    payload.get("data")?.get("id")
}

fn top_level_customer_id(payload: &Value) -> Option<&Value> {
    payload.get("customerId")
}

fn nested_customer_id(payload: &Value) -> Option<&Value> {
    payload.get("data")?.get("customerId")
}

fn top_level_appointment_id(payload: &Value) -> Option<&Value> {
    payload.get("appointmentId")
}

fn nested_appointment_id(payload: &Value) -> Option<&Value> {
    payload.get("data")?.get("appointmentId")
}

// Tried in order, first usable value wins
const CUSTOMER_ID_EXTRACTORS: [Extractor; 4] = [
    top_level_id,
    nested_id,
    top_level_customer_id,
    nested_customer_id,
];

const APPOINTMENT_ID_EXTRACTORS: [Extractor; 4] = [
    top_level_appointment_id,
    top_level_id,
    nested_appointment_id,
    nested_id,
];

fn as_id(value: &Value) -> Option<u64> {
    match value {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => {
            let trimmed = s.trim();
            if trimmed.is_empty() || !trimmed.chars().all(|c| c.is_ascii_digit()) {
                None
            } else {
                trimmed.parse().ok()
            }
        }
        _ => None,
    }
}

/// Customer id from a create-customer response. Values that are present but
/// not numeric are skipped.
pub fn extract_customer_id(payload: &Value) -> Option<u64> {
    CUSTOMER_ID_EXTRACTORS
        .iter()
        .filter_map(|extract| extract(payload))
        .find_map(as_id)
}

/// Appointment id from a create-appointment response, as the upstream sent it
pub fn extract_appointment_id(payload: &Value) -> Option<Value> {
    APPOINTMENT_ID_EXTRACTORS
        .iter()
        .filter_map(|extract| extract(payload))
        .find(|value| !value.is_null())
        .cloned()
}
