use crate::ontiloo::{AppointmentItem, NewCustomer};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// An id that may arrive as a JSON number or a numeric string
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum NumberLike {
    Number(u64),
    Text(String),
}

impl NumberLike {
    pub fn as_u64(&self) -> Option<u64> {
        match self {
            NumberLike::Number(n) => Some(*n),
            NumberLike::Text(s) => {
                let trimmed = s.trim();
                if trimmed.is_empty() || !trimmed.chars().all(|c| c.is_ascii_digit()) {
                    return None;
                }
                trimmed.parse().ok()
            }
        }
    }

    pub fn is_blank(&self) -> bool {
        matches!(self, NumberLike::Text(s) if s.trim().is_empty())
    }
}

impl fmt::Display for NumberLike {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NumberLike::Number(n) => write!(f, "{}", n),
            NumberLike::Text(s) => write!(f, "{}", s.trim()),
        }
    }
}

impl From<u64> for NumberLike {
    fn from(n: u64) -> Self {
        NumberLike::Number(n)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CustomerInfo {
    pub id: Option<NumberLike>,
    pub name: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    /// `MM-DD`
    pub dob: Option<String>,
}

/// One structured appointment item as sent by the voice agent
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemInput {
    pub start_time: Option<String>,
    pub end_time: Option<String>,
    pub service_ids: Option<Vec<NumberLike>>,
    pub staff_id: Option<NumberLike>,
    pub request_staff: Option<bool>,
}

/// Inbound booking request. Everything is optional here; the orchestrator
/// decides what is missing.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingRequest {
    pub customer_id: Option<NumberLike>,
    pub customer: Option<CustomerInfo>,
    /// Free-text time such as "3 chiều 15/2"
    pub time: Option<String>,
    pub duration_minutes: Option<u32>,
    pub items: Option<Vec<ItemInput>>,
    pub service_ids: Option<Vec<NumberLike>>,
    pub staff_id: Option<NumberLike>,
    pub request_staff: Option<bool>,
    pub group: Option<NumberLike>,
    pub note: Option<String>,
    pub reference_id: Option<String>,
    pub source_type: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum CustomerRef {
    Existing(u64),
    New(NewCustomer),
}

/// A validated booking with every default applied, ready to submit
#[derive(Debug, Clone, PartialEq)]
pub struct PreparedBooking {
    pub customer: CustomerRef,
    pub group: u64,
    pub items: Vec<AppointmentItem>,
    pub note: String,
    pub reference_id: String,
    pub source_type: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingResult {
    /// Passed through as the upstream returned it
    pub appointment_id: Option<Value>,
    pub raw: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CancelResult {
    pub appointment_id: u64,
    pub raw: Value,
}
