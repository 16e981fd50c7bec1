//! Ontiloo open API integration
//!
//! The booking flow talks to Ontiloo through the [`BookingBackend`] trait so
//! the orchestrator can be exercised against an in-memory fake.

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;

mod client;
#[cfg(test)]
pub(crate) mod fake;

pub use client::OntilooClient;

pub const CUSTOMER_PATH: &str = "/api/v1/open-api/customer";
pub const APPOINTMENTS_PATH: &str = "/api/v1/open-api/appointments";
pub const DELETE_APPOINTMENT_PATH: &str = "/api/v1/appointment/deleteAppointment";

/// Failures talking to the upstream service
#[derive(Debug, Clone, thiserror::Error)]
pub enum BackendError {
    #[error("Ontiloo rejected the request: {status} {code} - {message}")]
    Rejected {
        status: u16,
        code: String,
        message: String,
        payload: Value,
    },
    #[error("Ontiloo request failed: {0}")]
    Transport(String),
}

/// Body of the create-customer call
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewCustomer {
    pub name: String,
    pub phone: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    /// `MM-DD`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dob: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AppointmentItem {
    pub start_time: String,
    pub end_time: String,
    pub request_staff: bool,
    pub service_ids: Vec<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub staff_id: Option<u64>,
}

/// Body of the create-appointment call
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AppointmentRequest {
    pub customer_id: u64,
    pub group: u64,
    pub items: Vec<AppointmentItem>,
    pub note: String,
    pub reference_id: String,
    pub source_type: String,
}

#[async_trait]
pub trait BookingBackend: Send + Sync {
    async fn create_customer(&self, customer: &NewCustomer) -> Result<Value, BackendError>;

    async fn create_appointment(&self, request: &AppointmentRequest)
        -> Result<Value, BackendError>;

    async fn delete_appointment(&self, appointment_id: u64) -> Result<Value, BackendError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_appointment_request_wire_shape() {
        let request = AppointmentRequest {
            customer_id: 77,
            group: 1656,
            items: vec![
                AppointmentItem {
                    start_time: "02/15/2024 15:00".to_string(),
                    end_time: "02/15/2024 15:30".to_string(),
                    request_staff: true,
                    service_ids: vec![6137],
                    staff_id: Some(1643),
                },
                AppointmentItem {
                    start_time: "02/15/2024 16:00".to_string(),
                    end_time: "02/15/2024 16:30".to_string(),
                    request_staff: false,
                    service_ids: vec![1, 2],
                    staff_id: None,
                },
            ],
            note: String::new(),
            reference_id: "call-1".to_string(),
            source_type: "AI".to_string(),
        };

        assert_eq!(
            serde_json::to_value(&request).unwrap(),
            json!({
                "customerId": 77,
                "group": 1656,
                "items": [
                    {
                        "startTime": "02/15/2024 15:00",
                        "endTime": "02/15/2024 15:30",
                        "requestStaff": true,
                        "serviceIds": [6137],
                        "staffId": 1643
                    },
                    {
                        "startTime": "02/15/2024 16:00",
                        "endTime": "02/15/2024 16:30",
                        "requestStaff": false,
                        "serviceIds": [1, 2]
                    }
                ],
                "note": "",
                "referenceId": "call-1",
                "sourceType": "AI"
            })
        );
    }

    #[test]
    fn test_new_customer_skips_missing_fields() {
        let customer = NewCustomer {
            name: "Lan".to_string(),
            phone: "0901234567".to_string(),
            email: None,
            dob: Some("02-15".to_string()),
        };
        assert_eq!(
            serde_json::to_value(&customer).unwrap(),
            json!({ "name": "Lan", "phone": "0901234567", "dob": "02-15" })
        );
    }
}
