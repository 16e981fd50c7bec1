//! In-memory backend for unit tests

use super::{AppointmentRequest, BackendError, BookingBackend, NewCustomer};
use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::Mutex;

pub(crate) struct FakeBackend {
    customer_reply: Result<Value, BackendError>,
    appointment_reply: Result<Value, BackendError>,
    delete_reply: Result<Value, BackendError>,
    pub customers: Mutex<Vec<NewCustomer>>,
    pub appointments: Mutex<Vec<AppointmentRequest>>,
    pub deletions: Mutex<Vec<u64>>,
}

impl FakeBackend {
    pub fn new() -> Self {
        Self {
            customer_reply: Ok(json!({ "data": { "id": 501 } })),
            appointment_reply: Ok(json!({ "data": { "appointmentId": 9001 } })),
            delete_reply: Ok(json!({ "success": true })),
            customers: Mutex::new(Vec::new()),
            appointments: Mutex::new(Vec::new()),
            deletions: Mutex::new(Vec::new()),
        }
    }

    pub fn with_customer_reply(mut self, reply: Result<Value, BackendError>) -> Self {
        self.customer_reply = reply;
        self
    }

    pub fn with_appointment_reply(mut self, reply: Result<Value, BackendError>) -> Self {
        self.appointment_reply = reply;
        self
    }

    pub fn with_delete_reply(mut self, reply: Result<Value, BackendError>) -> Self {
        self.delete_reply = reply;
        self
    }

    pub fn call_count(&self) -> usize {
        self.customers.lock().unwrap().len()
            + self.appointments.lock().unwrap().len()
            + self.deletions.lock().unwrap().len()
    }
}

#[async_trait]
impl BookingBackend for FakeBackend {
    async fn create_customer(&self, customer: &NewCustomer) -> Result<Value, BackendError> {
        self.customers.lock().unwrap().push(customer.clone());
        self.customer_reply.clone()
    }

    async fn create_appointment(
        &self,
        request: &AppointmentRequest,
    ) -> Result<Value, BackendError> {
        self.appointments.lock().unwrap().push(request.clone());
        self.appointment_reply.clone()
    }

    async fn delete_appointment(&self, appointment_id: u64) -> Result<Value, BackendError> {
        self.deletions.lock().unwrap().push(appointment_id);
        self.delete_reply.clone()
    }
}
