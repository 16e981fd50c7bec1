use crate::ontiloo::BackendError;
use crate::time_parser::TimeError;
use serde_json::Value;

/// Everything that can stop a booking or cancellation
#[derive(Debug, thiserror::Error)]
pub enum BookingError {
    #[error("customerId, or customer.name and customer.phone, are required")]
    MissingCustomerInfo,

    #[error("Invalid customer info: {0}")]
    InvalidCustomerInfo(String),

    #[error(transparent)]
    Time(#[from] TimeError),

    #[error("serviceIds is required and no default service is configured")]
    MissingServiceIds,

    #[error("staffId is required when requestStaff=true and no default staff is configured")]
    MissingStaffId,

    #[error("A numeric appointmentId is required")]
    MissingAppointmentId,

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Cannot resolve customerId from the create-customer response")]
    CustomerCreateFailed { payload: Value },

    #[error(transparent)]
    Backend(#[from] BackendError),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl BookingError {
    /// Stable machine-readable code returned to the caller
    pub fn code(&self) -> &str {
        match self {
            BookingError::MissingCustomerInfo => "MISSING_CUSTOMER_INFO",
            BookingError::InvalidCustomerInfo(_) => "INVALID_CUSTOMER_INFO",
            BookingError::Time(TimeError::MissingTime) => "MISSING_TIME",
            BookingError::Time(TimeError::MissingTimeOfDay(_)) => "MISSING_TIME_OF_DAY",
            BookingError::Time(TimeError::InvalidTime(_)) => "INVALID_TIME",
            BookingError::MissingServiceIds => "MISSING_SERVICE_IDS",
            BookingError::MissingStaffId => "MISSING_STAFF_ID",
            BookingError::MissingAppointmentId => "MISSING_APPOINTMENT_ID",
            BookingError::InvalidRequest(_) => "INVALID_REQUEST",
            BookingError::CustomerCreateFailed { .. } => "CUSTOMER_CREATE_FAILED",
            BookingError::Backend(BackendError::Rejected { code, .. }) => code,
            BookingError::Backend(BackendError::Transport(_)) => "UPSTREAM_UNAVAILABLE",
            BookingError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// True for errors caused by the caller's input rather than the upstream
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            BookingError::MissingCustomerInfo
                | BookingError::InvalidCustomerInfo(_)
                | BookingError::Time(_)
                | BookingError::MissingServiceIds
                | BookingError::MissingStaffId
                | BookingError::MissingAppointmentId
                | BookingError::InvalidRequest(_)
        )
    }
}
