//! Booking orchestration
//!
//! Turns an inbound [`BookingRequest`] into upstream calls. Work is split in
//! two: [`BookingOrchestrator::prepare`] validates and applies defaults without
//! any I/O, then [`BookingOrchestrator::submit`] creates the customer (when
//! needed) and the appointment.

mod error;
mod extract;
mod request;

pub use error::BookingError;
pub use extract::{extract_appointment_id, extract_customer_id};
pub use request::{
    BookingRequest, BookingResult, CancelResult, CustomerInfo, CustomerRef, ItemInput, NumberLike,
    PreparedBooking,
};

use crate::config::BookingDefaults;
use crate::ontiloo::{AppointmentItem, AppointmentRequest, BookingBackend, NewCustomer};
use crate::time_parser::wire_format::parse_wire;
use crate::time_parser::{
    structured_to_wire, ParseSettings, TimeError, TimeWindow, TzOffset, WIRE_FORMAT,
};
use crate::validation::{normalize_phone, parse_appointment_id, validate_dob, validate_email};
use chrono::{DateTime, Duration, Utc};
use log::{debug, info, warn};
use rand::seq::SliceRandom;
use rand::Rng;
use std::sync::Arc;

pub struct BookingOrchestrator {
    backend: Arc<dyn BookingBackend>,
    defaults: BookingDefaults,
}

impl BookingOrchestrator {
    pub fn new(backend: Arc<dyn BookingBackend>, defaults: BookingDefaults) -> Self {
        Self { backend, defaults }
    }

    pub fn tz_offset(&self) -> TzOffset {
        self.defaults.tz_offset
    }

    /// Validate the request and build the booking, no I/O.
    ///
    /// `rng` is only used to pick a service or staff member from the
    /// configured pools when the request names none.
    pub fn prepare<R: Rng + ?Sized>(
        &self,
        request: &BookingRequest,
        now_utc: DateTime<Utc>,
        rng: &mut R,
    ) -> Result<PreparedBooking, BookingError> {
        let customer = self.customer_ref(request)?;

        let settings = ParseSettings::new(self.defaults.tz_offset, now_utc);
        let duration = request
            .duration_minutes
            .unwrap_or(self.defaults.duration_minutes);
        let items = self.build_items(request, duration, &settings, rng)?;

        let group = match request.group.as_ref().filter(|g| !g.is_blank()) {
            Some(group) => group
                .as_u64()
                .ok_or_else(|| BookingError::InvalidRequest(format!("group '{}' is not numeric", group)))?,
            None => self.defaults.group,
        };

        Ok(PreparedBooking {
            customer,
            group,
            items,
            note: request.note.clone().unwrap_or_default(),
            reference_id: request.reference_id.clone().unwrap_or_default(),
            source_type: non_blank(request.source_type.as_deref())
                .map(str::to_string)
                .unwrap_or_else(|| self.defaults.source_type.clone()),
        })
    }

    /// Create the customer if needed, then the appointment
    pub async fn submit(&self, prepared: PreparedBooking) -> Result<BookingResult, BookingError> {
        let customer_id = match prepared.customer {
            CustomerRef::Existing(id) => id,
            CustomerRef::New(customer) => {
                info!("Creating customer before booking");
                let payload = self.backend.create_customer(&customer).await?;
                match extract_customer_id(&payload) {
                    Some(id) => {
                        debug!("Created customer {}", id);
                        id
                    }
                    None => {
                        warn!("Create-customer response has no usable id: {}", payload);
                        return Err(BookingError::CustomerCreateFailed { payload });
                    }
                }
            }
        };

        let request = AppointmentRequest {
            customer_id,
            group: prepared.group,
            items: prepared.items,
            note: prepared.note,
            reference_id: prepared.reference_id,
            source_type: prepared.source_type,
        };
        info!(
            "Creating appointment for customer {} with {} item(s)",
            customer_id,
            request.items.len()
        );

        let raw = self.backend.create_appointment(&request).await?;
        let appointment_id = extract_appointment_id(&raw);
        info!("Appointment created: {:?}", appointment_id);

        Ok(BookingResult { appointment_id, raw })
    }

    pub async fn create_booking<R: Rng + Send + ?Sized>(
        &self,
        request: &BookingRequest,
        now_utc: DateTime<Utc>,
        rng: &mut R,
    ) -> Result<BookingResult, BookingError> {
        let prepared = self.prepare(request, now_utc, rng)?;
        self.submit(prepared).await
    }

    pub async fn cancel_booking(&self, appointment_id: &str) -> Result<CancelResult, BookingError> {
        let id = parse_appointment_id(appointment_id).ok_or(BookingError::MissingAppointmentId)?;
        info!("Cancelling appointment {}", id);
        let raw = self.backend.delete_appointment(id).await?;
        Ok(CancelResult {
            appointment_id: id,
            raw,
        })
    }

    /// Resolve free text into the window a booking would use, for read-back
    pub fn preview_window(
        &self,
        text: &str,
        duration_minutes: Option<u32>,
        now_utc: DateTime<Utc>,
    ) -> Result<TimeWindow, BookingError> {
        let settings = ParseSettings::new(self.defaults.tz_offset, now_utc);
        let duration = duration_minutes.unwrap_or(self.defaults.duration_minutes);
        Ok(TimeWindow::from_time_text(text, duration, &settings)?)
    }

    fn customer_ref(&self, request: &BookingRequest) -> Result<CustomerRef, BookingError> {
        let explicit_id = request
            .customer_id
            .as_ref()
            .or_else(|| request.customer.as_ref().and_then(|c| c.id.as_ref()))
            .filter(|id| !id.is_blank());

        if let Some(id) = explicit_id {
            return id
                .as_u64()
                .filter(|id| *id > 0)
                .map(CustomerRef::Existing)
                .ok_or_else(|| {
                    BookingError::InvalidCustomerInfo(format!("customerId '{}' is not a positive number", id))
                });
        }

        let info = request
            .customer
            .as_ref()
            .ok_or(BookingError::MissingCustomerInfo)?;
        let name = non_blank(info.name.as_deref()).ok_or(BookingError::MissingCustomerInfo)?;
        let phone = normalize_phone(info.phone.as_deref().unwrap_or_default());
        if phone.is_empty() {
            return Err(BookingError::MissingCustomerInfo);
        }

        let email = match non_blank(info.email.as_deref()) {
            Some(email) if validate_email(email) => Some(email.to_string()),
            Some(email) => {
                warn!("Ignoring malformed customer email '{}'", email);
                None
            }
            None => None,
        };

        let dob = match non_blank(info.dob.as_deref()) {
            Some(dob) if validate_dob(dob) => Some(dob.to_string()),
            Some(dob) => {
                return Err(BookingError::InvalidCustomerInfo(format!(
                    "dob '{}' must be MM-DD",
                    dob
                )))
            }
            None => None,
        };

        Ok(CustomerRef::New(NewCustomer {
            name: name.to_string(),
            phone,
            email,
            dob,
        }))
    }

    fn build_items<R: Rng + ?Sized>(
        &self,
        request: &BookingRequest,
        duration: u32,
        settings: &ParseSettings,
        rng: &mut R,
    ) -> Result<Vec<AppointmentItem>, BookingError> {
        let items = request.items.as_deref().unwrap_or_default();

        if let Some(text) = non_blank(request.time.as_deref()) {
            let window = TimeWindow::from_time_text(text, duration, settings)?;
            let (start_time, end_time) = window.wire(settings.tz_offset);
            debug!("'{}' -> {} .. {}", text, start_time, end_time);
            let item = self.build_item(start_time, end_time, request, items.first(), rng)?;
            return Ok(vec![item]);
        }

        if items.is_empty() {
            return Err(TimeError::MissingTime.into());
        }

        items
            .iter()
            .map(|input| {
                let (start_time, end_time) = self.item_window(input, duration, settings)?;
                self.build_item(start_time, end_time, request, Some(input), rng)
            })
            .collect()
    }

    /// Wire start/end for a structured item. Structured times are already
    /// local wall-clock time and are not shifted.
    fn item_window(
        &self,
        input: &ItemInput,
        duration: u32,
        settings: &ParseSettings,
    ) -> Result<(String, String), BookingError> {
        let (start_time, default_end) = match non_blank(input.start_time.as_deref()) {
            Some(text) => {
                let start_time = structured_to_wire(text)?;
                let end = parse_wire(&start_time)? + Duration::minutes(i64::from(duration));
                (start_time, end.format(WIRE_FORMAT).to_string())
            }
            None => TimeWindow::next_available(
                settings,
                self.defaults.lead_minutes,
                self.defaults.round_minutes,
                duration,
            )?
            .wire(settings.tz_offset),
        };

        let end_time = match non_blank(input.end_time.as_deref()) {
            Some(text) => structured_to_wire(text)?,
            None => default_end,
        };

        if parse_wire(&end_time)? <= parse_wire(&start_time)? {
            return Err(TimeError::InvalidTime(format!(
                "endTime {} must be after startTime {}",
                end_time, start_time
            ))
            .into());
        }

        Ok((start_time, end_time))
    }

    fn build_item<R: Rng + ?Sized>(
        &self,
        start_time: String,
        end_time: String,
        request: &BookingRequest,
        input: Option<&ItemInput>,
        rng: &mut R,
    ) -> Result<AppointmentItem, BookingError> {
        let request_staff = input
            .and_then(|i| i.request_staff)
            .or(request.request_staff)
            .unwrap_or(self.defaults.request_staff);

        let given_services = input
            .and_then(|i| i.service_ids.as_ref())
            .filter(|ids| !ids.is_empty())
            .or_else(|| request.service_ids.as_ref().filter(|ids| !ids.is_empty()));
        let service_ids = match given_services {
            Some(ids) => ids
                .iter()
                .map(|id| {
                    id.as_u64().ok_or_else(|| {
                        BookingError::InvalidRequest(format!("serviceIds entry '{}' is not numeric", id))
                    })
                })
                .collect::<Result<Vec<_>, _>>()?,
            None => {
                let picked = pick(&self.defaults.service_ids, rng).ok_or(BookingError::MissingServiceIds)?;
                debug!("No serviceIds given, picked {}", picked);
                vec![picked]
            }
        };

        let staff_id = if request_staff {
            let given = input
                .and_then(|i| i.staff_id.as_ref())
                .filter(|id| !id.is_blank())
                .or_else(|| request.staff_id.as_ref().filter(|id| !id.is_blank()));
            let id = match given {
                Some(id) => id.as_u64().filter(|id| *id > 0).ok_or_else(|| {
                    BookingError::InvalidRequest(format!("staffId '{}' is not numeric", id))
                })?,
                None => {
                    let picked = pick(&self.defaults.staff_ids, rng).ok_or(BookingError::MissingStaffId)?;
                    debug!("No staffId given, picked {}", picked);
                    picked
                }
            };
            Some(id)
        } else {
            None
        };

        Ok(AppointmentItem {
            start_time,
            end_time,
            request_staff,
            service_ids,
            staff_id,
        })
    }
}

fn pick<R: Rng + ?Sized>(pool: &[u64], rng: &mut R) -> Option<u64> {
    pool.choose(rng).copied()
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}
