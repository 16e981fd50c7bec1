//! Validation helpers for inbound booking data.
//
// Phone numbers, birthdays, emails, appointment ids and the shared secret.

use once_cell::sync::Lazy;
use regex::Regex;

static EMAIL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z0-9._%+-]{1,64}@(?:[A-Za-z0-9-]{1,63}\.){1,8}[A-Za-z]{2,63}$")
        .expect("email regex")
});

static DOB: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(\d{2})-(\d{2})$").expect("dob regex"));

/// Keep digits only ("+84 912-345-678" -> "84912345678")
pub fn normalize_phone(input: &str) -> String {
    input.chars().filter(char::is_ascii_digit).collect()
}

/// Date of birth as `MM-DD`. February 29 is allowed.
pub fn validate_dob(dob: &str) -> bool {
    let Some(caps) = DOB.captures(dob.trim()) else {
        return false;
    };
    let (Ok(month), Ok(day)) = (caps[1].parse::<u32>(), caps[2].parse::<u32>()) else {
        return false;
    };
    // 2000 is a leap year, so 02-29 is accepted
    chrono::NaiveDate::from_ymd_opt(2000, month, day).is_some()
}

pub fn validate_email(email: &str) -> bool {
    EMAIL.is_match(email.trim())
}

/// Appointment ids are positive integers, possibly sent as strings
pub fn parse_appointment_id(raw: &str) -> Option<u64> {
    let trimmed = raw.trim();
    if trimmed.is_empty() || !trimmed.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    trimmed.parse().ok().filter(|id| *id > 0)
}

/// Compare the shared secret without short-circuiting on the first mismatch
pub fn secret_matches(expected: &str, provided: &str) -> bool {
    let (a, b) = (expected.as_bytes(), provided.as_bytes());
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}
