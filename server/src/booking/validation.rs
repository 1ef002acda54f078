//! Validation of the form data submitted during the booking flow and the reservation
//! administration.
//!
//! Forms are deserialized with all fields as plain strings (missing fields default to empty
//! strings), so that every problem with the input can be reported as a field-level message
//! instead of a generic deserialization error.

use crate::data_store::models::{DateRange, GuestDetails};
use crate::data_store::RoomId;
use chrono::NaiveDate;
use lazy_static::lazy_static;
use leafsite_api_types::FieldErrors;
use regex::Regex;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fmt::{Display, Formatter};

/// Date format of all date fields in forms and query strings
pub const DATE_FORMAT: &str = "%Y-%m-%d";

const FIRST_NAME_MIN_LENGTH: usize = 3;

lazy_static! {
    static ref EMAIL_REGEX: Regex =
        Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("Email regex should be valid");
}

/// Field-level validation messages, keyed by form field name
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ValidationErrors {
    errors: BTreeMap<String, Vec<String>>,
}

impl ValidationErrors {
    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.errors
            .entry(field.to_owned())
            .or_default()
            .push(message.into());
    }

    pub fn get(&self, field: &str) -> Option<&[String]> {
        self.errors.get(field).map(|v| v.as_slice())
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    /// Merge the messages of another validation result into this one
    pub fn extend(&mut self, other: ValidationErrors) {
        for (field, messages) in other.errors {
            self.errors.entry(field).or_default().extend(messages);
        }
    }

    fn into_result<T>(self, value: T) -> Result<T, ValidationErrors> {
        if self.is_empty() {
            Ok(value)
        } else {
            Err(self)
        }
    }
}

impl From<ValidationErrors> for FieldErrors {
    fn from(value: ValidationErrors) -> Self {
        value.errors
    }
}

impl Display for ValidationErrors {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let mut first = true;
        for (field, messages) in self.errors.iter() {
            for message in messages {
                if !first {
                    f.write_str("; ")?;
                }
                write!(f, "{}: {}", field, message)?;
                first = false;
            }
        }
        Ok(())
    }
}

pub fn is_valid_email(value: &str) -> bool {
    EMAIL_REGEX.is_match(value)
}

fn require(errors: &mut ValidationErrors, field: &str, value: &str) -> bool {
    if value.trim().is_empty() {
        errors.add(field, "This field cannot be blank");
        false
    } else {
        true
    }
}

fn parse_date(errors: &mut ValidationErrors, field: &str, value: &str) -> Option<NaiveDate> {
    if !require(errors, field, value) {
        return None;
    }
    match NaiveDate::parse_from_str(value.trim(), DATE_FORMAT) {
        Ok(date) => Some(date),
        Err(_) => {
            errors.add(field, "Invalid date, expected format YYYY-MM-DD");
            None
        }
    }
}

/// Parse a date range from two form/query values. Field names are used for the error messages.
pub fn validate_date_range(
    start_field: &str,
    start: &str,
    end_field: &str,
    end: &str,
) -> Result<DateRange, ValidationErrors> {
    let mut errors = ValidationErrors::default();
    let start = parse_date(&mut errors, start_field, start);
    let end = parse_date(&mut errors, end_field, end);
    match (start, end) {
        (Some(start), Some(end)) => match DateRange::new(start, end) {
            Some(range) => errors.into_result(range),
            None => {
                errors.add(end_field, "Departure must be after arrival");
                Err(errors)
            }
        },
        _ => Err(errors),
    }
}

/// Parse a numeric entity id from a form value
pub fn validate_id(field: &str, value: &str) -> Result<i32, ValidationErrors> {
    let mut errors = ValidationErrors::default();
    if !require(&mut errors, field, value) {
        return Err(errors);
    }
    value.trim().parse().map_err(|_| {
        errors.add(field, "Invalid id");
        errors
    })
}

/// Date range as submitted via the availability search form
#[derive(Clone, Debug, Default, Deserialize)]
pub struct DateRangeForm {
    #[serde(default)]
    pub start: String,
    #[serde(default)]
    pub end: String,
}

impl DateRangeForm {
    pub fn validate(&self) -> Result<DateRange, ValidationErrors> {
        validate_date_range("start", &self.start, "end", &self.end)
    }
}

/// Single-room availability request, as sent by the room pages
#[derive(Clone, Debug, Default, Deserialize)]
pub struct RoomAvailabilityForm {
    #[serde(default)]
    pub start: String,
    #[serde(default)]
    pub end: String,
    #[serde(default)]
    pub room_id: String,
}

impl RoomAvailabilityForm {
    pub fn validate(&self) -> Result<(RoomId, DateRange), ValidationErrors> {
        let dates = validate_date_range("start", &self.start, "end", &self.end);
        let room_id = validate_id("room_id", &self.room_id);
        match (room_id, dates) {
            (Ok(room_id), Ok(dates)) => Ok((room_id, dates)),
            (room_id, dates) => {
                let mut errors = ValidationErrors::default();
                if let Err(e) = room_id {
                    errors.extend(e);
                }
                if let Err(e) = dates {
                    errors.extend(e);
                }
                Err(errors)
            }
        }
    }
}

/// Guest contact details as submitted via the reservation form
#[derive(Clone, Debug, Default, Deserialize)]
pub struct GuestDetailsForm {
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub phone: String,
}

impl GuestDetailsForm {
    pub fn validate(&self) -> Result<GuestDetails, ValidationErrors> {
        let mut errors = ValidationErrors::default();
        let first_name = self.first_name.trim();
        if require(&mut errors, "first_name", first_name)
            && first_name.chars().count() < FIRST_NAME_MIN_LENGTH
        {
            errors.add(
                "first_name",
                format!(
                    "This field must be at least {} characters long",
                    FIRST_NAME_MIN_LENGTH
                ),
            );
        }
        require(&mut errors, "last_name", &self.last_name);
        let email = self.email.trim();
        if require(&mut errors, "email", email) && !is_valid_email(email) {
            errors.add("email", "Invalid email address");
        }
        errors.into_result(GuestDetails {
            first_name: first_name.to_owned(),
            last_name: self.last_name.trim().to_owned(),
            email: email.to_owned(),
            phone: self.phone.trim().to_owned(),
        })
    }
}
