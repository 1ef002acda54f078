//! The booking core: availability checks, the multi-step booking workflow and the admin occupancy
//! calendar.
//!
//! Nothing in here knows about HTTP. All operations take plain values (ids, [DateRange]s,
//! validated form data) and report failures as [EngineError].
//!
//! [DateRange]: crate::data_store::models::DateRange

pub mod calendar;
pub mod engine;
pub mod validation;
pub mod workflow;

use crate::data_store::StoreError;
use std::fmt::{Display, Formatter};
use validation::ValidationErrors;

pub use engine::BookingEngine;

#[derive(Debug)]
pub enum EngineError {
    /// The submitted input is malformed. Carries field-level messages for the originating form.
    Validation(ValidationErrors),
    /// Reading from the data store failed
    QueryError(StoreError),
    /// Writing to the data store failed, including writes rejected by a constraint
    InsertError(StoreError),
    /// The requested step requires a draft reservation, but the client has none
    NoActiveReservation,
}

impl Display for EngineError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(e) => write!(f, "Invalid input: {}", e),
            Self::QueryError(e) => write!(f, "Could not query data store: {}", e),
            Self::InsertError(e) => write!(f, "Could not write to data store: {}", e),
            Self::NoActiveReservation => f.write_str("No reservation in progress"),
        }
    }
}

impl std::error::Error for EngineError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::QueryError(e) | Self::InsertError(e) => Some(e),
            _ => None,
        }
    }
}

impl From<ValidationErrors> for EngineError {
    fn from(value: ValidationErrors) -> Self {
        Self::Validation(value)
    }
}
