use chrono::{naive::NaiveDate, DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Room {
    pub id: i32,
    pub name: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ProcessingState {
    New,
    Processed,
    Unknown,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Reservation {
    pub id: i32,
    pub room_id: i32,
    pub room: Room,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    #[serde(default)]
    pub phone: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub processed: ProcessingState,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct GuestDetails {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    #[serde(default)]
    pub phone: String,
}

/// Answer of the single-room availability check
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct AvailabilityResponse {
    pub ok: bool,
    #[serde(default)]
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub room_id: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_date: Option<NaiveDate>,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum BookingStage {
    DatesChosen,
    RoomChosen,
    Validated,
}

/// The reservation draft currently staged in the client's session
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct DraftReservation {
    pub stage: BookingStage,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub room: Option<Room>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub guest: Option<GuestDetails>,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct AvailableRooms {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub rooms: Vec<Room>,
}

/// Field name -> list of validation messages for that field
pub type FieldErrors = BTreeMap<String, Vec<String>>;

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct ValidationFailure {
    pub message: String,
    pub errors: FieldErrors,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct CalendarDay {
    pub date: NaiveDate,
    pub blocks: u32,
    pub reservations: u32,
    /// Reservations occupying this night, for linking to the reservation details
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub reservation_ids: Vec<i32>,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct RoomCalendar {
    pub room: Room,
    pub days: Vec<CalendarDay>,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct CalendarMonth {
    pub year: i32,
    pub month: u32,
    /// Year and month of the neighbouring months, if they are within the supported date range
    pub previous: Option<(i32, u32)>,
    pub next: Option<(i32, u32)>,
    pub rooms: Vec<RoomCalendar>,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default)]
pub struct BlockChanges {
    pub room_id: i32,
    pub added: Vec<NaiveDate>,
    pub removed: Vec<NaiveDate>,
    /// Days which could not be toggled: requested blocks on reserved days, and blocks which are
    /// not single-day owner blocks
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub skipped: Vec<NaiveDate>,
}
