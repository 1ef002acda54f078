use crate::data_store::{
    EnumMemberNotExistingError, ReservationId, RestrictionId, RoomId, UserId,
};
use chrono::{naive::NaiveDate, DateTime, Days, Utc};
use diesel::deserialize::FromSql;
use diesel::prelude::*;
use diesel::query_builder::bind_collector::RawBytesBindCollector;
use diesel::serialize::ToSql;
use diesel::{AsExpression, FromSqlRow};

/// A half-open range of dates `[start, end)`, i.e. the nights from `start` to the day before `end`.
///
/// The range is guaranteed to be non-empty (`start < end`), so that every operation taking a
/// `DateRange` can rely on the dates being in order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct DateRange {
    start: NaiveDate,
    end: NaiveDate,
}

impl DateRange {
    /// Create a new range. Returns `None` if `start` is not strictly before `end`.
    pub fn new(start: NaiveDate, end: NaiveDate) -> Option<Self> {
        if start < end {
            Some(Self { start, end })
        } else {
            None
        }
    }

    /// The range covering only the night of `date`
    pub fn single_day(date: NaiveDate) -> Self {
        Self {
            start: date,
            end: date + Days::new(1),
        }
    }

    pub fn start(&self) -> NaiveDate {
        self.start
    }

    pub fn end(&self) -> NaiveDate {
        self.end
    }

    /// Number of nights within the range
    pub fn nights(&self) -> i64 {
        (self.end - self.start).num_days()
    }

    /// Two half-open ranges `[a, b)` and `[c, d)` overlap iff `a < d && c < b`
    pub fn overlaps(&self, start: NaiveDate, end: NaiveDate) -> bool {
        self.start < end && start < self.end
    }

    /// Iterate over all days within the range (excluding `end`)
    pub fn days(&self) -> impl Iterator<Item = NaiveDate> {
        let end = self.end;
        self.start.iter_days().take_while(move |d| *d < end)
    }
}

#[derive(Clone, Debug, PartialEq, Queryable, Selectable)]
#[diesel(table_name=super::schema::rooms)]
pub struct Room {
    pub id: RoomId,
    pub room_name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Room> for leafsite_api_types::Room {
    fn from(value: Room) -> Self {
        Self {
            id: value.id,
            name: value.room_name,
        }
    }
}

#[derive(Clone, Debug, Queryable, Selectable)]
#[diesel(table_name=super::schema::reservations)]
pub struct Reservation {
    pub id: ReservationId,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub room_id: RoomId,
    pub processed: ProcessingState,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A reservation together with a snapshot of the reserved room
#[derive(Clone, Debug)]
pub struct FullReservation {
    pub reservation: Reservation,
    pub room: Room,
}

impl From<FullReservation> for leafsite_api_types::Reservation {
    fn from(value: FullReservation) -> Self {
        Self {
            id: value.reservation.id,
            room_id: value.reservation.room_id,
            room: value.room.into(),
            first_name: value.reservation.first_name,
            last_name: value.reservation.last_name,
            email: value.reservation.email,
            phone: value.reservation.phone,
            start_date: value.reservation.start_date,
            end_date: value.reservation.end_date,
            processed: value.reservation.processed.into(),
            created_at: value.reservation.created_at,
            updated_at: value.reservation.updated_at,
        }
    }
}

#[derive(Clone, Debug, Insertable)]
#[diesel(table_name=super::schema::reservations)]
pub struct NewReservation {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub room_id: RoomId,
}

impl NewReservation {
    pub fn new(room_id: RoomId, dates: &DateRange, guest: GuestDetails) -> Self {
        Self {
            first_name: guest.first_name,
            last_name: guest.last_name,
            email: guest.email,
            phone: guest.phone,
            start_date: dates.start(),
            end_date: dates.end(),
            room_id,
        }
    }
}

/// Validated contact details of the guest, as entered into the reservation form
#[derive(Clone, Debug, PartialEq)]
pub struct GuestDetails {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: String,
}

impl From<GuestDetails> for leafsite_api_types::GuestDetails {
    fn from(value: GuestDetails) -> Self {
        Self {
            first_name: value.first_name,
            last_name: value.last_name,
            email: value.email,
            phone: value.phone,
        }
    }
}

#[derive(Clone, Debug, AsChangeset)]
#[diesel(table_name=super::schema::reservations)]
pub struct ReservationPatch {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: String,
    pub updated_at: DateTime<Utc>,
}

impl From<GuestDetails> for ReservationPatch {
    fn from(value: GuestDetails) -> Self {
        Self {
            first_name: value.first_name,
            last_name: value.last_name,
            email: value.email,
            phone: value.phone,
            updated_at: Utc::now(),
        }
    }
}

/// Processing state of a reservation, as tracked by the administrators.
///
/// Values other than the known ones may be found in the database (e.g. written by an older
/// version). These are represented as `Unknown` and never written back.
#[derive(Debug, PartialEq, FromSqlRow, AsExpression, Eq, Clone, Copy)]
#[diesel(sql_type = diesel::sql_types::Integer)]
pub enum ProcessingState {
    New,
    Processed,
    Unknown,
}

impl From<i32> for ProcessingState {
    fn from(value: i32) -> Self {
        match value {
            0 => ProcessingState::New,
            1 => ProcessingState::Processed,
            _ => ProcessingState::Unknown,
        }
    }
}

impl From<ProcessingState> for i32 {
    fn from(value: ProcessingState) -> Self {
        match value {
            ProcessingState::New => 0,
            ProcessingState::Processed => 1,
            ProcessingState::Unknown => -1,
        }
    }
}

impl From<ProcessingState> for leafsite_api_types::ProcessingState {
    fn from(value: ProcessingState) -> Self {
        match value {
            ProcessingState::New => Self::New,
            ProcessingState::Processed => Self::Processed,
            ProcessingState::Unknown => Self::Unknown,
        }
    }
}

impl<DB> ToSql<diesel::sql_types::Integer, DB> for ProcessingState
where
    DB: diesel::backend::Backend,
    for<'c> DB: diesel::backend::Backend<BindCollector<'c> = RawBytesBindCollector<DB>>,
    i32: ToSql<diesel::sql_types::Integer, DB>,
{
    fn to_sql<'b>(
        &'b self,
        out: &mut diesel::serialize::Output<'b, '_, DB>,
    ) -> diesel::serialize::Result {
        let value: i32 = (*self).into();
        value.to_sql(&mut out.reborrow())
    }
}

impl<DB> FromSql<diesel::sql_types::Integer, DB> for ProcessingState
where
    DB: diesel::backend::Backend,
    i32: FromSql<diesel::sql_types::Integer, DB>,
{
    fn from_sql(bytes: DB::RawValue<'_>) -> diesel::deserialize::Result<Self> {
        Ok(i32::from_sql(bytes)?.into())
    }
}

#[derive(Clone, Debug, PartialEq, Queryable, Selectable)]
#[diesel(table_name=super::schema::room_restrictions)]
pub struct RoomRestriction {
    pub id: RestrictionId,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub room_id: RoomId,
    pub reservation_id: Option<ReservationId>,
    pub restriction_type: RestrictionType,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl RoomRestriction {
    pub fn overlaps(&self, range: &DateRange) -> bool {
        range.overlaps(self.start_date, self.end_date)
    }

    /// Is this a single-day owner block, i.e. one of the restrictions which may be toggled via the
    /// admin calendar?
    pub fn is_single_day_block(&self) -> bool {
        self.restriction_type == RestrictionType::OwnerBlock
            && (self.end_date - self.start_date).num_days() == 1
    }
}

#[derive(Clone, Debug, PartialEq, Insertable)]
#[diesel(table_name=super::schema::room_restrictions)]
pub struct NewRoomRestriction {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub room_id: RoomId,
    pub reservation_id: Option<ReservationId>,
    pub restriction_type: RestrictionType,
}

impl NewRoomRestriction {
    /// The restriction imposed on the room's calendar by the given reservation
    pub fn for_reservation(reservation_id: ReservationId, room_id: RoomId, dates: &DateRange) -> Self {
        Self {
            start_date: dates.start(),
            end_date: dates.end(),
            room_id,
            reservation_id: Some(reservation_id),
            restriction_type: RestrictionType::Reservation,
        }
    }

    /// A single-day block of the room by the owner
    pub fn owner_block(room_id: RoomId, date: NaiveDate) -> Self {
        let dates = DateRange::single_day(date);
        Self {
            start_date: dates.start(),
            end_date: dates.end(),
            room_id,
            reservation_id: None,
            restriction_type: RestrictionType::OwnerBlock,
        }
    }

    pub fn dates(&self) -> Option<DateRange> {
        DateRange::new(self.start_date, self.end_date)
    }
}

#[derive(Debug, PartialEq, FromSqlRow, AsExpression, Eq, Clone, Copy)]
#[diesel(sql_type = diesel::sql_types::Integer)]
#[repr(i32)]
pub enum RestrictionType {
    Reservation = 1,
    OwnerBlock = 2,
}

impl TryFrom<i32> for RestrictionType {
    type Error = EnumMemberNotExistingError;

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(RestrictionType::Reservation),
            2 => Ok(RestrictionType::OwnerBlock),
            _ => Err(EnumMemberNotExistingError {
                member_value: value,
                enum_name: "RestrictionType",
            }),
        }
    }
}

impl From<RestrictionType> for i32 {
    fn from(value: RestrictionType) -> Self {
        value as i32
    }
}

impl<DB> ToSql<diesel::sql_types::Integer, DB> for RestrictionType
where
    DB: diesel::backend::Backend,
    for<'c> DB: diesel::backend::Backend<BindCollector<'c> = RawBytesBindCollector<DB>>,
    i32: ToSql<diesel::sql_types::Integer, DB>,
{
    fn to_sql<'b>(
        &'b self,
        out: &mut diesel::serialize::Output<'b, '_, DB>,
    ) -> diesel::serialize::Result {
        let value: i32 = (*self).into();
        value.to_sql(&mut out.reborrow())
    }
}

impl<DB> FromSql<diesel::sql_types::Integer, DB> for RestrictionType
where
    DB: diesel::backend::Backend,
    i32: FromSql<diesel::sql_types::Integer, DB>,
{
    fn from_sql(bytes: DB::RawValue<'_>) -> diesel::deserialize::Result<Self> {
        let x = i32::from_sql(bytes)?;
        x.try_into()
            .map_err(|e: EnumMemberNotExistingError| e.to_string().into())
    }
}

#[derive(Clone, Debug, Queryable, Selectable)]
#[diesel(table_name=super::schema::users)]
pub struct User {
    pub id: UserId,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    /// PBKDF2 password hash, see [crate::auth::hash_password]
    pub password: String,
    pub access_level: AccessLevel,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Clone, Insertable)]
#[diesel(table_name=super::schema::users)]
pub struct NewUser {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub password: String,
    pub access_level: AccessLevel,
}

#[derive(Debug, PartialEq, FromSqlRow, AsExpression, Eq, Ord, PartialOrd, Clone, Copy)]
#[diesel(sql_type = diesel::sql_types::Integer)]
#[repr(i32)]
pub enum AccessLevel {
    Staff = 1,
    Administrator = 3,
}

impl TryFrom<i32> for AccessLevel {
    type Error = EnumMemberNotExistingError;

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(AccessLevel::Staff),
            3 => Ok(AccessLevel::Administrator),
            _ => Err(EnumMemberNotExistingError {
                member_value: value,
                enum_name: "AccessLevel",
            }),
        }
    }
}

impl From<AccessLevel> for i32 {
    fn from(value: AccessLevel) -> Self {
        value as i32
    }
}

impl<DB> ToSql<diesel::sql_types::Integer, DB> for AccessLevel
where
    DB: diesel::backend::Backend,
    for<'c> DB: diesel::backend::Backend<BindCollector<'c> = RawBytesBindCollector<DB>>,
    i32: ToSql<diesel::sql_types::Integer, DB>,
{
    fn to_sql<'b>(
        &'b self,
        out: &mut diesel::serialize::Output<'b, '_, DB>,
    ) -> diesel::serialize::Result {
        let value: i32 = (*self).into();
        value.to_sql(&mut out.reborrow())
    }
}

impl<DB> FromSql<diesel::sql_types::Integer, DB> for AccessLevel
where
    DB: diesel::backend::Backend,
    i32: FromSql<diesel::sql_types::Integer, DB>,
{
    fn from_sql(bytes: DB::RawValue<'_>) -> diesel::deserialize::Result<Self> {
        let x = i32::from_sql(bytes)?;
        x.try_into()
            .map_err(|e: EnumMemberNotExistingError| e.to_string().into())
    }
}
