//! The persistence layer: the database interface of the booking engine
//!
//! The primary entry point to this module is the function [get_store_from_env], which returns an
//! object implementing the [ReservationStore] trait. This object can be shared between threads in a
//! global application state and be used to create [ReservationStoreFacade] instances for
//! interaction with the database. These provide a repository-like interface, using the data models
//! from the [models] module.
//!
//! The primary implementation of [ReservationStore] ([postgres::PgDataStore]) wraps a PostgreSQL
//! connection pool and its corresponding [ReservationStoreFacade] objects
//! ([postgres::PgDataStoreFacade]) hold one pooled connection each, using the Diesel query DSL for
//! implementing the database interaction.
//!
//! The database schema is responsible for rejecting overlapping restrictions of the same room (see
//! the exclusion constraint in the migrations). Callers must not rely on checking availability
//! before inserting a restriction.
//!
//! There is also a mock implementation for unittests ([store_mock::StoreMock]).

use crate::cli_error::CliError;
use crate::setup;
use chrono::NaiveDate;
use std::fmt::{Debug, Display, Formatter};

pub mod models;
mod postgres;
mod schema;
#[cfg(test)]
pub mod store_mock;

/// Get a [ReservationStore] instance, according to the "DATABASE_URL" environment variable.
///
/// The DATABASE_URL must be a PostgreSQL connection url, following the schema
/// "postgres://{user}:{password}@{host}/{database}".
pub fn get_store_from_env() -> Result<impl ReservationStore, CliError> {
    postgres::PgDataStore::new(&setup::get_database_url_from_env()?)
        .map_err(|err| CliError::DatabaseUnreachable(err.to_string()))
}

pub type RoomId = i32;
pub type ReservationId = i32;
pub type RestrictionId = i32;
pub type UserId = i32;

pub trait ReservationStoreFacade {
    /// Check if the room is free for the whole half-open date range `[start, end)`.
    ///
    /// Returns `Ok(true)` iff no restriction of the room overlaps the range.
    fn search_availability_by_dates_by_room_id(
        &mut self,
        start: NaiveDate,
        end: NaiveDate,
        room_id: RoomId,
    ) -> Result<bool, StoreError>;

    /// Get all rooms without any restriction overlapping the half-open date range `[start, end)`.
    ///
    /// Rooms are returned in ascending order of their id.
    fn search_availability_for_all_rooms(
        &mut self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<models::Room>, StoreError>;

    fn get_room_by_id(&mut self, room_id: RoomId) -> Result<models::Room, StoreError>;
    /// Get all rooms, ordered by id
    fn all_rooms(&mut self) -> Result<Vec<models::Room>, StoreError>;

    /// Store a new reservation and return its id.
    ///
    /// This does not check the room's availability and does not create the corresponding
    /// restriction. See [Self::insert_room_restriction].
    fn insert_reservation(
        &mut self,
        reservation: models::NewReservation,
    ) -> Result<ReservationId, StoreError>;
    /// Get all reservations, ordered by start date
    fn all_reservations(&mut self) -> Result<Vec<models::FullReservation>, StoreError>;
    /// Get all reservations which have not been processed yet, ordered by start date
    fn all_new_reservations(&mut self) -> Result<Vec<models::FullReservation>, StoreError>;
    fn get_reservation_by_id(
        &mut self,
        reservation_id: ReservationId,
    ) -> Result<models::FullReservation, StoreError>;
    fn update_reservation(
        &mut self,
        reservation_id: ReservationId,
        patch: models::ReservationPatch,
    ) -> Result<(), StoreError>;
    /// Delete the reservation and the room restriction it owns
    fn delete_reservation(&mut self, reservation_id: ReservationId) -> Result<(), StoreError>;
    fn update_processed_for_reservation(
        &mut self,
        reservation_id: ReservationId,
        processed: models::ProcessingState,
    ) -> Result<(), StoreError>;

    /// Store a new room restriction and return its id.
    ///
    /// # return value
    /// - `Ok(id)` if the restriction has been created, successfully
    /// - `Err(_)` if the restriction overlaps an existing restriction of the same room (the exact
    ///   error depends on the store implementation) or something different went wrong, as usual
    fn insert_room_restriction(
        &mut self,
        restriction: models::NewRoomRestriction,
    ) -> Result<RestrictionId, StoreError>;
    /// Get all restrictions of the room, which overlap the half-open date range `[start, end)`,
    /// ordered by start date
    fn get_restrictions_for_room_by_date(
        &mut self,
        room_id: RoomId,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<models::RoomRestriction>, StoreError>;
    /// Delete the owner block with the given id. Fails with [StoreError::NotExisting] for
    /// restrictions of reservations.
    fn delete_room_restriction(&mut self, restriction_id: RestrictionId) -> Result<(), StoreError>;
    /// Delete the single-day owner block of the room on the given date.
    ///
    /// Restrictions belonging to a reservation and owner blocks spanning multiple days are never
    /// deleted by this function. Returns `Err(StoreError::NotExisting)` if no matching block
    /// exists.
    fn delete_owner_block_by_date(
        &mut self,
        room_id: RoomId,
        date: NaiveDate,
    ) -> Result<(), StoreError>;

    fn get_user_by_id(&mut self, user_id: UserId) -> Result<models::User, StoreError>;
    fn get_user_by_email(&mut self, email: &str) -> Result<models::User, StoreError>;
    fn create_user(&mut self, user: models::NewUser) -> Result<UserId, StoreError>;
}

pub trait ReservationStore: Send + Sync {
    fn get_facade<'a>(&'a self) -> Result<Box<dyn ReservationStoreFacade + 'a>, StoreError>;
}

#[derive(Debug)]
pub enum StoreError {
    /// Connection to the database failed. See string description for details.
    ConnectionError(String),
    /// The query could not be executed because of some error not covered by the other members (see
    /// string description)
    QueryError(diesel::result::Error),
    /// Database transaction could not be committed due to a conflicting concurrent transaction
    TransactionConflict,
    /// The requested entity does not exist
    NotExisting,
    /// The entity could not be created because it conflicts with an existing one.
    ConflictEntityExists,
    /// The provided data is invalid, i.e. it does not match the expected ranges or violates a
    /// SQL constraint. See string description for details.
    InvalidInputData(String),
    /// Some data queried from the database could not be deserialized. See string description for
    /// details.
    InvalidDataInDatabase(String),
}

impl From<diesel::result::Error> for StoreError {
    fn from(error: diesel::result::Error) -> Self {
        match error {
            diesel::result::Error::NotFound => Self::NotExisting,
            diesel::result::Error::DatabaseError(
                diesel::result::DatabaseErrorKind::UniqueViolation,
                _,
            ) => Self::ConflictEntityExists,
            diesel::result::Error::DatabaseError(
                diesel::result::DatabaseErrorKind::SerializationFailure,
                _,
            ) => Self::TransactionConflict,
            diesel::result::Error::DatabaseError(
                e @ diesel::result::DatabaseErrorKind::ForeignKeyViolation
                | e @ diesel::result::DatabaseErrorKind::CheckViolation,
                _,
            ) => Self::InvalidInputData(format!("{:?}", e)),
            diesel::result::Error::SerializationError(e) => Self::InvalidInputData(e.to_string()),
            diesel::result::Error::DeserializationError(e) => {
                Self::InvalidDataInDatabase(e.to_string())
            }
            _ => Self::QueryError(error),
        }
    }
}

impl From<r2d2::Error> for StoreError {
    fn from(error: r2d2::Error) -> Self {
        Self::ConnectionError(error.to_string())
    }
}

impl Display for StoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ConnectionError(e) => write!(f, "Error connecting to database: {}", e),
            Self::QueryError(e) => write!(f, "Error while executing database query: {}", e),
            Self::TransactionConflict => f.write_str("Database transaction could not be committed due to a conflicting concurrent transaction"),
            Self::NotExisting => f.write_str("Database record does not exist."),
            Self::ConflictEntityExists => f.write_str("Database record conflicts with an existing record."),
            Self::InvalidInputData(e) => {
                write!(f, "Data to be stored in database is not valid: {}", e)
            }
            Self::InvalidDataInDatabase(e) => {
                write!(f, "Data queried from database could not be deserialized: {}", e)
            }
        }
    }
}

impl std::error::Error for StoreError {}

#[derive(Debug)]
pub struct EnumMemberNotExistingError {
    pub member_value: i32,
    pub enum_name: &'static str,
}

impl Display for EnumMemberNotExistingError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} is not a valid value for {} enum",
            self.member_value, self.enum_name
        )
    }
}
