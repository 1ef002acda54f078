use crate::booking::EngineError;
use crate::data_store::models::{
    DateRange, FullReservation, GuestDetails, NewReservation, NewRoomRestriction,
    ProcessingState, ReservationPatch, Room, RoomRestriction, User,
};
use crate::data_store::{ReservationId, ReservationStoreFacade, RestrictionId, RoomId};
use chrono::NaiveDate;
use log::{info, warn};

/// The Availability Engine, operating on one data store facade.
///
/// An engine is short-lived: create one per unit of work (typically per request) from a facade
/// obtained via [crate::data_store::ReservationStore::get_facade].
pub struct BookingEngine<'a> {
    pub(super) store: Box<dyn ReservationStoreFacade + 'a>,
}

impl<'a> BookingEngine<'a> {
    pub fn new(store: Box<dyn ReservationStoreFacade + 'a>) -> Self {
        Self { store }
    }

    /// Check if no restriction of the room overlaps the given date range.
    pub fn check_room_available(
        &mut self,
        room_id: RoomId,
        dates: &DateRange,
    ) -> Result<bool, EngineError> {
        self.store
            .search_availability_by_dates_by_room_id(dates.start(), dates.end(), room_id)
            .map_err(EngineError::QueryError)
    }

    /// Get all rooms which are free for the whole date range, ordered by id. Returns an empty list
    /// if no room is available.
    pub fn search_all_rooms_available(
        &mut self,
        dates: &DateRange,
    ) -> Result<Vec<Room>, EngineError> {
        self.store
            .search_availability_for_all_rooms(dates.start(), dates.end())
            .map_err(EngineError::QueryError)
    }

    /// Persist a reservation. The room's availability is not checked again; the restriction
    /// created afterwards via [Self::create_room_restriction] is rejected by the data store if
    /// it overlaps another one.
    pub fn create_reservation(
        &mut self,
        reservation: NewReservation,
    ) -> Result<ReservationId, EngineError> {
        let room_id = reservation.room_id;
        let id = self.store.insert_reservation(reservation).map_err(|e| {
            warn!("Could not store reservation for room {}: {}", room_id, e);
            EngineError::InsertError(e)
        })?;
        info!("Created reservation {} for room {}", id, room_id);
        Ok(id)
    }

    pub fn create_room_restriction(
        &mut self,
        restriction: NewRoomRestriction,
    ) -> Result<RestrictionId, EngineError> {
        let room_id = restriction.room_id;
        let start_date = restriction.start_date;
        let end_date = restriction.end_date;
        let id = self.store.insert_room_restriction(restriction).map_err(|e| {
            warn!(
                "Could not store restriction for room {} from {} to {}: {}",
                room_id, start_date, end_date, e
            );
            EngineError::InsertError(e)
        })?;
        info!(
            "Created restriction {} for room {} from {} to {}",
            id, room_id, start_date, end_date
        );
        Ok(id)
    }

    /// Remove an owner block. Restrictions of reservations are only removed together with their
    /// reservation (see [Self::delete_reservation]).
    pub fn remove_room_restriction(
        &mut self,
        actor: &User,
        restriction_id: RestrictionId,
    ) -> Result<(), EngineError> {
        self.store
            .delete_room_restriction(restriction_id)
            .map_err(EngineError::InsertError)?;
        info!(
            "Owner block {} removed by user {}",
            restriction_id, actor.email
        );
        Ok(())
    }

    /// Remove the single-day owner block of the room on the given date. Restrictions of
    /// reservations and multi-day blocks are not touched.
    pub fn remove_room_restriction_by_date(
        &mut self,
        room_id: RoomId,
        date: NaiveDate,
    ) -> Result<(), EngineError> {
        self.store
            .delete_owner_block_by_date(room_id, date)
            .map_err(EngineError::InsertError)?;
        info!("Removed owner block of room {} on {}", room_id, date);
        Ok(())
    }

    pub fn get_room(&mut self, room_id: RoomId) -> Result<Room, EngineError> {
        self.store
            .get_room_by_id(room_id)
            .map_err(EngineError::QueryError)
    }

    pub fn all_rooms(&mut self) -> Result<Vec<Room>, EngineError> {
        self.store.all_rooms().map_err(EngineError::QueryError)
    }

    /// Get all restrictions of the room intersecting the date range, ordered by start date
    pub fn restrictions_for_room(
        &mut self,
        room_id: RoomId,
        dates: &DateRange,
    ) -> Result<Vec<RoomRestriction>, EngineError> {
        self.store
            .get_restrictions_for_room_by_date(room_id, dates.start(), dates.end())
            .map_err(EngineError::QueryError)
    }

    pub fn all_reservations(&mut self) -> Result<Vec<FullReservation>, EngineError> {
        self.store
            .all_reservations()
            .map_err(EngineError::QueryError)
    }

    pub fn all_new_reservations(&mut self) -> Result<Vec<FullReservation>, EngineError> {
        self.store
            .all_new_reservations()
            .map_err(EngineError::QueryError)
    }

    pub fn get_reservation(
        &mut self,
        reservation_id: ReservationId,
    ) -> Result<FullReservation, EngineError> {
        self.store
            .get_reservation_by_id(reservation_id)
            .map_err(EngineError::QueryError)
    }

    /// Replace the guest contact details of a reservation
    pub fn update_reservation(
        &mut self,
        actor: &User,
        reservation_id: ReservationId,
        guest: GuestDetails,
    ) -> Result<(), EngineError> {
        self.store
            .update_reservation(reservation_id, ReservationPatch::from(guest))
            .map_err(EngineError::InsertError)?;
        info!(
            "Reservation {} updated by user {}",
            reservation_id, actor.email
        );
        Ok(())
    }

    /// Mark the reservation as processed
    pub fn process_reservation(
        &mut self,
        actor: &User,
        reservation_id: ReservationId,
    ) -> Result<(), EngineError> {
        self.store
            .update_processed_for_reservation(reservation_id, ProcessingState::Processed)
            .map_err(EngineError::InsertError)?;
        info!(
            "Reservation {} marked as processed by user {}",
            reservation_id, actor.email
        );
        Ok(())
    }

    /// Delete the reservation together with its restriction, freeing the room
    pub fn delete_reservation(
        &mut self,
        actor: &User,
        reservation_id: ReservationId,
    ) -> Result<(), EngineError> {
        self.store
            .delete_reservation(reservation_id)
            .map_err(EngineError::InsertError)?;
        info!(
            "Reservation {} deleted by user {}",
            reservation_id, actor.email
        );
        Ok(())
    }

    /// Roll back a reservation of the booking flow whose restriction could not be stored
    pub(super) fn discard_reservation(
        &mut self,
        reservation_id: ReservationId,
    ) -> Result<(), EngineError> {
        self.store
            .delete_reservation(reservation_id)
            .map_err(EngineError::InsertError)?;
        warn!("Discarded reservation {} without restriction", reservation_id);
        Ok(())
    }
}
