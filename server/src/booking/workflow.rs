//! The multi-step booking flow of a single client.
//!
//! The client first chooses the dates of the stay, then a room, then enters their contact details
//! and finally confirms the reservation. The draft built up along the way is kept in the client's
//! session (see [crate::session::SessionData]); it is only written to the data store by
//! [BookingSession::confirm].

use crate::booking::validation::GuestDetailsForm;
use crate::booking::{BookingEngine, EngineError};
use crate::data_store::models::{
    DateRange, FullReservation, GuestDetails, NewReservation, NewRoomRestriction,
    ProcessingState, Reservation, Room,
};
use crate::data_store::{ReservationId, RoomId};
use leafsite_api_types::{BookingStage, DraftReservation};
use log::error;

#[derive(Clone, Debug)]
enum BookingState {
    DatesChosen {
        dates: DateRange,
    },
    RoomChosen {
        dates: DateRange,
        room: Room,
    },
    Validated {
        dates: DateRange,
        room: Room,
        guest: GuestDetails,
    },
    /// The reservation has been stored. Only kept for showing the summary once.
    Committed {
        reservation: FullReservation,
    },
}

#[derive(Clone, Debug, Default)]
pub struct BookingSession {
    state: Option<BookingState>,
}

impl BookingSession {
    /// Start a new draft with the given dates, discarding any previous draft.
    pub fn choose_dates(&mut self, dates: DateRange) {
        self.state = Some(BookingState::DatesChosen { dates });
    }

    /// Choose a room for the dates of the current draft.
    pub fn choose_room(
        &mut self,
        engine: &mut BookingEngine,
        room_id: RoomId,
    ) -> Result<(), EngineError> {
        let dates = self.dates().ok_or(EngineError::NoActiveReservation)?;
        let room = engine.get_room(room_id)?;
        self.state = Some(BookingState::RoomChosen { dates, room });
        Ok(())
    }

    /// Start a new draft for a specific room and dates at once
    pub fn book_room(
        &mut self,
        engine: &mut BookingEngine,
        room_id: RoomId,
        dates: DateRange,
    ) -> Result<(), EngineError> {
        let room = engine.get_room(room_id)?;
        self.state = Some(BookingState::RoomChosen { dates, room });
        Ok(())
    }

    /// Validate and add the guest's contact details to the draft.
    ///
    /// If the details are invalid, the draft falls back to the chosen room and dates (dropping
    /// previously validated details) and the field-level errors are returned.
    pub fn submit_guest_details(&mut self, form: &GuestDetailsForm) -> Result<(), EngineError> {
        let (dates, room) = match self.state.take() {
            Some(BookingState::RoomChosen { dates, room })
            | Some(BookingState::Validated { dates, room, .. }) => (dates, room),
            other => {
                self.state = other;
                return Err(EngineError::NoActiveReservation);
            }
        };
        match form.validate() {
            Ok(guest) => {
                self.state = Some(BookingState::Validated { dates, room, guest });
                Ok(())
            }
            Err(errors) => {
                self.state = Some(BookingState::RoomChosen { dates, room });
                Err(EngineError::Validation(errors))
            }
        }
    }

    /// Store the validated draft as reservation and block the room for its dates.
    ///
    /// If the room's restriction cannot be stored (e.g. because a concurrent booking took the
    /// room in the meantime), the reservation is deleted again and the draft is kept.
    pub fn confirm(&mut self, engine: &mut BookingEngine) -> Result<ReservationId, EngineError> {
        let (dates, room, guest) = match &self.state {
            Some(BookingState::Validated { dates, room, guest }) => {
                (*dates, room.clone(), guest.clone())
            }
            _ => return Err(EngineError::NoActiveReservation),
        };
        let new_reservation = NewReservation::new(room.id, &dates, guest);
        let reservation_id = engine.create_reservation(new_reservation.clone())?;
        if let Err(e) = engine.create_room_restriction(NewRoomRestriction::for_reservation(
            reservation_id,
            room.id,
            &dates,
        )) {
            if let Err(cleanup_error) = engine.discard_reservation(reservation_id) {
                error!(
                    "Reservation {} could not be removed after failing to block room {}: {}",
                    reservation_id, room.id, cleanup_error
                );
            }
            return Err(e);
        }

        let now = chrono::Utc::now();
        self.state = Some(BookingState::Committed {
            reservation: FullReservation {
                reservation: Reservation {
                    id: reservation_id,
                    first_name: new_reservation.first_name,
                    last_name: new_reservation.last_name,
                    email: new_reservation.email,
                    phone: new_reservation.phone,
                    start_date: new_reservation.start_date,
                    end_date: new_reservation.end_date,
                    room_id: room.id,
                    processed: ProcessingState::New,
                    created_at: now,
                    updated_at: now,
                },
                room,
            },
        });
        Ok(reservation_id)
    }

    /// Get the draft reservation in progress
    pub fn draft(&self) -> Result<DraftReservation, EngineError> {
        match &self.state {
            Some(BookingState::DatesChosen { dates }) => Ok(DraftReservation {
                stage: BookingStage::DatesChosen,
                start_date: dates.start(),
                end_date: dates.end(),
                room: None,
                guest: None,
            }),
            Some(BookingState::RoomChosen { dates, room }) => Ok(DraftReservation {
                stage: BookingStage::RoomChosen,
                start_date: dates.start(),
                end_date: dates.end(),
                room: Some(room.clone().into()),
                guest: None,
            }),
            Some(BookingState::Validated { dates, room, guest }) => Ok(DraftReservation {
                stage: BookingStage::Validated,
                start_date: dates.start(),
                end_date: dates.end(),
                room: Some(room.clone().into()),
                guest: Some(guest.clone().into()),
            }),
            Some(BookingState::Committed { .. }) | None => Err(EngineError::NoActiveReservation),
        }
    }

    /// Get the confirmed reservation for showing the summary. The reservation is removed from
    /// the session, so the summary can be shown only once.
    pub fn take_summary(&mut self) -> Result<FullReservation, EngineError> {
        match self.state.take() {
            Some(BookingState::Committed { reservation }) => Ok(reservation),
            other => {
                self.state = other;
                Err(EngineError::NoActiveReservation)
            }
        }
    }

    fn dates(&self) -> Option<DateRange> {
        match &self.state {
            Some(BookingState::DatesChosen { dates })
            | Some(BookingState::RoomChosen { dates, .. })
            | Some(BookingState::Validated { dates, .. }) => Some(*dates),
            Some(BookingState::Committed { .. }) | None => None,
        }
    }
}
