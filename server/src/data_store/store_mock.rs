use crate::data_store::models::{
    AccessLevel, DateRange, FullReservation, NewReservation, NewRoomRestriction, NewUser,
    ProcessingState, Reservation, ReservationPatch, RestrictionType, Room, RoomRestriction, User,
};
use crate::data_store::{
    ReservationId, ReservationStore, ReservationStoreFacade, RestrictionId, RoomId, StoreError,
    UserId,
};
use chrono::{Days, NaiveDate};
use std::sync::Mutex;

/**
 * A mock [ReservationStore] implementation for testing.
 *
 * The simulated database consists of the [StoreMockData] structure with vectors of entities. These
 * can be directly modified by the tests.
 *
 * Like the database schema, the mock rejects overlapping restrictions of the same room and
 * checks for entity existence. Apart from that, it doesn't do any consistency checks. The
 * [StoreMockData::next_error] attribute can be set to simulate a database error on the next call
 * and [StoreMockData::failing_rooms] to simulate failing inserts for specific rooms.
 */
#[derive(Default)]
pub struct StoreMock {
    pub data: Mutex<StoreMockData>,
}

impl ReservationStore for StoreMock {
    fn get_facade<'a>(&'a self) -> Result<Box<dyn ReservationStoreFacade + 'a>, StoreError> {
        Ok(Box::new(StoreMockFacade { store: self }))
    }
}

#[derive(Default)]
pub struct StoreMockData {
    pub rooms: Vec<Room>,
    pub reservations: Vec<Reservation>,
    pub restrictions: Vec<RoomRestriction>,
    pub users: Vec<User>,
    /// If not none, the next call to a store facade method will return this error.
    pub next_error: Option<StoreError>,
    /// Inserting reservations or restrictions for any of these rooms fails with a simulated
    /// database error.
    pub failing_rooms: Vec<RoomId>,
}

impl StoreMockData {
    fn full_reservation(&self, reservation: &Reservation) -> Result<FullReservation, StoreError> {
        let room = self
            .rooms
            .iter()
            .find(|r| r.id == reservation.room_id)
            .cloned()
            .ok_or(StoreError::InvalidDataInDatabase(format!(
                "Room {} of reservation {} does not exist",
                reservation.room_id, reservation.id
            )))?;
        Ok(FullReservation {
            reservation: reservation.clone(),
            room,
        })
    }

    fn check_failing_room(&self, room_id: RoomId) -> Result<(), StoreError> {
        if self.failing_rooms.contains(&room_id) {
            Err(StoreError::ConnectionError(
                "Simulated database failure".to_owned(),
            ))
        } else {
            Ok(())
        }
    }
}

/// Create a room record with the given id and name for use in the mock store
pub fn room(id: RoomId, name: &str) -> Room {
    Room {
        id,
        room_name: name.to_owned(),
        created_at: Default::default(),
        updated_at: Default::default(),
    }
}

/// Create a [StoreMock] with the standard fixture data:
///
/// * rooms 1 ("Generals' Quarters") and 2 ("Major's Suite")
/// * every room is blocked by the owner from 2030-01-01 on, so no room is available after
///   2029-12-31
/// * inserting reservations or restrictions for room 2 fails with a simulated database error
pub fn fixture_store() -> StoreMock {
    let store = StoreMock::default();
    {
        let mut data = store.data.lock().expect("Error while locking mutex.");
        data.rooms = vec![room(1, "Generals' Quarters"), room(2, "Major's Suite")];
        let blocked_from: NaiveDate = "2030-01-01".parse().unwrap();
        let blocked_until: NaiveDate = "2100-01-01".parse().unwrap();
        data.restrictions = data
            .rooms
            .iter()
            .enumerate()
            .map(|(i, r)| RoomRestriction {
                id: 1000 + i as RestrictionId,
                start_date: blocked_from,
                end_date: blocked_until,
                room_id: r.id,
                reservation_id: None,
                restriction_type: RestrictionType::OwnerBlock,
                created_at: Default::default(),
                updated_at: Default::default(),
            })
            .collect();
        data.failing_rooms = vec![2];
    }
    store
}

/// Create a user record for use in the mock store
pub fn user(id: UserId, email: &str, password_hash: &str, access_level: AccessLevel) -> User {
    User {
        id,
        first_name: "Sera".to_owned(),
        last_name: "Admin".to_owned(),
        email: email.to_owned(),
        password: password_hash.to_owned(),
        access_level,
        created_at: Default::default(),
        updated_at: Default::default(),
    }
}

struct StoreMockFacade<'a> {
    store: &'a StoreMock,
}

impl<'a> ReservationStoreFacade for StoreMockFacade<'a> {
    fn search_availability_by_dates_by_room_id(
        &mut self,
        start: NaiveDate,
        end: NaiveDate,
        room_id: RoomId,
    ) -> Result<bool, StoreError> {
        let mut data = self.store.data.lock().expect("Error while locking mutex.");
        if let Some(e) = data.next_error.take() {
            return Err(e);
        }
        Ok(!data
            .restrictions
            .iter()
            .any(|r| r.room_id == room_id && r.start_date < end && start < r.end_date))
    }

    fn search_availability_for_all_rooms(
        &mut self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<Room>, StoreError> {
        let mut data = self.store.data.lock().expect("Error while locking mutex.");
        if let Some(e) = data.next_error.take() {
            return Err(e);
        }
        let mut result: Vec<Room> = data
            .rooms
            .iter()
            .filter(|room| {
                !data
                    .restrictions
                    .iter()
                    .any(|r| r.room_id == room.id && r.start_date < end && start < r.end_date)
            })
            .cloned()
            .collect();
        result.sort_by_key(|r| r.id);
        Ok(result)
    }

    fn get_room_by_id(&mut self, room_id: RoomId) -> Result<Room, StoreError> {
        let mut data = self.store.data.lock().expect("Error while locking mutex.");
        if let Some(e) = data.next_error.take() {
            return Err(e);
        }
        data.rooms
            .iter()
            .find(|r| r.id == room_id)
            .cloned()
            .ok_or(StoreError::NotExisting)
    }

    fn all_rooms(&mut self) -> Result<Vec<Room>, StoreError> {
        let mut data = self.store.data.lock().expect("Error while locking mutex.");
        if let Some(e) = data.next_error.take() {
            return Err(e);
        }
        let mut result = data.rooms.clone();
        result.sort_by_key(|r| r.id);
        Ok(result)
    }

    fn insert_reservation(
        &mut self,
        reservation: NewReservation,
    ) -> Result<ReservationId, StoreError> {
        let mut data = self.store.data.lock().expect("Error while locking mutex.");
        if let Some(e) = data.next_error.take() {
            return Err(e);
        }
        data.check_failing_room(reservation.room_id)?;
        if !data.rooms.iter().any(|r| r.id == reservation.room_id) {
            return Err(StoreError::InvalidInputData(
                "ForeignKeyViolation".to_owned(),
            ));
        }
        let id = data.reservations.iter().map(|r| r.id).max().unwrap_or(0) + 1;
        data.reservations.push(Reservation {
            id,
            first_name: reservation.first_name,
            last_name: reservation.last_name,
            email: reservation.email,
            phone: reservation.phone,
            start_date: reservation.start_date,
            end_date: reservation.end_date,
            room_id: reservation.room_id,
            processed: ProcessingState::New,
            created_at: chrono::Utc::now(),
            updated_at: chrono::Utc::now(),
        });
        Ok(id)
    }

    fn all_reservations(&mut self) -> Result<Vec<FullReservation>, StoreError> {
        let mut data = self.store.data.lock().expect("Error while locking mutex.");
        if let Some(e) = data.next_error.take() {
            return Err(e);
        }
        let mut result = data
            .reservations
            .iter()
            .map(|r| data.full_reservation(r))
            .collect::<Result<Vec<_>, _>>()?;
        result.sort_by_key(|r| (r.reservation.start_date, r.reservation.id));
        Ok(result)
    }

    fn all_new_reservations(&mut self) -> Result<Vec<FullReservation>, StoreError> {
        let mut data = self.store.data.lock().expect("Error while locking mutex.");
        if let Some(e) = data.next_error.take() {
            return Err(e);
        }
        let mut result = data
            .reservations
            .iter()
            .filter(|r| r.processed == ProcessingState::New)
            .map(|r| data.full_reservation(r))
            .collect::<Result<Vec<_>, _>>()?;
        result.sort_by_key(|r| (r.reservation.start_date, r.reservation.id));
        Ok(result)
    }

    fn get_reservation_by_id(
        &mut self,
        reservation_id: ReservationId,
    ) -> Result<FullReservation, StoreError> {
        let mut data = self.store.data.lock().expect("Error while locking mutex.");
        if let Some(e) = data.next_error.take() {
            return Err(e);
        }
        let reservation = data
            .reservations
            .iter()
            .find(|r| r.id == reservation_id)
            .ok_or(StoreError::NotExisting)?;
        data.full_reservation(reservation)
    }

    fn update_reservation(
        &mut self,
        reservation_id: ReservationId,
        patch: ReservationPatch,
    ) -> Result<(), StoreError> {
        let mut data = self.store.data.lock().expect("Error while locking mutex.");
        if let Some(e) = data.next_error.take() {
            return Err(e);
        }
        let reservation = data
            .reservations
            .iter_mut()
            .find(|r| r.id == reservation_id)
            .ok_or(StoreError::NotExisting)?;
        reservation.first_name = patch.first_name;
        reservation.last_name = patch.last_name;
        reservation.email = patch.email;
        reservation.phone = patch.phone;
        reservation.updated_at = patch.updated_at;
        Ok(())
    }

    fn delete_reservation(&mut self, reservation_id: ReservationId) -> Result<(), StoreError> {
        let mut data = self.store.data.lock().expect("Error while locking mutex.");
        if let Some(e) = data.next_error.take() {
            return Err(e);
        }
        let count_before = data.reservations.len();
        data.reservations.retain(|r| r.id != reservation_id);
        if data.reservations.len() == count_before {
            return Err(StoreError::NotExisting);
        }
        data.restrictions
            .retain(|r| r.reservation_id != Some(reservation_id));
        Ok(())
    }

    fn update_processed_for_reservation(
        &mut self,
        reservation_id: ReservationId,
        processed: ProcessingState,
    ) -> Result<(), StoreError> {
        let mut data = self.store.data.lock().expect("Error while locking mutex.");
        if let Some(e) = data.next_error.take() {
            return Err(e);
        }
        let reservation = data
            .reservations
            .iter_mut()
            .find(|r| r.id == reservation_id)
            .ok_or(StoreError::NotExisting)?;
        reservation.processed = processed;
        reservation.updated_at = chrono::Utc::now();
        Ok(())
    }

    fn insert_room_restriction(
        &mut self,
        restriction: NewRoomRestriction,
    ) -> Result<RestrictionId, StoreError> {
        let mut data = self.store.data.lock().expect("Error while locking mutex.");
        if let Some(e) = data.next_error.take() {
            return Err(e);
        }
        data.check_failing_room(restriction.room_id)?;
        let dates = restriction.dates().ok_or(StoreError::InvalidInputData(
            "CheckViolation".to_owned(),
        ))?;
        if data
            .restrictions
            .iter()
            .any(|r| r.room_id == restriction.room_id && r.overlaps(&dates))
        {
            // Simulates the exclusion constraint of the database schema
            return Err(StoreError::ConflictEntityExists);
        }
        let id = data.restrictions.iter().map(|r| r.id).max().unwrap_or(0) + 1;
        data.restrictions.push(RoomRestriction {
            id,
            start_date: restriction.start_date,
            end_date: restriction.end_date,
            room_id: restriction.room_id,
            reservation_id: restriction.reservation_id,
            restriction_type: restriction.restriction_type,
            created_at: chrono::Utc::now(),
            updated_at: chrono::Utc::now(),
        });
        Ok(id)
    }

    fn get_restrictions_for_room_by_date(
        &mut self,
        room_id: RoomId,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<RoomRestriction>, StoreError> {
        let mut data = self.store.data.lock().expect("Error while locking mutex.");
        if let Some(e) = data.next_error.take() {
            return Err(e);
        }
        let range = DateRange::new(start, end).ok_or(StoreError::InvalidInputData(
            "Empty date range".to_owned(),
        ))?;
        let mut result: Vec<RoomRestriction> = data
            .restrictions
            .iter()
            .filter(|r| r.room_id == room_id && r.overlaps(&range))
            .cloned()
            .collect();
        result.sort_by_key(|r| (r.start_date, r.id));
        Ok(result)
    }

    fn delete_room_restriction(&mut self, restriction_id: RestrictionId) -> Result<(), StoreError> {
        let mut data = self.store.data.lock().expect("Error while locking mutex.");
        if let Some(e) = data.next_error.take() {
            return Err(e);
        }
        let count_before = data.restrictions.len();
        data.restrictions.retain(|r| {
            !(r.id == restriction_id
                && r.restriction_type == RestrictionType::OwnerBlock
                && r.reservation_id.is_none())
        });
        if data.restrictions.len() == count_before {
            Err(StoreError::NotExisting)
        } else {
            Ok(())
        }
    }

    fn delete_owner_block_by_date(
        &mut self,
        room_id: RoomId,
        date: NaiveDate,
    ) -> Result<(), StoreError> {
        let mut data = self.store.data.lock().expect("Error while locking mutex.");
        if let Some(e) = data.next_error.take() {
            return Err(e);
        }
        let count_before = data.restrictions.len();
        let end = date + Days::new(1);
        data.restrictions.retain(|r| {
            !(r.room_id == room_id
                && r.reservation_id.is_none()
                && r.start_date == date
                && r.end_date == end
                && r.is_single_day_block())
        });
        if data.restrictions.len() == count_before {
            Err(StoreError::NotExisting)
        } else {
            Ok(())
        }
    }

    fn get_user_by_id(&mut self, user_id: UserId) -> Result<User, StoreError> {
        let mut data = self.store.data.lock().expect("Error while locking mutex.");
        if let Some(e) = data.next_error.take() {
            return Err(e);
        }
        data.users
            .iter()
            .find(|u| u.id == user_id)
            .cloned()
            .ok_or(StoreError::NotExisting)
    }

    fn get_user_by_email(&mut self, email: &str) -> Result<User, StoreError> {
        let mut data = self.store.data.lock().expect("Error while locking mutex.");
        if let Some(e) = data.next_error.take() {
            return Err(e);
        }
        data.users
            .iter()
            .find(|u| u.email == email)
            .cloned()
            .ok_or(StoreError::NotExisting)
    }

    fn create_user(&mut self, user: NewUser) -> Result<UserId, StoreError> {
        let mut data = self.store.data.lock().expect("Error while locking mutex.");
        if let Some(e) = data.next_error.take() {
            return Err(e);
        }
        if data.users.iter().any(|u| u.email == user.email) {
            return Err(StoreError::ConflictEntityExists);
        }
        let id = data.users.iter().map(|u| u.id).max().unwrap_or(0) + 1;
        data.users.push(User {
            id,
            first_name: user.first_name,
            last_name: user.last_name,
            email: user.email,
            password: user.password,
            access_level: user.access_level,
            created_at: chrono::Utc::now(),
            updated_at: chrono::Utc::now(),
        });
        Ok(id)
    }
}
