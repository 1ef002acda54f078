use super::{
    models, schema, ReservationId, ReservationStore, ReservationStoreFacade, RestrictionId, RoomId,
    StoreError, UserId,
};
use chrono::{Days, NaiveDate};
use diesel::pg::PgConnection;
use diesel::prelude::*;

#[derive(Clone)]
pub struct PgDataStore {
    pool: diesel::r2d2::Pool<diesel::r2d2::ConnectionManager<PgConnection>>,
}

impl PgDataStore {
    pub fn new(database_url: &str) -> Result<Self, StoreError> {
        let connection_manager = diesel::r2d2::ConnectionManager::<PgConnection>::new(database_url);
        Ok(Self {
            pool: diesel::r2d2::Pool::builder()
                .test_on_check_out(true)
                .min_idle(Some(2))
                .build(connection_manager)?,
        })
    }
}

impl ReservationStore for PgDataStore {
    fn get_facade<'a>(&'a self) -> Result<Box<dyn ReservationStoreFacade + 'a>, StoreError> {
        Ok(Box::new(PgDataStoreFacade::with_pooled_connection(
            self.pool.get()?,
        )))
    }
}

pub struct PgDataStoreFacade {
    connection: diesel::r2d2::PooledConnection<diesel::r2d2::ConnectionManager<PgConnection>>,
}

impl PgDataStoreFacade {
    pub fn with_pooled_connection(
        connection: diesel::r2d2::PooledConnection<diesel::r2d2::ConnectionManager<PgConnection>>,
    ) -> Self {
        Self { connection }
    }
}

/// Exclusion constraint rejecting overlapping restrictions of the same room
const OVERLAP_CONSTRAINT_NAME: &str = "room_restrictions_no_overlap";

type FullReservationQueryResult = (models::Reservation, models::Room);

fn into_full_reservation((reservation, room): FullReservationQueryResult) -> models::FullReservation {
    models::FullReservation { reservation, room }
}

impl ReservationStoreFacade for PgDataStoreFacade {
    fn search_availability_by_dates_by_room_id(
        &mut self,
        start: NaiveDate,
        end: NaiveDate,
        the_room_id: RoomId,
    ) -> Result<bool, StoreError> {
        use schema::room_restrictions::dsl::*;

        let overlapping: i64 = room_restrictions
            .filter(room_id.eq(the_room_id))
            .filter(start_date.lt(end))
            .filter(end_date.gt(start))
            .count()
            .get_result(&mut self.connection)?;
        Ok(overlapping == 0)
    }

    fn search_availability_for_all_rooms(
        &mut self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<models::Room>, StoreError> {
        use schema::room_restrictions;
        use schema::rooms;

        self.connection.transaction(|connection| {
            let occupied_room_ids = room_restrictions::table
                .filter(room_restrictions::start_date.lt(end))
                .filter(room_restrictions::end_date.gt(start))
                .select(room_restrictions::room_id)
                .distinct()
                .load::<RoomId>(connection)?;

            Ok(rooms::table
                .filter(rooms::id.ne_all(occupied_room_ids))
                .order_by(rooms::id.asc())
                .select(models::Room::as_select())
                .load::<models::Room>(connection)?)
        })
    }

    fn get_room_by_id(&mut self, room_id: RoomId) -> Result<models::Room, StoreError> {
        use schema::rooms::dsl::*;

        rooms
            .filter(id.eq(room_id))
            .select(models::Room::as_select())
            .first::<models::Room>(&mut self.connection)
            .map_err(|e| e.into())
    }

    fn all_rooms(&mut self) -> Result<Vec<models::Room>, StoreError> {
        use schema::rooms::dsl::*;

        rooms
            .order_by(id.asc())
            .select(models::Room::as_select())
            .load::<models::Room>(&mut self.connection)
            .map_err(|e| e.into())
    }

    fn insert_reservation(
        &mut self,
        reservation: models::NewReservation,
    ) -> Result<ReservationId, StoreError> {
        use schema::reservations::dsl::*;

        Ok(diesel::insert_into(reservations)
            .values(&reservation)
            .returning(id)
            .get_result::<ReservationId>(&mut self.connection)?)
    }

    fn all_reservations(&mut self) -> Result<Vec<models::FullReservation>, StoreError> {
        use schema::reservations;
        use schema::rooms;

        Ok(reservations::table
            .inner_join(rooms::table)
            .order_by((reservations::start_date.asc(), reservations::id.asc()))
            .select((models::Reservation::as_select(), models::Room::as_select()))
            .load::<FullReservationQueryResult>(&mut self.connection)?
            .into_iter()
            .map(into_full_reservation)
            .collect())
    }

    fn all_new_reservations(&mut self) -> Result<Vec<models::FullReservation>, StoreError> {
        use schema::reservations;
        use schema::rooms;

        Ok(reservations::table
            .inner_join(rooms::table)
            .filter(reservations::processed.eq(models::ProcessingState::New))
            .order_by((reservations::start_date.asc(), reservations::id.asc()))
            .select((models::Reservation::as_select(), models::Room::as_select()))
            .load::<FullReservationQueryResult>(&mut self.connection)?
            .into_iter()
            .map(into_full_reservation)
            .collect())
    }

    fn get_reservation_by_id(
        &mut self,
        reservation_id: ReservationId,
    ) -> Result<models::FullReservation, StoreError> {
        use schema::reservations;
        use schema::rooms;

        Ok(into_full_reservation(
            reservations::table
                .inner_join(rooms::table)
                .filter(reservations::id.eq(reservation_id))
                .select((models::Reservation::as_select(), models::Room::as_select()))
                .first::<FullReservationQueryResult>(&mut self.connection)?,
        ))
    }

    fn update_reservation(
        &mut self,
        reservation_id: ReservationId,
        patch: models::ReservationPatch,
    ) -> Result<(), StoreError> {
        use schema::reservations::dsl::*;

        let result = diesel::update(reservations)
            .filter(id.eq(reservation_id))
            .set(patch)
            .execute(&mut self.connection)?;
        if result == 1 {
            Ok(())
        } else {
            Err(StoreError::NotExisting)
        }
    }

    fn delete_reservation(&mut self, reservation_id: ReservationId) -> Result<(), StoreError> {
        use schema::reservations;
        use schema::room_restrictions;

        self.connection.transaction(|connection| {
            diesel::delete(room_restrictions::table)
                .filter(room_restrictions::reservation_id.eq(reservation_id))
                .execute(connection)?;
            let count = diesel::delete(reservations::table)
                .filter(reservations::id.eq(reservation_id))
                .execute(connection)?;
            if count == 1 {
                Ok(())
            } else {
                Err(StoreError::NotExisting)
            }
        })
    }

    fn update_processed_for_reservation(
        &mut self,
        reservation_id: ReservationId,
        new_processed: models::ProcessingState,
    ) -> Result<(), StoreError> {
        use schema::reservations::dsl::*;

        let result = diesel::update(reservations)
            .filter(id.eq(reservation_id))
            .set((processed.eq(new_processed), updated_at.eq(chrono::Utc::now())))
            .execute(&mut self.connection)?;
        if result == 1 {
            Ok(())
        } else {
            Err(StoreError::NotExisting)
        }
    }

    fn insert_room_restriction(
        &mut self,
        restriction: models::NewRoomRestriction,
    ) -> Result<RestrictionId, StoreError> {
        use schema::room_restrictions::dsl::*;

        diesel::insert_into(room_restrictions)
            .values(&restriction)
            .returning(id)
            .get_result::<RestrictionId>(&mut self.connection)
            .map_err(|e| match e {
                // Diesel has no error kind for exclusion constraint violations
                diesel::result::Error::DatabaseError(_, ref info)
                    if info.constraint_name() == Some(OVERLAP_CONSTRAINT_NAME) =>
                {
                    StoreError::ConflictEntityExists
                }
                e => e.into(),
            })
    }

    fn get_restrictions_for_room_by_date(
        &mut self,
        the_room_id: RoomId,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<models::RoomRestriction>, StoreError> {
        use schema::room_restrictions::dsl::*;

        room_restrictions
            .filter(room_id.eq(the_room_id))
            .filter(start_date.lt(end))
            .filter(end_date.gt(start))
            .order_by((start_date.asc(), id.asc()))
            .select(models::RoomRestriction::as_select())
            .load::<models::RoomRestriction>(&mut self.connection)
            .map_err(|e| e.into())
    }

    fn delete_room_restriction(&mut self, restriction_id: RestrictionId) -> Result<(), StoreError> {
        use schema::room_restrictions::dsl::*;

        let count = diesel::delete(room_restrictions)
            .filter(id.eq(restriction_id))
            .filter(restriction_type.eq(models::RestrictionType::OwnerBlock))
            .filter(reservation_id.is_null())
            .execute(&mut self.connection)?;
        if count == 1 {
            Ok(())
        } else {
            Err(StoreError::NotExisting)
        }
    }

    fn delete_owner_block_by_date(
        &mut self,
        the_room_id: RoomId,
        date: NaiveDate,
    ) -> Result<(), StoreError> {
        use schema::room_restrictions::dsl::*;

        let count = diesel::delete(room_restrictions)
            .filter(room_id.eq(the_room_id))
            .filter(restriction_type.eq(models::RestrictionType::OwnerBlock))
            .filter(reservation_id.is_null())
            .filter(start_date.eq(date))
            .filter(end_date.eq(date + Days::new(1)))
            .execute(&mut self.connection)?;
        if count >= 1 {
            Ok(())
        } else {
            Err(StoreError::NotExisting)
        }
    }

    fn get_user_by_id(&mut self, user_id: UserId) -> Result<models::User, StoreError> {
        use schema::users::dsl::*;

        users
            .filter(id.eq(user_id))
            .select(models::User::as_select())
            .first::<models::User>(&mut self.connection)
            .map_err(|e| e.into())
    }

    fn get_user_by_email(&mut self, the_email: &str) -> Result<models::User, StoreError> {
        use schema::users::dsl::*;

        users
            .filter(email.eq(the_email))
            .select(models::User::as_select())
            .first::<models::User>(&mut self.connection)
            .map_err(|e| e.into())
    }

    fn create_user(&mut self, user: models::NewUser) -> Result<UserId, StoreError> {
        use schema::users::dsl::*;

        Ok(diesel::insert_into(users)
            .values(&user)
            .returning(id)
            .get_result::<UserId>(&mut self.connection)?)
    }
}
