use crate::booking::validation::{
    validate_date_range, validate_id, DateRangeForm, GuestDetailsForm, RoomAvailabilityForm,
};
use crate::booking::{BookingEngine, EngineError};
use crate::web::api::APIError;
use crate::web::session_middleware::SessionInterface;
use crate::web::AppState;
use actix_web::http::header::LOCATION;
use actix_web::{get, post, web, HttpRequest, HttpResponse, Responder};
use leafsite_api_types::{AvailabilityResponse, AvailableRooms, DraftReservation};
use serde::Deserialize;

#[get("/rooms")]
async fn list_rooms(state: web::Data<AppState>) -> Result<impl Responder, APIError> {
    let rooms: Vec<leafsite_api_types::Room> = web::block(move || -> Result<_, APIError> {
        let mut engine = BookingEngine::new(state.store.get_facade()?);
        Ok(engine.all_rooms()?)
    })
    .await??
    .into_iter()
    .map(|r| r.into())
    .collect();

    Ok(web::Json(rooms))
}

#[get("/rooms/{room_id}")]
async fn get_room(
    path: web::Path<i32>,
    state: web::Data<AppState>,
) -> Result<impl Responder, APIError> {
    let room_id = path.into_inner();
    let room: leafsite_api_types::Room = web::block(move || -> Result<_, APIError> {
        let mut engine = BookingEngine::new(state.store.get_facade()?);
        Ok(engine.get_room(room_id)?)
    })
    .await??
    .into();

    Ok(web::Json(room))
}

/// Search all rooms available for the given dates. If there is any, the dates are staged as new
/// draft reservation.
#[post("/search-availability")]
async fn search_availability(
    req: HttpRequest,
    data: web::Form<DateRangeForm>,
    state: web::Data<AppState>,
) -> Result<impl Responder, APIError> {
    let dates = data.validate()?;
    let rooms = web::block(move || -> Result<_, APIError> {
        let mut engine = BookingEngine::new(state.store.get_facade()?);
        Ok(engine.search_all_rooms_available(&dates)?)
    })
    .await??;

    if !rooms.is_empty() {
        let mut session = req.session_data();
        session.booking.choose_dates(dates);
        req.set_session_data(session);
    }
    Ok(web::Json(AvailableRooms {
        start_date: dates.start(),
        end_date: dates.end(),
        rooms: rooms.into_iter().map(|r| r.into()).collect(),
    }))
}

/// Check the availability of a single room, e.g. from the room's page
#[post("/search-availability-json")]
async fn search_availability_json(
    data: web::Form<RoomAvailabilityForm>,
    state: web::Data<AppState>,
) -> Result<impl Responder, APIError> {
    let (room_id, dates) = data.validate()?;
    let available = web::block(move || -> Result<_, APIError> {
        let mut engine = BookingEngine::new(state.store.get_facade()?);
        Ok(engine.check_room_available(room_id, &dates)?)
    })
    .await??;

    Ok(web::Json(AvailabilityResponse {
        ok: available,
        message: if available {
            "Available!".to_owned()
        } else {
            "Not available".to_owned()
        },
        room_id: Some(room_id),
        start_date: Some(dates.start()),
        end_date: Some(dates.end()),
    }))
}

#[get("/choose-room/{room_id}")]
async fn choose_room(
    req: HttpRequest,
    path: web::Path<i32>,
    state: web::Data<AppState>,
) -> Result<impl Responder, APIError> {
    let room_id = path.into_inner();
    let mut session = req.session_data();
    let (session, draft) = web::block(move || -> Result<_, APIError> {
        let mut engine = BookingEngine::new(state.store.get_facade()?);
        session.booking.choose_room(&mut engine, room_id)?;
        let draft = session.booking.draft()?;
        Ok((session, draft))
    })
    .await??;
    req.set_session_data(session);

    Ok(web::Json(draft))
}

#[derive(Deserialize)]
struct BookRoomQuery {
    #[serde(default)]
    id: String,
    #[serde(default)]
    s: String,
    #[serde(default)]
    e: String,
}

/// Start a draft reservation for a specific room and dates, as linked from the availability check
/// of a single room
#[get("/book-room")]
async fn book_room(
    req: HttpRequest,
    query: web::Query<BookRoomQuery>,
    state: web::Data<AppState>,
) -> Result<impl Responder, APIError> {
    let room_id = validate_id("id", &query.id)?;
    let dates = validate_date_range("s", &query.s, "e", &query.e)?;
    let mut session = req.session_data();
    let (session, draft) = web::block(move || -> Result<_, APIError> {
        let mut engine = BookingEngine::new(state.store.get_facade()?);
        session.booking.book_room(&mut engine, room_id, dates)?;
        let draft = session.booking.draft()?;
        Ok((session, draft))
    })
    .await??;
    req.set_session_data(session);

    Ok(web::Json(draft))
}

#[get("/make-reservation")]
async fn get_draft_reservation(req: HttpRequest) -> Result<impl Responder, APIError> {
    let draft: DraftReservation = req.session_data().booking.draft()?;
    Ok(web::Json(draft))
}

#[post("/make-reservation")]
async fn submit_guest_details(
    req: HttpRequest,
    data: web::Form<GuestDetailsForm>,
) -> Result<impl Responder, APIError> {
    let mut session = req.session_data();
    let result = session.booking.submit_guest_details(&data);
    // Invalid details reset the draft to the chosen room, so the session is stored in any case
    if !matches!(result, Err(EngineError::NoActiveReservation)) {
        req.set_session_data(session.clone());
    }
    result?;

    Ok(web::Json(session.booking.draft()?))
}

#[post("/confirm-reservation")]
async fn confirm_reservation(
    req: HttpRequest,
    state: web::Data<AppState>,
) -> Result<impl Responder, APIError> {
    let mut session = req.session_data();
    let session = web::block(move || -> Result<_, APIError> {
        let mut engine = BookingEngine::new(state.store.get_facade()?);
        session.booking.confirm(&mut engine)?;
        Ok(session)
    })
    .await??;
    req.set_session_data(session);

    Ok(HttpResponse::SeeOther()
        .insert_header((LOCATION, "/reservation-summary"))
        .finish())
}

/// Show the reservation confirmed last. The summary can only be requested once.
#[get("/reservation-summary")]
async fn reservation_summary(req: HttpRequest) -> Result<impl Responder, APIError> {
    let mut session = req.session_data();
    let reservation: leafsite_api_types::Reservation = session.booking.take_summary()?.into();
    req.set_session_data(session);

    Ok(web::Json(reservation))
}
