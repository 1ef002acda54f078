use crate::booking::calendar::{parse_block_checkboxes, room_calendar_view, CalendarMonth};
use crate::booking::validation::{GuestDetailsForm, ValidationErrors};
use crate::booking::BookingEngine;
use crate::data_store::RoomId;
use crate::session::SessionData;
use crate::web::api::{require_administrator, APIError};
use crate::web::session_middleware::SessionInterface;
use crate::web::AppState;
use actix_web::{get, post, web, HttpRequest, HttpResponse, Responder};
use chrono::Utc;
use leafsite_api_types::BlockChanges;
use log::warn;
use serde::Deserialize;
use std::collections::{BTreeMap, BTreeSet};
use std::ops::RangeInclusive;

/// Years which can be shown in the admin calendar
const CALENDAR_YEARS: RangeInclusive<i32> = 1900..=9999;

#[get("/reservations-new")]
async fn list_new_reservations(
    req: HttpRequest,
    state: web::Data<AppState>,
) -> Result<impl Responder, APIError> {
    let session = req.session_data();
    let reservations: Vec<leafsite_api_types::Reservation> =
        web::block(move || -> Result<_, APIError> {
            let mut store = state.store.get_facade()?;
            require_administrator(store.as_mut(), &session)?;
            let mut engine = BookingEngine::new(store);
            Ok(engine.all_new_reservations()?)
        })
        .await??
        .into_iter()
        .map(|r| r.into())
        .collect();

    Ok(web::Json(reservations))
}

#[get("/reservations-all")]
async fn list_all_reservations(
    req: HttpRequest,
    state: web::Data<AppState>,
) -> Result<impl Responder, APIError> {
    let session = req.session_data();
    let reservations: Vec<leafsite_api_types::Reservation> =
        web::block(move || -> Result<_, APIError> {
            let mut store = state.store.get_facade()?;
            require_administrator(store.as_mut(), &session)?;
            let mut engine = BookingEngine::new(store);
            Ok(engine.all_reservations()?)
        })
        .await??
        .into_iter()
        .map(|r| r.into())
        .collect();

    Ok(web::Json(reservations))
}

#[get("/reservations/{reservation_id}")]
async fn get_reservation(
    req: HttpRequest,
    path: web::Path<i32>,
    state: web::Data<AppState>,
) -> Result<impl Responder, APIError> {
    let reservation_id = path.into_inner();
    let session = req.session_data();
    let reservation: leafsite_api_types::Reservation =
        web::block(move || -> Result<_, APIError> {
            let mut store = state.store.get_facade()?;
            require_administrator(store.as_mut(), &session)?;
            let mut engine = BookingEngine::new(store);
            Ok(engine.get_reservation(reservation_id)?)
        })
        .await??
        .into();

    Ok(web::Json(reservation))
}

/// Change the guest details of a reservation
#[post("/reservations/{reservation_id}")]
async fn update_reservation(
    req: HttpRequest,
    path: web::Path<i32>,
    data: web::Form<GuestDetailsForm>,
    state: web::Data<AppState>,
) -> Result<impl Responder, APIError> {
    let reservation_id = path.into_inner();
    let session = req.session_data();
    let guest = data.validate()?;
    let reservation: leafsite_api_types::Reservation =
        web::block(move || -> Result<_, APIError> {
            let mut store = state.store.get_facade()?;
            let user = require_administrator(store.as_mut(), &session)?;
            let mut engine = BookingEngine::new(store);
            engine.update_reservation(&user, reservation_id, guest)?;
            Ok(engine.get_reservation(reservation_id)?)
        })
        .await??
        .into();

    Ok(web::Json(reservation))
}

#[post("/process-reservation/{reservation_id}")]
async fn process_reservation(
    req: HttpRequest,
    path: web::Path<i32>,
    state: web::Data<AppState>,
) -> Result<impl Responder, APIError> {
    let reservation_id = path.into_inner();
    let session = req.session_data();
    web::block(move || -> Result<_, APIError> {
        let mut store = state.store.get_facade()?;
        let user = require_administrator(store.as_mut(), &session)?;
        let mut engine = BookingEngine::new(store);
        engine.process_reservation(&user, reservation_id)?;
        Ok(())
    })
    .await??;

    Ok(HttpResponse::NoContent())
}

#[post("/delete-reservation/{reservation_id}")]
async fn delete_reservation(
    req: HttpRequest,
    path: web::Path<i32>,
    state: web::Data<AppState>,
) -> Result<impl Responder, APIError> {
    let reservation_id = path.into_inner();
    let session = req.session_data();
    web::block(move || -> Result<_, APIError> {
        let mut store = state.store.get_facade()?;
        let user = require_administrator(store.as_mut(), &session)?;
        let mut engine = BookingEngine::new(store);
        engine.delete_reservation(&user, reservation_id)?;
        Ok(())
    })
    .await??;

    Ok(HttpResponse::NoContent())
}

#[derive(Deserialize)]
struct CalendarQuery {
    y: Option<String>,
    m: Option<String>,
}

fn parse_month(year: Option<&str>, month: Option<&str>) -> Result<CalendarMonth, APIError> {
    let (year, month) = match (year, month) {
        (Some(year), Some(month)) => (year, month),
        _ => return Ok(CalendarMonth::containing(Utc::now().date_naive())),
    };
    let mut errors = ValidationErrors::default();
    let year = year
        .trim()
        .parse::<i32>()
        .ok()
        .filter(|y| CALENDAR_YEARS.contains(y))
        .or_else(|| {
            errors.add("y", "Invalid year");
            None
        });
    let month = month
        .trim()
        .parse::<u32>()
        .map_err(|_| errors.add("m", "Invalid month"))
        .ok();
    match (year, month) {
        (Some(year), Some(month)) => CalendarMonth::new(year, month).ok_or_else(|| {
            errors.add("m", "Invalid month");
            APIError::ValidationFailed(errors)
        }),
        _ => Err(APIError::ValidationFailed(errors)),
    }
}

/// Show the occupancy calendar of all rooms for one month (default: the current month).
///
/// The calendar maps shown are cached in the session, to diff the submitted calendar against.
#[get("/reservations-calendar")]
async fn show_calendar(
    req: HttpRequest,
    query: web::Query<CalendarQuery>,
    state: web::Data<AppState>,
) -> Result<impl Responder, APIError> {
    let month = parse_month(query.y.as_deref(), query.m.as_deref())?;
    let mut session = req.session_data();
    let (session, rooms) = web::block(move || -> Result<_, APIError> {
        let mut store = state.store.get_facade()?;
        require_administrator(store.as_mut(), &session)?;
        let mut engine = BookingEngine::new(store);
        let mut rooms = vec![];
        for room in engine.all_rooms()? {
            let (maps, restrictions) = engine.room_calendar(room.id, month)?;
            let room_id = room.id;
            rooms.push(room_calendar_view(room, &maps, &restrictions));
            session.put_calendar_maps(room_id, maps);
        }
        Ok((session, rooms))
    })
    .await??;
    req.set_session_data(session);

    let navigation = |m: Option<CalendarMonth>| {
        m.filter(|m| CALENDAR_YEARS.contains(&m.year()))
            .map(|m| (m.year(), m.month()))
    };
    Ok(web::Json(leafsite_api_types::CalendarMonth {
        year: month.year(),
        month: month.month(),
        previous: navigation(month.previous()),
        next: navigation(month.next()),
        rooms,
    }))
}

/// Apply the owner blocks checked in the submitted calendar
#[post("/reservations-calendar")]
async fn submit_calendar(
    req: HttpRequest,
    data: web::Form<Vec<(String, String)>>,
    state: web::Data<AppState>,
) -> Result<impl Responder, APIError> {
    let fields = data.into_inner();
    let field = |name: &str| {
        fields
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    };
    let month = match (field("y"), field("m")) {
        (Some(year), Some(month)) => parse_month(Some(year), Some(month))?,
        _ => {
            let mut errors = ValidationErrors::default();
            errors.add("m", "Month of the calendar is missing");
            return Err(errors.into());
        }
    };
    let checked = parse_block_checkboxes(fields.iter().map(|(k, v)| (k.as_str(), v.as_str())));

    let mut session = req.session_data();
    let (session, result) = web::block(move || -> Result<_, APIError> {
        let mut store = state.store.get_facade()?;
        require_administrator(store.as_mut(), &session)?;
        let mut engine = BookingEngine::new(store);
        let result = reconcile_calendar(&mut engine, &mut session, month, checked);
        Ok((session, result))
    })
    .await??;
    // The cached calendar maps of the rooms written to are dropped, even if writing failed
    req.set_session_data(session);

    Ok(web::Json(result?))
}

fn reconcile_calendar(
    engine: &mut BookingEngine,
    session: &mut SessionData,
    month: CalendarMonth,
    mut checked: BTreeMap<RoomId, BTreeSet<chrono::NaiveDate>>,
) -> Result<Vec<BlockChanges>, APIError> {
    let mut changes: Vec<BlockChanges> = vec![];
    let rooms = engine.all_rooms()?;
    for room in rooms {
        let cached = match session.calendar_maps(room.id, month) {
            Some(maps) => maps.clone(),
            None => match engine.room_calendar(room.id, month) {
                Ok((maps, _)) => maps,
                Err(e) => return Err(APIError::partially_applied(changes, e.into())),
            },
        };
        session.remove_calendar_maps(room.id);
        let checked_days = checked.remove(&room.id).unwrap_or_default();
        let mut room_changes = BlockChanges {
            room_id: room.id,
            ..Default::default()
        };
        let result = engine.reconcile_owner_blocks(&cached, &checked_days, &mut room_changes);
        changes.push(room_changes);
        if let Err(e) = result {
            return Err(APIError::partially_applied(changes, e.into()));
        }
    }
    for room_id in checked.keys() {
        warn!("Ignoring owner blocks for unknown room {}", room_id);
    }
    Ok(changes)
}

/// Remove an owner block, e.g. a multi-day block which cannot be toggled in the calendar
#[post("/delete-restriction/{restriction_id}")]
async fn delete_restriction(
    req: HttpRequest,
    path: web::Path<i32>,
    state: web::Data<AppState>,
) -> Result<impl Responder, APIError> {
    let restriction_id = path.into_inner();
    let mut session = req.session_data();
    let session = web::block(move || -> Result<_, APIError> {
        let mut store = state.store.get_facade()?;
        let user = require_administrator(store.as_mut(), &session)?;
        let mut engine = BookingEngine::new(store);
        engine.remove_room_restriction(&user, restriction_id)?;
        session.clear_calendar_maps();
        Ok(session)
    })
    .await??;
    req.set_session_data(session);

    Ok(HttpResponse::NoContent())
}
