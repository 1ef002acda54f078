
use super::*;
use crate::data_store::models::RestrictionType;
use crate::data_store::store_mock::{fixture_store, StoreMock};
use crate::web::session_middleware::{session_middleware, COOKIE_NAME};
use crate::web::AppState;
use actix_web::cookie::Cookie;
use actix_web::{http, middleware, test, App};
use chrono::NaiveDate;
use std::sync::Arc;

fn sample_state() -> (Arc<StoreMock>, AppState) {
    let store = Arc::new(fixture_store());
    sample_data::fill_sample_data(store.as_ref());
    let state = AppState::for_testing(store.clone());
    (store, state)
}

fn fixture_state() -> AppState {
    AppState::for_testing(Arc::new(fixture_store()))
}

macro_rules! init_app {
    ($state:expr) => {
        test::init_service(
            App::new()
                .configure(configure_app)
                .app_data(web::Data::new($state.clone()))
                .wrap(middleware::from_fn(session_middleware)),
        )
        .await
    };
}

/// Send the request with the session cookie and keep the session cookie of the response
macro_rules! call {
    ($app:expr, $req:expr, $cookie:expr $(,)?) => {{
        let cookie: &mut Option<Cookie<'static>> = $cookie;
        let req: test::TestRequest = $req;
        let req = match cookie.as_ref() {
            Some(c) => req.cookie(c.clone()),
            None => req,
        };
        let res = test::call_service(&$app, req.to_request()).await;
        if let Some(new_cookie) = session_cookie(res.response()) {
            *cookie = Some(new_cookie);
        }
        res
    }};
}

macro_rules! login {
    ($app:expr, $email:expr, $cookie:expr) => {
        call!(
            $app,
            test::TestRequest::post()
                .uri("/user/login")
                .set_form([("email", $email), ("password", sample_data::PASSWORD)]),
            $cookie
        )
        .status()
    };
}

fn date(value: &str) -> NaiveDate {
    value.parse().unwrap()
}

fn session_cookie<B>(res: &HttpResponse<B>) -> Option<Cookie<'static>> {
    res.cookies()
        .find(|c| c.name() == COOKIE_NAME)
        .map(|c| c.into_owned())
}

#[actix_web::test]
async fn test_list_rooms() {
    let state = fixture_state();
    let app = init_app!(state);
    let req = test::TestRequest::get().uri("/rooms").to_request();
    let res = test::call_service(&app, req).await;
    assert_eq!(res.status(), http::StatusCode::OK);
    let rooms: Vec<leafsite_api_types::Room> = test::read_body_json(res).await;
    assert_eq!(rooms.len(), 2);
    assert_eq!(rooms[0].name, "Generals' Quarters");

    let req = test::TestRequest::get().uri("/rooms/17").to_request();
    let res = test::call_service(&app, req).await;
    assert_eq!(res.status(), http::StatusCode::NOT_FOUND);
}

#[actix_web::test]
async fn test_booking_flow() {
    let (store, state) = sample_state();
    let app = init_app!(state);
    let mut cookie = None;

    let res = call!(
        app,
        test::TestRequest::post()
            .uri("/search-availability")
            .set_form([("start", "2026-05-11"), ("end", "2026-05-14")]),
        &mut cookie,
    );
    assert_eq!(res.status(), http::StatusCode::OK);
    assert!(cookie.is_some());
    let result: leafsite_api_types::AvailableRooms = test::read_body_json(res).await;
    let room_ids: Vec<i32> = result.rooms.iter().map(|r| r.id).collect();
    assert_eq!(room_ids, vec![2]);

    // Room 1 is reserved, but choosing a room does not check the availability again
    let res = call!(
        app,
        test::TestRequest::get().uri("/choose-room/1"),
        &mut cookie,
    );
    assert_eq!(res.status(), http::StatusCode::OK);
    let draft: leafsite_api_types::DraftReservation = test::read_body_json(res).await;
    assert_eq!(draft.stage, leafsite_api_types::BookingStage::RoomChosen);

    let res = call!(
        app,
        test::TestRequest::post().uri("/make-reservation").set_form([
            ("first_name", "Maria"),
            ("last_name", "Schmidt"),
            ("email", "maria@example.com"),
            ("phone", ""),
        ]),
        &mut cookie,
    );
    assert_eq!(res.status(), http::StatusCode::OK);
    let draft: leafsite_api_types::DraftReservation = test::read_body_json(res).await;
    assert_eq!(draft.stage, leafsite_api_types::BookingStage::Validated);

    // The overlapping restriction is rejected by the store
    let res = call!(
        app,
        test::TestRequest::post().uri("/confirm-reservation"),
        &mut cookie,
    );
    assert_eq!(res.status(), http::StatusCode::CONFLICT);
    assert_eq!(store.data.lock().unwrap().reservations.len(), 1);

    let res = call!(
        app,
        test::TestRequest::get().uri("/book-room?id=1&s=2026-05-12&e=2026-05-14"),
        &mut cookie,
    );
    assert_eq!(res.status(), http::StatusCode::OK);
    let res = call!(
        app,
        test::TestRequest::post().uri("/make-reservation").set_form([
            ("first_name", "Maria"),
            ("last_name", "Schmidt"),
            ("email", "maria@example.com"),
        ]),
        &mut cookie,
    );
    assert_eq!(res.status(), http::StatusCode::OK);
    let res = call!(
        app,
        test::TestRequest::post().uri("/confirm-reservation"),
        &mut cookie,
    );
    assert_eq!(res.status(), http::StatusCode::SEE_OTHER);
    assert_eq!(
        res.headers().get(http::header::LOCATION).unwrap(),
        "/reservation-summary"
    );

    let res = call!(
        app,
        test::TestRequest::get().uri("/reservation-summary"),
        &mut cookie,
    );
    assert_eq!(res.status(), http::StatusCode::OK);
    let reservation: leafsite_api_types::Reservation = test::read_body_json(res).await;
    assert_eq!(reservation.room_id, 1);
    assert_eq!(reservation.start_date, date("2026-05-12"));
    assert_eq!(reservation.first_name, "Maria");

    {
        let data = store.data.lock().unwrap();
        assert_eq!(data.reservations.len(), 2);
        assert!(data.restrictions.iter().any(|r| {
            r.reservation_id == Some(reservation.id)
                && r.restriction_type == RestrictionType::Reservation
        }));
    }

    // The summary is only shown once
    let res = call!(
        app,
        test::TestRequest::get().uri("/reservation-summary"),
        &mut cookie,
    );
    assert_eq!(res.status(), http::StatusCode::SEE_OTHER);
}

#[actix_web::test]
async fn test_no_active_reservation() {
    let state = fixture_state();
    let app = init_app!(state);
    for req in [
        test::TestRequest::get().uri("/reservation-summary"),
        test::TestRequest::get().uri("/make-reservation"),
        test::TestRequest::get().uri("/choose-room/1"),
        test::TestRequest::post().uri("/confirm-reservation"),
    ] {
        let res = test::call_service(&app, req.to_request()).await;
        assert_eq!(res.status(), http::StatusCode::SEE_OTHER);
        assert_eq!(
            res.headers().get(http::header::LOCATION).unwrap(),
            BOOKING_START_PATH
        );
    }
}

#[actix_web::test]
async fn test_validation_errors() {
    let state = fixture_state();
    let app = init_app!(state);
    let mut cookie = None;

    let res = call!(
        app,
        test::TestRequest::post()
            .uri("/search-availability")
            .set_form([("start", "2026-05-14"), ("end", "2026-05-11")]),
        &mut cookie,
    );
    assert_eq!(res.status(), http::StatusCode::UNPROCESSABLE_ENTITY);
    assert!(cookie.is_none());
    let failure: leafsite_api_types::ValidationFailure = test::read_body_json(res).await;
    assert!(failure.errors.contains_key("end"));

    call!(
        app,
        test::TestRequest::get().uri("/book-room?id=1&s=2026-05-11&e=2026-05-14"),
        &mut cookie,
    );
    let res = call!(
        app,
        test::TestRequest::post().uri("/make-reservation").set_form([
            ("first_name", "Jo"),
            ("last_name", ""),
            ("email", "not-an-address"),
        ]),
        &mut cookie,
    );
    assert_eq!(res.status(), http::StatusCode::UNPROCESSABLE_ENTITY);
    let failure: leafsite_api_types::ValidationFailure = test::read_body_json(res).await;
    assert!(failure.errors.contains_key("first_name"));
    assert!(failure.errors.contains_key("last_name"));
    assert!(failure.errors.contains_key("email"));

    let res = call!(
        app,
        test::TestRequest::get().uri("/make-reservation"),
        &mut cookie,
    );
    assert_eq!(res.status(), http::StatusCode::OK);
    let draft: leafsite_api_types::DraftReservation = test::read_body_json(res).await;
    assert_eq!(draft.stage, leafsite_api_types::BookingStage::RoomChosen);
}

#[actix_web::test]
async fn test_search_availability_json() {
    let (_store, state) = sample_state();
    let app = init_app!(state);
    let req = test::TestRequest::post()
        .uri("/search-availability-json")
        .set_form([
            ("start", "2026-05-11"),
            ("end", "2026-05-13"),
            ("room_id", "1"),
        ])
        .to_request();
    let res = test::call_service(&app, req).await;
    assert_eq!(res.status(), http::StatusCode::OK);
    let result: leafsite_api_types::AvailabilityResponse = test::read_body_json(res).await;
    assert!(!result.ok);
    assert_eq!(result.room_id, Some(1));

    let req = test::TestRequest::post()
        .uri("/search-availability-json")
        .set_form([
            ("start", "2026-05-12"),
            ("end", "2026-05-13"),
            ("room_id", "1"),
        ])
        .to_request();
    let res = test::call_service(&app, req).await;
    let result: leafsite_api_types::AvailabilityResponse = test::read_body_json(res).await;
    assert!(result.ok);
    assert_eq!(result.message, "Available!");
}

#[actix_web::test]
async fn test_admin_authorization() {
    let (_store, state) = sample_state();
    let app = init_app!(state);

    let mut cookie = None;
    let res = call!(
        app,
        test::TestRequest::get().uri("/admin/reservations-all"),
        &mut cookie,
    );
    assert_eq!(res.status(), http::StatusCode::FORBIDDEN);

    let res = call!(
        app,
        test::TestRequest::post()
            .uri("/user/login")
            .set_form([("email", sample_data::ADMIN_EMAIL), ("password", "wrong")]),
        &mut cookie,
    );
    assert_eq!(res.status(), http::StatusCode::FORBIDDEN);
    assert!(cookie.is_none());

    assert_eq!(
        login!(app, sample_data::STAFF_EMAIL, &mut cookie),
        http::StatusCode::OK
    );
    let res = call!(
        app,
        test::TestRequest::get().uri("/admin/reservations-all"),
        &mut cookie,
    );
    assert_eq!(res.status(), http::StatusCode::FORBIDDEN);

    let mut cookie = None;
    assert_eq!(
        login!(app, sample_data::ADMIN_EMAIL, &mut cookie),
        http::StatusCode::OK
    );
    let res = call!(
        app,
        test::TestRequest::get().uri("/admin/reservations-new"),
        &mut cookie,
    );
    assert_eq!(res.status(), http::StatusCode::OK);
    let reservations: Vec<leafsite_api_types::Reservation> = test::read_body_json(res).await;
    assert_eq!(reservations.len(), 1);
    assert_eq!(reservations[0].last_name, "Weber");

    let res = call!(
        app,
        test::TestRequest::get().uri("/user/logout"),
        &mut cookie,
    );
    assert_eq!(res.status(), http::StatusCode::SEE_OTHER);
    let res = call!(
        app,
        test::TestRequest::get().uri("/admin/reservations-new"),
        &mut cookie,
    );
    assert_eq!(res.status(), http::StatusCode::FORBIDDEN);
}

#[actix_web::test]
async fn test_admin_process_and_delete_reservation() {
    let (store, state) = sample_state();
    let app = init_app!(state);
    let mut cookie = None;
    login!(app, sample_data::ADMIN_EMAIL, &mut cookie);
    let reservation_id = store.data.lock().unwrap().reservations[0].id;

    let res = call!(
        app,
        test::TestRequest::post()
            .uri(&format!("/admin/reservations/{}", reservation_id))
            .set_form([
                ("first_name", "Jonas"),
                ("last_name", "Becker"),
                ("email", "jonas@example.com"),
            ]),
        &mut cookie,
    );
    assert_eq!(res.status(), http::StatusCode::OK);
    let reservation: leafsite_api_types::Reservation = test::read_body_json(res).await;
    assert_eq!(reservation.last_name, "Becker");

    let res = call!(
        app,
        test::TestRequest::post().uri(&format!("/admin/process-reservation/{}", reservation_id)),
        &mut cookie,
    );
    assert_eq!(res.status(), http::StatusCode::NO_CONTENT);
    let res = call!(
        app,
        test::TestRequest::get().uri("/admin/reservations-new"),
        &mut cookie,
    );
    let reservations: Vec<leafsite_api_types::Reservation> = test::read_body_json(res).await;
    assert!(reservations.is_empty());

    let res = call!(
        app,
        test::TestRequest::post().uri(&format!("/admin/delete-reservation/{}", reservation_id)),
        &mut cookie,
    );
    assert_eq!(res.status(), http::StatusCode::NO_CONTENT);
    {
        let data = store.data.lock().unwrap();
        assert!(data.reservations.is_empty());
        assert!(data.restrictions.iter().all(|r| r.reservation_id.is_none()));
    }

    let res = call!(
        app,
        test::TestRequest::get().uri(&format!("/admin/reservations/{}", reservation_id)),
        &mut cookie,
    );
    assert_eq!(res.status(), http::StatusCode::NOT_FOUND);
}

#[actix_web::test]
async fn test_admin_calendar() {
    let (store, state) = sample_state();
    let app = init_app!(state);
    let mut cookie = None;
    login!(app, sample_data::ADMIN_EMAIL, &mut cookie);

    let res = call!(
        app,
        test::TestRequest::get().uri("/admin/reservations-calendar?y=2026&m=5"),
        &mut cookie,
    );
    assert_eq!(res.status(), http::StatusCode::OK);
    let calendar: leafsite_api_types::CalendarMonth = test::read_body_json(res).await;
    assert_eq!(calendar.previous, Some((2026, 4)));
    assert_eq!(calendar.next, Some((2026, 6)));
    assert_eq!(calendar.rooms.len(), 2);
    let days = &calendar.rooms[0].days;
    assert_eq!(days.len(), 31);
    let reserved: Vec<u32> = days
        .iter()
        .filter(|d| d.reservations > 0)
        .map(|d| chrono::Datelike::day(&d.date))
        .collect();
    assert_eq!(reserved, vec![10, 11]);

    let res = call!(
        app,
        test::TestRequest::post()
            .uri("/admin/reservations-calendar")
            .set_form([
                ("y", "2026"),
                ("m", "5"),
                ("block_1_2026-05-20", "on"),
                ("block_1_2026-05-10", "on"),
            ]),
        &mut cookie,
    );
    assert_eq!(res.status(), http::StatusCode::OK);
    let changes: Vec<leafsite_api_types::BlockChanges> = test::read_body_json(res).await;
    assert_eq!(changes.len(), 2);
    assert_eq!(changes[0].room_id, 1);
    assert_eq!(changes[0].added, vec![date("2026-05-20")]);
    assert_eq!(changes[0].skipped, vec![date("2026-05-10")]);
    assert!(changes[1].added.is_empty() && changes[1].removed.is_empty());
    assert!(store.data.lock().unwrap().restrictions.iter().any(|r| {
        r.room_id == 1
            && r.restriction_type == RestrictionType::OwnerBlock
            && r.start_date == date("2026-05-20")
    }));

    // Without a cached calendar, the current blocks are read again
    let res = call!(
        app,
        test::TestRequest::post()
            .uri("/admin/reservations-calendar")
            .set_form([("y", "2026"), ("m", "5")]),
        &mut cookie,
    );
    assert_eq!(res.status(), http::StatusCode::OK);
    let changes: Vec<leafsite_api_types::BlockChanges> = test::read_body_json(res).await;
    assert_eq!(changes[0].removed, vec![date("2026-05-20")]);

    let res = call!(
        app,
        test::TestRequest::get().uri("/admin/reservations-calendar?y=2026&m=13"),
        &mut cookie,
    );
    assert_eq!(res.status(), http::StatusCode::UNPROCESSABLE_ENTITY);
}

fn owner_blocks_on(store: &StoreMock, room_id: i32, day: &str) -> usize {
    store
        .data
        .lock()
        .unwrap()
        .restrictions
        .iter()
        .filter(|r| {
            r.room_id == room_id
                && r.restriction_type == RestrictionType::OwnerBlock
                && r.start_date == date(day)
        })
        .count()
}

#[actix_web::test]
async fn test_admin_calendar_failed_submission() {
    let (store, state) = sample_state();
    let app = init_app!(state);
    let mut cookie = None;
    login!(app, sample_data::ADMIN_EMAIL, &mut cookie);
    call!(
        app,
        test::TestRequest::get().uri("/admin/reservations-calendar?y=2026&m=5"),
        &mut cookie,
    );

    // Inserts for room 2 fail in the fixture store, after room 1 has been written
    let res = call!(
        app,
        test::TestRequest::post()
            .uri("/admin/reservations-calendar")
            .set_form([
                ("y", "2026"),
                ("m", "5"),
                ("block_1_2026-05-20", "on"),
                ("block_2_2026-05-20", "on"),
            ]),
        &mut cookie,
    );
    assert_eq!(res.status(), http::StatusCode::INTERNAL_SERVER_ERROR);
    let body: serde_json::Value = test::read_body_json(res).await;
    let applied: Vec<leafsite_api_types::BlockChanges> =
        serde_json::from_value(body["applied"].clone()).unwrap();
    assert_eq!(applied.len(), 2);
    assert_eq!(applied[0].room_id, 1);
    assert_eq!(applied[0].added, vec![date("2026-05-20")]);
    assert!(applied[1].added.is_empty());
    assert_eq!(owner_blocks_on(&store, 1, "2026-05-20"), 1);

    // The next submission is diffed against the current blocks, not the calendar shown before
    let res = call!(
        app,
        test::TestRequest::post()
            .uri("/admin/reservations-calendar")
            .set_form([("y", "2026"), ("m", "5"), ("block_1_2026-05-20", "on")]),
        &mut cookie,
    );
    assert_eq!(res.status(), http::StatusCode::OK);
    let changes: Vec<leafsite_api_types::BlockChanges> = test::read_body_json(res).await;
    assert!(changes[0].added.is_empty() && changes[0].removed.is_empty());

    let res = call!(
        app,
        test::TestRequest::post()
            .uri("/admin/reservations-calendar")
            .set_form([("y", "2026"), ("m", "5")]),
        &mut cookie,
    );
    assert_eq!(res.status(), http::StatusCode::OK);
    let changes: Vec<leafsite_api_types::BlockChanges> = test::read_body_json(res).await;
    assert_eq!(changes[0].removed, vec![date("2026-05-20")]);
    assert_eq!(owner_blocks_on(&store, 1, "2026-05-20"), 0);
}

#[actix_web::test]
async fn test_admin_calendar_year_bounds() {
    let (_store, state) = sample_state();
    let app = init_app!(state);
    let mut cookie = None;
    login!(app, sample_data::ADMIN_EMAIL, &mut cookie);

    for uri in [
        "/admin/reservations-calendar?y=-262143&m=1",
        "/admin/reservations-calendar?y=262143&m=12",
        "/admin/reservations-calendar?y=1899&m=12",
    ] {
        let res = call!(app, test::TestRequest::get().uri(uri), &mut cookie);
        assert_eq!(res.status(), http::StatusCode::UNPROCESSABLE_ENTITY);
        let failure: leafsite_api_types::ValidationFailure = test::read_body_json(res).await;
        assert!(failure.errors.contains_key("y"));
    }

    let res = call!(
        app,
        test::TestRequest::get().uri("/admin/reservations-calendar?y=1900&m=1"),
        &mut cookie,
    );
    assert_eq!(res.status(), http::StatusCode::OK);
    let calendar: leafsite_api_types::CalendarMonth = test::read_body_json(res).await;
    assert_eq!(calendar.previous, None);
    assert_eq!(calendar.next, Some((1900, 2)));
    let res = call!(
        app,
        test::TestRequest::get().uri("/admin/reservations-calendar?y=9999&m=12"),
        &mut cookie,
    );
    assert_eq!(res.status(), http::StatusCode::OK);
    let calendar: leafsite_api_types::CalendarMonth = test::read_body_json(res).await;
    assert_eq!(calendar.previous, Some((9999, 11)));
    assert_eq!(calendar.next, None);
}

#[actix_web::test]
async fn test_admin_delete_restriction() {
    let (store, state) = sample_state();
    let app = init_app!(state);
    let (owner_block, reserved) = {
        let data = store.data.lock().unwrap();
        let find = |with_reservation: bool| {
            data.restrictions
                .iter()
                .find(|r| r.room_id == 1 && r.reservation_id.is_some() == with_reservation)
                .map(|r| r.id)
                .unwrap()
        };
        (find(false), find(true))
    };

    let mut cookie = None;
    let res = call!(
        app,
        test::TestRequest::post().uri(&format!("/admin/delete-restriction/{}", owner_block)),
        &mut cookie,
    );
    assert_eq!(res.status(), http::StatusCode::FORBIDDEN);

    login!(app, sample_data::ADMIN_EMAIL, &mut cookie);
    let res = call!(
        app,
        test::TestRequest::post().uri(&format!("/admin/delete-restriction/{}", reserved)),
        &mut cookie,
    );
    assert_eq!(res.status(), http::StatusCode::NOT_FOUND);
    let res = call!(
        app,
        test::TestRequest::post().uri(&format!("/admin/delete-restriction/{}", owner_block)),
        &mut cookie,
    );
    assert_eq!(res.status(), http::StatusCode::NO_CONTENT);
    {
        let data = store.data.lock().unwrap();
        assert!(data.restrictions.iter().all(|r| r.id != owner_block));
        assert!(data.restrictions.iter().any(|r| r.id == reserved));
    }

    // The room is free beyond the former block now
    let res = call!(
        app,
        test::TestRequest::post()
            .uri("/search-availability-json")
            .set_form([
                ("start", "2031-03-01"),
                ("end", "2031-03-03"),
                ("room_id", "1"),
            ]),
        &mut cookie,
    );
    let result: leafsite_api_types::AvailabilityResponse = test::read_body_json(res).await;
    assert!(result.ok);
}
