use std::fmt::Display;

mod endpoints_admin;
mod endpoints_auth;
mod endpoints_booking;
#[cfg(test)]
mod tests;

use crate::booking::validation::ValidationErrors;
use crate::booking::EngineError;
use crate::data_store::models::{AccessLevel, User};
use crate::data_store::{ReservationStoreFacade, StoreError};
use crate::session::SessionData;
use actix_web::http::header::LOCATION;
use actix_web::{
    error::ResponseError,
    http::{header::ContentType, StatusCode},
    web, HttpResponse,
};
use serde_json::json;

/// Start page of the booking flow, where clients without a draft reservation are sent to
pub const BOOKING_START_PATH: &str = "/search-availability";

pub fn configure_app(cfg: &mut web::ServiceConfig) {
    let form_config = web::FormConfig::default()
        .error_handler(|err, _req| APIError::InvalidData(err.to_string()).into());
    let query_config = web::QueryConfig::default()
        .error_handler(|err, _req| APIError::InvalidData(err.to_string()).into());
    cfg.app_data(form_config)
        .app_data(query_config)
        .service(endpoints_booking::list_rooms)
        .service(endpoints_booking::get_room)
        .service(endpoints_booking::search_availability)
        .service(endpoints_booking::search_availability_json)
        .service(endpoints_booking::choose_room)
        .service(endpoints_booking::book_room)
        .service(endpoints_booking::get_draft_reservation)
        .service(endpoints_booking::submit_guest_details)
        .service(endpoints_booking::confirm_reservation)
        .service(endpoints_booking::reservation_summary)
        .service(endpoints_auth::login)
        .service(endpoints_auth::logout)
        .service(get_admin_service());
}

fn get_admin_service() -> actix_web::Scope {
    web::scope("/admin")
        .service(endpoints_admin::list_new_reservations)
        .service(endpoints_admin::list_all_reservations)
        .service(endpoints_admin::get_reservation)
        .service(endpoints_admin::update_reservation)
        .service(endpoints_admin::process_reservation)
        .service(endpoints_admin::delete_reservation)
        .service(endpoints_admin::show_calendar)
        .service(endpoints_admin::submit_calendar)
        .service(endpoints_admin::delete_restriction)
}

#[derive(Debug)]
pub enum APIError {
    NotExisting,
    AlreadyExisting,
    NotLoggedIn,
    PermissionDenied,
    AuthenticationFailed,
    /// The requested step of the booking flow requires a draft reservation
    NoActiveReservation,
    ValidationFailed(ValidationErrors),
    InvalidData(String),
    TransactionConflict,
    InternalError(String),
    /// The request failed after some of its changes have been written
    PartiallyApplied {
        applied: Vec<leafsite_api_types::BlockChanges>,
        cause: Box<APIError>,
    },
}

impl APIError {
    /// Wrap the error with the block changes written before it occurred. Without any written
    /// changes, the error is returned unchanged.
    pub fn partially_applied(
        applied: Vec<leafsite_api_types::BlockChanges>,
        cause: APIError,
    ) -> Self {
        if applied
            .iter()
            .all(|c| c.added.is_empty() && c.removed.is_empty())
        {
            return cause;
        }
        Self::PartiallyApplied {
            applied,
            cause: Box::new(cause),
        }
    }

    /// The underlying error, for errors which wrap another one
    pub fn cause(&self) -> &APIError {
        match self {
            Self::PartiallyApplied { cause, .. } => cause.cause(),
            e => e,
        }
    }
}

impl Display for APIError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotExisting => f.write_str("Element does not exist")?,
            Self::AlreadyExisting => {
                f.write_str("Element conflicts with an existing one. The room may not be available anymore.")?;
            }
            Self::NotLoggedIn => f.write_str("This action requires authentication.")?,
            Self::PermissionDenied => {
                f.write_str("Client is not authorized to perform this action. Authentication as Administrator is required.")?
            }
            Self::AuthenticationFailed => f.write_str("Invalid login credentials")?,
            Self::NoActiveReservation => {
                f.write_str("No reservation in progress. Please search for availability first.")?
            }
            Self::ValidationFailed(e) => write!(f, "Invalid form data: {}", e)?,
            Self::InvalidData(e) => write!(f, "Invalid request data: {}", e)?,
            Self::TransactionConflict => {
                f.write_str("Concurrent database transaction conflict. Please retry request.")?;
            }
            Self::InternalError(s) => {
                f.write_str("Internal error: ")?;
                f.write_str(s)?;
            }
            Self::PartiallyApplied { cause, .. } => {
                write!(f, "{} Some changes have been applied before.", cause)?;
            }
        };
        Ok(())
    }
}

impl ResponseError for APIError {
    fn error_response(&self) -> HttpResponse {
        let message = format!("{}", self);
        let mut response = HttpResponse::build(self.status_code());
        response.insert_header(ContentType::json());
        match self {
            Self::NoActiveReservation => response
                .insert_header((LOCATION, BOOKING_START_PATH))
                .json(json!({
                    "httpCode": self.status_code().as_u16(),
                    "message": message,
                    "location": BOOKING_START_PATH,
                })),
            Self::ValidationFailed(errors) => {
                let errors: leafsite_api_types::FieldErrors = errors.clone().into();
                response.json(json!({
                    "httpCode": self.status_code().as_u16(),
                    "message": "Invalid form data",
                    "errors": errors,
                }))
            }
            Self::PartiallyApplied { applied, .. } => response.json(json!({
                "httpCode": self.status_code().as_u16(),
                "message": message,
                "applied": applied,
            })),
            _ => response.json(json!({
                "httpCode": self.status_code().as_u16(),
                "message": message
            })),
        }
    }
    fn status_code(&self) -> StatusCode {
        match self {
            Self::NotExisting => StatusCode::NOT_FOUND,
            Self::AlreadyExisting => StatusCode::CONFLICT,
            Self::NotLoggedIn => StatusCode::FORBIDDEN,
            Self::PermissionDenied => StatusCode::FORBIDDEN,
            Self::AuthenticationFailed => StatusCode::FORBIDDEN,
            Self::NoActiveReservation => StatusCode::SEE_OTHER,
            Self::ValidationFailed(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::InvalidData(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::TransactionConflict => StatusCode::SERVICE_UNAVAILABLE,
            Self::InternalError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::PartiallyApplied { cause, .. } => cause.status_code(),
        }
    }
}

impl From<StoreError> for APIError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::ConnectionError(error) => {
                Self::InternalError(format!("Could not connect to database: {}", error))
            }
            StoreError::QueryError(diesel_error) => Self::InternalError(format!(
                "Error while executing database query: {}",
                diesel_error
            )),
            StoreError::TransactionConflict => Self::TransactionConflict,
            StoreError::NotExisting => Self::NotExisting,
            StoreError::ConflictEntityExists => Self::AlreadyExisting,
            StoreError::InvalidInputData(e) => Self::InvalidData(e),
            StoreError::InvalidDataInDatabase(e) => Self::InternalError(format!(
                "Data queried from database could not be deserialized: {}",
                e
            )),
        }
    }
}

impl From<EngineError> for APIError {
    fn from(e: EngineError) -> Self {
        match e {
            EngineError::Validation(errors) => Self::ValidationFailed(errors),
            EngineError::QueryError(e) | EngineError::InsertError(e) => e.into(),
            EngineError::NoActiveReservation => Self::NoActiveReservation,
        }
    }
}

impl From<ValidationErrors> for APIError {
    fn from(e: ValidationErrors) -> Self {
        Self::ValidationFailed(e)
    }
}

impl From<actix_web::error::BlockingError> for APIError {
    fn from(_e: actix_web::error::BlockingError) -> Self {
        APIError::InternalError(
            "Could not get thread from thread pool for synchronous database operation.".to_owned(),
        )
    }
}

impl From<crate::auth::AuthError> for APIError {
    fn from(e: crate::auth::AuthError) -> Self {
        match e {
            crate::auth::AuthError::InvalidCredentials => Self::AuthenticationFailed,
            crate::auth::AuthError::StoreError(e) => e.into(),
            e => Self::InternalError(e.to_string()),
        }
    }
}

/// Get the logged-in user of the session and check that they are an administrator.
fn require_administrator(
    store: &mut dyn ReservationStoreFacade,
    session: &SessionData,
) -> Result<User, APIError> {
    let user_id = session.user_id.ok_or(APIError::NotLoggedIn)?;
    let user = store.get_user_by_id(user_id).map_err(|e| match e {
        StoreError::NotExisting => APIError::NotLoggedIn,
        e => e.into(),
    })?;
    if user.access_level < AccessLevel::Administrator {
        return Err(APIError::PermissionDenied);
    }
    Ok(user)
}
