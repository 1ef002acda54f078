use crate::session::{SessionData, SessionId};
use crate::web::AppState;
use actix_web::cookie::{Cookie, SameSite};
use actix_web::http::header::{HeaderValue, SET_COOKIE};
use actix_web::{web, HttpMessage, HttpRequest};
use log::debug;

pub const COOKIE_NAME: &str = "session";

struct SessionContext {
    id: Option<SessionId>,
    data: SessionData,
    dirty: bool,
    renew: bool,
    destroy: bool,
}

/// Access to the client's session data from within request handlers.
///
/// Handlers work on a copy of the session data (see [SessionInterface::session_data]) and hand
/// back the modified copy via [SessionInterface::set_session_data]. The session is stored and the
/// cookie is set by [session_middleware] after the handler has finished.
pub trait SessionInterface {
    fn session_data(&self) -> SessionData;

    fn set_session_data(&self, data: SessionData);

    /// Continue the session under a fresh session id, e.g. after a login
    fn renew_session(&self);

    /// Drop the session and all its data
    fn destroy_session(&self);
}

impl SessionInterface for HttpRequest {
    fn session_data(&self) -> SessionData {
        self.extensions()
            .get::<SessionContext>()
            .map(|context| context.data.clone())
            .unwrap_or_default()
    }

    fn set_session_data(&self, data: SessionData) {
        if let Some(context) = self.extensions_mut().get_mut::<SessionContext>() {
            context.data = data;
            context.dirty = true;
        }
    }

    fn renew_session(&self) {
        if let Some(context) = self.extensions_mut().get_mut::<SessionContext>() {
            context.renew = true;
        }
    }

    fn destroy_session(&self) {
        if let Some(context) = self.extensions_mut().get_mut::<SessionContext>() {
            context.destroy = true;
        }
    }
}

fn session_cookie(value: String, state: &AppState) -> Cookie<'static> {
    Cookie::build(COOKIE_NAME, value)
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(state.session_config.secure)
        .max_age(actix_web::cookie::time::Duration::seconds(
            state.session_config.lifetime.num_seconds(),
        ))
        .finish()
}

pub async fn session_middleware(
    req: actix_web::dev::ServiceRequest,
    next: actix_web::middleware::Next<impl actix_web::body::MessageBody>,
) -> Result<actix_web::dev::ServiceResponse<impl actix_web::body::MessageBody>, actix_web::Error> {
    let state = req
        .app_data::<web::Data<AppState>>()
        .cloned()
        .ok_or(actix_web::error::ErrorInternalServerError(
            "Application state is missing",
        ))?;

    // Invalid or unknown session cookies are ignored and a fresh session is started
    let loaded = req.cookie(COOKIE_NAME).and_then(|cookie| {
        match SessionId::from_cookie_value(cookie.value(), &state.session_config.key) {
            Ok(id) => state.sessions.load(&id).map(|data| (id, data)),
            Err(e) => {
                debug!("Ignoring session cookie: {}", e);
                None
            }
        }
    });
    let (id, data) = match loaded {
        Some((id, data)) => (Some(id), data),
        None => (None, SessionData::default()),
    };
    req.extensions_mut().insert(SessionContext {
        id,
        data,
        dirty: false,
        renew: false,
        destroy: false,
    });

    let mut response = next.call(req).await?;

    let context = response.request().extensions_mut().remove::<SessionContext>();
    let Some(context) = context else {
        return Ok(response);
    };
    let cookie = if context.destroy {
        if let Some(id) = &context.id {
            state.sessions.destroy(id);
        }
        let mut cookie = session_cookie(String::new(), &state);
        cookie.make_removal();
        Some(cookie)
    } else {
        match (context.id, context.dirty || context.renew) {
            (Some(id), false) => Some(session_cookie(
                id.to_cookie_value(&state.session_config.key),
                &state,
            )),
            (None, false) => None,
            (old_id, true) => {
                let id = match old_id {
                    Some(id) if !context.renew => id,
                    old_id => {
                        if let Some(old_id) = old_id {
                            state.sessions.destroy(&old_id);
                        }
                        SessionId::generate()
                            .map_err(actix_web::error::ErrorInternalServerError)?
                    }
                };
                state.sessions.save(&id, context.data);
                Some(session_cookie(
                    id.to_cookie_value(&state.session_config.key),
                    &state,
                ))
            }
        }
    };
    if let Some(cookie) = cookie {
        let val = HeaderValue::from_str(&cookie.to_string())?;
        response.headers_mut().append(SET_COOKIE, val);
    }
    Ok(response)
}
