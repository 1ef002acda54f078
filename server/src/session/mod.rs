//! Server-side per-client session state.
//!
//! Clients are identified by a random session id, which is handed out in a cookie, signed with the
//! application secret (see [SessionId::to_cookie_value]). The session data itself never leaves the
//! server. It is kept in a [SessionStore] with a limited lifetime, which is renewed on every
//! access.

use crate::booking::calendar::{CalendarMaps, CalendarMonth};
use crate::booking::workflow::BookingSession;
use crate::data_store::{RoomId, UserId};
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::{DateTime, Utc};
use log::debug;
use ring::hmac;
use ring::rand::{SecureRandom, SystemRandom};
use std::collections::{BTreeMap, HashMap};
use std::fmt::{Display, Formatter};
use std::sync::Mutex;

const SESSION_ID_BYTES: usize = 16;

/// Typed session contents of one client
#[derive(Clone, Debug, Default)]
pub struct SessionData {
    /// The reservation draft of the public booking flow
    pub booking: BookingSession,
    /// Calendar maps of the admin calendar month most recently shown, per room
    calendar: BTreeMap<RoomId, CalendarMaps>,
    /// The logged-in user, if any
    pub user_id: Option<UserId>,
}

impl SessionData {
    /// Get the cached calendar maps of the room, if they have been cached for the given month.
    pub fn calendar_maps(&self, room_id: RoomId, month: CalendarMonth) -> Option<&CalendarMaps> {
        self.calendar
            .get(&room_id)
            .filter(|maps| maps.month == month)
    }

    pub fn put_calendar_maps(&mut self, room_id: RoomId, maps: CalendarMaps) {
        self.calendar.insert(room_id, maps);
    }

    pub fn remove_calendar_maps(&mut self, room_id: RoomId) {
        self.calendar.remove(&room_id);
    }

    pub fn clear_calendar_maps(&mut self) {
        self.calendar.clear();
    }
}

/// Random identifier of a session, as base64url string
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct SessionId(String);

impl SessionId {
    pub fn generate() -> Result<Self, SessionError> {
        let mut bytes = [0u8; SESSION_ID_BYTES];
        SystemRandom::new()
            .fill(&mut bytes)
            .map_err(|_| SessionError::RandomGenerationFailed)?;
        Ok(Self(URL_SAFE_NO_PAD.encode(bytes)))
    }

    /// Parse and verify a session cookie value of the form `<id>.<signature>`.
    pub fn from_cookie_value(value: &str, key: &hmac::Key) -> Result<Self, SessionError> {
        let (id, signature) = value.split_once('.').ok_or(SessionError::InvalidFormat)?;
        let id_bytes = URL_SAFE_NO_PAD
            .decode(id)
            .map_err(|_| SessionError::InvalidFormat)?;
        if id_bytes.len() != SESSION_ID_BYTES {
            return Err(SessionError::InvalidFormat);
        }
        let signature = URL_SAFE_NO_PAD
            .decode(signature)
            .map_err(|_| SessionError::InvalidFormat)?;
        hmac::verify(key, id.as_bytes(), &signature)
            .map_err(|_| SessionError::SignatureVerificationFailed)?;
        Ok(Self(id.to_owned()))
    }

    pub fn to_cookie_value(&self, key: &hmac::Key) -> String {
        let signature = hmac::sign(key, self.0.as_bytes());
        format!("{}.{}", self.0, URL_SAFE_NO_PAD.encode(signature.as_ref()))
    }
}

/// Derive the key for signing session cookies from the application secret
pub fn signing_key(secret: &str) -> hmac::Key {
    hmac::Key::new(hmac::HMAC_SHA256, secret.as_bytes())
}

#[derive(Debug, PartialEq)]
pub enum SessionError {
    InvalidFormat,
    SignatureVerificationFailed,
    RandomGenerationFailed,
}

impl Display for SessionError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidFormat => f.write_str("Session cookie has an invalid format"),
            Self::SignatureVerificationFailed => {
                f.write_str("Session cookie signature is invalid")
            }
            Self::RandomGenerationFailed => f.write_str("Could not generate random session id"),
        }
    }
}

impl std::error::Error for SessionError {}

pub trait SessionStore: Send + Sync {
    /// Get the session data and renew the session's lifetime. Returns `None` for unknown or
    /// expired sessions.
    fn load(&self, id: &SessionId) -> Option<SessionData>;
    /// Store the session data, (re)starting the session's lifetime
    fn save(&self, id: &SessionId, data: SessionData);
    fn destroy(&self, id: &SessionId);
}

struct StoredSession {
    expires: DateTime<Utc>,
    data: SessionData,
}

/// Process-local [SessionStore]. Sessions are lost on restart.
pub struct MemorySessionStore {
    lifetime: chrono::Duration,
    sessions: Mutex<HashMap<SessionId, StoredSession>>,
}

impl MemorySessionStore {
    pub fn new(lifetime: chrono::Duration) -> Self {
        Self {
            lifetime,
            sessions: Mutex::new(HashMap::new()),
        }
    }

    fn sessions(&self) -> std::sync::MutexGuard<'_, HashMap<SessionId, StoredSession>> {
        // Session data is replaced as a whole, so it is consistent even after a panic
        self.sessions.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn load_at(&self, id: &SessionId, now: DateTime<Utc>) -> Option<SessionData> {
        let mut sessions = self.sessions();
        match sessions.get_mut(id) {
            Some(session) if session.expires > now => {
                session.expires = now + self.lifetime;
                Some(session.data.clone())
            }
            Some(_) => {
                debug!("Session has expired");
                sessions.remove(id);
                None
            }
            None => None,
        }
    }

    fn save_at(&self, id: &SessionId, data: SessionData, now: DateTime<Utc>) {
        let mut sessions = self.sessions();
        sessions.retain(|_, session| session.expires > now);
        sessions.insert(
            id.clone(),
            StoredSession {
                expires: now + self.lifetime,
                data,
            },
        );
    }
}

impl SessionStore for MemorySessionStore {
    fn load(&self, id: &SessionId) -> Option<SessionData> {
        self.load_at(id, Utc::now())
    }

    fn save(&self, id: &SessionId, data: SessionData) {
        self.save_at(id, data, Utc::now())
    }

    fn destroy(&self, id: &SessionId) {
        self.sessions().remove(id);
    }
}
