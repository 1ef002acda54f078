//! Password hashing and login of [User]s
//!
//! Passwords are stored as PBKDF2-HMAC-SHA256 hashes in the format
//! `pbkdf2-sha256$<iterations>$<base64 salt>$<base64 hash>`.

use crate::data_store::models::User;
use crate::data_store::{ReservationStoreFacade, StoreError};
use base64::engine::general_purpose::STANDARD_NO_PAD;
use base64::Engine;
use ring::rand::{SecureRandom, SystemRandom};
use ring::{digest, pbkdf2};
use std::fmt::{Display, Formatter};
use std::num::NonZeroU32;

static PBKDF2_ALGORITHM: pbkdf2::Algorithm = pbkdf2::PBKDF2_HMAC_SHA256;
const HASH_SCHEME: &str = "pbkdf2-sha256";
const HASH_LENGTH: usize = digest::SHA256_OUTPUT_LEN;
const SALT_LENGTH: usize = 16;
const ITERATIONS: u32 = 100_000;

#[derive(Debug)]
pub enum AuthError {
    /// Unknown email address or wrong password
    InvalidCredentials,
    RandomGenerationFailed,
    StoreError(StoreError),
}

impl Display for AuthError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidCredentials => f.write_str("Invalid login credentials"),
            Self::RandomGenerationFailed => f.write_str("Could not generate random salt"),
            Self::StoreError(e) => write!(f, "{}", e),
        }
    }
}

impl std::error::Error for AuthError {}

pub fn hash_password(password: &str) -> Result<String, AuthError> {
    let mut salt = [0u8; SALT_LENGTH];
    SystemRandom::new()
        .fill(&mut salt)
        .map_err(|_| AuthError::RandomGenerationFailed)?;
    let iterations = NonZeroU32::new(ITERATIONS).unwrap_or(NonZeroU32::MIN);
    let mut hash = [0u8; HASH_LENGTH];
    pbkdf2::derive(
        PBKDF2_ALGORITHM,
        iterations,
        &salt,
        password.as_bytes(),
        &mut hash,
    );
    Ok(format!(
        "{}${}${}${}",
        HASH_SCHEME,
        ITERATIONS,
        STANDARD_NO_PAD.encode(salt),
        STANDARD_NO_PAD.encode(hash)
    ))
}

/// Check the password against a hash created by [hash_password]. Malformed hashes never match.
pub fn verify_password(password: &str, password_hash: &str) -> bool {
    let mut parts = password_hash.split('$');
    let (Some(HASH_SCHEME), Some(iterations), Some(salt), Some(hash), None) = (
        parts.next(),
        parts.next(),
        parts.next(),
        parts.next(),
        parts.next(),
    ) else {
        return false;
    };
    let Some(iterations) = iterations.parse().ok().and_then(NonZeroU32::new) else {
        return false;
    };
    let (Ok(salt), Ok(hash)) = (STANDARD_NO_PAD.decode(salt), STANDARD_NO_PAD.decode(hash)) else {
        return false;
    };
    pbkdf2::verify(
        PBKDF2_ALGORITHM,
        iterations,
        &salt,
        password.as_bytes(),
        &hash,
    )
    .is_ok()
}

/// Look up the user by email address and check the password.
pub fn authenticate(
    store: &mut dyn ReservationStoreFacade,
    email: &str,
    password: &str,
) -> Result<User, AuthError> {
    let user = store.get_user_by_email(email).map_err(|e| match e {
        StoreError::NotExisting => AuthError::InvalidCredentials,
        e => AuthError::StoreError(e),
    })?;
    if verify_password(password, &user.password) {
        Ok(user)
    } else {
        Err(AuthError::InvalidCredentials)
    }
}
