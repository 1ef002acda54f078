use crate::auth::hash_password;
use crate::booking::validation::is_valid_email;
use crate::cli::util::{query_user, query_user_and_check, query_user_bool};
use crate::cli_error::CliError;
use crate::data_store::get_store_from_env;
use crate::data_store::models::{AccessLevel, NewUser};
use crate::data_store::{ReservationStore, StoreError};
use std::str::FromStr;

const PASSWORD_MIN_LENGTH: usize = 8;

/// Interactively create a user account for logging in to the admin area
pub fn add_user() -> Result<(), CliError> {
    let data_store_pool = get_store_from_env()?;
    let mut data_store = data_store_pool.get_facade()?;

    let first_name: String = query_user_and_check("First name", |v: &String| {
        if v.is_empty() {
            Err("This field cannot be blank")
        } else {
            Ok(())
        }
    });
    let last_name: String = query_user_and_check("Last name", |v: &String| {
        if v.is_empty() {
            Err("This field cannot be blank")
        } else {
            Ok(())
        }
    });
    let email: String = query_user_and_check("Email address", |v: &String| {
        if is_valid_email(v) {
            Ok(())
        } else {
            Err("Invalid email address")
        }
    });
    match data_store.get_user_by_email(&email) {
        Ok(_) => return Err(CliError::DuplicateUser(email)),
        Err(StoreError::NotExisting) => {}
        Err(e) => return Err(e.into()),
    }
    let access_level = query_user::<AccessLevelEntry>("Access level (staff/admin)").0;
    let password: String = query_user_and_check("Password", |v: &String| {
        if v.chars().count() < PASSWORD_MIN_LENGTH {
            Err(format!(
                "The password must be at least {} characters long",
                PASSWORD_MIN_LENGTH
            ))
        } else {
            Ok(())
        }
    });

    if !query_user_bool(
        &format!("Create {:?} account for {} <{}>?", access_level, first_name, email),
        Some(true),
    ) {
        return Ok(());
    }
    let password =
        hash_password(&password).map_err(|e| CliError::PasswordHashing(e.to_string()))?;
    let user_id = data_store
        .create_user(NewUser {
            first_name,
            last_name,
            email: email.clone(),
            password,
            access_level,
        })
        .map_err(|e| match e {
            StoreError::ConflictEntityExists => CliError::DuplicateUser(email),
            e => e.into(),
        })?;
    println!("Success. New user id: {}", user_id);
    Ok(())
}

struct AccessLevelEntry(AccessLevel);

impl FromStr for AccessLevelEntry {
    type Err = &'static str;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "s" | "staff" => Ok(Self(AccessLevel::Staff)),
            "a" | "admin" | "administrator" => Ok(Self(AccessLevel::Administrator)),
            _ => Err("Unknown access level. Must be 'staff' or 'admin'."),
        }
    }
}
