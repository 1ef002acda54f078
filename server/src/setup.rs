use std::env;
use std::env::VarError;
use std::fmt::{Display, Formatter};

const DEFAULT_SESSION_LIFETIME_HOURS: i64 = 24;

/// Get the database URL from the environment variable.
pub fn get_database_url_from_env() -> Result<String, SetupError> {
    env::var("DATABASE_URL").map_err(|e| SetupError::from_env_error(e, "DATABASE_URL"))
}

/// Get the cryptographic application secret for signing the session cookies from the environment
/// variable.
pub fn get_secret_from_env() -> Result<String, SetupError> {
    env::var("SECRET").map_err(|e| SetupError::from_env_error(e, "SECRET"))
}

/// Get the web server TCP listening port from the environment variable
pub fn get_listen_port_from_env() -> Result<u16, SetupError> {
    env::var("LISTEN_PORT")
        .map_err(|e| SetupError::from_env_error(e, "LISTEN_PORT"))
        .and_then(|v| {
            v.parse().map_err(|_| SetupError::EnvVariableInvalid {
                variable_name: "LISTEN_PORT",
                problem: "Not a valid uint16",
            })
        })
}

/// Get the web server TCP listening interface address from the environment variable
pub fn get_listen_address_from_env() -> Result<String, SetupError> {
    env::var("LISTEN_ADDRESS").map_err(|e| SetupError::from_env_error(e, "LISTEN_ADDRESS"))
}

/// Check if the application runs in production (behind https), i.e. session cookies must be
/// marked as `Secure`. Defaults to false.
pub fn get_in_production_from_env() -> Result<bool, SetupError> {
    match env::var("IN_PRODUCTION") {
        Ok(v) => match v.trim().to_lowercase().as_str() {
            "true" | "1" | "yes" => Ok(true),
            "false" | "0" | "no" | "" => Ok(false),
            _ => Err(SetupError::EnvVariableInvalid {
                variable_name: "IN_PRODUCTION",
                problem: "Must be 'true' or 'false'",
            }),
        },
        Err(VarError::NotPresent) => Ok(false),
        Err(e) => Err(SetupError::from_env_error(e, "IN_PRODUCTION")),
    }
}

/// Get the lifetime of idle sessions from the environment variable (in hours, default: 24)
pub fn get_session_lifetime_from_env() -> Result<chrono::Duration, SetupError> {
    let hours = match env::var("SESSION_LIFETIME_HOURS") {
        Ok(v) => v
            .trim()
            .parse::<i64>()
            .ok()
            .filter(|h| *h > 0 && *h <= 24 * 365)
            .ok_or(SetupError::EnvVariableInvalid {
                variable_name: "SESSION_LIFETIME_HOURS",
                problem: "Not a positive number of hours (at most one year)",
            })?,
        Err(VarError::NotPresent) => DEFAULT_SESSION_LIFETIME_HOURS,
        Err(e) => return Err(SetupError::from_env_error(e, "SESSION_LIFETIME_HOURS")),
    };
    Ok(chrono::Duration::hours(hours))
}

#[derive(Debug)]
pub enum SetupError {
    EnvVariableMissing {
        variable_name: &'static str,
    },
    EnvVariableInvalid {
        variable_name: &'static str,
        problem: &'static str,
    },
}

impl SetupError {
    fn from_env_error(error: VarError, variable_name: &'static str) -> Self {
        match error {
            VarError::NotPresent => Self::EnvVariableMissing { variable_name },
            VarError::NotUnicode(_) => Self::EnvVariableInvalid {
                variable_name,
                problem: "no valid unicode",
            },
        }
    }
}

impl Display for SetupError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            SetupError::EnvVariableMissing { variable_name } => {
                write!(f, "Environment variable {} must be defined", variable_name)
            }
            SetupError::EnvVariableInvalid {
                variable_name,
                problem,
            } => write!(
                f,
                "Value of environment variable {} is invalid: {}",
                variable_name, problem
            ),
        }
    }
}
