use crate::cli::database_migration::check_migration_state;
use crate::cli_error::CliError;
use crate::data_store::{get_store_from_env, ReservationStore};
use crate::session::{signing_key, MemorySessionStore, SessionStore};
use crate::setup::{
    get_in_production_from_env, get_listen_address_from_env, get_listen_port_from_env,
    get_secret_from_env, get_session_lifetime_from_env,
};
use actix_web::{middleware, web, App, HttpServer};
use log::info;
use std::sync::Arc;

mod api;
mod http_error_logging;
pub mod session_middleware;

pub fn serve() -> Result<(), CliError> {
    check_migration_state()?;
    let state = AppState::new()?;
    let listen_address = get_listen_address_from_env()?;
    let listen_port = get_listen_port_from_env()?;
    info!("Starting web server at {}:{}", listen_address, listen_port);
    actix_web::rt::System::new()
        .block_on(
            HttpServer::new(move || {
                App::new()
                    .configure(api::configure_app)
                    .app_data(web::Data::new(state.clone()))
                    .wrap(middleware::from_fn(session_middleware::session_middleware))
                    .wrap(middleware::from_fn(
                        http_error_logging::error_logging_middleware,
                    ))
                    .wrap(middleware::Compress::default())
            })
            .bind((listen_address.as_str(), listen_port))
            .map_err(|error| CliError::Listen {
                address: format!("{}:{}", listen_address, listen_port),
                error,
            })?
            .run(),
        )
        .map_err(CliError::Server)
}

#[derive(Clone)]
pub struct SessionConfig {
    /// Key for signing the session cookies, derived from the application secret
    key: ring::hmac::Key,
    lifetime: chrono::Duration,
    /// Only send the session cookie via https
    secure: bool,
}

#[derive(Clone)]
pub struct AppState {
    store: Arc<dyn ReservationStore>,
    sessions: Arc<dyn SessionStore>,
    session_config: SessionConfig,
}

impl AppState {
    pub fn new() -> Result<Self, CliError> {
        let lifetime = get_session_lifetime_from_env()?;
        Ok(Self {
            store: Arc::new(get_store_from_env()?),
            sessions: Arc::new(MemorySessionStore::new(lifetime)),
            session_config: SessionConfig {
                key: signing_key(&get_secret_from_env()?),
                lifetime,
                secure: get_in_production_from_env()?,
            },
        })
    }

    #[cfg(test)]
    pub fn for_testing(store: Arc<crate::data_store::store_mock::StoreMock>) -> Self {
        let lifetime = chrono::Duration::hours(24);
        Self {
            store,
            sessions: Arc::new(MemorySessionStore::new(lifetime)),
            session_config: SessionConfig {
                key: signing_key("test secret"),
                lifetime,
                secure: false,
            },
        }
    }
}
