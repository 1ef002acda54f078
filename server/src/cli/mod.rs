//! Maintenance commands of the command line interface, besides serving the web application

pub mod database_migration;
pub mod manage_reservations;
pub mod manage_users;
mod util;
