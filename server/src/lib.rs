mod auth;
pub mod booking;
pub mod cli;
pub mod cli_error;
mod data_store;
mod session;
mod setup;
pub mod web;
