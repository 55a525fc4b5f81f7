pub mod auth;
pub mod checkin;
pub mod config;
pub mod db;
pub mod error;
pub mod extractor;
pub mod keystore;
pub mod models;
pub mod notify;
pub mod routes;
pub mod state;

mod activities_api;
mod events_api;
mod health;
mod keys_api;
mod participants_api;
mod qr_api;

pub use routes::{api_routes, app};
pub use state::AppServices;
