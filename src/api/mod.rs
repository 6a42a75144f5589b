//! HTTP control surface for the broker gateway

pub mod routes;
pub mod server;

pub use server::{create_app, AppState};
