// Presentation layer - HTTP surface over the device views
pub mod app_state;
pub mod error;
pub mod handlers;
pub mod routes;
