// Presentation layer - HTTP surface over the dashboard and connection manager
pub mod app_state;
pub mod handlers;
