// Application layer - Use cases and service orchestration
pub mod commentary_service;
pub mod connection_manager;
pub mod dashboard_service;
pub mod live_transport;
pub mod patient_monitor;
pub mod scheduler;
pub mod synthetic_feed;
pub mod text_generator;
