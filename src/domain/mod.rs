// Domain layer - Core models with no I/O
pub mod commentary;
pub mod connection;
pub mod dashboard;
pub mod message;
pub mod patient;
pub mod telemetry;
