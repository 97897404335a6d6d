// Transport traits for the live data feed
use async_trait::async_trait;
use serde_json::Value;

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("connect to {url} failed: {reason}")]
    Connect { url: String, reason: String },
    #[error("transport read failed: {0}")]
    Read(String),
    #[error("transport write failed: {0}")]
    Write(String),
}

/// Opens live sessions. One call is one connection attempt.
#[async_trait]
pub trait LiveTransport: Send + Sync {
    async fn connect(&self) -> Result<Box<dyn LiveSession>, TransportError>;
}

/// An open live connection.
#[async_trait]
pub trait LiveSession: Send {
    /// Next text frame. `None` means the peer went away.
    async fn next_frame(&mut self) -> Option<Result<String, TransportError>>;

    /// Send a named event with a JSON payload.
    async fn emit(&mut self, event: &str, payload: Value) -> Result<(), TransportError>;

    async fn close(&mut self);
}
