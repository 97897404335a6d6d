// Text generation trait for the external language model
use async_trait::async_trait;

#[derive(Debug, thiserror::Error)]
pub enum GenerationError {
    #[error("generation request failed: {0}")]
    Request(String),
    #[error("generation API returned {status}: {body}")]
    Status { status: u16, body: String },
    #[error("generation response was malformed: {0}")]
    Malformed(String),
    #[error("generation timed out after {0:?}")]
    Timeout(std::time::Duration),
}

#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Free text back for a prompt; callers dig any JSON out themselves.
    async fn generate(&self, prompt: &str) -> Result<String, GenerationError>;
}
