// Commentary service - external generation with rate limiting, timeout and local fallback
use crate::application::text_generator::{GenerationError, TextGenerator};
use crate::domain::commentary::{
    commentary_prompt, fallback_stats, parse_commentary_response, parse_stats_response,
    stats_prompt, synthesize, Commentary, GameContext, KeyStats,
};
use chrono::Utc;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::Instant;

#[derive(Clone)]
pub struct CommentaryService {
    generator: Option<Arc<dyn TextGenerator>>,
    rate_limit: Duration,
    timeout: Duration,
    last_request: Arc<Mutex<Option<Instant>>>,
}

impl CommentaryService {
    pub fn new(generator: Option<Arc<dyn TextGenerator>>, rate_limit: Duration, timeout: Duration) -> Self {
        if generator.is_some() {
            tracing::info!("Text generation enabled");
        } else {
            tracing::info!("Text generation key not configured, using fallback commentary");
        }
        Self {
            generator,
            rate_limit,
            timeout,
            last_request: Arc::new(Mutex::new(None)),
        }
    }

    pub fn fallback_only() -> Self {
        Self::new(None, Duration::ZERO, Duration::ZERO)
    }

    pub async fn generate_commentary(&self, context: &GameContext, event_type: Option<&str>) -> Commentary {
        let Some(generator) = self.generator.clone() else {
            return synthesize(context, event_type, Utc::now());
        };

        let now = Instant::now();
        if self.rate_limited(now) {
            tracing::debug!("Commentary request rate limited, using fallback");
            return synthesize(context, event_type, Utc::now());
        }

        match self.call(generator.as_ref(), &commentary_prompt(context, event_type)).await {
            Ok(text) => {
                self.mark_request(now);
                parse_commentary_response(&text, Utc::now())
            }
            Err(e) => {
                tracing::warn!("Commentary generation failed: {}", e);
                synthesize(context, event_type, Utc::now())
            }
        }
    }

    pub async fn generate_key_stats(&self, context: &GameContext) -> KeyStats {
        let Some(generator) = self.generator.clone() else {
            return fallback_stats(context, Utc::now());
        };

        match self.call(generator.as_ref(), &stats_prompt(context)).await {
            Ok(text) => parse_stats_response(&text, context, Utc::now()),
            Err(e) => {
                tracing::warn!("Key stats generation failed: {}", e);
                fallback_stats(context, Utc::now())
            }
        }
    }

    async fn call(&self, generator: &dyn TextGenerator, prompt: &str) -> Result<String, GenerationError> {
        tokio::time::timeout(self.timeout, generator.generate(prompt))
            .await
            .map_err(|_| GenerationError::Timeout(self.timeout))?
    }

    fn rate_limited(&self, now: Instant) -> bool {
        match *self.last_request.lock().unwrap_or_else(|e| e.into_inner()) {
            Some(last) => now.duration_since(last) < self.rate_limit,
            None => false,
        }
    }

    fn mark_request(&self, at: Instant) {
        *self.last_request.lock().unwrap_or_else(|e| e.into_inner()) = Some(at);
    }
}
