// Connection domain model - mode flag and linear reconnect back-off
use serde::Serialize;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConnectionMode {
    Connecting,
    Live,
    Synthetic,
    Failed,
}

impl ConnectionMode {
    /// Whether the synthetic generator should be running in this mode.
    pub fn wants_synthetic(&self) -> bool {
        !matches!(self, ConnectionMode::Live)
    }
}

/// What the status badge shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StatusIndicator {
    Connecting,
    Connected,
    Disconnected,
    Error,
    Failed,
}

impl StatusIndicator {
    pub fn label(&self) -> &'static str {
        match self {
            StatusIndicator::Connecting => "Connecting...",
            StatusIndicator::Connected => "Connected",
            StatusIndicator::Disconnected => "Disconnected",
            StatusIndicator::Error => "Connection Error",
            StatusIndicator::Failed => "Connection Failed",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConnectionStatus {
    pub mode: ConnectionMode,
    pub indicator: StatusIndicator,
    pub label: &'static str,
    pub reconnect_attempts: u32,
    pub max_reconnect_attempts: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconnectDecision {
    /// Wait `delay`, then make reconnect attempt number `attempt`.
    Retry { attempt: u32, delay: Duration },
    /// Attempts used up; mode is now `Failed`.
    Exhausted,
}

#[derive(Debug, Clone)]
pub struct ConnectionState {
    mode: ConnectionMode,
    reconnect_attempts: u32,
    max_reconnect_attempts: u32,
    base_delay: Duration,
}

impl ConnectionState {
    pub fn new(max_reconnect_attempts: u32, base_delay: Duration) -> Self {
        Self {
            mode: ConnectionMode::Connecting,
            reconnect_attempts: 0,
            max_reconnect_attempts,
            base_delay,
        }
    }

    pub fn mode(&self) -> ConnectionMode {
        self.mode
    }

    pub fn reconnect_attempts(&self) -> u32 {
        self.reconnect_attempts
    }

    pub fn max_reconnect_attempts(&self) -> u32 {
        self.max_reconnect_attempts
    }

    pub fn connected(&mut self) {
        self.reconnect_attempts = 0;
        self.mode = ConnectionMode::Live;
    }

    /// Connect failure or drop. Leaves `Failed` only through an explicit retry.
    pub fn lost(&mut self) {
        if self.mode != ConnectionMode::Failed {
            self.mode = ConnectionMode::Synthetic;
        }
    }

    /// Explicit external retry: clears the attempt budget and leaves `Failed`.
    pub fn rearm(&mut self) {
        self.reconnect_attempts = 0;
        if self.mode == ConnectionMode::Failed {
            self.mode = ConnectionMode::Synthetic;
        }
    }

    pub fn next_reconnect(&mut self) -> ReconnectDecision {
        if self.reconnect_attempts < self.max_reconnect_attempts {
            self.reconnect_attempts += 1;
            ReconnectDecision::Retry {
                attempt: self.reconnect_attempts,
                delay: self.delay_for_attempt(self.reconnect_attempts),
            }
        } else {
            self.mode = ConnectionMode::Failed;
            ReconnectDecision::Exhausted
        }
    }

    /// Linear back-off: `base_delay * attempt`.
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        self.base_delay * attempt
    }

    pub fn status(&self, indicator: StatusIndicator) -> ConnectionStatus {
        ConnectionStatus {
            mode: self.mode,
            indicator,
            label: indicator.label(),
            reconnect_attempts: self.reconnect_attempts,
            max_reconnect_attempts: self.max_reconnect_attempts,
        }
    }
}
