// Client configuration - file plus environment layering
use crate::application::connection_manager::ManagerSettings;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::time::Duration;

pub const CONFIG_FILE: &str = "config/client";
pub const ENV_PREFIX: &str = "CARE_MONITOR";
pub const GEMINI_PLACEHOLDER_KEY: &str = "YOUR_GEMINI_API_KEY";

#[derive(Debug, Deserialize, Clone, Default)]
pub struct ClientConfig {
    #[serde(default)]
    pub server: ServerSettings,
    #[serde(default)]
    pub connection: ConnectionSettings,
    #[serde(default)]
    pub synthetic: SyntheticSettings,
    #[serde(default)]
    pub patients: PatientSettings,
    #[serde(default)]
    pub providers: ProviderSettings,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerSettings {
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self { bind: default_bind() }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct ConnectionSettings {
    #[serde(default = "default_url")]
    pub url: String,
    #[serde(default = "default_max_reconnect_attempts")]
    pub max_reconnect_attempts: u32,
    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,
    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,
}

impl Default for ConnectionSettings {
    fn default() -> Self {
        Self {
            url: default_url(),
            max_reconnect_attempts: default_max_reconnect_attempts(),
            base_delay_ms: default_base_delay_ms(),
            connect_timeout_ms: default_connect_timeout_ms(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct SyntheticSettings {
    #[serde(default = "default_synthetic_interval_ms")]
    pub interval_ms: u64,
}

impl Default for SyntheticSettings {
    fn default() -> Self {
        Self {
            interval_ms: default_synthetic_interval_ms(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct PatientSettings {
    #[serde(default = "default_patient_interval_ms")]
    pub interval_ms: u64,
}

impl Default for PatientSettings {
    fn default() -> Self {
        Self {
            interval_ms: default_patient_interval_ms(),
        }
    }
}

/// Credential and endpoint bundles. Only `gemini` is called at runtime.
#[derive(Debug, Deserialize, Clone, Default)]
pub struct ProviderSettings {
    #[serde(default)]
    pub football_data: EndpointBundle,
    #[serde(default)]
    pub odds_api: EndpointBundle,
    #[serde(default)]
    pub gemini: GeminiSettings,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct EndpointBundle {
    #[serde(default)]
    pub base_url: String,
    #[serde(default)]
    pub api_key: String,
    #[serde(default)]
    pub endpoints: BTreeMap<String, String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct GeminiSettings {
    #[serde(default = "default_gemini_base_url")]
    pub base_url: String,
    #[serde(default = "default_gemini_key")]
    pub api_key: String,
    #[serde(default = "default_gemini_model")]
    pub model: String,
    #[serde(default = "default_rate_limit_ms")]
    pub rate_limit_ms: u64,
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

impl Default for GeminiSettings {
    fn default() -> Self {
        Self {
            base_url: default_gemini_base_url(),
            api_key: default_gemini_key(),
            model: default_gemini_model(),
            rate_limit_ms: default_rate_limit_ms(),
            timeout_ms: default_timeout_ms(),
        }
    }
}

impl GeminiSettings {
    /// A blank key or the shipped placeholder means "use the fallback".
    pub fn is_configured(&self) -> bool {
        let key = self.api_key.trim();
        !key.is_empty() && key != GEMINI_PLACEHOLDER_KEY
    }

    pub fn rate_limit(&self) -> Duration {
        Duration::from_millis(self.rate_limit_ms)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl ConnectionSettings {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }
}

impl ClientConfig {
    pub fn manager_settings(&self) -> ManagerSettings {
        ManagerSettings {
            max_reconnect_attempts: self.connection.max_reconnect_attempts,
            base_delay: Duration::from_millis(self.connection.base_delay_ms),
            synthetic_period: Duration::from_millis(self.synthetic.interval_ms),
        }
    }

    pub fn patient_period(&self) -> Duration {
        Duration::from_millis(self.patients.interval_ms)
    }
}

fn default_bind() -> String {
    "0.0.0.0:8080".to_string()
}

fn default_url() -> String {
    "ws://localhost:5001/ws".to_string()
}

fn default_max_reconnect_attempts() -> u32 {
    5
}

fn default_base_delay_ms() -> u64 {
    1000
}

fn default_connect_timeout_ms() -> u64 {
    5000
}

fn default_synthetic_interval_ms() -> u64 {
    3000
}

fn default_patient_interval_ms() -> u64 {
    5000
}

fn default_gemini_base_url() -> String {
    "https://generativelanguage.googleapis.com/v1beta".to_string()
}

fn default_gemini_key() -> String {
    GEMINI_PLACEHOLDER_KEY.to_string()
}

fn default_gemini_model() -> String {
    "gemini-1.5-flash".to_string()
}

fn default_rate_limit_ms() -> u64 {
    1000
}

fn default_timeout_ms() -> u64 {
    10_000
}

fn environment() -> config::Environment {
    config::Environment::with_prefix(ENV_PREFIX).separator("__")
}

pub fn load_client_config() -> anyhow::Result<ClientConfig> {
    let settings = config::Config::builder()
        .add_source(config::File::with_name(CONFIG_FILE))
        .add_source(environment())
        .build()?;

    Ok(settings.try_deserialize()?)
}

/// Same layering as `load_client_config`, with the file contents given inline.
pub fn parse_client_config(toml: &str) -> anyhow::Result<ClientConfig> {
    let settings = config::Config::builder()
        .add_source(config::File::from_str(toml, config::FileFormat::Toml))
        .add_source(environment())
        .build()?;

    Ok(settings.try_deserialize()?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_file_keeps_defaults() {
        let config = parse_client_config(
            r#"
            [connection]
            url = "ws://monitor.local:7000/ws"
            "#,
        )
        .unwrap();

        assert_eq!(config.connection.url, "ws://monitor.local:7000/ws");
        assert_eq!(config.connection.max_reconnect_attempts, 5);
        assert_eq!(config.connection.connect_timeout(), Duration::from_millis(5000));
        assert_eq!(config.server.bind, "0.0.0.0:8080");

        let settings = config.manager_settings();
        assert_eq!(settings.base_delay, Duration::from_millis(1000));
        assert_eq!(settings.synthetic_period, Duration::from_millis(3000));
        assert_eq!(config.patient_period(), Duration::from_millis(5000));
        assert_eq!(config.providers.gemini.timeout(), Duration::from_millis(10_000));
    }

    #[test]
    fn test_provider_bundles() {
        let config = parse_client_config(
            r#"
            [providers.football_data]
            base_url = "https://api.football-data.org/v4"
            api_key = "YOUR_FOOTBALL_DATA_API_KEY"

            [providers.football_data.endpoints]
            live_matches = "/matches?status=LIVE"

            [providers.gemini]
            api_key = "abc123"
            rate_limit_ms = 250
            "#,
        )
        .unwrap();

        let football = &config.providers.football_data;
        assert_eq!(football.endpoints["live_matches"], "/matches?status=LIVE");
        assert!(config.providers.odds_api.base_url.is_empty());

        let gemini = &config.providers.gemini;
        assert!(gemini.is_configured());
        assert_eq!(gemini.model, "gemini-1.5-flash");
        assert_eq!(gemini.rate_limit(), Duration::from_millis(250));
    }

    #[test]
    fn test_placeholder_key_is_not_configured() {
        let mut gemini = GeminiSettings::default();
        assert!(!gemini.is_configured());
        gemini.api_key = "  ".to_string();
        assert!(!gemini.is_configured());
        gemini.api_key = "real-key".to_string();
        assert!(gemini.is_configured());
    }
}
