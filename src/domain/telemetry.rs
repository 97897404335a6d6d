// Telemetry data domain models
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Momentum values outside this band count as a trend.
pub const TREND_THRESHOLD: f64 = 10.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Trend {
    Up,
    Down,
    Stable,
}

impl Trend {
    pub fn from_value(value: f64) -> Self {
        if value > TREND_THRESHOLD {
            Trend::Up
        } else if value < -TREND_THRESHOLD {
            Trend::Down
        } else {
            Trend::Stable
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Momentum {
    pub value: f64,
    pub trend: Trend,
    #[serde(default)]
    pub change: f64,
}

impl Momentum {
    pub fn new(value: f64) -> Self {
        Self {
            value,
            trend: Trend::from_value(value),
            change: value,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConfidenceLevel {
    Low,
    Medium,
    High,
}

impl ConfidenceLevel {
    pub fn from_percentage(percentage: u8) -> Self {
        if percentage >= 85 {
            ConfidenceLevel::High
        } else if percentage >= 70 {
            ConfidenceLevel::Medium
        } else {
            ConfidenceLevel::Low
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Confidence {
    pub level: ConfidenceLevel,
    pub percentage: u8,
}

impl Confidence {
    pub fn new(percentage: u8) -> Self {
        let percentage = percentage.min(100);
        Self {
            level: ConfidenceLevel::from_percentage(percentage),
            percentage,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VolatilityLevel {
    Low,
    Medium,
    High,
}

impl VolatilityLevel {
    pub fn from_value(value: f64) -> Self {
        if value < 0.3 {
            VolatilityLevel::Low
        } else if value < 0.7 {
            VolatilityLevel::Medium
        } else {
            VolatilityLevel::High
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            VolatilityLevel::Low => "Stable - Consistent routine patterns",
            VolatilityLevel::Medium => "Variable - Some routine changes detected",
            VolatilityLevel::High => "Unstable - High variance, needs attention",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Volatility {
    pub level: VolatilityLevel,
    pub value: f64,
    #[serde(default)]
    pub description: String,
}

impl Volatility {
    pub fn new(value: f64) -> Self {
        let value = value.clamp(0.0, 1.0);
        let level = VolatilityLevel::from_value(value);
        Self {
            level,
            value,
            description: level.description().to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventEntry {
    pub timestamp: DateTime<Utc>,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Explanation {
    pub title: String,
    pub text: String,
}

/// Commentary category. Anything outside the known set is kept verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Category {
    Care,
    Trend,
    Analysis,
    Prediction,
    Other(String),
}

impl Category {
    pub fn icon(&self) -> &'static str {
        match self {
            Category::Care => "🏥",
            Category::Trend => "📈",
            Category::Analysis => "🔍",
            Category::Prediction => "🔮",
            Category::Other(_) => "🚨",
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Category::Care => "care",
            Category::Trend => "trend",
            Category::Analysis => "analysis",
            Category::Prediction => "prediction",
            Category::Other(name) => name,
        }
    }
}

impl From<String> for Category {
    fn from(value: String) -> Self {
        match value.as_str() {
            "care" => Category::Care,
            "trend" => Category::Trend,
            "analysis" => Category::Analysis,
            "prediction" => Category::Prediction,
            _ => Category::Other(value),
        }
    }
}

impl From<Category> for String {
    fn from(value: Category) -> Self {
        value.as_str().to_string()
    }
}

/// Commentary intensity; unrecognised values read as `Medium`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Intensity {
    Low,
    #[default]
    Medium,
    High,
}

impl Intensity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Intensity::Low => "low",
            Intensity::Medium => "medium",
            Intensity::High => "high",
        }
    }
}

impl From<String> for Intensity {
    fn from(value: String) -> Self {
        match value.as_str() {
            "low" => Intensity::Low,
            "high" => Intensity::High,
            _ => Intensity::Medium,
        }
    }
}

impl From<Intensity> for String {
    fn from(value: Intensity) -> Self {
        value.as_str().to_string()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommentaryItem {
    pub text: String,
    pub category: Category,
    #[serde(default)]
    pub intensity: Intensity,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub patient: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub routine: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ts: Option<DateTime<Utc>>,
}

impl CommentaryItem {
    pub fn new(text: impl Into<String>, category: Category, intensity: Intensity) -> Self {
        Self {
            text: text.into(),
            category,
            intensity,
            patient: None,
            routine: None,
            ts: None,
        }
    }

    pub fn with_subject(mut self, patient: impl Into<String>, routine: impl Into<String>) -> Self {
        self.patient = Some(patient.into());
        self.routine = Some(routine.into());
        self
    }
}

/// One complete set of dashboard metrics, from the live feed or the generator.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TelemetrySnapshot {
    #[serde(default)]
    pub momentum: Option<Momentum>,
    #[serde(default)]
    pub confidence: Option<Confidence>,
    #[serde(default)]
    pub volatility: Option<Volatility>,
    /// `None` leaves the rendered list alone; `Some(vec![])` clears it.
    #[serde(default)]
    pub events: Option<Vec<EventEntry>>,
    #[serde(default)]
    pub explanations: Option<Vec<Explanation>>,
    #[serde(default)]
    pub commentaries: Vec<CommentaryItem>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trend_thresholds() {
        assert_eq!(Trend::from_value(10.5), Trend::Up);
        assert_eq!(Trend::from_value(10.0), Trend::Stable);
        assert_eq!(Trend::from_value(-10.0), Trend::Stable);
        assert_eq!(Trend::from_value(-10.1), Trend::Down);
    }

    #[test]
    fn test_confidence_levels() {
        assert_eq!(Confidence::new(85).level, ConfidenceLevel::High);
        assert_eq!(Confidence::new(70).level, ConfidenceLevel::Medium);
        assert_eq!(Confidence::new(69).level, ConfidenceLevel::Low);
        assert_eq!(Confidence::new(250).percentage, 100);
    }

    #[test]
    fn test_volatility_description_follows_level() {
        let v = Volatility::new(0.75);
        assert_eq!(v.level, VolatilityLevel::High);
        assert_eq!(v.description, "Unstable - High variance, needs attention");
    }

    #[test]
    fn test_unknown_category_keeps_name_and_default_icon() {
        let item: CommentaryItem = serde_json::from_value(serde_json::json!({
            "text": "hello",
            "category": "weather",
            "intensity": "extreme"
        }))
        .unwrap();

        assert_eq!(item.category, Category::Other("weather".to_string()));
        assert_eq!(item.category.icon(), "🚨");
        assert_eq!(item.intensity, Intensity::Medium);
    }

    #[test]
    fn test_legacy_snapshot_tolerates_missing_sections() {
        let snapshot: TelemetrySnapshot = serde_json::from_value(serde_json::json!({
            "momentum": { "value": 12.5, "trend": "up", "change": 12.5 }
        }))
        .unwrap();

        assert_eq!(snapshot.momentum.unwrap().trend, Trend::Up);
        assert!(snapshot.confidence.is_none());
        assert!(snapshot.events.is_none());
    }
}
