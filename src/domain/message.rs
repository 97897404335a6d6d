// Inbound message domain model - tagged union over everything the live feed can push
use super::telemetry::{
    CommentaryItem, Confidence, EventEntry, Explanation, Momentum, TelemetrySnapshot, Volatility,
};
use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// Event name that forces the Arduino handler when frames arrive in an envelope.
pub const ARDUINO_EVENT: &str = "arduino_data";

#[derive(Debug, thiserror::Error)]
pub enum MessageError {
    #[error("frame is not valid JSON: {0}")]
    InvalidJson(#[source] serde_json::Error),
    #[error("malformed `{kind}` message: {source}")]
    Malformed {
        kind: &'static str,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
pub struct TelemetryUpdate {
    #[serde(default)]
    pub momentum: Option<Momentum>,
    #[serde(default)]
    pub confidence: Option<Confidence>,
    #[serde(default)]
    pub volatility: Option<Volatility>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct EventMessage {
    #[serde(default, deserialize_with = "lenient_timestamp")]
    pub ts: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "lenient_timestamp")]
    pub timestamp: Option<DateTime<Utc>>,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub detail: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

impl EventMessage {
    /// Flatten into a list entry, stamping `now` when the sender gave no time.
    pub fn into_entry(self, now: DateTime<Utc>) -> EventEntry {
        let body = self.detail.or(self.description).unwrap_or_default();
        let description = match self.label {
            Some(label) => format!("{}: {}", label, body),
            None => body,
        };
        EventEntry {
            timestamp: self.ts.or(self.timestamp).unwrap_or(now),
            description,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ArduinoReading {
    #[serde(deserialize_with = "string_or_number")]
    pub patient_id: String,
    pub routine_type: String,
    pub status: String,
    #[serde(default, deserialize_with = "lenient_timestamp")]
    pub timestamp: Option<DateTime<Utc>>,
}

impl ArduinoReading {
    pub fn is_completed(&self) -> bool {
        self.status == "COMPLETED"
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Insight {
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
pub struct Greeting {
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum InboundMessage {
    Telemetry(TelemetryUpdate),
    Event(EventMessage),
    ArduinoData(ArduinoReading),
    Insight(Insight),
    Commentary(CommentaryItem),
    Welcome(Greeting),
    Echo(Greeting),
    /// Untagged or unknown payloads are read as a full snapshot.
    Legacy(TelemetrySnapshot),
}

impl InboundMessage {
    pub fn kind(&self) -> &'static str {
        match self {
            InboundMessage::Telemetry(_) => "telemetry",
            InboundMessage::Event(_) => "event",
            InboundMessage::ArduinoData(_) => "arduino_data",
            InboundMessage::Insight(_) => "insight",
            InboundMessage::Commentary(_) => "commentary",
            InboundMessage::Welcome(_) => "welcome",
            InboundMessage::Echo(_) => "echo",
            InboundMessage::Legacy(_) => "legacy",
        }
    }

    /// Route a JSON object by its `type` tag.
    pub fn from_value(value: Value) -> Result<Self, MessageError> {
        let tag = value.get("type").and_then(Value::as_str).map(str::to_owned);
        let message = match tag.as_deref() {
            Some("telemetry") => InboundMessage::Telemetry(decode("telemetry", value)?),
            Some("event") => InboundMessage::Event(decode("event", value)?),
            Some("arduino_data") => InboundMessage::ArduinoData(decode("arduino_data", value)?),
            Some("insight") => InboundMessage::Insight(decode("insight", value)?),
            Some("commentary") => InboundMessage::Commentary(decode("commentary", value)?),
            Some("welcome") => InboundMessage::Welcome(decode("welcome", value)?),
            Some("echo") => InboundMessage::Echo(decode("echo", value)?),
            _ => InboundMessage::Legacy(lenient_snapshot(&value)),
        };
        Ok(message)
    }

    /// Decode a transport text frame: a bare object or an `[event, payload]` envelope.
    pub fn decode_frame(text: &str) -> Result<Self, MessageError> {
        let value: Value = serde_json::from_str(text).map_err(MessageError::InvalidJson)?;
        match value {
            Value::Array(mut parts) if !parts.is_empty() && parts[0].is_string() => {
                let event = parts[0].as_str().unwrap_or_default().to_string();
                let payload = if parts.len() > 1 {
                    parts.swap_remove(1)
                } else {
                    Value::Null
                };
                if event == ARDUINO_EVENT {
                    Ok(InboundMessage::ArduinoData(decode("arduino_data", payload)?))
                } else {
                    Self::from_value(payload)
                }
            }
            other => Self::from_value(other),
        }
    }
}

fn decode<T: for<'de> Deserialize<'de>>(kind: &'static str, value: Value) -> Result<T, MessageError> {
    serde_json::from_value(value).map_err(|source| MessageError::Malformed { kind, source })
}

/// Field-by-field snapshot decoding; a bad section is dropped, never the whole message.
fn lenient_snapshot(value: &Value) -> TelemetrySnapshot {
    fn field<T: for<'de> Deserialize<'de>>(value: &Value, key: &str) -> Option<T> {
        value
            .get(key)
            .and_then(|v| serde_json::from_value(v.clone()).ok())
    }

    TelemetrySnapshot {
        momentum: field::<Momentum>(value, "momentum"),
        confidence: field::<Confidence>(value, "confidence"),
        volatility: field::<Volatility>(value, "volatility"),
        events: field::<Vec<EventEntry>>(value, "events"),
        explanations: field::<Vec<Explanation>>(value, "explanations"),
        commentaries: field::<Vec<CommentaryItem>>(value, "commentaries").unwrap_or_default(),
    }
}

fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        other => Err(serde::de::Error::custom(format!(
            "expected string or number, got {}",
            other
        ))),
    }
}

/// Accepts RFC 3339, naive ISO-8601 (read as UTC) or epoch milliseconds.
/// Anything else becomes `None` rather than an error.
fn lenient_timestamp<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.and_then(|v| parse_timestamp(&v)))
}

pub fn parse_timestamp(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::String(s) => DateTime::parse_from_rfc3339(s)
            .map(|t| t.with_timezone(&Utc))
            .ok()
            .or_else(|| {
                NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f")
                    .ok()
                    .map(|naive| Utc.from_utc_datetime(&naive))
            }),
        Value::Number(n) => n
            .as_i64()
            .and_then(|ms| Utc.timestamp_millis_opt(ms).single()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::telemetry::{Intensity, Trend};
    use serde_json::json;

    #[test]
    fn test_routes_known_types() {
        let msg = InboundMessage::from_value(json!({
            "type": "telemetry",
            "momentum": { "value": -20.0, "trend": "down", "change": -20.0 }
        }))
        .unwrap();
        match msg {
            InboundMessage::Telemetry(update) => {
                assert_eq!(update.momentum.unwrap().trend, Trend::Down);
                assert!(update.confidence.is_none());
            }
            other => panic!("unexpected {:?}", other),
        }

        let msg = InboundMessage::from_value(json!({
            "type": "commentary",
            "text": "steady",
            "category": "care",
            "intensity": "low",
            "patient": "Sarah Johnson"
        }))
        .unwrap();
        match msg {
            InboundMessage::Commentary(item) => {
                assert_eq!(item.intensity, Intensity::Low);
                assert_eq!(item.patient.as_deref(), Some("Sarah Johnson"));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_unknown_or_missing_type_is_legacy() {
        let unknown = InboundMessage::from_value(json!({ "type": "mystery", "foo": 1 })).unwrap();
        assert_eq!(unknown.kind(), "legacy");

        let untagged = InboundMessage::from_value(json!({
            "confidence": { "level": "High", "percentage": 90 },
            "volatility": "garbage"
        }))
        .unwrap();
        match untagged {
            InboundMessage::Legacy(snapshot) => {
                assert_eq!(snapshot.confidence.unwrap().percentage, 90);
                assert!(snapshot.volatility.is_none());
            }
            other => panic!("unexpected {:?}", other),
        }

        let scalar = InboundMessage::from_value(json!(42)).unwrap();
        assert_eq!(scalar, InboundMessage::Legacy(TelemetrySnapshot::default()));
    }

    #[test]
    fn test_arduino_reading_accepts_numeric_id_and_naive_time() {
        let msg = InboundMessage::from_value(json!({
            "type": "arduino_data",
            "patient_id": 2,
            "routine_type": "MEDICATION",
            "status": "MISSED",
            "timestamp": "2024-03-01T10:15:30.123456"
        }))
        .unwrap();
        match msg {
            InboundMessage::ArduinoData(reading) => {
                assert_eq!(reading.patient_id, "2");
                assert!(!reading.is_completed());
                assert!(reading.timestamp.is_some());
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_envelope_frames() {
        let frame = r#"["arduino_data", {"patient_id": "1", "routine_type": "MEAL", "status": "COMPLETED"}]"#;
        assert_eq!(InboundMessage::decode_frame(frame).unwrap().kind(), "arduino_data");

        let frame = r#"["data_update", {"type": "insight", "text": "sleeping well"}]"#;
        assert_eq!(InboundMessage::decode_frame(frame).unwrap().kind(), "insight");
    }

    #[test]
    fn test_bad_frames_are_errors_not_panics() {
        assert!(matches!(
            InboundMessage::decode_frame("not json"),
            Err(MessageError::InvalidJson(_))
        ));
        assert!(matches!(
            InboundMessage::from_value(json!({ "type": "insight" })),
            Err(MessageError::Malformed { kind: "insight", .. })
        ));
    }

    #[test]
    fn test_event_entry_prefers_ts_and_detail() {
        let now = Utc::now();
        let event: EventMessage = serde_json::from_value(json!({
            "ts": 1_700_000_000_000i64,
            "label": "Medication",
            "detail": "taken on time",
            "description": "ignored"
        }))
        .unwrap();
        let entry = event.into_entry(now);
        assert_eq!(entry.description, "Medication: taken on time");
        assert_eq!(entry.timestamp.timestamp_millis(), 1_700_000_000_000);
    }
}
