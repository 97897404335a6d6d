// Commentary domain model - game context, fallback templates and response parsing
use super::telemetry::{Category, CommentaryItem, Intensity};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub const HIGH_SPEED: f64 = 500.0;
pub const MODERATE_SPEED: f64 = 200.0;
/// Raw responses without usable JSON are cut to this many characters.
pub const TRUNCATE_AT: usize = 200;

const DEFAULT_PHASE: &str = "normal";
const DEFAULT_CATEGORY: &str = "general";

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct Ball {
    #[serde(default)]
    pub position: Option<Value>,
    #[serde(default)]
    pub speed: Option<f64>,
    #[serde(default)]
    pub direction: Option<Value>,
}

/// Telemetry-like input for commentary. Every field is optional.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameContext {
    #[serde(default)]
    pub ball: Option<Ball>,
    #[serde(default, alias = "current_owner")]
    pub current_owner: Option<Value>,
    #[serde(default, alias = "game_phase")]
    pub game_phase: Option<String>,
    #[serde(default, alias = "time_elapsed")]
    pub time_elapsed: Option<f64>,
    #[serde(default)]
    pub players: Option<Vec<Value>>,
    #[serde(default, alias = "recent_events")]
    pub recent_events: Option<Vec<String>>,
}

impl GameContext {
    pub fn speed(&self) -> f64 {
        self.ball.as_ref().and_then(|b| b.speed).unwrap_or(0.0)
    }

    pub fn player_count(&self) -> usize {
        self.players.as_ref().map(Vec::len).unwrap_or(0)
    }

    pub fn phase(&self) -> &str {
        self.game_phase.as_deref().filter(|p| !p.is_empty()).unwrap_or(DEFAULT_PHASE)
    }

    pub fn owner(&self) -> String {
        self.current_owner
            .as_ref()
            .map(display_value)
            .unwrap_or_else(|| "None".to_string())
    }

    fn ball_field(&self, pick: fn(&Ball) -> Option<&Value>) -> String {
        self.ball
            .as_ref()
            .and_then(pick)
            .map(display_value)
            .unwrap_or_else(|| "Unknown".to_string())
    }

    fn recent_events(&self) -> String {
        match &self.recent_events {
            Some(events) if !events.is_empty() => events.join(", "),
            _ => "None".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    Pass,
    Shot,
    Goal,
}

impl EventKind {
    pub fn parse(tag: &str) -> Option<Self> {
        match tag {
            "PASS" => Some(EventKind::Pass),
            "SHOT" => Some(EventKind::Shot),
            "GOAL" => Some(EventKind::Goal),
            _ => None,
        }
    }

    /// The first template for this event; selection never depends on randomness.
    fn lead_template(&self, speed: &str) -> String {
        match self {
            EventKind::Pass => format!("Excellent pass! Ball moving at {} px/s", speed),
            EventKind::Shot => format!(
                "Shot attempt! Ball traveling at {} px/s - powerful strike!",
                speed
            ),
            EventKind::Goal => "GOAL! What a moment! The ball found its way into the net!".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CommentarySource {
    Gemini,
    Fallback,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Commentary {
    pub text: String,
    pub insight: String,
    pub prediction: String,
    pub technical: String,
    pub intensity: Intensity,
    pub category: String,
    pub timestamp: DateTime<Utc>,
    pub source: CommentarySource,
}

impl Commentary {
    pub fn to_item(&self) -> CommentaryItem {
        let mut item = CommentaryItem::new(
            self.text.clone(),
            Category::from(self.category.clone()),
            self.intensity,
        );
        item.ts = Some(self.timestamp);
        item
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct KeyStats {
    pub key_stats: Map<String, Value>,
    pub insights: Vec<String>,
    pub trends: Vec<String>,
    pub recommendations: Vec<String>,
    pub timestamp: DateTime<Utc>,
    pub source: CommentarySource,
}

pub fn intensity_for_speed(speed: f64) -> Intensity {
    if speed > HIGH_SPEED {
        Intensity::High
    } else if speed > MODERATE_SPEED {
        Intensity::Medium
    } else {
        Intensity::Low
    }
}

/// Local commentary used whenever the external generator is unavailable.
pub fn synthesize(context: &GameContext, event_type: Option<&str>, now: DateTime<Utc>) -> Commentary {
    let speed = context.speed();
    let speed_text = format_number(speed);

    let text = match event_type.and_then(EventKind::parse) {
        Some(kind) => kind.lead_template(&speed_text),
        None if speed > HIGH_SPEED => format!("High-intensity play! Ball moving at {} px/s", speed_text),
        None if speed > MODERATE_SPEED => format!("Good tempo maintained at {} px/s", speed_text),
        None => format!("Controlled play at {} px/s - tactical approach", speed_text),
    };

    Commentary {
        text,
        insight: format!("Ball speed: {} px/s, Phase: {}", speed_text, context.phase()),
        prediction: "Continuing to monitor the play...".to_string(),
        technical: format!(
            "Active players: {}, Ball owner: {}",
            context.player_count(),
            context.owner()
        ),
        intensity: intensity_for_speed(speed),
        category: context
            .game_phase
            .clone()
            .filter(|p| !p.is_empty())
            .unwrap_or_else(|| DEFAULT_CATEGORY.to_string()),
        timestamp: now,
        source: CommentarySource::Fallback,
    }
}

pub fn fallback_stats(context: &GameContext, now: DateTime<Utc>) -> KeyStats {
    let speed = context.speed();
    let level = |high: bool| if high { "high" } else { "medium" };
    let pace = if speed > HIGH_SPEED {
        "fast"
    } else if speed > MODERATE_SPEED {
        "moderate"
    } else {
        "slow"
    };

    let mut key_stats = Map::new();
    key_stats.insert(
        "possession_control".into(),
        Value::String(format!("{} players active", context.player_count())),
    );
    key_stats.insert("pace_of_play".into(), Value::String(pace.into()));
    key_stats.insert(
        "attacking_intensity".into(),
        Value::String(level(context.game_phase.as_deref() == Some("attack")).into()),
    );
    key_stats.insert("defensive_pressure".into(), Value::String(level(speed < 100.0).into()));
    let control = if speed < MODERATE_SPEED { "excellent" } else { "good" };
    key_stats.insert("ball_control_quality".into(), Value::String(control.into()));

    KeyStats {
        key_stats,
        insights: vec![
            format!("Ball speed: {} px/s", format_number(speed)),
            format!("Game phase: {}", context.phase()),
            format!("Active players: {}", context.player_count()),
        ],
        trends: vec![
            "Monitoring ball movement patterns".to_string(),
            "Analyzing player positioning".to_string(),
        ],
        recommendations: vec![
            "Continue tracking key moments".to_string(),
            "Watch for tactical changes".to_string(),
        ],
        timestamp: now,
        source: CommentarySource::Fallback,
    }
}

pub fn commentary_prompt(context: &GameContext, event_type: Option<&str>) -> String {
    format!(
        "Generate short live commentary for this moment of play.\n\
         Ball position: {}\nBall speed: {} px/s\nBall direction: {}\n\
         Ball owner: Player {}\nPhase: {}\nTime elapsed: {} s\n\
         Players detected: {}\nRecent events: {}\nEvent: {}\n\n\
         Reply with one JSON object with the string fields \
         \"commentary\", \"insight\", \"prediction\", \"technical\", \
         \"intensity\" (low|medium|high) and \"category\".",
        context.ball_field(|b| b.position.as_ref()),
        format_number(context.speed()),
        context.ball_field(|b| b.direction.as_ref()),
        context.owner(),
        context.phase(),
        format_number(context.time_elapsed.unwrap_or(0.0)),
        context.player_count(),
        context.recent_events(),
        event_type.unwrap_or("General Analysis"),
    )
}

pub fn stats_prompt(context: &GameContext) -> String {
    format!(
        "Summarise the key statistics for this moment of play.\n\
         Ball speed: {} px/s\nBall position: {}\nPlayers: {}\nPhase: {}\n\
         Time elapsed: {} s\nRecent events: {}\n\n\
         Reply with one JSON object: \"key_stats\" (object), \"insights\", \
         \"trends\" and \"recommendations\" (arrays of strings).",
        format_number(context.speed()),
        context.ball_field(|b| b.position.as_ref()),
        context.player_count(),
        context.phase(),
        format_number(context.time_elapsed.unwrap_or(0.0)),
        context.recent_events(),
    )
}

/// First balanced `{...}` in `text`, honouring JSON string quoting.
pub fn extract_json_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, ch) in text[start..].char_indices() {
        if in_string {
            match ch {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match ch {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[start..start + offset + 1]);
                }
            }
            _ => {}
        }
    }
    None
}

fn parse_embedded_object(text: &str) -> Option<Map<String, Value>> {
    let candidate = extract_json_object(text)?;
    match serde_json::from_str::<Value>(candidate) {
        Ok(Value::Object(map)) => Some(map),
        Ok(_) => None,
        Err(e) => {
            tracing::warn!("Failed to parse generated JSON: {}", e);
            None
        }
    }
}

fn string_field(map: &Map<String, Value>, key: &str) -> Option<String> {
    map.get(key)
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .map(str::to_owned)
}

fn string_list(map: &Map<String, Value>, key: &str) -> Vec<String> {
    map.get(key)
        .and_then(Value::as_array)
        .map(|items| items.iter().map(display_value).collect())
        .unwrap_or_default()
}

/// Never fails: unusable responses degrade to truncated raw text.
pub fn parse_commentary_response(raw: &str, now: DateTime<Utc>) -> Commentary {
    if let Some(data) = parse_embedded_object(raw) {
        return Commentary {
            text: string_field(&data, "commentary").unwrap_or_else(|| raw.to_string()),
            insight: string_field(&data, "insight").unwrap_or_default(),
            prediction: string_field(&data, "prediction").unwrap_or_default(),
            technical: string_field(&data, "technical").unwrap_or_default(),
            intensity: string_field(&data, "intensity")
                .map(Intensity::from)
                .unwrap_or_default(),
            category: string_field(&data, "category").unwrap_or_else(|| DEFAULT_CATEGORY.to_string()),
            timestamp: now,
            source: CommentarySource::Gemini,
        };
    }

    Commentary {
        text: truncate(raw, TRUNCATE_AT),
        insight: "AI analysis provided".to_string(),
        prediction: String::new(),
        technical: String::new(),
        intensity: Intensity::Medium,
        category: DEFAULT_CATEGORY.to_string(),
        timestamp: now,
        source: CommentarySource::Gemini,
    }
}

pub fn parse_stats_response(raw: &str, context: &GameContext, now: DateTime<Utc>) -> KeyStats {
    match parse_embedded_object(raw) {
        Some(data) => KeyStats {
            key_stats: data
                .get("key_stats")
                .and_then(Value::as_object)
                .cloned()
                .unwrap_or_default(),
            insights: string_list(&data, "insights"),
            trends: string_list(&data, "trends"),
            recommendations: string_list(&data, "recommendations"),
            timestamp: now,
            source: CommentarySource::Gemini,
        },
        None => fallback_stats(context, now),
    }
}

pub fn truncate(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((cut, _)) => format!("{}...", &text[..cut]),
        None => text.to_string(),
    }
}

/// Whole numbers print without a fractional part (`600`, not `600.0`).
pub fn format_number(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        format!("{}", value)
    }
}

fn display_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
