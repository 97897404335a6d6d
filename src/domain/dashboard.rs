// Dashboard domain model - the widget state every feed renders into
use super::connection::ConnectionStatus;
use super::message::{ArduinoReading, TelemetryUpdate};
use super::patient::{PatientRecord, RoutineStatus};
use super::telemetry::{CommentaryItem, Confidence, EventEntry, Explanation, Momentum, TelemetrySnapshot, Volatility};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::{BTreeMap, VecDeque};

pub const EVENT_CAP: usize = 10;
pub const INSIGHT_CAP: usize = 5;
pub const COMMENTARY_CAP: usize = 8;
pub const CARE_EVENT_CAP: usize = 10;

const INSIGHT_TITLE: &str = "Care Insight";
const MEDICATION_STEP: u8 = 2;
const EXERCISE_STEP: u8 = 3;

/// A change for the dashboard, produced by dispatch or by the patient monitor.
#[derive(Debug, Clone, PartialEq)]
pub enum DashboardCommand {
    RenderTelemetry(TelemetryUpdate),
    ReplaceSnapshot(TelemetrySnapshot),
    PrependEvent(EventEntry),
    RecordRoutine(ArduinoReading),
    PrependInsight(String),
    PrependCommentary(CommentaryItem),
    PatientsUpdated(Vec<PatientRecord>),
    StatusChanged(ConnectionStatus),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationKind {
    Success,
    Error,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Notification {
    pub message: String,
    pub kind: NotificationKind,
    pub at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CareEvent {
    pub timestamp: DateTime<Utc>,
    pub description: String,
    pub routine: String,
    pub status: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct CareMetrics {
    pub medication_completion: u8,
    pub exercise_completion: u8,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct DashboardView {
    pub momentum: Option<Momentum>,
    pub confidence: Option<Confidence>,
    pub volatility: Option<Volatility>,
    pub events: VecDeque<EventEntry>,
    pub insights: VecDeque<Explanation>,
    pub commentaries: VecDeque<CommentaryItem>,
    pub care_events: VecDeque<CareEvent>,
    pub patients: Vec<PatientRecord>,
    /// patient id -> routine (lower case) -> last device status
    pub routines: BTreeMap<String, BTreeMap<String, RoutineStatus>>,
    pub metrics: CareMetrics,
    pub notification: Option<Notification>,
    pub status: Option<ConnectionStatus>,
    pub last_update: Option<DateTime<Utc>>,
}

impl DashboardView {
    pub fn apply(&mut self, command: DashboardCommand, now: DateTime<Utc>) {
        match command {
            DashboardCommand::RenderTelemetry(update) => {
                self.render_widgets(update.momentum, update.confidence, update.volatility);
            }
            DashboardCommand::ReplaceSnapshot(snapshot) => self.replace_snapshot(snapshot),
            DashboardCommand::PrependEvent(entry) => push_capped(&mut self.events, entry, EVENT_CAP),
            DashboardCommand::RecordRoutine(reading) => self.record_routine(reading, now),
            DashboardCommand::PrependInsight(text) => push_capped(
                &mut self.insights,
                Explanation {
                    title: INSIGHT_TITLE.to_string(),
                    text,
                },
                INSIGHT_CAP,
            ),
            DashboardCommand::PrependCommentary(item) => {
                push_capped(&mut self.commentaries, item, COMMENTARY_CAP)
            }
            DashboardCommand::PatientsUpdated(patients) => self.patients = patients,
            DashboardCommand::StatusChanged(status) => self.status = Some(status),
        }
        self.last_update = Some(now);
    }

    /// Missing widget data leaves the previous rendering in place.
    fn render_widgets(
        &mut self,
        momentum: Option<Momentum>,
        confidence: Option<Confidence>,
        volatility: Option<Volatility>,
    ) {
        if momentum.is_some() {
            self.momentum = momentum;
        }
        if confidence.is_some() {
            self.confidence = confidence;
        }
        if volatility.is_some() {
            self.volatility = volatility;
        }
    }

    fn replace_snapshot(&mut self, snapshot: TelemetrySnapshot) {
        self.render_widgets(snapshot.momentum, snapshot.confidence, snapshot.volatility);
        if let Some(events) = snapshot.events {
            self.events = events.into_iter().take(EVENT_CAP).collect();
        }
        if let Some(explanations) = snapshot.explanations {
            self.insights = explanations.into_iter().take(INSIGHT_CAP).collect();
        }
        for item in snapshot.commentaries {
            push_capped(&mut self.commentaries, item, COMMENTARY_CAP);
        }
    }

    fn record_routine(&mut self, reading: ArduinoReading, now: DateTime<Utc>) {
        let completed = reading.is_completed();
        let routine = reading.routine_type.to_lowercase();

        self.routines
            .entry(reading.patient_id.clone())
            .or_default()
            .insert(routine, RoutineStatus::from_device(&reading.status));

        push_capped(
            &mut self.care_events,
            CareEvent {
                timestamp: reading.timestamp.unwrap_or(now),
                description: format!(
                    "Patient {} {} {} routine",
                    reading.patient_id, reading.status, reading.routine_type
                ),
                routine: reading.routine_type.clone(),
                status: reading.status.clone(),
            },
            CARE_EVENT_CAP,
        );

        self.notification = Some(Notification {
            message: format!(
                "Patient {}: {} {}",
                reading.patient_id, reading.routine_type, reading.status
            ),
            kind: if completed {
                NotificationKind::Success
            } else {
                NotificationKind::Error
            },
            at: now,
        });

        if completed {
            match reading.routine_type.as_str() {
                "MEDICATION" => bump(&mut self.metrics.medication_completion, MEDICATION_STEP),
                "EXERCISE" => bump(&mut self.metrics.exercise_completion, EXERCISE_STEP),
                _ => {}
            }
        }
    }
}

/// Newest first, oldest dropped past `cap`.
fn push_capped<T>(list: &mut VecDeque<T>, item: T, cap: usize) {
    list.push_front(item);
    list.truncate(cap);
}

fn bump(metric: &mut u8, step: u8) {
    *metric = metric.saturating_add(step).min(100);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::message::InboundMessage;
    use crate::domain::telemetry::{Category, Intensity};

    fn reading(patient_id: &str, routine: &str, status: &str) -> ArduinoReading {
        ArduinoReading {
            patient_id: patient_id.to_string(),
            routine_type: routine.to_string(),
            status: status.to_string(),
            timestamp: None,
        }
    }

    #[test]
    fn test_lists_are_capped_newest_first() {
        let mut view = DashboardView::default();
        let now = Utc::now();

        for i in 0..15 {
            view.apply(
                DashboardCommand::PrependEvent(EventEntry {
                    timestamp: now,
                    description: format!("event {}", i),
                }),
                now,
            );
            view.apply(DashboardCommand::PrependInsight(format!("insight {}", i)), now);
            view.apply(
                DashboardCommand::PrependCommentary(CommentaryItem::new(
                    format!("commentary {}", i),
                    Category::Care,
                    Intensity::Low,
                )),
                now,
            );
            view.apply(DashboardCommand::RecordRoutine(reading("1", "MEAL", "COMPLETED")), now);
        }

        assert_eq!(view.events.len(), EVENT_CAP);
        assert_eq!(view.insights.len(), INSIGHT_CAP);
        assert_eq!(view.commentaries.len(), COMMENTARY_CAP);
        assert_eq!(view.care_events.len(), CARE_EVENT_CAP);
        assert_eq!(view.events[0].description, "event 14");
        assert_eq!(view.insights[0].title, "Care Insight");
        assert_eq!(view.commentaries[0].text, "commentary 14");
    }

    #[test]
    fn test_care_metrics_cap_at_100() {
        let mut view = DashboardView::default();
        let now = Utc::now();
        for _ in 0..60 {
            view.apply(DashboardCommand::RecordRoutine(reading("1", "MEDICATION", "COMPLETED")), now);
            view.apply(DashboardCommand::RecordRoutine(reading("2", "EXERCISE", "COMPLETED")), now);
        }
        assert_eq!(view.metrics.medication_completion, 100);
        assert_eq!(view.metrics.exercise_completion, 100);
    }

    #[test]
    fn test_missed_routine_records_error_without_metrics() {
        let mut view = DashboardView::default();
        let now = Utc::now();
        view.apply(DashboardCommand::RecordRoutine(reading("2", "MEDICATION", "MISSED")), now);

        assert_eq!(view.metrics, CareMetrics::default());
        assert_eq!(view.routines["2"]["medication"], RoutineStatus::Missed);
        let notification = view.notification.unwrap();
        assert_eq!(notification.kind, NotificationKind::Error);
        assert_eq!(notification.message, "Patient 2: MEDICATION MISSED");
        assert_eq!(view.care_events[0].description, "Patient 2 MISSED MEDICATION routine");
    }

    #[test]
    fn test_unknown_message_without_lists_keeps_events_and_insights() {
        let mut view = DashboardView::default();
        let now = Utc::now();
        view.apply(
            DashboardCommand::PrependEvent(EventEntry {
                timestamp: now,
                description: "Sarah Johnson completed Meal routine".to_string(),
            }),
            now,
        );
        view.apply(DashboardCommand::PrependInsight("steady mornings".to_string()), now);

        let snapshot = match InboundMessage::decode_frame(
            r#"{"type":"brand_new","momentum":{"value":15.0,"trend":"up","change":15.0}}"#,
        )
        .unwrap()
        {
            InboundMessage::Legacy(snapshot) => snapshot,
            other => panic!("unexpected {:?}", other),
        };
        view.apply(DashboardCommand::ReplaceSnapshot(snapshot), now);

        assert_eq!(view.momentum.as_ref().unwrap().value, 15.0);
        assert_eq!(view.events.len(), 1);
        assert_eq!(view.insights.len(), 1);
        assert_eq!(view.insights[0].text, "steady mornings");

        let cleared = match InboundMessage::decode_frame(r#"{"events":[],"explanations":[]}"#).unwrap() {
            InboundMessage::Legacy(snapshot) => snapshot,
            other => panic!("unexpected {:?}", other),
        };
        view.apply(DashboardCommand::ReplaceSnapshot(cleared), now);
        assert!(view.events.is_empty());
        assert!(view.insights.is_empty());
    }

    #[test]
    fn test_partial_telemetry_keeps_previous_widgets() {
        let mut view = DashboardView::default();
        let now = Utc::now();
        view.apply(
            DashboardCommand::RenderTelemetry(TelemetryUpdate {
                momentum: Some(Momentum::new(20.0)),
                confidence: Some(Confidence::new(90)),
                volatility: None,
            }),
            now,
        );
        view.apply(
            DashboardCommand::RenderTelemetry(TelemetryUpdate {
                momentum: None,
                confidence: None,
                volatility: Some(Volatility::new(0.1)),
            }),
            now,
        );

        assert_eq!(view.momentum.unwrap().value, 20.0);
        assert_eq!(view.confidence.unwrap().percentage, 90);
        assert!(view.volatility.is_some());
    }
}
