// Patient domain model
use chrono::{DateTime, Utc};
use rand::Rng;
use serde::Serialize;

pub const MAX_SCORE_STEP: f64 = 5.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PatientStatus {
    Stable,
    Attention,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RoutineStatus {
    Completed,
    Missed,
    Pending,
}

impl RoutineStatus {
    /// Maps a device status string (`COMPLETED`, `MISSED`, ...) onto a routine state.
    pub fn from_device(status: &str) -> Self {
        if status == "COMPLETED" {
            RoutineStatus::Completed
        } else {
            RoutineStatus::Missed
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PatientRecord {
    pub id: u32,
    pub name: String,
    pub status: PatientStatus,
    pub medication: RoutineStatus,
    pub exercise: RoutineStatus,
    pub cognitive_score: f64,
    pub last_update: DateTime<Utc>,
}

impl PatientRecord {
    /// The three residents the dashboard starts with.
    pub fn seed(now: DateTime<Utc>) -> Vec<PatientRecord> {
        let make = |id, name: &str, status, medication, exercise, cognitive_score| PatientRecord {
            id,
            name: name.to_string(),
            status,
            medication,
            exercise,
            cognitive_score,
            last_update: now,
        };
        vec![
            make(1, "Sarah Johnson", PatientStatus::Stable, RoutineStatus::Completed, RoutineStatus::Pending, 85.0),
            make(2, "Robert Chen", PatientStatus::Attention, RoutineStatus::Missed, RoutineStatus::Completed, 72.0),
            make(3, "Maria Garcia", PatientStatus::Stable, RoutineStatus::Completed, RoutineStatus::Completed, 91.0),
        ]
    }

    /// One random-walk step. The score stays in [0, 100].
    pub fn evolve<R: Rng + ?Sized>(&mut self, rng: &mut R, now: DateTime<Utc>) {
        let change = rng.gen_range(-MAX_SCORE_STEP..MAX_SCORE_STEP);
        self.cognitive_score = (self.cognitive_score + change).clamp(0.0, 100.0);

        if rng.gen_bool(0.3) {
            self.medication = if rng.gen_bool(0.8) {
                RoutineStatus::Completed
            } else {
                RoutineStatus::Missed
            };
        }
        if rng.gen_bool(0.3) {
            self.exercise = if rng.gen_bool(0.7) {
                RoutineStatus::Completed
            } else {
                RoutineStatus::Pending
            };
        }

        self.last_update = now;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn test_score_walk_stays_bounded() {
        let mut rng = StdRng::seed_from_u64(7);
        let now = Utc::now();
        let mut patients = PatientRecord::seed(now);
        patients[0].cognitive_score = 99.0;
        patients[1].cognitive_score = 1.0;

        for _ in 0..10_000 {
            for patient in patients.iter_mut() {
                patient.evolve(&mut rng, now);
                assert!((0.0..=100.0).contains(&patient.cognitive_score));
            }
        }
    }

    #[test]
    fn test_exercise_never_flips_to_missed() {
        let mut rng = StdRng::seed_from_u64(11);
        let now = Utc::now();
        let mut patient = PatientRecord::seed(now).remove(0);
        for _ in 0..1_000 {
            patient.evolve(&mut rng, now);
            assert_ne!(patient.exercise, RoutineStatus::Missed);
            assert_ne!(patient.medication, RoutineStatus::Pending);
        }
    }

    #[test]
    fn test_device_status_mapping() {
        assert_eq!(RoutineStatus::from_device("COMPLETED"), RoutineStatus::Completed);
        assert_eq!(RoutineStatus::from_device("MISSED"), RoutineStatus::Missed);
    }
}
