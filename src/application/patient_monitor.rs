// Patient monitor - slowly evolving patient records on their own timer
use crate::application::scheduler::Ticker;
use crate::domain::dashboard::DashboardCommand;
use crate::domain::patient::PatientRecord;
use chrono::{DateTime, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Owns the patient records. Only the task running `run` mutates them.
pub struct PatientMonitor<R = StdRng> {
    patients: Vec<PatientRecord>,
    rng: R,
}

impl PatientMonitor<StdRng> {
    pub fn from_entropy(now: DateTime<Utc>) -> Self {
        Self::new(PatientRecord::seed(now), StdRng::from_entropy())
    }
}

impl<R: Rng + Send + 'static> PatientMonitor<R> {
    pub fn new(patients: Vec<PatientRecord>, rng: R) -> Self {
        Self { patients, rng }
    }

    pub fn patients(&self) -> &[PatientRecord] {
        &self.patients
    }

    pub fn tick(&mut self, now: DateTime<Utc>) {
        for patient in self.patients.iter_mut() {
            patient.evolve(&mut self.rng, now);
        }
    }

    /// Publish the seed records, then one update per period until the consumer goes away.
    pub async fn run(mut self, period: Duration, commands: mpsc::Sender<DashboardCommand>) {
        let mut ticker = Ticker::new(period);
        ticker.start();

        if commands
            .send(DashboardCommand::PatientsUpdated(self.patients.clone()))
            .await
            .is_err()
        {
            return;
        }

        loop {
            ticker.tick().await;
            self.tick(Utc::now());
            tracing::debug!("Patient records updated ({} patients)", self.patients.len());

            if commands
                .send(DashboardCommand::PatientsUpdated(self.patients.clone()))
                .await
                .is_err()
            {
                tracing::debug!("Dashboard consumer closed, stopping patient monitor");
                break;
            }
        }
    }

    pub fn spawn(self, period: Duration, commands: mpsc::Sender<DashboardCommand>) -> JoinHandle<()> {
        tokio::spawn(self.run(period, commands))
    }
}
