// Dashboard service - applies dispatched commands to the shared view and fans out updates
use crate::domain::dashboard::{DashboardCommand, DashboardView};
use chrono::Utc;
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc, RwLock};
use tokio::task::JoinHandle;

const UPDATE_BUFFER: usize = 64;

#[derive(Clone)]
pub struct DashboardService {
    view: Arc<RwLock<DashboardView>>,
    updates: broadcast::Sender<Arc<DashboardView>>,
}

impl Default for DashboardService {
    fn default() -> Self {
        Self::new()
    }
}

impl DashboardService {
    pub fn new() -> Self {
        let (updates, _) = broadcast::channel(UPDATE_BUFFER);
        Self {
            view: Arc::new(RwLock::new(DashboardView::default())),
            updates,
        }
    }

    pub async fn snapshot(&self) -> DashboardView {
        self.view.read().await.clone()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Arc<DashboardView>> {
        self.updates.subscribe()
    }

    pub async fn apply(&self, command: DashboardCommand) {
        let updated = {
            let mut view = self.view.write().await;
            view.apply(command, Utc::now());
            Arc::new(view.clone())
        };
        // No subscribers is fine; the view itself is already updated.
        let _ = self.updates.send(updated);
    }

    /// Drain `commands` in arrival order until every sender is gone.
    pub fn spawn_projector(&self, mut commands: mpsc::Receiver<DashboardCommand>) -> JoinHandle<()> {
        let service = self.clone();
        tokio::spawn(async move {
            while let Some(command) = commands.recv().await {
                service.apply(command).await;
            }
            tracing::debug!("Dashboard command stream closed");
        })
    }
}
