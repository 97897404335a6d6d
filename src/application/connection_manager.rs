// Connection manager - live/synthetic mode switching with linear reconnect back-off
use crate::application::live_transport::{LiveSession, LiveTransport, TransportError};
use crate::application::scheduler::{Backoff, Ticker};
use crate::application::synthetic_feed::SyntheticFeed;
use crate::domain::connection::{
    ConnectionMode, ConnectionState, ConnectionStatus, ReconnectDecision, StatusIndicator,
};
use crate::domain::dashboard::DashboardCommand;
use crate::domain::message::InboundMessage;
use chrono::Utc;
use futures::future::BoxFuture;
use serde_json::json;
use std::future::pending;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

type ConnectFuture = BoxFuture<'static, Result<Box<dyn LiveSession>, TransportError>>;

#[derive(Debug, Clone)]
pub struct ManagerSettings {
    pub max_reconnect_attempts: u32,
    pub base_delay: Duration,
    pub synthetic_period: Duration,
}

impl Default for ManagerSettings {
    fn default() -> Self {
        Self {
            max_reconnect_attempts: 5,
            base_delay: Duration::from_millis(1000),
            synthetic_period: Duration::from_millis(3000),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ManagerCommand {
    /// Explicit retry; the only way out of `Failed`.
    Reconnect,
    /// Drop a pending back-off timer without connecting.
    CancelReconnect,
    Shutdown,
}

/// Cloneable control surface for a running manager.
#[derive(Clone)]
pub struct ManagerHandle {
    commands: mpsc::Sender<ManagerCommand>,
    status: watch::Receiver<ConnectionStatus>,
}

impl ManagerHandle {
    pub fn status(&self) -> ConnectionStatus {
        self.status.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<ConnectionStatus> {
        self.status.clone()
    }

    pub async fn reconnect(&self) -> anyhow::Result<()> {
        self.send(ManagerCommand::Reconnect).await
    }

    pub async fn cancel_reconnect(&self) -> anyhow::Result<()> {
        self.send(ManagerCommand::CancelReconnect).await
    }

    pub async fn shutdown(&self) -> anyhow::Result<()> {
        self.send(ManagerCommand::Shutdown).await
    }

    async fn send(&self, command: ManagerCommand) -> anyhow::Result<()> {
        self.commands
            .send(command)
            .await
            .map_err(|_| anyhow::anyhow!("connection manager has stopped"))
    }
}

/// Owns the connection state, the live session and both timers.
/// Everything runs on one task, so dispatch and synthetic ticks never overlap.
pub struct ConnectionManager {
    state: ConnectionState,
    transport: Arc<dyn LiveTransport>,
    session: Option<Box<dyn LiveSession>>,
    pending_connect: Option<ConnectFuture>,
    synthetic: Ticker,
    feed: SyntheticFeed,
    backoff: Backoff,
    dashboard: mpsc::Sender<DashboardCommand>,
    status: watch::Sender<ConnectionStatus>,
}

impl ConnectionManager {
    pub fn new(
        transport: Arc<dyn LiveTransport>,
        settings: ManagerSettings,
        dashboard: mpsc::Sender<DashboardCommand>,
    ) -> Self {
        let state = ConnectionState::new(settings.max_reconnect_attempts, settings.base_delay);
        let (status, _) = watch::channel(state.status(StatusIndicator::Connecting));
        Self {
            state,
            transport,
            session: None,
            pending_connect: None,
            synthetic: Ticker::new(settings.synthetic_period),
            feed: SyntheticFeed::from_entropy(),
            backoff: Backoff::default(),
            dashboard,
            status,
        }
    }

    pub fn with_feed(mut self, feed: SyntheticFeed) -> Self {
        self.feed = feed;
        self
    }

    pub fn mode(&self) -> ConnectionMode {
        self.state.mode()
    }

    pub fn synthetic_running(&self) -> bool {
        self.synthetic.is_running()
    }

    pub fn reconnect_pending(&self) -> bool {
        self.backoff.is_pending()
    }

    pub fn spawn(self) -> (ManagerHandle, JoinHandle<()>) {
        let (tx, rx) = mpsc::channel(16);
        let handle = ManagerHandle {
            commands: tx,
            status: self.status.subscribe(),
        };
        let task = tokio::spawn(self.run(rx));
        (handle, task)
    }

    pub async fn run(mut self, mut commands: mpsc::Receiver<ManagerCommand>) {
        self.start().await;

        loop {
            tokio::select! {
                outcome = poll_connect(&mut self.pending_connect) => {
                    self.pending_connect = None;
                    match outcome {
                        Ok(session) => self.on_connected(session).await,
                        Err(e) => self.on_connect_failed(e).await,
                    }
                }
                frame = next_frame(&mut self.session) => match frame {
                    Some(Ok(text)) => self.on_frame(&text).await,
                    Some(Err(e)) => {
                        tracing::error!("Live transport error: {}", e);
                        self.on_disconnected().await;
                    }
                    None => self.on_disconnected().await,
                },
                _ = self.synthetic.tick() => {
                    self.on_synthetic_tick().await;
                }
                _ = self.backoff.elapsed() => {
                    self.connect();
                }
                command = commands.recv() => match command {
                    Some(ManagerCommand::Shutdown) | None => break,
                    Some(command) => self.handle_command(command).await,
                },
            }
        }

        self.teardown().await;
    }

    /// Initial state: synthetic data runs while the first attempt is in flight.
    pub async fn start(&mut self) {
        self.synthetic.start();
        self.publish(StatusIndicator::Connecting).await;
        self.connect();
    }

    /// Begin one transport attempt; the outcome arrives in `run`.
    pub fn connect(&mut self) {
        if self.session.is_some() || self.pending_connect.is_some() {
            return;
        }
        let transport = self.transport.clone();
        tracing::debug!("Opening live connection");
        self.pending_connect = Some(Box::pin(async move { transport.connect().await }));
    }

    pub async fn on_connected(&mut self, mut session: Box<dyn LiveSession>) {
        self.state.connected();
        // Stop synthetic data in the same step that live consumption begins.
        if self.synthetic.stop() {
            tracing::info!("Stopped synthetic data generator");
        }
        self.backoff.cancel();
        tracing::info!("Connected to live feed");

        if let Err(e) = session
            .emit(
                "test",
                json!({ "type": "test", "message": "Frontend connected successfully" }),
            )
            .await
        {
            tracing::warn!("Failed to send greeting: {}", e);
        }
        self.session = Some(session);
        self.publish(StatusIndicator::Connected).await;
    }

    pub async fn on_connect_failed(&mut self, error: TransportError) {
        tracing::warn!("Live connection failed: {}", error);
        self.fall_back(StatusIndicator::Error).await;
    }

    pub async fn on_disconnected(&mut self) {
        tracing::info!("Disconnected from live feed");
        if let Some(mut session) = self.session.take() {
            session.close().await;
        }
        self.fall_back(StatusIndicator::Disconnected).await;
    }

    /// Synthetic on, reconnect scheduled, then one status update for the transition.
    async fn fall_back(&mut self, indicator: StatusIndicator) {
        self.state.lost();
        if self.synthetic.start() {
            tracing::info!("Started synthetic data generator");
        }
        let indicator = match self.schedule_reconnect() {
            ReconnectDecision::Exhausted => StatusIndicator::Failed,
            ReconnectDecision::Retry { .. } => indicator,
        };
        self.publish(indicator).await;
    }

    pub fn schedule_reconnect(&mut self) -> ReconnectDecision {
        let decision = self.state.next_reconnect();
        match decision {
            ReconnectDecision::Retry { attempt, delay } => {
                tracing::info!(
                    "Attempting to reconnect in {:?} ({}/{})",
                    delay,
                    attempt,
                    self.state.max_reconnect_attempts()
                );
                self.backoff.schedule(delay);
            }
            ReconnectDecision::Exhausted => {
                tracing::warn!("Max reconnection attempts reached");
                self.backoff.cancel();
            }
        }
        decision
    }

    /// Emits one synthetic snapshot unless live. Returns whether it emitted.
    pub async fn on_synthetic_tick(&mut self) -> bool {
        if self.state.mode() == ConnectionMode::Live {
            tracing::debug!("Live feed active, skipping synthetic data");
            return false;
        }
        let snapshot = self.feed.generate(Utc::now());
        tracing::debug!(
            "Generated synthetic snapshot ({} events)",
            snapshot.events.as_ref().map_or(0, Vec::len)
        );
        self.forward(DashboardCommand::ReplaceSnapshot(snapshot)).await;
        true
    }

    /// Undecodable frames are logged and dropped; connection state is untouched.
    pub async fn on_frame(&mut self, text: &str) {
        match InboundMessage::decode_frame(text) {
            Ok(message) => self.dispatch(message).await,
            Err(e) => tracing::warn!("Dropping live frame: {}", e),
        }
    }

    pub async fn dispatch(&mut self, message: InboundMessage) {
        tracing::debug!("Dispatching {} message", message.kind());
        let now = Utc::now();
        let command = match message {
            InboundMessage::Telemetry(update) => DashboardCommand::RenderTelemetry(update),
            InboundMessage::Event(event) => DashboardCommand::PrependEvent(event.into_entry(now)),
            InboundMessage::ArduinoData(reading) => {
                tracing::info!(
                    "Device reading: patient {} - {}: {}",
                    reading.patient_id,
                    reading.routine_type,
                    reading.status
                );
                DashboardCommand::RecordRoutine(reading)
            }
            InboundMessage::Insight(insight) => DashboardCommand::PrependInsight(insight.text),
            InboundMessage::Commentary(item) => DashboardCommand::PrependCommentary(item),
            InboundMessage::Welcome(greeting) => {
                tracing::info!("Welcome message: {}", greeting.message.unwrap_or_default());
                return;
            }
            InboundMessage::Echo(greeting) => {
                tracing::info!("Echo response: {}", greeting.message.unwrap_or_default());
                return;
            }
            InboundMessage::Legacy(snapshot) => {
                tracing::debug!("Unknown message type, treating as full snapshot");
                DashboardCommand::ReplaceSnapshot(snapshot)
            }
        };
        self.forward(command).await;
    }

    pub async fn handle_command(&mut self, command: ManagerCommand) {
        match command {
            ManagerCommand::Reconnect => {
                if self.session.is_some() {
                    tracing::debug!("Reconnect requested while live, ignoring");
                    return;
                }
                tracing::info!("Manual reconnect requested");
                self.state.rearm();
                self.backoff.cancel();
                self.publish(StatusIndicator::Connecting).await;
                self.connect();
            }
            ManagerCommand::CancelReconnect => {
                if self.backoff.cancel() {
                    tracing::info!("Pending reconnect cancelled");
                }
            }
            ManagerCommand::Shutdown => {}
        }
    }

    /// No timer or session outlives the manager.
    pub async fn teardown(&mut self) {
        if let Some(mut session) = self.session.take() {
            session.close().await;
        }
        self.pending_connect = None;
        self.synthetic.stop();
        self.backoff.cancel();
        tracing::info!("Connection manager stopped");
    }

    async fn publish(&mut self, indicator: StatusIndicator) {
        let status = self.state.status(indicator);
        self.status.send_replace(status.clone());
        self.forward(DashboardCommand::StatusChanged(status)).await;
    }

    async fn forward(&mut self, command: DashboardCommand) {
        if self.dashboard.send(command).await.is_err() {
            tracing::debug!("Dashboard consumer closed, dropping update");
        }
    }
}

async fn poll_connect(
    pending_connect: &mut Option<ConnectFuture>,
) -> Result<Box<dyn LiveSession>, TransportError> {
    match pending_connect.as_mut() {
        Some(fut) => fut.await,
        None => pending().await,
    }
}

async fn next_frame(
    session: &mut Option<Box<dyn LiveSession>>,
) -> Option<Result<String, TransportError>> {
    match session.as_mut() {
        Some(session) => session.next_frame().await,
        None => pending().await,
    }
}
