// HTTP request handlers
use crate::domain::commentary::GameContext;
use crate::domain::dashboard::DashboardCommand;
use crate::infrastructure::chunked_json::stream_from_broadcast;
use crate::infrastructure::http_response::{accepts_brotli, json_response};
use crate::presentation::app_state::AppState;
use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use std::sync::Arc;

/// A game context with an optional event tag alongside its fields.
#[derive(Debug, Default, Deserialize)]
pub struct CommentaryRequest {
    #[serde(flatten)]
    pub context: GameContext,
    #[serde(default, alias = "eventType")]
    pub event_type: Option<String>,
}

/// Health check endpoint
pub async fn health_check() -> &'static str {
    "ok"
}

pub async fn get_status(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(state.manager.status())
}

pub async fn get_dashboard(
    headers: HeaderMap,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    let view = state.dashboard_service.snapshot().await;
    match json_response(&view, accepts_brotli(&headers)).await {
        Ok(response) => response,
        Err(status) => status.into_response(),
    }
}

/// Current view first, then one chunk per applied command.
pub async fn stream_dashboard(
    headers: HeaderMap,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    let updates = state.dashboard_service.subscribe();
    let initial = state.dashboard_service.snapshot().await;
    stream_from_broadcast(initial, updates, accepts_brotli(&headers))
}

pub async fn post_commentary(
    State(state): State<Arc<AppState>>,
    Json(request): Json<CommentaryRequest>,
) -> impl IntoResponse {
    let commentary = state
        .commentary_service
        .generate_commentary(&request.context, request.event_type.as_deref())
        .await;
    state
        .dashboard_service
        .apply(DashboardCommand::PrependCommentary(commentary.to_item()))
        .await;
    Json(commentary)
}

pub async fn post_stats(
    State(state): State<Arc<AppState>>,
    Json(context): Json<GameContext>,
) -> impl IntoResponse {
    Json(state.commentary_service.generate_key_stats(&context).await)
}

pub async fn post_reconnect(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    match state.manager.reconnect().await {
        Ok(()) => StatusCode::ACCEPTED,
        Err(e) => {
            tracing::error!("Reconnect request failed: {}", e);
            StatusCode::SERVICE_UNAVAILABLE
        }
    }
}

pub async fn delete_reconnect(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    match state.manager.cancel_reconnect().await {
        Ok(()) => StatusCode::ACCEPTED,
        Err(e) => {
            tracing::error!("Cancel reconnect request failed: {}", e);
            StatusCode::SERVICE_UNAVAILABLE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::commentary_service::CommentaryService;
    use crate::application::connection_manager::{ConnectionManager, ManagerSettings};
    use crate::application::dashboard_service::DashboardService;
    use crate::application::live_transport::{LiveSession, LiveTransport, TransportError};
    use crate::domain::connection::ConnectionMode;
    use async_trait::async_trait;
    use serde_json::{json, Value};
    use tokio::sync::mpsc;

    struct Unreachable;

    #[async_trait]
    impl LiveTransport for Unreachable {
        async fn connect(&self) -> Result<Box<dyn LiveSession>, TransportError> {
            Err(TransportError::Connect {
                url: "ws://unreachable".to_string(),
                reason: "refused".to_string(),
            })
        }
    }

    async fn body_json(response: axum::response::Response) -> Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn app_state() -> (Arc<AppState>, tokio::task::JoinHandle<()>) {
        let dashboard_service = DashboardService::new();
        let (tx, rx) = mpsc::channel(64);
        dashboard_service.spawn_projector(rx);
        let manager = ConnectionManager::new(Arc::new(Unreachable), ManagerSettings::default(), tx);
        let (handle, task) = manager.spawn();
        let state = Arc::new(AppState {
            dashboard_service,
            commentary_service: CommentaryService::fallback_only(),
            manager: handle,
        });
        (state, task)
    }

    #[test]
    fn test_commentary_request_flattens_context() {
        let request: CommentaryRequest = serde_json::from_value(json!({
            "ball": { "speed": 150 },
            "gamePhase": "attack",
            "event_type": "PASS"
        }))
        .unwrap();
        assert_eq!(request.context.speed(), 150.0);
        assert_eq!(request.context.phase(), "attack");
        assert_eq!(request.event_type.as_deref(), Some("PASS"));
    }

    #[tokio::test]
    async fn test_status_and_reconnect() {
        let (state, task) = app_state();

        let mut status = state.manager.subscribe();
        status
            .wait_for(|s| s.mode == ConnectionMode::Synthetic)
            .await
            .unwrap();

        let response = get_status(State(state.clone())).await.into_response();
        let body = body_json(response).await;
        assert_eq!(body["mode"], "SYNTHETIC");

        let response = post_reconnect(State(state.clone())).await.into_response();
        assert_eq!(response.status(), StatusCode::ACCEPTED);
        let response = delete_reconnect(State(state.clone())).await.into_response();
        assert_eq!(response.status(), StatusCode::ACCEPTED);

        state.manager.shutdown().await.unwrap();
        task.await.unwrap();
        let response = post_reconnect(State(state.clone())).await.into_response();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn test_commentary_endpoint_uses_fallback_and_feeds_dashboard() {
        let (state, _task) = app_state();
        let request = CommentaryRequest {
            context: serde_json::from_value(json!({ "ball": { "speed": 600 } })).unwrap(),
            event_type: Some("GOAL".to_string()),
        };
        let response = post_commentary(State(state.clone()), Json(request)).await.into_response();
        let body = body_json(response).await;
        assert_eq!(body["intensity"], "high");
        assert_eq!(body["source"], "fallback");

        let view = state.dashboard_service.snapshot().await;
        let item = view
            .commentaries
            .iter()
            .find(|c| c.text == body["text"])
            .expect("generated commentary is on the dashboard");
        assert_eq!(item.intensity.as_str(), "high");
        assert!(item.ts.is_some());
    }

    #[tokio::test]
    async fn test_dashboard_reflects_connection_status() {
        let (state, _task) = app_state();
        let mut status = state.manager.subscribe();
        status
            .wait_for(|s| s.mode == ConnectionMode::Synthetic)
            .await
            .unwrap();

        // the projector trails the watch channel
        let mut view = state.dashboard_service.snapshot().await;
        for _ in 0..50 {
            if view.status.as_ref().map(|s| s.mode) == Some(ConnectionMode::Synthetic) {
                break;
            }
            tokio::task::yield_now().await;
            view = state.dashboard_service.snapshot().await;
        }

        let response = get_dashboard(HeaderMap::new(), State(state)).await.into_response();
        let body = body_json(response).await;
        assert_eq!(body["status"]["mode"], "SYNTHETIC");
        assert_eq!(body["status"]["label"], "Connection Error");
    }
}
