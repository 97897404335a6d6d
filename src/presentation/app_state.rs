// Application state for HTTP handlers
use crate::application::commentary_service::CommentaryService;
use crate::application::connection_manager::ManagerHandle;
use crate::application::dashboard_service::DashboardService;

#[derive(Clone)]
pub struct AppState {
    pub dashboard_service: DashboardService,
    pub commentary_service: CommentaryService,
    pub manager: ManagerHandle,
}
