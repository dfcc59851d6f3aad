use axum::{routing::get, Router};
use cutout_core::CutoutConfig;
use cutout_sessions::SessionManager;
use cutout_telegram::TelegramAppContext;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

/// Central shared state, passed as Arc<AppState> to all Axum handlers and
/// to the Telegram adapter.
pub struct AppState {
    pub config: CutoutConfig,
    pub sessions: SessionManager,
}

impl AppState {
    pub fn new(config: CutoutConfig, sessions: SessionManager) -> Self {
        Self { config, sessions }
    }
}

impl TelegramAppContext for AppState {
    fn sessions(&self) -> &SessionManager {
        &self.sessions
    }
}

/// Assemble the full Axum router.
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(crate::http::health::health_handler))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
