use crate::event_log::EventLog;
use crate::handlers;
use crate::uploads::UploadStore;

use axum::extract::DefaultBodyLimit;
use axum::routing::{get, get_service, post};
use axum::Router;
use provider_client::{ChatModel, SpeechToText, VisionModel};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeFile;
use tower_http::trace::TraceLayer;

/// Shared by every handler. Cloning is cheap: everything sits behind an `Arc`.
#[derive(Clone)]
pub struct AppState {
    pub chat: Arc<dyn ChatModel>,
    pub transcriber: Arc<dyn SpeechToText>,
    pub vision: Arc<dyn VisionModel>,
    pub events: EventLog,
    pub uploads: UploadStore,
    /// Bounds outbound provider calls across all routes.
    pub provider_permits: Arc<Semaphore>,
    pub static_dir: PathBuf,
    pub max_upload_bytes: usize,
}

pub fn build_router(state: AppState) -> Router {
    let index = ServeFile::new(state.static_dir.join("index.html"));
    let max_upload_bytes = state.max_upload_bytes;

    Router::new()
        .route("/", get_service(index))
        .route("/health", get(handlers::health))
        .route("/chat", post(handlers::chat))
        .route("/transcribe", post(handlers::transcribe))
        .route("/detect_pest", post(handlers::detect_pest))
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
