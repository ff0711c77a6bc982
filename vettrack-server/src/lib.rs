//! vettrack-server library interface
//!
//! Exposes the router and application state for the binary and for
//! integration tests.

pub mod api;
pub mod db;
pub mod error;
pub mod pagination;
pub mod services;

pub use crate::error::{ApiError, ApiResult};

use axum::{extract::DefaultBodyLimit, middleware, routing::get, Router};
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, services::ServeDir, trace::TraceLayer};
use vettrack_common::config::ServiceConfig;
use vettrack_common::events::EventBus;

use crate::services::{GeminiClient, TtsClient, UploadStore};

/// Broadcast capacity of the event bus
pub const EVENT_BUS_CAPACITY: usize = 100;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool
    pub db: SqlitePool,
    pub config: Arc<ServiceConfig>,
    /// Event bus for SSE broadcasting
    pub event_bus: EventBus,
    pub gemini: Arc<GeminiClient>,
    pub tts: Arc<TtsClient>,
    /// Stored pet pictures and analyzed images
    pub uploads: UploadStore,
    /// Service startup timestamp for uptime tracking
    pub startup_time: DateTime<Utc>,
}

impl AppState {
    pub fn new(db: SqlitePool, config: ServiceConfig) -> vettrack_common::Result<Self> {
        let gemini = GeminiClient::new(&config.gemini)
            .map_err(|e| vettrack_common::Error::Config(format!("Gemini client: {}", e)))?;
        let tts = TtsClient::new(&config.murf)
            .map_err(|e| vettrack_common::Error::Config(format!("Murf client: {}", e)))?;
        let uploads = UploadStore::new(config.uploads_dir());

        Ok(Self {
            db,
            config: Arc::new(config),
            event_bus: EventBus::new(EVENT_BUS_CAPACITY),
            gemini: Arc::new(gemini),
            tts: Arc::new(tts),
            uploads,
            startup_time: Utc::now(),
        })
    }
}

/// Build application router
///
/// Everything under `/api` except signup, login and tts_status needs a
/// session; `/health` and `/uploads` are public.
pub fn build_router(state: AppState) -> Router {
    let protected = Router::new()
        .merge(api::auth_routes())
        .merge(api::pet_routes())
        .merge(api::history_routes())
        .merge(api::diagnosis_routes())
        .merge(api::tts_routes())
        .merge(api::consultation_routes())
        .merge(api::reminder_routes())
        .route("/api/events", get(api::event_stream))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            api::require_session,
        ));

    let public = Router::new()
        .merge(api::health_routes())
        .merge(api::public_auth_routes())
        .merge(api::public_tts_routes())
        .nest_service("/uploads", ServeDir::new(state.uploads.dir()));

    let body_limit = state.config.max_upload_bytes;

    Router::new()
        .merge(protected)
        .merge(public)
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
