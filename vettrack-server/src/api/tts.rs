//! Text-to-speech endpoints

use axum::{extract::State, routing::{get, post}, Json, Router};
use serde::Deserialize;
use serde_json::{json, Value};

use super::{non_blank, ApiJson};
use crate::error::{ApiError, ApiResult};
use crate::services::TtsError;
use crate::AppState;

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct TtsRequest {
    pub text: Option<String>,
    pub voice_id: Option<String>,
    pub format: Option<String>,
}

impl From<TtsError> for ApiError {
    fn from(err: TtsError) -> Self {
        match err {
            TtsError::MissingApiKey => ApiError::Internal(err.to_string()),
            _ => ApiError::BadGateway(err.to_string()),
        }
    }
}

/// POST /api/tts_generate
pub async fn tts_generate(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<TtsRequest>,
) -> ApiResult<Json<Value>> {
    let text = non_blank(req.text.as_deref())
        .ok_or_else(|| ApiError::BadRequest("Text is required".to_string()))?;

    let audio = state
        .tts
        .synthesize(text, req.voice_id.as_deref(), req.format.as_deref())
        .await?;

    Ok(Json(json!({
        "success": true,
        "audio_b64": audio.audio_b64,
        "mime": audio.mime,
    })))
}

/// GET /api/tts_status
pub async fn tts_status(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "success": true,
        "murf_key_present": state.tts.is_configured(),
    }))
}

pub fn tts_routes() -> Router<AppState> {
    Router::new().route("/api/tts_generate", post(tts_generate))
}

pub fn public_tts_routes() -> Router<AppState> {
    Router::new().route("/api/tts_status", get(tts_status))
}
