//! Video consultation endpoints and the notes export

use axum::{
    extract::{Path, State},
    http::header,
    response::{IntoResponse, Response},
    routing::{get, post},
    Extension, Json, Router,
};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::info;
use uuid::Uuid;
use vettrack_common::db::Consultation;
use vettrack_common::time;

use super::{flexible_i64, owned_pet, ApiJson, CurrentSession};
use crate::db::{consultations, history, pets};
use crate::error::{ApiError, ApiResult};
use crate::services::{summary, video};
use crate::AppState;

const RECENT_HISTORY_LIMIT: i64 = 10;
const REJECTED_SUMMARIES: [&str; 1] = ["unable to generate summary at this time"];

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct StartConsultationRequest {
    #[serde(deserialize_with = "flexible_i64")]
    pub pet_id: Option<i64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct SaveNotesRequest {
    #[serde(deserialize_with = "flexible_i64")]
    pub consultation_id: Option<i64>,
    pub notes: Option<String>,
}

/// Consultation owned by the caller; 404 if missing, 403 if someone else's
async fn owned_consultation(
    state: &AppState,
    session: &CurrentSession,
    consultation_id: i64,
) -> ApiResult<Consultation> {
    let consultation = consultations::get_consultation(&state.db, consultation_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Consultation not found".to_string()))?;

    if consultation.user_id != session.user_id() {
        return Err(ApiError::Forbidden(
            "Not authorized to modify this consultation".to_string(),
        ));
    }
    Ok(consultation)
}

/// POST /api/start_consultation
///
/// Ad-hoc room named after the pet and the current time; nothing is stored.
pub async fn start_consultation(
    State(state): State<AppState>,
    Extension(session): Extension<CurrentSession>,
    ApiJson(req): ApiJson<StartConsultationRequest>,
) -> ApiResult<Json<Value>> {
    let pet_id = req
        .pet_id
        .ok_or_else(|| ApiError::BadRequest("Pet ID required".to_string()))?;
    let pet = owned_pet(&state.db, session.user_id(), pet_id).await?;

    let room_id = video::consultation_room_id(pet.id, time::now().timestamp());
    let consultation_url = video::room_url(&state.config.video_base_url, &room_id);
    let recent = history::list_for_pet(&state.db, pet.id, Some(RECENT_HISTORY_LIMIT)).await?;

    info!(pet_id = pet.id, room_id = %room_id, "Started consultation room");

    Ok(Json(json!({
        "success": true,
        "room_id": room_id,
        "consultation_url": consultation_url,
        "pet": {
            "id": pet.id,
            "name": pet.name,
            "species": pet.species,
            "breed": pet.breed,
            "age": pet.age,
            "medical_notes": pet.medical_notes,
        },
        "health_history": recent,
    })))
}

/// POST /api/pet/:id/consultation
///
/// Creates a consultation record (empty summary) with its own room.
pub async fn open_consultation(
    State(state): State<AppState>,
    Extension(session): Extension<CurrentSession>,
    Path(pet_id): Path<i64>,
) -> ApiResult<Json<Value>> {
    let pet = owned_pet(&state.db, session.user_id(), pet_id).await?;

    let room_id = Uuid::new_v4().to_string();
    let consultation = consultations::insert_consultation(
        &state.db,
        pet.id,
        session.user_id(),
        &room_id,
        time::now(),
    )
    .await?;

    info!(pet_id = pet.id, consultation_id = consultation.id, "Opened consultation");

    Ok(Json(json!({
        "success": true,
        "consultation_url": video::room_url(&state.config.video_base_url, &room_id),
        "consultation": consultation,
        "pet": pet,
    })))
}

/// POST /api/save_consultation_notes
pub async fn save_consultation_notes(
    State(state): State<AppState>,
    Extension(session): Extension<CurrentSession>,
    ApiJson(req): ApiJson<SaveNotesRequest>,
) -> ApiResult<Json<Value>> {
    let consultation_id = req
        .consultation_id
        .ok_or_else(|| ApiError::BadRequest("Missing consultation_id".to_string()))?;

    let consultation = owned_consultation(&state, &session, consultation_id).await?;

    let notes = req.notes.as_deref().unwrap_or_default().trim();
    let lowered = notes.to_lowercase();
    if notes.is_empty() || REJECTED_SUMMARIES.contains(&lowered.as_str()) {
        return Err(ApiError::BadRequest(
            "Empty or invalid summary - not saved".to_string(),
        ));
    }

    consultations::update_summary(&state.db, consultation.id, notes).await?;
    info!(consultation_id = consultation.id, "Saved consultation notes");

    Ok(Json(json!({
        "success": true,
        "message": "Summary saved successfully",
    })))
}

/// GET /api/export_summary/:id
pub async fn export_summary(
    State(state): State<AppState>,
    Extension(session): Extension<CurrentSession>,
    Path(consultation_id): Path<i64>,
) -> ApiResult<Response> {
    let consultation = owned_consultation(&state, &session, consultation_id).await?;

    let pet = pets::get_pet(&state.db, consultation.pet_id)
        .await?
        .ok_or_else(ApiError::pet_not_found)?;
    let entries = history::list_for_pet(&state.db, pet.id, None).await?;

    let body = summary::consultation_export(&pet, &consultation, &entries);
    let disposition = format!(
        "attachment; filename=\"{}\"",
        summary::export_file_name(&pet.name)
    );

    Ok((
        [
            (header::CONTENT_TYPE, "text/plain; charset=utf-8".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        body,
    )
        .into_response())
}

pub fn consultation_routes() -> Router<AppState> {
    Router::new()
        .route("/api/start_consultation", post(start_consultation))
        .route("/api/pet/:id/consultation", post(open_consultation))
        .route("/api/save_consultation_notes", post(save_consultation_notes))
        .route("/api/export_summary/:id", get(export_summary))
}
