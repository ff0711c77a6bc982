//! Reminder endpoints

use axum::{
    extract::{Path, Query, State},
    routing::{get, post},
    Extension, Json, Router,
};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::info;
use vettrack_common::time;

use super::{flexible_i64, non_blank, owned_pet, ApiJson, CurrentSession};
use crate::db::reminders;
use crate::error::{ApiError, ApiResult};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct RemindersQuery {
    pub pet_id: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct AddReminderRequest {
    #[serde(deserialize_with = "flexible_i64")]
    pub pet_id: Option<i64>,
    pub title: Option<String>,
    pub due_date: Option<String>,
}

/// GET /api/get_reminders?pet_id=
///
/// Without `pet_id`, reminders for every pet of the caller.
pub async fn get_reminders(
    State(state): State<AppState>,
    Extension(session): Extension<CurrentSession>,
    Query(query): Query<RemindersQuery>,
) -> ApiResult<Json<Value>> {
    let pet_id = match non_blank(query.pet_id.as_deref()) {
        Some(raw) => {
            let id = raw
                .parse::<i64>()
                .map_err(|_| ApiError::BadRequest("Invalid pet_id".to_string()))?;
            Some(owned_pet(&state.db, session.user_id(), id).await?.id)
        }
        None => None,
    };

    let items = reminders::list_for_user(&state.db, session.user_id(), pet_id).await?;
    Ok(Json(json!({ "success": true, "reminders": items })))
}

/// POST /api/add_reminder
pub async fn add_reminder(
    State(state): State<AppState>,
    Extension(session): Extension<CurrentSession>,
    ApiJson(req): ApiJson<AddReminderRequest>,
) -> ApiResult<Json<Value>> {
    let (Some(pet_id), Some(title), Some(due_date)) = (
        req.pet_id,
        non_blank(req.title.as_deref()),
        non_blank(req.due_date.as_deref()),
    ) else {
        return Err(ApiError::BadRequest(
            "Pet ID, title, and due date are required".to_string(),
        ));
    };

    let due_date = time::parse_user_datetime(due_date)?;
    let pet = owned_pet(&state.db, session.user_id(), pet_id).await?;

    let reminder = reminders::insert_reminder(&state.db, pet.id, title, due_date).await?;
    info!(pet_id = pet.id, reminder_id = reminder.id, "Added reminder");

    Ok(Json(json!({ "success": true, "reminder": reminder })))
}

/// POST /api/complete_reminder/:id
pub async fn complete_reminder(
    State(state): State<AppState>,
    Extension(session): Extension<CurrentSession>,
    Path(reminder_id): Path<i64>,
) -> ApiResult<Json<Value>> {
    let reminder = reminders::get_owned_reminder(&state.db, session.user_id(), reminder_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Reminder not found".to_string()))?;

    reminders::complete_reminder(&state.db, reminder.id, time::now()).await?;
    info!(reminder_id = reminder.id, "Completed reminder");

    Ok(Json(json!({ "success": true })))
}

pub fn reminder_routes() -> Router<AppState> {
    Router::new()
        .route("/api/get_reminders", get(get_reminders))
        .route("/api/add_reminder", post(add_reminder))
        .route("/api/complete_reminder/:id", post(complete_reminder))
}
