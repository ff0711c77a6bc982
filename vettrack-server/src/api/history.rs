//! Health history, dashboard and timeline endpoints

use axum::{
    extract::{Path, Query, State},
    routing::get,
    Extension, Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use vettrack_common::db::HealthHistoryEntry;
use vettrack_common::time;

use super::{owned_pet, CurrentSession};
use crate::db::{consultations, history, pets, reminders};
use crate::error::{ApiError, ApiResult};
use crate::pagination::{calculate_pagination, DASHBOARD_PAGE_SIZE};
use crate::services::timeline::build_timeline;
use crate::AppState;

const DEFAULT_RECENT_LIMIT: i64 = 5;
const MAX_RECENT_LIMIT: i64 = 100;

#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    pub pet_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct RecentQuery {
    pub limit: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct DashboardQuery {
    pub page: Option<String>,
}

/// History row with the owning pet's name
#[derive(Debug, Serialize)]
struct DashboardEntry<'a> {
    #[serde(flatten)]
    entry: &'a HealthHistoryEntry,
    pet_name: &'a str,
}

fn parse_number(raw: Option<&str>) -> Option<i64> {
    raw.and_then(|v| v.trim().parse().ok())
}

/// GET /api/get_history?pet_id=
pub async fn get_history(
    State(state): State<AppState>,
    Extension(session): Extension<CurrentSession>,
    Query(query): Query<HistoryQuery>,
) -> ApiResult<Json<Value>> {
    let pet_id = parse_number(query.pet_id.as_deref())
        .ok_or_else(|| ApiError::BadRequest("pet_id is required".to_string()))?;

    let pet = owned_pet(&state.db, session.user_id(), pet_id).await?;
    let entries = history::list_for_pet(&state.db, pet.id, None).await?;

    Ok(Json(json!({ "success": true, "history": entries })))
}

/// GET /api/pet/:id/recent-history?limit=5
pub async fn recent_history(
    State(state): State<AppState>,
    Extension(session): Extension<CurrentSession>,
    Path(pet_id): Path<i64>,
    Query(query): Query<RecentQuery>,
) -> ApiResult<Json<Value>> {
    let limit = parse_number(query.limit.as_deref())
        .unwrap_or(DEFAULT_RECENT_LIMIT)
        .clamp(1, MAX_RECENT_LIMIT);

    let pet = owned_pet(&state.db, session.user_id(), pet_id).await?;
    let entries = history::list_for_pet(&state.db, pet.id, Some(limit)).await?;

    Ok(Json(json!({ "success": true, "health_history": entries })))
}

/// GET /api/get_health_history
pub async fn all_history(
    State(state): State<AppState>,
    Extension(session): Extension<CurrentSession>,
) -> ApiResult<Json<Value>> {
    let entries = history::list_for_user(&state.db, session.user_id()).await?;
    Ok(Json(json!({ "success": true, "health_history": entries })))
}

/// GET /api/dashboard?page=N
pub async fn dashboard(
    State(state): State<AppState>,
    Extension(session): Extension<CurrentSession>,
    Query(query): Query<DashboardQuery>,
) -> ApiResult<Json<Value>> {
    let user_id = session.user_id();
    let requested_page = parse_number(query.page.as_deref()).unwrap_or(1);

    let pets = pets::list_pets(&state.db, user_id).await?;
    let total = history::count_for_user(&state.db, user_id).await?;
    let pagination = calculate_pagination(total, requested_page, DASHBOARD_PAGE_SIZE);

    let rows = history::page_for_user(&state.db, user_id, pagination.per_page, pagination.offset).await?;
    let entries: Vec<DashboardEntry<'_>> = rows
        .iter()
        .map(|row| DashboardEntry {
            entry: &row.entry,
            pet_name: &row.pet_name,
        })
        .collect();

    Ok(Json(json!({
        "success": true,
        "user": session.user,
        "pets": pets,
        "health_history": entries,
        "pagination": pagination,
    })))
}

/// GET /api/pet/:id/full-history
pub async fn full_history(
    State(state): State<AppState>,
    Extension(session): Extension<CurrentSession>,
    Path(pet_id): Path<i64>,
) -> ApiResult<Json<Value>> {
    let pet = owned_pet(&state.db, session.user_id(), pet_id).await?;

    let entries = history::list_for_pet(&state.db, pet.id, None).await?;
    let consults = consultations::list_for_pet(&state.db, pet.id).await?;
    let due = reminders::list_for_pet(&state.db, pet.id).await?;

    let timeline = build_timeline(time::now(), &entries, &consults, &due);

    Ok(Json(json!({
        "success": true,
        "pet": {
            "id": pet.id,
            "name": pet.name,
            "species": pet.species,
            "breed": pet.breed,
            "age": pet.age,
        },
        "timeline": timeline,
    })))
}

pub fn history_routes() -> Router<AppState> {
    Router::new()
        .route("/api/get_history", get(get_history))
        .route("/api/pet/:id/recent-history", get(recent_history))
        .route("/api/get_health_history", get(all_history))
        .route("/api/dashboard", get(dashboard))
        .route("/api/pet/:id/full-history", get(full_history))
}
