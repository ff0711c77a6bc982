//! AI symptom checks, photo analysis and diagnosis explanations
//!
//! A successful analysis is stored as exactly one health history entry and
//! announced on the event bus. Analyses without a usable diagnosis are
//! rejected with 400 and leave no trace.

use axum::{
    extract::{Multipart, State},
    routing::post,
    Extension, Json, Router,
};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{info, warn};
use vettrack_common::credentials::sha256_hex;
use vettrack_common::db::{HealthHistoryEntry, PetProfile};
use vettrack_common::events::VetEvent;
use vettrack_common::time;

use super::{flexible_i64, multipart_error, non_blank, owned_pet, ApiJson, CurrentSession};
use crate::db::history::{self, NewHealthEntry};
use crate::db::image_cache;
use crate::error::{ApiError, ApiResult};
use crate::services::{speech, ImageAnalysis};
use crate::AppState;

const DEFAULT_RECOMMENDATION: &str = "Please consult with a veterinarian";
const CACHED_LIKELIHOOD: &str = "Cached Analysis";

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct CheckSymptomsRequest {
    #[serde(deserialize_with = "flexible_i64")]
    pub pet_id: Option<i64>,
    pub symptoms: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ExplanationRequest {
    pub diagnosis: Option<String>,
}

fn empty_analysis_error() -> ApiError {
    ApiError::BadRequest("Empty or invalid AI analysis result".to_string())
}

/// Drop placeholder entries the model emits when it has nothing to say
pub fn clean_diagnosis(diagnosis: Vec<String>) -> Vec<String> {
    diagnosis
        .into_iter()
        .map(|d| d.trim().to_string())
        .filter(|d| {
            let lower = d.to_lowercase();
            !matches!(
                lower.as_str(),
                "" | "unknown" | "unable to analyze symptoms" | "cannot determine"
            )
        })
        .collect()
}

/// First mismatch warning in a diagnosis list, or ""
pub fn warning_item(diagnosis: &[String]) -> &str {
    diagnosis
        .first()
        .filter(|d| d.starts_with('⚠'))
        .map(String::as_str)
        .unwrap_or("")
}

async fn record_entry(
    state: &AppState,
    session: &CurrentSession,
    pet: &PetProfile,
    entry: NewHealthEntry,
) -> ApiResult<HealthHistoryEntry> {
    let stored = history::insert_entry(&state.db, pet.id, &entry, time::now()).await?;

    state.event_bus.emit_lossy(VetEvent::AnalysisRecorded {
        entry_id: stored.id,
        pet_id: pet.id,
        user_id: session.user_id(),
        urgency_level: stored.urgency_level.clone().unwrap_or_default(),
        timestamp: stored.date,
    });

    Ok(stored)
}

/// POST /api/check_symptoms
pub async fn check_symptoms(
    State(state): State<AppState>,
    Extension(session): Extension<CurrentSession>,
    ApiJson(req): ApiJson<CheckSymptomsRequest>,
) -> ApiResult<Json<Value>> {
    let pet_id = req
        .pet_id
        .ok_or_else(|| ApiError::BadRequest("pet_id is required".to_string()))?;
    let symptoms = non_blank(req.symptoms.as_deref())
        .ok_or_else(|| ApiError::BadRequest("Symptoms are required".to_string()))?;

    let pet = owned_pet(&state.db, session.user_id(), pet_id).await?;

    let analysis = state.gemini.analyze_symptoms(&pet, symptoms).await;
    let diagnosis = clean_diagnosis(analysis.diagnosis);
    if diagnosis.is_empty() {
        warn!(pet_id = pet.id, "Empty AI diagnosis, nothing stored");
        return Err(empty_analysis_error());
    }

    let recommendation = match analysis.recommendation.trim() {
        "" => DEFAULT_RECOMMENDATION.to_string(),
        r => r.to_string(),
    };

    let entry = record_entry(
        &state,
        &session,
        &pet,
        NewHealthEntry {
            symptoms: symptoms.to_string(),
            diagnosis: diagnosis.clone(),
            recommendation: Some(recommendation.clone()),
            urgency_level: Some(analysis.urgency_level.clone()),
            possible_causes: analysis.possible_causes.clone(),
        },
    )
    .await?;

    Ok(Json(json!({
        "success": true,
        "entry_id": entry.id,
        "analysis": {
            "diagnosis": diagnosis,
            "urgency_level": analysis.urgency_level,
            "recommendation": recommendation,
            "possible_causes": analysis.possible_causes,
        },
        "announcement": speech::analysis_announcement(&pet.name, &diagnosis, &analysis.urgency_level),
    })))
}

struct ImageUpload {
    file_name: String,
    bytes: Vec<u8>,
}

/// POST /api/upload_image (multipart: `image`, `pet_id`, `description`)
pub async fn upload_image(
    State(state): State<AppState>,
    Extension(session): Extension<CurrentSession>,
    mut multipart: Multipart,
) -> ApiResult<Json<Value>> {
    let mut image: Option<ImageUpload> = None;
    let mut pet_id: Option<i64> = None;
    let mut description = String::new();

    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        let field_name = field.name().unwrap_or_default().to_string();
        match field_name.as_str() {
            "image" => {
                let file_name = field.file_name().unwrap_or_default().to_string();
                let bytes = field.bytes().await.map_err(multipart_error)?;
                image = Some(ImageUpload {
                    file_name,
                    bytes: bytes.to_vec(),
                });
            }
            "pet_id" => {
                let text = field.text().await.map_err(multipart_error)?;
                pet_id = text.trim().parse().ok();
            }
            "description" => {
                description = field.text().await.map_err(multipart_error)?.trim().to_string();
            }
            _ => {}
        }
    }

    let image = image.ok_or_else(|| ApiError::BadRequest("No image file provided".to_string()))?;
    let pet_id = match pet_id {
        Some(id) if !image.file_name.is_empty() && !image.bytes.is_empty() => id,
        _ => return Err(ApiError::BadRequest("File and Pet ID required".to_string())),
    };

    let pet = owned_pet(&state.db, session.user_id(), pet_id).await?;
    let image_hash = sha256_hex(&image.bytes);

    let (analysis, cached) =
        match image_cache::lookup::<ImageAnalysis>(&state.db, pet.id, &image_hash).await? {
            Some(mut hit) => {
                info!(pet_id = pet.id, image_hash = %image_hash, "Reusing cached image analysis");
                hit.condition_likelihood = CACHED_LIKELIHOOD.to_string();
                (hit, true)
            }
            None => {
                let outcome = state.gemini.analyze_image(&pet, &image.bytes, &description).await;
                let mut fresh = outcome.analysis;
                fresh.diagnosis = clean_diagnosis(fresh.diagnosis);
                if fresh.diagnosis.is_empty() {
                    warn!(pet_id = pet.id, "Empty AI image diagnosis, nothing stored");
                    return Err(empty_analysis_error());
                }
                if outcome.from_model {
                    image_cache::store(&state.db, pet.id, &image_hash, &fresh).await?;
                }
                (fresh, false)
            }
        };

    let stored = state.uploads.save(&image.file_name, &image.bytes).await?;

    let symptoms = if description.is_empty() {
        "Image analysis".to_string()
    } else {
        format!("Image analysis: {}", description)
    };

    let entry = record_entry(
        &state,
        &session,
        &pet,
        NewHealthEntry {
            symptoms,
            diagnosis: analysis.diagnosis.clone(),
            recommendation: Some(analysis.recommendation.clone()),
            urgency_level: Some(analysis.urgency_level.clone()),
            possible_causes: analysis.possible_causes.clone(),
        },
    )
    .await?;

    Ok(Json(json!({
        "success": true,
        "cached": cached,
        "entry_id": entry.id,
        "image_url": stored.url,
        "analysis": {
            "diagnosis": analysis.diagnosis,
            "urgency_level": analysis.urgency_level,
            "severity": analysis.urgency_level,
            "possible_causes": analysis.possible_causes,
            "recommendation": analysis.recommendation,
            "condition_likelihood": analysis.condition_likelihood,
            "conditionLikelihood": analysis.condition_likelihood,
            "warningItem": warning_item(&analysis.diagnosis),
        },
        "announcement": speech::analysis_announcement(&pet.name, &analysis.diagnosis, &analysis.urgency_level),
    })))
}

/// POST /api/get_diagnosis_explanation
///
/// Always succeeds for a valid name; model failures yield a canned text.
pub async fn diagnosis_explanation(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<ExplanationRequest>,
) -> ApiResult<Json<Value>> {
    let diagnosis = non_blank(req.diagnosis.as_deref())
        .ok_or_else(|| ApiError::BadRequest("Diagnosis name is required".to_string()))?;

    if diagnosis.to_lowercase().starts_with("warning") || diagnosis.contains('⚠') {
        return Err(ApiError::BadRequest(
            "Cannot explain warning messages".to_string(),
        ));
    }

    let explanation = state.gemini.explain_diagnosis(diagnosis).await;

    Ok(Json(json!({
        "success": true,
        "diagnosis": diagnosis,
        "explanation": explanation,
    })))
}

pub fn diagnosis_routes() -> Router<AppState> {
    Router::new()
        .route("/api/check_symptoms", post(check_symptoms))
        .route("/api/upload_image", post(upload_image))
        .route("/api/get_diagnosis_explanation", post(diagnosis_explanation))
}
