//! HTTP API handlers
//!
//! JSON in, JSON out. Every success body carries `"success": true`; failures
//! go through [`ApiError`].

pub mod auth;
pub mod consultation;
pub mod diagnosis;
pub mod health;
pub mod history;
pub mod pets;
pub mod reminders;
pub mod sse;
pub mod tts;

pub use auth::{auth_routes, public_auth_routes, require_session, CurrentSession};
pub use consultation::consultation_routes;
pub use diagnosis::diagnosis_routes;
pub use health::health_routes;
pub use history::history_routes;
pub use pets::pet_routes;
pub use reminders::reminder_routes;
pub use sse::event_stream;
pub use tts::{public_tts_routes, tts_routes};

use axum::{
    async_trait,
    extract::{multipart::MultipartError, FromRequest, Request},
    http::StatusCode,
    Json,
};
use serde::{de::DeserializeOwned, Deserialize, Deserializer};
use serde_json::Value;
use sqlx::SqlitePool;
use vettrack_common::db::PetProfile;

use crate::db::pets as pet_db;
use crate::error::{ApiError, ApiResult};

/// `Json` extractor whose rejections use the API error body
pub struct ApiJson<T>(pub T);

#[async_trait]
impl<T, S> FromRequest<S> for ApiJson<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(ApiJson(value)),
            Err(rejection) => Err(ApiError::BadRequest(rejection.body_text())),
        }
    }
}

/// Integer from a JSON number or numeric string
pub(crate) fn value_as_i64(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Deserialize an optional id sent either as a number or a string
///
/// Anything that is not an integer is treated as absent.
pub(crate) fn flexible_i64<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.as_ref().and_then(value_as_i64))
}

/// Trimmed, non-empty text
pub(crate) fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

pub(crate) fn multipart_error(err: MultipartError) -> ApiError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        ApiError::PayloadTooLarge("Uploaded file is too large".to_string())
    } else {
        ApiError::BadRequest(err.body_text())
    }
}

/// Load a pet owned by `user_id` or fail with 404 "Pet not found"
pub(crate) async fn owned_pet(pool: &SqlitePool, user_id: i64, pet_id: i64) -> ApiResult<PetProfile> {
    pet_db::get_owned_pet(pool, user_id, pet_id)
        .await?
        .ok_or_else(ApiError::pet_not_found)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[derive(Debug, Deserialize)]
    struct Body {
        #[serde(default, deserialize_with = "flexible_i64")]
        pet_id: Option<i64>,
    }

    #[test]
    fn test_flexible_id_forms() {
        let parse = |v: Value| serde_json::from_value::<Body>(v).unwrap().pet_id;
        assert_eq!(parse(json!({ "pet_id": 4 })), Some(4));
        assert_eq!(parse(json!({ "pet_id": " 12 " })), Some(12));
        assert_eq!(parse(json!({ "pet_id": "abc" })), None);
        assert_eq!(parse(json!({ "pet_id": null })), None);
        assert_eq!(parse(json!({})), None);
        assert_eq!(parse(json!({ "pet_id": 1.5 })), None);
    }

    #[test]
    fn test_non_blank() {
        assert_eq!(non_blank(Some("  hi ")), Some("hi"));
        assert_eq!(non_blank(Some("   ")), None);
        assert_eq!(non_blank(None), None);
    }
}
