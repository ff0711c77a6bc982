//! Image analysis cache
//!
//! Re-uploading identical bytes for the same pet reuses the stored analysis
//! instead of calling the model again.

use serde::{de::DeserializeOwned, Serialize};
use sqlx::SqlitePool;
use vettrack_common::{time, Error, Result};

/// Look up a cached analysis by pet and image hash
///
/// A row that no longer deserializes is treated as a miss.
pub async fn lookup<T: DeserializeOwned>(
    pool: &SqlitePool,
    pet_id: i64,
    image_hash: &str,
) -> Result<Option<T>> {
    let raw: Option<String> = sqlx::query_scalar(
        "SELECT analysis FROM image_analysis_cache WHERE pet_id = ? AND image_hash = ?",
    )
    .bind(pet_id)
    .bind(image_hash)
    .fetch_optional(pool)
    .await?;

    Ok(raw.and_then(|raw| match serde_json::from_str(&raw) {
        Ok(analysis) => Some(analysis),
        Err(e) => {
            tracing::warn!(pet_id, image_hash, "Discarding unreadable cache entry: {}", e);
            None
        }
    }))
}

/// Store (or replace) the analysis for an image
pub async fn store<T: Serialize>(
    pool: &SqlitePool,
    pet_id: i64,
    image_hash: &str,
    analysis: &T,
) -> Result<()> {
    let json = serde_json::to_string(analysis)
        .map_err(|e| Error::Internal(format!("Failed to serialize analysis: {}", e)))?;

    sqlx::query(
        r#"
        INSERT INTO image_analysis_cache (pet_id, image_hash, analysis, created_at)
        VALUES (?, ?, ?, ?)
        ON CONFLICT(pet_id, image_hash) DO UPDATE SET
            analysis = excluded.analysis,
            created_at = excluded.created_at
        "#,
    )
    .bind(pet_id)
    .bind(image_hash)
    .bind(json)
    .bind(time::to_db(&time::now()))
    .execute(pool)
    .await?;

    tracing::info!(pet_id, image_hash, "Cached image analysis");
    Ok(())
}
