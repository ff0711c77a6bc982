//! Health history queries
//!
//! Entries are ordered newest first by date, with id as the tie-breaker so
//! entries written within the same microsecond keep insertion order.

use chrono::{DateTime, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};
use vettrack_common::db::{decode_string_list, encode_string_list, HealthHistoryEntry};
use vettrack_common::{time, Result};

use super::get_timestamp;

/// Fields of a history entry about to be stored
#[derive(Debug, Clone, PartialEq)]
pub struct NewHealthEntry {
    pub symptoms: String,
    pub diagnosis: Vec<String>,
    pub recommendation: Option<String>,
    pub urgency_level: Option<String>,
    pub possible_causes: Vec<String>,
}

/// History entry joined with the pet's name (dashboard rows)
#[derive(Debug, Clone)]
pub struct NamedHealthEntry {
    pub entry: HealthHistoryEntry,
    pub pet_name: String,
}

const ENTRY_COLUMNS: &str =
    "h.id, h.pet_id, h.date, h.symptoms, h.diagnosis, h.recommendation, h.urgency_level, h.possible_causes";

fn entry_from_row(row: &SqliteRow) -> Result<HealthHistoryEntry> {
    let diagnosis: Option<String> = row.try_get("diagnosis")?;
    let possible_causes: Option<String> = row.try_get("possible_causes")?;

    Ok(HealthHistoryEntry {
        id: row.try_get("id")?,
        pet_id: row.try_get("pet_id")?,
        date: get_timestamp(row, "date")?,
        symptoms: row.try_get("symptoms")?,
        diagnosis: decode_string_list(diagnosis.as_deref()),
        recommendation: row.try_get("recommendation")?,
        urgency_level: row.try_get("urgency_level")?,
        possible_causes: decode_string_list(possible_causes.as_deref()),
    })
}

pub async fn insert_entry(
    pool: &SqlitePool,
    pet_id: i64,
    entry: &NewHealthEntry,
    date: DateTime<Utc>,
) -> Result<HealthHistoryEntry> {
    let possible_causes = if entry.possible_causes.is_empty() {
        None
    } else {
        Some(encode_string_list(&entry.possible_causes))
    };

    let id = sqlx::query(
        r#"
        INSERT INTO health_history
            (pet_id, date, symptoms, diagnosis, recommendation, urgency_level, possible_causes)
        VALUES (?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(pet_id)
    .bind(time::to_db(&date))
    .bind(&entry.symptoms)
    .bind(encode_string_list(&entry.diagnosis))
    .bind(&entry.recommendation)
    .bind(&entry.urgency_level)
    .bind(possible_causes)
    .execute(pool)
    .await?
    .last_insert_rowid();

    tracing::info!(pet_id, entry_id = id, "Stored health history entry");

    Ok(HealthHistoryEntry {
        id,
        pet_id,
        date,
        symptoms: entry.symptoms.clone(),
        diagnosis: entry.diagnosis.clone(),
        recommendation: entry.recommendation.clone(),
        urgency_level: entry.urgency_level.clone(),
        possible_causes: entry.possible_causes.clone(),
    })
}

/// Entries for one pet, newest first, optionally limited
pub async fn list_for_pet(
    pool: &SqlitePool,
    pet_id: i64,
    limit: Option<i64>,
) -> Result<Vec<HealthHistoryEntry>> {
    // SQLite treats a negative LIMIT as "no limit"
    let limit = limit.unwrap_or(-1);
    let sql = format!(
        "SELECT {} FROM health_history h WHERE h.pet_id = ? ORDER BY h.date DESC, h.id DESC LIMIT ?",
        ENTRY_COLUMNS
    );

    let rows = sqlx::query(&sql)
        .bind(pet_id)
        .bind(limit)
        .fetch_all(pool)
        .await?;

    rows.iter().map(entry_from_row).collect()
}

/// Entries across every pet of `user_id`, newest first
pub async fn list_for_user(pool: &SqlitePool, user_id: i64) -> Result<Vec<HealthHistoryEntry>> {
    let sql = format!(
        "SELECT {} FROM health_history h JOIN pets p ON p.id = h.pet_id
         WHERE p.user_id = ? ORDER BY h.date DESC, h.id DESC",
        ENTRY_COLUMNS
    );

    let rows = sqlx::query(&sql).bind(user_id).fetch_all(pool).await?;
    rows.iter().map(entry_from_row).collect()
}

pub async fn count_for_user(pool: &SqlitePool, user_id: i64) -> Result<i64> {
    let count = sqlx::query_scalar(
        "SELECT COUNT(*) FROM health_history h JOIN pets p ON p.id = h.pet_id WHERE p.user_id = ?",
    )
    .bind(user_id)
    .fetch_one(pool)
    .await?;
    Ok(count)
}

/// One dashboard page: most recently created entries first
pub async fn page_for_user(
    pool: &SqlitePool,
    user_id: i64,
    limit: i64,
    offset: i64,
) -> Result<Vec<NamedHealthEntry>> {
    let sql = format!(
        "SELECT {}, p.name AS pet_name FROM health_history h JOIN pets p ON p.id = h.pet_id
         WHERE p.user_id = ? ORDER BY h.id DESC, h.date DESC LIMIT ? OFFSET ?",
        ENTRY_COLUMNS
    );

    let rows = sqlx::query(&sql)
        .bind(user_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(pool)
        .await?;

    rows.iter()
        .map(|row| {
            Ok(NamedHealthEntry {
                entry: entry_from_row(row)?,
                pet_name: row.try_get("pet_name")?,
            })
        })
        .collect()
}
