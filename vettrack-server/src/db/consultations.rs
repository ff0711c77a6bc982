//! Consultation record queries

use chrono::{DateTime, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};
use vettrack_common::db::Consultation;
use vettrack_common::{time, Result};

use super::get_timestamp;

fn consultation_from_row(row: &SqliteRow) -> Result<Consultation> {
    Ok(Consultation {
        id: row.try_get("id")?,
        pet_id: row.try_get("pet_id")?,
        user_id: row.try_get("user_id")?,
        date: get_timestamp(row, "date")?,
        summary: row.try_get("summary")?,
        room_id: row.try_get("room_id")?,
    })
}

/// Open a consultation with an empty summary
pub async fn insert_consultation(
    pool: &SqlitePool,
    pet_id: i64,
    user_id: i64,
    room_id: &str,
    date: DateTime<Utc>,
) -> Result<Consultation> {
    let id = sqlx::query(
        "INSERT INTO consultations (pet_id, user_id, date, summary, room_id) VALUES (?, ?, ?, '', ?)",
    )
    .bind(pet_id)
    .bind(user_id)
    .bind(time::to_db(&date))
    .bind(room_id)
    .execute(pool)
    .await?
    .last_insert_rowid();

    Ok(Consultation {
        id,
        pet_id,
        user_id,
        date,
        summary: String::new(),
        room_id: room_id.to_string(),
    })
}

pub async fn get_consultation(pool: &SqlitePool, id: i64) -> Result<Option<Consultation>> {
    let row = sqlx::query(
        "SELECT id, pet_id, user_id, date, summary, room_id FROM consultations WHERE id = ?",
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;

    row.as_ref().map(consultation_from_row).transpose()
}

pub async fn list_for_pet(pool: &SqlitePool, pet_id: i64) -> Result<Vec<Consultation>> {
    let rows = sqlx::query(
        "SELECT id, pet_id, user_id, date, summary, room_id FROM consultations
         WHERE pet_id = ? ORDER BY date DESC, id DESC",
    )
    .bind(pet_id)
    .fetch_all(pool)
    .await?;

    rows.iter().map(consultation_from_row).collect()
}

pub async fn update_summary(pool: &SqlitePool, id: i64, summary: &str) -> Result<()> {
    sqlx::query("UPDATE consultations SET summary = ? WHERE id = ?")
        .bind(summary)
        .bind(id)
        .execute(pool)
        .await?;
    Ok(())
}
