//! Reminder queries

use chrono::{DateTime, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};
use vettrack_common::db::Reminder;
use vettrack_common::{time, Result};

use super::{get_optional_timestamp, get_timestamp};

/// Overdue reminder with the context needed for a notification
#[derive(Debug, Clone)]
pub struct DueReminder {
    pub reminder: Reminder,
    pub user_id: i64,
    pub pet_name: String,
}

const REMINDER_COLUMNS: &str =
    "r.id, r.pet_id, r.title, r.due_date, r.completed, r.completed_date, r.created_at";

fn reminder_from_row(row: &SqliteRow) -> Result<Reminder> {
    Ok(Reminder {
        id: row.try_get("id")?,
        pet_id: row.try_get("pet_id")?,
        title: row.try_get("title")?,
        due_date: get_timestamp(row, "due_date")?,
        completed: row.try_get::<i64, _>("completed")? != 0,
        completed_date: get_optional_timestamp(row, "completed_date")?,
        created_at: get_timestamp(row, "created_at")?,
    })
}

pub async fn insert_reminder(
    pool: &SqlitePool,
    pet_id: i64,
    title: &str,
    due_date: DateTime<Utc>,
) -> Result<Reminder> {
    let now = time::now();

    let id = sqlx::query(
        "INSERT INTO reminders (pet_id, title, due_date, completed, created_at) VALUES (?, ?, ?, 0, ?)",
    )
    .bind(pet_id)
    .bind(title)
    .bind(time::to_db(&due_date))
    .bind(time::to_db(&now))
    .execute(pool)
    .await?
    .last_insert_rowid();

    Ok(Reminder {
        id,
        pet_id,
        title: title.to_string(),
        due_date,
        completed: false,
        completed_date: None,
        created_at: now,
    })
}

/// Reminders of `user_id`, optionally restricted to one pet, soonest first
pub async fn list_for_user(
    pool: &SqlitePool,
    user_id: i64,
    pet_id: Option<i64>,
) -> Result<Vec<Reminder>> {
    let sql = format!(
        "SELECT {} FROM reminders r JOIN pets p ON p.id = r.pet_id
         WHERE p.user_id = ? AND (? IS NULL OR r.pet_id = ?)
         ORDER BY r.due_date ASC, r.id ASC",
        REMINDER_COLUMNS
    );

    let rows = sqlx::query(&sql)
        .bind(user_id)
        .bind(pet_id)
        .bind(pet_id)
        .fetch_all(pool)
        .await?;

    rows.iter().map(reminder_from_row).collect()
}

pub async fn list_for_pet(pool: &SqlitePool, pet_id: i64) -> Result<Vec<Reminder>> {
    let sql = format!(
        "SELECT {} FROM reminders r WHERE r.pet_id = ? ORDER BY r.due_date ASC, r.id ASC",
        REMINDER_COLUMNS
    );
    let rows = sqlx::query(&sql).bind(pet_id).fetch_all(pool).await?;
    rows.iter().map(reminder_from_row).collect()
}

/// Load a reminder only if its pet belongs to `user_id`
pub async fn get_owned_reminder(
    pool: &SqlitePool,
    user_id: i64,
    reminder_id: i64,
) -> Result<Option<Reminder>> {
    let sql = format!(
        "SELECT {} FROM reminders r JOIN pets p ON p.id = r.pet_id WHERE r.id = ? AND p.user_id = ?",
        REMINDER_COLUMNS
    );
    let row = sqlx::query(&sql)
        .bind(reminder_id)
        .bind(user_id)
        .fetch_optional(pool)
        .await?;

    row.as_ref().map(reminder_from_row).transpose()
}

/// Mark a reminder completed; an earlier completion date is kept
pub async fn complete_reminder(
    pool: &SqlitePool,
    reminder_id: i64,
    now: DateTime<Utc>,
) -> Result<()> {
    sqlx::query(
        "UPDATE reminders SET completed = 1, completed_date = COALESCE(completed_date, ?) WHERE id = ?",
    )
    .bind(time::to_db(&now))
    .bind(reminder_id)
    .execute(pool)
    .await?;
    Ok(())
}

/// Incomplete reminders due at or before `now` that have not been announced
pub async fn due_unnotified(pool: &SqlitePool, now: DateTime<Utc>) -> Result<Vec<DueReminder>> {
    let sql = format!(
        "SELECT {}, p.user_id AS owner_id, p.name AS pet_name
         FROM reminders r JOIN pets p ON p.id = r.pet_id
         WHERE r.completed = 0 AND r.notified_at IS NULL AND r.due_date <= ?
         ORDER BY r.due_date ASC, r.id ASC",
        REMINDER_COLUMNS
    );

    let rows = sqlx::query(&sql)
        .bind(time::to_db(&now))
        .fetch_all(pool)
        .await?;

    rows.iter()
        .map(|row| {
            Ok(DueReminder {
                reminder: reminder_from_row(row)?,
                user_id: row.try_get("owner_id")?,
                pet_name: row.try_get("pet_name")?,
            })
        })
        .collect()
}

pub async fn mark_notified(pool: &SqlitePool, reminder_id: i64, now: DateTime<Utc>) -> Result<()> {
    sqlx::query("UPDATE reminders SET notified_at = ? WHERE id = ?")
        .bind(time::to_db(&now))
        .bind(reminder_id)
        .execute(pool)
        .await?;
    Ok(())
}
