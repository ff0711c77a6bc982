//! Database access for the service
//!
//! One module per table. Timestamps go through `vettrack_common::time` so the
//! stored text always sorts chronologically.

pub mod consultations;
pub mod history;
pub mod image_cache;
pub mod pets;
pub mod reminders;
pub mod sessions;
pub mod users;

use sqlx::sqlite::SqliteRow;
use sqlx::Row;
use vettrack_common::time;
use vettrack_common::Result;

pub(crate) fn get_timestamp(row: &SqliteRow, column: &str) -> Result<chrono::DateTime<chrono::Utc>> {
    let raw: String = row.try_get(column)?;
    time::from_db(&raw)
}

pub(crate) fn get_optional_timestamp(
    row: &SqliteRow,
    column: &str,
) -> Result<Option<chrono::DateTime<chrono::Utc>>> {
    let raw: Option<String> = row.try_get(column)?;
    raw.as_deref().map(time::from_db).transpose()
}
