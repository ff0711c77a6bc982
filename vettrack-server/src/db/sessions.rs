//! Login session persistence
//!
//! Sessions are opaque random tokens with an absolute expiry. The welcome
//! flag drives the one-shot spoken greeting after login.

use chrono::{DateTime, Duration, Utc};
use sqlx::{Row, SqlitePool};
use vettrack_common::credentials::generate_session_token;
use vettrack_common::db::User;
use vettrack_common::{time, Error, Result};

use super::get_timestamp;

#[derive(Debug, Clone)]
pub struct SessionRecord {
    pub token: String,
    pub user_id: i64,
    pub expires_at: DateTime<Utc>,
    pub welcome_pending: bool,
}

/// Create a session for `user_id` valid for `timeout_seconds`
pub async fn create_session(
    pool: &SqlitePool,
    user_id: i64,
    timeout_seconds: i64,
) -> Result<SessionRecord> {
    let now = time::now();
    let expires_at = Duration::try_seconds(timeout_seconds)
        .and_then(|timeout| now.checked_add_signed(timeout))
        .ok_or_else(|| {
            Error::InvalidInput(format!("Session timeout out of range: {}s", timeout_seconds))
        })?;
    let token = generate_session_token();

    sqlx::query(
        r#"
        INSERT INTO sessions (token, user_id, created_at, expires_at, welcome_pending)
        VALUES (?, ?, ?, ?, 1)
        "#,
    )
    .bind(&token)
    .bind(user_id)
    .bind(time::to_db(&now))
    .bind(time::to_db(&expires_at))
    .execute(pool)
    .await?;

    Ok(SessionRecord {
        token,
        user_id,
        expires_at,
        welcome_pending: true,
    })
}

/// Resolve a token to its session and user
///
/// Expired sessions are deleted and reported as absent.
pub async fn find_active_session(
    pool: &SqlitePool,
    token: &str,
    now: DateTime<Utc>,
) -> Result<Option<(SessionRecord, User)>> {
    let row = sqlx::query(
        r#"
        SELECT s.token, s.user_id, s.expires_at, s.welcome_pending,
               u.id, u.full_name, u.email, u.created_at
        FROM sessions s
        JOIN users u ON u.id = s.user_id
        WHERE s.token = ?
        "#,
    )
    .bind(token)
    .fetch_optional(pool)
    .await?;

    let Some(row) = row else {
        return Ok(None);
    };

    let session = SessionRecord {
        token: row.try_get("token")?,
        user_id: row.try_get("user_id")?,
        expires_at: get_timestamp(&row, "expires_at")?,
        welcome_pending: row.try_get::<i64, _>("welcome_pending")? != 0,
    };

    if session.expires_at <= now {
        tracing::debug!(user_id = session.user_id, "Session expired");
        delete_session(pool, token).await?;
        return Ok(None);
    }

    let user = User {
        id: row.try_get("id")?,
        full_name: row.try_get("full_name")?,
        email: row.try_get("email")?,
        created_at: get_timestamp(&row, "created_at")?,
    };

    Ok(Some((session, user)))
}

pub async fn delete_session(pool: &SqlitePool, token: &str) -> Result<()> {
    sqlx::query("DELETE FROM sessions WHERE token = ?")
        .bind(token)
        .execute(pool)
        .await?;
    Ok(())
}

/// Mark the welcome greeting as delivered
pub async fn clear_welcome(pool: &SqlitePool, token: &str) -> Result<()> {
    sqlx::query("UPDATE sessions SET welcome_pending = 0 WHERE token = ?")
        .bind(token)
        .execute(pool)
        .await?;
    Ok(())
}

/// Delete every session that expired before `now`
pub async fn purge_expired(pool: &SqlitePool, now: DateTime<Utc>) -> Result<u64> {
    let result = sqlx::query("DELETE FROM sessions WHERE expires_at <= ?")
        .bind(time::to_db(&now))
        .execute(pool)
        .await?;
    Ok(result.rows_affected())
}
