//! User account queries

use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};
use vettrack_common::credentials::PasswordHash;
use vettrack_common::db::User;
use vettrack_common::{time, Error, Result};

use super::get_timestamp;

/// User with the stored password digest, for login checks only
#[derive(Debug, Clone)]
pub struct UserCredentials {
    pub user: User,
    pub password_hash: String,
    pub password_salt: String,
}

fn user_from_row(row: &SqliteRow) -> Result<User> {
    Ok(User {
        id: row.try_get("id")?,
        full_name: row.try_get("full_name")?,
        email: row.try_get("email")?,
        created_at: get_timestamp(row, "created_at")?,
    })
}

/// Insert a new user
///
/// Returns `Error::InvalidInput("Email already registered")` when the email is
/// taken, including when a concurrent signup wins the race.
pub async fn create_user(
    pool: &SqlitePool,
    full_name: &str,
    email: &str,
    password: &PasswordHash,
) -> Result<User> {
    let now = time::now();

    let result = sqlx::query(
        r#"
        INSERT INTO users (full_name, email, password_hash, password_salt, created_at)
        VALUES (?, ?, ?, ?, ?)
        "#,
    )
    .bind(full_name)
    .bind(email)
    .bind(&password.hash)
    .bind(&password.salt)
    .bind(time::to_db(&now))
    .execute(pool)
    .await;

    match result {
        Ok(done) => Ok(User {
            id: done.last_insert_rowid(),
            full_name: full_name.to_string(),
            email: email.to_string(),
            created_at: now,
        }),
        Err(sqlx::Error::Database(db_err)) if db_err.is_unique_violation() => {
            Err(Error::InvalidInput("Email already registered".to_string()))
        }
        Err(e) => Err(e.into()),
    }
}

/// Whether an account exists for `email`
pub async fn email_exists(pool: &SqlitePool, email: &str) -> Result<bool> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users WHERE email = ?")
        .bind(email)
        .fetch_one(pool)
        .await?;
    Ok(count > 0)
}

/// Load a user and password digest by email
pub async fn find_credentials(pool: &SqlitePool, email: &str) -> Result<Option<UserCredentials>> {
    let row = sqlx::query(
        "SELECT id, full_name, email, created_at, password_hash, password_salt
         FROM users WHERE email = ?",
    )
    .bind(email)
    .fetch_optional(pool)
    .await?;

    row.map(|row| {
        Ok(UserCredentials {
            user: user_from_row(&row)?,
            password_hash: row.try_get("password_hash")?,
            password_salt: row.try_get("password_salt")?,
        })
    })
    .transpose()
}

