//! Pet profile queries
//!
//! Lookups are always scoped to the owning user; a pet belonging to someone
//! else is indistinguishable from a missing one.

use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};
use vettrack_common::db::PetProfile;
use vettrack_common::{time, Result};

use super::get_timestamp;

/// Validated fields for a new pet
#[derive(Debug, Clone)]
pub struct NewPet {
    pub name: String,
    pub species: String,
    pub breed: String,
    pub age: i64,
    pub medical_notes: Option<String>,
    pub profile_picture: Option<String>,
}

fn pet_from_row(row: &SqliteRow) -> Result<PetProfile> {
    Ok(PetProfile {
        id: row.try_get("id")?,
        user_id: row.try_get("user_id")?,
        name: row.try_get("name")?,
        species: row.try_get("species")?,
        breed: row.try_get("breed")?,
        age: row.try_get("age")?,
        medical_notes: row.try_get("medical_notes")?,
        profile_picture: row.try_get("profile_picture")?,
        created_at: get_timestamp(row, "created_at")?,
    })
}

pub async fn insert_pet(pool: &SqlitePool, user_id: i64, pet: &NewPet) -> Result<PetProfile> {
    let now = time::now();

    let id = sqlx::query(
        r#"
        INSERT INTO pets (user_id, name, species, breed, age, medical_notes, profile_picture, created_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(user_id)
    .bind(&pet.name)
    .bind(&pet.species)
    .bind(&pet.breed)
    .bind(pet.age)
    .bind(&pet.medical_notes)
    .bind(&pet.profile_picture)
    .bind(time::to_db(&now))
    .execute(pool)
    .await?
    .last_insert_rowid();

    Ok(PetProfile {
        id,
        user_id,
        name: pet.name.clone(),
        species: pet.species.clone(),
        breed: pet.breed.clone(),
        age: pet.age,
        medical_notes: pet.medical_notes.clone(),
        profile_picture: pet.profile_picture.clone(),
        created_at: now,
    })
}

/// All pets owned by `user_id`, oldest first
pub async fn list_pets(pool: &SqlitePool, user_id: i64) -> Result<Vec<PetProfile>> {
    let rows = sqlx::query(
        "SELECT id, user_id, name, species, breed, age, medical_notes, profile_picture, created_at
         FROM pets WHERE user_id = ? ORDER BY id ASC",
    )
    .bind(user_id)
    .fetch_all(pool)
    .await?;

    rows.iter().map(pet_from_row).collect()
}

/// Load a pet only if `user_id` owns it
pub async fn get_owned_pet(
    pool: &SqlitePool,
    user_id: i64,
    pet_id: i64,
) -> Result<Option<PetProfile>> {
    let row = sqlx::query(
        "SELECT id, user_id, name, species, breed, age, medical_notes, profile_picture, created_at
         FROM pets WHERE id = ? AND user_id = ?",
    )
    .bind(pet_id)
    .bind(user_id)
    .fetch_optional(pool)
    .await?;

    row.as_ref().map(pet_from_row).transpose()
}

/// Load a pet regardless of owner
pub async fn get_pet(pool: &SqlitePool, pet_id: i64) -> Result<Option<PetProfile>> {
    let row = sqlx::query(
        "SELECT id, user_id, name, species, breed, age, medical_notes, profile_picture, created_at
         FROM pets WHERE id = ?",
    )
    .bind(pet_id)
    .fetch_optional(pool)
    .await?;

    row.as_ref().map(pet_from_row).transpose()
}
