//! Pet profile endpoints

use axum::{
    extract::{FromRequest, Multipart, Request, State},
    http::header,
    routing::{get, post},
    Extension, Json, Router,
};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::info;

use super::{multipart_error, non_blank, value_as_i64, ApiJson, CurrentSession};
use crate::db::pets::{self as pet_db, NewPet};
use crate::error::{ApiError, ApiResult};
use crate::AppState;

/// JSON form of a new pet; multipart requests carry the same field names
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct AddPetRequest {
    pub name: Option<String>,
    pub species: Option<String>,
    pub breed: Option<String>,
    /// Number or numeric string
    pub age: Option<Value>,
    pub medical_notes: Option<String>,
}

struct PictureUpload {
    file_name: String,
    bytes: Vec<u8>,
}

fn validate(req: &AddPetRequest) -> ApiResult<NewPet> {
    let (Some(name), Some(species), Some(breed)) = (
        non_blank(req.name.as_deref()),
        non_blank(req.species.as_deref()),
        non_blank(req.breed.as_deref()),
    ) else {
        return Err(ApiError::BadRequest(
            "Name, species and breed are required".to_string(),
        ));
    };

    let age = req
        .age
        .as_ref()
        .and_then(value_as_i64)
        .filter(|age| *age >= 0)
        .ok_or_else(|| {
            ApiError::BadRequest("Age must be a whole number of 0 or more".to_string())
        })?;

    Ok(NewPet {
        name: name.to_string(),
        species: species.to_string(),
        breed: breed.to_string(),
        age,
        medical_notes: non_blank(req.medical_notes.as_deref()).map(String::from),
        profile_picture: None,
    })
}

async fn read_pet_form(mut multipart: Multipart) -> ApiResult<(AddPetRequest, Option<PictureUpload>)> {
    let mut form = AddPetRequest::default();
    let mut picture = None;

    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        let field_name = field.name().unwrap_or_default().to_string();

        if field_name == "profile_picture" {
            let file_name = field.file_name().unwrap_or_default().to_string();
            let bytes = field.bytes().await.map_err(multipart_error)?;
            if !file_name.is_empty() && !bytes.is_empty() {
                picture = Some(PictureUpload {
                    file_name,
                    bytes: bytes.to_vec(),
                });
            }
            continue;
        }

        let text = field.text().await.map_err(multipart_error)?;
        match field_name.as_str() {
            "name" => form.name = Some(text),
            "species" => form.species = Some(text),
            "breed" => form.breed = Some(text),
            "age" => form.age = Some(Value::String(text)),
            "medical_notes" => form.medical_notes = Some(text),
            _ => {}
        }
    }

    Ok((form, picture))
}

/// POST /api/add_pet
///
/// Accepts JSON, or multipart form data with an optional `profile_picture`.
pub async fn add_pet(
    State(state): State<AppState>,
    Extension(session): Extension<CurrentSession>,
    request: Request,
) -> ApiResult<Json<Value>> {
    let is_multipart = request
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|ct| ct.starts_with("multipart/form-data"));

    let (form, picture) = if is_multipart {
        let multipart = Multipart::from_request(request, &state)
            .await
            .map_err(|e| ApiError::BadRequest(e.body_text()))?;
        read_pet_form(multipart).await?
    } else {
        let ApiJson(form) = ApiJson::<AddPetRequest>::from_request(request, &state).await?;
        (form, None)
    };

    let mut new_pet = validate(&form)?;

    if let Some(picture) = picture {
        let stored = state.uploads.save(&picture.file_name, &picture.bytes).await?;
        new_pet.profile_picture = Some(stored.url);
    }

    let pet = pet_db::insert_pet(&state.db, session.user_id(), &new_pet).await?;
    info!(user_id = session.user_id(), pet_id = pet.id, "Added pet");

    Ok(Json(json!({ "success": true, "pet": pet })))
}

/// GET /api/get_pets
pub async fn get_pets(
    State(state): State<AppState>,
    Extension(session): Extension<CurrentSession>,
) -> ApiResult<Json<Value>> {
    let pets = pet_db::list_pets(&state.db, session.user_id()).await?;
    Ok(Json(json!({ "success": true, "pets": pets })))
}

pub fn pet_routes() -> Router<AppState> {
    Router::new()
        .route("/api/add_pet", post(add_pet))
        .route("/api/get_pets", get(get_pets))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn request(value: Value) -> AddPetRequest {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_validate_accepts_string_age() {
        let pet = validate(&request(json!({
            "name": " Max ", "species": "Dog", "breed": "Beagle", "age": "4", "medical_notes": ""
        })))
        .unwrap();
        assert_eq!(pet.name, "Max");
        assert_eq!(pet.age, 4);
        assert_eq!(pet.medical_notes, None);
    }

    #[test]
    fn test_validate_rejects_missing_fields() {
        let err = validate(&request(json!({ "name": "Max", "species": "Dog", "age": 2 }))).unwrap_err();
        assert!(matches!(err, ApiError::BadRequest(msg) if msg.contains("required")));
    }

    #[test]
    fn test_validate_rejects_bad_age() {
        for age in [json!(-1), json!("old"), json!(null), json!(2.5)] {
            let err = validate(&request(json!({
                "name": "Max", "species": "Dog", "breed": "Beagle", "age": age
            })))
            .unwrap_err();
            assert!(matches!(err, ApiError::BadRequest(_)));
        }
    }
}
