//! Database models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Registered account (credentials are never serialized)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct User {
    pub id: i64,
    pub full_name: String,
    pub email: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PetProfile {
    pub id: i64,
    pub user_id: i64,
    pub name: String,
    pub species: String,
    pub breed: String,
    pub age: i64,
    pub medical_notes: Option<String>,
    /// Relative URL of the stored picture (`uploads/<file>`)
    pub profile_picture: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HealthHistoryEntry {
    pub id: i64,
    pub pet_id: i64,
    pub date: DateTime<Utc>,
    pub symptoms: String,
    pub diagnosis: Vec<String>,
    pub recommendation: Option<String>,
    pub urgency_level: Option<String>,
    pub possible_causes: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Reminder {
    pub id: i64,
    pub pet_id: i64,
    pub title: String,
    pub due_date: DateTime<Utc>,
    pub completed: bool,
    pub completed_date: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Consultation {
    pub id: i64,
    pub pet_id: i64,
    pub user_id: i64,
    pub date: DateTime<Utc>,
    pub summary: String,
    pub room_id: String,
}

/// Encode a string list for a TEXT column
pub fn encode_string_list(items: &[String]) -> String {
    serde_json::to_string(items).unwrap_or_else(|_| "[]".to_string())
}

/// Decode a string list column
///
/// Accepts a JSON array, a bare JSON string, or legacy comma-separated text.
/// NULL and blank values decode to an empty list.
pub fn decode_string_list(raw: Option<&str>) -> Vec<String> {
    let raw = match raw.map(str::trim) {
        Some(r) if !r.is_empty() => r,
        _ => return Vec::new(),
    };

    match serde_json::from_str::<serde_json::Value>(raw) {
        Ok(serde_json::Value::Array(values)) => values
            .into_iter()
            .filter_map(|v| match v {
                serde_json::Value::String(s) => Some(s),
                serde_json::Value::Null => None,
                other => Some(other.to_string()),
            })
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect(),
        Ok(serde_json::Value::String(s)) => vec![s.trim().to_string()],
        _ => raw
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect(),
    }
}
