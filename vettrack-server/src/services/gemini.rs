//! Gemini `generateContent` client
//!
//! The analysis methods never fail. Upstream problems are folded into a
//! result the handlers can return or reject:
//! - HTTP 429: quota result
//! - HTTP 503 (symptoms only): overload result
//! - any other non-2xx, or unparseable candidate text: empty result
//! - timeout, transport failure, missing API key: fallback result

use base64::Engine as _;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, error, info, warn};
use vettrack_common::config::GeminiSettings;
use vettrack_common::db::PetProfile;

use super::prompts;

const REQUEST_TIMEOUT_SECS: u64 = 60;
const MAX_EXPLANATION_ITEMS: usize = 5;
const DEFAULT_IMAGE_MIME: &str = "image/jpeg";

pub const SPECIES_MISMATCH_WARNING: &str =
    "⚠ The uploaded image does not appear to match your pet's species.";
pub const BREED_MISMATCH_WARNING: &str =
    "⚠ The breed characteristics in the image don't match your pet's profile.";
pub const AGE_MISMATCH_WARNING: &str =
    "⚠ The apparent age in the image doesn't align with your pet's profile.";

/// Gemini client errors
#[derive(Debug, Error)]
pub enum GeminiError {
    #[error("GEMINI_API_KEY not configured")]
    MissingApiKey,

    #[error("Gemini request timed out")]
    Timeout,

    #[error("Network error: {0}")]
    Network(String),

    #[error("Gemini API error {0}: {1}")]
    Status(u16, String),

    #[error("Parse error: {0}")]
    Parse(String),
}

/// Result of a text symptom analysis
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SymptomAnalysis {
    pub diagnosis: Vec<String>,
    pub urgency_level: String,
    pub recommendation: String,
    pub possible_causes: Vec<String>,
}

impl SymptomAnalysis {
    pub fn quota_exceeded() -> Self {
        Self {
            diagnosis: vec!["API quota exceeded - please try again later".into()],
            urgency_level: "Service Unavailable".into(),
            recommendation: "The AI service has reached its daily quota. Please try again later or contact support.".into(),
            possible_causes: vec!["API quota limit reached".into()],
        }
    }

    pub fn overloaded() -> Self {
        Self {
            diagnosis: vec![
                "AI service temporarily overloaded - please try again in a few minutes".into(),
            ],
            urgency_level: "Service Temporarily Unavailable".into(),
            recommendation: "The AI analysis service is currently experiencing high demand. Please wait a few minutes and try again.".into(),
            possible_causes: vec![
                "High server load".into(),
                "Temporary service congestion".into(),
            ],
        }
    }

    pub fn empty() -> Self {
        Self {
            diagnosis: Vec::new(),
            urgency_level: "Unknown".into(),
            recommendation: String::new(),
            possible_causes: Vec::new(),
        }
    }

    pub fn fallback(pet_name: &str) -> Self {
        Self {
            diagnosis: vec!["Veterinary consultation recommended".into()],
            urgency_level: "Medium".into(),
            recommendation: format!(
                "Based on the symptoms described for {}, we recommend scheduling a consultation with your \
                 veterinarian for proper evaluation and diagnosis. The symptoms you've noted should be \
                 assessed by a professional.",
                pet_name
            ),
            possible_causes: vec![
                "Multiple factors could contribute to these symptoms".into(),
                "Professional evaluation needed for accurate assessment".into(),
            ],
        }
    }
}

/// Result of a photo analysis
///
/// Also the shape stored in the image analysis cache.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageAnalysis {
    pub diagnosis: Vec<String>,
    pub urgency_level: String,
    pub severity: String,
    pub recommendation: String,
    pub possible_causes: Vec<String>,
    pub condition_likelihood: String,
}

impl ImageAnalysis {
    pub fn quota_exceeded() -> Self {
        Self {
            diagnosis: vec!["API quota exceeded - please try again later".into()],
            urgency_level: "Service Unavailable".into(),
            severity: "Service Unavailable".into(),
            recommendation: "The AI service has reached its daily quota. Please try again later or contact support.".into(),
            possible_causes: vec!["API quota limit reached".into()],
            condition_likelihood: "Cannot analyze due to quota limit".into(),
        }
    }

    pub fn empty() -> Self {
        Self {
            diagnosis: Vec::new(),
            urgency_level: "Unknown".into(),
            severity: "Unknown".into(),
            recommendation: String::new(),
            possible_causes: Vec::new(),
            condition_likelihood: "Unknown".into(),
        }
    }

    pub fn fallback(pet_name: &str) -> Self {
        Self {
            diagnosis: vec![
                "Image analysis unavailable - veterinary consultation recommended".into(),
            ],
            urgency_level: "Medium".into(),
            severity: "Medium".into(),
            recommendation: format!(
                "We were unable to analyze the image for {} at this time. Please consult with your \
                 veterinarian to have the condition properly evaluated, especially if you notice any \
                 concerning changes.",
                pet_name
            ),
            possible_causes: vec![
                "Professional evaluation needed for visual assessment".into(),
                "Multiple factors could contribute to visible symptoms".into(),
            ],
            condition_likelihood: "Unable to assess".into(),
        }
    }
}

/// Photo analysis together with where it came from
///
/// `from_model` is false for quota, empty and fallback results. Those must
/// not be cached.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageOutcome {
    pub analysis: ImageAnalysis,
    pub from_model: bool,
}

impl ImageOutcome {
    fn model(analysis: ImageAnalysis) -> Self {
        Self { analysis, from_model: true }
    }

    fn substitute(analysis: ImageAnalysis) -> Self {
        Self { analysis, from_model: false }
    }
}

/// Educational explanation of a single diagnosis
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DiagnosisExplanation {
    pub description: String,
    pub causes: Vec<String>,
    pub symptoms: Vec<String>,
}

impl DiagnosisExplanation {
    pub fn fallback(diagnosis: &str) -> Self {
        Self {
            description: format!(
                "{} is a condition that may affect your pet's health. It's important to monitor your \
                 pet closely and consult with a veterinarian for proper diagnosis and treatment.",
                diagnosis
            ),
            causes: vec![
                "Various environmental factors".into(),
                "Genetic predisposition".into(),
                "Age-related changes".into(),
                "Dietary factors".into(),
                "Stress or lifestyle changes".into(),
            ],
            symptoms: vec![
                "Changes in behavior or appetite".into(),
                "Physical discomfort or unusual movements".into(),
                "Altered energy levels".into(),
                "Changes in normal routines".into(),
            ],
        }
    }
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    text: Option<String>,
}

/// Gemini API client
pub struct GeminiClient {
    http_client: reqwest::Client,
    endpoint: String,
    api_key: Option<String>,
}

impl GeminiClient {
    pub fn new(settings: &GeminiSettings) -> Result<Self, GeminiError> {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(|e| GeminiError::Network(e.to_string()))?;

        let endpoint = format!(
            "{}/models/{}:generateContent",
            settings.base_url.trim_end_matches('/'),
            settings.model
        );

        Ok(Self {
            http_client,
            endpoint,
            api_key: settings
                .api_key
                .clone()
                .filter(|key| !key.trim().is_empty()),
        })
    }

    pub fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }

    /// Send one `generateContent` request and parse the first candidate's
    /// text as JSON
    async fn generate(&self, parts: Vec<Value>) -> Result<Value, GeminiError> {
        let api_key = self.api_key.as_deref().ok_or(GeminiError::MissingApiKey)?;

        let payload = json!({
            "contents": [{ "parts": parts }],
            "generationConfig": { "response_mime_type": "application/json" },
        });

        debug!(endpoint = %self.endpoint, "Calling Gemini generateContent");

        let response = self
            .http_client
            .post(&self.endpoint)
            .query(&[("key", api_key)])
            .json(&payload)
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!(status = status.as_u16(), "Gemini API error: {}", body);
            return Err(GeminiError::Status(status.as_u16(), body));
        }

        let parsed: GenerateContentResponse = response
            .json()
            .await
            .map_err(|e| GeminiError::Parse(e.to_string()))?;

        let text = parsed
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .and_then(|c| c.parts.into_iter().next())
            .and_then(|p| p.text)
            .ok_or_else(|| GeminiError::Parse("response contained no candidate text".into()))?;

        serde_json::from_str(strip_code_fence(&text)).map_err(|e| GeminiError::Parse(e.to_string()))
    }

    pub async fn analyze_symptoms(&self, pet: &PetProfile, symptoms: &str) -> SymptomAnalysis {
        let prompt = prompts::symptom_prompt(pet, symptoms);

        match self.generate(vec![json!({ "text": prompt })]).await {
            Ok(raw) => {
                let analysis = normalize_symptom_analysis(&raw);
                if analysis.diagnosis.is_empty() {
                    warn!(pet_id = pet.id, "Gemini returned no valid diagnosis");
                } else {
                    info!(pet_id = pet.id, urgency = %analysis.urgency_level, "Symptom analysis complete");
                }
                analysis
            }
            Err(GeminiError::Status(429, _)) => SymptomAnalysis::quota_exceeded(),
            Err(GeminiError::Status(503, _)) => SymptomAnalysis::overloaded(),
            Err(e @ (GeminiError::Status(..) | GeminiError::Parse(_))) => {
                warn!(pet_id = pet.id, "Unusable symptom analysis: {}", e);
                SymptomAnalysis::empty()
            }
            Err(e) => {
                error!(pet_id = pet.id, "Symptom analysis failed, using fallback: {}", e);
                SymptomAnalysis::fallback(&pet.name)
            }
        }
    }

    pub async fn analyze_image(
        &self,
        pet: &PetProfile,
        image: &[u8],
        description: &str,
    ) -> ImageOutcome {
        let parts = vec![
            json!({
                "inline_data": {
                    "mime_type": detect_image_mime(image),
                    "data": base64::engine::general_purpose::STANDARD.encode(image),
                }
            }),
            json!({ "text": prompts::image_prompt(pet, description) }),
        ];

        match self.generate(parts).await {
            Ok(raw) => {
                let analysis = normalize_image_analysis(&raw, &pet.species);
                info!(
                    pet_id = pet.id,
                    entries = analysis.diagnosis.len(),
                    urgency = %analysis.urgency_level,
                    "Image analysis complete"
                );
                ImageOutcome::model(analysis)
            }
            Err(GeminiError::Status(429, _)) => {
                warn!(pet_id = pet.id, "Gemini quota exceeded for image analysis");
                ImageOutcome::substitute(ImageAnalysis::quota_exceeded())
            }
            Err(e @ (GeminiError::Status(..) | GeminiError::Parse(_))) => {
                warn!(pet_id = pet.id, "Unusable image analysis: {}", e);
                ImageOutcome::substitute(ImageAnalysis::empty())
            }
            Err(e) => {
                error!(pet_id = pet.id, "Image analysis failed, using fallback: {}", e);
                ImageOutcome::substitute(ImageAnalysis::fallback(&pet.name))
            }
        }
    }

    pub async fn explain_diagnosis(&self, diagnosis: &str) -> DiagnosisExplanation {
        let prompt = prompts::explanation_prompt(diagnosis);

        match self.generate(vec![json!({ "text": prompt })]).await {
            Ok(raw) => normalize_explanation(&raw),
            Err(e) => {
                warn!(diagnosis, "Explanation unavailable, using fallback: {}", e);
                DiagnosisExplanation::fallback(diagnosis)
            }
        }
    }
}

fn transport_error(e: reqwest::Error) -> GeminiError {
    if e.is_timeout() {
        GeminiError::Timeout
    } else {
        GeminiError::Network(e.to_string())
    }
}

/// Drop a surrounding markdown code fence, if any
fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    rest.strip_suffix("```").unwrap_or(rest).trim()
}

/// MIME type of an image from its magic bytes
pub fn detect_image_mime(bytes: &[u8]) -> &'static str {
    infer::get(bytes)
        .map(|kind| kind.mime_type())
        .filter(|mime| mime.starts_with("image/"))
        .unwrap_or(DEFAULT_IMAGE_MIME)
}

fn value_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// A string or list field as trimmed, non-empty strings
fn coerce_list(value: Option<&Value>) -> Vec<String> {
    let items: Vec<String> = match value {
        Some(Value::Array(items)) => items.iter().map(value_text).collect(),
        Some(Value::Null) | None => Vec::new(),
        Some(other) => vec![value_text(other)],
    };

    items
        .into_iter()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

fn text_field(raw: &Value, key: &str) -> Option<String> {
    raw.get(key)
        .map(value_text)
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

pub fn normalize_symptom_analysis(raw: &Value) -> SymptomAnalysis {
    SymptomAnalysis {
        diagnosis: coerce_list(raw.get("diagnosis"))
            .into_iter()
            .filter(|d| !d.eq_ignore_ascii_case("unknown"))
            .collect(),
        urgency_level: text_field(raw, "urgency_level").unwrap_or_else(|| "Unknown".into()),
        recommendation: text_field(raw, "recommendation").unwrap_or_default(),
        possible_causes: coerce_list(raw.get("possible_causes")),
    }
}

/// Warning to put in front of the diagnosis list when the model reports that
/// the photo does not match the pet profile
pub fn mismatch_warning(diagnosis_text: &str, species: &str) -> Option<&'static str> {
    let text = diagnosis_text.to_lowercase();
    let species = species.trim().to_lowercase();

    let species_mismatch = text.contains("species mismatch")
        || text.contains("different species")
        || (!species.is_empty() && text.contains(&format!("not a {}", species)));

    if species_mismatch {
        Some(SPECIES_MISMATCH_WARNING)
    } else if text.contains("breed") && text.contains("mismatch") {
        Some(BREED_MISMATCH_WARNING)
    } else if text.contains("age") && (text.contains("mismatch") || text.contains("doesn't match")) {
        Some(AGE_MISMATCH_WARNING)
    } else {
        None
    }
}

pub fn normalize_image_analysis(raw: &Value, species: &str) -> ImageAnalysis {
    let raw_diagnosis = coerce_list(raw.get("diagnosis"));

    let mut diagnosis: Vec<String> = raw_diagnosis
        .iter()
        .filter(|d| {
            let lower = d.to_lowercase();
            lower != "unknown" && lower != "cannot determine"
        })
        .cloned()
        .collect();

    if let Some(warning) = mismatch_warning(&raw_diagnosis.join(" "), species) {
        if !diagnosis.iter().any(|d| d == warning) {
            diagnosis.insert(0, warning.to_string());
        }
    }

    let severity = text_field(raw, "severity").unwrap_or_else(|| "Unknown".into());
    let urgency_level = if severity != "Unknown" {
        severity.clone()
    } else {
        text_field(raw, "urgency_level").unwrap_or_else(|| "Unknown".into())
    };

    ImageAnalysis {
        diagnosis,
        urgency_level,
        severity,
        recommendation: text_field(raw, "recommendation").unwrap_or_default(),
        possible_causes: coerce_list(raw.get("possible_causes")),
        condition_likelihood: text_field(raw, "condition_likelihood")
            .or_else(|| text_field(raw, "conditionLikelihood"))
            .unwrap_or_else(|| "Unknown".into()),
    }
}

pub fn normalize_explanation(raw: &Value) -> DiagnosisExplanation {
    let mut causes = coerce_list(raw.get("causes"));
    let mut symptoms = coerce_list(raw.get("symptoms"));

    if causes.is_empty() {
        causes = vec![
            "Various factors may contribute to this condition".into(),
            "Environmental influences".into(),
            "Genetic predisposition".into(),
        ];
    }
    if symptoms.is_empty() {
        symptoms = vec![
            "Changes in appetite or behavior".into(),
            "Worsening symptoms".into(),
            "Signs of discomfort".into(),
        ];
    }
    causes.truncate(MAX_EXPLANATION_ITEMS);
    symptoms.truncate(MAX_EXPLANATION_ITEMS);

    DiagnosisExplanation {
        description: text_field(raw, "description")
            .unwrap_or_else(|| "A medical condition that requires veterinary attention.".into()),
        causes,
        symptoms,
    }
}
