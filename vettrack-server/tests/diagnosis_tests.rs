//! Integration tests for symptom checks, photo analysis and explanations
//!
//! Gemini is replaced by a local axum server answering `generateContent`.

mod helpers;

use axum::{extract::State, http::StatusCode, response::IntoResponse, routing::post, Json, Router};
use helpers::{gemini_reply, multipart_request, spawn_mock, Part, TestApp, PNG_BYTES};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use vettrack_common::events::VetEvent;
use vettrack_server::services::gemini::SPECIES_MISMATCH_WARNING;

/// Replies are served in order; the last one repeats
#[derive(Clone)]
struct MockGemini {
    replies: Arc<Vec<(StatusCode, Value)>>,
    calls: Arc<AtomicUsize>,
}

async fn generate_content(State(mock): State<MockGemini>) -> impl IntoResponse {
    let call = mock.calls.fetch_add(1, Ordering::SeqCst);
    let (status, body) = mock.replies[call.min(mock.replies.len() - 1)].clone();
    (status, Json(body))
}

/// Start a Gemini stand-in; returns the app wired to it and its call counter
async fn app_with_gemini(status: StatusCode, body: Value) -> (TestApp, Arc<AtomicUsize>) {
    app_with_gemini_replies(vec![(status, body)]).await
}

async fn app_with_gemini_replies(replies: Vec<(StatusCode, Value)>) -> (TestApp, Arc<AtomicUsize>) {
    let calls = Arc::new(AtomicUsize::new(0));
    let mock = MockGemini {
        replies: Arc::new(replies),
        calls: calls.clone(),
    };
    let router = Router::new()
        .route("/models/:action", post(generate_content))
        .with_state(mock);
    let base_url = spawn_mock(router).await;

    let app = TestApp::with_config(|config| {
        config.gemini.api_key = Some("test-key".to_string());
        config.gemini.base_url = base_url;
        config.gemini.model = "gemini-test".to_string();
    })
    .await;

    (app, calls)
}

async fn upload_png(app: &TestApp, token: &str, pet_id: i64) -> (StatusCode, Value) {
    let pet_id_text = pet_id.to_string();
    app.send(multipart_request(
        "/api/upload_image",
        token,
        &[
            Part::File {
                name: "image",
                file_name: "paw.png",
                bytes: PNG_BYTES,
            },
            Part::Text("pet_id", &pet_id_text),
        ],
    ))
    .await
}

async fn history_len(app: &TestApp, token: &str, pet_id: i64) -> usize {
    let (_, body) = app
        .get(&format!("/api/get_history?pet_id={}", pet_id), Some(token))
        .await;
    body["history"].as_array().unwrap().len()
}

// =============================================================================
// check_symptoms
// =============================================================================

#[tokio::test]
async fn test_check_symptoms_stores_one_entry() {
    let (app, calls) = app_with_gemini(
        StatusCode::OK,
        gemini_reply(json!({
            "diagnosis": ["Gastritis", "unknown", " Food intolerance "],
            "urgency_level": "Medium",
            "recommendation": "Bland diet for 24 hours",
            "possible_causes": ["Dietary indiscretion"]
        })),
    )
    .await;
    let token = app.login_as("sym@example.com").await;
    let pet_id = app.add_pet(&token, "Max", "Dog").await;
    let mut events = app.state.event_bus.subscribe();

    let (status, body) = app
        .post(
            "/api/check_symptoms",
            Some(&token),
            json!({ "pet_id": pet_id.to_string(), "symptoms": "Vomiting since morning" }),
        )
        .await;

    assert_eq!(status, StatusCode::OK, "{}", body);
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(body["analysis"]["diagnosis"], json!(["Gastritis", "Food intolerance"]));
    assert_eq!(body["analysis"]["urgency_level"], "Medium");
    assert_eq!(
        body["announcement"],
        "Analysis for Max: possible conditions include Gastritis and Food intolerance. Urgency level: Medium."
    );

    assert_eq!(history_len(&app, &token, pet_id).await, 1);

    match events.try_recv().unwrap() {
        VetEvent::AnalysisRecorded { pet_id: id, urgency_level, .. } => {
            assert_eq!(id, pet_id);
            assert_eq!(urgency_level, "Medium");
        }
        other => panic!("unexpected event {:?}", other),
    }
}

#[tokio::test]
async fn test_check_symptoms_rejects_empty_analysis() {
    let (app, _) = app_with_gemini(
        StatusCode::OK,
        gemini_reply(json!({ "diagnosis": ["Unknown", "Unable to analyze symptoms"] })),
    )
    .await;
    let token = app.login_as("empty@example.com").await;
    let pet_id = app.add_pet(&token, "Max", "Dog").await;

    let (status, body) = app
        .post(
            "/api/check_symptoms",
            Some(&token),
            json!({ "pet_id": pet_id, "symptoms": "Lethargy" }),
        )
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Empty or invalid AI analysis result");
    assert_eq!(history_len(&app, &token, pet_id).await, 0);
}

#[tokio::test]
async fn test_check_symptoms_quota_result() {
    let (app, _) = app_with_gemini(StatusCode::TOO_MANY_REQUESTS, json!({ "error": "quota" })).await;
    let token = app.login_as("quota@example.com").await;
    let pet_id = app.add_pet(&token, "Max", "Dog").await;

    let (status, body) = app
        .post(
            "/api/check_symptoms",
            Some(&token),
            json!({ "pet_id": pet_id, "symptoms": "Coughing" }),
        )
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["analysis"]["urgency_level"], "Service Unavailable");
}

#[tokio::test]
async fn test_check_symptoms_overload_result_is_stored() {
    let (app, _) =
        app_with_gemini(StatusCode::SERVICE_UNAVAILABLE, json!({ "error": "overloaded" })).await;
    let token = app.login_as("busy@example.com").await;
    let pet_id = app.add_pet(&token, "Max", "Dog").await;

    let (status, body) = app
        .post(
            "/api/check_symptoms",
            Some(&token),
            json!({ "pet_id": pet_id, "symptoms": "Sneezing" }),
        )
        .await;

    assert_eq!(status, StatusCode::OK, "{}", body);
    assert_eq!(body["analysis"]["urgency_level"], "Service Temporarily Unavailable");
    assert_eq!(
        body["analysis"]["diagnosis"],
        json!(["AI service temporarily overloaded - please try again in a few minutes"])
    );
    assert_eq!(history_len(&app, &token, pet_id).await, 1);
}

#[tokio::test]
async fn test_check_symptoms_without_api_key_uses_fallback() {
    let app = TestApp::new().await;
    let token = app.login_as("nokey@example.com").await;
    let pet_id = app.add_pet(&token, "Max", "Dog").await;

    let (status, body) = app
        .post(
            "/api/check_symptoms",
            Some(&token),
            json!({ "pet_id": pet_id, "symptoms": "Limping" }),
        )
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body["analysis"]["diagnosis"],
        json!(["Veterinary consultation recommended"])
    );
    assert_eq!(body["analysis"]["urgency_level"], "Medium");
}

#[tokio::test]
async fn test_check_symptoms_validation() {
    let app = TestApp::new().await;
    let token = app.login_as("val@example.com").await;
    let pet_id = app.add_pet(&token, "Max", "Dog").await;

    let (status, body) = app
        .post(
            "/api/check_symptoms",
            Some(&token),
            json!({ "pet_id": pet_id, "symptoms": "   " }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Symptoms are required");

    let (status, _) = app
        .post(
            "/api/check_symptoms",
            Some(&token),
            json!({ "pet_id": 9999, "symptoms": "Sneezing" }),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

// =============================================================================
// upload_image
// =============================================================================

#[tokio::test]
async fn test_upload_image_uses_cache_on_repeat() {
    let (app, calls) = app_with_gemini(
        StatusCode::OK,
        gemini_reply(json!({
            "diagnosis": ["Hot spot"],
            "severity": "Low",
            "recommendation": "Keep the area clean",
            "possible_causes": ["Allergy"],
            "condition_likelihood": "Likely"
        })),
    )
    .await;
    let token = app.login_as("img@example.com").await;
    let pet_id = app.add_pet(&token, "Max", "Dog").await;
    let pet_id_text = pet_id.to_string();

    let parts = [
        Part::File {
            name: "image",
            file_name: "rash.png",
            bytes: PNG_BYTES,
        },
        Part::Text("pet_id", &pet_id_text),
        Part::Text("description", "rash on belly"),
    ];

    let (status, first) = app
        .send(multipart_request("/api/upload_image", &token, &parts))
        .await;
    assert_eq!(status, StatusCode::OK, "{}", first);
    assert_eq!(first["cached"], false);
    assert_eq!(first["analysis"]["diagnosis"], json!(["Hot spot"]));
    assert_eq!(first["analysis"]["urgency_level"], "Low");
    assert_eq!(first["analysis"]["severity"], "Low");
    assert_eq!(first["analysis"]["conditionLikelihood"], "Likely");
    assert_eq!(first["analysis"]["warningItem"], "");
    assert!(first["image_url"].as_str().unwrap().starts_with("uploads/"));

    let (status, second) = app
        .send(multipart_request("/api/upload_image", &token, &parts))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(second["cached"], true);
    assert_eq!(second["analysis"]["condition_likelihood"], "Cached Analysis");
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    let (_, history) = app
        .get(&format!("/api/get_history?pet_id={}", pet_id), Some(&token))
        .await;
    let entries = history["history"].as_array().unwrap();
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0]["symptoms"], "Image analysis: rash on belly");
}

#[tokio::test]
async fn test_upload_image_quota_result() {
    let (app, _) = app_with_gemini(StatusCode::TOO_MANY_REQUESTS, json!({ "error": "quota" })).await;
    let token = app.login_as("img-quota@example.com").await;
    let pet_id = app.add_pet(&token, "Max", "Dog").await;

    let (status, body) = upload_png(&app, &token, pet_id).await;

    assert_eq!(status, StatusCode::OK, "{}", body);
    assert_eq!(body["cached"], false);
    assert_eq!(
        body["analysis"]["diagnosis"],
        json!(["API quota exceeded - please try again later"])
    );
    assert_eq!(
        body["analysis"]["condition_likelihood"],
        "Cannot analyze due to quota limit"
    );
    assert_eq!(history_len(&app, &token, pet_id).await, 1);
}

#[tokio::test]
async fn test_upload_image_does_not_cache_quota_result() {
    let (app, calls) = app_with_gemini_replies(vec![
        (StatusCode::TOO_MANY_REQUESTS, json!({ "error": "quota" })),
        (
            StatusCode::OK,
            gemini_reply(json!({ "diagnosis": ["Hot spot"], "severity": "Low" })),
        ),
    ])
    .await;
    let token = app.login_as("retry@example.com").await;
    let pet_id = app.add_pet(&token, "Max", "Dog").await;

    let (_, first) = upload_png(&app, &token, pet_id).await;
    assert_eq!(
        first["analysis"]["diagnosis"],
        json!(["API quota exceeded - please try again later"])
    );

    let (status, second) = upload_png(&app, &token, pet_id).await;
    assert_eq!(status, StatusCode::OK, "{}", second);
    assert_eq!(second["cached"], false);
    assert_eq!(second["analysis"]["diagnosis"], json!(["Hot spot"]));
    assert_eq!(calls.load(Ordering::SeqCst), 2);

    // Only the real reply is cached
    let (_, third) = upload_png(&app, &token, pet_id).await;
    assert_eq!(third["cached"], true);
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_upload_image_does_not_cache_fallback() {
    let app = TestApp::new().await;
    let token = app.login_as("img-nokey@example.com").await;
    let pet_id = app.add_pet(&token, "Max", "Dog").await;

    for _ in 0..2 {
        let (status, body) = upload_png(&app, &token, pet_id).await;
        assert_eq!(status, StatusCode::OK, "{}", body);
        assert_eq!(body["cached"], false);
        assert_eq!(
            body["analysis"]["diagnosis"],
            json!(["Image analysis unavailable - veterinary consultation recommended"])
        );
    }
}

#[tokio::test]
async fn test_upload_image_species_mismatch_warning() {
    let (app, _) = app_with_gemini(
        StatusCode::OK,
        gemini_reply(json!({
            "diagnosis": ["This is not a dog, it appears to be a cat", "Dermatitis"],
            "severity": "Medium"
        })),
    )
    .await;
    let token = app.login_as("mismatch@example.com").await;
    let pet_id = app.add_pet(&token, "Max", "Dog").await;
    let pet_id_text = pet_id.to_string();

    let (status, body) = app
        .send(multipart_request(
            "/api/upload_image",
            &token,
            &[
                Part::File {
                    name: "image",
                    file_name: "cat.png",
                    bytes: PNG_BYTES,
                },
                Part::Text("pet_id", &pet_id_text),
            ],
        ))
        .await;

    assert_eq!(status, StatusCode::OK, "{}", body);
    assert_eq!(body["analysis"]["warningItem"], SPECIES_MISMATCH_WARNING);
    assert_eq!(body["analysis"]["diagnosis"][0], SPECIES_MISMATCH_WARNING);
}

#[tokio::test]
async fn test_upload_image_empty_analysis_stores_nothing() {
    let (app, _) = app_with_gemini(
        StatusCode::OK,
        gemini_reply(json!({ "diagnosis": ["Cannot determine"] })),
    )
    .await;
    let token = app.login_as("blank@example.com").await;
    let pet_id = app.add_pet(&token, "Max", "Dog").await;
    let pet_id_text = pet_id.to_string();

    let (status, body) = app
        .send(multipart_request(
            "/api/upload_image",
            &token,
            &[
                Part::File {
                    name: "image",
                    file_name: "x.png",
                    bytes: PNG_BYTES,
                },
                Part::Text("pet_id", &pet_id_text),
            ],
        ))
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Empty or invalid AI analysis result");
    assert_eq!(history_len(&app, &token, pet_id).await, 0);
    assert_eq!(std::fs::read_dir(app.state.uploads.dir()).unwrap().count(), 0);
}

#[tokio::test]
async fn test_upload_image_requires_file_and_pet() {
    let app = TestApp::new().await;
    let token = app.login_as("missing@example.com").await;

    let (status, body) = app
        .send(multipart_request(
            "/api/upload_image",
            &token,
            &[Part::Text("pet_id", "1")],
        ))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "No image file provided");

    let (status, body) = app
        .send(multipart_request(
            "/api/upload_image",
            &token,
            &[Part::File {
                name: "image",
                file_name: "x.png",
                bytes: PNG_BYTES,
            }],
        ))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "File and Pet ID required");
}

#[tokio::test]
async fn test_upload_image_over_limit() {
    let app = TestApp::with_config(|config| config.max_upload_bytes = 512).await;
    let token = app.login_as("big@example.com").await;
    let big = vec![0u8; 4096];

    let (status, body) = app
        .send(multipart_request(
            "/api/upload_image",
            &token,
            &[
                Part::Text("pet_id", "1"),
                Part::File {
                    name: "image",
                    file_name: "huge.png",
                    bytes: &big,
                },
            ],
        ))
        .await;

    assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE, "{}", body);
}

// =============================================================================
// get_diagnosis_explanation
// =============================================================================

#[tokio::test]
async fn test_explanation_is_truncated() {
    let (app, _) = app_with_gemini(
        StatusCode::OK,
        gemini_reply(json!({
            "description": "Inflammation of the stomach lining.",
            "causes": ["a", "b", "", "c", "d", "e", "f", "g"],
            "symptoms": "Vomiting"
        })),
    )
    .await;
    let token = app.login_as("explain@example.com").await;

    let (status, body) = app
        .post(
            "/api/get_diagnosis_explanation",
            Some(&token),
            json!({ "diagnosis": "Gastritis" }),
        )
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["diagnosis"], "Gastritis");
    let explanation = &body["explanation"];
    assert_eq!(explanation["description"], "Inflammation of the stomach lining.");
    assert_eq!(explanation["causes"], json!(["a", "b", "c", "d", "e"]));
    assert_eq!(explanation["symptoms"], json!(["Vomiting"]));
}

#[tokio::test]
async fn test_explanation_falls_back_on_upstream_error() {
    let (app, _) = app_with_gemini(StatusCode::INTERNAL_SERVER_ERROR, json!({})).await;
    let token = app.login_as("fallback@example.com").await;

    let (status, body) = app
        .post(
            "/api/get_diagnosis_explanation",
            Some(&token),
            json!({ "diagnosis": "Otitis" }),
        )
        .await;

    assert_eq!(status, StatusCode::OK);
    assert!(body["explanation"]["description"]
        .as_str()
        .unwrap()
        .starts_with("Otitis is a condition"));
}

#[tokio::test]
async fn test_explanation_rejects_warnings() {
    let app = TestApp::new().await;
    let token = app.login_as("warn@example.com").await;

    for diagnosis in ["Warning: blurry photo", SPECIES_MISMATCH_WARNING] {
        let (status, body) = app
            .post(
                "/api/get_diagnosis_explanation",
                Some(&token),
                json!({ "diagnosis": diagnosis }),
            )
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Cannot explain warning messages");
    }

    let (status, body) = app
        .post("/api/get_diagnosis_explanation", Some(&token), json!({}))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Diagnosis name is required");
}
