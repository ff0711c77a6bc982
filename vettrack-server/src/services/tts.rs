//! Murf text-to-speech client
//!
//! Murf answers a generate request with a URL to the rendered audio; the
//! client downloads it and hands the bytes back base64-encoded so the browser
//! can play them without a second round trip.

use base64::Engine as _;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, error, info};
use vettrack_common::config::MurfSettings;

const REQUEST_TIMEOUT_SECS: u64 = 30;
const SAMPLE_RATE: u32 = 24_000;
const DEFAULT_FORMAT: &str = "MP3";

/// TTS client errors
#[derive(Debug, Error)]
pub enum TtsError {
    #[error("MURF_API_KEY not configured on server")]
    MissingApiKey,

    #[error("Murf error: {0}")]
    Upstream(String),

    #[error("No audio file URL returned by Murf")]
    NoAudioUrl,

    #[error("Failed to download audio from Murf")]
    Download,

    #[error("Network error: {0}")]
    Network(String),
}

/// Synthesized audio ready for JSON transport
#[derive(Debug, Clone, PartialEq)]
pub struct SynthesizedAudio {
    pub audio_b64: String,
    pub mime: &'static str,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(rename = "audioFile")]
    audio_file: Option<String>,
    #[serde(rename = "audio_file")]
    audio_file_snake: Option<String>,
}

/// Playback MIME type for a Murf output format
pub fn mime_for_format(format: &str) -> &'static str {
    match format.to_ascii_uppercase().as_str() {
        "MP3" | "MPEG" | "MPG" => "audio/mpeg",
        _ => "audio/wav",
    }
}

pub struct TtsClient {
    http_client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
    default_voice_id: String,
}

impl TtsClient {
    pub fn new(settings: &MurfSettings) -> Result<Self, TtsError> {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(|e| TtsError::Network(e.to_string()))?;

        Ok(Self {
            http_client,
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            api_key: settings
                .api_key
                .clone()
                .filter(|key| !key.trim().is_empty()),
            default_voice_id: settings.default_voice_id.clone(),
        })
    }

    pub fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }

    /// Render `text` to audio
    ///
    /// `voice_id` and `format` fall back to the configured voice and MP3.
    pub async fn synthesize(
        &self,
        text: &str,
        voice_id: Option<&str>,
        format: Option<&str>,
    ) -> Result<SynthesizedAudio, TtsError> {
        let api_key = self.api_key.as_deref().ok_or(TtsError::MissingApiKey)?;
        let voice_id = voice_id
            .filter(|v| !v.trim().is_empty())
            .unwrap_or(&self.default_voice_id);
        let format = format
            .filter(|f| !f.trim().is_empty())
            .unwrap_or(DEFAULT_FORMAT);

        let url = format!("{}/speech/generate", self.base_url);
        debug!(voice_id, format, chars = text.len(), "Requesting Murf speech");

        let response = self
            .http_client
            .post(&url)
            .header("api-key", api_key)
            .json(&json!({
                "text": text,
                "voiceId": voice_id,
                "format": format,
                "sampleRate": SAMPLE_RATE,
            }))
            .send()
            .await
            .map_err(|e| TtsError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!(status = status.as_u16(), "Murf API error: {}", body);
            return Err(TtsError::Upstream(body));
        }

        let generated: GenerateResponse = response
            .json()
            .await
            .map_err(|e| TtsError::Upstream(e.to_string()))?;

        let audio_url = generated
            .audio_file
            .or(generated.audio_file_snake)
            .filter(|u| !u.is_empty())
            .ok_or(TtsError::NoAudioUrl)?;

        let audio = self
            .http_client
            .get(&audio_url)
            .send()
            .await
            .map_err(|_| TtsError::Download)?;

        if !audio.status().is_success() {
            error!(status = audio.status().as_u16(), "Murf audio download failed");
            return Err(TtsError::Download);
        }

        let bytes = audio.bytes().await.map_err(|_| TtsError::Download)?;
        info!(bytes = bytes.len(), voice_id, "Synthesized speech");

        Ok(SynthesizedAudio {
            audio_b64: base64::engine::general_purpose::STANDARD.encode(&bytes),
            mime: mime_for_format(format),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mime_for_format() {
        assert_eq!(mime_for_format("MP3"), "audio/mpeg");
        assert_eq!(mime_for_format("mpeg"), "audio/mpeg");
        assert_eq!(mime_for_format("Mpg"), "audio/mpeg");
        assert_eq!(mime_for_format("WAV"), "audio/wav");
        assert_eq!(mime_for_format("FLAC"), "audio/wav");
    }

    #[tokio::test]
    async fn test_missing_key() {
        let client = TtsClient::new(&MurfSettings {
            api_key: Some("   ".into()),
            base_url: "http://127.0.0.1:9".into(),
            default_voice_id: "en-US-natalie".into(),
        })
        .unwrap();

        assert!(!client.is_configured());
        let err = client.synthesize("hello", None, None).await.unwrap_err();
        assert!(matches!(err, TtsError::MissingApiKey));
    }
}
