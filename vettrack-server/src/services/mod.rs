//! Business services
//!
//! External API clients, upload storage, document builders and background
//! tasks used by the HTTP handlers.

pub mod gemini;
pub mod prompts;
pub mod reminder_scanner;
pub mod speech;
pub mod summary;
pub mod timeline;
pub mod tts;
pub mod uploads;
pub mod video;

pub use gemini::{DiagnosisExplanation, GeminiClient, GeminiError, ImageAnalysis, SymptomAnalysis};
pub use tts::{SynthesizedAudio, TtsClient, TtsError};
pub use uploads::{StoredUpload, UploadStore};
