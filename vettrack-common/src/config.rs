//! Configuration loading and root folder resolution
//!
//! Every setting follows the same priority order:
//! 1. Command-line argument (highest priority)
//! 2. Environment variable
//! 3. TOML config file
//! 4. Compiled default (fallback)

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

pub const DEFAULT_BIND_ADDRESS: &str = "127.0.0.1";
pub const DEFAULT_PORT: u16 = 5730;
pub const DEFAULT_GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_GEMINI_MODEL: &str = "gemini-2.5-flash";
pub const DEFAULT_MURF_BASE_URL: &str = "https://api.murf.ai/v1";
pub const DEFAULT_VOICE_ID: &str = "en-US-natalie";
pub const DEFAULT_VIDEO_BASE_URL: &str = "https://meet.jit.si";
/// One week
pub const DEFAULT_SESSION_TIMEOUT_SECONDS: i64 = 604_800;
/// Ten years
pub const MAX_SESSION_TIMEOUT_SECONDS: i64 = 315_360_000;
/// 16 MiB
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 16 * 1024 * 1024;
pub const DEFAULT_REMINDER_SCAN_INTERVAL_SECS: u64 = 60;

pub const DATABASE_FILE_NAME: &str = "vettrack.db";
pub const UPLOADS_DIR_NAME: &str = "uploads";

/// Contents of `config.toml`; every key is optional
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct TomlConfig {
    pub root_folder: Option<String>,
    pub bind_address: Option<String>,
    pub port: Option<u16>,
    pub gemini_api_key: Option<String>,
    pub gemini_base_url: Option<String>,
    pub gemini_model: Option<String>,
    pub murf_api_key: Option<String>,
    pub murf_base_url: Option<String>,
    pub default_voice_id: Option<String>,
    pub video_base_url: Option<String>,
    pub session_timeout_seconds: Option<i64>,
    pub max_upload_bytes: Option<usize>,
    pub reminder_scan_interval_secs: Option<u64>,
}

impl TomlConfig {
    /// Read and parse a TOML config file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("Read {} failed: {}", path.display(), e)))?;
        toml::from_str(&content)
            .map_err(|e| Error::Config(format!("Parse {} failed: {}", path.display(), e)))
    }
}

/// Values supplied on the command line (clap merges their env fallbacks)
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub config_file: Option<PathBuf>,
    pub root_folder: Option<PathBuf>,
    pub bind_address: Option<String>,
    pub port: Option<u16>,
}

/// Gemini generateContent settings
#[derive(Debug, Clone)]
pub struct GeminiSettings {
    pub api_key: Option<String>,
    pub base_url: String,
    pub model: String,
}

/// Murf speech synthesis settings
#[derive(Debug, Clone)]
pub struct MurfSettings {
    pub api_key: Option<String>,
    pub base_url: String,
    pub default_voice_id: String,
}

/// Fully resolved service configuration
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub root_folder: PathBuf,
    pub bind_address: String,
    pub port: u16,
    pub gemini: GeminiSettings,
    pub murf: MurfSettings,
    pub video_base_url: String,
    pub session_timeout_seconds: i64,
    pub max_upload_bytes: usize,
    pub reminder_scan_interval_secs: u64,
}

impl ServiceConfig {
    /// Defaults rooted at `root_folder`, with no external API keys
    pub fn with_root(root_folder: impl Into<PathBuf>) -> Self {
        Self {
            root_folder: root_folder.into(),
            bind_address: DEFAULT_BIND_ADDRESS.to_string(),
            port: DEFAULT_PORT,
            gemini: GeminiSettings {
                api_key: None,
                base_url: DEFAULT_GEMINI_BASE_URL.to_string(),
                model: DEFAULT_GEMINI_MODEL.to_string(),
            },
            murf: MurfSettings {
                api_key: None,
                base_url: DEFAULT_MURF_BASE_URL.to_string(),
                default_voice_id: DEFAULT_VOICE_ID.to_string(),
            },
            video_base_url: DEFAULT_VIDEO_BASE_URL.to_string(),
            session_timeout_seconds: DEFAULT_SESSION_TIMEOUT_SECONDS,
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            reminder_scan_interval_secs: DEFAULT_REMINDER_SCAN_INTERVAL_SECS,
        }
    }

    /// Resolve configuration from CLI overrides, the process environment and
    /// the TOML config file
    pub fn resolve(overrides: &ConfigOverrides) -> Result<Self> {
        let toml_config = match &overrides.config_file {
            Some(path) => TomlConfig::load(path)?,
            None => match find_config_file() {
                Some(path) => {
                    info!("Using config file: {}", path.display());
                    TomlConfig::load(&path)?
                }
                None => {
                    debug!("No config file found, using defaults");
                    TomlConfig::default()
                }
            },
        };

        Ok(Self::resolve_with(overrides, toml_config, |name| {
            std::env::var(name).ok()
        }))
    }

    /// Merge the configuration tiers with an injectable environment lookup
    pub fn resolve_with<F>(overrides: &ConfigOverrides, toml_config: TomlConfig, env: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let env_valid = |name: &str| env(name).filter(|v| is_valid_key(v));

        let root_folder = overrides
            .root_folder
            .clone()
            .or_else(|| env_valid("VETTRACK_ROOT").map(PathBuf::from))
            .or_else(|| toml_config.root_folder.clone().map(PathBuf::from))
            .unwrap_or_else(default_root_folder);

        let mut config = Self::with_root(root_folder);

        if let Some(bind) = overrides
            .bind_address
            .clone()
            .or_else(|| env_valid("VETTRACK_BIND"))
            .or(toml_config.bind_address)
        {
            config.bind_address = bind;
        }

        if let Some(port) = overrides
            .port
            .or_else(|| env_valid("VETTRACK_PORT").and_then(|p| p.trim().parse().ok()))
            .or(toml_config.port)
        {
            config.port = port;
        }

        config.gemini.api_key = env_valid("GEMINI_API_KEY")
            .or(toml_config.gemini_api_key)
            .filter(|k| is_valid_key(k));
        if let Some(url) = env_valid("VETTRACK_GEMINI_URL").or(toml_config.gemini_base_url) {
            config.gemini.base_url = url;
        }
        if let Some(model) = env_valid("VETTRACK_GEMINI_MODEL").or(toml_config.gemini_model) {
            config.gemini.model = model;
        }

        config.murf.api_key = env_valid("MURF_API_KEY")
            .or(toml_config.murf_api_key)
            .filter(|k| is_valid_key(k));
        if let Some(url) = env_valid("VETTRACK_MURF_URL").or(toml_config.murf_base_url) {
            config.murf.base_url = url;
        }
        if let Some(voice) = toml_config.default_voice_id {
            config.murf.default_voice_id = voice;
        }

        if let Some(url) = env_valid("VETTRACK_VIDEO_URL").or(toml_config.video_base_url) {
            config.video_base_url = url;
        }
        if let Some(timeout) = toml_config.session_timeout_seconds {
            let clamped = timeout.clamp(1, MAX_SESSION_TIMEOUT_SECONDS);
            if clamped != timeout {
                warn!(requested = timeout, used = clamped, "session_timeout_seconds out of range");
            }
            config.session_timeout_seconds = clamped;
        }
        if let Some(max) = toml_config.max_upload_bytes {
            config.max_upload_bytes = max;
        }
        if let Some(interval) = toml_config.reminder_scan_interval_secs {
            config.reminder_scan_interval_secs = interval.max(1);
        }

        config
    }

    /// Path of the SQLite database inside the root folder
    pub fn database_path(&self) -> PathBuf {
        self.root_folder.join(DATABASE_FILE_NAME)
    }

    /// Directory holding uploaded images
    pub fn uploads_dir(&self) -> PathBuf {
        self.root_folder.join(UPLOADS_DIR_NAME)
    }

    /// Create the root folder and uploads directory if missing
    pub fn ensure_directories(&self) -> Result<()> {
        std::fs::create_dir_all(&self.root_folder)?;
        std::fs::create_dir_all(self.uploads_dir())?;
        Ok(())
    }
}

/// Validate a key or value (non-empty, non-whitespace)
pub fn is_valid_key(key: &str) -> bool {
    !key.trim().is_empty()
}

/// Locate the default config file for the platform
fn find_config_file() -> Option<PathBuf> {
    let user_config = dirs::config_dir().map(|d| d.join("vettrack").join("config.toml"));
    if let Some(path) = user_config {
        if path.exists() {
            return Some(path);
        }
    }

    if cfg!(unix) {
        let system_config = PathBuf::from("/etc/vettrack/config.toml");
        if system_config.exists() {
            return Some(system_config);
        }
    }

    None
}

/// Get OS-dependent default root folder path
fn default_root_folder() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join("vettrack"))
        .unwrap_or_else(|| PathBuf::from("./vettrack_data"))
}
