use crate::chat::error::ChatError;
use std::env::VarError;
use std::fmt;
use std::path::PathBuf;

pub const API_KEY_VAR: &str = "API_KEY";
pub const BASE_URL_VAR: &str = "GEMINI_BASE_URL";
pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";
pub const GEMINI_MODEL_NAME: &str = "gemini-2.5-flash-preview-04-17";

pub const DEFAULT_SYSTEM_INSTRUCTION: &str =
    "You are a helpful and friendly AI assistant. Keep your responses concise and informative.";

pub const DEFAULT_TEMPERATURE: f32 = 0.7;
pub const MIN_TEMPERATURE: f32 = 0.0;
pub const MAX_TEMPERATURE: f32 = 1.0;
pub const TEMPERATURE_STEP: f64 = 0.1;

pub const DEFAULT_TOP_K: u32 = 40;
pub const MIN_TOP_K: u32 = 1;
pub const MAX_TOP_K: u32 = 100;
pub const TOP_K_STEP: f64 = 1.0;

pub const DEFAULT_TOP_P: f32 = 0.95;
pub const MIN_TOP_P: f32 = 0.0;
pub const MAX_TOP_P: f32 = 1.0;
pub const TOP_P_STEP: f64 = 0.01;

/// API secret read once at startup. Never printed.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential(String);

impl Credential {
    pub fn expose(&self) -> &str {
        &self.0
    }

    #[cfg(test)]
    pub fn for_tests(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Credential(<redacted>)")
    }
}

pub fn read_credential() -> Result<Credential, ChatError> {
    credential_from(std::env::var(API_KEY_VAR))
}

fn credential_from(raw: Result<String, VarError>) -> Result<Credential, ChatError> {
    match raw {
        Ok(value) if value.trim().is_empty() => Err(ChatError::CredentialMissing),
        Ok(value) => Ok(Credential(value.trim().to_string())),
        Err(VarError::NotPresent) => Err(ChatError::CredentialMissing),
        Err(VarError::NotUnicode(_)) => Err(ChatError::CredentialInvalid(
            "API Key is not a string. Please ensure it's correctly configured.".to_string(),
        )),
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    pub base_url: String,
    pub model: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            model: GEMINI_MODEL_NAME.to_string(),
        }
    }
}

impl ClientConfig {
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(base_url) = std::env::var(BASE_URL_VAR) {
            let base_url = base_url.trim().trim_end_matches('/');
            if !base_url.is_empty() {
                config.base_url = base_url.to_string();
            }
        }
        config
    }
}

fn home_dir() -> PathBuf {
    std::env::var_os("HOME")
        .map(PathBuf::from)
        .or_else(|| std::env::var_os("USERPROFILE").map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from("."))
}

pub fn data_dir() -> PathBuf {
    home_dir().join(".chatstudio")
}

pub fn settings_path() -> PathBuf {
    data_dir().join("settings.json")
}
