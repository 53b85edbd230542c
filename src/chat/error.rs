use crate::config::API_KEY_VAR;
use crate::gemini::RemoteError;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ChatError {
    #[error("API Key is missing or empty. Please set the API_KEY environment variable.")]
    CredentialMissing,
    #[error("{0}")]
    CredentialInvalid(String),
    #[error("Failed to initialize Gemini AI Client: {0}. Check API_KEY and logs for details.")]
    ClientInit(String),
    #[error("Failed to create chat session: {0}. Ensure model name and parameters are correct.")]
    SessionCreate(String),
    #[error("Chat session not available. This might be due to an API key issue or recent settings change. Please wait or check settings.")]
    SessionUnavailable,
    #[error("{0}")]
    Send(SendFailure),
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SendFailure {
    #[error("API quota exceeded: {0}. Please check your Google AI Studio dashboard.")]
    RateLimited(String),
    #[error("Model related error: {message}. The model '{model}' might be unavailable or configured incorrectly.")]
    ModelConfig { message: String, model: String },
    #[error("Failed to get response: {0}")]
    Generic(String),
}

impl ChatError {
    pub fn classify_send_failure(error: &RemoteError, model: &str) -> Self {
        let message = error.message.trim();
        let lowered = message.to_ascii_lowercase();
        let display = if message.is_empty() {
            "Unknown error".to_string()
        } else {
            message.to_string()
        };

        if matches!(error.status, Some(401) | Some(403)) || lowered.contains("api key not valid") {
            return Self::CredentialInvalid(format!(
                "API key not valid. Please check your {API_KEY_VAR} environment variable."
            ));
        }
        if error.status == Some(429) || lowered.contains("quota") {
            return Self::Send(SendFailure::RateLimited(display));
        }
        let model_lowered = model.to_ascii_lowercase();
        if lowered.contains("model_name")
            || (!model_lowered.is_empty() && lowered.contains(&model_lowered))
        {
            return Self::Send(SendFailure::ModelConfig {
                message: display,
                model: model.to_string(),
            });
        }
        Self::Send(SendFailure::Generic(display))
    }

    pub fn is_credential_error(&self) -> bool {
        matches!(self, Self::CredentialMissing | Self::CredentialInvalid(_))
    }
}

#[cfg(test)]
mod tests {
    use super::{ChatError, SendFailure};
    use crate::gemini::RemoteError;

    const MODEL: &str = "gemini-test-model";

    fn classify(status: Option<u16>, message: &str) -> ChatError {
        ChatError::classify_send_failure(
            &RemoteError {
                status,
                message: message.to_string(),
            },
            MODEL,
        )
    }

    #[test]
    fn invalid_key_text_maps_to_credential_error() {
        let error = classify(Some(400), "API key not valid. Please pass a valid API key.");
        assert!(error.is_credential_error());
        assert!(error.to_string().starts_with("API key not valid."));
    }

    #[test]
    fn quota_text_maps_to_rate_limit() {
        let error = classify(None, "Resource has been exhausted (e.g. check QUOTA).");
        assert!(matches!(error, ChatError::Send(SendFailure::RateLimited(_))));
        assert!(error.to_string().contains("quota exceeded"));
    }

    #[test]
    fn status_429_is_rate_limited_without_quota_text() {
        let error = classify(Some(429), "too many requests");
        assert!(matches!(error, ChatError::Send(SendFailure::RateLimited(_))));
    }

    #[test]
    fn model_identifier_maps_to_model_config() {
        let error = classify(Some(404), "models/gemini-test-model is not found");
        assert!(matches!(error, ChatError::Send(SendFailure::ModelConfig { .. })));
        assert!(error.to_string().contains("'gemini-test-model'"));
    }

    #[test]
    fn unknown_and_empty_messages_fall_back_to_generic() {
        let error = classify(None, "connection reset by peer");
        assert_eq!(
            error.to_string(),
            "Failed to get response: connection reset by peer"
        );

        let empty = classify(None, "  ");
        assert_eq!(empty.to_string(), "Failed to get response: Unknown error");
    }
}
