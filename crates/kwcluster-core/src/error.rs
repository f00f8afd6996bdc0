/// Errors that can occur while fetching, caching or mutating keywords.
#[derive(Debug, thiserror::Error)]
pub enum KeywordError {
    #[error("Network error: {message}")]
    Network { message: String },
    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },
    #[error("Failed to decode response: {message}")]
    Decode { message: String },
    #[error("{message}")]
    InvalidInput { message: String },
    #[error("Another {operation} is already running")]
    Busy { operation: String },
}

impl KeywordError {
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput {
            message: message.into(),
        }
    }

    /// Short text suitable for a transient notification.
    pub fn user_message(&self) -> String {
        match self {
            Self::Network { .. } => "Network error, please retry".to_string(),
            Self::Api { message, .. } if !message.is_empty() => message.clone(),
            Self::Api { status, .. } => format!("Server returned {}", status),
            Self::Decode { .. } => "Unexpected response from server".to_string(),
            Self::InvalidInput { message } => message.clone(),
            Self::Busy { operation } => format!("Please wait, {} in progress", operation),
        }
    }
}

impl From<reqwest::Error> for KeywordError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            Self::Decode {
                message: err.to_string(),
            }
        } else {
            Self::Network {
                message: err.to_string(),
            }
        }
    }
}

impl From<serde_json::Error> for KeywordError {
    fn from(err: serde_json::Error) -> Self {
        Self::Decode {
            message: err.to_string(),
        }
    }
}
