//! Error types for the relay.

use thiserror::Error;

#[derive(Error, Debug)]
#[non_exhaustive]
pub enum RelayError {
    #[error("{message}")]
    Validation { message: String },

    #[error("Missing credential: environment variable '{variable}' is not set")]
    MissingCredential { variable: &'static str },

    #[error("{provider} request failed with status {status}: {body}")]
    Upstream {
        provider: &'static str,
        status: u16,
        body: String,
    },

    #[error("Unsupported provider: '{0}'")]
    UnsupportedProvider(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl RelayError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation {
            message: msg.into(),
        }
    }

    pub fn missing_credential(variable: &'static str) -> Self {
        Self::MissingCredential { variable }
    }

    pub fn upstream(provider: &'static str, status: u16, body: impl Into<String>) -> Self {
        Self::Upstream {
            provider,
            status,
            body: body.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, RelayError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn upstream_error_carries_provider_status_and_body() {
        let err = RelayError::upstream("bedrock", 403, "access denied");
        let msg = err.to_string();
        assert!(msg.contains("bedrock"));
        assert!(msg.contains("403"));
        assert!(msg.contains("access denied"));
    }

    #[test]
    fn missing_credential_names_the_variable() {
        let err = RelayError::missing_credential("OPENAI_API_KEY");
        assert!(err.to_string().contains("OPENAI_API_KEY"));
    }
}
