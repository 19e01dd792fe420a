use crate::error::{RelayError, Result};

pub const DEFAULT_AWS_REGION: &str = "us-east-1";
pub const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_AZURE_API_VERSION: &str = "2024-02-15-preview";
pub const DEFAULT_GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Immutable provider configuration, read from the environment once at
/// startup and injected into the adapters. Credentials stay optional here;
/// each adapter demands the ones it needs right before its outbound call.
#[derive(Debug, Clone)]
pub struct RelayConfig {
    pub bedrock_bearer_token: Option<String>,
    pub aws_region: String,
    pub openai_api_key: Option<String>,
    pub openai_base_url: String,
    pub azure_api_key: Option<String>,
    pub azure_endpoint: Option<String>,
    pub azure_api_version: String,
    pub gemini_api_key: Option<String>,
    pub gemini_base_url: String,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            bedrock_bearer_token: None,
            aws_region: DEFAULT_AWS_REGION.to_string(),
            openai_api_key: None,
            openai_base_url: DEFAULT_OPENAI_BASE_URL.to_string(),
            azure_api_key: None,
            azure_endpoint: None,
            azure_api_version: DEFAULT_AZURE_API_VERSION.to_string(),
            gemini_api_key: None,
            gemini_base_url: DEFAULT_GEMINI_BASE_URL.to_string(),
        }
    }
}

impl RelayConfig {
    pub fn from_env() -> Self {
        Self {
            bedrock_bearer_token: env_var("AWS_BEARER_TOKEN_BEDROCK"),
            aws_region: env_var("AWS_DEFAULT_REGION")
                .unwrap_or_else(|| DEFAULT_AWS_REGION.to_string()),
            openai_api_key: env_var("OPENAI_API_KEY"),
            openai_base_url: env_var("OPENAI_BASE_URL")
                .unwrap_or_else(|| DEFAULT_OPENAI_BASE_URL.to_string()),
            azure_api_key: env_var("AZURE_OPENAI_API_KEY"),
            azure_endpoint: env_var("AZURE_OPENAI_ENDPOINT"),
            azure_api_version: env_var("AZURE_OPENAI_API_VERSION")
                .unwrap_or_else(|| DEFAULT_AZURE_API_VERSION.to_string()),
            gemini_api_key: env_var("GEMINI_API_KEY"),
            gemini_base_url: env_var("GEMINI_BASE_URL")
                .unwrap_or_else(|| DEFAULT_GEMINI_BASE_URL.to_string()),
        }
    }

    pub fn require_bedrock_token(&self) -> Result<&str> {
        require(&self.bedrock_bearer_token, "AWS_BEARER_TOKEN_BEDROCK")
    }

    pub fn require_openai_key(&self) -> Result<&str> {
        require(&self.openai_api_key, "OPENAI_API_KEY")
    }

    pub fn require_azure_key(&self) -> Result<&str> {
        require(&self.azure_api_key, "AZURE_OPENAI_API_KEY")
    }

    pub fn require_azure_endpoint(&self) -> Result<&str> {
        require(&self.azure_endpoint, "AZURE_OPENAI_ENDPOINT")
    }

    pub fn require_gemini_key(&self) -> Result<&str> {
        require(&self.gemini_api_key, "GEMINI_API_KEY")
    }

    /// Provider tags that have their required credentials present, for the
    /// startup summary.
    pub fn configured_providers(&self) -> Vec<&'static str> {
        let mut tags = Vec::new();
        if self.bedrock_bearer_token.is_some() {
            tags.push("bedrock");
        }
        if self.openai_api_key.is_some() {
            tags.push("openai");
        }
        if self.azure_api_key.is_some() && self.azure_endpoint.is_some() {
            tags.push("azure");
        }
        if self.gemini_api_key.is_some() {
            tags.push("gemini");
        }
        tags
    }
}

fn env_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.is_empty())
}

fn require<'a>(value: &'a Option<String>, variable: &'static str) -> Result<&'a str> {
    value
        .as_deref()
        .filter(|v| !v.is_empty())
        .ok_or(RelayError::MissingCredential { variable })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let config = RelayConfig::default();
        assert_eq!(config.aws_region, "us-east-1");
        assert_eq!(config.openai_base_url, "https://api.openai.com/v1");
        assert_eq!(config.azure_api_version, "2024-02-15-preview");
        assert_eq!(
            config.gemini_base_url,
            "https://generativelanguage.googleapis.com/v1beta"
        );
    }

    #[test]
    fn require_names_the_missing_variable() {
        let config = RelayConfig::default();
        let err = config.require_openai_key().unwrap_err();
        assert!(err.to_string().contains("OPENAI_API_KEY"));

        let err = config.require_bedrock_token().unwrap_err();
        assert!(err.to_string().contains("AWS_BEARER_TOKEN_BEDROCK"));
    }

    #[test]
    fn empty_string_counts_as_absent() {
        let config = RelayConfig {
            gemini_api_key: Some(String::new()),
            ..RelayConfig::default()
        };
        assert!(config.require_gemini_key().is_err());
    }

    #[test]
    fn configured_providers_reflect_present_credentials() {
        let config = RelayConfig {
            openai_api_key: Some("sk-test".to_string()),
            gemini_api_key: Some("g-test".to_string()),
            ..RelayConfig::default()
        };
        assert_eq!(config.configured_providers(), vec!["openai", "gemini"]);
    }
}
