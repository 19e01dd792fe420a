//! Uniform chat data model and the message normalizer.
//!
//! Every adapter consumes a [`UniformChatRequest`]; no adapter ever sees the
//! raw HTTP body. All entities here are constructed fresh per request and
//! dropped once the response is sent.

use crate::error::{RelayError, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

/// The four upstream APIs the relay can target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    Bedrock,
    Openai,
    Azure,
    Gemini,
}

impl Provider {
    /// Exact-match tag lookup. Anything else is rejected so the dispatch
    /// `match` stays exhaustive over known providers.
    pub fn from_tag(tag: &str) -> Result<Self> {
        match tag {
            "bedrock" => Ok(Provider::Bedrock),
            "openai" => Ok(Provider::Openai),
            "azure" => Ok(Provider::Azure),
            "gemini" => Ok(Provider::Gemini),
            other => Err(RelayError::UnsupportedProvider(other.to_string())),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Provider::Bedrock => "bedrock",
            Provider::Openai => "openai",
            Provider::Azure => "azure",
            Provider::Gemini => "gemini",
        }
    }
}

/// Per-request model selection, owned by the caller and never persisted.
#[derive(Debug, Clone)]
pub struct ModelConfig {
    pub id: String,
    pub name: Option<String>,
    pub provider: Provider,
    /// Bedrock inference-profile ARN/id, preferred over `id` when set.
    pub inference_profile: Option<String>,
    /// Azure deployment name, preferred over `id` when set.
    pub deployment: Option<String>,
    pub max_tokens: Option<u32>,
    pub stop_sequences: Option<Vec<String>>,
    pub thinking_type: Option<String>,
    pub output_effort: Option<String>,
    pub latency: Option<String>,
}

impl ModelConfig {
    /// A bare model id with no overrides (legacy request shape).
    pub fn bare(id: impl Into<String>, provider: Provider) -> Self {
        Self {
            id: id.into(),
            name: None,
            provider,
            inference_profile: None,
            deployment: None,
            max_tokens: None,
            stop_sequences: None,
            thinking_type: None,
            output_effort: None,
            latency: None,
        }
    }
}

/// Wire shape of the `selectedModel` field on incoming requests.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ModelSpec {
    pub id: String,
    pub name: Option<String>,
    pub provider: Option<String>,
    pub inference_profile: Option<String>,
    pub deployment: Option<String>,
    pub max_tokens: Option<u32>,
    pub stop_sequences: Option<Vec<String>>,
    pub thinking_type: Option<String>,
    pub output_effort: Option<String>,
    pub latency: Option<String>,
}

impl ModelSpec {
    pub fn into_model_config(self, provider: Provider) -> ModelConfig {
        ModelConfig {
            id: self.id,
            name: self.name,
            provider,
            inference_profile: self.inference_profile,
            deployment: self.deployment,
            max_tokens: self.max_tokens,
            stop_sequences: self.stop_sequences,
            thinking_type: self.thinking_type,
            output_effort: self.output_effort,
            latency: self.latency,
        }
    }
}

/// Generation knobs. Numeric values are filtered through [`finite`] so a
/// non-finite value is indistinguishable from an absent one and the
/// provider's own default governs.
#[derive(Debug, Clone)]
pub struct GenerationParameters {
    pub temperature: f64,
    pub top_p: Option<f64>,
    pub top_k: Option<f64>,
    pub max_tokens: Option<f64>,
    pub thinking_type: Option<String>,
    pub output_effort: Option<String>,
}

impl Default for GenerationParameters {
    fn default() -> Self {
        Self {
            temperature: 0.7,
            top_p: None,
            top_k: None,
            max_tokens: None,
            thinking_type: None,
            output_effort: None,
        }
    }
}

/// The sole internal contract between handlers and adapters.
#[derive(Debug, Clone)]
pub struct UniformChatRequest {
    pub provider: Provider,
    pub messages: Vec<ChatMessage>,
    pub system: Option<String>,
    pub model: ModelConfig,
    pub params: GenerationParameters,
}

/// Treat non-finite numeric knobs as absent.
pub fn finite(value: Option<f64>) -> Option<f64> {
    value.filter(|v| v.is_finite())
}

/// Coerce an arbitrary JSON value into a well-formed ordered message list.
///
/// Never fails: a non-array input yields an empty list, malformed elements
/// are dropped, and surviving elements keep their input order.
pub fn normalize_messages(raw: &Value) -> Vec<ChatMessage> {
    let Some(items) = raw.as_array() else {
        return Vec::new();
    };

    items
        .iter()
        .filter_map(|item| {
            let obj = item.as_object()?;

            // Assistant only on exact match, everything else is the user.
            let role = match obj.get("role").and_then(Value::as_str) {
                Some("assistant") => Role::Assistant,
                _ => Role::User,
            };

            let content = match obj.get("content") {
                None | Some(Value::Null) => String::new(),
                Some(Value::String(s)) => s.clone(),
                Some(other) => other.to_string(),
            };

            let trimmed = content.trim();
            if trimmed.is_empty() {
                return None;
            }

            Some(ChatMessage {
                role,
                content: trimmed.to_string(),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn non_array_input_yields_empty_list() {
        assert!(normalize_messages(&json!(null)).is_empty());
        assert!(normalize_messages(&json!("hello")).is_empty());
        assert!(normalize_messages(&json!({"role": "user"})).is_empty());
        assert!(normalize_messages(&json!(42)).is_empty());
    }

    #[test]
    fn non_object_elements_are_dropped() {
        let raw = json!(["hi", 1, null, {"role": "user", "content": "kept"}]);
        let messages = normalize_messages(&raw);
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].content, "kept");
    }

    #[test]
    fn role_is_assistant_only_on_exact_match() {
        let raw = json!([
            {"role": "assistant", "content": "a"},
            {"role": "Assistant", "content": "b"},
            {"role": "system", "content": "c"},
            {"content": "d"},
            {"role": 7, "content": "e"},
        ]);
        let roles: Vec<Role> = normalize_messages(&raw).iter().map(|m| m.role).collect();
        assert_eq!(
            roles,
            vec![Role::Assistant, Role::User, Role::User, Role::User, Role::User]
        );
    }

    #[test]
    fn empty_or_whitespace_content_is_dropped_and_order_preserved() {
        let raw = json!([
            {"role": "user", "content": "first"},
            {"role": "user", "content": "   "},
            {"role": "user"},
            {"role": "user", "content": null},
            {"role": "assistant", "content": "second"},
        ]);
        let messages = normalize_messages(&raw);
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].content, "first");
        assert_eq!(messages[1].content, "second");
    }

    #[test]
    fn structured_content_is_stringified() {
        let raw = json!([{"role": "user", "content": {"a": 1}}]);
        let messages = normalize_messages(&raw);
        assert_eq!(messages[0].content, r#"{"a":1}"#);
    }

    #[test]
    fn content_is_trimmed() {
        let raw = json!([{"role": "user", "content": "  hi  "}]);
        assert_eq!(normalize_messages(&raw)[0].content, "hi");
    }

    #[test]
    fn unknown_provider_tag_is_rejected() {
        let err = Provider::from_tag("mistral").unwrap_err();
        assert!(err.to_string().contains("mistral"));
        // Tags match exactly, no case folding.
        assert!(Provider::from_tag("Bedrock").is_err());
        assert_eq!(Provider::from_tag("gemini").unwrap(), Provider::Gemini);
    }

    #[test]
    fn finite_filters_nan_and_infinity() {
        assert_eq!(finite(Some(0.5)), Some(0.5));
        assert_eq!(finite(Some(f64::NAN)), None);
        assert_eq!(finite(Some(f64::INFINITY)), None);
        assert_eq!(finite(None), None);
    }

    #[test]
    fn model_spec_deserializes_camel_case() {
        let spec: ModelSpec = serde_json::from_value(json!({
            "id": "m1",
            "provider": "bedrock",
            "inferenceProfile": "us.profile",
            "maxTokens": 2048,
            "stopSequences": ["END"],
            "thinkingType": "enabled",
            "outputEffort": "low",
            "latency": "optimized",
        }))
        .unwrap();

        assert_eq!(spec.id, "m1");
        assert_eq!(spec.inference_profile.as_deref(), Some("us.profile"));
        assert_eq!(spec.max_tokens, Some(2048));

        let model = spec.into_model_config(Provider::Bedrock);
        assert_eq!(model.provider, Provider::Bedrock);
        assert_eq!(model.thinking_type.as_deref(), Some("enabled"));
    }
}
