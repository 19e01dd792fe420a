//! Google Gemini generateContent adapter.
//!
//! Gemini's structured multi-turn shape is not used here: the history is
//! flattened into one role-prefixed transcript and sent as a single user
//! content block. The API key travels as a query parameter, not a header.

use crate::chat::{finite, ChatMessage, Role, UniformChatRequest};
use crate::config::RelayConfig;
use crate::error::Result;
use crate::logging::SharedLogger;
use serde_json::{json, Map, Value};

const PROVIDER: &str = "gemini";

pub async fn complete(
    req: &UniformChatRequest,
    config: &RelayConfig,
    client: &reqwest::Client,
    logger: &SharedLogger,
) -> Result<String> {
    let api_key = config.require_gemini_key()?;
    let url = format!(
        "{}/models/{}:generateContent?key={}",
        config.gemini_base_url.trim_end_matches('/'),
        urlencoding::encode(&req.model.id),
        api_key
    );

    let body = build_body(req);

    logger.info(PROVIDER, format!("POST generateContent model={}", req.model.id));

    let response = client
        .post(&url)
        .header("Content-Type", "application/json")
        .json(&body)
        .send()
        .await?;

    let body = super::read_upstream_body(PROVIDER, response).await?;
    extract_text(&body)
}

pub(crate) fn build_body(req: &UniformChatRequest) -> Value {
    let mut body = json!({
        "contents": [{
            "role": "user",
            "parts": [{ "text": flatten_transcript(&req.messages) }],
        }],
    });

    if let Some(system) = super::system_text(req) {
        body["systemInstruction"] = json!({ "parts": [{ "text": system }] });
    }

    if let Some(config) = generation_config(req) {
        body["generationConfig"] = Value::Object(config);
    }

    body
}

/// One line per message, prefixed by speaker.
pub(crate) fn flatten_transcript(messages: &[ChatMessage]) -> String {
    messages
        .iter()
        .map(|m| {
            let speaker = match m.role {
                Role::User => "User",
                Role::Assistant => "Assistant",
            };
            format!("{}: {}", speaker, m.content)
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Knobs are included only when finite; the whole field is omitted when none
/// survive so Gemini's defaults govern.
fn generation_config(req: &UniformChatRequest) -> Option<Map<String, Value>> {
    let mut config = Map::new();

    if let Some(temperature) = finite(Some(req.params.temperature)) {
        config.insert("temperature".to_string(), json!(temperature));
    }
    if let Some(top_p) = finite(req.params.top_p) {
        config.insert("topP".to_string(), json!(top_p));
    }
    if let Some(top_k) = finite(req.params.top_k) {
        config.insert("topK".to_string(), json!(top_k as u64));
    }
    if let Some(max_tokens) = finite(req.params.max_tokens) {
        config.insert("maxOutputTokens".to_string(), json!(max_tokens as u64));
    }

    if config.is_empty() {
        None
    } else {
        Some(config)
    }
}

/// First candidate's first content part; absent means an empty completion.
pub(crate) fn extract_text(body: &str) -> Result<String> {
    let value: Value = serde_json::from_str(body)?;
    let text = value["candidates"][0]["content"]["parts"][0]["text"]
        .as_str()
        .unwrap_or_default();
    Ok(text.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chat::Provider;
    use crate::providers::testutil::request_for;

    #[test]
    fn transcript_is_role_prefixed_lines() {
        let req = request_for(Provider::Gemini, "gemini-2.0-flash");
        assert_eq!(
            flatten_transcript(&req.messages),
            "User: hi\nAssistant: hello\nUser: how are you?"
        );
    }

    #[test]
    fn body_wraps_transcript_in_single_user_block() {
        let req = request_for(Provider::Gemini, "gemini-2.0-flash");
        let body = build_body(&req);

        let contents = body["contents"].as_array().unwrap();
        assert_eq!(contents.len(), 1);
        assert_eq!(contents[0]["role"], "user");
        assert!(contents[0]["parts"][0]["text"]
            .as_str()
            .unwrap()
            .starts_with("User: hi"));
    }

    #[test]
    fn system_instruction_is_a_separate_field() {
        let mut req = request_for(Provider::Gemini, "g");
        assert!(build_body(&req).get("systemInstruction").is_none());

        req.system = Some("answer in French".to_string());
        let body = build_body(&req);
        assert_eq!(
            body["systemInstruction"]["parts"][0]["text"],
            "answer in French"
        );
    }

    #[test]
    fn generation_config_gates_on_finiteness() {
        let mut req = request_for(Provider::Gemini, "g");
        req.params.temperature = 0.3;
        req.params.top_p = Some(f64::NAN);
        req.params.top_k = Some(40.0);
        req.params.max_tokens = Some(512.0);

        let body = build_body(&req);
        let config = &body["generationConfig"];
        assert_eq!(config["temperature"], 0.3);
        assert!(config.get("topP").is_none());
        assert_eq!(config["topK"], 40);
        assert_eq!(config["maxOutputTokens"], 512);
    }

    #[test]
    fn generation_config_omitted_when_nothing_finite() {
        let mut req = request_for(Provider::Gemini, "g");
        req.params.temperature = f64::NAN;
        let body = build_body(&req);
        assert!(body.get("generationConfig").is_none());
    }

    #[test]
    fn extracts_first_candidate_part() {
        let body = r#"{"candidates": [{"content": {"parts": [{"text": "OK"}]}}]}"#;
        assert_eq!(extract_text(body).unwrap(), "OK");
    }

    #[test]
    fn missing_candidates_yield_empty_string() {
        assert_eq!(extract_text(r#"{"candidates": []}"#).unwrap(), "");
        assert_eq!(extract_text(r#"{}"#).unwrap(), "");
    }
}
