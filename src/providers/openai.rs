//! OpenAI Chat Completions adapter (direct), plus the request body and
//! response extraction shared with the Azure variant.

use crate::chat::{finite, UniformChatRequest};
use crate::config::RelayConfig;
use crate::error::Result;
use crate::logging::SharedLogger;
use serde_json::{json, Value};

const PROVIDER: &str = "openai";

pub async fn complete(
    req: &UniformChatRequest,
    config: &RelayConfig,
    client: &reqwest::Client,
    logger: &SharedLogger,
) -> Result<String> {
    let api_key = config.require_openai_key()?;
    let url = format!(
        "{}/chat/completions",
        config.openai_base_url.trim_end_matches('/')
    );

    let mut body = chat_body(req);
    body["model"] = json!(req.model.id);

    logger.info(PROVIDER, format!("POST {} model={}", url, req.model.id));

    let response = client
        .post(&url)
        .header("Authorization", format!("Bearer {}", api_key))
        .header("Content-Type", "application/json")
        .json(&body)
        .send()
        .await?;

    let body = super::read_upstream_body(PROVIDER, response).await?;
    extract_choice_text(&body)
}

/// Chat Completions body shared by the direct and Azure adapters; the model
/// travels in the body for the former and in the URL path for the latter.
/// `top_p` and `max_tokens` keys appear only for finite values.
pub(crate) fn chat_body(req: &UniformChatRequest) -> Value {
    let mut messages = Vec::with_capacity(req.messages.len() + 1);

    if let Some(system) = super::system_text(req) {
        messages.push(json!({ "role": "system", "content": system }));
    }

    for m in &req.messages {
        messages.push(json!({ "role": m.role.as_str(), "content": m.content }));
    }

    let mut body = json!({
        "messages": messages,
        "temperature": req.params.temperature,
    });

    if let Some(top_p) = finite(req.params.top_p) {
        body["top_p"] = json!(top_p);
    }
    if let Some(max_tokens) = finite(req.params.max_tokens) {
        body["max_tokens"] = json!(max_tokens as u64);
    }

    body
}

/// First choice's message content; absent means an empty completion.
pub(crate) fn extract_choice_text(body: &str) -> Result<String> {
    let value: Value = serde_json::from_str(body)?;
    let text = value["choices"][0]["message"]["content"]
        .as_str()
        .unwrap_or_default();
    Ok(text.to_string())
}
