//! AWS Bedrock Converse adapter.
//!
//! Talks to the Converse REST endpoint directly with a bearer token (no
//! SigV4), the model id or inference profile URL-encoded into the path.

use crate::chat::UniformChatRequest;
use crate::config::RelayConfig;
use crate::error::Result;
use crate::logging::SharedLogger;
use serde_json::{json, Map, Value};

const PROVIDER: &str = "bedrock";
const DEFAULT_MAX_TOKENS: u32 = 4096;
const MAX_TOKENS_CEILING: i64 = 64_000;

pub async fn complete(
    req: &UniformChatRequest,
    config: &RelayConfig,
    client: &reqwest::Client,
    logger: &SharedLogger,
) -> Result<String> {
    let token = config.require_bedrock_token()?;
    let url = converse_url(&config.aws_region, &req.model.inference_profile, &req.model.id);
    let body = build_body(req);

    logger.info(PROVIDER, format!("POST {}", url));

    let response = client
        .post(&url)
        .header("Authorization", format!("Bearer {}", token))
        .header("Content-Type", "application/json")
        .json(&body)
        .send()
        .await?;

    let body = super::read_upstream_body(PROVIDER, response).await?;
    extract_text(&body)
}

/// The inference profile, when configured, replaces the plain model id.
pub(crate) fn converse_url(region: &str, inference_profile: &Option<String>, model_id: &str) -> String {
    let target = inference_profile
        .as_deref()
        .filter(|p| !p.is_empty())
        .unwrap_or(model_id);
    format!(
        "https://bedrock-runtime.{}.amazonaws.com/model/{}/converse",
        region,
        urlencoding::encode(target)
    )
}

pub(crate) fn build_body(req: &UniformChatRequest) -> Value {
    let messages: Vec<Value> = req
        .messages
        .iter()
        .map(|m| {
            json!({
                "role": m.role.as_str(),
                "content": [{ "text": m.content }],
            })
        })
        .collect();

    let mut inference_config = json!({
        "temperature": req.params.temperature,
        "maxTokens": resolve_max_tokens(req.params.max_tokens, req.model.max_tokens),
    });

    if let Some(stops) = stop_sequences(req.model.stop_sequences.as_deref()) {
        inference_config["stopSequences"] = json!(stops);
    }

    let mut body = json!({
        "messages": messages,
        "inferenceConfig": inference_config,
    });

    if let Some(system) = super::system_text(req) {
        body["system"] = json!([{ "text": system }]);
    }

    if let Some(fields) = model_request_fields(req) {
        body["additionalModelRequestFields"] = Value::Object(fields);
    }

    if let Some(latency) = req.model.latency.as_deref().filter(|l| !l.is_empty()) {
        body["performanceConfig"] = json!({ "latency": latency });
    }

    body
}

/// Explicit per-request override → per-model default → 4096, always clamped
/// into [1, 64000]. A non-finite override falls back down the chain.
pub(crate) fn resolve_max_tokens(requested: Option<f64>, model_default: Option<u32>) -> u32 {
    let value = match requested.filter(|v| v.is_finite()) {
        Some(v) => v as i64,
        None => i64::from(model_default.unwrap_or(DEFAULT_MAX_TOKENS)),
    };
    value.clamp(1, MAX_TOKENS_CEILING) as u32
}

fn stop_sequences(configured: Option<&[String]>) -> Option<Vec<String>> {
    let stops: Vec<String> = configured?
        .iter()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect();
    if stops.is_empty() {
        None
    } else {
        Some(stops)
    }
}

/// Thinking mode and output effort are merged into one nested field, present
/// only when at least one of them is set. Request-level values win over the
/// model-level defaults.
fn model_request_fields(req: &UniformChatRequest) -> Option<Map<String, Value>> {
    let thinking = req
        .params
        .thinking_type
        .as_deref()
        .or(req.model.thinking_type.as_deref())
        .filter(|t| !t.is_empty());
    let effort = req
        .params
        .output_effort
        .as_deref()
        .or(req.model.output_effort.as_deref())
        .filter(|e| !e.is_empty());

    if thinking.is_none() && effort.is_none() {
        return None;
    }

    let mut fields = Map::new();
    if let Some(t) = thinking {
        fields.insert("thinking".to_string(), json!({ "type": t }));
    }
    if let Some(e) = effort {
        fields.insert("outputEffort".to_string(), json!(e));
    }
    Some(fields)
}

/// Scan the response message's content blocks for the first one carrying a
/// text attribute; none found means an empty completion, not an error.
pub(crate) fn extract_text(body: &str) -> Result<String> {
    let value: Value = serde_json::from_str(body)?;
    let text = value["output"]["message"]["content"]
        .as_array()
        .and_then(|blocks| blocks.iter().find_map(|b| b["text"].as_str()))
        .unwrap_or_default();
    Ok(text.to_string())
}
