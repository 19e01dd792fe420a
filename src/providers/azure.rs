//! Azure OpenAI adapter (enterprise gateway variant of Chat Completions).
//!
//! Same body shape as the direct adapter, but the deployment name and API
//! version live in the URL and auth uses the `api-key` header.

use crate::chat::UniformChatRequest;
use crate::config::RelayConfig;
use crate::error::Result;
use crate::logging::SharedLogger;

const PROVIDER: &str = "azure";

pub async fn complete(
    req: &UniformChatRequest,
    config: &RelayConfig,
    client: &reqwest::Client,
    logger: &SharedLogger,
) -> Result<String> {
    let api_key = config.require_azure_key()?;
    let endpoint = config.require_azure_endpoint()?;
    let url = deployment_url(endpoint, &config.azure_api_version, &req.model);

    let body = super::openai::chat_body(req);

    logger.info(PROVIDER, format!("POST {}", url));

    let response = client
        .post(&url)
        .header("api-key", api_key)
        .header("Content-Type", "application/json")
        .json(&body)
        .send()
        .await?;

    let body = super::read_upstream_body(PROVIDER, response).await?;
    super::openai::extract_choice_text(&body)
}

/// Deployment override wins over the model id.
pub(crate) fn deployment_url(
    endpoint: &str,
    api_version: &str,
    model: &crate::chat::ModelConfig,
) -> String {
    let deployment = model
        .deployment
        .as_deref()
        .filter(|d| !d.is_empty())
        .unwrap_or(&model.id);
    format!(
        "{}/openai/deployments/{}/chat/completions?api-version={}",
        endpoint.trim_end_matches('/'),
        urlencoding::encode(deployment),
        api_version
    )
}
