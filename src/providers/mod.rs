//! Provider adapters and the dispatcher.
//!
//! Each adapter translates a [`UniformChatRequest`] into its provider's wire
//! format, performs a single outbound POST, and extracts the assistant text.
//! Adding a provider means adding an enum variant plus a module; the
//! dispatch `match` below is exhaustive so the compiler flags anything missed.

pub mod azure;
pub mod bedrock;
pub mod gemini;
pub mod openai;

use crate::chat::{Provider, UniformChatRequest};
use crate::config::RelayConfig;
use crate::error::{RelayError, Result};
use crate::logging::SharedLogger;

/// Route a uniform request to the adapter for its provider tag.
/// No retry, no fallback to another provider.
pub async fn dispatch(
    req: &UniformChatRequest,
    config: &RelayConfig,
    client: &reqwest::Client,
    logger: &SharedLogger,
) -> Result<String> {
    match req.provider {
        Provider::Bedrock => bedrock::complete(req, config, client, logger).await,
        Provider::Openai => openai::complete(req, config, client, logger).await,
        Provider::Azure => azure::complete(req, config, client, logger).await,
        Provider::Gemini => gemini::complete(req, config, client, logger).await,
    }
}

/// Read the full upstream body as text first so error detail survives, then
/// gate on the status code. Non-2xx passes the raw body through verbatim.
pub(crate) async fn read_upstream_body(
    provider: &'static str,
    response: reqwest::Response,
) -> Result<String> {
    let status = response.status().as_u16();
    let body = response.text().await?;

    if !(200..300).contains(&status) {
        return Err(RelayError::upstream(provider, status, body));
    }

    Ok(body)
}

/// A non-empty system instruction, trimmed; empty instructions are omitted
/// from every provider body.
pub(crate) fn system_text(req: &UniformChatRequest) -> Option<&str> {
    req.system
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
}
