//! Single-shot signed relay to the CPM conversation endpoint.

use std::time::Duration;

use reqwest::Client;

use super::signer;
use super::types::{ConversationMessage, ConversationPayload, ModelParameters};
use crate::config::CpmConfig;
use crate::error::upstream_status_message;
use crate::relay::types::Outcome;

/// Forward one conversation request to the CPM provider.
///
/// Serializes the payload exactly once and signs those bytes, issues a
/// single POST bounded by the configured timeout, and maps the result
/// to an [`Outcome`]. Every failure is converted at this boundary; no
/// error propagates to the caller and no retry is attempted (retrying
/// is the caller's decision).
pub async fn relay(
    http: &Client,
    cfg: &CpmConfig,
    messages: &[ConversationMessage],
    model_params: &ModelParameters,
) -> Outcome {
    let payload = ConversationPayload::new(&cfg.model, messages, cfg.max_length, model_params);

    let body = match serde_json::to_vec(&payload) {
        Ok(body) => body,
        Err(e) => {
            tracing::error!(error = %e, "Failed to serialize CPM payload");
            return Outcome::fail(format!("Failed to serialize request: {}", e));
        }
    };

    let envelope = signer::sign(&body, cfg.app_key.expose_secret());

    tracing::debug!(
        url = %cfg.api_url,
        model = %cfg.model,
        nonce = %envelope.nonce,
        "Sending signed CPM request"
    );

    let response = http
        .post(&cfg.api_url)
        .headers(envelope.headers(&cfg.app_id))
        .body(body)
        .timeout(Duration::from_millis(cfg.timeout_ms))
        .send()
        .await;

    let response = match response {
        Ok(response) => response,
        Err(e) => {
            tracing::error!(error = %e, "Failed to reach CPM provider");
            return Outcome::fail(e.to_string());
        }
    };

    let status = response.status();
    if !status.is_success() {
        tracing::error!(status = %status, "CPM provider returned error");
        let message = match upstream_status_message(status.as_u16()) {
            Some(message) => message.to_string(),
            // Unmapped status: same text the transport layer uses.
            None => format!("Request failed with status code {}", status.as_u16()),
        };
        return Outcome::fail(message);
    }

    match response.json::<serde_json::Value>().await {
        Ok(data) => Outcome::success(data),
        Err(e) => {
            tracing::error!(error = %e, "Failed to parse CPM response");
            Outcome::fail(e.to_string())
        }
    }
}
