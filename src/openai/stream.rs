//! Streaming relay for the primary provider's conversational endpoint.

use futures::StreamExt;
use reqwest::Client;

use super::sse::SseLineDecoder;
use super::types::{ConversationRequest, ReplyChunk};
use crate::config::OpenAiConfig;
use crate::error::{upstream_status_message, Error};
use crate::relay::sink::{ChunkSink, StreamRecord};
use crate::relay::types::Outcome;

/// Terminal SSE payload marking the end of a reply.
const DONE_PAYLOAD: &str = "[DONE]";

enum Flow {
    Continue,
    Stop,
}

/// Relay one conversational request, forwarding each reply increment
/// to the sink in arrival order.
///
/// The awaits on the upstream body are the only suspension points;
/// every received increment is handed to the sink before the next read
/// is awaited. On any failure a single failure record is delivered and
/// the relay stops — output already delivered is not retracted, and
/// nothing is retried. A closed sink (client disconnect) stops the
/// relay at the next delivery, dropping the upstream connection.
pub async fn stream_conversation<S: ChunkSink>(
    http: &Client,
    cfg: &OpenAiConfig,
    request: ConversationRequest,
    sink: &mut S,
) {
    let url = format!(
        "{}/v1/conversation",
        cfg.api_base_url.trim_end_matches('/')
    );

    let mut builder = http.post(&url).json(&request);
    if let Some(key) = &cfg.api_key {
        builder = builder.bearer_auth(key.expose_secret());
    }

    let response = match builder.send().await {
        Ok(response) => response,
        Err(e) => {
            tracing::error!(error = %e, "Failed to reach conversational endpoint");
            deliver_failure(sink, e.to_string());
            return;
        }
    };

    let status = response.status();
    if !status.is_success() {
        tracing::error!(status = %status, "Conversational endpoint returned error");
        let message = match upstream_status_message(status.as_u16()) {
            Some(message) => message.to_string(),
            None => format!("Request failed with status code {}", status.as_u16()),
        };
        deliver_failure(sink, message);
        return;
    }

    let mut decoder = SseLineDecoder::new();
    let mut upstream = response.bytes_stream();

    while let Some(next) = upstream.next().await {
        let bytes = match next {
            Ok(bytes) => bytes,
            Err(e) => {
                tracing::error!(error = %e, "Error reading reply stream");
                deliver_failure(sink, e.to_string());
                return;
            }
        };

        for payload in decoder.feed(&bytes) {
            if let Flow::Stop = forward(sink, &payload) {
                return;
            }
        }
    }

    // Stream ended without a terminator; a final unterminated line may
    // still hold one payload.
    if let Some(payload) = decoder.finish() {
        forward(sink, &payload);
    }
}

/// Forward one SSE payload to the sink.
fn forward<S: ChunkSink>(sink: &mut S, payload: &str) -> Flow {
    if payload == DONE_PAYLOAD {
        return Flow::Stop;
    }

    let chunk: ReplyChunk = match serde_json::from_str(payload) {
        Ok(chunk) => chunk,
        Err(e) => {
            tracing::warn!(error = %e, "Malformed reply chunk");
            deliver_failure(
                sink,
                Error::Protocol(format!("malformed reply chunk: {}", e)).to_string(),
            );
            return Flow::Stop;
        }
    };

    match sink.accept(&StreamRecord::Chunk(chunk)) {
        Ok(()) => Flow::Continue,
        Err(_) => {
            tracing::debug!("Sink closed, releasing upstream stream");
            Flow::Stop
        }
    }
}

/// Deliver the single terminal failure record; a closed sink is fine
/// because the relay is stopping either way.
fn deliver_failure<S: ChunkSink>(sink: &mut S, message: String) {
    let _ = sink.accept(&StreamRecord::Failure(Outcome::fail(message)));
}
