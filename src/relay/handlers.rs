//! HTTP request handlers.

use std::convert::Infallible;

use axum::{
    body::Body,
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Json, Response},
};
use futures::StreamExt;
use tokio::sync::mpsc;
use tokio_stream::wrappers::UnboundedReceiverStream;

use super::server::AppState;
use super::sink::{ChunkSink, RecordSink, StreamRecord};
use super::types::{ChatRequest, Outcome};
use crate::cpm::{self, ConversationMessage, ModelParameters};
use crate::openai::{self, ConversationRequest};

/// Handle POST /chat-process/chatgpt
///
/// Streams newline-separated JSON records: reply chunks in arrival
/// order, or a single failure record. The response body always ends
/// cleanly, whatever the outcome.
pub async fn chat_process_chatgpt(
    State(state): State<AppState>,
    Json(request): Json<ChatRequest>,
) -> Response {
    tracing::info!(
        has_context = request.options.conversation_id.is_some(),
        "Received streaming chat request"
    );

    let (tx, rx) = mpsc::unbounded_channel();
    let mut sink = RecordSink::new(tx);

    match request.validate() {
        Err(e) => {
            tracing::warn!(error = %e, "Rejected chat request");
            let _ = sink.accept(&StreamRecord::Failure(Outcome::fail(e.to_string())));
            // Sink is dropped when the handler returns, ending the
            // body after this one record.
        }
        Ok(()) => {
            let http = state.http.clone();
            let config = state.config.clone();
            let conversation = ConversationRequest::from_chat(&request);

            tokio::spawn(async move {
                openai::stream_conversation(&http, &config.openai, conversation, &mut sink)
                    .await;
            });
        }
    }

    let body = Body::from_stream(
        UnboundedReceiverStream::new(rx).map(Ok::<_, Infallible>),
    );

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "application/octet-stream")
        .body(body)
        .unwrap()
}

/// Handle POST /chat-process/cpm-conv
///
/// Single-shot: validates, relays once through the signed CPM call,
/// and returns the outcome object. The CPM path sends only the latest
/// user prompt upstream; the system message and prior context the
/// request may carry are not forwarded.
pub async fn chat_process_cpm_conv(
    State(state): State<AppState>,
    Json(request): Json<ChatRequest>,
) -> Json<Outcome> {
    tracing::info!("Received CPM chat request");

    if let Err(e) = request.validate() {
        tracing::warn!(error = %e, "Rejected chat request");
        return Json(Outcome::fail(e.to_string()));
    }

    let messages = vec![ConversationMessage::user(request.prompt.clone())];
    let params = ModelParameters::with_temperature(request.temperature);

    let outcome = cpm::relay(&state.http, &state.config.cpm, &messages, &params).await;
    Json(outcome)
}

/// Handle POST /config - service info plus current usage.
pub async fn config_info(State(state): State<AppState>) -> Json<Outcome> {
    let usage = openai::current_usage(&state.http, &state.config.openai).await;

    Json(Outcome::success(serde_json::json!({
        "usage": usage,
        "model": state.config.cpm.model,
        "timeout_ms": state.config.cpm.timeout_ms,
    })))
}

/// Handle GET /health
pub async fn health() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "service": "chatrelay"
    }))
}
