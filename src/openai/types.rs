//! Primary-provider wire types.

use serde::{Deserialize, Serialize};

use crate::relay::types::ChatRequest;

/// Outbound conversational request.
///
/// Prior conversation identifiers let the provider continue a thread;
/// this service carries no conversation state of its own.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationRequest {
    pub prompt: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system_message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub conversation_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_message_id: Option<String>,
    pub stream: bool,
}

impl ConversationRequest {
    /// Build the upstream request from an already-validated inbound one.
    pub fn from_chat(request: &ChatRequest) -> Self {
        Self {
            prompt: request.prompt.clone(),
            system_message: request.system_message.clone(),
            temperature: request.temperature,
            top_p: request.top_p,
            conversation_id: request.options.conversation_id.clone(),
            parent_message_id: request.options.parent_message_id.clone(),
            stream: true,
        }
    }
}

/// One incremental reply record from the provider, forwarded verbatim
/// to the caller's sink.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReplyChunk {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default)]
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conversation_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_message_id: Option<String>,
}
