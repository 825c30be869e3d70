//! CPM conversation wire types.

use serde::{Deserialize, Serialize};

/// Message role, uppercase on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Role {
    User,
    Assistant,
    System,
}

/// A single conversation message.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ConversationMessage {
    pub role: Role,
    pub content: String,
}

impl ConversationMessage {
    /// A user-authored message.
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }
}

/// Sampling parameters for the CPM model.
///
/// The provider defaults all three to 1.02; only temperature is
/// caller-controllable through the inbound request.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelParameters {
    pub repetition_penalty: f32,
    pub ngram_penalty: f32,
    pub temperature: f32,
}

impl Default for ModelParameters {
    fn default() -> Self {
        Self {
            repetition_penalty: 1.02,
            ngram_penalty: 1.02,
            temperature: 1.02,
        }
    }
}

impl ModelParameters {
    /// Defaults with the caller's temperature applied when supplied.
    pub fn with_temperature(temperature: Option<f32>) -> Self {
        let mut params = Self::default();
        if let Some(t) = temperature {
            params.temperature = t;
        }
        params
    }
}

/// The full request body for the conversation endpoint.
///
/// Serialized exactly once per call; the signer operates over those
/// same bytes (re-serializing between sign and send would break the
/// content digest).
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationPayload<'a> {
    pub model: &'a str,
    pub action_type: &'static str,
    pub messages: &'a [ConversationMessage],
    pub max_length: u32,
    pub model_params: &'a ModelParameters,
}

impl<'a> ConversationPayload<'a> {
    pub fn new(
        model: &'a str,
        messages: &'a [ConversationMessage],
        max_length: u32,
        model_params: &'a ModelParameters,
    ) -> Self {
        Self {
            model,
            action_type: "conv",
            messages,
            max_length,
            model_params,
        }
    }
}
