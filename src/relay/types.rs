//! Inbound request and normalized result types.

use serde::{Deserialize, Serialize};

use crate::error::Error;

/// Prior conversation state supplied by the client ("options" on the wire).
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatContext {
    pub conversation_id: Option<String>,
    pub parent_message_id: Option<String>,
}

/// An inbound chat request.
///
/// Immutable once received. `prompt` is required and non-empty;
/// everything else is optional. `top_p` keeps its snake_case wire name
/// while `systemMessage` arrives camelCase, matching the clients this
/// service already has.
#[derive(Debug, Clone, Deserialize)]
pub struct ChatRequest {
    #[serde(default)]
    pub prompt: String,
    #[serde(default)]
    pub options: ChatContext,
    #[serde(default, rename = "systemMessage")]
    pub system_message: Option<String>,
    #[serde(default)]
    pub temperature: Option<f32>,
    #[serde(default)]
    pub top_p: Option<f32>,
}

impl ChatRequest {
    /// Check the request before any upstream call is made.
    pub fn validate(&self) -> crate::Result<()> {
        if self.prompt.trim().is_empty() {
            return Err(Error::Validation("prompt must not be empty".to_string()));
        }

        if let Some(t) = self.temperature {
            if !(0.0..=2.0).contains(&t) {
                return Err(Error::Validation(
                    "temperature must be between 0 and 2".to_string(),
                ));
            }
        }

        if let Some(p) = self.top_p {
            if !(0.0..=1.0).contains(&p) {
                return Err(Error::Validation(
                    "top_p must be between 0 and 1".to_string(),
                ));
            }
        }

        Ok(())
    }
}

/// Outcome status, `"Success"` or `"Fail"` on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub enum Status {
    Success,
    Fail,
}

/// The normalized result shape returned to clients by both relays.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Outcome {
    pub status: Status,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub message: String,
    #[serde(default)]
    pub data: serde_json::Value,
}

impl Outcome {
    pub fn success(data: serde_json::Value) -> Self {
        Self {
            status: Status::Success,
            message: String::new(),
            data,
        }
    }

    pub fn fail(message: impl Into<String>) -> Self {
        Self {
            status: Status::Fail,
            message: message.into(),
            data: serde_json::Value::Null,
        }
    }

    pub fn is_fail(&self) -> bool {
        self.status == Status::Fail
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(prompt: &str) -> ChatRequest {
        ChatRequest {
            prompt: prompt.to_string(),
            options: ChatContext::default(),
            system_message: None,
            temperature: None,
            top_p: None,
        }
    }

    #[test]
    fn valid_request_passes() {
        assert!(request("hello").validate().is_ok());
    }

    #[test]
    fn empty_prompt_rejected() {
        assert!(request("").validate().is_err());
        assert!(request("   ").validate().is_err());
    }

    #[test]
    fn temperature_range_enforced() {
        let mut req = request("hello");
        req.temperature = Some(2.0);
        assert!(req.validate().is_ok());

        req.temperature = Some(2.1);
        assert!(req.validate().is_err());

        req.temperature = Some(-0.1);
        assert!(req.validate().is_err());
    }

    #[test]
    fn top_p_range_enforced() {
        let mut req = request("hello");
        req.top_p = Some(1.0);
        assert!(req.validate().is_ok());

        req.top_p = Some(1.5);
        assert!(req.validate().is_err());
    }

    #[test]
    fn request_deserializes_wire_names() {
        let json = r#"{
            "prompt": "hi",
            "options": {"conversationId": "c-1", "parentMessageId": "m-1"},
            "systemMessage": "be terse",
            "temperature": 0.8,
            "top_p": 0.9
        }"#;

        let req: ChatRequest = serde_json::from_str(json).unwrap();
        assert_eq!(req.prompt, "hi");
        assert_eq!(req.options.conversation_id.as_deref(), Some("c-1"));
        assert_eq!(req.options.parent_message_id.as_deref(), Some("m-1"));
        assert_eq!(req.system_message.as_deref(), Some("be terse"));
        assert_eq!(req.temperature, Some(0.8));
        assert_eq!(req.top_p, Some(0.9));
    }

    #[test]
    fn missing_optional_fields_default() {
        let req: ChatRequest = serde_json::from_str(r#"{"prompt": "hi"}"#).unwrap();
        assert!(req.options.conversation_id.is_none());
        assert!(req.system_message.is_none());
        assert!(req.temperature.is_none());
    }

    #[test]
    fn success_outcome_serializes_without_message() {
        let outcome = Outcome::success(serde_json::json!({"reply": "ok"}));
        let json = serde_json::to_string(&outcome).unwrap();
        assert_eq!(json, r#"{"status":"Success","data":{"reply":"ok"}}"#);
    }

    #[test]
    fn fail_outcome_serializes_with_null_data() {
        let outcome = Outcome::fail("boom");
        let json = serde_json::to_string(&outcome).unwrap();
        assert_eq!(json, r#"{"status":"Fail","message":"boom","data":null}"#);
    }
}
