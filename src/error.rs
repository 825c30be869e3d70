//! Error types for chatrelay.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

/// Result type alias for chatrelay operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for chatrelay.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] crate::config::ConfigError),

    #[error("Invalid request: {0}")]
    Validation(String),

    #[error("Upstream request failed: {0}")]
    Upstream(#[from] reqwest::Error),

    #[error("Unexpected upstream response: {0}")]
    Protocol(String),
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = match &self {
            Error::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Error::Validation(_) => StatusCode::BAD_REQUEST,
            Error::Upstream(_) => StatusCode::BAD_GATEWAY,
            Error::Protocol(_) => StatusCode::BAD_GATEWAY,
        };

        // Clients always receive the same failure shape as the relay
        // result payloads.
        let body = serde_json::json!({
            "status": "Fail",
            "message": self.to_string(),
            "data": null,
        });

        (status, axum::Json(body)).into_response()
    }
}

/// Fixed message for a known upstream HTTP status code.
///
/// The table covers the codes the upstream providers are known to
/// return; anything else falls back to the transport error's own
/// message at the call site.
pub fn upstream_status_message(code: u16) -> Option<&'static str> {
    match code {
        401 => Some("[OpenAI] 提供错误的API密钥 | Incorrect API key provided"),
        403 => Some("[OpenAI] 服务器拒绝访问，请稍后再试 | Server refused to access, please try again later"),
        500 => Some("[OpenAI] 服务器繁忙，请稍后再试 | Internal Server Error"),
        502 => Some("[OpenAI] 错误的网关 |  Bad Gateway"),
        503 => Some("[OpenAI] 服务器繁忙，请稍后再试 | Server is busy, please try again later"),
        504 => Some("[OpenAI] 网关超时 | Gateway Time-out"),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_codes_have_bespoke_messages() {
        for code in [401, 403, 500, 502, 503, 504] {
            assert!(upstream_status_message(code).is_some(), "code {}", code);
        }
    }

    #[test]
    fn unknown_codes_fall_through() {
        assert_eq!(upstream_status_message(404), None);
        assert_eq!(upstream_status_message(418), None);
        assert_eq!(upstream_status_message(200), None);
    }

    #[test]
    fn incorrect_api_key_message_is_stable() {
        // Clients match on this string; it must not drift.
        assert_eq!(
            upstream_status_message(401),
            Some("[OpenAI] 提供错误的API密钥 | Incorrect API key provided")
        );
    }
}
