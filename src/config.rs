//! Configuration parsing and validation for chatrelay.

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::path::Path;

/// Root configuration structure.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    pub cpm: CpmConfig,
    #[serde(default)]
    pub openai: OpenAiConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// HTTP server configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Address to listen on (e.g., "127.0.0.1:3006")
    #[serde(default = "default_listen")]
    pub listen: String,
}

fn default_listen() -> String {
    "127.0.0.1:3006".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen: default_listen(),
        }
    }
}

/// API key wrapper that redacts in Debug/Display/Serialize and zeroizes on drop.
///
/// The inner `SecretString` ensures the key value is:
/// - Zeroized in memory when dropped
/// - Never exposed via Debug or Display
/// - Only accessible via `.expose_secret()` (grep-auditable)
#[derive(Clone)]
pub struct ApiKey(SecretString);

impl ApiKey {
    /// Access the raw key value. Every call site is auditable via `grep expose_secret`.
    pub fn expose_secret(&self) -> &str {
        self.0.expose_secret()
    }
}

impl std::fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[REDACTED]")
    }
}

impl std::fmt::Display for ApiKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[REDACTED]")
    }
}

impl Serialize for ApiKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str("[REDACTED]")
    }
}

impl<'de> serde::Deserialize<'de> for ApiKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        String::deserialize(deserializer).map(|s| ApiKey(SecretString::from(s)))
    }
}

impl From<String> for ApiKey {
    fn from(s: String) -> Self {
        ApiKey(SecretString::from(s))
    }
}

impl From<&str> for ApiKey {
    fn from(s: &str) -> Self {
        ApiKey(SecretString::from(s))
    }
}

/// How a credential was resolved.
#[derive(Debug, Clone, PartialEq)]
pub enum KeySource {
    /// Value was a literal string in config (no ${} references)
    Literal,
    /// Value contained ${VAR} references expanded from environment
    EnvExpanded,
    /// Value was auto-discovered from a convention env var (holds var name)
    Convention(String),
    /// No value available
    None,
}

impl std::fmt::Display for KeySource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            KeySource::Literal => write!(f, "config-literal"),
            KeySource::EnvExpanded => write!(f, "env-expanded"),
            KeySource::Convention(var) => write!(f, "convention ({})", var),
            KeySource::None => write!(f, "none"),
        }
    }
}

/// CPM (secondary provider) configuration.
///
/// `app_id` and `app_key` are required; the signed-request path cannot
/// operate without them, so their absence is a startup failure rather
/// than a per-request one.
#[derive(Debug, Clone, Deserialize)]
pub struct CpmConfig {
    /// Application identifier sent in the X-Model-Best-Open-App-Id header
    pub app_id: String,
    /// Application secret used as the HMAC signing key
    pub app_key: ApiKey,
    /// Conversation endpoint URL
    #[serde(default = "default_cpm_api_url")]
    pub api_url: String,
    /// Model name sent in the payload
    #[serde(default = "default_cpm_model")]
    pub model: String,
    /// Maximum reply length requested from the provider
    #[serde(default = "default_max_length")]
    pub max_length: u32,
    /// Timeout for the single synchronous upstream call, in milliseconds
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

fn default_cpm_api_url() -> String {
    "https://api.modelbest.cn/openapi/v1/conversation".to_string()
}

fn default_cpm_model() -> String {
    "cpm-conv".to_string()
}

fn default_max_length() -> u32 {
    4096
}

fn default_timeout_ms() -> u64 {
    100_000
}

/// OpenAI (primary provider) configuration.
///
/// The whole section is optional in spirit: a missing `api_key` only
/// disables usage reporting, it never fails startup.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct OpenAiConfig {
    /// Bearer credential; absent disables usage reporting
    pub api_key: Option<ApiKey>,
    /// Base URL for the conversational and billing endpoints
    #[serde(default = "default_openai_base_url")]
    pub api_base_url: String,
}

fn default_openai_base_url() -> String {
    "https://api.openai.com".to_string()
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(|e| ConfigError::Io {
            path: path.as_ref().display().to_string(),
            source: e,
        })?;

        Self::parse_str(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn parse_str(content: &str) -> Result<Self, ConfigError> {
        let config: Config = toml::from_str(content).map_err(ConfigError::Parse)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        if self.cpm.app_id.trim().is_empty() {
            return Err(ConfigError::Validation(
                "cpm.app_id must not be empty".to_string(),
            ));
        }

        if self.cpm.app_key.expose_secret().trim().is_empty() {
            return Err(ConfigError::Validation(
                "cpm.app_key must not be empty".to_string(),
            ));
        }

        if self.cpm.api_url.is_empty() {
            return Err(ConfigError::Validation(
                "cpm.api_url must not be empty".to_string(),
            ));
        }

        if self.cpm.timeout_ms == 0 {
            return Err(ConfigError::Validation(
                "cpm.timeout_ms must be greater than zero".to_string(),
            ));
        }

        if self.openai.api_key.is_none() {
            tracing::warn!("No openai.api_key configured - usage reporting disabled");
        }

        Ok(())
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Configuration validation error: {0}")]
    Validation(String),

    #[error("Environment variable '{var}' not set for '{field}': {message}")]
    EnvVar {
        var: String,
        field: String,
        message: String,
    },
}

/// Raw CPM config deserialized directly from TOML.
/// Values are plain strings so they may contain `${VAR}` references not yet expanded.
#[derive(Deserialize)]
struct RawCpmConfig {
    #[serde(default)]
    app_id: String,
    app_key: Option<String>,
    #[serde(default = "default_cpm_api_url")]
    api_url: String,
    #[serde(default = "default_cpm_model")]
    model: String,
    #[serde(default = "default_max_length")]
    max_length: u32,
    #[serde(default = "default_timeout_ms")]
    timeout_ms: u64,
}

/// Raw OpenAI config deserialized directly from TOML.
#[derive(Deserialize, Default)]
struct RawOpenAiConfig {
    api_key: Option<String>,
    #[serde(default = "default_openai_base_url")]
    api_base_url: String,
}

/// Raw configuration deserialized directly from TOML.
#[derive(Deserialize)]
pub struct RawConfig {
    #[serde(default)]
    server: ServerConfig,
    cpm: RawCpmConfig,
    #[serde(default)]
    openai: RawOpenAiConfig,
    #[serde(default)]
    logging: LoggingConfig,
}

/// Expand all `${VAR}` references in a string using a custom lookup function.
///
/// The closure-based design makes this testable without touching global env state.
/// Supports multiple `${VAR}` in one string (e.g., `${SCHEME}://${HOST}/v1`).
/// Fails on first missing variable, unclosed `${`, or empty variable name.
fn expand_env_vars_with<F>(input: &str, field: &str, lookup: F) -> Result<String, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    if !input.contains("${") {
        return Ok(input.to_string());
    }

    let mut result = String::with_capacity(input.len());
    let mut rest = input;

    while let Some(start) = rest.find("${") {
        result.push_str(&rest[..start]);
        let after = &rest[start + 2..];

        let end = after.find('}').ok_or_else(|| ConfigError::EnvVar {
            var: "<unclosed>".to_string(),
            field: field.to_string(),
            message: format!("Unclosed '${{' in config value: {}", input),
        })?;

        let var_name = &after[..end];
        if var_name.is_empty() {
            return Err(ConfigError::EnvVar {
                var: "".to_string(),
                field: field.to_string(),
                message: "Empty variable name in '${}' reference".to_string(),
            });
        }

        let value = lookup(var_name).ok_or_else(|| ConfigError::EnvVar {
            var: var_name.to_string(),
            field: field.to_string(),
            message: format!(
                "Environment variable '{}' is not set (referenced in '{}')",
                var_name, field
            ),
        })?;

        result.push_str(&value);
        rest = &after[end + 1..];
    }

    result.push_str(rest);
    Ok(result)
}

/// Expand all `${VAR}` references in a string using real environment variables.
fn expand_env_vars(input: &str, field: &str) -> Result<String, ConfigError> {
    expand_env_vars_with(input, field, |name| std::env::var(name).ok())
}

/// Convention env var consulted when `cpm.app_key` is absent from the file.
pub const CPM_APP_KEY_ENV: &str = "CHATRELAY_CPM_APP_KEY";

/// Convention env var consulted when `openai.api_key` is absent from the file.
pub const OPENAI_API_KEY_ENV: &str = "CHATRELAY_OPENAI_API_KEY";

/// Resolve an optional raw credential to an `ApiKey` plus its source.
///
/// - Literal string: wrapped directly, source = `Literal`
/// - Contains `${VAR}`: expanded from environment, source = `EnvExpanded`
/// - Absent: convention env var lookup, source = `Convention(var)` or `None`
fn resolve_key(
    raw: Option<&str>,
    field: &str,
    convention_var: &str,
) -> Result<(Option<ApiKey>, KeySource), ConfigError> {
    match raw {
        Some(value) if value.contains("${") => {
            let expanded = expand_env_vars(value, field)?;
            Ok((Some(ApiKey::from(expanded)), KeySource::EnvExpanded))
        }
        Some(value) => Ok((Some(ApiKey::from(value)), KeySource::Literal)),
        None => match std::env::var(convention_var) {
            Ok(value) => Ok((
                Some(ApiKey::from(value)),
                KeySource::Convention(convention_var.to_string()),
            )),
            Err(_) => Ok((None, KeySource::None)),
        },
    }
}

impl Config {
    /// Convert raw (deserialized) config to final config with env var expansion.
    ///
    /// Returns the config and per-credential source information for
    /// startup logging. A missing CPM app key is reported here as a
    /// validation error; a missing OpenAI key is not an error.
    pub fn from_raw(raw: RawConfig) -> Result<(Self, Vec<(String, KeySource)>), ConfigError> {
        let mut key_sources = Vec::new();

        let app_id = expand_env_vars(&raw.cpm.app_id, "cpm.app_id")?;

        let (app_key, source) = resolve_key(
            raw.cpm.app_key.as_deref(),
            "cpm.app_key",
            CPM_APP_KEY_ENV,
        )?;
        key_sources.push(("cpm.app_key".to_string(), source));
        let app_key = app_key.ok_or_else(|| {
            ConfigError::Validation(format!(
                "cpm.app_key is not configured (set it in the config file or via {})",
                CPM_APP_KEY_ENV
            ))
        })?;

        let (openai_key, source) = resolve_key(
            raw.openai.api_key.as_deref(),
            "openai.api_key",
            OPENAI_API_KEY_ENV,
        )?;
        key_sources.push(("openai.api_key".to_string(), source));

        let config = Config {
            server: raw.server,
            cpm: CpmConfig {
                app_id,
                app_key,
                api_url: raw.cpm.api_url,
                model: raw.cpm.model,
                max_length: raw.cpm.max_length,
                timeout_ms: raw.cpm.timeout_ms,
            },
            openai: OpenAiConfig {
                api_key: openai_key,
                api_base_url: raw.openai.api_base_url,
            },
            logging: raw.logging,
        };

        Ok((config, key_sources))
    }

    /// Load configuration from a TOML file with environment variable expansion.
    ///
    /// This is the env-var-aware entry point. It:
    /// 1. Reads the file
    /// 2. Parses as `RawConfig` (credentials as plain strings)
    /// 3. Expands `${VAR}` references and applies convention lookup
    /// 4. Validates the resulting config
    ///
    /// Returns the config and per-credential key source information.
    pub fn from_file_with_env(
        path: impl AsRef<Path>,
    ) -> Result<(Self, Vec<(String, KeySource)>), ConfigError> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(|e| ConfigError::Io {
            path: path.as_ref().display().to_string(),
            source: e,
        })?;

        let raw: RawConfig = toml::from_str(&content).map_err(ConfigError::Parse)?;
        let (config, key_sources) = Self::from_raw(raw)?;
        config.validate()?;

        Ok((config, key_sources))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_minimal_config() {
        let toml = r#"
            [cpm]
            app_id = "app-1"
            app_key = "secret"
        "#;

        let config = Config::parse_str(toml).unwrap();
        assert_eq!(config.server.listen, "127.0.0.1:3006");
        assert_eq!(config.cpm.model, "cpm-conv");
        assert_eq!(config.cpm.max_length, 4096);
        assert_eq!(config.cpm.timeout_ms, 100_000);
        assert_eq!(
            config.cpm.api_url,
            "https://api.modelbest.cn/openapi/v1/conversation"
        );
        assert!(config.openai.api_key.is_none());
        assert_eq!(config.openai.api_base_url, "https://api.openai.com");
    }

    #[test]
    fn test_parse_full_config() {
        let toml = r#"
            [server]
            listen = "0.0.0.0:3006"

            [cpm]
            app_id = "app-1"
            app_key = "secret"
            api_url = "https://cpm.example.com/openapi/v1/conversation"
            model = "cpm-conv-large"
            max_length = 2048
            timeout_ms = 30000

            [openai]
            api_key = "sk-test"
            api_base_url = "https://openai.example.com"

            [logging]
            level = "debug"
        "#;

        let config = Config::parse_str(toml).unwrap();
        assert_eq!(config.server.listen, "0.0.0.0:3006");
        assert_eq!(config.cpm.model, "cpm-conv-large");
        assert_eq!(config.cpm.max_length, 2048);
        assert_eq!(config.cpm.timeout_ms, 30_000);
        assert!(config.openai.api_key.is_some());
        assert_eq!(config.logging.level, "debug");
    }

    #[test]
    fn test_missing_cpm_section_fails() {
        let toml = r#"
            [server]
            listen = "0.0.0.0:3006"
        "#;

        assert!(Config::parse_str(toml).is_err());
    }

    #[test]
    fn test_empty_app_id_fails_validation() {
        let toml = r#"
            [cpm]
            app_id = ""
            app_key = "secret"
        "#;

        let err = Config::parse_str(toml).unwrap_err();
        assert!(matches!(err, ConfigError::Validation(_)));
    }

    #[test]
    fn test_empty_app_key_fails_validation() {
        let toml = r#"
            [cpm]
            app_id = "app-1"
            app_key = ""
        "#;

        let err = Config::parse_str(toml).unwrap_err();
        assert!(matches!(err, ConfigError::Validation(_)));
    }

    #[test]
    fn test_zero_timeout_fails_validation() {
        let toml = r#"
            [cpm]
            app_id = "app-1"
            app_key = "secret"
            timeout_ms = 0
        "#;

        let err = Config::parse_str(toml).unwrap_err();
        assert!(matches!(err, ConfigError::Validation(_)));
    }

    #[test]
    fn test_api_key_redacted_in_debug() {
        let key = ApiKey::from("super-secret-value");
        assert_eq!(format!("{:?}", key), "[REDACTED]");
        assert_eq!(format!("{}", key), "[REDACTED]");
        assert_eq!(key.expose_secret(), "super-secret-value");
    }

    #[test]
    fn test_expand_single_var() {
        let result =
            expand_env_vars_with("${KEY}", "cpm.app_key", |name| {
                (name == "KEY").then(|| "resolved".to_string())
            })
            .unwrap();
        assert_eq!(result, "resolved");
    }

    #[test]
    fn test_expand_multiple_vars() {
        let result = expand_env_vars_with("${SCHEME}://${HOST}/v1", "cpm.api_url", |name| {
            match name {
                "SCHEME" => Some("https".to_string()),
                "HOST" => Some("cpm.example.com".to_string()),
                _ => None,
            }
        })
        .unwrap();
        assert_eq!(result, "https://cpm.example.com/v1");
    }

    #[test]
    fn test_expand_no_references_passthrough() {
        let result = expand_env_vars_with("plain-value", "cpm.app_id", |_| None).unwrap();
        assert_eq!(result, "plain-value");
    }

    #[test]
    fn test_expand_missing_var_fails() {
        let err = expand_env_vars_with("${MISSING}", "cpm.app_key", |_| None).unwrap_err();
        match err {
            ConfigError::EnvVar { var, field, .. } => {
                assert_eq!(var, "MISSING");
                assert_eq!(field, "cpm.app_key");
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_expand_unclosed_brace_fails() {
        let err = expand_env_vars_with("${OPEN", "cpm.app_key", |_| {
            Some("value".to_string())
        })
        .unwrap_err();
        assert!(matches!(err, ConfigError::EnvVar { .. }));
    }

    #[test]
    fn test_expand_empty_name_fails() {
        let err = expand_env_vars_with("${}", "cpm.app_key", |_| Some("value".to_string()))
            .unwrap_err();
        assert!(matches!(err, ConfigError::EnvVar { .. }));
    }

    #[test]
    fn test_key_source_display() {
        assert_eq!(KeySource::Literal.to_string(), "config-literal");
        assert_eq!(KeySource::EnvExpanded.to_string(), "env-expanded");
        assert_eq!(
            KeySource::Convention("CHATRELAY_CPM_APP_KEY".to_string()).to_string(),
            "convention (CHATRELAY_CPM_APP_KEY)"
        );
        assert_eq!(KeySource::None.to_string(), "none");
    }
}
