//! Integration tests for the usage reporter via POST /config.
//!
//! Verifies that:
//! - A missing credential yields "-" without any network attempt
//! - A stubbed billing endpoint is converted to a currency string
//! - Billing failures degrade to "-" instead of failing the request

use std::sync::Arc;

use axum::body::Body;
use http::{Request, StatusCode};
use tower::ServiceExt;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use chatrelay::config::{ApiKey, Config, CpmConfig, LoggingConfig, OpenAiConfig, ServerConfig};
use chatrelay::relay::{create_router, AppState};

fn setup_app(openai: OpenAiConfig) -> axum::Router {
    let config = Config {
        server: ServerConfig::default(),
        cpm: CpmConfig {
            app_id: "app-test".to_string(),
            app_key: ApiKey::from("test-secret"),
            api_url: "http://127.0.0.1:1/openapi/v1/conversation".to_string(),
            model: "cpm-conv".to_string(),
            max_length: 4096,
            timeout_ms: 5_000,
        },
        openai,
        logging: LoggingConfig::default(),
    };

    let state = AppState {
        config: Arc::new(config),
        http: reqwest::Client::new(),
    };

    create_router(state)
}

async fn fetch_config(app: axum::Router) -> serde_json::Value {
    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/config")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn missing_credential_reports_placeholder() {
    // Unroutable base URL: any network attempt would fail loudly, and
    // the port can never be listened on, so "-" proves no call happened.
    let app = setup_app(OpenAiConfig {
        api_key: None,
        api_base_url: "http://127.0.0.1:1".to_string(),
    });

    let body = fetch_config(app).await;

    assert_eq!(body["status"], "Success");
    assert_eq!(body["data"]["usage"], "-");
    assert_eq!(body["data"]["model"], "cpm-conv");
}

#[tokio::test]
async fn stubbed_usage_is_formatted_as_currency() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v1/dashboard/billing/usage"))
        .and(header("authorization", "Bearer sk-test"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(serde_json::json!({"total_usage": 250})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let app = setup_app(OpenAiConfig {
        api_key: Some(ApiKey::from("sk-test")),
        api_base_url: server.uri(),
    });

    let body = fetch_config(app).await;
    assert_eq!(body["data"]["usage"], "$2.5");
}

#[tokio::test]
async fn billing_failure_degrades_to_placeholder() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let app = setup_app(OpenAiConfig {
        api_key: Some(ApiKey::from("sk-test")),
        api_base_url: server.uri(),
    });

    let body = fetch_config(app).await;
    assert_eq!(body["status"], "Success");
    assert_eq!(body["data"]["usage"], "-");
}

#[tokio::test]
async fn malformed_billing_body_degrades_to_placeholder() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
        .mount(&server)
        .await;

    let app = setup_app(OpenAiConfig {
        api_key: Some(ApiKey::from("sk-test")),
        api_base_url: server.uri(),
    });

    let body = fetch_config(app).await;
    assert_eq!(body["data"]["usage"], "-");
}
