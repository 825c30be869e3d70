//! Outbound request signer for the CPM open platform.
//!
//! Every call carries a signature computed over a canonical string of
//! request metadata. The field order of the canonical string and the
//! MD5-base64 content digest are part of the provider's verification
//! contract and must match it byte for byte. MD5 here is the
//! provider-mandated integrity check, not a security primitive.

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use chrono::Utc;
use hmac::{Hmac, Mac};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, ACCEPT, CONTENT_TYPE};
use sha2::Sha256;
use uuid::Uuid;

type HmacSha256 = Hmac<Sha256>;

/// Signature mode sent in the X-Model-Best-Open-Ca-Mode header.
const SIGNATURE_MODE: &str = "Signature";

const HEADER_CA_TIME: HeaderName = HeaderName::from_static("x-model-best-open-ca-time");
const HEADER_CONTENT_MD5: HeaderName = HeaderName::from_static("content-md5");
const HEADER_APP_ID: HeaderName = HeaderName::from_static("x-model-best-open-app-id");
const HEADER_CA_MODE: HeaderName = HeaderName::from_static("x-model-best-open-ca-mode");
const HEADER_CA_NONCE: HeaderName = HeaderName::from_static("x-model-best-open-ca-nonce");
const HEADER_CA_SIGNATURE: HeaderName = HeaderName::from_static("x-model-best-open-ca-signature");

/// The derived authentication fields attached to one outbound call.
///
/// Ephemeral: lives only for the duration of a single request and is
/// never persisted. A fresh timestamp and nonce per call is what makes
/// replayed envelopes fail provider-side verification.
#[derive(Debug, Clone)]
pub struct SignedEnvelope {
    /// Epoch milliseconds at signing time
    pub timestamp: i64,
    /// base64(MD5(body))
    pub content_md5: String,
    /// Random UUIDv4, unique per call
    pub nonce: String,
    /// base64(HMAC-SHA256(canonical string, app key))
    pub signature: String,
}

impl SignedEnvelope {
    /// Build the complete header set for the signed call.
    pub fn headers(&self, app_id: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(ACCEPT, HeaderValue::from_static("*/*"));
        headers.insert(
            HEADER_CA_TIME,
            HeaderValue::from_str(&self.timestamp.to_string()).unwrap(),
        );
        headers.insert(
            HEADER_CONTENT_MD5,
            HeaderValue::from_str(&self.content_md5).unwrap(),
        );
        headers.insert(HEADER_APP_ID, HeaderValue::from_str(app_id).unwrap());
        headers.insert(HEADER_CA_MODE, HeaderValue::from_static(SIGNATURE_MODE));
        headers.insert(HEADER_CA_NONCE, HeaderValue::from_str(&self.nonce).unwrap());
        headers.insert(
            HEADER_CA_SIGNATURE,
            HeaderValue::from_str(&self.signature).unwrap(),
        );
        headers
    }
}

/// base64(MD5(body)) content digest.
fn content_md5(body: &[u8]) -> String {
    BASE64.encode(md5::compute(body).0)
}

/// The ordered, newline-joined metadata string the signature covers.
///
/// Field order is the provider's contract: method, accept,
/// content-type, timestamp, content digest, mode, nonce, url queries
/// (always empty for this call shape).
fn canonical_string(
    method: &str,
    accept: &str,
    content_type: &str,
    timestamp: i64,
    content_md5: &str,
    nonce: &str,
) -> String {
    [
        method,
        accept,
        content_type,
        &timestamp.to_string(),
        content_md5,
        SIGNATURE_MODE,
        nonce,
        "",
    ]
    .join("\n")
}

/// Sign a request body with a pinned timestamp and nonce.
///
/// Deterministic: identical inputs produce an identical envelope.
/// `sign` wraps this with the current time and a fresh nonce.
pub fn sign_at(body: &[u8], app_key: &str, timestamp: i64, nonce: &str) -> SignedEnvelope {
    let digest = content_md5(body);
    let canonical = canonical_string("POST", "*/*", "application/json", timestamp, &digest, nonce);

    // HMAC-SHA256 accepts keys of any length
    let mut mac = HmacSha256::new_from_slice(app_key.as_bytes()).unwrap();
    mac.update(canonical.as_bytes());
    let signature = BASE64.encode(mac.finalize().into_bytes());

    SignedEnvelope {
        timestamp,
        content_md5: digest,
        nonce: nonce.to_string(),
        signature,
    }
}

/// Sign a request body for immediate transmission.
///
/// Uses the current epoch-millisecond timestamp and a random UUIDv4
/// nonce, so no two calls ever share an envelope.
pub fn sign(body: &[u8], app_key: &str) -> SignedEnvelope {
    sign_at(
        body,
        app_key,
        Utc::now().timestamp_millis(),
        &Uuid::new_v4().to_string(),
    )
}
