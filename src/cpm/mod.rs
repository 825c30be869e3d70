//! CPM (ModelBest) provider module.
//!
//! This module implements the signed single-shot conversation call:
//! payload construction, the HMAC request signer, and the relay that
//! maps upstream outcomes to the service's own result shape.

mod relay;
mod signer;
pub mod types;

pub use relay::relay;
pub use signer::{sign, sign_at, SignedEnvelope};
pub use types::{ConversationMessage, ConversationPayload, ModelParameters, Role};
