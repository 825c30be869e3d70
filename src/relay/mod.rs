//! HTTP relay surface.
//!
//! This module provides the inbound HTTP API that accepts chat
//! requests and drives the two provider pipelines.

mod handlers;
mod server;
pub mod sink;
pub mod types;

pub use server::{create_router, run_server, AppState};
pub use sink::{ChunkSink, RecordSink, SinkClosed, StreamRecord};
pub use types::{ChatContext, ChatRequest, Outcome, Status};
