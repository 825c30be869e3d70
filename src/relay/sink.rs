//! Sink abstraction for streamed reply records.
//!
//! The streaming relay hands each record to a [`ChunkSink`]; the HTTP
//! layer's [`RecordSink`] frames records as newline-separated JSON so
//! a receiver can split the byte stream on `\n` and parse each line
//! independently.

use bytes::Bytes;
use serde::Serialize;
use tokio::sync::mpsc::UnboundedSender;

use super::types::Outcome;
use crate::openai::types::ReplyChunk;

/// One streamed record: a reply increment, or a terminal failure.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum StreamRecord {
    Chunk(ReplyChunk),
    Failure(Outcome),
}

/// The record's receiver is gone (client disconnected).
#[derive(Debug)]
pub struct SinkClosed;

impl std::fmt::Display for SinkClosed {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "sink closed")
    }
}

impl std::error::Error for SinkClosed {}

/// Destination for streamed records, delivered in arrival order.
///
/// `Err(SinkClosed)` tells the producer to stop promptly; records
/// already delivered are not retracted.
pub trait ChunkSink: Send {
    fn accept(&mut self, record: &StreamRecord) -> Result<(), SinkClosed>;
}

/// Sink that frames records into a byte channel.
///
/// The first record is written bare; every subsequent record is
/// prefixed with `\n`. The separator is strictly inter-record, never
/// trailing.
pub struct RecordSink {
    tx: UnboundedSender<Bytes>,
    first: bool,
}

impl RecordSink {
    pub fn new(tx: UnboundedSender<Bytes>) -> Self {
        Self { tx, first: true }
    }
}

impl ChunkSink for RecordSink {
    fn accept(&mut self, record: &StreamRecord) -> Result<(), SinkClosed> {
        let json = serde_json::to_vec(record).unwrap();
        let mut frame = Vec::with_capacity(json.len() + 1);
        if !self.first {
            frame.push(b'\n');
        }
        frame.extend_from_slice(&json);
        self.first = false;

        self.tx.send(Bytes::from(frame)).map_err(|_| SinkClosed)
    }
}
