//! Serialized write gate over the client connection.

use std::fmt::Display;
use std::sync::Arc;

use async_trait::async_trait;
use futures::channel::mpsc;
use futures::{Sink, SinkExt};
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::debug;

use crate::events::StoryEvent;

/// One message on the duplex connection.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Frame {
    Text(String),
    Binary(Vec<u8>),
}

#[derive(Debug, Error)]
pub enum MuxError {
    #[error("connection closed: {0}")]
    Closed(String),
    #[error("failed to encode event: {0}")]
    Encode(#[from] serde_json::Error),
}

#[async_trait]
trait FrameWriter: Send {
    async fn write(&mut self, frame: Frame) -> Result<(), MuxError>;
}

struct SinkWriter<S>(S);

#[async_trait]
impl<S> FrameWriter for SinkWriter<S>
where
    S: Sink<Frame> + Unpin + Send,
    S::Error: Display + Send,
{
    async fn write(&mut self, frame: Frame) -> Result<(), MuxError> {
        self.0
            .send(frame)
            .await
            .map_err(|e| MuxError::Closed(e.to_string()))
    }
}

/// Cloneable handle through which every pipeline component writes.
///
/// Writes are serialized so frames never interleave on the connection.
/// There is no buffering or retry; a failed write is returned to the caller.
#[derive(Clone)]
pub struct Multiplexer {
    writer: Arc<Mutex<Box<dyn FrameWriter>>>,
}

impl Multiplexer {
    pub fn from_sink<S>(sink: S) -> Self
    where
        S: Sink<Frame> + Unpin + Send + 'static,
        S::Error: Display + Send,
    {
        Self {
            writer: Arc::new(Mutex::new(Box::new(SinkWriter(sink)))),
        }
    }

    /// Multiplexer backed by an in-memory channel.
    pub fn unbounded() -> (Self, mpsc::UnboundedReceiver<Frame>) {
        let (tx, rx) = mpsc::unbounded();
        (Self::from_sink(tx), rx)
    }

    pub async fn send(&self, event: &StoryEvent) -> Result<(), MuxError> {
        let text = serde_json::to_string(event)?;
        debug!(kind = event.kind(), "writing event");
        self.write(Frame::Text(text)).await
    }

    pub async fn send_audio(&self, chunk: Vec<u8>) -> Result<(), MuxError> {
        debug!(bytes = chunk.len(), "writing audio");
        self.write(Frame::Binary(chunk)).await
    }

    async fn write(&self, frame: Frame) -> Result<(), MuxError> {
        let mut writer = self.writer.lock().await;
        writer.write(frame).await
    }
}
