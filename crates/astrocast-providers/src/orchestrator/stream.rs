use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use futures::Stream;
use serde::Serialize;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Channel capacity between the producer task and the consumer.
pub(crate) const STREAM_BUFFER: usize = 32;

/// One item delivered to a streaming consumer. `Done` and `Error` are
/// terminal: nothing follows them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", content = "content", rename_all = "lowercase")]
pub enum StreamChunk {
    Text(String),
    Done,
    Error(String),
}

impl StreamChunk {
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        !matches!(self, StreamChunk::Text(_))
    }
}

/// Consumer end of a streaming generation.
///
/// Dropping it aborts the producer task, which releases the upstream
/// connection.
#[derive(Debug)]
pub struct ChunkStream {
    receiver: mpsc::Receiver<StreamChunk>,
    producer: Option<JoinHandle<()>>,
}

impl ChunkStream {
    pub(crate) fn spawn<F, Fut>(produce: F) -> Self
    where
        F: FnOnce(mpsc::Sender<StreamChunk>) -> Fut,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let (sender, receiver) = mpsc::channel(STREAM_BUFFER);
        let producer = tokio::spawn(produce(sender));
        Self {
            receiver,
            producer: Some(producer),
        }
    }

    /// A stream holding a single terminal `Error` chunk.
    #[must_use]
    pub fn failed(message: impl Into<String>) -> Self {
        let (sender, receiver) = mpsc::channel(1);
        // Capacity 1 and a fresh channel: this send cannot fail.
        let _ = sender.try_send(StreamChunk::Error(message.into()));
        Self {
            receiver,
            producer: None,
        }
    }

    pub async fn next_chunk(&mut self) -> Option<StreamChunk> {
        self.receiver.recv().await
    }

    /// Drain the stream, concatenating text until a terminal chunk.
    ///
    /// # Errors
    ///
    /// Returns the message of an `Error` chunk, or a description when the
    /// producer stopped without a terminal chunk.
    pub async fn collect_text(mut self) -> Result<String, String> {
        let mut text = String::new();
        while let Some(chunk) = self.next_chunk().await {
            match chunk {
                StreamChunk::Text(t) => text.push_str(&t),
                StreamChunk::Done => return Ok(text),
                StreamChunk::Error(message) => return Err(message),
            }
        }
        Err("stream ended without a terminal chunk".to_owned())
    }
}

impl Stream for ChunkStream {
    type Item = StreamChunk;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.get_mut().receiver.poll_recv(cx)
    }
}

impl Drop for ChunkStream {
    fn drop(&mut self) {
        if let Some(producer) = self.producer.take() {
            producer.abort();
        }
    }
}
