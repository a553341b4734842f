// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Log sink provisioning: `Streamer::stream` opens the writer a step's
//! output is copied into, before `cx-engine` wraps it with the secret
//! redactor and card extractor.

use async_trait::async_trait;
use cx_core::RunState;
use thiserror::Error;
use tokio::io::AsyncWrite;

/// A log sink. `shutdown()` (from `AsyncWriteExt`) may flush/upload.
pub type LogWriter = Box<dyn AsyncWrite + Send + Unpin>;

#[derive(Debug, Error)]
pub enum StreamError {
    #[error("stream open failed: {0}")]
    OpenFailed(String),
}

/// Opens a new log sink for a step.
#[async_trait]
pub trait Streamer: Send + Sync + 'static {
    async fn stream(&self, state: &RunState, step_name: &str) -> Result<LogWriter, StreamError>;
}

#[cfg(any(test, feature = "test-support"))]
pub use fake::FakeStreamer;

#[cfg(any(test, feature = "test-support"))]
mod fake {
    use super::*;
    use parking_lot::Mutex;
    use std::collections::HashMap;
    use std::sync::Arc;

    /// Captures every byte written to each step's log in memory, so tests can
    /// assert on redaction and card-sentinel behavior.
    #[derive(Clone, Default)]
    pub struct FakeStreamer {
        buffers: Arc<Mutex<HashMap<String, Vec<u8>>>>,
        open_error: Arc<Mutex<Option<String>>>,
    }

    impl FakeStreamer {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn fail_next_open(&self, message: impl Into<String>) {
            *self.open_error.lock() = Some(message.into());
        }

        pub fn captured(&self, step_name: &str) -> Vec<u8> {
            self.buffers
                .lock()
                .get(step_name)
                .cloned()
                .unwrap_or_default()
        }

        pub fn captured_text(&self, step_name: &str) -> String {
            String::from_utf8_lossy(&self.captured(step_name)).into_owned()
        }
    }

    struct BufferWriter {
        name: String,
        buffers: Arc<Mutex<HashMap<String, Vec<u8>>>>,
    }

    impl AsyncWrite for BufferWriter {
        fn poll_write(
            self: std::pin::Pin<&mut Self>,
            _cx: &mut std::task::Context<'_>,
            buf: &[u8],
        ) -> std::task::Poll<Result<usize, std::io::Error>> {
            self.buffers
                .lock()
                .entry(self.name.clone())
                .or_default()
                .extend_from_slice(buf);
            std::task::Poll::Ready(Ok(buf.len()))
        }

        fn poll_flush(
            self: std::pin::Pin<&mut Self>,
            _cx: &mut std::task::Context<'_>,
        ) -> std::task::Poll<Result<(), std::io::Error>> {
            std::task::Poll::Ready(Ok(()))
        }

        fn poll_shutdown(
            self: std::pin::Pin<&mut Self>,
            _cx: &mut std::task::Context<'_>,
        ) -> std::task::Poll<Result<(), std::io::Error>> {
            std::task::Poll::Ready(Ok(()))
        }
    }

    #[async_trait]
    impl Streamer for FakeStreamer {
        async fn stream(&self, _state: &RunState, step_name: &str) -> Result<LogWriter, StreamError> {
            if let Some(message) = self.open_error.lock().take() {
                return Err(StreamError::OpenFailed(message));
            }
            Ok(Box::new(BufferWriter {
                name: step_name.to_string(),
                buffers: self.buffers.clone(),
            }))
        }
    }
}

#[cfg(test)]
#[path = "streamer_tests.rs"]
mod tests;
