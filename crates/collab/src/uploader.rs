// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Optional structured-artifact ("card") upload.

use async_trait::async_trait;
use cx_core::RunState;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum UploadError {
    #[error("upload failed: {0}")]
    Failed(String),
}

/// Uploads a card payload extracted from a step's log stream. A failure here
/// is logged as a warning only (§4.2 step 10) — it never fails the step.
#[async_trait]
pub trait Uploader: Send + Sync + 'static {
    async fn upload_card(
        &self,
        payload: Vec<u8>,
        state: &RunState,
        step_name: &str,
    ) -> Result<(), UploadError>;
}

#[cfg(any(test, feature = "test-support"))]
pub use fake::FakeUploader;

#[cfg(any(test, feature = "test-support"))]
mod fake {
    use super::*;
    use parking_lot::Mutex;
    use std::sync::Arc;

    #[derive(Default)]
    struct FakeState {
        uploads: Vec<(String, Vec<u8>)>,
        fail_next: Option<String>,
    }

    /// Records every uploaded card for assertions.
    #[derive(Clone, Default)]
    pub struct FakeUploader {
        inner: Arc<Mutex<FakeState>>,
    }

    impl FakeUploader {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn fail_next_upload(&self, message: impl Into<String>) {
            self.inner.lock().fail_next = Some(message.into());
        }

        pub fn uploads(&self) -> Vec<(String, Vec<u8>)> {
            self.inner.lock().uploads.clone()
        }
    }

    #[async_trait]
    impl Uploader for FakeUploader {
        async fn upload_card(
            &self,
            payload: Vec<u8>,
            _state: &RunState,
            step_name: &str,
        ) -> Result<(), UploadError> {
            let mut inner = self.inner.lock();
            if let Some(message) = inner.fail_next.take() {
                return Err(UploadError::Failed(message));
            }
            inner.uploads.push((step_name.to_string(), payload));
            Ok(())
        }
    }
}

#[cfg(test)]
#[path = "uploader_tests.rs"]
mod tests;
