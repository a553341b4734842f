// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use parking_lot::Mutex;
use std::sync::Arc;
use tokio::io::AsyncWriteExt;

#[derive(Clone, Default)]
struct MemSink(Arc<Mutex<Vec<u8>>>);

impl MemSink {
    fn text(&self) -> String {
        String::from_utf8_lossy(&self.0.lock()).into_owned()
    }
}

impl AsyncWrite for MemSink {
    fn poll_write(
        self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        self.0.lock().extend_from_slice(buf);
        Poll::Ready(Ok(buf.len()))
    }

    fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }

    fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }
}

fn secret(value: &str) -> Secret {
    Secret {
        name: "token".to_string(),
        value: value.to_string(),
    }
}

#[tokio::test]
async fn redacts_a_secret_written_in_one_chunk() {
    let sink = MemSink::default();
    let mut redactor = SecretRedactor::new(sink.clone(), &[secret("sk-12345")]);
    redactor.write_all(b"token is sk-12345 here").await.unwrap();
    redactor.shutdown().await.unwrap();
    assert!(!sink.text().contains("sk-12345"));
    assert!(sink.text().contains(MASK));
}

#[tokio::test]
async fn redacts_a_secret_split_across_writes() {
    let sink = MemSink::default();
    let mut redactor = SecretRedactor::new(sink.clone(), &[secret("sk-12345")]);
    redactor.write_all(b"token is sk-1").await.unwrap();
    redactor.write_all(b"2345 here").await.unwrap();
    redactor.shutdown().await.unwrap();
    assert!(!sink.text().contains("sk-12345"));
}

#[tokio::test]
async fn no_secrets_configured_passes_bytes_through() {
    let sink = MemSink::default();
    let mut redactor = SecretRedactor::new(sink.clone(), &[]);
    redactor.write_all(b"plain output").await.unwrap();
    redactor.shutdown().await.unwrap();
    assert_eq!(sink.text(), "plain output");
}
