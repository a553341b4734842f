// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Secret-redacting `AsyncWrite` wrapper (§4.2 step 6, §6, §8 invariant
//! "redactor output contains no substring equal to any configured secret
//! value, for any input chunking").

use cx_core::Secret;
use std::collections::VecDeque;
use std::io;
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio::io::AsyncWrite;

const MASK: &str = "***REDACTED***";

/// Replaces every occurrence of a configured secret value with `MASK`,
/// buffering enough trailing bytes between writes that a secret split
/// across two `poll_write` calls still gets caught.
pub struct SecretRedactor<W> {
    inner: W,
    secrets: Vec<String>,
    max_secret_len: usize,
    held: Vec<u8>,
    outbox: VecDeque<u8>,
}

impl<W: AsyncWrite + Unpin> SecretRedactor<W> {
    pub fn new(inner: W, secrets: &[Secret]) -> Self {
        let secrets: Vec<String> = secrets
            .iter()
            .map(|s| s.value.clone())
            .filter(|v| !v.is_empty())
            .collect();
        let max_secret_len = secrets.iter().map(|s| s.len()).max().unwrap_or(0);
        Self {
            inner,
            secrets,
            max_secret_len,
            held: Vec::new(),
            outbox: VecDeque::new(),
        }
    }

    fn redact(&self, data: &[u8]) -> Vec<u8> {
        if self.secrets.is_empty() {
            return data.to_vec();
        }
        let mut text = String::from_utf8_lossy(data).into_owned();
        for secret in &self.secrets {
            text = text.replace(secret.as_str(), MASK);
        }
        text.into_bytes()
    }

    /// Move everything in `held` that can no longer participate in a
    /// not-yet-complete secret match into `outbox`, redacted.
    fn stage_for_flush(&mut self, final_flush: bool) {
        let keep = if final_flush {
            0
        } else {
            self.max_secret_len.saturating_sub(1)
        };
        if self.held.len() <= keep {
            return;
        }
        let split_at = self.held.len() - keep;
        let ready: Vec<u8> = self.held.drain(..split_at).collect();
        self.outbox.extend(self.redact(&ready));
    }

    fn poll_drain_outbox(&mut self, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        while !self.outbox.is_empty() {
            let (front, _) = self.outbox.as_slices();
            let n = match Pin::new(&mut self.inner).poll_write(cx, front) {
                Poll::Ready(Ok(n)) => n,
                Poll::Ready(Err(e)) => return Poll::Ready(Err(e)),
                Poll::Pending => return Poll::Pending,
            };
            if n == 0 {
                return Poll::Ready(Err(io::Error::new(
                    io::ErrorKind::WriteZero,
                    "redactor sink accepted zero bytes",
                )));
            }
            self.outbox.drain(..n);
        }
        Poll::Ready(Ok(()))
    }
}

impl<W: AsyncWrite + Unpin> AsyncWrite for SecretRedactor<W> {
    fn poll_write(self: Pin<&mut Self>, cx: &mut Context<'_>, buf: &[u8]) -> Poll<io::Result<usize>> {
        let this = self.get_mut();
        this.held.extend_from_slice(buf);
        this.stage_for_flush(false);
        // Best-effort drain: if the inner sink is momentarily not ready, the
        // bytes stay queued in `outbox` and are retried on the next call.
        if let Poll::Ready(Err(e)) = this.poll_drain_outbox(cx) {
            return Poll::Ready(Err(e));
        }
        Poll::Ready(Ok(buf.len()))
    }

    fn poll_flush(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        let this = self.get_mut();
        this.stage_for_flush(true);
        match this.poll_drain_outbox(cx) {
            Poll::Ready(Ok(())) => Pin::new(&mut this.inner).poll_flush(cx),
            other => other,
        }
    }

    fn poll_shutdown(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        let this = self.get_mut();
        this.stage_for_flush(true);
        match this.poll_drain_outbox(cx) {
            Poll::Ready(Ok(())) => Pin::new(&mut this.inner).poll_shutdown(cx),
            other => other,
        }
    }
}

#[cfg(test)]
#[path = "redact_tests.rs"]
mod tests;
