// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Card-extracting `AsyncWrite` wrapper (§4.2 step 6, §6): sniffs a
//! sentinel-delimited artifact payload out of the log stream, passing every
//! byte through to the inner writer unchanged.

use std::io;
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio::io::AsyncWrite;

const CARD_BEGIN: &str = "##CX_CARD_BEGIN##";
const CARD_END: &str = "##CX_CARD_END##";

/// Passes every byte through to `inner`; once a `CARD_BEGIN ... CARD_END`
/// pair has been fully observed, `take_card` returns the bytes between them.
pub struct CardExtractor<W> {
    inner: W,
    scan_buffer: Vec<u8>,
    card: Option<Vec<u8>>,
}

impl<W: AsyncWrite + Unpin> CardExtractor<W> {
    pub fn new(inner: W) -> Self {
        Self {
            inner,
            scan_buffer: Vec::new(),
            card: None,
        }
    }

    pub fn take_card(&mut self) -> Option<Vec<u8>> {
        self.card.take()
    }

    fn scan(&mut self, buf: &[u8]) {
        if self.card.is_some() {
            return;
        }
        self.scan_buffer.extend_from_slice(buf);
        if let Some(start) = find(&self.scan_buffer, CARD_BEGIN.as_bytes()) {
            let after_begin = start + CARD_BEGIN.len();
            if let Some(end_rel) = find(&self.scan_buffer[after_begin..], CARD_END.as_bytes()) {
                let end = after_begin + end_rel;
                self.card = Some(self.scan_buffer[after_begin..end].to_vec());
                self.scan_buffer.clear();
                return;
            }
        }
        // Bound the scan window: no point retaining more than a few sentinel
        // lengths' worth of history while waiting for a match to complete.
        let max_keep = CARD_BEGIN.len().max(CARD_END.len()) * 4;
        if self.scan_buffer.len() > max_keep {
            let drop = self.scan_buffer.len() - max_keep;
            self.scan_buffer.drain(..drop);
        }
    }
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack
        .windows(needle.len().max(1))
        .position(|window| window == needle)
}

impl<W: AsyncWrite + Unpin> AsyncWrite for CardExtractor<W> {
    fn poll_write(self: Pin<&mut Self>, cx: &mut Context<'_>, buf: &[u8]) -> Poll<io::Result<usize>> {
        let this = self.get_mut();
        this.scan(buf);
        Pin::new(&mut this.inner).poll_write(cx, buf)
    }

    fn poll_flush(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.get_mut().inner).poll_flush(cx)
    }

    fn poll_shutdown(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.get_mut().inner).poll_shutdown(cx)
    }
}

#[cfg(test)]
#[path = "card_tests.rs"]
mod tests;
