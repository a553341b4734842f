// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `ConcurrencyGate`: a weighted counting gate bounding concurrently
//! `Running` (non-detached) steps (§4.4).

use crate::StepError;
use tokio::sync::{Semaphore, SemaphorePermit};
use tokio_util::sync::CancellationToken;

/// Bounds how many steps may be admitted at once. `threads ≤ 0` (`None` or
/// `Some(0)`) means every acquire succeeds instantly.
pub struct ConcurrencyGate {
    inner: Option<Semaphore>,
}

impl ConcurrencyGate {
    pub fn new(threads: Option<usize>) -> Self {
        match threads {
            Some(n) if n > 0 => Self {
                inner: Some(Semaphore::new(n)),
            },
            _ => Self { inner: None },
        }
    }

    /// Acquire one token.
    ///
    /// `Ok(None)` means `cancel` fired before admission — callers mark the
    /// step `Cancelled` and return no error (§4.2 step 2). `Err` is any other
    /// acquire failure, which nothing was acquired for. The returned ticket
    /// releases its token on drop, including on panic unwind, so the gate
    /// can never deadlock the DAG (§9).
    pub async fn acquire(
        &self,
        cancel: &CancellationToken,
    ) -> Result<Option<GateTicket<'_>>, StepError> {
        let Some(semaphore) = &self.inner else {
            return Ok(Some(GateTicket(None)));
        };
        tokio::select! {
            permit = semaphore.acquire() => {
                match permit {
                    Ok(permit) => Ok(Some(GateTicket(Some(permit)))),
                    Err(_closed) => Err(StepError::GateClosed),
                }
            }
            _ = cancel.cancelled() => Ok(None),
        }
    }
}

/// A held gate token. Dropping it releases the slot.
pub struct GateTicket<'a>(#[allow(dead_code)] Option<SemaphorePermit<'a>>);

#[cfg(test)]
#[path = "gate_tests.rs"]
mod tests;
