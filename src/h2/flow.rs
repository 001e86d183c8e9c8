//! L6 — flow-control window (spec §4.6).
//!
//! One instance per stream and one for the connection. `consume` is FIFO and
//! non-preemptive: a smaller later waiter never jumps a larger earlier one
//! even if it would currently fit.

use std::collections::VecDeque;
use std::sync::Mutex;

use tokio::sync::oneshot;

const MAX_WINDOW: i64 = (1i64 << 31) - 1;

struct Waiter {
    requested: i64,
    resolver: oneshot::Sender<WaitOutcome>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitOutcome {
    Granted,
    Cancelled,
}

struct State {
    available: i64,
    waiters: VecDeque<Waiter>,
    cancelled: bool,
}

/// A flow-control window. Cloneable handle over shared interior state.
pub struct FlowWindow {
    state: Mutex<State>,
}

impl FlowWindow {
    #[must_use]
    pub fn new(initial: i64) -> Self {
        FlowWindow {
            state: Mutex::new(State {
                available: initial,
                waiters: VecDeque::new(),
                cancelled: false,
            }),
        }
    }

    #[must_use]
    pub fn available(&self) -> i64 {
        self.state.lock().unwrap().available
    }

    /// Consume `n` bytes of window, awaiting if insufficient. `n <= 0`
    /// returns immediately (spec: "if n ≤ 0 return immediately").
    pub async fn consume(&self, n: i64) -> Result<(), crate::error::Error> {
        if n <= 0 {
            return Ok(());
        }
        let rx = {
            let mut state = self.state.lock().unwrap();
            if state.cancelled {
                return Err(crate::error::Error::stream_reset("flow window cancelled"));
            }
            if state.available >= n {
                state.available -= n;
                return Ok(());
            }
            let (tx, rx) = oneshot::channel();
            state.waiters.push_back(Waiter { requested: n, resolver: tx });
            rx
        };
        match rx.await {
            Ok(WaitOutcome::Granted) => Ok(()),
            Ok(WaitOutcome::Cancelled) | Err(_) => {
                Err(crate::error::Error::stream_reset("flow window cancelled"))
            }
        }
    }

    /// Add `inc` to the available window, then drain waiters FIFO while the
    /// head waiter fits. Overflow beyond 2^31-1 is a hard error.
    pub fn update(&self, inc: i64) -> Result<(), crate::error::Error> {
        let mut state = self.state.lock().unwrap();
        let new_available = state.available.checked_add(inc).ok_or_else(|| {
            crate::error::Error::protocol("flow-control window update overflowed i64")
        })?;
        if new_available > MAX_WINDOW {
            return Err(crate::error::Error::protocol(
                "flow-control window exceeds 2^31-1",
            ));
        }
        state.available = new_available;
        Self::drain(&mut state);
        Ok(())
    }

    /// Shift `available` by `newInit - oldInit` (SETTINGS INITIAL_WINDOW_SIZE
    /// change). Only drains waiters when the delta is positive.
    pub fn reset(&self, new_init: i64, old_init: i64) -> Result<(), crate::error::Error> {
        let delta = new_init - old_init;
        let mut state = self.state.lock().unwrap();
        state.available = state
            .available
            .checked_add(delta)
            .ok_or_else(|| crate::error::Error::protocol("flow-control reset overflowed"))?;
        if delta > 0 {
            Self::drain(&mut state);
        }
        Ok(())
    }

    /// Sticky-cancel: reject every current and future waiter.
    pub fn cancel(&self) {
        let mut state = self.state.lock().unwrap();
        state.cancelled = true;
        while let Some(waiter) = state.waiters.pop_front() {
            let _ = waiter.resolver.send(WaitOutcome::Cancelled);
        }
    }

    fn drain(state: &mut State) {
        loop {
            match state.waiters.front() {
                Some(front) if front.requested <= state.available => {
                    let waiter = state.waiters.pop_front().expect("front just matched");
                    state.available -= waiter.requested;
                    let _ = waiter.resolver.send(WaitOutcome::Granted);
                }
                _ => break,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[tokio::test]
    async fn consume_under_available_is_immediate() {
        let w = FlowWindow::new(100);
        w.consume(40).await.unwrap();
        assert_eq!(w.available(), 60);
    }

    #[tokio::test]
    async fn waiter_is_fifo_non_preemptive() {
        let w = Arc::new(FlowWindow::new(0));
        let order = Arc::new(Mutex::new(Vec::new()));

        let w1 = w.clone();
        let order1 = order.clone();
        let big = tokio::spawn(async move {
            w1.consume(10).await.unwrap();
            order1.lock().unwrap().push("big");
        });

        // Ensure big enqueues first.
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;

        let w2 = w.clone();
        let order2 = order.clone();
        let small = tokio::spawn(async move {
            w2.consume(1).await.unwrap();
            order2.lock().unwrap().push("small");
        });

        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        // Only enough for the small waiter — must NOT be granted because the
        // larger, earlier waiter is still queued ahead of it.
        w.update(1).unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        assert!(order.lock().unwrap().is_empty());

        // Now enough for both, in order.
        w.update(9).unwrap();
        big.await.unwrap();
        small.await.unwrap();
        assert_eq!(*order.lock().unwrap(), vec!["big", "small"]);
    }

    #[test]
    fn update_overflow_is_fatal() {
        let w = FlowWindow::new(MAX_WINDOW);
        assert!(w.update(1).is_err());
    }

    #[tokio::test]
    async fn algebraic_invariant_holds_under_interleaving() {
        let w = FlowWindow::new(1000);
        w.consume(300).await.unwrap();
        w.update(50).unwrap();
        w.consume(200).await.unwrap();
        w.update(10).unwrap();
        assert_eq!(w.available(), 1000 - 300 + 50 - 200 + 10);
    }
}
