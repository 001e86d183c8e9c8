//! Cancellation composition (spec §5): the caller's token composed with the
//! overall-timeout deadline into one internal token every suspension point
//! checks.

use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::error::Error;

/// A cancellation token plus the reason it fired, so callers can tell a
/// caller-initiated cancel from a tripped timeout (spec §7: "Distinct from
/// cancellation so callers can distinguish").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CancelReason {
    Caller,
    OverallTimeout,
    HeadersTimeout,
    BodyTimeout,
    HedgeLost,
}

impl CancelReason {
    #[must_use]
    pub fn into_error(self) -> Error {
        match self {
            CancelReason::Caller => Error::cancelled(),
            CancelReason::OverallTimeout
            | CancelReason::HeadersTimeout
            | CancelReason::BodyTimeout => Error::timeout(),
            // Hedge losers are cancelled deliberately; the NAT64 health
            // tracker must not record this as a prefix failure (spec §5).
            CancelReason::HedgeLost => Error::cancelled(),
        }
    }
}

/// Composed cancellation: caller token ∨ deadline token ∨ child tokens.
#[derive(Clone)]
pub struct Deadline {
    caller: CancellationToken,
    overall: CancellationToken,
}

impl Deadline {
    #[must_use]
    pub fn new(caller: CancellationToken, overall_timeout: Option<Duration>) -> Self {
        let overall = CancellationToken::new();
        if let Some(dur) = overall_timeout {
            let overall_clone = overall.clone();
            tokio::spawn(async move {
                tokio::time::sleep(dur).await;
                overall_clone.cancel();
            });
        }
        Deadline { caller, overall }
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.caller.is_cancelled() || self.overall.is_cancelled()
    }

    #[must_use]
    pub fn reason(&self) -> Option<CancelReason> {
        if self.caller.is_cancelled() {
            Some(CancelReason::Caller)
        } else if self.overall.is_cancelled() {
            Some(CancelReason::OverallTimeout)
        } else {
            None
        }
    }

    /// Race a future against this deadline, returning the typed cancel
    /// reason on loss.
    pub async fn race<F, T>(&self, fut: F) -> Result<T, CancelReason>
    where
        F: std::future::Future<Output = T>,
    {
        tokio::select! {
            biased;
            () = self.caller.cancelled() => Err(CancelReason::Caller),
            () = self.overall.cancelled() => Err(CancelReason::OverallTimeout),
            out = fut => Ok(out),
        }
    }

    /// A child token that also fires when this deadline fires — used for
    /// per-attempt headers/body timeouts layered on top.
    #[must_use]
    pub fn child_token(&self) -> CancellationToken {
        let child = CancellationToken::new();
        let child_clone = child.clone();
        let caller = self.caller.clone();
        let overall = self.overall.clone();
        tokio::spawn(async move {
            tokio::select! {
                () = caller.cancelled() => {}
                () = overall.cancelled() => {}
                () = child_clone.cancelled() => {}
            }
            child_clone.cancel();
        });
        child
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn caller_cancel_wins_immediately() {
        let caller = CancellationToken::new();
        let deadline = Deadline::new(caller.clone(), Some(Duration::from_secs(10)));
        caller.cancel();
        let result = deadline.race(tokio::time::sleep(Duration::from_secs(10))).await;
        assert_eq!(result.unwrap_err(), CancelReason::Caller);
    }

    #[tokio::test]
    async fn overall_timeout_fires() {
        let caller = CancellationToken::new();
        let deadline = Deadline::new(caller, Some(Duration::from_millis(10)));
        let result = deadline.race(tokio::time::sleep(Duration::from_secs(10))).await;
        assert_eq!(result.unwrap_err(), CancelReason::OverallTimeout);
    }
}
