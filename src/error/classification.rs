use super::types::{Error, Kind};

impl Error {
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        matches!(self.inner.kind, Kind::Cancelled)
    }

    #[must_use]
    pub fn is_timeout(&self) -> bool {
        matches!(self.inner.kind, Kind::Timeout)
    }

    #[must_use]
    pub fn is_sandbox_blocked(&self) -> bool {
        matches!(self.inner.kind, Kind::SandboxBlocked)
    }

    #[must_use]
    pub fn is_protocol(&self) -> bool {
        matches!(self.inner.kind, Kind::Protocol)
    }

    #[must_use]
    pub fn is_stream_reset(&self) -> bool {
        matches!(self.inner.kind, Kind::StreamReset)
    }

    #[must_use]
    pub fn is_redirect(&self) -> bool {
        matches!(self.inner.kind, Kind::Redirect)
    }

    #[must_use]
    pub fn is_validation(&self) -> bool {
        matches!(self.inner.kind, Kind::Validation)
    }

    #[must_use]
    pub fn is_nat64_exhausted(&self) -> bool {
        matches!(self.inner.kind, Kind::Nat64Exhausted)
    }

    #[must_use]
    pub fn is_connect(&self) -> bool {
        matches!(self.inner.kind, Kind::Connect)
    }

    /// True for errors the retry loop is allowed to act on: anything but a
    /// terminal cancellation (spec §7: "not a terminal cancellation").
    #[must_use]
    pub fn is_retry_eligible(&self) -> bool {
        !self.is_cancelled()
    }

    /// Recognized host-network error substrings that mean "the sandbox
    /// refused this connect", matched the way the original host surfaces
    /// them (spec §9: reproducing the exact substring match list is
    /// required to preserve behavior).
    #[must_use]
    pub fn matches_sandbox_blocked_message(msg: &str) -> bool {
        const NEEDLES: &[&str] = &[
            "cannot connect to the specified address",
            "A network issue was detected",
            "TCP Loop detected",
        ];
        NEEDLES.iter().any(|needle| msg.contains(needle))
    }

    /// Recognized recoverable errors for the fast-h1 strategy's platform-TLS
    /// → WASM-TLS fallback (spec §4.9).
    #[must_use]
    pub fn matches_fast_h1_fallback_message(msg: &str) -> bool {
        const NEEDLES: &[&str] = &[
            "Stream was cancelled",
            "connection refused",
            "network connection lost",
        ];
        NEEDLES.iter().any(|needle| msg.contains(needle)) || Self::matches_sandbox_blocked_message(msg)
    }
}
