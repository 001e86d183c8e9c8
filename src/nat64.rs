//! M2/M3 — NAT64 address synthesis and prefix health (spec §4/§6): the
//! sandbox can't connect directly to CDN-classified IPv4 targets, so the
//! dispatcher reaches them through public NAT64 gateways instead, picking
//! the healthiest-looking prefixes first.

use std::net::Ipv4Addr;
use std::time::Duration;

use dashmap::DashMap;

/// Fixed ordered set of public NAT64 gateways tried in this order when a
/// prefix has no recorded health yet. Both prefix forms from spec §6 appear
/// here: `::`-terminated (short) and single-`:`-terminated (full).
pub const DEFAULT_PREFIXES: &[&str] = &[
    "2602:fc59:b0:64::",
    "2a01:4f9:c010:3f02::",
    "2a00:1098:2b:0:0:1:",
    "64:ff9b::",
];

const EWMA_ALPHA: f64 = 0.2;
const FAILURE_PENALTY_MS: f64 = 250.0;

/// Encode an IPv4 address into a NAT64 literal under `prefix`, per spec §6:
/// `[prefix + hex(a)hex(b):hex(c)hex(d)]` with two-hex-digit zero-padded
/// octets. Works unmodified for both prefix terminators since the suffix
/// never needs a leading separator of its own.
#[must_use]
pub fn synthesize(prefix: &str, addr: Ipv4Addr) -> String {
    let [a, b, c, d] = addr.octets();
    format!("[{prefix}{a:02x}{b:02x}:{c:02x}{d:02x}]")
}

#[derive(Debug, Clone, Copy)]
struct PrefixHealth {
    ewma_rtt_ms: f64,
    attempts: u32,
    failures: u32,
}

impl PrefixHealth {
    fn record(&mut self, ok: bool, rtt: Duration) {
        let ms = rtt.as_secs_f64() * 1000.0;
        self.ewma_rtt_ms = if self.attempts == 0 {
            ms
        } else {
            EWMA_ALPHA * ms + (1.0 - EWMA_ALPHA) * self.ewma_rtt_ms
        };
        self.attempts += 1;
        if !ok {
            self.failures += 1;
        }
    }

    fn score(&self) -> f64 {
        let failure_ratio = if self.attempts == 0 {
            0.0
        } else {
            f64::from(self.failures) / f64::from(self.attempts)
        };
        self.ewma_rtt_ms + FAILURE_PENALTY_MS * failure_ratio
    }
}

impl Default for PrefixHealth {
    fn default() -> Self {
        PrefixHealth { ewma_rtt_ms: 0.0, attempts: 0, failures: 0 }
    }
}

/// Process-wide NAT64 prefix ranking state. Lower score wins: EWMA
/// round-trip time plus a 250 ms penalty scaled by failure ratio (spec §6),
/// so a prefix that's never been tried ranks ahead of one with a track
/// record of timeouts.
pub struct Nat64Tracker {
    prefixes: Vec<String>,
    health: DashMap<String, PrefixHealth>,
}

impl Nat64Tracker {
    #[must_use]
    pub fn new() -> Self {
        Nat64Tracker::with_prefixes(DEFAULT_PREFIXES.iter().map(|s| (*s).to_string()).collect())
    }

    #[must_use]
    pub fn with_prefixes(prefixes: Vec<String>) -> Self {
        Nat64Tracker { prefixes, health: DashMap::new() }
    }

    pub fn record(&self, prefix: &str, ok: bool, rtt: Duration) {
        self.health.entry(prefix.to_string()).or_default().record(ok, rtt);
    }

    /// Clears all recorded health, reverting every prefix to the untried
    /// default ranking (the `clearNat64PrefixStats` lifecycle operation).
    pub fn clear(&self) {
        self.health.clear();
    }

    /// Top `k` prefixes by ascending score, synthesized into connect-hostname
    /// literals for `addr`. Ties (including the common case of no recorded
    /// health at all) keep the fixed list order.
    #[must_use]
    pub fn ranked_candidates(&self, addr: Ipv4Addr, k: usize) -> Vec<(String, String)> {
        let mut scored: Vec<(usize, f64, &str)> = self
            .prefixes
            .iter()
            .enumerate()
            .map(|(i, prefix)| {
                let score = self.health.get(prefix).map_or(0.0, |h| h.score());
                (i, score, prefix.as_str())
            })
            .collect();
        scored.sort_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal).then(a.0.cmp(&b.0)));
        scored
            .into_iter()
            .take(k)
            .map(|(_, _, prefix)| (prefix.to_string(), synthesize(prefix, addr)))
            .collect()
    }
}

impl Default for Nat64Tracker {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn synthesizes_short_prefix_literal() {
        let addr = Ipv4Addr::new(104, 16, 18, 52);
        let literal = synthesize("2602:fc59:b0:64::", addr);
        assert_eq!(literal, "[2602:fc59:b0:64::6810:1234]");
    }

    #[test]
    fn synthesizes_full_prefix_literal() {
        let addr = Ipv4Addr::new(104, 16, 18, 52);
        let literal = synthesize("2a00:1098:2b:0:0:1:", addr);
        assert_eq!(literal, "[2a00:1098:2b:0:0:1:6810:1234]");
    }

    #[test]
    fn untried_prefixes_rank_in_fixed_list_order() {
        let tracker = Nat64Tracker::new();
        let addr = Ipv4Addr::new(1, 2, 3, 4);
        let top = tracker.ranked_candidates(addr, 3);
        assert_eq!(top.len(), 3);
        assert_eq!(top[0].0, DEFAULT_PREFIXES[0]);
        assert_eq!(top[1].0, DEFAULT_PREFIXES[1]);
        assert_eq!(top[2].0, DEFAULT_PREFIXES[2]);
    }

    #[test]
    fn failing_prefix_drops_in_rank() {
        let tracker = Nat64Tracker::new();
        let addr = Ipv4Addr::new(1, 2, 3, 4);
        tracker.record(DEFAULT_PREFIXES[0], false, Duration::from_millis(900));
        tracker.record(DEFAULT_PREFIXES[0], false, Duration::from_millis(900));
        tracker.record(DEFAULT_PREFIXES[1], true, Duration::from_millis(30));

        let top = tracker.ranked_candidates(addr, 1);
        assert_eq!(top[0].0, DEFAULT_PREFIXES[1]);
    }

    #[test]
    fn clear_resets_to_untried_ordering() {
        let tracker = Nat64Tracker::new();
        let addr = Ipv4Addr::new(1, 2, 3, 4);
        tracker.record(DEFAULT_PREFIXES[0], false, Duration::from_millis(900));
        tracker.clear();
        let top = tracker.ranked_candidates(addr, 1);
        assert_eq!(top[0].0, DEFAULT_PREFIXES[0]);
    }
}
