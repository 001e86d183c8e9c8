//! Engine-level configuration (ambient expansion of spec §6's per-request
//! surface), grounded on the teacher's `config/{client,network,retry,
//! performance,security}.rs` split: network knobs, buffer sizing, and
//! security knobs live on one struct with `production()`/`development()`
//! presets rather than one config struct per concern, since this crate is
//! a single library rather than a multi-binary workspace.

use std::time::Duration;

/// Connect-phase and socket-level knobs.
#[derive(Debug, Clone)]
pub struct NetworkConfig {
    pub connect_timeout: Duration,
    pub tcp_nodelay: bool,
    pub nat64_candidate_guard: Duration,
    pub nat64_hedge_delay: Duration,
    pub nat64_hedge_candidates: usize,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        NetworkConfig {
            connect_timeout: Duration::from_secs(30),
            tcp_nodelay: true,
            nat64_candidate_guard: Duration::from_secs(1),
            nat64_hedge_delay: Duration::from_millis(200),
            nat64_hedge_candidates: 3,
        }
    }
}

/// H2 stream/connection window defaults and TLS plaintext-buffer
/// watermarks (spec §6: "connection receive window target=4 MiB" etc).
#[derive(Debug, Clone)]
pub struct PerformanceConfig {
    pub h2_initial_stream_window: u32,
    pub h2_connection_window_target: u32,
    pub h2_max_frame_size: u32,
    pub h2_header_table_size: u32,
    pub tls_high_watermark: usize,
    pub tls_low_watermark: usize,
}

impl Default for PerformanceConfig {
    fn default() -> Self {
        PerformanceConfig {
            h2_initial_stream_window: 2 * 1024 * 1024,
            h2_connection_window_target: 4 * 1024 * 1024,
            h2_max_frame_size: 64 * 1024,
            h2_header_table_size: 4096,
            tls_high_watermark: 256 * 1024,
            tls_low_watermark: 64 * 1024,
        }
    }
}

/// ALPN offer and minimum TLS version.
#[derive(Debug, Clone)]
pub struct SecurityConfig {
    pub alpn_protocols: Vec<Vec<u8>>,
    pub doh_resolver_host: String,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        SecurityConfig {
            alpn_protocols: vec![b"h2".to_vec(), b"http/1.1".to_vec()],
            doh_resolver_host: "cloudflare-dns.com".to_string(),
        }
    }
}

/// Default retry policy (spec §4's retry loop): allowed methods, retried
/// statuses, and backoff bounds.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
    pub retry_methods: Vec<http::Method>,
    pub retry_statuses: Vec<u16>,
}

impl Default for RetryConfig {
    fn default() -> Self {
        RetryConfig {
            max_attempts: 2,
            base_delay: Duration::from_millis(200),
            max_delay: Duration::from_secs(30),
            retry_methods: vec![
                http::Method::GET,
                http::Method::HEAD,
                http::Method::OPTIONS,
                http::Method::PUT,
                http::Method::DELETE,
            ],
            retry_statuses: vec![408, 413, 429, 500, 502, 503, 504],
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionStrategy {
    Compat,
    FastH1,
}

#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub network: NetworkConfig,
    pub performance: PerformanceConfig,
    pub security: SecurityConfig,
    pub retry: RetryConfig,
    pub strategy: ConnectionStrategy,
    pub max_redirects: u32,
}

impl EngineConfig {
    /// Conservative defaults: full compat strategy (H2 preferred, NAT64
    /// hedge, protocol memo), standard timeouts.
    #[must_use]
    pub fn production() -> Self {
        EngineConfig {
            network: NetworkConfig::default(),
            performance: PerformanceConfig::default(),
            security: SecurityConfig::default(),
            retry: RetryConfig::default(),
            strategy: ConnectionStrategy::Compat,
            max_redirects: 5,
        }
    }

    /// Faster iteration for local testing: fast-h1 strategy (skips H2
    /// negotiation entirely), shorter connect guard.
    #[must_use]
    pub fn development() -> Self {
        let mut network = NetworkConfig::default();
        network.connect_timeout = Duration::from_secs(5);
        network.nat64_candidate_guard = Duration::from_millis(500);
        EngineConfig {
            network,
            performance: PerformanceConfig::default(),
            security: SecurityConfig::default(),
            retry: RetryConfig::default(),
            strategy: ConnectionStrategy::FastH1,
            max_redirects: 5,
        }
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self::production()
    }
}
