//! A from-scratch HTTP/1.1 and HTTP/2 client engine for hosts that expose
//! only a raw TCP connect primitive: own TLS end-to-end (L1-L2), speak both
//! wire protocols directly (L3-L9), and route around IPv4 egress blocks on
//! CDN-fronted targets via NAT64 (M1-M5), all behind one [`dispatch::request`]
//! entry point.
//!
//! ```text
//! dispatch::request
//!   -> dns (M1) / protocol_memo (M4) / pool (M5)
//!   -> socket (L1) -> tls (L2) -> h1 or h2 (L3-L9)
//! ```

pub mod body;
pub mod cancel;
pub mod compression;
pub mod config;
pub mod context;
pub mod dispatch;
pub mod dns;
pub mod error;
pub mod h1;
pub mod h2;
pub mod headers;
pub mod nat64;
pub mod pool;
pub mod protocol_memo;
pub mod request;
pub mod response;
pub mod socket;
pub mod stats;
pub mod tls;
pub mod url;

pub use config::EngineConfig;
pub use context::EngineContext;
pub use dispatch::request;
pub use error::{Error, Kind, Result};
pub use request::{ProtocolPreference, Request, RequestOptions, RetryPreference};
pub use response::{ProtocolUsed, Response};
pub use url::ParsedUrl;
