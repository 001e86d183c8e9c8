//! L3 — HTTP/1.1 codec and connection driver.

pub mod chunked;
pub mod codec;
pub mod connection;

pub use connection::{send_request, H1Response};
