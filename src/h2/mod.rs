//! HTTP/2 engine: L4 framing, L5 HPACK, L6 flow control, L7 stream state
//! machine, L8 connection multiplexer, L9 client facade.

pub mod client;
pub mod connection;
pub mod flow;
pub mod frame;
pub mod hpack;
pub mod stream;

pub use client::H2Client;
