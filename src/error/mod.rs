//! Error taxonomy (spec §7): a single `Error` type with a `Kind` enum,
//! classification helpers (`is_timeout`, ...), and constructors per kind.

pub mod classification;
pub mod constructors;
pub mod types;

pub use types::{Error, Kind, Result};
