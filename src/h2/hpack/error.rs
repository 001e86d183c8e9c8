//! Leaf HPACK decode errors, wrapped as the outer [`crate::error::Error`]'s
//! `source` rather than flattened into a string — lets a caller downcast to
//! find out exactly which HPACK invariant broke.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum HpackError {
    #[error("dynamic table size update after a non-update field")]
    SizeUpdateAfterNonUpdate,
    #[error("dynamic table size update of {requested} exceeds agreed maximum {max}")]
    SizeUpdateExceedsMax { requested: usize, max: usize },
    #[error("indexed header field index {0} is invalid")]
    InvalidIndex(usize),
    #[error("string literal is not valid UTF-8")]
    InvalidUtf8,
    #[error("truncated string literal")]
    Truncated,
}
