//! Error type shared by the hash handle, the backends and the convenience layer.
//!
//! "Not found" is never an error: lookups return `Ok(None)` and deletes
//! return `Ok(false)`. End of a cursor traversal is likewise `Ok(None)`, so
//! callers can always tell exhaustion apart from failure.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, HashError>;

#[derive(Error, Debug)]
pub enum HashError {
    #[error("allocation failed while {what}")]
    AllocationFailure { what: &'static str },

    #[error("hash `{identifier}` is already open")]
    AlreadyOpen { identifier: String },

    #[error("cursor used after finish")]
    CursorFinished,

    #[error("unterminated quoted value for key `{key}` starting at byte {offset}")]
    UnterminatedValue { key: String, offset: usize },

    #[error("value `{value}` of key `{key}` is not a number")]
    NotANumber { key: String, value: String },

    #[error("invalid memory hash configuration: {reason}")]
    InvalidConfig { reason: String },

    #[error("backend `{backend}` failed: {message}")]
    Backend { backend: String, message: String },
}
