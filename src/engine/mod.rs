//! Work order lifecycle and billing computation.
//!
//! Everything here takes an explicit [`Caller`](policy::Caller) — there is no
//! ambient current-user state — so the rules are testable without the HTTP
//! layer.

pub mod billing;
pub mod lifecycle;
pub mod policy;

use thiserror::Error;

/// Errors surfaced by lifecycle operations. The API layer maps these onto
/// HTTP statuses; nothing below the API layer knows about status codes.
#[derive(Debug, Error)]
pub enum EngineError {
    /// The entity is absent, or exists but is not visible to the caller.
    /// Both read identically so callers cannot probe for existence.
    #[error("{0}")]
    NotFound(&'static str),

    /// The caller's role can never perform this operation.
    #[error("{0}")]
    Forbidden(&'static str),

    /// A business-rule check failed on the input.
    #[error("{message}")]
    Validation { field: &'static str, message: String },

    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

impl EngineError {
    pub fn validation(field: &'static str, message: impl Into<String>) -> Self {
        EngineError::Validation {
            field,
            message: message.into(),
        }
    }
}
