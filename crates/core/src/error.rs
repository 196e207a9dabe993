//! Domain error model.

use thiserror::Error;

/// Failure raised by domain code, independent of storage or transport.
///
/// Invoice rule violations have their own type in `invoicer-invoicing`; this
/// covers what the shared building blocks can reject.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// An identifier could not be parsed.
    #[error("invalid identifier: {0}")]
    InvalidId(String),
}

impl DomainError {
    pub fn invalid_id(msg: impl Into<String>) -> Self {
        Self::InvalidId(msg.into())
    }
}
