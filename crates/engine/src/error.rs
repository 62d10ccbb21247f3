//! The module contains the errors the engine can return.
//!
//! - [`EngineError`] covers construction and request-scoped failures.
//! - [`StoreError`] is what a [`LedgerStore`] reports when the spreadsheet
//!   (or whatever backs it) cannot be read or written.
//!
//! An unrecognised message is *not* an error: the parser returns a
//! [`ParseFailure`] value instead.
//!
//!  [`LedgerStore`]: crate::LedgerStore
//!  [`ParseFailure`]: crate::ParseFailure
use thiserror::Error;

/// Engine custom errors.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),
    #[error("Invalid timezone: {0}")]
    InvalidTimezone(String),
    #[error("Invalid message template: {0}")]
    Template(#[from] regex::Error),
    #[error("Invalid row: {0}")]
    InvalidRow(String),
    #[error("Missing builder field: {0}")]
    MissingField(&'static str),
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Failures of the external ledger store.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// The store could not be reached (network, auth, timeout).
    #[error("store unavailable: {0}")]
    Unavailable(String),
    /// The store answered but refused the operation.
    #[error("store rejected the request: {0}")]
    Rejected(String),
    /// The stored snapshot could not be decoded.
    #[error("malformed store data: {0}")]
    Malformed(String),
}

impl PartialEq for EngineError {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::InvalidAmount(a), Self::InvalidAmount(b)) => a == b,
            (Self::InvalidTimezone(a), Self::InvalidTimezone(b)) => a == b,
            (Self::Template(a), Self::Template(b)) => a.to_string() == b.to_string(),
            (Self::InvalidRow(a), Self::InvalidRow(b)) => a == b,
            (Self::MissingField(a), Self::MissingField(b)) => a == b,
            (Self::Store(a), Self::Store(b)) => a == b,
            _ => false,
        }
    }
}
