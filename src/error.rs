//! Error taxonomy for match-record parsing.
//!
//! Parsing distinguishes three failures, each with a different operational
//! meaning:
//!
//! | Variant | Meaning |
//! |---------|---------|
//! | [`ParseError::NotFound`] | The locator does not point at a readable record |
//! | [`ParseError::MalformedInput`] | The content is not JSON, or a value has the wrong shape |
//! | [`ParseError::MissingField`] | A required path is absent (data-integrity problem) |
//!
//! Geocoding failures and out-of-range innings are deliberately *not*
//! represented here: the former degrade to `None`, the latter to an empty
//! table.

use thiserror::Error;

/// Failure while loading or reading a Cricsheet match record.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// The record locator (usually a file path) could not be opened.
    #[error("match record not found: {locator}")]
    NotFound { locator: String },

    /// The record is not valid JSON, or a value at `locator` has an
    /// unexpected type.
    #[error("malformed match record at {locator}: {reason}")]
    MalformedInput { locator: String, reason: String },

    /// A required field is absent. `path` uses dotted keys with list
    /// indices, e.g. `info.officials.umpires[1]`.
    #[error("missing required field: {path}")]
    MissingField { path: String },
}

impl ParseError {
    pub(crate) fn malformed(locator: impl Into<String>, reason: impl Into<String>) -> Self {
        ParseError::MalformedInput {
            locator: locator.into(),
            reason: reason.into(),
        }
    }

    pub(crate) fn missing(path: impl Into<String>) -> Self {
        ParseError::MissingField { path: path.into() }
    }
}

pub type ParseResult<T> = std::result::Result<T, ParseError>;
