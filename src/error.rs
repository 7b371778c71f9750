//! # Error Types
//!
//! This module defines the error and warning types used throughout the
//! barra library.
//!
//! Encoders return `Result<Option<Warning>, Error>`: `Ok(None)` for a clean
//! encode, `Ok(Some(_))` for a successful encode with a compliance caveat,
//! `Err(_)` for a failure that left no symbol. Both carry the numeric codes
//! wrappers rely on via [`Error::code`] and [`Warning::code`].

use thiserror::Error;

/// Main error type for encoding operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Error {
    /// Input exceeds the symbology's capacity or maximum length.
    #[error("{0}")]
    TooLong(String),

    /// Input contains a character or structure the symbology cannot encode.
    #[error("{0}")]
    InvalidData(String),

    /// A check digit supplied in the input does not verify.
    #[error("{0}")]
    InvalidCheck(String),

    /// An option value or option combination is unsupported.
    #[error("{0}")]
    InvalidOption(String),

    /// Internal encoding failure (should not happen on valid input).
    #[error("{0}")]
    EncodingProblem(String),

    /// Working memory could not be allocated.
    #[error("{0}")]
    Memory(String),
}

impl Error {
    /// Numeric code for FFI-style callers.
    pub fn code(&self) -> i32 {
        match self {
            Error::TooLong(_) => 5,
            Error::InvalidData(_) => 6,
            Error::InvalidCheck(_) => 7,
            Error::InvalidOption(_) => 8,
            Error::EncodingProblem(_) => 9,
            Error::Memory(_) => 11,
        }
    }
}

/// Non-fatal diagnostics: the symbol was produced but deviates from a
/// recommendation or had to adapt the requested options.
///
/// Ordered by severity so callers can keep the worst of several warnings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Warning {
    /// The human-readable text was truncated to fit its buffer.
    HrtTruncated,
    /// An option was out of range and replaced by a default.
    InvalidOption,
    /// The output embeds an ECI the caller did not ask for explicitly.
    UsesEci,
    /// The symbol violates a dimensional recommendation of its standard.
    NonCompliant,
}

impl Warning {
    /// Numeric code for FFI-style callers.
    pub fn code(&self) -> i32 {
        match self {
            Warning::HrtTruncated => 1,
            Warning::InvalidOption => 2,
            Warning::UsesEci => 3,
            Warning::NonCompliant => 4,
        }
    }

    /// The error this warning becomes under `WarnLevel::FailAll`.
    pub(crate) fn promote(self, msg: String) -> Error {
        match self {
            Warning::HrtTruncated => Error::EncodingProblem(msg),
            Warning::InvalidOption => Error::InvalidOption(msg),
            Warning::UsesEci | Warning::NonCompliant => Error::InvalidData(msg),
        }
    }
}

/// Strictness policy for warnings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum WarnLevel {
    /// Warnings are reported alongside a successful encode.
    #[default]
    Default,
    /// Any warning aborts the encode with the corresponding error.
    FailAll,
}

/// Keeps the more severe of two optional warnings.
pub(crate) fn worse(a: Option<Warning>, b: Option<Warning>) -> Option<Warning> {
    match (a, b) {
        (Some(x), Some(y)) => Some(x.max(y)),
        (x, None) => x,
        (None, y) => y,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        assert_eq!(Error::TooLong(String::new()).code(), 5);
        assert_eq!(Error::InvalidData(String::new()).code(), 6);
        assert_eq!(Error::InvalidCheck(String::new()).code(), 7);
        assert_eq!(Error::InvalidOption(String::new()).code(), 8);
        assert_eq!(Error::EncodingProblem(String::new()).code(), 9);
        assert_eq!(Error::Memory(String::new()).code(), 11);
    }

    #[test]
    fn test_warning_severity_order() {
        assert!(Warning::NonCompliant > Warning::UsesEci);
        assert_eq!(
            worse(Some(Warning::InvalidOption), Some(Warning::NonCompliant)),
            Some(Warning::NonCompliant)
        );
        assert_eq!(worse(None, Some(Warning::HrtTruncated)), Some(Warning::HrtTruncated));
    }
}
