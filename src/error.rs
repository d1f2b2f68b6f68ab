//! Error Types
//!
//! One crate-wide error enum. Every variant is fatal to the call that
//! produced it: nothing in this crate retries internally or substitutes a
//! fallback value for bad input.

use thiserror::Error;

/// Errors surfaced by the validation and variance-reduction routines.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Error {
    /// Empty arrays, mismatched lengths, or values outside the permitted
    /// domain (infinities, or a constant-zero group under a multiplicative
    /// effect).
    #[error("invalid input: {reason}")]
    InvalidInput {
        /// What made the input unusable.
        reason: String,
    },

    /// Missing (NaN) entries passed to an operation that requires complete
    /// data.
    #[error("incomplete data: {reason}")]
    IncompleteData {
        /// Which input is incomplete and where.
        reason: String,
    },

    /// A quantity whose defining denominator vanished for the given data,
    /// e.g. a zero-variance covariate.
    #[error("degenerate computation: {reason}")]
    Degenerate {
        /// The quantity that is undefined.
        reason: String,
    },

    /// Caller-supplied configuration outside the accepted range.
    #[error("invalid configuration: {reason}")]
    Configuration {
        /// The offending setting and its constraint.
        reason: String,
    },
}

impl Error {
    pub(crate) fn invalid_input(reason: impl Into<String>) -> Self {
        Error::InvalidInput {
            reason: reason.into(),
        }
    }

    pub(crate) fn incomplete_data(reason: impl Into<String>) -> Self {
        Error::IncompleteData {
            reason: reason.into(),
        }
    }

    pub(crate) fn degenerate(reason: impl Into<String>) -> Self {
        Error::Degenerate {
            reason: reason.into(),
        }
    }

    pub(crate) fn configuration(reason: impl Into<String>) -> Self {
        Error::Configuration {
            reason: reason.into(),
        }
    }
}
