//! Error taxonomy shared by every layer.

use thiserror::Error;

/// Broad classification of a failure.
///
/// Callers use this to decide how to surface an error: validation and state
/// errors go back to whoever asked for the operation, integrity errors abort
/// the single operation, and only storage errors are ever worth retrying.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// The request itself is malformed (caller mistake).
    Validation,
    /// The request is well-formed but the target is in the wrong state.
    State,
    /// Arithmetic or invariant violation fatal to the single operation.
    Integrity,
    /// A referenced record does not exist.
    NotFound,
    /// The storage backend failed.
    Storage,
}

impl ErrorKind {
    /// Returns the kind as a lowercase label for structured logs.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Validation => "validation",
            Self::State => "state",
            Self::Integrity => "integrity",
            Self::NotFound => "not_found",
            Self::Storage => "storage",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors raised by `Money` construction and arithmetic.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MoneyError {
    /// The input text is not a finite decimal number.
    #[error("Invalid amount: {0:?}")]
    InvalidAmount(String),

    /// The input carries more fractional digits than the canonical scale.
    #[error("Amount {0} exceeds 8 fractional digits")]
    ExcessPrecision(String),

    /// The result does not fit the fixed-scale representation.
    #[error("Arithmetic overflow")]
    ArithmeticOverflow,
}

impl MoneyError {
    /// Returns the error code for structured output.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::InvalidAmount(_) => "INVALID_AMOUNT",
            Self::ExcessPrecision(_) => "EXCESS_PRECISION",
            Self::ArithmeticOverflow => "ARITHMETIC_OVERFLOW",
        }
    }

    /// Returns the taxonomy kind of this error.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidAmount(_) | Self::ExcessPrecision(_) => ErrorKind::Validation,
            Self::ArithmeticOverflow => ErrorKind::Integrity,
        }
    }
}
