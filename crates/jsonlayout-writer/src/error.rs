//! Error types for the writer crate.

use thiserror::Error;

/// Errors raised while writing JSON tokens into a [`FixedBuffer`](crate::FixedBuffer).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WriteError {
    /// The encoded output would exceed the buffer capacity.
    ///
    /// The buffer stays in its overflowed state until it is reset; every
    /// further write fails with this same error.
    #[error("output buffer overflow (capacity {capacity} bytes)")]
    Overflow { capacity: usize },

    /// A token was written where the document structure does not allow it.
    #[error("invalid writer state: {0}")]
    InvalidState(&'static str),

    /// A streamed string fragment failed to format for a reason other than overflow.
    #[error("string formatting failed")]
    Format,
}

/// Result type for writer operations.
pub type Result<T> = std::result::Result<T, WriteError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_overflow_display() {
        let err = WriteError::Overflow { capacity: 64 };
        assert!(err.to_string().contains("overflow"));
        assert!(err.to_string().contains("64"));
    }
}
