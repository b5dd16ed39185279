#![forbid(unsafe_code)]

//! Errors reported by [`ObservableSequence`](crate::ObservableSequence).
//!
//! Every variant is a precondition violation detected before any state change
//! or publication. A failed call leaves the sequence exactly as it was.

/// Result alias for sequence operations.
pub type SequenceResult<R> = Result<R, SequenceError>;

/// Precondition violations on sequence mutations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SequenceError {
    /// Index outside `0..len` (or `0..=len` for insertion).
    IndexOutOfRange { index: usize, len: usize },
    /// Range is inverted or extends past the current length.
    RangeOutOfBounds { start: usize, end: usize, len: usize },
    /// Strict replace needs as many replacement elements as the range spans.
    ReplacementLengthMismatch {
        range_len: usize,
        replacement_len: usize,
    },
    /// The sequence has been disposed.
    Disposed,
}

impl std::fmt::Display for SequenceError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::IndexOutOfRange { index, len } => {
                write!(f, "index {} out of range (length {})", index, len)
            }
            Self::RangeOutOfBounds { start, end, len } => {
                write!(f, "range {}..{} out of bounds (length {})", start, end, len)
            }
            Self::ReplacementLengthMismatch {
                range_len,
                replacement_len,
            } => write!(
                f,
                "replacement of {} elements does not match range of {}",
                replacement_len, range_len
            ),
            Self::Disposed => write!(f, "sequence has been disposed"),
        }
    }
}

impl std::error::Error for SequenceError {}
