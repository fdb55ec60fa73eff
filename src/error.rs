use std::fmt;

/// The result type used across the whole engine.
pub type Result<T> = std::result::Result<T, NetError>;

/// Errors raised by the engine when configuration or data is invalid.
///
/// All variants are raised synchronously at the boundary where the bad
/// data is first used and are never retried internally; the caller must
/// correct the input and repeat the whole call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NetError {
    /// A constructor or training hyperparameter is invalid for semantic
    /// or domain reasons.
    InvalidConfiguration {
        /// Human-readable context (e.g. "layer sizes", "learning rate").
        what: &'static str,
    },

    /// Externally supplied weights or biases disagree with the declared
    /// layer sizes.
    ShapeMismatch {
        /// Which parameter mismatched (e.g. "weights[1] rows").
        what: String,
        /// Observed dimension.
        got: usize,
        /// Expected dimension.
        expected: usize,
    },

    /// An inference or training call received a vector of wrong length.
    DimensionMismatch {
        /// Which vector mismatched (e.g. "input", "target").
        what: &'static str,
        got: usize,
        expected: usize,
    },
}

impl fmt::Display for NetError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NetError::InvalidConfiguration { what } => {
                write!(f, "invalid configuration: {what}")
            }
            NetError::ShapeMismatch { what, got, expected } => {
                write!(f, "shape mismatch for {what}: got {got}, expected {expected}")
            }
            NetError::DimensionMismatch { what, got, expected } => {
                write!(f, "dimension mismatch for {what}: got {got}, expected {expected}")
            }
        }
    }
}

impl std::error::Error for NetError {}
