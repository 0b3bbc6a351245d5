//! Typed error kinds for the lifting pipeline.
//!
//! Every stage in the pipeline is total except where this module's variants name a
//! specific, documented failure. There is no retry policy: callers discard whatever
//! intermediate state they were building on `Err`.

use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub enum CoreError {
    /// A caller-supplied argument is out of its documented domain (e.g. a lift
    /// threshold outside `[0, 1]`).
    InvalidArgument(String),
    /// A factor graph or parfactor graph fails one of its structural invariants.
    InvariantViolation(String),
    /// A counting random variable was inferred but no commutative-argument or
    /// histogram cache entry was supplied for the factor that needed it.
    MissingCommutativityAnnotation(String),
    /// The emitter cannot translate a range into a concrete inference-engine type.
    UnsupportedRange(String),
    /// Reserved for the external inference engine; the core never raises this itself.
    Timeout,
}

impl fmt::Display for CoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CoreError::InvalidArgument(msg) => write!(f, "invalid argument: {}", msg),
            CoreError::InvariantViolation(msg) => write!(f, "invariant violation: {}", msg),
            CoreError::MissingCommutativityAnnotation(factor) => write!(
                f,
                "factor '{}' needs a counting random variable but has no commutativity annotation",
                factor
            ),
            CoreError::UnsupportedRange(detail) => write!(f, "unsupported range: {}", detail),
            CoreError::Timeout => write!(f, "inference engine timed out"),
        }
    }
}

impl std::error::Error for CoreError {}

pub type Result<T> = std::result::Result<T, CoreError>;
