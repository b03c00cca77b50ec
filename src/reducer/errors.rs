//! Reduction errors
//!
//! Every variant is fatal for the owning query. A cardinality that cannot be
//! told yet is not an error: see [`super::types::Cardinality`].

use thiserror::Error;

/* ===================== Error Kind Codes ===================== */

pub const UNBOUND_NAME: &str = "UnboundNameError";
pub const NOT_CALLABLE: &str = "NotCallableError";
pub const MISSING_CALLABLE: &str = "MissingCallableError";
pub const CHANNEL_OUT_OF_RANGE: &str = "ChannelOutOfRangeError";
pub const CONSISTENCY: &str = "ConsistencyError";
pub const UNSUPPORTED_CURRY: &str = "UnsupportedCurryError";
pub const DEPTH_EXCEEDED: &str = "DepthExceededError";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReduceError {
    /// A free variable escaped static scoping
    #[error("name `{name}` is not bound")]
    UnboundName { name: String },

    #[error("{found} is not a callable value")]
    NotCallable { found: String },

    #[error("application has no callable in its task slot: {apply}")]
    MissingCallable { apply: String },

    #[error("output channel {channel} is out of range for a callable with {outputs} output(s)")]
    ChannelOutOfRange { channel: usize, outputs: usize },

    #[error("correlated parameters [{}] have differing cardinalities {cardinalities:?}", .names.join(" "))]
    Consistency {
        names: Vec<String>,
        cardinalities: Vec<usize>,
    },

    #[error("cannot curry {found}: only native callables can be curried")]
    UnsupportedCurry { found: String },

    #[error("reduction exceeded the depth limit of {limit}")]
    DepthExceeded { limit: usize },
}

impl ReduceError {
    /// Stable kind code, reported to callers alongside the message
    pub fn kind(&self) -> &'static str {
        match self {
            ReduceError::UnboundName { .. } => UNBOUND_NAME,
            ReduceError::NotCallable { .. } => NOT_CALLABLE,
            ReduceError::MissingCallable { .. } => MISSING_CALLABLE,
            ReduceError::ChannelOutOfRange { .. } => CHANNEL_OUT_OF_RANGE,
            ReduceError::Consistency { .. } => CONSISTENCY,
            ReduceError::UnsupportedCurry { .. } => UNSUPPORTED_CURRY,
            ReduceError::DepthExceeded { .. } => DEPTH_EXCEEDED,
        }
    }
}
