//! # Expression reducer
//!
//! Small-step, resumable reduction of workflow expressions.
//!
//! ## Core Principles
//!
//! 1. **Immutable values**: every step builds new nodes, nothing is patched in place
//! 2. **Maximum local progress**: a pass reduces whatever is known and keeps
//!    unresolved sub-terms as residuals
//! 3. **Safe to repeat**: a pass is a pure function of value, scope, globals
//!    and the completion snapshot
//! 4. **Guarded branches**: conditional branches are only touched once the
//!    test is known, so side effects hidden in untaken branches never start
//!
//! Foreign code is never run here. Ground foreign applications are handed to
//! a [`crate::tickets::TicketSource`] and come back through a
//! [`crate::tickets::CompletionOracle`].

pub mod apply;
pub mod curry;
pub mod enumerate;
pub mod errors;
pub mod eval;
pub mod observer;
pub mod types;

#[cfg(test)]
mod tests;

// Re-export commonly used items
pub use errors::ReduceError;
pub use eval::{Reducer, DEFAULT_MAX_DEPTH};
pub use observer::{NoopObserver, ReductionObserver, TracingObserver};
pub use types::{
    Apply, Bindings, Cardinality, Compound, Cond, Curry, Expr, ForeignLambda, NativeLambda, Scope,
    Signature, TicketHandle,
};
