//! Type definitions for the reducer
//!
//! - Expression nodes (Expr, Compound, Apply, Cond, lambdas, TicketHandle, Curry)
//! - Callable signatures (Signature, Slot, ParamSlot)
//! - Lexical scope (Scope)
//! - Cardinality queries (Cardinality)

pub mod cardinality;
pub mod expr;
pub mod scope;
pub mod signature;

pub use cardinality::Cardinality;
pub use expr::{
    Apply, Bindings, Compound, Cond, Curry, Expr, ForeignLambda, NativeLambda, TicketHandle,
    LANG_BASH,
};
pub use scope::Scope;
pub use signature::{ParamSlot, Signature, Slot, TASK_PARAM};
