//! Ticket accounting and the completion oracle
//!
//! The reducer never runs foreign code. When it meets a ground foreign
//! application it asks a [`TicketSource`] for a ticket and leaves a
//! `TicketHandle` behind; results arrive later through a
//! [`CompletionOracle`] keyed by `(channel, ticket)`.
//!
//! The in-process implementations are [`TicketRegistry`] and [`FinStore`].

pub mod fin;
pub mod registry;

pub use fin::{FinError, FinSnapshot, FinStore};
pub use registry::{Invocation, TicketFactory, TicketRegistry};

use crate::reducer::types::{Bindings, Compound, ForeignLambda};
use crate::types::{ChannelRef, QueryId, TicketRef};
use std::collections::HashMap;

/// A foreign application whose bindings are all in normal form
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroundApply {
    pub lambda: ForeignLambda,
    pub bindings: Bindings,
    pub channel: usize,
}

/// Allocates tickets and reports whether a query still waits on any
pub trait TicketSource {
    /// Issue a fresh ticket for `apply`; structurally equal requests get distinct tickets
    fn request_ticket(&self, query: QueryId, apply: GroundApply) -> TicketRef;

    /// True iff no ticket requested under `query` is still unresolved
    fn is_queue_clear(&self, query: QueryId) -> bool;
}

/// Read-only view of finished foreign invocations
pub trait CompletionOracle {
    fn lookup(&self, at: ChannelRef) -> Option<Compound>;
}

impl CompletionOracle for HashMap<ChannelRef, Compound> {
    fn lookup(&self, at: ChannelRef) -> Option<Compound> {
        self.get(&at).cloned()
    }
}
