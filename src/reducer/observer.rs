//! Observability hook for the reducer
//!
//! The reducer itself never logs. Callers inject a [`ReductionObserver`];
//! every method has an empty default so implementors pick what they need.

use super::types::{Apply, Compound, TicketHandle};
use crate::types::QueryId;

pub trait ReductionObserver: Send + Sync {
    /// A foreign application was ground and a ticket was issued
    fn ticket_requested(&self, _query: QueryId, _apply: &Apply, _handle: &TicketHandle) {}

    /// A ticket handle was replaced by its finished value
    fn ticket_substituted(&self, _query: QueryId, _handle: &TicketHandle, _value: &Compound) {}

    /// A native application could not finish and left a residual
    fn residual_left(&self, _query: QueryId, _apply: &Apply) {}

    /// Cardinality of an application's arguments is not known yet
    fn enumeration_deferred(&self, _query: QueryId, _apply: &Apply) {}
}

/// Observer that ignores everything
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopObserver;

impl ReductionObserver for NoopObserver {}

/// Forwards reduction events to `tracing` at trace level
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingObserver;

impl ReductionObserver for TracingObserver {
    fn ticket_requested(&self, query: QueryId, apply: &Apply, handle: &TicketHandle) {
        tracing::trace!(%query, ticket = %handle.ticket, channel = apply.channel, "ticket requested");
    }

    fn ticket_substituted(&self, query: QueryId, handle: &TicketHandle, value: &Compound) {
        tracing::trace!(%query, ticket = %handle.ticket, channel = handle.channel, %value, "ticket substituted");
    }

    fn residual_left(&self, query: QueryId, apply: &Apply) {
        tracing::trace!(%query, channel = apply.channel, "native application left a residual");
    }

    fn enumeration_deferred(&self, query: QueryId, apply: &Apply) {
        tracing::trace!(%query, bindings = apply.bindings.len(), "enumeration deferred");
    }
}
