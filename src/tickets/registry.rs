//! In-process ticket source
//!
//! Every requested ticket becomes an [`Invocation`] in its query's outbox
//! and stays outstanding until the execution layer calls
//! [`TicketRegistry::resolve`]. Ticket ids come from an injected factory.

use super::{GroundApply, TicketSource};
use crate::reducer::types::ForeignLambda;
use crate::types::{QueryId, TicketRef};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

pub type TicketFactory = Arc<dyn Fn() -> TicketRef + Send + Sync>;

/// A foreign call ready to hand to a worker
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Invocation {
    pub ticket: TicketRef,
    pub query: QueryId,
    pub lambda: ForeignLambda,
    /// Parameter name → ground values, in binding order
    pub args: BTreeMap<String, Vec<String>>,
    /// Channel the requesting application selected
    pub channel: usize,
}

#[derive(Debug, Default)]
struct RegistryState {
    outbox: HashMap<QueryId, Vec<Invocation>>,
    outstanding: HashMap<QueryId, HashSet<TicketRef>>,
    owners: HashMap<TicketRef, QueryId>,
}

pub struct TicketRegistry {
    factory: TicketFactory,
    state: Mutex<RegistryState>,
}

impl Default for TicketRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for TicketRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TicketRegistry")
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

impl TicketRegistry {
    /// Registry handing out random v4 tickets
    pub fn new() -> Self {
        Self::with_factory(Arc::new(TicketRef::new))
    }

    pub fn with_factory(factory: TicketFactory) -> Self {
        Self {
            factory,
            state: Mutex::new(RegistryState::default()),
        }
    }

    /// Registry numbering tickets 1, 2, 3, ...
    pub fn sequential() -> Self {
        let counter = AtomicU64::new(0);
        Self::with_factory(Arc::new(move || {
            let n = counter.fetch_add(1, Ordering::SeqCst) + 1;
            TicketRef::from_u128(n as u128)
        }))
    }

    fn lock(&self) -> MutexGuard<'_, RegistryState> {
        // State stays consistent even if a holder panicked: every update is a single map op
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Take the invocations queued for `query` since the last drain
    pub fn drain_outbox(&self, query: QueryId) -> Vec<Invocation> {
        self.lock().outbox.remove(&query).unwrap_or_default()
    }

    /// Mark `ticket` as finished; returns the owning query
    pub fn resolve(&self, ticket: TicketRef) -> Option<QueryId> {
        let mut state = self.lock();
        let query = state.owners.remove(&ticket)?;
        if let Some(set) = state.outstanding.get_mut(&query) {
            set.remove(&ticket);
            if set.is_empty() {
                state.outstanding.remove(&query);
            }
        }
        Some(query)
    }

    /// Number of unresolved tickets of `query`
    pub fn outstanding(&self, query: QueryId) -> usize {
        self.lock().outstanding.get(&query).map_or(0, HashSet::len)
    }

    /// Drop everything known about `query`
    pub fn forget(&self, query: QueryId) {
        let mut state = self.lock();
        state.outbox.remove(&query);
        if let Some(tickets) = state.outstanding.remove(&query) {
            for ticket in tickets {
                state.owners.remove(&ticket);
            }
        }
    }
}

impl TicketSource for TicketRegistry {
    fn request_ticket(&self, query: QueryId, apply: GroundApply) -> TicketRef {
        let ticket = (self.factory)();
        let args = apply
            .bindings
            .iter()
            .map(|(name, value)| {
                let values = value
                    .iter()
                    .filter_map(|e| e.as_str().map(str::to_string))
                    .collect();
                (name.clone(), values)
            })
            .collect();
        let invocation = Invocation {
            ticket,
            query,
            lambda: apply.lambda,
            args,
            channel: apply.channel,
        };

        let mut state = self.lock();
        state.outbox.entry(query).or_default().push(invocation);
        state.outstanding.entry(query).or_default().insert(ticket);
        state.owners.insert(ticket, query);
        ticket
    }

    fn is_queue_clear(&self, query: QueryId) -> bool {
        self.outstanding(query) == 0
    }
}

/// Convenience for building invocations by hand
impl Invocation {
    pub fn new(ticket: TicketRef, query: QueryId, lambda: ForeignLambda) -> Self {
        Self {
            ticket,
            query,
            lambda,
            args: BTreeMap::new(),
            channel: 1,
        }
    }

    pub fn arg<S: Into<String>>(mut self, name: impl Into<String>, values: impl IntoIterator<Item = S>) -> Self {
        self.args
            .insert(name.into(), values.into_iter().map(Into::into).collect());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reducer::types::{Bindings, Compound, Signature};
    use maplit::btreemap;

    fn ground(bindings: Bindings) -> GroundApply {
        GroundApply {
            lambda: ForeignLambda::bash(Signature::new().output("out").param("x"), "out=$x"),
            bindings,
            channel: 1,
        }
    }

    #[test]
    fn test_request_queues_invocation() {
        let registry = TicketRegistry::sequential();
        let query = QueryId::new();

        let ticket = registry.request_ticket(
            query,
            ground(btreemap! { "x".to_string() => Compound::strs(&["a", "b"]) }),
        );

        assert_eq!(ticket, TicketRef::from_u128(1));
        assert!(!registry.is_queue_clear(query));
        assert_eq!(registry.outstanding(query), 1);

        let drained = registry.drain_outbox(query);
        assert_eq!(drained.len(), 1);
        assert_eq!(drained[0].ticket, ticket);
        assert_eq!(
            drained[0].args,
            btreemap! { "x".to_string() => vec!["a".to_string(), "b".to_string()] }
        );
        // Drained but not resolved: still outstanding
        assert!(registry.drain_outbox(query).is_empty());
        assert_eq!(registry.outstanding(query), 1);
    }

    #[test]
    fn test_identical_requests_get_distinct_tickets() {
        let registry = TicketRegistry::sequential();
        let query = QueryId::new();
        let a = registry.request_ticket(query, ground(Bindings::new()));
        let b = registry.request_ticket(query, ground(Bindings::new()));
        assert_ne!(a, b);
        assert_eq!(registry.outstanding(query), 2);
    }

    #[test]
    fn test_resolve_clears_queue() {
        let registry = TicketRegistry::sequential();
        let query = QueryId::new();
        let other = QueryId::new();
        let ticket = registry.request_ticket(query, ground(Bindings::new()));
        registry.request_ticket(other, ground(Bindings::new()));

        assert_eq!(registry.resolve(ticket), Some(query));
        assert!(registry.is_queue_clear(query));
        assert!(!registry.is_queue_clear(other));
        assert_eq!(registry.resolve(ticket), None);
    }

    #[test]
    fn test_forget_drops_query_state() {
        let registry = TicketRegistry::sequential();
        let query = QueryId::new();
        let ticket = registry.request_ticket(query, ground(Bindings::new()));

        registry.forget(query);
        assert!(registry.is_queue_clear(query));
        assert!(registry.drain_outbox(query).is_empty());
        assert_eq!(registry.resolve(ticket), None);
    }
}
