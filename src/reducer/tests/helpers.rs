//! Test helpers for reducer tests
//!
//! A harness owning globals, a completion map and a sequential ticket
//! registry, plus shorthand constructors for common lambdas.

use crate::reducer::observer::ReductionObserver;
use crate::reducer::types::*;
use crate::reducer::{ReduceError, Reducer};
use crate::tickets::{Invocation, TicketRegistry};
use crate::types::{ChannelRef, QueryId, TicketRef};
use std::collections::HashMap;
use std::sync::Mutex;

pub struct Harness {
    pub globals: Bindings,
    pub fin: HashMap<ChannelRef, Compound>,
    pub registry: TicketRegistry,
    pub query: QueryId,
}

impl Harness {
    pub fn new() -> Self {
        Self {
            globals: Bindings::new(),
            fin: HashMap::new(),
            registry: TicketRegistry::sequential(),
            query: QueryId::new(),
        }
    }

    pub fn global(mut self, name: &str, value: impl Into<Compound>) -> Self {
        self.globals.insert(name.to_string(), value.into());
        self
    }

    /// One pass in the empty scope
    pub fn reduce(&self, value: &Compound) -> Result<Compound, ReduceError> {
        self.reduce_in(value, &Scope::new())
    }

    pub fn reduce_in(&self, value: &Compound, scope: &Scope) -> Result<Compound, ReduceError> {
        Reducer::new(self.query, &self.globals, &self.fin, &self.registry).reduce(value, scope)
    }

    pub fn reduce_observed(
        &self,
        value: &Compound,
        observer: &dyn ReductionObserver,
    ) -> Result<Compound, ReduceError> {
        Reducer::new(self.query, &self.globals, &self.fin, &self.registry)
            .with_observer(observer)
            .reduce(value, &Scope::new())
    }

    /// Publish a finished value for one channel of a ticket
    pub fn finish(&mut self, channel: usize, ticket: TicketRef, value: Compound) {
        self.fin.insert(ChannelRef::new(channel, ticket), value);
    }

    pub fn drain(&self) -> Vec<Invocation> {
        self.registry.drain_outbox(self.query)
    }
}

/// Ticket number `n` of a sequential registry
pub fn ticket(n: u128) -> TicketRef {
    TicketRef::from_u128(n)
}

pub fn lit(values: &[&str]) -> Compound {
    Compound::strs(values)
}

pub fn var(name: &str) -> Compound {
    Compound::var(name)
}

/// `out : inp` with `out = inp`
pub fn identity() -> NativeLambda {
    NativeLambda::new(
        Signature::new().output("out").param("inp"),
        bindings(&[("out", var("inp"))]),
    )
}

/// Foreign lambda with one output and the given simple parameters
pub fn foreign(src: &str, params: &[&str]) -> ForeignLambda {
    let sign = params
        .iter()
        .fold(Signature::new().output("out"), |sign, p| sign.param(*p));
    ForeignLambda::bash(sign, src)
}

pub fn bindings(pairs: &[(&str, Compound)]) -> Bindings {
    pairs
        .iter()
        .map(|(name, value)| (name.to_string(), value.clone()))
        .collect()
}

pub fn apply(task: impl Into<Expr>) -> Apply {
    Apply::new(1, Compound::single(task))
}

/// Records observer events as short strings
#[derive(Default)]
pub struct RecordingObserver {
    pub events: Mutex<Vec<String>>,
}

impl RecordingObserver {
    pub fn events(&self) -> Vec<String> {
        self.events.lock().unwrap().clone()
    }
}

impl ReductionObserver for RecordingObserver {
    fn ticket_requested(&self, _query: QueryId, _apply: &Apply, handle: &TicketHandle) {
        self.events
            .lock()
            .unwrap()
            .push(format!("requested {}", handle.channel));
    }

    fn ticket_substituted(&self, _query: QueryId, _handle: &TicketHandle, value: &Compound) {
        self.events
            .lock()
            .unwrap()
            .push(format!("substituted {}", value));
    }

    fn residual_left(&self, _query: QueryId, _apply: &Apply) {
        self.events.lock().unwrap().push("residual".to_string());
    }

    fn enumeration_deferred(&self, _query: QueryId, _apply: &Apply) {
        self.events.lock().unwrap().push("deferred".to_string());
    }
}
