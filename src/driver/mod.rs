//! Query driver
//!
//! A query is a set of top-level targets reduced against shared globals.
//! Each trigger runs exactly one pass over every target; once the ticket
//! source reports nothing outstanding for the query, the targets are
//! delivered. Any error aborts the query and is reported with the targets
//! as they stood before the failing pass. Nothing is retried.

use crate::reducer::{Bindings, Compound, NoopObserver, ReduceError, Reducer, ReductionObserver, Scope, DEFAULT_MAX_DEPTH};
use crate::tickets::{CompletionOracle, FinStore, TicketRegistry, TicketSource};
use crate::types::{QueryId, QueryStatus, TicketRef};
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};


/* ===================== Errors ===================== */

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QueryError {
    #[error(transparent)]
    Reduce(#[from] ReduceError),

    /// Reported by the execution layer, never by the reducer
    #[error("external invocation {ticket} failed: {message}")]
    Invocation { ticket: TicketRef, message: String },

    /// Waiting on tickets that nothing is executing
    #[error("query stalled with {outstanding} ticket(s) outstanding and nothing running")]
    Stalled { outstanding: usize },

    #[error("unknown query {0}")]
    UnknownQuery(QueryId),
}

impl QueryError {
    pub fn kind(&self) -> &'static str {
        match self {
            QueryError::Reduce(e) => e.kind(),
            QueryError::Invocation { .. } => "ExternalInvocationFailure",
            QueryError::Stalled { .. } => "StalledQueryError",
            QueryError::UnknownQuery(_) => "UnknownQueryError",
        }
    }
}

/// A failed query with the best partial context available
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("query {query} failed after {passes} pass(es): {error}")]
pub struct QueryFailure {
    pub query: QueryId,
    pub error: QueryError,
    pub passes: usize,
    /// Targets as they stood before the failing pass
    pub context: Vec<Compound>,
}

/* ===================== Query ===================== */

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryOutcome {
    /// No ticket outstanding: the targets are final
    Done(Vec<Compound>),
    /// Waiting for tickets to resolve
    Waiting,
}

/// Settings shared by every pass
#[derive(Clone)]
pub struct PassOptions {
    pub max_depth: usize,
    pub observer: Arc<dyn ReductionObserver>,
}

impl Default for PassOptions {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
            observer: Arc::new(NoopObserver),
        }
    }
}

impl PassOptions {
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub fn with_observer(mut self, observer: Arc<dyn ReductionObserver>) -> Self {
        self.observer = observer;
        self
    }
}

#[derive(Debug, Clone)]
pub struct Query {
    id: QueryId,
    globals: Arc<Bindings>,
    targets: Vec<Compound>,
    passes: usize,
}

impl Query {
    pub fn new(globals: Bindings, targets: Vec<Compound>) -> Self {
        Self::with_id(QueryId::new(), Arc::new(globals), targets)
    }

    pub fn with_id(id: QueryId, globals: Arc<Bindings>, targets: Vec<Compound>) -> Self {
        Self {
            id,
            globals,
            targets,
            passes: 0,
        }
    }

    pub fn id(&self) -> QueryId {
        self.id
    }

    pub fn targets(&self) -> &[Compound] {
        &self.targets
    }

    pub fn passes(&self) -> usize {
        self.passes
    }

    /// Run one pass over every target
    ///
    /// `fin` should be a snapshot taken after the caller recorded every
    /// result it wants this pass to see. Targets only change if the whole
    /// pass succeeds. The query is done only when no ticket is outstanding
    /// and no target still holds a ticket handle.
    pub fn step(
        &mut self,
        fin: &dyn CompletionOracle,
        tickets: &dyn TicketSource,
        options: &PassOptions,
    ) -> Result<QueryOutcome, QueryError> {
        let mut reducer = Reducer::new(self.id, &self.globals, fin, tickets)
            .with_observer(options.observer.as_ref())
            .with_max_depth(options.max_depth);
        let scope = Scope::new();
        let targets = self
            .targets
            .iter()
            .map(|target| reducer.reduce(target, &scope))
            .collect::<Result<Vec<_>, _>>()?;

        self.targets = targets;
        self.passes += 1;

        // The queue can clear while the pass runs; a handle the snapshot could not fill must wait
        let unfilled = self.targets.iter().any(Compound::has_pending_ticket);
        if !unfilled && tickets.is_queue_clear(self.id) {
            Ok(QueryOutcome::Done(self.targets.clone()))
        } else {
            Ok(QueryOutcome::Waiting)
        }
    }

    pub fn failure(&self, error: QueryError) -> QueryFailure {
        QueryFailure {
            query: self.id,
            error,
            passes: self.passes,
            context: self.targets.clone(),
        }
    }
}

/* ===================== Driver ===================== */

/// Drives many queries against one ticket registry and completion store
///
/// The caller owns the execution side: it drains invocations from the
/// registry, records results in the store, resolves the tickets, then
/// triggers the owning query.
pub struct QueryDriver {
    registry: Arc<TicketRegistry>,
    fin: Arc<FinStore>,
    options: PassOptions,
    queries: HashMap<QueryId, Query>,
    finished: HashMap<QueryId, QueryStatus>,
}

impl QueryDriver {
    pub fn new(registry: Arc<TicketRegistry>, fin: Arc<FinStore>) -> Self {
        Self {
            registry,
            fin,
            options: PassOptions::default(),
            queries: HashMap::new(),
            finished: HashMap::new(),
        }
    }

    pub fn with_options(mut self, options: PassOptions) -> Self {
        self.options = options;
        self
    }

    pub fn registry(&self) -> &Arc<TicketRegistry> {
        &self.registry
    }

    pub fn fin(&self) -> &Arc<FinStore> {
        &self.fin
    }

    /// Register a new query; no pass runs until it is triggered
    pub fn submit(&mut self, globals: Bindings, targets: Vec<Compound>) -> QueryId {
        let query = Query::new(globals, targets);
        let id = query.id();
        debug!(query = %id, targets = query.targets().len(), "query submitted");
        self.queries.insert(id, query);
        id
    }

    /// Run one pass of `id`
    pub fn trigger(&mut self, id: QueryId) -> Result<QueryOutcome, QueryFailure> {
        let Some(query) = self.queries.get_mut(&id) else {
            return Err(QueryFailure {
                query: id,
                error: QueryError::UnknownQuery(id),
                passes: 0,
                context: Vec::new(),
            });
        };

        let snapshot = self.fin.snapshot();
        let result = query.step(&snapshot, self.registry.as_ref(), &self.options);
        debug!(query = %id, pass = query.passes(), "pass finished");

        match result {
            Ok(QueryOutcome::Done(targets)) => {
                info!(query = %id, passes = query.passes(), "query completed");
                self.queries.remove(&id);
                self.registry.forget(id);
                self.finished.insert(id, QueryStatus::Completed);
                Ok(QueryOutcome::Done(targets))
            }
            Ok(QueryOutcome::Waiting) => Ok(QueryOutcome::Waiting),
            Err(error) => Err(self.abort(id, error)),
        }
    }

    /// One pass of every live query, in no particular order
    pub fn trigger_all(&mut self) -> Vec<(QueryId, Result<QueryOutcome, QueryFailure>)> {
        let ids: Vec<QueryId> = self.queries.keys().copied().collect();
        ids.into_iter().map(|id| (id, self.trigger(id))).collect()
    }

    /// Abort `id` on behalf of the execution layer
    pub fn fail(&mut self, id: QueryId, error: QueryError) -> QueryFailure {
        self.abort(id, error)
    }

    pub fn status(&self, id: QueryId) -> Option<QueryStatus> {
        if let Some(status) = self.finished.get(&id) {
            return Some(*status);
        }
        let query = self.queries.get(&id)?;
        if query.passes() == 0 {
            Some(QueryStatus::Pending)
        } else {
            Some(QueryStatus::Waiting)
        }
    }

    /// Ids of queries still running
    pub fn live(&self) -> Vec<QueryId> {
        self.queries.keys().copied().collect()
    }

    fn abort(&mut self, id: QueryId, error: QueryError) -> QueryFailure {
        warn!(query = %id, kind = error.kind(), %error, "query failed");
        let failure = match self.queries.remove(&id) {
            Some(query) => query.failure(error),
            None => QueryFailure {
                query: id,
                error,
                passes: 0,
                context: Vec::new(),
            },
        };
        self.registry.forget(id);
        self.finished.insert(id, QueryStatus::Failed);
        failure
    }
}
