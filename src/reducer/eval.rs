//! Evaluator: one reduction pass over a compound value
//!
//! [`Reducer::reduce`] rewrites every element of a compound once, in order,
//! and concatenates the results. It is a pure function of the value, the
//! scope, the globals and the completion snapshot, so running it again
//! after more tickets resolve never contradicts an earlier pass.
//!
//! Applications and curry nodes are handled in `apply.rs`, `enumerate.rs`
//! and `curry.rs`, all as further `impl Reducer` blocks.

use super::errors::ReduceError;
use super::observer::{NoopObserver, ReductionObserver};
use super::types::{Bindings, Compound, Cond, Expr, Scope};
use crate::tickets::{CompletionOracle, TicketSource};
use crate::types::{ChannelRef, QueryId};

/// Default recursion limit for nested reductions
pub const DEFAULT_MAX_DEPTH: usize = 256;

static NOOP: NoopObserver = NoopObserver;

/// Reduction context for one pass of one query
pub struct Reducer<'a> {
    pub(super) globals: &'a Bindings,
    pub(super) fin: &'a dyn CompletionOracle,
    pub(super) tickets: &'a dyn TicketSource,
    pub(super) query: QueryId,
    pub(super) observer: &'a dyn ReductionObserver,
    max_depth: usize,
    depth: usize,
}

impl<'a> Reducer<'a> {
    pub fn new(
        query: QueryId,
        globals: &'a Bindings,
        fin: &'a dyn CompletionOracle,
        tickets: &'a dyn TicketSource,
    ) -> Self {
        Self {
            globals,
            fin,
            tickets,
            query,
            observer: &NOOP,
            max_depth: DEFAULT_MAX_DEPTH,
            depth: 0,
        }
    }

    pub fn with_observer(mut self, observer: &'a dyn ReductionObserver) -> Self {
        self.observer = observer;
        self
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub fn query(&self) -> QueryId {
        self.query
    }

    /// Reduce every element of `value` in `scope` and concatenate the results
    pub fn reduce(&mut self, value: &Compound, scope: &Scope) -> Result<Compound, ReduceError> {
        if self.depth >= self.max_depth {
            return Err(ReduceError::DepthExceeded {
                limit: self.max_depth,
            });
        }
        self.depth += 1;
        let result = self.reduce_elements(value, scope);
        self.depth -= 1;
        result
    }

    fn reduce_elements(&mut self, value: &Compound, scope: &Scope) -> Result<Compound, ReduceError> {
        let mut out = Compound::nil();
        for expr in value {
            out.append(self.reduce_expr(expr, scope)?);
        }
        Ok(out)
    }

    /// Reduce each binding value in `scope`, keeping the names
    pub(super) fn reduce_bindings(
        &mut self,
        bindings: &Bindings,
        scope: &Scope,
    ) -> Result<Bindings, ReduceError> {
        bindings
            .iter()
            .map(|(name, value)| Ok((name.clone(), self.reduce(value, scope)?)))
            .collect()
    }

    fn reduce_expr(&mut self, expr: &Expr, scope: &Scope) -> Result<Compound, ReduceError> {
        match expr {
            Expr::Str { .. } | Expr::Native(_) | Expr::Foreign(_) => Ok(Compound::single(expr.clone())),

            Expr::Var { name } => self.reduce_var(name, scope),

            Expr::Seq { items } => self.reduce(items, scope),

            Expr::Select(handle) => {
                match self.fin.lookup(ChannelRef::new(handle.channel, handle.ticket)) {
                    Some(value) => {
                        self.observer.ticket_substituted(self.query, handle, &value);
                        Ok(value)
                    }
                    None => Ok(Compound::single(expr.clone())),
                }
            }

            Expr::Cond(cond) => self.reduce_cond(cond, scope),

            Expr::App(apply) => self.reduce_apply(apply, scope),

            Expr::Curry(curry) => self.reduce_curry(curry, scope),
        }
    }

    fn reduce_var(&mut self, name: &str, scope: &Scope) -> Result<Compound, ReduceError> {
        if let Some(value) = scope.lookup(name) {
            return self.reduce(value, scope);
        }
        let globals = self.globals;
        match globals.get(name) {
            // Globals only see other globals
            Some(value) => self.reduce(value, &Scope::new()),
            None => Err(ReduceError::UnboundName {
                name: name.to_string(),
            }),
        }
    }

    fn reduce_cond(&mut self, cond: &Cond, scope: &Scope) -> Result<Compound, ReduceError> {
        let test = self.reduce(&cond.test, scope)?;
        if !test.is_resolved() {
            // Branches stay as written until the test is known
            return Ok(Compound::single(Cond {
                test,
                then: cond.then.clone(),
                otherwise: cond.otherwise.clone(),
            }));
        }
        let branch = if test.is_empty() {
            &cond.otherwise
        } else {
            &cond.then
        };
        self.reduce(branch, scope)
    }
}
