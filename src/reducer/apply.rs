//! Application resolver
//!
//! An `Apply` is reduced in three stages:
//!
//! 1. task slot and bindings are reduced one step in the caller scope
//! 2. the reduced task decides the regime: a single callable, several
//!    candidates, or a callable that is not known yet
//! 3. each ground combination of arguments is invoked (see `enumerate.rs`
//!    for how combinations are formed)
//!
//! Foreign callables turn into ticket handles, native callables are
//! beta-reduced in a fresh scope made of their own body and the call's
//! bindings. A native body that cannot reach normal form is captured in a
//! residual lambda so the next pass resumes where this one stopped.
//!
//! A task slot holding a value that is known not to be callable (a string)
//! fails with `NotCallable`; one that is merely not known yet stays residual.

use super::errors::ReduceError;
use super::eval::Reducer;
use super::types::{Apply, Compound, Expr, ForeignLambda, NativeLambda, Scope, TicketHandle};
use crate::tickets::GroundApply;
use std::sync::Arc;

impl Reducer<'_> {
    pub(super) fn reduce_apply(&mut self, apply: &Apply, scope: &Scope) -> Result<Compound, ReduceError> {
        if apply.task.is_empty() {
            return Err(missing_callable(apply));
        }

        let task = self.reduce(&apply.task, scope)?;
        let bindings = self.reduce_bindings(&apply.bindings, scope)?;
        let stepped = apply.rebuild(task, bindings);

        match stepped.task.as_slice() {
            [] => Err(missing_callable(&stepped)),
            [single] if single.is_callable() => self.enumerate(&stepped),
            [Expr::Str { .. }] => Err(ReduceError::NotCallable {
                found: stepped.task.to_string(),
            }),
            // Callable not known yet
            [_] => Ok(Compound::single(stepped)),
            _ => self.resolve_candidates(stepped),
        }
    }

    /// Several values in the task slot
    fn resolve_candidates(&mut self, stepped: Apply) -> Result<Compound, ReduceError> {
        if stepped.task.cardinality().is_pending() {
            return Ok(Compound::single(stepped));
        }
        if let Some(found) = stepped.task.iter().find(|e| !e.is_callable()) {
            return Err(ReduceError::NotCallable {
                found: found.to_string(),
            });
        }

        let task_correlated = stepped
            .task
            .iter()
            .find_map(Expr::signature)
            .is_some_and(|sign| sign.is_task_correlated());
        if task_correlated {
            return self.enumerate(&stepped);
        }

        let mut out = Compound::nil();
        for candidate in stepped.task.iter() {
            let singular = stepped.rebuild(Compound::single(candidate.clone()), stepped.bindings.clone());
            out.append(self.enumerate(&singular)?);
        }
        Ok(out)
    }

    /// Invoke one callable with one ground combination of arguments
    pub(super) fn invoke(&mut self, singular: &Apply) -> Result<Compound, ReduceError> {
        match singular.task.as_slice() {
            [Expr::Foreign(lam)] => self.invoke_foreign(lam, singular),
            [Expr::Native(lam)] => self.invoke_native(lam, singular),
            _ => Err(ReduceError::NotCallable {
                found: singular.task.to_string(),
            }),
        }
    }

    fn invoke_foreign(&mut self, lam: &ForeignLambda, singular: &Apply) -> Result<Compound, ReduceError> {
        if let Some(name) = lam
            .sign
            .param_names()
            .into_iter()
            .find(|name| !singular.bindings.contains_key(*name))
        {
            return Err(ReduceError::UnboundName {
                name: name.to_string(),
            });
        }

        // External code only ever sees ground arguments
        if !singular.bindings.values().all(Compound::is_normal) {
            return Ok(Compound::single(singular.clone()));
        }

        let ticket = self.tickets.request_ticket(
            self.query,
            GroundApply {
                lambda: lam.clone(),
                bindings: singular.bindings.clone(),
                channel: singular.channel,
            },
        );
        let handle = TicketHandle::new(singular.channel, ticket);
        self.observer.ticket_requested(self.query, singular, &handle);
        Ok(Compound::single(handle))
    }

    fn invoke_native(&mut self, lam: &NativeLambda, singular: &Apply) -> Result<Compound, ReduceError> {
        let slot = lam
            .sign
            .output_slot(singular.channel)
            .ok_or(ReduceError::ChannelOutOfRange {
                channel: singular.channel,
                outputs: lam.sign.num_outputs(),
            })?;

        // Fresh scope: the callable's body plus the call's bindings, nothing from the caller
        let scope = Scope::new()
            .push(Arc::clone(&lam.body))
            .push(Arc::new(singular.bindings.clone()));
        let body = scope.lookup(&slot.name).ok_or_else(|| ReduceError::UnboundName {
            name: slot.name.clone(),
        })?;

        let result = self.reduce(body, &scope)?;
        if result.is_resolved() {
            return Ok(result);
        }

        let residual = singular.rebuild(
            Compound::single(lam.with_binding(&slot.name, result)),
            singular.bindings.clone(),
        );
        self.observer.residual_left(self.query, &residual);
        Ok(Compound::single(residual))
    }
}

fn missing_callable(apply: &Apply) -> ReduceError {
    ReduceError::MissingCallable {
        apply: Expr::App(apply.clone()).to_string(),
    }
}
