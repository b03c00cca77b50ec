//! Curry builder
//!
//! `curry(task: f, x: v)` makes a new native callable: `f`'s signature
//! without `x`, and `f`'s body with `x = v` merged in (the supplied binding
//! wins over a same-named body binding). Only native callables can be
//! curried.

use super::errors::ReduceError;
use super::eval::Reducer;
use super::types::{Cardinality, Compound, Curry, Expr, NativeLambda, Scope};

impl Reducer<'_> {
    pub(super) fn reduce_curry(&mut self, curry: &Curry, scope: &Scope) -> Result<Compound, ReduceError> {
        let task = self.reduce(&curry.task, scope)?;
        let bindings = self.reduce_bindings(&curry.bindings, scope)?;

        let pending = task.cardinality().is_pending()
            || bindings.values().any(|v| v.cardinality().is_pending());
        if pending {
            return Ok(Compound::single(Curry { task, bindings }));
        }

        match (task.cardinality(), task.as_slice()) {
            (Cardinality::Derived(1), [Expr::Native(lam)]) => {
                let names: Vec<&str> = bindings.keys().map(String::as_str).collect();
                let sign = lam.sign.without_params(&names);
                let mut body = (*lam.body).clone();
                body.extend(bindings.clone());
                Ok(Compound::single(NativeLambda::new(sign, body)))
            }
            (Cardinality::Derived(1), [found @ Expr::Foreign(_)]) => Err(ReduceError::UnsupportedCurry {
                found: found.to_string(),
            }),
            _ => Err(ReduceError::NotCallable {
                found: task.to_string(),
            }),
        }
    }
}
