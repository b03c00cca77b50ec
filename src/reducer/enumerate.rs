//! Argument enumeration
//!
//! A callable consumes one value per simple parameter. When a binding holds
//! several values the application is expanded into singular invocations:
//!
//! - every simple parameter is an independent dimension (cross product)
//! - every correlated group is one dimension whose members advance in
//!   lock-step; the task slot itself may be a member
//! - aggregate parameters and undeclared bindings are passed whole
//!
//! Combinations are visited in row-major order over the declared
//! parameters: the first dimension varies slowest. If any binding's
//! cardinality is still pending the application is left as it is.

use super::errors::ReduceError;
use super::eval::Reducer;
use super::types::{Apply, Cardinality, Compound, Expr, ParamSlot, Signature, TASK_PARAM};
use std::collections::HashSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Member<'s> {
    Task,
    Param(&'s str),
}

/// One axis of the expansion
#[derive(Debug)]
struct Dimension<'s> {
    members: Vec<Member<'s>>,
    len: usize,
}

impl Reducer<'_> {
    /// Expand `apply` into singular invocations and concatenate their results
    pub(super) fn enumerate(&mut self, apply: &Apply) -> Result<Compound, ReduceError> {
        let sign = apply
            .task
            .iter()
            .find_map(Expr::signature)
            .ok_or_else(|| ReduceError::NotCallable {
                found: apply.task.to_string(),
            })?;

        for candidate in apply.task.iter().filter_map(Expr::signature) {
            check_channel(candidate, apply.channel)?;
        }

        let dims = match dimensions(sign, apply)? {
            Some(dims) => dims,
            None => {
                self.observer.enumeration_deferred(self.query, apply);
                return Ok(Compound::single(apply.clone()));
            }
        };

        let task_enumerated = dims
            .iter()
            .any(|d| d.members.contains(&Member::Task));
        if !task_enumerated && apply.task.len() != 1 {
            return Err(ReduceError::NotCallable {
                found: apply.task.to_string(),
            });
        }

        let total: usize = dims.iter().map(|d| d.len).product();
        let mut out = Compound::nil();
        for index in 0..total {
            let singular = combination(apply, &dims, index);
            out.append(self.invoke(&singular)?);
        }
        Ok(out)
    }
}

fn check_channel(sign: &Signature, channel: usize) -> Result<(), ReduceError> {
    if channel == 0 || channel > sign.num_outputs() {
        return Err(ReduceError::ChannelOutOfRange {
            channel,
            outputs: sign.num_outputs(),
        });
    }
    Ok(())
}

/// Enumeration axes of `apply`, or `None` while some cardinality is pending
fn dimensions<'s>(sign: &'s Signature, apply: &'s Apply) -> Result<Option<Vec<Dimension<'s>>>, ReduceError> {
    let mut dims = Vec::new();

    for slot in &sign.params {
        match slot {
            ParamSlot::Simple { name } if name == TASK_PARAM => {}
            ParamSlot::Simple { name } => {
                let Some(value) = apply.bindings.get(name) else {
                    continue;
                };
                match value.cardinality() {
                    Cardinality::Pending => return Ok(None),
                    Cardinality::Derived(len) => dims.push(Dimension {
                        members: vec![Member::Param(name)],
                        len,
                    }),
                }
            }
            ParamSlot::Aggregate { name } => {
                if apply
                    .bindings
                    .get(name)
                    .is_some_and(|value| value.cardinality().is_pending())
                {
                    return Ok(None);
                }
            }
            ParamSlot::Correlated { names } => {
                let mut members = Vec::new();
                let mut bound = Vec::new();
                let mut cardinalities = Vec::new();
                for name in names {
                    let (member, value) = if name == TASK_PARAM {
                        (Member::Task, Some(&apply.task))
                    } else {
                        (Member::Param(name), apply.bindings.get(name))
                    };
                    let Some(value) = value else {
                        continue;
                    };
                    match value.cardinality() {
                        Cardinality::Pending => return Ok(None),
                        Cardinality::Derived(len) => {
                            members.push(member);
                            bound.push(name.clone());
                            cardinalities.push(len);
                        }
                    }
                }
                let Some(&len) = cardinalities.first() else {
                    continue;
                };
                if cardinalities.iter().any(|&n| n != len) {
                    return Err(ReduceError::Consistency {
                        names: bound,
                        cardinalities,
                    });
                }
                dims.push(Dimension { members, len });
            }
        }
    }

    // Undeclared bindings travel whole but must be settled all the same
    let declared: HashSet<&str> = sign.params.iter().flat_map(ParamSlot::names).collect();
    let unsettled = apply
        .bindings
        .iter()
        .any(|(name, value)| !declared.contains(name.as_str()) && value.cardinality().is_pending());
    if unsettled {
        return Ok(None);
    }

    Ok(Some(dims))
}

/// The `index`-th singular application, first dimension slowest
fn combination(apply: &Apply, dims: &[Dimension<'_>], index: usize) -> Apply {
    let mut picks = vec![0; dims.len()];
    let mut rem = index;
    for (i, dim) in dims.iter().enumerate().rev() {
        picks[i] = rem % dim.len;
        rem /= dim.len;
    }

    let mut task = apply.task.clone();
    let mut bindings = apply.bindings.clone();
    for (dim, &pick) in dims.iter().zip(&picks) {
        for member in &dim.members {
            match member {
                Member::Task => task = nth(&apply.task, pick),
                Member::Param(name) => {
                    if let Some(value) = apply.bindings.get(*name) {
                        bindings.insert(name.to_string(), nth(value, pick));
                    }
                }
            }
        }
    }
    apply.rebuild(task, bindings)
}

fn nth(value: &Compound, idx: usize) -> Compound {
    value
        .get(idx)
        .cloned()
        .map(Compound::single)
        .unwrap_or_default()
}
