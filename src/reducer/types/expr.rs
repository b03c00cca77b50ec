//! Expression nodes
//!
//! Every slot of the language holds a [`Compound`]: an ordered list of
//! expressions standing for zero, one or many simultaneous values. Nodes are
//! never mutated in place; each reduction step builds new ones.

use super::cardinality::Cardinality;
use super::signature::Signature;
use crate::types::TicketRef;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// Name → value bindings (lambda bodies, call arguments, global definitions)
pub type Bindings = BTreeMap<String, Compound>;

/* ===================== Expr ===================== */

/// Expression AST node
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "t")]
pub enum Expr {
    /// Ground string value
    Str { v: String },
    /// Variable occurrence
    Var { name: String },
    /// Nested compound, flattened away by reduction
    Seq { items: Compound },
    App(Apply),
    Cond(Cond),
    Native(NativeLambda),
    Foreign(ForeignLambda),
    /// Placeholder for one output channel of a requested foreign invocation
    Select(TicketHandle),
    Curry(Curry),
}

impl Expr {
    pub fn str(v: impl Into<String>) -> Self {
        Expr::Str { v: v.into() }
    }

    pub fn var(name: impl Into<String>) -> Self {
        Expr::Var { name: name.into() }
    }

    pub fn seq(items: impl Into<Compound>) -> Self {
        Expr::Seq {
            items: items.into(),
        }
    }

    pub fn is_literal(&self) -> bool {
        matches!(self, Expr::Str { .. })
    }

    pub fn is_callable(&self) -> bool {
        matches!(self, Expr::Native(_) | Expr::Foreign(_))
    }

    /// Literals and lambdas are values; everything else may still reduce.
    pub fn is_value(&self) -> bool {
        self.is_literal() || self.is_callable()
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Expr::Str { v } => Some(v),
            _ => None,
        }
    }

    /// True if a ticket handle occurs anywhere below this node
    pub fn has_pending_ticket(&self) -> bool {
        match self {
            Expr::Str { .. } | Expr::Var { .. } | Expr::Foreign(_) => false,
            Expr::Select(_) => true,
            Expr::Seq { items } => items.has_pending_ticket(),
            Expr::App(apply) => {
                apply.task.has_pending_ticket() || any_pending(&apply.bindings)
            }
            Expr::Cond(cond) => {
                cond.test.has_pending_ticket()
                    || cond.then.has_pending_ticket()
                    || cond.otherwise.has_pending_ticket()
            }
            Expr::Native(lam) => any_pending(&lam.body),
            Expr::Curry(curry) => {
                curry.task.has_pending_ticket() || any_pending(&curry.bindings)
            }
        }
    }

    /// Signature of a callable value
    pub fn signature(&self) -> Option<&Signature> {
        match self {
            Expr::Native(lam) => Some(&lam.sign),
            Expr::Foreign(lam) => Some(&lam.sign),
            _ => None,
        }
    }
}

impl From<Apply> for Expr {
    fn from(apply: Apply) -> Self {
        Expr::App(apply)
    }
}

impl From<Cond> for Expr {
    fn from(cond: Cond) -> Self {
        Expr::Cond(cond)
    }
}

impl From<NativeLambda> for Expr {
    fn from(lam: NativeLambda) -> Self {
        Expr::Native(lam)
    }
}

impl From<ForeignLambda> for Expr {
    fn from(lam: ForeignLambda) -> Self {
        Expr::Foreign(lam)
    }
}

impl From<TicketHandle> for Expr {
    fn from(handle: TicketHandle) -> Self {
        Expr::Select(handle)
    }
}

impl From<Curry> for Expr {
    fn from(curry: Curry) -> Self {
        Expr::Curry(curry)
    }
}

/* ===================== Compound ===================== */

/// Ordered multiplicity of values: the language's only aggregate.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Compound(Vec<Expr>);

impl Compound {
    pub fn new(items: Vec<Expr>) -> Self {
        Compound(items)
    }

    /// The empty compound
    pub fn nil() -> Self {
        Compound(Vec::new())
    }

    pub fn single(expr: impl Into<Expr>) -> Self {
        Compound(vec![expr.into()])
    }

    /// Compound of string literals
    pub fn strs<S: AsRef<str>>(values: &[S]) -> Self {
        values.iter().map(|s| Expr::str(s.as_ref())).collect()
    }

    pub fn var(name: impl Into<String>) -> Self {
        Compound::single(Expr::var(name))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Expr> {
        self.0.iter()
    }

    pub fn get(&self, idx: usize) -> Option<&Expr> {
        self.0.get(idx)
    }

    pub fn as_slice(&self) -> &[Expr] {
        &self.0
    }

    pub fn into_inner(self) -> Vec<Expr> {
        self.0
    }

    /// Append one expression, flattening nested compounds
    pub fn push(&mut self, expr: Expr) {
        match expr {
            Expr::Seq { items } => self.append(items),
            other => self.0.push(other),
        }
    }

    /// Append every expression of `other` in order
    pub fn append(&mut self, other: Compound) {
        for expr in other.0 {
            self.push(expr);
        }
    }

    /// Normal form: every element is a literal
    pub fn is_normal(&self) -> bool {
        self.0.iter().all(Expr::is_literal)
    }

    /// Every element is a value (literal or callable); nothing left to reduce
    pub fn is_resolved(&self) -> bool {
        self.0.iter().all(Expr::is_value)
    }

    /// True if some ticket handle, however deeply nested, is still unfilled
    pub fn has_pending_ticket(&self) -> bool {
        self.0.iter().any(Expr::has_pending_ticket)
    }

    /// Number of values, if it can already be told
    pub fn cardinality(&self) -> Cardinality {
        self.0.iter().fold(Cardinality::Derived(0), |acc, expr| {
            let own = match expr {
                Expr::Seq { items } => items.cardinality(),
                e if e.is_value() => Cardinality::Derived(1),
                _ => Cardinality::Pending,
            };
            acc.add(own)
        })
    }

    /// The literal strings, when the compound is normal
    pub fn literals(&self) -> Option<Vec<&str>> {
        self.0.iter().map(Expr::as_str).collect()
    }
}

impl From<Vec<Expr>> for Compound {
    fn from(items: Vec<Expr>) -> Self {
        let mut out = Compound::nil();
        for expr in items {
            out.push(expr);
        }
        out
    }
}

impl From<Expr> for Compound {
    fn from(expr: Expr) -> Self {
        Compound::from(vec![expr])
    }
}

impl FromIterator<Expr> for Compound {
    fn from_iter<I: IntoIterator<Item = Expr>>(iter: I) -> Self {
        let mut out = Compound::nil();
        for expr in iter {
            out.push(expr);
        }
        out
    }
}

impl IntoIterator for Compound {
    type Item = Expr;
    type IntoIter = std::vec::IntoIter<Expr>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'a> IntoIterator for &'a Compound {
    type Item = &'a Expr;
    type IntoIter = std::slice::Iter<'a, Expr>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/* ===================== Composite nodes ===================== */

fn default_channel() -> usize {
    1
}

/// Function application
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Apply {
    /// Callable expression(s), possibly still unresolved
    pub task: Compound,
    #[serde(default)]
    pub bindings: Bindings,
    /// 1-based output slot this application denotes
    #[serde(default = "default_channel")]
    pub channel: usize,
    #[serde(default)]
    pub rest: bool,
}

impl Apply {
    pub fn new(channel: usize, task: impl Into<Compound>) -> Self {
        Self {
            task: task.into(),
            bindings: Bindings::new(),
            channel,
            rest: false,
        }
    }

    pub fn bind(mut self, name: impl Into<String>, value: impl Into<Compound>) -> Self {
        self.bindings.insert(name.into(), value.into());
        self
    }

    pub fn with_rest(mut self, rest: bool) -> Self {
        self.rest = rest;
        self
    }

    /// Same application shape with another task slot and bindings
    pub fn rebuild(&self, task: Compound, bindings: Bindings) -> Self {
        Self {
            task,
            bindings,
            channel: self.channel,
            rest: self.rest,
        }
    }
}

/// Conditional; branches stay untouched until the test is normal
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cond {
    pub test: Compound,
    pub then: Compound,
    #[serde(rename = "else")]
    pub otherwise: Compound,
}

impl Cond {
    pub fn new(
        test: impl Into<Compound>,
        then: impl Into<Compound>,
        otherwise: impl Into<Compound>,
    ) -> Self {
        Self {
            test: test.into(),
            then: then.into(),
            otherwise: otherwise.into(),
        }
    }
}

/// User-defined callable; the body binds output names (and locals)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NativeLambda {
    pub sign: Arc<Signature>,
    pub body: Arc<Bindings>,
}

impl NativeLambda {
    pub fn new(sign: Signature, body: Bindings) -> Self {
        Self {
            sign: Arc::new(sign),
            body: Arc::new(body),
        }
    }

    /// Same signature, body with one binding replaced
    pub fn with_binding(&self, name: &str, value: Compound) -> Self {
        let mut body = (*self.body).clone();
        body.insert(name.to_string(), value);
        Self {
            sign: Arc::clone(&self.sign),
            body: Arc::new(body),
        }
    }
}

pub const LANG_BASH: &str = "bash";

/// Opaque external callable; its body is never interpreted here
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForeignLambda {
    pub sign: Arc<Signature>,
    pub lang: String,
    pub src: String,
}

impl ForeignLambda {
    pub fn new(sign: Signature, lang: impl Into<String>, src: impl Into<String>) -> Self {
        Self {
            sign: Arc::new(sign),
            lang: lang.into(),
            src: src.into(),
        }
    }

    pub fn bash(sign: Signature, src: impl Into<String>) -> Self {
        Self::new(sign, LANG_BASH, src)
    }
}

/// Result of one channel of a foreign invocation, not yet known
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TicketHandle {
    pub channel: usize,
    pub ticket: TicketRef,
}

impl TicketHandle {
    pub fn new(channel: usize, ticket: TicketRef) -> Self {
        Self { channel, ticket }
    }
}

/// Partial application producing a new native callable
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Curry {
    pub task: Compound,
    #[serde(default)]
    pub bindings: Bindings,
}

impl Curry {
    pub fn new(task: impl Into<Compound>) -> Self {
        Self {
            task: task.into(),
            bindings: Bindings::new(),
        }
    }

    pub fn bind(mut self, name: impl Into<String>, value: impl Into<Compound>) -> Self {
        self.bindings.insert(name.into(), value.into());
        self
    }
}

fn any_pending(bindings: &Bindings) -> bool {
    bindings.values().any(Compound::has_pending_ticket)
}

/* ===================== Display ===================== */

fn fmt_bindings(f: &mut fmt::Formatter<'_>, bindings: &Bindings) -> fmt::Result {
    for (name, value) in bindings {
        write!(f, ", {}: {}", name, value)?;
    }
    Ok(())
}

impl fmt::Display for Compound {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            return f.write_str("nil");
        }
        for (i, expr) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            write!(f, "{}", expr)?;
        }
        Ok(())
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Str { v } => write!(f, "'{}'", v),
            Expr::Var { name } => f.write_str(name),
            Expr::Seq { items } => write!(f, "( {} )", items),
            Expr::App(apply) => {
                write!(f, "apply( task: {}", apply.task)?;
                fmt_bindings(f, &apply.bindings)?;
                f.write_str(" )")?;
                if apply.channel != 1 {
                    write!(f, "#{}", apply.channel)?;
                }
                Ok(())
            }
            Expr::Cond(cond) => write!(
                f,
                "if {} then {} else {} end",
                cond.test, cond.then, cond.otherwise
            ),
            Expr::Native(lam) => {
                write!(f, "\\( {} ) {{", lam.sign)?;
                for (name, value) in lam.body.iter() {
                    write!(f, " {} = {};", name, value)?;
                }
                f.write_str(" }")
            }
            Expr::Foreign(lam) => write!(f, "\\( {} ) in {} *{{ {} }}*", lam.sign, lam.lang, lam.src),
            Expr::Select(handle) => {
                let id = handle.ticket.to_string();
                write!(f, "<{}#{}>", &id[..8], handle.channel)
            }
            Expr::Curry(curry) => {
                write!(f, "curry( task: {}", curry.task)?;
                fmt_bindings(f, &curry.bindings)?;
                f.write_str(" )")
            }
        }
    }
}
