//! Lexical scope
//!
//! A stack of binding frames, innermost last. Frames are shared behind `Arc`
//! so pushing a call frame never copies a lambda body. The process-wide
//! global bindings live outside the stack and are consulted last by the
//! evaluator.

use super::expr::{Bindings, Compound};
use std::sync::Arc;

#[derive(Debug, Clone, Default)]
pub struct Scope {
    frames: Vec<Arc<Bindings>>,
}

impl Scope {
    /// Empty scope: only globals are visible
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_bindings(bindings: Bindings) -> Self {
        Self {
            frames: vec![Arc::new(bindings)],
        }
    }

    /// New scope with `frame` as the innermost frame
    pub fn push(&self, frame: Arc<Bindings>) -> Scope {
        let mut frames = self.frames.clone();
        frames.push(frame);
        Scope { frames }
    }

    /// Walk frames innermost to outermost
    pub fn lookup(&self, name: &str) -> Option<&Compound> {
        self.frames.iter().rev().find_map(|frame| frame.get(name))
    }

    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }
}
