//! Append-only completion store
//!
//! Workers insert every output channel of a finished ticket in one call.
//! Entries are never changed or removed, and readers work on a
//! [`FinSnapshot`] taken at the start of a pass, so a value can never move
//! under a running reduction.

use super::CompletionOracle;
use crate::reducer::types::Compound;
use crate::types::{ChannelRef, TicketRef};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum FinError {
    #[error("ticket {0} is already resolved")]
    AlreadyResolved(TicketRef),

    #[error("completion store lock poisoned")]
    Poisoned,
}

type Entries = HashMap<TicketRef, Arc<Vec<Compound>>>;

#[derive(Debug, Default)]
pub struct FinStore {
    entries: RwLock<Arc<Entries>>,
}

impl FinStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the outputs of `ticket`, channel 1 first
    pub fn insert(&self, ticket: TicketRef, outputs: Vec<Compound>) -> Result<(), FinError> {
        let mut guard = self.entries.write().map_err(|_| FinError::Poisoned)?;
        if guard.contains_key(&ticket) {
            return Err(FinError::AlreadyResolved(ticket));
        }
        // Copy-on-write: snapshots already handed out keep the old map
        Arc::make_mut(&mut guard).insert(ticket, Arc::new(outputs));
        Ok(())
    }

    pub fn contains(&self, ticket: TicketRef) -> bool {
        self.snapshot().tickets.contains_key(&ticket)
    }

    pub fn len(&self) -> usize {
        self.snapshot().tickets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Consistent view for one reduction pass
    pub fn snapshot(&self) -> FinSnapshot {
        match self.entries.read() {
            Ok(guard) => FinSnapshot {
                tickets: Arc::clone(&guard),
            },
            // A writer panicked mid-insert; the map itself is still intact
            Err(poisoned) => FinSnapshot {
                tickets: Arc::clone(&poisoned.into_inner()),
            },
        }
    }
}

/// Immutable view of the completion store
#[derive(Debug, Clone, Default)]
pub struct FinSnapshot {
    tickets: Arc<Entries>,
}

impl FinSnapshot {
    pub fn len(&self) -> usize {
        self.tickets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tickets.is_empty()
    }
}

impl CompletionOracle for FinSnapshot {
    fn lookup(&self, at: ChannelRef) -> Option<Compound> {
        let outputs = self.tickets.get(&at.ticket)?;
        at.channel
            .checked_sub(1)
            .and_then(|idx| outputs.get(idx))
            .cloned()
    }
}
