use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Opaque identifier of one query (one set of top-level targets).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct QueryId(pub Uuid);

impl QueryId {
    pub fn new() -> Self {
        QueryId(Uuid::new_v4())
    }
}

impl Default for QueryId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for QueryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Opaque handle of one requested foreign invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TicketRef(pub Uuid);

impl TicketRef {
    pub fn new() -> Self {
        TicketRef(Uuid::new_v4())
    }

    /// Deterministic ticket, used by tests and sequential factories.
    pub fn from_u128(n: u128) -> Self {
        TicketRef(Uuid::from_u128(n))
    }
}

impl Default for TicketRef {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for TicketRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Key of the completion oracle: one output channel of one ticket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChannelRef {
    pub channel: usize,
    pub ticket: TicketRef,
}

impl ChannelRef {
    pub fn new(channel: usize, ticket: TicketRef) -> Self {
        Self { channel, ticket }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum QueryStatus {
    Pending,
    Waiting,
    Completed,
    Failed,
}

impl fmt::Display for QueryStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            QueryStatus::Pending => "pending",
            QueryStatus::Waiting => "waiting",
            QueryStatus::Completed => "completed",
            QueryStatus::Failed => "failed",
        };
        f.write_str(s)
    }
}
