//! Cardinality of a compound value
//!
//! Whether a value's element count can be told yet is ordinary control flow,
//! not a failure: a pending cardinality turns the enclosing application into
//! a residual that the next pass retries.

/// Result of a cardinality query
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cardinality {
    /// The value holds exactly this many values
    Derived(usize),
    /// The value still contains unresolved nodes
    Pending,
}

impl Cardinality {
    pub fn add(self, other: Cardinality) -> Cardinality {
        match (self, other) {
            (Cardinality::Derived(a), Cardinality::Derived(b)) => Cardinality::Derived(a + b),
            _ => Cardinality::Pending,
        }
    }

    pub fn is_pending(self) -> bool {
        matches!(self, Cardinality::Pending)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pending_absorbs() {
        assert_eq!(Cardinality::Derived(2).add(Cardinality::Pending), Cardinality::Pending);
        assert_eq!(Cardinality::Pending.add(Cardinality::Derived(0)), Cardinality::Pending);
        assert!(Cardinality::Pending.is_pending());
    }

    #[test]
    fn test_derived_sums() {
        assert_eq!(Cardinality::Derived(2).add(Cardinality::Derived(3)), Cardinality::Derived(5));
        assert!(!Cardinality::Derived(0).is_pending());
    }
}
