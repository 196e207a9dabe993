//! Ownership model: an aggregate root and the child records it composes.

use std::collections::HashSet;
use std::fmt::{Debug, Display};
use std::hash::Hash;

/// A record that exists only inside its parent aggregate.
///
/// Children are replaced as a set whenever the parent is rewritten, so their
/// identifiers are stable only between two writes of the parent.
pub trait OwnedEntity {
    type Id: Copy + Eq + Hash + Debug;

    fn id(&self) -> Self::Id;
}

/// The unit of consistency: validated, stored and deleted as a whole.
pub trait AggregateRoot {
    type Id: Copy + Eq + Hash + Debug + Display;

    fn id(&self) -> Self::Id;

    /// Owned records across every child collection.
    fn child_count(&self) -> usize;
}

/// `true` when no two children share an identifier.
pub fn has_distinct_ids<E: OwnedEntity>(children: &[E]) -> bool {
    let mut seen = HashSet::with_capacity(children.len());
    children.iter().all(|c| seen.insert(c.id()))
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Line(u8);

    impl OwnedEntity for Line {
        type Id = u8;

        fn id(&self) -> u8 {
            self.0
        }
    }

    #[test]
    fn distinct_ids() {
        assert!(has_distinct_ids::<Line>(&[]));
        assert!(has_distinct_ids(&[Line(1), Line(2)]));
        assert!(!has_distinct_ids(&[Line(1), Line(2), Line(1)]));
    }
}
