//! Temporal knowledge graph data model.
//!
//! A graph is a multiset of time-stamped facts `(head, relation, tail, t)`.
//!
//! - [`Triple`]: the untimed `(head, relation, tail)` shape shared by facts and patterns
//! - [`connectivity`]: overlap and bridging tests between entity sets and triples
//! - [`store`]: the append-only, indexed [`FactStore`](store::FactStore)

pub mod connectivity;
pub mod store;

use serde::{Deserialize, Serialize};

use crate::symbol::{EntityId, RelationId};

/// A `(head, relation, tail)` triple. Immutable value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Triple {
    pub head: EntityId,
    pub relation: RelationId,
    pub tail: EntityId,
}

impl Triple {
    pub fn new(head: EntityId, relation: RelationId, tail: EntityId) -> Self {
        Self {
            head,
            relation,
            tail,
        }
    }

    /// Build a triple from raw ids.
    pub fn from_raw(head: u32, relation: u32, tail: u32) -> Self {
        Self::new(EntityId(head), RelationId(relation), EntityId(tail))
    }

    /// The two endpoint entities, head first.
    pub fn endpoints(&self) -> [EntityId; 2] {
        [self.head, self.tail]
    }

    /// Whether `entity` is the head or the tail of this triple.
    pub fn touches(&self, entity: EntityId) -> bool {
        self.head == entity || self.tail == entity
    }
}

impl std::fmt::Display for Triple {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({},{},{})", self.head, self.relation, self.tail)
    }
}
