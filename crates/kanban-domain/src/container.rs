use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::board::BoardId;
use crate::list::ListId;
use crate::order_key::OrderKey;

/// Id of an ordered item: a list when the container is a board, a card when
/// the container is a list.
pub type ItemId = Uuid;

/// Optimistic-concurrency stamp of a container's order-key space.
/// Bumped by every successful position write.
pub type Version = u64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContainerKind {
    /// Lists ordered within a board.
    Lists,
    /// Cards ordered within a list.
    Cards,
}

/// The parent scope of an ordered collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum Container {
    Board(BoardId),
    List(ListId),
}

impl Container {
    pub fn for_kind(kind: ContainerKind, id: Uuid) -> Self {
        match kind {
            ContainerKind::Lists => Container::Board(id),
            ContainerKind::Cards => Container::List(id),
        }
    }

    pub fn id(self) -> Uuid {
        match self {
            Container::Board(id) | Container::List(id) => id,
        }
    }

    pub fn kind(self) -> ContainerKind {
        match self {
            Container::Board(_) => ContainerKind::Lists,
            Container::List(_) => ContainerKind::Cards,
        }
    }
}

impl fmt::Display for Container {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Container::Board(id) => write!(f, "board {}", id),
            Container::List(id) => write!(f, "list {}", id),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sibling {
    pub id: ItemId,
    pub order: OrderKey,
}

/// Members of a container sorted by ascending order key, as of `version`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContainerSnapshot {
    pub container: Container,
    pub version: Version,
    pub items: Vec<Sibling>,
}

impl ContainerSnapshot {
    pub fn new(container: Container, version: Version, mut items: Vec<Sibling>) -> Self {
        items.sort_by_key(|s| (s.order, s.id));
        Self {
            container,
            version,
            items,
        }
    }

    pub fn ids(&self) -> Vec<ItemId> {
        self.items.iter().map(|s| s.id).collect()
    }

    pub fn position_of(&self, id: ItemId) -> Option<usize> {
        self.items.iter().position(|s| s.id == id)
    }

    pub fn contains(&self, id: ItemId) -> bool {
        self.position_of(id).is_some()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Keys are pairwise distinct and strictly ascending.
    pub fn is_strictly_ordered(&self) -> bool {
        self.items.windows(2).all(|w| w[0].order < w[1].order)
    }
}
