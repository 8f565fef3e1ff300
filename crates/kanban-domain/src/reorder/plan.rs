//! Pure key computation for moves. Nothing here touches a store.

use crate::container::{ItemId, Sibling};
use crate::order_key::{OrderKey, PrecisionExhausted};
use crate::store::Positions;

/// Result of placing one item among `others`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Placement {
    /// Index the item lands at after clamping.
    pub index: usize,
    pub key: OrderKey,
    /// Keys to write. Only the moved item unless the container was renumbered.
    pub positions: Positions,
    /// The full container after the move, ascending.
    pub sequence: Vec<Sibling>,
    pub renumbered: bool,
}

/// Key for an item inserted at `index` of `siblings` (already sorted and
/// without the item itself).
pub fn key_at(siblings: &[Sibling], index: usize) -> Result<OrderKey, PrecisionExhausted> {
    match (index.checked_sub(1).and_then(|i| siblings.get(i)), siblings.get(index)) {
        (None, None) => Ok(OrderKey::spaced(0)),
        (None, Some(first)) => OrderKey::before(first.order),
        (Some(last), None) => OrderKey::after(last.order),
        (Some(lower), Some(upper)) => OrderKey::between(lower.order, upper.order),
    }
}

/// Evenly spaced keys for `ids` in the given order.
pub fn spaced(ids: &[ItemId]) -> Vec<Sibling> {
    ids.iter()
        .enumerate()
        .map(|(i, id)| Sibling {
            id: *id,
            order: OrderKey::spaced(i),
        })
        .collect()
}

/// Place `item_id` at `target_index` (clamped to `[0, others.len()]`).
///
/// Takes the midpoint of the new neighbours. When no key fits between them
/// the remaining siblings are renumbered first; their relative order is kept.
pub fn place(others: &[Sibling], item_id: ItemId, target_index: usize) -> Placement {
    let index = target_index.min(others.len());

    let (siblings, renumbered) = match key_at(others, index) {
        Ok(key) => {
            let sequence = insert(others, index, item_id, key);
            return Placement {
                index,
                key,
                positions: vec![(item_id, key)],
                sequence,
                renumbered: false,
            };
        }
        Err(exhausted) => {
            tracing::debug!(
                lower = %exhausted.lower,
                upper = %exhausted.upper,
                count = others.len(),
                "Order key precision exhausted, renumbering container"
            );
            let ids: Vec<ItemId> = others.iter().map(|s| s.id).collect();
            (spaced(&ids), true)
        }
    };

    let sequence = match key_at(&siblings, index) {
        Ok(key) => insert(&siblings, index, item_id, key),
        Err(_) => {
            let mut ids: Vec<ItemId> = siblings.iter().map(|s| s.id).collect();
            ids.insert(index, item_id);
            spaced(&ids)
        }
    };
    let key = sequence[index].order;
    let positions = sequence.iter().map(|s| (s.id, s.order)).collect();

    Placement {
        index,
        key,
        positions,
        sequence,
        renumbered,
    }
}

fn insert(siblings: &[Sibling], index: usize, id: ItemId, order: OrderKey) -> Vec<Sibling> {
    let mut sequence = siblings.to_vec();
    sequence.insert(index, Sibling { id, order });
    sequence
}
