use async_trait::async_trait;
use kanban_core::{KanbanResult, ReorderSettings};
use kanban_domain::{
    ActivityKind, ActivityLog, BulkReorderRequest, Container, ContainerKind, ContainerSnapshot,
    ItemId, List, MoveRequest, OrderKey, OrderingStore, Positions, ReorderEngine, Transfer,
    Version,
};
use kanban_persistence::MemoryStore;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use uuid::Uuid;

fn board_with_lists(store: &MemoryStore, count: usize) -> (Container, Vec<List>) {
    let board = store.create_board(Uuid::new_v4(), "Roadmap".to_string());
    let lists = (0..count)
        .map(|i| store.create_list(board.id, format!("List {}", i)).unwrap())
        .collect();
    (Container::Board(board.id), lists)
}

async fn set_keys(store: &MemoryStore, container: Container, keys: &[(ItemId, i64)]) {
    let version = store.get_siblings(container).await.unwrap().version;
    let positions = keys
        .iter()
        .map(|(id, units)| (*id, OrderKey::from_units(*units)))
        .collect();
    store
        .set_positions(container, version, positions)
        .await
        .unwrap();
}

#[tokio::test]
async fn test_move_last_list_to_front() {
    let store = Arc::new(MemoryStore::new());
    let (board, lists) = board_with_lists(&store, 3);
    let (a, b, c) = (lists[0].id, lists[1].id, lists[2].id);
    set_keys(&store, board, &[(a, 10), (b, 20), (c, 30)]).await;

    let engine = ReorderEngine::new(store.clone());
    let request = MoveRequest {
        item_id: c,
        container_id: None,
        target_index: 0,
    }
    .validate(ContainerKind::Lists)
    .unwrap();
    let outcome = engine.submit(request).await.unwrap();

    assert_eq!(outcome.destination.ids(), vec![c, a, b]);
    assert!(store.list(c).unwrap().order < OrderKey::from_units(10));
    assert_eq!(store.list(a).unwrap().order, OrderKey::from_units(10));
    assert_eq!(store.list(b).unwrap().order, OrderKey::from_units(20));
}

#[tokio::test]
async fn test_move_card_into_another_list() {
    let store = Arc::new(MemoryStore::new());
    let (_, lists) = board_with_lists(&store, 2);
    let (list1, list2) = (lists[0].id, lists[1].id);

    let x = store.create_card(list1, "X".into(), None, None).unwrap();
    let other = store.create_card(list1, "Y".into(), None, None).unwrap();
    set_keys(&store, Container::List(list1), &[(x.id, 100), (other.id, 200)]).await;
    let p = store.create_card(list2, "P".into(), None, None).unwrap();
    let q = store.create_card(list2, "Q".into(), None, None).unwrap();
    set_keys(&store, Container::List(list2), &[(p.id, 50), (q.id, 150)]).await;

    let engine = ReorderEngine::new(store.clone());
    let request = MoveRequest {
        item_id: x.id,
        container_id: Some(list2),
        target_index: 1,
    }
    .validate(ContainerKind::Cards)
    .unwrap();
    let outcome = engine.submit(request).await.unwrap();

    let moved = store.card(x.id).unwrap();
    assert_eq!(moved.list_id, list2);
    assert!(moved.order > OrderKey::from_units(50));
    assert!(moved.order < OrderKey::from_units(150));
    assert_eq!(outcome.destination.ids(), vec![p.id, x.id, q.id]);
    assert_eq!(outcome.source.unwrap().ids(), vec![other.id]);
    assert_eq!(
        store
            .cards_in_list(list1)
            .iter()
            .map(|c| c.id)
            .collect::<Vec<_>>(),
        vec![other.id]
    );
}

#[tokio::test]
async fn test_bulk_reorder_missing_id_leaves_keys_unchanged() {
    let store = Arc::new(MemoryStore::new());
    let (_, lists) = board_with_lists(&store, 1);
    let list = lists[0].id;
    let cards: Vec<ItemId> = (0..3)
        .map(|i| store.create_card(list, format!("C{}", i), None, None).unwrap().id)
        .collect();
    let before = store.get_siblings(Container::List(list)).await.unwrap();

    let engine = ReorderEngine::new(store.clone());
    let request = BulkReorderRequest {
        container_id: list,
        ordered_item_ids: vec![cards[2], cards[0]],
    }
    .validate(ContainerKind::Cards)
    .unwrap();
    let err = engine.bulk_reorder(&request).await.unwrap_err();

    assert!(err.is_validation());
    assert_eq!(store.get_siblings(Container::List(list)).await.unwrap(), before);
}

#[tokio::test]
async fn test_bulk_reorder_is_idempotent() {
    let store = Arc::new(MemoryStore::new());
    let (board, lists) = board_with_lists(&store, 3);
    let reversed: Vec<ItemId> = lists.iter().rev().map(|l| l.id).collect();
    let engine = ReorderEngine::new(store.clone());

    let request = BulkReorderRequest {
        container_id: board.id(),
        ordered_item_ids: reversed.clone(),
    }
    .validate(ContainerKind::Lists)
    .unwrap();
    let first = engine.bulk_reorder(&request).await.unwrap();
    let second = engine.bulk_reorder(&request).await.unwrap();

    assert_eq!(first.destination.ids(), reversed);
    assert_eq!(second.destination, first.destination);
    assert!(!second.renumbered);
}

#[tokio::test]
async fn test_repeated_midpoint_inserts_renumber_without_losing_order() {
    let store = Arc::new(MemoryStore::new());
    let (_, lists) = board_with_lists(&store, 1);
    let list = lists[0].id;
    let container = Container::List(list);
    let first = store.create_card(list, "first".into(), None, None).unwrap();
    let last = store.create_card(list, "last".into(), None, None).unwrap();
    set_keys(&store, container, &[(first.id, 10), (last.id, 20)]).await;

    let engine = ReorderEngine::new(store.clone());
    let mut expected = vec![first.id, last.id];
    let mut renumbered = false;
    for i in 0..40 {
        let card = store
            .create_card(list, format!("wedge {}", i), None, None)
            .unwrap();
        let outcome = engine.move_within(card.id, container, 1).await.unwrap();
        expected.insert(1, card.id);

        renumbered |= outcome.renumbered;
        assert_eq!(outcome.destination.ids(), expected);
        assert!(outcome.destination.is_strictly_ordered());
    }

    assert!(renumbered, "40 halvings of a 10-unit gap must exhaust precision");
    let stored = store.get_siblings(container).await.unwrap();
    assert_eq!(stored.ids(), expected);
    assert!(stored.is_strictly_ordered());
}

#[tokio::test]
async fn test_keys_stay_distinct_across_mixed_moves() {
    let store = Arc::new(MemoryStore::new());
    let (_, lists) = board_with_lists(&store, 3);
    let mut cards = Vec::new();
    for list in &lists {
        for i in 0..4 {
            cards.push(
                store
                    .create_card(list.id, format!("{} {}", list.title, i), None, None)
                    .unwrap()
                    .id,
            );
        }
    }

    let engine = ReorderEngine::new(store.clone());
    let mut seed: u64 = 7;
    for _ in 0..60 {
        seed = seed.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
        let card = cards[(seed >> 33) as usize % cards.len()];
        let list = lists[(seed >> 17) as usize % lists.len()].id;
        let index = (seed >> 7) as i64 % 6;

        let request = MoveRequest {
            item_id: card,
            container_id: Some(list),
            target_index: index,
        }
        .validate(ContainerKind::Cards)
        .unwrap();
        engine.submit(request).await.unwrap();
    }

    let mut total = 0;
    for list in &lists {
        let snapshot = store.get_siblings(Container::List(list.id)).await.unwrap();
        assert!(snapshot.is_strictly_ordered());
        total += snapshot.len();
    }
    assert_eq!(total, cards.len());
}

/// Lets another writer sneak in before the first `set_positions` call.
struct InterferingStore {
    inner: MemoryStore,
    interfered: AtomicBool,
    writes: AtomicUsize,
}

#[async_trait]
impl OrderingStore for InterferingStore {
    async fn get_siblings(&self, container: Container) -> KanbanResult<ContainerSnapshot> {
        self.inner.get_siblings(container).await
    }

    async fn set_positions(
        &self,
        container: Container,
        expected: Version,
        positions: Positions,
    ) -> KanbanResult<Version> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        if !self.interfered.swap(true, Ordering::SeqCst) {
            self.inner
                .set_positions(container, expected, Vec::new())
                .await?;
        }
        self.inner.set_positions(container, expected, positions).await
    }

    async fn transfer(&self, transfer: Transfer) -> KanbanResult<(Version, Version)> {
        self.inner.transfer(transfer).await
    }

    async fn locate(&self, kind: ContainerKind, item_id: ItemId) -> KanbanResult<Container> {
        self.inner.locate(kind, item_id).await
    }
}

#[tokio::test]
async fn test_concurrent_write_is_retried_from_fresh_state() {
    let inner = MemoryStore::new();
    let (board, lists) = board_with_lists(&inner, 3);
    let store = Arc::new(InterferingStore {
        inner,
        interfered: AtomicBool::new(false),
        writes: AtomicUsize::new(0),
    });

    let engine = ReorderEngine::new(store.clone());
    let outcome = engine.move_within(lists[0].id, board, 2).await.unwrap();

    assert_eq!(store.writes.load(Ordering::SeqCst), 2);
    assert_eq!(
        outcome.destination.ids(),
        vec![lists[1].id, lists[2].id, lists[0].id]
    );
    assert_eq!(
        store.inner.get_siblings(board).await.unwrap().ids(),
        outcome.destination.ids()
    );
}

/// Moves the card elsewhere just before the first cross-list transfer lands.
struct RivalMoveStore {
    inner: MemoryStore,
    rival_destination: Container,
    interfered: AtomicBool,
}

#[async_trait]
impl OrderingStore for RivalMoveStore {
    async fn get_siblings(&self, container: Container) -> KanbanResult<ContainerSnapshot> {
        self.inner.get_siblings(container).await
    }

    async fn set_positions(
        &self,
        container: Container,
        expected: Version,
        positions: Positions,
    ) -> KanbanResult<Version> {
        self.inner.set_positions(container, expected, positions).await
    }

    async fn transfer(&self, transfer: Transfer) -> KanbanResult<(Version, Version)> {
        if !self.interfered.swap(true, Ordering::SeqCst) {
            let source = self.inner.get_siblings(transfer.from).await?;
            let target = self.inner.get_siblings(self.rival_destination).await?;
            self.inner
                .transfer(Transfer {
                    item_id: transfer.item_id,
                    from: transfer.from,
                    from_version: source.version,
                    to: self.rival_destination,
                    to_version: target.version,
                    positions: vec![(transfer.item_id, OrderKey::spaced(target.len()))],
                })
                .await?;
        }
        self.inner.transfer(transfer).await
    }

    async fn locate(&self, kind: ContainerKind, item_id: ItemId) -> KanbanResult<Container> {
        self.inner.locate(kind, item_id).await
    }
}

fn rival_setup() -> (Arc<RivalMoveStore>, ItemId, Uuid, Uuid, Uuid) {
    let inner = MemoryStore::new();
    let (_, lists) = board_with_lists(&inner, 3);
    let (l1, l2, l3) = (lists[0].id, lists[1].id, lists[2].id);
    let card = inner.create_card(l1, "X".into(), None, None).unwrap();
    let store = Arc::new(RivalMoveStore {
        inner,
        rival_destination: Container::List(l3),
        interfered: AtomicBool::new(false),
    });
    (store, card.id, l1, l2, l3)
}

#[tokio::test]
async fn test_submit_follows_card_moved_by_another_writer() {
    let (store, card, _, l2, l3) = rival_setup();

    let engine = ReorderEngine::new(store.clone());
    let request = MoveRequest {
        item_id: card,
        container_id: Some(l2),
        target_index: 0,
    }
    .validate(ContainerKind::Cards)
    .unwrap();
    let outcome = engine.submit(request).await.unwrap();

    assert_eq!(store.inner.card(card).unwrap().list_id, l2);
    assert_eq!(outcome.destination.ids(), vec![card]);
    assert_eq!(outcome.source.unwrap().container, Container::List(l3));
    assert!(store
        .inner
        .get_siblings(Container::List(l3))
        .await
        .unwrap()
        .items
        .is_empty());
}

#[tokio::test]
async fn test_move_across_from_stale_source_reports_conflict() {
    let (store, card, l1, l2, l3) = rival_setup();

    let engine = ReorderEngine::new(store.clone());
    let err = engine
        .move_across(card, Container::List(l1), Container::List(l2), 0)
        .await
        .unwrap_err();

    assert!(err.is_conflict());
    assert!(!err.is_validation());
    assert_eq!(store.inner.card(card).unwrap().list_id, l3);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_parallel_moves_converge_to_a_total_order() {
    let store = Arc::new(MemoryStore::new());
    let (board, lists) = board_with_lists(&store, 8);
    let engine = Arc::new(
        ReorderEngine::new(store.clone()).with_settings(&ReorderSettings { max_attempts: 100 }),
    );

    let handles: Vec<_> = lists
        .iter()
        .enumerate()
        .map(|(i, list)| {
            let engine = engine.clone();
            let id = list.id;
            tokio::spawn(async move { engine.move_within(id, board, (i * 3) % 8).await })
        })
        .collect();
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    let snapshot = store.get_siblings(board).await.unwrap();
    assert!(snapshot.is_strictly_ordered());
    assert_eq!(snapshot.len(), lists.len());
}

#[tokio::test]
async fn test_successful_moves_are_recorded() {
    let store = Arc::new(MemoryStore::new());
    let (board, lists) = board_with_lists(&store, 2);
    let log: Arc<dyn ActivityLog> = store.clone();
    let engine = ReorderEngine::new(store.clone()).with_activity_log(log);

    engine.move_within(lists[1].id, board, 0).await.unwrap();
    // Already in place: nothing written, nothing recorded.
    engine.move_within(lists[1].id, board, 0).await.unwrap();

    let activity = store.activity();
    assert_eq!(activity.len(), 1);
    assert_eq!(activity[0].kind, ActivityKind::ListMoved);
    assert_eq!(activity[0].item_id, Some(lists[1].id));
}

#[tokio::test]
async fn test_lists_cannot_leave_their_board() {
    let store = Arc::new(MemoryStore::new());
    let (_, lists) = board_with_lists(&store, 1);
    let (other_board, _) = board_with_lists(&store, 1);

    let engine = ReorderEngine::new(store.clone());
    let request = MoveRequest {
        item_id: lists[0].id,
        container_id: Some(other_board.id()),
        target_index: 0,
    }
    .validate(ContainerKind::Lists)
    .unwrap();

    assert!(engine.submit(request).await.unwrap_err().is_validation());
    assert_eq!(
        store.list(lists[0].id).unwrap().board_id,
        lists[0].board_id
    );
}
