use chrono::{Duration, Utc};
use futures::future::join_all;
use kanban_domain::{Reminder, ReminderStore, ReminderType};
use kanban_persistence::{
    DataSnapshot, JsonFileStore, MemoryStore, PersistenceMetadata, PersistenceStore, StoreSnapshot,
};
use std::collections::HashSet;
use std::sync::Arc;
use tempfile::tempdir;
use uuid::Uuid;

fn store_with_card() -> (MemoryStore, Uuid) {
    let store = MemoryStore::new();
    let board = store.create_board(Uuid::new_v4(), "Ops".to_string());
    let list = store.create_list(board.id, "On call".to_string()).unwrap();
    let card = store
        .create_card(
            list.id,
            "Rotate certificates".to_string(),
            Some(Utc::now() + Duration::hours(1)),
            None,
        )
        .unwrap();
    (store, card.id)
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_each_reminder_is_claimed_by_exactly_one_scanner() {
    let (store, card_id) = store_with_card();
    let now = Utc::now();
    let mut scheduled = HashSet::new();
    for i in 0..25 {
        let reminder = Reminder::new(
            card_id,
            Uuid::new_v4(),
            now - Duration::seconds(i),
            ReminderType::Custom,
        );
        scheduled.insert(reminder.id);
        store.schedule(reminder).await.unwrap();
    }

    let store = Arc::new(store);
    let scanners = (0..8).map(|_| {
        let store = store.clone();
        tokio::spawn(async move { store.claim_due(now, 4).await.unwrap() })
    });
    let mut claimed: Vec<Uuid> = Vec::new();
    for batch in join_all(scanners).await {
        claimed.extend(batch.unwrap().into_iter().map(|d| d.reminder.id));
    }
    while let Ok(batch) = store.claim_due(now, 4).await {
        if batch.is_empty() {
            break;
        }
        claimed.extend(batch.into_iter().map(|d| d.reminder.id));
    }

    let unique: HashSet<Uuid> = claimed.iter().copied().collect();
    assert_eq!(unique.len(), claimed.len(), "a reminder was claimed twice");
    assert_eq!(unique, scheduled);
}

#[tokio::test]
async fn test_future_reminders_are_not_claimed() {
    let (store, card_id) = store_with_card();
    let now = Utc::now();
    let later = Reminder::new(
        card_id,
        Uuid::new_v4(),
        now + Duration::minutes(5),
        ReminderType::HourBefore,
    );
    store.schedule(later.clone()).await.unwrap();

    assert!(store.claim_due(now, 10).await.unwrap().is_empty());
    let due = store
        .claim_due(now + Duration::minutes(5), 10)
        .await
        .unwrap();
    assert_eq!(due.len(), 1);
    assert_eq!(due[0].card_title, "Rotate certificates");
    assert!(store.reminder(later.id).unwrap().sent);
}

#[tokio::test]
async fn test_claims_survive_a_save_and_reload() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("kanban.json");
    let (store, card_id) = store_with_card();
    let reminder = Reminder::new(
        card_id,
        Uuid::new_v4(),
        Utc::now() - Duration::seconds(1),
        ReminderType::DayBefore,
    );
    store.schedule(reminder).await.unwrap();
    assert_eq!(store.claim_due(Utc::now(), 10).await.unwrap().len(), 1);

    let file = JsonFileStore::new(&path);
    file.save(StoreSnapshot {
        data: store.snapshot().to_json_bytes().unwrap(),
        metadata: PersistenceMetadata::new(file.instance_id()),
    })
    .await
    .unwrap();

    let (loaded, _) = JsonFileStore::new(&path).load().await.unwrap();
    let restored =
        MemoryStore::from_snapshot(DataSnapshot::from_json_bytes(&loaded.data).unwrap());
    assert!(restored.claim_due(Utc::now(), 10).await.unwrap().is_empty());
}
