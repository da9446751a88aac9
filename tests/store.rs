mod common;

use std::sync::Arc;

use common::{seat, session, USER_ID, VENUE_ID};
use quicket::config::{StorageBackend, StorageConfig};
use quicket::error::AuthError;
use quicket::models::UserRole;
use quicket::store::{self, FileStore, KeyValueStore, MemoryStore, ReservationStore, SessionStore};

#[tokio::test]
async fn file_store_survives_reopening() {
    let dir = tempfile::tempdir().unwrap();
    {
        let store = FileStore::open(dir.path()).await.unwrap();
        let reservations = ReservationStore::new(Arc::new(store));
        reservations
            .save_draft(USER_ID, 1, &[seat("2-1"), seat("2-2")])
            .await
            .unwrap();
    }

    let reopened = ReservationStore::new(Arc::new(FileStore::open(dir.path()).await.unwrap()));
    assert_eq!(
        reopened.load_draft(USER_ID, 1).await.unwrap(),
        vec![seat("2-1"), seat("2-2")]
    );
}

#[tokio::test]
async fn file_store_keys_map_to_files() {
    let dir = tempfile::tempdir().unwrap();
    let store = FileStore::open(dir.path().join("nested")).await.unwrap();

    store.set("draft:1:2", "{}".to_string()).await.unwrap();
    assert_eq!(store.get("draft:1:2").await.unwrap().as_deref(), Some("{}"));
    assert!(store.root().join("draft_1_2.json").exists());

    store.remove("draft:1:2").await.unwrap();
    store.remove("draft:1:2").await.unwrap();
    assert!(store.get("draft:1:2").await.unwrap().is_none());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_writes_to_one_key_all_succeed() {
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(FileStore::open(dir.path()).await.unwrap());

    let writers: Vec<_> = (0..16)
        .map(|i| {
            let store = store.clone();
            tokio::spawn(async move { store.set("venue:5", format!("{{\"n\":{i}}}")).await })
        })
        .collect();
    for writer in writers {
        writer.await.unwrap().unwrap();
    }

    let value = store.get("venue:5").await.unwrap().unwrap();
    assert!(value.starts_with("{\"n\":"));
    let leftovers = std::fs::read_dir(dir.path())
        .unwrap()
        .filter(|entry| entry.as_ref().unwrap().file_name().to_string_lossy().ends_with(".tmp"))
        .count();
    assert_eq!(leftovers, 0);
}

#[tokio::test]
async fn corrupt_records_read_as_empty() {
    let backend: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::new());
    backend
        .set(&ReservationStore::draft_key(USER_ID, 1), "not json".to_string())
        .await
        .unwrap();
    backend
        .set(&ReservationStore::occupancy_key(VENUE_ID), "[1, 2".to_string())
        .await
        .unwrap();
    backend.set("session", "{\"user_id\": \"x\"}".to_string()).await.unwrap();

    let reservations = ReservationStore::new(backend.clone());
    assert!(reservations.load_draft(USER_ID, 1).await.unwrap().is_empty());
    assert!(reservations.load_occupancy(VENUE_ID).await.unwrap().is_empty());

    let sessions = SessionStore::new(backend.clone());
    assert!(sessions.current().await.unwrap().is_none());
    assert!(backend.get("session").await.unwrap().is_none());
}

#[tokio::test]
async fn drafts_are_isolated_by_user_and_event() {
    let reservations = ReservationStore::new(Arc::new(MemoryStore::new()));
    reservations.save_draft(1, 1, &[seat("1-1")]).await.unwrap();
    reservations.save_draft(1, 2, &[seat("1-2")]).await.unwrap();
    reservations.save_draft(2, 1, &[seat("1-3")]).await.unwrap();

    assert_eq!(reservations.load_draft(1, 1).await.unwrap(), vec![seat("1-1")]);
    assert_eq!(reservations.load_draft(1, 2).await.unwrap(), vec![seat("1-2")]);
    assert_eq!(reservations.load_draft(2, 1).await.unwrap(), vec![seat("1-3")]);

    reservations.clear_draft(1, 1).await.unwrap();
    assert!(reservations.load_draft(1, 1).await.unwrap().is_empty());
    assert_eq!(reservations.load_draft(2, 1).await.unwrap(), vec![seat("1-3")]);
}

#[tokio::test]
async fn empty_draft_removes_the_record() {
    let backend = Arc::new(MemoryStore::new());
    let reservations = ReservationStore::new(backend.clone());
    reservations.save_draft(USER_ID, 1, &[seat("1-1")]).await.unwrap();
    reservations.save_draft(USER_ID, 1, &[]).await.unwrap();

    assert!(backend.is_empty().await);
}

#[tokio::test]
async fn session_round_trips_and_clears() {
    let sessions = SessionStore::new(Arc::new(MemoryStore::new()));
    assert!(matches!(sessions.require().await, Err(AuthError::NotAuthenticated)));

    sessions.save(&session()).await.unwrap();
    assert_eq!(sessions.require().await.unwrap(), session());
    assert!(matches!(sessions.require_admin().await, Err(AuthError::AdminRequired)));

    sessions.clear().await.unwrap();
    assert!(sessions.current().await.unwrap().is_none());
}

#[tokio::test]
async fn admin_session_passes_admin_check() {
    let sessions = SessionStore::new(Arc::new(MemoryStore::new()));
    let mut admin = session();
    admin.role = UserRole::Admin;
    sessions.save(&admin).await.unwrap();

    assert!(sessions.require_admin().await.unwrap().is_admin());
}

#[tokio::test]
async fn backend_is_chosen_from_config() {
    let dir = tempfile::tempdir().unwrap();
    let config = StorageConfig {
        backend: StorageBackend::File,
        path: dir.path().join("state").to_string_lossy().into_owned(),
    };

    let backend = store::open(&config, "redis://127.0.0.1:1").await.unwrap();
    backend.set("session", "{}".to_string()).await.unwrap();
    assert!(dir.path().join("state").join("session.json").exists());
}
