//! Add/remove lifecycle and channel reconciliation tests.

use super::harness::{always, manager, never, StubTransport};
use crate::EngineError;
use registration_core::Registration;
use registration_store::RegistrationStore;

#[tokio::test]
async fn add_persists_and_memory_matches_store() {
    let transport = StubTransport::new();
    let (engine, store) = manager(transport, always());

    let added = engine
        .add_registration(
            Registration::with_item("reg-1", Some("panel".to_string()), Some("producer".to_string())),
            Some("ROOT"),
            Some("KEY"),
        )
        .await
        .unwrap();

    assert!(added.item_mam_channel.is_some());
    assert!(added.return_mam_channel.is_some());

    let stored = store.get(&added.id).await.unwrap().unwrap();
    let in_memory = engine.registration(&added.id).await.unwrap();
    assert_eq!(stored.item_mam_channel, in_memory.item_mam_channel);
    assert_eq!(stored.return_mam_channel, in_memory.return_mam_channel);
    assert_eq!(stored, in_memory);
}

#[tokio::test]
async fn re_add_without_details_preserves_channels() {
    let transport = StubTransport::new();
    let (engine, _store) = manager(transport, always());

    let first = engine
        .add_registration(
            Registration::with_item("reg-1", Some("panel".to_string()), None),
            Some("ROOT"),
            Some("KEY"),
        )
        .await
        .unwrap();

    // Re-register with no item root/key and no name; everything carries
    // forward.
    let second = engine
        .add_registration(Registration::new("reg-1"), None, None)
        .await
        .unwrap();

    assert_eq!(second.item_mam_channel, first.item_mam_channel);
    assert_eq!(second.return_mam_channel, first.return_mam_channel);
    assert_eq!(second.item_name.as_deref(), Some("panel"));
}

#[tokio::test]
async fn re_add_with_same_details_does_not_reopen() {
    let transport = StubTransport::new();
    let (engine, _store) = manager(transport.clone(), never());

    for _ in 0..2 {
        engine
            .add_registration(Registration::new("reg-1"), Some("ROOT"), Some("KEY"))
            .await
            .unwrap();
    }

    assert_eq!(transport.opened_readable.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn re_add_with_new_root_reopens_channel() {
    let transport = StubTransport::new();
    let (engine, _store) = manager(transport.clone(), never());

    engine
        .add_registration(Registration::new("reg-1"), Some("ROOT"), Some("KEY"))
        .await
        .unwrap();
    let updated = engine
        .add_registration(Registration::new("reg-1"), Some("ROOT2"), Some("KEY2"))
        .await
        .unwrap();

    assert_eq!(transport.opened_readable.lock().unwrap().len(), 2);
    let handle = updated.item_mam_channel.unwrap();
    assert_eq!(handle.initial_root, "ROOT2");
    assert_eq!(handle.side_key.as_deref(), Some("KEY2"));
}

#[tokio::test]
async fn add_without_handshake_persists_nothing() {
    let transport = StubTransport::new();
    transport.script_open_readable(false);
    let (engine, store) = manager(transport, always());

    let err = engine
        .add_registration(Registration::new("reg-1"), Some("ROOT"), Some("KEY"))
        .await
        .unwrap_err();

    assert!(matches!(err, EngineError::ChannelOpen(_)));
    assert!(store.get(&"reg-1".into()).await.unwrap().is_none());
    assert_eq!(engine.registration_count().await, 0);
}

#[tokio::test]
async fn return_channel_only_created_when_predicate_allows() {
    let transport = StubTransport::new();
    let (engine, _store) = manager(transport, never());

    let added = engine
        .add_registration(Registration::new("reg-1"), Some("ROOT"), Some("KEY"))
        .await
        .unwrap();
    assert!(added.return_mam_channel.is_none());
}

#[tokio::test]
async fn remove_with_correct_side_key_deletes_and_closes() {
    let transport = StubTransport::new();
    let (engine, store) = manager(transport.clone(), always());

    let added = engine
        .add_registration(Registration::new("reg-1"), Some("ROOT"), Some("KEY"))
        .await
        .unwrap();
    let return_root = added.return_mam_channel.unwrap().initial_root;

    engine.remove_registration(&added.id, "KEY").await.unwrap();

    assert!(store.get(&added.id).await.unwrap().is_none());
    assert_eq!(engine.registration_count().await, 0);
    assert_eq!(*transport.closed.lock().unwrap(), vec![return_root]);
}

#[tokio::test]
async fn remove_with_wrong_side_key_mutates_nothing() {
    let transport = StubTransport::new();
    let (engine, store) = manager(transport.clone(), always());

    let added = engine
        .add_registration(Registration::new("reg-1"), Some("ROOT"), Some("KEY"))
        .await
        .unwrap();

    let err = engine
        .remove_registration(&added.id, "WRONG")
        .await
        .unwrap_err();

    assert!(matches!(err, EngineError::Authorization(_)));
    assert!(store.get(&added.id).await.unwrap().is_some());
    assert_eq!(engine.registration_count().await, 1);
    assert!(transport.closed.lock().unwrap().is_empty());
}

#[tokio::test]
async fn remove_missing_registration_is_not_found() {
    let transport = StubTransport::new();
    let (engine, _store) = manager(transport, never());

    let err = engine
        .remove_registration(&"missing".into(), "KEY")
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::NotFound(_)));
}

#[tokio::test]
async fn remove_without_item_channel_needs_no_side_key_match() {
    let transport = StubTransport::new();
    let (engine, store) = manager(transport, never());

    let added = engine
        .add_registration(Registration::new("reg-1"), None, None)
        .await
        .unwrap();

    engine
        .remove_registration(&added.id, "anything")
        .await
        .unwrap();
    assert!(store.get(&added.id).await.unwrap().is_none());
}
