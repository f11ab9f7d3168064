//! Integration tests for the registration engine.
//!
//! Test organization:
//!
//! - `lifecycle.rs` - add/remove, merge, channel reconciliation
//! - `load.rs`      - paged bulk load from the store
//! - `poll.rs`      - inbound polling, reset handling, dispatch ordering
//! - `returns.rs`   - outbound queueing, partial delivery, discards
//!
//! Scripted collaborators live in `harness.rs`; the basic workflow below
//! runs end to end against the loopback transport instead.

mod lifecycle;

use crate::{RecordingDispatch, RegistrationManager};
use harness::always;
use mam_transport::{LoopbackTransport, TransportHandle, HELLO_COMMAND};
use registration_core::{MamCommand, Registration};
use registration_store::{MemoryRegistrationStore, StoreHandle};
use std::collections::HashMap;
use std::sync::Arc;

/// Basic workflow test demonstrating core functionality against the
/// loopback transport.
#[tokio::test]
async fn basic_workflow() {
    let transport = Arc::new(LoopbackTransport::new());
    transport.seed_readable("ITEMROOT", "ITEMKEY", vec![MamCommand::new("output")]);

    let store = Arc::new(MemoryRegistrationStore::new());
    let manager = RegistrationManager::new(
        transport.clone() as TransportHandle,
        store.clone() as StoreHandle,
        always(),
    );
    manager.load_registrations().await.unwrap();

    // Register a peer; its item channel is validated against the seeded
    // handshake and a return channel is created for it.
    let registration = manager
        .add_registration(
            Registration::with_item("reg-00000001", Some("solar-panel".to_string()), None),
            Some("ITEMROOT"),
            Some("ITEMKEY"),
        )
        .await
        .unwrap();

    let return_handle = registration.return_mam_channel.clone().unwrap();
    assert!(registration.item_mam_channel.is_some());

    // Poll picks up the pending inbound commands as one batch.
    let dispatch = RecordingDispatch::new();
    manager.poll_commands(&dispatch).await.unwrap();

    let batches = dispatch.batches();
    assert_eq!(batches.len(), 1);
    assert_eq!(batches[0].0, registration.id);
    let tags: Vec<&str> = batches[0].1.iter().map(|c| c.command.as_str()).collect();
    assert_eq!(tags, vec![HELLO_COMMAND, "output"]);

    // Return traffic flows out over the return channel.
    let mut returns = HashMap::new();
    returns.insert(registration.id.clone(), vec![MamCommand::new("output-ack")]);
    manager.return_commands(returns).await.unwrap();

    let pending = transport.pending_commands(&return_handle.initial_root);
    assert_eq!(pending.last().unwrap().command, "output-ack");

    // Teardown closes the return channel.
    manager
        .remove_registration(&registration.id, "ITEMKEY")
        .await
        .unwrap();
    assert_eq!(manager.registration_count().await, 0);
    assert_eq!(store.len(), 0);
}
