//! Command dispatch contract.
//!
//! Newly observed inbound commands are handed to a caller-supplied dispatch,
//! one batch per registration per poll cycle. The dispatch decides the
//! business action; the engine only guarantees ordering and that channel
//! state was persisted before the call.

use async_trait::async_trait;
use registration_core::{MamCommand, Registration, RegistrationId};
use thiserror::Error;

/// Error returned by a dispatch callback.
#[derive(Error, Debug)]
#[error("{0}")]
pub struct DispatchError(pub String);

impl DispatchError {
    /// Creates a dispatch error from a message.
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

/// Receives newly observed inbound commands per registration.
#[async_trait]
pub trait CommandDispatch: Send + Sync {
    /// Handles one ordered batch of commands for a registration.
    ///
    /// The batch is never split within a poll cycle. The registration's
    /// updated channel state has already been persisted when this is
    /// called; a returned error propagates to the scheduler without
    /// causing redelivery.
    async fn handle_commands(
        &self,
        registration: &Registration,
        commands: Vec<MamCommand>,
    ) -> Result<(), DispatchError>;
}

/// A no-op dispatch that discards all commands.
#[derive(Debug, Default)]
pub struct NullDispatch;

#[async_trait]
impl CommandDispatch for NullDispatch {
    async fn handle_commands(
        &self,
        _registration: &Registration,
        _commands: Vec<MamCommand>,
    ) -> Result<(), DispatchError> {
        Ok(())
    }
}

/// A dispatch that records every batch for testing.
#[derive(Debug, Default)]
pub struct RecordingDispatch {
    batches: std::sync::Mutex<Vec<(RegistrationId, Vec<MamCommand>)>>,
}

impl RecordingDispatch {
    /// Creates a new recording dispatch.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns all recorded batches in delivery order.
    pub fn batches(&self) -> Vec<(RegistrationId, Vec<MamCommand>)> {
        self.batches.lock().expect("lock poisoned").clone()
    }

    /// Returns the number of recorded batches.
    pub fn len(&self) -> usize {
        self.batches.lock().expect("lock poisoned").len()
    }

    /// Returns true if no batches have been recorded.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Clears all recorded batches.
    pub fn clear(&self) {
        self.batches.lock().expect("lock poisoned").clear();
    }
}

#[async_trait]
impl CommandDispatch for RecordingDispatch {
    async fn handle_commands(
        &self,
        registration: &Registration,
        commands: Vec<MamCommand>,
    ) -> Result<(), DispatchError> {
        self.batches
            .lock()
            .expect("lock poisoned")
            .push((registration.id.clone(), commands));
        Ok(())
    }
}
