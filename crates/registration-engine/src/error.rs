//! Engine error types.

use registration_core::RegistrationId;
use thiserror::Error;

/// Registration engine error type.
#[derive(Error, Debug)]
pub enum EngineError {
    /// Remove requested for an id absent from the store
    #[error("Registration '{0}' does not exist")]
    NotFound(RegistrationId),

    /// Side key mismatch on remove; no mutation was performed
    #[error("Registration '{0}' side key failure")]
    Authorization(RegistrationId),

    /// Inbound channel open did not find the initial hello command; the
    /// registration was left unchanged
    #[error("Unable to initialise item channel for '{0}', could not find initial hello command")]
    ChannelOpen(RegistrationId),

    /// Store failure
    #[error(transparent)]
    Store(#[from] registration_store::StoreError),

    /// Transport failure
    #[error(transparent)]
    Transport(#[from] mam_transport::TransportError),

    /// Dispatch callback failure
    #[error("Dispatch failed for registration '{0}': {1}")]
    Dispatch(RegistrationId, String),
}

/// Result type alias using EngineError.
pub type EngineResult<T> = Result<T, EngineError>;
