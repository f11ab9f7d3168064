//! Transport error types.

use thiserror::Error;

/// Channel transport error type.
#[derive(Error, Debug)]
pub enum TransportError {
    /// Channel root is unknown to the transport
    #[error("Unknown channel root: {0}")]
    UnknownChannel(String),

    /// Side key missing or rejected for the channel
    #[error("Side key rejected for channel root: {0}")]
    SideKeyRejected(String),

    /// Underlying node or ledger failure
    #[error("Node error: {0}")]
    Node(String),
}

/// Result type alias using TransportError.
pub type TransportResult<T> = Result<T, TransportError>;
