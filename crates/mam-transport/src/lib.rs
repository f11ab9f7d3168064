//! MAM channel transport contract for the registration engine.
//!
//! This crate provides:
//! - [`ChannelTransport`]: the asynchronous channel contract the engine
//!   consumes (open/close, receive, batched send)
//! - [`LoopbackTransport`]: an in-process implementation used by tests and
//!   local development
//!
//! The wire-level ledger mechanics live behind implementations of the trait;
//! callers only ever see channel handles and ordered command batches.

mod error;
mod loopback;
mod transport;

pub use error::{TransportError, TransportResult};
pub use loopback::{LoopbackTransport, GOODBYE_COMMAND, HELLO_COMMAND};
pub use transport::{ChannelTransport, TransportHandle};
