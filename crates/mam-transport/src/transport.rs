//! The channel transport contract consumed by the registration engine.

use crate::TransportResult;
use async_trait::async_trait;
use registration_core::{ChannelHandle, MamCommand};
use std::sync::Arc;

/// An asynchronous, append-only command channel transport.
///
/// One readable channel is supplied per registering peer; one writable
/// channel may be created per registration for return traffic. Commands are
/// opaque to the transport consumer and are delivered in channel order.
#[async_trait]
pub trait ChannelTransport: Send + Sync {
    /// Opens and validates an inbound channel.
    ///
    /// Returns whether the initial handshake command was found on the
    /// channel. A `false` return means the channel exists but cannot be
    /// confirmed; the caller decides whether that is fatal.
    async fn open_readable(&self, handle: &ChannelHandle) -> TransportResult<bool>;

    /// Opens an outbound channel, populating `handle` in place with the
    /// generated root and side key.
    async fn open_writable(&self, handle: &mut ChannelHandle) -> TransportResult<()>;

    /// Best-effort teardown of an outbound channel.
    async fn close_writable(&self, handle: &ChannelHandle) -> TransportResult<()>;

    /// Fetches newly available commands for an inbound channel.
    ///
    /// May clear `handle.side_key` while leaving the root populated to
    /// signal that the peer has reset the channel.
    async fn receive_commands(
        &self,
        handle: &mut ChannelHandle,
    ) -> TransportResult<Vec<MamCommand>>;

    /// Sends a queue of commands on an outbound channel.
    ///
    /// Returns the unsent remainder in order; an empty remainder means the
    /// whole queue was accepted. Implementations may cap how much of the
    /// queue one call publishes.
    async fn send_command_queue(
        &self,
        handle: &ChannelHandle,
        commands: Vec<MamCommand>,
    ) -> TransportResult<Vec<MamCommand>>;
}

/// Thread-safe handle to a channel transport.
pub type TransportHandle = Arc<dyn ChannelTransport>;
