//! In-process loopback transport.
//!
//! Channels live in a shared map keyed by root. Writers append commands,
//! readers drain them, and the `hello`/`goodbye` handshake commands carry
//! the same meaning as on the real ledger transport: `hello` confirms a
//! freshly opened channel, `goodbye` invalidates its side key.

use crate::transport::ChannelTransport;
use crate::{TransportError, TransportResult};
use async_trait::async_trait;
use registration_core::{ChannelHandle, MamCommand};
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use tracing::debug;
use uuid::Uuid;

/// Handshake command written when a channel is opened.
pub const HELLO_COMMAND: &str = "hello";

/// Termination command that resets a channel's side key.
pub const GOODBYE_COMMAND: &str = "goodbye";

struct LoopbackChannel {
    side_key: String,
    pending: VecDeque<MamCommand>,
}

/// An in-process [`ChannelTransport`] backed by shared memory.
///
/// Useful for tests and local development: peers are simulated with
/// [`seed_readable`](LoopbackTransport::seed_readable) and
/// [`push_commands`](LoopbackTransport::push_commands), and outbound traffic
/// can be inspected with [`pending_commands`](LoopbackTransport::pending_commands).
pub struct LoopbackTransport {
    channels: Mutex<HashMap<String, LoopbackChannel>>,
    /// Maximum commands one `send_command_queue` call publishes; `None`
    /// publishes the whole queue.
    max_publish_batch: Option<usize>,
}

impl LoopbackTransport {
    /// Creates a loopback transport with no publish batch limit.
    pub fn new() -> Self {
        Self {
            channels: Mutex::new(HashMap::new()),
            max_publish_batch: None,
        }
    }

    /// Creates a loopback transport that publishes at most `max` commands
    /// per send call, returning the rest as the unsent remainder.
    pub fn with_max_publish_batch(max: usize) -> Self {
        Self {
            channels: Mutex::new(HashMap::new()),
            max_publish_batch: Some(max),
        }
    }

    /// Creates a peer-owned readable channel seeded with a handshake and
    /// the given commands.
    pub fn seed_readable(
        &self,
        root: impl Into<String>,
        side_key: impl Into<String>,
        commands: Vec<MamCommand>,
    ) {
        let root = root.into();
        let mut pending = VecDeque::new();
        pending.push_back(MamCommand::new(HELLO_COMMAND));
        pending.extend(commands);
        self.channels.lock().expect("lock poisoned").insert(
            root,
            LoopbackChannel {
                side_key: side_key.into(),
                pending,
            },
        );
    }

    /// Appends commands to an existing channel, simulating peer activity.
    pub fn push_commands(&self, root: &str, commands: Vec<MamCommand>) {
        let mut channels = self.channels.lock().expect("lock poisoned");
        if let Some(channel) = channels.get_mut(root) {
            channel.pending.extend(commands);
        }
    }

    /// Returns the commands currently pending on a channel, in order.
    pub fn pending_commands(&self, root: &str) -> Vec<MamCommand> {
        self.channels
            .lock()
            .expect("lock poisoned")
            .get(root)
            .map(|c| c.pending.iter().cloned().collect())
            .unwrap_or_default()
    }
}

impl Default for LoopbackTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ChannelTransport for LoopbackTransport {
    async fn open_readable(&self, handle: &ChannelHandle) -> TransportResult<bool> {
        let channels = self.channels.lock().expect("lock poisoned");
        let Some(channel) = channels.get(&handle.initial_root) else {
            // Nothing attached at this root yet, so no handshake to find.
            return Ok(false);
        };
        if handle.side_key.as_deref() != Some(channel.side_key.as_str()) {
            return Err(TransportError::SideKeyRejected(handle.initial_root.clone()));
        }
        Ok(channel
            .pending
            .iter()
            .any(|c| c.command == HELLO_COMMAND))
    }

    async fn open_writable(&self, handle: &mut ChannelHandle) -> TransportResult<()> {
        let root = Uuid::new_v4().simple().to_string().to_uppercase();
        let side_key = Uuid::new_v4().simple().to_string().to_uppercase();

        let mut pending = VecDeque::new();
        pending.push_back(MamCommand::new(HELLO_COMMAND));
        self.channels.lock().expect("lock poisoned").insert(
            root.clone(),
            LoopbackChannel {
                side_key: side_key.clone(),
                pending,
            },
        );

        debug!(root = %root, "Opened loopback writable channel");
        handle.initial_root = root;
        handle.side_key = Some(side_key);
        Ok(())
    }

    async fn close_writable(&self, handle: &ChannelHandle) -> TransportResult<()> {
        let mut channels = self.channels.lock().expect("lock poisoned");
        let channel = channels
            .get_mut(&handle.initial_root)
            .ok_or_else(|| TransportError::UnknownChannel(handle.initial_root.clone()))?;
        channel.pending.push_back(MamCommand::new(GOODBYE_COMMAND));
        Ok(())
    }

    async fn receive_commands(
        &self,
        handle: &mut ChannelHandle,
    ) -> TransportResult<Vec<MamCommand>> {
        let mut channels = self.channels.lock().expect("lock poisoned");
        let Some(channel) = channels.get_mut(&handle.initial_root) else {
            return Ok(Vec::new());
        };
        if handle.side_key.as_deref() != Some(channel.side_key.as_str()) {
            return Err(TransportError::SideKeyRejected(handle.initial_root.clone()));
        }

        let commands: Vec<MamCommand> = channel.pending.drain(..).collect();
        if commands.iter().any(|c| c.command == GOODBYE_COMMAND) {
            // The peer terminated the channel; surface the reset by
            // clearing the side key and dropping the channel state.
            handle.side_key = None;
            channels.remove(&handle.initial_root);
        }
        Ok(commands)
    }

    async fn send_command_queue(
        &self,
        handle: &ChannelHandle,
        mut commands: Vec<MamCommand>,
    ) -> TransportResult<Vec<MamCommand>> {
        let mut channels = self.channels.lock().expect("lock poisoned");
        let channel = channels
            .get_mut(&handle.initial_root)
            .ok_or_else(|| TransportError::UnknownChannel(handle.initial_root.clone()))?;
        if handle.side_key.as_deref() != Some(channel.side_key.as_str()) {
            return Err(TransportError::SideKeyRejected(handle.initial_root.clone()));
        }

        let publish = match self.max_publish_batch {
            Some(max) => commands.len().min(max),
            None => commands.len(),
        };
        let remainder = commands.split_off(publish);
        channel.pending.extend(commands);
        Ok(remainder)
    }
}
