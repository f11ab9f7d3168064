//! The registration manager.

use crate::dispatch::CommandDispatch;
use crate::error::{EngineError, EngineResult};
use mam_transport::TransportHandle;
use registration_core::{merge_registration, ChannelHandle, MamCommand, Registration, RegistrationId};
use registration_store::StoreHandle;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

/// Page size used when bulk loading registrations from the store.
const LOAD_PAGE_SIZE: usize = 20;

/// Decides whether a return channel is warranted for a registration.
///
/// Evaluated once per registration, when it is added without an existing
/// return channel.
pub type ReturnChannelPredicate = Box<dyn Fn(&Registration) -> bool + Send + Sync>;

/// Owns the in-memory registration set and drives channel reconciliation.
///
/// Every mutation is applied to the store before the in-memory set, so a
/// crash mid-mutation is resolved by re-loading from the store on restart.
/// There is no internal parallelism: poll and return cycles run their
/// registrations strictly sequentially.
pub struct RegistrationManager {
    transport: TransportHandle,
    store: StoreHandle,
    should_create_return_channel: ReturnChannelPredicate,
    /// All known registrations in insertion order. The single source of
    /// truth for lookups between store loads.
    registrations: RwLock<Vec<Registration>>,
    /// Commands dropped because their registration had no return channel.
    discarded_return_commands: AtomicU64,
}

impl RegistrationManager {
    /// Creates a new manager with an empty in-memory set.
    ///
    /// Call [`load_registrations`](Self::load_registrations) before the
    /// first poll or return cycle.
    pub fn new(
        transport: TransportHandle,
        store: StoreHandle,
        should_create_return_channel: ReturnChannelPredicate,
    ) -> Self {
        Self {
            transport,
            store,
            should_create_return_channel,
            registrations: RwLock::new(Vec::new()),
            discarded_return_commands: AtomicU64::new(0),
        }
    }

    /// Loads all registrations from the store into the in-memory set.
    ///
    /// Pages through the store until a short or empty page. An empty store
    /// yields an empty set, not an error.
    pub async fn load_registrations(&self) -> EngineResult<()> {
        let mut loaded = Vec::new();
        let mut page = 0;
        loop {
            let items = self.store.page(page, LOAD_PAGE_SIZE).await?;
            let count = items.len();
            loaded.extend(items);
            if count < LOAD_PAGE_SIZE {
                break;
            }
            page += 1;
        }

        info!(count = loaded.len(), "Loaded registrations");
        *self.registrations.write().await = loaded;
        Ok(())
    }

    /// Adds a new registration, or merge-updates an existing one.
    ///
    /// Channel state always carries forward from the stored record; the
    /// inbound channel is (re)opened only when `item_root` and
    /// `item_side_key` are both supplied and differ from the current handle.
    /// Returns the stored registration so callers can hand the peer the
    /// return channel details.
    ///
    /// Fails with [`EngineError::ChannelOpen`] when the inbound channel
    /// cannot be confirmed; nothing is persisted in that case.
    pub async fn add_registration(
        &self,
        mut registration: Registration,
        item_root: Option<&str>,
        item_side_key: Option<&str>,
    ) -> EngineResult<Registration> {
        debug!(registration_id = %registration.id, "Adding registration");

        if let Some(existing) = self.store.get(&registration.id).await? {
            debug!(registration_id = %registration.id, "Registration exists, merging");
            merge_registration(&mut registration, &existing);
        }

        self.open_channels(item_root, item_side_key, &mut registration)
            .await?;

        self.store.set(&registration.id, &registration).await?;
        self.upsert(registration.clone()).await;

        info!(registration_id = %registration.id, "Registration added");
        Ok(registration)
    }

    /// Removes a registration, validating the caller against the inbound
    /// channel's side key.
    ///
    /// The in-memory entry is dropped before the durable delete so an
    /// in-flight poll cycle that reaches this id afterwards sees nothing to
    /// do. Closing the return channel is best-effort: the deletion has
    /// already completed when it runs.
    pub async fn remove_registration(
        &self,
        id: &RegistrationId,
        side_key: &str,
    ) -> EngineResult<()> {
        let registration = self
            .store
            .get(id)
            .await?
            .ok_or_else(|| EngineError::NotFound(id.clone()))?;

        if let Some(item) = &registration.item_mam_channel {
            if item.side_key.as_deref() != Some(side_key) {
                return Err(EngineError::Authorization(id.clone()));
            }
        }

        {
            let mut registrations = self.registrations.write().await;
            registrations.retain(|r| r.id != *id);
        }

        self.store.remove(id).await?;

        if let Some(handle) = &registration.return_mam_channel {
            if let Err(e) = self.transport.close_writable(handle).await {
                warn!(registration_id = %id, error = %e, "Failed to close return channel");
            }
        }

        info!(registration_id = %id, "Registration removed");
        Ok(())
    }

    /// Polls every registration's inbound channel for new commands.
    ///
    /// Registrations are visited strictly sequentially in insertion order.
    /// For each one with new commands, updated channel state is persisted
    /// before `dispatch` is invoked with the whole batch. Transport, store,
    /// and dispatch errors propagate to the caller; registrations already
    /// processed in this cycle stay advanced.
    pub async fn poll_commands(&self, dispatch: &dyn CommandDispatch) -> EngineResult<()> {
        let ids: Vec<RegistrationId> = {
            let registrations = self.registrations.read().await;
            registrations.iter().map(|r| r.id.clone()).collect()
        };

        for id in ids {
            self.poll_one(&id, dispatch).await?;
        }
        Ok(())
    }

    /// Queues and flushes outbound commands per registration.
    ///
    /// Ids absent from the in-memory set are skipped: the registration may
    /// have been removed since the commands were produced. Commands for a
    /// registration without a return channel are dropped and counted on
    /// [`discarded_return_commands`](Self::discarded_return_commands).
    pub async fn return_commands(
        &self,
        commands: HashMap<RegistrationId, Vec<MamCommand>>,
    ) -> EngineResult<()> {
        for (id, batch) in commands {
            let Some(mut registration) = self.find(&id).await else {
                debug!(registration_id = %id, count = batch.len(), "Skipping return, registration not in memory");
                continue;
            };
            let Some(handle) = registration.return_mam_channel.clone() else {
                self.discarded_return_commands
                    .fetch_add(batch.len() as u64, Ordering::Relaxed);
                warn!(registration_id = %id, count = batch.len(), "Discarding return commands, registration has no return channel");
                continue;
            };

            let mut queue = registration.unsent_return_commands.take().unwrap_or_default();
            queue.extend(batch);
            if queue.is_empty() {
                continue;
            }

            debug!(registration_id = %id, count = queue.len(), "Flushing return commands");
            let (unsent, send_error) = match self
                .transport
                .send_command_queue(&handle, queue.clone())
                .await
            {
                Ok(remainder) => (remainder, None),
                // Nothing was confirmed sent; keep the whole queue.
                Err(e) => (queue, Some(e)),
            };

            registration.unsent_return_commands = if unsent.is_empty() {
                None
            } else {
                Some(unsent)
            };

            // Persist unconditionally after the send attempt: confirmed-sent
            // commands are durably dropped and the remainder survives a
            // restart.
            self.store.set(&registration.id, &registration).await?;
            self.replace_if_present(registration).await;

            if let Some(e) = send_error {
                return Err(e.into());
            }
        }
        Ok(())
    }

    /// Returns a clone of a registration from the in-memory set.
    pub async fn registration(&self, id: &RegistrationId) -> Option<Registration> {
        self.find(id).await
    }

    /// Returns the number of registrations in the in-memory set.
    pub async fn registration_count(&self) -> usize {
        self.registrations.read().await.len()
    }

    /// Returns how many return commands were dropped for lack of a return
    /// channel.
    pub fn discarded_return_commands(&self) -> u64 {
        self.discarded_return_commands.load(Ordering::Relaxed)
    }

    /// Reconciles the inbound and outbound channels for a registration
    /// being added.
    async fn open_channels(
        &self,
        item_root: Option<&str>,
        item_side_key: Option<&str>,
        registration: &mut Registration,
    ) -> EngineResult<()> {
        // The inbound channel is only built when the registering peer sent
        // its details, and only rebuilt when they differ from the current
        // handle.
        if let (Some(root), Some(side_key)) = (item_root, item_side_key) {
            let unchanged = registration.item_mam_channel.as_ref().is_some_and(|h| {
                h.initial_root == root && h.side_key.as_deref() == Some(side_key)
            });
            if !unchanged {
                debug!(registration_id = %registration.id, "Initialising item channel");
                let handle = ChannelHandle::new(root, side_key);
                let found_hello = self.transport.open_readable(&handle).await?;
                if !found_hello {
                    return Err(EngineError::ChannelOpen(registration.id.clone()));
                }
                // The previous handle belongs to the peer; discard it
                // without closing.
                registration.item_mam_channel = Some(handle);
                debug!(registration_id = %registration.id, "Item channel initialised");
            }
        }

        if registration.return_mam_channel.is_none()
            && (self.should_create_return_channel)(registration)
        {
            debug!(registration_id = %registration.id, "Creating return channel");
            let mut handle = ChannelHandle::default();
            self.transport.open_writable(&mut handle).await?;
            registration.return_mam_channel = Some(handle);
            debug!(registration_id = %registration.id, "Return channel created");
        }

        Ok(())
    }

    /// Polls a single registration's inbound channel.
    async fn poll_one(
        &self,
        id: &RegistrationId,
        dispatch: &dyn CommandDispatch,
    ) -> EngineResult<()> {
        // Re-read by id: the registration may have been removed or replaced
        // since the id snapshot was taken.
        let Some(mut registration) = self.find(id).await else {
            return Ok(());
        };
        let Some(mut handle) = registration.item_mam_channel.clone() else {
            return Ok(());
        };

        let commands = self.transport.receive_commands(&mut handle).await?;
        if commands.is_empty() {
            return Ok(());
        }

        if handle.is_reset() {
            // The peer signalled termination through one of the commands;
            // tear the inbound handle down entirely.
            debug!(registration_id = %id, "Item channel reset by peer");
            registration.item_mam_channel = None;
        } else {
            registration.item_mam_channel = Some(handle);
        }

        // Persist before dispatch so a dispatch failure cannot cause these
        // commands to be redelivered on the next cycle.
        self.store.set(&registration.id, &registration).await?;
        self.replace_if_present(registration.clone()).await;

        debug!(registration_id = %id, count = commands.len(), "Dispatching commands");
        dispatch
            .handle_commands(&registration, commands)
            .await
            .map_err(|e| EngineError::Dispatch(id.clone(), e.to_string()))?;
        Ok(())
    }

    async fn find(&self, id: &RegistrationId) -> Option<Registration> {
        let registrations = self.registrations.read().await;
        registrations.iter().find(|r| r.id == *id).cloned()
    }

    /// Replaces the entry by id, or appends it if absent.
    async fn upsert(&self, registration: Registration) {
        let mut registrations = self.registrations.write().await;
        match registrations.iter_mut().find(|r| r.id == registration.id) {
            Some(slot) => *slot = registration,
            None => registrations.push(registration),
        }
    }

    /// Writes back an updated registration only if it is still present; a
    /// concurrent remove wins.
    async fn replace_if_present(&self, registration: Registration) {
        let mut registrations = self.registrations.write().await;
        if let Some(slot) = registrations.iter_mut().find(|r| r.id == registration.id) {
            *slot = registration;
        }
    }
}
