//! Interval-driven scheduler for the registration engine.
//!
//! The engine itself has no internal timers: poll and return cycles run to
//! completion whenever a caller invokes them. This crate supplies that
//! caller as a background worker:
//!
//! - A poll ticker drives [`RegistrationManager::poll_commands`], handing
//!   new inbound commands to the configured [`CommandDispatch`].
//! - A return ticker drains the [`ReturnQueue`] into per-registration
//!   batches and flushes them through
//!   [`RegistrationManager::return_commands`].
//!
//! Cycle failures are logged and retried on the next tick; the worker
//! never retries inside a cycle (that granularity belongs to the engine's
//! persistence rules).
//!
//! ## Example
//!
//! ```ignore
//! let worker = RegistrationSyncWorker::new(SyncWorkerConfig::default(), manager, dispatch);
//! let returns = worker.return_queue();
//! worker.start();
//!
//! // Dispatch handlers enqueue outbound traffic between cycles.
//! returns.enqueue("reg-1".into(), vec![MamCommand::new("output-ack")]);
//! ```

use registration_core::{MamCommand, RegistrationId};
use registration_engine::{CommandDispatch, RegistrationManager};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;
use tokio::time::{interval, Duration};
use tracing::{debug, warn};

/// Default capacity of the in-memory return queue.
const DEFAULT_QUEUE_CAPACITY: usize = 1024;

/// Configuration for the sync worker's cycle timing.
#[derive(Debug, Clone)]
pub struct SyncWorkerConfig {
    /// How often to poll inbound channels.
    pub poll_interval: Duration,
    /// How often to flush queued return commands.
    pub return_interval: Duration,
    /// Capacity of the return queue channel.
    pub queue_capacity: usize,
}

impl Default for SyncWorkerConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(5),
            return_interval: Duration::from_secs(5),
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
        }
    }
}

/// Cloneable handle for enqueuing return commands between cycles.
#[derive(Clone)]
pub struct ReturnQueue {
    sender: mpsc::Sender<(RegistrationId, Vec<MamCommand>)>,
}

impl ReturnQueue {
    /// Queues commands for a registration's return channel.
    ///
    /// Dropped with a log line when the queue is full or the worker has
    /// stopped; durable queueing starts once the engine accepts the batch.
    pub fn enqueue(&self, id: RegistrationId, commands: Vec<MamCommand>) {
        if let Err(err) = self.sender.try_send((id, commands)) {
            debug!(error = %err, "Return enqueue failed");
        }
    }
}

/// Background worker that drives poll and return cycles on fixed intervals.
pub struct RegistrationSyncWorker {
    config: SyncWorkerConfig,
    manager: Arc<RegistrationManager>,
    dispatch: Arc<dyn CommandDispatch>,
    sender: mpsc::Sender<(RegistrationId, Vec<MamCommand>)>,
    receiver: Mutex<Option<mpsc::Receiver<(RegistrationId, Vec<MamCommand>)>>>,
}

impl RegistrationSyncWorker {
    /// Creates a new worker. Call [`start`](Self::start) to spawn the loop.
    pub fn new(
        config: SyncWorkerConfig,
        manager: Arc<RegistrationManager>,
        dispatch: Arc<dyn CommandDispatch>,
    ) -> Self {
        let (sender, receiver) = mpsc::channel(config.queue_capacity);
        Self {
            config,
            manager,
            dispatch,
            sender,
            receiver: Mutex::new(Some(receiver)),
        }
    }

    /// Returns a handle for enqueuing return commands.
    pub fn return_queue(&self) -> ReturnQueue {
        ReturnQueue {
            sender: self.sender.clone(),
        }
    }

    /// Spawns the background cycle loop.
    ///
    /// # Panics
    ///
    /// Panics if called more than once.
    pub fn start(&self) -> tokio::task::JoinHandle<()> {
        let mut receiver = self
            .receiver
            .lock()
            .expect("lock poisoned")
            .take()
            .expect("RegistrationSyncWorker already started");

        let config = self.config.clone();
        let manager = self.manager.clone();
        let dispatch = self.dispatch.clone();

        tokio::spawn(async move {
            let mut poll_ticker = interval(config.poll_interval);
            let mut return_ticker = interval(config.return_interval);
            let mut pending: Vec<(RegistrationId, Vec<MamCommand>)> = Vec::new();

            loop {
                tokio::select! {
                    maybe_entry = receiver.recv() => {
                        match maybe_entry {
                            Some(entry) => pending.push(entry),
                            // All senders dropped; stop the worker.
                            None => break,
                        }
                    }
                    _ = poll_ticker.tick() => {
                        if let Err(e) = manager.poll_commands(dispatch.as_ref()).await {
                            warn!(error = %e, "Poll cycle failed, retrying next tick");
                        }
                    }
                    _ = return_ticker.tick() => {
                        while let Ok(entry) = receiver.try_recv() {
                            pending.push(entry);
                        }
                        if pending.is_empty() {
                            continue;
                        }

                        let mut by_registration: HashMap<RegistrationId, Vec<MamCommand>> =
                            HashMap::new();
                        for (id, commands) in pending.drain(..) {
                            by_registration.entry(id).or_default().extend(commands);
                        }

                        // Flush per registration so one failing channel does
                        // not hold back the others; the engine keeps failed
                        // queues durable for the next tick.
                        for (id, commands) in by_registration {
                            let count = commands.len();
                            let entry = HashMap::from([(id.clone(), commands)]);
                            if let Err(e) = manager.return_commands(entry).await {
                                warn!(registration_id = %id, count, error = %e, "Return flush failed");
                            }
                        }
                    }
                }
            }
        })
    }
}
