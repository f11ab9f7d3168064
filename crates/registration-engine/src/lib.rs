//! Registration lifecycle and channel reconciliation engine.
//!
//! The [`RegistrationManager`] owns the in-memory set of all registrations,
//! mirrors every mutation to the durable [`RegistrationStore`] before the
//! in-memory set is touched, and drives channel open/close/reset decisions
//! against the [`ChannelTransport`].
//!
//! ## Operations
//!
//! - [`RegistrationManager::load_registrations`]: bulk load from the store
//!   at startup, in fixed-size pages
//! - [`RegistrationManager::add_registration`]: create or merge-update a
//!   registration and reconcile its channels
//! - [`RegistrationManager::remove_registration`]: authorized teardown of a
//!   registration and its return channel
//! - [`RegistrationManager::poll_commands`]: fetch new inbound commands per
//!   registration and hand them to a [`CommandDispatch`]
//! - [`RegistrationManager::return_commands`]: flush queued outbound
//!   commands over each registration's return channel
//!
//! ## Consistency
//!
//! Writes go to the store first; the in-memory set is updated only after
//! persistence succeeds, so a crash mid-mutation is resolved by re-loading
//! from the store on restart. Poll persists updated channel state before
//! invoking the dispatch callback, so a dispatch failure cannot replay
//! commands on the next cycle.
//!
//! [`RegistrationStore`]: registration_store::RegistrationStore
//! [`ChannelTransport`]: mam_transport::ChannelTransport

mod dispatch;
mod error;
mod manager;

#[cfg(test)]
mod tests;

pub use dispatch::{CommandDispatch, DispatchError, NullDispatch, RecordingDispatch};
pub use error::{EngineError, EngineResult};
pub use manager::{RegistrationManager, ReturnChannelPredicate};
