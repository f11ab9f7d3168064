//! Durable registration storage for the registration engine.
//!
//! This crate provides:
//! - [`RegistrationStore`]: the keyed, paginated store contract the engine
//!   consumes
//! - [`MemoryRegistrationStore`]: an in-memory backend for tests
//! - [`SqliteRegistrationStore`]: the SQLite-backed durable store
//!
//! Both backends page in stable insertion order so a bulk load observes
//! registrations in the order they were first persisted.

mod error;
mod memory;
mod sqlite;
mod store;

pub use error::{StoreError, StoreResult};
pub use memory::MemoryRegistrationStore;
pub use sqlite::SqliteRegistrationStore;
pub use store::{RegistrationStore, StoreHandle};
