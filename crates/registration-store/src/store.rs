//! The registration store contract consumed by the engine.

use crate::StoreResult;
use async_trait::async_trait;
use registration_core::{Registration, RegistrationId};
use std::sync::Arc;

/// A keyed, paginated persistent map from registration id to record.
#[async_trait]
pub trait RegistrationStore: Send + Sync {
    /// Fetches a registration by id.
    async fn get(&self, id: &RegistrationId) -> StoreResult<Option<Registration>>;

    /// Stores a registration, replacing any existing record with the same id.
    async fn set(&self, id: &RegistrationId, registration: &Registration) -> StoreResult<()>;

    /// Removes a registration by id. Removing an absent id is a no-op.
    async fn remove(&self, id: &RegistrationId) -> StoreResult<()>;

    /// Returns one page of registrations in stable insertion order.
    ///
    /// A page shorter than `page_size` (including empty) marks the end of
    /// the store.
    async fn page(&self, page: usize, page_size: usize) -> StoreResult<Vec<Registration>>;
}

/// Thread-safe handle to a registration store.
pub type StoreHandle = Arc<dyn RegistrationStore>;
