//! In-memory registration store for tests.

use crate::store::RegistrationStore;
use crate::StoreResult;
use async_trait::async_trait;
use registration_core::{Registration, RegistrationId};
use std::sync::Mutex;

/// A [`RegistrationStore`] backed by a plain vector.
///
/// Entries keep their insertion order, matching the paging contract of the
/// durable backend.
#[derive(Default)]
pub struct MemoryRegistrationStore {
    entries: Mutex<Vec<Registration>>,
}

impl MemoryRegistrationStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of stored registrations.
    pub fn len(&self) -> usize {
        self.entries.lock().expect("lock poisoned").len()
    }

    /// Returns true when the store holds no registrations.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl RegistrationStore for MemoryRegistrationStore {
    async fn get(&self, id: &RegistrationId) -> StoreResult<Option<Registration>> {
        let entries = self.entries.lock().expect("lock poisoned");
        Ok(entries.iter().find(|r| r.id == *id).cloned())
    }

    async fn set(&self, id: &RegistrationId, registration: &Registration) -> StoreResult<()> {
        let mut entries = self.entries.lock().expect("lock poisoned");
        match entries.iter_mut().find(|r| r.id == *id) {
            Some(slot) => *slot = registration.clone(),
            None => entries.push(registration.clone()),
        }
        Ok(())
    }

    async fn remove(&self, id: &RegistrationId) -> StoreResult<()> {
        let mut entries = self.entries.lock().expect("lock poisoned");
        entries.retain(|r| r.id != *id);
        Ok(())
    }

    async fn page(&self, page: usize, page_size: usize) -> StoreResult<Vec<Registration>> {
        let entries = self.entries.lock().expect("lock poisoned");
        let start = page.saturating_mul(page_size);
        Ok(entries
            .iter()
            .skip(start)
            .take(page_size)
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn set_get_remove_roundtrip() {
        let store = MemoryRegistrationStore::new();
        let registration = Registration::new("reg-1");

        store.set(&registration.id, &registration).await.unwrap();
        assert_eq!(
            store.get(&registration.id).await.unwrap(),
            Some(registration.clone())
        );

        store.remove(&registration.id).await.unwrap();
        assert_eq!(store.get(&registration.id).await.unwrap(), None);
    }

    #[tokio::test]
    async fn set_replaces_in_place_keeping_order() {
        let store = MemoryRegistrationStore::new();
        for id in ["a", "b", "c"] {
            let registration = Registration::new(id);
            store.set(&registration.id, &registration).await.unwrap();
        }

        let mut updated = Registration::new("b");
        updated.item_name = Some("renamed".to_string());
        store.set(&updated.id, &updated).await.unwrap();

        let page = store.page(0, 10).await.unwrap();
        let ids: Vec<&str> = page.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
        assert_eq!(page[1].item_name.as_deref(), Some("renamed"));
    }

    #[tokio::test]
    async fn page_past_end_is_empty() {
        let store = MemoryRegistrationStore::new();
        let registration = Registration::new("only");
        store.set(&registration.id, &registration).await.unwrap();

        assert_eq!(store.page(0, 10).await.unwrap().len(), 1);
        assert!(store.page(1, 10).await.unwrap().is_empty());
    }
}
