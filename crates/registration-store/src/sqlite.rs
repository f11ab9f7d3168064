//! SQLite-backed registration store.
//!
//! Registrations are stored as one JSON body per row. Rowid order is the
//! paging order, so registrations load back in first-persisted order and
//! updates never reorder the set.

use crate::store::RegistrationStore;
use crate::StoreResult;
use async_trait::async_trait;
use registration_core::{Registration, RegistrationId};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::Mutex;
use tracing::debug;

/// A [`RegistrationStore`] backed by SQLite.
pub struct SqliteRegistrationStore {
    conn: Mutex<Connection>,
}

impl SqliteRegistrationStore {
    /// Opens a SQLite database at the given path, creating the schema if
    /// needed.
    pub fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        let conn = Connection::open(path)?;
        Self::init_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Creates an in-memory SQLite database. Useful for testing.
    pub fn in_memory() -> StoreResult<Self> {
        let conn = Connection::open_in_memory()?;
        Self::init_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn init_schema(conn: &Connection) -> StoreResult<()> {
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS registrations (
                id TEXT PRIMARY KEY,
                created_at INTEGER NOT NULL,
                body TEXT NOT NULL
            );
            "#,
        )?;
        Ok(())
    }
}

#[async_trait]
impl RegistrationStore for SqliteRegistrationStore {
    async fn get(&self, id: &RegistrationId) -> StoreResult<Option<Registration>> {
        let conn = self.conn.lock().expect("lock poisoned");
        let body: Option<String> = conn
            .query_row(
                "SELECT body FROM registrations WHERE id = ?",
                params![id.as_str()],
                |row| row.get(0),
            )
            .optional()?;
        match body {
            Some(body) => Ok(Some(serde_json::from_str(&body)?)),
            None => Ok(None),
        }
    }

    async fn set(&self, id: &RegistrationId, registration: &Registration) -> StoreResult<()> {
        let body = serde_json::to_string(registration)?;
        let created = registration.created.timestamp_millis();
        let conn = self.conn.lock().expect("lock poisoned");
        // Upsert keeps the original rowid so paging order is stable.
        conn.execute(
            "INSERT INTO registrations (id, created_at, body) VALUES (?, ?, ?)
             ON CONFLICT(id) DO UPDATE SET body = excluded.body",
            params![id.as_str(), created, body],
        )?;
        debug!(registration_id = %id, "Persisted registration");
        Ok(())
    }

    async fn remove(&self, id: &RegistrationId) -> StoreResult<()> {
        let conn = self.conn.lock().expect("lock poisoned");
        conn.execute(
            "DELETE FROM registrations WHERE id = ?",
            params![id.as_str()],
        )?;
        Ok(())
    }

    async fn page(&self, page: usize, page_size: usize) -> StoreResult<Vec<Registration>> {
        let conn = self.conn.lock().expect("lock poisoned");
        let mut stmt =
            conn.prepare("SELECT body FROM registrations ORDER BY rowid LIMIT ? OFFSET ?")?;
        let offset = page.saturating_mul(page_size);
        let rows = stmt.query_map(params![page_size as i64, offset as i64], |row| {
            row.get::<_, String>(0)
        })?;

        let mut registrations = Vec::new();
        for body in rows {
            registrations.push(serde_json::from_str(&body?)?);
        }
        Ok(registrations)
    }
}
