//! A minimal document store: named collections of JSON documents that keep
//! their insertion order.

use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};

use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::Error;

/// A document read back from a collection.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredDocument {
    /// The identifier the store assigned when the document was added.
    pub id: String,
    /// The document body.
    pub data: Value,
}

/// The operations consumed from a document database.
pub trait DocumentStore {
    /// Add `document` to `collection` and return the identifier assigned to it.
    ///
    /// # Errors
    /// Returns [Error::StoreUnavailable] if the document could not be written.
    fn add_document(&self, collection: &str, document: Value) -> Result<String, Error>;

    /// Get every document in `collection`, in the order they were added.
    ///
    /// # Errors
    /// Returns [Error::StoreUnavailable] if the collection could not be read.
    fn list_documents(&self, collection: &str) -> Result<Vec<StoredDocument>, Error>;
}

impl<D: DocumentStore + ?Sized> DocumentStore for &D {
    fn add_document(&self, collection: &str, document: Value) -> Result<String, Error> {
        (**self).add_document(collection, document)
    }

    fn list_documents(&self, collection: &str) -> Result<Vec<StoredDocument>, Error> {
        (**self).list_documents(collection)
    }
}

/// The store's native timestamp representation: whole seconds since the Unix
/// epoch plus a nanosecond remainder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreTimestamp {
    /// Seconds since 1970-01-01T00:00:00Z.
    pub seconds: i64,
    /// Non-negative nanoseconds within the second.
    pub nanoseconds: u32,
}

impl StoreTimestamp {
    /// Convert to a date-time in UTC.
    ///
    /// Returns `None` if the timestamp is outside the supported range.
    pub fn to_date_time(self) -> Option<OffsetDateTime> {
        if self.nanoseconds >= 1_000_000_000 {
            return None;
        }

        let nanos = i128::from(self.seconds) * 1_000_000_000 + i128::from(self.nanoseconds);

        OffsetDateTime::from_unix_timestamp_nanos(nanos).ok()
    }
}

impl From<OffsetDateTime> for StoreTimestamp {
    fn from(value: OffsetDateTime) -> Self {
        Self {
            seconds: value.unix_timestamp(),
            nanoseconds: value.nanosecond(),
        }
    }
}

fn generate_document_id() -> String {
    Uuid::new_v4().simple().to_string()
}

/// A [DocumentStore] that keeps documents in memory for the lifetime of the process.
#[derive(Debug, Default)]
pub struct InMemoryDocumentStore {
    collections: Mutex<HashMap<String, Vec<StoredDocument>>>,
}

impl InMemoryDocumentStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

impl DocumentStore for InMemoryDocumentStore {
    fn add_document(&self, collection: &str, document: Value) -> Result<String, Error> {
        let mut collections = self.collections.lock().unwrap_or_else(|e| e.into_inner());
        let id = generate_document_id();

        collections
            .entry(collection.to_owned())
            .or_default()
            .push(StoredDocument {
                id: id.clone(),
                data: document,
            });

        Ok(id)
    }

    fn list_documents(&self, collection: &str) -> Result<Vec<StoredDocument>, Error> {
        let collections = self.collections.lock().unwrap_or_else(|e| e.into_inner());

        Ok(collections.get(collection).cloned().unwrap_or_default())
    }
}

/// A [DocumentStore] backed by the `document` table of a SQLite database.
#[derive(Debug, Clone)]
pub struct SQLiteDocumentStore {
    connection: Arc<Mutex<Connection>>,
}

impl SQLiteDocumentStore {
    /// Create a store over `connection`.
    ///
    /// The database must have been set up with [crate::initialize_db].
    pub fn new(connection: Arc<Mutex<Connection>>) -> Self {
        Self { connection }
    }
}

impl DocumentStore for SQLiteDocumentStore {
    fn add_document(&self, collection: &str, document: Value) -> Result<String, Error> {
        let connection = self
            .connection
            .lock()
            .map_err(|_| Error::StoreUnavailable("could not acquire the database lock".to_owned()))?;

        let id = generate_document_id();
        let body = serde_json::to_string(&document)?;

        connection.execute(
            "INSERT INTO document (id, collection, body) VALUES (?1, ?2, ?3)",
            (&id, collection, body),
        )?;

        Ok(id)
    }

    fn list_documents(&self, collection: &str) -> Result<Vec<StoredDocument>, Error> {
        let connection = self
            .connection
            .lock()
            .map_err(|_| Error::StoreUnavailable("could not acquire the database lock".to_owned()))?;

        let rows = connection
            .prepare(
                "SELECT id, body FROM document WHERE collection = :collection ORDER BY position ASC",
            )?
            .query_map(&[(":collection", collection)], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
            })?
            .collect::<Result<Vec<_>, rusqlite::Error>>()?;

        rows.into_iter()
            .map(|(id, body)| -> Result<StoredDocument, Error> {
                Ok(StoredDocument {
                    id,
                    data: serde_json::from_str(&body)?,
                })
            })
            .collect()
    }
}

/// Create the document table in the database.
///
/// # Errors
/// Returns an error if the table cannot be created or if there is an SQL error.
pub fn create_document_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS document (
                position INTEGER PRIMARY KEY AUTOINCREMENT,
                id TEXT NOT NULL UNIQUE,
                collection TEXT NOT NULL,
                body TEXT NOT NULL
                )",
        (),
    )?;

    connection.execute(
        "CREATE INDEX IF NOT EXISTS idx_document_collection ON document(collection, position);",
        (),
    )?;

    Ok(())
}
