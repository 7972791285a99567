//! String key-value persistence for session identifiers and quota counters.

use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};

use rusqlite::{Connection, OptionalExtension};

use crate::Error;

/// Persistent string storage keyed by string.
///
/// Values are never removed by the application, they are only overwritten.
pub trait KeyValueStore {
    /// Get the value stored under `key`, or `None` if nothing has been stored.
    ///
    /// # Errors
    /// Returns [Error::StoreUnavailable] if the backing storage cannot be read.
    fn get(&self, key: &str) -> Result<Option<String>, Error>;

    /// Store `value` under `key`, replacing any previous value.
    ///
    /// # Errors
    /// Returns [Error::StoreUnavailable] if the backing storage cannot be written.
    fn set(&self, key: &str, value: &str) -> Result<(), Error>;
}

impl<S: KeyValueStore + ?Sized> KeyValueStore for &S {
    fn get(&self, key: &str) -> Result<Option<String>, Error> {
        (**self).get(key)
    }

    fn set(&self, key: &str, value: &str) -> Result<(), Error> {
        (**self).set(key, value)
    }
}

/// A [KeyValueStore] that keeps values in memory for the lifetime of the process.
#[derive(Debug, Default)]
pub struct InMemoryKeyValueStore {
    values: Mutex<HashMap<String, String>>,
}

impl InMemoryKeyValueStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for InMemoryKeyValueStore {
    fn get(&self, key: &str) -> Result<Option<String>, Error> {
        let values = self.values.lock().unwrap_or_else(|e| e.into_inner());

        Ok(values.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), Error> {
        let mut values = self.values.lock().unwrap_or_else(|e| e.into_inner());
        values.insert(key.to_owned(), value.to_owned());

        Ok(())
    }
}

/// A [KeyValueStore] backed by the `key_value` table of a SQLite database.
#[derive(Debug, Clone)]
pub struct SQLiteKeyValueStore {
    connection: Arc<Mutex<Connection>>,
}

impl SQLiteKeyValueStore {
    /// Create a store over `connection`.
    ///
    /// The database must have been set up with [crate::initialize_db].
    pub fn new(connection: Arc<Mutex<Connection>>) -> Self {
        Self { connection }
    }
}

impl KeyValueStore for SQLiteKeyValueStore {
    fn get(&self, key: &str) -> Result<Option<String>, Error> {
        let connection = self
            .connection
            .lock()
            .map_err(|_| Error::StoreUnavailable("could not acquire the database lock".to_owned()))?;

        let value = connection
            .prepare("SELECT value FROM key_value WHERE key = :key")?
            .query_row(&[(":key", key)], |row| row.get(0))
            .optional()?;

        Ok(value)
    }

    fn set(&self, key: &str, value: &str) -> Result<(), Error> {
        let connection = self
            .connection
            .lock()
            .map_err(|_| Error::StoreUnavailable("could not acquire the database lock".to_owned()))?;

        connection.execute(
            "INSERT INTO key_value (key, value) VALUES (?1, ?2)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value",
            (key, value),
        )?;

        Ok(())
    }
}

/// Create the key_value table in the database.
///
/// # Errors
/// Returns an error if the table cannot be created or if there is an SQL error.
pub fn create_key_value_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS key_value (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL
                )",
        (),
    )?;

    Ok(())
}
