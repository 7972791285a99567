//! The per-installation session identifier that partitions stored transactions.
//!
//! The identifier is a random token, not a verified identity: anyone who has
//! the string can read and write the transactions stored under it.

use std::fmt::Display;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Error, key_value::KeyValueStore};

/// The storage key the session identifier is persisted under.
pub const SESSION_ID_KEY: &str = "sessionId";

/// An opaque, randomly generated session identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(String);

impl SessionId {
    /// Generate a new random session identifier.
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Wrap an existing identifier, e.g. one read back from storage.
    pub fn new(id: &str) -> Self {
        Self(id.to_owned())
    }

    /// The identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for SessionId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Creates and remembers the session identifier.
///
/// A provider without storage is "detached": it never finds a persisted
/// identifier and cannot remember a new one.
#[derive(Debug, Clone)]
pub struct SessionIdentityProvider<S> {
    storage: Option<S>,
}

impl<S: KeyValueStore> SessionIdentityProvider<S> {
    /// Create a provider that persists the identifier in `storage`.
    pub fn new(storage: S) -> Self {
        Self {
            storage: Some(storage),
        }
    }

    /// Create a provider with no storage attached.
    pub fn detached() -> Self {
        Self { storage: None }
    }

    /// Read the persisted session identifier without creating one.
    ///
    /// Returns `None` if no identifier has been persisted, if the provider is
    /// detached or if storage could not be read.
    pub fn get_session_id(&self) -> Option<SessionId> {
        self.read_session_id().unwrap_or_else(|error| {
            tracing::error!("Could not read the session ID: {error}");
            None
        })
    }

    /// Get the persisted session identifier, generating and persisting a new
    /// one if none exists.
    ///
    /// If storage cannot be read, a temporary identifier is returned and
    /// nothing is written, so an existing identifier is never replaced. If a
    /// new identifier cannot be persisted it is still returned, but the next
    /// call will generate a different one.
    pub fn get_or_create_session_id(&self) -> SessionId {
        let storage = match &self.storage {
            Some(storage) => storage,
            None => {
                let session_id = SessionId::generate();
                tracing::warn!("No storage attached, session {session_id} will not persist");
                return session_id;
            }
        };

        match self.read_session_id() {
            Ok(Some(session_id)) => return session_id,
            Ok(None) => {}
            Err(error) => {
                let session_id = SessionId::generate();
                tracing::error!(
                    "Could not read the session ID, using temporary session {session_id}: {error}"
                );
                return session_id;
            }
        }

        let session_id = SessionId::generate();

        match storage.set(SESSION_ID_KEY, session_id.as_str()) {
            Ok(()) => tracing::info!("Created new session {session_id}"),
            Err(error) => tracing::error!("Could not persist new session ID: {error}"),
        }

        session_id
    }

    fn read_session_id(&self) -> Result<Option<SessionId>, Error> {
        let Some(storage) = &self.storage else {
            return Ok(None);
        };

        let session_id = storage
            .get(SESSION_ID_KEY)?
            .filter(|id| !id.is_empty())
            .map(SessionId);

        Ok(session_id)
    }
}
