//! Implements a struct that ties the session, the repository and the clock
//! together for the application front ends.

use std::sync::{Arc, Mutex};

use rusqlite::Connection;

use crate::{
    Error,
    analytics::{MonthlyBucket, SortConfig, filter_by_text, monthly_expense_buckets},
    clock::Clock,
    db::initialize,
    document::SQLiteDocumentStore,
    key_value::SQLiteKeyValueStore,
    quota::{QuotaGuard, QuotaLimits},
    repository::TransactionRepository,
    session::{SessionId, SessionIdentityProvider},
    transaction::{NewTransaction, Transaction, TransactionId},
};

/// A clock that can be shared between the components of [AppState].
pub type SharedClock = Arc<dyn Clock + Send + Sync>;

/// The state of the application.
#[derive(Clone)]
pub struct AppState {
    sessions: SessionIdentityProvider<SQLiteKeyValueStore>,
    repository: TransactionRepository<SQLiteDocumentStore, SQLiteKeyValueStore, SharedClock>,
    clock: SharedClock,
}

impl AppState {
    /// Create a new [AppState] with a SQLite database connection.
    ///
    /// This function will initialize the database by adding the tables for
    /// documents and key-value pairs. Quota counters are checked against
    /// `limits` and reset on the dates reported by `clock`.
    ///
    /// # Errors
    /// Returns an error if the database cannot be initialized.
    pub fn new(
        db_connection: Connection,
        clock: SharedClock,
        limits: QuotaLimits,
    ) -> Result<Self, Error> {
        initialize(&db_connection)?;

        let connection = Arc::new(Mutex::new(db_connection));
        let key_value_store = SQLiteKeyValueStore::new(connection.clone());

        Ok(Self {
            sessions: SessionIdentityProvider::new(key_value_store.clone()),
            repository: TransactionRepository::new(
                SQLiteDocumentStore::new(connection),
                QuotaGuard::new(key_value_store, clock.clone()),
                limits,
            ),
            clock,
        })
    }

    /// The clock used for quotas, date fallbacks and summaries.
    pub fn clock(&self) -> &SharedClock {
        &self.clock
    }

    /// The persisted session, if one has been started.
    pub fn session_id(&self) -> Option<SessionId> {
        self.sessions.get_session_id()
    }

    /// Get the persisted session, creating one if none exists.
    pub fn start_session(&self) -> SessionId {
        self.sessions.get_or_create_session_id()
    }

    /// Add `transaction` to the current session.
    ///
    /// # Errors
    /// This function will return a:
    /// - [Error::SessionMissing] if no session has been started,
    /// - [Error::QuotaExceeded] if today's add allowance has been used,
    /// - or [Error::StoreUnavailable] if the transaction could not be stored.
    pub fn add_transaction(&self, transaction: &NewTransaction) -> Result<TransactionId, Error> {
        let session_id = self.require_session()?;

        self.repository.append(&session_id, transaction)
    }

    /// Get every transaction of the current session in stored order.
    ///
    /// # Errors
    /// This function will return a:
    /// - [Error::SessionMissing] if no session has been started,
    /// - [Error::QuotaExceeded] if today's list allowance has been used,
    /// - or [Error::StoreUnavailable] if the transactions could not be read.
    pub fn transactions(&self) -> Result<Vec<Transaction>, Error> {
        let session_id = self.require_session()?;

        self.repository.list_all(&session_id)
    }

    /// Get the transactions of the current session whose description matches
    /// `search`, sorted by `sort`.
    ///
    /// # Errors
    /// Returns the same errors as [AppState::transactions].
    pub fn transaction_view(
        &self,
        search: &str,
        sort: SortConfig,
    ) -> Result<Vec<Transaction>, Error> {
        let transactions = self.transactions()?;

        Ok(sort.apply(&filter_by_text(&transactions, search)))
    }

    /// Get the expense totals of the last six months, ending with the clock's
    /// current month.
    ///
    /// # Errors
    /// Returns the same errors as [AppState::transactions].
    pub fn monthly_summary(&self) -> Result<Vec<MonthlyBucket>, Error> {
        let transactions = self.transactions()?;

        Ok(monthly_expense_buckets(&transactions, self.clock.today()))
    }

    fn require_session(&self) -> Result<SessionId, Error> {
        self.sessions.get_session_id().ok_or_else(|| {
            tracing::error!("Session ID not found");
            Error::SessionMissing
        })
    }
}
