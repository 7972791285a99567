//! Stores and retrieves a session's transactions, subject to daily quotas.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use time::OffsetDateTime;

use crate::{
    Error,
    clock::Clock,
    document::{DocumentStore, StoreTimestamp, StoredDocument},
    key_value::KeyValueStore,
    quota::{CounterKey, QuotaGuard, QuotaLimits},
    session::SessionId,
    transaction::{Description, NewTransaction, Transaction, TransactionId, TransactionKind},
};

/// The quota operation name for appending transactions.
pub const ADD_OPERATION: &str = "add";

/// The quota operation name for listing transactions.
pub const LIST_OPERATION: &str = "get";

/// The collection that holds the transactions of `session_id`.
pub fn transactions_collection(session_id: &SessionId) -> String {
    format!("users/{session_id}/transactions")
}

/// The document layout written to the store.
#[derive(Serialize)]
struct TransactionDocument<'a> {
    amount: f64,
    date: StoreTimestamp,
    description: &'a str,
    #[serde(rename = "type")]
    kind: TransactionKind,
}

/// The document layout read back from the store.
///
/// The date is kept as a raw value since older or hand-edited documents may
/// not hold a valid timestamp.
#[derive(Deserialize)]
struct StoredTransaction {
    amount: f64,
    #[serde(default)]
    date: Option<Value>,
    description: String,
    #[serde(rename = "type")]
    kind: TransactionKind,
}

/// Appends and lists transactions in a [DocumentStore], one collection per
/// session, checking a [QuotaGuard] before every store call.
#[derive(Debug, Clone)]
pub struct TransactionRepository<D, S, C> {
    store: D,
    quota: QuotaGuard<S, C>,
    limits: QuotaLimits,
}

impl<D, S, C> TransactionRepository<D, S, C>
where
    D: DocumentStore,
    S: KeyValueStore,
    C: Clock,
{
    /// Create a repository over `store` that enforces `limits` with `quota`.
    pub fn new(store: D, quota: QuotaGuard<S, C>, limits: QuotaLimits) -> Self {
        Self {
            store,
            quota,
            limits,
        }
    }

    /// The daily limits this repository enforces.
    pub fn limits(&self) -> QuotaLimits {
        self.limits
    }

    /// Append `transaction` to the transactions of `session_id`.
    ///
    /// Returns the identifier the store assigned to the new transaction.
    ///
    /// # Errors
    /// This function will return a:
    /// - [Error::QuotaExceeded] if the session has used today's add allowance,
    ///   in which case the store is not called,
    /// - or [Error::StoreUnavailable] if the store could not write the document.
    pub fn append(
        &self,
        session_id: &SessionId,
        transaction: &NewTransaction,
    ) -> Result<TransactionId, Error> {
        let counter_key = CounterKey::new(ADD_OPERATION, session_id);
        if !self.quota.try_consume(&counter_key, self.limits.add) {
            return Err(Error::QuotaExceeded(ADD_OPERATION.to_owned()));
        }

        let document = serde_json::to_value(TransactionDocument {
            amount: transaction.amount(),
            date: transaction.date().into(),
            description: transaction.description().as_ref(),
            kind: transaction.kind(),
        })?;

        let id = self
            .store
            .add_document(&transactions_collection(session_id), document)?;
        tracing::info!("Added transaction {id} for session {session_id}");

        Ok(TransactionId::new(&id))
    }

    /// Get every transaction of `session_id` in the order the store returns them.
    ///
    /// Dates are converted to the clock's local offset. A document whose date
    /// is missing or cannot be read is given the current time instead, and a
    /// document whose other fields cannot be read is skipped. Both cases are
    /// logged as warnings.
    ///
    /// # Errors
    /// This function will return a:
    /// - [Error::QuotaExceeded] if the session has used today's list allowance,
    ///   in which case the store is not called,
    /// - or [Error::StoreUnavailable] if the store could not be read.
    pub fn list_all(&self, session_id: &SessionId) -> Result<Vec<Transaction>, Error> {
        let counter_key = CounterKey::new(LIST_OPERATION, session_id);
        if !self.quota.try_consume(&counter_key, self.limits.list) {
            return Err(Error::QuotaExceeded(LIST_OPERATION.to_owned()));
        }

        let documents = self
            .store
            .list_documents(&transactions_collection(session_id))?;
        tracing::debug!(
            "Fetched {} documents for session {session_id}",
            documents.len()
        );

        Ok(documents
            .into_iter()
            .filter_map(|document| self.map_document(document))
            .collect())
    }

    fn map_document(&self, document: StoredDocument) -> Option<Transaction> {
        let stored: StoredTransaction = match serde_json::from_value(document.data) {
            Ok(stored) => stored,
            Err(error) => {
                tracing::warn!("Skipping malformed transaction {}: {error}", document.id);
                return None;
            }
        };

        Some(Transaction {
            date: self.normalize_date(&document.id, stored.date),
            id: TransactionId::new(&document.id),
            amount: stored.amount,
            description: Description::new_unchecked(&stored.description),
            kind: stored.kind,
        })
    }

    fn normalize_date(&self, id: &str, date: Option<Value>) -> OffsetDateTime {
        let clock = self.quota.clock();

        let parsed = date
            .and_then(|value| serde_json::from_value::<StoreTimestamp>(value).ok())
            .and_then(StoreTimestamp::to_date_time);

        match parsed {
            Some(date) => date.to_offset(clock.offset()),
            None => {
                tracing::warn!("Transaction {id} has a missing or invalid date, using now");
                clock.now()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;

    use serde_json::{Value, json};
    use time::{
        UtcOffset,
        macros::{date, datetime},
    };

    use crate::{
        Error,
        clock::FixedClock,
        document::{DocumentStore, InMemoryDocumentStore, StoredDocument},
        key_value::{InMemoryKeyValueStore, KeyValueStore},
        quota::{QuotaGuard, QuotaLimits},
        repository::{TransactionRepository, transactions_collection},
        session::SessionId,
        transaction::{NewTransaction, TransactionKind},
    };

    /// Wraps a store and counts the calls made to it.
    #[derive(Default)]
    struct CountingStore {
        inner: InMemoryDocumentStore,
        calls: Cell<usize>,
    }

    impl DocumentStore for CountingStore {
        fn add_document(&self, collection: &str, document: Value) -> Result<String, Error> {
            self.calls.set(self.calls.get() + 1);
            self.inner.add_document(collection, document)
        }

        fn list_documents(&self, collection: &str) -> Result<Vec<StoredDocument>, Error> {
            self.calls.set(self.calls.get() + 1);
            self.inner.list_documents(collection)
        }
    }

    struct UnavailableStore;

    impl DocumentStore for UnavailableStore {
        fn add_document(&self, _collection: &str, _document: Value) -> Result<String, Error> {
            Err(Error::StoreUnavailable("network down".to_owned()))
        }

        fn list_documents(&self, _collection: &str) -> Result<Vec<StoredDocument>, Error> {
            Err(Error::StoreUnavailable("network down".to_owned()))
        }
    }

    fn clock() -> FixedClock {
        FixedClock(datetime!(2024-03-15 12:00 +13))
    }

    fn new_repository<'a, D: DocumentStore>(
        store: D,
        counters: &'a InMemoryKeyValueStore,
    ) -> TransactionRepository<D, &'a InMemoryKeyValueStore, FixedClock> {
        TransactionRepository::new(
            store,
            QuotaGuard::new(counters, clock()),
            QuotaLimits::default(),
        )
    }

    fn coffee() -> NewTransaction {
        NewTransaction::new(
            4.5,
            datetime!(2024-03-14 08:00 +13),
            "Coffee",
            TransactionKind::Expense,
        )
        .unwrap()
    }

    #[test]
    fn append_then_list_returns_transaction() {
        let counters = InMemoryKeyValueStore::new();
        let repository = new_repository(InMemoryDocumentStore::new(), &counters);
        let session = SessionId::new("abc");

        let id = repository.append(&session, &coffee()).unwrap();
        let got = repository.list_all(&session).unwrap();

        assert_eq!(got, vec![coffee().with_id(id)]);
    }

    #[test]
    fn append_writes_expected_document() {
        let counters = InMemoryKeyValueStore::new();
        let store = InMemoryDocumentStore::new();
        let repository = new_repository(&store, &counters);
        let session = SessionId::new("abc");

        repository.append(&session, &coffee()).unwrap();

        let documents = store.list_documents("users/abc/transactions").unwrap();
        assert_eq!(documents.len(), 1);
        assert_eq!(
            documents[0].data,
            json!({
                "amount": 4.5,
                "date": { "seconds": 1710356400, "nanoseconds": 0 },
                "description": "Coffee",
                "type": "expense",
            })
        );
    }

    #[test]
    fn append_fails_without_store_call_when_quota_used() {
        let counters = InMemoryKeyValueStore::new();
        counters.set("addCount_abc", "100").unwrap();
        counters.set("addCount_abc_date", "2024-03-15").unwrap();
        let store = CountingStore::default();
        let repository = new_repository(&store, &counters);

        let result = repository.append(&SessionId::new("abc"), &coffee());

        assert_eq!(result, Err(Error::QuotaExceeded("add".to_owned())));
        assert_eq!(store.calls.get(), 0);
        assert_eq!(counters.get("addCount_abc"), Ok(Some("100".to_owned())));
    }

    #[test]
    fn append_succeeds_when_quota_is_from_yesterday() {
        let counters = InMemoryKeyValueStore::new();
        counters.set("addCount_abc", "100").unwrap();
        counters.set("addCount_abc_date", "2024-03-14").unwrap();
        let store = CountingStore::default();
        let repository = new_repository(&store, &counters);

        let result = repository.append(&SessionId::new("abc"), &coffee());

        assert!(result.is_ok());
        assert_eq!(store.calls.get(), 1);
        assert_eq!(counters.get("addCount_abc"), Ok(Some("1".to_owned())));
    }

    #[test]
    fn list_fails_without_store_call_when_quota_used() {
        let counters = InMemoryKeyValueStore::new();
        counters.set("getCount_abc", "1000").unwrap();
        counters.set("getCount_abc_date", "2024-03-15").unwrap();
        let store = CountingStore::default();
        let repository = new_repository(&store, &counters);

        let result = repository.list_all(&SessionId::new("abc"));

        assert_eq!(result, Err(Error::QuotaExceeded("get".to_owned())));
        assert_eq!(store.calls.get(), 0);
    }

    #[test]
    fn each_call_uses_one_unit_of_its_own_counter() {
        let counters = InMemoryKeyValueStore::new();
        let repository = new_repository(InMemoryDocumentStore::new(), &counters);
        let session = SessionId::new("abc");

        repository.append(&session, &coffee()).unwrap();
        repository.append(&session, &coffee()).unwrap();
        repository.list_all(&session).unwrap();

        assert_eq!(counters.get("addCount_abc"), Ok(Some("2".to_owned())));
        assert_eq!(counters.get("getCount_abc"), Ok(Some("1".to_owned())));
    }

    #[test]
    fn store_errors_are_propagated() {
        let counters = InMemoryKeyValueStore::new();
        let repository = new_repository(UnavailableStore, &counters);
        let session = SessionId::new("abc");

        assert_eq!(
            repository.append(&session, &coffee()),
            Err(Error::StoreUnavailable("network down".to_owned()))
        );
        assert_eq!(
            repository.list_all(&session),
            Err(Error::StoreUnavailable("network down".to_owned()))
        );
    }

    #[test]
    fn list_uses_now_for_missing_date() {
        let counters = InMemoryKeyValueStore::new();
        let store = InMemoryDocumentStore::new();
        let session = SessionId::new("abc");
        store
            .add_document(
                &transactions_collection(&session),
                json!({ "amount": 10.0, "description": "No date", "type": "income" }),
            )
            .unwrap();
        let repository = new_repository(&store, &counters);

        let got = repository.list_all(&session).unwrap();

        assert_eq!(got.len(), 1);
        assert_eq!(got[0].date, clock().0);
    }

    #[test]
    fn list_uses_now_for_unparseable_date() {
        let counters = InMemoryKeyValueStore::new();
        let store = InMemoryDocumentStore::new();
        let session = SessionId::new("abc");
        store
            .add_document(
                &transactions_collection(&session),
                json!({
                    "amount": 10.0,
                    "date": "last tuesday",
                    "description": "Bad date",
                    "type": "expense",
                }),
            )
            .unwrap();
        let repository = new_repository(&store, &counters);

        let got = repository.list_all(&session).unwrap();

        assert_eq!(got[0].date, clock().0);
    }

    #[test]
    fn list_converts_dates_to_local_offset() {
        let counters = InMemoryKeyValueStore::new();
        let repository = new_repository(InMemoryDocumentStore::new(), &counters);
        let session = SessionId::new("abc");
        let transaction = NewTransaction::new(
            20.0,
            datetime!(2024-01-31 20:00 UTC),
            "Dinner",
            TransactionKind::Expense,
        )
        .unwrap();

        repository.append(&session, &transaction).unwrap();
        let got = repository.list_all(&session).unwrap();

        assert_eq!(got[0].date.offset(), UtcOffset::from_hms(13, 0, 0).unwrap());
        assert_eq!(got[0].date.date(), date!(2024 - 02 - 01));
    }

    #[test]
    fn list_skips_malformed_documents_and_keeps_order() {
        let counters = InMemoryKeyValueStore::new();
        let store = InMemoryDocumentStore::new();
        let session = SessionId::new("abc");
        let collection = transactions_collection(&session);
        for (amount, description) in [(1.0, "first"), (2.0, "second")] {
            store
                .add_document(
                    &collection,
                    json!({ "amount": amount, "description": description, "type": "expense" }),
                )
                .unwrap();
        }
        store
            .add_document(&collection, json!({ "amount": "three", "type": "expense" }))
            .unwrap();
        store
            .add_document(
                &collection,
                json!({ "amount": 4.0, "description": "fourth", "type": "income" }),
            )
            .unwrap();
        let repository = new_repository(&store, &counters);

        let got = repository.list_all(&session).unwrap();

        let descriptions: Vec<_> = got.iter().map(|t| t.description.as_ref()).collect();
        assert_eq!(descriptions, vec!["first", "second", "fourth"]);
    }

    #[test]
    fn sessions_do_not_see_each_other() {
        let counters = InMemoryKeyValueStore::new();
        let repository = new_repository(InMemoryDocumentStore::new(), &counters);

        repository
            .append(&SessionId::new("alice"), &coffee())
            .unwrap();

        assert!(repository.list_all(&SessionId::new("bob")).unwrap().is_empty());
    }
}
