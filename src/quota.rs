//! Fixed-window daily quotas for store operations.
//!
//! Each counter allows a fixed number of operations per local calendar day and
//! resets at midnight. Counters live in a [KeyValueStore], so anyone who can
//! clear that storage can reset them: the guard protects against runaway
//! usage, not against abuse.

use std::fmt::Display;

use time::{Date, format_description::BorrowedFormatItem, macros::format_description};

use crate::{Error, clock::Clock, key_value::KeyValueStore, session::SessionId};

/// The maximum number of transactions a session may add per day.
pub const DEFAULT_ADD_LIMIT: u32 = 100;

/// The maximum number of times a session may list its transactions per day.
pub const DEFAULT_LIST_LIMIT: u32 = 1000;

const DATE_FORMAT: &[BorrowedFormatItem] = format_description!("[year]-[month]-[day]");

/// The daily ceilings applied to repository operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuotaLimits {
    /// How many transactions may be added per session per day.
    pub add: u32,
    /// How many times transactions may be listed per session per day.
    pub list: u32,
}

impl Default for QuotaLimits {
    fn default() -> Self {
        Self {
            add: DEFAULT_ADD_LIMIT,
            list: DEFAULT_LIST_LIMIT,
        }
    }
}

/// Identifies one quota counter: an operation performed by a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CounterKey<'a> {
    operation: &'a str,
    session_id: &'a SessionId,
}

impl<'a> CounterKey<'a> {
    /// The counter for `operation` (e.g. "add") performed by `session_id`.
    pub fn new(operation: &'a str, session_id: &'a SessionId) -> Self {
        Self {
            operation,
            session_id,
        }
    }

    /// The operation this counter limits.
    pub fn operation(&self) -> &str {
        self.operation
    }

    fn count_key(&self) -> String {
        format!("{}Count_{}", self.operation, self.session_id)
    }

    fn date_key(&self) -> String {
        format!("{}Count_{}_date", self.operation, self.session_id)
    }
}

impl Display for CounterKey<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.operation, self.session_id)
    }
}

/// Gates operations against per-key daily ceilings.
#[derive(Debug, Clone)]
pub struct QuotaGuard<S, C> {
    storage: S,
    clock: C,
}

impl<S: KeyValueStore, C: Clock> QuotaGuard<S, C> {
    /// Create a guard that keeps its counters in `storage` and reads the
    /// current date from `clock`.
    pub fn new(storage: S, clock: C) -> Self {
        Self { storage, clock }
    }

    /// The clock used to decide which day it is.
    pub fn clock(&self) -> &C {
        &self.clock
    }

    /// Try to use one unit of today's allowance for `counter_key`.
    ///
    /// Returns `true` and records the use if fewer than `daily_limit` uses
    /// have been recorded today, otherwise returns `false` and leaves the
    /// counter unchanged. The first use on a new day is always permitted.
    ///
    /// Storage failures are logged and the use is permitted. A counter that
    /// could not be read is left as it is.
    pub fn try_consume(&self, counter_key: &CounterKey, daily_limit: u32) -> bool {
        let today = self.clock.today();

        let counter = match self.read_counter(counter_key) {
            Ok(counter) => counter,
            Err(error) => {
                tracing::error!("Could not read quota counter {counter_key}: {error}");
                return true;
            }
        };

        let next_count = match counter {
            Some((count, last_reset)) if last_reset == today => {
                if count >= daily_limit {
                    tracing::warn!("Daily limit of {daily_limit} reached for {counter_key}");
                    return false;
                }

                count + 1
            }
            _ => 1,
        };

        self.write_counter(counter_key, next_count, today);
        tracing::debug!("{counter_key} used {next_count} of {daily_limit} for {today}");

        true
    }

    /// The number of uses recorded for `counter_key` today.
    pub fn used_today(&self, counter_key: &CounterKey) -> u32 {
        match self.read_counter(counter_key) {
            Ok(Some((count, last_reset))) if last_reset == self.clock.today() => count,
            Ok(_) => 0,
            Err(error) => {
                tracing::error!("Could not read quota counter {counter_key}: {error}");
                0
            }
        }
    }

    /// Read the stored count and reset date.
    ///
    /// Missing or unparseable values are `Ok(None)`, only storage failures
    /// are errors.
    fn read_counter(&self, counter_key: &CounterKey) -> Result<Option<(u32, Date)>, Error> {
        let count = self.storage.get(&counter_key.count_key())?;
        let date = self.storage.get(&counter_key.date_key())?;

        let counter = count
            .and_then(|count| count.parse::<u32>().ok())
            .zip(date.and_then(|date| Date::parse(&date, DATE_FORMAT).ok()));

        Ok(counter)
    }

    fn write_counter(&self, counter_key: &CounterKey, count: u32, date: Date) {
        let date = match date.format(DATE_FORMAT) {
            Ok(date) => date,
            Err(error) => {
                tracing::error!("Could not format quota date {date}: {error}");
                return;
            }
        };

        let result = self
            .storage
            .set(&counter_key.count_key(), &count.to_string())
            .and_then(|_| self.storage.set(&counter_key.date_key(), &date));

        if let Err(error) = result {
            tracing::error!("Could not save quota counter {counter_key}: {error}");
        }
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;

    use time::{Date, Duration, OffsetDateTime, UtcOffset, macros::date};

    use crate::{
        Error,
        clock::Clock,
        key_value::{InMemoryKeyValueStore, KeyValueStore},
        quota::{CounterKey, QuotaGuard},
        session::SessionId,
    };

    /// A clock whose date can be moved forward during a test.
    struct SteppingClock(Cell<Date>);

    impl SteppingClock {
        fn new(date: Date) -> Self {
            Self(Cell::new(date))
        }

        fn advance_days(&self, days: i64) {
            self.0.set(self.0.get() + Duration::days(days));
        }
    }

    impl Clock for SteppingClock {
        fn now(&self) -> OffsetDateTime {
            self.0.get().midnight().assume_offset(UtcOffset::UTC)
        }
    }

    struct ReadOnlyStore;

    impl KeyValueStore for ReadOnlyStore {
        fn get(&self, _key: &str) -> Result<Option<String>, Error> {
            Ok(None)
        }

        fn set(&self, _key: &str, _value: &str) -> Result<(), Error> {
            Err(Error::StoreUnavailable("read only".to_owned()))
        }
    }

    /// Fails every read and records whether anything was written.
    #[derive(Default)]
    struct UnreadableStore {
        written: Cell<bool>,
    }

    impl KeyValueStore for UnreadableStore {
        fn get(&self, _key: &str) -> Result<Option<String>, Error> {
            Err(Error::StoreUnavailable("database is locked".to_owned()))
        }

        fn set(&self, _key: &str, _value: &str) -> Result<(), Error> {
            self.written.set(true);
            Ok(())
        }
    }

    fn session() -> SessionId {
        SessionId::new("test-session")
    }

    #[test]
    fn permits_exactly_limit_calls_per_day() {
        let store = InMemoryKeyValueStore::new();
        let clock = SteppingClock::new(date!(2024 - 03 - 15));
        let guard = QuotaGuard::new(&store, &clock);
        let session = session();
        let key = CounterKey::new("add", &session);

        for limit in [1, 5, 100] {
            let session = SessionId::new(&format!("session-{limit}"));
            let key = CounterKey::new("add", &session);

            for i in 0..limit {
                assert!(guard.try_consume(&key, limit), "call {i} should pass");
            }
            assert!(!guard.try_consume(&key, limit));
        }

        assert!(guard.try_consume(&key, 1));
    }

    #[test]
    fn rejection_leaves_counter_unchanged() {
        let store = InMemoryKeyValueStore::new();
        let clock = SteppingClock::new(date!(2024 - 03 - 15));
        let guard = QuotaGuard::new(&store, &clock);
        let session = session();
        let key = CounterKey::new("get", &session);

        assert!(guard.try_consume(&key, 2));
        assert!(guard.try_consume(&key, 2));
        assert!(!guard.try_consume(&key, 2));
        assert!(!guard.try_consume(&key, 2));

        assert_eq!(guard.used_today(&key), 2);
        assert_eq!(store.get("getCount_test-session"), Ok(Some("2".to_owned())));
        assert_eq!(
            store.get("getCount_test-session_date"),
            Ok(Some("2024-03-15".to_owned()))
        );
    }

    #[test]
    fn new_day_resets_counter_to_one() {
        let store = InMemoryKeyValueStore::new();
        let clock = SteppingClock::new(date!(2024 - 03 - 15));
        let guard = QuotaGuard::new(&store, &clock);
        let session = session();
        let key = CounterKey::new("add", &session);

        for _ in 0..3 {
            assert!(guard.try_consume(&key, 3));
        }
        assert!(!guard.try_consume(&key, 3));

        clock.advance_days(1);

        assert!(guard.try_consume(&key, 3));
        assert_eq!(guard.used_today(&key), 1);
        assert!(guard.try_consume(&key, 3));
        assert!(guard.try_consume(&key, 3));
        assert!(!guard.try_consume(&key, 3));
    }

    #[test]
    fn first_call_of_day_passes_even_with_zero_limit() {
        let store = InMemoryKeyValueStore::new();
        let clock = SteppingClock::new(date!(2024 - 03 - 15));
        let guard = QuotaGuard::new(&store, &clock);
        let session = session();
        let key = CounterKey::new("add", &session);

        assert!(guard.try_consume(&key, 0));
        assert!(!guard.try_consume(&key, 0));
    }

    #[test]
    fn counters_are_independent_per_operation_and_session() {
        let store = InMemoryKeyValueStore::new();
        let clock = SteppingClock::new(date!(2024 - 03 - 15));
        let guard = QuotaGuard::new(&store, &clock);
        let alice = SessionId::new("alice");
        let bob = SessionId::new("bob");

        assert!(guard.try_consume(&CounterKey::new("add", &alice), 1));
        assert!(!guard.try_consume(&CounterKey::new("add", &alice), 1));

        assert!(guard.try_consume(&CounterKey::new("get", &alice), 1));
        assert!(guard.try_consume(&CounterKey::new("add", &bob), 1));
    }

    #[test]
    fn corrupt_counter_is_treated_as_missing() {
        let store = InMemoryKeyValueStore::new();
        store.set("addCount_test-session", "lots").unwrap();
        store
            .set("addCount_test-session_date", "2024-03-15")
            .unwrap();
        let clock = SteppingClock::new(date!(2024 - 03 - 15));
        let guard = QuotaGuard::new(&store, &clock);
        let session = session();
        let key = CounterKey::new("add", &session);

        assert!(guard.try_consume(&key, 1));
        assert_eq!(store.get("addCount_test-session"), Ok(Some("1".to_owned())));
    }

    #[test]
    fn write_failures_permit_the_call() {
        let clock = SteppingClock::new(date!(2024 - 03 - 15));
        let guard = QuotaGuard::new(ReadOnlyStore, &clock);
        let session = session();
        let key = CounterKey::new("add", &session);

        assert!(guard.try_consume(&key, 1));
        assert!(guard.try_consume(&key, 1));
    }

    #[test]
    fn read_failures_permit_the_call_without_resetting_the_counter() {
        let store = UnreadableStore::default();
        let clock = SteppingClock::new(date!(2024 - 03 - 15));
        let guard = QuotaGuard::new(&store, &clock);
        let session = session();
        let key = CounterKey::new("add", &session);

        assert!(guard.try_consume(&key, 1));
        assert!(guard.try_consume(&key, 1));
        assert!(!store.written.get());
        assert_eq!(guard.used_today(&key), 0);
    }

    #[test]
    fn counter_key_displays_operation_and_session() {
        let session = session();

        assert_eq!(
            CounterKey::new("add", &session).to_string(),
            "add:test-session"
        );
    }
}
