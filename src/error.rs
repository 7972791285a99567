//! Defines the app level error type.

/// The errors that may occur in the application.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum Error {
    /// The daily ceiling for an operation has been reached for the session.
    ///
    /// The counter resets on the next calendar day, so the caller may try
    /// again tomorrow.
    #[error("the daily limit for \"{0}\" has been reached")]
    QuotaExceeded(String),

    /// The document store could not complete the request.
    ///
    /// The string holds the underlying error message. It should be logged
    /// and replaced with a generic failure message when shown to a user.
    #[error("the transaction store is unavailable: {0}")]
    StoreUnavailable(String),

    /// No session identifier has been persisted yet, so there is no
    /// partition to read from or write to.
    #[error("session ID not found")]
    SessionMissing,

    /// A transaction was created with an amount that is zero, negative or
    /// not a finite number.
    #[error("{0} is not a valid amount, amounts must be positive")]
    NonPositiveAmount(f64),

    /// A transaction description had fewer than two characters.
    #[error("description must be at least 2 characters")]
    DescriptionTooShort,

    /// A string other than "income" or "expense" was used as a transaction
    /// kind.
    #[error("\"{0}\" is not a transaction type, expected \"income\" or \"expense\"")]
    InvalidTransactionKind(String),

    /// A string could not be parsed as a sort key or sort direction.
    #[error("\"{0}\" is not a valid sort option")]
    InvalidSortOption(String),

    /// An error occurred while getting the local timezone from a canonical timezone string.
    #[error("invalid timezone {0}")]
    InvalidTimezone(String),
}

impl From<rusqlite::Error> for Error {
    fn from(value: rusqlite::Error) -> Self {
        tracing::error!("an unexpected SQL error occurred: {value}");
        Error::StoreUnavailable(value.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(value: serde_json::Error) -> Self {
        Error::StoreUnavailable(format!("could not encode document: {value}"))
    }
}
