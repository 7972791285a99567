//! Defines the core data models for transactions.

use std::{fmt::Display, str::FromStr};

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use unicode_segmentation::UnicodeSegmentation;

use crate::Error;

/// The minimum number of characters in a transaction description.
pub const MIN_DESCRIPTION_LENGTH: usize = 2;

// ============================================================================
// MODELS
// ============================================================================

/// The identifier the document store assigned to a transaction.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TransactionId(String);

impl TransactionId {
    /// Wrap an identifier assigned by the store.
    pub fn new(id: &str) -> Self {
        Self(id.to_owned())
    }

    /// The identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for TransactionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Whether money was earned or spent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionKind {
    /// Money that was earned.
    Income,
    /// Money that was spent.
    Expense,
}

impl TransactionKind {
    /// The lowercase name used in stored documents.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Income => "income",
            Self::Expense => "expense",
        }
    }

    /// The capitalised name shown to users.
    pub fn label(self) -> &'static str {
        match self {
            Self::Income => "Income",
            Self::Expense => "Expense",
        }
    }
}

impl Display for TransactionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for TransactionKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "income" => Ok(Self::Income),
            "expense" => Ok(Self::Expense),
            _ => Err(Error::InvalidTransactionKind(s.to_owned())),
        }
    }
}

/// A validated transaction description with at least
/// [MIN_DESCRIPTION_LENGTH] characters.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, Hash)]
pub struct Description(String);

impl Description {
    /// Create a description.
    ///
    /// Length is counted in grapheme clusters so that, e.g., an emoji with a
    /// skin tone modifier counts as one character. This is stricter than
    /// counting UTF-16 code units: a lone "😀" is one character and is
    /// rejected.
    ///
    /// # Errors
    ///
    /// This function will return an [Error::DescriptionTooShort] if
    /// `description` has fewer than [MIN_DESCRIPTION_LENGTH] characters.
    pub fn new(description: &str) -> Result<Self, Error> {
        if description.graphemes(true).count() < MIN_DESCRIPTION_LENGTH {
            Err(Error::DescriptionTooShort)
        } else {
            Ok(Self(description.to_owned()))
        }
    }

    /// Create a description without validation.
    ///
    /// Used for descriptions read back from the store, which may predate
    /// validation.
    pub fn new_unchecked(description: &str) -> Self {
        Self(description.to_owned())
    }
}

impl AsRef<str> for Description {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Display for Description {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// An expense or income, i.e. an event where money was either spent or earned.
#[derive(Debug, Clone, PartialEq)]
pub struct Transaction {
    /// The ID the store assigned to the transaction.
    pub id: TransactionId,
    /// The amount of money spent or earned, always positive.
    pub amount: f64,
    /// When the transaction happened.
    pub date: OffsetDateTime,
    /// A text description of what the transaction was for.
    pub description: Description,
    /// Whether the money was earned or spent.
    pub kind: TransactionKind,
}

/// A transaction that has not been stored yet.
///
/// To create a new `NewTransaction`, use [NewTransaction::new].
#[derive(Debug, Clone, PartialEq)]
pub struct NewTransaction {
    amount: f64,
    date: OffsetDateTime,
    description: Description,
    kind: TransactionKind,
}

impl NewTransaction {
    /// Create a transaction ready to be appended to the repository.
    ///
    /// # Errors
    /// This function will return a:
    /// - [Error::NonPositiveAmount] if `amount` is not a positive, finite number,
    /// - or [Error::DescriptionTooShort] if `description` has fewer than two characters.
    pub fn new(
        amount: f64,
        date: OffsetDateTime,
        description: &str,
        kind: TransactionKind,
    ) -> Result<Self, Error> {
        if !amount.is_finite() || amount <= 0.0 {
            return Err(Error::NonPositiveAmount(amount));
        }

        Ok(Self {
            amount,
            date,
            description: Description::new(description)?,
            kind,
        })
    }

    /// The amount of money spent or earned.
    pub fn amount(&self) -> f64 {
        self.amount
    }

    /// When the transaction happened.
    pub fn date(&self) -> OffsetDateTime {
        self.date
    }

    /// What the transaction was for.
    pub fn description(&self) -> &Description {
        &self.description
    }

    /// Whether the money was earned or spent.
    pub fn kind(&self) -> TransactionKind {
        self.kind
    }

    /// Attach the store-assigned `id`.
    pub fn with_id(self, id: TransactionId) -> Transaction {
        Transaction {
            id,
            amount: self.amount,
            date: self.date,
            description: self.description,
            kind: self.kind,
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================
