//! Searching, sorting and monthly aggregation of transaction lists.
//!
//! Everything here is a pure function of its inputs.

use std::{cmp::Ordering, fmt::Display, str::FromStr};

use time::{Date, Month};

use crate::{
    Error,
    transaction::{Transaction, TransactionKind},
};

/// The number of months covered by [monthly_expense_buckets].
pub const SUMMARY_MONTHS: usize = 6;

// ============================================================================
// FILTERING
// ============================================================================

/// Keep the transactions whose description contains `term`, ignoring case.
///
/// An empty `term` keeps every transaction. Order is preserved.
pub fn filter_by_text(transactions: &[Transaction], term: &str) -> Vec<Transaction> {
    let term = term.to_lowercase();

    transactions
        .iter()
        .filter(|transaction| {
            transaction
                .description
                .as_ref()
                .to_lowercase()
                .contains(&term)
        })
        .cloned()
        .collect()
}

// ============================================================================
// SORTING
// ============================================================================

/// The transaction field to sort by.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortKey {
    /// Sort chronologically.
    Date,
    /// Sort lexicographically by description.
    Description,
    /// Sort numerically by amount.
    Amount,
    /// Sort lexicographically by "income"/"expense".
    Kind,
}

impl FromStr for SortKey {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "date" => Ok(Self::Date),
            "description" => Ok(Self::Description),
            "amount" => Ok(Self::Amount),
            "kind" | "type" => Ok(Self::Kind),
            _ => Err(Error::InvalidSortOption(s.to_owned())),
        }
    }
}

/// The order to sort transactions in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    /// Sort in order of increasing value.
    Ascending,
    /// Sort in order of decreasing value.
    Descending,
}

impl FromStr for SortDirection {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "asc" | "ascending" => Ok(Self::Ascending),
            "desc" | "descending" => Ok(Self::Descending),
            _ => Err(Error::InvalidSortOption(s.to_owned())),
        }
    }
}

/// Sort a copy of `transactions` by `key`.
///
/// The sort is stable: transactions that compare equal keep their relative
/// order in either direction.
pub fn sort_by(
    transactions: &[Transaction],
    key: SortKey,
    direction: SortDirection,
) -> Vec<Transaction> {
    let mut sorted = transactions.to_vec();

    // `sort_by` is a stable sort.
    sorted.sort_by(|a, b| {
        let ordering = compare(a, b, key);

        match direction {
            SortDirection::Ascending => ordering,
            SortDirection::Descending => ordering.reverse(),
        }
    });

    sorted
}

fn compare(a: &Transaction, b: &Transaction, key: SortKey) -> Ordering {
    match key {
        SortKey::Date => a.date.cmp(&b.date),
        SortKey::Description => a.description.as_ref().cmp(b.description.as_ref()),
        // Amounts are validated as finite, NaN can only come from a corrupt document.
        SortKey::Amount => a.amount.partial_cmp(&b.amount).unwrap_or(Ordering::Equal),
        SortKey::Kind => a.kind.as_str().cmp(b.kind.as_str()),
    }
}

/// The sort state of a transaction table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SortConfig {
    /// The field being sorted on.
    pub key: SortKey,
    /// The direction of the sort.
    pub direction: SortDirection,
}

impl Default for SortConfig {
    /// Newest transactions first.
    fn default() -> Self {
        Self {
            key: SortKey::Date,
            direction: SortDirection::Descending,
        }
    }
}

impl SortConfig {
    /// The sort state after selecting `key` again.
    ///
    /// Selecting the current key while ascending flips to descending, any
    /// other selection sorts ascending by `key`.
    pub fn toggle(self, key: SortKey) -> Self {
        let direction = if self.key == key && self.direction == SortDirection::Ascending {
            SortDirection::Descending
        } else {
            SortDirection::Ascending
        };

        Self { key, direction }
    }

    /// Sort a copy of `transactions` with this configuration.
    pub fn apply(self, transactions: &[Transaction]) -> Vec<Transaction> {
        sort_by(transactions, self.key, self.direction)
    }
}

// ============================================================================
// MONTHLY BUCKETS
// ============================================================================

/// The total expenses of one calendar month.
#[derive(Debug, Clone, PartialEq)]
pub struct MonthlyBucket {
    /// The month and year, e.g. "Oct 2023".
    pub label: String,
    /// The first day of the month.
    pub start: Date,
    /// The last day of the month.
    pub end: Date,
    /// The sum of expense amounts dated within the month.
    pub total: f64,
}

/// Total the expenses of the [SUMMARY_MONTHS] months ending with the month of
/// `today`, oldest month first.
///
/// A transaction belongs to a month if its calendar date, in its own offset,
/// falls on or between the first and last day of that month. Income is
/// ignored. Months without expenses have a total of zero.
pub fn monthly_expense_buckets(transactions: &[Transaction], today: Date) -> Vec<MonthlyBucket> {
    let mut months = Vec::with_capacity(SUMMARY_MONTHS);
    let (mut year, mut month) = (today.year(), today.month());

    for _ in 0..SUMMARY_MONTHS {
        months.push((year, month));
        if month == Month::January {
            year -= 1;
        }
        month = month.previous();
    }

    months
        .into_iter()
        .rev()
        .filter_map(|(year, month)| {
            let (start, end) = month_bounds(year, month)?;

            let total = transactions
                .iter()
                .filter(|transaction| transaction.kind == TransactionKind::Expense)
                .filter(|transaction| {
                    let date = transaction.date.date();
                    date >= start && date <= end
                })
                .map(|transaction| transaction.amount)
                .sum();

            Some(MonthlyBucket {
                label: format!("{} {}", month_abbrev(month), year),
                start,
                end,
                total,
            })
        })
        .collect()
}

/// The first and last day of `month`.
///
/// Returns `None` only for years outside the range `time` supports.
fn month_bounds(year: i32, month: Month) -> Option<(Date, Date)> {
    let start = Date::from_calendar_date(year, month, 1).ok()?;
    let end = Date::from_calendar_date(year, month, last_day_of_month(year, month)).ok()?;

    Some((start, end))
}

fn last_day_of_month(year: i32, month: Month) -> u8 {
    match month {
        Month::January
        | Month::March
        | Month::May
        | Month::July
        | Month::August
        | Month::October
        | Month::December => 31,
        Month::April | Month::June | Month::September | Month::November => 30,
        Month::February => {
            if is_leap_year(year) {
                29
            } else {
                28
            }
        }
    }
}

fn is_leap_year(year: i32) -> bool {
    (year % 4 == 0 && year % 100 != 0) || (year % 400 == 0)
}

/// The three-letter English abbreviation of `month`.
pub fn month_abbrev(month: Month) -> &'static str {
    match month {
        Month::January => "Jan",
        Month::February => "Feb",
        Month::March => "Mar",
        Month::April => "Apr",
        Month::May => "May",
        Month::June => "Jun",
        Month::July => "Jul",
        Month::August => "Aug",
        Month::September => "Sep",
        Month::October => "Oct",
        Month::November => "Nov",
        Month::December => "Dec",
    }
}

impl Display for MonthlyBucket {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {:.2}", self.label, self.total)
    }
}
