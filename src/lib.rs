//! Spendwise is a personal income and expense tracker.
//!
//! Transactions are kept in a document store, one collection per session,
//! where a session is a random identifier remembered in key-value storage.
//! Every read and write is checked against a fixed daily quota first.
//!
//! This library provides the stores, the quota guard, the transaction
//! repository and the list analytics (search, sort and monthly totals) used by
//! the `spendwise` command line tool.

#![warn(missing_docs)]

mod app_state;
mod db;
mod error;

pub mod analytics;
pub mod chart;
pub mod clock;
pub mod display;
pub mod document;
pub mod key_value;
pub mod quota;
pub mod repository;
pub mod session;
pub mod transaction;

pub use app_state::{AppState, SharedClock};
pub use db::initialize as initialize_db;
pub use error::Error;
