//! Sets up the SQLite database that backs the document and key-value stores.

use rusqlite::{Connection, Transaction, TransactionBehavior};

use crate::{Error, document::create_document_table, key_value::create_key_value_table};

/// Create the tables of the application database if they do not exist yet.
///
/// # Errors
/// Returns [Error::StoreUnavailable] if a table cannot be created.
pub fn initialize(connection: &Connection) -> Result<(), Error> {
    let transaction = Transaction::new_unchecked(connection, TransactionBehavior::Exclusive)?;

    create_document_table(&transaction)?;
    create_key_value_table(&transaction)?;

    transaction.commit()?;

    Ok(())
}
