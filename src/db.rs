//! Creates the application's database schema.

use rusqlite::Connection;

use crate::{
    Error,
    auth::{create_session_table, create_user_table},
    ledger::create_entry_table,
};

/// Create the tables for the domain models if they do not exist yet.
///
/// Foreign key enforcement is switched on for `connection`, so this should be
/// called once on every new connection before it is used.
///
/// # Errors
/// Returns an [Error::SqlError] if any of the tables could not be created.
pub fn initialize(connection: &Connection) -> Result<(), Error> {
    connection.pragma_update(None, "foreign_keys", true)?;

    create_user_table(connection)?;
    create_session_table(connection)?;
    create_entry_table(connection)?;

    Ok(())
}
