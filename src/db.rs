//! Database setup and helpers shared by the domain modules.

use rusqlite::{Connection, Transaction as SqlTransaction, TransactionBehavior};

use crate::{
    Error,
    auth::create_user_table,
    budget::create_budget_table,
    category::create_category_table,
    debt::create_debt_tables,
    expense::create_expense_table,
    group::create_group_tables,
    invoice::{create_invoice_tables, create_party_table, create_product_table},
    preferences::create_preferences_table,
    split_bill::create_split_bill_tables,
    trash::create_deleted_item_table,
};

/// Enable foreign keys and create every table the app needs.
///
/// Safe to call on an existing database, tables that already exist are left as is.
pub fn initialize(connection: &Connection) -> Result<(), Error> {
    // Foreign key enforcement is per connection and cannot be changed inside a transaction.
    connection.pragma_update(None, "foreign_keys", "ON")?;

    let transaction = SqlTransaction::new_unchecked(connection, TransactionBehavior::Exclusive)?;

    create_user_table(&transaction)?;
    create_preferences_table(&transaction)?;
    create_category_table(&transaction)?;
    create_expense_table(&transaction)?;
    create_budget_table(&transaction)?;
    create_debt_tables(&transaction)?;
    create_group_tables(&transaction)?;
    create_split_bill_tables(&transaction)?;
    create_party_table(&transaction)?;
    create_product_table(&transaction)?;
    create_invoice_tables(&transaction)?;
    create_deleted_item_table(&transaction)?;

    transaction.commit()?;

    Ok(())
}

/// Whether `error` was caused by a FOREIGN KEY constraint failing.
pub fn is_foreign_key_violation(error: &rusqlite::Error) -> bool {
    matches!(
        error,
        rusqlite::Error::SqliteFailure(
            rusqlite::ffi::Error {
                extended_code: rusqlite::ffi::SQLITE_CONSTRAINT_FOREIGNKEY,
                ..
            },
            _
        )
    )
}

/// Whether `error` was caused by a UNIQUE constraint failing.
pub fn is_unique_violation(error: &rusqlite::Error) -> bool {
    matches!(
        error,
        rusqlite::Error::SqliteFailure(
            rusqlite::ffi::Error {
                extended_code: rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE,
                ..
            },
            _
        )
    )
}

#[cfg(test)]
mod tests {
    use rusqlite::Connection;

    use super::{initialize, is_foreign_key_violation};

    #[test]
    fn initialize_is_idempotent() {
        let connection = Connection::open_in_memory().unwrap();

        initialize(&connection).unwrap();

        assert!(initialize(&connection).is_ok());
    }

    #[test]
    fn initialize_enables_foreign_keys() {
        let connection = Connection::open_in_memory().unwrap();
        initialize(&connection).unwrap();

        let enabled: bool = connection
            .query_row("PRAGMA foreign_keys", [], |row| row.get(0))
            .unwrap();

        assert!(enabled);
    }

    #[test]
    fn detects_foreign_key_violation() {
        let connection = Connection::open_in_memory().unwrap();
        initialize(&connection).unwrap();

        let error = connection
            .execute(
                "INSERT INTO category (user_id, name, icon) VALUES (999, 'Food', 'food')",
                (),
            )
            .unwrap_err();

        assert!(is_foreign_key_violation(&error));
    }
}
