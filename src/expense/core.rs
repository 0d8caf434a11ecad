//! Defines the expense model and its database queries.

use rusqlite::{Connection, Row};
use serde::{Deserialize, Serialize};
use time::Date;

use crate::{
    Error,
    auth::UserID,
    category::{CategoryIcon, CategoryId, get_category},
    database_id::DatabaseId,
    db::is_foreign_key_violation,
    month::YearMonth,
};

/// Database identifier for an expense.
pub type ExpenseId = DatabaseId;

/// Money the user has spent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Expense {
    pub id: ExpenseId,
    pub user_id: UserID,
    /// Always greater than zero.
    pub amount: f64,
    pub date: Date,
    pub description: String,
    pub category_id: Option<CategoryId>,
    /// Path of the uploaded receipt, relative to the bills directory.
    pub receipt_path: Option<String>,
}

/// An expense joined with its category for display.
#[derive(Debug, Clone, PartialEq)]
pub struct ExpenseRow {
    pub expense: Expense,
    pub category_name: Option<String>,
    pub category_icon: Option<CategoryIcon>,
}

/// A validated expense that has not been saved yet.
///
/// To create a new `NewExpense`, use [NewExpense::new].
#[derive(Debug, Clone, PartialEq)]
pub struct NewExpense {
    pub amount: f64,
    pub date: Date,
    pub description: String,
    pub category_id: Option<CategoryId>,
    pub receipt_path: Option<String>,
}

impl NewExpense {
    /// Validate the fields of an expense.
    ///
    /// # Errors
    ///
    /// Returns [Error::NonPositiveAmount] if `amount` is not greater than zero, or
    /// [Error::FutureDate] if `date` is after `today`.
    pub fn new(amount: f64, date: Date, description: &str, today: Date) -> Result<Self, Error> {
        if !amount.is_finite() || amount <= 0.0 {
            return Err(Error::NonPositiveAmount(amount));
        }

        if date > today {
            return Err(Error::FutureDate(date));
        }

        Ok(Self::new_unchecked(amount, date, description))
    }

    /// Create an expense without validation.
    pub fn new_unchecked(amount: f64, date: Date, description: &str) -> Self {
        Self {
            amount,
            date,
            description: description.trim().to_owned(),
            category_id: None,
            receipt_path: None,
        }
    }

    pub fn category_id(mut self, category_id: Option<CategoryId>) -> Self {
        self.category_id = category_id;
        self
    }

    pub fn receipt_path(mut self, receipt_path: Option<String>) -> Self {
        self.receipt_path = receipt_path.filter(|path| !path.trim().is_empty());
        self
    }
}

/// Create the expense table in the database.
///
/// Expense IDs are never reused so that deleted expenses can be restored under their
/// original ID.
pub fn create_expense_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute_batch(
        "CREATE TABLE IF NOT EXISTS expense (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            user_id INTEGER NOT NULL,
            amount REAL NOT NULL,
            date TEXT NOT NULL,
            description TEXT NOT NULL,
            category_id INTEGER,
            receipt_path TEXT,
            FOREIGN KEY(user_id) REFERENCES user(id) ON UPDATE CASCADE ON DELETE CASCADE,
            FOREIGN KEY(category_id) REFERENCES category(id) ON UPDATE CASCADE ON DELETE SET NULL
        );

        CREATE INDEX IF NOT EXISTS idx_expense_user_date ON expense(user_id, date);",
    )?;

    Ok(())
}

/// Check that `category_id` belongs to `user_id`.
fn check_category(
    category_id: Option<CategoryId>,
    user_id: UserID,
    connection: &Connection,
) -> Result<(), Error> {
    let Some(id) = category_id else {
        return Ok(());
    };

    match get_category(id, user_id, connection) {
        Ok(_) => Ok(()),
        Err(Error::NotFound) => Err(Error::InvalidCategory(category_id)),
        Err(error) => Err(error),
    }
}

/// Create a new expense for `user_id`.
///
/// # Errors
/// This function will return a:
/// - [Error::InvalidCategory] if the category does not exist or belongs to someone else,
/// - or [Error::SqlError] if there is some other SQL error.
pub fn create_expense(
    new_expense: NewExpense,
    user_id: UserID,
    connection: &Connection,
) -> Result<Expense, Error> {
    check_category(new_expense.category_id, user_id, connection)?;

    connection
        .prepare(
            "INSERT INTO expense (user_id, amount, date, description, category_id, receipt_path)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            RETURNING id, user_id, amount, date, description, category_id, receipt_path",
        )?
        .query_row(
            (
                user_id.as_i64(),
                new_expense.amount,
                new_expense.date,
                &new_expense.description,
                new_expense.category_id,
                &new_expense.receipt_path,
            ),
            map_expense_row,
        )
        .map_err(|error| {
            if is_foreign_key_violation(&error) {
                Error::InvalidCategory(new_expense.category_id)
            } else {
                error.into()
            }
        })
}

/// Retrieve an expense owned by `user_id`.
///
/// # Errors
/// Returns [Error::NotFound] if the user has no expense with `id`.
pub fn get_expense(id: ExpenseId, user_id: UserID, connection: &Connection) -> Result<Expense, Error> {
    connection
        .prepare(
            "SELECT id, user_id, amount, date, description, category_id, receipt_path
            FROM expense WHERE id = :id AND user_id = :user_id",
        )?
        .query_row(
            &[(":id", &id), (":user_id", &user_id.as_i64())],
            map_expense_row,
        )
        .map_err(|error| error.into())
}

/// Retrieve the user's expenses in `month`, newest first.
pub fn get_expenses_in_month(
    user_id: UserID,
    month: YearMonth,
    connection: &Connection,
) -> Result<Vec<ExpenseRow>, Error> {
    connection
        .prepare(
            "SELECT e.id, e.user_id, e.amount, e.date, e.description, e.category_id,
                e.receipt_path, c.name, c.icon
            FROM expense e
            LEFT JOIN category c ON c.id = e.category_id
            WHERE e.user_id = ?1 AND e.date >= ?2 AND e.date < ?3
            ORDER BY e.date DESC, e.id DESC",
        )?
        .query_map(
            (user_id.as_i64(), month.first_day(), month.end()),
            |row| {
                Ok(ExpenseRow {
                    expense: map_expense_row(row)?,
                    category_name: row.get(7)?,
                    category_icon: row.get(8)?,
                })
            },
        )?
        .map(|maybe_row| maybe_row.map_err(|error| error.into()))
        .collect()
}

/// Retrieve every expense the user has recorded, oldest first.
pub fn get_all_expenses(user_id: UserID, connection: &Connection) -> Result<Vec<Expense>, Error> {
    connection
        .prepare(
            "SELECT id, user_id, amount, date, description, category_id, receipt_path
            FROM expense WHERE user_id = :user_id ORDER BY date ASC, id ASC",
        )?
        .query_map(&[(":user_id", &user_id.as_i64())], map_expense_row)?
        .map(|maybe_expense| maybe_expense.map_err(|error| error.into()))
        .collect()
}

/// Replace the fields of an existing expense.
///
/// # Errors
/// Returns [Error::UpdateMissingExpense] if the user has no expense with `id`.
pub fn update_expense(
    id: ExpenseId,
    user_id: UserID,
    expense: NewExpense,
    connection: &Connection,
) -> Result<(), Error> {
    check_category(expense.category_id, user_id, connection)?;

    let rows_affected = connection.execute(
        "UPDATE expense
        SET amount = ?1, date = ?2, description = ?3, category_id = ?4,
            receipt_path = COALESCE(?5, receipt_path)
        WHERE id = ?6 AND user_id = ?7",
        (
            expense.amount,
            expense.date,
            &expense.description,
            expense.category_id,
            &expense.receipt_path,
            id,
            user_id.as_i64(),
        ),
    )?;

    if rows_affected == 0 {
        return Err(Error::UpdateMissingExpense);
    }

    Ok(())
}

/// Permanently delete an expense.
///
/// User facing deletes go through the trash instead, see [crate::trash].
///
/// # Errors
/// Returns [Error::DeleteMissingExpense] if the user has no expense with `id`.
pub fn delete_expense(id: ExpenseId, user_id: UserID, connection: &Connection) -> Result<(), Error> {
    let rows_affected = connection.execute(
        "DELETE FROM expense WHERE id = ?1 AND user_id = ?2",
        (id, user_id.as_i64()),
    )?;

    if rows_affected == 0 {
        return Err(Error::DeleteMissingExpense);
    }

    Ok(())
}

/// Insert `expense` under its original ID.
pub fn insert_expense_with_id(
    expense: &Expense,
    connection: &Connection,
) -> Result<(), rusqlite::Error> {
    connection.execute(
        "INSERT INTO expense (id, user_id, amount, date, description, category_id, receipt_path)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        (
            expense.id,
            expense.user_id.as_i64(),
            expense.amount,
            expense.date,
            &expense.description,
            expense.category_id,
            &expense.receipt_path,
        ),
    )?;

    Ok(())
}

fn map_expense_row(row: &Row) -> Result<Expense, rusqlite::Error> {
    Ok(Expense {
        id: row.get(0)?,
        user_id: UserID::new(row.get(1)?),
        amount: row.get(2)?,
        date: row.get(3)?,
        description: row.get(4)?,
        category_id: row.get(5)?,
        receipt_path: row.get(6)?,
    })
}
