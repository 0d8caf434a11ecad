//! Monthly budgets and how spending compares to them.

use rusqlite::{Connection, Row};
use serde::Serialize;
use time::Date;

use crate::{Error, auth::UserID, database_id::DatabaseId, month::YearMonth};

/// The amount a user plans to spend in a month.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Budget {
    pub id: DatabaseId,
    pub user_id: UserID,
    pub month: YearMonth,
    /// Never negative.
    pub amount: f64,
}

/// How much of a budget has been used.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BudgetStatus {
    pub budget: f64,
    pub spent: f64,
    /// Negative once the budget has been exceeded.
    pub remaining: f64,
    pub percent_used: f64,
    pub is_over_budget: bool,
}

impl BudgetStatus {
    /// Compare `spent` against `budget`.
    ///
    /// Any spending against a zero budget counts as 100% used.
    pub fn new(budget: f64, spent: f64) -> Self {
        let percent_used = if budget > 0.0 {
            spent / budget * 100.0
        } else if spent > 0.0 {
            100.0
        } else {
            0.0
        };

        Self {
            budget,
            spent,
            remaining: budget - spent,
            percent_used,
            is_over_budget: spent > budget,
        }
    }
}

pub fn create_budget_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS budget (
            id INTEGER PRIMARY KEY,
            user_id INTEGER NOT NULL,
            month TEXT NOT NULL,
            amount REAL NOT NULL,
            UNIQUE(user_id, month),
            FOREIGN KEY(user_id) REFERENCES user(id) ON UPDATE CASCADE ON DELETE CASCADE
        )",
        (),
    )?;

    Ok(())
}

/// Set the budget for `month`, replacing any budget already set.
///
/// # Errors
///
/// Returns [Error::NegativeBudget] if `amount` is negative.
pub fn set_budget(
    user_id: UserID,
    month: YearMonth,
    amount: f64,
    connection: &Connection,
) -> Result<Budget, Error> {
    if !amount.is_finite() || amount < 0.0 {
        return Err(Error::NegativeBudget(amount));
    }

    connection
        .prepare(
            "INSERT INTO budget (user_id, month, amount) VALUES (?1, ?2, ?3)
            ON CONFLICT(user_id, month) DO UPDATE SET amount = excluded.amount
            RETURNING id, user_id, month, amount",
        )?
        .query_row((user_id.as_i64(), month.first_day(), amount), map_row)
        .map_err(|error| error.into())
}

/// Get the budget for `month`, if one has been set.
pub fn get_budget(
    user_id: UserID,
    month: YearMonth,
    connection: &Connection,
) -> Result<Option<Budget>, Error> {
    let result = connection
        .prepare(
            "SELECT id, user_id, month, amount FROM budget
            WHERE user_id = ?1 AND month = ?2",
        )?
        .query_row((user_id.as_i64(), month.first_day()), map_row);

    match result {
        Ok(budget) => Ok(Some(budget)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(error) => Err(error.into()),
    }
}

/// Get all of the user's budgets, most recent month first.
pub fn get_budgets(user_id: UserID, connection: &Connection) -> Result<Vec<Budget>, Error> {
    connection
        .prepare(
            "SELECT id, user_id, month, amount FROM budget
            WHERE user_id = :user_id ORDER BY month DESC",
        )?
        .query_map(&[(":user_id", &user_id.as_i64())], map_row)?
        .map(|maybe_budget| maybe_budget.map_err(|error| error.into()))
        .collect()
}

fn map_row(row: &Row) -> Result<Budget, rusqlite::Error> {
    let month: Date = row.get(2)?;

    Ok(Budget {
        id: row.get(0)?,
        user_id: UserID::new(row.get(1)?),
        month: YearMonth::containing(month),
        amount: row.get(3)?,
    })
}

#[cfg(test)]
mod tests {
    use time::macros::date;

    use crate::{
        Error,
        budget::{BudgetStatus, get_budget, get_budgets, set_budget},
        month::YearMonth,
        test_utils::{create_test_user, get_test_connection},
    };

    #[test]
    fn status_under_budget() {
        let status = BudgetStatus::new(200.0, 50.0);

        assert_eq!(status.remaining, 150.0);
        assert_eq!(status.percent_used, 25.0);
        assert!(!status.is_over_budget);
    }

    #[test]
    fn status_over_budget() {
        let status = BudgetStatus::new(100.0, 130.0);

        assert_eq!(status.remaining, -30.0);
        assert_eq!(status.percent_used, 130.0);
        assert!(status.is_over_budget);
    }

    #[test]
    fn status_with_zero_budget() {
        assert_eq!(BudgetStatus::new(0.0, 0.0).percent_used, 0.0);
        assert!(!BudgetStatus::new(0.0, 0.0).is_over_budget);
        assert_eq!(BudgetStatus::new(0.0, 1.0).percent_used, 100.0);
        assert!(BudgetStatus::new(0.0, 1.0).is_over_budget);
    }

    #[test]
    fn set_budget_replaces_existing_month() {
        let connection = get_test_connection();
        let user_id = create_test_user("alice", &connection);
        let month = YearMonth::containing(date!(2025 - 03 - 09));

        let first = set_budget(user_id, month, 500.0, &connection).unwrap();
        let second = set_budget(user_id, month, 650.0, &connection).unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!(
            get_budget(user_id, month, &connection).unwrap().unwrap().amount,
            650.0
        );
        assert_eq!(get_budgets(user_id, &connection).unwrap().len(), 1);
    }

    #[test]
    fn negative_budget_is_rejected() {
        let connection = get_test_connection();
        let user_id = create_test_user("alice", &connection);

        let result = set_budget(
            user_id,
            YearMonth::containing(date!(2025 - 03 - 09)),
            -1.0,
            &connection,
        );

        assert_eq!(result, Err(Error::NegativeBudget(-1.0)));
    }

    #[test]
    fn missing_budget_is_none() {
        let connection = get_test_connection();
        let user_id = create_test_user("alice", &connection);

        assert_eq!(
            get_budget(
                user_id,
                YearMonth::containing(date!(2025 - 03 - 09)),
                &connection
            ),
            Ok(None)
        );
    }
}
