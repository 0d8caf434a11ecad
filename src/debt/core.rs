//! Money lent to and borrowed from other people.

use std::fmt::Display;

use rusqlite::{Connection, Row};
use serde::{Deserialize, Serialize};
use time::Date;

use crate::{Error, auth::UserID, database_id::DatabaseId};

/// Database identifier for a lent or borrowed record.
pub type DebtId = DatabaseId;

/// Which way the money went.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DebtKind {
    /// The user gave money to someone else.
    Lent,
    /// Someone else gave money to the user.
    Borrowed,
}

impl DebtKind {
    fn table(self) -> &'static str {
        match self {
            DebtKind::Lent => "lent_money",
            DebtKind::Borrowed => "borrowed_money",
        }
    }

    pub fn key(self) -> &'static str {
        match self {
            DebtKind::Lent => "lent",
            DebtKind::Borrowed => "borrowed",
        }
    }

    pub fn from_key(key: &str) -> Option<Self> {
        match key {
            "lent" => Some(DebtKind::Lent),
            "borrowed" => Some(DebtKind::Borrowed),
            _ => None,
        }
    }
}

impl Display for DebtKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DebtKind::Lent => write!(f, "Lent"),
            DebtKind::Borrowed => write!(f, "Borrowed"),
        }
    }
}

/// A record of money lent or borrowed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Debt {
    pub id: DebtId,
    pub user_id: UserID,
    pub kind: DebtKind,
    /// Who the money was lent to or borrowed from.
    pub person: String,
    pub amount: f64,
    pub date: Date,
    pub due_date: Option<Date>,
    pub note: String,
    pub is_settled: bool,
}

/// A validated lent or borrowed record that has not been saved yet.
#[derive(Debug, Clone, PartialEq)]
pub struct NewDebt {
    pub kind: DebtKind,
    pub person: String,
    pub amount: f64,
    pub date: Date,
    pub due_date: Option<Date>,
    pub note: String,
}

impl NewDebt {
    /// # Errors
    ///
    /// Returns [Error::EmptyField] if `person` is blank, or [Error::NonPositiveAmount]
    /// if `amount` is not greater than zero.
    pub fn new(
        kind: DebtKind,
        person: &str,
        amount: f64,
        date: Date,
        due_date: Option<Date>,
        note: &str,
    ) -> Result<Self, Error> {
        let person = person.trim();
        if person.is_empty() {
            return Err(Error::EmptyField("Person"));
        }

        if !amount.is_finite() || amount <= 0.0 {
            return Err(Error::NonPositiveAmount(amount));
        }

        Ok(Self {
            kind,
            person: person.to_owned(),
            amount,
            date,
            due_date,
            note: note.trim().to_owned(),
        })
    }
}

/// Create the lent and borrowed tables.
///
/// IDs are never reused so that deleted records can be restored under their original ID.
pub fn create_debt_tables(connection: &Connection) -> Result<(), rusqlite::Error> {
    for kind in [DebtKind::Lent, DebtKind::Borrowed] {
        connection.execute(
            &format!(
                "CREATE TABLE IF NOT EXISTS {} (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    user_id INTEGER NOT NULL,
                    person TEXT NOT NULL,
                    amount REAL NOT NULL,
                    date TEXT NOT NULL,
                    due_date TEXT,
                    note TEXT NOT NULL DEFAULT '',
                    is_settled INTEGER NOT NULL DEFAULT 0,
                    FOREIGN KEY(user_id) REFERENCES user(id) ON UPDATE CASCADE ON DELETE CASCADE
                )",
                kind.table()
            ),
            (),
        )?;
    }

    Ok(())
}

pub fn create_debt(
    new_debt: NewDebt,
    user_id: UserID,
    connection: &Connection,
) -> Result<Debt, Error> {
    let kind = new_debt.kind;

    connection
        .prepare(&format!(
            "INSERT INTO {} (user_id, person, amount, date, due_date, note)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            RETURNING id, user_id, person, amount, date, due_date, note, is_settled",
            kind.table()
        ))?
        .query_row(
            (
                user_id.as_i64(),
                &new_debt.person,
                new_debt.amount,
                new_debt.date,
                new_debt.due_date,
                &new_debt.note,
            ),
            |row| map_row(row, kind),
        )
        .map_err(|error| error.into())
}

/// Insert `debt` keeping its ID, used when restoring from the trash.
pub fn insert_debt_with_id(debt: &Debt, connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        &format!(
            "INSERT INTO {} (id, user_id, person, amount, date, due_date, note, is_settled)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            debt.kind.table()
        ),
        (
            debt.id,
            debt.user_id.as_i64(),
            &debt.person,
            debt.amount,
            debt.date,
            debt.due_date,
            &debt.note,
            debt.is_settled,
        ),
    )?;

    Ok(())
}

/// # Errors
///
/// Returns [Error::MissingDebt] if the record does not exist or belongs to another user.
pub fn get_debt(
    kind: DebtKind,
    id: DebtId,
    user_id: UserID,
    connection: &Connection,
) -> Result<Debt, Error> {
    connection
        .prepare(&format!(
            "SELECT id, user_id, person, amount, date, due_date, note, is_settled FROM {}
            WHERE id = ?1 AND user_id = ?2",
            kind.table()
        ))?
        .query_row((id, user_id.as_i64()), |row| map_row(row, kind))
        .map_err(|error| match error {
            rusqlite::Error::QueryReturnedNoRows => Error::MissingDebt,
            error => error.into(),
        })
}

/// Get every record of `kind`, outstanding first, then newest first.
pub fn get_debts(
    kind: DebtKind,
    user_id: UserID,
    connection: &Connection,
) -> Result<Vec<Debt>, Error> {
    connection
        .prepare(&format!(
            "SELECT id, user_id, person, amount, date, due_date, note, is_settled FROM {}
            WHERE user_id = ?1
            ORDER BY is_settled ASC, date DESC, id DESC",
            kind.table()
        ))?
        .query_map([user_id.as_i64()], |row| map_row(row, kind))?
        .map(|maybe_debt| maybe_debt.map_err(|error| error.into()))
        .collect()
}

/// The sum of the records of `kind` that have not been settled.
pub fn outstanding_total(
    kind: DebtKind,
    user_id: UserID,
    connection: &Connection,
) -> Result<f64, Error> {
    connection
        .query_row(
            &format!(
                "SELECT COALESCE(SUM(amount), 0) FROM {} WHERE user_id = ?1 AND is_settled = 0",
                kind.table()
            ),
            [user_id.as_i64()],
            |row| row.get(0),
        )
        .map_err(|error| error.into())
}

/// Flip whether a record has been paid back, returning the updated record.
pub fn toggle_settled(
    kind: DebtKind,
    id: DebtId,
    user_id: UserID,
    connection: &Connection,
) -> Result<Debt, Error> {
    connection
        .prepare(&format!(
            "UPDATE {} SET is_settled = NOT is_settled WHERE id = ?1 AND user_id = ?2
            RETURNING id, user_id, person, amount, date, due_date, note, is_settled",
            kind.table()
        ))?
        .query_row((id, user_id.as_i64()), |row| map_row(row, kind))
        .map_err(|error| match error {
            rusqlite::Error::QueryReturnedNoRows => Error::MissingDebt,
            error => error.into(),
        })
}

/// Permanently delete a record. Use [crate::trash::soft_delete_debt] for user deletes.
pub fn delete_debt(
    kind: DebtKind,
    id: DebtId,
    user_id: UserID,
    connection: &Connection,
) -> Result<(), Error> {
    let rows_affected = connection.execute(
        &format!("DELETE FROM {} WHERE id = ?1 AND user_id = ?2", kind.table()),
        (id, user_id.as_i64()),
    )?;

    if rows_affected == 0 {
        return Err(Error::MissingDebt);
    }

    Ok(())
}

fn map_row(row: &Row, kind: DebtKind) -> Result<Debt, rusqlite::Error> {
    Ok(Debt {
        id: row.get(0)?,
        user_id: UserID::new(row.get(1)?),
        kind,
        person: row.get(2)?,
        amount: row.get(3)?,
        date: row.get(4)?,
        due_date: row.get(5)?,
        note: row.get(6)?,
        is_settled: row.get(7)?,
    })
}
