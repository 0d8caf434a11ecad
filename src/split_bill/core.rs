//! Bills split between named participants, with equal or custom shares.

use rusqlite::{Connection, Row};
use serde::{Deserialize, Serialize};
use time::Date;

use crate::{Error, auth::UserID, database_id::DatabaseId};

pub type SplitBillId = DatabaseId;
pub type ParticipantId = DatabaseId;

/// Shares must add up to the bill total within this tolerance.
const SHARE_TOLERANCE: f64 = 0.01;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SplitBill {
    pub id: SplitBillId,
    pub user_id: UserID,
    pub title: String,
    pub total_amount: f64,
    pub date: Date,
    pub participants: Vec<Participant>,
}

impl SplitBill {
    /// The sum of the shares that have not been paid yet.
    pub fn outstanding(&self) -> f64 {
        self.participants
            .iter()
            .filter(|participant| !participant.is_paid)
            .map(|participant| participant.share)
            .sum()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Participant {
    pub id: ParticipantId,
    pub split_bill_id: SplitBillId,
    pub name: String,
    pub share: f64,
    pub is_paid: bool,
}

/// How a bill is divided between its participants.
#[derive(Debug, Clone, PartialEq)]
pub enum Split {
    /// Everyone pays the same, give or take a cent.
    Equal(Vec<String>),
    /// Each participant pays the given amount.
    Custom(Vec<(String, f64)>),
}

/// A validated split bill that has not been saved yet.
#[derive(Debug, Clone, PartialEq)]
pub struct NewSplitBill {
    pub title: String,
    pub total_amount: f64,
    pub date: Date,
    /// Participant names and their shares, which add up to `total_amount`.
    pub shares: Vec<(String, f64)>,
}

impl NewSplitBill {
    /// Validate a bill and work out each participant's share.
    ///
    /// # Errors
    ///
    /// Returns [Error::EmptyField] for a blank title, [Error::NonPositiveAmount] for a
    /// total or custom share that is not positive, [Error::NoParticipants] if no named
    /// participants were given, and [Error::ShareMismatch] if custom shares do not add
    /// up to the total.
    pub fn new(title: &str, total_amount: f64, date: Date, split: Split) -> Result<Self, Error> {
        let title = title.trim();
        if title.is_empty() {
            return Err(Error::EmptyField("Title"));
        }

        if !total_amount.is_finite() || total_amount <= 0.0 {
            return Err(Error::NonPositiveAmount(total_amount));
        }

        let shares = match split {
            Split::Equal(names) => {
                let names = names
                    .iter()
                    .map(|name| name.trim())
                    .filter(|name| !name.is_empty())
                    .collect::<Vec<_>>();

                equal_shares(total_amount, names.len())
                    .into_iter()
                    .zip(names)
                    .map(|(share, name)| (name.to_owned(), share))
                    .collect::<Vec<_>>()
            }
            Split::Custom(shares) => {
                let shares = shares
                    .into_iter()
                    .map(|(name, share)| (name.trim().to_owned(), share))
                    .filter(|(name, _)| !name.is_empty())
                    .collect::<Vec<_>>();

                if let Some((_, share)) = shares
                    .iter()
                    .find(|(_, share)| !share.is_finite() || *share <= 0.0)
                {
                    return Err(Error::NonPositiveAmount(*share));
                }

                let sum = shares.iter().map(|(_, share)| share).sum::<f64>();
                if !shares.is_empty() && (sum - total_amount).abs() > SHARE_TOLERANCE {
                    return Err(Error::ShareMismatch {
                        total: total_amount,
                        shares: sum,
                    });
                }

                shares
            }
        };

        if shares.is_empty() {
            return Err(Error::NoParticipants);
        }

        Ok(Self {
            title: title.to_owned(),
            total_amount,
            date,
            shares,
        })
    }
}

/// Split `total` into `count` shares rounded to cents that add up to `total`.
///
/// Leftover cents go to the first participants.
fn equal_shares(total: f64, count: usize) -> Vec<f64> {
    if count == 0 {
        return Vec::new();
    }

    let total_cents = (total * 100.0).round() as i64;
    let base = total_cents / count as i64;
    let remainder = total_cents % count as i64;

    (0..count as i64)
        .map(|i| {
            let cents = if i < remainder { base + 1 } else { base };
            cents as f64 / 100.0
        })
        .collect()
}

/// Create the split bill and participant tables.
///
/// IDs are never reused so that deleted bills can be restored under their original IDs.
pub fn create_split_bill_tables(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute_batch(
        "CREATE TABLE IF NOT EXISTS split_bill (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            user_id INTEGER NOT NULL,
            title TEXT NOT NULL,
            total_amount REAL NOT NULL,
            date TEXT NOT NULL,
            FOREIGN KEY(user_id) REFERENCES user(id) ON UPDATE CASCADE ON DELETE CASCADE
        );

        CREATE TABLE IF NOT EXISTS split_bill_participant (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            split_bill_id INTEGER NOT NULL,
            name TEXT NOT NULL,
            share REAL NOT NULL,
            is_paid INTEGER NOT NULL DEFAULT 0,
            FOREIGN KEY(split_bill_id) REFERENCES split_bill(id) ON UPDATE CASCADE ON DELETE CASCADE
        );",
    )?;

    Ok(())
}

pub fn create_split_bill(
    new_bill: NewSplitBill,
    user_id: UserID,
    connection: &Connection,
) -> Result<SplitBill, Error> {
    let transaction = connection.unchecked_transaction()?;

    let id: SplitBillId = transaction.query_row(
        "INSERT INTO split_bill (user_id, title, total_amount, date) VALUES (?1, ?2, ?3, ?4)
        RETURNING id",
        (
            user_id.as_i64(),
            &new_bill.title,
            new_bill.total_amount,
            new_bill.date,
        ),
        |row| row.get(0),
    )?;

    {
        let mut statement = transaction.prepare(
            "INSERT INTO split_bill_participant (split_bill_id, name, share) VALUES (?1, ?2, ?3)",
        )?;
        for (name, share) in &new_bill.shares {
            statement.execute((id, name, share))?;
        }
    }

    transaction.commit()?;

    get_split_bill(id, user_id, connection)
}

/// Insert `bill` and its participants keeping their IDs, used when restoring from the trash.
pub fn insert_split_bill_with_id(
    bill: &SplitBill,
    connection: &Connection,
) -> Result<(), rusqlite::Error> {
    connection.execute(
        "INSERT INTO split_bill (id, user_id, title, total_amount, date) VALUES (?1, ?2, ?3, ?4, ?5)",
        (
            bill.id,
            bill.user_id.as_i64(),
            &bill.title,
            bill.total_amount,
            bill.date,
        ),
    )?;

    let mut statement = connection.prepare(
        "INSERT INTO split_bill_participant (id, split_bill_id, name, share, is_paid)
        VALUES (?1, ?2, ?3, ?4, ?5)",
    )?;
    for participant in &bill.participants {
        statement.execute((
            participant.id,
            bill.id,
            &participant.name,
            participant.share,
            participant.is_paid,
        ))?;
    }

    Ok(())
}

/// # Errors
///
/// Returns [Error::MissingSplitBill] if the bill does not exist or belongs to another user.
pub fn get_split_bill(
    id: SplitBillId,
    user_id: UserID,
    connection: &Connection,
) -> Result<SplitBill, Error> {
    let mut bill = connection
        .prepare(
            "SELECT id, user_id, title, total_amount, date FROM split_bill
            WHERE id = ?1 AND user_id = ?2",
        )?
        .query_row((id, user_id.as_i64()), map_bill_row)
        .map_err(|error| match error {
            rusqlite::Error::QueryReturnedNoRows => Error::MissingSplitBill,
            error => error.into(),
        })?;

    bill.participants = get_participants(id, connection)?;

    Ok(bill)
}

/// Get the user's split bills with their participants, newest first.
pub fn get_split_bills(user_id: UserID, connection: &Connection) -> Result<Vec<SplitBill>, Error> {
    let bills = connection
        .prepare(
            "SELECT id, user_id, title, total_amount, date FROM split_bill
            WHERE user_id = ?1 ORDER BY date DESC, id DESC",
        )?
        .query_map([user_id.as_i64()], map_bill_row)?
        .collect::<Result<Vec<_>, _>>()?;

    bills
        .into_iter()
        .map(|mut bill| {
            bill.participants = get_participants(bill.id, connection)?;
            Ok(bill)
        })
        .collect()
}

fn get_participants(
    split_bill_id: SplitBillId,
    connection: &Connection,
) -> Result<Vec<Participant>, Error> {
    connection
        .prepare(
            "SELECT id, split_bill_id, name, share, is_paid FROM split_bill_participant
            WHERE split_bill_id = ?1 ORDER BY id",
        )?
        .query_map([split_bill_id], |row| {
            Ok(Participant {
                id: row.get(0)?,
                split_bill_id: row.get(1)?,
                name: row.get(2)?,
                share: row.get(3)?,
                is_paid: row.get(4)?,
            })
        })?
        .map(|maybe_participant| maybe_participant.map_err(|error| error.into()))
        .collect()
}

/// Flip whether a participant has paid their share.
///
/// # Errors
///
/// Returns [Error::MissingSplitBill] if the participant is not on one of the user's bills.
pub fn toggle_participant_paid(
    participant_id: ParticipantId,
    user_id: UserID,
    connection: &Connection,
) -> Result<(), Error> {
    let rows_affected = connection.execute(
        "UPDATE split_bill_participant SET is_paid = NOT is_paid
        WHERE id = ?1
        AND split_bill_id IN (SELECT id FROM split_bill WHERE user_id = ?2)",
        (participant_id, user_id.as_i64()),
    )?;

    if rows_affected == 0 {
        return Err(Error::MissingSplitBill);
    }

    Ok(())
}

/// Permanently delete a bill and its participants.
pub fn delete_split_bill(
    id: SplitBillId,
    user_id: UserID,
    connection: &Connection,
) -> Result<(), Error> {
    let rows_affected = connection.execute(
        "DELETE FROM split_bill WHERE id = ?1 AND user_id = ?2",
        (id, user_id.as_i64()),
    )?;

    if rows_affected == 0 {
        return Err(Error::MissingSplitBill);
    }

    Ok(())
}

fn map_bill_row(row: &Row) -> Result<SplitBill, rusqlite::Error> {
    Ok(SplitBill {
        id: row.get(0)?,
        user_id: UserID::new(row.get(1)?),
        title: row.get(2)?,
        total_amount: row.get(3)?,
        date: row.get(4)?,
        participants: Vec::new(),
    })
}
