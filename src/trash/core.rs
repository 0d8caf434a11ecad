//! Soft delete: records are moved into the `deleted_item` table with a snapshot of
//! everything needed to put them back, and are purged for good after 30 days.

use std::fmt::Display;

use rusqlite::{Connection, Row, types::Type};
use serde::{Deserialize, Serialize};
use time::{Duration, OffsetDateTime};

use crate::{
    Error,
    auth::UserID,
    database_id::DatabaseId,
    db::is_foreign_key_violation,
    debt::{Debt, DebtId, DebtKind, delete_debt, get_debt, insert_debt_with_id},
    expense::{Expense, ExpenseId, delete_expense, get_expense, insert_expense_with_id},
    group::{
        Group, GroupExpense, GroupExpenseId, GroupId, GroupMember, delete_group,
        delete_group_expense, get_group, get_group_expense, get_group_expenses, get_members,
        insert_group_expense_with_id, insert_group_member_with_id, insert_group_with_id,
    },
    split_bill::{
        SplitBill, SplitBillId, delete_split_bill, get_split_bill, insert_split_bill_with_id,
    },
};

pub type DeletedItemId = DatabaseId;

/// How long deleted items are kept before they are purged.
pub const TRASH_TTL: Duration = Duration::days(30);

/// A group together with everything that is deleted along with it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupSnapshot {
    pub group: Group,
    pub members: Vec<GroupMember>,
    pub expenses: Vec<GroupExpense>,
}

/// The full contents of a deleted record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "record", rename_all = "snake_case")]
pub enum DeletedRecord {
    Expense(Expense),
    Debt(Debt),
    SplitBill(SplitBill),
    Group(GroupSnapshot),
    GroupExpense(GroupExpense),
}

impl DeletedRecord {
    /// The stable key stored in the `kind` column.
    pub fn kind(&self) -> &'static str {
        match self {
            DeletedRecord::Expense(_) => "expense",
            DeletedRecord::Debt(debt) => match debt.kind {
                DebtKind::Lent => "lent",
                DebtKind::Borrowed => "borrowed",
            },
            DeletedRecord::SplitBill(_) => "split_bill",
            DeletedRecord::Group(_) => "group",
            DeletedRecord::GroupExpense(_) => "group_expense",
        }
    }

    /// The ID the record had, and will have again if restored.
    pub fn record_id(&self) -> DatabaseId {
        match self {
            DeletedRecord::Expense(expense) => expense.id,
            DeletedRecord::Debt(debt) => debt.id,
            DeletedRecord::SplitBill(bill) => bill.id,
            DeletedRecord::Group(snapshot) => snapshot.group.id,
            DeletedRecord::GroupExpense(expense) => expense.id,
        }
    }

    /// A short human readable description, e.g. "Lent to Bob".
    pub fn label(&self) -> String {
        match self {
            DeletedRecord::Expense(expense) if expense.description.is_empty() => {
                format!("Expense on {}", expense.date)
            }
            DeletedRecord::Expense(expense) => expense.description.clone(),
            DeletedRecord::Debt(debt) => match debt.kind {
                DebtKind::Lent => format!("Lent to {}", debt.person),
                DebtKind::Borrowed => format!("Borrowed from {}", debt.person),
            },
            DeletedRecord::SplitBill(bill) => bill.title.clone(),
            DeletedRecord::Group(snapshot) => snapshot.group.name.clone(),
            DeletedRecord::GroupExpense(expense) if expense.description.is_empty() => {
                format!("Group expense on {}", expense.date)
            }
            DeletedRecord::GroupExpense(expense) => expense.description.clone(),
        }
    }

    pub fn amount(&self) -> Option<f64> {
        match self {
            DeletedRecord::Expense(expense) => Some(expense.amount),
            DeletedRecord::Debt(debt) => Some(debt.amount),
            DeletedRecord::SplitBill(bill) => Some(bill.total_amount),
            DeletedRecord::Group(_) => None,
            DeletedRecord::GroupExpense(expense) => Some(expense.amount),
        }
    }
}

impl Display for DeletedRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let kind = match self {
            DeletedRecord::Expense(_) => "expense",
            DeletedRecord::Debt(_) => "record",
            DeletedRecord::SplitBill(_) => "split bill",
            DeletedRecord::Group(_) => "group",
            DeletedRecord::GroupExpense(_) => "group expense",
        };

        write!(f, "{kind} '{}'", self.label())
    }
}

/// An entry in the trash.
#[derive(Debug, Clone, PartialEq)]
pub struct DeletedItem {
    pub id: DeletedItemId,
    pub user_id: UserID,
    pub record_id: DatabaseId,
    pub record: DeletedRecord,
    pub deleted_at: OffsetDateTime,
}

impl DeletedItem {
    /// When the item will be purged.
    pub fn expires_at(&self) -> OffsetDateTime {
        self.deleted_at + TRASH_TTL
    }

    pub fn is_expired(&self, now: OffsetDateTime) -> bool {
        now - self.deleted_at > TRASH_TTL
    }
}

pub fn create_deleted_item_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute_batch(
        "CREATE TABLE IF NOT EXISTS deleted_item (
            id INTEGER PRIMARY KEY,
            user_id INTEGER NOT NULL,
            kind TEXT NOT NULL,
            record_id INTEGER NOT NULL,
            label TEXT NOT NULL,
            snapshot TEXT NOT NULL,
            deleted_at TEXT NOT NULL,
            FOREIGN KEY(user_id) REFERENCES user(id) ON UPDATE CASCADE ON DELETE CASCADE
        );

        CREATE INDEX IF NOT EXISTS idx_deleted_item_user ON deleted_item(user_id);",
    )?;

    Ok(())
}

fn insert_deleted_item(
    user_id: UserID,
    record: DeletedRecord,
    deleted_at: OffsetDateTime,
    connection: &Connection,
) -> Result<DeletedItem, Error> {
    let snapshot = serde_json::to_string(&record)?;
    let record_id = record.record_id();

    connection.execute(
        "INSERT INTO deleted_item (user_id, kind, record_id, label, snapshot, deleted_at)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        (
            user_id.as_i64(),
            record.kind(),
            record_id,
            record.label(),
            snapshot,
            deleted_at,
        ),
    )?;

    Ok(DeletedItem {
        id: connection.last_insert_rowid(),
        user_id,
        record_id,
        record,
        deleted_at,
    })
}

/// Move an expense to the trash.
///
/// # Errors
///
/// Returns [Error::DeleteMissingExpense] if the expense does not exist or belongs to
/// another user.
pub fn soft_delete_expense(
    expense_id: ExpenseId,
    user_id: UserID,
    now: OffsetDateTime,
    connection: &Connection,
) -> Result<DeletedItem, Error> {
    let transaction = connection.unchecked_transaction()?;

    let expense = match get_expense(expense_id, user_id, &transaction) {
        Ok(expense) => expense,
        Err(Error::NotFound) => return Err(Error::DeleteMissingExpense),
        Err(error) => return Err(error),
    };
    delete_expense(expense_id, user_id, &transaction)?;
    let item = insert_deleted_item(user_id, DeletedRecord::Expense(expense), now, &transaction)?;

    transaction.commit()?;

    Ok(item)
}

/// Move a lent or borrowed record to the trash.
///
/// # Errors
///
/// Returns [Error::MissingDebt] if the record does not exist or belongs to another user.
pub fn soft_delete_debt(
    kind: DebtKind,
    debt_id: DebtId,
    user_id: UserID,
    now: OffsetDateTime,
    connection: &Connection,
) -> Result<DeletedItem, Error> {
    let transaction = connection.unchecked_transaction()?;

    let debt = get_debt(kind, debt_id, user_id, &transaction)?;
    delete_debt(kind, debt_id, user_id, &transaction)?;
    let item = insert_deleted_item(user_id, DeletedRecord::Debt(debt), now, &transaction)?;

    transaction.commit()?;

    Ok(item)
}

/// Move a split bill and its participants to the trash.
///
/// # Errors
///
/// Returns [Error::MissingSplitBill] if the bill does not exist or belongs to another user.
pub fn soft_delete_split_bill(
    split_bill_id: SplitBillId,
    user_id: UserID,
    now: OffsetDateTime,
    connection: &Connection,
) -> Result<DeletedItem, Error> {
    let transaction = connection.unchecked_transaction()?;

    let bill = get_split_bill(split_bill_id, user_id, &transaction)?;
    delete_split_bill(split_bill_id, user_id, &transaction)?;
    let item = insert_deleted_item(user_id, DeletedRecord::SplitBill(bill), now, &transaction)?;

    transaction.commit()?;

    Ok(item)
}

/// Move a group, its members and its expenses to the trash. Only the owner can do this.
///
/// # Errors
///
/// Returns [Error::DeleteMissingGroup] if the group does not exist or `user_id` does not
/// own it.
pub fn soft_delete_group(
    group_id: GroupId,
    user_id: UserID,
    now: OffsetDateTime,
    connection: &Connection,
) -> Result<DeletedItem, Error> {
    let transaction = connection.unchecked_transaction()?;

    let group = match get_group(group_id, user_id, &transaction) {
        Ok(group) if group.owner_id == user_id => group,
        Ok(_) | Err(Error::NotGroupMember) => return Err(Error::DeleteMissingGroup),
        Err(error) => return Err(error),
    };
    let snapshot = GroupSnapshot {
        members: get_members(group_id, &transaction)?,
        expenses: get_group_expenses(group_id, &transaction)?,
        group,
    };
    delete_group(group_id, user_id, &transaction)?;
    let item = insert_deleted_item(user_id, DeletedRecord::Group(snapshot), now, &transaction)?;

    transaction.commit()?;

    Ok(item)
}

/// Move a group expense to the trash. Any member of the group can do this.
///
/// # Errors
///
/// Returns [Error::DeleteMissingGroupExpense] if the expense does not exist, or
/// [Error::NotGroupMember] if `user_id` is not in the expense's group.
pub fn soft_delete_group_expense(
    expense_id: GroupExpenseId,
    user_id: UserID,
    now: OffsetDateTime,
    connection: &Connection,
) -> Result<DeletedItem, Error> {
    let transaction = connection.unchecked_transaction()?;

    let expense = get_group_expense(expense_id, &transaction)?;
    get_group(expense.group_id, user_id, &transaction)?;
    delete_group_expense(expense_id, &transaction)?;
    let item =
        insert_deleted_item(user_id, DeletedRecord::GroupExpense(expense), now, &transaction)?;

    transaction.commit()?;

    Ok(item)
}

/// Get the items in the user's trash, most recently deleted first.
pub fn get_deleted_items(user_id: UserID, connection: &Connection) -> Result<Vec<DeletedItem>, Error> {
    connection
        .prepare(
            "SELECT id, user_id, record_id, snapshot, deleted_at FROM deleted_item
            WHERE user_id = ?1 ORDER BY deleted_at DESC, id DESC",
        )?
        .query_map([user_id.as_i64()], map_row)?
        .map(|maybe_item| maybe_item.map_err(|error| error.into()))
        .collect()
}

/// # Errors
///
/// Returns [Error::MissingDeletedItem] if the item is not in the user's trash.
pub fn get_deleted_item(
    item_id: DeletedItemId,
    user_id: UserID,
    connection: &Connection,
) -> Result<DeletedItem, Error> {
    connection
        .prepare(
            "SELECT id, user_id, record_id, snapshot, deleted_at FROM deleted_item
            WHERE id = ?1 AND user_id = ?2",
        )?
        .query_row((item_id, user_id.as_i64()), map_row)
        .map_err(|error| match error {
            rusqlite::Error::QueryReturnedNoRows => Error::MissingDeletedItem,
            error => error.into(),
        })
}

/// Put a deleted record back under its original ID and remove it from the trash.
///
/// Nothing changes if the record cannot be put back.
///
/// # Errors
///
/// Returns [Error::RestoreMissingParent] if a record it belongs to, such as the group of
/// a group expense, no longer exists. A group expense also needs its payer and the
/// restoring user to still be in the group, otherwise this returns
/// [Error::RestorePayerNotMember] or [Error::NotGroupMember]. Returns
/// [Error::MissingDeletedItem] if the item is not in the user's trash.
pub fn restore(
    item_id: DeletedItemId,
    user_id: UserID,
    connection: &Connection,
) -> Result<DeletedItem, Error> {
    let transaction = connection.unchecked_transaction()?;

    let item = get_deleted_item(item_id, user_id, &transaction)?;
    let missing_parent = |parent: &'static str| {
        let item = item.record.to_string();
        move |error: rusqlite::Error| {
            if is_foreign_key_violation(&error) {
                Error::RestoreMissingParent { item, parent }
            } else {
                error.into()
            }
        }
    };

    match &item.record {
        DeletedRecord::Expense(expense) => {
            insert_expense_with_id(expense, &transaction).map_err(missing_parent("category"))?
        }
        DeletedRecord::Debt(debt) => {
            insert_debt_with_id(debt, &transaction).map_err(missing_parent("account"))?
        }
        DeletedRecord::SplitBill(bill) => {
            insert_split_bill_with_id(bill, &transaction).map_err(missing_parent("account"))?
        }
        DeletedRecord::Group(snapshot) => {
            insert_group_with_id(&snapshot.group, &transaction)
                .map_err(missing_parent("account"))?;

            for member in &snapshot.members {
                insert_group_member_with_id(member, &transaction)
                    .map_err(missing_parent("member account"))?;
            }

            for expense in &snapshot.expenses {
                insert_group_expense_with_id(expense, &transaction)
                    .map_err(missing_parent("payer account"))?;
            }
        }
        DeletedRecord::GroupExpense(expense) => {
            insert_group_expense_with_id(expense, &transaction)
                .map_err(missing_parent("group"))?;

            let members = get_members(expense.group_id, &transaction)?;
            let is_member = |user: UserID| members.iter().any(|member| member.user_id == user);

            if !is_member(user_id) {
                return Err(Error::NotGroupMember);
            }

            if !is_member(expense.payer_id) {
                return Err(Error::RestorePayerNotMember(item.record.to_string()));
            }
        }
    }

    transaction.execute("DELETE FROM deleted_item WHERE id = ?1", [item.id])?;
    transaction.commit()?;

    tracing::info!("restored {} for user {user_id}", item.record);

    Ok(item)
}

/// Permanently delete an item in the user's trash.
pub fn purge(item_id: DeletedItemId, user_id: UserID, connection: &Connection) -> Result<(), Error> {
    let rows_affected = connection.execute(
        "DELETE FROM deleted_item WHERE id = ?1 AND user_id = ?2",
        (item_id, user_id.as_i64()),
    )?;

    if rows_affected == 0 {
        return Err(Error::MissingDeletedItem);
    }

    Ok(())
}

/// Permanently delete every item, for every user, that was deleted more than 30 days
/// before `now`. Returns the number of items purged.
pub fn purge_expired(now: OffsetDateTime, connection: &Connection) -> Result<usize, Error> {
    let expired = connection
        .prepare("SELECT id, deleted_at FROM deleted_item")?
        .query_map([], |row| {
            Ok((row.get::<_, DeletedItemId>(0)?, row.get::<_, OffsetDateTime>(1)?))
        })?
        .filter_map(|maybe_row| match maybe_row {
            Ok((id, deleted_at)) if now - deleted_at > TRASH_TTL => Some(Ok(id)),
            Ok(_) => None,
            Err(error) => Some(Err(error)),
        })
        .collect::<Result<Vec<_>, _>>()?;

    let transaction = connection.unchecked_transaction()?;
    {
        let mut statement = transaction.prepare("DELETE FROM deleted_item WHERE id = ?1")?;
        for id in &expired {
            statement.execute([id])?;
        }
    }
    transaction.commit()?;

    if !expired.is_empty() {
        tracing::info!("purged {} expired item(s) from the trash", expired.len());
    }

    Ok(expired.len())
}

fn map_row(row: &Row) -> Result<DeletedItem, rusqlite::Error> {
    let snapshot: String = row.get(3)?;
    let record = serde_json::from_str(&snapshot)
        .map_err(|error| rusqlite::Error::FromSqlConversionFailure(3, Type::Text, Box::new(error)))?;

    Ok(DeletedItem {
        id: row.get(0)?,
        user_id: UserID::new(row.get(1)?),
        record_id: row.get(2)?,
        record,
        deleted_at: row.get(4)?,
    })
}
