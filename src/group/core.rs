//! Groups of users who share expenses, and their storage.

use rusqlite::{Connection, Row, types::Type};
use serde::{Deserialize, Serialize};
use time::{Date, OffsetDateTime};

use crate::{
    Error,
    auth::{UserID, get_user_by_username},
    database_id::DatabaseId,
    db::is_unique_violation,
};

pub type GroupId = DatabaseId;
pub type GroupMemberId = DatabaseId;
pub type GroupExpenseId = DatabaseId;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Group {
    pub id: GroupId,
    /// The user who created the group. Only they can delete it.
    pub owner_id: UserID,
    pub name: String,
    pub created_at: OffsetDateTime,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupMember {
    pub id: GroupMemberId,
    pub group_id: GroupId,
    pub user_id: UserID,
    pub username: String,
    pub joined_at: OffsetDateTime,
}

/// An expense paid by one member on behalf of some or all of the group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupExpense {
    pub id: GroupExpenseId,
    pub group_id: GroupId,
    pub payer_id: UserID,
    pub amount: f64,
    pub description: String,
    pub date: Date,
    /// The members sharing the expense, empty when everyone shares it.
    pub split_data: Vec<UserID>,
}

/// A group expense that has not been saved yet.
#[derive(Debug, Clone, PartialEq)]
pub struct NewGroupExpense {
    pub payer_id: UserID,
    pub amount: f64,
    pub description: String,
    pub date: Date,
    pub split_data: Vec<UserID>,
}

/// Create the group, group member and group expense tables.
///
/// IDs are never reused so that deleted groups and expenses can be restored under
/// their original IDs.
pub fn create_group_tables(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute_batch(
        r#"CREATE TABLE IF NOT EXISTS "group" (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            owner_id INTEGER NOT NULL,
            name TEXT NOT NULL,
            created_at TEXT NOT NULL,
            FOREIGN KEY(owner_id) REFERENCES user(id) ON UPDATE CASCADE ON DELETE CASCADE
        );

        CREATE TABLE IF NOT EXISTS group_member (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            group_id INTEGER NOT NULL,
            user_id INTEGER NOT NULL,
            joined_at TEXT NOT NULL,
            UNIQUE(group_id, user_id),
            FOREIGN KEY(group_id) REFERENCES "group"(id) ON UPDATE CASCADE ON DELETE CASCADE,
            FOREIGN KEY(user_id) REFERENCES user(id) ON UPDATE CASCADE ON DELETE CASCADE
        );

        CREATE TABLE IF NOT EXISTS group_expense (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            group_id INTEGER NOT NULL,
            payer_id INTEGER NOT NULL,
            amount REAL NOT NULL,
            description TEXT NOT NULL,
            date TEXT NOT NULL,
            split_data TEXT NOT NULL DEFAULT '[]',
            FOREIGN KEY(group_id) REFERENCES "group"(id) ON UPDATE CASCADE ON DELETE CASCADE,
            FOREIGN KEY(payer_id) REFERENCES user(id) ON UPDATE CASCADE ON DELETE CASCADE
        );"#,
    )?;

    Ok(())
}

/// Create a group with `owner_id` as its first member.
pub fn create_group(
    name: &str,
    owner_id: UserID,
    now: OffsetDateTime,
    connection: &Connection,
) -> Result<Group, Error> {
    let name = name.trim();
    if name.is_empty() {
        return Err(Error::EmptyField("Group name"));
    }

    let transaction = connection.unchecked_transaction()?;

    let group = transaction
        .prepare(
            r#"INSERT INTO "group" (owner_id, name, created_at) VALUES (?1, ?2, ?3)
            RETURNING id, owner_id, name, created_at"#,
        )?
        .query_row((owner_id.as_i64(), name, now), map_group_row)?;

    transaction.execute(
        "INSERT INTO group_member (group_id, user_id, joined_at) VALUES (?1, ?2, ?3)",
        (group.id, owner_id.as_i64(), now),
    )?;

    transaction.commit()?;

    Ok(group)
}

pub fn insert_group_with_id(group: &Group, connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        r#"INSERT INTO "group" (id, owner_id, name, created_at) VALUES (?1, ?2, ?3, ?4)"#,
        (group.id, group.owner_id.as_i64(), &group.name, group.created_at),
    )?;

    Ok(())
}

/// Get a group that `user_id` belongs to.
///
/// # Errors
///
/// Returns [Error::NotGroupMember] if the group does not exist or the user is not a member.
pub fn get_group(group_id: GroupId, user_id: UserID, connection: &Connection) -> Result<Group, Error> {
    connection
        .prepare(
            r#"SELECT g.id, g.owner_id, g.name, g.created_at FROM "group" g
            INNER JOIN group_member m ON m.group_id = g.id
            WHERE g.id = ?1 AND m.user_id = ?2"#,
        )?
        .query_row((group_id, user_id.as_i64()), map_group_row)
        .map_err(|error| match error {
            rusqlite::Error::QueryReturnedNoRows => Error::NotGroupMember,
            error => error.into(),
        })
}

/// Get the groups `user_id` belongs to, newest first.
pub fn get_groups_for_user(user_id: UserID, connection: &Connection) -> Result<Vec<Group>, Error> {
    connection
        .prepare(
            r#"SELECT g.id, g.owner_id, g.name, g.created_at FROM "group" g
            INNER JOIN group_member m ON m.group_id = g.id
            WHERE m.user_id = ?1
            ORDER BY g.created_at DESC, g.id DESC"#,
        )?
        .query_map([user_id.as_i64()], map_group_row)?
        .map(|maybe_group| maybe_group.map_err(|error| error.into()))
        .collect()
}

/// Get the groups `user_id` created.
pub fn get_owned_groups(user_id: UserID, connection: &Connection) -> Result<Vec<Group>, Error> {
    connection
        .prepare(
            r#"SELECT id, owner_id, name, created_at FROM "group"
            WHERE owner_id = ?1 ORDER BY id"#,
        )?
        .query_map([user_id.as_i64()], map_group_row)?
        .map(|maybe_group| maybe_group.map_err(|error| error.into()))
        .collect()
}

/// Permanently delete a group owned by `owner_id`, along with its members and expenses.
pub fn delete_group(group_id: GroupId, owner_id: UserID, connection: &Connection) -> Result<(), Error> {
    let rows_affected = connection.execute(
        r#"DELETE FROM "group" WHERE id = ?1 AND owner_id = ?2"#,
        (group_id, owner_id.as_i64()),
    )?;

    if rows_affected == 0 {
        return Err(Error::DeleteMissingGroup);
    }

    Ok(())
}

/// Add the user called `username` to a group.
///
/// # Errors
///
/// Returns [Error::UnknownUsername] if no user has that name, or
/// [Error::DuplicateGroupMember] if they are already in the group.
pub fn add_member(
    group_id: GroupId,
    username: &str,
    now: OffsetDateTime,
    connection: &Connection,
) -> Result<GroupMember, Error> {
    let user = match get_user_by_username(username, connection) {
        Ok(user) => user,
        Err(Error::NotFound) => return Err(Error::UnknownUsername(username.trim().to_owned())),
        Err(error) => return Err(error),
    };

    let result = connection
        .prepare(
            "INSERT INTO group_member (group_id, user_id, joined_at) VALUES (?1, ?2, ?3)
            RETURNING id",
        )?
        .query_row((group_id, user.id.as_i64(), now), |row| row.get(0));

    match result {
        Ok(id) => Ok(GroupMember {
            id,
            group_id,
            user_id: user.id,
            username: user.username.to_string(),
            joined_at: now,
        }),
        Err(error) if is_unique_violation(&error) => {
            Err(Error::DuplicateGroupMember(user.username.to_string()))
        }
        Err(error) => Err(error.into()),
    }
}

pub fn insert_group_member_with_id(
    member: &GroupMember,
    connection: &Connection,
) -> Result<(), rusqlite::Error> {
    connection.execute(
        "INSERT INTO group_member (id, group_id, user_id, joined_at) VALUES (?1, ?2, ?3, ?4)",
        (member.id, member.group_id, member.user_id.as_i64(), member.joined_at),
    )?;

    Ok(())
}

/// Get the members of a group ordered by user ID.
pub fn get_members(group_id: GroupId, connection: &Connection) -> Result<Vec<GroupMember>, Error> {
    connection
        .prepare(
            "SELECT m.id, m.group_id, m.user_id, u.username, m.joined_at FROM group_member m
            INNER JOIN user u ON u.id = m.user_id
            WHERE m.group_id = ?1
            ORDER BY m.user_id",
        )?
        .query_map([group_id], map_member_row)?
        .map(|maybe_member| maybe_member.map_err(|error| error.into()))
        .collect()
}

pub fn get_member(member_id: GroupMemberId, connection: &Connection) -> Result<GroupMember, Error> {
    connection
        .prepare(
            "SELECT m.id, m.group_id, m.user_id, u.username, m.joined_at FROM group_member m
            INNER JOIN user u ON u.id = m.user_id
            WHERE m.id = ?1",
        )?
        .query_row([member_id], map_member_row)
        .map_err(|error| match error {
            rusqlite::Error::QueryReturnedNoRows => Error::DeleteMissingGroupMember,
            error => error.into(),
        })
}

/// Remove a member from a group. `acting_user` must be in the same group.
///
/// # Errors
///
/// Returns [Error::RemoveGroupOwner] if the member owns the group, and
/// [Error::MemberHasExpenses] if the member paid for or shares any expense in the group,
/// since removing them would change everyone else's balance.
pub fn remove_member(
    member_id: GroupMemberId,
    acting_user: UserID,
    connection: &Connection,
) -> Result<GroupMember, Error> {
    let member = get_member(member_id, connection)?;
    let group = get_group(member.group_id, acting_user, connection)?;

    if member.user_id == group.owner_id {
        return Err(Error::RemoveGroupOwner);
    }

    let has_expenses = get_group_expenses(member.group_id, connection)?
        .iter()
        .any(|expense| {
            expense.payer_id == member.user_id || expense.split_data.contains(&member.user_id)
        });

    if has_expenses {
        return Err(Error::MemberHasExpenses(member.username));
    }

    connection.execute("DELETE FROM group_member WHERE id = ?1", [member_id])?;

    Ok(member)
}

/// Add an expense to a group.
///
/// # Errors
///
/// Returns [Error::NonPositiveAmount] for amounts of zero or less, and
/// [Error::NotGroupMember] if the payer or a participant is not in the group.
pub fn create_group_expense(
    group_id: GroupId,
    new_expense: NewGroupExpense,
    connection: &Connection,
) -> Result<GroupExpense, Error> {
    if !new_expense.amount.is_finite() || new_expense.amount <= 0.0 {
        return Err(Error::NonPositiveAmount(new_expense.amount));
    }

    let members = get_members(group_id, connection)?;
    let is_member = |user_id: &UserID| members.iter().any(|member| member.user_id == *user_id);

    if !is_member(&new_expense.payer_id) || !new_expense.split_data.iter().all(is_member) {
        return Err(Error::NotGroupMember);
    }

    let split_data = serde_json::to_string(&new_expense.split_data)?;

    connection
        .prepare(
            "INSERT INTO group_expense (group_id, payer_id, amount, description, date, split_data)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            RETURNING id, group_id, payer_id, amount, description, date, split_data",
        )?
        .query_row(
            (
                group_id,
                new_expense.payer_id.as_i64(),
                new_expense.amount,
                new_expense.description.trim(),
                new_expense.date,
                split_data,
            ),
            map_expense_row,
        )
        .map_err(|error| error.into())
}

pub fn insert_group_expense_with_id(
    expense: &GroupExpense,
    connection: &Connection,
) -> Result<(), rusqlite::Error> {
    let split_data = serde_json::to_string(&expense.split_data)
        .map_err(|error| rusqlite::Error::ToSqlConversionFailure(Box::new(error)))?;

    connection.execute(
        "INSERT INTO group_expense (id, group_id, payer_id, amount, description, date, split_data)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        (
            expense.id,
            expense.group_id,
            expense.payer_id.as_i64(),
            expense.amount,
            &expense.description,
            expense.date,
            split_data,
        ),
    )?;

    Ok(())
}

/// Get a group's expenses, newest first.
pub fn get_group_expenses(
    group_id: GroupId,
    connection: &Connection,
) -> Result<Vec<GroupExpense>, Error> {
    connection
        .prepare(
            "SELECT id, group_id, payer_id, amount, description, date, split_data
            FROM group_expense WHERE group_id = ?1
            ORDER BY date DESC, id DESC",
        )?
        .query_map([group_id], map_expense_row)?
        .map(|maybe_expense| maybe_expense.map_err(|error| error.into()))
        .collect()
}

pub fn get_group_expense(
    expense_id: GroupExpenseId,
    connection: &Connection,
) -> Result<GroupExpense, Error> {
    connection
        .prepare(
            "SELECT id, group_id, payer_id, amount, description, date, split_data
            FROM group_expense WHERE id = ?1",
        )?
        .query_row([expense_id], map_expense_row)
        .map_err(|error| match error {
            rusqlite::Error::QueryReturnedNoRows => Error::DeleteMissingGroupExpense,
            error => error.into(),
        })
}

/// Permanently delete a group expense.
pub fn delete_group_expense(expense_id: GroupExpenseId, connection: &Connection) -> Result<(), Error> {
    let rows_affected =
        connection.execute("DELETE FROM group_expense WHERE id = ?1", [expense_id])?;

    if rows_affected == 0 {
        return Err(Error::DeleteMissingGroupExpense);
    }

    Ok(())
}

fn map_group_row(row: &Row) -> Result<Group, rusqlite::Error> {
    Ok(Group {
        id: row.get(0)?,
        owner_id: UserID::new(row.get(1)?),
        name: row.get(2)?,
        created_at: row.get(3)?,
    })
}

fn map_member_row(row: &Row) -> Result<GroupMember, rusqlite::Error> {
    Ok(GroupMember {
        id: row.get(0)?,
        group_id: row.get(1)?,
        user_id: UserID::new(row.get(2)?),
        username: row.get(3)?,
        joined_at: row.get(4)?,
    })
}

fn map_expense_row(row: &Row) -> Result<GroupExpense, rusqlite::Error> {
    let split_data: String = row.get(6)?;
    let split_data = serde_json::from_str(&split_data)
        .map_err(|error| rusqlite::Error::FromSqlConversionFailure(6, Type::Text, Box::new(error)))?;

    Ok(GroupExpense {
        id: row.get(0)?,
        group_id: row.get(1)?,
        payer_id: UserID::new(row.get(2)?),
        amount: row.get(3)?,
        description: row.get(4)?,
        date: row.get(5)?,
        split_data,
    })
}

#[cfg(test)]
mod tests {
    use time::{OffsetDateTime, macros::date};

    use crate::{
        Error,
        auth::UserID,
        group::{
            NewGroupExpense, add_member, create_group, create_group_expense, delete_group,
            get_group, get_group_expenses, get_groups_for_user, get_members, remove_member,
        },
        test_utils::{create_test_user, get_test_connection},
    };

    fn new_expense(payer_id: UserID, amount: f64, split_data: Vec<UserID>) -> NewGroupExpense {
        NewGroupExpense {
            payer_id,
            amount,
            description: "Dinner".to_owned(),
            date: date!(2025 - 01 - 10),
            split_data,
        }
    }

    #[test]
    fn creator_is_first_member() {
        let connection = get_test_connection();
        let alice = create_test_user("alice", &connection);

        let group = create_group("Trip", alice, OffsetDateTime::now_utc(), &connection).unwrap();

        let members = get_members(group.id, &connection).unwrap();
        assert_eq!(members.len(), 1);
        assert_eq!(members[0].user_id, alice);
        assert_eq!(members[0].username, "alice");
        assert_eq!(get_groups_for_user(alice, &connection), Ok(vec![group]));
    }

    #[test]
    fn empty_group_name_is_rejected() {
        let connection = get_test_connection();
        let alice = create_test_user("alice", &connection);

        assert_eq!(
            create_group(" ", alice, OffsetDateTime::now_utc(), &connection),
            Err(Error::EmptyField("Group name"))
        );
    }

    #[test]
    fn only_members_can_see_group() {
        let connection = get_test_connection();
        let alice = create_test_user("alice", &connection);
        let bob = create_test_user("bob", &connection);
        let group = create_group("Trip", alice, OffsetDateTime::now_utc(), &connection).unwrap();

        assert_eq!(get_group(group.id, bob, &connection), Err(Error::NotGroupMember));

        add_member(group.id, "bob", OffsetDateTime::now_utc(), &connection).unwrap();

        assert_eq!(get_group(group.id, bob, &connection), Ok(group));
    }

    #[test]
    fn add_member_errors() {
        let connection = get_test_connection();
        let alice = create_test_user("alice", &connection);
        let group = create_group("Trip", alice, OffsetDateTime::now_utc(), &connection).unwrap();

        assert_eq!(
            add_member(group.id, "nobody", OffsetDateTime::now_utc(), &connection),
            Err(Error::UnknownUsername("nobody".to_owned()))
        );
        assert_eq!(
            add_member(group.id, "alice", OffsetDateTime::now_utc(), &connection),
            Err(Error::DuplicateGroupMember("alice".to_owned()))
        );
    }

    #[test]
    fn expense_payer_must_be_member() {
        let connection = get_test_connection();
        let alice = create_test_user("alice", &connection);
        let bob = create_test_user("bob", &connection);
        let group = create_group("Trip", alice, OffsetDateTime::now_utc(), &connection).unwrap();

        assert_eq!(
            create_group_expense(group.id, new_expense(bob, 10.0, vec![]), &connection),
            Err(Error::NotGroupMember)
        );
        assert_eq!(
            create_group_expense(group.id, new_expense(alice, 10.0, vec![bob]), &connection),
            Err(Error::NotGroupMember)
        );
        assert_eq!(
            create_group_expense(group.id, new_expense(alice, 0.0, vec![]), &connection),
            Err(Error::NonPositiveAmount(0.0))
        );
    }

    #[test]
    fn split_data_is_stored() {
        let connection = get_test_connection();
        let alice = create_test_user("alice", &connection);
        let bob = create_test_user("bob", &connection);
        let group = create_group("Trip", alice, OffsetDateTime::now_utc(), &connection).unwrap();
        add_member(group.id, "bob", OffsetDateTime::now_utc(), &connection).unwrap();

        let expense =
            create_group_expense(group.id, new_expense(alice, 10.0, vec![bob]), &connection)
                .unwrap();

        assert_eq!(expense.split_data, vec![bob]);
        assert_eq!(get_group_expenses(group.id, &connection), Ok(vec![expense]));
    }

    #[test]
    fn member_with_expenses_cannot_be_removed() {
        let connection = get_test_connection();
        let alice = create_test_user("alice", &connection);
        let bob = create_test_user("bob", &connection);
        create_test_user("carol", &connection);
        let group = create_group("Trip", alice, OffsetDateTime::now_utc(), &connection).unwrap();
        let bob_member = add_member(group.id, "bob", OffsetDateTime::now_utc(), &connection).unwrap();
        let carol_member =
            add_member(group.id, "carol", OffsetDateTime::now_utc(), &connection).unwrap();
        create_group_expense(group.id, new_expense(alice, 10.0, vec![alice, bob]), &connection)
            .unwrap();

        assert_eq!(
            remove_member(bob_member.id, alice, &connection),
            Err(Error::MemberHasExpenses("bob".to_owned()))
        );
        assert!(remove_member(carol_member.id, alice, &connection).is_ok());
        assert_eq!(get_members(group.id, &connection).unwrap().len(), 2);
    }

    #[test]
    fn owner_cannot_be_removed() {
        let connection = get_test_connection();
        let alice = create_test_user("alice", &connection);
        let bob = create_test_user("bob", &connection);
        let group = create_group("Trip", alice, OffsetDateTime::now_utc(), &connection).unwrap();
        add_member(group.id, "bob", OffsetDateTime::now_utc(), &connection).unwrap();
        let owner = get_members(group.id, &connection)
            .unwrap()
            .into_iter()
            .find(|member| member.user_id == alice)
            .unwrap();

        assert_eq!(
            remove_member(owner.id, bob, &connection),
            Err(Error::RemoveGroupOwner)
        );
        assert_eq!(
            remove_member(owner.id, alice, &connection),
            Err(Error::RemoveGroupOwner)
        );
        assert_eq!(get_members(group.id, &connection).unwrap().len(), 2);
        assert_eq!(get_group(group.id, alice, &connection).unwrap().owner_id, alice);
    }

    #[test]
    fn only_owner_can_delete_group() {
        let connection = get_test_connection();
        let alice = create_test_user("alice", &connection);
        let bob = create_test_user("bob", &connection);
        let group = create_group("Trip", alice, OffsetDateTime::now_utc(), &connection).unwrap();
        add_member(group.id, "bob", OffsetDateTime::now_utc(), &connection).unwrap();

        assert_eq!(
            delete_group(group.id, bob, &connection),
            Err(Error::DeleteMissingGroup)
        );
        assert_eq!(delete_group(group.id, alice, &connection), Ok(()));
        assert_eq!(get_members(group.id, &connection), Ok(vec![]));
    }
}
