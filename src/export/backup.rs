//! A JSON document with everything a user owns.

use rusqlite::Connection;
use serde::Serialize;
use time::OffsetDateTime;

use crate::{
    Error,
    auth::{UserID, Username, get_user_by_id},
    budget::{Budget, get_budgets},
    category::{Category, get_categories},
    debt::{Debt, DebtKind, get_debts},
    expense::{Expense, get_all_expenses},
    group::{get_group_expenses, get_members, get_owned_groups},
    invoice::{Invoice, Party, Product, get_invoices, get_parties, get_products},
    preferences::{Preferences, load_preferences},
    split_bill::{SplitBill, get_split_bills},
    trash::GroupSnapshot,
};

/// Bumped whenever the shape of [Backup] changes.
pub const BACKUP_VERSION: u32 = 1;

#[derive(Debug, Serialize)]
pub struct Backup {
    pub version: u32,
    #[serde(with = "time::serde::rfc3339")]
    pub exported_at: OffsetDateTime,
    pub username: Username,
    pub preferences: Preferences,
    pub categories: Vec<Category>,
    pub expenses: Vec<Expense>,
    pub budgets: Vec<Budget>,
    pub lent: Vec<Debt>,
    pub borrowed: Vec<Debt>,
    /// Only the groups the user owns, with all their members and expenses.
    pub groups: Vec<GroupSnapshot>,
    pub split_bills: Vec<SplitBill>,
    pub parties: Vec<Party>,
    pub products: Vec<Product>,
    pub invoices: Vec<Invoice>,
}

/// Gather every row owned by `user_id`.
pub fn build_backup(
    user_id: UserID,
    now: OffsetDateTime,
    connection: &Connection,
) -> Result<Backup, Error> {
    let user = get_user_by_id(user_id, connection)?;

    let groups = get_owned_groups(user_id, connection)?
        .into_iter()
        .map(|group| {
            Ok(GroupSnapshot {
                members: get_members(group.id, connection)?,
                expenses: get_group_expenses(group.id, connection)?,
                group,
            })
        })
        .collect::<Result<Vec<_>, Error>>()?;

    Ok(Backup {
        version: BACKUP_VERSION,
        exported_at: now,
        username: user.username,
        preferences: load_preferences(user_id, connection)?,
        categories: get_categories(user_id, connection)?,
        expenses: get_all_expenses(user_id, connection)?,
        budgets: get_budgets(user_id, connection)?,
        lent: get_debts(DebtKind::Lent, user_id, connection)?,
        borrowed: get_debts(DebtKind::Borrowed, user_id, connection)?,
        groups,
        split_bills: get_split_bills(user_id, connection)?,
        parties: get_parties(user_id, connection)?,
        products: get_products(user_id, connection)?,
        invoices: get_invoices(user_id, connection)?,
    })
}

#[cfg(test)]
mod tests {
    use time::{OffsetDateTime, macros::date};

    use crate::{
        category::{CategoryIcon, CategoryName, create_category},
        expense::{NewExpense, create_expense},
        group::create_group,
        test_utils::{create_test_user, get_test_connection},
    };

    use super::{BACKUP_VERSION, build_backup};

    #[test]
    fn backup_contains_only_the_users_rows() {
        let connection = get_test_connection();
        let user_id = create_test_user("alice", &connection);
        let other_user = create_test_user("bob", &connection);
        let now = OffsetDateTime::now_utc();
        create_category(
            user_id,
            CategoryName::new("Food").unwrap(),
            CategoryIcon::Food,
            &connection,
        )
        .unwrap();
        create_expense(
            NewExpense::new_unchecked(9.5, date!(2025 - 01 - 02), "Lunch"),
            user_id,
            &connection,
        )
        .unwrap();
        create_expense(
            NewExpense::new_unchecked(3.0, date!(2025 - 01 - 02), "Not mine"),
            other_user,
            &connection,
        )
        .unwrap();
        create_group("Flat", user_id, now, &connection).unwrap();
        create_group("Bob's group", other_user, now, &connection).unwrap();

        let backup = build_backup(user_id, now, &connection).unwrap();

        assert_eq!(backup.version, BACKUP_VERSION);
        assert_eq!(backup.username.to_string(), "alice");
        assert_eq!(backup.categories.len(), 1);
        assert_eq!(backup.expenses.len(), 1);
        assert_eq!(backup.groups.len(), 1);
        assert_eq!(backup.groups[0].members.len(), 1);
    }

    #[test]
    fn backup_serializes_to_json_object() {
        let connection = get_test_connection();
        let user_id = create_test_user("alice", &connection);

        let backup = build_backup(user_id, OffsetDateTime::UNIX_EPOCH, &connection).unwrap();
        let json = serde_json::to_value(&backup).unwrap();

        assert_eq!(json["exported_at"], "1970-01-01T00:00:00Z");
        assert_eq!(json["preferences"]["currency"], "USD");
        for key in [
            "categories",
            "expenses",
            "budgets",
            "lent",
            "borrowed",
            "groups",
            "split_bills",
            "parties",
            "products",
            "invoices",
        ] {
            assert!(json[key].is_array(), "want {key} to be an array");
        }
    }
}
