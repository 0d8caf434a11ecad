//! Database operations for categories.

use rusqlite::{Connection, Row};

use crate::{
    Error,
    auth::UserID,
    category::{Category, CategoryIcon, CategoryId, CategoryName},
};

/// Initialize the category table.
pub fn create_category_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute_batch(
        "CREATE TABLE IF NOT EXISTS category (
            id INTEGER PRIMARY KEY,
            user_id INTEGER NOT NULL,
            name TEXT NOT NULL,
            icon TEXT NOT NULL DEFAULT 'other',
            FOREIGN KEY(user_id) REFERENCES user(id) ON UPDATE CASCADE ON DELETE CASCADE
        );

        CREATE INDEX IF NOT EXISTS idx_category_user ON category(user_id);",
    )?;

    Ok(())
}

/// Create a category and return it with its generated ID.
pub fn create_category(
    user_id: UserID,
    name: CategoryName,
    icon: CategoryIcon,
    connection: &Connection,
) -> Result<Category, Error> {
    connection.execute(
        "INSERT INTO category (user_id, name, icon) VALUES (?1, ?2, ?3)",
        (user_id.as_i64(), name.as_ref(), icon),
    )?;

    let id = connection.last_insert_rowid();

    Ok(Category {
        id,
        user_id,
        name,
        icon,
    })
}

/// Retrieve a single category owned by `user_id`.
pub fn get_category(
    category_id: CategoryId,
    user_id: UserID,
    connection: &Connection,
) -> Result<Category, Error> {
    connection
        .prepare(
            "SELECT id, user_id, name, icon FROM category
            WHERE id = :id AND user_id = :user_id",
        )?
        .query_row(
            &[(":id", &category_id), (":user_id", &user_id.as_i64())],
            map_row,
        )
        .map_err(|error| error.into())
}

/// Retrieve all of a user's categories ordered alphabetically by name.
pub fn get_categories(user_id: UserID, connection: &Connection) -> Result<Vec<Category>, Error> {
    connection
        .prepare(
            "SELECT id, user_id, name, icon FROM category
            WHERE user_id = :user_id ORDER BY name COLLATE NOCASE ASC",
        )?
        .query_map(&[(":user_id", &user_id.as_i64())], map_row)?
        .map(|maybe_category| maybe_category.map_err(|error| error.into()))
        .collect()
}

/// Delete a category. Expenses in the category become uncategorised.
///
/// # Errors
///
/// Returns [Error::DeleteMissingCategory] if the user has no such category.
pub fn delete_category(
    category_id: CategoryId,
    user_id: UserID,
    connection: &Connection,
) -> Result<(), Error> {
    let rows_affected = connection.execute(
        "DELETE FROM category WHERE id = ?1 AND user_id = ?2",
        (category_id, user_id.as_i64()),
    )?;

    if rows_affected == 0 {
        return Err(Error::DeleteMissingCategory);
    }

    Ok(())
}

fn map_row(row: &Row) -> Result<Category, rusqlite::Error> {
    let raw_name: String = row.get(2)?;

    Ok(Category {
        id: row.get(0)?,
        user_id: UserID::new(row.get(1)?),
        name: CategoryName::new_unchecked(&raw_name),
        icon: row.get(3)?,
    })
}

#[cfg(test)]
mod tests {
    use crate::{
        Error,
        category::{
            CategoryIcon, CategoryName, create_category, delete_category, get_categories,
            get_category,
        },
        test_utils::{create_test_user, get_test_connection},
    };

    #[test]
    fn create_and_get_category() {
        let connection = get_test_connection();
        let user_id = create_test_user("alice", &connection);

        let category = create_category(
            user_id,
            CategoryName::new_unchecked("Groceries"),
            CategoryIcon::Food,
            &connection,
        )
        .unwrap();

        assert_eq!(get_category(category.id, user_id, &connection), Ok(category));
    }

    #[test]
    fn categories_are_private() {
        let connection = get_test_connection();
        let alice = create_test_user("alice", &connection);
        let bob = create_test_user("bob", &connection);
        let category = create_category(
            alice,
            CategoryName::new_unchecked("Rent"),
            CategoryIcon::Housing,
            &connection,
        )
        .unwrap();

        assert_eq!(
            get_category(category.id, bob, &connection),
            Err(Error::NotFound)
        );
        assert_eq!(get_categories(bob, &connection), Ok(vec![]));
        assert_eq!(
            delete_category(category.id, bob, &connection),
            Err(Error::DeleteMissingCategory)
        );
    }

    #[test]
    fn categories_are_sorted_by_name() {
        let connection = get_test_connection();
        let user_id = create_test_user("alice", &connection);
        for name in ["travel", "Bills", "Food"] {
            create_category(
                user_id,
                CategoryName::new_unchecked(name),
                CategoryIcon::Other,
                &connection,
            )
            .unwrap();
        }

        let names = get_categories(user_id, &connection)
            .unwrap()
            .into_iter()
            .map(|category| category.name.to_string())
            .collect::<Vec<_>>();

        assert_eq!(names, ["Bills", "Food", "travel"]);
    }

    #[test]
    fn delete_category_removes_it() {
        let connection = get_test_connection();
        let user_id = create_test_user("alice", &connection);
        let category = create_category(
            user_id,
            CategoryName::new_unchecked("Rent"),
            CategoryIcon::Housing,
            &connection,
        )
        .unwrap();

        delete_category(category.id, user_id, &connection).unwrap();

        assert_eq!(
            get_category(category.id, user_id, &connection),
            Err(Error::NotFound)
        );
    }
}
