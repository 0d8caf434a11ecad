//! Expenses as CSV with the columns date, description, category and amount.

use std::collections::HashMap;

use rusqlite::Connection;
use serde::Serialize;

use crate::{
    Error,
    auth::UserID,
    category::{CategoryId, get_categories},
    expense::{Expense, get_all_expenses},
};

#[derive(Debug, Serialize)]
struct ExpenseRecord<'a> {
    date: String,
    description: &'a str,
    category: &'a str,
    amount: String,
}

/// Write `expenses` as CSV, looking up category names in `category_names`.
pub fn expenses_to_csv(
    expenses: &[Expense],
    category_names: &HashMap<CategoryId, String>,
) -> Result<String, Error> {
    let mut writer = csv::Writer::from_writer(Vec::new());

    for expense in expenses {
        let category = expense
            .category_id
            .and_then(|category_id| category_names.get(&category_id))
            .map(String::as_str)
            .unwrap_or_default();

        writer
            .serialize(ExpenseRecord {
                date: expense.date.to_string(),
                description: &expense.description,
                category,
                amount: format!("{:.2}", expense.amount),
            })
            .map_err(|error| Error::CsvError(error.to_string()))?;
    }

    // An empty export still gets a header row.
    if expenses.is_empty() {
        writer
            .write_record(["date", "description", "category", "amount"])
            .map_err(|error| Error::CsvError(error.to_string()))?;
    }

    let bytes = writer
        .into_inner()
        .map_err(|error| Error::CsvError(error.to_string()))?;

    String::from_utf8(bytes).map_err(|error| Error::CsvError(error.to_string()))
}

/// All of the user's expenses as CSV, oldest first.
pub fn export_expenses_csv(user_id: UserID, connection: &Connection) -> Result<String, Error> {
    let category_names: HashMap<CategoryId, String> = get_categories(user_id, connection)?
        .into_iter()
        .map(|category| (category.id, category.name.as_ref().to_owned()))
        .collect();

    let mut expenses = get_all_expenses(user_id, connection)?;
    expenses.sort_by(|a, b| a.date.cmp(&b.date).then(a.id.cmp(&b.id)));

    expenses_to_csv(&expenses, &category_names)
}
