//! Reduces the month's expenses to the numbers shown on the dashboard.

use std::collections::HashMap;

use crate::{
    budget::{percentage_of_total, sum_by_category},
    category::CategoryId,
    expense::{Expense, ExpenseRow},
};

const UNCATEGORISED: &str = "Uncategorised";

/// The spending in one category.
#[derive(Debug, Clone, PartialEq)]
pub struct CategoryTotal {
    pub name: String,
    pub glyph: Option<&'static str>,
    pub total: f64,
    /// Share of the month's spending, 0 to 100.
    pub percent: f64,
}

/// Total the rows per category, largest first.
pub fn category_breakdown(rows: &[ExpenseRow]) -> Vec<CategoryTotal> {
    let expenses: Vec<Expense> = rows.iter().map(|row| row.expense.clone()).collect();
    let month_total: f64 = expenses.iter().map(|expense| expense.amount).sum();

    let labels: HashMap<Option<CategoryId>, (String, Option<&'static str>)> = rows
        .iter()
        .map(|row| {
            let name = row
                .category_name
                .clone()
                .unwrap_or_else(|| UNCATEGORISED.to_owned());
            let glyph = row.category_icon.map(|icon| icon.glyph());

            (row.expense.category_id, (name, glyph))
        })
        .collect();

    let mut totals: Vec<CategoryTotal> = sum_by_category(&expenses)
        .into_iter()
        .map(|(category_id, total)| {
            let (name, glyph) = labels
                .get(&category_id)
                .cloned()
                .unwrap_or_else(|| (UNCATEGORISED.to_owned(), None));

            CategoryTotal {
                name,
                glyph,
                total,
                percent: percentage_of_total(total, month_total),
            }
        })
        .collect();

    totals.sort_by(|a, b| b.total.total_cmp(&a.total).then_with(|| a.name.cmp(&b.name)));
    totals
}

#[cfg(test)]
mod tests {
    use time::macros::date;

    use crate::{
        auth::UserID,
        category::CategoryIcon,
        expense::{Expense, ExpenseRow},
    };

    use super::category_breakdown;

    fn row(id: i64, amount: f64, category: Option<(i64, &str)>) -> ExpenseRow {
        ExpenseRow {
            expense: Expense {
                id,
                user_id: UserID::new(1),
                amount,
                date: date!(2025 - 01 - 10),
                description: String::new(),
                category_id: category.map(|(id, _)| id),
                receipt_path: None,
            },
            category_name: category.map(|(_, name)| name.to_owned()),
            category_icon: category.map(|_| CategoryIcon::Food),
        }
    }

    #[test]
    fn groups_and_sorts_by_total() {
        let rows = [
            row(1, 10.0, Some((1, "Food"))),
            row(2, 30.0, None),
            row(3, 20.0, Some((1, "Food"))),
            row(4, 40.0, Some((2, "Rent"))),
        ];

        let got = category_breakdown(&rows);

        let summary: Vec<(&str, f64, f64)> = got
            .iter()
            .map(|total| (total.name.as_str(), total.total, total.percent))
            .collect();
        assert_eq!(
            summary,
            [
                ("Rent", 40.0, 40.0),
                ("Food", 30.0, 30.0),
                ("Uncategorised", 30.0, 30.0),
            ]
        );
        assert_eq!(got[0].glyph, Some("🍔"));
        assert_eq!(got[2].glyph, None);
    }

    #[test]
    fn no_expenses_no_breakdown() {
        assert!(category_breakdown(&[]).is_empty());
    }
}
