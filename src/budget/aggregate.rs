//! Aggregates over expenses: filter the expenses of interest, then reduce them to a number.

use std::collections::HashMap;

use crate::{category::CategoryId, expense::Expense, month::YearMonth};

/// The total spent in `month`.
pub fn sum_by_month(expenses: &[Expense], month: YearMonth) -> f64 {
    expenses
        .iter()
        .filter(|expense| month.contains(expense.date))
        .map(|expense| expense.amount)
        .sum()
}

/// The total spent per category, uncategorised expenses are keyed by `None`.
pub fn sum_by_category(expenses: &[Expense]) -> HashMap<Option<CategoryId>, f64> {
    expenses.iter().fold(HashMap::new(), |mut totals, expense| {
        *totals.entry(expense.category_id).or_insert(0.0) += expense.amount;
        totals
    })
}

/// `part` as a percentage of `total`, or zero when there is no total.
pub fn percentage_of_total(part: f64, total: f64) -> f64 {
    if total <= 0.0 {
        return 0.0;
    }

    part / total * 100.0
}

#[cfg(test)]
mod tests {
    use time::{Date, macros::date};

    use crate::{
        auth::UserID,
        budget::{percentage_of_total, sum_by_category, sum_by_month},
        expense::Expense,
        month::YearMonth,
    };

    fn expense(id: i64, amount: f64, date: Date, category_id: Option<i64>) -> Expense {
        Expense {
            id,
            user_id: UserID::new(1),
            amount,
            date,
            description: String::new(),
            category_id,
            receipt_path: None,
        }
    }

    #[test]
    fn sum_by_month_only_counts_that_month() {
        let expenses = [
            expense(1, 10.0, date!(2025 - 01 - 31), None),
            expense(2, 5.5, date!(2025 - 01 - 01), Some(1)),
            expense(3, 100.0, date!(2025 - 02 - 01), None),
        ];

        let total = sum_by_month(&expenses, YearMonth::containing(date!(2025 - 01 - 15)));

        assert_eq!(total, 15.5);
    }

    #[test]
    fn sum_by_category_groups_uncategorised() {
        let expenses = [
            expense(1, 10.0, date!(2025 - 01 - 02), Some(1)),
            expense(2, 2.0, date!(2025 - 01 - 03), Some(1)),
            expense(3, 4.0, date!(2025 - 01 - 04), None),
        ];

        let totals = sum_by_category(&expenses);

        assert_eq!(totals.len(), 2);
        assert_eq!(totals[&Some(1)], 12.0);
        assert_eq!(totals[&None], 4.0);
    }

    #[test]
    fn percentage_of_zero_total_is_zero() {
        assert_eq!(percentage_of_total(5.0, 0.0), 0.0);
        assert_eq!(percentage_of_total(25.0, 200.0), 12.5);
    }
}
