//! Monthly budgets and the aggregate calculations behind them.

mod aggregate;
mod core;
mod page;

pub use aggregate::{percentage_of_total, sum_by_category, sum_by_month};
pub use core::{Budget, BudgetStatus, create_budget_table, get_budget, get_budgets, set_budget};
pub use page::{budget_progress_bar, get_budgets_page, set_budget_endpoint};
