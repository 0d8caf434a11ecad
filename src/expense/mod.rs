//! Expense tracking: the expense model, its queries and the pages for managing expenses.

mod core;
mod create;
mod delete;
mod edit;
mod form;
mod list;

pub use core::{
    Expense, ExpenseId, ExpenseRow, NewExpense, create_expense, create_expense_table,
    delete_expense, get_all_expenses, get_expense, get_expenses_in_month, insert_expense_with_id,
    update_expense,
};
pub use create::{ExpensePrefill, create_expense_endpoint, get_new_expense_page};
pub use delete::delete_expense_endpoint;
pub use edit::{get_edit_expense_page, update_expense_endpoint};
pub use list::get_expenses_page;
