//! Money the user has lent to or borrowed from other people.

mod core;
mod create;
mod page;

pub use core::{
    Debt, DebtId, DebtKind, NewDebt, create_debt, create_debt_tables, delete_debt, get_debt,
    get_debts, insert_debt_with_id, outstanding_total, toggle_settled,
};
pub use create::{create_debt_endpoint, get_new_debt_page};
pub use page::{
    delete_borrowed_endpoint, delete_lent_endpoint, get_debts_page,
    toggle_borrowed_settled_endpoint, toggle_lent_settled_endpoint,
};
