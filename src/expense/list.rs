//! The expenses page, showing one month at a time.

use std::sync::{Arc, Mutex};

use axum::{
    Extension,
    extract::{FromRef, Query, State},
    response::{IntoResponse, Response},
};
use maud::{Markup, html};
use rusqlite::Connection;
use serde::Deserialize;

use crate::{
    AppState, Error,
    auth::UserID,
    endpoints,
    expense::{ExpenseRow, get_expenses_in_month},
    html::{
        BADGE_STYLE, LINK_STYLE, PAGE_CONTAINER_STYLE, TABLE_CELL_STYLE, TABLE_HEADER_STYLE,
        TABLE_ROW_STYLE, base, edit_delete_action_links, format_currency,
    },
    month::YearMonth,
    navigation::NavBar,
    preferences::{Currency, load_preferences},
    timezone::local_today,
};

/// The state needed for the expenses page.
#[derive(Debug, Clone)]
pub struct ExpensesPageState {
    pub db_connection: Arc<Mutex<Connection>>,
    /// The local timezone as a canonical timezone name, e.g. "Pacific/Auckland".
    pub local_timezone: String,
}

impl FromRef<AppState> for ExpensesPageState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
            local_timezone: state.local_timezone.clone(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct MonthQuery {
    /// The month to show, defaults to the current month.
    pub month: Option<YearMonth>,
}

/// Render the expenses recorded in a month.
pub async fn get_expenses_page(
    State(state): State<ExpensesPageState>,
    Extension(user_id): Extension<UserID>,
    Query(query): Query<MonthQuery>,
) -> Result<Response, Error> {
    let month = query
        .month
        .unwrap_or_else(|| YearMonth::containing(local_today(&state.local_timezone)));

    let connection = state
        .db_connection
        .lock()
        .inspect_err(|error| tracing::error!("could not acquire database lock: {error}"))
        .map_err(|_| Error::DatabaseLockError)?;

    let preferences = load_preferences(user_id, &connection)?;
    let expenses = get_expenses_in_month(user_id, month, &connection)
        .inspect_err(|error| tracing::error!("Could not get expenses for {month}: {error}"))?;

    let nav_bar = NavBar::new(endpoints::EXPENSES_VIEW, preferences.business_mode).into_html();

    Ok(expenses_view(nav_bar, month, &expenses, preferences.currency).into_response())
}

fn month_url(month: YearMonth) -> String {
    format!("{}?month={month}", endpoints::EXPENSES_VIEW)
}

fn expenses_view(
    nav_bar: Markup,
    month: YearMonth,
    expenses: &[ExpenseRow],
    currency: Currency,
) -> Markup {
    let total: f64 = expenses.iter().map(|row| row.expense.amount).sum();

    let table_row = |row: &ExpenseRow| {
        let expense = &row.expense;
        let edit_url = endpoints::format_endpoint(endpoints::EDIT_EXPENSE_VIEW, expense.id);
        let delete_url = endpoints::format_endpoint(endpoints::DELETE_EXPENSE, expense.id);
        let confirm_message = format!(
            "Move '{}' to the trash? You can restore it for 30 days.",
            expense.description
        );

        html!(
            tr class=(TABLE_ROW_STYLE)
            {
                td class=(TABLE_CELL_STYLE) { (expense.date) }
                td class=(TABLE_CELL_STYLE)
                {
                    (expense.description)

                    @if expense.receipt_path.is_some() {
                        " "
                        a
                            href=(endpoints::format_endpoint(endpoints::EXPENSE_RECEIPT, expense.id))
                            target="_blank"
                            class=(LINK_STYLE)
                        {
                            "(receipt)"
                        }
                    }
                }
                td class=(TABLE_CELL_STYLE)
                {
                    @match (&row.category_name, row.category_icon) {
                        (Some(name), Some(icon)) => {
                            span class=(BADGE_STYLE) { (icon.glyph()) " " (name) }
                        }
                        _ => { span class="text-gray-400" { "Uncategorised" } }
                    }
                }
                td class=(format!("{TABLE_CELL_STYLE} text-right tabular-nums"))
                {
                    (format_currency(expense.amount, currency))
                }
                td class=(TABLE_CELL_STYLE)
                {
                    div class="flex gap-4"
                    {
                        (edit_delete_action_links(
                            &edit_url,
                            &delete_url,
                            &confirm_message,
                            "closest tr",
                            "delete",
                        ))
                    }
                }
            }
        )
    };

    let content = html!(
        (nav_bar)

        main class=(PAGE_CONTAINER_STYLE)
        {
            section class="space-y-4"
            {
                header class="flex justify-between flex-wrap items-end gap-2"
                {
                    h1 class="text-xl font-bold" { "Expenses" }

                    div class="flex gap-4"
                    {
                        a href=(endpoints::SCAN_BILL_VIEW) class=(LINK_STYLE) { "Scan Receipt" }
                        a href=(endpoints::NEW_EXPENSE_VIEW) class=(LINK_STYLE) { "Add Expense" }
                    }
                }

                nav class="flex justify-between items-center" aria-label="Month"
                {
                    a href=(month_url(month.previous())) class=(LINK_STYLE) { "← Previous" }
                    h2 class="text-lg font-semibold" data-month=(month) { (month.label()) }
                    a href=(month_url(month.next())) class=(LINK_STYLE) { "Next →" }
                }

                p class="text-right font-semibold" id="month-total"
                {
                    "Total: " (format_currency(total, currency))
                }

                div class="overflow-x-auto"
                {
                    table class="w-full text-sm text-left text-gray-500 dark:text-gray-400"
                    {
                        thead class=(TABLE_HEADER_STYLE)
                        {
                            tr
                            {
                                th scope="col" class=(TABLE_CELL_STYLE) { "Date" }
                                th scope="col" class=(TABLE_CELL_STYLE) { "Description" }
                                th scope="col" class=(TABLE_CELL_STYLE) { "Category" }
                                th scope="col" class=(format!("{TABLE_CELL_STYLE} text-right")) { "Amount" }
                                th scope="col" class=(TABLE_CELL_STYLE) { "Actions" }
                            }
                        }

                        tbody
                        {
                            @for row in expenses {
                                (table_row(row))
                            }

                            @if expenses.is_empty() {
                                tr
                                {
                                    td colspan="5" class="px-6 py-4 text-center"
                                    {
                                        "No expenses in " (month.label()) ". "
                                        a href=(endpoints::NEW_EXPENSE_VIEW) class=(LINK_STYLE)
                                        {
                                            "Add one"
                                        }
                                    }
                                }
                            }
                        }
                    }
                }
            }
        }
    );

    base("Expenses", &[], &content)
}
