//! The budgets page and the endpoint for setting a month's budget.

use std::sync::{Arc, Mutex};

use axum::{
    Extension,
    extract::{FromRef, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use axum_extra::extract::Form;
use axum_htmx::HxRedirect;
use maud::{Markup, html};
use rusqlite::Connection;
use serde::{Deserialize, Serialize};

use crate::{
    AppState, Error,
    auth::UserID,
    budget::{Budget, BudgetStatus, get_budgets, set_budget, sum_by_month},
    endpoints,
    expense::get_all_expenses,
    html::{
        BUTTON_PRIMARY_STYLE, CARD_STYLE, FORM_LABEL_STYLE, FORM_TEXT_INPUT_STYLE,
        PAGE_CONTAINER_STYLE, TABLE_CELL_STYLE, TABLE_HEADER_STYLE, TABLE_ROW_STYLE, base,
        format_currency,
    },
    month::YearMonth,
    navigation::NavBar,
    preferences::{Currency, load_preferences},
    timezone::local_today,
};

/// The state needed for the budgets page and endpoint.
#[derive(Debug, Clone)]
pub struct BudgetsState {
    pub db_connection: Arc<Mutex<Connection>>,
    /// The local timezone as a canonical timezone name, e.g. "Pacific/Auckland".
    pub local_timezone: String,
}

impl FromRef<AppState> for BudgetsState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
            local_timezone: state.local_timezone.clone(),
        }
    }
}

/// Render every budget the user has set alongside what was spent that month.
pub async fn get_budgets_page(
    State(state): State<BudgetsState>,
    Extension(user_id): Extension<UserID>,
) -> Result<Response, Error> {
    let connection = state
        .db_connection
        .lock()
        .inspect_err(|error| tracing::error!("could not acquire database lock: {error}"))
        .map_err(|_| Error::DatabaseLockError)?;

    let preferences = load_preferences(user_id, &connection)?;
    let budgets = get_budgets(user_id, &connection)?;
    let expenses = get_all_expenses(user_id, &connection)?;

    let budgets = budgets
        .into_iter()
        .map(|budget| {
            let status = BudgetStatus::new(budget.amount, sum_by_month(&expenses, budget.month));
            (budget, status)
        })
        .collect::<Vec<_>>();

    let current_month = YearMonth::containing(local_today(&state.local_timezone));
    let nav_bar = NavBar::new(endpoints::BUDGETS_VIEW, preferences.business_mode).into_html();

    Ok(budgets_view(nav_bar, current_month, &budgets, preferences.currency).into_response())
}

/// A bar showing how much of a budget has been used, red once it is exceeded.
pub fn budget_progress_bar(status: &BudgetStatus) -> Markup {
    let width = status.percent_used.clamp(0.0, 100.0);
    let colour = if status.is_over_budget {
        "bg-red-600"
    } else if status.percent_used >= 80.0 {
        "bg-yellow-400"
    } else {
        "bg-green-600"
    };

    html! {
        div
            class="w-full h-2.5 bg-gray-200 rounded-full dark:bg-gray-700"
            role="progressbar"
            aria-valuenow=(format!("{:.0}", status.percent_used))
            aria-valuemin="0"
            aria-valuemax="100"
        {
            div class=(format!("h-2.5 rounded-full {colour}")) style=(format!("width: {width:.1}%")) {}
        }
    }
}

fn budgets_view(
    nav_bar: Markup,
    current_month: YearMonth,
    budgets: &[(Budget, BudgetStatus)],
    currency: Currency,
) -> Markup {
    let content = html! {
        (nav_bar)

        main class=(PAGE_CONTAINER_STYLE)
        {
            section class="space-y-6"
            {
                h1 class="text-xl font-bold" { "Budgets" }

                div class=(CARD_STYLE)
                {
                    (budget_form(current_month))
                }

                table class="w-full text-sm text-left text-gray-500 dark:text-gray-400"
                {
                    thead class=(TABLE_HEADER_STYLE)
                    {
                        tr
                        {
                            th scope="col" class=(TABLE_CELL_STYLE) { "Month" }
                            th scope="col" class=(TABLE_CELL_STYLE) { "Budget" }
                            th scope="col" class=(TABLE_CELL_STYLE) { "Spent" }
                            th scope="col" class=(TABLE_CELL_STYLE) { "Remaining" }
                            th scope="col" class=(TABLE_CELL_STYLE) { "Used" }
                        }
                    }

                    tbody
                    {
                        @for (budget, status) in budgets {
                            tr class=(TABLE_ROW_STYLE) data-over-budget=(status.is_over_budget)
                            {
                                td class=(TABLE_CELL_STYLE) { (budget.month.label()) }
                                td class=(TABLE_CELL_STYLE) { (format_currency(status.budget, currency)) }
                                td class=(TABLE_CELL_STYLE) { (format_currency(status.spent, currency)) }
                                td class=(TABLE_CELL_STYLE)
                                {
                                    @if status.is_over_budget {
                                        span class="text-red-600 dark:text-red-400"
                                        {
                                            (format_currency(status.remaining, currency))
                                        }
                                    } @else {
                                        (format_currency(status.remaining, currency))
                                    }
                                }
                                td class=(format!("{TABLE_CELL_STYLE} min-w-32"))
                                {
                                    (budget_progress_bar(status))
                                    span class="text-xs" { (format!("{:.0}%", status.percent_used)) }
                                }
                            }
                        }

                        @if budgets.is_empty() {
                            tr
                            {
                                td colspan="5" class="px-6 py-4 text-center"
                                {
                                    "No budgets set yet. Use the form above to set one."
                                }
                            }
                        }
                    }
                }
            }
        }
    };

    base("Budgets", &[], &content)
}

fn budget_form(current_month: YearMonth) -> Markup {
    html! {
        form
            hx-post=(endpoints::POST_BUDGET)
            hx-target-error="#alert-container"
            class="grid gap-4 md:grid-cols-3 items-end"
        {
            div
            {
                label for="month" class=(FORM_LABEL_STYLE) { "Month" }

                input
                    id="month"
                    type="month"
                    name="month"
                    value=(current_month)
                    required
                    class=(FORM_TEXT_INPUT_STYLE);
            }

            div
            {
                label for="amount" class=(FORM_LABEL_STYLE) { "Budget" }

                input
                    id="amount"
                    type="number"
                    name="amount"
                    step="0.01"
                    min="0"
                    placeholder="0.00"
                    required
                    class=(FORM_TEXT_INPUT_STYLE);
            }

            button type="submit" class=(BUTTON_PRIMARY_STYLE) { "Set Budget" }
        }
    }
}

/// The form data for setting a budget.
#[derive(Debug, Serialize, Deserialize)]
pub struct BudgetForm {
    pub month: YearMonth,
    pub amount: f64,
}

/// Set the budget for a month, reloading the budgets page on success.
pub async fn set_budget_endpoint(
    State(state): State<BudgetsState>,
    Extension(user_id): Extension<UserID>,
    Form(form): Form<BudgetForm>,
) -> Response {
    let connection = match state.db_connection.lock() {
        Ok(connection) => connection,
        Err(error) => {
            tracing::error!("could not acquire database lock: {error}");
            return Error::DatabaseLockError.into_alert_response();
        }
    };

    match set_budget(user_id, form.month, form.amount, &connection) {
        Ok(_) => (
            HxRedirect(endpoints::BUDGETS_VIEW.to_owned()),
            StatusCode::SEE_OTHER,
        )
            .into_response(),
        Err(error) => {
            tracing::error!("could not set budget for {}: {error}", form.month);
            error.into_alert_response()
        }
    }
}
