//! The dashboard: this month at a glance.

use std::sync::{Arc, Mutex};

use axum::{
    Extension,
    extract::{FromRef, State},
    response::{IntoResponse, Response},
};
use maud::{Markup, html};
use rusqlite::Connection;

use crate::{
    AppState, Error,
    auth::UserID,
    budget::{BudgetStatus, budget_progress_bar, get_budget},
    dashboard::{
        CategoryTotal, DashboardChart, category_breakdown, category_chart, chart_container,
        charts_script,
    },
    debt::{DebtKind, outstanding_total},
    endpoints,
    expense::{ExpenseRow, get_expenses_in_month},
    html::{
        CARD_STYLE, HeadElement, LINK_STYLE, PAGE_CONTAINER_STYLE, TABLE_CELL_STYLE,
        TABLE_HEADER_STYLE, TABLE_ROW_STYLE, base, format_currency,
    },
    month::YearMonth,
    navigation::NavBar,
    preferences::{Currency, load_preferences},
    timezone::local_today,
};

const RECENT_EXPENSE_COUNT: usize = 5;
const CATEGORY_CHART_ID: &str = "category-chart";

/// The state needed for the dashboard page.
#[derive(Debug, Clone)]
pub struct DashboardState {
    pub db_connection: Arc<Mutex<Connection>>,
    /// The local timezone as a canonical timezone name, e.g. "Pacific/Auckland".
    pub local_timezone: String,
}

impl FromRef<AppState> for DashboardState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
            local_timezone: state.local_timezone.clone(),
        }
    }
}

struct MonthSummary {
    month: YearMonth,
    spent: f64,
    spent_last_month: f64,
    expense_count: usize,
}

struct Outstanding {
    owed_to_you: f64,
    you_owe: f64,
}

/// Render the dashboard for the current month.
pub async fn get_dashboard_page(
    State(state): State<DashboardState>,
    Extension(user_id): Extension<UserID>,
) -> Result<Response, Error> {
    let connection = state
        .db_connection
        .lock()
        .inspect_err(|error| tracing::error!("could not acquire database lock: {error}"))
        .map_err(|_| Error::DatabaseLockError)?;

    let preferences = load_preferences(user_id, &connection)?;
    let month = YearMonth::containing(local_today(&state.local_timezone));

    let rows = get_expenses_in_month(user_id, month, &connection)?;
    let last_month_rows = get_expenses_in_month(user_id, month.previous(), &connection)?;
    let budget = get_budget(user_id, month, &connection)?;
    let outstanding = Outstanding {
        owed_to_you: outstanding_total(DebtKind::Lent, user_id, &connection)?,
        you_owe: outstanding_total(DebtKind::Borrowed, user_id, &connection)?,
    };

    let summary = MonthSummary {
        month,
        spent: total(&rows),
        spent_last_month: total(&last_month_rows),
        expense_count: rows.len(),
    };
    let budget_status = budget.map(|budget| BudgetStatus::new(budget.amount, summary.spent));
    let breakdown = category_breakdown(&rows);

    let nav_bar = NavBar::new(endpoints::DASHBOARD_VIEW, preferences.business_mode).into_html();

    let content = html! {
        (nav_bar)

        div class=(PAGE_CONTAINER_STYLE)
        {
            h1 class="text-2xl font-bold mb-4" { (month.label()) }

            div class="grid gap-4 md:grid-cols-3 w-full mb-6"
            {
                (summary_card(&summary, preferences.currency))
                (budget_card(budget_status.as_ref(), preferences.currency))
                (outstanding_card(&outstanding, preferences.currency))
            }

            @if rows.is_empty() {
                (empty_state())
            } @else {
                (breakdown_section(&breakdown, preferences.currency))
                (recent_expenses(&rows, preferences.currency))
            }
        }
    };

    let head_elements = if breakdown.is_empty() {
        Vec::new()
    } else {
        let chart = DashboardChart {
            id: CATEGORY_CHART_ID,
            options: category_chart(&breakdown, preferences.currency).to_string(),
        };

        vec![
            HeadElement::ScriptLink("/static/echarts.6.0.0.min.js".to_owned()),
            charts_script(&[chart]),
        ]
    };

    Ok(base("Dashboard", &head_elements, &content).into_response())
}

fn total(rows: &[ExpenseRow]) -> f64 {
    rows.iter().map(|row| row.expense.amount).sum()
}

fn summary_card(summary: &MonthSummary, currency: Currency) -> Markup {
    let change = summary.spent - summary.spent_last_month;

    html! {
        section id="month-summary" class=(CARD_STYLE)
        {
            h2 class="text-lg font-semibold" { "Spent this month" }
            p id="month-total" class="text-3xl font-bold" { (format_currency(summary.spent, currency)) }
            p class="text-sm text-gray-600 dark:text-gray-400"
            {
                (summary.expense_count) " expenses. "
                @if change > 0.0 {
                    (format_currency(change, currency)) " more than " (summary.month.previous().label()) "."
                } @else if change < 0.0 {
                    (format_currency(-change, currency)) " less than " (summary.month.previous().label()) "."
                } @else {
                    "Same as " (summary.month.previous().label()) "."
                }
            }
        }
    }
}

fn budget_card(status: Option<&BudgetStatus>, currency: Currency) -> Markup {
    html! {
        section id="budget-status" class=(CARD_STYLE)
        {
            h2 class="text-lg font-semibold" { "Budget" }

            @match status {
                Some(status) => {
                    p
                    {
                        (format_currency(status.spent, currency))
                        " of "
                        (format_currency(status.budget, currency))
                    }
                    (budget_progress_bar(status))
                    @if status.is_over_budget {
                        p class="text-red-600 text-sm" {
                            "Over by " (format_currency(-status.remaining, currency))
                        }
                    } @else {
                        p class="text-sm" { (format_currency(status.remaining, currency)) " left" }
                    }
                }
                None => {
                    p class="text-sm"
                    {
                        "No budget set for this month. "
                        a href=(endpoints::BUDGETS_VIEW) class=(LINK_STYLE) { "Set one" }
                    }
                }
            }
        }
    }
}

fn outstanding_card(outstanding: &Outstanding, currency: Currency) -> Markup {
    html! {
        section id="outstanding-debts" class=(CARD_STYLE)
        {
            h2 class="text-lg font-semibold" { "Outstanding" }
            dl class="grid grid-cols-2 gap-1"
            {
                dt { "Owed to you" }
                dd id="owed-to-you" class="text-right text-green-700" {
                    (format_currency(outstanding.owed_to_you, currency))
                }
                dt { "You owe" }
                dd id="you-owe" class="text-right text-red-600" {
                    (format_currency(outstanding.you_owe, currency))
                }
            }
            a href=(endpoints::DEBTS_VIEW) class=(LINK_STYLE) { "View debts" }
        }
    }
}

fn empty_state() -> Markup {
    html! {
        div id="dashboard-empty" class="text-center py-8"
        {
            p class="mb-2" { "No expenses recorded this month." }
            a href=(endpoints::NEW_EXPENSE_VIEW) class=(LINK_STYLE) { "Add an expense" }
        }
    }
}

fn breakdown_section(breakdown: &[CategoryTotal], currency: Currency) -> Markup {
    html! {
        section class="w-full mb-6"
        {
            (chart_container(CATEGORY_CHART_ID))

            table id="category-breakdown" class="w-full mt-4 text-sm text-left"
            {
                thead class=(TABLE_HEADER_STYLE)
                {
                    tr
                    {
                        th class=(TABLE_CELL_STYLE) { "Category" }
                        th class=(TABLE_CELL_STYLE) { "Spent" }
                        th class=(TABLE_CELL_STYLE) { "Share" }
                    }
                }
                tbody
                {
                    @for category in breakdown {
                        tr class=(TABLE_ROW_STYLE)
                        {
                            td class=(TABLE_CELL_STYLE)
                            {
                                @if let Some(glyph) = category.glyph { (glyph) " " }
                                (category.name)
                            }
                            td class=(TABLE_CELL_STYLE) { (format_currency(category.total, currency)) }
                            td class=(TABLE_CELL_STYLE) { (format!("{:.0}%", category.percent)) }
                        }
                    }
                }
            }
        }
    }
}

fn recent_expenses(rows: &[ExpenseRow], currency: Currency) -> Markup {
    html! {
        section class="w-full"
        {
            div class="flex justify-between items-center mb-2"
            {
                h2 class="text-lg font-semibold" { "Recent expenses" }
                a href=(endpoints::EXPENSES_VIEW) class=(LINK_STYLE) { "See all" }
            }

            ul id="recent-expenses" class="divide-y divide-gray-200 dark:divide-gray-700"
            {
                @for row in rows.iter().take(RECENT_EXPENSE_COUNT) {
                    li class="flex justify-between py-2"
                    {
                        span { (row.expense.date) " " (row.expense.description) }
                        span { (format_currency(row.expense.amount, currency)) }
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use axum::{Extension, extract::State};
    use scraper::Selector;
    use time::{Duration, OffsetDateTime};

    use crate::{
        budget::set_budget,
        debt::{DebtKind, NewDebt, create_debt},
        expense::{NewExpense, create_expense},
        month::YearMonth,
        preferences::Currency,
        html::format_currency,
        test_utils::{
            assert_status_ok, assert_valid_html, count_elements, create_test_user, element_text,
            get_test_connection, parse_html_document,
        },
    };

    use super::{DashboardState, get_dashboard_page};

    #[tokio::test]
    async fn shows_month_totals_budget_and_debts() {
        let connection = get_test_connection();
        let user_id = create_test_user("alice", &connection);
        let today = OffsetDateTime::now_utc().date();
        let month = YearMonth::containing(today);
        create_expense(
            NewExpense::new_unchecked(30.0, month.first_day(), "Groceries"),
            user_id,
            &connection,
        )
        .unwrap();
        create_expense(
            NewExpense::new_unchecked(10.0, month.first_day(), "Bus"),
            user_id,
            &connection,
        )
        .unwrap();
        create_expense(
            NewExpense::new_unchecked(99.0, month.first_day() - Duration::days(1), "Last month"),
            user_id,
            &connection,
        )
        .unwrap();
        set_budget(user_id, month, 100.0, &connection).unwrap();
        create_debt(
            NewDebt::new(DebtKind::Lent, "Bob", 25.0, month.first_day(), None, "").unwrap(),
            user_id,
            &connection,
        )
        .unwrap();
        let state = DashboardState {
            db_connection: Arc::new(Mutex::new(connection)),
            local_timezone: "Etc/UTC".to_owned(),
        };

        let response = get_dashboard_page(State(state), Extension(user_id))
            .await
            .unwrap();

        assert_status_ok(&response);
        let html = parse_html_document(response).await;
        assert_valid_html(&html);
        assert_eq!(
            element_text(&html, "#month-total"),
            format_currency(40.0, Currency::Usd)
        );
        assert!(element_text(&html, "#budget-status").contains("$60.00 left"));
        assert_eq!(
            element_text(&html, "#owed-to-you"),
            format_currency(25.0, Currency::Usd)
        );
        assert_eq!(element_text(&html, "#you-owe"), format_currency(0.0, Currency::Usd));
        assert_eq!(count_elements(&html, "#category-breakdown tbody tr"), 1);
        assert_eq!(count_elements(&html, "#recent-expenses li"), 2);
    }

    #[tokio::test]
    async fn empty_month_links_to_new_expense() {
        let connection = get_test_connection();
        let user_id = create_test_user("alice", &connection);
        let state = DashboardState {
            db_connection: Arc::new(Mutex::new(connection)),
            local_timezone: "Etc/UTC".to_owned(),
        };

        let response = get_dashboard_page(State(state), Extension(user_id))
            .await
            .unwrap();

        let html = parse_html_document(response).await;
        assert_valid_html(&html);
        let link = Selector::parse("#dashboard-empty a").unwrap();
        let link = html.select(&link).next().expect("want empty state link");
        assert_eq!(link.value().attr("href"), Some(crate::endpoints::NEW_EXPENSE_VIEW));
        assert!(element_text(&html, "#budget-status").contains("No budget set"));
    }
}
