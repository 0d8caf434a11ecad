//! The new expense page and the endpoint that creates expenses.

use std::sync::{Arc, Mutex};

use axum::{
    Extension,
    extract::{FromRef, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
// Must use axum_extra's Form since that parses an empty string as None instead
// of crashing like axum::Form.
use axum_extra::extract::Form;
use axum_htmx::HxRedirect;
use maud::html;
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use time::Date;

use crate::{
    AppState, Error,
    auth::UserID,
    category::{Category, CategoryId, get_categories},
    endpoints,
    expense::{
        NewExpense, create_expense,
        form::{ExpenseForm, ExpenseFormAction, ExpenseFormValues, expense_form},
    },
    html::{FORM_CONTAINER_STYLE, LINK_STYLE, base},
    navigation::NavBar,
    preferences::load_preferences,
    receipt::is_receipt_path_owned_by,
    timezone::local_today,
};

/// The state needed to show the new expense page or create an expense.
#[derive(Debug, Clone)]
pub struct CreateExpenseState {
    pub db_connection: Arc<Mutex<Connection>>,
    /// The local timezone as a canonical timezone name, e.g. "Pacific/Auckland".
    pub local_timezone: String,
}

impl FromRef<AppState> for CreateExpenseState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
            local_timezone: state.local_timezone.clone(),
        }
    }
}

/// Values used to fill in the new expense form, e.g. from a scanned receipt.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct ExpensePrefill {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub amount: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date: Option<Date>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// The name of a suggested category, matched against the user's categories.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub receipt_path: Option<String>,
}

/// Render the new expense page.
pub async fn get_new_expense_page(
    State(state): State<CreateExpenseState>,
    Extension(user_id): Extension<UserID>,
    Query(prefill): Query<ExpensePrefill>,
) -> Result<Response, Error> {
    let connection = state
        .db_connection
        .lock()
        .inspect_err(|error| tracing::error!("could not acquire database lock: {error}"))
        .map_err(|_| Error::DatabaseLockError)?;

    let preferences = load_preferences(user_id, &connection)?;
    let categories = get_categories(user_id, &connection)?;
    let today = local_today(&state.local_timezone);

    let values = ExpenseFormValues {
        amount: prefill.amount,
        date: prefill.date.filter(|date| *date <= today),
        description: prefill.description.as_deref().unwrap_or_default(),
        category_id: suggested_category(prefill.category.as_deref(), &categories),
        receipt_path: prefill.receipt_path.as_deref(),
    };

    let nav_bar = NavBar::new(endpoints::NEW_EXPENSE_VIEW, preferences.business_mode).into_html();
    let form = expense_form(
        ExpenseFormAction::Create(endpoints::POST_EXPENSE),
        &values,
        &categories,
        today,
    );

    let content = html! {
        (nav_bar)

        div class=(FORM_CONTAINER_STYLE)
        {
            h1 class="text-xl font-bold mb-4" { "New Expense" }

            (form)

            p class="mt-4 text-sm"
            {
                "Have a receipt? "
                a href=(endpoints::SCAN_BILL_VIEW) class=(LINK_STYLE) { "Scan it instead" }
            }
        }
    };

    Ok(base("New Expense", &[], &content).into_response())
}

/// Find the user's category whose name matches `suggestion`, ignoring case.
fn suggested_category(
    suggestion: Option<&str>,
    categories: &[Category],
) -> Option<CategoryId> {
    let suggestion = suggestion?.trim();

    categories
        .iter()
        .find(|category| category.name.as_ref().eq_ignore_ascii_case(suggestion))
        .map(|category| category.id)
}

/// A route handler for creating a new expense, redirects to the expenses view on success.
pub async fn create_expense_endpoint(
    State(state): State<CreateExpenseState>,
    Extension(user_id): Extension<UserID>,
    Form(form): Form<ExpenseForm>,
) -> Response {
    let today = local_today(&state.local_timezone);

    let new_expense = match NewExpense::new(form.amount, form.date, &form.description, today) {
        Ok(new_expense) => new_expense
            .category_id(form.category_id)
            .receipt_path(form.receipt_path),
        Err(error) => return error.into_alert_response(),
    };

    if let Some(receipt_path) = &new_expense.receipt_path {
        if !is_receipt_path_owned_by(receipt_path, user_id) {
            tracing::warn!("User {user_id} tried to attach receipt {receipt_path}");
            return Error::NotFound.into_alert_response();
        }
    }

    let connection = match state.db_connection.lock() {
        Ok(connection) => connection,
        Err(error) => {
            tracing::error!("could not acquire database lock: {error}");
            return Error::DatabaseLockError.into_alert_response();
        }
    };

    if let Err(error) = create_expense(new_expense, user_id, &connection) {
        tracing::error!("could not create expense: {error}");

        return error.into_alert_response();
    }

    (
        HxRedirect(endpoints::EXPENSES_VIEW.to_owned()),
        StatusCode::SEE_OTHER,
    )
        .into_response()
}
