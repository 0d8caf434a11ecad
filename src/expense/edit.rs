//! The edit expense page and the endpoint that saves changes.

use std::sync::{Arc, Mutex};

use axum::{
    Extension,
    extract::{FromRef, Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use axum_extra::extract::Form;
use axum_htmx::HxRedirect;
use maud::html;
use rusqlite::Connection;

use crate::{
    AppState, Error,
    auth::UserID,
    category::get_categories,
    endpoints,
    expense::{
        ExpenseId, NewExpense, get_expense,
        form::{ExpenseForm, ExpenseFormAction, ExpenseFormValues, expense_form},
        update_expense,
    },
    html::{FORM_CONTAINER_STYLE, LINK_STYLE, base},
    navigation::NavBar,
    preferences::load_preferences,
    timezone::local_today,
};

/// The state needed to edit an expense.
#[derive(Debug, Clone)]
pub struct EditExpenseState {
    pub db_connection: Arc<Mutex<Connection>>,
    /// The local timezone as a canonical timezone name, e.g. "Pacific/Auckland".
    pub local_timezone: String,
}

impl FromRef<AppState> for EditExpenseState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
            local_timezone: state.local_timezone.clone(),
        }
    }
}

/// Render the page for editing an expense.
pub async fn get_edit_expense_page(
    Path(expense_id): Path<ExpenseId>,
    State(state): State<EditExpenseState>,
    Extension(user_id): Extension<UserID>,
) -> Result<Response, Error> {
    let connection = state
        .db_connection
        .lock()
        .inspect_err(|error| tracing::error!("could not acquire database lock: {error}"))
        .map_err(|_| Error::DatabaseLockError)?;

    let preferences = load_preferences(user_id, &connection)?;
    let expense = get_expense(expense_id, user_id, &connection)?;
    let categories = get_categories(user_id, &connection)?;

    let edit_url = endpoints::format_endpoint(endpoints::EDIT_EXPENSE_VIEW, expense_id);
    let update_url = endpoints::format_endpoint(endpoints::PUT_EXPENSE, expense_id);
    let nav_bar = NavBar::new(&edit_url, preferences.business_mode).into_html();
    let form = expense_form(
        ExpenseFormAction::Update(&update_url),
        &ExpenseFormValues {
            amount: Some(expense.amount),
            date: Some(expense.date),
            description: &expense.description,
            category_id: expense.category_id,
            receipt_path: None,
        },
        &categories,
        local_today(&state.local_timezone),
    );

    let content = html! {
        (nav_bar)

        div class=(FORM_CONTAINER_STYLE)
        {
            h1 class="text-xl font-bold mb-4" { "Edit Expense" }

            (form)

            @if expense.receipt_path.is_some() {
                p class="mt-4 text-sm"
                {
                    a
                        href=(endpoints::format_endpoint(endpoints::EXPENSE_RECEIPT, expense_id))
                        target="_blank"
                        class=(LINK_STYLE)
                    {
                        "View receipt"
                    }
                }
            }
        }
    };

    Ok(base("Edit Expense", &[], &content).into_response())
}

/// A route handler for updating an expense, redirects to the expenses view on success.
pub async fn update_expense_endpoint(
    Path(expense_id): Path<ExpenseId>,
    State(state): State<EditExpenseState>,
    Extension(user_id): Extension<UserID>,
    Form(form): Form<ExpenseForm>,
) -> Response {
    let today = local_today(&state.local_timezone);

    // The receipt cannot be changed from the edit form.
    let expense = match NewExpense::new(form.amount, form.date, &form.description, today) {
        Ok(expense) => expense.category_id(form.category_id),
        Err(error) => return error.into_alert_response(),
    };

    let connection = match state.db_connection.lock() {
        Ok(connection) => connection,
        Err(error) => {
            tracing::error!("could not acquire database lock: {error}");
            return Error::DatabaseLockError.into_alert_response();
        }
    };

    match update_expense(expense_id, user_id, expense, &connection) {
        Ok(()) => (
            HxRedirect(endpoints::EXPENSES_VIEW.to_owned()),
            StatusCode::SEE_OTHER,
        )
            .into_response(),
        Err(Error::UpdateMissingExpense) => Error::UpdateMissingExpense.into_alert_response(),
        Err(error) => {
            tracing::error!("could not update expense {expense_id}: {error}");
            error.into_alert_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use axum::{
        Extension,
        extract::{Path, State},
        http::StatusCode,
    };
    use axum_extra::extract::Form;
    use time::macros::date;

    use crate::{
        Error,
        auth::UserID,
        endpoints,
        expense::{Expense, NewExpense, create_expense, form::ExpenseForm, get_expense},
        test_utils::{
            assert_form_input_with_value, assert_hx_endpoint, assert_hx_redirect,
            assert_valid_html, create_test_user, get_test_connection, must_get_form,
            parse_html_document,
        },
    };

    use super::{EditExpenseState, get_edit_expense_page, update_expense_endpoint};

    fn get_test_state() -> (EditExpenseState, UserID, Expense) {
        let connection = get_test_connection();
        let user_id = create_test_user("alice", &connection);
        let expense = create_expense(
            NewExpense::new_unchecked(20.0, date!(2025 - 01 - 05), "Books"),
            user_id,
            &connection,
        )
        .unwrap();

        (
            EditExpenseState {
                db_connection: Arc::new(Mutex::new(connection)),
                local_timezone: "Etc/UTC".to_owned(),
            },
            user_id,
            expense,
        )
    }

    #[tokio::test]
    async fn edit_page_shows_current_values() {
        let (state, user_id, expense) = get_test_state();

        let response = get_edit_expense_page(Path(expense.id), State(state), Extension(user_id))
            .await
            .unwrap();

        let html = parse_html_document(response).await;
        assert_valid_html(&html);
        let form = must_get_form(&html);
        assert_hx_endpoint(
            &form,
            &endpoints::format_endpoint(endpoints::PUT_EXPENSE, expense.id),
            "hx-put",
        );
        assert_form_input_with_value(&form, "amount", "number", "20.00");
        assert_form_input_with_value(&form, "date", "date", "2025-01-05");
    }

    #[tokio::test]
    async fn edit_page_for_someone_elses_expense_is_not_found() {
        let (state, _, expense) = get_test_state();
        let bob = create_test_user("bob", &state.db_connection.lock().unwrap());

        let result = get_edit_expense_page(Path(expense.id), State(state), Extension(bob)).await;

        assert_eq!(result.err(), Some(Error::NotFound));
    }

    #[tokio::test]
    async fn update_saves_changes() {
        let (state, user_id, expense) = get_test_state();

        let response = update_expense_endpoint(
            Path(expense.id),
            State(state.clone()),
            Extension(user_id),
            Form(ExpenseForm {
                amount: 25.0,
                date: date!(2025 - 01 - 06),
                description: "More books".to_owned(),
                category_id: None,
                receipt_path: None,
            }),
        )
        .await;

        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_hx_redirect(&response, endpoints::EXPENSES_VIEW);
        let got = get_expense(expense.id, user_id, &state.db_connection.lock().unwrap()).unwrap();
        assert_eq!(got.amount, 25.0);
        assert_eq!(got.description, "More books");
    }

    #[tokio::test]
    async fn update_missing_expense_returns_not_found() {
        let (state, user_id, _) = get_test_state();

        let response = update_expense_endpoint(
            Path(999),
            State(state),
            Extension(user_id),
            Form(ExpenseForm {
                amount: 25.0,
                date: date!(2025 - 01 - 06),
                description: String::new(),
                category_id: None,
                receipt_path: None,
            }),
        )
        .await;

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
