//! The page and endpoint for recording lent or borrowed money.

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
use time::Date;

use crate::{
    AppState, Error,
    auth::UserID,
    debt::{DebtKind, NewDebt, create_debt},
    endpoints,
    html::{BUTTON_PRIMARY_STYLE, FORM_CONTAINER_STYLE, FORM_LABEL_STYLE, FORM_TEXT_INPUT_STYLE, base},
    navigation::NavBar,
    preferences::load_preferences,
    timezone::local_today,
};

/// The state needed for recording lent or borrowed money.
#[derive(Debug, Clone)]
pub struct CreateDebtState {
    pub db_connection: Arc<Mutex<Connection>>,
    /// The local timezone as a canonical timezone name, e.g. "Pacific/Auckland".
    pub local_timezone: String,
}

impl FromRef<AppState> for CreateDebtState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
            local_timezone: state.local_timezone.clone(),
        }
    }
}

pub async fn get_new_debt_page(
    State(state): State<CreateDebtState>,
    Extension(user_id): Extension<UserID>,
) -> Result<Response, Error> {
    let connection = state
        .db_connection
        .lock()
        .inspect_err(|error| tracing::error!("could not acquire database lock: {error}"))
        .map_err(|_| Error::DatabaseLockError)?;
    let preferences = load_preferences(user_id, &connection)?;
    let today = local_today(&state.local_timezone);

    let nav_bar = NavBar::new(endpoints::NEW_DEBT_VIEW, preferences.business_mode).into_html();
    let content = html! {
        (nav_bar)
        div class=(FORM_CONTAINER_STYLE) { (debt_form(today)) }
    };

    Ok(base("Add Lent or Borrowed", &[], &content).into_response())
}

fn debt_form(today: Date) -> Markup {
    html! {
        form
            hx-post=(endpoints::POST_DEBT)
            hx-target-error="#alert-container"
            class="w-full space-y-4 md:space-y-6"
        {
            div
            {
                label for="kind" class=(FORM_LABEL_STYLE) { "Type" }

                select id="kind" name="kind" required class=(FORM_TEXT_INPUT_STYLE)
                {
                    option value=(DebtKind::Lent.key()) selected { "I lent money" }
                    option value=(DebtKind::Borrowed.key()) { "I borrowed money" }
                }
            }

            div
            {
                label for="person" class=(FORM_LABEL_STYLE) { "Person" }

                input
                    id="person"
                    type="text"
                    name="person"
                    placeholder="Who?"
                    required
                    autofocus
                    class=(FORM_TEXT_INPUT_STYLE);
            }

            div
            {
                label for="amount" class=(FORM_LABEL_STYLE) { "Amount" }

                input
                    id="amount"
                    type="number"
                    name="amount"
                    step="0.01"
                    min="0.01"
                    placeholder="0.00"
                    required
                    class=(FORM_TEXT_INPUT_STYLE);
            }

            div
            {
                label for="date" class=(FORM_LABEL_STYLE) { "Date" }

                input
                    id="date"
                    type="date"
                    name="date"
                    value=(today)
                    required
                    class=(FORM_TEXT_INPUT_STYLE);
            }

            div
            {
                label for="due_date" class=(FORM_LABEL_STYLE) { "Due date (optional)" }

                input id="due_date" type="date" name="due_date" class=(FORM_TEXT_INPUT_STYLE);
            }

            div
            {
                label for="note" class=(FORM_LABEL_STYLE) { "Note" }

                input id="note" type="text" name="note" class=(FORM_TEXT_INPUT_STYLE);
            }

            button type="submit" class=(BUTTON_PRIMARY_STYLE) { "Save" }
        }
    }
}

/// The form data for recording lent or borrowed money.
#[derive(Debug, Serialize, Deserialize)]
pub struct DebtForm {
    pub kind: DebtKind,
    pub person: String,
    pub amount: f64,
    pub date: Date,
    #[serde(default)]
    pub due_date: Option<Date>,
    #[serde(default)]
    pub note: String,
}

pub async fn create_debt_endpoint(
    State(state): State<CreateDebtState>,
    Extension(user_id): Extension<UserID>,
    Form(form): Form<DebtForm>,
) -> Response {
    let new_debt = match NewDebt::new(
        form.kind,
        &form.person,
        form.amount,
        form.date,
        form.due_date,
        &form.note,
    ) {
        Ok(new_debt) => new_debt,
        Err(error) => return error.into_alert_response(),
    };

    let connection = match state.db_connection.lock() {
        Ok(connection) => connection,
        Err(error) => {
            tracing::error!("could not acquire database lock: {error}");
            return Error::DatabaseLockError.into_alert_response();
        }
    };

    match create_debt(new_debt, user_id, &connection) {
        Ok(_) => (
            HxRedirect(endpoints::DEBTS_VIEW.to_owned()),
            StatusCode::SEE_OTHER,
        )
            .into_response(),
        Err(error) => {
            tracing::error!("An unexpected error occurred while creating a debt record: {error}");
            error.into_alert_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use axum::{Extension, extract::State, http::StatusCode};
    use axum_extra::extract::Form;
    use time::macros::date;

    use crate::{
        auth::UserID,
        debt::{DebtKind, get_debts},
        endpoints,
        test_utils::{
            assert_form_input, assert_form_select, assert_hx_endpoint, assert_hx_redirect,
            assert_valid_html, create_test_user, get_test_connection, must_get_form,
            parse_html_document,
        },
    };

    use super::{CreateDebtState, DebtForm, create_debt_endpoint, get_new_debt_page};

    fn get_test_state() -> (CreateDebtState, UserID) {
        let connection = get_test_connection();
        let user_id = create_test_user("alice", &connection);

        (
            CreateDebtState {
                db_connection: Arc::new(Mutex::new(connection)),
                local_timezone: "Etc/UTC".to_owned(),
            },
            user_id,
        )
    }

    #[tokio::test]
    async fn render_page() {
        let (state, user_id) = get_test_state();

        let response = get_new_debt_page(State(state), Extension(user_id))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let html = parse_html_document(response).await;
        assert_valid_html(&html);
        let form = must_get_form(&html);
        assert_hx_endpoint(&form, endpoints::POST_DEBT, "hx-post");
        assert_form_select(&form, "kind", &["lent", "borrowed"]);
        assert_form_input(&form, "person", "text");
        assert_form_input(&form, "amount", "number");
        assert_form_input(&form, "date", "date");
    }

    #[tokio::test]
    async fn create_borrowed_record() {
        let (state, user_id) = get_test_state();

        let response = create_debt_endpoint(
            State(state.clone()),
            Extension(user_id),
            Form(DebtForm {
                kind: DebtKind::Borrowed,
                person: "Carol".to_owned(),
                amount: 12.0,
                date: date!(2025 - 03 - 01),
                due_date: Some(date!(2025 - 04 - 01)),
                note: "Lunch".to_owned(),
            }),
        )
        .await;

        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_hx_redirect(&response, endpoints::DEBTS_VIEW);
        let connection = state.db_connection.lock().unwrap();
        let borrowed = get_debts(DebtKind::Borrowed, user_id, &connection).unwrap();
        assert_eq!(borrowed.len(), 1);
        assert_eq!(borrowed[0].due_date, Some(date!(2025 - 04 - 01)));
        assert!(get_debts(DebtKind::Lent, user_id, &connection).unwrap().is_empty());
    }

    #[tokio::test]
    async fn blank_person_is_bad_request() {
        let (state, user_id) = get_test_state();

        let response = create_debt_endpoint(
            State(state),
            Extension(user_id),
            Form(DebtForm {
                kind: DebtKind::Lent,
                person: "".to_owned(),
                amount: 12.0,
                date: date!(2025 - 03 - 01),
                due_date: None,
                note: String::new(),
            }),
        )
        .await;

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
