//! The page and endpoint for splitting a new bill.

use axum::{
    Extension, Form,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use axum_htmx::HxRedirect;
use maud::{Markup, html};
use serde::{Deserialize, Serialize};
use time::Date;

use crate::{
    Error,
    auth::UserID,
    endpoints,
    html::{BUTTON_PRIMARY_STYLE, FORM_CONTAINER_STYLE, FORM_LABEL_STYLE, FORM_TEXT_INPUT_STYLE, base},
    navigation::NavBar,
    preferences::load_preferences,
    split_bill::{NewSplitBill, Split, SplitBillsState, create_split_bill},
    timezone::local_today,
};

pub async fn get_new_split_bill_page(
    State(state): State<SplitBillsState>,
    Extension(user_id): Extension<UserID>,
) -> Result<Response, Error> {
    let connection = state
        .db_connection
        .lock()
        .inspect_err(|error| tracing::error!("could not acquire database lock: {error}"))
        .map_err(|_| Error::DatabaseLockError)?;
    let preferences = load_preferences(user_id, &connection)?;
    let today = local_today(&state.local_timezone);

    let nav_bar =
        NavBar::new(endpoints::NEW_SPLIT_BILL_VIEW, preferences.business_mode).into_html();
    let content = html! {
        (nav_bar)
        div class=(FORM_CONTAINER_STYLE) { (split_bill_form(today)) }
    };

    Ok(base("Split a Bill", &[], &content).into_response())
}

fn split_bill_form(today: Date) -> Markup {
    html! {
        form
            hx-post=(endpoints::POST_SPLIT_BILL)
            hx-target-error="#alert-container"
            class="w-full space-y-4 md:space-y-6"
        {
            div
            {
                label for="title" class=(FORM_LABEL_STYLE) { "Title" }

                input
                    id="title"
                    type="text"
                    name="title"
                    placeholder="e.g. Friday dinner"
                    required
                    autofocus
                    class=(FORM_TEXT_INPUT_STYLE);
            }

            div
            {
                label for="total_amount" class=(FORM_LABEL_STYLE) { "Total" }

                input
                    id="total_amount"
                    type="number"
                    name="total_amount"
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
                label for="split_mode" class=(FORM_LABEL_STYLE) { "Split" }

                select id="split_mode" name="split_mode" required class=(FORM_TEXT_INPUT_STYLE)
                {
                    option value="equal" selected { "Equally" }
                    option value="custom" { "Custom amounts" }
                }
            }

            div
            {
                label for="participants" class=(FORM_LABEL_STYLE) { "Participants" }

                textarea
                    id="participants"
                    name="participants"
                    rows="4"
                    placeholder="One name per line. For custom amounts write: Name, 12.50"
                    required
                    class=(FORM_TEXT_INPUT_STYLE)
                {}
            }

            button type="submit" class=(BUTTON_PRIMARY_STYLE) { "Split Bill" }
        }
    }
}

/// The form data for splitting a bill.
#[derive(Debug, Serialize, Deserialize)]
pub struct SplitBillForm {
    pub title: String,
    pub total_amount: f64,
    pub date: Date,
    /// "equal" or "custom".
    pub split_mode: String,
    /// One participant per line, "name" or "name, amount" for custom splits.
    pub participants: String,
}

impl SplitBillForm {
    fn split(&self) -> Result<Split, Error> {
        let lines = self
            .participants
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty());

        if self.split_mode != "custom" {
            return Ok(Split::Equal(lines.map(str::to_owned).collect()));
        }

        lines
            .map(|line| {
                let (name, share) = line.rsplit_once(',').ok_or(Error::EmptyField("Share"))?;
                let share = share
                    .trim()
                    .parse::<f64>()
                    .map_err(|_| Error::EmptyField("Share"))?;

                Ok((name.trim().to_owned(), share))
            })
            .collect::<Result<Vec<_>, Error>>()
            .map(Split::Custom)
    }
}

pub async fn create_split_bill_endpoint(
    State(state): State<SplitBillsState>,
    Extension(user_id): Extension<UserID>,
    Form(form): Form<SplitBillForm>,
) -> Response {
    let new_bill = match form
        .split()
        .and_then(|split| NewSplitBill::new(&form.title, form.total_amount, form.date, split))
    {
        Ok(new_bill) => new_bill,
        Err(error) => return error.into_alert_response(),
    };

    let connection = match state.db_connection.lock() {
        Ok(connection) => connection,
        Err(error) => {
            tracing::error!("could not acquire database lock: {error}");
            return Error::DatabaseLockError.into_alert_response();
        }
    };

    match create_split_bill(new_bill, user_id, &connection) {
        Ok(_) => (
            HxRedirect(endpoints::SPLIT_BILLS_VIEW.to_owned()),
            StatusCode::SEE_OTHER,
        )
            .into_response(),
        Err(error) => {
            tracing::error!("An unexpected error occurred while creating a split bill: {error}");
            error.into_alert_response()
        }
    }
}
