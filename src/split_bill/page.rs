//! The split bills page and the endpoints for its actions.

use std::sync::{Arc, Mutex};

use axum::{
    Extension,
    extract::{FromRef, Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use axum_htmx::HxRedirect;
use maud::{Markup, html};
use rusqlite::Connection;
use time::OffsetDateTime;

use crate::{
    AppState, Error,
    alert::Alert,
    auth::UserID,
    endpoints::{self, format_endpoint},
    html::{
        BADGE_STYLE, BADGE_SUCCESS_STYLE, BUTTON_INLINE_STYLE, CARD_STYLE, LINK_STYLE,
        PAGE_CONTAINER_STYLE, base, delete_action_button, format_currency,
    },
    navigation::NavBar,
    preferences::{Currency, load_preferences},
    split_bill::{ParticipantId, SplitBill, SplitBillId, get_split_bills, toggle_participant_paid},
    trash::soft_delete_split_bill,
};

/// The state needed for the split bill pages and endpoints.
#[derive(Debug, Clone)]
pub struct SplitBillsState {
    pub db_connection: Arc<Mutex<Connection>>,
    /// The local timezone as a canonical timezone name, e.g. "Pacific/Auckland".
    pub local_timezone: String,
}

impl FromRef<AppState> for SplitBillsState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
            local_timezone: state.local_timezone.clone(),
        }
    }
}

pub async fn get_split_bills_page(
    State(state): State<SplitBillsState>,
    Extension(user_id): Extension<UserID>,
) -> Result<Response, Error> {
    let connection = state
        .db_connection
        .lock()
        .inspect_err(|error| tracing::error!("could not acquire database lock: {error}"))
        .map_err(|_| Error::DatabaseLockError)?;

    let preferences = load_preferences(user_id, &connection)?;
    let bills = get_split_bills(user_id, &connection)?;

    let nav_bar = NavBar::new(endpoints::SPLIT_BILLS_VIEW, preferences.business_mode).into_html();
    let content = html! {
        (nav_bar)

        main class=(PAGE_CONTAINER_STYLE)
        {
            section class="space-y-4"
            {
                header class="flex justify-between flex-wrap items-end"
                {
                    h1 class="text-xl font-bold" { "Split Bills" }

                    a href=(endpoints::NEW_SPLIT_BILL_VIEW) class=(LINK_STYLE) { "Split a Bill" }
                }

                @for bill in &bills {
                    (split_bill_card(bill, preferences.currency))
                }

                @if bills.is_empty() {
                    p class="text-center" { "No split bills yet." }
                }
            }
        }
    };

    Ok(base("Split Bills", &[], &content).into_response())
}

fn split_bill_card(bill: &SplitBill, currency: Currency) -> Markup {
    html! {
        article class=(CARD_STYLE) data-split-bill-id=(bill.id)
        {
            div class="flex justify-between items-start mb-2"
            {
                div
                {
                    h2 class="text-lg font-semibold" { (bill.title) }
                    span class="text-sm" { (bill.date) " · " (format_currency(bill.total_amount, currency)) }
                }

                (delete_action_button(
                    &format_endpoint(endpoints::DELETE_SPLIT_BILL, bill.id),
                    &format!("Move '{}' to the trash?", bill.title),
                    "closest article",
                    "delete"
                ))
            }

            ul class="space-y-1"
            {
                @for participant in &bill.participants {
                    li class="flex justify-between items-center gap-4"
                    {
                        span { (participant.name) }
                        span { (format_currency(participant.share, currency)) }

                        button
                            type="button"
                            hx-put=(format_endpoint(endpoints::TOGGLE_PARTICIPANT_PAID, participant.id))
                            hx-target-error="#alert-container"
                            class=(BUTTON_INLINE_STYLE)
                        {
                            @if participant.is_paid {
                                span class=(BADGE_SUCCESS_STYLE) { "Paid" }
                            } @else {
                                span class=(BADGE_STYLE) { "Unpaid" }
                            }
                        }
                    }
                }
            }

            p class="mt-2 text-sm" { "Still owed: " (format_currency(bill.outstanding(), currency)) }
        }
    }
}

/// Flip whether a participant has paid and reload the page.
pub async fn toggle_participant_paid_endpoint(
    Path(participant_id): Path<ParticipantId>,
    State(state): State<SplitBillsState>,
    Extension(user_id): Extension<UserID>,
) -> Response {
    let connection = match state.db_connection.lock() {
        Ok(connection) => connection,
        Err(error) => {
            tracing::error!("could not acquire database lock: {error}");
            return Error::DatabaseLockError.into_alert_response();
        }
    };

    match toggle_participant_paid(participant_id, user_id, &connection) {
        Ok(()) => (
            HxRedirect(endpoints::SPLIT_BILLS_VIEW.to_owned()),
            StatusCode::SEE_OTHER,
        )
            .into_response(),
        Err(Error::MissingSplitBill) => Error::MissingSplitBill.into_alert_response(),
        Err(error) => {
            tracing::error!("could not toggle participant {participant_id}: {error}");
            error.into_alert_response()
        }
    }
}

/// Move a split bill to the trash.
pub async fn delete_split_bill_endpoint(
    Path(split_bill_id): Path<SplitBillId>,
    State(state): State<SplitBillsState>,
    Extension(user_id): Extension<UserID>,
) -> Response {
    let connection = match state.db_connection.lock() {
        Ok(connection) => connection,
        Err(error) => {
            tracing::error!("could not acquire database lock: {error}");
            return Error::DatabaseLockError.into_alert_response();
        }
    };

    match soft_delete_split_bill(split_bill_id, user_id, OffsetDateTime::now_utc(), &connection) {
        Ok(_) => Alert::SuccessSimple {
            message: "Split bill moved to the trash".to_owned(),
        }
        .into_response(),
        Err(Error::MissingSplitBill) => Error::MissingSplitBill.into_alert_response(),
        Err(error) => {
            tracing::error!("could not delete split bill {split_bill_id}: {error}");
            error.into_alert_response()
        }
    }
}
