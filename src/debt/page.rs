//! The lent and borrowed page, and the endpoints for its row actions.

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
    debt::{Debt, DebtId, DebtKind, get_debts, outstanding_total, toggle_settled},
    endpoints::{self, format_endpoint},
    html::{
        BADGE_STYLE, BADGE_SUCCESS_STYLE, BUTTON_INLINE_STYLE, CARD_STYLE, LINK_STYLE,
        PAGE_CONTAINER_STYLE, TABLE_CELL_STYLE, TABLE_HEADER_STYLE, TABLE_ROW_STYLE, base,
        delete_action_button, format_currency,
    },
    navigation::NavBar,
    preferences::{Currency, load_preferences},
    trash::soft_delete_debt,
};

/// The state needed for the lent and borrowed page and its endpoints.
#[derive(Debug, Clone)]
pub struct DebtsState {
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for DebtsState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

/// Render the lent and borrowed records side by side.
pub async fn get_debts_page(
    State(state): State<DebtsState>,
    Extension(user_id): Extension<UserID>,
) -> Result<Response, Error> {
    let connection = state
        .db_connection
        .lock()
        .inspect_err(|error| tracing::error!("could not acquire database lock: {error}"))
        .map_err(|_| Error::DatabaseLockError)?;

    let preferences = load_preferences(user_id, &connection)?;
    let lent = get_debts(DebtKind::Lent, user_id, &connection)?;
    let borrowed = get_debts(DebtKind::Borrowed, user_id, &connection)?;
    let owed_to_you = outstanding_total(DebtKind::Lent, user_id, &connection)?;
    let you_owe = outstanding_total(DebtKind::Borrowed, user_id, &connection)?;

    let nav_bar = NavBar::new(endpoints::DEBTS_VIEW, preferences.business_mode).into_html();
    let currency = preferences.currency;

    let content = html! {
        (nav_bar)

        main class=(PAGE_CONTAINER_STYLE)
        {
            section class="space-y-6"
            {
                div class="flex justify-between flex-wrap items-end"
                {
                    h1 class="text-xl font-bold" { "Lent & Borrowed" }

                    a href=(endpoints::NEW_DEBT_VIEW) class=(LINK_STYLE) { "Add Record" }
                }

                div class="grid gap-4 md:grid-cols-2"
                {
                    div class=(CARD_STYLE) id="owed-to-you"
                    {
                        h2 class="text-sm text-gray-500 dark:text-gray-400" { "Owed to you" }
                        span class="text-2xl font-bold" { (format_currency(owed_to_you, currency)) }
                    }

                    div class=(CARD_STYLE) id="you-owe"
                    {
                        h2 class="text-sm text-gray-500 dark:text-gray-400" { "You owe" }
                        span class="text-2xl font-bold" { (format_currency(you_owe, currency)) }
                    }
                }

                (debt_table(DebtKind::Lent, &lent, currency))
                (debt_table(DebtKind::Borrowed, &borrowed, currency))
            }
        }
    };

    Ok(base("Lent & Borrowed", &[], &content).into_response())
}

fn debt_table(kind: DebtKind, debts: &[Debt], currency: Currency) -> Markup {
    let (heading, person_heading) = match kind {
        DebtKind::Lent => ("Money you lent", "Lent to"),
        DebtKind::Borrowed => ("Money you borrowed", "Borrowed from"),
    };

    html! {
        div class="overflow-x-auto"
        {
            h2 class="text-lg font-semibold mb-2" { (heading) }

            table class="w-full text-sm text-left text-gray-500 dark:text-gray-400" id=(format!("{}-table", kind.key()))
            {
                thead class=(TABLE_HEADER_STYLE)
                {
                    tr
                    {
                        th scope="col" class=(TABLE_CELL_STYLE) { (person_heading) }
                        th scope="col" class=(TABLE_CELL_STYLE) { "Amount" }
                        th scope="col" class=(TABLE_CELL_STYLE) { "Date" }
                        th scope="col" class=(TABLE_CELL_STYLE) { "Due" }
                        th scope="col" class=(TABLE_CELL_STYLE) { "Status" }
                        th scope="col" class=(TABLE_CELL_STYLE) { "Actions" }
                    }
                }

                tbody
                {
                    @for debt in debts {
                        (debt_row(debt, currency))
                    }

                    @if debts.is_empty() {
                        tr
                        {
                            td colspan="6" class="px-6 py-4 text-center" { "Nothing here yet." }
                        }
                    }
                }
            }
        }
    }
}

fn debt_row(debt: &Debt, currency: Currency) -> Markup {
    let (toggle_url, delete_url) = match debt.kind {
        DebtKind::Lent => (
            format_endpoint(endpoints::TOGGLE_LENT_SETTLED, debt.id),
            format_endpoint(endpoints::DELETE_LENT, debt.id),
        ),
        DebtKind::Borrowed => (
            format_endpoint(endpoints::TOGGLE_BORROWED_SETTLED, debt.id),
            format_endpoint(endpoints::DELETE_BORROWED, debt.id),
        ),
    };
    let toggle_text = if debt.is_settled {
        "Mark outstanding"
    } else {
        "Mark settled"
    };

    html! {
        tr class=(TABLE_ROW_STYLE) id=(format!("{}-{}", debt.kind.key(), debt.id))
        {
            td class=(TABLE_CELL_STYLE)
            {
                (debt.person)

                @if !debt.note.is_empty() {
                    br;
                    span class="text-xs" { (debt.note) }
                }
            }
            td class=(TABLE_CELL_STYLE) { (format_currency(debt.amount, currency)) }
            td class=(TABLE_CELL_STYLE) { (debt.date) }
            td class=(TABLE_CELL_STYLE)
            {
                @if let Some(due_date) = debt.due_date { (due_date) } @else { "-" }
            }
            td class=(TABLE_CELL_STYLE)
            {
                @if debt.is_settled {
                    span class=(BADGE_SUCCESS_STYLE) { "Settled" }
                } @else {
                    span class=(BADGE_STYLE) { "Outstanding" }
                }
            }
            td class=(TABLE_CELL_STYLE)
            {
                div class="flex gap-4"
                {
                    button
                        type="button"
                        hx-put=(toggle_url)
                        hx-target-error="#alert-container"
                        class=(BUTTON_INLINE_STYLE)
                    {
                        (toggle_text)
                    }

                    (delete_action_button(
                        &delete_url,
                        &format!("Move the record for {} to the trash?", debt.person),
                        "closest tr",
                        "delete"
                    ))
                }
            }
        }
    }
}

async fn toggle_settled_endpoint(
    kind: DebtKind,
    debt_id: DebtId,
    state: DebtsState,
    user_id: UserID,
) -> Response {
    let connection = match state.db_connection.lock() {
        Ok(connection) => connection,
        Err(error) => {
            tracing::error!("could not acquire database lock: {error}");
            return Error::DatabaseLockError.into_alert_response();
        }
    };

    match toggle_settled(kind, debt_id, user_id, &connection) {
        Ok(_) => (
            HxRedirect(endpoints::DEBTS_VIEW.to_owned()),
            StatusCode::SEE_OTHER,
        )
            .into_response(),
        Err(Error::MissingDebt) => Error::MissingDebt.into_alert_response(),
        Err(error) => {
            tracing::error!("could not toggle {kind} record {debt_id}: {error}");
            error.into_alert_response()
        }
    }
}

/// Mark lent money as paid back, or as outstanding again.
pub async fn toggle_lent_settled_endpoint(
    Path(debt_id): Path<DebtId>,
    State(state): State<DebtsState>,
    Extension(user_id): Extension<UserID>,
) -> Response {
    toggle_settled_endpoint(DebtKind::Lent, debt_id, state, user_id).await
}

/// Mark borrowed money as paid back, or as outstanding again.
pub async fn toggle_borrowed_settled_endpoint(
    Path(debt_id): Path<DebtId>,
    State(state): State<DebtsState>,
    Extension(user_id): Extension<UserID>,
) -> Response {
    toggle_settled_endpoint(DebtKind::Borrowed, debt_id, state, user_id).await
}

async fn delete_debt_endpoint(
    kind: DebtKind,
    debt_id: DebtId,
    state: DebtsState,
    user_id: UserID,
) -> Response {
    let connection = match state.db_connection.lock() {
        Ok(connection) => connection,
        Err(error) => {
            tracing::error!("could not acquire database lock: {error}");
            return Error::DatabaseLockError.into_alert_response();
        }
    };

    match soft_delete_debt(kind, debt_id, user_id, OffsetDateTime::now_utc(), &connection) {
        Ok(_) => Alert::SuccessSimple {
            message: "Record moved to the trash".to_owned(),
        }
        .into_response(),
        Err(Error::MissingDebt) => Error::MissingDebt.into_alert_response(),
        Err(error) => {
            tracing::error!("could not delete {kind} record {debt_id}: {error}");
            error.into_alert_response()
        }
    }
}

/// Move a lent money record to the trash.
pub async fn delete_lent_endpoint(
    Path(debt_id): Path<DebtId>,
    State(state): State<DebtsState>,
    Extension(user_id): Extension<UserID>,
) -> Response {
    delete_debt_endpoint(DebtKind::Lent, debt_id, state, user_id).await
}

/// Move a borrowed money record to the trash.
pub async fn delete_borrowed_endpoint(
    Path(debt_id): Path<DebtId>,
    State(state): State<DebtsState>,
    Extension(user_id): Extension<UserID>,
) -> Response {
    delete_debt_endpoint(DebtKind::Borrowed, debt_id, state, user_id).await
}
