//! The trash page and the endpoints for restoring and purging items.

use std::sync::{Arc, Mutex};

use axum::{
    Extension,
    extract::{FromRef, Path, State},
    response::{IntoResponse, Response},
};
use maud::{Markup, html};
use rusqlite::Connection;
use time::OffsetDateTime;

use crate::{
    AppState, Error,
    alert::Alert,
    auth::UserID,
    endpoints::{self, format_endpoint},
    html::{
        BADGE_STYLE, BUTTON_DELETE_STYLE, BUTTON_INLINE_STYLE, PAGE_CONTAINER_STYLE,
        TABLE_CELL_STYLE, TABLE_HEADER_STYLE, TABLE_ROW_STYLE, base, format_currency,
    },
    navigation::NavBar,
    preferences::{Currency, load_preferences},
    debt::DebtKind,
    trash::{
        DeletedItem, DeletedItemId, DeletedRecord, get_deleted_items, purge, purge_expired,
        restore,
    },
};

/// The state needed for the trash page and endpoints.
#[derive(Debug, Clone)]
pub struct TrashState {
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for TrashState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

/// Purge expired items, then render what is left in the user's trash.
pub async fn get_trash_page(
    State(state): State<TrashState>,
    Extension(user_id): Extension<UserID>,
) -> Result<Response, Error> {
    let connection = state
        .db_connection
        .lock()
        .inspect_err(|error| tracing::error!("could not acquire database lock: {error}"))
        .map_err(|_| Error::DatabaseLockError)?;

    let now = OffsetDateTime::now_utc();
    purge_expired(now, &connection)
        .inspect_err(|error| tracing::error!("could not purge expired trash: {error}"))?;

    let preferences = load_preferences(user_id, &connection)?;
    let items = get_deleted_items(user_id, &connection)?;
    let nav_bar = NavBar::new(endpoints::TRASH_VIEW, preferences.business_mode).into_html();

    Ok(trash_view(nav_bar, &items, now, preferences.currency).into_response())
}

fn kind_label(record: &DeletedRecord) -> &'static str {
    match record {
        DeletedRecord::Expense(_) => "Expense",
        DeletedRecord::Debt(debt) => match debt.kind {
            DebtKind::Lent => "Lent",
            DebtKind::Borrowed => "Borrowed",
        },
        DeletedRecord::SplitBill(_) => "Split bill",
        DeletedRecord::Group(_) => "Group",
        DeletedRecord::GroupExpense(_) => "Group expense",
    }
}

fn trash_view(
    nav_bar: Markup,
    items: &[DeletedItem],
    now: OffsetDateTime,
    currency: Currency,
) -> Markup {
    let content = html! {
        (nav_bar)

        main class=(PAGE_CONTAINER_STYLE)
        {
            section class="space-y-4"
            {
                h1 class="text-xl font-bold" { "Trash" }

                p class="text-sm" { "Deleted items are kept for 30 days, then removed for good." }

                table class="w-full text-sm text-left text-gray-500 dark:text-gray-400"
                {
                    thead class=(TABLE_HEADER_STYLE)
                    {
                        tr
                        {
                            th scope="col" class=(TABLE_CELL_STYLE) { "Type" }
                            th scope="col" class=(TABLE_CELL_STYLE) { "Item" }
                            th scope="col" class=(TABLE_CELL_STYLE) { "Amount" }
                            th scope="col" class=(TABLE_CELL_STYLE) { "Deleted" }
                            th scope="col" class=(TABLE_CELL_STYLE) { "Days left" }
                            th scope="col" class=(TABLE_CELL_STYLE) { "Actions" }
                        }
                    }

                    tbody
                    {
                        @for item in items {
                            tr class=(TABLE_ROW_STYLE) data-item-id=(item.id)
                            {
                                td class=(TABLE_CELL_STYLE) { span class=(BADGE_STYLE) { (kind_label(&item.record)) } }
                                td class=(TABLE_CELL_STYLE) { (item.record.label()) }
                                td class=(TABLE_CELL_STYLE)
                                {
                                    @if let Some(amount) = item.record.amount() {
                                        (format_currency(amount, currency))
                                    }
                                }
                                td class=(TABLE_CELL_STYLE) { (item.deleted_at.date()) }
                                td class=(TABLE_CELL_STYLE) { ((item.expires_at() - now).whole_days().max(0)) }
                                td class=(TABLE_CELL_STYLE)
                                {
                                    div class="flex gap-4"
                                    {
                                        button
                                            type="button"
                                            hx-post=(format_endpoint(endpoints::RESTORE_DELETED_ITEM, item.id))
                                            hx-target="closest tr"
                                            hx-target-error="#alert-container"
                                            hx-swap="delete"
                                            class=(BUTTON_INLINE_STYLE)
                                        {
                                            "Restore"
                                        }

                                        button
                                            type="button"
                                            hx-delete=(format_endpoint(endpoints::PURGE_DELETED_ITEM, item.id))
                                            hx-confirm="Delete this item forever? This cannot be undone."
                                            hx-target="closest tr"
                                            hx-target-error="#alert-container"
                                            hx-swap="delete"
                                            class=(BUTTON_DELETE_STYLE)
                                        {
                                            "Delete forever"
                                        }
                                    }
                                }
                            }
                        }

                        @if items.is_empty() {
                            tr
                            {
                                td colspan="6" class="px-6 py-4 text-center" { "The trash is empty." }
                            }
                        }
                    }
                }
            }
        }
    };

    base("Trash", &[], &content)
}

/// Restore an item from the trash.
pub async fn restore_deleted_item_endpoint(
    Path(item_id): Path<DeletedItemId>,
    State(state): State<TrashState>,
    Extension(user_id): Extension<UserID>,
) -> Response {
    let connection = match state.db_connection.lock() {
        Ok(connection) => connection,
        Err(error) => {
            tracing::error!("could not acquire database lock: {error}");
            return Error::DatabaseLockError.into_alert_response();
        }
    };

    match restore(item_id, user_id, &connection) {
        Ok(item) => Alert::SuccessSimple {
            message: format!("Restored {}", item.record),
        }
        .into_response(),
        Err(
            error @ (Error::MissingDeletedItem
            | Error::NotGroupMember
            | Error::RestoreMissingParent { .. }
            | Error::RestorePayerNotMember(_)),
        ) => error.into_alert_response(),
        Err(error) => {
            tracing::error!("could not restore deleted item {item_id}: {error}");
            error.into_alert_response()
        }
    }
}

/// Permanently delete an item in the trash.
pub async fn purge_deleted_item_endpoint(
    Path(item_id): Path<DeletedItemId>,
    State(state): State<TrashState>,
    Extension(user_id): Extension<UserID>,
) -> Response {
    let connection = match state.db_connection.lock() {
        Ok(connection) => connection,
        Err(error) => {
            tracing::error!("could not acquire database lock: {error}");
            return Error::DatabaseLockError.into_alert_response();
        }
    };

    match purge(item_id, user_id, &connection) {
        Ok(()) => Alert::SuccessSimple {
            message: "Deleted forever".to_owned(),
        }
        .into_response(),
        Err(Error::MissingDeletedItem) => Error::MissingDeletedItem.into_alert_response(),
        Err(error) => {
            tracing::error!("could not purge deleted item {item_id}: {error}");
            error.into_alert_response()
        }
    }
}
