//! The export page and the download endpoints.

use std::sync::{Arc, Mutex};

use axum::{
    Extension,
    extract::{FromRef, State},
    http::header,
    response::{IntoResponse, Response},
};
use maud::html;
use rusqlite::Connection;
use time::OffsetDateTime;

use crate::{
    AppState, Error,
    auth::UserID,
    endpoints,
    export::{build_backup, export_expenses_csv},
    html::{CARD_STYLE, LINK_STYLE, PAGE_CONTAINER_STYLE, base},
    navigation::NavBar,
    preferences::load_preferences,
};

#[derive(Debug, Clone)]
pub struct ExportState {
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for ExportState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

pub async fn get_export_page(
    State(state): State<ExportState>,
    Extension(user_id): Extension<UserID>,
) -> Result<Response, Error> {
    let connection = state
        .db_connection
        .lock()
        .inspect_err(|error| tracing::error!("could not acquire database lock: {error}"))
        .map_err(|_| Error::DatabaseLockError)?;

    let preferences = load_preferences(user_id, &connection)?;
    let nav_bar = NavBar::new(endpoints::EXPORT_VIEW, preferences.business_mode).into_html();

    let content = html! {
        (nav_bar)

        main class=(PAGE_CONTAINER_STYLE)
        {
            h1 class="text-xl font-bold mb-4" { "Export" }

            div class="grid gap-4 md:grid-cols-2"
            {
                section class=(CARD_STYLE)
                {
                    h2 class="font-semibold mb-2" { "Full backup" }
                    p class="text-sm mb-4"
                    {
                        "Everything you have recorded, including groups you own and invoices, \
                        as a single JSON file."
                    }
                    a href=(endpoints::EXPORT_BACKUP_JSON) download class=(LINK_STYLE) id="backup-link"
                    {
                        "Download backup.json"
                    }
                }

                section class=(CARD_STYLE)
                {
                    h2 class="font-semibold mb-2" { "Expenses" }
                    p class="text-sm mb-4" { "Your expenses as a spreadsheet friendly CSV file." }
                    a href=(endpoints::EXPORT_EXPENSES_CSV) download class=(LINK_STYLE) id="csv-link"
                    {
                        "Download expenses.csv"
                    }
                }
            }
        }
    };

    Ok(base("Export", &[], &content).into_response())
}

fn attachment(file_name: &str) -> String {
    format!("attachment; filename=\"{file_name}\"")
}

/// Download a JSON backup of everything the user owns.
pub async fn export_backup_endpoint(
    State(state): State<ExportState>,
    Extension(user_id): Extension<UserID>,
) -> Result<Response, Error> {
    let connection = state
        .db_connection
        .lock()
        .inspect_err(|error| tracing::error!("could not acquire database lock: {error}"))
        .map_err(|_| Error::DatabaseLockError)?;

    let backup = build_backup(user_id, OffsetDateTime::now_utc(), &connection)?;
    let json = serde_json::to_string_pretty(&backup)?;

    tracing::info!("User {user_id} exported a backup");

    Ok((
        [
            (header::CONTENT_TYPE, "application/json".to_owned()),
            (header::CONTENT_DISPOSITION, attachment("backup.json")),
        ],
        json,
    )
        .into_response())
}

/// Download the user's expenses as CSV.
pub async fn export_expenses_csv_endpoint(
    State(state): State<ExportState>,
    Extension(user_id): Extension<UserID>,
) -> Result<Response, Error> {
    let connection = state
        .db_connection
        .lock()
        .inspect_err(|error| tracing::error!("could not acquire database lock: {error}"))
        .map_err(|_| Error::DatabaseLockError)?;

    let csv = export_expenses_csv(user_id, &connection)?;

    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_owned()),
            (header::CONTENT_DISPOSITION, attachment("expenses.csv")),
        ],
        csv,
    )
        .into_response())
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use axum::{Extension, body::to_bytes, extract::State, http::StatusCode};
    use scraper::Selector;
    use time::macros::date;

    use crate::{
        auth::UserID,
        expense::{NewExpense, create_expense},
        test_utils::{
            assert_content_type, assert_valid_html, create_test_user, get_header,
            get_test_connection, parse_html_document,
        },
    };

    use super::{ExportState, export_backup_endpoint, export_expenses_csv_endpoint, get_export_page};

    fn get_test_state() -> (ExportState, UserID) {
        let connection = get_test_connection();
        let user_id = create_test_user("alice", &connection);
        create_expense(
            NewExpense::new_unchecked(4.5, date!(2025 - 01 - 03), "Coffee"),
            user_id,
            &connection,
        )
        .unwrap();

        (
            ExportState {
                db_connection: Arc::new(Mutex::new(connection)),
            },
            user_id,
        )
    }

    #[tokio::test]
    async fn page_links_to_downloads() {
        let (state, user_id) = get_test_state();

        let response = get_export_page(State(state), Extension(user_id))
            .await
            .unwrap();

        let html = parse_html_document(response).await;
        assert_valid_html(&html);
        let links = Selector::parse("a[download]").unwrap();
        assert_eq!(html.select(&links).count(), 2);
    }

    #[tokio::test]
    async fn backup_is_json_attachment() {
        let (state, user_id) = get_test_state();

        let response = export_backup_endpoint(State(state), Extension(user_id))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_content_type(&response, "application/json");
        assert_eq!(
            get_header(&response, "content-disposition"),
            "attachment; filename=\"backup.json\""
        );
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["expenses"][0]["description"], "Coffee");
    }

    #[tokio::test]
    async fn csv_download() {
        let (state, user_id) = get_test_state();

        let response = export_expenses_csv_endpoint(State(state), Extension(user_id))
            .await
            .unwrap();

        assert_content_type(&response, "text/csv; charset=utf-8");
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(
            String::from_utf8(body.to_vec()).unwrap(),
            "date,description,category,amount\n2025-01-03,Coffee,,4.50\n"
        );
    }
}
