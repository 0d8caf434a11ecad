//! The bill scanning page, the upload endpoint and serving stored receipts.

use std::{
    path::PathBuf,
    sync::{Arc, Mutex},
};

use axum::{
    Extension,
    extract::{FromRef, Multipart, Path, State},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use axum_htmx::HxRedirect;
use maud::{Markup, html};
use rusqlite::Connection;
use time::OffsetDateTime;

use crate::{
    AppState, Error,
    auth::UserID,
    endpoints,
    expense::{ExpenseId, ExpensePrefill, get_expense},
    html::{
        BUTTON_PRIMARY_STYLE, FORM_CHECKBOX_STYLE, FORM_CONTAINER_STYLE, FORM_LABEL_STYLE,
        FORM_TEXT_INPUT_STYLE, base, loading_spinner,
    },
    navigation::NavBar,
    preferences::load_preferences,
    receipt::{
        ReceiptFileType, ScannerConfig, is_receipt_path_owned_by, read_receipt, remove_receipt,
        scan_bill, store_receipt,
    },
};

/// The state needed for uploading, scanning and viewing receipts.
#[derive(Debug, Clone)]
pub struct ReceiptState {
    pub db_connection: Arc<Mutex<Connection>>,
    pub bills_dir: PathBuf,
    pub scanner: ScannerConfig,
    pub http_client: reqwest::Client,
}

impl FromRef<AppState> for ReceiptState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
            bills_dir: state.bills_dir.clone(),
            scanner: state.scanner.clone(),
            http_client: state.http_client.clone(),
        }
    }
}

pub async fn get_scan_bill_page(
    State(state): State<ReceiptState>,
    Extension(user_id): Extension<UserID>,
) -> Result<Response, Error> {
    let business_mode = {
        let connection = state
            .db_connection
            .lock()
            .inspect_err(|error| tracing::error!("could not acquire database lock: {error}"))
            .map_err(|_| Error::DatabaseLockError)?;

        load_preferences(user_id, &connection)?.business_mode
    };

    let nav_bar = NavBar::new(endpoints::SCAN_BILL_VIEW, business_mode).into_html();
    let content = html! {
        (nav_bar)

        div class=(FORM_CONTAINER_STYLE)
        {
            h1 class="text-xl font-bold mb-4" { "Scan a Bill" }

            (scan_form(state.scanner.is_enabled()))
        }
    };

    Ok(base("Scan a Bill", &[], &content).into_response())
}

fn scan_form(scanner_enabled: bool) -> Markup {
    html! {
        form
            hx-post=(endpoints::SCAN_BILL)
            hx-encoding="multipart/form-data"
            hx-target-error="#alert-container"
            hx-indicator="#indicator"
            hx-disabled-elt="#submit-button"
            class="w-full space-y-4 md:space-y-6"
        {
            div
            {
                label for="bill" class=(FORM_LABEL_STYLE) { "Photo or PDF of the bill" }

                input
                    id="bill"
                    type="file"
                    name="bill"
                    accept="image/jpeg,image/png,image/webp,application/pdf"
                    required
                    class=(FORM_TEXT_INPUT_STYLE);
            }

            @if scanner_enabled {
                div class="flex items-center gap-x-3"
                {
                    input
                        type="checkbox"
                        id="scan"
                        name="scan"
                        checked
                        class=(FORM_CHECKBOX_STYLE);

                    label for="scan" class=(FORM_LABEL_STYLE) { "Fill in the expense from the bill" }
                }
            } @else {
                p class="text-sm" id="scanner-disabled"
                {
                    "Bill scanning is not set up on this server. "
                    "The file will be attached to a new expense that you fill in yourself."
                }
            }

            button type="submit" id="submit-button" tabindex="0" class=(BUTTON_PRIMARY_STYLE)
            {
                span class="inline-flex items-center gap-x-2"
                {
                    span id="indicator" class="inline htmx-indicator" { (loading_spinner()) }
                    "Upload"
                }
            }
        }
    }
}

/// Store an uploaded bill and, if asked, scan it, then send the user to the new
/// expense form filled in with what was found.
///
/// The database is not touched, so no lock is held while the gateway is called.
pub async fn scan_bill_endpoint(
    State(state): State<ReceiptState>,
    Extension(user_id): Extension<UserID>,
    mut multipart: Multipart,
) -> Response {
    let mut upload = None;
    let mut should_scan = false;

    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(error) => return Error::MultipartError(error.to_string()).into_alert_response(),
        };

        let name = field.name().map(str::to_owned);

        match name.as_deref() {
            Some("bill") => {
                let file_type = match ReceiptFileType::detect(field.content_type(), field.file_name())
                {
                    Ok(file_type) => file_type,
                    Err(error) => return error.into_alert_response(),
                };

                match field.bytes().await {
                    Ok(bytes) if bytes.is_empty() => return Error::MissingFile.into_alert_response(),
                    Ok(bytes) => upload = Some((file_type, bytes)),
                    Err(error) => {
                        return Error::MultipartError(error.to_string()).into_alert_response();
                    }
                }
            }
            Some("scan") => should_scan = true,
            _ => {}
        }
    }

    let Some((file_type, bytes)) = upload else {
        return Error::MissingFile.into_alert_response();
    };

    if should_scan && !state.scanner.is_enabled() {
        return Error::ScannerNotConfigured.into_alert_response();
    }

    let receipt_path = match store_receipt(
        &state.bills_dir,
        user_id,
        file_type,
        &bytes,
        OffsetDateTime::now_utc(),
    )
    .await
    {
        Ok(receipt_path) => receipt_path,
        Err(error) => {
            tracing::error!("Could not store receipt for user {user_id}: {error}");
            return error.into_alert_response();
        }
    };

    let prefill = if should_scan {
        match scan_bill(&state.http_client, &state.scanner, file_type, &bytes).await {
            Ok(bill) => bill.into_prefill(receipt_path),
            Err(error) => {
                remove_receipt(&state.bills_dir, &receipt_path).await;
                return error.into_alert_response();
            }
        }
    } else {
        ExpensePrefill {
            receipt_path: Some(receipt_path),
            ..Default::default()
        }
    };

    let query = match serde_urlencoded::to_string(&prefill) {
        Ok(query) => query,
        Err(error) => {
            tracing::error!("Could not encode expense prefill {prefill:?}: {error}");
            return Error::JSONSerializationError(error.to_string()).into_alert_response();
        }
    };

    (
        HxRedirect(format!("{}?{query}", endpoints::NEW_EXPENSE_VIEW)),
        StatusCode::SEE_OTHER,
    )
        .into_response()
}

/// Serve the receipt attached to one of the user's expenses.
pub async fn get_expense_receipt(
    Path(expense_id): Path<ExpenseId>,
    State(state): State<ReceiptState>,
    Extension(user_id): Extension<UserID>,
) -> Result<Response, Error> {
    let receipt_path = {
        let connection = state
            .db_connection
            .lock()
            .inspect_err(|error| tracing::error!("could not acquire database lock: {error}"))
            .map_err(|_| Error::DatabaseLockError)?;

        get_expense(expense_id, user_id, &connection)?
            .receipt_path
            .ok_or(Error::NotFound)?
    };

    if !is_receipt_path_owned_by(&receipt_path, user_id) {
        tracing::warn!("Expense {expense_id} has a receipt outside the folder of user {user_id}");
        return Err(Error::NotFound);
    }

    let (file_type, bytes) = read_receipt(&state.bills_dir, &receipt_path).await?;

    Ok(([(header::CONTENT_TYPE, file_type.mime_type())], bytes).into_response())
}
