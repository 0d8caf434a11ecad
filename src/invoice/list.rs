//! The invoices page and the endpoint for deleting an invoice.

use axum::{
    Extension,
    extract::{Path, State},
    response::{IntoResponse, Response},
};
use maud::html;

use crate::{
    Error,
    alert::Alert,
    auth::UserID,
    endpoints::{self, format_endpoint},
    html::{
        BADGE_STYLE, CARD_STYLE, LINK_STYLE, PAGE_CONTAINER_STYLE, TABLE_CELL_STYLE,
        TABLE_HEADER_STYLE, TABLE_ROW_STYLE, base, delete_action_button, format_currency,
    },
    invoice::{InvoiceId, InvoiceKind, InvoicingState, delete_invoice, get_invoices},
    navigation::NavBar,
    preferences::load_preferences,
};

pub async fn get_invoices_page(
    State(state): State<InvoicingState>,
    Extension(user_id): Extension<UserID>,
) -> Result<Response, Error> {
    let connection = state
        .db_connection
        .lock()
        .inspect_err(|error| tracing::error!("could not acquire database lock: {error}"))
        .map_err(|_| Error::DatabaseLockError)?;

    let preferences = load_preferences(user_id, &connection)?;
    let invoices = get_invoices(user_id, &connection)?;
    let currency = preferences.currency;

    let (sales_total, purchases_total) =
        invoices
            .iter()
            .fold((0.0, 0.0), |(sales, purchases), invoice| match invoice.kind {
                InvoiceKind::Sale => (sales + invoice.totals().total, purchases),
                InvoiceKind::Purchase => (sales, purchases + invoice.totals().total),
            });

    let nav_bar = NavBar::new(endpoints::INVOICES_VIEW, preferences.business_mode).into_html();

    let content = html! {
        (nav_bar)

        main class=(PAGE_CONTAINER_STYLE)
        {
            section class="space-y-6"
            {
                div class="flex justify-between flex-wrap items-end"
                {
                    h1 class="text-xl font-bold" { "Invoices" }

                    div class="flex gap-4"
                    {
                        a href=(endpoints::PARTIES_VIEW) class=(LINK_STYLE) { "Parties" }
                        a href=(endpoints::PRODUCTS_VIEW) class=(LINK_STYLE) { "Products" }
                        a href=(endpoints::NEW_INVOICE_VIEW) class=(LINK_STYLE) { "New Invoice" }
                    }
                }

                div class="grid gap-4 md:grid-cols-2"
                {
                    div class=(CARD_STYLE) id="sales-total"
                    {
                        h2 class="text-sm text-gray-500 dark:text-gray-400" { "Sales" }
                        span class="text-2xl font-bold" { (format_currency(sales_total, currency)) }
                    }

                    div class=(CARD_STYLE) id="purchases-total"
                    {
                        h2 class="text-sm text-gray-500 dark:text-gray-400" { "Purchases" }
                        span class="text-2xl font-bold" { (format_currency(purchases_total, currency)) }
                    }
                }

                div class="overflow-x-auto"
                {
                    table id="invoices-table" class="w-full text-sm text-left text-gray-500 dark:text-gray-400"
                    {
                        thead class=(TABLE_HEADER_STYLE)
                        {
                            tr
                            {
                                th scope="col" class=(TABLE_CELL_STYLE) { "Number" }
                                th scope="col" class=(TABLE_CELL_STYLE) { "Type" }
                                th scope="col" class=(TABLE_CELL_STYLE) { "Party" }
                                th scope="col" class=(TABLE_CELL_STYLE) { "Date" }
                                th scope="col" class=(TABLE_CELL_STYLE) { "Total" }
                                th scope="col" class=(TABLE_CELL_STYLE) { "Actions" }
                            }
                        }

                        tbody
                        {
                            @for invoice in &invoices {
                                tr class=(TABLE_ROW_STYLE) data-invoice-id=(invoice.id)
                                {
                                    td class=(TABLE_CELL_STYLE)
                                    {
                                        a href=(format_endpoint(endpoints::INVOICE_VIEW, invoice.id)) class=(LINK_STYLE)
                                        {
                                            (invoice.number)
                                        }
                                    }
                                    td class=(TABLE_CELL_STYLE) { span class=(BADGE_STYLE) { (invoice.kind) } }
                                    td class=(TABLE_CELL_STYLE) { (invoice.party_name) }
                                    td class=(TABLE_CELL_STYLE) { (invoice.date) }
                                    td class=(TABLE_CELL_STYLE) { (format_currency(invoice.totals().total, currency)) }
                                    td class=(TABLE_CELL_STYLE)
                                    {
                                        (delete_action_button(
                                            &format_endpoint(endpoints::DELETE_INVOICE, invoice.id),
                                            &format!("Permanently delete invoice {}?", invoice.number),
                                            "closest tr",
                                            "delete"
                                        ))
                                    }
                                }
                            }

                            @if invoices.is_empty() {
                                tr
                                {
                                    td colspan="6" class="px-6 py-4 text-center" { "No invoices yet." }
                                }
                            }
                        }
                    }
                }
            }
        }
    };

    Ok(base("Invoices", &[], &content).into_response())
}

/// Permanently delete an invoice.
pub async fn delete_invoice_endpoint(
    Path(invoice_id): Path<InvoiceId>,
    State(state): State<InvoicingState>,
    Extension(user_id): Extension<UserID>,
) -> Response {
    let connection = match state.db_connection.lock() {
        Ok(connection) => connection,
        Err(error) => {
            tracing::error!("could not acquire database lock: {error}");
            return Error::DatabaseLockError.into_alert_response();
        }
    };

    match delete_invoice(invoice_id, user_id, &connection) {
        Ok(()) => Alert::SuccessSimple {
            message: "Invoice deleted".to_owned(),
        }
        .into_response(),
        Err(Error::DeleteMissingInvoice) => Error::DeleteMissingInvoice.into_alert_response(),
        Err(error) => {
            tracing::error!("could not delete invoice {invoice_id}: {error}");
            error.into_alert_response()
        }
    }
}
