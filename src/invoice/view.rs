//! A printable invoice, the browser's print dialog turns it into a PDF.

use axum::{
    Extension,
    extract::{Path, State},
    response::{IntoResponse, Response},
};
use maud::html;

use crate::{
    Error,
    auth::UserID,
    endpoints,
    html::{
        BUTTON_PRIMARY_STYLE, LINK_STYLE, PAGE_CONTAINER_STYLE, TABLE_CELL_STYLE,
        TABLE_HEADER_STYLE, TABLE_ROW_STYLE, base, format_currency,
    },
    invoice::{InvoiceId, InvoicingState, get_invoice},
    navigation::NavBar,
    preferences::load_preferences,
};

pub async fn get_invoice_page(
    Path(invoice_id): Path<InvoiceId>,
    State(state): State<InvoicingState>,
    Extension(user_id): Extension<UserID>,
) -> Result<Response, Error> {
    let connection = state
        .db_connection
        .lock()
        .inspect_err(|error| tracing::error!("could not acquire database lock: {error}"))
        .map_err(|_| Error::DatabaseLockError)?;

    let preferences = load_preferences(user_id, &connection)?;
    let invoice = get_invoice(invoice_id, user_id, &connection)?;
    let totals = invoice.totals();
    let currency = preferences.currency;

    let nav_bar = NavBar::new(endpoints::INVOICES_VIEW, preferences.business_mode).into_html();

    let content = html! {
        div class="print:hidden" { (nav_bar) }

        main class=(PAGE_CONTAINER_STYLE)
        {
            article id="invoice" class="space-y-6 bg-white text-gray-900 p-6 rounded-lg"
            {
                header class="flex justify-between flex-wrap gap-4"
                {
                    div
                    {
                        h1 class="text-2xl font-bold" { "Invoice " (invoice.number) }
                        p { (invoice.kind) " · " (invoice.date) }
                    }

                    div
                    {
                        h2 class="text-sm uppercase text-gray-500" { (invoice.kind.party_label()) }
                        p id="invoice-party" class="font-semibold" { (invoice.party_name) }
                    }
                }

                table id="invoice-items" class="w-full text-sm text-left"
                {
                    thead class=(TABLE_HEADER_STYLE)
                    {
                        tr
                        {
                            th scope="col" class=(TABLE_CELL_STYLE) { "Description" }
                            th scope="col" class=(TABLE_CELL_STYLE) { "Qty" }
                            th scope="col" class=(TABLE_CELL_STYLE) { "Unit price" }
                            th scope="col" class=(TABLE_CELL_STYLE) { "Amount" }
                        }
                    }

                    tbody
                    {
                        @for item in &invoice.items {
                            tr class=(TABLE_ROW_STYLE)
                            {
                                td class=(TABLE_CELL_STYLE) { (item.description) }
                                td class=(TABLE_CELL_STYLE) { (item.quantity) }
                                td class=(TABLE_CELL_STYLE) { (format_currency(item.unit_price, currency)) }
                                td class=(TABLE_CELL_STYLE) { (format_currency(item.amount(), currency)) }
                            }
                        }
                    }
                }

                dl id="invoice-totals" class="ml-auto w-full max-w-xs grid grid-cols-2 gap-1"
                {
                    dt { "Subtotal" }
                    dd class="text-right" data-total="subtotal" { (format_currency(totals.subtotal, currency)) }

                    dt { "Discount (" (invoice.discount_percent) "%)" }
                    dd class="text-right" data-total="discount" { "-" (format_currency(totals.discount, currency)) }

                    dt { "Tax (" (invoice.tax_percent) "%)" }
                    dd class="text-right" data-total="tax" { (format_currency(totals.tax, currency)) }

                    dt class="font-bold" { "Total" }
                    dd class="text-right font-bold" data-total="total" { (format_currency(totals.total, currency)) }
                }
            }

            div class="flex gap-4 mt-6 print:hidden"
            {
                button type="button" onclick="window.print()" class=(BUTTON_PRIMARY_STYLE) { "Print" }
                a href=(endpoints::INVOICES_VIEW) class=(LINK_STYLE) { "Back to invoices" }
            }
        }
    };

    Ok(base(&format!("Invoice {}", invoice.number), &[], &content).into_response())
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use axum::{
        Extension,
        extract::{Path, State},
        http::StatusCode,
    };
    use scraper::Selector;
    use time::macros::date;

    use crate::{
        Error,
        invoice::{InvoiceKind, InvoicingState, LineItem, NewInvoice, create_invoice},
        test_utils::{
            assert_valid_html, create_test_user, get_test_connection, parse_html_document,
        },
    };

    use super::get_invoice_page;

    #[tokio::test]
    async fn shows_items_and_totals() {
        let connection = get_test_connection();
        let user_id = create_test_user("alice", &connection);
        let invoice = create_invoice(
            NewInvoice::new(
                InvoiceKind::Sale,
                "INV-0001",
                "Acme",
                date!(2025 - 02 - 01),
                10.0,
                15.0,
                vec![
                    LineItem::new("Widget", 2.0, 10.0).unwrap(),
                    LineItem::new("Gadget", 1.0, 5.5).unwrap(),
                ],
            )
            .unwrap(),
            user_id,
            &connection,
        )
        .unwrap();
        let state = InvoicingState {
            db_connection: Arc::new(Mutex::new(connection)),
            local_timezone: "Etc/UTC".to_owned(),
        };

        let response = get_invoice_page(Path(invoice.id), State(state), Extension(user_id))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let html = parse_html_document(response).await;
        assert_valid_html(&html);
        let rows = Selector::parse("#invoice-items tbody tr").unwrap();
        assert_eq!(html.select(&rows).count(), 2);
        let total = html
            .select(&Selector::parse("#invoice-totals dd[data-total=\"total\"]").unwrap())
            .next()
            .unwrap()
            .text()
            .collect::<String>();
        assert_eq!(total, "$26.39");
    }

    #[tokio::test]
    async fn other_users_invoice_is_not_found() {
        let connection = get_test_connection();
        let user_id = create_test_user("alice", &connection);
        let state = InvoicingState {
            db_connection: Arc::new(Mutex::new(connection)),
            local_timezone: "Etc/UTC".to_owned(),
        };

        let result = get_invoice_page(Path(7), State(state), Extension(user_id)).await;

        assert!(matches!(result, Err(Error::NotFound)));
    }
}
