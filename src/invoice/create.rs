//! The page and endpoint for writing a new invoice.

use axum::{
    Extension,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use axum_extra::extract::Form;
use axum_htmx::HxRedirect;
use maud::{Markup, html};
use serde::{Deserialize, Serialize};
use time::Date;

use crate::{
    Error,
    auth::UserID,
    endpoints::{self, format_endpoint},
    html::{BUTTON_PRIMARY_STYLE, FORM_LABEL_STYLE, FORM_TEXT_INPUT_STYLE, PAGE_CONTAINER_STYLE, base},
    invoice::{
        InvoiceKind, InvoicingState, LineItem, NewInvoice, Party, Product, create_invoice,
        get_parties, get_products, next_invoice_number,
    },
    navigation::NavBar,
    preferences::load_preferences,
    timezone::local_today,
};

/// How many blank line item rows the form offers.
const LINE_ITEM_ROWS: usize = 5;

pub async fn get_new_invoice_page(
    State(state): State<InvoicingState>,
    Extension(user_id): Extension<UserID>,
) -> Result<Response, Error> {
    let connection = state
        .db_connection
        .lock()
        .inspect_err(|error| tracing::error!("could not acquire database lock: {error}"))
        .map_err(|_| Error::DatabaseLockError)?;

    let preferences = load_preferences(user_id, &connection)?;
    let parties = get_parties(user_id, &connection)?;
    let products = get_products(user_id, &connection)?;
    let next_number = next_invoice_number(InvoiceKind::Sale, user_id, &connection)?;
    let today = local_today(&state.local_timezone);

    let nav_bar = NavBar::new(endpoints::NEW_INVOICE_VIEW, preferences.business_mode).into_html();
    let content = html! {
        (nav_bar)

        main class=(PAGE_CONTAINER_STYLE)
        {
            h1 class="text-xl font-bold mb-4" { "New Invoice" }

            (invoice_form(&next_number, today, &parties, &products))
        }
    };

    Ok(base("New Invoice", &[], &content).into_response())
}

fn invoice_form(next_number: &str, today: Date, parties: &[Party], products: &[Product]) -> Markup {
    html! {
        form
            hx-post=(endpoints::POST_INVOICE)
            hx-target-error="#alert-container"
            class="w-full space-y-4 md:space-y-6"
        {
            div class="grid gap-4 md:grid-cols-3"
            {
                div
                {
                    label for="kind" class=(FORM_LABEL_STYLE) { "Type" }

                    select id="kind" name="kind" required class=(FORM_TEXT_INPUT_STYLE)
                    {
                        option value=(InvoiceKind::Sale.key()) selected { "Sales invoice" }
                        option value=(InvoiceKind::Purchase.key()) { "Purchase invoice" }
                    }
                }

                div
                {
                    label for="number" class=(FORM_LABEL_STYLE) { "Number" }

                    input
                        id="number"
                        type="text"
                        name="number"
                        value=(next_number)
                        placeholder="Leave blank to number automatically"
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
                    label for="party_name" class=(FORM_LABEL_STYLE) { "Customer or supplier" }

                    input
                        id="party_name"
                        type="text"
                        name="party_name"
                        list="party-names"
                        required
                        class=(FORM_TEXT_INPUT_STYLE);

                    datalist id="party-names"
                    {
                        @for party in parties {
                            option value=(party.name) { (party.kind) }
                        }
                    }
                }

                div
                {
                    label for="discount_percent" class=(FORM_LABEL_STYLE) { "Discount (%)" }

                    input
                        id="discount_percent"
                        type="number"
                        name="discount_percent"
                        step="0.01"
                        min="0"
                        max="100"
                        value="0"
                        required
                        class=(FORM_TEXT_INPUT_STYLE);
                }

                div
                {
                    label for="tax_percent" class=(FORM_LABEL_STYLE) { "Tax (%)" }

                    input
                        id="tax_percent"
                        type="number"
                        name="tax_percent"
                        step="0.01"
                        min="0"
                        max="100"
                        value="0"
                        required
                        class=(FORM_TEXT_INPUT_STYLE);
                }
            }

            fieldset class="space-y-2"
            {
                legend class=(FORM_LABEL_STYLE)
                {
                    "Items (leave the price blank to use the product price)"
                }

                datalist id="product-names"
                {
                    @for product in products {
                        option value=(product.name) {}
                    }
                }

                @for row in 0..LINE_ITEM_ROWS {
                    div class="grid gap-2 grid-cols-6" data-line-item=(row)
                    {
                        input
                            type="text"
                            name="description"
                            list="product-names"
                            placeholder="Description"
                            aria-label="Description"
                            required[row == 0]
                            class={ "col-span-4 " (FORM_TEXT_INPUT_STYLE) };

                        input
                            type="number"
                            name="quantity"
                            step="any"
                            min="0"
                            placeholder="Qty"
                            aria-label="Quantity"
                            class=(FORM_TEXT_INPUT_STYLE);

                        input
                            type="number"
                            name="unit_price"
                            step="0.01"
                            min="0"
                            placeholder="Price"
                            aria-label="Unit price"
                            class=(FORM_TEXT_INPUT_STYLE);
                    }
                }
            }

            button type="submit" class=(BUTTON_PRIMARY_STYLE) { "Create Invoice" }
        }
    }
}

/// The form data for a new invoice, the line item fields repeat once per row.
#[derive(Debug, Serialize, Deserialize)]
pub struct InvoiceForm {
    pub kind: InvoiceKind,
    #[serde(default)]
    pub number: String,
    pub party_name: String,
    pub date: Date,
    pub discount_percent: f64,
    pub tax_percent: f64,
    #[serde(default)]
    pub description: Vec<String>,
    #[serde(default)]
    pub quantity: Vec<String>,
    #[serde(default)]
    pub unit_price: Vec<String>,
}

/// Turn the repeated item fields into line items, skipping blank rows.
///
/// A blank quantity means one, and a blank price is filled in from the product
/// with the same name.
fn parse_line_items(form: &InvoiceForm, products: &[Product]) -> Result<Vec<LineItem>, Error> {
    let rows = form
        .description
        .len()
        .max(form.quantity.len())
        .max(form.unit_price.len());
    let field = |values: &[String], row: usize| -> String {
        values
            .get(row)
            .map(|value| value.trim().to_owned())
            .unwrap_or_default()
    };

    let mut items = Vec::new();

    for row in 0..rows {
        let description = field(&form.description, row);
        let quantity = field(&form.quantity, row);
        let unit_price = field(&form.unit_price, row);

        if description.is_empty() && quantity.is_empty() && unit_price.is_empty() {
            continue;
        }

        let quantity = if quantity.is_empty() {
            1.0
        } else {
            quantity
                .parse::<f64>()
                .map_err(|_| Error::EmptyField("Quantity"))?
        };

        let unit_price = if unit_price.is_empty() {
            products
                .iter()
                .find(|product| product.name.eq_ignore_ascii_case(&description))
                .map(|product| product.unit_price)
                .ok_or(Error::EmptyField("Unit price"))?
        } else {
            unit_price
                .parse::<f64>()
                .map_err(|_| Error::EmptyField("Unit price"))?
        };

        items.push(LineItem::new(&description, quantity, unit_price)?);
    }

    Ok(items)
}

pub async fn create_invoice_endpoint(
    State(state): State<InvoicingState>,
    Extension(user_id): Extension<UserID>,
    Form(form): Form<InvoiceForm>,
) -> Response {
    let connection = match state.db_connection.lock() {
        Ok(connection) => connection,
        Err(error) => {
            tracing::error!("could not acquire database lock: {error}");
            return Error::DatabaseLockError.into_alert_response();
        }
    };

    let products = match get_products(user_id, &connection) {
        Ok(products) => products,
        Err(error) => return error.into_alert_response(),
    };

    let items = match parse_line_items(&form, &products) {
        Ok(items) => items,
        Err(error) => return error.into_alert_response(),
    };

    let number = if form.number.trim().is_empty() {
        match next_invoice_number(form.kind, user_id, &connection) {
            Ok(number) => number,
            Err(error) => return error.into_alert_response(),
        }
    } else {
        form.number.clone()
    };

    let new_invoice = match NewInvoice::new(
        form.kind,
        &number,
        &form.party_name,
        form.date,
        form.discount_percent,
        form.tax_percent,
        items,
    ) {
        Ok(new_invoice) => new_invoice,
        Err(error) => return error.into_alert_response(),
    };

    match create_invoice(new_invoice, user_id, &connection) {
        Ok(invoice) => (
            HxRedirect(format_endpoint(endpoints::INVOICE_VIEW, invoice.id)),
            StatusCode::SEE_OTHER,
        )
            .into_response(),
        Err(error) => {
            tracing::error!("An unexpected error occurred while creating an invoice: {error}");
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
        endpoints::{self, format_endpoint},
        invoice::{InvoiceKind, InvoicingState, LineItem, create_product, get_invoices},
        test_utils::{
            assert_form_input, assert_form_select, assert_hx_endpoint, assert_hx_redirect,
            assert_valid_html, create_test_user, get_test_connection, must_get_form,
            parse_html_document,
        },
    };

    use super::{InvoiceForm, create_invoice_endpoint, get_new_invoice_page, parse_line_items};

    fn get_test_state() -> (InvoicingState, UserID) {
        let connection = get_test_connection();
        let user_id = create_test_user("alice", &connection);

        (
            InvoicingState {
                db_connection: Arc::new(Mutex::new(connection)),
                local_timezone: "Etc/UTC".to_owned(),
            },
            user_id,
        )
    }

    fn form(description: &[&str], quantity: &[&str], unit_price: &[&str]) -> InvoiceForm {
        let strings = |values: &[&str]| -> Vec<String> {
            values.iter().map(|value| value.to_string()).collect()
        };

        InvoiceForm {
            kind: InvoiceKind::Sale,
            number: String::new(),
            party_name: "Acme".to_owned(),
            date: date!(2025 - 02 - 01),
            discount_percent: 10.0,
            tax_percent: 15.0,
            description: strings(description),
            quantity: strings(quantity),
            unit_price: strings(unit_price),
        }
    }

    #[tokio::test]
    async fn render_page() {
        let (state, user_id) = get_test_state();

        let response = get_new_invoice_page(State(state), Extension(user_id))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let html = parse_html_document(response).await;
        assert_valid_html(&html);
        let form = must_get_form(&html);
        assert_hx_endpoint(&form, endpoints::POST_INVOICE, "hx-post");
        assert_form_select(&form, "kind", &["sale", "purchase"]);
        assert_form_input(&form, "party_name", "text");
        assert_form_input(&form, "date", "date");
        assert_form_input(&form, "discount_percent", "number");
        assert_form_input(&form, "tax_percent", "number");
        assert_form_input(&form, "description", "text");
    }

    #[test]
    fn submitted_form_collects_repeated_rows() {
        let body = "kind=purchase&number=&party_name=Acme&date=2025-02-01\
            &discount_percent=0&tax_percent=0\
            &description=Widget&quantity=2&unit_price=4.5\
            &description=&quantity=&unit_price=\
            &description=Gadget&quantity=&unit_price=1";

        let form: InvoiceForm = serde_html_form::from_str(body).unwrap();
        let items = parse_line_items(&form, &[]).unwrap();

        assert_eq!(form.kind, InvoiceKind::Purchase);
        assert_eq!(
            items,
            vec![
                LineItem::new("Widget", 2.0, 4.5).unwrap(),
                LineItem::new("Gadget", 1.0, 1.0).unwrap(),
            ]
        );
    }

    #[tokio::test]
    async fn create_skips_blank_rows_and_numbers_invoice() {
        let (state, user_id) = get_test_state();

        let response = create_invoice_endpoint(
            State(state.clone()),
            Extension(user_id),
            Form(form(
                &["Widget", "", "Gadget"],
                &["2", "", ""],
                &["10", "", "5.50"],
            )),
        )
        .await;

        let invoices = get_invoices(user_id, &state.db_connection.lock().unwrap()).unwrap();
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_hx_redirect(&response, &format_endpoint(endpoints::INVOICE_VIEW, invoices[0].id));
        assert_eq!(invoices[0].number, "INV-0001");
        assert_eq!(invoices[0].items.len(), 2);
        assert_eq!(invoices[0].items[1].quantity, 1.0);
        assert_eq!(invoices[0].totals().total, 26.39);
    }

    #[tokio::test]
    async fn blank_price_uses_product_price() {
        let (state, user_id) = get_test_state();
        create_product("Bolt", 0.25, user_id, &state.db_connection.lock().unwrap()).unwrap();

        create_invoice_endpoint(
            State(state.clone()),
            Extension(user_id),
            Form(form(&["bolt"], &["4"], &[""])),
        )
        .await;

        let invoices = get_invoices(user_id, &state.db_connection.lock().unwrap()).unwrap();
        assert_eq!(invoices[0].items[0].unit_price, 0.25);
    }

    #[tokio::test]
    async fn invalid_input_is_rejected() {
        let (state, user_id) = get_test_state();

        let no_items = create_invoice_endpoint(
            State(state.clone()),
            Extension(user_id),
            Form(form(&[""], &[""], &[""])),
        )
        .await;
        let zero_quantity = create_invoice_endpoint(
            State(state.clone()),
            Extension(user_id),
            Form(form(&["Widget"], &["0"], &["1"])),
        )
        .await;
        let mut bad_tax = form(&["Widget"], &["1"], &["1"]);
        bad_tax.tax_percent = 101.0;
        let bad_tax = create_invoice_endpoint(State(state.clone()), Extension(user_id), Form(bad_tax)).await;

        assert_eq!(no_items.status(), StatusCode::BAD_REQUEST);
        assert_eq!(zero_quantity.status(), StatusCode::BAD_REQUEST);
        assert_eq!(bad_tax.status(), StatusCode::BAD_REQUEST);
        assert!(
            get_invoices(user_id, &state.db_connection.lock().unwrap())
                .unwrap()
                .is_empty()
        );
    }
}
