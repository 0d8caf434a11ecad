//! The catalogue of products used to fill in invoice lines.

use axum::{
    Extension, Form,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use axum_htmx::HxRedirect;
use maud::{Markup, html};
use rusqlite::{Connection, Row};
use serde::{Deserialize, Serialize};

use crate::{
    Error,
    alert::Alert,
    auth::UserID,
    database_id::DatabaseId,
    endpoints::{self, format_endpoint},
    html::{
        BUTTON_PRIMARY_STYLE, CARD_STYLE, FORM_LABEL_STYLE, FORM_TEXT_INPUT_STYLE,
        PAGE_CONTAINER_STYLE, TABLE_CELL_STYLE, TABLE_HEADER_STYLE, TABLE_ROW_STYLE, base,
        delete_action_button, format_currency,
    },
    invoice::InvoicingState,
    navigation::NavBar,
    preferences::load_preferences,
};

pub type ProductId = DatabaseId;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Product {
    pub id: ProductId,
    pub user_id: UserID,
    pub name: String,
    pub unit_price: f64,
}

pub fn create_product_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS product (
            id INTEGER PRIMARY KEY,
            user_id INTEGER NOT NULL,
            name TEXT NOT NULL,
            unit_price REAL NOT NULL,
            FOREIGN KEY(user_id) REFERENCES user(id) ON UPDATE CASCADE ON DELETE CASCADE
        )",
        (),
    )?;

    Ok(())
}

/// # Errors
///
/// Returns [Error::EmptyField] for a blank name and [Error::NonPositiveAmount] for a
/// negative price.
pub fn create_product(
    name: &str,
    unit_price: f64,
    user_id: UserID,
    connection: &Connection,
) -> Result<Product, Error> {
    let name = name.trim();
    if name.is_empty() {
        return Err(Error::EmptyField("Product name"));
    }

    if !unit_price.is_finite() || unit_price < 0.0 {
        return Err(Error::NonPositiveAmount(unit_price));
    }

    connection
        .prepare(
            "INSERT INTO product (user_id, name, unit_price) VALUES (?1, ?2, ?3)
            RETURNING id, user_id, name, unit_price",
        )?
        .query_row((user_id.as_i64(), name, unit_price), map_row)
        .map_err(|error| error.into())
}

pub fn get_products(user_id: UserID, connection: &Connection) -> Result<Vec<Product>, Error> {
    connection
        .prepare(
            "SELECT id, user_id, name, unit_price FROM product
            WHERE user_id = ?1 ORDER BY name COLLATE NOCASE ASC, id ASC",
        )?
        .query_map([user_id.as_i64()], map_row)?
        .map(|maybe_product| maybe_product.map_err(|error| error.into()))
        .collect()
}

/// # Errors
///
/// Returns [Error::DeleteMissingProduct] if the product does not exist or belongs to another user.
pub fn delete_product(
    id: ProductId,
    user_id: UserID,
    connection: &Connection,
) -> Result<(), Error> {
    let rows_affected = connection.execute(
        "DELETE FROM product WHERE id = ?1 AND user_id = ?2",
        (id, user_id.as_i64()),
    )?;

    if rows_affected == 0 {
        return Err(Error::DeleteMissingProduct);
    }

    Ok(())
}

fn map_row(row: &Row) -> Result<Product, rusqlite::Error> {
    Ok(Product {
        id: row.get(0)?,
        user_id: UserID::new(row.get(1)?),
        name: row.get(2)?,
        unit_price: row.get(3)?,
    })
}

pub async fn get_products_page(
    State(state): State<InvoicingState>,
    Extension(user_id): Extension<UserID>,
) -> Result<Response, Error> {
    let connection = state
        .db_connection
        .lock()
        .inspect_err(|error| tracing::error!("could not acquire database lock: {error}"))
        .map_err(|_| Error::DatabaseLockError)?;

    let preferences = load_preferences(user_id, &connection)?;
    let products = get_products(user_id, &connection)?;
    let nav_bar = NavBar::new(endpoints::PRODUCTS_VIEW, preferences.business_mode).into_html();

    let content = html! {
        (nav_bar)

        main class=(PAGE_CONTAINER_STYLE)
        {
            section class="space-y-6"
            {
                h1 class="text-xl font-bold" { "Products" }

                div class=(CARD_STYLE) { (product_form()) }

                div class="overflow-x-auto"
                {
                    table id="products-table" class="w-full text-sm text-left text-gray-500 dark:text-gray-400"
                    {
                        thead class=(TABLE_HEADER_STYLE)
                        {
                            tr
                            {
                                th scope="col" class=(TABLE_CELL_STYLE) { "Name" }
                                th scope="col" class=(TABLE_CELL_STYLE) { "Unit price" }
                                th scope="col" class=(TABLE_CELL_STYLE) { "Actions" }
                            }
                        }

                        tbody
                        {
                            @for product in &products {
                                tr class=(TABLE_ROW_STYLE) data-product-id=(product.id)
                                {
                                    td class=(TABLE_CELL_STYLE) { (product.name) }
                                    td class=(TABLE_CELL_STYLE)
                                    {
                                        (format_currency(product.unit_price, preferences.currency))
                                    }
                                    td class=(TABLE_CELL_STYLE)
                                    {
                                        (delete_action_button(
                                            &format_endpoint(endpoints::DELETE_PRODUCT, product.id),
                                            &format!("Delete {}?", product.name),
                                            "closest tr",
                                            "delete"
                                        ))
                                    }
                                }
                            }

                            @if products.is_empty() {
                                tr
                                {
                                    td colspan="3" class="px-6 py-4 text-center" { "No products yet." }
                                }
                            }
                        }
                    }
                }
            }
        }
    };

    Ok(base("Products", &[], &content).into_response())
}

fn product_form() -> Markup {
    html! {
        form
            hx-post=(endpoints::POST_PRODUCT)
            hx-target-error="#alert-container"
            class="grid gap-4 md:grid-cols-3 items-end"
        {
            div
            {
                label for="name" class=(FORM_LABEL_STYLE) { "Name" }
                input id="name" type="text" name="name" required class=(FORM_TEXT_INPUT_STYLE);
            }

            div
            {
                label for="unit_price" class=(FORM_LABEL_STYLE) { "Unit price" }

                input
                    id="unit_price"
                    type="number"
                    name="unit_price"
                    step="0.01"
                    min="0"
                    placeholder="0.00"
                    required
                    class=(FORM_TEXT_INPUT_STYLE);
            }

            button type="submit" class=(BUTTON_PRIMARY_STYLE) { "Add" }
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ProductForm {
    pub name: String,
    pub unit_price: f64,
}

pub async fn create_product_endpoint(
    State(state): State<InvoicingState>,
    Extension(user_id): Extension<UserID>,
    Form(form): Form<ProductForm>,
) -> Response {
    let connection = match state.db_connection.lock() {
        Ok(connection) => connection,
        Err(error) => {
            tracing::error!("could not acquire database lock: {error}");
            return Error::DatabaseLockError.into_alert_response();
        }
    };

    match create_product(&form.name, form.unit_price, user_id, &connection) {
        Ok(_) => (
            HxRedirect(endpoints::PRODUCTS_VIEW.to_owned()),
            StatusCode::SEE_OTHER,
        )
            .into_response(),
        Err(error @ (Error::EmptyField(_) | Error::NonPositiveAmount(_))) => {
            error.into_alert_response()
        }
        Err(error) => {
            tracing::error!("An unexpected error occurred while creating a product: {error}");
            error.into_alert_response()
        }
    }
}

pub async fn delete_product_endpoint(
    Path(product_id): Path<ProductId>,
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

    match delete_product(product_id, user_id, &connection) {
        Ok(()) => Alert::SuccessSimple {
            message: "Product deleted".to_owned(),
        }
        .into_response(),
        Err(Error::DeleteMissingProduct) => Error::DeleteMissingProduct.into_alert_response(),
        Err(error) => {
            tracing::error!("could not delete product {product_id}: {error}");
            error.into_alert_response()
        }
    }
}
