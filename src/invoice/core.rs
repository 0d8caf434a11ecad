//! Sales and purchase invoices and their line items.

use std::{
    fmt::Display,
    sync::{Arc, Mutex},
};

use axum::extract::FromRef;
use rusqlite::{
    Connection, Row, ToSql,
    types::{FromSql, FromSqlError, FromSqlResult, ToSqlOutput, ValueRef},
};
use serde::{Deserialize, Serialize};
use time::Date;

use crate::{
    AppState, Error,
    auth::UserID,
    database_id::DatabaseId,
    invoice::{InvoiceTotals, LineItem, validate_percentage},
};

pub type InvoiceId = DatabaseId;

/// The state needed for the invoicing pages and endpoints.
#[derive(Debug, Clone)]
pub struct InvoicingState {
    pub db_connection: Arc<Mutex<Connection>>,
    /// The local timezone as a canonical timezone name, e.g. "Pacific/Auckland".
    pub local_timezone: String,
}

impl FromRef<AppState> for InvoicingState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
            local_timezone: state.local_timezone.clone(),
        }
    }
}

/// Whether the user is selling or buying.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InvoiceKind {
    Sale,
    Purchase,
}

impl InvoiceKind {
    pub fn key(self) -> &'static str {
        match self {
            InvoiceKind::Sale => "sale",
            InvoiceKind::Purchase => "purchase",
        }
    }

    pub fn from_key(key: &str) -> Option<Self> {
        match key {
            "sale" => Some(InvoiceKind::Sale),
            "purchase" => Some(InvoiceKind::Purchase),
            _ => None,
        }
    }

    /// The prefix for generated invoice numbers.
    fn number_prefix(self) -> &'static str {
        match self {
            InvoiceKind::Sale => "INV",
            InvoiceKind::Purchase => "PUR",
        }
    }

    /// How the other side of the invoice is labelled.
    pub fn party_label(self) -> &'static str {
        match self {
            InvoiceKind::Sale => "Bill to",
            InvoiceKind::Purchase => "Supplier",
        }
    }
}

impl Display for InvoiceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            InvoiceKind::Sale => write!(f, "Sale"),
            InvoiceKind::Purchase => write!(f, "Purchase"),
        }
    }
}

impl ToSql for InvoiceKind {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.key()))
    }
}

impl FromSql for InvoiceKind {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        let key = value.as_str()?;
        InvoiceKind::from_key(key)
            .ok_or_else(|| FromSqlError::Other(format!("unknown invoice kind {key}").into()))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Invoice {
    pub id: InvoiceId,
    pub user_id: UserID,
    pub kind: InvoiceKind,
    pub number: String,
    /// The customer or supplier name, copied so that deleting the party keeps the invoice intact.
    pub party_name: String,
    pub date: Date,
    pub discount_percent: f64,
    pub tax_percent: f64,
    pub items: Vec<LineItem>,
}

impl Invoice {
    pub fn totals(&self) -> InvoiceTotals {
        InvoiceTotals::calculate(&self.items, self.discount_percent, self.tax_percent)
    }
}

/// A validated invoice that has not been saved yet.
#[derive(Debug, Clone, PartialEq)]
pub struct NewInvoice {
    pub kind: InvoiceKind,
    pub number: String,
    pub party_name: String,
    pub date: Date,
    pub discount_percent: f64,
    pub tax_percent: f64,
    pub items: Vec<LineItem>,
}

impl NewInvoice {
    /// # Errors
    ///
    /// Returns an error if the number or party is blank, a percentage is outside
    /// 0 to 100, or there are no line items.
    pub fn new(
        kind: InvoiceKind,
        number: &str,
        party_name: &str,
        date: Date,
        discount_percent: f64,
        tax_percent: f64,
        items: Vec<LineItem>,
    ) -> Result<Self, Error> {
        let number = number.trim();
        if number.is_empty() {
            return Err(Error::EmptyField("Invoice number"));
        }

        let party_name = party_name.trim();
        if party_name.is_empty() {
            return Err(Error::EmptyField("Party"));
        }

        let discount_percent = validate_percentage(discount_percent)?;
        let tax_percent = validate_percentage(tax_percent)?;

        if items.is_empty() {
            return Err(Error::EmptyInvoice);
        }

        Ok(Self {
            kind,
            number: number.to_owned(),
            party_name: party_name.to_owned(),
            date,
            discount_percent,
            tax_percent,
            items,
        })
    }
}

pub fn create_invoice_tables(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS invoice (
            id INTEGER PRIMARY KEY,
            user_id INTEGER NOT NULL,
            kind TEXT NOT NULL,
            number TEXT NOT NULL,
            party_name TEXT NOT NULL,
            date TEXT NOT NULL,
            discount_percent REAL NOT NULL DEFAULT 0,
            tax_percent REAL NOT NULL DEFAULT 0,
            FOREIGN KEY(user_id) REFERENCES user(id) ON UPDATE CASCADE ON DELETE CASCADE
        )",
        (),
    )?;

    connection.execute(
        "CREATE TABLE IF NOT EXISTS invoice_item (
            id INTEGER PRIMARY KEY,
            invoice_id INTEGER NOT NULL,
            position INTEGER NOT NULL,
            description TEXT NOT NULL,
            quantity REAL NOT NULL,
            unit_price REAL NOT NULL,
            FOREIGN KEY(invoice_id) REFERENCES invoice(id) ON UPDATE CASCADE ON DELETE CASCADE
        )",
        (),
    )?;

    connection.execute(
        "CREATE INDEX IF NOT EXISTS idx_invoice_item_invoice ON invoice_item(invoice_id)",
        (),
    )?;

    Ok(())
}

/// Save an invoice and its line items in one transaction.
pub fn create_invoice(
    new_invoice: NewInvoice,
    user_id: UserID,
    connection: &Connection,
) -> Result<Invoice, Error> {
    let transaction = connection.unchecked_transaction()?;

    let id: InvoiceId = transaction.query_row(
        "INSERT INTO invoice (user_id, kind, number, party_name, date, discount_percent, tax_percent)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
        RETURNING id",
        (
            user_id.as_i64(),
            new_invoice.kind,
            &new_invoice.number,
            &new_invoice.party_name,
            new_invoice.date,
            new_invoice.discount_percent,
            new_invoice.tax_percent,
        ),
        |row| row.get(0),
    )?;

    {
        let mut statement = transaction.prepare(
            "INSERT INTO invoice_item (invoice_id, position, description, quantity, unit_price)
            VALUES (?1, ?2, ?3, ?4, ?5)",
        )?;

        for (position, item) in new_invoice.items.iter().enumerate() {
            statement.execute((
                id,
                position as i64,
                &item.description,
                item.quantity,
                item.unit_price,
            ))?;
        }
    }

    transaction.commit()?;

    Ok(Invoice {
        id,
        user_id,
        kind: new_invoice.kind,
        number: new_invoice.number,
        party_name: new_invoice.party_name,
        date: new_invoice.date,
        discount_percent: new_invoice.discount_percent,
        tax_percent: new_invoice.tax_percent,
        items: new_invoice.items,
    })
}

/// # Errors
///
/// Returns [Error::NotFound] if the invoice does not exist or belongs to another user.
pub fn get_invoice(id: InvoiceId, user_id: UserID, connection: &Connection) -> Result<Invoice, Error> {
    let mut invoice = connection
        .prepare(
            "SELECT id, user_id, kind, number, party_name, date, discount_percent, tax_percent
            FROM invoice WHERE id = ?1 AND user_id = ?2",
        )?
        .query_row((id, user_id.as_i64()), map_row)?;

    invoice.items = get_line_items(id, connection)?;

    Ok(invoice)
}

/// Get the user's invoices with their line items, newest first.
pub fn get_invoices(user_id: UserID, connection: &Connection) -> Result<Vec<Invoice>, Error> {
    let mut invoices = connection
        .prepare(
            "SELECT id, user_id, kind, number, party_name, date, discount_percent, tax_percent
            FROM invoice WHERE user_id = ?1
            ORDER BY date DESC, id DESC",
        )?
        .query_map([user_id.as_i64()], map_row)?
        .collect::<Result<Vec<_>, _>>()?;

    for invoice in &mut invoices {
        invoice.items = get_line_items(invoice.id, connection)?;
    }

    Ok(invoices)
}

fn get_line_items(invoice_id: InvoiceId, connection: &Connection) -> Result<Vec<LineItem>, Error> {
    connection
        .prepare(
            "SELECT description, quantity, unit_price FROM invoice_item
            WHERE invoice_id = ?1 ORDER BY position ASC",
        )?
        .query_map([invoice_id], |row| {
            Ok(LineItem {
                description: row.get(0)?,
                quantity: row.get(1)?,
                unit_price: row.get(2)?,
            })
        })?
        .map(|maybe_item| maybe_item.map_err(|error| error.into()))
        .collect()
}

/// Delete an invoice, its line items go with it.
///
/// # Errors
///
/// Returns [Error::DeleteMissingInvoice] if the invoice does not exist or belongs to another user.
pub fn delete_invoice(id: InvoiceId, user_id: UserID, connection: &Connection) -> Result<(), Error> {
    let rows_affected = connection.execute(
        "DELETE FROM invoice WHERE id = ?1 AND user_id = ?2",
        (id, user_id.as_i64()),
    )?;

    if rows_affected == 0 {
        return Err(Error::DeleteMissingInvoice);
    }

    Ok(())
}

/// Suggest the number for the user's next invoice of `kind`, e.g. "INV-0003".
pub fn next_invoice_number(
    kind: InvoiceKind,
    user_id: UserID,
    connection: &Connection,
) -> Result<String, Error> {
    let count: i64 = connection.query_row(
        "SELECT COUNT(*) FROM invoice WHERE user_id = ?1 AND kind = ?2",
        (user_id.as_i64(), kind),
        |row| row.get(0),
    )?;

    Ok(format!("{}-{:04}", kind.number_prefix(), count + 1))
}

fn map_row(row: &Row) -> Result<Invoice, rusqlite::Error> {
    Ok(Invoice {
        id: row.get(0)?,
        user_id: UserID::new(row.get(1)?),
        kind: row.get(2)?,
        number: row.get(3)?,
        party_name: row.get(4)?,
        date: row.get(5)?,
        discount_percent: row.get(6)?,
        tax_percent: row.get(7)?,
        items: Vec::new(),
    })
}

#[cfg(test)]
mod tests {
    use time::macros::date;

    use crate::{
        Error,
        invoice::LineItem,
        test_utils::{create_test_user, get_test_connection},
    };

    use super::{
        InvoiceKind, NewInvoice, create_invoice, delete_invoice, get_invoice, get_invoices,
        next_invoice_number,
    };

    fn new_invoice(number: &str) -> NewInvoice {
        NewInvoice::new(
            InvoiceKind::Sale,
            number,
            "Acme",
            date!(2025 - 02 - 01),
            10.0,
            15.0,
            vec![
                LineItem::new("Widget", 2.0, 10.0).unwrap(),
                LineItem::new("Gadget", 1.0, 5.5).unwrap(),
            ],
        )
        .unwrap()
    }

    #[test]
    fn create_and_get_keeps_item_order() {
        let connection = get_test_connection();
        let user_id = create_test_user("alice", &connection);

        let created = create_invoice(new_invoice("INV-0001"), user_id, &connection).unwrap();
        let got = get_invoice(created.id, user_id, &connection).unwrap();

        assert_eq!(got, created);
        assert_eq!(got.items[0].description, "Widget");
        assert_eq!(got.totals().total, 26.39);
    }

    #[test]
    fn invoices_are_private() {
        let connection = get_test_connection();
        let user_id = create_test_user("alice", &connection);
        let other_user = create_test_user("bob", &connection);
        let created = create_invoice(new_invoice("INV-0001"), user_id, &connection).unwrap();

        assert_eq!(
            get_invoice(created.id, other_user, &connection),
            Err(Error::NotFound)
        );
        assert!(get_invoices(other_user, &connection).unwrap().is_empty());
        assert_eq!(
            delete_invoice(created.id, other_user, &connection),
            Err(Error::DeleteMissingInvoice)
        );
    }

    #[test]
    fn delete_removes_line_items() {
        let connection = get_test_connection();
        let user_id = create_test_user("alice", &connection);
        let created = create_invoice(new_invoice("INV-0001"), user_id, &connection).unwrap();

        delete_invoice(created.id, user_id, &connection).unwrap();

        let item_count: i64 = connection
            .query_row("SELECT COUNT(*) FROM invoice_item", [], |row| row.get(0))
            .unwrap();
        assert_eq!(item_count, 0);
    }

    #[test]
    fn validation_errors() {
        let items = vec![LineItem::new("Widget", 1.0, 1.0).unwrap()];
        let today = date!(2025 - 02 - 01);

        assert_eq!(
            NewInvoice::new(InvoiceKind::Sale, "1", "Acme", today, 120.0, 0.0, items.clone()),
            Err(Error::InvalidPercentage(120.0))
        );
        assert_eq!(
            NewInvoice::new(InvoiceKind::Sale, "1", "Acme", today, 0.0, -5.0, items.clone()),
            Err(Error::InvalidPercentage(-5.0))
        );
        assert_eq!(
            NewInvoice::new(InvoiceKind::Sale, "1", " ", today, 0.0, 0.0, items),
            Err(Error::EmptyField("Party"))
        );
        assert_eq!(
            NewInvoice::new(InvoiceKind::Sale, "1", "Acme", today, 0.0, 0.0, vec![]),
            Err(Error::EmptyInvoice)
        );
    }

    #[test]
    fn next_number_counts_per_kind() {
        let connection = get_test_connection();
        let user_id = create_test_user("alice", &connection);
        create_invoice(new_invoice("INV-0001"), user_id, &connection).unwrap();

        assert_eq!(
            next_invoice_number(InvoiceKind::Sale, user_id, &connection),
            Ok("INV-0002".to_owned())
        );
        assert_eq!(
            next_invoice_number(InvoiceKind::Purchase, user_id, &connection),
            Ok("PUR-0001".to_owned())
        );
    }
}
