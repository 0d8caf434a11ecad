//! Invoicing for business mode: parties, products, invoices and their totals.

mod core;
mod create;
mod list;
mod party;
mod product;
mod totals;
mod view;

pub use core::{
    Invoice, InvoiceId, InvoiceKind, InvoicingState, NewInvoice, create_invoice,
    create_invoice_tables, delete_invoice, get_invoice, get_invoices, next_invoice_number,
};
pub use create::{InvoiceForm, create_invoice_endpoint, get_new_invoice_page};
pub use list::{delete_invoice_endpoint, get_invoices_page};
pub use party::{
    NewParty, Party, PartyForm, PartyId, PartyKind, create_party, create_party_endpoint,
    create_party_table, delete_party, delete_party_endpoint, get_parties, get_parties_page,
};
pub use product::{
    Product, ProductForm, ProductId, create_product, create_product_endpoint,
    create_product_table, delete_product, delete_product_endpoint, get_products,
    get_products_page,
};
pub use totals::{InvoiceTotals, LineItem, round_to_cents, validate_percentage};
pub use view::get_invoice_page;
