//! Expense categories, each with an icon.

mod create;
mod db;
mod delete;
mod domain;
mod list;

pub use create::{create_category_endpoint, get_new_category_page};
pub use db::{
    create_category, create_category_table, delete_category, get_categories, get_category,
};
pub use delete::delete_category_endpoint;
pub use domain::{Category, CategoryIcon, CategoryId, CategoryName};
pub use list::get_categories_page;
