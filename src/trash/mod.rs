//! Recently deleted items and how they are restored or purged.

mod core;
mod page;

pub use core::{
    DeletedItem, DeletedItemId, DeletedRecord, GroupSnapshot, TRASH_TTL,
    create_deleted_item_table, get_deleted_item, get_deleted_items, purge, purge_expired,
    restore, soft_delete_debt, soft_delete_expense, soft_delete_group, soft_delete_group_expense,
    soft_delete_split_bill,
};
pub use page::{
    TrashState, get_trash_page, purge_deleted_item_endpoint, restore_deleted_item_endpoint,
};
