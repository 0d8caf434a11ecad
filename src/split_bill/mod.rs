//! Bills split between named people, tracking who has paid their share.

mod core;
mod create;
mod page;

pub use core::{
    NewSplitBill, Participant, ParticipantId, Split, SplitBill, SplitBillId,
    create_split_bill, create_split_bill_tables, delete_split_bill, get_split_bill,
    get_split_bills, insert_split_bill_with_id, toggle_participant_paid,
};
pub use create::{create_split_bill_endpoint, get_new_split_bill_page};
pub use page::{
    SplitBillsState, delete_split_bill_endpoint, get_split_bills_page,
    toggle_participant_paid_endpoint,
};
