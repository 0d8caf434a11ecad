//! Groups of users who share expenses and settle up with each other.

mod core;
mod expenses;
mod list;
mod members;
mod settlement;
mod view;

pub use core::{
    Group, GroupExpense, GroupExpenseId, GroupId, GroupMember, GroupMemberId, NewGroupExpense,
    add_member, create_group, create_group_expense, create_group_tables, delete_group,
    delete_group_expense, get_group, get_group_expense, get_group_expenses, get_groups_for_user,
    get_member, get_members, get_owned_groups, insert_group_expense_with_id,
    insert_group_member_with_id, insert_group_with_id, remove_member,
};
pub use expenses::{create_group_expense_endpoint, delete_group_expense_endpoint};
pub use list::{
    GroupsState, create_group_endpoint, delete_group_endpoint, get_groups_page,
    get_new_group_page,
};
pub use members::{add_member_endpoint, remove_member_endpoint};
pub use settlement::{
    MemberBalance, Settlement, compute_balances, settle, settle_with_fair_share,
};
pub use view::get_group_page;
