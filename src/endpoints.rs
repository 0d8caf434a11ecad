//! The API endpoints URIs.
//!
//! For endpoints that take a parameter, e.g., '/expenses/{expense_id}', use [format_endpoint].

/// The root route which redirects to the dashboard or log in page.
pub const ROOT: &str = "/";
/// The landing page for logged in users.
pub const DASHBOARD_VIEW: &str = "/dashboard";
/// The page for listing a user's expenses.
pub const EXPENSES_VIEW: &str = "/expenses";
/// The page for creating a new expense.
pub const NEW_EXPENSE_VIEW: &str = "/expenses/new";
/// The page for editing an existing expense.
pub const EDIT_EXPENSE_VIEW: &str = "/expenses/{expense_id}/edit";
/// The receipt attached to an expense.
pub const EXPENSE_RECEIPT: &str = "/expenses/{expense_id}/receipt";
/// The page for listing categories.
pub const CATEGORIES_VIEW: &str = "/categories";
/// The page for creating a new category.
pub const NEW_CATEGORY_VIEW: &str = "/categories/new";
/// The page for setting and reviewing monthly budgets.
pub const BUDGETS_VIEW: &str = "/budgets";
/// The page for listing money lent and borrowed.
pub const DEBTS_VIEW: &str = "/debts";
/// The page for recording money lent or borrowed.
pub const NEW_DEBT_VIEW: &str = "/debts/new";
/// The page for listing the groups a user belongs to.
pub const GROUPS_VIEW: &str = "/groups";
/// The page for creating a new group.
pub const NEW_GROUP_VIEW: &str = "/groups/new";
/// The page for a single group with its members, expenses and settlements.
pub const GROUP_VIEW: &str = "/groups/{group_id}";
/// The page for listing split bills.
pub const SPLIT_BILLS_VIEW: &str = "/split_bills";
/// The page for creating a split bill.
pub const NEW_SPLIT_BILL_VIEW: &str = "/split_bills/new";
/// The page for listing invoices.
pub const INVOICES_VIEW: &str = "/invoices";
/// The page for creating an invoice.
pub const NEW_INVOICE_VIEW: &str = "/invoices/new";
/// The printable page for a single invoice.
pub const INVOICE_VIEW: &str = "/invoices/{invoice_id}";
/// The page for listing customers and suppliers.
pub const PARTIES_VIEW: &str = "/parties";
/// The page for listing products.
pub const PRODUCTS_VIEW: &str = "/products";
/// The page for recently deleted items.
pub const TRASH_VIEW: &str = "/trash";
/// The page for uploading and scanning a receipt.
pub const SCAN_BILL_VIEW: &str = "/receipts/scan";
/// The page for downloading exports.
pub const EXPORT_VIEW: &str = "/export";
/// The page for editing user preferences.
pub const SETTINGS_VIEW: &str = "/settings";
/// The route for getting the registration page.
pub const REGISTER_VIEW: &str = "/register";
/// The route for getting the log in page.
pub const LOG_IN_VIEW: &str = "/log_in";
/// The page to display when an internal server error occurs.
pub const INTERNAL_ERROR_VIEW: &str = "/error";
/// The route for static files.
pub const STATIC: &str = "/static";

/// The route for logging in a user.
pub const LOG_IN_API: &str = "/api/log_in";
/// The route for the client to log out the current user.
pub const LOG_OUT: &str = "/api/log_out";
/// The route to create users.
pub const USERS: &str = "/api/users";
/// The route to create an expense.
pub const POST_EXPENSE: &str = "/api/expenses";
/// The route to update an expense.
pub const PUT_EXPENSE: &str = "/api/expenses/{expense_id}";
/// The route to delete an expense.
pub const DELETE_EXPENSE: &str = "/api/expenses/{expense_id}";
/// The route to create a category.
pub const POST_CATEGORY: &str = "/api/categories";
/// The route to delete a category.
pub const DELETE_CATEGORY: &str = "/api/categories/{category_id}";
/// The route to set the budget for a month.
pub const POST_BUDGET: &str = "/api/budgets";
/// The route to record money lent or borrowed.
pub const POST_DEBT: &str = "/api/debts";
/// The route to toggle whether money lent has been repaid.
pub const TOGGLE_LENT_SETTLED: &str = "/api/lent/{debt_id}/settled";
/// The route to delete a record of money lent.
pub const DELETE_LENT: &str = "/api/lent/{debt_id}";
/// The route to toggle whether borrowed money has been repaid.
pub const TOGGLE_BORROWED_SETTLED: &str = "/api/borrowed/{debt_id}/settled";
/// The route to delete a record of borrowed money.
pub const DELETE_BORROWED: &str = "/api/borrowed/{debt_id}";
/// The route to create a group.
pub const POST_GROUP: &str = "/api/groups";
/// The route to delete a group.
pub const DELETE_GROUP: &str = "/api/groups/{group_id}";
/// The route to add a member to a group.
pub const POST_GROUP_MEMBER: &str = "/api/groups/{group_id}/members";
/// The route to remove a member from a group.
pub const DELETE_GROUP_MEMBER: &str = "/api/group_members/{member_id}";
/// The route to add an expense to a group.
pub const POST_GROUP_EXPENSE: &str = "/api/groups/{group_id}/expenses";
/// The route to delete a group expense.
pub const DELETE_GROUP_EXPENSE: &str = "/api/group_expenses/{expense_id}";
/// The route to create a split bill.
pub const POST_SPLIT_BILL: &str = "/api/split_bills";
/// The route to delete a split bill.
pub const DELETE_SPLIT_BILL: &str = "/api/split_bills/{split_bill_id}";
/// The route to toggle whether a split bill participant has paid.
pub const TOGGLE_PARTICIPANT_PAID: &str = "/api/split_bill_participants/{participant_id}/paid";
/// The route to create an invoice.
pub const POST_INVOICE: &str = "/api/invoices";
/// The route to delete an invoice.
pub const DELETE_INVOICE: &str = "/api/invoices/{invoice_id}";
/// The route to create a party.
pub const POST_PARTY: &str = "/api/parties";
/// The route to delete a party.
pub const DELETE_PARTY: &str = "/api/parties/{party_id}";
/// The route to create a product.
pub const POST_PRODUCT: &str = "/api/products";
/// The route to delete a product.
pub const DELETE_PRODUCT: &str = "/api/products/{product_id}";
/// The route to restore a deleted item.
pub const RESTORE_DELETED_ITEM: &str = "/api/trash/{item_id}/restore";
/// The route to permanently delete an item in the trash.
pub const PURGE_DELETED_ITEM: &str = "/api/trash/{item_id}";
/// The route to upload and scan a receipt.
pub const SCAN_BILL: &str = "/api/scan_bill";
/// The route to download a JSON backup of all the user's data.
pub const EXPORT_BACKUP_JSON: &str = "/api/export/backup.json";
/// The route to download the user's expenses as CSV.
pub const EXPORT_EXPENSES_CSV: &str = "/api/export/expenses.csv";
/// The route to update user preferences.
pub const PUT_PREFERENCES: &str = "/api/preferences";

/// Replace the parameter in `endpoint_path` with `id`.
///
/// A parameter is a string that starts with a left brace, followed by
/// lowercase letters or underscores, and ends with a right brace.
/// For example, in the endpoint path '/users/{user_id}', '{user_id}' is the parameter.
///
/// This function assumes that an endpoint path only contains ASCII characters
/// and a single parameter.
///
/// If no parameter is found in `endpoint_path`, the function returns the
/// the original `endpoint_path`.
pub fn format_endpoint(endpoint_path: &str, id: i64) -> String {
    let mut param_start = None;
    let mut param_end = None;

    for (i, c) in endpoint_path.chars().enumerate() {
        if c == '{' {
            param_start = Some(i);
        } else if param_start.is_some() && c == '}' {
            param_end = Some(i + 1);
            break;
        }
    }

    let param_start = match param_start {
        Some(start) => start,
        None => return endpoint_path.to_string(),
    };

    let param_end = param_end.unwrap_or(endpoint_path.len());

    format!(
        "{}{}{}",
        &endpoint_path[..param_start],
        id,
        &endpoint_path[param_end..]
    )
}
