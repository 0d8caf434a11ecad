//! Application router configuration with protected and unprotected route definitions.

use axum::{
    Router, middleware,
    response::Redirect,
    routing::{delete, get, post, put},
};
use tower_http::services::ServeDir;

use crate::{
    AppState,
    auth::{
        auth_guard, auth_guard_hx, get_log_in_page, get_log_out, get_register_page, post_log_in,
        register_user,
    },
    budget::{get_budgets_page, set_budget_endpoint},
    category::{
        create_category_endpoint, delete_category_endpoint, get_categories_page,
        get_new_category_page,
    },
    dashboard::get_dashboard_page,
    debt::{
        create_debt_endpoint, delete_borrowed_endpoint, delete_lent_endpoint, get_debts_page,
        get_new_debt_page, toggle_borrowed_settled_endpoint, toggle_lent_settled_endpoint,
    },
    endpoints,
    expense::{
        create_expense_endpoint, delete_expense_endpoint, get_edit_expense_page,
        get_expenses_page, get_new_expense_page, update_expense_endpoint,
    },
    export::{export_backup_endpoint, export_expenses_csv_endpoint, get_export_page},
    group::{
        add_member_endpoint, create_group_endpoint, create_group_expense_endpoint,
        delete_group_endpoint, delete_group_expense_endpoint, get_group_page, get_groups_page,
        get_new_group_page, remove_member_endpoint,
    },
    internal_server_error::get_internal_server_error_page,
    invoice::{
        create_invoice_endpoint, create_party_endpoint, create_product_endpoint,
        delete_invoice_endpoint, delete_party_endpoint, delete_product_endpoint,
        get_invoice_page, get_invoices_page, get_new_invoice_page, get_parties_page,
        get_products_page,
    },
    not_found::get_404_not_found,
    preferences::{get_settings_page, update_preferences_endpoint},
    receipt::{get_expense_receipt, get_scan_bill_page, scan_bill_endpoint},
    split_bill::{
        create_split_bill_endpoint, delete_split_bill_endpoint, get_new_split_bill_page,
        get_split_bills_page, toggle_participant_paid_endpoint,
    },
    trash::{get_trash_page, purge_deleted_item_endpoint, restore_deleted_item_endpoint},
};

/// Return a router with all the app's routes.
pub fn build_router(state: AppState) -> Router {
    let unprotected_routes = Router::new()
        .route(endpoints::LOG_IN_VIEW, get(get_log_in_page))
        .route(endpoints::LOG_IN_API, post(post_log_in))
        .route(endpoints::LOG_OUT, get(get_log_out))
        .route(endpoints::REGISTER_VIEW, get(get_register_page))
        .route(endpoints::USERS, post(register_user))
        .route(
            endpoints::INTERNAL_ERROR_VIEW,
            get(get_internal_server_error_page),
        );

    let protected_routes = Router::new()
        .route(endpoints::ROOT, get(get_index_page))
        .route(endpoints::DASHBOARD_VIEW, get(get_dashboard_page))
        .route(endpoints::EXPENSES_VIEW, get(get_expenses_page))
        .route(endpoints::NEW_EXPENSE_VIEW, get(get_new_expense_page))
        .route(endpoints::EDIT_EXPENSE_VIEW, get(get_edit_expense_page))
        .route(endpoints::EXPENSE_RECEIPT, get(get_expense_receipt))
        .route(endpoints::CATEGORIES_VIEW, get(get_categories_page))
        .route(endpoints::NEW_CATEGORY_VIEW, get(get_new_category_page))
        .route(endpoints::BUDGETS_VIEW, get(get_budgets_page))
        .route(endpoints::DEBTS_VIEW, get(get_debts_page))
        .route(endpoints::NEW_DEBT_VIEW, get(get_new_debt_page))
        .route(endpoints::GROUPS_VIEW, get(get_groups_page))
        .route(endpoints::NEW_GROUP_VIEW, get(get_new_group_page))
        .route(endpoints::GROUP_VIEW, get(get_group_page))
        .route(endpoints::SPLIT_BILLS_VIEW, get(get_split_bills_page))
        .route(endpoints::NEW_SPLIT_BILL_VIEW, get(get_new_split_bill_page))
        .route(endpoints::INVOICES_VIEW, get(get_invoices_page))
        .route(endpoints::NEW_INVOICE_VIEW, get(get_new_invoice_page))
        .route(endpoints::INVOICE_VIEW, get(get_invoice_page))
        .route(endpoints::PARTIES_VIEW, get(get_parties_page))
        .route(endpoints::PRODUCTS_VIEW, get(get_products_page))
        .route(endpoints::TRASH_VIEW, get(get_trash_page))
        .route(endpoints::SCAN_BILL_VIEW, get(get_scan_bill_page))
        .route(endpoints::EXPORT_VIEW, get(get_export_page))
        // Downloads are plain links, so they redirect to the log in page like other pages.
        .route(endpoints::EXPORT_BACKUP_JSON, get(export_backup_endpoint))
        .route(
            endpoints::EXPORT_EXPENSES_CSV,
            get(export_expenses_csv_endpoint),
        )
        .route(endpoints::SETTINGS_VIEW, get(get_settings_page))
        .layer(middleware::from_fn_with_state(state.clone(), auth_guard));

    // These routes need to use the HX-REDIRECT header for auth redirects to work properly for HTMX requests.
    let protected_routes = protected_routes.merge(
        Router::new()
            .route(endpoints::POST_EXPENSE, post(create_expense_endpoint))
            .route(
                endpoints::PUT_EXPENSE,
                put(update_expense_endpoint).delete(delete_expense_endpoint),
            )
            .route(endpoints::POST_CATEGORY, post(create_category_endpoint))
            .route(
                endpoints::DELETE_CATEGORY,
                delete(delete_category_endpoint),
            )
            .route(endpoints::POST_BUDGET, post(set_budget_endpoint))
            .route(endpoints::POST_DEBT, post(create_debt_endpoint))
            .route(
                endpoints::TOGGLE_LENT_SETTLED,
                put(toggle_lent_settled_endpoint),
            )
            .route(endpoints::DELETE_LENT, delete(delete_lent_endpoint))
            .route(
                endpoints::TOGGLE_BORROWED_SETTLED,
                put(toggle_borrowed_settled_endpoint),
            )
            .route(endpoints::DELETE_BORROWED, delete(delete_borrowed_endpoint))
            .route(endpoints::POST_GROUP, post(create_group_endpoint))
            .route(endpoints::DELETE_GROUP, delete(delete_group_endpoint))
            .route(endpoints::POST_GROUP_MEMBER, post(add_member_endpoint))
            .route(
                endpoints::DELETE_GROUP_MEMBER,
                delete(remove_member_endpoint),
            )
            .route(
                endpoints::POST_GROUP_EXPENSE,
                post(create_group_expense_endpoint),
            )
            .route(
                endpoints::DELETE_GROUP_EXPENSE,
                delete(delete_group_expense_endpoint),
            )
            .route(endpoints::POST_SPLIT_BILL, post(create_split_bill_endpoint))
            .route(
                endpoints::DELETE_SPLIT_BILL,
                delete(delete_split_bill_endpoint),
            )
            .route(
                endpoints::TOGGLE_PARTICIPANT_PAID,
                put(toggle_participant_paid_endpoint),
            )
            .route(endpoints::POST_INVOICE, post(create_invoice_endpoint))
            .route(endpoints::DELETE_INVOICE, delete(delete_invoice_endpoint))
            .route(endpoints::POST_PARTY, post(create_party_endpoint))
            .route(endpoints::DELETE_PARTY, delete(delete_party_endpoint))
            .route(endpoints::POST_PRODUCT, post(create_product_endpoint))
            .route(endpoints::DELETE_PRODUCT, delete(delete_product_endpoint))
            .route(
                endpoints::RESTORE_DELETED_ITEM,
                post(restore_deleted_item_endpoint),
            )
            .route(
                endpoints::PURGE_DELETED_ITEM,
                delete(purge_deleted_item_endpoint),
            )
            .route(endpoints::SCAN_BILL, post(scan_bill_endpoint))
            .route(
                endpoints::PUT_PREFERENCES,
                put(update_preferences_endpoint),
            )
            .layer(middleware::from_fn_with_state(state.clone(), auth_guard_hx)),
    );

    protected_routes
        .merge(unprotected_routes)
        .nest_service(endpoints::STATIC, ServeDir::new("static/"))
        .fallback(get_404_not_found)
        .with_state(state)
}

/// The root path '/' redirects to the dashboard page.
async fn get_index_page() -> Redirect {
    Redirect::to(endpoints::DASHBOARD_VIEW)
}
