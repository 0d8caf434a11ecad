//! Moves expenses to the trash.

use std::sync::{Arc, Mutex};

use axum::{
    Extension,
    extract::{FromRef, Path, State},
    response::{IntoResponse, Response},
};
use rusqlite::Connection;
use time::OffsetDateTime;

use crate::{
    AppState, Error, alert::Alert, auth::UserID, expense::ExpenseId, trash::soft_delete_expense,
};

/// The state needed for deleting an expense.
#[derive(Debug, Clone)]
pub struct DeleteExpenseState {
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for DeleteExpenseState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

/// Move an expense to the trash. Returns a success alert or error.
pub async fn delete_expense_endpoint(
    Path(expense_id): Path<ExpenseId>,
    State(state): State<DeleteExpenseState>,
    Extension(user_id): Extension<UserID>,
) -> Response {
    let connection = match state.db_connection.lock() {
        Ok(connection) => connection,
        Err(error) => {
            tracing::error!("could not acquire database lock: {error}");
            return Error::DatabaseLockError.into_alert_response();
        }
    };

    match soft_delete_expense(expense_id, user_id, OffsetDateTime::now_utc(), &connection) {
        Ok(_) => Alert::SuccessSimple {
            message: "Expense moved to the trash".to_owned(),
        }
        .into_response(),
        Err(Error::DeleteMissingExpense) => Error::DeleteMissingExpense.into_alert_response(),
        Err(error) => {
            tracing::error!(
                "An unexpected error occurred while deleting expense {expense_id}: {error}"
            );
            error.into_alert_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use axum::{
        Extension,
        extract::{Path, State},
        http::StatusCode,
    };
    use time::macros::date;

    use crate::{
        Error,
        expense::{NewExpense, create_expense, get_expense},
        test_utils::{create_test_user, get_test_connection},
        trash::get_deleted_items,
    };

    use super::{DeleteExpenseState, delete_expense_endpoint};

    #[tokio::test]
    async fn delete_moves_expense_to_trash() {
        let connection = get_test_connection();
        let user_id = create_test_user("alice", &connection);
        let expense = create_expense(
            NewExpense::new_unchecked(3.0, date!(2025 - 01 - 01), "Tea"),
            user_id,
            &connection,
        )
        .unwrap();
        let state = DeleteExpenseState {
            db_connection: Arc::new(Mutex::new(connection)),
        };

        let response =
            delete_expense_endpoint(Path(expense.id), State(state.clone()), Extension(user_id))
                .await;

        assert_eq!(response.status(), StatusCode::OK);
        let connection = state.db_connection.lock().unwrap();
        assert_eq!(
            get_expense(expense.id, user_id, &connection),
            Err(Error::NotFound)
        );
        let trash = get_deleted_items(user_id, &connection).unwrap();
        assert_eq!(trash.len(), 1);
        assert_eq!(trash[0].record_id, expense.id);
    }

    #[tokio::test]
    async fn delete_missing_expense_returns_not_found() {
        let connection = get_test_connection();
        let user_id = create_test_user("alice", &connection);
        let state = DeleteExpenseState {
            db_connection: Arc::new(Mutex::new(connection)),
        };

        let response = delete_expense_endpoint(Path(1), State(state), Extension(user_id)).await;

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
