//! Category deletion endpoint.

use std::sync::{Arc, Mutex};

use axum::{
    Extension,
    extract::{FromRef, Path, State},
    response::{IntoResponse, Response},
};
use rusqlite::Connection;

use crate::{
    AppState, Error,
    alert::Alert,
    auth::UserID,
    category::{CategoryId, delete_category},
};

/// The state needed for deleting a category.
#[derive(Debug, Clone)]
pub struct DeleteCategoryState {
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for DeleteCategoryState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

/// Handle category deletion. Returns success alert or error.
pub async fn delete_category_endpoint(
    Path(category_id): Path<CategoryId>,
    State(state): State<DeleteCategoryState>,
    Extension(user_id): Extension<UserID>,
) -> Response {
    let connection = match state.db_connection.lock() {
        Ok(connection) => connection,
        Err(error) => {
            tracing::error!("could not acquire database lock: {error}");
            return Error::DatabaseLockError.into_alert_response();
        }
    };

    match delete_category(category_id, user_id, &connection) {
        Ok(_) => Alert::SuccessSimple {
            message: "Category deleted successfully".to_owned(),
        }
        .into_response(),
        Err(Error::DeleteMissingCategory) => Error::DeleteMissingCategory.into_alert_response(),
        Err(error) => {
            tracing::error!(
                "An unexpected error occurred while deleting category {category_id}: {error}"
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
        category::{CategoryIcon, CategoryName, create_category, get_category},
        expense::{NewExpense, create_expense, get_expense},
        test_utils::{create_test_user, get_test_connection},
    };

    use super::{DeleteCategoryState, delete_category_endpoint};

    #[tokio::test]
    async fn deleting_category_uncategorises_expenses() {
        let connection = get_test_connection();
        let user_id = create_test_user("alice", &connection);
        let category = create_category(
            user_id,
            CategoryName::new_unchecked("Food"),
            CategoryIcon::Food,
            &connection,
        )
        .unwrap();
        let expense = create_expense(
            NewExpense::new_unchecked(12.5, date!(2025 - 01 - 02), "Lunch")
                .category_id(Some(category.id)),
            user_id,
            &connection,
        )
        .unwrap();
        let state = DeleteCategoryState {
            db_connection: Arc::new(Mutex::new(connection)),
        };

        let response =
            delete_category_endpoint(Path(category.id), State(state.clone()), Extension(user_id))
                .await;

        assert_eq!(response.status(), StatusCode::OK);
        let connection = state.db_connection.lock().unwrap();
        assert!(get_category(category.id, user_id, &connection).is_err());
        assert_eq!(
            get_expense(expense.id, user_id, &connection)
                .unwrap()
                .category_id,
            None
        );
    }

    #[tokio::test]
    async fn deleting_missing_category_returns_not_found() {
        let connection = get_test_connection();
        let user_id = create_test_user("alice", &connection);
        let state = DeleteCategoryState {
            db_connection: Arc::new(Mutex::new(connection)),
        };

        let response =
            delete_category_endpoint(Path(42), State(state), Extension(user_id)).await;

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
