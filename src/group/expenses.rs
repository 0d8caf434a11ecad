//! Endpoints for adding and deleting group expenses.

use axum::{
    Extension,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use axum_extra::extract::Form;
use axum_htmx::HxRedirect;
use serde::{Deserialize, Serialize};
use time::{Date, OffsetDateTime};

use crate::{
    Error,
    alert::Alert,
    auth::UserID,
    endpoints::{self, format_endpoint},
    group::{
        GroupExpenseId, GroupId, GroupsState, NewGroupExpense, create_group_expense, get_group,
    },
    trash::soft_delete_group_expense,
};

/// The form data for adding a group expense.
#[derive(Debug, Serialize, Deserialize)]
pub struct GroupExpenseForm {
    pub payer_id: i64,
    pub amount: f64,
    #[serde(default)]
    pub description: String,
    pub date: Date,
    /// The user IDs of the members sharing the expense, empty for everyone.
    #[serde(default)]
    pub participants: Vec<i64>,
}

/// Add an expense to a group the user is a member of.
pub async fn create_group_expense_endpoint(
    Path(group_id): Path<GroupId>,
    State(state): State<GroupsState>,
    Extension(user_id): Extension<UserID>,
    Form(form): Form<GroupExpenseForm>,
) -> Response {
    let new_expense = NewGroupExpense {
        payer_id: UserID::new(form.payer_id),
        amount: form.amount,
        description: form.description,
        date: form.date,
        split_data: form.participants.into_iter().map(UserID::new).collect(),
    };

    let connection = match state.db_connection.lock() {
        Ok(connection) => connection,
        Err(error) => {
            tracing::error!("could not acquire database lock: {error}");
            return Error::DatabaseLockError.into_alert_response();
        }
    };

    let result = get_group(group_id, user_id, &connection)
        .and_then(|group| create_group_expense(group.id, new_expense, &connection));

    match result {
        Ok(_) => (
            HxRedirect(format_endpoint(endpoints::GROUP_VIEW, group_id)),
            StatusCode::SEE_OTHER,
        )
            .into_response(),
        Err(error @ (Error::NotGroupMember | Error::NonPositiveAmount(_))) => {
            error.into_alert_response()
        }
        Err(error) => {
            tracing::error!("could not add expense to group {group_id}: {error}");
            error.into_alert_response()
        }
    }
}

/// Move a group expense to the trash.
pub async fn delete_group_expense_endpoint(
    Path(expense_id): Path<GroupExpenseId>,
    State(state): State<GroupsState>,
    Extension(user_id): Extension<UserID>,
) -> Response {
    let connection = match state.db_connection.lock() {
        Ok(connection) => connection,
        Err(error) => {
            tracing::error!("could not acquire database lock: {error}");
            return Error::DatabaseLockError.into_alert_response();
        }
    };

    match soft_delete_group_expense(expense_id, user_id, OffsetDateTime::now_utc(), &connection) {
        Ok(_) => Alert::SuccessSimple {
            message: "Expense moved to the trash".to_owned(),
        }
        .into_response(),
        Err(error @ (Error::NotGroupMember | Error::DeleteMissingGroupExpense)) => {
            error.into_alert_response()
        }
        Err(error) => {
            tracing::error!("could not delete group expense {expense_id}: {error}");
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
    use axum_extra::extract::Form;
    use time::{OffsetDateTime, macros::date};

    use crate::{
        auth::UserID,
        endpoints::{self, format_endpoint},
        group::{GroupsState, add_member, create_group, get_group_expenses},
        test_utils::{assert_hx_redirect, create_test_user, get_test_connection},
        trash::get_deleted_items,
    };

    use super::{GroupExpenseForm, create_group_expense_endpoint, delete_group_expense_endpoint};

    fn get_test_state() -> (GroupsState, UserID, UserID, i64) {
        let connection = get_test_connection();
        let alice = create_test_user("alice", &connection);
        let bob = create_test_user("bob", &connection);
        let group = create_group("Trip", alice, OffsetDateTime::now_utc(), &connection).unwrap();
        add_member(group.id, "bob", OffsetDateTime::now_utc(), &connection).unwrap();

        (
            GroupsState {
                db_connection: Arc::new(Mutex::new(connection)),
            },
            alice,
            bob,
            group.id,
        )
    }

    fn form(payer: UserID, amount: f64, participants: Vec<i64>) -> GroupExpenseForm {
        GroupExpenseForm {
            payer_id: payer.as_i64(),
            amount,
            description: "Groceries".to_owned(),
            date: date!(2025 - 03 - 03),
            participants,
        }
    }

    #[tokio::test]
    async fn create_expense_with_subset() {
        let (state, alice, bob, group_id) = get_test_state();

        let response = create_group_expense_endpoint(
            Path(group_id),
            State(state.clone()),
            Extension(bob),
            Form(form(alice, 25.0, vec![bob.as_i64()])),
        )
        .await;

        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_hx_redirect(&response, &format_endpoint(endpoints::GROUP_VIEW, group_id));
        let expenses = get_group_expenses(group_id, &state.db_connection.lock().unwrap()).unwrap();
        assert_eq!(expenses.len(), 1);
        assert_eq!(expenses[0].split_data, vec![bob]);
    }

    #[tokio::test]
    async fn payer_outside_group_is_rejected() {
        let (state, alice, _, group_id) = get_test_state();
        let carol = create_test_user("carol", &state.db_connection.lock().unwrap());

        let response = create_group_expense_endpoint(
            Path(group_id),
            State(state),
            Extension(alice),
            Form(form(carol, 25.0, vec![])),
        )
        .await;

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn delete_moves_expense_to_trash() {
        let (state, alice, _, group_id) = get_test_state();
        create_group_expense_endpoint(
            Path(group_id),
            State(state.clone()),
            Extension(alice),
            Form(form(alice, 25.0, vec![])),
        )
        .await;
        let expense_id = get_group_expenses(group_id, &state.db_connection.lock().unwrap())
            .unwrap()[0]
            .id;

        let response =
            delete_group_expense_endpoint(Path(expense_id), State(state.clone()), Extension(alice))
                .await;

        assert_eq!(response.status(), StatusCode::OK);
        let connection = state.db_connection.lock().unwrap();
        assert!(get_group_expenses(group_id, &connection).unwrap().is_empty());
        assert_eq!(get_deleted_items(alice, &connection).unwrap().len(), 1);
    }
}
