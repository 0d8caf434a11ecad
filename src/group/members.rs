//! Endpoints for adding people to and removing people from a group.

use axum::{
    Extension, Form,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use axum_htmx::HxRedirect;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::{
    Error,
    alert::Alert,
    auth::UserID,
    endpoints::{self, format_endpoint},
    group::{GroupId, GroupMemberId, GroupsState, add_member, get_group, remove_member},
};

#[derive(Debug, Serialize, Deserialize)]
pub struct AddMemberForm {
    pub username: String,
}

/// Add a user to a group by their username. Only members can add people.
pub async fn add_member_endpoint(
    Path(group_id): Path<GroupId>,
    State(state): State<GroupsState>,
    Extension(user_id): Extension<UserID>,
    Form(form): Form<AddMemberForm>,
) -> Response {
    let connection = match state.db_connection.lock() {
        Ok(connection) => connection,
        Err(error) => {
            tracing::error!("could not acquire database lock: {error}");
            return Error::DatabaseLockError.into_alert_response();
        }
    };

    let result = get_group(group_id, user_id, &connection).and_then(|group| {
        add_member(group.id, &form.username, OffsetDateTime::now_utc(), &connection)
    });

    match result {
        Ok(_) => (
            HxRedirect(format_endpoint(endpoints::GROUP_VIEW, group_id)),
            StatusCode::SEE_OTHER,
        )
            .into_response(),
        Err(
            error @ (Error::NotGroupMember
            | Error::UnknownUsername(_)
            | Error::DuplicateGroupMember(_)),
        ) => error.into_alert_response(),
        Err(error) => {
            tracing::error!("could not add {} to group {group_id}: {error}", form.username);
            error.into_alert_response()
        }
    }
}

/// Remove a member from a group.
pub async fn remove_member_endpoint(
    Path(member_id): Path<GroupMemberId>,
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

    match remove_member(member_id, user_id, &connection) {
        Ok(member) => Alert::SuccessSimple {
            message: format!("Removed {} from the group", member.username),
        }
        .into_response(),
        Err(
            error @ (Error::NotGroupMember
            | Error::DeleteMissingGroupMember
            | Error::RemoveGroupOwner
            | Error::MemberHasExpenses(_)),
        ) => error.into_alert_response(),
        Err(error) => {
            tracing::error!("could not remove group member {member_id}: {error}");
            error.into_alert_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use axum::{
        Extension, Form,
        extract::{Path, State},
        http::StatusCode,
    };
    use time::OffsetDateTime;

    use crate::{
        endpoints::{self, format_endpoint},
        group::{GroupsState, add_member, create_group, get_members},
        test_utils::{assert_hx_redirect, create_test_user, get_test_connection},
    };

    use super::{AddMemberForm, add_member_endpoint, remove_member_endpoint};

    #[tokio::test]
    async fn add_member_by_username() {
        let connection = get_test_connection();
        let alice = create_test_user("alice", &connection);
        create_test_user("bob", &connection);
        let group = create_group("Trip", alice, OffsetDateTime::now_utc(), &connection).unwrap();
        let state = GroupsState {
            db_connection: Arc::new(Mutex::new(connection)),
        };

        let response = add_member_endpoint(
            Path(group.id),
            State(state.clone()),
            Extension(alice),
            Form(AddMemberForm {
                username: " bob ".to_owned(),
            }),
        )
        .await;

        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_hx_redirect(&response, &format_endpoint(endpoints::GROUP_VIEW, group.id));
        let members = get_members(group.id, &state.db_connection.lock().unwrap()).unwrap();
        assert_eq!(members.len(), 2);
    }

    #[tokio::test]
    async fn unknown_username_is_bad_request() {
        let connection = get_test_connection();
        let alice = create_test_user("alice", &connection);
        let group = create_group("Trip", alice, OffsetDateTime::now_utc(), &connection).unwrap();
        let state = GroupsState {
            db_connection: Arc::new(Mutex::new(connection)),
        };

        let response = add_member_endpoint(
            Path(group.id),
            State(state),
            Extension(alice),
            Form(AddMemberForm {
                username: "nobody".to_owned(),
            }),
        )
        .await;

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn outsiders_cannot_add_members() {
        let connection = get_test_connection();
        let alice = create_test_user("alice", &connection);
        let eve = create_test_user("eve", &connection);
        let group = create_group("Trip", alice, OffsetDateTime::now_utc(), &connection).unwrap();
        let state = GroupsState {
            db_connection: Arc::new(Mutex::new(connection)),
        };

        let response = add_member_endpoint(
            Path(group.id),
            State(state),
            Extension(eve),
            Form(AddMemberForm {
                username: "eve".to_owned(),
            }),
        )
        .await;

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn remove_member_returns_success_alert() {
        let connection = get_test_connection();
        let alice = create_test_user("alice", &connection);
        create_test_user("bob", &connection);
        let group = create_group("Trip", alice, OffsetDateTime::now_utc(), &connection).unwrap();
        let bob = add_member(group.id, "bob", OffsetDateTime::now_utc(), &connection).unwrap();
        let state = GroupsState {
            db_connection: Arc::new(Mutex::new(connection)),
        };

        let response =
            remove_member_endpoint(Path(bob.id), State(state.clone()), Extension(alice)).await;

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            get_members(group.id, &state.db_connection.lock().unwrap())
                .unwrap()
                .len(),
            1
        );
    }

    #[tokio::test]
    async fn owner_cannot_be_removed_by_another_member() {
        let connection = get_test_connection();
        let alice = create_test_user("alice", &connection);
        let bob = create_test_user("bob", &connection);
        let group = create_group("Trip", alice, OffsetDateTime::now_utc(), &connection).unwrap();
        add_member(group.id, "bob", OffsetDateTime::now_utc(), &connection).unwrap();
        let owner_id = get_members(group.id, &connection)
            .unwrap()
            .into_iter()
            .find(|member| member.user_id == alice)
            .unwrap()
            .id;
        let state = GroupsState {
            db_connection: Arc::new(Mutex::new(connection)),
        };

        let response =
            remove_member_endpoint(Path(owner_id), State(state.clone()), Extension(bob)).await;

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            get_members(group.id, &state.db_connection.lock().unwrap())
                .unwrap()
                .len(),
            2
        );
    }
}
