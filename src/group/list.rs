//! The groups listing page, the new group page, and the endpoints that create and
//! delete groups.

use std::sync::{Arc, Mutex};

use axum::{
    Extension, Form,
    extract::{FromRef, Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use axum_htmx::HxRedirect;
use maud::{Markup, html};
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::{
    AppState, Error,
    alert::Alert,
    auth::UserID,
    endpoints::{self, format_endpoint},
    group::{Group, GroupId, create_group, get_groups_for_user, get_members},
    html::{
        BADGE_STYLE, BUTTON_PRIMARY_STYLE, FORM_CONTAINER_STYLE, FORM_LABEL_STYLE,
        FORM_TEXT_INPUT_STYLE, LINK_STYLE, PAGE_CONTAINER_STYLE, TABLE_CELL_STYLE,
        TABLE_HEADER_STYLE, TABLE_ROW_STYLE, base, delete_action_button,
    },
    navigation::NavBar,
    preferences::load_preferences,
    trash::soft_delete_group,
};

/// The state needed for listing, creating and deleting groups.
#[derive(Debug, Clone)]
pub struct GroupsState {
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for GroupsState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

/// Render the groups the user belongs to.
pub async fn get_groups_page(
    State(state): State<GroupsState>,
    Extension(user_id): Extension<UserID>,
) -> Result<Response, Error> {
    let connection = state
        .db_connection
        .lock()
        .inspect_err(|error| tracing::error!("could not acquire database lock: {error}"))
        .map_err(|_| Error::DatabaseLockError)?;

    let preferences = load_preferences(user_id, &connection)?;
    let groups = get_groups_for_user(user_id, &connection)?
        .into_iter()
        .map(|group| {
            let member_count = get_members(group.id, &connection)?.len();
            Ok((group, member_count))
        })
        .collect::<Result<Vec<_>, Error>>()?;

    let nav_bar = NavBar::new(endpoints::GROUPS_VIEW, preferences.business_mode).into_html();

    Ok(groups_view(nav_bar, user_id, &groups).into_response())
}

fn groups_view(nav_bar: Markup, user_id: UserID, groups: &[(Group, usize)]) -> Markup {
    let content = html! {
        (nav_bar)

        main class=(PAGE_CONTAINER_STYLE)
        {
            section class="space-y-4"
            {
                header class="flex justify-between flex-wrap items-end"
                {
                    h1 class="text-xl font-bold" { "Groups" }

                    a href=(endpoints::NEW_GROUP_VIEW) class=(LINK_STYLE) { "Create Group" }
                }

                table class="w-full text-sm text-left text-gray-500 dark:text-gray-400"
                {
                    thead class=(TABLE_HEADER_STYLE)
                    {
                        tr
                        {
                            th scope="col" class=(TABLE_CELL_STYLE) { "Name" }
                            th scope="col" class=(TABLE_CELL_STYLE) { "Members" }
                            th scope="col" class=(TABLE_CELL_STYLE) { "Actions" }
                        }
                    }

                    tbody
                    {
                        @for (group, member_count) in groups {
                            tr class=(TABLE_ROW_STYLE) data-group-id=(group.id)
                            {
                                td class=(TABLE_CELL_STYLE)
                                {
                                    a href=(format_endpoint(endpoints::GROUP_VIEW, group.id)) class=(LINK_STYLE)
                                    {
                                        (group.name)
                                    }

                                    @if group.owner_id == user_id {
                                        " "
                                        span class=(BADGE_STYLE) { "Owner" }
                                    }
                                }

                                td class=(TABLE_CELL_STYLE) { (member_count) }

                                td class=(TABLE_CELL_STYLE)
                                {
                                    @if group.owner_id == user_id {
                                        (delete_action_button(
                                            &format_endpoint(endpoints::DELETE_GROUP, group.id),
                                            &format!(
                                                "Move '{}' to the trash? Its members and expenses go with it.",
                                                group.name
                                            ),
                                            "closest tr",
                                            "delete"
                                        ))
                                    }
                                }
                            }
                        }

                        @if groups.is_empty() {
                            tr
                            {
                                td colspan="3" class="px-6 py-4 text-center"
                                {
                                    "You are not in any groups yet."
                                }
                            }
                        }
                    }
                }
            }
        }
    };

    base("Groups", &[], &content)
}

/// Render the page for creating a group.
pub async fn get_new_group_page(
    State(state): State<GroupsState>,
    Extension(user_id): Extension<UserID>,
) -> Result<Response, Error> {
    let connection = state
        .db_connection
        .lock()
        .inspect_err(|error| tracing::error!("could not acquire database lock: {error}"))
        .map_err(|_| Error::DatabaseLockError)?;
    let preferences = load_preferences(user_id, &connection)?;

    let nav_bar = NavBar::new(endpoints::NEW_GROUP_VIEW, preferences.business_mode).into_html();
    let content = html! {
        (nav_bar)
        div class=(FORM_CONTAINER_STYLE) { (new_group_form("", "")) }
    };

    Ok(base("Create Group", &[], &content).into_response())
}

fn new_group_form(name: &str, error_message: &str) -> Markup {
    html! {
        form
            hx-post=(endpoints::POST_GROUP)
            hx-swap="outerHTML"
            hx-target-error="#alert-container"
            class="w-full space-y-4 md:space-y-6"
        {
            div
            {
                label for="name" class=(FORM_LABEL_STYLE) { "Group Name" }

                input
                    id="name"
                    type="text"
                    name="name"
                    value=(name)
                    placeholder="e.g. Flatmates"
                    required
                    autofocus
                    class=(FORM_TEXT_INPUT_STYLE);
            }

            @if !error_message.is_empty() {
                p class="text-red-600 dark:text-red-400" { (error_message) }
            }

            button type="submit" class=(BUTTON_PRIMARY_STYLE) { "Create Group" }
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct GroupForm {
    pub name: String,
}

/// Create a group and go to its page.
pub async fn create_group_endpoint(
    State(state): State<GroupsState>,
    Extension(user_id): Extension<UserID>,
    Form(form): Form<GroupForm>,
) -> Response {
    let connection = match state.db_connection.lock() {
        Ok(connection) => connection,
        Err(error) => {
            tracing::error!("could not acquire database lock: {error}");
            return Error::DatabaseLockError.into_alert_response();
        }
    };

    match create_group(&form.name, user_id, OffsetDateTime::now_utc(), &connection) {
        Ok(group) => (
            HxRedirect(format_endpoint(endpoints::GROUP_VIEW, group.id)),
            StatusCode::SEE_OTHER,
        )
            .into_response(),
        Err(error @ Error::EmptyField(_)) => {
            new_group_form(&form.name, &format!("Error: {error}")).into_response()
        }
        Err(error) => {
            tracing::error!("An unexpected error occurred while creating a group: {error}");
            error.into_alert_response()
        }
    }
}

/// Move a group, with its members and expenses, to the trash.
pub async fn delete_group_endpoint(
    Path(group_id): Path<GroupId>,
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

    match soft_delete_group(group_id, user_id, OffsetDateTime::now_utc(), &connection) {
        Ok(_) => Alert::SuccessSimple {
            message: "Group moved to the trash".to_owned(),
        }
        .into_response(),
        Err(Error::DeleteMissingGroup) => Error::DeleteMissingGroup.into_alert_response(),
        Err(error) => {
            tracing::error!("An unexpected error occurred while deleting group {group_id}: {error}");
            error.into_alert_response()
        }
    }
}
