//! Category creation page and endpoint.

use std::sync::{Arc, Mutex};

use axum::{
    Extension, Form,
    extract::{FromRef, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use axum_htmx::HxRedirect;
use maud::{Markup, html};
use rusqlite::Connection;

use crate::{
    AppState, Error,
    auth::UserID,
    category::{CategoryIcon, CategoryName, create_category, domain::CategoryFormData},
    endpoints,
    html::{
        BUTTON_PRIMARY_STYLE, FORM_CONTAINER_STYLE, FORM_LABEL_STYLE, FORM_TEXT_INPUT_STYLE, base,
    },
    navigation::NavBar,
    preferences::load_preferences,
};

/// The state needed for creating a category.
#[derive(Debug, Clone)]
pub struct CreateCategoryState {
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for CreateCategoryState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

/// Render the category creation page.
pub async fn get_new_category_page(
    State(state): State<CreateCategoryState>,
    Extension(user_id): Extension<UserID>,
) -> Result<Response, Error> {
    let connection = state
        .db_connection
        .lock()
        .inspect_err(|error| tracing::error!("could not acquire database lock: {error}"))
        .map_err(|_| Error::DatabaseLockError)?;
    let preferences = load_preferences(user_id, &connection)?;

    let nav_bar = NavBar::new(endpoints::NEW_CATEGORY_VIEW, preferences.business_mode).into_html();
    let content = html! {
        (nav_bar)
        div class=(FORM_CONTAINER_STYLE) { (new_category_form_view("", "")) }
    };

    Ok(base("Create Category", &[], &content).into_response())
}

/// Handle category creation form submission.
pub async fn create_category_endpoint(
    State(state): State<CreateCategoryState>,
    Extension(user_id): Extension<UserID>,
    Form(form): Form<CategoryFormData>,
) -> Response {
    let name = match CategoryName::new(&form.name) {
        Ok(name) => name,
        Err(error) => {
            return new_category_form_view(&form.name, &format!("Error: {error}")).into_response();
        }
    };
    let icon = CategoryIcon::from_key(&form.icon).unwrap_or_default();

    let connection = match state.db_connection.lock() {
        Ok(connection) => connection,
        Err(error) => {
            tracing::error!("could not acquire database lock: {error}");
            return Error::DatabaseLockError.into_alert_response();
        }
    };

    match create_category(user_id, name, icon, &connection) {
        Ok(_) => (
            HxRedirect(endpoints::CATEGORIES_VIEW.to_owned()),
            StatusCode::SEE_OTHER,
        )
            .into_response(),
        Err(error) => {
            tracing::error!("An unexpected error occurred while creating a category: {error}");

            error.into_alert_response()
        }
    }
}

fn new_category_form_view(name: &str, error_message: &str) -> Markup {
    html! {
        form
            hx-post=(endpoints::POST_CATEGORY)
            hx-swap="outerHTML"
            hx-target-error="#alert-container"
            class="w-full space-y-4 md:space-y-6"
        {
            div
            {
                label for="name" class=(FORM_LABEL_STYLE) { "Category Name" }

                input
                    id="name"
                    type="text"
                    name="name"
                    value=(name)
                    placeholder="Category Name"
                    required
                    autofocus
                    class=(FORM_TEXT_INPUT_STYLE);
            }

            div
            {
                label for="icon" class=(FORM_LABEL_STYLE) { "Icon" }

                select id="icon" name="icon" class=(FORM_TEXT_INPUT_STYLE)
                {
                    @for icon in CategoryIcon::ALL {
                        option value=(icon.key()) selected[icon == CategoryIcon::Other]
                        {
                            (icon.glyph()) " " (icon.label())
                        }
                    }
                }
            }

            @if !error_message.is_empty() {
                p class="text-red-600 dark:text-red-400" { (error_message) }
            }

            button type="submit" class=(BUTTON_PRIMARY_STYLE) { "Create Category" }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use axum::{Extension, Form, extract::State, http::StatusCode};

    use crate::{
        auth::UserID,
        category::{CategoryIcon, get_categories},
        endpoints,
        test_utils::{
            assert_form_error_message, assert_form_input, assert_form_select,
            assert_form_submit_button, assert_hx_endpoint, assert_hx_redirect, assert_valid_html,
            create_test_user, get_test_connection, must_get_form, parse_html_document,
            parse_html_fragment,
        },
    };

    use super::{
        CategoryFormData, CreateCategoryState, create_category_endpoint, get_new_category_page,
    };

    fn get_test_state() -> (CreateCategoryState, UserID) {
        let connection = get_test_connection();
        let user_id = create_test_user("alice", &connection);

        (
            CreateCategoryState {
                db_connection: Arc::new(Mutex::new(connection)),
            },
            user_id,
        )
    }

    #[tokio::test]
    async fn render_page() {
        let (state, user_id) = get_test_state();

        let response = get_new_category_page(State(state), Extension(user_id))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let html = parse_html_document(response).await;
        assert_valid_html(&html);
        let form = must_get_form(&html);
        assert_hx_endpoint(&form, endpoints::POST_CATEGORY, "hx-post");
        assert_form_input(&form, "name", "text");
        assert_form_select(&form, "icon", &["food", "other"]);
        assert_form_submit_button(&form);
    }

    #[tokio::test]
    async fn can_create_category() {
        let (state, user_id) = get_test_state();

        let response = create_category_endpoint(
            State(state.clone()),
            Extension(user_id),
            Form(CategoryFormData {
                name: "Groceries".to_owned(),
                icon: "food".to_owned(),
            }),
        )
        .await;

        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_hx_redirect(&response, endpoints::CATEGORIES_VIEW);
        let categories = get_categories(user_id, &state.db_connection.lock().unwrap()).unwrap();
        assert_eq!(categories.len(), 1);
        assert_eq!(categories[0].name.as_ref(), "Groceries");
        assert_eq!(categories[0].icon, CategoryIcon::Food);
    }

    #[tokio::test]
    async fn empty_name_renders_error() {
        let (state, user_id) = get_test_state();

        let response = create_category_endpoint(
            State(state.clone()),
            Extension(user_id),
            Form(CategoryFormData {
                name: "  ".to_owned(),
                icon: "food".to_owned(),
            }),
        )
        .await;

        assert_eq!(response.status(), StatusCode::OK);
        let html = parse_html_fragment(response).await;
        assert_valid_html(&html);
        let form = must_get_form(&html);
        assert_form_error_message(&form, "Error: Category name cannot be empty");
        assert_eq!(
            get_categories(user_id, &state.db_connection.lock().unwrap()),
            Ok(vec![])
        );
    }
}
