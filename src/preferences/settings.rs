//! The settings page and the endpoint that saves preferences.

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
use serde::Deserialize;

use crate::{
    AppState, Error,
    auth::UserID,
    endpoints,
    html::{
        BUTTON_PRIMARY_STYLE, FORM_CHECKBOX_STYLE, FORM_CONTAINER_STYLE, FORM_LABEL_STYLE,
        FORM_TEXT_INPUT_STYLE, LINK_STYLE, base,
    },
    navigation::NavBar,
    preferences::{Currency, Preferences, load_preferences, save_preferences},
};

/// The state needed for the settings page and endpoint.
#[derive(Debug, Clone)]
pub struct SettingsState {
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for SettingsState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

/// Render the settings page.
pub async fn get_settings_page(
    State(state): State<SettingsState>,
    Extension(user_id): Extension<UserID>,
) -> Result<Response, Error> {
    let connection = state
        .db_connection
        .lock()
        .inspect_err(|error| tracing::error!("could not acquire database lock: {error}"))
        .map_err(|_| Error::DatabaseLockError)?;

    let preferences = load_preferences(user_id, &connection)?;

    Ok(settings_view(&preferences).into_response())
}

fn settings_view(preferences: &Preferences) -> Markup {
    let nav_bar = NavBar::new(endpoints::SETTINGS_VIEW, preferences.business_mode).into_html();

    let content = html! {
        (nav_bar)

        div class=(FORM_CONTAINER_STYLE)
        {
            h1 class="text-xl font-bold mb-4" { "Settings" }

            @if !preferences.onboarding_complete {
                p class="mb-4"
                {
                    "Welcome! Pick the currency you want to see amounts in, and turn on \
                    business mode if you want to send invoices."
                }
            }

            (settings_form(preferences))

            p class="mt-6"
            {
                "Need a copy of your data? Visit the "
                a href=(endpoints::EXPORT_VIEW) class=(LINK_STYLE) { "export page" }
                "."
            }
        }
    };

    base("Settings", &[], &content)
}

fn settings_form(preferences: &Preferences) -> Markup {
    html! {
        form
            hx-put=(endpoints::PUT_PREFERENCES)
            hx-target-error="#alert-container"
            class="w-full space-y-4 md:space-y-6"
        {
            div
            {
                label for="currency" class=(FORM_LABEL_STYLE) { "Currency" }

                select id="currency" name="currency" required class=(FORM_TEXT_INPUT_STYLE)
                {
                    @for currency in Currency::ALL {
                        option
                            value=(currency.code())
                            selected[currency == preferences.currency]
                        {
                            (currency)
                        }
                    }
                }
            }

            div class="flex items-center gap-x-3"
            {
                input
                    type="checkbox"
                    id="business_mode"
                    name="business_mode"
                    class=(FORM_CHECKBOX_STYLE)
                    checked[preferences.business_mode];

                label for="business_mode" class=(FORM_LABEL_STYLE) { "Business mode" }
            }

            button type="submit" class=(BUTTON_PRIMARY_STYLE) { "Save" }
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct PreferencesForm {
    pub currency: String,
    /// Checkbox, present when checked.
    pub business_mode: Option<String>,
}

/// Save the user's preferences.
///
/// Finishing onboarding sends the user to the dashboard, later saves reload the
/// settings page so the navigation reflects business mode.
pub async fn update_preferences_endpoint(
    State(state): State<SettingsState>,
    Extension(user_id): Extension<UserID>,
    Form(form): Form<PreferencesForm>,
) -> Response {
    let Some(currency) = Currency::from_code(&form.currency) else {
        return Error::EmptyField("Currency").into_alert_response();
    };

    let connection = match state.db_connection.lock() {
        Ok(connection) => connection,
        Err(error) => {
            tracing::error!("could not acquire database lock: {error}");
            return Error::DatabaseLockError.into_alert_response();
        }
    };

    let was_onboarded = match load_preferences(user_id, &connection) {
        Ok(preferences) => preferences.onboarding_complete,
        Err(error) => return error.into_alert_response(),
    };

    let preferences = Preferences {
        currency,
        business_mode: form.business_mode.is_some(),
        onboarding_complete: true,
    };

    if let Err(error) = save_preferences(user_id, &preferences, &connection) {
        tracing::error!("Could not save preferences for user {user_id}: {error}");
        return error.into_alert_response();
    }

    let redirect = if was_onboarded {
        endpoints::SETTINGS_VIEW
    } else {
        endpoints::DASHBOARD_VIEW
    };

    (HxRedirect(redirect.to_owned()), StatusCode::SEE_OTHER).into_response()
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use axum::{Extension, Form, extract::State, http::StatusCode};
    use rusqlite::Connection;

    use crate::{
        auth::{PasswordHash, UserID, Username, create_user},
        db::initialize,
        endpoints,
        preferences::{Currency, Preferences, get_preferences, save_preferences},
        test_utils::{
            assert_hx_endpoint, assert_hx_redirect, assert_valid_html, must_get_form,
            parse_html_document,
        },
    };

    use super::{PreferencesForm, SettingsState, get_settings_page, update_preferences_endpoint};

    fn get_test_state() -> (SettingsState, UserID) {
        let connection = Connection::open_in_memory().unwrap();
        initialize(&connection).unwrap();
        let user = create_user(
            Username::new_unchecked("alice"),
            PasswordHash::new_unchecked("hash"),
            &connection,
        )
        .unwrap();

        (
            SettingsState {
                db_connection: Arc::new(Mutex::new(connection)),
            },
            user.id,
        )
    }

    #[tokio::test]
    async fn settings_page_renders_form() {
        let (state, user_id) = get_test_state();

        let response = get_settings_page(State(state), Extension(user_id))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let html = parse_html_document(response).await;
        assert_valid_html(&html);
        let form = must_get_form(&html);
        assert_hx_endpoint(&form, endpoints::PUT_PREFERENCES, "hx-put");
    }

    #[tokio::test]
    async fn first_save_completes_onboarding() {
        let (state, user_id) = get_test_state();

        let response = update_preferences_endpoint(
            State(state.clone()),
            Extension(user_id),
            Form(PreferencesForm {
                currency: "EUR".to_owned(),
                business_mode: Some("on".to_owned()),
            }),
        )
        .await;

        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_hx_redirect(&response, endpoints::DASHBOARD_VIEW);
        assert_eq!(
            get_preferences(user_id, &state.db_connection.lock().unwrap()),
            Ok(Preferences {
                currency: Currency::Eur,
                business_mode: true,
                onboarding_complete: true,
            })
        );
    }

    #[tokio::test]
    async fn later_saves_reload_settings() {
        let (state, user_id) = get_test_state();
        save_preferences(
            user_id,
            &Preferences {
                onboarding_complete: true,
                ..Default::default()
            },
            &state.db_connection.lock().unwrap(),
        )
        .unwrap();

        let response = update_preferences_endpoint(
            State(state.clone()),
            Extension(user_id),
            Form(PreferencesForm {
                currency: "GBP".to_owned(),
                business_mode: None,
            }),
        )
        .await;

        assert_hx_redirect(&response, endpoints::SETTINGS_VIEW);
    }

    #[tokio::test]
    async fn unknown_currency_is_rejected() {
        let (state, user_id) = get_test_state();

        let response = update_preferences_endpoint(
            State(state),
            Extension(user_id),
            Form(PreferencesForm {
                currency: "DOGE".to_owned(),
                business_mode: None,
            }),
        )
        .await;

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
