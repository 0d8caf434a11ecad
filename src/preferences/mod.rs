//! Per-user settings: display currency, business mode and onboarding.

mod db;
mod settings;

pub use db::{
    Currency, Preferences, create_preferences_table, get_preferences, load_preferences,
    save_preferences,
};
pub use settings::{get_settings_page, update_preferences_endpoint};
