//! Preference types and their storage.

use std::fmt::Display;

use rusqlite::{
    Connection, ToSql,
    types::{FromSql, FromSqlError, FromSqlResult, ToSqlOutput, ValueRef},
};
use serde::{Deserialize, Serialize};

use crate::{Error, auth::UserID};

/// The currency amounts are displayed in.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Currency {
    #[default]
    Usd,
    Eur,
    Gbp,
    Inr,
    Jpy,
    Aud,
    Nzd,
}

impl Currency {
    pub const ALL: [Currency; 7] = [
        Currency::Usd,
        Currency::Eur,
        Currency::Gbp,
        Currency::Inr,
        Currency::Jpy,
        Currency::Aud,
        Currency::Nzd,
    ];

    /// The ISO 4217 code, e.g. "USD".
    pub fn code(self) -> &'static str {
        match self {
            Currency::Usd => "USD",
            Currency::Eur => "EUR",
            Currency::Gbp => "GBP",
            Currency::Inr => "INR",
            Currency::Jpy => "JPY",
            Currency::Aud => "AUD",
            Currency::Nzd => "NZD",
        }
    }

    /// The symbol placed before formatted amounts.
    pub fn symbol(self) -> &'static str {
        match self {
            Currency::Usd => "$",
            Currency::Eur => "€",
            Currency::Gbp => "£",
            Currency::Inr => "₹",
            Currency::Jpy => "¥",
            Currency::Aud => "A$",
            Currency::Nzd => "NZ$",
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|currency| currency.code().eq_ignore_ascii_case(code.trim()))
    }
}

impl Display for Currency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.code(), self.symbol())
    }
}

impl ToSql for Currency {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.code()))
    }
}

impl FromSql for Currency {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        let code = value.as_str()?;
        Currency::from_code(code)
            .ok_or_else(|| FromSqlError::Other(format!("unknown currency {code}").into()))
    }
}

/// Settings that change how the app looks and behaves for one user.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Preferences {
    pub currency: Currency,
    /// Shows invoicing, parties and products.
    pub business_mode: bool,
    /// Set once the user has saved their settings for the first time.
    pub onboarding_complete: bool,
}

pub fn create_preferences_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS preferences (
            user_id INTEGER PRIMARY KEY,
            currency TEXT NOT NULL DEFAULT 'USD',
            business_mode INTEGER NOT NULL DEFAULT 0,
            onboarding_complete INTEGER NOT NULL DEFAULT 0,
            FOREIGN KEY(user_id) REFERENCES user(id) ON DELETE CASCADE
        )",
        (),
    )?;

    Ok(())
}

/// Get the stored preferences for `user_id`.
///
/// # Errors
///
/// Returns [Error::NotFound] if the user has never saved preferences.
pub fn get_preferences(user_id: UserID, connection: &Connection) -> Result<Preferences, Error> {
    connection
        .prepare(
            "SELECT currency, business_mode, onboarding_complete FROM preferences
            WHERE user_id = :user_id",
        )?
        .query_row(&[(":user_id", &user_id.as_i64())], |row| {
            Ok(Preferences {
                currency: row.get(0)?,
                business_mode: row.get(1)?,
                onboarding_complete: row.get(2)?,
            })
        })
        .map_err(|error| error.into())
}

/// Get the preferences for `user_id`, falling back to the defaults if none are stored.
pub fn load_preferences(user_id: UserID, connection: &Connection) -> Result<Preferences, Error> {
    match get_preferences(user_id, connection) {
        Ok(preferences) => Ok(preferences),
        Err(Error::NotFound) => Ok(Preferences::default()),
        Err(error) => Err(error),
    }
}

/// Insert or replace the preferences for `user_id`.
pub fn save_preferences(
    user_id: UserID,
    preferences: &Preferences,
    connection: &Connection,
) -> Result<(), Error> {
    connection.execute(
        "INSERT INTO preferences (user_id, currency, business_mode, onboarding_complete)
        VALUES (?1, ?2, ?3, ?4)
        ON CONFLICT(user_id) DO UPDATE SET
            currency = excluded.currency,
            business_mode = excluded.business_mode,
            onboarding_complete = excluded.onboarding_complete",
        (
            user_id.as_i64(),
            preferences.currency,
            preferences.business_mode,
            preferences.onboarding_complete,
        ),
    )?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use rusqlite::Connection;

    use crate::{
        Error,
        auth::{PasswordHash, UserID, Username, create_user},
        db::initialize,
        preferences::{Currency, Preferences, get_preferences, load_preferences, save_preferences},
    };

    fn get_test_connection() -> (Connection, UserID) {
        let connection = Connection::open_in_memory().unwrap();
        initialize(&connection).unwrap();
        let user = create_user(
            Username::new_unchecked("alice"),
            PasswordHash::new_unchecked("hash"),
            &connection,
        )
        .unwrap();

        (connection, user.id)
    }

    #[test]
    fn missing_preferences_fall_back_to_default() {
        let (connection, user_id) = get_test_connection();

        assert_eq!(get_preferences(user_id, &connection), Err(Error::NotFound));
        assert_eq!(
            load_preferences(user_id, &connection),
            Ok(Preferences::default())
        );
    }

    #[test]
    fn save_replaces_existing_preferences() {
        let (connection, user_id) = get_test_connection();
        save_preferences(user_id, &Preferences::default(), &connection).unwrap();
        let want = Preferences {
            currency: Currency::Inr,
            business_mode: true,
            onboarding_complete: true,
        };

        save_preferences(user_id, &want, &connection).unwrap();

        assert_eq!(get_preferences(user_id, &connection), Ok(want));
    }

    #[test]
    fn currency_codes_round_trip() {
        for currency in Currency::ALL {
            assert_eq!(Currency::from_code(currency.code()), Some(currency));
        }
        assert_eq!(Currency::from_code("eur"), Some(Currency::Eur));
        assert_eq!(Currency::from_code("XYZ"), None);
    }
}
