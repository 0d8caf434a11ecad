//! Core category domain types.

use std::fmt::Display;

use rusqlite::{
    ToSql,
    types::{FromSql, FromSqlError, FromSqlResult, ToSqlOutput, ValueRef},
};
use serde::{Deserialize, Serialize};

use crate::{Error, auth::UserID, database_id::DatabaseId};

/// Database identifier for a category.
pub type CategoryId = DatabaseId;

/// A validated, non-empty category name.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, Hash)]
pub struct CategoryName(String);

impl CategoryName {
    /// Create a category name.
    ///
    /// # Errors
    ///
    /// Returns [Error::EmptyField] if `name` is empty or only whitespace.
    pub fn new(name: &str) -> Result<Self, Error> {
        let name = name.trim();

        if name.is_empty() {
            Err(Error::EmptyField("Category name"))
        } else {
            Ok(Self(name.to_owned()))
        }
    }

    /// Create a category name without validation.
    ///
    /// The caller should ensure that the string is not empty.
    pub fn new_unchecked(name: &str) -> Self {
        Self(name.to_owned())
    }
}

impl AsRef<str> for CategoryName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Display for CategoryName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The icon shown next to a category.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CategoryIcon {
    Food,
    Transport,
    Shopping,
    Housing,
    Utilities,
    Health,
    Entertainment,
    Travel,
    Education,
    #[default]
    Other,
}

impl CategoryIcon {
    pub const ALL: [CategoryIcon; 10] = [
        CategoryIcon::Food,
        CategoryIcon::Transport,
        CategoryIcon::Shopping,
        CategoryIcon::Housing,
        CategoryIcon::Utilities,
        CategoryIcon::Health,
        CategoryIcon::Entertainment,
        CategoryIcon::Travel,
        CategoryIcon::Education,
        CategoryIcon::Other,
    ];

    /// The key stored in the database and sent by forms.
    pub fn key(self) -> &'static str {
        match self {
            CategoryIcon::Food => "food",
            CategoryIcon::Transport => "transport",
            CategoryIcon::Shopping => "shopping",
            CategoryIcon::Housing => "housing",
            CategoryIcon::Utilities => "utilities",
            CategoryIcon::Health => "health",
            CategoryIcon::Entertainment => "entertainment",
            CategoryIcon::Travel => "travel",
            CategoryIcon::Education => "education",
            CategoryIcon::Other => "other",
        }
    }

    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|icon| icon.key() == key.trim())
    }

    pub fn label(self) -> &'static str {
        match self {
            CategoryIcon::Food => "Food & Drink",
            CategoryIcon::Transport => "Transport",
            CategoryIcon::Shopping => "Shopping",
            CategoryIcon::Housing => "Housing",
            CategoryIcon::Utilities => "Utilities",
            CategoryIcon::Health => "Health",
            CategoryIcon::Entertainment => "Entertainment",
            CategoryIcon::Travel => "Travel",
            CategoryIcon::Education => "Education",
            CategoryIcon::Other => "Other",
        }
    }

    /// The glyph rendered for the icon.
    pub fn glyph(self) -> &'static str {
        match self {
            CategoryIcon::Food => "🍔",
            CategoryIcon::Transport => "🚌",
            CategoryIcon::Shopping => "🛍️",
            CategoryIcon::Housing => "🏠",
            CategoryIcon::Utilities => "💡",
            CategoryIcon::Health => "💊",
            CategoryIcon::Entertainment => "🎬",
            CategoryIcon::Travel => "✈️",
            CategoryIcon::Education => "📚",
            CategoryIcon::Other => "📦",
        }
    }
}

impl ToSql for CategoryIcon {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.key()))
    }
}

impl FromSql for CategoryIcon {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        let key = value.as_str()?;
        CategoryIcon::from_key(key)
            .ok_or_else(|| FromSqlError::Other(format!("unknown category icon {key}").into()))
    }
}

/// A user defined grouping for expenses (e.g., 'Groceries', 'Rent').
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub id: CategoryId,
    pub user_id: UserID,
    pub name: CategoryName,
    pub icon: CategoryIcon,
}

/// Form data for category creation.
#[derive(Debug, Serialize, Deserialize)]
pub struct CategoryFormData {
    pub name: String,
    pub icon: String,
}

#[cfg(test)]
mod tests {
    use crate::{
        Error,
        category::{CategoryIcon, CategoryName},
    };

    #[test]
    fn new_fails_on_blank_name() {
        assert_eq!(
            CategoryName::new(" \t"),
            Err(Error::EmptyField("Category name"))
        );
    }

    #[test]
    fn new_trims_name() {
        assert_eq!(CategoryName::new(" Rent ").unwrap().as_ref(), "Rent");
    }

    #[test]
    fn every_icon_has_a_unique_key() {
        for icon in CategoryIcon::ALL {
            assert_eq!(CategoryIcon::from_key(icon.key()), Some(icon));
        }
        assert_eq!(CategoryIcon::from_key("unicorn"), None);
    }
}
