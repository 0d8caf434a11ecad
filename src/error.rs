//! Defines the app level error type and conversions to rendered HTML pages and alerts.
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use time::Date;

use crate::{alert::Alert, internal_server_error::InternalServerError, not_found::NotFoundError};

/// The errors that may occur in the application.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum Error {
    /// The user provided an invalid combination of username and password.
    #[error("invalid username or password")]
    InvalidCredentials,

    /// The auth cookie is missing from the cookie jar in the request.
    #[error("no cookies in the cookie jar :(")]
    CookieMissing,

    /// The auth token could not be encoded or decoded.
    #[error("invalid auth token: {0}")]
    InvalidToken(String),

    /// The user provided a password that is too easy to guess.
    #[error("password is too weak: {0}")]
    TooWeak(String),

    /// An unexpected error occurred with the underlying hashing library.
    ///
    /// The error string should only be logged for debugging on the server.
    /// When communicating with the application client this error should be
    /// replaced with a general error type indicating an internal server error.
    #[error("hashing failed: {0}")]
    HashingError(String),

    /// An empty string was used for a username.
    #[error("Username cannot be empty")]
    EmptyUsername,

    /// The username is already taken by another user.
    #[error("the username \"{0}\" is already taken")]
    DuplicateUsername(String),

    /// No user has the given username.
    #[error("there is no user with the username \"{0}\"")]
    UnknownUsername(String),

    /// A required text field was empty.
    #[error("{0} cannot be empty")]
    EmptyField(&'static str),

    /// A monetary amount that must be positive was zero or negative.
    #[error("{0} is not a valid amount, amounts must be greater than zero")]
    NonPositiveAmount(f64),

    /// A budget amount was negative.
    #[error("{0} is not a valid budget, budgets cannot be negative")]
    NegativeBudget(f64),

    /// A date in the future was used to create an expense.
    ///
    /// Expenses record events that have already happened, therefore future
    /// dates are not allowed.
    #[error("{0} is a date in the future, which is not allowed")]
    FutureDate(Date),

    /// A percentage outside the range 0 to 100 was given.
    #[error("{0} is not a valid percentage, it must be between 0 and 100")]
    InvalidPercentage(f64),

    /// An invoice line item had a quantity of zero or less.
    #[error("{0} is not a valid quantity, quantities must be greater than zero")]
    NonPositiveQuantity(f64),

    /// An invoice was submitted without any line items.
    #[error("an invoice needs at least one line item")]
    EmptyInvoice,

    /// The category ID used to create an expense did not match one of the user's categories.
    #[error("the category ID does not refer to a valid category")]
    InvalidCategory(Option<i64>),

    /// A split bill was submitted without participants.
    #[error("a split bill needs at least one participant")]
    NoParticipants,

    /// The custom shares of a split bill do not add up to its total.
    #[error("the shares add up to {shares:.2} but the bill total is {total:.2}")]
    ShareMismatch {
        /// The bill total.
        total: f64,
        /// The sum of the participant shares.
        shares: f64,
    },

    /// The user tried to access a group they are not a member of, or
    /// referenced a payer/participant that is not in the group.
    #[error("the user is not a member of the group")]
    NotGroupMember,

    /// The user is already a member of the group.
    #[error("{0} is already a member of this group")]
    DuplicateGroupMember(String),

    /// The member has paid for or shares expenses in the group and cannot be removed.
    #[error("{0} has expenses in this group and cannot be removed")]
    MemberHasExpenses(String),

    /// The group owner cannot be removed from their own group.
    #[error("the owner cannot be removed from the group")]
    RemoveGroupOwner,

    /// The requested resource was not found.
    ///
    /// For HTTP request handlers, the client should check that the parameters
    /// (e.g., ID) are correct and that the resource has been created.
    ///
    /// Internally, this error may occur when a query returns no rows.
    #[error("the requested resource could not be found")]
    NotFound,

    /// An unhandled/unexpected SQL error.
    #[error("an unexpected SQL error occurred: {0}")]
    SqlError(rusqlite::Error),

    /// An error occurred while getting the local timezone from a canonical timezone string.
    #[error("invalid timezone {0}")]
    InvalidTimezoneError(String),

    /// An error occurred while serializing or deserializing JSON.
    #[error("could not (de)serialize JSON: {0}")]
    JSONSerializationError(String),

    /// An error occurred while writing CSV.
    #[error("could not write CSV: {0}")]
    CsvError(String),

    /// Could not acquire the database lock
    #[error("could not acquire the database lock")]
    DatabaseLockError,

    /// Tried to update an expense that does not exist
    #[error("tried to update an expense that is not in the database")]
    UpdateMissingExpense,

    /// Tried to delete an expense that does not exist
    #[error("tried to delete an expense that is not in the database")]
    DeleteMissingExpense,

    /// Tried to delete a category that does not exist
    #[error("tried to delete a category that is not in the database")]
    DeleteMissingCategory,

    /// Tried to update or delete a lent/borrowed record that does not exist
    #[error("tried to change a lent/borrowed record that is not in the database")]
    MissingDebt,

    /// Tried to delete a group that does not exist
    #[error("tried to delete a group that is not in the database")]
    DeleteMissingGroup,

    /// Tried to delete a group expense that does not exist
    #[error("tried to delete a group expense that is not in the database")]
    DeleteMissingGroupExpense,

    /// Tried to remove a group member that does not exist
    #[error("tried to remove a group member that is not in the database")]
    DeleteMissingGroupMember,

    /// Tried to change a split bill that does not exist
    #[error("tried to change a split bill that is not in the database")]
    MissingSplitBill,

    /// Tried to delete an invoice that does not exist
    #[error("tried to delete an invoice that is not in the database")]
    DeleteMissingInvoice,

    /// Tried to delete a party that does not exist
    #[error("tried to delete a party that is not in the database")]
    DeleteMissingParty,

    /// Tried to delete a product that does not exist
    #[error("tried to delete a product that is not in the database")]
    DeleteMissingProduct,

    /// Tried to restore or purge an item that is not in the trash.
    #[error("tried to restore or purge an item that is not in the trash")]
    MissingDeletedItem,

    /// A deleted item could not be restored because a record it refers to no longer exists.
    #[error("could not restore {item} because its {parent} no longer exists")]
    RestoreMissingParent {
        /// A description of the item being restored, e.g. "group expense 'Dinner'".
        item: String,
        /// The kind of record that is missing, e.g. "group".
        parent: &'static str,
    },

    /// A group expense could not be restored because its payer has left the group.
    #[error("could not restore {0} because its payer is no longer in the group")]
    RestorePayerNotMember(String),

    /// The multipart form could not be parsed.
    #[error("Could not parse multipart form: {0}")]
    MultipartError(String),

    /// The uploaded file is not an accepted receipt type.
    #[error("unsupported file type \"{0}\", upload a JPEG, PNG, WebP or PDF")]
    UnsupportedFileType(String),

    /// The multipart form did not contain a file.
    #[error("no file was uploaded")]
    MissingFile,

    /// A receipt file could not be read or written.
    #[error("could not access the receipt file: {0}")]
    FileStorageError(String),

    /// No API key was configured for the bill scanner.
    #[error("bill scanning is not configured on this server")]
    ScannerNotConfigured,

    /// The request to the AI gateway failed.
    #[error("the bill scanner request failed: {0}")]
    ScannerRequestFailed(String),

    /// The AI gateway replied with something that is not a bill.
    #[error("the bill scanner returned an invalid response: {0}")]
    ScannerResponseInvalid(String),
}

impl From<rusqlite::Error> for Error {
    fn from(value: rusqlite::Error) -> Self {
        match value {
            rusqlite::Error::QueryReturnedNoRows => Error::NotFound,
            error => {
                tracing::error!("an unhandled SQL error occurred: {}", error);
                Error::SqlError(error)
            }
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(value: serde_json::Error) -> Self {
        Error::JSONSerializationError(value.to_string())
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        match self {
            Error::NotFound | Error::NotGroupMember => NotFoundError.into_response(),
            Error::InvalidTimezoneError(timezone) => InternalServerError {
                description: "Invalid Timezone Settings",
                fix: &format!(
                    "Could not get local timezone \"{timezone}\". Check your server settings and \
                    ensure the timezone has been set to valid, canonical timezone string"
                ),
            }
            .into_response(),
            Error::DatabaseLockError => InternalServerError::default().into_response(),
            // Any errors that are not handled above are not intended to be shown to the client.
            error => {
                tracing::error!("An unexpected error occurred: {}", error);
                InternalServerError::default().into_response()
            }
        }
    }
}

impl Error {
    /// Render the error as an alert fragment for htmx requests.
    pub fn into_alert_response(self) -> Response {
        let (status, message, details) = match self {
            error @ (Error::EmptyUsername
            | Error::EmptyField(_)
            | Error::NonPositiveAmount(_)
            | Error::NegativeBudget(_)
            | Error::FutureDate(_)
            | Error::InvalidPercentage(_)
            | Error::NonPositiveQuantity(_)
            | Error::EmptyInvoice
            | Error::NoParticipants
            | Error::ShareMismatch { .. }
            | Error::UnsupportedFileType(_)
            | Error::MissingFile
            | Error::MultipartError(_)) => (
                StatusCode::BAD_REQUEST,
                "Invalid input".to_owned(),
                capitalise_first_char(&error.to_string()),
            ),
            Error::InvalidCategory(category_id) => (
                StatusCode::BAD_REQUEST,
                "Invalid category".to_owned(),
                format!("Could not find a category with the ID {category_id:?}"),
            ),
            Error::UnknownUsername(username) => (
                StatusCode::BAD_REQUEST,
                "Unknown user".to_owned(),
                format!("There is no user with the username \"{username}\"."),
            ),
            Error::DuplicateGroupMember(username) => (
                StatusCode::BAD_REQUEST,
                "Already a member".to_owned(),
                format!("{username} is already a member of this group."),
            ),
            Error::MemberHasExpenses(username) => (
                StatusCode::BAD_REQUEST,
                "Could not remove member".to_owned(),
                format!(
                    "{username} has paid for or shares expenses in this group. \
                    Delete those expenses first."
                ),
            ),
            Error::RemoveGroupOwner => (
                StatusCode::BAD_REQUEST,
                "Could not remove member".to_owned(),
                "The owner cannot be removed from the group. Delete the group instead.".to_owned(),
            ),
            Error::NotGroupMember => (
                StatusCode::NOT_FOUND,
                "Group not found".to_owned(),
                "The group could not be found, or you are not one of its members.".to_owned(),
            ),
            Error::RestoreMissingParent { item, parent } => (
                StatusCode::CONFLICT,
                "Could not restore item".to_owned(),
                format!(
                    "The {parent} for {item} no longer exists. \
                    Restore the {parent} first, then try again. The item has been kept in the trash."
                ),
            ),
            Error::RestorePayerNotMember(item) => (
                StatusCode::CONFLICT,
                "Could not restore item".to_owned(),
                format!(
                    "The person who paid for {item} is no longer in the group. \
                    Add them back to the group, then try again. The item has been kept in the trash."
                ),
            ),
            Error::UpdateMissingExpense => (
                StatusCode::NOT_FOUND,
                "Could not update expense".to_owned(),
                "The expense could not be found.".to_owned(),
            ),
            Error::DeleteMissingExpense => missing("expense"),
            Error::DeleteMissingCategory => missing("category"),
            Error::MissingDebt => missing("record"),
            Error::DeleteMissingGroup => missing("group"),
            Error::DeleteMissingGroupExpense => missing("group expense"),
            Error::DeleteMissingGroupMember => missing("group member"),
            Error::MissingSplitBill => missing("split bill"),
            Error::DeleteMissingInvoice => missing("invoice"),
            Error::DeleteMissingParty => missing("party"),
            Error::DeleteMissingProduct => missing("product"),
            Error::MissingDeletedItem => (
                StatusCode::NOT_FOUND,
                "Item not in trash".to_owned(),
                "The item could not be found in the trash. \
                Try refreshing the page to see if it has already been restored or purged."
                    .to_owned(),
            ),
            Error::ScannerNotConfigured => (
                StatusCode::SERVICE_UNAVAILABLE,
                "Bill scanning unavailable".to_owned(),
                "Bill scanning has not been configured on this server. \
                Your receipt was not scanned."
                    .to_owned(),
            ),
            Error::ScannerRequestFailed(reason) | Error::ScannerResponseInvalid(reason) => (
                StatusCode::BAD_GATEWAY,
                "Could not scan bill".to_owned(),
                reason,
            ),
            Error::InvalidTimezoneError(timezone) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Invalid Timezone Settings".to_owned(),
                format!(
                    "Could not get local timezone \"{timezone}\". Check your server settings and \
                    ensure the timezone has been set to valid, canonical timezone string"
                ),
            ),
            _ => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Something went wrong".to_owned(),
                "An unexpected error occurred, check the server logs for more details.".to_owned(),
            ),
        };

        (status, Alert::Error { message, details }.into_html()).into_response()
    }
}

fn missing(kind: &str) -> (StatusCode, String, String) {
    (
        StatusCode::NOT_FOUND,
        format!("Could not delete {kind}"),
        format!(
            "The {kind} could not be found. \
            Try refreshing the page to see if the {kind} has already been deleted."
        ),
    )
}

fn capitalise_first_char(string: &str) -> String {
    let mut chars = string.chars();
    let Some(first) = chars.next() else {
        return String::new();
    };
    first.to_uppercase().chain(chars).collect()
}
