//! Customers and suppliers that invoices are made out to, with their page and endpoints.

use std::fmt::Display;

use axum::{
    Extension, Form,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use axum_htmx::HxRedirect;
use maud::{Markup, html};
use rusqlite::{
    Connection, Row, ToSql,
    types::{FromSql, FromSqlError, FromSqlResult, ToSqlOutput, ValueRef},
};
use serde::{Deserialize, Serialize};

use crate::{
    Error,
    alert::Alert,
    auth::UserID,
    database_id::DatabaseId,
    endpoints::{self, format_endpoint},
    html::{
        BUTTON_PRIMARY_STYLE, CARD_STYLE, FORM_LABEL_STYLE, FORM_TEXT_INPUT_STYLE,
        PAGE_CONTAINER_STYLE, TABLE_CELL_STYLE, TABLE_HEADER_STYLE, TABLE_ROW_STYLE, base,
        delete_action_button,
    },
    invoice::InvoicingState,
    navigation::NavBar,
    preferences::load_preferences,
};

pub type PartyId = DatabaseId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PartyKind {
    Customer,
    Supplier,
}

impl PartyKind {
    pub fn key(self) -> &'static str {
        match self {
            PartyKind::Customer => "customer",
            PartyKind::Supplier => "supplier",
        }
    }

    pub fn from_key(key: &str) -> Option<Self> {
        match key {
            "customer" => Some(PartyKind::Customer),
            "supplier" => Some(PartyKind::Supplier),
            _ => None,
        }
    }
}

impl Display for PartyKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PartyKind::Customer => write!(f, "Customer"),
            PartyKind::Supplier => write!(f, "Supplier"),
        }
    }
}

impl ToSql for PartyKind {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.key()))
    }
}

impl FromSql for PartyKind {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        let key = value.as_str()?;
        PartyKind::from_key(key)
            .ok_or_else(|| FromSqlError::Other(format!("unknown party kind {key}").into()))
    }
}

/// A customer or supplier.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Party {
    pub id: PartyId,
    pub user_id: UserID,
    pub name: String,
    pub kind: PartyKind,
    pub phone: String,
    pub email: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewParty {
    pub name: String,
    pub kind: PartyKind,
    pub phone: String,
    pub email: String,
}

impl NewParty {
    /// # Errors
    ///
    /// Returns [Error::EmptyField] if `name` is blank.
    pub fn new(name: &str, kind: PartyKind, phone: &str, email: &str) -> Result<Self, Error> {
        let name = name.trim();
        if name.is_empty() {
            return Err(Error::EmptyField("Party name"));
        }

        Ok(Self {
            name: name.to_owned(),
            kind,
            phone: phone.trim().to_owned(),
            email: email.trim().to_owned(),
        })
    }
}

pub fn create_party_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS party (
            id INTEGER PRIMARY KEY,
            user_id INTEGER NOT NULL,
            name TEXT NOT NULL,
            kind TEXT NOT NULL,
            phone TEXT NOT NULL DEFAULT '',
            email TEXT NOT NULL DEFAULT '',
            FOREIGN KEY(user_id) REFERENCES user(id) ON UPDATE CASCADE ON DELETE CASCADE
        )",
        (),
    )?;

    Ok(())
}

pub fn create_party(
    new_party: NewParty,
    user_id: UserID,
    connection: &Connection,
) -> Result<Party, Error> {
    connection
        .prepare(
            "INSERT INTO party (user_id, name, kind, phone, email) VALUES (?1, ?2, ?3, ?4, ?5)
            RETURNING id, user_id, name, kind, phone, email",
        )?
        .query_row(
            (
                user_id.as_i64(),
                &new_party.name,
                new_party.kind,
                &new_party.phone,
                &new_party.email,
            ),
            map_row,
        )
        .map_err(|error| error.into())
}

/// Get the user's parties sorted by name.
pub fn get_parties(user_id: UserID, connection: &Connection) -> Result<Vec<Party>, Error> {
    connection
        .prepare(
            "SELECT id, user_id, name, kind, phone, email FROM party
            WHERE user_id = ?1 ORDER BY name COLLATE NOCASE ASC, id ASC",
        )?
        .query_map([user_id.as_i64()], map_row)?
        .map(|maybe_party| maybe_party.map_err(|error| error.into()))
        .collect()
}

/// # Errors
///
/// Returns [Error::DeleteMissingParty] if the party does not exist or belongs to another user.
pub fn delete_party(id: PartyId, user_id: UserID, connection: &Connection) -> Result<(), Error> {
    let rows_affected = connection.execute(
        "DELETE FROM party WHERE id = ?1 AND user_id = ?2",
        (id, user_id.as_i64()),
    )?;

    if rows_affected == 0 {
        return Err(Error::DeleteMissingParty);
    }

    Ok(())
}

fn map_row(row: &Row) -> Result<Party, rusqlite::Error> {
    Ok(Party {
        id: row.get(0)?,
        user_id: UserID::new(row.get(1)?),
        name: row.get(2)?,
        kind: row.get(3)?,
        phone: row.get(4)?,
        email: row.get(5)?,
    })
}

/// Render the list of parties with a form for adding one.
pub async fn get_parties_page(
    State(state): State<InvoicingState>,
    Extension(user_id): Extension<UserID>,
) -> Result<Response, Error> {
    let connection = state
        .db_connection
        .lock()
        .inspect_err(|error| tracing::error!("could not acquire database lock: {error}"))
        .map_err(|_| Error::DatabaseLockError)?;

    let preferences = load_preferences(user_id, &connection)?;
    let parties = get_parties(user_id, &connection)?;
    let nav_bar = NavBar::new(endpoints::PARTIES_VIEW, preferences.business_mode).into_html();

    let content = html! {
        (nav_bar)

        main class=(PAGE_CONTAINER_STYLE)
        {
            section class="space-y-6"
            {
                h1 class="text-xl font-bold" { "Customers & Suppliers" }

                div class=(CARD_STYLE) { (party_form()) }

                div class="overflow-x-auto"
                {
                    table id="parties-table" class="w-full text-sm text-left text-gray-500 dark:text-gray-400"
                    {
                        thead class=(TABLE_HEADER_STYLE)
                        {
                            tr
                            {
                                th scope="col" class=(TABLE_CELL_STYLE) { "Name" }
                                th scope="col" class=(TABLE_CELL_STYLE) { "Type" }
                                th scope="col" class=(TABLE_CELL_STYLE) { "Phone" }
                                th scope="col" class=(TABLE_CELL_STYLE) { "Email" }
                                th scope="col" class=(TABLE_CELL_STYLE) { "Actions" }
                            }
                        }

                        tbody
                        {
                            @for party in &parties {
                                tr class=(TABLE_ROW_STYLE) data-party-id=(party.id)
                                {
                                    td class=(TABLE_CELL_STYLE) { (party.name) }
                                    td class=(TABLE_CELL_STYLE) { (party.kind) }
                                    td class=(TABLE_CELL_STYLE) { (party.phone) }
                                    td class=(TABLE_CELL_STYLE) { (party.email) }
                                    td class=(TABLE_CELL_STYLE)
                                    {
                                        (delete_action_button(
                                            &format_endpoint(endpoints::DELETE_PARTY, party.id),
                                            &format!("Delete {}? Existing invoices keep the name.", party.name),
                                            "closest tr",
                                            "delete"
                                        ))
                                    }
                                }
                            }

                            @if parties.is_empty() {
                                tr
                                {
                                    td colspan="5" class="px-6 py-4 text-center" { "No parties yet." }
                                }
                            }
                        }
                    }
                }
            }
        }
    };

    Ok(base("Parties", &[], &content).into_response())
}

fn party_form() -> Markup {
    html! {
        form
            hx-post=(endpoints::POST_PARTY)
            hx-target-error="#alert-container"
            class="grid gap-4 md:grid-cols-5 items-end"
        {
            div
            {
                label for="name" class=(FORM_LABEL_STYLE) { "Name" }
                input id="name" type="text" name="name" required class=(FORM_TEXT_INPUT_STYLE);
            }

            div
            {
                label for="kind" class=(FORM_LABEL_STYLE) { "Type" }

                select id="kind" name="kind" required class=(FORM_TEXT_INPUT_STYLE)
                {
                    option value=(PartyKind::Customer.key()) selected { (PartyKind::Customer) }
                    option value=(PartyKind::Supplier.key()) { (PartyKind::Supplier) }
                }
            }

            div
            {
                label for="phone" class=(FORM_LABEL_STYLE) { "Phone" }
                input id="phone" type="tel" name="phone" class=(FORM_TEXT_INPUT_STYLE);
            }

            div
            {
                label for="email" class=(FORM_LABEL_STYLE) { "Email" }
                input id="email" type="email" name="email" class=(FORM_TEXT_INPUT_STYLE);
            }

            button type="submit" class=(BUTTON_PRIMARY_STYLE) { "Add" }
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PartyForm {
    pub name: String,
    pub kind: PartyKind,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub email: String,
}

pub async fn create_party_endpoint(
    State(state): State<InvoicingState>,
    Extension(user_id): Extension<UserID>,
    Form(form): Form<PartyForm>,
) -> Response {
    let new_party = match NewParty::new(&form.name, form.kind, &form.phone, &form.email) {
        Ok(new_party) => new_party,
        Err(error) => return error.into_alert_response(),
    };

    let connection = match state.db_connection.lock() {
        Ok(connection) => connection,
        Err(error) => {
            tracing::error!("could not acquire database lock: {error}");
            return Error::DatabaseLockError.into_alert_response();
        }
    };

    match create_party(new_party, user_id, &connection) {
        Ok(_) => (
            HxRedirect(endpoints::PARTIES_VIEW.to_owned()),
            StatusCode::SEE_OTHER,
        )
            .into_response(),
        Err(error) => {
            tracing::error!("An unexpected error occurred while creating a party: {error}");
            error.into_alert_response()
        }
    }
}

pub async fn delete_party_endpoint(
    Path(party_id): Path<PartyId>,
    State(state): State<InvoicingState>,
    Extension(user_id): Extension<UserID>,
) -> Response {
    let connection = match state.db_connection.lock() {
        Ok(connection) => connection,
        Err(error) => {
            tracing::error!("could not acquire database lock: {error}");
            return Error::DatabaseLockError.into_alert_response();
        }
    };

    match delete_party(party_id, user_id, &connection) {
        Ok(()) => Alert::SuccessSimple {
            message: "Party deleted".to_owned(),
        }
        .into_response(),
        Err(Error::DeleteMissingParty) => Error::DeleteMissingParty.into_alert_response(),
        Err(error) => {
            tracing::error!("could not delete party {party_id}: {error}");
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
    use scraper::Selector;

    use crate::{
        Error,
        auth::UserID,
        endpoints,
        invoice::InvoicingState,
        test_utils::{
            assert_form_input, assert_form_select, assert_hx_endpoint, assert_hx_redirect,
            assert_valid_html, create_test_user, get_test_connection, must_get_form,
            parse_html_document,
        },
    };

    use super::{
        NewParty, PartyForm, PartyKind, create_party, create_party_endpoint,
        delete_party, delete_party_endpoint, get_parties, get_parties_page,
    };

    fn get_test_state() -> (InvoicingState, UserID) {
        let connection = get_test_connection();
        let user_id = create_test_user("alice", &connection);

        (
            InvoicingState {
                db_connection: Arc::new(Mutex::new(connection)),
                local_timezone: "Etc/UTC".to_owned(),
            },
            user_id,
        )
    }

    #[test]
    fn parties_are_sorted_by_name() {
        let connection = get_test_connection();
        let user_id = create_test_user("alice", &connection);
        let other_user = create_test_user("bob", &connection);
        for name in ["zeta", "Acme"] {
            create_party(
                NewParty::new(name, PartyKind::Customer, "", "").unwrap(),
                user_id,
                &connection,
            )
            .unwrap();
        }
        create_party(
            NewParty::new("Hidden", PartyKind::Supplier, "", "").unwrap(),
            other_user,
            &connection,
        )
        .unwrap();

        let names: Vec<String> = get_parties(user_id, &connection)
            .unwrap()
            .into_iter()
            .map(|party| party.name)
            .collect();

        assert_eq!(names, ["Acme", "zeta"]);
    }

    #[test]
    fn blank_name_is_rejected() {
        assert_eq!(
            NewParty::new("  ", PartyKind::Customer, "", ""),
            Err(Error::EmptyField("Party name"))
        );
    }

    #[test]
    fn delete_is_scoped_to_user() {
        let connection = get_test_connection();
        let user_id = create_test_user("alice", &connection);
        let other_user = create_test_user("bob", &connection);
        let party = create_party(
            NewParty::new("Acme", PartyKind::Supplier, "555", "a@acme.test").unwrap(),
            user_id,
            &connection,
        )
        .unwrap();

        assert_eq!(
            delete_party(party.id, other_user, &connection),
            Err(Error::DeleteMissingParty)
        );
        assert_eq!(delete_party(party.id, user_id, &connection), Ok(()));
        assert!(get_parties(user_id, &connection).unwrap().is_empty());
    }

    #[tokio::test]
    async fn page_lists_parties_and_form() {
        let (state, user_id) = get_test_state();
        create_party(
            NewParty::new("Acme", PartyKind::Customer, "", "").unwrap(),
            user_id,
            &state.db_connection.lock().unwrap(),
        )
        .unwrap();

        let response = get_parties_page(State(state), Extension(user_id))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let html = parse_html_document(response).await;
        assert_valid_html(&html);
        let form = must_get_form(&html);
        assert_hx_endpoint(&form, endpoints::POST_PARTY, "hx-post");
        assert_form_input(&form, "name", "text");
        assert_form_select(&form, "kind", &["customer", "supplier"]);
        let rows = Selector::parse("#parties-table tbody tr[data-party-id]").unwrap();
        assert_eq!(html.select(&rows).count(), 1);
    }

    #[tokio::test]
    async fn create_endpoint_redirects() {
        let (state, user_id) = get_test_state();

        let response = create_party_endpoint(
            State(state.clone()),
            Extension(user_id),
            Form(PartyForm {
                name: "Acme".to_owned(),
                kind: PartyKind::Supplier,
                phone: String::new(),
                email: String::new(),
            }),
        )
        .await;

        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_hx_redirect(&response, endpoints::PARTIES_VIEW);
        let parties = get_parties(user_id, &state.db_connection.lock().unwrap()).unwrap();
        assert_eq!(parties[0].kind, PartyKind::Supplier);
    }

    #[tokio::test]
    async fn delete_missing_party_is_not_found() {
        let (state, user_id) = get_test_state();

        let response = delete_party_endpoint(Path(42), State(state), Extension(user_id)).await;

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
