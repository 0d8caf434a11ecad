//! The page for a single group: members, expenses, balances and suggested settlements.

use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};

use axum::{
    Extension,
    extract::{FromRef, Path, State},
    response::{IntoResponse, Response},
};
use maud::{Markup, html};
use rusqlite::Connection;
use time::Date;

use crate::{
    AppState, Error,
    auth::UserID,
    endpoints::{self, format_endpoint},
    group::{
        Group, GroupExpense, GroupId, GroupMember, MemberBalance, Settlement, compute_balances,
        get_group, get_group_expenses, get_members, settle,
    },
    html::{
        BUTTON_PRIMARY_STYLE, CARD_STYLE, FORM_CHECKBOX_STYLE, FORM_LABEL_STYLE,
        FORM_TEXT_INPUT_STYLE, PAGE_CONTAINER_STYLE, TABLE_CELL_STYLE, TABLE_HEADER_STYLE,
        TABLE_ROW_STYLE, base, delete_action_button, format_currency,
    },
    navigation::NavBar,
    preferences::{Currency, load_preferences},
    timezone::local_today,
};

/// The state needed for the group page.
#[derive(Debug, Clone)]
pub struct GroupPageState {
    pub db_connection: Arc<Mutex<Connection>>,
    /// The local timezone as a canonical timezone name, e.g. "Pacific/Auckland".
    pub local_timezone: String,
}

impl FromRef<AppState> for GroupPageState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
            local_timezone: state.local_timezone.clone(),
        }
    }
}

/// Render a group the user is a member of, otherwise a 404 page.
pub async fn get_group_page(
    Path(group_id): Path<GroupId>,
    State(state): State<GroupPageState>,
    Extension(user_id): Extension<UserID>,
) -> Result<Response, Error> {
    let connection = state
        .db_connection
        .lock()
        .inspect_err(|error| tracing::error!("could not acquire database lock: {error}"))
        .map_err(|_| Error::DatabaseLockError)?;

    let preferences = load_preferences(user_id, &connection)?;
    let group = get_group(group_id, user_id, &connection)?;
    let members = get_members(group_id, &connection)?;
    let expenses = get_group_expenses(group_id, &connection)?;
    let balances = compute_balances(&members, &expenses);
    let settlements = settle(&balances);

    let nav_bar = NavBar::new(endpoints::GROUPS_VIEW, preferences.business_mode).into_html();
    let page = GroupPage {
        group: &group,
        members: &members,
        expenses: &expenses,
        balances: &balances,
        settlements: &settlements,
        currency: preferences.currency,
        today: local_today(&state.local_timezone),
    };

    Ok(base(&group.name, &[], &page.into_html(nav_bar)).into_response())
}

struct GroupPage<'a> {
    group: &'a Group,
    members: &'a [GroupMember],
    expenses: &'a [GroupExpense],
    balances: &'a [MemberBalance],
    settlements: &'a [Settlement],
    currency: Currency,
    today: Date,
}

impl GroupPage<'_> {
    fn into_html(self, nav_bar: Markup) -> Markup {
        html! {
            (nav_bar)

            main class=(PAGE_CONTAINER_STYLE)
            {
                section class="space-y-6"
                {
                    h1 class="text-xl font-bold" { (self.group.name) }

                    div class="grid gap-4 lg:grid-cols-2"
                    {
                        (self.members_card())
                        (self.settlements_card())
                    }

                    (self.balances_table())

                    div class=(CARD_STYLE)
                    {
                        h2 class="text-lg font-semibold mb-2" { "Add Expense" }
                        (self.expense_form())
                    }

                    (self.expenses_table())
                }
            }
        }
    }

    fn username(&self, user_id: UserID) -> &str {
        self.members
            .iter()
            .find(|member| member.user_id == user_id)
            .map(|member| member.username.as_str())
            .unwrap_or("former member")
    }

    fn members_card(&self) -> Markup {
        html! {
            div class=(CARD_STYLE)
            {
                h2 class="text-lg font-semibold mb-2" { "Members" }

                ul id="members" class="space-y-2 mb-4"
                {
                    @for member in self.members {
                        li class="flex justify-between"
                        {
                            span { (member.username) }

                            (delete_action_button(
                                &format_endpoint(endpoints::DELETE_GROUP_MEMBER, member.id),
                                &format!("Remove {} from the group?", member.username),
                                "closest li",
                                "delete"
                            ))
                        }
                    }
                }

                form
                    id="add-member-form"
                    hx-post=(format_endpoint(endpoints::POST_GROUP_MEMBER, self.group.id))
                    hx-target-error="#alert-container"
                    class="flex gap-2 items-end"
                {
                    div class="grow"
                    {
                        label for="username" class=(FORM_LABEL_STYLE) { "Username" }

                        input
                            id="username"
                            type="text"
                            name="username"
                            placeholder="Their username"
                            required
                            class=(FORM_TEXT_INPUT_STYLE);
                    }

                    button type="submit" class="px-4 py-2 bg-blue-500 text-white rounded" { "Add" }
                }
            }
        }
    }

    fn settlements_card(&self) -> Markup {
        html! {
            div class=(CARD_STYLE)
            {
                h2 class="text-lg font-semibold mb-2" { "Settle Up" }

                @if self.settlements.is_empty() {
                    p { "Everyone is square." }
                } @else {
                    ul id="settlements" class="space-y-2"
                    {
                        @for settlement in self.settlements {
                            li
                            {
                                span class="font-semibold" { (self.username(settlement.from)) }
                                " pays "
                                span class="font-semibold" { (self.username(settlement.to)) }
                                " "
                                (format_currency(settlement.amount, self.currency))
                            }
                        }
                    }
                }
            }
        }
    }

    fn balances_table(&self) -> Markup {
        html! {
            table id="balances" class="w-full text-sm text-left text-gray-500 dark:text-gray-400"
            {
                thead class=(TABLE_HEADER_STYLE)
                {
                    tr
                    {
                        th scope="col" class=(TABLE_CELL_STYLE) { "Member" }
                        th scope="col" class=(TABLE_CELL_STYLE) { "Paid" }
                        th scope="col" class=(TABLE_CELL_STYLE) { "Share" }
                        th scope="col" class=(TABLE_CELL_STYLE) { "Balance" }
                    }
                }

                tbody
                {
                    @for balance in self.balances {
                        tr class=(TABLE_ROW_STYLE)
                        {
                            td class=(TABLE_CELL_STYLE) { (balance.username) }
                            td class=(TABLE_CELL_STYLE) { (format_currency(balance.paid, self.currency)) }
                            td class=(TABLE_CELL_STYLE) { (format_currency(balance.share, self.currency)) }
                            td class=(TABLE_CELL_STYLE) { (format_currency(balance.balance, self.currency)) }
                        }
                    }
                }
            }
        }
    }

    fn expense_form(&self) -> Markup {
        html! {
            form
                id="add-expense-form"
                hx-post=(format_endpoint(endpoints::POST_GROUP_EXPENSE, self.group.id))
                hx-target-error="#alert-container"
                class="grid gap-4 md:grid-cols-2"
            {
                div
                {
                    label for="description" class=(FORM_LABEL_STYLE) { "Description" }

                    input
                        id="description"
                        type="text"
                        name="description"
                        placeholder="What was it for?"
                        class=(FORM_TEXT_INPUT_STYLE);
                }

                div
                {
                    label for="amount" class=(FORM_LABEL_STYLE) { "Amount" }

                    input
                        id="amount"
                        type="number"
                        name="amount"
                        step="0.01"
                        min="0.01"
                        placeholder="0.00"
                        required
                        class=(FORM_TEXT_INPUT_STYLE);
                }

                div
                {
                    label for="payer_id" class=(FORM_LABEL_STYLE) { "Paid by" }

                    select id="payer_id" name="payer_id" required class=(FORM_TEXT_INPUT_STYLE)
                    {
                        @for member in self.members {
                            option value=(member.user_id) { (member.username) }
                        }
                    }
                }

                div
                {
                    label for="date" class=(FORM_LABEL_STYLE) { "Date" }

                    input
                        id="date"
                        type="date"
                        name="date"
                        value=(self.today)
                        required
                        class=(FORM_TEXT_INPUT_STYLE);
                }

                fieldset class="md:col-span-2"
                {
                    legend class=(FORM_LABEL_STYLE) { "Split between (leave empty for everyone)" }

                    div class="flex flex-wrap gap-4"
                    {
                        @for member in self.members {
                            label class="flex items-center gap-x-2"
                            {
                                input
                                    type="checkbox"
                                    name="participants"
                                    value=(member.user_id)
                                    class=(FORM_CHECKBOX_STYLE);
                                (member.username)
                            }
                        }
                    }
                }

                button type="submit" class=(format!("{BUTTON_PRIMARY_STYLE} md:col-span-2")) { "Add Expense" }
            }
        }
    }

    fn expenses_table(&self) -> Markup {
        html! {
            table id="group-expenses" class="w-full text-sm text-left text-gray-500 dark:text-gray-400"
            {
                thead class=(TABLE_HEADER_STYLE)
                {
                    tr
                    {
                        th scope="col" class=(TABLE_CELL_STYLE) { "Date" }
                        th scope="col" class=(TABLE_CELL_STYLE) { "Description" }
                        th scope="col" class=(TABLE_CELL_STYLE) { "Paid by" }
                        th scope="col" class=(TABLE_CELL_STYLE) { "Split" }
                        th scope="col" class=(TABLE_CELL_STYLE) { "Amount" }
                        th scope="col" class=(TABLE_CELL_STYLE) { "Actions" }
                    }
                }

                tbody
                {
                    @for expense in self.expenses {
                        tr class=(TABLE_ROW_STYLE) data-expense-id=(expense.id)
                        {
                            td class=(TABLE_CELL_STYLE) { (expense.date) }
                            td class=(TABLE_CELL_STYLE) { (expense.description) }
                            td class=(TABLE_CELL_STYLE) { (self.username(expense.payer_id)) }
                            td class=(TABLE_CELL_STYLE) { (self.split_label(expense)) }
                            td class=(TABLE_CELL_STYLE) { (format_currency(expense.amount, self.currency)) }
                            td class=(TABLE_CELL_STYLE)
                            {
                                (delete_action_button(
                                    &format_endpoint(endpoints::DELETE_GROUP_EXPENSE, expense.id),
                                    "Move this expense to the trash?",
                                    "closest tr",
                                    "delete"
                                ))
                            }
                        }
                    }

                    @if self.expenses.is_empty() {
                        tr
                        {
                            td colspan="6" class="px-6 py-4 text-center" { "No expenses yet." }
                        }
                    }
                }
            }
        }
    }

    fn split_label(&self, expense: &GroupExpense) -> String {
        if expense.split_data.is_empty() {
            return "Everyone".to_owned();
        }

        let names = self
            .members
            .iter()
            .map(|member| (member.user_id, member.username.as_str()))
            .collect::<HashMap<_, _>>();

        expense
            .split_data
            .iter()
            .filter_map(|user_id| names.get(user_id).copied())
            .collect::<Vec<_>>()
            .join(", ")
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
    use scraper::{Html, Selector};
    use time::{OffsetDateTime, macros::date};

    use crate::{
        Error,
        auth::UserID,
        group::{NewGroupExpense, add_member, create_group, create_group_expense},
        test_utils::{create_test_user, get_test_connection, parse_html_document, assert_valid_html},
    };

    use super::{GroupPageState, get_group_page};

    fn text_of(html: &Html, selector: &str) -> Vec<String> {
        html.select(&Selector::parse(selector).unwrap())
            .map(|element| {
                element
                    .text()
                    .collect::<String>()
                    .split_whitespace()
                    .collect::<Vec<_>>()
                    .join(" ")
            })
            .collect()
    }

    fn get_test_state() -> (GroupPageState, UserID, UserID, i64) {
        let connection = get_test_connection();
        let alice = create_test_user("alice", &connection);
        let bob = create_test_user("bob", &connection);
        let group = create_group("Trip", alice, OffsetDateTime::now_utc(), &connection).unwrap();
        add_member(group.id, "bob", OffsetDateTime::now_utc(), &connection).unwrap();
        create_group_expense(
            group.id,
            NewGroupExpense {
                payer_id: alice,
                amount: 60.0,
                description: "Petrol".to_owned(),
                date: date!(2025 - 02 - 02),
                split_data: vec![],
            },
            &connection,
        )
        .unwrap();

        (
            GroupPageState {
                db_connection: Arc::new(Mutex::new(connection)),
                local_timezone: "Etc/UTC".to_owned(),
            },
            alice,
            bob,
            group.id,
        )
    }

    #[tokio::test]
    async fn page_shows_members_expenses_and_settlements() {
        let (state, _, bob, group_id) = get_test_state();

        let response = get_group_page(Path(group_id), State(state), Extension(bob))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let html = parse_html_document(response).await;
        assert_valid_html(&html);
        assert_eq!(text_of(&html, "#members li span"), ["alice", "bob"]);
        assert_eq!(text_of(&html, "#settlements li"), ["bob pays alice $30.00"]);
        assert_eq!(
            html.select(&Selector::parse("#group-expenses tr[data-expense-id]").unwrap())
                .count(),
            1
        );
        assert_eq!(
            html.select(&Selector::parse("#add-expense-form input[name=participants]").unwrap())
                .count(),
            2
        );
    }

    #[tokio::test]
    async fn non_member_gets_not_found() {
        let (state, _, _, group_id) = get_test_state();
        let carol = create_test_user("carol", &state.db_connection.lock().unwrap());

        let result = get_group_page(Path(group_id), State(state), Extension(carol)).await;

        assert_eq!(result.unwrap_err(), Error::NotGroupMember);
    }
}
