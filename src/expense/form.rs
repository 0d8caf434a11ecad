//! The form shared by the create and edit expense pages.

use maud::{Markup, html};
use serde::{Deserialize, Serialize};
use time::Date;

use crate::{
    category::{Category, CategoryId},
    html::{BUTTON_PRIMARY_STYLE, FORM_LABEL_STYLE, FORM_TEXT_INPUT_STYLE},
};

/// The form data for creating or editing an expense.
#[derive(Debug, Serialize, Deserialize)]
pub struct ExpenseForm {
    pub amount: f64,
    pub date: Date,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub category_id: Option<CategoryId>,
    /// Set when the expense was created from a scanned receipt.
    #[serde(default)]
    pub receipt_path: Option<String>,
}

/// The values the form starts with.
#[derive(Debug, Default)]
pub struct ExpenseFormValues<'a> {
    pub amount: Option<f64>,
    pub date: Option<Date>,
    pub description: &'a str,
    pub category_id: Option<CategoryId>,
    pub receipt_path: Option<&'a str>,
}

/// Where the form is sent.
pub enum ExpenseFormAction<'a> {
    Create(&'a str),
    Update(&'a str),
}

pub fn expense_form(
    action: ExpenseFormAction,
    values: &ExpenseFormValues,
    categories: &[Category],
    max_date: Date,
) -> Markup {
    let (hx_post, hx_put, submit_text) = match action {
        ExpenseFormAction::Create(url) => (Some(url), None, "Add Expense"),
        ExpenseFormAction::Update(url) => (None, Some(url), "Save Changes"),
    };
    let amount = values.amount.map(|amount| format!("{amount:.2}"));
    let date = values.date.unwrap_or(max_date);

    html! {
        form
            hx-post=[hx_post]
            hx-put=[hx_put]
            hx-target-error="#alert-container"
            class="w-full space-y-4 md:space-y-6"
        {
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
                    value=[amount]
                    required
                    autofocus
                    class=(FORM_TEXT_INPUT_STYLE);
            }

            div
            {
                label for="date" class=(FORM_LABEL_STYLE) { "Date" }

                input
                    id="date"
                    type="date"
                    name="date"
                    value=(date)
                    max=(max_date)
                    required
                    class=(FORM_TEXT_INPUT_STYLE);
            }

            div
            {
                label for="description" class=(FORM_LABEL_STYLE) { "Description" }

                input
                    id="description"
                    type="text"
                    name="description"
                    value=(values.description)
                    placeholder="What was it for?"
                    class=(FORM_TEXT_INPUT_STYLE);
            }

            div
            {
                label for="category_id" class=(FORM_LABEL_STYLE) { "Category" }

                select id="category_id" name="category_id" class=(FORM_TEXT_INPUT_STYLE)
                {
                    option value="" selected[values.category_id.is_none()] { "Uncategorised" }

                    @for category in categories {
                        option
                            value=(category.id)
                            selected[values.category_id == Some(category.id)]
                        {
                            (category.icon.glyph()) " " (category.name)
                        }
                    }
                }
            }

            @if let Some(receipt_path) = values.receipt_path {
                input type="hidden" name="receipt_path" value=(receipt_path);
                p class="text-sm text-gray-500 dark:text-gray-400" { "A receipt will be attached." }
            }

            button type="submit" class=(BUTTON_PRIMARY_STYLE) { (submit_text) }
        }
    }
}
