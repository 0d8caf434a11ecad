//! Parsing response bodies into HTML for assertions.

use axum::{body::Body, response::Response};
use scraper::{Html, Selector};

async fn body_text(response: Response<Body>) -> String {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("Could not get response body");

    String::from_utf8_lossy(&body).to_string()
}

/// Parse a full page.
pub(crate) async fn parse_html_document(response: Response<Body>) -> Html {
    Html::parse_document(&body_text(response).await)
}

/// Parse a snippet such as an alert or table row.
pub(crate) async fn parse_html_fragment(response: Response<Body>) -> Html {
    Html::parse_fragment(&body_text(response).await)
}

#[track_caller]
pub(crate) fn assert_valid_html(html: &Html) {
    assert!(
        html.errors.is_empty(),
        "Got HTML parsing errors: {:?}",
        html.errors
    );
}

/// The trimmed text of the first element matching `css`.
#[track_caller]
pub(crate) fn element_text(html: &Html, css: &str) -> String {
    let selector = Selector::parse(css).unwrap_or_else(|error| panic!("invalid selector {css:?}: {error}"));

    html.select(&selector)
        .next()
        .unwrap_or_else(|| panic!("No element matches {css:?}"))
        .text()
        .collect::<String>()
        .trim()
        .to_owned()
}

/// How many elements match `css`.
pub(crate) fn count_elements(html: &Html, css: &str) -> usize {
    let selector = Selector::parse(css).unwrap_or_else(|error| panic!("invalid selector {css:?}: {error}"));

    html.select(&selector).count()
}
