//! Middleware for logging requests and responses.

use axum::{
    body::{Body, Bytes},
    extract::Request,
    http::{StatusCode, header::CONTENT_TYPE},
    middleware::Next,
    response::{IntoResponse, Response},
};

/// Bodies longer than this are truncated in the `info` logs.
pub const LOG_BODY_LENGTH_LIMIT: usize = 64;

/// Form fields whose values never reach the logs.
const REDACTED_FIELDS: [&str; 3] = ["password", "confirm_password", "new_password"];

/// Log the request and response for each request.
///
/// Both the request and response are logged at the `info` level.
/// If a body is longer than [LOG_BODY_LENGTH_LIMIT] bytes, it is
/// truncated and the full body is logged at the `debug` level.
/// Only text bodies are logged, uploads and downloads are summarised by size.
pub async fn logging_middleware(request: Request, next: Next) -> Response {
    let (parts, body) = request.into_parts();
    let body_bytes = match axum::body::to_bytes(body, usize::MAX).await {
        Ok(bytes) => bytes,
        Err(error) => {
            tracing::error!("Could not read request body: {error}");
            return StatusCode::BAD_REQUEST.into_response();
        }
    };

    let content_type = parts
        .headers
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default();
    let mut display_text = describe_body(content_type, &body_bytes);
    if content_type.starts_with("application/x-www-form-urlencoded") {
        for field_name in REDACTED_FIELDS {
            display_text = redact_field(&display_text, field_name);
        }
    }
    log_body("Received request", &format!("{parts:#?}"), &display_text);

    let request = Request::from_parts(parts, Body::from(body_bytes));
    let response = next.run(request).await;

    let (parts, body) = response.into_parts();
    let body_bytes = match axum::body::to_bytes(body, usize::MAX).await {
        Ok(bytes) => bytes,
        Err(error) => {
            tracing::error!("Could not read response body: {error}");
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };

    let content_type = parts
        .headers
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default();
    log_body(
        "Sending response",
        &format!("{parts:#?}"),
        &describe_body(content_type, &body_bytes),
    );

    Response::from_parts(parts, Body::from(body_bytes))
}

fn is_text(content_type: &str) -> bool {
    content_type.is_empty()
        || content_type.starts_with("text/html")
        || content_type.starts_with("application/x-www-form-urlencoded")
}

fn describe_body(content_type: &str, body: &Bytes) -> String {
    if is_text(content_type) {
        String::from_utf8_lossy(body).to_string()
    } else {
        format!("<{} bytes of {content_type}>", body.len())
    }
}

fn redact_field(form_text: &str, field_name: &str) -> String {
    let prefix = format!("{field_name}=");

    form_text
        .split('&')
        .map(|pair| {
            if pair.starts_with(&prefix) {
                format!("{prefix}********")
            } else {
                pair.to_owned()
            }
        })
        .collect::<Vec<_>>()
        .join("&")
}

fn log_body(message: &str, headers: &str, body: &str) {
    if body.len() > LOG_BODY_LENGTH_LIMIT {
        let end = body
            .char_indices()
            .map(|(index, _)| index)
            .take_while(|index| *index <= LOG_BODY_LENGTH_LIMIT)
            .last()
            .unwrap_or_default();

        tracing::info!("{message}: {headers}\nbody: {}...", &body[..end]);
        tracing::debug!("Full body: {body:?}");
    } else {
        tracing::info!("{message}: {headers}\nbody: {body:?}");
    }
}

#[cfg(test)]
mod tests {
    use axum::body::Bytes;

    use super::{describe_body, redact_field};

    #[test]
    fn redacts_only_the_named_field() {
        let form = "username=alice&password=hunter2&confirm_password=hunter2";

        let got = redact_field(form, "password");

        assert_eq!(
            got,
            "username=alice&password=********&confirm_password=hunter2"
        );
    }

    #[test]
    fn redact_leaves_forms_without_field() {
        assert_eq!(redact_field("amount=12.5", "password"), "amount=12.5");
    }

    #[test]
    fn binary_bodies_are_summarised() {
        let body = Bytes::from_static(&[0xFF, 0xD8, 0xFF]);

        assert_eq!(
            describe_body("multipart/form-data; boundary=x", &body),
            "<3 bytes of multipart/form-data; boundary=x>"
        );
        assert_eq!(describe_body("text/html; charset=utf-8", &Bytes::from("hi")), "hi");
    }
}
