//! Works out where to send a user after they log in.
//!
//! Only same-site, path-only URLs are ever used as a redirect target.

use axum::{extract::Request, http::Uri};

use crate::endpoints;

/// Return the path and query of `raw_url` if it is a safe local redirect target.
///
/// Absolute URLs, protocol-relative URLs and the log-in page itself are rejected.
pub fn normalize_redirect_url(raw_url: &str) -> Option<String> {
    let uri = raw_url.parse::<Uri>().ok()?;

    if uri.scheme().is_some() || uri.authority().is_some() {
        return None;
    }

    local_path_and_query(&uri)
}

/// Like [normalize_redirect_url], but `HX-Current-URL` is an absolute URL so the
/// scheme and host are dropped rather than rejected.
fn normalize_hx_current_url(raw_url: &str) -> Option<String> {
    let uri = raw_url.parse::<Uri>().ok()?;

    local_path_and_query(&uri)
}

fn local_path_and_query(uri: &Uri) -> Option<String> {
    let path_and_query = uri.path_and_query()?;
    let path = path_and_query.path();

    let is_local = path.starts_with('/') && !path.starts_with("//");
    let is_log_in_page = path == endpoints::LOG_IN_VIEW;

    (is_local && !is_log_in_page).then(|| path_and_query.as_str().to_owned())
}

/// Build the log-in page URL that returns the user to where `request` was headed.
///
/// htmx requests to `/api` routes use the page the user was looking at instead of
/// the API route.
pub fn build_log_in_redirect_url(request: &Request) -> Option<String> {
    let redirect_target = if request.uri().path().starts_with("/api") {
        redirect_target_from_hx_request(request)?
    } else {
        normalize_redirect_url(request.uri().path_and_query()?.as_str())?
    };

    build_log_in_redirect_url_from_target(&redirect_target)
}

pub(super) fn build_log_in_redirect_url_from_target(redirect_target: &str) -> Option<String> {
    serde_urlencoded::to_string([("redirect_url", redirect_target)])
        .inspect_err(|error| {
            tracing::error!("Could not encode redirect URL {redirect_target}: {error}")
        })
        .ok()
        .map(|query| format!("{}?{}", endpoints::LOG_IN_VIEW, query))
}

fn redirect_target_from_hx_request(request: &Request) -> Option<String> {
    let headers = request.headers();
    let is_hx_request = headers
        .get("hx-request")
        .and_then(|header| header.to_str().ok())
        .is_some_and(|header| header.eq_ignore_ascii_case("true"));

    if !is_hx_request {
        tracing::warn!("Missing HX-Request header for /api request.");
        return None;
    }

    let Some(current_url) = headers
        .get("hx-current-url")
        .and_then(|header| header.to_str().ok())
    else {
        tracing::warn!("Missing HX-Current-URL header for /api request.");
        return None;
    };

    let redirect_url = normalize_hx_current_url(current_url);

    if redirect_url.is_none() {
        tracing::warn!("Invalid HX-Current-URL header value: {current_url}");
    }

    redirect_url
}

#[cfg(test)]
mod tests {
    use axum::{body::Body, extract::Request};

    use crate::{auth::redirect::build_log_in_redirect_url, endpoints};

    use super::normalize_redirect_url;

    #[test]
    fn keeps_local_paths_with_query() {
        assert_eq!(
            normalize_redirect_url("/expenses?month=2025-10"),
            Some("/expenses?month=2025-10".to_owned())
        );
    }

    #[test]
    fn rejects_external_urls() {
        assert_eq!(normalize_redirect_url("https://evil.example/steal"), None);
        assert_eq!(normalize_redirect_url("//evil.example"), None);
    }

    #[test]
    fn rejects_log_in_page() {
        assert_eq!(normalize_redirect_url(endpoints::LOG_IN_VIEW), None);
    }

    #[test]
    fn api_request_uses_current_page() {
        let request = Request::builder()
            .uri("/api/expenses")
            .header("hx-request", "true")
            .header("hx-current-url", "http://localhost:3000/groups/4")
            .body(Body::empty())
            .unwrap();

        let got = build_log_in_redirect_url(&request);

        let want_query = serde_urlencoded::to_string([("redirect_url", "/groups/4")]).unwrap();
        assert_eq!(got, Some(format!("{}?{}", endpoints::LOG_IN_VIEW, want_query)));
    }

    #[test]
    fn api_request_without_htmx_headers_has_no_target() {
        let request = Request::builder()
            .uri("/api/expenses")
            .body(Body::empty())
            .unwrap();

        assert_eq!(build_log_in_redirect_url(&request), None);
    }
}
