//! Helpers for redirect URLs during authentication flows.

use axum::{extract::Request, http::Uri};
use tracing::error;

use crate::endpoints;

fn is_safe_redirect_url(redirect_url: &str) -> bool {
    if !redirect_url.starts_with('/') || redirect_url.starts_with("//") {
        return false;
    }

    let path = redirect_url
        .split_once('?')
        .map(|(path, _)| path)
        .unwrap_or(redirect_url);

    path != endpoints::LOG_IN
}

/// Check that `raw_url` is a relative path on this site that is safe to
/// redirect to after logging in.
pub fn normalize_redirect_url(raw_url: &str) -> Option<String> {
    let uri = raw_url.parse::<Uri>().ok()?;
    if uri.scheme().is_some() || uri.authority().is_some() {
        return None;
    }
    let path_and_query = uri.path_and_query()?.as_str();

    is_safe_redirect_url(path_and_query).then(|| path_and_query.to_owned())
}

/// Build the URL of the log-in page that sends the user back to the page in
/// `request` once they have logged in.
///
/// Only GET requests are sent back to, since the log-in redirect cannot
/// replay a form submission. Other requests are sent back to the dashboard.
pub fn build_log_in_redirect_url(request: &Request) -> String {
    let redirect_target = if request.method() == axum::http::Method::GET {
        request
            .uri()
            .path_and_query()
            .and_then(|path_and_query| normalize_redirect_url(path_and_query.as_str()))
    } else {
        None
    };

    let redirect_target = redirect_target.unwrap_or_else(|| endpoints::ROOT.to_owned());

    match serde_urlencoded::to_string([("redirect_url", &redirect_target)]) {
        Ok(param) => format!("{}?{}", endpoints::LOG_IN, param),
        Err(error) => {
            error!("Could not encode redirect URL {redirect_target}: {error}");
            endpoints::LOG_IN.to_owned()
        }
    }
}
