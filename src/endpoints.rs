//! The API endpoints URIs.
//!
//! For endpoints that take a parameter, e.g., '/delete/{entry_id}', use [format_endpoint].

/// The dashboard showing the user's ledger.
pub const ROOT: &str = "/";
/// An alias for the dashboard, also used for adding entries with an entry type.
pub const DASHBOARD_VIEW: &str = "/dashboard";
/// The route for the registration page and form submissions.
pub const REGISTER: &str = "/register";
/// The route for the log-in page and form submissions.
pub const LOG_IN: &str = "/login";
/// The route for the client to log out the current user.
pub const LOG_OUT: &str = "/logout";
/// The route for adding a credit entry.
pub const CREDIT: &str = "/credit";
/// The route for adding a debit entry.
pub const DEBIT: &str = "/debit";
/// The route for deleting a credit entry.
pub const DELETE_CREDIT: &str = "/delete_credit/{entry_id}";
/// The route for deleting a debit entry.
pub const DELETE_DEBIT: &str = "/delete_debit/{entry_id}";
/// The route for deleting an entry of either kind.
pub const DELETE_ENTRY: &str = "/delete/{entry_id}";
/// The route for selecting the month shown on the dashboard.
pub const SET_MONTH: &str = "/set-month";
/// The route for downloading the ledger as a PDF.
pub const DOWNLOAD_PDF: &str = "/download_pdf";
/// The page to display when an internal server error occurs.
pub const INTERNAL_ERROR_VIEW: &str = "/error";
/// The route for static files.
pub const STATIC: &str = "/static";

/// Replace the parameter in `endpoint_path` with `id`.
///
/// A parameter is a string that starts with a left brace, followed by
/// lowercase letters or underscores, and ends with a right brace.
/// For example, in the endpoint path '/delete/{entry_id}', '{entry_id}' is the parameter.
///
/// This function assumes that an endpoint path only contains ASCII characters
/// and a single parameter.
///
/// If no parameter is found in `endpoint_path`, the function returns the
/// the original `endpoint_path`.
pub fn format_endpoint(endpoint_path: &str, id: i64) -> String {
    let Some(param_start) = endpoint_path.find('{') else {
        return endpoint_path.to_owned();
    };

    let param_end = endpoint_path[param_start..]
        .find('}')
        .map(|offset| param_start + offset + 1)
        .unwrap_or(endpoint_path.len());

    format!(
        "{}{}{}",
        &endpoint_path[..param_start],
        id,
        &endpoint_path[param_end..]
    )
}

// These tests are here so that we know when we call `Uri::from_shared` it will not panic.
#[cfg(test)]
mod endpoints_tests {
    use axum::http::Uri;

    use crate::endpoints;

    use super::format_endpoint;

    fn assert_endpoint_is_valid_uri(uri: &str) {
        assert!(uri.parse::<Uri>().is_ok());
    }

    #[test]
    fn endpoints_are_valid_uris() {
        assert_endpoint_is_valid_uri(endpoints::ROOT);
        assert_endpoint_is_valid_uri(endpoints::DASHBOARD_VIEW);
        assert_endpoint_is_valid_uri(endpoints::REGISTER);
        assert_endpoint_is_valid_uri(endpoints::LOG_IN);
        assert_endpoint_is_valid_uri(endpoints::LOG_OUT);
        assert_endpoint_is_valid_uri(endpoints::CREDIT);
        assert_endpoint_is_valid_uri(endpoints::DEBIT);
        assert_endpoint_is_valid_uri(endpoints::DELETE_CREDIT);
        assert_endpoint_is_valid_uri(endpoints::DELETE_DEBIT);
        assert_endpoint_is_valid_uri(endpoints::DELETE_ENTRY);
        assert_endpoint_is_valid_uri(endpoints::SET_MONTH);
        assert_endpoint_is_valid_uri(endpoints::DOWNLOAD_PDF);
        assert_endpoint_is_valid_uri(endpoints::INTERNAL_ERROR_VIEW);
        assert_endpoint_is_valid_uri(endpoints::STATIC);
    }

    #[test]
    fn produces_valid_uri() {
        let formatted_path = format_endpoint(endpoints::DELETE_CREDIT, 1);

        assert_eq!(formatted_path, "/delete_credit/1");
        assert!(formatted_path.parse::<Uri>().is_ok());
    }

    #[test]
    fn returns_original_path_with_no_parameter() {
        let formatted_path = format_endpoint("/hello/world", 1);

        assert_eq!(formatted_path, "/hello/world");
    }

    #[test]
    fn parameter_in_middle() {
        let formatted_path = format_endpoint("/hello/{world}/bye", 1);

        assert_eq!(formatted_path, "/hello/1/bye");
        assert!(formatted_path.parse::<Uri>().is_ok());
    }
}
