//! Application router configuration with protected and unprotected route definitions.

use axum::{
    Router, middleware,
    routing::{get, post},
};
use tower_http::services::ServeDir;

use crate::{
    AppState,
    auth::{
        auth_guard, get_log_in_page, get_log_out, get_register_page, post_log_in, register_user,
    },
    endpoints,
    internal_server_error::get_internal_server_error_page,
    ledger::{
        add_credit_endpoint, add_debit_endpoint, add_entry_endpoint, delete_credit_endpoint,
        delete_debit_endpoint, delete_entry_endpoint, get_dashboard_page, set_month_endpoint,
    },
    not_found::get_404_not_found,
    report::download_pdf,
};

/// Return a router with all the app's routes.
pub fn build_router(state: AppState) -> Router {
    let unprotected_routes = Router::new()
        .route(endpoints::LOG_IN, get(get_log_in_page).post(post_log_in))
        .route(endpoints::LOG_OUT, get(get_log_out))
        .route(endpoints::REGISTER, get(get_register_page).post(register_user))
        .route(
            endpoints::INTERNAL_ERROR_VIEW,
            get(get_internal_server_error_page),
        );

    let protected_routes = Router::new()
        .route(endpoints::ROOT, get(get_dashboard_page))
        .route(
            endpoints::DASHBOARD_VIEW,
            get(get_dashboard_page).post(add_entry_endpoint),
        )
        .route(endpoints::CREDIT, post(add_credit_endpoint))
        .route(endpoints::DEBIT, post(add_debit_endpoint))
        .route(endpoints::DELETE_CREDIT, post(delete_credit_endpoint))
        .route(endpoints::DELETE_DEBIT, post(delete_debit_endpoint))
        .route(endpoints::DELETE_ENTRY, post(delete_entry_endpoint))
        .route(endpoints::SET_MONTH, post(set_month_endpoint))
        .route(endpoints::DOWNLOAD_PDF, get(download_pdf))
        .layer(middleware::from_fn_with_state(state.clone(), auth_guard));

    protected_routes
        .merge(unprotected_routes)
        .nest_service(endpoints::STATIC, ServeDir::new("static/"))
        .fallback(get_404_not_found)
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;
    use axum_extra::extract::cookie::Cookie;
    use axum_test::TestServer;
    use rusqlite::Connection;

    use crate::{AppState, auth::COOKIE_SESSION, endpoints, routing::build_router};

    const TEST_PASSWORD: &str = "averysafeandsecurepassword";

    fn get_test_server() -> TestServer {
        let connection = Connection::open_in_memory().unwrap();
        let state = AppState::new(connection, "foobar", "Etc/UTC").unwrap();

        TestServer::try_new(build_router(state)).expect("Could not create test server.")
    }

    /// Register `username` and return the session cookie from logging in.
    async fn register_and_log_in(server: &TestServer, username: &str) -> Cookie<'static> {
        server
            .post(endpoints::REGISTER)
            .form(&[
                ("name", username),
                ("username", username),
                ("password", TEST_PASSWORD),
            ])
            .await
            .assert_status_see_other();

        let response = server
            .post(endpoints::LOG_IN)
            .form(&[("username", username), ("password", TEST_PASSWORD)])
            .await;
        response.assert_status_see_other();

        response.cookie(COOKIE_SESSION)
    }

    #[tokio::test]
    async fn unauthenticated_dashboard_redirects_to_log_in() {
        let server = get_test_server();

        let response = server.get(endpoints::ROOT).await;

        response.assert_status_see_other();
        assert_eq!(response.header("location"), "/login?redirect_url=%2F");
    }

    #[tokio::test]
    async fn unauthenticated_pdf_download_redirects_to_log_in() {
        let server = get_test_server();

        let response = server.get(endpoints::DOWNLOAD_PDF).await;

        response.assert_status_see_other();
    }

    #[tokio::test]
    async fn unknown_route_is_not_found() {
        let server = get_test_server();

        server
            .get("/does-not-exist")
            .await
            .assert_status(StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn register_log_in_add_entries_and_download() {
        let server = get_test_server();
        let cookie = register_and_log_in(&server, "alice").await;

        server
            .post(endpoints::CREDIT)
            .add_cookie(cookie.clone())
            .form(&[("amount", "1200"), ("description", "Salary")])
            .await
            .assert_status_see_other();
        server
            .post(endpoints::DASHBOARD_VIEW)
            .add_cookie(cookie.clone())
            .form(&[
                ("entry_type", "debit"),
                ("amount", "200.50"),
                ("description", "Groceries"),
            ])
            .await
            .assert_status_see_other();

        let dashboard = server.get(endpoints::ROOT).add_cookie(cookie.clone()).await;
        dashboard.assert_status_ok();
        dashboard.assert_text_contains("Salary");
        dashboard.assert_text_contains("Groceries");
        dashboard.assert_text_contains("$999.50");

        let pdf = server.get(endpoints::DOWNLOAD_PDF).add_cookie(cookie).await;
        pdf.assert_status_ok();
        assert_eq!(pdf.header("content-type"), "application/pdf");
        assert!(pdf.as_bytes().starts_with(b"%PDF"));
    }

    #[tokio::test]
    async fn users_only_see_their_own_entries() {
        let server = get_test_server();
        let alice_cookie = register_and_log_in(&server, "alice").await;
        server
            .post(endpoints::CREDIT)
            .add_cookie(alice_cookie)
            .form(&[("amount", "42"), ("description", "Rent from the flatmate")])
            .await
            .assert_status_see_other();

        let bob_cookie = register_and_log_in(&server, "bob").await;
        let dashboard = server.get(endpoints::ROOT).add_cookie(bob_cookie).await;

        dashboard.assert_status_ok();
        dashboard.assert_text_contains("Welcome, bob");
        assert!(!dashboard.text().contains("Rent from the flatmate"));
    }

    #[tokio::test]
    async fn log_out_ends_session() {
        let server = get_test_server();
        let cookie = register_and_log_in(&server, "alice").await;
        server
            .get(endpoints::ROOT)
            .add_cookie(cookie.clone())
            .await
            .assert_status_ok();

        server
            .get(endpoints::LOG_OUT)
            .add_cookie(cookie.clone())
            .await
            .assert_status_see_other();

        server
            .get(endpoints::ROOT)
            .add_cookie(cookie)
            .await
            .assert_status_see_other();
    }

    #[tokio::test]
    async fn huge_amounts_do_not_break_the_app() {
        let server = get_test_server();
        let cookie = register_and_log_in(&server, "alice").await;

        for amount in ["79228162514264337593543950335", "1000000000000"] {
            for _ in 0..2 {
                server
                    .post(endpoints::CREDIT)
                    .add_cookie(cookie.clone())
                    .form(&[("amount", amount), ("description", "Lottery")])
                    .await;
            }
        }

        let dashboard = server.get(endpoints::ROOT).add_cookie(cookie.clone()).await;
        dashboard.assert_status_ok();
        dashboard.assert_text_contains("$2,000,000,000,000.00");

        let pdf = server.get(endpoints::DOWNLOAD_PDF).add_cookie(cookie).await;
        pdf.assert_status_ok();

        // Other users can still log in afterwards.
        register_and_log_in(&server, "bob").await;
    }
}
