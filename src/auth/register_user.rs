//! The registration page for creating a new user account.
use std::sync::{Arc, Mutex};

use axum::{
    Form,
    extract::{FromRef, State},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use maud::{Markup, html};
use rusqlite::Connection;
use serde::{Deserialize, Serialize};

use crate::{
    AppState, Error, PasswordHash, ValidatedPassword,
    auth::user::{create_user, get_user_by_username},
    endpoints,
    html::{
        BUTTON_PRIMARY_STYLE, alert_error, base, link, log_in_register, password_input, text_input,
    },
    internal_server_error::InternalServerError,
};

pub const DUPLICATE_USERNAME_ERROR_MSG: &str = "Username already exists. Please choose another.";
pub const EMPTY_USERNAME_ERROR_MSG: &str = "Username cannot be empty.";

/// Field specific error messages for the registration form.
#[derive(Default)]
struct RegistrationErrors<'a> {
    username: Option<&'a str>,
    password: Option<&'a str>,
    form: Option<&'a str>,
}

fn registration_form(name: &str, username: &str, errors: RegistrationErrors) -> Markup {
    html! {
        form method="post" action=(endpoints::REGISTER) class="form"
        {
            @if let Some(error_message) = errors.form {
                (alert_error(error_message))
            }

            (text_input("name", "Display Name", name, false, None))

            (text_input("username", "Username", username, true, errors.username))

            (password_input(errors.password))

            button type="submit" id="submit-button" class=(BUTTON_PRIMARY_STYLE) { "Register" }

            p class="form-hint"
            {
                "Already have an account? "
                (link(endpoints::LOG_IN, "Log in here"))
            }
        }
    }
}

fn registration_page(name: &str, username: &str, errors: RegistrationErrors) -> Markup {
    let form = registration_form(name, username, errors);
    let content = log_in_register("Create an account", &form);
    base("Register", &content)
}

fn registration_error(
    status: StatusCode,
    name: &str,
    username: &str,
    errors: RegistrationErrors,
) -> Response {
    (status, registration_page(name, username, errors)).into_response()
}

/// Display the registration page.
pub async fn get_register_page() -> Response {
    registration_page("", "", RegistrationErrors::default()).into_response()
}

/// The state needed for creating a new user.
#[derive(Debug, Clone)]
pub struct RegistrationState {
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for RegistrationState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

/// The raw data entered by the user in the registration form.
#[derive(Serialize, Deserialize)]
pub struct RegisterForm {
    /// The name to show on the dashboard, may be empty.
    #[serde(default)]
    pub name: String,
    pub username: String,
    pub password: String,
}

/// Create a user from the registration form and redirect to the log-in page.
///
/// The form is shown again with an error message if the username is empty or
/// already taken, or if the password is too weak.
pub async fn register_user(
    State(state): State<RegistrationState>,
    Form(user_data): Form<RegisterForm>,
) -> Response {
    let name = user_data.name.trim();
    let username = user_data.username.trim();

    if username.is_empty() {
        return registration_error(
            StatusCode::UNPROCESSABLE_ENTITY,
            name,
            username,
            RegistrationErrors {
                username: Some(EMPTY_USERNAME_ERROR_MSG),
                ..Default::default()
            },
        );
    }

    let existing_user = match state.db_connection.lock() {
        Ok(connection) => get_user_by_username(username, &connection),
        Err(error) => {
            tracing::error!("could not acquire database lock: {error}");
            return InternalServerError::default().into_response();
        }
    };

    match existing_user {
        Ok(_) => {
            return registration_error(
                StatusCode::CONFLICT,
                name,
                username,
                RegistrationErrors {
                    username: Some(DUPLICATE_USERNAME_ERROR_MSG),
                    ..Default::default()
                },
            );
        }
        Err(Error::NotFound) => {}
        Err(error) => return error.into_response(),
    }

    let validated_password = match ValidatedPassword::new(&user_data.password, &[name, username])
    {
        Ok(password) => password,
        Err(error) => {
            let message = error.to_string();
            return registration_error(
                StatusCode::UNPROCESSABLE_ENTITY,
                name,
                username,
                RegistrationErrors {
                    password: Some(&message),
                    ..Default::default()
                },
            );
        }
    };

    let password_hash = match PasswordHash::new(validated_password, PasswordHash::DEFAULT_COST) {
        Ok(hash) => hash,
        Err(e) => {
            tracing::error!("an error occurred while hashing a password: {e}");
            return registration_error(
                StatusCode::INTERNAL_SERVER_ERROR,
                name,
                username,
                RegistrationErrors {
                    form: Some("An internal error occurred. Please try again later."),
                    ..Default::default()
                },
            );
        }
    };

    let result = match state.db_connection.lock() {
        Ok(connection) => create_user(name, username, password_hash, &connection),
        Err(error) => {
            tracing::error!("could not acquire database lock: {error}");
            return InternalServerError::default().into_response();
        }
    };

    match result {
        Ok(user) => {
            tracing::info!("Registered user {}", user.id);
            Redirect::to(endpoints::LOG_IN).into_response()
        }
        // Another request may have taken the username since the check above.
        Err(Error::DuplicateUsername) => registration_error(
            StatusCode::CONFLICT,
            name,
            username,
            RegistrationErrors {
                username: Some(DUPLICATE_USERNAME_ERROR_MSG),
                ..Default::default()
            },
        ),
        Err(error) => {
            tracing::error!("An unhandled error occurred while inserting a new user: {error}");
            error.into_response()
        }
    }
}

#[cfg(test)]
mod get_register_page_tests {
    use axum::http::StatusCode;

    use crate::{
        endpoints,
        test_utils::{
            assert_content_type, assert_form_action, assert_form_input, assert_valid_html,
            must_get_form, parse_html_document,
        },
    };

    use super::get_register_page;

    #[tokio::test]
    async fn render_register_page() {
        let response = get_register_page().await;

        assert_eq!(response.status(), StatusCode::OK);
        assert_content_type(&response, "text/html; charset=utf-8");

        let document = parse_html_document(response).await;
        assert_valid_html(&document);

        let h1_selector = scraper::Selector::parse("h1").unwrap();
        let title = document
            .select(&h1_selector)
            .next()
            .expect("No h1 found")
            .text()
            .collect::<String>();
        assert_eq!(title.trim(), "Create an account");

        let form = must_get_form(&document);
        assert_form_action(&form, endpoints::REGISTER);
        assert_form_input(&form, "name", "text");
        assert_form_input(&form, "username", "text");
        assert_form_input(&form, "password", "password");
    }
}
