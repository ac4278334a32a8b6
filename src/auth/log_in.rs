//! This file defines the routes for displaying the log-in page and handling log-in requests.
//! The rest of the auth module handles the lower level session and cookie logic.

use std::sync::{Arc, Mutex};

use axum::{
    Form,
    extract::{FromRef, Query, State},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::extract::{PrivateCookieJar, cookie::Key};
use maud::{Markup, html};
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use time::Duration;

use crate::{
    AppState, Error,
    auth::{
        cookie::set_session_cookie, redirect::normalize_redirect_url, session::create_session,
        user::{User, get_user_by_username},
    },
    endpoints,
    html::{
        BUTTON_PRIMARY_STYLE, alert_error, base, link, log_in_register, password_input, text_input,
    },
};

fn log_in_form(username: &str, error_message: Option<&str>, redirect_url: Option<&str>) -> Markup {
    html! {
        form method="post" action=(endpoints::LOG_IN) class="form"
        {
            @if let Some(error_message) = error_message {
                (alert_error(error_message))
            }

            @if let Some(redirect_url) = redirect_url {
                input type="hidden" name="redirect_url" value=(redirect_url);
            }

            (text_input("username", "Username", username, true, None))

            (password_input(None))

            div class="checkbox-row"
            {
                input type="checkbox" name="remember_me" id="remember_me";

                label for="remember_me" { "Keep me logged in for one week" }
            }

            button type="submit" id="submit-button" class=(BUTTON_PRIMARY_STYLE) { "Log in" }

            p class="form-hint" {
                "Don't have an account? "
                (link(endpoints::REGISTER, "Register here"))
            }
        }
    }
}

fn log_in_page(username: &str, error_message: Option<&str>, redirect_url: Option<&str>) -> Markup {
    let form = log_in_form(username, error_message, redirect_url);
    let content = log_in_register("Log in to your account", &form);
    base("Log In", &content)
}

fn parse_redirect_url(raw_url: Option<&str>, source: &str) -> Option<String> {
    match raw_url.and_then(normalize_redirect_url) {
        Some(redirect_url) => Some(redirect_url),
        None => {
            if let Some(redirect_url) = raw_url {
                tracing::warn!("Invalid redirect URL from {source}: {redirect_url}");
            }
            None
        }
    }
}

/// Display the log-in page.
pub async fn get_log_in_page(Query(query): Query<RedirectQuery>) -> Response {
    let redirect_url = parse_redirect_url(query.redirect_url.as_deref(), "log-in query");
    log_in_page("", None, redirect_url.as_deref()).into_response()
}

/// How long the session should last if the user selects "remember me" at log-in.
const REMEMBER_ME_COOKIE_DURATION: Duration = Duration::days(7);

/// The state needed to perform a login.
#[derive(Debug, Clone)]
pub struct LoginState {
    /// The key to be used for signing and encrypting private cookies.
    pub cookie_key: Key,
    /// The duration for which sessions are valid without "remember me".
    pub cookie_duration: Duration,
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for LoginState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            cookie_key: state.cookie_key.clone(),
            cookie_duration: state.cookie_duration,
            db_connection: state.db_connection.clone(),
        }
    }
}

// this impl tells `PrivateCookieJar` how to access the key from our state
impl FromRef<LoginState> for Key {
    fn from_ref(state: &LoginState) -> Self {
        state.cookie_key.clone()
    }
}

pub const INVALID_CREDENTIALS_ERROR_MSG: &str = "Invalid username or password";

const INTERNAL_ERROR_MSG: &str = "An internal error occurred. Please try again later.";

/// Handler for log-in requests via the POST method.
///
/// On a successful log-in request, a session is started, the session cookie set and the
/// client is redirected to the requested page or the dashboard.
/// Otherwise, the form is returned with an error message explaining the problem.
///
/// An unknown username and a wrong password get the same error message.
pub async fn post_log_in(
    State(state): State<LoginState>,
    jar: PrivateCookieJar,
    Form(user_data): Form<LogInData>,
) -> Response {
    let redirect_url = parse_redirect_url(user_data.redirect_url.as_deref(), "log-in form");
    let redirect_url = redirect_url.as_deref();
    let render_error = |status: StatusCode, message: &str| {
        (
            status,
            log_in_page(&user_data.username, Some(message), redirect_url),
        )
            .into_response()
    };

    let cookie_duration = if user_data.remember_me.is_some() {
        REMEMBER_ME_COOKIE_DURATION
    } else {
        state.cookie_duration
    };

    let session = {
        let connection = match state.db_connection.lock() {
            Ok(connection) => connection,
            Err(error) => {
                tracing::error!("could not acquire database lock: {error}");
                return render_error(StatusCode::INTERNAL_SERVER_ERROR, INTERNAL_ERROR_MSG);
            }
        };

        // Usernames are trimmed at registration.
        let username = user_data.username.trim();
        let user = match verify_credentials(username, &user_data.password, &connection) {
            Ok(user) => user,
            Err(Error::InvalidCredentials) => {
                return render_error(StatusCode::UNAUTHORIZED, INVALID_CREDENTIALS_ERROR_MSG);
            }
            Err(error) => {
                tracing::error!("Unhandled error while verifying credentials: {error}");
                return render_error(StatusCode::INTERNAL_SERVER_ERROR, INTERNAL_ERROR_MSG);
            }
        };

        match create_session(user.id, cookie_duration, &connection) {
            Ok(session) => session,
            Err(error) => {
                tracing::error!("Could not start session for user {}: {error}", user.id);
                return render_error(StatusCode::INTERNAL_SERVER_ERROR, INTERNAL_ERROR_MSG);
            }
        }
    };

    tracing::info!("User {} logged in", session.user_id);

    let redirect_url = redirect_url.unwrap_or(endpoints::ROOT);

    (set_session_cookie(jar, &session), Redirect::to(redirect_url)).into_response()
}

/// Find the user with `username` and check that `password` is theirs.
///
/// # Errors
///
/// Returns [Error::InvalidCredentials] for both an unknown username and a
/// wrong password.
fn verify_credentials(
    username: &str,
    password: &str,
    connection: &Connection,
) -> Result<User, Error> {
    let user = match get_user_by_username(username, connection) {
        Ok(user) => user,
        Err(Error::NotFound) => {
            tracing::info!("Log-in attempt for unknown user");
            return Err(Error::InvalidCredentials);
        }
        Err(error) => return Err(error),
    };

    match user.password_hash.verify(password) {
        Ok(true) => Ok(user),
        Ok(false) => {
            tracing::info!("Wrong password given for user {}", user.id);
            Err(Error::InvalidCredentials)
        }
        Err(error) => Err(Error::HashingError(error.to_string())),
    }
}

#[derive(Deserialize)]
pub struct RedirectQuery {
    pub redirect_url: Option<String>,
}

/// The raw data entered by the user in the log-in form.
///
/// The password is stored as a plain string. There is no need for validation here since
/// it will be compared against the password hash in the database.
#[derive(Clone, Serialize, Deserialize)]
pub struct LogInData {
    /// Username entered during log-in.
    pub username: String,

    /// Password entered during log-in.
    pub password: String,

    /// Whether to extend the initial session duration.
    ///
    /// This value comes from a checkbox, so it either has a string value or is not set
    /// (see the [MDN docs](https://developer.mozilla.org/en-US/docs/Web/HTML/Element/input/checkbox#value_2)).
    /// The `Some` variant should be interpreted as `true` irregardless of the
    /// string value, and the `None` variant should be interpreted as `false`.
    pub remember_me: Option<String>,

    /// Optional URL to redirect to after logging in.
    pub redirect_url: Option<String>,
}
