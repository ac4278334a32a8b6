//! Log-out route handler that ends the session and redirects users.

use std::sync::{Arc, Mutex};

use axum::{
    extract::{FromRef, State},
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::extract::{PrivateCookieJar, cookie::Key};
use rusqlite::Connection;

use crate::{
    AppState,
    auth::{
        cookie::{get_session_token, invalidate_session_cookie},
        session::delete_session,
    },
    endpoints,
};

/// The state needed to end a session.
#[derive(Clone)]
pub struct LogOutState {
    pub cookie_key: Key,
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for LogOutState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            cookie_key: state.cookie_key.clone(),
            db_connection: state.db_connection.clone(),
        }
    }
}

impl FromRef<LogOutState> for Key {
    fn from_ref(state: &LogOutState) -> Self {
        state.cookie_key.clone()
    }
}

/// Delete the session, invalidate the session cookie and redirect the client
/// to the log-in page.
///
/// Logging out without a session is not an error.
pub async fn get_log_out(State(state): State<LogOutState>, jar: PrivateCookieJar) -> Response {
    if let Some(token) = get_session_token(&jar) {
        match state.db_connection.lock() {
            Ok(connection) => {
                if let Err(error) = delete_session(&token, &connection) {
                    tracing::error!("Could not delete session {token}: {error}");
                }
            }
            Err(error) => tracing::error!("could not acquire database lock: {error}"),
        }
    }

    let jar = invalidate_session_cookie(jar);

    (jar, Redirect::to(endpoints::LOG_IN)).into_response()
}
