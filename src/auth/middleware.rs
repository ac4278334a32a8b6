//! Authentication middleware that validates sessions, extends them, and handles redirects.

use std::{
    cmp::max,
    sync::{Arc, Mutex},
};

use axum::{
    extract::{FromRef, FromRequestParts, Request, State},
    http::header::SET_COOKIE,
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::extract::{PrivateCookieJar, cookie::Key};
use rusqlite::Connection;
use time::{Duration, OffsetDateTime};

use crate::{
    AppState,
    auth::{
        cookie::{get_session_token, set_session_cookie},
        redirect::build_log_in_redirect_url,
        session::{Session, get_active_session, set_session_expiry},
    },
};

/// The state needed for the auth middleware
#[derive(Clone)]
pub struct AuthState {
    /// The key to be used for signing and encrypting private cookies.
    pub cookie_key: Key,
    /// How far into the future an active session is extended on each request.
    pub cookie_duration: Duration,
    /// The database connection holding the sessions.
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for AuthState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            cookie_key: state.cookie_key.clone(),
            cookie_duration: state.cookie_duration,
            db_connection: state.db_connection.clone(),
        }
    }
}

// this impl tells `PrivateCookieJar` how to access the key from our state
impl FromRef<AuthState> for Key {
    fn from_ref(state: &AuthState) -> Self {
        state.cookie_key.clone()
    }
}

/// Middleware function that checks for a valid session cookie.
///
/// The user ID is placed into the request and the request executed normally if
/// the session is valid, otherwise the client is redirected to the log-in page.
/// After the request has been handled the session is extended by the configured
/// cookie duration.
///
/// **Note**: Route handlers can use the function argument `Extension(user_id): Extension<UserID>` to receive the user ID.
///
/// **Note**: The app state must contain an `axum_extra::extract::cookie::Key` for decrypting and verifying the cookie contents.
pub async fn auth_guard(State(state): State<AuthState>, request: Request, next: Next) -> Response {
    let log_in_redirect = Redirect::to(&build_log_in_redirect_url(&request));

    let (mut parts, body) = request.into_parts();
    let jar = match PrivateCookieJar::from_request_parts(&mut parts, &state).await {
        Ok(jar) => jar,
        Err(err) => {
            tracing::error!("Error getting cookie jar: {err:?}. Redirecting to log in page.");
            return log_in_redirect.into_response();
        }
    };

    let Some(token) = get_session_token(&jar) else {
        return log_in_redirect.into_response();
    };

    let session = {
        let connection = match state.db_connection.lock() {
            Ok(connection) => connection,
            Err(error) => {
                tracing::error!("could not acquire database lock: {error}");
                return crate::Error::DatabaseLockError.into_response();
            }
        };

        match get_active_session(&token, OffsetDateTime::now_utc(), &connection) {
            Ok(session) => session,
            Err(error) => {
                tracing::debug!("Rejected session {token}: {error}");
                return log_in_redirect.into_response();
            }
        }
    };

    parts.extensions.insert(session.user_id);
    let request = Request::from_parts(parts, body);
    let response = next.run(request).await;

    let jar = match extend_session(&state, session) {
        Some(session) => set_session_cookie(jar, &session),
        // The handler may have ended the session, e.g. by logging out.
        None => return response,
    };

    let (mut parts, body) = response.into_parts();
    for (key, val) in jar.into_response().headers().iter() {
        if key != SET_COOKIE {
            continue;
        }

        parts.headers.append(key, val.to_owned());
    }

    Response::from_parts(parts, body)
}

/// Push the expiry of `session` out to the later of its current expiry and
/// now plus the cookie duration.
///
/// Returns the updated session or `None` if it could not be extended.
fn extend_session(state: &AuthState, mut session: Session) -> Option<Session> {
    let new_expiry = OffsetDateTime::now_utc().checked_add(state.cookie_duration)?;
    session.expires_at = max(session.expires_at, new_expiry);

    let connection = state
        .db_connection
        .lock()
        .inspect_err(|error| tracing::error!("could not acquire database lock: {error}"))
        .ok()?;

    match set_session_expiry(&session.token, session.expires_at, &connection) {
        Ok(()) => Some(session),
        Err(error) => {
            tracing::debug!("Could not extend session {}: {error}", session.token);
            None
        }
    }
}
