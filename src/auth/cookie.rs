//! Defines functions for storing the session token in an encrypted cookie.

use axum_extra::extract::{
    PrivateCookieJar,
    cookie::{Cookie, SameSite},
};
use time::{Duration, OffsetDateTime};

use crate::auth::session::{Session, SessionToken};

/// The name of the cookie holding the session token.
pub(crate) const COOKIE_SESSION: &str = "session";
/// The default duration for which auth cookies are valid.
pub const DEFAULT_COOKIE_DURATION: Duration = Duration::minutes(5);

/// Add the session cookie to the cookie jar, indicating that a user is logged in and authenticated.
///
/// The cookie expires at the same time as `session`.
///
/// Returns the cookie jar with the cookie added.
pub(crate) fn set_session_cookie(jar: PrivateCookieJar, session: &Session) -> PrivateCookieJar {
    jar.add(
        Cookie::build((COOKIE_SESSION, session.token.as_str().to_owned()))
            .path("/")
            .expires(session.expires_at)
            .http_only(true)
            .same_site(SameSite::Strict)
            .secure(true),
    )
}

/// Set the session cookie to an invalid value and set its max age to zero, which should delete the cookie on the client side.
pub(crate) fn invalidate_session_cookie(jar: PrivateCookieJar) -> PrivateCookieJar {
    jar.add(
        Cookie::build((COOKIE_SESSION, "deleted"))
            .path("/")
            .expires(OffsetDateTime::UNIX_EPOCH)
            .max_age(Duration::ZERO)
            .http_only(true)
            .same_site(SameSite::Strict)
            .secure(true),
    )
}

/// Get the session token from the cookie jar, if the client sent one.
pub(crate) fn get_session_token(jar: &PrivateCookieJar) -> Option<SessionToken> {
    jar.get(COOKIE_SESSION)
        .map(|cookie| SessionToken::new_unchecked(cookie.value_trimmed()))
}
