//! Server-side sessions that map an opaque token to a logged-in user.
//!
//! The token is the only thing stored in the client's cookie, so logging out
//! (deleting the session row) revokes access even if the cookie is kept.

use std::fmt::Display;

use rusqlite::{Connection, Row};
use time::{Duration, OffsetDateTime};
use uuid::Uuid;

use crate::{Error, auth::UserID};

/// An opaque, randomly generated session identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionToken(String);

impl SessionToken {
    /// Generate a new random token.
    pub fn generate() -> Self {
        Self(Uuid::new_v4().simple().to_string())
    }

    /// Wrap a token read back from a cookie.
    pub fn new_unchecked(raw_token: &str) -> Self {
        Self(raw_token.to_owned())
    }

    /// The token as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for SessionToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Only show a prefix so tokens do not end up in logs.
        let prefix: String = self.0.chars().take(6).collect();
        write!(f, "{prefix}…")
    }
}

/// A logged-in user's session.
#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    pub token: SessionToken,
    pub user_id: UserID,
    pub expires_at: OffsetDateTime,
}

/// Create the session table.
///
/// # Errors
///
/// This function will return an error if the SQL query failed.
pub fn create_session_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS session (
                token TEXT PRIMARY KEY,
                user_id INTEGER NOT NULL,
                expires_at TEXT NOT NULL,
                FOREIGN KEY(user_id) REFERENCES user(id) ON UPDATE CASCADE ON DELETE CASCADE
                )",
        (),
    )?;

    Ok(())
}

/// Start a new session for `user_id` that expires `duration` from now.
///
/// # Errors
///
/// Returns an [Error::SqlError] if the session could not be stored, e.g. the
/// user does not exist.
pub fn create_session(
    user_id: UserID,
    duration: Duration,
    connection: &Connection,
) -> Result<Session, Error> {
    let session = Session {
        token: SessionToken::generate(),
        user_id,
        expires_at: OffsetDateTime::now_utc() + duration,
    };

    connection.execute(
        "INSERT INTO session (token, user_id, expires_at) VALUES (?1, ?2, ?3)",
        (
            session.token.as_str(),
            session.user_id.as_i64(),
            session.expires_at,
        ),
    )?;

    Ok(session)
}

/// Look up the session for `token`, checking that it has not expired at `now`.
///
/// Expired sessions are deleted when they are found.
///
/// # Errors
///
/// Returns a:
/// - [Error::NotFound] if there is no session with `token`,
/// - [Error::SessionExpired] if the session expired,
/// - or [Error::SqlError] if some other SQL related error occurred.
pub fn get_active_session(
    token: &SessionToken,
    now: OffsetDateTime,
    connection: &Connection,
) -> Result<Session, Error> {
    let session = connection
        .prepare("SELECT token, user_id, expires_at FROM session WHERE token = :token")?
        .query_row(&[(":token", &token.as_str())], map_session_row)?;

    if session.expires_at <= now {
        delete_session(token, connection)?;
        return Err(Error::SessionExpired);
    }

    Ok(session)
}

/// Set the expiry of the session with `token`.
///
/// # Errors
///
/// Returns a [Error::NotFound] if there is no session with `token`.
pub fn set_session_expiry(
    token: &SessionToken,
    expires_at: OffsetDateTime,
    connection: &Connection,
) -> Result<(), Error> {
    let rows_affected = connection.execute(
        "UPDATE session SET expires_at = ?1 WHERE token = ?2",
        (expires_at, token.as_str()),
    )?;

    match rows_affected {
        0 => Err(Error::NotFound),
        _ => Ok(()),
    }
}

/// Remove the session with `token`, returning the number of sessions removed.
///
/// Removing a session that does not exist is not an error.
pub fn delete_session(token: &SessionToken, connection: &Connection) -> Result<usize, Error> {
    connection
        .execute("DELETE FROM session WHERE token = ?1", (token.as_str(),))
        .map_err(|error| error.into())
}

/// Get the number of stored sessions.
#[cfg(test)]
pub fn count_sessions(connection: &Connection) -> Result<usize, Error> {
    connection
        .query_row("SELECT COUNT(token) FROM session;", [], |row| row.get(0))
        .map_err(|error| error.into())
}

fn map_session_row(row: &Row) -> Result<Session, rusqlite::Error> {
    let raw_token: String = row.get(0)?;

    Ok(Session {
        token: SessionToken(raw_token),
        user_id: UserID::new(row.get(1)?),
        expires_at: row.get(2)?,
    })
}

#[cfg(test)]
mod session_tests {
    use rusqlite::Connection;
    use time::{Duration, OffsetDateTime};

    use crate::{
        Error,
        auth::{PasswordHash, User, user::create_user},
        db::initialize,
    };

    use super::{
        SessionToken, count_sessions, create_session, delete_session, get_active_session,
        set_session_expiry,
    };

    fn get_connection_and_user() -> (Connection, User) {
        let connection = Connection::open_in_memory().unwrap();
        initialize(&connection).unwrap();
        let user = create_user(
            "Test",
            "test",
            PasswordHash::new_unchecked("hunter2"),
            &connection,
        )
        .unwrap();

        (connection, user)
    }

    #[test]
    fn generated_tokens_are_unique() {
        assert_ne!(SessionToken::generate(), SessionToken::generate());
    }

    #[test]
    fn display_hides_most_of_the_token() {
        let token = SessionToken::new_unchecked("0123456789abcdef");

        assert_eq!(token.to_string(), "012345…");
    }

    #[test]
    fn create_then_get_session() {
        let (connection, user) = get_connection_and_user();

        let session = create_session(user.id, Duration::minutes(5), &connection).unwrap();
        let got = get_active_session(&session.token, OffsetDateTime::now_utc(), &connection)
            .unwrap();

        assert_eq!(got.user_id, user.id);
        assert_eq!(got.token, session.token);
        assert_eq!(got.expires_at, session.expires_at);
    }

    #[test]
    fn create_session_fails_for_missing_user() {
        let (connection, user) = get_connection_and_user();
        let missing_user = crate::auth::UserID::new(user.id.as_i64() + 1);

        let result = create_session(missing_user, Duration::minutes(5), &connection);

        assert!(matches!(result, Err(Error::SqlError(_))));
    }

    #[test]
    fn unknown_token_is_not_found() {
        let (connection, _) = get_connection_and_user();

        let result = get_active_session(
            &SessionToken::new_unchecked("nope"),
            OffsetDateTime::now_utc(),
            &connection,
        );

        assert_eq!(result, Err(Error::NotFound));
    }

    #[test]
    fn expired_session_is_rejected_and_removed() {
        let (connection, user) = get_connection_and_user();
        let session = create_session(user.id, Duration::minutes(5), &connection).unwrap();

        let later = OffsetDateTime::now_utc() + Duration::minutes(6);
        let result = get_active_session(&session.token, later, &connection);

        assert_eq!(result, Err(Error::SessionExpired));
        assert_eq!(count_sessions(&connection), Ok(0));
    }

    #[test]
    fn set_expiry_extends_session() {
        let (connection, user) = get_connection_and_user();
        let session = create_session(user.id, Duration::minutes(5), &connection).unwrap();
        let new_expiry = session.expires_at + Duration::hours(1);

        set_session_expiry(&session.token, new_expiry, &connection).unwrap();

        let later = OffsetDateTime::now_utc() + Duration::minutes(30);
        let got = get_active_session(&session.token, later, &connection).unwrap();
        assert_eq!(got.expires_at, new_expiry);
    }

    #[test]
    fn delete_session_is_idempotent() {
        let (connection, user) = get_connection_and_user();
        let session = create_session(user.id, Duration::minutes(5), &connection).unwrap();

        assert_eq!(delete_session(&session.token, &connection), Ok(1));
        assert_eq!(delete_session(&session.token, &connection), Ok(0));
    }
}
