use rusqlite::Connection;

use crate::{
    auth::{PasswordHash, User, user::create_user},
    db::initialize,
};

/// An in-memory database with all the application tables.
pub(crate) fn get_test_connection() -> Connection {
    let connection =
        Connection::open_in_memory().expect("Could not open in-memory SQLite database");
    initialize(&connection).expect("Could not create tables");

    connection
}

/// Insert a user whose password is `password`, hashed with the minimum cost to
/// keep tests fast.
pub(crate) fn insert_test_user(
    name: &str,
    username: &str,
    password: &str,
    connection: &Connection,
) -> User {
    let password_hash = PasswordHash::from_raw_password(password, 4)
        .expect("Could not hash test password");

    create_user(name, username, password_hash, connection).expect("Could not create test user")
}
