//! User accounts, password hashing, server-side sessions and the pages for
//! registering, logging in and logging out.

mod cookie;
mod log_in;
mod log_out;
mod middleware;
mod password;
mod redirect;
mod register_user;
pub(crate) mod session;
pub(crate) mod user;

pub use cookie::DEFAULT_COOKIE_DURATION;
pub use log_in::{get_log_in_page, post_log_in};
pub use log_out::get_log_out;
pub use middleware::auth_guard;
pub use password::{PasswordHash, ValidatedPassword};
pub use register_user::{get_register_page, register_user};
pub use session::create_session_table;
pub use user::{
    User, UserID, create_user_table, get_user_by_id, get_user_by_username, update_password,
};

#[cfg(test)]
pub(crate) use cookie::COOKIE_SESSION;
