//! Handlers for deleting entries from the dashboard.

use std::sync::{Arc, Mutex};

use axum::{
    Extension,
    extract::{FromRef, Path, State},
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::extract::Form;
use rusqlite::Connection;
use serde::{Deserialize, Serialize};

use crate::{
    AppState, Error,
    auth::UserID,
    ledger::{
        core::{EntryId, EntryKind, delete_entry},
        dashboard::{dashboard_url, parse_return_month},
    },
};

/// The state needed to delete an entry.
#[derive(Debug, Clone)]
pub struct DeleteEntryState {
    /// The database connection for managing entries.
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for DeleteEntryState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

/// The month to go back to after deleting an entry.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct DeleteEntryForm {
    pub month: Option<String>,
}

/// Delete a credit owned by the current user.
pub async fn delete_credit_endpoint(
    State(state): State<DeleteEntryState>,
    Extension(user_id): Extension<UserID>,
    Path(entry_id): Path<EntryId>,
    Form(form): Form<DeleteEntryForm>,
) -> Response {
    delete_and_redirect(&state, user_id, entry_id, Some(EntryKind::Credit), &form)
}

/// Delete a debit owned by the current user.
pub async fn delete_debit_endpoint(
    State(state): State<DeleteEntryState>,
    Extension(user_id): Extension<UserID>,
    Path(entry_id): Path<EntryId>,
    Form(form): Form<DeleteEntryForm>,
) -> Response {
    delete_and_redirect(&state, user_id, entry_id, Some(EntryKind::Debit), &form)
}

/// Delete an entry of either kind owned by the current user.
pub async fn delete_entry_endpoint(
    State(state): State<DeleteEntryState>,
    Extension(user_id): Extension<UserID>,
    Path(entry_id): Path<EntryId>,
    Form(form): Form<DeleteEntryForm>,
) -> Response {
    delete_and_redirect(&state, user_id, entry_id, None, &form)
}

/// Deleting an entry that does not exist, or that belongs to someone else,
/// leaves the ledger as it is and still redirects back to the dashboard.
fn delete_and_redirect(
    state: &DeleteEntryState,
    user_id: UserID,
    entry_id: EntryId,
    kind: Option<EntryKind>,
    form: &DeleteEntryForm,
) -> Response {
    let result = match state.db_connection.lock() {
        Ok(connection) => delete_entry(entry_id, user_id, kind, &connection),
        Err(error) => {
            tracing::error!("could not acquire database lock: {error}");
            return Error::DatabaseLockError.into_response();
        }
    };

    match result {
        Ok(0) => {
            tracing::debug!("User {user_id} tried to delete entry {entry_id} but it was not found")
        }
        Ok(_) => tracing::debug!("User {user_id} deleted entry {entry_id}"),
        Err(error) => {
            tracing::error!("Could not delete entry {entry_id}: {error}");
            return error.into_response();
        }
    }

    Redirect::to(&dashboard_url(parse_return_month(form.month.as_deref()))).into_response()
}
