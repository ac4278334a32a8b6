use std::sync::{Arc, Mutex};

use axum::{
    Extension,
    extract::{FromRef, Query, State},
    http::header::{CONTENT_DISPOSITION, CONTENT_TYPE},
    response::{IntoResponse, Response},
};
use rusqlite::Connection;

use crate::{
    AppState, Error,
    auth::{UserID, get_user_by_id},
    ledger::{LedgerFilter, MonthQuery, list_entries, parse_return_month},
    report::{build_report, render_pdf},
};

/// The state needed to export a user's ledger.
#[derive(Debug, Clone)]
pub struct ReportState {
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for ReportState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

/// Download the current user's ledger as a PDF attachment.
///
/// Only the entries from `month` are included if it is given.
pub async fn download_pdf(
    State(state): State<ReportState>,
    Extension(user_id): Extension<UserID>,
    Query(query): Query<MonthQuery>,
) -> Result<Response, Error> {
    let month = parse_return_month(query.month.as_deref());

    let (user, entries) = {
        let connection = state
            .db_connection
            .lock()
            .inspect_err(|error| tracing::error!("could not acquire database lock: {error}"))
            .map_err(|_| Error::DatabaseLockError)?;

        let filter = LedgerFilter {
            owner: user_id,
            month,
        };

        (
            get_user_by_id(user_id, &connection)?,
            list_entries(&filter, &connection)?,
        )
    };

    let report = build_report(user.display_name(), &entries, month)?;
    let pdf = render_pdf(&report)?;

    tracing::debug!(
        "Generated report for user {user_id} with {} entries ({} bytes)",
        entries.len(),
        pdf.len()
    );

    Ok((
        [
            (CONTENT_TYPE, "application/pdf"),
            (
                CONTENT_DISPOSITION,
                "attachment; filename=\"finance_report.pdf\"",
            ),
        ],
        pdf,
    )
        .into_response())
}
