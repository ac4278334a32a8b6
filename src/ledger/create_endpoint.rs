//! Handlers for recording new credits and debits.

use axum::{
    Extension,
    extract::State,
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::extract::Form;
use serde::{Deserialize, Serialize};

use crate::{
    Error,
    auth::UserID,
    ledger::{
        core::{Amount, EntryKind, NewEntry, create_entry},
        dashboard::{
            DashboardState, EntryFormValues, FormErrors, dashboard_url, parse_return_month,
            render_dashboard,
        },
    },
    timezone::today,
};

pub(crate) const INVALID_AMOUNT_ERROR_MSG: &str = "Amount must be a number.";
pub(crate) const NEGATIVE_AMOUNT_ERROR_MSG: &str = "Amount must not be negative.";
pub(crate) const AMOUNT_TOO_LARGE_ERROR_MSG: &str =
    "Amount must not be more than $1,000,000,000,000.00.";
pub(crate) const INVALID_ENTRY_TYPE_ERROR_MSG: &str = "Entry type must be credit or debit.";

/// The form data for a new entry.
#[derive(Debug, Serialize, Deserialize)]
pub struct EntryForm {
    /// "credit" or "debit". Ignored by the credit and debit routes.
    pub entry_type: Option<String>,
    /// The amount as typed by the user.
    pub amount: String,
    #[serde(default)]
    pub description: String,
    /// The month the dashboard was showing, so the user is sent back to it.
    pub month: Option<String>,
}

/// Record an entry whose kind is given by the `entry_type` field.
pub async fn add_entry_endpoint(
    State(state): State<DashboardState>,
    Extension(user_id): Extension<UserID>,
    Form(form): Form<EntryForm>,
) -> Response {
    let raw_kind = form.entry_type.as_deref().unwrap_or_default();

    match raw_kind.parse::<EntryKind>() {
        Ok(kind) => add_entry(&state, user_id, kind, &form),
        Err(error) => {
            tracing::debug!("Rejected new entry: {error}");
            reject_entry(
                &state,
                user_id,
                &form,
                None,
                FormErrors {
                    entry_type: Some(INVALID_ENTRY_TYPE_ERROR_MSG),
                    ..Default::default()
                },
            )
        }
    }
}

/// Record a credit.
pub async fn add_credit_endpoint(
    State(state): State<DashboardState>,
    Extension(user_id): Extension<UserID>,
    Form(form): Form<EntryForm>,
) -> Response {
    add_entry(&state, user_id, EntryKind::Credit, &form)
}

/// Record a debit.
pub async fn add_debit_endpoint(
    State(state): State<DashboardState>,
    Extension(user_id): Extension<UserID>,
    Form(form): Form<EntryForm>,
) -> Response {
    add_entry(&state, user_id, EntryKind::Debit, &form)
}

/// Validate the form and store a new entry dated today.
///
/// Invalid amounts redisplay the dashboard with an error and nothing is stored.
fn add_entry(
    state: &DashboardState,
    user_id: UserID,
    kind: EntryKind,
    form: &EntryForm,
) -> Response {
    let amount = match Amount::parse(&form.amount) {
        Ok(amount) => amount,
        Err(error) => {
            tracing::debug!("Rejected new entry: {error}");
            let message = match error {
                Error::NegativeAmount => NEGATIVE_AMOUNT_ERROR_MSG,
                Error::AmountTooLarge => AMOUNT_TOO_LARGE_ERROR_MSG,
                _ => INVALID_AMOUNT_ERROR_MSG,
            };

            return reject_entry(
                state,
                user_id,
                form,
                Some(kind),
                FormErrors {
                    amount: Some(message),
                    ..Default::default()
                },
            );
        }
    };

    let date = match today(&state.local_timezone) {
        Ok(date) => date,
        Err(error) => return error.into_response(),
    };

    let new_entry = NewEntry {
        date,
        kind,
        amount,
        description: form.description.trim().to_owned(),
        user_id,
    };

    let result = match state.db_connection.lock() {
        Ok(connection) => create_entry(new_entry, &connection),
        Err(error) => {
            tracing::error!("could not acquire database lock: {error}");
            return Error::DatabaseLockError.into_response();
        }
    };

    match result {
        Ok(entry) => {
            tracing::debug!("User {user_id} added {} entry {}", entry.kind, entry.id);
            Redirect::to(&dashboard_url(parse_return_month(form.month.as_deref())))
                .into_response()
        }
        Err(error) => {
            tracing::error!("Could not create entry for user {user_id}: {error}");
            error.into_response()
        }
    }
}

fn reject_entry(
    state: &DashboardState,
    user_id: UserID,
    form: &EntryForm,
    kind: Option<EntryKind>,
    errors: FormErrors,
) -> Response {
    let month = parse_return_month(form.month.as_deref());
    let values = EntryFormValues {
        kind,
        amount: &form.amount,
        description: &form.description,
    };

    render_dashboard(state, user_id, month, errors, values)
        .unwrap_or_else(IntoResponse::into_response)
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use axum::{Extension, Router, http::StatusCode, routing::post};
    use axum_test::TestServer;
    use rust_decimal::Decimal;
    use time::OffsetDateTime;

    use crate::{
        auth::UserID,
        endpoints,
        ledger::{
            core::{EntryKind, LedgerFilter, count_entries, list_entries},
            dashboard::DashboardState,
        },
        test_utils::{get_test_connection, insert_test_user},
    };

    use super::{
        AMOUNT_TOO_LARGE_ERROR_MSG, INVALID_AMOUNT_ERROR_MSG, INVALID_ENTRY_TYPE_ERROR_MSG,
        NEGATIVE_AMOUNT_ERROR_MSG, add_credit_endpoint, add_debit_endpoint, add_entry_endpoint,
    };

    fn get_state_and_user() -> (DashboardState, UserID) {
        let connection = get_test_connection();
        let user = insert_test_user("Alice", "alice", "averysafeandsecurepassword", &connection);

        (
            DashboardState {
                db_connection: Arc::new(Mutex::new(connection)),
                local_timezone: "Etc/UTC".to_owned(),
            },
            user.id,
        )
    }

    fn get_test_server(state: DashboardState, user_id: UserID) -> TestServer {
        let app = Router::new()
            .route(endpoints::DASHBOARD_VIEW, post(add_entry_endpoint))
            .route(endpoints::CREDIT, post(add_credit_endpoint))
            .route(endpoints::DEBIT, post(add_debit_endpoint))
            .layer(Extension(user_id))
            .with_state(state);

        TestServer::try_new(app).expect("Could not create test server.")
    }

    fn count(state: &DashboardState) -> usize {
        count_entries(&state.db_connection.lock().unwrap()).unwrap()
    }

    #[tokio::test]
    async fn adds_credit_dated_today() {
        let (state, user_id) = get_state_and_user();
        let server = get_test_server(state.clone(), user_id);

        let response = server
            .post(endpoints::DASHBOARD_VIEW)
            .form(&[
                ("entry_type", "credit"),
                ("amount", "100.00"),
                ("description", "Salary"),
            ])
            .await;

        response.assert_status_see_other();
        assert_eq!(response.header("location"), endpoints::ROOT);

        let entries = list_entries(
            &LedgerFilter {
                owner: user_id,
                month: None,
            },
            &state.db_connection.lock().unwrap(),
        )
        .unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].kind, EntryKind::Credit);
        assert_eq!(entries[0].amount, Decimal::from(100));
        assert_eq!(entries[0].description, "Salary");
        assert_eq!(entries[0].date, OffsetDateTime::now_utc().date());
        assert_eq!(entries[0].user_id, user_id);
    }

    #[tokio::test]
    async fn redirects_back_to_month() {
        let (state, user_id) = get_state_and_user();
        let server = get_test_server(state, user_id);

        let response = server
            .post(endpoints::DEBIT)
            .form(&[("amount", "5"), ("month", "2025-02")])
            .await;

        response.assert_status_see_other();
        assert_eq!(response.header("location"), "/?month=2025-02");
    }

    #[tokio::test]
    async fn credit_and_debit_routes_set_kind() {
        let (state, user_id) = get_state_and_user();
        let server = get_test_server(state.clone(), user_id);

        server
            .post(endpoints::CREDIT)
            .form(&[("amount", "10"), ("entry_type", "debit")])
            .await
            .assert_status_see_other();
        server
            .post(endpoints::DEBIT)
            .form(&[("amount", "4")])
            .await
            .assert_status_see_other();

        let entries = list_entries(
            &LedgerFilter {
                owner: user_id,
                month: None,
            },
            &state.db_connection.lock().unwrap(),
        )
        .unwrap();
        let kinds: Vec<EntryKind> = entries.iter().map(|entry| entry.kind).collect();
        assert_eq!(kinds, [EntryKind::Debit, EntryKind::Credit]);
    }

    #[tokio::test]
    async fn non_numeric_amount_is_rejected() {
        let (state, user_id) = get_state_and_user();
        let server = get_test_server(state.clone(), user_id);

        let response = server
            .post(endpoints::DASHBOARD_VIEW)
            .form(&[("entry_type", "credit"), ("amount", "abc")])
            .await;

        response.assert_status(StatusCode::UNPROCESSABLE_ENTITY);
        response.assert_text_contains(INVALID_AMOUNT_ERROR_MSG);
        assert_eq!(count(&state), 0);
    }

    #[tokio::test]
    async fn negative_amount_is_rejected() {
        let (state, user_id) = get_state_and_user();
        let server = get_test_server(state.clone(), user_id);

        let response = server
            .post(endpoints::DEBIT)
            .form(&[("amount", "-5")])
            .await;

        response.assert_status(StatusCode::UNPROCESSABLE_ENTITY);
        response.assert_text_contains(NEGATIVE_AMOUNT_ERROR_MSG);
        assert_eq!(count(&state), 0);
    }

    #[tokio::test]
    async fn unknown_entry_type_is_rejected() {
        let (state, user_id) = get_state_and_user();
        let server = get_test_server(state.clone(), user_id);

        let response = server
            .post(endpoints::DASHBOARD_VIEW)
            .form(&[("entry_type", "transfer"), ("amount", "5")])
            .await;

        response.assert_status(StatusCode::UNPROCESSABLE_ENTITY);
        response.assert_text_contains(INVALID_ENTRY_TYPE_ERROR_MSG);
        assert_eq!(count(&state), 0);
    }

    #[tokio::test]
    async fn zero_amount_is_allowed() {
        let (state, user_id) = get_state_and_user();
        let server = get_test_server(state.clone(), user_id);

        server
            .post(endpoints::CREDIT)
            .form(&[("amount", "0")])
            .await
            .assert_status_see_other();

        assert_eq!(count(&state), 1);
    }

    #[tokio::test]
    async fn amount_above_maximum_is_rejected() {
        let (state, user_id) = get_state_and_user();
        let server = get_test_server(state.clone(), user_id);

        let response = server
            .post(endpoints::CREDIT)
            .form(&[("amount", "79228162514264337593543950335")])
            .await;

        response.assert_status(StatusCode::UNPROCESSABLE_ENTITY);
        response.assert_text_contains(AMOUNT_TOO_LARGE_ERROR_MSG);
        assert_eq!(count(&state), 0);
    }
}
