//! Handler for choosing which month the dashboard shows.

use axum::{
    Extension,
    extract::State,
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::extract::Form;
use serde::{Deserialize, Serialize};

use crate::{
    auth::UserID,
    ledger::{
        core::Month,
        dashboard::{
            DashboardState, EntryFormValues, FormErrors, INVALID_MONTH_ERROR_MSG, dashboard_url,
            render_dashboard,
        },
    },
};

#[derive(Debug, Serialize, Deserialize)]
pub struct MonthForm {
    /// The month to show as `YYYY-MM`, or nothing to show all entries.
    pub month: Option<String>,
}

/// Redirect to the dashboard for the selected month.
///
/// An empty month clears the filter. A malformed month redisplays the
/// dashboard with an error.
pub async fn set_month_endpoint(
    State(state): State<DashboardState>,
    Extension(user_id): Extension<UserID>,
    Form(form): Form<MonthForm>,
) -> Response {
    let raw_month = form.month.as_deref().map(str::trim).unwrap_or_default();

    if raw_month.is_empty() {
        return Redirect::to(&dashboard_url(None)).into_response();
    }

    match raw_month.parse::<Month>() {
        Ok(month) => Redirect::to(&dashboard_url(Some(month))).into_response(),
        Err(error) => {
            tracing::debug!("Rejected month selection: {error}");
            render_dashboard(
                &state,
                user_id,
                None,
                FormErrors {
                    month: Some(INVALID_MONTH_ERROR_MSG),
                    ..Default::default()
                },
                EntryFormValues::default(),
            )
            .unwrap_or_else(IntoResponse::into_response)
        }
    }
}
