//! The dashboard page: the user's totals, the form for adding entries and the
//! credit and debit tables.

use std::sync::{Arc, Mutex};

use axum::{
    Extension,
    extract::{FromRef, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use maud::{Markup, html};
use rusqlite::Connection;
use serde::Deserialize;

use crate::{
    AppState, Error,
    auth::{UserID, get_user_by_id},
    endpoints::{self, format_endpoint},
    html::{
        BUTTON_DELETE_STYLE, BUTTON_PRIMARY_STYLE, FORM_ERROR_STYLE, FORM_LABEL_STYLE,
        FORM_TEXT_INPUT_STYLE, LINK_STYLE, PAGE_CONTAINER_STYLE, TABLE_AMOUNT_CELL_STYLE,
        TABLE_CELL_STYLE, TABLE_HEADER_STYLE, TABLE_ROW_STYLE, TABLE_STYLE, base, format_currency,
        format_date,
    },
    ledger::{
        balance::Balance,
        core::{Entry, EntryKind, LedgerFilter, Month, list_entries, sum_entries},
    },
};

/// The state needed for displaying the dashboard and adding entries.
#[derive(Debug, Clone)]
pub struct DashboardState {
    /// The database connection for managing entries.
    pub db_connection: Arc<Mutex<Connection>>,
    /// The local timezone as a canonical timezone name, e.g. "Pacific/Auckland".
    pub local_timezone: String,
}

impl FromRef<AppState> for DashboardState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
            local_timezone: state.local_timezone.clone(),
        }
    }
}

/// The query parameters for the dashboard.
#[derive(Debug, Default, Deserialize)]
pub struct MonthQuery {
    /// Only show entries from this month, written as `YYYY-MM`.
    pub month: Option<String>,
}

/// Error messages to show next to the dashboard forms.
#[derive(Debug, Default)]
pub(crate) struct FormErrors<'a> {
    pub entry_type: Option<&'a str>,
    pub amount: Option<&'a str>,
    pub month: Option<&'a str>,
}

impl FormErrors<'_> {
    fn is_empty(&self) -> bool {
        self.entry_type.is_none() && self.amount.is_none() && self.month.is_none()
    }
}

/// Values to put back into the add entry form after a failed submission.
#[derive(Debug, Default)]
pub(crate) struct EntryFormValues<'a> {
    pub kind: Option<EntryKind>,
    pub amount: &'a str,
    pub description: &'a str,
}

/// The URL of the dashboard showing `month`, or all entries if `month` is `None`.
pub(crate) fn dashboard_url(month: Option<Month>) -> String {
    match month {
        Some(month) => format!("{}?month={month}", endpoints::ROOT),
        None => endpoints::ROOT.to_owned(),
    }
}

/// Parse the month that a form should return the user to.
///
/// An empty or malformed month falls back to showing all entries.
pub(crate) fn parse_return_month(raw_month: Option<&str>) -> Option<Month> {
    let raw_month = raw_month.map(str::trim).filter(|month| !month.is_empty())?;

    raw_month
        .parse()
        .inspect_err(|error| tracing::warn!("Ignoring return month: {error}"))
        .ok()
}

/// Display the dashboard for the logged-in user.
///
/// A malformed `month` query shows all entries along with an error message.
pub async fn get_dashboard_page(
    State(state): State<DashboardState>,
    Extension(user_id): Extension<UserID>,
    Query(query): Query<MonthQuery>,
) -> Result<Response, Error> {
    let raw_month = query.month.as_deref().map(str::trim).unwrap_or_default();
    let (month, month_error) = match raw_month {
        "" => (None, None),
        raw_month => match raw_month.parse::<Month>() {
            Ok(month) => (Some(month), None),
            Err(error) => {
                tracing::debug!("Invalid month in dashboard query: {error}");
                (None, Some(INVALID_MONTH_ERROR_MSG))
            }
        },
    };

    let errors = FormErrors {
        month: month_error,
        ..Default::default()
    };

    render_dashboard(&state, user_id, month, errors, EntryFormValues::default())
}

pub(crate) const INVALID_MONTH_ERROR_MSG: &str = "Month must be in the format YYYY-MM.";

/// Render the dashboard page for `user_id`, optionally filtered to `month`.
///
/// Responds with "422 Unprocessable Entity" if there are any `errors` to show.
pub(crate) fn render_dashboard(
    state: &DashboardState,
    user_id: UserID,
    month: Option<Month>,
    errors: FormErrors,
    values: EntryFormValues,
) -> Result<Response, Error> {
    let (user, entries, balance) = {
        let connection = state
            .db_connection
            .lock()
            .inspect_err(|error| tracing::error!("could not acquire database lock: {error}"))
            .map_err(|_| Error::DatabaseLockError)?;

        let filter = LedgerFilter {
            owner: user_id,
            month,
        };
        let user = get_user_by_id(user_id, &connection)?;
        let entries = list_entries(&filter, &connection)?;
        let balance = sum_entries(&filter, &connection)?;

        (user, entries, balance)
    };

    let status = if errors.is_empty() {
        StatusCode::OK
    } else {
        StatusCode::UNPROCESSABLE_ENTITY
    };

    let (credits, debits): (Vec<Entry>, Vec<Entry>) = entries
        .into_iter()
        .partition(|entry| entry.kind == EntryKind::Credit);

    let content = dashboard_view(
        user.display_name(),
        month,
        &balance,
        &credits,
        &debits,
        &errors,
        &values,
    );

    Ok((status, base("Dashboard", &content)).into_response())
}

fn dashboard_view(
    display_name: &str,
    month: Option<Month>,
    balance: &Balance,
    credits: &[Entry],
    debits: &[Entry],
    errors: &FormErrors,
    values: &EntryFormValues,
) -> Markup {
    let pdf_url = match month {
        Some(month) => format!("{}?month={month}", endpoints::DOWNLOAD_PDF),
        None => endpoints::DOWNLOAD_PDF.to_owned(),
    };

    html! {
        div class=(PAGE_CONTAINER_STYLE)
        {
            header class="page-header"
            {
                h1 { "Welcome, " (display_name) }

                nav
                {
                    a href=(pdf_url) class=(LINK_STYLE) id="download-pdf" { "Download PDF" }
                    " "
                    a href=(endpoints::LOG_OUT) class=(LINK_STYLE) id="log-out" { "Log out" }
                }
            }

            (summary_view(month, balance))

            div class="forms"
            {
                (add_entry_form(month, errors, values))
                (month_form(month, errors.month))
            }

            (entry_table("Credits", "credits", EntryKind::Credit, credits, month))
            (entry_table("Debits", "debits", EntryKind::Debit, debits, month))
        }
    }
}

fn summary_view(month: Option<Month>, balance: &Balance) -> Markup {
    let scope = match month {
        Some(month) => month.long_name(),
        None => "All time".to_owned(),
    };

    html! {
        section class="summary" id="summary"
        {
            h2 { (scope) }

            dl
            {
                div class="summary-item"
                {
                    dt { "Total Credit" }
                    dd id="total-credit" { (format_currency(balance.total_credit)) }
                }
                div class="summary-item"
                {
                    dt { "Total Debit" }
                    dd id="total-debit" { (format_currency(balance.total_debit)) }
                }
                div class="summary-item"
                {
                    dt { "Available Balance" }
                    dd id="available-balance" { (format_currency(balance.available)) }
                }
            }
        }
    }
}

fn add_entry_form(month: Option<Month>, errors: &FormErrors, values: &EntryFormValues) -> Markup {
    let selected_kind = values.kind.unwrap_or(EntryKind::Credit);

    html! {
        form method="post" action=(endpoints::DASHBOARD_VIEW) class="form" id="add-entry"
        {
            h2 { "Add Entry" }

            @if let Some(month) = month {
                input type="hidden" name="month" value=(month);
            }

            div
            {
                label for="entry_type" class=(FORM_LABEL_STYLE) { "Type" }

                select name="entry_type" id="entry_type" class=(FORM_TEXT_INPUT_STYLE)
                {
                    @for kind in [EntryKind::Credit, EntryKind::Debit] {
                        option value=(kind.as_str()) selected[kind == selected_kind]
                        {
                            @match kind {
                                EntryKind::Credit => "Credit",
                                EntryKind::Debit => "Debit",
                            }
                        }
                    }
                }

                @if let Some(error_message) = errors.entry_type {
                    p class=(FORM_ERROR_STYLE) { (error_message) }
                }
            }

            div
            {
                label for="amount" class=(FORM_LABEL_STYLE) { "Amount" }

                input
                    type="text"
                    inputmode="decimal"
                    name="amount"
                    id="amount"
                    placeholder="0.00"
                    class=(FORM_TEXT_INPUT_STYLE)
                    value=(values.amount)
                    required;

                @if let Some(error_message) = errors.amount {
                    p class=(FORM_ERROR_STYLE) { (error_message) }
                }
            }

            div
            {
                label for="description" class=(FORM_LABEL_STYLE) { "Description" }

                input
                    type="text"
                    name="description"
                    id="description"
                    class=(FORM_TEXT_INPUT_STYLE)
                    value=(values.description);
            }

            button type="submit" class=(BUTTON_PRIMARY_STYLE) { "Add" }
        }
    }
}

fn month_form(month: Option<Month>, error_message: Option<&str>) -> Markup {
    let month_value = month.map(|month| month.to_string()).unwrap_or_default();

    html! {
        form method="post" action=(endpoints::SET_MONTH) class="form" id="select-month"
        {
            h2 { "Select Month" }

            div
            {
                label for="month" class=(FORM_LABEL_STYLE) { "Month" }

                input
                    type="month"
                    name="month"
                    id="month"
                    class=(FORM_TEXT_INPUT_STYLE)
                    value=(month_value);

                @if let Some(error_message) = error_message {
                    p class=(FORM_ERROR_STYLE) { (error_message) }
                }
            }

            button type="submit" class=(BUTTON_PRIMARY_STYLE) { "Show" }

            @if month.is_some() {
                a href=(endpoints::ROOT) class=(LINK_STYLE) { "Show all entries" }
            }
        }
    }
}

fn entry_table(
    title: &str,
    id: &str,
    kind: EntryKind,
    entries: &[Entry],
    month: Option<Month>,
) -> Markup {
    let delete_endpoint = match kind {
        EntryKind::Credit => endpoints::DELETE_CREDIT,
        EntryKind::Debit => endpoints::DELETE_DEBIT,
    };

    html! {
        section class="entries"
        {
            h2 { (title) }

            table class=(TABLE_STYLE) id=(id)
            {
                thead class=(TABLE_HEADER_STYLE)
                {
                    tr
                    {
                        th scope="col" class=(TABLE_CELL_STYLE) { "Date" }
                        th scope="col" class=(TABLE_CELL_STYLE) { "Description" }
                        th scope="col" class=(TABLE_AMOUNT_CELL_STYLE) { "Amount" }
                        th scope="col" class=(TABLE_CELL_STYLE) { span class="sr-only" { "Actions" } }
                    }
                }

                tbody
                {
                    @for entry in entries {
                        tr class=(TABLE_ROW_STYLE)
                        {
                            td class=(TABLE_CELL_STYLE) { (format_date(entry.date)) }
                            td class=(TABLE_CELL_STYLE) { (entry.description) }
                            td class=(TABLE_AMOUNT_CELL_STYLE) { (format_currency(entry.amount)) }
                            td class=(TABLE_CELL_STYLE)
                            {
                                form
                                    method="post"
                                    action=(format_endpoint(delete_endpoint, entry.id))
                                {
                                    @if let Some(month) = month {
                                        input type="hidden" name="month" value=(month);
                                    }

                                    button type="submit" class=(BUTTON_DELETE_STYLE) { "Delete" }
                                }
                            }
                        }
                    }

                    @if entries.is_empty() {
                        tr class=(TABLE_ROW_STYLE)
                        {
                            td colspan="4" class=(TABLE_CELL_STYLE)
                            {
                                "No " (kind) " entries"
                            }
                        }
                    }
                }
            }
        }
    }
}
