//! The ledger of credit and debit entries, the dashboard that displays it and
//! the handlers that change it.

mod balance;
mod core;
mod create_endpoint;
mod dashboard;
mod delete_endpoint;
mod month_endpoint;

pub use balance::{Balance, calculate_balance};
pub use core::{Entry, EntryKind, LedgerFilter, Month, create_entry_table, list_entries};
pub use create_endpoint::{add_credit_endpoint, add_debit_endpoint, add_entry_endpoint};
pub use dashboard::{MonthQuery, get_dashboard_page};
pub(crate) use dashboard::parse_return_month;
pub use delete_endpoint::{delete_credit_endpoint, delete_debit_endpoint, delete_entry_endpoint};
pub use month_endpoint::set_month_endpoint;

#[cfg(test)]
pub(crate) use core::{Amount, NewEntry, count_entries, create_entry};
