//! The content of a ledger report, independent of how it is drawn.

use crate::{
    Error,
    html::{format_currency, format_date},
    ledger::{Balance, Entry, EntryKind, Month, calculate_balance},
};

/// One line of a report table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportRow {
    pub date: String,
    pub description: String,
    pub money: String,
}

impl ReportRow {
    fn placeholder(kind: EntryKind) -> Self {
        Self {
            date: "-".to_owned(),
            description: format!("No {kind} entries"),
            money: "-".to_owned(),
        }
    }
}

impl From<&Entry> for ReportRow {
    fn from(entry: &Entry) -> Self {
        Self {
            date: format_date(entry.date),
            description: entry.description.clone(),
            money: format_currency(entry.amount),
        }
    }
}

/// A table of either credits or debits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportTable {
    pub kind: EntryKind,
    pub heading: &'static str,
    /// Never empty: a placeholder row stands in for an empty table.
    pub rows: Vec<ReportRow>,
}

/// The titled tables and totals that make up a ledger report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Report {
    pub title: String,
    pub credits: ReportTable,
    pub debits: ReportTable,
    /// Label and formatted value pairs, e.g. ("Total Credit", "$10.00").
    pub summary: Vec<(&'static str, String)>,
}

/// Lay out the entries of `owner_name` as a report.
///
/// `month` is added to the title if the entries were filtered to one month.
///
/// # Errors
/// Returns [Error::AmountOverflow] if the totals do not fit in a decimal.
pub fn build_report(
    owner_name: &str,
    entries: &[Entry],
    month: Option<Month>,
) -> Result<Report, Error> {
    let title = match month {
        Some(month) => format!("User: {owner_name} - {}", month.long_name()),
        None => format!("User: {owner_name}"),
    };

    let Balance {
        total_credit,
        total_debit,
        available,
    } = calculate_balance(entries)?;

    Ok(Report {
        title,
        credits: build_table(EntryKind::Credit, "Credit Entries", entries),
        debits: build_table(EntryKind::Debit, "Debit Entries", entries),
        summary: vec![
            ("Total Credit", format_currency(total_credit)),
            ("Total Debit", format_currency(total_debit)),
            ("Available Balance", format_currency(available)),
        ],
    })
}

fn build_table(kind: EntryKind, heading: &'static str, entries: &[Entry]) -> ReportTable {
    let mut rows: Vec<ReportRow> = entries
        .iter()
        .filter(|entry| entry.kind == kind)
        .map(ReportRow::from)
        .collect();

    if rows.is_empty() {
        rows.push(ReportRow::placeholder(kind));
    }

    ReportTable {
        kind,
        heading,
        rows,
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;
    use time::macros::date;

    use crate::{
        auth::UserID,
        ledger::{Entry, EntryKind},
    };

    use super::{ReportRow, build_report};

    fn entry(id: i64, kind: EntryKind, amount: i64, description: &str) -> Entry {
        Entry {
            id,
            date: date!(2025 - 02 - 14),
            kind,
            amount: Decimal::from(amount),
            description: description.to_owned(),
            user_id: UserID::new(1),
        }
    }

    fn row(date: &str, description: &str, money: &str) -> ReportRow {
        ReportRow {
            date: date.to_owned(),
            description: description.to_owned(),
            money: money.to_owned(),
        }
    }

    #[test]
    fn empty_credits_get_placeholder_row() {
        let entries = [entry(1, EntryKind::Debit, 50, "Groceries")];

        let report = build_report("Alice", &entries, None).unwrap();

        assert_eq!(report.title, "User: Alice");
        assert_eq!(report.credits.rows, [row("-", "No credit entries", "-")]);
        assert_eq!(
            report.debits.rows,
            [row("14-02-2025", "Groceries", "$50.00")]
        );
    }

    #[test]
    fn empty_ledger_has_both_placeholders_and_zero_summary() {
        let report = build_report("Alice", &[], None).unwrap();

        assert_eq!(report.credits.rows, [row("-", "No credit entries", "-")]);
        assert_eq!(report.debits.rows, [row("-", "No debit entries", "-")]);
        assert_eq!(
            report.summary,
            [
                ("Total Credit", "$0.00".to_owned()),
                ("Total Debit", "$0.00".to_owned()),
                ("Available Balance", "$0.00".to_owned()),
            ]
        );
    }

    #[test]
    fn title_includes_month() {
        let report = build_report("Alice", &[], Some("2025-02".parse().unwrap())).unwrap();

        assert_eq!(report.title, "User: Alice - February 2025");
    }

    #[test]
    fn summary_has_totals() {
        let entries = [
            entry(1, EntryKind::Credit, 1200, "Salary"),
            entry(2, EntryKind::Debit, 1500, "Rent"),
        ];

        let report = build_report("Alice", &entries, None).unwrap();

        assert_eq!(report.credits.rows.len(), 1);
        assert_eq!(report.debits.rows.len(), 1);
        assert_eq!(
            report.summary,
            [
                ("Total Credit", "$1,200.00".to_owned()),
                ("Total Debit", "$1,500.00".to_owned()),
                ("Available Balance", "-$300.00".to_owned()),
            ]
        );
    }
}
