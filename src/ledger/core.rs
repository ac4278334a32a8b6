//! Defines the core data models and database queries for ledger entries.

use std::{fmt::Display, str::FromStr};

use rusqlite::{
    Connection, Row,
    types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef},
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use time::Date;

use crate::{Error, auth::UserID, ledger::balance::Balance};

// ============================================================================
// MODELS
// ============================================================================

/// The database ID of a ledger entry.
pub type EntryId = i64;

/// Whether an entry adds to or takes away from the available balance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    /// Money coming in.
    Credit,
    /// Money going out.
    Debit,
}

impl EntryKind {
    /// The name of the kind as stored in the database and used in forms.
    pub fn as_str(&self) -> &'static str {
        match self {
            EntryKind::Credit => "credit",
            EntryKind::Debit => "debit",
        }
    }
}

impl FromStr for EntryKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "credit" => Ok(EntryKind::Credit),
            "debit" => Ok(EntryKind::Debit),
            other => Err(Error::InvalidEntryType(other.to_owned())),
        }
    }
}

impl Display for EntryKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl ToSql for EntryKind {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

impl FromSql for EntryKind {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        value
            .as_str()?
            .parse()
            .map_err(|error: Error| FromSqlError::Other(Box::new(error)))
    }
}

/// A non-negative amount of money no larger than [Amount::max].
///
/// Amounts are kept as exact decimals and stored as text so that no precision
/// is lost between the form, the database and the totals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Amount(Decimal);

impl Amount {
    /// The largest amount a single entry may hold, one trillion.
    ///
    /// Totals of bounded amounts stay far below [Decimal::MAX].
    pub fn max() -> Decimal {
        Decimal::from(1_000_000_000_000_i64)
    }

    /// Parse an amount entered by a user, e.g. "12.50".
    ///
    /// Surrounding whitespace is ignored and scientific notation ("1e3") is
    /// accepted.
    ///
    /// # Errors
    /// Returns a:
    /// - [Error::InvalidAmount] if `raw_amount` is not a number,
    /// - [Error::NegativeAmount] if the number is less than zero,
    /// - or [Error::AmountTooLarge] if the number is more than [Amount::max].
    pub fn parse(raw_amount: &str) -> Result<Self, Error> {
        let trimmed = raw_amount.trim();
        let amount = Decimal::from_str(trimmed)
            .or_else(|_| Decimal::from_scientific(trimmed))
            .map_err(|_| Error::InvalidAmount(raw_amount.to_owned()))?;

        Self::new(amount)
    }

    /// Wrap `amount`, checking that it is not negative or too large.
    ///
    /// # Errors
    /// Returns [Error::NegativeAmount] if `amount` is less than zero and
    /// [Error::AmountTooLarge] if it is more than [Amount::max].
    pub fn new(amount: Decimal) -> Result<Self, Error> {
        if amount.is_sign_negative() && !amount.is_zero() {
            return Err(Error::NegativeAmount);
        }

        if amount > Self::max() {
            return Err(Error::AmountTooLarge);
        }

        Ok(Self(amount.abs()))
    }

    /// The amount as a decimal number.
    pub fn value(&self) -> Decimal {
        self.0
    }
}

impl Display for Amount {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

impl ToSql for Amount {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.0.to_string()))
    }
}

impl FromSql for Amount {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        let text = value.as_str()?;

        Decimal::from_str(text)
            .map_err(|error| FromSqlError::Other(Box::new(error)))
            .and_then(|amount| {
                Amount::new(amount).map_err(|error| FromSqlError::Other(Box::new(error)))
            })
    }
}

/// A calendar month used to group entries, written as `YYYY-MM`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Month {
    year: i32,
    month: time::Month,
}

impl Month {
    /// The month that `date` falls in.
    pub fn containing(date: Date) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
        }
    }

    /// The month in words, e.g. "February 2025".
    pub fn long_name(&self) -> String {
        format!("{} {}", self.month, self.year)
    }
}

impl FromStr for Month {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || Error::InvalidMonth(s.to_owned());
        let trimmed = s.trim();

        let (year, month) = trimmed.split_once('-').ok_or_else(invalid)?;
        if year.len() != 4 || month.len() != 2 {
            return Err(invalid());
        }
        if !year.bytes().chain(month.bytes()).all(|b| b.is_ascii_digit()) {
            return Err(invalid());
        }

        let year: i32 = year.parse().map_err(|_| invalid())?;
        let month: u8 = month.parse().map_err(|_| invalid())?;
        let month = time::Month::try_from(month).map_err(|_| invalid())?;

        Ok(Self { year, month })
    }
}

impl Display for Month {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month as u8)
    }
}

/// A credit or debit recorded in a user's ledger.
#[derive(Debug, Clone, PartialEq)]
pub struct Entry {
    /// The ID of the entry.
    pub id: EntryId,
    /// The day the entry was recorded.
    pub date: Date,
    /// Whether the entry is a credit or a debit.
    pub kind: EntryKind,
    /// The amount of money, always non-negative.
    pub amount: Decimal,
    /// A text description of what the entry was for, may be empty.
    pub description: String,
    /// The user who owns the entry.
    pub user_id: UserID,
}

/// The data needed to record a new entry.
#[derive(Debug, Clone, PartialEq)]
pub struct NewEntry {
    pub date: Date,
    pub kind: EntryKind,
    pub amount: Amount,
    pub description: String,
    pub user_id: UserID,
}

/// Selects the entries of one user, optionally limited to a single month.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LedgerFilter {
    pub owner: UserID,
    pub month: Option<Month>,
}

// ============================================================================
// DATABASE FUNCTIONS
// ============================================================================

/// Create the entry table in the database.
///
/// # Errors
/// Returns an error if the table cannot be created or if there is an SQL error.
pub fn create_entry_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS entry (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                date TEXT NOT NULL,
                kind TEXT NOT NULL CHECK (kind IN ('credit', 'debit')),
                amount TEXT NOT NULL,
                description TEXT NOT NULL DEFAULT '',
                user_id INTEGER NOT NULL,
                FOREIGN KEY(user_id) REFERENCES user(id) ON UPDATE CASCADE ON DELETE CASCADE
                )",
        (),
    )?;

    // Every query is scoped by owner and sorted by date.
    connection.execute(
        "CREATE INDEX IF NOT EXISTS idx_entry_user_date ON entry(user_id, date);",
        (),
    )?;

    Ok(())
}

/// Record a new entry in the database.
///
/// # Errors
/// Returns an [Error::SqlError] if the entry could not be stored, e.g. the
/// owner does not exist.
pub fn create_entry(new_entry: NewEntry, connection: &Connection) -> Result<Entry, Error> {
    let entry = connection
        .prepare(
            "INSERT INTO entry (date, kind, amount, description, user_id)
             VALUES (?1, ?2, ?3, ?4, ?5)
             RETURNING id, date, kind, amount, description, user_id",
        )?
        .query_row(
            (
                new_entry.date,
                new_entry.kind,
                new_entry.amount,
                new_entry.description,
                new_entry.user_id.as_i64(),
            ),
            map_entry_row,
        )?;

    Ok(entry)
}

/// Get the entries selected by `filter`, newest first.
///
/// Entries on the same day are ordered by ID, newest first.
///
/// # Errors
/// Returns an [Error::SqlError] if there is an SQL error.
pub fn list_entries(filter: &LedgerFilter, connection: &Connection) -> Result<Vec<Entry>, Error> {
    let month = filter.month.map(|month| month.to_string());

    connection
        .prepare(
            "SELECT id, date, kind, amount, description, user_id FROM entry
             WHERE user_id = :user_id
               AND (:month IS NULL OR strftime('%Y-%m', date) = :month)
             ORDER BY date DESC, id DESC",
        )?
        .query_map(
            rusqlite::named_params! {
                ":user_id": filter.owner.as_i64(),
                ":month": month,
            },
            map_entry_row,
        )?
        .map(|maybe_entry| maybe_entry.map_err(Error::from))
        .collect()
}

/// Get the credit and debit totals of the entries selected by `filter`.
///
/// The totals are added up as exact decimals rather than in SQL.
///
/// # Errors
/// Returns an [Error::SqlError] if there is an SQL error or
/// [Error::AmountOverflow] if a total does not fit in a decimal.
pub fn sum_entries(filter: &LedgerFilter, connection: &Connection) -> Result<Balance, Error> {
    let month = filter.month.map(|month| month.to_string());

    let mut statement = connection.prepare(
        "SELECT kind, amount FROM entry
         WHERE user_id = :user_id
           AND (:month IS NULL OR strftime('%Y-%m', date) = :month)",
    )?;
    let rows = statement.query_map(
        rusqlite::named_params! {
            ":user_id": filter.owner.as_i64(),
            ":month": month,
        },
        |row| Ok((row.get::<_, EntryKind>(0)?, row.get::<_, Amount>(1)?)),
    )?;

    let mut balance = Balance::default();
    for row in rows {
        let (kind, amount) = row?;
        balance.add(kind, amount.value())?;
    }

    Ok(balance)
}

type RowsAffected = usize;

/// Delete the entry with `id` if it belongs to `owner`.
///
/// If `kind` is given, the entry is only deleted if it is of that kind.
/// Deleting an entry that does not exist, or belongs to another user, deletes
/// nothing and is not an error.
///
/// # Errors
/// Returns an [Error::SqlError] if there is an SQL error.
pub fn delete_entry(
    id: EntryId,
    owner: UserID,
    kind: Option<EntryKind>,
    connection: &Connection,
) -> Result<RowsAffected, Error> {
    connection
        .execute(
            "DELETE FROM entry WHERE id = ?1 AND user_id = ?2 AND (?3 IS NULL OR kind = ?3)",
            (id, owner.as_i64(), kind),
        )
        .map_err(|err| err.into())
}

/// Get the total number of entries in the database.
///
/// # Errors
/// This function will return a [Error::SqlError] there is some SQL error.
#[cfg(test)]
pub fn count_entries(connection: &Connection) -> Result<usize, Error> {
    connection
        .query_row("SELECT COUNT(id) FROM entry;", [], |row| row.get(0))
        .map_err(|error| error.into())
}

/// Map a database row to an [Entry].
fn map_entry_row(row: &Row) -> Result<Entry, rusqlite::Error> {
    let amount: Amount = row.get(3)?;

    Ok(Entry {
        id: row.get(0)?,
        date: row.get(1)?,
        kind: row.get(2)?,
        amount: amount.value(),
        description: row.get(4)?,
        user_id: UserID::new(row.get(5)?),
    })
}

// ============================================================================
// TESTS
// ============================================================================
