//! Totals derived from a set of ledger entries.

use rust_decimal::Decimal;

use crate::{
    Error,
    ledger::core::{Entry, EntryKind},
};

/// The credit and debit totals of a set of entries and the difference between them.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Balance {
    /// The sum of all credit amounts.
    pub total_credit: Decimal,
    /// The sum of all debit amounts.
    pub total_debit: Decimal,
    /// Total credit minus total debit, negative if more went out than came in.
    pub available: Decimal,
}

impl Balance {
    /// Add an entry's amount to the totals.
    ///
    /// # Errors
    /// Returns [Error::AmountOverflow] if a total no longer fits in a decimal.
    /// The totals are left unchanged in that case.
    pub fn add(&mut self, kind: EntryKind, amount: Decimal) -> Result<(), Error> {
        let (total_credit, total_debit) = match kind {
            EntryKind::Credit => (self.total_credit.checked_add(amount), Some(self.total_debit)),
            EntryKind::Debit => (Some(self.total_credit), self.total_debit.checked_add(amount)),
        };

        let (Some(total_credit), Some(total_debit)) = (total_credit, total_debit) else {
            return Err(Error::AmountOverflow);
        };
        let available = total_credit
            .checked_sub(total_debit)
            .ok_or(Error::AmountOverflow)?;

        *self = Self {
            total_credit,
            total_debit,
            available,
        };

        Ok(())
    }
}

/// Work out the totals for `entries`.
///
/// An empty set of entries has all totals equal to zero.
///
/// # Errors
/// Returns [Error::AmountOverflow] if a total does not fit in a decimal.
pub fn calculate_balance(entries: &[Entry]) -> Result<Balance, Error> {
    entries
        .iter()
        .try_fold(Balance::default(), |mut balance, entry| {
            balance.add(entry.kind, entry.amount)?;
            Ok(balance)
        })
}
