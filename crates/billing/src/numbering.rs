//! Invoice number format and sequence allocation.
//!
//! Format: `{prefix}-{yyyy}{mm}-{seq:04}`, e.g. `INV-202608-0007`.
//! Sequences restart at 0001 each (prefix, year, month) bucket and are
//! strictly increasing within it.

use crate::{BillingError, BillingResult};
use std::fmt;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InvoiceNumber {
    pub prefix: String,
    pub year: i32,
    pub month: u32,
    pub sequence: u32,
}

impl InvoiceNumber {
    pub fn new(prefix: impl Into<String>, year: i32, month: u32, sequence: u32) -> Self {
        Self {
            prefix: prefix.into(),
            year,
            month,
            sequence,
        }
    }

    pub fn parse(s: &str) -> BillingResult<Self> {
        let malformed = || BillingError::MalformedNumber(s.to_string());

        // The prefix itself may contain '-', so split from the right.
        let (rest, seq_part) = s.rsplit_once('-').ok_or_else(malformed)?;
        let (prefix, period_part) = rest.rsplit_once('-').ok_or_else(malformed)?;
        if prefix.is_empty() || period_part.len() != 6 || seq_part.len() != 4 {
            return Err(malformed());
        }

        let year: i32 = period_part[..4].parse().map_err(|_| malformed())?;
        let month: u32 = period_part[4..].parse().map_err(|_| malformed())?;
        let sequence: u32 = seq_part.parse().map_err(|_| malformed())?;
        if !(1..=12).contains(&month) || sequence == 0 {
            return Err(malformed());
        }

        Ok(Self {
            prefix: prefix.to_string(),
            year,
            month,
            sequence,
        })
    }

    /// The next number in a bucket: max existing sequence + 1, starting
    /// at 0001. Numbers that fail to parse or belong to other buckets
    /// are ignored.
    pub fn next_in_sequence(
        existing: &[String],
        prefix: &str,
        year: i32,
        month: u32,
    ) -> InvoiceNumber {
        let max = existing
            .iter()
            .filter_map(|n| Self::parse(n).ok())
            .filter(|n| n.prefix == prefix && n.year == year && n.month == month)
            .map(|n| n.sequence)
            .max()
            .unwrap_or(0);
        Self::new(prefix, year, month, max + 1)
    }
}

impl fmt::Display for InvoiceNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}-{:04}{:02}-{:04}",
            self.prefix, self.year, self.month, self.sequence
        )
    }
}
