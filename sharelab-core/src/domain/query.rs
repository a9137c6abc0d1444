//! Validated price query.
//!
//! A `Query` can only be obtained through [`Query::new`], so every value in
//! circulation already satisfies the range rules below.

use std::fmt::{Display, Formatter};

use chrono::NaiveDate;
use thiserror::Error;

/// Maximum span between `from` and `to`, in days (roughly two years).
pub const MAX_RANGE_DAYS: i64 = 730;

/// Reasons a (symbol, from, to) triple is rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("'from' date {from} must not be after 'to' date {to}")]
    InvalidRange { from: NaiveDate, to: NaiveDate },

    #[error("date range must not exceed {max} days (requested {days} days)", max = MAX_RANGE_DAYS)]
    RangeTooLarge { days: i64 },

    #[error("ticker symbol must not be empty")]
    EmptySymbol,
}

/// Symbol and inclusive date range for a price lookup.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Query {
    symbol: String,
    from: NaiveDate,
    to: NaiveDate,
}

impl Query {
    /// Normalize the symbol (trimmed, uppercase) and check the date range.
    pub fn new(symbol: &str, from: NaiveDate, to: NaiveDate) -> Result<Self, ValidationError> {
        let symbol = symbol.trim().to_uppercase();
        if symbol.is_empty() {
            return Err(ValidationError::EmptySymbol);
        }
        if from > to {
            return Err(ValidationError::InvalidRange { from, to });
        }
        let days = (to - from).num_days();
        if days > MAX_RANGE_DAYS {
            return Err(ValidationError::RangeTooLarge { days });
        }
        Ok(Self { symbol, from, to })
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn from(&self) -> NaiveDate {
        self.from
    }

    pub fn to(&self) -> NaiveDate {
        self.to
    }

    /// Whether `date` falls inside `[from, to]`.
    pub fn contains(&self, date: NaiveDate) -> bool {
        self.from <= date && date <= self.to
    }

    /// Number of days between `from` and `to` (0 for a single-day query).
    pub fn span_days(&self) -> i64 {
        (self.to - self.from).num_days()
    }
}

impl Display for Query {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} [{} .. {}]", self.symbol, self.from, self.to)
    }
}
