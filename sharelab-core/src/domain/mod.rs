//! Domain types: price records and validated queries.

pub mod price;
pub mod query;

pub use price::PriceRecord;
pub use query::{Query, ValidationError, MAX_RANGE_DAYS};
