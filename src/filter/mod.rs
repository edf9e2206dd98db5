//! Client-side filtering of submission records.
//!
//! The upstream forms API cannot filter on answer values, so clauses are
//! parsed from the `filters` query parameter and evaluated here.

pub mod clause;
pub mod date;
pub mod evaluate;

pub use clause::{parse_filters, Condition, FilterClause, FilterError, FilterSet, FilterValue};
pub use date::{parse_datetime, DateParseError};
pub use evaluate::{apply, evaluate, matches};
