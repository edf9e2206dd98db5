//! Predicate evaluation against submission records.
//!
//! Evaluation is total: a missing question, a value of the wrong shape, an
//! unparseable date or a record that cannot be read at all is a non-match,
//! never an error.

use std::cmp::Ordering;

use serde_json::Value;

use super::clause::{Condition, FilterClause, FilterSet, FilterValue};
use super::date::parse_datetime;
use crate::models::{FieldCategory, FieldValue, FormResponse, Question};

/// Decide whether a single clause matches a record.
///
/// A record without the referenced question never matches, whatever the
/// condition. In particular `does_not_equal` is `false` for a missing
/// question rather than vacuously `true`.
pub fn evaluate(record: &FormResponse, clause: &FilterClause) -> bool {
    let Some(question) = record.question(&clause.id) else {
        return false;
    };

    match clause.condition {
        Condition::Equals => values_equal(question.value.as_ref(), &clause.value),
        Condition::DoesNotEqual => !values_equal(question.value.as_ref(), &clause.value),
        Condition::GreaterThan => compare(question, &clause.value) == Some(Ordering::Greater),
        Condition::LessThan => compare(question, &clause.value) == Some(Ordering::Less),
    }
}

/// Whether a record satisfies every clause of the set
pub fn matches(record: &FormResponse, filters: &FilterSet) -> bool {
    filters.clauses().iter().all(|clause| evaluate(record, clause))
}

/// Keep the raw upstream records matching all clauses, in their original
/// order. Kept records are returned untouched.
///
/// Each record is read on its own; one that is not a submission object only
/// fails to match, unless there are no clauses at all.
pub fn apply(mut records: Vec<Value>, filters: &FilterSet) -> Vec<Value> {
    if filters.is_empty() {
        return records;
    }
    records.retain(|raw| match FormResponse::from_raw(raw) {
        Ok(record) => matches(&record, filters),
        Err(err) => {
            tracing::debug!(error = %err, "skipping unreadable submission record");
            false
        }
    });
    records
}

// Strict equality with no coercion between numbers and strings.
fn values_equal(field: Option<&FieldValue>, expected: &FilterValue) -> bool {
    match (field, expected) {
        (Some(FieldValue::Number(n)), FilterValue::Number(expected)) => n.as_f64() == Some(*expected),
        (Some(FieldValue::Text(s)), FilterValue::Text(expected)) => s == expected,
        _ => false,
    }
}

// The question's type tag selects exactly one gate. A numeric question is
// never compared as a date and vice versa.
fn compare(question: &Question, expected: &FilterValue) -> Option<Ordering> {
    let value = question.value.as_ref()?;

    match question.field_type.category() {
        FieldCategory::Numeric => match expected {
            FilterValue::Number(expected) => value.as_f64()?.partial_cmp(expected),
            FilterValue::Text(_) => None,
        },
        FieldCategory::DateTime => match expected {
            FilterValue::Text(expected) => {
                let actual = parse_datetime(value.as_str()?).ok()?;
                let expected = parse_datetime(expected).ok()?;
                Some(actual.cmp(&expected))
            }
            FilterValue::Number(_) => None,
        },
        _ => None,
    }
}
