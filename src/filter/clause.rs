//! Filter expression parsing and validation.
//!
//! Filters arrive as a JSON array in a single query parameter:
//!
//! ```text
//! [{"id":"fFnyxwWa3KV6nBdfBDCHEA","condition":"greater_than","value":49}]
//! ```

use std::fmt;
use std::str::FromStr;

use serde_json::{Map, Value};
use thiserror::Error;

/// Filter expression errors
#[derive(Debug, Error)]
pub enum FilterError {
    /// Not a JSON array of objects
    #[error("\"filters\" must be a valid JSON array of objects")]
    Syntax(#[source] Option<serde_json::Error>),

    /// An element of the array does not describe a valid clause
    #[error("\"filters[{index}].{key}\" {reason}")]
    Schema {
        /// Position of the clause in the array
        index: usize,
        /// Offending key
        key: String,
        /// What is wrong with it
        reason: &'static str,
    },
}

/// Comparison applied by a clause
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Condition {
    /// `equals`
    Equals,
    /// `does_not_equal`
    DoesNotEqual,
    /// `greater_than`
    GreaterThan,
    /// `less_than`
    LessThan,
}

impl Condition {
    /// Every condition, in wire order
    pub const ALL: [Condition; 4] = [
        Condition::Equals,
        Condition::DoesNotEqual,
        Condition::GreaterThan,
        Condition::LessThan,
    ];

    /// Wire name
    pub fn as_str(&self) -> &'static str {
        match self {
            Condition::Equals => "equals",
            Condition::DoesNotEqual => "does_not_equal",
            Condition::GreaterThan => "greater_than",
            Condition::LessThan => "less_than",
        }
    }
}

impl FromStr for Condition {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Condition::ALL.into_iter().find(|c| c.as_str() == s).ok_or(())
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Value a clause compares against
#[derive(Debug, Clone, PartialEq)]
pub enum FilterValue {
    /// JSON number
    Number(f64),
    /// Non-empty JSON string
    Text(String),
}

/// One user supplied predicate
#[derive(Debug, Clone, PartialEq)]
pub struct FilterClause {
    /// Question id the clause applies to
    pub id: String,
    /// Comparison to apply
    pub condition: Condition,
    /// Right-hand operand
    pub value: FilterValue,
}

impl FilterClause {
    /// Build a clause from already validated parts
    pub fn new(id: impl Into<String>, condition: Condition, value: FilterValue) -> Self {
        Self { id: id.into(), condition, value }
    }

    fn from_object(index: usize, mut object: Map<String, Value>) -> Result<Self, FilterError> {
        let schema = |key: &str, reason| FilterError::Schema { index, key: key.to_string(), reason };

        let id = match object.remove("id") {
            None => return Err(schema("id", "is required")),
            Some(Value::String(id)) if !id.is_empty() => id,
            Some(_) => return Err(schema("id", "must be a non-empty string")),
        };

        let condition = match object.remove("condition") {
            None => return Err(schema("condition", "is required")),
            Some(Value::String(c)) => c.parse::<Condition>().map_err(|_| {
                schema("condition", "must be one of [equals, does_not_equal, greater_than, less_than]")
            })?,
            Some(_) => return Err(schema("condition", "must be a string")),
        };

        let value = match object.remove("value") {
            None => return Err(schema("value", "is required")),
            Some(Value::Number(n)) => match n.as_f64() {
                Some(n) => FilterValue::Number(n),
                None => return Err(schema("value", "must be a number or a non-empty string")),
            },
            Some(Value::String(s)) if !s.is_empty() => FilterValue::Text(s),
            Some(_) => return Err(schema("value", "must be a number or a non-empty string")),
        };

        if let Some(unknown) = object.keys().next() {
            return Err(schema(unknown, "is not allowed"));
        }

        Ok(Self { id, condition, value })
    }
}

/// Ordered clauses, combined with logical AND
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilterSet(Vec<FilterClause>);

impl FilterSet {
    /// Wrap already validated clauses
    pub fn new(clauses: Vec<FilterClause>) -> Self {
        Self(clauses)
    }

    /// Clauses in request order
    pub fn clauses(&self) -> &[FilterClause] {
        &self.0
    }

    /// Number of clauses
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// True when there is nothing to filter on
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromStr for FilterSet {
    type Err = FilterError;

    /// Parse and validate a serialized filter array.
    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let elements: Vec<Value> =
            serde_json::from_str(input).map_err(|e| FilterError::Syntax(Some(e)))?;

        let clauses = elements
            .into_iter()
            .enumerate()
            .map(|(index, element)| match element {
                Value::Object(object) => FilterClause::from_object(index, object),
                _ => Err(FilterError::Syntax(None)),
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self(clauses))
    }
}

/// Parse the optional `filters` query value. Absent means no filtering.
pub fn parse_filters(input: Option<&str>) -> Result<Option<FilterSet>, FilterError> {
    input.map(str::parse::<FilterSet>).transpose()
}
