//! Query parameter validation
//!
//! Parameters are checked against an ordered rule table. Each rule names a
//! parameter, its constraint and an optional default; the first violation
//! aborts validation and becomes the 400 message.

use thiserror::Error;

use crate::filter::{date::parse_datetime, FilterError, FilterSet};

/// Largest page the upstream API serves
pub const MAX_LIMIT: u64 = 150;

/// Largest integer a query number may hold, 2^53 - 1
pub const MAX_SAFE_INTEGER: u64 = (1 << 53) - 1;

/// Query parameter validation errors
#[derive(Debug, Error)]
pub enum ParamError {
    /// Parameter not in the rule table
    #[error("\"{0}\" is not allowed")]
    Unknown(String),

    /// Integer parameter that is not numeric at all
    #[error("\"{0}\" must be a number")]
    NotANumber(&'static str),

    /// Numeric but fractional
    #[error("\"{0}\" must be an integer")]
    NotAnInteger(&'static str),

    /// Integer beyond 2^53 - 1
    #[error("\"{0}\" must be a safe number")]
    Unsafe(&'static str),

    /// Integer under the rule's minimum
    #[error("\"{name}\" must be greater than or equal to {min}")]
    BelowMin {
        /// Parameter name
        name: &'static str,
        /// Smallest accepted value
        min: u64,
    },

    /// Integer over the rule's maximum
    #[error("\"{name}\" must be less than or equal to {max}")]
    AboveMax {
        /// Parameter name
        name: &'static str,
        /// Largest accepted value
        max: u64,
    },

    /// Not an ISO 8601 date or timestamp
    #[error("\"{0}\" must be in ISO 8601 date format")]
    NotADate(&'static str),

    /// Not `true` or `false`
    #[error("\"{0}\" must be a boolean")]
    NotABoolean(&'static str),

    /// Value outside an enumeration
    #[error("\"{name}\" must be {}", describe_allowed(.allowed))]
    NotAllowedValue {
        /// Parameter name
        name: &'static str,
        /// Accepted values
        allowed: &'static [&'static str],
    },

    /// Invalid `filters` expression
    #[error(transparent)]
    Filter(#[from] FilterError),
}

fn describe_allowed(allowed: &[&str]) -> String {
    match allowed {
        [only] => format!("[{only}]"),
        _ => format!("one of [{}]", allowed.join(", ")),
    }
}

/// Sort direction by submission time
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SortOrder {
    /// Oldest first
    #[default]
    Asc,
    /// Newest first
    Desc,
}

impl SortOrder {
    /// Wire name
    pub fn as_str(&self) -> &'static str {
        match self {
            SortOrder::Asc => "asc",
            SortOrder::Desc => "desc",
        }
    }
}

/// Validated request parameters
#[derive(Debug, Clone, PartialEq)]
pub struct QueryParams {
    /// Page size, 1 to [`MAX_LIMIT`]
    pub limit: u64,
    /// Records to skip
    pub offset: u64,
    /// Only submissions after this date, as given
    pub after_date: Option<String>,
    /// Only submissions before this date, as given
    pub before_date: Option<String>,
    /// `in_progress` when set
    pub status: Option<String>,
    /// Ask the upstream for edit links
    pub include_edit_link: Option<bool>,
    /// Submission time ordering
    pub sort: SortOrder,
    /// Parsed `filters`; `None` when the parameter was absent
    pub filters: Option<FilterSet>,
}

impl Default for QueryParams {
    fn default() -> Self {
        Self {
            limit: MAX_LIMIT,
            offset: 0,
            after_date: None,
            before_date: None,
            status: None,
            include_edit_link: None,
            sort: SortOrder::Asc,
            filters: None,
        }
    }
}

enum Constraint {
    Integer { min: u64, max: Option<u64>, set: fn(&mut QueryParams, u64) },
    IsoDate { set: fn(&mut QueryParams, String) },
    OneOf { allowed: &'static [&'static str], set: fn(&mut QueryParams, &str) },
    Boolean { set: fn(&mut QueryParams, bool) },
    Filters { set: fn(&mut QueryParams, FilterSet) },
}

struct ParamRule {
    name: &'static str,
    constraint: Constraint,
    default: Option<&'static str>,
}

static RULES: &[ParamRule] = &[
    ParamRule {
        name: "limit",
        constraint: Constraint::Integer { min: 1, max: Some(MAX_LIMIT), set: |p, v| p.limit = v },
        default: Some("150"),
    },
    ParamRule {
        name: "afterDate",
        constraint: Constraint::IsoDate { set: |p, v| p.after_date = Some(v) },
        default: None,
    },
    ParamRule {
        name: "beforeDate",
        constraint: Constraint::IsoDate { set: |p, v| p.before_date = Some(v) },
        default: None,
    },
    ParamRule {
        name: "offset",
        constraint: Constraint::Integer { min: 0, max: None, set: |p, v| p.offset = v },
        default: Some("0"),
    },
    ParamRule {
        name: "status",
        constraint: Constraint::OneOf {
            allowed: &["in_progress"],
            set: |p, v| p.status = Some(v.to_string()),
        },
        default: None,
    },
    ParamRule {
        name: "includeEditLink",
        constraint: Constraint::Boolean { set: |p, v| p.include_edit_link = Some(v) },
        default: None,
    },
    ParamRule {
        name: "sort",
        constraint: Constraint::OneOf {
            allowed: &["asc", "desc"],
            set: |p, v| p.sort = if v == "desc" { SortOrder::Desc } else { SortOrder::Asc },
        },
        default: Some("asc"),
    },
    ParamRule {
        name: "filters",
        constraint: Constraint::Filters { set: |p, v| p.filters = Some(v) },
        default: None,
    },
];

impl ParamRule {
    fn apply(&self, raw: &str, params: &mut QueryParams) -> Result<(), ParamError> {
        let name = self.name;
        match &self.constraint {
            Constraint::Integer { min, max, set } => {
                let number = raw
                    .trim()
                    .parse::<f64>()
                    .ok()
                    .filter(|n| n.is_finite())
                    .ok_or(ParamError::NotANumber(name))?;
                if number.fract() != 0.0 {
                    return Err(ParamError::NotAnInteger(name));
                }
                if number.abs() > MAX_SAFE_INTEGER as f64 {
                    return Err(ParamError::Unsafe(name));
                }
                if number < *min as f64 {
                    return Err(ParamError::BelowMin { name, min: *min });
                }
                if let Some(max) = max.filter(|max| number > *max as f64) {
                    return Err(ParamError::AboveMax { name, max });
                }
                set(params, number as u64);
            }
            Constraint::IsoDate { set } => {
                parse_datetime(raw).map_err(|_| ParamError::NotADate(name))?;
                set(params, raw.to_string());
            }
            Constraint::OneOf { allowed, set } => {
                if !allowed.contains(&raw) {
                    return Err(ParamError::NotAllowedValue { name, allowed: *allowed });
                }
                set(params, raw);
            }
            Constraint::Boolean { set } => {
                let value = if raw.eq_ignore_ascii_case("true") {
                    true
                } else if raw.eq_ignore_ascii_case("false") {
                    false
                } else {
                    return Err(ParamError::NotABoolean(name));
                };
                set(params, value);
            }
            Constraint::Filters { set } => set(params, raw.parse()?),
        }
        Ok(())
    }
}

impl QueryParams {
    /// Validate a raw query string (without the leading `?`).
    ///
    /// When a parameter is repeated the last occurrence wins.
    pub fn from_query(query: Option<&str>) -> Result<Self, ParamError> {
        let pairs: Vec<(String, String)> = query
            .map(|q| url::form_urlencoded::parse(q.as_bytes()).into_owned().collect())
            .unwrap_or_default();

        let lookup = |name: &str| {
            pairs
                .iter()
                .rev()
                .find(|(key, _)| key == name)
                .map(|(_, value)| value.as_str())
        };

        let mut params = QueryParams::default();
        for rule in RULES {
            if let Some(raw) = lookup(rule.name).or(rule.default) {
                rule.apply(raw, &mut params)?;
            }
        }

        if let Some((unknown, _)) = pairs
            .iter()
            .find(|(key, _)| !RULES.iter().any(|rule| rule.name == key.as_str()))
        {
            return Err(ParamError::Unknown(unknown.clone()));
        }

        Ok(params)
    }

    /// Parameters forwarded to the upstream submissions endpoint.
    ///
    /// Everything except `filters` is passed through.
    pub fn upstream_query(&self) -> Vec<(&'static str, String)> {
        let mut query = vec![
            ("limit", self.limit.to_string()),
            ("offset", self.offset.to_string()),
        ];
        if let Some(after) = &self.after_date {
            query.push(("afterDate", after.clone()));
        }
        if let Some(before) = &self.before_date {
            query.push(("beforeDate", before.clone()));
        }
        if let Some(status) = &self.status {
            query.push(("status", status.clone()));
        }
        if let Some(include) = self.include_edit_link {
            query.push(("includeEditLink", include.to_string()));
        }
        query.push(("sort", self.sort.as_str().to_string()));
        query
    }
}
