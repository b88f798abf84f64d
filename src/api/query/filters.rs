//! Filter terms and their encoding into WHERE-clause fragments

use chrono::{DateTime, SecondsFormat, Utc};

use super::query::FieldKind;
use crate::api::error::QueryError;

/// Property name that marks a raw clause passed through verbatim
pub const RAW_FILTER_PROPERTY: &str = "raw";

/// Marker that turns an equality into a `LIKE` match
pub const WILDCARD: char = '%';

#[derive(Debug, Clone, PartialEq)]
pub enum FilterTerm {
    /// Inserted into the WHERE clause as-is
    Raw(String),
    Property { property: String, value: FilterValue },
}

#[derive(Debug, Clone, PartialEq)]
pub enum FilterValue {
    String(String),
    Boolean(bool),
    Integer(i64),
    Number(f64),
    Timestamp(DateTime<Utc>),
    Null,
}

impl FilterTerm {
    /// Filter on `property`; the `raw` property yields a passthrough clause
    pub fn new(property: impl Into<String>, value: impl Into<FilterValue>) -> Self {
        let property = property.into();
        let value = value.into();
        if property == RAW_FILTER_PROPERTY {
            Self::Raw(value.to_raw())
        } else {
            Self::Property { property, value }
        }
    }

    pub fn raw(clause: impl Into<String>) -> Self {
        Self::Raw(clause.into())
    }

    pub fn property(&self) -> Option<&str> {
        match self {
            FilterTerm::Raw(_) => None,
            FilterTerm::Property { property, .. } => Some(property),
        }
    }

    /// Render one WHERE-clause fragment
    ///
    /// `kind` is the declared type of the filtered field, when known.
    pub fn to_soql(&self, kind: Option<FieldKind>) -> Result<String, QueryError> {
        let (property, value) = match self {
            FilterTerm::Raw(clause) => return Ok(clause.clone()),
            FilterTerm::Property { property, value } => (property, value),
        };

        if property.trim().is_empty() {
            return Err(QueryError::Malformed("filter term without a property".to_string()));
        }

        let fragment = match value {
            FilterValue::Boolean(b) => {
                format!("{} = {}", property, if *b { "TRUE" } else { "FALSE" })
            }
            FilterValue::Timestamp(ts) if kind == Some(FieldKind::Date) => {
                format!("{} = {}", property, iso_literal(ts))
            }
            FilterValue::String(s) if kind == Some(FieldKind::Date) => {
                format!("{} = {}", property, s)
            }
            FilterValue::String(s) if s.contains(WILDCARD) => {
                format!("{} LIKE '{}'", property, escape_like(s))
            }
            FilterValue::String(s) => format!("{} = '{}'", property, escape(s)),
            other => {
                log::warn!(
                    "No dedicated encoding for filter on {}, using the literal value",
                    property
                );
                format!("{} = {}", property, other.to_raw())
            }
        };
        Ok(fragment)
    }
}

impl FilterValue {
    /// Unquoted literal form
    fn to_raw(&self) -> String {
        match self {
            FilterValue::String(s) => s.clone(),
            FilterValue::Boolean(b) => (if *b { "TRUE" } else { "FALSE" }).to_string(),
            FilterValue::Integer(i) => i.to_string(),
            FilterValue::Number(n) => n.to_string(),
            FilterValue::Timestamp(ts) => iso_literal(ts),
            FilterValue::Null => "null".to_string(),
        }
    }
}

fn iso_literal(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Backslash-escape quotes so a value cannot terminate its literal
fn escape(value: &str) -> String {
    value.replace('\\', "\\\\").replace('\'', "\\'")
}

/// LIKE patterns keep their own backslash escapes (`\%`, `\_`); only bare
/// quotes and a trailing backslash are escaped
fn escape_like(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    let mut chars = value.chars();
    while let Some(c) = chars.next() {
        match c {
            '\\' => match chars.next() {
                Some(next) => {
                    escaped.push('\\');
                    escaped.push(next);
                }
                None => escaped.push_str("\\\\"),
            },
            '\'' => escaped.push_str("\\'"),
            other => escaped.push(other),
        }
    }
    escaped
}

/// Join the terms with `AND`; `None` when there is nothing to filter on
pub fn where_clause<F>(terms: &[FilterTerm], kind_of: F) -> Result<Option<String>, QueryError>
where
    F: Fn(&str) -> Option<FieldKind>,
{
    if terms.is_empty() {
        return Ok(None);
    }

    let fragments = terms
        .iter()
        .map(|term| term.to_soql(term.property().and_then(&kind_of)))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(Some(fragments.join(" AND ")))
}

impl From<String> for FilterValue {
    fn from(value: String) -> Self {
        FilterValue::String(value)
    }
}

impl From<&str> for FilterValue {
    fn from(value: &str) -> Self {
        FilterValue::String(value.to_string())
    }
}

impl From<bool> for FilterValue {
    fn from(value: bool) -> Self {
        FilterValue::Boolean(value)
    }
}

impl From<i64> for FilterValue {
    fn from(value: i64) -> Self {
        FilterValue::Integer(value)
    }
}

impl From<i32> for FilterValue {
    fn from(value: i32) -> Self {
        FilterValue::Integer(value as i64)
    }
}

impl From<f64> for FilterValue {
    fn from(value: f64) -> Self {
        FilterValue::Number(value)
    }
}

impl From<DateTime<Utc>> for FilterValue {
    fn from(value: DateTime<Utc>) -> Self {
        FilterValue::Timestamp(value)
    }
}
