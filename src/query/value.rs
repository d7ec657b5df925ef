//! # Filter Values
//!
//! Scalar and list values accepted by filters, plus date normalization.

use std::fmt;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde_json::Value;

/// Date-only input formats, tried in order
const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d", "%Y%m%d", "%m/%d/%Y"];

/// Date-time input formats (without offset), tried in order
const DATETIME_FORMATS: &[&str] = &["%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S"];

/// A single filter value
#[derive(Debug, Clone, PartialEq)]
pub enum Scalar {
    Text(String),
    Integer(i64),
    Float(f64),
    Bool(bool),
    Date(NaiveDate),
    DateTime(NaiveDateTime),
}

impl Scalar {
    /// Interprets the value as a calendar date.
    ///
    /// The time of day is discarded; range rendering replaces it with the
    /// start or end of the day.
    pub fn to_date(&self) -> Option<NaiveDate> {
        match self {
            Scalar::Date(d) => Some(*d),
            Scalar::DateTime(dt) => Some(dt.date()),
            Scalar::Text(s) => parse_date(s),
            Scalar::Integer(n) => parse_date(&n.to_string()),
            Scalar::Float(_) | Scalar::Bool(_) => None,
        }
    }
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scalar::Text(s) => write!(f, "{}", s),
            Scalar::Integer(n) => write!(f, "{}", n),
            Scalar::Float(n) => write!(f, "{}", n),
            Scalar::Bool(b) => write!(f, "{}", b),
            Scalar::Date(d) => write!(f, "{}", d.format("%Y-%m-%d")),
            Scalar::DateTime(dt) => write!(f, "{}", dt.format("%Y-%m-%dT%H:%M:%S")),
        }
    }
}

/// Parses a date from any of the accepted string formats
pub fn parse_date(text: &str) -> Option<NaiveDate> {
    let text = text.trim();

    for format in DATE_FORMATS {
        if let Ok(d) = NaiveDate::parse_from_str(text, format) {
            return Some(d);
        }
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt.naive_local().date());
    }

    DATETIME_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(text, format).ok())
        .map(|dt| dt.date())
}

/// A filter value: one scalar, or a list of scalars.
///
/// On a date field a two-element list is an inclusive `[start, end]` range.
/// On any other field a list is an OR-set.
#[derive(Debug, Clone, PartialEq)]
pub enum FilterValue {
    Scalar(Scalar),
    List(Vec<Scalar>),
}

impl FilterValue {
    pub fn is_list(&self) -> bool {
        matches!(self, FilterValue::List(_))
    }

    /// Returns the scalar, if this is not a list
    pub fn as_scalar(&self) -> Option<&Scalar> {
        match self {
            FilterValue::Scalar(s) => Some(s),
            FilterValue::List(_) => None,
        }
    }

    /// Returns the text if this is a single string value
    pub fn as_text(&self) -> Option<&str> {
        match self {
            FilterValue::Scalar(Scalar::Text(s)) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for FilterValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FilterValue::Scalar(s) => write!(f, "{}", s),
            FilterValue::List(items) => {
                let parts: Vec<String> = items.iter().map(|s| s.to_string()).collect();
                write!(f, "[{}]", parts.join(", "))
            }
        }
    }
}

impl From<&str> for Scalar {
    fn from(s: &str) -> Self {
        Scalar::Text(s.to_string())
    }
}

impl From<String> for Scalar {
    fn from(s: String) -> Self {
        Scalar::Text(s)
    }
}

impl From<i64> for Scalar {
    fn from(n: i64) -> Self {
        Scalar::Integer(n)
    }
}

impl From<i32> for Scalar {
    fn from(n: i32) -> Self {
        Scalar::Integer(n.into())
    }
}

impl From<u32> for Scalar {
    fn from(n: u32) -> Self {
        Scalar::Integer(n.into())
    }
}

impl From<f64> for Scalar {
    fn from(n: f64) -> Self {
        Scalar::Float(n)
    }
}

impl From<bool> for Scalar {
    fn from(b: bool) -> Self {
        Scalar::Bool(b)
    }
}

impl From<NaiveDate> for Scalar {
    fn from(d: NaiveDate) -> Self {
        Scalar::Date(d)
    }
}

impl From<NaiveDateTime> for Scalar {
    fn from(dt: NaiveDateTime) -> Self {
        Scalar::DateTime(dt)
    }
}

impl From<DateTime<Utc>> for Scalar {
    fn from(dt: DateTime<Utc>) -> Self {
        Scalar::DateTime(dt.naive_utc())
    }
}

macro_rules! scalar_filter_value {
    ($($ty:ty),* $(,)?) => {
        $(
            impl From<$ty> for FilterValue {
                fn from(value: $ty) -> Self {
                    FilterValue::Scalar(value.into())
                }
            }
        )*
    };
}

scalar_filter_value!(
    &str,
    String,
    i64,
    i32,
    u32,
    f64,
    bool,
    NaiveDate,
    NaiveDateTime,
    DateTime<Utc>,
    Scalar,
);

impl<T: Into<Scalar>> From<Vec<T>> for FilterValue {
    fn from(values: Vec<T>) -> Self {
        FilterValue::List(values.into_iter().map(Into::into).collect())
    }
}

impl<A: Into<Scalar>, B: Into<Scalar>> From<(A, B)> for FilterValue {
    fn from((start, end): (A, B)) -> Self {
        FilterValue::List(vec![start.into(), end.into()])
    }
}

impl<T: Into<Scalar>, const N: usize> From<[T; N]> for FilterValue {
    fn from(values: [T; N]) -> Self {
        FilterValue::List(values.into_iter().map(Into::into).collect())
    }
}

/// Conversion from JSON, used for filters read from requests
impl TryFrom<Value> for FilterValue {
    type Error = String;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        match value {
            Value::Array(items) => items
                .into_iter()
                .map(scalar_from_json)
                .collect::<Result<Vec<_>, _>>()
                .map(FilterValue::List),
            other => scalar_from_json(other).map(FilterValue::Scalar),
        }
    }
}

fn scalar_from_json(value: Value) -> Result<Scalar, String> {
    match value {
        Value::String(s) => Ok(Scalar::Text(s)),
        Value::Bool(b) => Ok(Scalar::Bool(b)),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Ok(Scalar::Integer(i))
            } else if let Some(f) = n.as_f64() {
                Ok(Scalar::Float(f))
            } else {
                Err(format!("unsupported number: {}", n))
            }
        }
        Value::Null => Err("null is not a filter value".to_string()),
        Value::Array(_) => Err("nested lists are not filter values".to_string()),
        Value::Object(_) => Err("objects are not filter values".to_string()),
    }
}
