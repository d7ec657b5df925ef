//! # Filter Mapping
//!
//! The caller-facing filter criteria and sort tokens, before compilation.

use serde_json::Value;

use super::errors::{QueryError, QueryResult};
use super::value::FilterValue;
use crate::fields::{Field, FieldRegistry};

/// Reserved key whose value is sent to the backend verbatim
pub const RAW_QUERY_KEY: &str = "query";

/// Marker for descending sort tokens
pub const DESCENDING_PREFIX: char = '-';

/// Ordered filter mapping.
///
/// Keys keep their first-insertion position; inserting an existing key
/// replaces its value in place.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Filter {
    entries: Vec<(String, FilterValue)>,
}

impl Filter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert
    pub fn with(mut self, key: impl Into<String>, value: impl Into<FilterValue>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<FilterValue>) {
        let key = key.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((key, value)),
        }
    }

    pub fn get(&self, key: &str) -> Option<&FilterValue> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &FilterValue)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The raw query escape hatch, if present
    pub fn raw_query(&self) -> Option<&FilterValue> {
        self.get(RAW_QUERY_KEY)
    }

    /// Checks every key against the registry.
    ///
    /// With a raw `query` present every other key is ignored, so nothing
    /// is checked.
    pub fn validate(&self, registry: &dyn FieldRegistry) -> QueryResult<()> {
        if self.raw_query().is_some() {
            return Ok(());
        }
        for (key, _) in self.iter() {
            if key == RAW_QUERY_KEY {
                continue;
            }
            registry.resolve(key)?;
        }
        Ok(())
    }

    /// Builds a filter from a JSON object (keys in map iteration order)
    pub fn from_json(value: &Value) -> QueryResult<Self> {
        let object = value
            .as_object()
            .ok_or_else(|| QueryError::invalid_filter("filter", "must be a JSON object"))?;

        let mut filter = Filter::new();
        for (key, value) in object {
            let value = FilterValue::try_from(value.clone())
                .map_err(|reason| QueryError::invalid_filter(key.as_str(), reason))?;
            filter.insert(key.clone(), value);
        }
        Ok(filter)
    }
}

impl<K: Into<String>, V: Into<FilterValue>> FromIterator<(K, V)> for Filter {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut filter = Filter::new();
        for (k, v) in iter {
            filter.insert(k, v);
        }
        filter
    }
}

/// Sort direction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Asc,
    Desc,
}

impl SortDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortDirection::Asc => "asc",
            SortDirection::Desc => "desc",
        }
    }
}

/// A resolved sort token
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SortSpec {
    pub field: Field,
    pub direction: SortDirection,
}

impl SortSpec {
    /// Parses a sort token (`"filing_date"` or `"-filing_date"`).
    ///
    /// Sort tokens never carry operator suffixes.
    pub fn parse(token: &str, registry: &dyn FieldRegistry) -> QueryResult<Self> {
        let (name, direction) = match token.strip_prefix(DESCENDING_PREFIX) {
            Some(rest) => (rest, SortDirection::Desc),
            None => (token, SortDirection::Asc),
        };

        let field = registry
            .lookup(name)
            .ok_or_else(|| QueryError::unknown_field(token))?;

        Ok(Self { field, direction })
    }

    /// Renders `<field> asc` / `<field> desc`
    pub fn render(&self) -> String {
        format!("{} {}", self.field.canonical(), self.direction.as_str())
    }
}
