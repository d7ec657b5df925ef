//! # Date Range Merging
//!
//! Collapses date filter entries into one range clause per field.
//!
//! Entries arrive in three shapes:
//! - `field__gte=A` / `field__lte=B`: one explicit bound each
//! - `field=[A, B]`: both bounds at once
//! - `field=A`: the whole calendar day A
//!
//! Bounds for the same field are always paired into a single
//! `[lower TO upper]` clause, with `*` standing in for a missing side.

use std::fmt;

use chrono::NaiveDate;

use super::errors::{QueryError, QueryResult};
use super::value::{FilterValue, Scalar};
use crate::fields::{split_operator, Field, FieldRegistry};

/// Backend rendering of a lower bound (start of day)
const START_OF_DAY_FORMAT: &str = "%Y-%m-%dT00:00:00Z";

/// Backend rendering of an upper bound (end of day)
const END_OF_DAY_FORMAT: &str = "%Y-%m-%dT23:59:59Z";

/// Marker for an open range side
pub const UNBOUNDED: &str = "*";

/// Operator attached to a date bound
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoundOp {
    Gte,
    Lte,
    Exact,
}

impl BoundOp {
    /// Parses an operator suffix. Only `gte` and `lte` may be written
    /// explicitly; `exact` is implied by a bare scalar.
    pub fn from_suffix(suffix: &str) -> Option<Self> {
        match suffix {
            "gte" => Some(BoundOp::Gte),
            "lte" => Some(BoundOp::Lte),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            BoundOp::Gte => "gte",
            BoundOp::Lte => "lte",
            BoundOp::Exact => "exact",
        }
    }
}

/// A normalized point-in-time bound for one field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateBound {
    pub field: Field,
    pub op: BoundOp,
    pub date: NaiveDate,
}

/// One side of a rendered range
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RangeEnd {
    Unbounded,
    Date(NaiveDate),
}

/// A merged `[lower TO upper]` clause
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RangeClause {
    pub field: Field,
    pub lower: RangeEnd,
    pub upper: RangeEnd,
}

impl RangeClause {
    /// Lower bound as sent to the backend
    pub fn render_lower(&self) -> String {
        match self.lower {
            RangeEnd::Unbounded => UNBOUNDED.to_string(),
            RangeEnd::Date(d) => d.format(START_OF_DAY_FORMAT).to_string(),
        }
    }

    /// Upper bound as sent to the backend
    pub fn render_upper(&self) -> String {
        match self.upper {
            RangeEnd::Unbounded => UNBOUNDED.to_string(),
            RangeEnd::Date(d) => d.format(END_OF_DAY_FORMAT).to_string(),
        }
    }
}

impl fmt::Display for RangeClause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:[{} TO {}]",
            self.field.canonical(),
            self.render_lower(),
            self.render_upper()
        )
    }
}

/// Turns date filter entries into bounds, then bounds into range clauses.
pub struct RangeMerger<'a> {
    registry: &'a dyn FieldRegistry,
}

impl<'a> RangeMerger<'a> {
    pub fn new(registry: &'a dyn FieldRegistry) -> Self {
        Self { registry }
    }

    /// Normalizes one `(key, value)` entry into one or two bounds
    pub fn bounds(&self, key: &str, value: &FilterValue) -> QueryResult<Vec<DateBound>> {
        let field = self.registry.resolve(key)?;
        let (_, ops) = split_operator(key);

        if ops.len() > 1 {
            return Err(QueryError::invalid_filter(
                key,
                "cannot have more than one operator",
            ));
        }

        match (ops.first(), value) {
            (Some(suffix), FilterValue::Scalar(scalar)) => {
                let op = BoundOp::from_suffix(suffix).ok_or_else(|| {
                    QueryError::invalid_filter(key, format!("invalid operator: {}", suffix))
                })?;
                Ok(vec![DateBound {
                    field,
                    op,
                    date: to_date(key, scalar)?,
                }])
            }
            (Some(suffix), FilterValue::List(_)) => {
                // Report a bad operator before the list conflict
                if BoundOp::from_suffix(suffix).is_none() {
                    return Err(QueryError::invalid_filter(
                        key,
                        format!("invalid operator: {}", suffix),
                    ));
                }
                Err(QueryError::invalid_filter(
                    key,
                    format!("cannot have multiple values with operator {}", suffix),
                ))
            }
            (None, FilterValue::List(items)) => match items.as_slice() {
                [start, end] => Ok(vec![
                    DateBound {
                        field,
                        op: BoundOp::Gte,
                        date: to_date(key, start)?,
                    },
                    DateBound {
                        field,
                        op: BoundOp::Lte,
                        date: to_date(key, end)?,
                    },
                ]),
                _ => Err(QueryError::invalid_filter(
                    key,
                    format!(
                        "a date range must have length 2 (start, end), got {}",
                        items.len()
                    ),
                )),
            },
            (None, FilterValue::Scalar(scalar)) => Ok(vec![DateBound {
                field,
                op: BoundOp::Exact,
                date: to_date(key, scalar)?,
            }]),
        }
    }

    /// Merges every entry into one clause per field, in first-appearance order.
    ///
    /// When a field receives several lower (or upper) bounds the tightest
    /// one wins. A field whose bounds leave an empty interval is rejected.
    pub fn merge<'k, I>(&self, entries: I) -> QueryResult<Vec<RangeClause>>
    where
        I: IntoIterator<Item = (&'k str, &'k FilterValue)>,
    {
        let mut clauses: Vec<(RangeClause, &'k str)> = Vec::new();

        for (key, value) in entries {
            for bound in self.bounds(key, value)? {
                let index = match clauses.iter().position(|(c, _)| c.field == bound.field) {
                    Some(index) => index,
                    None => {
                        clauses.push((
                            RangeClause {
                                field: bound.field,
                                lower: RangeEnd::Unbounded,
                                upper: RangeEnd::Unbounded,
                            },
                            key,
                        ));
                        clauses.len() - 1
                    }
                };
                apply_bound(&mut clauses[index].0, &bound);
            }
        }

        for (clause, key) in &clauses {
            if let (RangeEnd::Date(lower), RangeEnd::Date(upper)) = (clause.lower, clause.upper) {
                if lower > upper {
                    return Err(QueryError::invalid_filter(
                        *key,
                        format!("empty date range: {} is after {}", lower, upper),
                    ));
                }
            }
        }

        Ok(clauses.into_iter().map(|(c, _)| c).collect())
    }
}

fn to_date(key: &str, scalar: &Scalar) -> QueryResult<NaiveDate> {
    scalar
        .to_date()
        .ok_or_else(|| QueryError::invalid_filter(key, format!("invalid date: {}", scalar)))
}

fn apply_bound(clause: &mut RangeClause, bound: &DateBound) {
    if matches!(bound.op, BoundOp::Gte | BoundOp::Exact) {
        clause.lower = match clause.lower {
            RangeEnd::Date(existing) if existing >= bound.date => RangeEnd::Date(existing),
            _ => RangeEnd::Date(bound.date),
        };
    }
    if matches!(bound.op, BoundOp::Lte | BoundOp::Exact) {
        clause.upper = match clause.upper {
            RangeEnd::Date(existing) if existing <= bound.date => RangeEnd::Date(existing),
            _ => RangeEnd::Date(bound.date),
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fields::PedsFields;

    fn merge(entries: &[(&str, FilterValue)]) -> QueryResult<Vec<String>> {
        let merger = RangeMerger::new(&PedsFields);
        let clauses = merger.merge(entries.iter().map(|(k, v)| (*k, v)))?;
        Ok(clauses.iter().map(|c| c.to_string()).collect())
    }

    #[test]
    fn test_exact_is_whole_day() {
        let clauses = merge(&[("filing_date", "2020-03-15".into())]).unwrap();
        assert_eq!(
            clauses,
            vec!["filing_date:[2020-03-15T00:00:00Z TO 2020-03-15T23:59:59Z]"]
        );
    }

    #[test]
    fn test_gte_and_lte_pair_up() {
        let clauses = merge(&[
            ("filing_date__gte", "2019-01-01".into()),
            ("filing_date__lte", "2019-12-31".into()),
        ])
        .unwrap();
        assert_eq!(
            clauses,
            vec!["filing_date:[2019-01-01T00:00:00Z TO 2019-12-31T23:59:59Z]"]
        );
    }

    #[test]
    fn test_lone_bounds_are_open() {
        let gte = merge(&[("issue_date__gte", "2019-01-01".into())]).unwrap();
        assert_eq!(gte, vec!["patent_issue_date:[2019-01-01T00:00:00Z TO *]"]);

        let lte = merge(&[("issue_date__lte", "2019-01-01".into())]).unwrap();
        assert_eq!(lte, vec!["patent_issue_date:[* TO 2019-01-01T23:59:59Z]"]);
    }

    #[test]
    fn test_fields_do_not_share_bounds() {
        let clauses = merge(&[
            ("filing_date__gte", "2018-01-01".into()),
            ("issue_date__lte", "2021-01-01".into()),
        ])
        .unwrap();
        assert_eq!(
            clauses,
            vec![
                "filing_date:[2018-01-01T00:00:00Z TO *]",
                "patent_issue_date:[* TO 2021-01-01T23:59:59Z]",
            ]
        );
    }

    #[test]
    fn test_alias_and_canonical_merge() {
        let clauses = merge(&[
            ("app_filing_date__gte", "2018-01-01".into()),
            ("filing_date__lte", "2018-02-01".into()),
        ])
        .unwrap();
        assert_eq!(clauses.len(), 1);
    }

    #[test]
    fn test_tightest_bound_wins() {
        let clauses = merge(&[
            ("filing_date", ("2018-01-01", "2018-12-31").into()),
            ("filing_date__gte", "2018-06-01".into()),
        ])
        .unwrap();
        assert_eq!(
            clauses,
            vec!["filing_date:[2018-06-01T00:00:00Z TO 2018-12-31T23:59:59Z]"]
        );
    }

    #[test]
    fn test_range_arity() {
        let err = merge(&[("filing_date", vec!["2018-01-01"].into())]).unwrap_err();
        assert!(matches!(err, QueryError::InvalidFilter { .. }));

        let err = merge(&[(
            "filing_date",
            vec!["2018-01-01", "2018-02-01", "2018-03-01"].into(),
        )])
        .unwrap_err();
        assert!(matches!(err, QueryError::InvalidFilter { .. }));
    }

    #[test]
    fn test_operator_with_list_rejected() {
        let err = merge(&[(
            "filing_date__gte",
            ("2018-01-01", "2018-02-01").into(),
        )])
        .unwrap_err();
        assert!(err.to_string().contains("multiple values"));
    }

    #[test]
    fn test_bad_operators_rejected() {
        let err = merge(&[("filing_date__gt", "2018-01-01".into())]).unwrap_err();
        assert!(err.to_string().contains("invalid operator: gt"));

        let err = merge(&[("filing_date__gte__lte", "2018-01-01".into())]).unwrap_err();
        assert!(err.to_string().contains("more than one operator"));
    }

    #[test]
    fn test_invalid_date_rejected() {
        let err = merge(&[("filing_date", "last tuesday".into())]).unwrap_err();
        assert_eq!(err.key(), "filing_date");
    }

    #[test]
    fn test_empty_interval_rejected() {
        let err = merge(&[
            ("filing_date__gte", "2020-01-02".into()),
            ("filing_date__lte", "2020-01-01".into()),
        ])
        .unwrap_err();
        assert!(err.to_string().contains("empty date range"));
    }
}
