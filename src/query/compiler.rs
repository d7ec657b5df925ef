//! # Query Compiler
//!
//! Turns a [`Filter`] and sort tokens into the backend's query syntax.
//!
//! Date fields are routed through the [`RangeMerger`]; every other field
//! renders as a term clause. The reserved `query` key bypasses all of this.

use serde::Serialize;
use serde_json::{json, Map, Value};

use super::errors::{QueryError, QueryResult};
use super::filter::{Filter, SortSpec, RAW_QUERY_KEY};
use super::range::RangeMerger;
use super::value::FilterValue;
use crate::fields::{split_operator, Field, FieldRegistry};
use crate::observability::{Event, Logger};
use crate::pagination::FetchWindow;

/// Clause separator in the compiled query
pub const CLAUSE_SEPARATOR: &str = " AND ";

/// Minimum match used when the broad identifier field is absent
pub const DEFAULT_MINIMUM_MATCH_LOW: &str = "0%";

/// Minimum match used when the broad identifier field is present
pub const DEFAULT_MINIMUM_MATCH_HIGH: &str = "90%";

/// Field whose presence switches the minimum match to the high value
pub const BROAD_IDENTIFIER_FIELD: Field = Field::AppEarlyPubNumber;

/// Query fields the backend searches for free text
const QUERY_FIELDS: &str = "appEarlyPubNumber applId appLocation appType appStatus_txt appConfrNumber appCustNumber appGrpArtNumber appCls appSubCls appEntityStatus_txt patentNumber patentTitle primaryInventor firstNamedApplicant appExamName appExamPrefrdName appAttrDockNumber appPCTNumber appIntlPubNumber wipoEarlyPubNumber pctAppType firstInventorFile appClsSubCls rankAndInventorsList";

/// Default field for unqualified terms
const DEFAULT_FIELD: &str = "patentTitle";

/// A backend-ready query. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CompiledQuery {
    query: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    sort: Option<String>,
    minimum_match: String,
    facet: bool,
}

impl CompiledQuery {
    /// The query string sent as the backend's search text
    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn sort(&self) -> Option<&str> {
        self.sort.as_deref()
    }

    pub fn minimum_match(&self) -> &str {
        &self.minimum_match
    }

    pub fn facet(&self) -> bool {
        self.facet
    }

    /// JSON request body for one fetch.
    ///
    /// `None` requests only the total count (`rows = 0`).
    pub fn request_body(&self, window: Option<FetchWindow>) -> Value {
        let window = window.unwrap_or(FetchWindow { start: 0, rows: 0 });

        let mut body = Map::new();
        body.insert("qf".to_string(), json!(QUERY_FIELDS));
        body.insert("fl".to_string(), json!("*"));
        body.insert("fq".to_string(), json!([]));
        body.insert("searchText".to_string(), json!(self.query));
        body.insert("df".to_string(), json!(DEFAULT_FIELD));
        body.insert("facet".to_string(), json!(self.facet.to_string()));
        body.insert("mm".to_string(), json!(self.minimum_match));
        if let Some(sort) = &self.sort {
            body.insert("sort".to_string(), json!(sort));
        }
        body.insert("start".to_string(), json!(window.start));
        body.insert("rows".to_string(), json!(window.rows));
        Value::Object(body)
    }
}

/// Compiles filters against a field registry
pub struct QueryCompiler<'a> {
    registry: &'a dyn FieldRegistry,
    minimum_match_low: String,
    minimum_match_high: String,
}

impl<'a> QueryCompiler<'a> {
    pub fn new(registry: &'a dyn FieldRegistry) -> Self {
        Self {
            registry,
            minimum_match_low: DEFAULT_MINIMUM_MATCH_LOW.to_string(),
            minimum_match_high: DEFAULT_MINIMUM_MATCH_HIGH.to_string(),
        }
    }

    /// Overrides the minimum match values
    pub fn with_minimum_match(mut self, low: impl Into<String>, high: impl Into<String>) -> Self {
        self.minimum_match_low = low.into();
        self.minimum_match_high = high.into();
        self
    }

    /// Compiles a filter mapping and sort tokens
    pub fn compile<S: AsRef<str>>(&self, filter: &Filter, order_by: &[S]) -> QueryResult<CompiledQuery> {
        match self.compile_inner(filter, order_by) {
            Ok(compiled) => {
                Logger::trace(
                    Event::QueryCompiled.as_str(),
                    &[
                        ("minimum_match", compiled.minimum_match.as_str()),
                        ("query", compiled.query.as_str()),
                        ("sort", compiled.sort.as_deref().unwrap_or("")),
                    ],
                );
                Ok(compiled)
            }
            Err(err) => {
                let message = err.to_string();
                Logger::warn(
                    Event::QueryRejected.as_str(),
                    &[("code", err.code()), ("message", message.as_str())],
                );
                Err(err)
            }
        }
    }

    fn compile_inner<S: AsRef<str>>(&self, filter: &Filter, order_by: &[S]) -> QueryResult<CompiledQuery> {
        let query = match filter.raw_query() {
            Some(raw) => raw_query_text(raw)?,
            None => self.compile_filters(filter)?,
        };

        let sort = self.compile_sort(order_by)?;

        let minimum_match = if query.contains(BROAD_IDENTIFIER_FIELD.canonical()) {
            self.minimum_match_high.clone()
        } else {
            self.minimum_match_low.clone()
        };

        Ok(CompiledQuery {
            query,
            sort,
            minimum_match,
            facet: false,
        })
    }

    fn compile_filters(&self, filter: &Filter) -> QueryResult<String> {
        let mut date_entries: Vec<(&str, &FilterValue)> = Vec::new();
        let mut term_clauses: Vec<String> = Vec::new();

        for (key, value) in filter.iter() {
            let field = self.registry.resolve(key)?;
            if field.is_date() {
                date_entries.push((key, value));
                continue;
            }

            let (_, ops) = split_operator(key);
            if !ops.is_empty() {
                return Err(QueryError::invalid_filter(
                    key,
                    "operators are only supported on date fields",
                ));
            }
            if matches!(value, FilterValue::List(items) if items.is_empty()) {
                return Err(QueryError::invalid_filter(
                    key,
                    "an OR-set must have at least one value",
                ));
            }
            term_clauses.push(render_term(field, value));
        }

        let ranges = RangeMerger::new(self.registry).merge(date_entries)?;

        let clauses: Vec<String> = ranges
            .iter()
            .map(|r| r.to_string())
            .chain(term_clauses)
            .collect();

        Ok(clauses.join(CLAUSE_SEPARATOR))
    }

    /// Renders sort tokens.
    ///
    /// Successive clauses are concatenated without a separator.
    fn compile_sort<S: AsRef<str>>(&self, order_by: &[S]) -> QueryResult<Option<String>> {
        if order_by.is_empty() {
            return Ok(None);
        }

        let mut sort = String::new();
        for token in order_by {
            sort.push_str(&SortSpec::parse(token.as_ref(), self.registry)?.render());
        }
        Ok(Some(sort))
    }
}

fn raw_query_text(raw: &FilterValue) -> QueryResult<String> {
    let text = raw
        .as_scalar()
        .map(|s| s.to_string())
        .ok_or_else(|| QueryError::invalid_filter(RAW_QUERY_KEY, "must be a single value"))?;

    if text.trim().is_empty() {
        return Err(QueryError::invalid_filter(RAW_QUERY_KEY, "must not be empty"));
    }
    Ok(text)
}

fn render_term(field: Field, value: &FilterValue) -> String {
    match value {
        FilterValue::Scalar(s) => format!("{}:({})", field.canonical(), s),
        FilterValue::List(items) => {
            let values: Vec<String> = items.iter().map(|s| s.to_string()).collect();
            format!("{}:({})", field.canonical(), values.join(" OR "))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fields::PedsFields;

    const NO_SORT: &[&str] = &[];

    fn compile(filter: &Filter) -> QueryResult<CompiledQuery> {
        QueryCompiler::new(&PedsFields).compile(filter, NO_SORT)
    }

    #[test]
    fn test_scalar_term() {
        let compiled = compile(&Filter::new().with("appl_id", "12345678")).unwrap();
        assert_eq!(compiled.query(), "appl_id:(12345678)");
        assert_eq!(compiled.minimum_match(), "0%");
        assert_eq!(compiled.sort(), None);
        assert!(!compiled.facet());
    }

    #[test]
    fn test_list_term_is_or_set() {
        let compiled = compile(
            &Filter::new().with("appl_id", vec!["11111111", "22222222", "33333333"]),
        )
        .unwrap();
        assert_eq!(
            compiled.query(),
            "appl_id:(11111111 OR 22222222 OR 33333333)"
        );
    }

    #[test]
    fn test_empty_list_term_rejected() {
        let err = compile(&Filter::new().with("appl_id", Vec::<&str>::new())).unwrap_err();
        assert_eq!(
            err,
            QueryError::invalid_filter("appl_id", "an OR-set must have at least one value")
        );
    }

    #[test]
    fn test_date_range() {
        let compiled =
            compile(&Filter::new().with("filing_date", ("2020-01-01", "2020-06-30"))).unwrap();
        assert_eq!(
            compiled.query(),
            "filing_date:[2020-01-01T00:00:00Z TO 2020-06-30T23:59:59Z]"
        );
    }

    #[test]
    fn test_dates_first_then_terms_in_key_order() {
        let filter = Filter::new()
            .with("status", "Patented Case")
            .with("filing_date__gte", "2020-01-01")
            .with("art_unit", 3689i64);
        let compiled = compile(&filter).unwrap();
        assert_eq!(
            compiled.query(),
            "filing_date:[2020-01-01T00:00:00Z TO *] AND app_status:(Patented Case) AND app_grp_art_number:(3689)"
        );
    }

    #[test]
    fn test_raw_query_bypasses_compilation() {
        let filter = Filter::new()
            .with("query", "patent_title:(widget*)")
            .with("filing_date", vec!["not", "even", "checked"]);
        let compiled = compile(&filter).unwrap();
        assert_eq!(compiled.query(), "patent_title:(widget*)");
    }

    #[test]
    fn test_raw_query_must_be_scalar() {
        let filter = Filter::new().with("query", vec!["a", "b"]);
        assert!(matches!(
            compile(&filter),
            Err(QueryError::InvalidFilter { .. })
        ));
        assert!(compile(&Filter::new().with("query", "  ")).is_err());
    }

    #[test]
    fn test_minimum_match_high_with_broad_identifier() {
        let compiled = compile(&Filter::new().with("early_pub_number", "US20200000001A1")).unwrap();
        assert_eq!(
            compiled.query(),
            "app_early_pub_number:(US20200000001A1)"
        );
        assert_eq!(compiled.minimum_match(), "90%");

        let raw = compile(&Filter::new().with("query", "app_early_pub_number:(US*)")).unwrap();
        assert_eq!(raw.minimum_match(), "90%");
    }

    #[test]
    fn test_custom_minimum_match() {
        let compiler = QueryCompiler::new(&PedsFields).with_minimum_match("10%", "75%");
        let compiled = compiler
            .compile(&Filter::new().with("appl_id", "1"), NO_SORT)
            .unwrap();
        assert_eq!(compiled.minimum_match(), "10%");
    }

    #[test]
    fn test_sort_single_field() {
        let compiler = QueryCompiler::new(&PedsFields);
        let filter = Filter::new().with("appl_id", "1");

        let desc = compiler.compile(&filter, &["-filing_date"]).unwrap();
        assert_eq!(desc.sort(), Some("filing_date desc"));

        let asc = compiler.compile(&filter, &["filing_date"]).unwrap();
        assert_eq!(asc.sort(), Some("filing_date asc"));
    }

    #[test]
    fn test_sort_multi_field_concatenates() {
        let compiled = QueryCompiler::new(&PedsFields)
            .compile(&Filter::new().with("appl_id", "1"), &["-filing_date", "appl_id"])
            .unwrap();
        assert_eq!(compiled.sort(), Some("filing_date descappl_id asc"));
    }

    #[test]
    fn test_unknown_keys() {
        assert_eq!(
            compile(&Filter::new().with("colour", "red")),
            Err(QueryError::unknown_field("colour"))
        );
        assert_eq!(
            QueryCompiler::new(&PedsFields).compile(&Filter::new(), &["-colour"]),
            Err(QueryError::unknown_field("-colour"))
        );
    }

    #[test]
    fn test_operator_on_term_field_rejected() {
        let err = compile(&Filter::new().with("appl_id__gte", "1")).unwrap_err();
        assert!(matches!(err, QueryError::InvalidFilter { .. }));
    }

    #[test]
    fn test_empty_filter_compiles_to_empty_query() {
        let compiled = compile(&Filter::new()).unwrap();
        assert_eq!(compiled.query(), "");
    }

    #[test]
    fn test_request_body() {
        let compiled = QueryCompiler::new(&PedsFields)
            .compile(&Filter::new().with("appl_id", "12345678"), &["-filing_date"])
            .unwrap();

        let body = compiled.request_body(Some(FetchWindow { start: 40, rows: 20 }));
        assert_eq!(body["searchText"], "appl_id:(12345678)");
        assert_eq!(body["mm"], "0%");
        assert_eq!(body["facet"], "false");
        assert_eq!(body["sort"], "filing_date desc");
        assert_eq!(body["start"], 40);
        assert_eq!(body["rows"], 20);

        let count_only = compiled.request_body(None);
        assert_eq!(count_only["rows"], 0);
    }

    #[test]
    fn test_request_body_omits_missing_sort() {
        let compiled = compile(&Filter::new().with("appl_id", "1")).unwrap();
        assert!(compiled.request_body(None).get("sort").is_none());
    }
}
