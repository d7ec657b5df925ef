//! Field registry for the examination data backend
//!
//! Maps user-facing filter keys to the canonical field names the search
//! backend indexes, and classifies date-typed fields.
//!
//! Filter keys may carry one trailing operator suffix (`filing_date__gte`).
//! Resolution strips the suffix before lookup; validating the suffix itself
//! is the range merger's job.

use std::collections::BTreeSet;
use std::fmt;

use crate::query::errors::{QueryError, QueryResult};

/// Separator between a field name and an operator suffix
pub const OPERATOR_SEPARATOR: &str = "__";

/// Field value type as indexed by the backend
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// Calendar date, queried with range clauses
    Date,
    /// Anything else, queried with term clauses
    Text,
}

/// Known backend fields
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Field {
    ApplId,
    PatentNumber,
    PatentTitle,
    AppEarlyPubNumber,
    WipoEarlyPubNumber,
    PctAppNumber,
    AppType,
    AppStatus,
    AppEntityStatus,
    AppConfrNumber,
    AppCustNumber,
    AppAttrDockNumber,
    AppGrpArtNumber,
    AppClsSubCls,
    AppExamName,
    FirstInventorFile,
    FirstNamedApplicant,
    InventorName,
    FilingDate,
    AppStatusDate,
    AppEarlyPubDate,
    PatentIssueDate,
    LastModTs,
}

impl Field {
    /// Every known field, in registry order
    pub const ALL: &'static [Field] = &[
        Field::ApplId,
        Field::PatentNumber,
        Field::PatentTitle,
        Field::AppEarlyPubNumber,
        Field::WipoEarlyPubNumber,
        Field::PctAppNumber,
        Field::AppType,
        Field::AppStatus,
        Field::AppEntityStatus,
        Field::AppConfrNumber,
        Field::AppCustNumber,
        Field::AppAttrDockNumber,
        Field::AppGrpArtNumber,
        Field::AppClsSubCls,
        Field::AppExamName,
        Field::FirstInventorFile,
        Field::FirstNamedApplicant,
        Field::InventorName,
        Field::FilingDate,
        Field::AppStatusDate,
        Field::AppEarlyPubDate,
        Field::PatentIssueDate,
        Field::LastModTs,
    ];

    /// Canonical backend name
    pub fn canonical(&self) -> &'static str {
        match self {
            Field::ApplId => "appl_id",
            Field::PatentNumber => "patent_number",
            Field::PatentTitle => "patent_title",
            Field::AppEarlyPubNumber => "app_early_pub_number",
            Field::WipoEarlyPubNumber => "wipo_early_pub_number",
            Field::PctAppNumber => "pct_app_number",
            Field::AppType => "app_type",
            Field::AppStatus => "app_status",
            Field::AppEntityStatus => "app_entity_status",
            Field::AppConfrNumber => "app_confr_number",
            Field::AppCustNumber => "app_cust_number",
            Field::AppAttrDockNumber => "app_attr_dock_number",
            Field::AppGrpArtNumber => "app_grp_art_number",
            Field::AppClsSubCls => "app_cls_sub_cls",
            Field::AppExamName => "app_exam_name",
            Field::FirstInventorFile => "first_inventor_file",
            Field::FirstNamedApplicant => "first_named_applicant",
            Field::InventorName => "inventor_name",
            Field::FilingDate => "filing_date",
            Field::AppStatusDate => "app_status_date",
            Field::AppEarlyPubDate => "app_early_pub_date",
            Field::PatentIssueDate => "patent_issue_date",
            Field::LastModTs => "last_mod_ts",
        }
    }

    /// User-facing aliases accepted in addition to the canonical name
    pub fn aliases(&self) -> &'static [&'static str] {
        match self {
            Field::ApplId => &["application_number", "appl_number"],
            Field::PatentNumber => &["patent_no"],
            Field::PatentTitle => &["title"],
            Field::AppEarlyPubNumber => &["early_pub_number", "publication_number"],
            Field::WipoEarlyPubNumber => &["wipo_pub_number"],
            Field::PctAppNumber => &["pct_number"],
            Field::AppType => &["application_type"],
            Field::AppStatus => &["status"],
            Field::AppEntityStatus => &["entity_status"],
            Field::AppConfrNumber => &["confirmation_number"],
            Field::AppCustNumber => &["customer_number"],
            Field::AppAttrDockNumber => &["attorney_docket_number"],
            Field::AppGrpArtNumber => &["art_unit"],
            Field::AppClsSubCls => &["uspc_class"],
            Field::AppExamName => &["examiner"],
            Field::FirstInventorFile => &["aia"],
            Field::FirstNamedApplicant => &["applicant"],
            Field::InventorName => &["inventor"],
            Field::FilingDate => &["app_filing_date"],
            Field::AppStatusDate => &["status_date"],
            Field::AppEarlyPubDate => &["early_pub_date", "publication_date"],
            Field::PatentIssueDate => &["issue_date"],
            Field::LastModTs => &["last_modified"],
        }
    }

    pub fn kind(&self) -> FieldKind {
        match self {
            Field::FilingDate
            | Field::AppStatusDate
            | Field::AppEarlyPubDate
            | Field::PatentIssueDate
            | Field::LastModTs => FieldKind::Date,
            _ => FieldKind::Text,
        }
    }

    pub fn is_date(&self) -> bool {
        self.kind() == FieldKind::Date
    }

    /// Returns true if `name` is the canonical name or an alias
    pub fn answers_to(&self, name: &str) -> bool {
        self.canonical() == name || self.aliases().contains(&name)
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.canonical())
    }
}

/// Splits a filter key into its field name and operator suffix tokens.
///
/// `"filing_date__gte"` → `("filing_date", ["gte"])`.
pub fn split_operator(key: &str) -> (&str, Vec<&str>) {
    let mut parts = key.split(OPERATOR_SEPARATOR);
    // split always yields at least one item
    let base = parts.next().unwrap_or(key);
    (base, parts.collect())
}

/// Resolution of user-facing filter keys against a static field set
pub trait FieldRegistry: Send + Sync {
    /// The fields this registry knows about
    fn fields(&self) -> &[Field];

    /// Looks up a bare field name (no operator suffix)
    fn lookup(&self, name: &str) -> Option<Field> {
        self.fields().iter().copied().find(|f| f.answers_to(name))
    }

    /// Resolves a filter key, ignoring any operator suffix
    fn resolve(&self, key: &str) -> QueryResult<Field> {
        let (base, _) = split_operator(key);
        self.lookup(base)
            .ok_or_else(|| QueryError::unknown_field(key))
    }

    /// True iff the key resolves to a date-typed field
    fn is_date_field(&self, key: &str) -> bool {
        self.resolve(key).map(|f| f.is_date()).unwrap_or(false)
    }

    /// Every user-facing name accepted as a filter
    fn list_field_names(&self) -> BTreeSet<&'static str> {
        let mut names = BTreeSet::new();
        for field in self.fields() {
            names.insert(field.canonical());
            names.extend(field.aliases().iter().copied());
        }
        names
    }
}

/// Built-in registry covering every [`Field`]
#[derive(Debug, Clone, Copy, Default)]
pub struct PedsFields;

impl FieldRegistry for PedsFields {
    fn fields(&self) -> &[Field] {
        Field::ALL
    }
}
