//! Issue types for generator results.
//!
//! This module defines every finding a run can produce. Each issue is
//! self-contained with all information needed by the reporter: the location
//! to point at, the message, and every other location that contributed.

use enum_dispatch::enum_dispatch;

use crate::core::{
    MergeConflict,
    data::{SitedValue, SourceContext, SourceLocation},
    parsers::literal::LiteralError,
};

// ============================================================
// Severity and Rule
// ============================================================

/// Severity level of an issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Error,
    Warning,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Severity::Error => write!(f, "error"),
            Severity::Warning => write!(f, "warning"),
        }
    }
}

/// Rule identifier for each issue type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Rule {
    ParseError,
    Conflict,
    LocaleConflict,
    UnresolvedReference,
    UnusedDefinition,
    IoError,
}

impl std::fmt::Display for Rule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Rule::ParseError => write!(f, "parse-error"),
            Rule::Conflict => write!(f, "conflict"),
            Rule::LocaleConflict => write!(f, "locale-conflict"),
            Rule::UnresolvedReference => write!(f, "unresolved-reference"),
            Rule::UnusedDefinition => write!(f, "unused-definition"),
            Rule::IoError => write!(f, "io-error"),
        }
    }
}

// ============================================================
// Issue Types - Scanning
// ============================================================

/// Malformed macro invocation. The invocation is skipped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseErrorIssue {
    pub context: SourceContext,
    /// `SPGM`, `PROGMEM_STRING_DEF`, ...
    pub macro_name: String,
    pub error: LiteralError,
}

impl ParseErrorIssue {
    pub fn severity() -> Severity {
        Severity::Error
    }

    pub fn rule() -> Rule {
        Rule::ParseError
    }
}

/// File could not be read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IoErrorIssue {
    pub path: String,
    pub error: String,
}

impl IoErrorIssue {
    pub fn severity() -> Severity {
        Severity::Error
    }

    pub fn rule() -> Rule {
        Rule::IoError
    }
}

// ============================================================
// Issue Types - Merging
// ============================================================

/// Same identifier, two different default values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConflictIssue {
    pub identifier: String,
    pub existing: SitedValue,
    pub incoming: SitedValue,
}

impl ConflictIssue {
    pub fn severity() -> Severity {
        Severity::Error
    }

    pub fn rule() -> Rule {
        Rule::Conflict
    }
}

/// Same identifier and locale code, two different values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocaleConflictIssue {
    pub identifier: String,
    pub locale: String,
    pub existing: SitedValue,
    pub incoming: SitedValue,
}

impl LocaleConflictIssue {
    pub fn severity() -> Severity {
        Severity::Error
    }

    pub fn rule() -> Rule {
        Rule::LocaleConflict
    }
}

// ============================================================
// Issue Types - Usage
// ============================================================

/// Referenced identifier without a value anywhere.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnresolvedReferenceIssue {
    pub identifier: String,
    /// First reference; the issue points here.
    pub location: SourceLocation,
    /// Every reference, including the first.
    pub references: Vec<SourceLocation>,
    /// Locale codes that do have a value.
    pub locales: Vec<String>,
}

impl UnresolvedReferenceIssue {
    pub fn severity() -> Severity {
        Severity::Error
    }

    pub fn rule() -> Rule {
        Rule::UnresolvedReference
    }
}

/// Defined but never referenced; left out of the generated code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnusedDefinitionIssue {
    pub identifier: String,
    /// Rendered value, e.g. `"Price", de: "Preis"`.
    pub value: String,
    pub location: SourceLocation,
    pub definitions: Vec<SourceLocation>,
}

impl UnusedDefinitionIssue {
    pub fn severity() -> Severity {
        Severity::Warning
    }

    pub fn rule() -> Rule {
        Rule::UnusedDefinition
    }
}

// ============================================================
// Issue Enum
// ============================================================

/// A finding of one generator run.
#[enum_dispatch(Report)]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Issue {
    ParseError(ParseErrorIssue),
    Conflict(ConflictIssue),
    LocaleConflict(LocaleConflictIssue),
    UnresolvedReference(UnresolvedReferenceIssue),
    UnusedDefinition(UnusedDefinitionIssue),
    IoError(IoErrorIssue),
}

impl Issue {
    pub fn severity(&self) -> Severity {
        match self {
            Issue::ParseError(_) => ParseErrorIssue::severity(),
            Issue::Conflict(_) => ConflictIssue::severity(),
            Issue::LocaleConflict(_) => LocaleConflictIssue::severity(),
            Issue::UnresolvedReference(_) => UnresolvedReferenceIssue::severity(),
            Issue::UnusedDefinition(_) => UnusedDefinitionIssue::severity(),
            Issue::IoError(_) => IoErrorIssue::severity(),
        }
    }

    pub fn rule(&self) -> Rule {
        match self {
            Issue::ParseError(_) => ParseErrorIssue::rule(),
            Issue::Conflict(_) => ConflictIssue::rule(),
            Issue::LocaleConflict(_) => LocaleConflictIssue::rule(),
            Issue::UnresolvedReference(_) => UnresolvedReferenceIssue::rule(),
            Issue::UnusedDefinition(_) => UnusedDefinitionIssue::rule(),
            Issue::IoError(_) => IoErrorIssue::rule(),
        }
    }
}

impl From<MergeConflict> for Issue {
    fn from(conflict: MergeConflict) -> Self {
        match conflict {
            MergeConflict::Value {
                identifier,
                existing,
                incoming,
            } => Issue::Conflict(ConflictIssue {
                identifier,
                existing,
                incoming,
            }),
            MergeConflict::Locale {
                identifier,
                locale,
                existing,
                incoming,
            } => Issue::LocaleConflict(LocaleConflictIssue {
                identifier,
                locale,
                existing,
                incoming,
            }),
        }
    }
}

// ============================================================
// Report Trait (for CLI output)
// ============================================================

/// Location information for report output.
pub enum ReportLocation<'a> {
    /// Source code location with the line text (for the caret display).
    Source(&'a SourceContext),
    /// Source code location without line text.
    Site(&'a SourceLocation),
    /// File-level only.
    File { path: &'a str },
}

/// Another location that contributed to an issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RelatedLocation<'a> {
    /// Short role of the location: "first defined", "referenced", ...
    pub label: &'static str,
    pub location: &'a SourceLocation,
}

/// Trait for types that can be reported to CLI.
///
/// Implemented by all issue types; `enum_dispatch` forwards the calls on
/// the `Issue` enum.
#[enum_dispatch]
pub trait Report {
    fn location(&self) -> ReportLocation<'_>;

    /// Primary message (identifier or error text).
    fn message(&self) -> String;

    fn report_severity(&self) -> Severity;

    fn report_rule(&self) -> Rule;

    /// Optional hint for fixing the issue.
    fn hint(&self) -> Option<&str> {
        None
    }

    /// Optional details for the "= note:" line.
    fn details(&self) -> Option<String> {
        None
    }

    /// Other contributing locations.
    fn related(&self) -> Vec<RelatedLocation<'_>> {
        Vec::new()
    }
}

// ============================================================
// Report Implementations
// ============================================================

impl Report for ParseErrorIssue {
    fn location(&self) -> ReportLocation<'_> {
        ReportLocation::Source(&self.context)
    }

    fn message(&self) -> String {
        self.error.to_string()
    }

    fn report_severity(&self) -> Severity {
        Self::severity()
    }

    fn report_rule(&self) -> Rule {
        Self::rule()
    }

    fn details(&self) -> Option<String> {
        Some(format!("in {}(...); the invocation is skipped", self.macro_name))
    }

    fn hint(&self) -> Option<&str> {
        match self.error {
            LiteralError::MissingValue => {
                Some("definitions and auto-init entries need a default value or a `*` locale")
            }
            LiteralError::InvalidValue(_) => {
                Some("values must be string literals or string defines passed with -D")
            }
            LiteralError::UnexpectedValue(_) => {
                Some("label the value with its locale, e.g. `de: \"...\"`")
            }
            _ => None,
        }
    }
}

impl Report for IoErrorIssue {
    fn location(&self) -> ReportLocation<'_> {
        ReportLocation::File { path: &self.path }
    }

    fn message(&self) -> String {
        self.error.clone()
    }

    fn report_severity(&self) -> Severity {
        Self::severity()
    }

    fn report_rule(&self) -> Rule {
        Self::rule()
    }
}

impl Report for ConflictIssue {
    fn location(&self) -> ReportLocation<'_> {
        ReportLocation::Site(&self.incoming.location)
    }

    fn message(&self) -> String {
        self.identifier.clone()
    }

    fn report_severity(&self) -> Severity {
        Self::severity()
    }

    fn report_rule(&self) -> Rule {
        Self::rule()
    }

    fn details(&self) -> Option<String> {
        Some(format!(
            "\"{}\" differs from \"{}\" defined at {}",
            self.incoming.value, self.existing.value, self.existing.location
        ))
    }

    fn related(&self) -> Vec<RelatedLocation<'_>> {
        vec![RelatedLocation {
            label: "first defined",
            location: &self.existing.location,
        }]
    }
}

impl Report for LocaleConflictIssue {
    fn location(&self) -> ReportLocation<'_> {
        ReportLocation::Site(&self.incoming.location)
    }

    fn message(&self) -> String {
        format!("{} ({})", self.identifier, self.locale)
    }

    fn report_severity(&self) -> Severity {
        Self::severity()
    }

    fn report_rule(&self) -> Rule {
        Self::rule()
    }

    fn details(&self) -> Option<String> {
        Some(format!(
            "{}: \"{}\" differs from \"{}\" defined at {}",
            self.locale, self.incoming.value, self.existing.value, self.existing.location
        ))
    }

    fn related(&self) -> Vec<RelatedLocation<'_>> {
        vec![RelatedLocation {
            label: "first defined",
            location: &self.existing.location,
        }]
    }
}

impl Report for UnresolvedReferenceIssue {
    fn location(&self) -> ReportLocation<'_> {
        ReportLocation::Site(&self.location)
    }

    fn message(&self) -> String {
        self.identifier.clone()
    }

    fn report_severity(&self) -> Severity {
        Self::severity()
    }

    fn report_rule(&self) -> Rule {
        Self::rule()
    }

    fn details(&self) -> Option<String> {
        if self.locales.is_empty() {
            Some("no value is defined".to_string())
        } else {
            Some(format!(
                "no default value, only locales: {}",
                self.locales.join(", ")
            ))
        }
    }

    fn hint(&self) -> Option<&str> {
        Some("add a default value or a `*` locale to one of the references")
    }

    fn related(&self) -> Vec<RelatedLocation<'_>> {
        self.references
            .iter()
            .filter(|location| **location != self.location)
            .map(|location| RelatedLocation {
                label: "referenced",
                location,
            })
            .collect()
    }
}

impl Report for UnusedDefinitionIssue {
    fn location(&self) -> ReportLocation<'_> {
        ReportLocation::Site(&self.location)
    }

    fn message(&self) -> String {
        self.identifier.clone()
    }

    fn report_severity(&self) -> Severity {
        Self::severity()
    }

    fn report_rule(&self) -> Rule {
        Self::rule()
    }

    fn details(&self) -> Option<String> {
        Some(format!("({}) is not referenced", self.value))
    }

    fn related(&self) -> Vec<RelatedLocation<'_>> {
        self.definitions
            .iter()
            .filter(|location| **location != self.location)
            .map(|location| RelatedLocation {
                label: "defined",
                location,
            })
            .collect()
    }
}

// ============================================================
// Ordering for Issue (for sorting in reports)
// ============================================================

impl Issue {
    /// Get the location for sorting: (file, line, col).
    fn sort_key(&self) -> (&str, usize, usize) {
        match self.location() {
            ReportLocation::Source(ctx) => (ctx.file_path(), ctx.line(), ctx.col()),
            ReportLocation::Site(loc) => (loc.file_path.as_str(), loc.line, loc.col),
            ReportLocation::File { path } => (path, 0, 0),
        }
    }
}

impl Ord for Issue {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        // Sort by: file_path, line, col, rule, message
        self.sort_key()
            .cmp(&other.sort_key())
            .then_with(|| self.rule().cmp(&other.rule()))
            .then_with(|| self.message().cmp(&other.message()))
    }
}

impl PartialOrd for Issue {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

// ============================================================
// Tests
// ============================================================
