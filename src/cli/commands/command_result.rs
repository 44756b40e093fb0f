use super::super::args::OutputFormat;
use crate::core::StringEntry;
use crate::issues::Issue;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandKind {
    Generate,
    Check,
    Query,
    Init,
}

#[derive(Debug)]
pub enum CommandSummary {
    Run(RunSummary),
    Query(QuerySummary),
    Init(InitSummary),
}

/// Outcome of `generate` and `check`.
#[derive(Debug, Default)]
pub struct RunSummary {
    pub files_scanned: usize,
    pub files_cached: usize,
    /// Strings written to the generated files.
    pub emitted_count: usize,
    pub auto_init_count: usize,
    /// True for `generate`, false for `check`.
    pub is_apply: bool,
    /// Generated files that were (re)written, relative to the project root.
    pub written: Vec<String>,
}

#[derive(Debug)]
pub struct QuerySummary {
    pub pattern: String,
    pub symbol_prefix: String,
    pub auto_init: bool,
    pub matches: Vec<StringEntry>,
}

#[derive(Debug)]
pub struct InitSummary {
    pub created: bool,
    pub error: Option<String>,
}

/// Result of running spgm commands
pub struct CommandResult {
    pub kind: CommandKind,
    pub summary: CommandSummary,
    pub error_count: usize,
    pub warning_count: usize,
    /// All findings of the run; empty for `query` and `init`.
    pub issues: Vec<Issue>,
    pub format: OutputFormat,
}
