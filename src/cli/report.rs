//! Report formatting and printing utilities.
//!
//! Findings are displayed in cargo-style blocks, or one line each with
//! `--format compact`. Kept apart from the pipeline so spgm can be used as a
//! library.

use std::io::{self, Write};

use colored::Colorize;
use unicode_width::UnicodeWidthStr;

use super::{
    args::OutputFormat,
    commands::{CommandKind, CommandResult, CommandSummary, InitSummary, QuerySummary, RunSummary},
};
use crate::config::CONFIG_FILE_NAME;
use crate::core::{SourceLocation, StringEntry};
use crate::issues::{Issue, Report, ReportLocation, Severity};

/// Success mark for consistent output formatting.
pub const SUCCESS_MARK: &str = "\u{2713}"; // ✓

/// Failure mark for consistent output formatting.
pub const FAILURE_MARK: &str = "\u{2718}"; // ✘

/// Maximum number of related locations to display per issue.
const MAX_RELATED_DISPLAY: usize = 3;

/// Print issues in cargo-style format to stdout.
pub fn report(issues: &[Issue]) {
    report_to(issues, &mut io::stdout().lock());
}

/// Print issues to a custom writer.
pub fn report_to<W: Write>(issues: &[Issue], writer: &mut W) {
    if issues.is_empty() {
        return;
    }

    let mut sorted = issues.to_vec();
    sorted.sort();

    let max_line_width = calculate_max_line_width(&sorted);

    for issue in &sorted {
        print_issue(issue, writer, max_line_width);
    }

    print_summary(&sorted, writer);
}

/// Print one line per issue: `file:line:col: severity[rule]: message`.
pub fn report_compact_to<W: Write>(issues: &[Issue], writer: &mut W) {
    let mut sorted = issues.to_vec();
    sorted.sort();

    for issue in &sorted {
        let loc = issue.location();
        let (file_path, line, col, _) = extract_location_info(&loc);
        let position = if line == 0 {
            file_path.to_string()
        } else {
            format!("{}:{}:{}", file_path, line, col)
        };

        let related = issue.related();
        let also = if related.is_empty() {
            String::new()
        } else {
            let sites: Vec<String> = related.iter().map(|r| r.location.to_string()).collect();
            format!(" (also: {})", sites.join(", "))
        };

        let _ = writeln!(
            writer,
            "{}: {}[{}]: {}{}",
            position,
            issue.report_severity(),
            issue.report_rule(),
            issue.message(),
            also
        );
    }
}

// ============================================================
// Internal Functions
// ============================================================

fn print_issue<W: Write>(issue: &Issue, writer: &mut W, max_line_width: usize) {
    let loc = issue.location();
    let (file_path, line, col, source_line) = extract_location_info(&loc);

    let severity = issue.report_severity();
    let severity_str = match severity {
        Severity::Error => "error".bold().red(),
        Severity::Warning => "warning".bold().yellow(),
    };

    let _ = writeln!(
        writer,
        "{}: \"{}\"  {}",
        severity_str,
        issue.message(),
        issue.report_rule().to_string().dimmed().cyan()
    );

    if line == 0 {
        let _ = writeln!(writer, "  {} {}", "-->".blue(), file_path);
    } else {
        let _ = writeln!(writer, "  {} {}:{}:{}", "-->".blue(), file_path, line, col);
    }

    if let Some(source_line) = source_line {
        let caret_char = match severity {
            Severity::Error => "^".red(),
            Severity::Warning => "^".yellow(),
        };

        let _ = writeln!(
            writer,
            "{:>width$} {}",
            "",
            "|".blue(),
            width = max_line_width
        );
        let _ = writeln!(
            writer,
            "{:>width$} {} {}",
            line.to_string().blue(),
            "|".blue(),
            source_line,
            width = max_line_width
        );

        // col is 1-based
        let prefix = if col > 1 {
            source_line.chars().take(col - 1).collect::<String>()
        } else {
            String::new()
        };
        let caret_padding = UnicodeWidthStr::width(prefix.as_str());
        let _ = writeln!(
            writer,
            "{:>width$} {} {:>padding$}{}",
            "",
            "|".blue(),
            "",
            caret_char,
            width = max_line_width,
            padding = caret_padding
        );
    }

    if let Some(details) = issue.details() {
        let _ = writeln!(
            writer,
            "{:>width$} {} {} {}",
            "",
            "=".blue(),
            "note:".bold(),
            details,
            width = max_line_width
        );
    }

    if let Some(hint) = issue.hint() {
        let _ = writeln!(
            writer,
            "{:>width$} {} {} {}",
            "",
            "=".blue(),
            "hint:".bold().cyan(),
            hint,
            width = max_line_width
        );
    }

    print_related(issue, writer, max_line_width);

    let _ = writeln!(writer);
}

fn print_related<W: Write>(issue: &Issue, writer: &mut W, max_line_width: usize) {
    let related = issue.related();
    let total = related.len();
    let display_count = total.min(MAX_RELATED_DISPLAY);

    for (i, item) in related.iter().take(display_count).enumerate() {
        let remaining = total - display_count;
        let suffix = if i == display_count - 1 && remaining > 0 {
            format!(" (and {} more)", remaining)
        } else {
            String::new()
        };

        let _ = writeln!(
            writer,
            "{:>width$} {} {} {}{}",
            "",
            "=".blue(),
            format!("{}:", item.label).bold(),
            item.location,
            suffix,
            width = max_line_width
        );
    }
}

fn print_summary<W: Write>(issues: &[Issue], writer: &mut W) {
    let total_errors = issues
        .iter()
        .filter(|i| i.report_severity() == Severity::Error)
        .count();
    let total_warnings = issues.len() - total_errors;

    let _ = writeln!(
        writer,
        "{} {} problems ({} {}, {} {})",
        FAILURE_MARK.red(),
        issues.len(),
        total_errors,
        if total_errors == 1 { "error" } else { "errors" }.red(),
        total_warnings,
        if total_warnings == 1 {
            "warning"
        } else {
            "warnings"
        }
        .yellow()
    );
}

fn extract_location_info<'a>(
    loc: &'a ReportLocation<'a>,
) -> (&'a str, usize, usize, Option<&'a str>) {
    match loc {
        ReportLocation::Source(ctx) => (
            ctx.file_path(),
            ctx.line(),
            ctx.col(),
            Some(&ctx.source_line),
        ),
        ReportLocation::Site(loc) => (&loc.file_path, loc.line, loc.col, None),
        ReportLocation::File { path } => (path, 0, 0, None),
    }
}

fn calculate_max_line_width(issues: &[Issue]) -> usize {
    issues
        .iter()
        .filter_map(|i| match i.location() {
            ReportLocation::Source(ctx) => Some(ctx.line()),
            ReportLocation::Site(_) | ReportLocation::File { .. } => None,
        })
        .max()
        .map(|n| n.to_string().len())
        .unwrap_or(1)
}

fn plural(count: usize, word: &str) -> String {
    if count == 1 {
        format!("{} {}", count, word)
    } else {
        format!("{} {}s", count, word)
    }
}

// ============================================================
// Command Output
// ============================================================

pub fn print(result: &CommandResult) {
    let mut stdout = io::stdout().lock();
    print_to(result, &mut stdout);
}

pub fn print_to<W: Write>(result: &CommandResult, writer: &mut W) {
    match &result.summary {
        CommandSummary::Run(summary) => {
            match result.format {
                OutputFormat::Full => report_to(&result.issues, writer),
                OutputFormat::Compact => report_compact_to(&result.issues, writer),
            }
            if result.error_count == 0 {
                print_run_to(summary, result.kind, writer);
            }
        }
        CommandSummary::Query(summary) => print_query_to(summary, writer),
        CommandSummary::Init(summary) => print_init(summary),
    }
}

fn print_run_to<W: Write>(summary: &RunSummary, kind: CommandKind, writer: &mut W) {
    let mut msg = format!(
        "{} {}, {}",
        if kind == CommandKind::Check {
            "Checked"
        } else {
            "Generated from"
        },
        plural(summary.files_scanned, "source file"),
        plural(summary.emitted_count, "string"),
    );
    if summary.auto_init_count > 0 {
        msg.push_str(&format!(
            ", {}",
            plural(summary.auto_init_count, "auto-init string")
        ));
    }
    if summary.is_apply {
        if summary.written.is_empty() {
            msg.push_str(" - outputs up to date");
        } else {
            msg.push_str(&format!(" - updated {}", summary.written.join(", ")));
        }
    }
    let _ = writeln!(writer, "{} {}", SUCCESS_MARK.green(), msg.green());
}

fn print_query_to<W: Write>(summary: &QuerySummary, writer: &mut W) {
    if summary.matches.is_empty() {
        let _ = writeln!(
            writer,
            "No identifiers match \"{}\"",
            summary.pattern
        );
        return;
    }

    if summary.auto_init {
        for entry in &summary.matches {
            let _ = writeln!(writer, "{}", auto_init_line(entry));
        }
        return;
    }

    for entry in &summary.matches {
        print_entry(entry, &summary.symbol_prefix, writer);
    }
    let _ = writeln!(
        writer,
        "{}",
        format!("{} matched", plural(summary.matches.len(), "identifier")).dimmed()
    );
}

fn print_entry<W: Write>(entry: &StringEntry, symbol_prefix: &str, writer: &mut W) {
    let _ = writeln!(
        writer,
        "{}{}  {}  {}",
        symbol_prefix.dimmed(),
        entry.identifier.bold(),
        entry.origin.to_string().cyan(),
        format!("used {}x", entry.usage_count).dimmed()
    );

    match &entry.default_value {
        Some(default) => {
            let _ = writeln!(
                writer,
                "  default: \"{}\"  {}",
                default.value,
                location_suffix(&default.location)
            );
        }
        None => {
            let _ = writeln!(writer, "  default: {}", "(none)".dimmed());
        }
    }
    for (code, value) in &entry.locales {
        let _ = writeln!(
            writer,
            "  {}: \"{}\"  {}",
            code,
            value.value,
            location_suffix(&value.location)
        );
    }
    print_locations(writer, "defined", &entry.definitions);
    print_locations(writer, "referenced", &entry.references);
}

fn print_locations<W: Write>(writer: &mut W, label: &str, locations: &[SourceLocation]) {
    if locations.is_empty() {
        return;
    }
    let shown: Vec<String> = locations
        .iter()
        .take(MAX_RELATED_DISPLAY)
        .map(|l| l.to_string())
        .collect();
    let more = locations.len().saturating_sub(MAX_RELATED_DISPLAY);
    let suffix = if more > 0 {
        format!(" (and {} more)", more)
    } else {
        String::new()
    };
    let _ = writeln!(writer, "  {}: {}{}", label, shown.join(", "), suffix);
}

fn location_suffix(location: &SourceLocation) -> String {
    format!("({})", location).dimmed().to_string()
}

/// `AUTO_STRING_DEF(id, "default", de: "...")`, ready to paste into an
/// auto-init block.
fn auto_init_line(entry: &StringEntry) -> String {
    let mut args = vec![entry.identifier.clone()];
    if let Some(default) = entry.default_text() {
        args.push(format!("\"{}\"", default));
    }
    for (code, value) in &entry.locales {
        args.push(format!("{}: \"{}\"", code, value.value));
    }
    format!("AUTO_STRING_DEF({})", args.join(", "))
}

fn print_init(summary: &InitSummary) {
    if summary.created {
        println!(
            "{} {}",
            SUCCESS_MARK.green(),
            format!("Created {}", CONFIG_FILE_NAME).green()
        );
    }
    if let Some(error) = &summary.error {
        eprintln!("{} {}", "error:".bold().red(), error);
    }
}

// ============================================================
// Tests
// ============================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{
        SourceContext,
        data::{Origin, SitedValue},
        parsers::literal::LiteralError,
    };
    use crate::issues::{ConflictIssue, IoErrorIssue, ParseErrorIssue, UnusedDefinitionIssue};

    fn strip_ansi(s: &str) -> String {
        let mut result = String::new();
        let mut chars = s.chars().peekable();
        while let Some(c) = chars.next() {
            if c == '\x1b' {
                while let Some(&next) = chars.peek() {
                    chars.next();
                    if next == 'm' {
                        break;
                    }
                }
            } else {
                result.push(c);
            }
        }
        result
    }

    fn render(issues: &[Issue]) -> String {
        let mut output = Vec::new();
        report_to(issues, &mut output);
        strip_ansi(&String::from_utf8(output).unwrap())
    }

    fn conflict() -> Issue {
        Issue::Conflict(ConflictIssue {
            identifier: "Title".to_string(),
            existing: SitedValue::new("A", SourceLocation::new("src/a.cpp", 3, 1)),
            incoming: SitedValue::new("B", SourceLocation::new("src/b.cpp", 7, 5)),
        })
    }

    #[test]
    fn test_report_empty() {
        assert_eq!(render(&[]), "");
    }

    #[test]
    fn test_report_conflict_names_both_sites() {
        let output = render(&[conflict()]);

        assert!(output.contains("error: \"Title\"  conflict"));
        assert!(output.contains("--> src/b.cpp:7:5"));
        assert!(output.contains("= note: \"B\" differs from \"A\" defined at src/a.cpp:3:1"));
        assert!(output.contains("= first defined: src/a.cpp:3:1"));
        assert!(output.contains("1 problems (1 error, 0 warnings)"));
    }

    #[test]
    fn test_report_parse_error_with_caret() {
        let ctx = SourceContext::new(
            SourceLocation::new("src/main.cpp", 12, 9),
            "  x = SPGM(1bad);",
        );
        let issue = Issue::ParseError(ParseErrorIssue {
            context: ctx,
            macro_name: "SPGM".to_string(),
            error: LiteralError::InvalidIdentifier("1bad".to_string()),
        });

        let output = render(&[issue]);

        assert!(output.contains("invalid identifier `1bad`"));
        assert!(output.contains("12 |   x = SPGM(1bad);"));
        assert!(output.contains("   |         ^"));
    }

    #[test]
    fn test_report_unicode_source_line_caret() {
        let ctx = SourceContext::new(SourceLocation::new("src/ui.cpp", 1, 5), "ÄÖÜ SPGM(");
        let issue = Issue::ParseError(ParseErrorIssue {
            context: ctx,
            macro_name: "SPGM".to_string(),
            error: LiteralError::UnbalancedParentheses,
        });

        let output = render(&[issue]);

        assert!(output.contains("1 | ÄÖÜ SPGM("));
        assert!(output.contains("  |     ^"));
    }

    #[test]
    fn test_report_file_level_issue() {
        let issue = Issue::IoError(IoErrorIssue {
            path: "src/locked.cpp".to_string(),
            error: "cannot read file: permission denied".to_string(),
        });

        let output = render(&[issue]);

        assert!(output.contains("--> src/locked.cpp\n"));
        assert!(output.contains("io-error"));
    }

    #[test]
    fn test_report_related_truncation() {
        let definitions: Vec<SourceLocation> = (1..=6)
            .map(|line| SourceLocation::new("src/a.cpp", line, 1))
            .collect();
        let issue = Issue::UnusedDefinition(UnusedDefinitionIssue {
            identifier: "Spare".to_string(),
            value: "\"spare\"".to_string(),
            location: definitions[0].clone(),
            definitions,
        });

        let output = render(&[issue]);

        assert!(output.contains("warning: \"Spare\""));
        assert!(output.contains("= defined: src/a.cpp:4:1 (and 2 more)"));
        assert!(!output.contains("src/a.cpp:5:1"));
    }

    #[test]
    fn test_report_compact() {
        let mut output = Vec::new();
        report_compact_to(&[conflict()], &mut output);
        let output = strip_ansi(&String::from_utf8(output).unwrap());

        assert_eq!(
            output,
            "src/b.cpp:7:5: error[conflict]: Title (also: src/a.cpp:3:1)\n"
        );
    }

    #[test]
    fn test_print_run_summary() {
        let summary = RunSummary {
            files_scanned: 1,
            emitted_count: 3,
            is_apply: true,
            written: vec!["src/generated/spgm_auto_strings.h".to_string()],
            ..Default::default()
        };
        let mut output = Vec::new();
        print_run_to(&summary, CommandKind::Generate, &mut output);
        let output = strip_ansi(&String::from_utf8(output).unwrap());

        assert!(output.contains("Generated from 1 source file, 3 strings"));
        assert!(output.contains("updated src/generated/spgm_auto_strings.h"));
    }

    #[test]
    fn test_auto_init_line() {
        let location = SourceLocation::new("src/boot.cpp", 2, 5);
        let mut entry = StringEntry::new("Boot", Origin::AutoInit);
        entry.default_value = Some(SitedValue::new("Booting", location.clone()));
        entry
            .locales
            .insert("de".to_string(), SitedValue::new("Startet", location));

        assert_eq!(
            auto_init_line(&entry),
            "AUTO_STRING_DEF(Boot, \"Booting\", de: \"Startet\")"
        );
    }
}
