use anyhow::{Context, Result, bail};
use glob::Pattern;

use super::super::args::QueryCommand;
use super::{CommandKind, CommandResult, CommandSummary, QuerySummary, helper::finish};
use crate::core::{Database, GenerateContext, StringEntry};

pub fn query(cmd: QueryCommand) -> Result<CommandResult> {
    let ctx = GenerateContext::new(&cmd.common)?;
    if !ctx.database_path.exists() {
        bail!(
            "no database at {}, run `spgm generate` first",
            ctx.database_path.display()
        );
    }
    let database = Database::load(&ctx.database_path)?;

    let symbol_prefix = ctx.config.symbol_prefix.clone();
    let matches = find_matches(&database, &cmd.pattern, &symbol_prefix)?;

    Ok(finish(
        CommandKind::Query,
        CommandSummary::Query(QuerySummary {
            pattern: cmd.pattern,
            symbol_prefix,
            auto_init: cmd.auto_init,
            matches,
        }),
        Vec::new(),
        cmd.common.format,
    ))
}

/// Entries and auto-init members whose identifier matches `pattern`, with
/// or without the symbol prefix.
pub fn find_matches(
    database: &Database,
    pattern: &str,
    symbol_prefix: &str,
) -> Result<Vec<StringEntry>> {
    let pattern = pattern.strip_prefix(symbol_prefix).unwrap_or(pattern);
    let pattern =
        Pattern::new(pattern).with_context(|| format!("Invalid pattern: \"{}\"", pattern))?;

    Ok(database
        .entries()
        .iter()
        .chain(database.auto_init_entries())
        .filter(|entry| pattern.matches(&entry.identifier))
        .cloned()
        .collect())
}
