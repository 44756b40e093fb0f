use anyhow::Result;

use super::super::args::GenerateCommand;
use super::{CommandKind, CommandResult, CommandSummary, RunSummary, helper::finish};
use crate::{core::GenerateContext, utils::relative_path};

/// Run the pipeline; `apply` writes outputs and database when there are no
/// errors (`generate`), otherwise nothing is written (`check`).
pub fn generate(cmd: GenerateCommand, apply: bool) -> Result<CommandResult> {
    let ctx = GenerateContext::new(&cmd.common)?;
    let outcome = ctx.run()?;

    let mut summary = RunSummary {
        files_scanned: outcome.files_scanned,
        files_cached: outcome.files_cached,
        emitted_count: outcome.emitted_count,
        auto_init_count: outcome.database.auto_init_entries().len(),
        is_apply: apply,
        written: Vec::new(),
    };

    if apply && !outcome.has_errors() {
        let written = ctx.write(&outcome)?;
        summary.written = written
            .written
            .iter()
            .map(|path| relative_path(&ctx.root_dir, path))
            .collect();
    }

    let kind = if apply {
        CommandKind::Generate
    } else {
        CommandKind::Check
    };
    Ok(finish(
        kind,
        CommandSummary::Run(summary),
        outcome.issues,
        cmd.common.format,
    ))
}
