use std::{fs, path::Path};

use anyhow::Result;

use super::{CommandKind, CommandResult, CommandSummary, InitSummary, helper::finish};
use crate::config::{CONFIG_FILE_NAME, default_config_json};

/// Write a default `.spgmrc.json` into the current directory.
///
/// An existing file is never overwritten; that case is reported as an error
/// in the summary.
pub fn init() -> Result<CommandResult> {
    let config_path = Path::new(CONFIG_FILE_NAME);

    let summary = if config_path.exists() {
        InitSummary {
            created: false,
            error: Some(format!("{} already exists", CONFIG_FILE_NAME)),
        }
    } else {
        fs::write(config_path, default_config_json()? + "\n")?;
        InitSummary {
            created: true,
            error: None,
        }
    };

    Ok(finish(
        CommandKind::Init,
        CommandSummary::Init(summary),
        Vec::new(),
        Default::default(),
    ))
}
