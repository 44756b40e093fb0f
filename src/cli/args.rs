//! CLI argument definitions using clap.
//!
//! ## Commands
//!
//! - `generate`: Scan sources, write the generated files and the database
//! - `check`: Run the same pipeline without writing anything
//! - `query`: Look up identifiers in the database
//! - `init`: Create a default `.spgmrc.json`

use std::path::PathBuf;

use clap::{Args, CommandFactory, Parser, Subcommand, ValueEnum};

#[derive(Debug, Parser)]
#[command(author, version, about, long_about = None)]
pub struct Arguments {
    #[command(subcommand)]
    pub command: Option<Command>,
}

impl Arguments {
    /// Check if a command was provided, otherwise print help and return None.
    pub fn with_command_or_help(self) -> Option<Self> {
        if self.command.is_none() {
            Self::command().print_help().ok();
            None
        } else {
            Some(self)
        }
    }

    pub fn verbose(&self) -> bool {
        match &self.command {
            Some(Command::Generate(cmd)) | Some(Command::Check(cmd)) => cmd.common.verbose,
            Some(Command::Query(cmd)) => cmd.common.verbose,
            Some(Command::Init) | None => false,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Cargo-style blocks with source context
    #[default]
    Full,
    /// One line per finding
    Compact,
}

/// Common arguments shared by all commands.
///
/// Relative paths resolve against the source root.
#[derive(Debug, Clone, Default, Args)]
pub struct CommonArgs {
    /// Project root directory (default: current directory)
    #[arg(long)]
    pub source_root: Option<PathBuf>,

    /// Directory of the generated files (overrides config file)
    #[arg(long)]
    pub output_dir: Option<PathBuf>,

    /// Database file (overrides config file)
    #[arg(long)]
    pub database: Option<PathBuf>,

    /// Preprocessor define NAME or NAME=VALUE; string values can be used as
    /// string values, e.g. -D 'PRODUCT="Widget"'
    #[arg(short = 'D', long = "define", value_name = "NAME[=VALUE]")]
    pub defines: Vec<String>,

    /// Rescan every file instead of reusing cached results
    #[arg(long)]
    pub force: bool,

    /// Output format of findings
    #[arg(long, value_enum, default_value_t)]
    pub format: OutputFormat,

    /// Enable verbose output
    #[arg(short, long)]
    pub verbose: bool,
}

#[derive(Debug, Args)]
pub struct GenerateCommand {
    #[command(flatten)]
    pub common: CommonArgs,
}

#[derive(Debug, Args)]
pub struct QueryCommand {
    /// Glob pattern matched against identifiers; the symbol prefix is
    /// optional (`SPGM_Wifi*` and `Wifi*` are the same)
    #[arg(default_value = "*")]
    pub pattern: String,

    /// Print matches as AUTO_STRING_DEF(...) lines
    #[arg(long)]
    pub auto_init: bool,

    #[command(flatten)]
    pub common: CommonArgs,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Scan sources and write the generated string files and database
    Generate(GenerateCommand),
    /// Scan sources and report findings without writing anything
    Check(GenerateCommand),
    /// Show identifiers stored in the database
    Query(QueryCommand),
    /// Initialize a new .spgmrc.json configuration file
    Init,
}
