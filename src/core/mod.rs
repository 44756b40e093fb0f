//! Core generator engine.
//!
//! Data flows one way through the pipeline:
//!
//! 1. **Scan**: `file_scanner` enumerates sources, `parsers::source` finds
//!    macro invocations and `parsers::literal` parses their arguments
//! 2. **Merge**: records are applied to the `database` following the
//!    policy in `merge`
//! 3. **Generate**: `codegen` renders the declaration and definition files
//!
//! `context` wires the phases together; the database flows back into the
//! next run as a cache.

pub mod codegen;
pub mod context;
pub mod data;
pub mod database;
pub mod file_scanner;
pub mod merge;
pub mod parsers;

pub use context::{GenerateContext, RunOutcome};
pub use data::{Origin, RawRecord, RecordKind, SourceContext, SourceLocation, StringEntry};
pub use database::Database;
pub use merge::MergeConflict;
