//! Core data types used across all pipeline phases.
//!
//! This module defines the fundamental data structures for representing
//! source locations, parsed literal values, raw invocation records and the
//! deduplicated string entries stored in the database.
//!
//! ## Module Structure
//!
//! - `source`: Source code location types (SourceContext, SourceLocation)
//! - `value`: Parsed literal values (LiteralValue, SitedValue)
//! - `record`: One macro invocation found by the scanner (RawRecord, RecordKind)
//! - `entry`: Deduplicated database entries (StringEntry, Origin)

pub mod entry;
pub mod record;
pub mod source;
pub mod value;

pub use entry::{Origin, StringEntry};
pub use record::{RawRecord, RecordKind};
pub use source::{SourceContext, SourceLocation};
pub use value::{LiteralValue, SitedValue, WILDCARD_LOCALE};
