//! spgm - shared PROGMEM string generator
//!
//! spgm scans C/C++ sources for string macros (`SPGM(...)`,
//! `PROGMEM_STRING_DEF(...)`, `AUTO_STRING_DEF(...)`), deduplicates the
//! strings by identifier in a persistent database and generates one header
//! and one source file holding every string exactly once in flash memory.
//!
//! ## Module Structure
//!
//! - `cli`: Command-line interface layer
//! - `config`: Configuration file loading and parsing
//! - `core`: Scanning, merging and code generation pipeline
//! - `issues`: Finding types and their report rendering
//! - `rules`: Usage checks run on the merged database
//! - `utils`: Shared utility functions

pub mod cli;
pub mod config;
pub mod core;
pub mod issues;
pub mod rules;
pub mod utils;
