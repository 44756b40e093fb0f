//! Parsers for C/C++ sources.
//!
//! - `literal`: argument list of one macro invocation (identifier, default,
//!   locale clauses)
//! - `source`: lexical scan of a whole file for macro invocations

pub mod literal;
pub mod source;
