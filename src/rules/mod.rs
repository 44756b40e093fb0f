//! Usage rules for spgm.
//!
//! Pure functions that inspect the merged database after all records have
//! been applied. Each function takes only the data it needs and returns a
//! specific issue type.
//!
//! ## Module Structure
//!
//! - `unresolved`: Referenced identifiers without any value
//! - `unused`: Definitions that are never referenced

pub mod unresolved;
pub mod unused;

pub use unresolved::check_unresolved_references;
pub use unused::check_unused_definitions;
