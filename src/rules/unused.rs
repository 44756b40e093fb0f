//! Unused definition detection rule.
//!
//! Detects entries that carry a value but are never referenced. They are
//! left out of the generated code (unless `addUnused` is set) and stay in
//! the database, so this is a warning only.

use crate::{core::data::StringEntry, issues::UnusedDefinitionIssue};

pub fn check_unused_definitions(entries: &[StringEntry]) -> Vec<UnusedDefinitionIssue> {
    entries
        .iter()
        .filter(|entry| !entry.is_referenced())
        .filter_map(|entry| {
            let location = entry.definitions.first()?.clone();
            Some(UnusedDefinitionIssue {
                identifier: entry.identifier.clone(),
                value: entry.describe(),
                location,
                definitions: entry.definitions.clone(),
            })
        })
        .collect()
}
