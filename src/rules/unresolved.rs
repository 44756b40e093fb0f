//! Unresolved reference detection rule.
//!
//! Detects identifiers that are referenced but have no default value: no
//! record supplied one and no `*` locale stands in for it. The generated
//! code would have nothing to store, so this is fatal.

use crate::{core::data::StringEntry, issues::UnresolvedReferenceIssue};

/// Check every referenced entry for a resolvable value.
///
/// Issues come out in entry order; the reporter sorts them.
pub fn check_unresolved_references(entries: &[StringEntry]) -> Vec<UnresolvedReferenceIssue> {
    entries
        .iter()
        .filter(|entry| entry.is_referenced() && !entry.is_resolved())
        .filter_map(|entry| {
            let location = entry.references.first()?.clone();
            Some(UnresolvedReferenceIssue {
                identifier: entry.identifier.clone(),
                location,
                references: entry.references.clone(),
                locales: entry.locales.keys().cloned().collect(),
            })
        })
        .collect()
}
