//! Merge policy for string entries.
//!
//! A candidate (one raw record) is merged into the entry with the same
//! identifier. The rule "same value merges, different value conflicts" is
//! applied per (identifier, locale key): the default is one key, every
//! locale code is another. A rejected candidate leaves the entry untouched.

use crate::core::data::{
    LiteralValue, Origin, RawRecord, RecordKind, SitedValue, SourceLocation, StringEntry,
};

/// Why a candidate could not be merged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MergeConflict {
    /// Two different default values (or two different auto-init contents).
    Value {
        identifier: String,
        existing: SitedValue,
        incoming: SitedValue,
    },
    /// Same locale code, two different values.
    Locale {
        identifier: String,
        locale: String,
        existing: SitedValue,
        incoming: SitedValue,
    },
}

impl MergeConflict {
    pub fn identifier(&self) -> &str {
        match self {
            MergeConflict::Value { identifier, .. } | MergeConflict::Locale { identifier, .. } => {
                identifier
            }
        }
    }
}

/// The part of a record the resolver looks at.
#[derive(Debug, Clone, Copy)]
pub struct Candidate<'a> {
    pub origin: Origin,
    pub value: &'a LiteralValue,
    pub location: &'a SourceLocation,
    /// References are counted as usages; definitions are not.
    pub is_reference: bool,
}

impl<'a> From<&'a RawRecord> for Candidate<'a> {
    fn from(record: &'a RawRecord) -> Self {
        Self {
            origin: record.kind.origin(),
            value: &record.value,
            location: &record.location,
            is_reference: record.kind == RecordKind::Reference,
        }
    }
}

/// First encounter: build a new entry from the candidate.
pub fn create(identifier: &str, candidate: Candidate<'_>) -> StringEntry {
    let mut entry = StringEntry::new(identifier, candidate.origin);
    entry.default_value = candidate
        .value
        .default
        .as_ref()
        .map(|text| SitedValue::new(text.as_str(), candidate.location.clone()));
    entry.locales = candidate
        .value
        .locales
        .iter()
        .map(|(code, text)| {
            (
                code.clone(),
                SitedValue::new(text.as_str(), candidate.location.clone()),
            )
        })
        .collect();
    entry.refresh_hash();
    account(&mut entry, candidate);
    entry
}

/// Merge a candidate into an existing entry.
///
/// On conflict every clashing key is reported and the entry is not changed.
pub fn merge_into(entry: &mut StringEntry, candidate: Candidate<'_>) -> Result<(), Vec<MergeConflict>> {
    if candidate.value.is_empty() || candidate.value.content_hash() == entry.content_hash {
        promote(entry, candidate);
        account(entry, candidate);
        return Ok(());
    }

    let mut conflicts = Vec::new();
    let default_is_new = match (&entry.default_value, &candidate.value.default) {
        (Some(existing), Some(incoming)) if existing.value != *incoming => {
            conflicts.push(MergeConflict::Value {
                identifier: entry.identifier.clone(),
                existing: existing.clone(),
                incoming: SitedValue::new(incoming.as_str(), candidate.location.clone()),
            });
            false
        }
        (None, Some(_)) => true,
        _ => false,
    };

    let mut new_locales = Vec::new();
    for (code, incoming) in &candidate.value.locales {
        match entry.locales.get(code) {
            Some(existing) if existing.value != *incoming => {
                conflicts.push(MergeConflict::Locale {
                    identifier: entry.identifier.clone(),
                    locale: code.clone(),
                    existing: existing.clone(),
                    incoming: SitedValue::new(incoming.as_str(), candidate.location.clone()),
                });
            }
            Some(_) => {}
            None => new_locales.push((code, incoming)),
        }
    }

    if !conflicts.is_empty() {
        return Err(conflicts);
    }

    if default_is_new && let Some(text) = &candidate.value.default {
        entry.default_value = Some(SitedValue::new(text.as_str(), candidate.location.clone()));
    }
    for (code, text) in new_locales {
        entry.locales.insert(
            code.clone(),
            SitedValue::new(text.as_str(), candidate.location.clone()),
        );
    }
    entry.refresh_hash();
    promote(entry, candidate);
    account(entry, candidate);
    Ok(())
}

/// Merge an auto-init member into an earlier member with the same name.
///
/// Auto-init entries are emitted as whole rows, so only identical content
/// collapses; anything else is a value conflict.
pub fn merge_auto_init(entry: &mut StringEntry, candidate: Candidate<'_>) -> Result<(), MergeConflict> {
    if candidate.value.content_hash() == entry.content_hash {
        account(entry, candidate);
        return Ok(());
    }
    let existing_location = entry
        .first_location()
        .cloned()
        .unwrap_or_else(|| candidate.location.clone());
    Err(MergeConflict::Value {
        identifier: entry.identifier.clone(),
        existing: SitedValue::new(entry.describe(), existing_location),
        incoming: SitedValue::new(candidate.value.describe(), candidate.location.clone()),
    })
}

/// A manual definition makes the entry authoritative.
fn promote(entry: &mut StringEntry, candidate: Candidate<'_>) {
    if candidate.origin == Origin::Fixed {
        entry.origin = Origin::Fixed;
    }
}

fn account(entry: &mut StringEntry, candidate: Candidate<'_>) {
    if candidate.is_reference {
        entry.usage_count += 1;
        entry.references.push(candidate.location.clone());
    }
    if !candidate.value.is_empty() {
        entry.definitions.push(candidate.location.clone());
    }
}
