//! Persistent string database.
//!
//! The database is a JSON file holding two things:
//!
//! - per scanned file: its content hash and the raw records found in it, so
//!   unchanged files need not be scanned again;
//! - the string entries built from those records on the last successful run.
//!
//! Entries are always rebuilt from the records of the current scan; the
//! previous entry list only contributes its order. Identifiers that no
//! longer appear anywhere are therefore pruned automatically.

use std::{
    collections::{BTreeMap, HashMap},
    fs,
    path::Path,
};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::core::{
    data::{RawRecord, RecordKind, SitedValue, StringEntry},
    merge::{Candidate, MergeConflict, create, merge_auto_init, merge_into},
};
use crate::utils::{beautify, write_atomic};

/// Bumped whenever the file layout changes; older files are discarded.
pub const DATABASE_VERSION: u32 = 1;

/// Cached scan result of one source file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileRecords {
    /// SHA-256 of the file content.
    pub hash: String,
    #[serde(default)]
    pub records: Vec<RawRecord>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Database {
    pub version: u32,
    /// Hash of everything besides file content that affects scan results
    /// (scanner revision, defines, macro set). A different fingerprint
    /// invalidates `files`.
    #[serde(default)]
    pub fingerprint: String,
    /// Keyed by path relative to the project root.
    #[serde(default)]
    pub files: BTreeMap<String, FileRecords>,
    #[serde(default)]
    entries: Vec<StringEntry>,
    #[serde(default)]
    auto_init: Vec<StringEntry>,
    #[serde(skip)]
    index: HashMap<String, usize>,
    #[serde(skip)]
    auto_init_index: HashMap<String, usize>,
}

impl Default for Database {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Deserialize)]
struct VersionProbe {
    #[serde(default)]
    version: u32,
}

impl Database {
    pub fn new() -> Self {
        Self {
            version: DATABASE_VERSION,
            fingerprint: String::new(),
            files: BTreeMap::new(),
            entries: Vec::new(),
            auto_init: Vec::new(),
            index: HashMap::new(),
            auto_init_index: HashMap::new(),
        }
    }

    /// Load the database at `path`.
    ///
    /// A missing file or a file written by another layout version yields an
    /// empty database. A file that cannot be parsed is an error; it is never
    /// silently replaced.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::new());
        }
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read database: {}", path.display()))?;

        let probe: VersionProbe = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse database: {}", path.display()))?;
        if probe.version != DATABASE_VERSION {
            return Ok(Self::new());
        }

        let mut database: Database = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse database: {}", path.display()))?;
        database.rebuild_index();
        Ok(database)
    }

    /// Save as pretty-printed JSON through a temp file and a rename.
    pub fn save(&self, path: &Path) -> Result<()> {
        let mut json = serde_json::to_string_pretty(self).context("Failed to serialize database")?;
        json.push('\n');
        write_atomic(path, &json)
    }

    pub fn lookup(&self, identifier: &str) -> Option<&StringEntry> {
        self.index.get(identifier).map(|&i| &self.entries[i])
    }

    pub fn entries(&self) -> &[StringEntry] {
        &self.entries
    }

    pub fn auto_init_entries(&self) -> &[StringEntry] {
        &self.auto_init
    }

    /// Create the entry or merge the candidate into it.
    pub fn upsert(
        &mut self,
        identifier: &str,
        candidate: Candidate<'_>,
    ) -> Result<&StringEntry, Vec<MergeConflict>> {
        let index = match self.index.get(identifier) {
            Some(&index) => {
                merge_into(&mut self.entries[index], candidate)?;
                index
            }
            None => {
                self.entries.push(create(identifier, candidate));
                let index = self.entries.len() - 1;
                self.index.insert(identifier.to_string(), index);
                index
            }
        };
        Ok(&self.entries[index])
    }

    /// Append an auto-init member; identical duplicates collapse into the
    /// first occurrence.
    pub fn add_auto_init(&mut self, record: &RawRecord) -> Result<(), MergeConflict> {
        let candidate = Candidate::from(record);
        match self.auto_init_index.get(&record.identifier) {
            Some(&index) => merge_auto_init(&mut self.auto_init[index], candidate),
            None => {
                self.auto_init.push(create(&record.identifier, candidate));
                self.auto_init_index
                    .insert(record.identifier.clone(), self.auto_init.len() - 1);
                Ok(())
            }
        }
    }

    /// Route a record to the entry list or the auto-init list.
    pub fn apply(&mut self, record: &RawRecord) -> Result<(), Vec<MergeConflict>> {
        match record.kind {
            RecordKind::AutoInit => self.add_auto_init(record).map_err(|c| vec![c]),
            RecordKind::Definition | RecordKind::Reference => self
                .upsert(&record.identifier, Candidate::from(record))
                .map(|_| ()),
        }
    }

    /// Order entries known to `previous` the way `previous` had them, and
    /// append the new ones in the order they were first encountered.
    pub fn order_like(&mut self, previous: &Database) {
        let mut known: Vec<(usize, StringEntry)> = Vec::new();
        let mut new = Vec::new();
        for entry in self.entries.drain(..) {
            match previous.index.get(&entry.identifier) {
                Some(&position) => known.push((position, entry)),
                None => new.push(entry),
            }
        }
        known.sort_by_key(|(position, _)| *position);
        self.entries = known.into_iter().map(|(_, entry)| entry).chain(new).collect();
        self.rebuild_index();
    }

    /// Give every referenced entry without a value its identifier as text.
    ///
    /// Returns the identifiers that were filled.
    pub fn fill_auto_values(&mut self) -> Vec<String> {
        let mut filled = Vec::new();
        for entry in &mut self.entries {
            if entry.is_resolved() || !entry.is_referenced() {
                continue;
            }
            let Some(location) = entry.references.first().cloned() else {
                continue;
            };
            entry.default_value = Some(SitedValue::new(beautify(&entry.identifier), location));
            entry.refresh_hash();
            filled.push(entry.identifier.clone());
        }
        filled
    }

    fn rebuild_index(&mut self) {
        self.index = self
            .entries
            .iter()
            .enumerate()
            .map(|(i, entry)| (entry.identifier.clone(), i))
            .collect();
        self.auto_init_index = self
            .auto_init
            .iter()
            .enumerate()
            .map(|(i, entry)| (entry.identifier.clone(), i))
            .collect();
    }
}
