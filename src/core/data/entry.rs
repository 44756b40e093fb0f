use std::{collections::BTreeMap, fmt};

use serde::{Deserialize, Serialize};

use super::{
    LiteralValue, SitedValue, SourceLocation,
    value::{content_hash, describe},
};

/// Provenance of a string entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Origin {
    /// Defined with `PROGMEM_STRING_DEF` or in the config file. Authoritative.
    Fixed,
    /// Discovered through a reference macro, possibly with an inline default.
    Auto,
    /// Member of an auto-init block; lives in a separate ordered list.
    AutoInit,
}

impl fmt::Display for Origin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Origin::Fixed => write!(f, "fixed"),
            Origin::Auto => write!(f, "auto"),
            Origin::AutoInit => write!(f, "auto-init"),
        }
    }
}

/// The unit of deduplicated storage: everything known about one identifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StringEntry {
    pub identifier: String,
    pub origin: Origin,
    /// Fallback text and the site that first supplied it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_value: Option<SitedValue>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub locales: BTreeMap<String, SitedValue>,
    /// Number of reference invocations (`SPGM`/`FSPGM`/`PSPGM`).
    pub usage_count: usize,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub references: Vec<SourceLocation>,
    /// Every site that supplied a value, in encounter order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub definitions: Vec<SourceLocation>,
    pub content_hash: String,
}

impl StringEntry {
    pub fn new(identifier: impl Into<String>, origin: Origin) -> Self {
        let mut entry = Self {
            identifier: identifier.into(),
            origin,
            default_value: None,
            locales: BTreeMap::new(),
            usage_count: 0,
            references: Vec::new(),
            definitions: Vec::new(),
            content_hash: String::new(),
        };
        entry.refresh_hash();
        entry
    }

    pub fn default_text(&self) -> Option<&str> {
        self.default_value.as_ref().map(|v| v.value.as_str())
    }

    /// An entry is resolved when it has a default value. The parser folds a
    /// `*` variant into the default, so locale-only entries with a wildcard
    /// are resolved as well.
    pub fn is_resolved(&self) -> bool {
        self.default_value.is_some()
    }

    pub fn is_referenced(&self) -> bool {
        self.usage_count > 0
    }

    /// Values without their sites.
    pub fn literal_value(&self) -> LiteralValue {
        LiteralValue {
            default: self.default_text().map(str::to_string),
            locales: self
                .locales
                .iter()
                .map(|(code, v)| (code.clone(), v.value.clone()))
                .collect(),
        }
    }

    pub fn refresh_hash(&mut self) {
        self.content_hash = content_hash(
            self.default_text(),
            self.locales
                .iter()
                .map(|(code, v)| (code.as_str(), v.value.as_str())),
        );
    }

    pub fn describe(&self) -> String {
        describe(
            self.default_text(),
            self.locales
                .iter()
                .map(|(code, v)| (code.as_str(), v.value.as_str())),
        )
    }

    /// First location worth pointing a diagnostic at.
    pub fn first_location(&self) -> Option<&SourceLocation> {
        self.definitions.first().or(self.references.first())
    }
}
