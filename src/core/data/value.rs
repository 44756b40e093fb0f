use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use super::SourceLocation;

/// Locale label meaning "any locale without its own variant".
pub const WILDCARD_LOCALE: &str = "*";

/// The value part of one macro invocation: an optional default text plus
/// per-locale variants.
///
/// All texts are stored as C string literal content, exactly as written in
/// the source (escape sequences are kept verbatim, adjacent literals are
/// already concatenated).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LiteralValue {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub locales: BTreeMap<String, String>,
}

impl LiteralValue {
    pub fn with_default(default: impl Into<String>) -> Self {
        Self {
            default: Some(default.into()),
            locales: BTreeMap::new(),
        }
    }

    /// Builder used mostly by tests: add one locale variant.
    pub fn locale(mut self, code: impl Into<String>, value: impl Into<String>) -> Self {
        self.locales.insert(code.into(), value.into());
        self
    }

    /// True when the invocation carried neither a default nor a locale.
    pub fn is_empty(&self) -> bool {
        self.default.is_none() && self.locales.is_empty()
    }

    /// SHA-256 over the default and the sorted locale map, hex encoded.
    pub fn content_hash(&self) -> String {
        content_hash(
            self.default.as_deref(),
            self.locales.iter().map(|(k, v)| (k.as_str(), v.as_str())),
        )
    }

    /// Short human readable rendering: `"Text", de: "Text"`.
    pub fn describe(&self) -> String {
        describe(
            self.default.as_deref(),
            self.locales.iter().map(|(k, v)| (k.as_str(), v.as_str())),
        )
    }
}

/// A text together with the location that supplied it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SitedValue {
    pub value: String,
    pub location: SourceLocation,
}

impl SitedValue {
    pub fn new(value: impl Into<String>, location: SourceLocation) -> Self {
        Self {
            value: value.into(),
            location,
        }
    }
}

pub(crate) fn content_hash<'a>(
    default: Option<&str>,
    locales: impl Iterator<Item = (&'a str, &'a str)>,
) -> String {
    let mut hasher = Sha256::new();
    match default {
        Some(value) => {
            hasher.update([1u8]);
            hasher.update(value.as_bytes());
        }
        None => hasher.update([0u8]),
    }
    for (code, value) in locales {
        hasher.update([0u8]);
        hasher.update(code.as_bytes());
        hasher.update([0u8]);
        hasher.update(value.as_bytes());
    }
    hex::encode(hasher.finalize())
}

pub(crate) fn describe<'a>(
    default: Option<&str>,
    locales: impl Iterator<Item = (&'a str, &'a str)>,
) -> String {
    let mut parts: Vec<String> = Vec::new();
    if let Some(value) = default {
        parts.push(format!("\"{}\"", value));
    }
    parts.extend(locales.map(|(code, value)| format!("{}: \"{}\"", code, value)));
    if parts.is_empty() {
        "(no value)".to_string()
    } else {
        parts.join(", ")
    }
}
