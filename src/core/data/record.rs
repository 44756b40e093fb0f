use serde::{Deserialize, Serialize};

use super::{LiteralValue, Origin, SourceLocation};

/// Which macro form produced a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RecordKind {
    /// `PROGMEM_STRING_DEF(id, "value")`: manual, authoritative definition.
    Definition,
    /// `SPGM(id, ...)`, `FSPGM(id, ...)`, `PSPGM(id, ...)`: a use site,
    /// optionally carrying an inline default and locale variants.
    Reference,
    /// `AUTO_STRING_DEF(id, ...)`: member of an auto-init block.
    AutoInit,
}

impl RecordKind {
    pub fn origin(self) -> Origin {
        match self {
            RecordKind::Definition => Origin::Fixed,
            RecordKind::Reference => Origin::Auto,
            RecordKind::AutoInit => Origin::AutoInit,
        }
    }
}

/// One macro invocation as found in a source file.
///
/// Records are what the scanner produces and what the database caches per
/// file; the string entries are rebuilt from them on every run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawRecord {
    pub identifier: String,
    pub kind: RecordKind,
    #[serde(default)]
    pub value: LiteralValue,
    pub location: SourceLocation,
}

impl RawRecord {
    pub fn new(
        identifier: impl Into<String>,
        kind: RecordKind,
        value: LiteralValue,
        location: SourceLocation,
    ) -> Self {
        Self {
            identifier: identifier.into(),
            kind,
            value,
            location,
        }
    }
}
