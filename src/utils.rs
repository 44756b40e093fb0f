//! Common utility functions shared across the codebase.

use std::{
    fs,
    path::{Component, Path},
};

use anyhow::{Context, Result};
use sha2::{Digest, Sha256};

/// Turn an identifier into display text: underscores become spaces.
///
/// # Examples
///
/// ```
/// use spgm::utils::beautify;
///
/// assert_eq!(beautify("Not_Found"), "Not Found");
/// assert_eq!(beautify("404"), "404");
/// ```
pub fn beautify(identifier: &str) -> String {
    identifier.replace('_', " ")
}

/// Hex encoded SHA-256 of `bytes`.
pub fn sha256_hex(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}

/// Escape decoded text (from JSON config) into C string literal content.
///
/// Non-ASCII characters are left alone; the code generator encodes them.
pub fn escape_literal(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if c.is_ascii_control() => out.push_str(&format!("\\x{:02x}", c as u32)),
            c => out.push(c),
        }
    }
    out
}

/// Path of `path` relative to `base` with `/` separators.
///
/// Falls back to the path itself when it is not below `base`.
pub fn relative_path(base: &Path, path: &Path) -> String {
    let relative = path.strip_prefix(base).unwrap_or(path);
    relative
        .components()
        .filter(|c| !matches!(c, Component::CurDir))
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

/// Write `content` to a sibling temp file and rename it over `path`.
pub fn write_atomic(path: &Path, content: &str) -> Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
    }

    let mut temp_name = path
        .file_name()
        .map(|name| name.to_os_string())
        .unwrap_or_default();
    temp_name.push(".tmp");
    let temp_path = path.with_file_name(temp_name);

    fs::write(&temp_path, content)
        .with_context(|| format!("Failed to write temp file: {}", temp_path.display()))?;

    if let Err(rename_error) = fs::rename(&temp_path, path) {
        let _ = fs::remove_file(&temp_path);
        return Err(rename_error)
            .with_context(|| format!("Failed to replace file: {}", path.display()));
    }

    Ok(())
}

/// Write `content` unless the file already holds exactly that content.
///
/// Returns whether the file was written. Leaving unchanged outputs alone
/// keeps their timestamps, so the build does not recompile them.
pub fn write_if_changed(path: &Path, content: &str) -> Result<bool> {
    if let Ok(existing) = fs::read_to_string(path)
        && existing == content
    {
        return Ok(false);
    }
    write_atomic(path, content)?;
    Ok(true)
}
