use std::{
    collections::BTreeMap,
    fs,
    path::{Path, PathBuf},
    sync::LazyLock,
};

use anyhow::{Context, Result, bail};
use glob::Pattern;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::core::{
    data::WILDCARD_LOCALE,
    parsers::literal::{Defines, is_valid_identifier, is_valid_locale_code},
};

pub const CONFIG_FILE_NAME: &str = ".spgmrc.json";

static C_IDENTIFIER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("valid identifier regex")
});

static DEFINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([A-Za-z_][A-Za-z0-9_]*)(?:=(.*))?$").expect("valid define regex")
});

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    #[serde(default)]
    pub ignores: Vec<String>,
    #[serde(default = "default_includes")]
    pub includes: Vec<String>,
    #[serde(default = "default_extensions")]
    pub extensions: Vec<String>,
    #[serde(default = "default_output_dir")]
    pub output_dir: String,
    #[serde(default = "default_declaration_file")]
    pub declaration_file: String,
    #[serde(default = "default_definition_file")]
    pub definition_file: String,
    #[serde(default = "default_database")]
    pub database: String,
    /// Header included by the generated declaration file; empty for none.
    #[serde(default)]
    pub include_file: String,
    #[serde(default = "default_symbol_prefix")]
    pub symbol_prefix: String,
    /// `NAME=VALUE` pairs, same syntax as `-D`.
    #[serde(default)]
    pub defines: Vec<String>,
    /// Emit definitions that are never referenced.
    #[serde(default)]
    pub add_unused: bool,
    /// Use the identifier (underscores as spaces) as value of references
    /// that have none.
    #[serde(default)]
    pub auto_values: bool,
    /// User-maintained values, applied as manual definitions.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub strings: BTreeMap<String, ConfigString>,
}

/// A value maintained in the config file instead of the sources.
///
/// Texts are plain (decoded JSON) strings; they are escaped for C on use.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigString {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub locales: BTreeMap<String, String>,
}

fn default_includes() -> Vec<String> {
    ["src", "include", "lib"].map(String::from).to_vec()
}

fn default_extensions() -> Vec<String> {
    ["c", "cc", "cpp", "cxx", "h", "hh", "hpp", "hxx", "ino"]
        .map(String::from)
        .to_vec()
}

fn default_output_dir() -> String {
    "src/generated".to_string()
}

fn default_declaration_file() -> String {
    "spgm_auto_strings.h".to_string()
}

fn default_definition_file() -> String {
    "spgm_auto_strings.cpp".to_string()
}

fn default_database() -> String {
    ".spgm/database.json".to_string()
}

fn default_symbol_prefix() -> String {
    "SPGM_".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            ignores: Vec::new(),
            includes: default_includes(),
            extensions: default_extensions(),
            output_dir: default_output_dir(),
            declaration_file: default_declaration_file(),
            definition_file: default_definition_file(),
            database: default_database(),
            include_file: String::new(),
            symbol_prefix: default_symbol_prefix(),
            defines: Vec::new(),
            add_unused: false,
            auto_values: false,
            strings: BTreeMap::new(),
        }
    }
}

impl Config {
    /// Validate configuration values.
    pub fn validate(&self) -> Result<()> {
        for pattern in &self.ignores {
            Pattern::new(pattern)
                .with_context(|| format!("Invalid glob pattern in 'ignores': \"{}\"", pattern))?;
        }

        // Patterns without wildcards are literal paths.
        for pattern in &self.includes {
            if pattern.contains('*') || pattern.contains('?') {
                Pattern::new(pattern).with_context(|| {
                    format!("Invalid glob pattern in 'includes': \"{}\"", pattern)
                })?;
            }
        }

        if !C_IDENTIFIER.is_match(&self.symbol_prefix) {
            bail!(
                "Invalid 'symbolPrefix': \"{}\" must start a C identifier",
                self.symbol_prefix
            );
        }

        for (field, value) in [
            ("declarationFile", &self.declaration_file),
            ("definitionFile", &self.definition_file),
            ("database", &self.database),
        ] {
            if value.trim().is_empty() {
                bail!("'{}' must not be empty", field);
            }
        }

        for define in &self.defines {
            validate_define(define).context("Invalid entry in 'defines'")?;
        }

        for (identifier, string) in &self.strings {
            if !is_valid_identifier(identifier) {
                bail!("Invalid identifier in 'strings': \"{}\"", identifier);
            }
            if let Some(code) = string.locales.keys().find(|c| !is_valid_locale_code(c)) {
                bail!(
                    "Invalid locale code in 'strings.{}': \"{}\"",
                    identifier,
                    code
                );
            }
            if string.default.is_none() && !string.locales.contains_key(WILDCARD_LOCALE) {
                bail!(
                    "'strings.{}' needs a \"default\" or a \"*\" locale",
                    identifier
                );
            }
        }

        Ok(())
    }

    /// String defines from the config followed by `extra` (from `-D`); later
    /// entries win.
    pub fn string_defines(&self, extra: &[String]) -> Defines {
        self.defines
            .iter()
            .chain(extra)
            .filter_map(|define| parse_string_define(define))
            .collect()
    }
}

pub fn validate_define(define: &str) -> Result<()> {
    if DEFINE.is_match(define) {
        Ok(())
    } else {
        bail!("\"{}\" is not NAME or NAME=VALUE", define)
    }
}

/// `NAME="text"` (or `NAME=\"text\"` as written in build flags) yields
/// `(NAME, text)`. Defines without a string value are not usable as string
/// values and yield `None`.
fn parse_string_define(define: &str) -> Option<(String, String)> {
    let captures = DEFINE.captures(define)?;
    let name = captures.get(1)?.as_str();
    let mut value = captures.get(2)?.as_str().trim().to_string();
    if value.starts_with("\\\"") && value.ends_with("\\\"") {
        value = value.replace("\\\"", "\"");
    }
    let content = value.strip_prefix('"')?.strip_suffix('"')?;
    Some((name.to_string(), content.to_string()))
}

pub fn default_config_json() -> Result<String> {
    let config = Config::default();
    serde_json::to_string_pretty(&config).context("Failed to generate default config.")
}

pub fn find_config_file(start_dir: &Path) -> Option<PathBuf> {
    let mut current = start_dir.to_path_buf();

    loop {
        let config_path = current.join(CONFIG_FILE_NAME);
        if config_path.exists() {
            return Some(config_path);
        }
        if current.join(".git").exists() {
            return None;
        }
        if !current.pop() {
            return None;
        }
    }
}

/// Result of loading configuration.
pub struct ConfigLoadResult {
    pub config: Config,
    /// Path of the config file, `None` when using defaults.
    pub path: Option<PathBuf>,
}

impl ConfigLoadResult {
    pub fn from_file(&self) -> bool {
        self.path.is_some()
    }
}

pub fn load_config(start_dir: &Path) -> Result<ConfigLoadResult> {
    match find_config_file(start_dir) {
        Some(path) => {
            let content = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read config file: {:?}", path))?;
            let config: Config = serde_json::from_str(&content)
                .with_context(|| format!("Failed to parse config file: {:?}", path))?;
            config.validate()?;
            Ok(ConfigLoadResult {
                config,
                path: Some(path),
            })
        }
        None => Ok(ConfigLoadResult {
            config: Config::default(),
            path: None,
        }),
    }
}
