//! Orchestration of one generator run.
//!
//! # Pipeline
//!
//! 1. **Scan**: enumerate source files, hash them and scan the changed ones
//!    in parallel; unchanged files reuse the records cached in the database.
//! 2. **Merge**: apply all records in canonical file order, then the strings
//!    maintained in the config file.
//! 3. **Resolve**: restore the previous entry order, fill auto values and run
//!    the usage rules.
//! 4. **Generate**: render the declaration and definition files in memory.
//!
//! Nothing is written by [`GenerateContext::run`]. [`GenerateContext::write`]
//! persists a successful outcome.

use std::{
    collections::BTreeMap,
    fs,
    path::PathBuf,
};

use anyhow::{Context as _, Result, ensure};
use colored::Colorize;
use rayon::prelude::*;

use crate::{
    cli::args::CommonArgs,
    config::{CONFIG_FILE_NAME, Config, ConfigString, load_config, validate_define},
    core::{
        codegen::{CodegenOptions, GeneratedFiles, generate},
        data::{LiteralValue, RawRecord, RecordKind, SourceLocation, StringEntry},
        database::{DATABASE_VERSION, Database, FileRecords},
        file_scanner::scan_files,
        parsers::{
            literal::{Defines, normalize_wildcard},
            source::{
                AUTO_INIT_MACROS, DEFINITION_MACROS, REFERENCE_MACROS, SCANNER_REVISION,
                scan_source,
            },
        },
    },
    issues::{IoErrorIssue, Issue, ParseErrorIssue, Severity},
    rules::{unresolved::check_unresolved_references, unused::check_unused_definitions},
    utils::{escape_literal, relative_path, sha256_hex, write_if_changed},
};

/// Settings of one run, merged from CLI arguments, config file and defaults.
pub struct GenerateContext {
    pub config: Config,
    /// Path of the config file, `None` when running on defaults.
    pub config_path: Option<PathBuf>,
    /// Project root; every relative path resolves against it.
    pub root_dir: PathBuf,
    pub output_dir: PathBuf,
    pub database_path: PathBuf,
    pub defines: Defines,
    /// Ignore cached per-file records.
    pub force: bool,
    pub verbose: bool,
}

/// Everything a run produced, before anything is written.
pub struct RunOutcome {
    /// All findings, sorted.
    pub issues: Vec<Issue>,
    pub database: Database,
    pub generated: GeneratedFiles,
    pub files_scanned: usize,
    /// Files whose cached records were reused.
    pub files_cached: usize,
    /// Entries written to the generated files.
    pub emitted_count: usize,
    /// Identifiers that received their auto value.
    pub auto_filled: Vec<String>,
}

impl RunOutcome {
    pub fn error_count(&self) -> usize {
        self.issues
            .iter()
            .filter(|i| i.severity() == Severity::Error)
            .count()
    }

    pub fn warning_count(&self) -> usize {
        self.issues
            .iter()
            .filter(|i| i.severity() == Severity::Warning)
            .count()
    }

    pub fn has_errors(&self) -> bool {
        self.error_count() > 0
    }
}

/// Files changed by [`GenerateContext::write`].
#[derive(Debug, Default, PartialEq, Eq)]
pub struct WriteSummary {
    pub written: Vec<PathBuf>,
    pub unchanged: Vec<PathBuf>,
}

enum FileScan {
    Scanned {
        path: String,
        records: FileRecords,
        errors: Vec<ParseErrorIssue>,
        cached: bool,
    },
    Failed(IoErrorIssue),
}

impl GenerateContext {
    /// Build the context from CLI arguments.
    ///
    /// Configuration priority: CLI arguments, then `.spgmrc.json`, then the
    /// built-in defaults.
    pub fn new(args: &CommonArgs) -> Result<Self> {
        let source_root = args
            .source_root
            .clone()
            .unwrap_or_else(|| PathBuf::from("."));
        let root_dir = source_root
            .canonicalize()
            .with_context(|| format!("Source root not found: {}", source_root.display()))?;
        let loaded = load_config(&root_dir)?;
        let mut config = loaded.config;

        if let Some(output_dir) = &args.output_dir {
            config.output_dir = output_dir.to_string_lossy().into_owned();
        }
        if let Some(database) = &args.database {
            config.database = database.to_string_lossy().into_owned();
        }
        for define in &args.defines {
            validate_define(define)?;
        }

        if args.verbose {
            match &loaded.path {
                Some(path) => eprintln!("{} using {}", "note:".bold().cyan(), path.display()),
                None => eprintln!(
                    "{} no {} found, using defaults",
                    "note:".bold().cyan(),
                    CONFIG_FILE_NAME
                ),
            }
        }

        let mut ctx = Self::with_config(root_dir, config, loaded.path, args.verbose);
        ctx.defines = ctx.config.string_defines(&args.defines);
        ctx.force = args.force;
        Ok(ctx)
    }

    pub fn with_config(
        root_dir: PathBuf,
        config: Config,
        config_path: Option<PathBuf>,
        verbose: bool,
    ) -> Self {
        let output_dir = root_dir.join(&config.output_dir);
        let database_path = root_dir.join(&config.database);
        let defines = config.string_defines(&[]);
        Self {
            config,
            config_path,
            root_dir,
            output_dir,
            database_path,
            defines,
            force: false,
            verbose,
        }
    }

    pub fn declaration_path(&self) -> PathBuf {
        self.output_dir.join(&self.config.declaration_file)
    }

    pub fn definition_path(&self) -> PathBuf {
        self.output_dir.join(&self.config.definition_file)
    }

    /// Hash of every input besides file content that changes scan results.
    pub fn fingerprint(&self) -> String {
        let mut defines: Vec<_> = self.defines.iter().collect();
        defines.sort();

        let mut input = format!("v{}.{}\n", DATABASE_VERSION, SCANNER_REVISION);
        for names in [DEFINITION_MACROS, REFERENCE_MACROS, AUTO_INIT_MACROS] {
            input.push_str(&names.join(","));
            input.push('\n');
        }
        for (name, value) in defines {
            input.push_str(&format!("{}={}\n", name, value));
        }
        sha256_hex(input.as_bytes())
    }

    /// Run the whole pipeline in memory.
    ///
    /// Findings are returned in the outcome; `Err` is reserved for failures
    /// that prevent a run altogether, such as an unreadable database.
    pub fn run(&self) -> Result<RunOutcome> {
        let previous = Database::load(&self.database_path)?;
        let fingerprint = self.fingerprint();

        let cache = (!self.force && previous.fingerprint == fingerprint).then_some(&previous.files);
        if self.verbose && cache.is_none() && !previous.files.is_empty() {
            eprintln!("{} rescanning all files", "note:".bold().cyan());
        }

        let excluded = [self.declaration_path(), self.definition_path()];
        let scan = scan_files(
            &self.root_dir,
            &self.config.includes,
            &self.config.ignores,
            &self.config.extensions,
            &excluded,
            self.verbose,
        );

        let scans: Vec<FileScan> = scan
            .files
            .par_iter()
            .map(|file| self.scan_file(file, cache))
            .collect();

        let mut issues: Vec<Issue> = Vec::new();
        let mut database = Database::new();
        database.fingerprint = fingerprint;
        let mut files_cached = 0;

        for file_scan in scans {
            match file_scan {
                FileScan::Scanned {
                    path,
                    records,
                    errors,
                    cached,
                } => {
                    if cached {
                        files_cached += 1;
                    }
                    issues.extend(errors.into_iter().map(Issue::ParseError));
                    for record in &records.records {
                        if let Err(conflicts) = database.apply(record) {
                            issues.extend(conflicts.into_iter().map(Issue::from));
                        }
                    }
                    database.files.insert(path, records);
                }
                FileScan::Failed(issue) => issues.push(Issue::IoError(issue)),
            }
        }

        let config_file = self.config_display_path();
        for (identifier, string) in &self.config.strings {
            let record = config_record(identifier, string, &config_file);
            if let Err(conflicts) = database.apply(&record) {
                issues.extend(conflicts.into_iter().map(Issue::from));
            }
        }

        database.order_like(&previous);

        let auto_filled = if self.config.auto_values {
            database.fill_auto_values()
        } else {
            Vec::new()
        };
        if self.verbose && !auto_filled.is_empty() {
            eprintln!(
                "{} auto values for {} identifier(s)",
                "note:".bold().cyan(),
                auto_filled.len()
            );
        }

        issues.extend(
            check_unresolved_references(database.entries())
                .into_iter()
                .map(Issue::UnresolvedReference),
        );
        issues.extend(
            check_unused_definitions(database.entries())
                .into_iter()
                .map(Issue::UnusedDefinition),
        );
        issues.sort();

        let emitted: Vec<&StringEntry> = database
            .entries()
            .iter()
            .filter(|entry| self.is_emitted(entry))
            .collect();
        let options = CodegenOptions {
            symbol_prefix: &self.config.symbol_prefix,
            declaration_file: &self.config.declaration_file,
            include_file: Some(self.config.include_file.as_str()).filter(|f| !f.is_empty()),
        };
        let generated = generate(&emitted, database.auto_init_entries(), &options);
        let emitted_count = emitted.len();

        Ok(RunOutcome {
            issues,
            database,
            generated,
            files_scanned: scan.files.len(),
            files_cached,
            emitted_count,
            auto_filled,
        })
    }

    /// Write generated files and database of a run without errors.
    ///
    /// Outputs with unchanged content are left untouched. The database is
    /// written last, so an interrupted write is redone by the next run.
    pub fn write(&self, outcome: &RunOutcome) -> Result<WriteSummary> {
        ensure!(
            !outcome.has_errors(),
            "refusing to write the outputs of a run with errors"
        );

        let mut summary = WriteSummary::default();
        for (path, content) in [
            (self.declaration_path(), &outcome.generated.declaration),
            (self.definition_path(), &outcome.generated.definition),
        ] {
            if write_if_changed(&path, content)? {
                summary.written.push(path);
            } else {
                summary.unchanged.push(path);
            }
        }
        outcome.database.save(&self.database_path)?;
        Ok(summary)
    }

    fn is_emitted(&self, entry: &StringEntry) -> bool {
        entry.is_resolved() && (entry.is_referenced() || self.config.add_unused)
    }

    fn scan_file(
        &self,
        file: &str,
        cache: Option<&BTreeMap<String, FileRecords>>,
    ) -> FileScan {
        let path = self.root_dir.join(file);
        let bytes = match fs::read(&path) {
            Ok(bytes) => bytes,
            Err(e) => {
                return FileScan::Failed(IoErrorIssue {
                    path: file.to_string(),
                    error: format!("cannot read file: {}", e),
                });
            }
        };
        let hash = sha256_hex(&bytes);

        if let Some(cached) = cache.and_then(|files| files.get(file))
            && cached.hash == hash
        {
            return FileScan::Scanned {
                path: file.to_string(),
                records: cached.clone(),
                errors: Vec::new(),
                cached: true,
            };
        }

        if self.verbose {
            eprintln!("{} scanning {}", "note:".bold().cyan(), file);
        }
        let text = String::from_utf8_lossy(&bytes);
        let output = scan_source(&text, file, &self.defines);
        FileScan::Scanned {
            path: file.to_string(),
            records: FileRecords {
                hash,
                records: output.records,
            },
            errors: output.errors,
            cached: false,
        }
    }

    /// Location used for strings maintained in the config file.
    fn config_display_path(&self) -> String {
        match &self.config_path {
            Some(path) => relative_path(&self.root_dir, path),
            None => CONFIG_FILE_NAME.to_string(),
        }
    }
}

/// A config string as a manual definition located at the config file.
fn config_record(identifier: &str, string: &ConfigString, config_file: &str) -> RawRecord {
    let mut value = LiteralValue {
        default: string.default.as_deref().map(escape_literal),
        locales: string
            .locales
            .iter()
            .map(|(code, text)| (code.clone(), escape_literal(text)))
            .collect(),
    };
    normalize_wildcard(&mut value);
    RawRecord::new(
        identifier,
        RecordKind::Definition,
        value,
        SourceLocation::new(config_file, 1, 1),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::data::Origin;
    use crate::issues::Rule;
    use pretty_assertions::assert_eq;
    use tempfile::{TempDir, tempdir};

    fn project(files: &[(&str, &str)]) -> TempDir {
        let dir = tempdir().unwrap();
        for (path, content) in files {
            let path = dir.path().join(path);
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(path, content).unwrap();
        }
        dir
    }

    fn context(dir: &TempDir, config: Config) -> GenerateContext {
        GenerateContext::with_config(dir.path().to_path_buf(), config, None, false)
    }

    fn rules(outcome: &RunOutcome) -> Vec<Rule> {
        outcome.issues.iter().map(|i| i.rule()).collect()
    }

    #[test]
    fn test_run_generates_referenced_strings() {
        let dir = project(&[
            ("src/main.cpp", "void f() { print(SPGM(Hello, \"Hello\")); }\n"),
            ("src/other.cpp", "void g() { print(FSPGM(Hello)); }\n"),
        ]);
        let ctx = context(&dir, Config::default());

        let outcome = ctx.run().unwrap();

        assert!(outcome.issues.is_empty());
        assert_eq!(outcome.files_scanned, 2);
        assert_eq!(outcome.emitted_count, 1);
        let entry = outcome.database.lookup("Hello").unwrap();
        assert_eq!(entry.usage_count, 2);
        assert!(outcome.generated.declaration.contains("SPGM_Hello"));
        assert!(outcome.generated.definition.contains("\"Hello\""));
    }

    #[test]
    fn test_run_collects_conflicts_and_refuses_to_write() {
        let dir = project(&[
            ("src/a.cpp", "PROGMEM_STRING_DEF(Title, \"A\");\nSPGM(Title);\n"),
            ("src/b.cpp", "SPGM(Title, \"B\");\n"),
        ]);
        let ctx = context(&dir, Config::default());

        let outcome = ctx.run().unwrap();

        assert_eq!(rules(&outcome), vec![Rule::Conflict]);
        assert!(ctx.write(&outcome).is_err());
        assert!(!ctx.declaration_path().exists());
        assert!(!ctx.database_path.exists());
    }

    #[test]
    fn test_unresolved_and_unused_findings() {
        let dir = project(&[(
            "src/main.cpp",
            "PROGMEM_STRING_DEF(Spare, \"spare\");\nSPGM(Missing);\n",
        )]);
        let ctx = context(&dir, Config::default());

        let outcome = ctx.run().unwrap();

        assert_eq!(
            rules(&outcome),
            vec![Rule::UnusedDefinition, Rule::UnresolvedReference]
        );
        assert_eq!(outcome.error_count(), 1);
        assert_eq!(outcome.warning_count(), 1);
        assert_eq!(outcome.emitted_count, 0);
    }

    #[test]
    fn test_auto_values_and_add_unused() {
        let dir = project(&[(
            "src/main.cpp",
            "PROGMEM_STRING_DEF(Spare, \"spare\");\nSPGM(Not_Found);\n",
        )]);
        let config = Config {
            auto_values: true,
            add_unused: true,
            ..Default::default()
        };
        let ctx = context(&dir, config);

        let outcome = ctx.run().unwrap();

        assert_eq!(rules(&outcome), vec![Rule::UnusedDefinition]);
        assert_eq!(outcome.auto_filled, vec!["Not_Found"]);
        assert_eq!(outcome.emitted_count, 2);
        assert!(outcome.generated.definition.contains("\"Not Found\""));
    }

    #[test]
    fn test_config_strings_resolve_references() {
        let dir = project(&[("src/main.cpp", "SPGM(Quote);\n")]);
        let config = Config {
            strings: BTreeMap::from([(
                "Quote".to_string(),
                ConfigString {
                    default: Some("say \"hi\"".to_string()),
                    locales: BTreeMap::new(),
                },
            )]),
            ..Default::default()
        };
        let ctx = context(&dir, config);

        let outcome = ctx.run().unwrap();

        assert!(outcome.issues.is_empty());
        let entry = outcome.database.lookup("Quote").unwrap();
        assert_eq!(entry.origin, Origin::Fixed);
        assert_eq!(entry.default_text(), Some("say \\\"hi\\\""));
        assert_eq!(
            entry.definitions,
            vec![SourceLocation::new(CONFIG_FILE_NAME, 1, 1)]
        );
    }

    #[test]
    fn test_config_string_conflicts_with_source_definition() {
        let dir = project(&[(
            "src/main.cpp",
            "PROGMEM_STRING_DEF(Title, \"Source\");\nSPGM(Title);\n",
        )]);
        let config = Config {
            strings: BTreeMap::from([(
                "Title".to_string(),
                ConfigString {
                    default: Some("Config".to_string()),
                    locales: BTreeMap::new(),
                },
            )]),
            ..Default::default()
        };
        let ctx = context(&dir, config);

        let outcome = ctx.run().unwrap();

        assert_eq!(rules(&outcome), vec![Rule::Conflict]);
        assert_eq!(
            outcome.database.lookup("Title").unwrap().default_text(),
            Some("Source")
        );
    }

    #[test]
    fn test_config_wildcard_string_is_the_default() {
        let dir = project(&[("src/main.cpp", "SPGM(Unit);\n")]);
        let config = Config {
            strings: BTreeMap::from([(
                "Unit".to_string(),
                ConfigString {
                    default: None,
                    locales: BTreeMap::from([("*".to_string(), "kWh".to_string())]),
                },
            )]),
            ..Default::default()
        };
        let ctx = context(&dir, config);

        let outcome = ctx.run().unwrap();

        assert!(outcome.issues.is_empty());
        let entry = outcome.database.lookup("Unit").unwrap();
        assert_eq!(entry.default_text(), Some("kWh"));
    }

    #[test]
    fn test_defines_substitute_values() {
        let dir = project(&[("src/main.cpp", "PROGMEM_STRING_DEF(Name, PRODUCT);\nSPGM(Name);\n")]);
        let config = Config {
            defines: vec!["PRODUCT=\"Widget\"".to_string()],
            ..Default::default()
        };
        let ctx = context(&dir, config);

        let outcome = ctx.run().unwrap();

        assert!(outcome.issues.is_empty());
        assert_eq!(
            outcome.database.lookup("Name").unwrap().default_text(),
            Some("Widget")
        );
    }

    #[test]
    fn test_write_then_reuse_cache() {
        let dir = project(&[("src/main.cpp", "SPGM(Hello, \"Hello\");\n")]);
        let ctx = context(&dir, Config::default());

        let first = ctx.run().unwrap();
        let summary = ctx.write(&first).unwrap();
        assert_eq!(summary.written.len(), 2);
        assert!(ctx.database_path.exists());

        let second = ctx.run().unwrap();
        assert_eq!(second.files_cached, 1);
        assert_eq!(second.generated, first.generated);
        let summary = ctx.write(&second).unwrap();
        assert!(summary.written.is_empty());
        assert_eq!(summary.unchanged.len(), 2);
    }

    #[test]
    fn test_force_and_fingerprint_disable_cache() {
        let dir = project(&[("src/main.cpp", "SPGM(Hello, \"Hello\");\n")]);
        let mut ctx = context(&dir, Config::default());
        let first = ctx.run().unwrap();
        ctx.write(&first).unwrap();

        ctx.force = true;
        assert_eq!(ctx.run().unwrap().files_cached, 0);

        ctx.force = false;
        ctx.defines.insert("VENDOR".to_string(), "Acme".to_string());
        assert_eq!(ctx.run().unwrap().files_cached, 0);
    }

    #[test]
    fn test_removed_identifiers_are_pruned_and_order_kept() {
        let dir = project(&[(
            "src/main.cpp",
            "SPGM(B, \"b\");\nSPGM(A, \"a\");\nSPGM(C, \"c\");\n",
        )]);
        let ctx = context(&dir, Config::default());
        let first = ctx.run().unwrap();
        ctx.write(&first).unwrap();

        fs::write(
            dir.path().join("src/main.cpp"),
            "SPGM(D, \"d\");\nSPGM(C, \"c\");\nSPGM(B, \"b\");\n",
        )
        .unwrap();
        let second = ctx.run().unwrap();

        let ids: Vec<&str> = second
            .database
            .entries()
            .iter()
            .map(|e| e.identifier.as_str())
            .collect();
        assert_eq!(ids, vec!["B", "C", "D"]);
    }

    #[test]
    fn test_generated_files_are_not_scanned() {
        let dir = project(&[("src/main.cpp", "SPGM(Hello, \"Hello\");\n")]);
        let ctx = context(&dir, Config::default());
        let first = ctx.run().unwrap();
        ctx.write(&first).unwrap();

        let second = ctx.run().unwrap();
        assert_eq!(second.files_scanned, 1);
    }

    #[test]
    fn test_parse_errors_are_reported() {
        let dir = project(&[(
            "src/main.cpp",
            "SPGM(Bad, \"a\" de: \"b\");\nSPGM(Good, \"ok\");\n",
        )]);
        let ctx = context(&dir, Config::default());

        let outcome = ctx.run().unwrap();

        assert_eq!(rules(&outcome), vec![Rule::ParseError]);
        assert!(outcome.has_errors());
        assert!(outcome.database.lookup("Bad").is_none());
        assert_eq!(
            outcome.database.lookup("Good").unwrap().default_text(),
            Some("ok")
        );
    }

    #[test]
    fn test_auto_init_follows_traversal_order() {
        let dir = project(&[
            ("src/m.cpp", "AUTO_STRING_DEF(M1, \"m1\")\n"),
            ("src/b.cpp", "AUTO_STRING_DEF(B1, \"b1\")\nAUTO_STRING_DEF(B2, \"b2\")\n"),
            ("src/a/z/deep.cpp", "AUTO_STRING_DEF(Z1, \"z1\")\n"),
            ("src/a/x.cpp", "AUTO_STRING_DEF(A1, \"a1\")\nAUTO_STRING_DEF(A2, \"a2\")\n"),
        ]);
        let ctx = context(&dir, Config::default());

        let outcome = ctx.run().unwrap();

        assert!(outcome.issues.is_empty());
        let ids: Vec<&str> = outcome
            .database
            .auto_init_entries()
            .iter()
            .map(|e| e.identifier.as_str())
            .collect();
        assert_eq!(ids, vec!["A1", "A2", "Z1", "B1", "B2", "M1"]);

        let definition = &outcome.generated.definition;
        let positions: Vec<usize> = ["\"A1\"", "\"Z1\"", "\"B1\"", "\"M1\""]
            .iter()
            .map(|id| definition.find(id).unwrap())
            .collect();
        assert!(positions.windows(2).all(|w| w[0] < w[1]));
    }
}
