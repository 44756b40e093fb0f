//! Code generator for the declaration header and the definition source.
//!
//! Every emitted identifier gets one storage symbol (`SPGM_<id>`, prefix
//! configurable) holding its default value. Identifiers with locale variants
//! also get a table of `{ locale, value }` rows. The runtime picks the row
//! whose code matches the active locale, else the `*` row, else the default
//! carried by the sentinel row `{ NULL, SPGM_<id> }`.
//!
//! Auxiliary symbols (locale code strings, locale values, tables) live in
//! the lowercase `spgm_` namespace, which the storage symbols never use.
//! Output depends only on the entries and their order; source locations are
//! never written, so unrelated edits do not touch the generated files.

use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::fmt::Write;

use crate::core::data::{StringEntry, WILDCARD_LOCALE};

const GENERATED_BANNER: &str = "// AUTO GENERATED FILE - DO NOT MODIFY";

#[derive(Debug, Clone)]
pub struct CodegenOptions<'a> {
    /// Prefix of the storage symbols, `SPGM_` by default.
    pub symbol_prefix: &'a str,
    /// File name the definition source uses to include the header.
    pub declaration_file: &'a str,
    /// Extra header included first by the declaration header (e.g. the
    /// platform header providing `PROGMEM`).
    pub include_file: Option<&'a str>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedFiles {
    pub declaration: String,
    pub definition: String,
}

pub fn symbol_name(prefix: &str, identifier: &str) -> String {
    format!("{}{}", prefix, identifier)
}

/// Render both files.
///
/// `entries` must already be filtered (resolved, emitted) and ordered;
/// `auto_init` is emitted as one array in the given order.
pub fn generate(
    entries: &[&StringEntry],
    auto_init: &[StringEntry],
    options: &CodegenOptions<'_>,
) -> GeneratedFiles {
    let locale_names = LocaleNames::new(
        entries
            .iter()
            .copied()
            .chain(auto_init.iter())
            .flat_map(|entry| entry.locales.keys()),
    );

    GeneratedFiles {
        declaration: render_declaration(entries, options),
        definition: render_definition(entries, auto_init, &locale_names, options),
    }
}

fn render_declaration(entries: &[&StringEntry], options: &CodegenOptions<'_>) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{}", GENERATED_BANNER);
    let _ = writeln!(out);
    let _ = writeln!(out, "#pragma once");
    let _ = writeln!(out);
    let _ = writeln!(out, "#include <stddef.h>");
    if let Some(include) = options.include_file {
        let _ = writeln!(out, "#include \"{}\"", include);
    }
    let _ = writeln!(out);
    out.push_str(
        "#ifndef PROGMEM\n\
         #define PROGMEM\n\
         #endif\n\
         \n\
         #ifdef __cplusplus\n\
         extern \"C\" {\n\
         #endif\n\
         \n\
         typedef struct {\n    const char *locale;\n    const char *value;\n} spgm_locale_entry_t;\n\
         \n\
         typedef struct {\n    const char *name;\n    const char *value;\n    const spgm_locale_entry_t *locales;\n} spgm_auto_init_t;\n",
    );

    if !entries.is_empty() {
        let _ = writeln!(out);
    }
    for entry in entries {
        let symbol = symbol_name(options.symbol_prefix, &entry.identifier);
        let _ = writeln!(out, "extern const char {}[] PROGMEM;", symbol);
        if !entry.locales.is_empty() {
            let _ = writeln!(
                out,
                "extern const spgm_locale_entry_t {}[] PROGMEM;",
                locales_table_name(&entry.identifier)
            );
        }
    }

    let _ = writeln!(out);
    let _ = writeln!(
        out,
        "extern const spgm_auto_init_t spgm_auto_init_strings[] PROGMEM;"
    );
    out.push_str("\n#ifdef __cplusplus\n}\n#endif\n");
    out
}

fn render_definition(
    entries: &[&StringEntry],
    auto_init: &[StringEntry],
    locale_names: &LocaleNames,
    options: &CodegenOptions<'_>,
) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{}", GENERATED_BANNER);
    let _ = writeln!(out);
    let _ = writeln!(out, "#include \"{}\"", options.declaration_file);

    if !locale_names.is_empty() {
        let _ = writeln!(out);
        for (code, name) in locale_names.iter() {
            let _ = writeln!(
                out,
                "static const char {}[] PROGMEM = {};",
                name,
                encode_c_string(code)
            );
        }
    }

    for entry in entries {
        let symbol = symbol_name(options.symbol_prefix, &entry.identifier);
        let default = entry.default_text().unwrap_or_default();
        let _ = writeln!(out);
        let _ = writeln!(
            out,
            "const char {}[] PROGMEM = {};",
            symbol,
            encode_c_string(default)
        );
        if entry.locales.is_empty() {
            continue;
        }
        let prefix = format!("spgm_value_{}", entry.identifier);
        let rows = render_locale_values(&mut out, entry, &symbol, &prefix, locale_names);
        render_locale_table(
            &mut out,
            "const",
            &locales_table_name(&entry.identifier),
            &rows,
            &symbol,
        );
    }

    let _ = writeln!(out);
    let mut members = Vec::with_capacity(auto_init.len());
    for (index, entry) in auto_init.iter().enumerate() {
        let name = format!("spgm_auto_init_{}_name", index);
        let value = format!("spgm_auto_init_{}_value", index);
        let _ = writeln!(
            out,
            "static const char {}[] PROGMEM = {};",
            name,
            encode_c_string(&entry.identifier)
        );
        let _ = writeln!(
            out,
            "static const char {}[] PROGMEM = {};",
            value,
            encode_c_string(entry.default_text().unwrap_or_default())
        );
        let locales = if entry.locales.is_empty() {
            "NULL".to_string()
        } else {
            let table = format!("spgm_auto_init_{}_locales", index);
            let prefix = format!("spgm_auto_init_{}_value", index);
            let rows = render_locale_values(&mut out, entry, &value, &prefix, locale_names);
            render_locale_table(&mut out, "static const", &table, &rows, &value);
            table
        };
        members.push(format!("{{ {}, {}, {} }}", name, value, locales));
    }
    let _ = writeln!(
        out,
        "const spgm_auto_init_t spgm_auto_init_strings[] PROGMEM = {{"
    );
    for member in members {
        let _ = writeln!(out, "    {},", member);
    }
    let _ = writeln!(out, "    {{ NULL, NULL, NULL }}");
    let _ = writeln!(out, "}};");
    out
}

/// Emit one storage symbol per distinct locale value and return the table
/// rows as `(locale code symbol, value symbol)`, sorted by code with `*`
/// last. Values equal to the default reuse the default symbol.
fn render_locale_values(
    out: &mut String,
    entry: &StringEntry,
    default_symbol: &str,
    prefix: &str,
    locale_names: &LocaleNames,
) -> Vec<(String, String)> {
    let default = entry.default_text();
    let mut value_symbols: BTreeMap<&str, String> = BTreeMap::new();
    let mut rows = Vec::with_capacity(entry.locales.len());

    for code in sorted_codes(entry.locales.keys()) {
        let text = entry.locales[code].value.as_str();
        let symbol = if default == Some(text) {
            default_symbol.to_string()
        } else if let Some(symbol) = value_symbols.get(text) {
            symbol.clone()
        } else {
            let symbol = format!("{}_{}", prefix, value_symbols.len() + 1);
            let _ = writeln!(
                out,
                "static const char {}[] PROGMEM = {};",
                symbol,
                encode_c_string(text)
            );
            value_symbols.insert(text, symbol.clone());
            symbol
        };
        rows.push((locale_names.name(code).to_string(), symbol));
    }
    rows
}

fn render_locale_table(
    out: &mut String,
    qualifiers: &str,
    table: &str,
    rows: &[(String, String)],
    default_symbol: &str,
) {
    let _ = writeln!(
        out,
        "{} spgm_locale_entry_t {}[] PROGMEM = {{",
        qualifiers, table
    );
    for (code, value) in rows {
        let _ = writeln!(out, "    {{ {}, {} }},", code, value);
    }
    let _ = writeln!(out, "    {{ NULL, {} }}", default_symbol);
    let _ = writeln!(out, "}};");
}

fn locales_table_name(identifier: &str) -> String {
    format!("spgm_locales_{}", identifier)
}

/// Codes in table order: sorted, wildcard last.
fn sorted_codes<'a>(codes: impl Iterator<Item = &'a String>) -> Vec<&'a str> {
    let mut codes: Vec<&str> = codes.map(String::as_str).collect();
    codes.sort_by_key(|code| (*code == WILDCARD_LOCALE, *code));
    codes
}

/// Symbol names of the shared locale code strings.
struct LocaleNames {
    names: Vec<(String, String)>,
}

impl LocaleNames {
    fn new<'a>(codes: impl Iterator<Item = &'a String>) -> Self {
        let distinct: BTreeSet<&String> = codes.collect();
        let ordered = sorted_codes(distinct.into_iter());
        let mut used = HashSet::new();
        let names = ordered
            .into_iter()
            .map(|code| {
                let base = format!("spgm_locale_{}", sanitize_code(code));
                let mut name = base.clone();
                let mut suffix = 2;
                while !used.insert(name.clone()) {
                    name = format!("{}_{}", base, suffix);
                    suffix += 1;
                }
                (code.to_string(), name)
            })
            .collect();
        Self { names }
    }

    fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.names.iter().map(|(c, n)| (c.as_str(), n.as_str()))
    }

    fn name(&self, code: &str) -> &str {
        self.names
            .iter()
            .find(|(c, _)| c == code)
            .map(|(_, n)| n.as_str())
            .unwrap_or("NULL")
    }
}

fn sanitize_code(code: &str) -> String {
    if code == WILDCARD_LOCALE {
        return "any".to_string();
    }
    code.chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect()
}

/// Quote C literal content for the generated source.
///
/// Escape sequences already in the content are copied as they are. Non-ASCII
/// characters become `\xNN` byte escapes; because a hex escape swallows every
/// following hex digit, the literal is split after an escape that is followed
/// by one: `°C` becomes `"\xc2\xb0" "C"`.
pub fn encode_c_string(content: &str) -> String {
    let mut out = String::with_capacity(content.len() + 2);
    out.push('"');
    let mut after_hex = false;
    let mut chars = content.chars().peekable();

    while let Some(c) = chars.next() {
        if c == '\\' {
            out.push(c);
            let Some(next) = chars.next() else {
                break;
            };
            out.push(next);
            after_hex = next == 'x';
            if after_hex {
                while let Some(&digit) = chars.peek() {
                    if !digit.is_ascii_hexdigit() {
                        break;
                    }
                    out.push(digit);
                    chars.next();
                }
            }
            continue;
        }

        if !c.is_ascii() {
            let mut buf = [0u8; 4];
            for byte in c.encode_utf8(&mut buf).bytes() {
                let _ = write!(out, "\\x{:02x}", byte);
            }
            after_hex = true;
            continue;
        }

        if after_hex && c.is_ascii_hexdigit() {
            out.push_str("\" \"");
        }
        out.push(c);
        after_hex = false;
    }

    out.push('"');
    out
}
