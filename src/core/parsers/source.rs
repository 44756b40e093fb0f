//! Lexical scanner for string macro invocations in C/C++ sources.
//!
//! This is not a preprocessor. The scanner skips everything that cannot
//! contain an invocation (comments, string and character literals, raw
//! strings, `#define`/`#undef` of the string macros themselves) and hands the
//! argument text of every recognized macro to the literal parser. Bodies of
//! other `#define`s are scanned like code. Conditional directives are not
//! evaluated, so invocations inside disabled `#if` regions are found too.
//!
//! `FLASH_STRING_GENERATOR_AUTO_INIT(...)` needs no handling of its own: the
//! `AUTO_STRING_DEF` entries inside it are recognized wherever they appear,
//! and a standalone one forms a block of its own.

use crate::core::{
    data::{RawRecord, RecordKind, SourceContext, SourceLocation},
    parsers::literal::{Defines, LiteralError, ParsedInvocation, parse_arguments},
};
use crate::issues::ParseErrorIssue;

pub const DEFINITION_MACROS: &[&str] = &["PROGMEM_STRING_DEF"];
pub const REFERENCE_MACROS: &[&str] = &["SPGM", "FSPGM", "PSPGM"];
pub const AUTO_INIT_MACROS: &[&str] = &["AUTO_STRING_DEF", "AUTO_INIT_SPGM"];
pub const AUTO_INIT_BLOCK_MACRO: &str = "FLASH_STRING_GENERATOR_AUTO_INIT";

/// Bumped whenever the same text may scan to different records.
pub const SCANNER_REVISION: u32 = 2;

/// C++11 raw string prefixes.
const RAW_STRING_PREFIXES: &[&str] = &["R", "u8R", "uR", "UR", "LR"];

/// Result of scanning one file.
#[derive(Debug, Default)]
pub struct ScanOutput {
    pub records: Vec<RawRecord>,
    pub errors: Vec<ParseErrorIssue>,
}

/// Scan the text of one source file.
///
/// `file_path` is only used to build locations. Malformed invocations are
/// reported in `errors` and scanning continues right after their opening
/// parenthesis.
pub fn scan_source(text: &str, file_path: &str, defines: &Defines) -> ScanOutput {
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);
    let mut scanner = Scanner {
        text,
        bytes: text.as_bytes(),
        pos: 0,
        line_index: build_line_index(text),
        file_path,
        defines,
        macro_body_end: 0,
        macro_params: Vec::new(),
        output: ScanOutput::default(),
    };
    scanner.run();
    scanner.output
}

pub fn macro_kind(name: &str) -> Option<RecordKind> {
    if DEFINITION_MACROS.contains(&name) {
        Some(RecordKind::Definition)
    } else if REFERENCE_MACROS.contains(&name) {
        Some(RecordKind::Reference)
    } else if AUTO_INIT_MACROS.contains(&name) {
        Some(RecordKind::AutoInit)
    } else {
        None
    }
}

struct Scanner<'a> {
    text: &'a str,
    bytes: &'a [u8],
    pos: usize,
    line_index: Vec<usize>,
    file_path: &'a str,
    defines: &'a Defines,
    /// End of the `#define` line whose body is being scanned.
    macro_body_end: usize,
    /// Parameters of that `#define` when it is function-like.
    macro_params: Vec<&'a str>,
    output: ScanOutput,
}

impl Scanner<'_> {
    fn run(&mut self) {
        while self.pos < self.bytes.len() {
            match self.bytes[self.pos] {
                b'/' if self.peek(1) == Some(b'/') => {
                    self.pos = line_comment_end(self.bytes, self.pos);
                }
                b'/' if self.peek(1) == Some(b'*') => {
                    self.pos = block_comment_end(self.bytes, self.pos);
                }
                b'\'' if self.is_digit_separator() => self.pos += 1,
                quote @ (b'"' | b'\'') => {
                    // An unterminated quote is most likely an apostrophe in
                    // `#error` text; step over it.
                    self.pos = quoted_end(self.bytes, self.pos, quote).unwrap_or(self.pos + 1);
                }
                b'#' if self.at_line_start() => self.directive(),
                b if is_ident_start(b) => self.identifier(),
                b if b.is_ascii_digit() => self.pos = ident_end(self.bytes, self.pos),
                _ => self.pos += 1,
            }
        }
    }

    fn peek(&self, offset: usize) -> Option<u8> {
        self.bytes.get(self.pos + offset).copied()
    }

    /// Only whitespace between the start of the line and the cursor.
    fn at_line_start(&self) -> bool {
        self.bytes[..self.pos]
            .iter()
            .rev()
            .take_while(|&&b| b != b'\n')
            .all(|&b| b == b' ' || b == b'\t' || b == b'\r')
    }

    /// `1'000'000`: a quote inside a number is a digit separator.
    fn is_digit_separator(&self) -> bool {
        let mut start = self.pos;
        while start > 0 && is_ident_char(self.bytes[start - 1]) {
            start -= 1;
        }
        start < self.pos && self.bytes[start].is_ascii_digit()
    }

    fn directive(&mut self) {
        let text = self.text;
        self.pos += 1;
        self.skip_blanks();
        let name_start = self.pos;
        self.pos = ident_end(self.bytes, self.pos);
        let name = &text[name_start..self.pos];
        if name != "define" && name != "undef" {
            return;
        }

        let line_end = logical_line_end(self.bytes, self.pos);
        self.skip_blanks();
        let macro_start = self.pos;
        self.pos = ident_end(self.bytes, self.pos);
        let macro_name = &text[macro_start..self.pos];

        // The dispatch header defines the string macros themselves; those
        // lines must not be taken for invocations.
        if macro_kind(macro_name).is_some() || macro_name == AUTO_INIT_BLOCK_MACRO {
            self.pos = line_end;
            return;
        }

        self.macro_body_end = line_end;
        self.macro_params.clear();
        if self.peek(0) == Some(b'(')
            && let Some(close) = text[self.pos..line_end].find(')')
        {
            let params = &text[self.pos + 1..self.pos + close];
            self.macro_params = params
                .split(',')
                .map(str::trim)
                .filter(|p| !p.is_empty() && *p != "...")
                .collect();
            self.pos += close + 1;
        }
    }

    fn skip_blanks(&mut self) {
        while matches!(self.peek(0), Some(b' ' | b'\t')) {
            self.pos += 1;
        }
    }

    fn identifier(&mut self) {
        let start = self.pos;
        self.pos = ident_end(self.bytes, self.pos);
        let name = &self.text[start..self.pos];

        if self.peek(0) == Some(b'"') && RAW_STRING_PREFIXES.contains(&name) {
            self.pos = raw_string_end(self.text, self.pos);
            return;
        }

        let Some(kind) = macro_kind(name) else {
            return;
        };
        let open = skip_trivia(self.bytes, self.pos);
        if self.bytes.get(open) != Some(&b'(') {
            return;
        }
        self.invocation(kind, start, open);
    }

    fn invocation(&mut self, kind: RecordKind, start: usize, open: usize) {
        let location = self.location(start);
        let in_macro_body = start < self.macro_body_end;
        let parsed = extract_arguments(self.text, open).and_then(|(args, end)| {
            // `#define LABEL(id) FSPGM(id)` only forwards its argument.
            if in_macro_body && mentions_any(&args, &self.macro_params) {
                return Ok((None, end));
            }
            let parsed = parse_arguments(&args, self.defines)?;
            check_kind(kind, &parsed)?;
            Ok((Some(parsed), end))
        });

        match parsed {
            Ok((Some(parsed), end)) => {
                self.output.records.push(RawRecord::new(
                    parsed.identifier,
                    kind,
                    parsed.value,
                    location,
                ));
                self.pos = end;
            }
            Ok((None, end)) => self.pos = end,
            Err(error) => {
                let macro_name = self.text[start..ident_end(self.bytes, start)].to_string();
                let source_line = self.source_line(location.line);
                self.output.errors.push(ParseErrorIssue {
                    context: SourceContext::new(location, source_line),
                    macro_name,
                    error,
                });
                self.pos = open + 1;
            }
        }
    }

    fn location(&self, offset: usize) -> SourceLocation {
        let line = offset_to_line(&self.line_index, offset);
        let line_start = self.line_index[line - 1];
        let col = self.text[line_start..offset].chars().count() + 1;
        SourceLocation::new(self.file_path, line, col)
    }

    fn source_line(&self, line: usize) -> String {
        let start = self.line_index[line - 1];
        let end = self
            .line_index
            .get(line)
            .map(|next| next - 1)
            .unwrap_or(self.text.len());
        self.text[start..end].trim_end_matches('\r').to_string()
    }
}

/// Definitions and auto-init entries always need a text to store.
fn check_kind(kind: RecordKind, parsed: &ParsedInvocation) -> Result<(), LiteralError> {
    match kind {
        RecordKind::Definition | RecordKind::AutoInit if parsed.value.default.is_none() => {
            Err(LiteralError::MissingValue)
        }
        _ => Ok(()),
    }
}

/// Collect the text between the parenthesis at `open` and its partner.
///
/// Comments are replaced by a single space. Returns the argument text and the
/// offset just past the closing parenthesis.
fn extract_arguments(text: &str, open: usize) -> Result<(String, usize), LiteralError> {
    let bytes = text.as_bytes();
    let mut args = String::new();
    let mut depth = 1usize;
    let mut segment = open + 1;
    let mut i = open + 1;

    while i < bytes.len() {
        match bytes[i] {
            b'(' => {
                depth += 1;
                i += 1;
            }
            b')' => {
                depth -= 1;
                if depth == 0 {
                    args.push_str(&text[segment..i]);
                    return Ok((args, i + 1));
                }
                i += 1;
            }
            quote @ (b'"' | b'\'') => {
                i = quoted_end(bytes, i, quote).ok_or(LiteralError::UnterminatedString)?;
            }
            b'/' if matches!(bytes.get(i + 1), Some(b'/' | b'*')) => {
                args.push_str(&text[segment..i]);
                args.push(' ');
                i = if bytes[i + 1] == b'/' {
                    line_comment_end(bytes, i)
                } else {
                    block_comment_end(bytes, i)
                };
                segment = i;
            }
            _ => i += 1,
        }
    }

    Err(LiteralError::UnbalancedParentheses)
}

/// Whether `args` uses one of `names` as a word outside of literals.
fn mentions_any(args: &str, names: &[&str]) -> bool {
    if names.is_empty() {
        return false;
    }
    let bytes = args.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            quote @ (b'"' | b'\'') => i = quoted_end(bytes, i, quote).unwrap_or(bytes.len()),
            b if is_ident_start(b) => {
                let end = ident_end(bytes, i);
                if names.contains(&&args[i..end]) {
                    return true;
                }
                i = end;
            }
            b if b.is_ascii_digit() => i = ident_end(bytes, i),
            _ => i += 1,
        }
    }
    false
}

/// Offset just past the closing quote, or `None` when the literal runs into
/// a newline or the end of the text.
fn quoted_end(bytes: &[u8], start: usize, quote: u8) -> Option<usize> {
    let mut i = start + 1;
    while i < bytes.len() {
        match bytes[i] {
            b'\\' => i += 2,
            b'\n' => return None,
            b if b == quote => return Some(i + 1),
            _ => i += 1,
        }
    }
    None
}

/// `R"delim( ... )delim"`; `pos` points at the opening quote.
fn raw_string_end(text: &str, pos: usize) -> usize {
    let rest = &text[pos + 1..];
    let Some(paren) = rest.find('(') else {
        return pos + 1;
    };
    let delimiter = &rest[..paren];
    if delimiter.len() > 16
        || delimiter
            .chars()
            .any(|c| c.is_whitespace() || matches!(c, ')' | '\\' | '"'))
    {
        return pos + 1;
    }
    let closing = format!("){}\"", delimiter);
    let body = pos + 1 + paren + 1;
    match text[body..].find(&closing) {
        Some(end) => body + end + closing.len(),
        None => text.len(),
    }
}

/// Offset of the newline ending a `//` comment (backslash continuations
/// extend the comment).
fn line_comment_end(bytes: &[u8], start: usize) -> usize {
    let mut i = start + 2;
    while i < bytes.len() {
        match bytes[i] {
            b'\\' if bytes.get(i + 1) == Some(&b'\n') => i += 2,
            b'\\' if bytes.get(i + 1) == Some(&b'\r') && bytes.get(i + 2) == Some(&b'\n') => {
                i += 3
            }
            b'\n' => return i,
            _ => i += 1,
        }
    }
    bytes.len()
}

fn block_comment_end(bytes: &[u8], start: usize) -> usize {
    let mut i = start + 2;
    while i + 1 < bytes.len() {
        if bytes[i] == b'*' && bytes[i + 1] == b'/' {
            return i + 2;
        }
        i += 1;
    }
    bytes.len()
}

/// End of a preprocessor logical line, following backslash continuations
/// and multi-line block comments.
fn logical_line_end(bytes: &[u8], start: usize) -> usize {
    let mut i = start;
    while i < bytes.len() {
        match bytes[i] {
            b'\\' if bytes.get(i + 1) == Some(&b'\n') => i += 2,
            b'\\' if bytes.get(i + 1) == Some(&b'\r') && bytes.get(i + 2) == Some(&b'\n') => {
                i += 3
            }
            b'/' if bytes.get(i + 1) == Some(&b'*') => i = block_comment_end(bytes, i),
            b'/' if bytes.get(i + 1) == Some(&b'/') => i = line_comment_end(bytes, i),
            quote @ (b'"' | b'\'') => i = quoted_end(bytes, i, quote).unwrap_or(i + 1),
            b'\n' => return i,
            _ => i += 1,
        }
    }
    bytes.len()
}

/// Skip whitespace and comments between a macro name and its `(`.
fn skip_trivia(bytes: &[u8], start: usize) -> usize {
    let mut i = start;
    while i < bytes.len() {
        match bytes[i] {
            b if b.is_ascii_whitespace() => i += 1,
            b'/' if bytes.get(i + 1) == Some(&b'*') => i = block_comment_end(bytes, i),
            b'/' if bytes.get(i + 1) == Some(&b'/') => i = line_comment_end(bytes, i),
            _ => break,
        }
    }
    i
}

fn is_ident_start(b: u8) -> bool {
    b.is_ascii_alphabetic() || b == b'_'
}

fn is_ident_char(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_'
}

fn ident_end(bytes: &[u8], start: usize) -> usize {
    let mut i = start;
    while i < bytes.len() && is_ident_char(bytes[i]) {
        i += 1;
    }
    i
}

/// Byte offsets where each line starts. Line 1 starts at offset 0.
fn build_line_index(text: &str) -> Vec<usize> {
    let mut offsets = vec![0];
    for (i, b) in text.bytes().enumerate() {
        if b == b'\n' {
            offsets.push(i + 1);
        }
    }
    offsets
}

/// 1-based line number of a byte offset.
fn offset_to_line(line_index: &[usize], offset: usize) -> usize {
    match line_index.binary_search(&offset) {
        Ok(line) => line + 1,
        Err(line) => line,
    }
}
