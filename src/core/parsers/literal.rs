//! Parser for the argument list of one string macro invocation.
//!
//! The input is the raw text between the outer parentheses, for example
//! `CURRENCY, "%.2f", de;bg: "%.2fEUR", en-US: "$%.2f"`. The parser knows
//! nothing about files or the database; it turns the text into an identifier
//! and a [`LiteralValue`].
//!
//! Grammar of the value arguments (everything after the identifier):
//!
//! - a leading unlabelled literal is the default value;
//! - `code[;code...]: "value"` assigns one value to one or more locale codes;
//! - bare codes separated by commas are grouped with the next labelled clause,
//!   so `de, bg: "x"` is the same as `de;bg: "x"`;
//! - `*` is the wildcard locale;
//! - adjacent literals are concatenated (`"a" "b"` is `ab`);
//! - a bare name in a value position is looked up in the string defines.

use std::collections::HashMap;

use thiserror::Error;

use crate::core::data::{LiteralValue, WILDCARD_LOCALE};

/// Macro name to string literal content, as given with `-D` or in the config.
pub type Defines = HashMap<String, String>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LiteralError {
    #[error("unterminated string literal")]
    UnterminatedString,
    #[error("unbalanced parentheses")]
    UnbalancedParentheses,
    #[error("missing identifier")]
    MissingIdentifier,
    #[error("invalid identifier `{0}`")]
    InvalidIdentifier(String),
    #[error("invalid locale code `{0}`")]
    InvalidLocaleCode(String),
    #[error("locale `{0}` has no value")]
    MissingLocaleValue(String),
    #[error("locale `{code}` is assigned two different values: \"{first}\" and \"{second}\"")]
    DuplicateLocale {
        code: String,
        first: String,
        second: String,
    },
    #[error("unlabelled value `{0}` is only allowed as the first value")]
    UnexpectedValue(String),
    #[error("empty argument")]
    EmptyArgument,
    #[error("cannot use `{0}` as a string value")]
    InvalidValue(String),
    #[error("a string value is required")]
    MissingValue,
}

/// Identifier and value of one invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedInvocation {
    pub identifier: String,
    pub value: LiteralValue,
}

/// One value argument after classification.
enum ValueToken {
    /// One or more concatenated literals (defines already substituted).
    Text(String),
    /// A bare word that is not a string define.
    Word(String),
}

pub fn parse_arguments(text: &str, defines: &Defines) -> Result<ParsedInvocation, LiteralError> {
    let args = split_arguments(text)?;
    let mut args = args.into_iter();

    let identifier = args.next().map(str::trim).unwrap_or_default();
    if identifier.is_empty() {
        return Err(LiteralError::MissingIdentifier);
    }
    if !is_valid_identifier(identifier) {
        return Err(LiteralError::InvalidIdentifier(identifier.to_string()));
    }

    let values: Vec<&str> = args.map(str::trim).collect();
    // `SPGM(id, )` is how an empty variadic tail looks after macro edits.
    if values.len() == 1 && values[0].is_empty() {
        return Ok(ParsedInvocation {
            identifier: identifier.to_string(),
            value: LiteralValue::default(),
        });
    }

    let mut value = LiteralValue::default();
    let mut pending_codes: Vec<String> = Vec::new();

    for (index, arg) in values.iter().enumerate() {
        if arg.is_empty() {
            return Err(LiteralError::EmptyArgument);
        }

        if let Some(colon) = find_top_level(arg, ':') {
            let (label, rest) = (&arg[..colon], &arg[colon + 1..]);
            let mut codes = std::mem::take(&mut pending_codes);
            codes.extend(parse_locale_codes(label)?);
            let text = match parse_value(rest, defines)? {
                Some(ValueToken::Text(text)) => text,
                Some(ValueToken::Word(word)) => return Err(LiteralError::InvalidValue(word)),
                None => return Err(LiteralError::MissingLocaleValue(codes.join(";"))),
            };
            for code in codes {
                insert_locale(&mut value, code, &text)?;
            }
            continue;
        }

        match parse_value(arg, defines)? {
            Some(ValueToken::Text(text)) if index == 0 => value.default = Some(text),
            Some(ValueToken::Text(_)) => {
                return Err(LiteralError::UnexpectedValue(arg.to_string()));
            }
            Some(ValueToken::Word(word)) if index == 0 => {
                return Err(LiteralError::InvalidValue(word));
            }
            Some(ValueToken::Word(word)) => {
                if !is_valid_locale_code(&word) {
                    return Err(LiteralError::InvalidLocaleCode(word));
                }
                pending_codes.push(word);
            }
            None => return Err(LiteralError::EmptyArgument),
        }
    }

    if !pending_codes.is_empty() {
        return Err(LiteralError::MissingLocaleValue(pending_codes.join(";")));
    }

    normalize_wildcard(&mut value);

    Ok(ParsedInvocation {
        identifier: identifier.to_string(),
        value,
    })
}

fn insert_locale(value: &mut LiteralValue, code: String, text: &str) -> Result<(), LiteralError> {
    match value.locales.get(&code) {
        Some(existing) if existing != text => Err(LiteralError::DuplicateLocale {
            first: existing.clone(),
            second: text.to_string(),
            code,
        }),
        Some(_) => Ok(()),
        None => {
            value.locales.insert(code, text.to_string());
            Ok(())
        }
    }
}

/// A `*` variant is the default when there is none, and redundant when it
/// equals the default.
pub fn normalize_wildcard(value: &mut LiteralValue) {
    let Some(wildcard) = value.locales.get(WILDCARD_LOCALE).cloned() else {
        return;
    };
    match &value.default {
        None => {
            value.default = Some(wildcard);
            value.locales.remove(WILDCARD_LOCALE);
        }
        Some(default) if *default == wildcard => {
            value.locales.remove(WILDCARD_LOCALE);
        }
        Some(_) => {}
    }
}

/// Split on commas that are outside of quotes and parentheses.
///
/// Fails on an unterminated quote (a newline inside a quote counts as
/// unterminated) and on unbalanced parentheses.
pub fn split_arguments(text: &str) -> Result<Vec<&str>, LiteralError> {
    let mut args = Vec::new();
    let mut depth: i32 = 0;
    let mut start = 0;
    let mut chars = text.char_indices();

    while let Some((i, c)) = chars.next() {
        match c {
            '"' | '\'' => skip_quoted(&mut chars, c)?,
            '(' => depth += 1,
            ')' => {
                depth -= 1;
                if depth < 0 {
                    return Err(LiteralError::UnbalancedParentheses);
                }
            }
            ',' if depth == 0 => {
                args.push(&text[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }

    if depth != 0 {
        return Err(LiteralError::UnbalancedParentheses);
    }
    args.push(&text[start..]);
    Ok(args)
}

/// Advance past the closing `quote`, honouring backslash escapes.
fn skip_quoted(chars: &mut std::str::CharIndices<'_>, quote: char) -> Result<(), LiteralError> {
    while let Some((_, c)) = chars.next() {
        match c {
            '\\' => {
                if chars.next().is_none() {
                    break;
                }
            }
            '\n' => return Err(LiteralError::UnterminatedString),
            c if c == quote => return Ok(()),
            _ => {}
        }
    }
    Err(LiteralError::UnterminatedString)
}

/// Byte offset of the first `needle` outside of quotes and parentheses.
fn find_top_level(text: &str, needle: char) -> Option<usize> {
    let mut depth = 0usize;
    let mut chars = text.char_indices();
    while let Some((i, c)) = chars.next() {
        match c {
            '"' | '\'' => {
                if skip_quoted(&mut chars, c).is_err() {
                    return None;
                }
            }
            '(' => depth += 1,
            ')' => depth = depth.saturating_sub(1),
            c if c == needle && depth == 0 => return Some(i),
            _ => {}
        }
    }
    None
}

fn parse_locale_codes(label: &str) -> Result<Vec<String>, LiteralError> {
    label
        .split(';')
        .map(str::trim)
        .map(|code| {
            if is_valid_locale_code(code) {
                Ok(code.to_string())
            } else {
                Err(LiteralError::InvalidLocaleCode(code.to_string()))
            }
        })
        .collect()
}

/// Parse one value: concatenated literals and string defines, optionally
/// wrapped in parentheses. Returns `None` for an empty value.
fn parse_value(text: &str, defines: &Defines) -> Result<Option<ValueToken>, LiteralError> {
    let text = strip_parens(text.trim());
    if text.is_empty() {
        return Ok(None);
    }

    if is_valid_locale_code(text) {
        return Ok(Some(match defines.get(text) {
            Some(value) => ValueToken::Text(value.clone()),
            None => ValueToken::Word(text.to_string()),
        }));
    }

    let mut result = String::new();
    let mut rest = text;
    while !rest.is_empty() {
        if let Some(after_quote) = rest.strip_prefix('"') {
            let end = closing_quote(after_quote).ok_or(LiteralError::UnterminatedString)?;
            push_segment(&mut result, &after_quote[..end]);
            rest = after_quote[end + 1..].trim_start();
            continue;
        }

        let word_len = rest
            .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
            .unwrap_or(rest.len());
        let word = &rest[..word_len];
        match defines.get(word) {
            Some(value) if word_len > 0 => {
                push_segment(&mut result, value);
                rest = rest[word_len..].trim_start();
            }
            _ => return Err(LiteralError::InvalidValue(text.to_string())),
        }
    }

    Ok(Some(ValueToken::Text(result)))
}

/// Escape sequence left open at the end of a literal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OpenEscape {
    /// `\x` with any number of hex digits.
    Hex,
    /// `\` with one or two octal digits.
    Octal,
}

/// Append a concatenated literal. A hex or octal escape at the end of
/// `result` would absorb leading digits of `segment`, so the two stay
/// separate literals: `"\x4" "1"` keeps the bytes 0x04 and `1`.
fn push_segment(result: &mut String, segment: &str) {
    let absorbs = match (open_escape(result), segment.chars().next()) {
        (Some(OpenEscape::Hex), Some(c)) => c.is_ascii_hexdigit(),
        (Some(OpenEscape::Octal), Some(c)) => matches!(c, '0'..='7'),
        _ => false,
    };
    if absorbs {
        result.push_str("\" \"");
    }
    result.push_str(segment);
}

fn open_escape(text: &str) -> Option<OpenEscape> {
    let bytes = text.as_bytes();
    let mut open = None;
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] != b'\\' {
            open = None;
            i += 1;
            continue;
        }
        match bytes.get(i + 1) {
            Some(b'x') => {
                let mut end = i + 2;
                while end < bytes.len() && bytes[end].is_ascii_hexdigit() {
                    end += 1;
                }
                open = (end == bytes.len()).then_some(OpenEscape::Hex);
                i = end;
            }
            Some(b'0'..=b'7') => {
                let mut end = i + 1;
                while end < bytes.len() && end < i + 4 && matches!(bytes[end], b'0'..=b'7') {
                    end += 1;
                }
                open = (end == bytes.len() && end < i + 4).then_some(OpenEscape::Octal);
                i = end;
            }
            _ => {
                open = None;
                i += 2;
            }
        }
    }
    open
}

/// Index of the unescaped `"` that closes a literal whose opening quote has
/// already been consumed.
fn closing_quote(text: &str) -> Option<usize> {
    let mut escaped = false;
    for (i, c) in text.char_indices() {
        match c {
            _ if escaped => escaped = false,
            '\\' => escaped = true,
            '"' => return Some(i),
            '\n' => return None,
            _ => {}
        }
    }
    None
}

/// Remove parentheses that wrap the whole text, e.g. `(("a" "b"))`.
fn strip_parens(mut text: &str) -> &str {
    while text.starts_with('(') && text.ends_with(')') && wraps_whole(text) {
        text = text[1..text.len() - 1].trim();
    }
    text
}

fn wraps_whole(text: &str) -> bool {
    let mut depth = 0usize;
    let mut chars = text.char_indices();
    while let Some((i, c)) = chars.next() {
        match c {
            '"' | '\'' => {
                if skip_quoted(&mut chars, c).is_err() {
                    return false;
                }
            }
            '(' => depth += 1,
            ')' => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    return i == text.len() - 1;
                }
            }
            _ => {}
        }
    }
    false
}

/// Identifiers are C identifier characters; bare numerals are allowed
/// because the storage symbol always carries a prefix.
pub fn is_valid_identifier(text: &str) -> bool {
    !text.is_empty() && text.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}

pub fn is_valid_locale_code(text: &str) -> bool {
    text == WILDCARD_LOCALE
        || (!text.is_empty()
            && text
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-'))
}
