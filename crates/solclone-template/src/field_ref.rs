//! Field reference templatizer.
//!
//! Rewrites raw field names into `{{base.<lower>.name}}` tokens. Each
//! notation has its own matcher; all of them skip text that is already
//! inside a placeholder, so running any of them twice is a no-op.

use std::ops::Range;

use regex::Regex;
use serde_json::Value;
use solclone_common::constants::{EXPRESSION_PREFIX, RELATIONSHIPS_PREFIX};

use crate::placeholder::{contains_placeholder, field_token, is_field_segment, placeholder_spans};

/// How a field name is written inside free text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Notation {
    /// SQL-like text: the bare name bounded by non-identifier characters.
    Delimited,
    /// `{FIELD}` as used by popup text and label value strings.
    Braced,
    /// `[FIELD]` as used by plain label expressions.
    Bracketed,
    /// Arcade: `$feature.F`, `$feature["F"]`, `$feature['F']`, `["F"]`.
    Arcade,
}

/// Whether `raw_field` can be turned into a token that later passes
/// recognise.
fn tokenizable(raw_field: &str) -> bool {
    let ok = is_field_segment(raw_field);
    if !ok && !raw_field.is_empty() {
        tracing::trace!(field = raw_field, "field name cannot be written as a token");
    }
    ok
}

/// Replaces every delimited occurrence of `raw_field` in `text`.
///
/// Matching is case-sensitive; the occurrence must be bounded by the string
/// edges or by characters that cannot continue an identifier, so `A` does
/// not match inside `ABC` and `RELATED.NAME` only rewrites `NAME`.
#[must_use]
pub fn templatize_occurrences_in_text(text: &str, raw_field: &str, base_path: &str) -> String {
    if !tokenizable(raw_field) {
        return text.to_owned();
    }
    let replacement = field_token(base_path, raw_field);
    replace_outside_tokens(text, raw_field, &replacement, true)
}

/// Applies `notation` for every name in `fields`.
#[must_use]
pub fn templatize_fields_in_text<S: AsRef<str>>(
    text: &str,
    fields: &[S],
    base_path: &str,
    notation: Notation,
) -> String {
    fields.iter().fold(text.to_owned(), |acc, field| {
        let field = field.as_ref();
        if !tokenizable(field) {
            return acc;
        }
        match notation {
            Notation::Delimited => templatize_occurrences_in_text(&acc, field, base_path),
            Notation::Braced => {
                let token = field_token(base_path, field);
                replace_outside_tokens(&acc, &format!("{{{field}}}"), &format!("{{{token}}}"), false)
            }
            Notation::Bracketed => {
                let token = field_token(base_path, field);
                replace_outside_tokens(&acc, &format!("[{field}]"), &format!("[{token}]"), false)
            }
            Notation::Arcade => templatize_arcade(&acc, field, base_path),
        }
    })
}

/// Rewrites the Arcade notations for one field, case-insensitively.
#[must_use]
pub fn templatize_arcade(text: &str, raw_field: &str, base_path: &str) -> String {
    if !tokenizable(raw_field) {
        return text.to_owned();
    }
    let token = field_token(base_path, raw_field);
    let escaped = regex::escape(raw_field);
    let mut out = text.to_owned();
    for quote in ['"', '\''] {
        out = replace_pattern(
            &out,
            &format!(r"(?i)\$feature\[{quote}{escaped}{quote}\]"),
            &format!("$feature[{quote}{token}{quote}]"),
            false,
        );
        out = replace_pattern(
            &out,
            &format!(r"(?i)\[\s*{quote}{escaped}{quote}\s*\]"),
            &format!("[{quote}{token}{quote}]"),
            false,
        );
    }
    replace_pattern(
        &out,
        &format!(r"(?i)\$feature\.{escaped}"),
        &format!("$feature.{token}"),
        true,
    )
}

/// Rewrites every quoted string literal equal to `raw_field`.
///
/// Used where an expression carries field names as plain string data,
/// such as the field array of a predominance expression.
#[must_use]
pub fn templatize_quoted_literals(text: &str, raw_field: &str, base_path: &str) -> String {
    if !tokenizable(raw_field) {
        return text.to_owned();
    }
    let token = field_token(base_path, raw_field);
    let escaped = regex::escape(raw_field);
    ['"', '\''].into_iter().fold(text.to_owned(), |acc, quote| {
        replace_pattern(
            &acc,
            &format!("(?i){quote}{escaped}{quote}"),
            &format!("{quote}{token}{quote}"),
            false,
        )
    })
}

/// Rewrites a comma-separated list whose entries start with a field name,
/// such as `"A,B"` or `"A ASC, B DESC"`.
#[must_use]
pub fn templatize_field_list(text: &str, base_path: &str) -> String {
    text.split(',')
        .map(|part| {
            let leading = part.len() - part.trim_start().len();
            let body = &part[leading..];
            let word_end = body.find(char::is_whitespace).unwrap_or(body.len());
            let word = &body[..word_end];
            match direct_token(word, base_path) {
                Some(token) => format!("{}{token}{}", &part[..leading], &body[word_end..]),
                None => part.to_owned(),
            }
        })
        .collect::<Vec<_>>()
        .join(",")
}

/// Token for a value that is known to be a single field name.
///
/// Returns `None` for values already holding a placeholder, popup
/// `expression/...` references and names that cannot form a token.
#[must_use]
pub fn direct_token(name: &str, base_path: &str) -> Option<String> {
    if contains_placeholder(name) || name.starts_with(EXPRESSION_PREFIX) || !tokenizable(name) {
        return None;
    }
    Some(field_token(base_path, name))
}

/// Templatizes a JSON value holding one field name in place.
///
/// Returns `true` if the value changed.
pub fn templatize_field_value(value: &mut Value, base_path: &str) -> bool {
    if let Value::String(name) = value {
        if let Some(token) = direct_token(name, base_path) {
            *name = token;
            return true;
        }
    }
    false
}

/// Templatizes `obj[prop]` when it is a field name string.
pub fn templatize_field_prop(obj: &mut Value, prop: &str, base_path: &str) -> bool {
    obj.get_mut(prop)
        .is_some_and(|v| templatize_field_value(v, base_path))
}

/// Templatizes every string element of the array at `obj[prop]`.
pub fn templatize_field_array(obj: &mut Value, prop: &str, base_path: &str) {
    if let Some(Value::Array(items)) = obj.get_mut(prop) {
        for item in items {
            let _ = templatize_field_value(item, base_path);
        }
    }
}

/// Templatizes the free-text string at `obj[prop]` with `notation`.
pub fn templatize_text_prop<S: AsRef<str>>(
    obj: &mut Value,
    prop: &str,
    fields: &[S],
    base_path: &str,
    notation: Notation,
) {
    if let Some(Value::String(text)) = obj.get_mut(prop) {
        let updated = templatize_fields_in_text(text, fields, base_path, notation);
        if updated != *text {
            *text = updated;
        }
    }
}

/// A `relationships/<n>/FIELD` popup reference split into its parts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RelationshipPath<'a> {
    /// The untouched `relationships/<n>/` prefix.
    pub prefix: &'a str,
    /// Relationship id `<n>`.
    pub relationship_id: u64,
    /// Field of the related table.
    pub field: &'a str,
}

/// Splits a compound popup field reference.
#[must_use]
pub fn split_relationship_path(value: &str) -> Option<RelationshipPath<'_>> {
    let rest = value.strip_prefix(RELATIONSHIPS_PREFIX)?;
    let slash = rest.find('/')?;
    let relationship_id = rest[..slash].parse().ok()?;
    let prefix_len = RELATIONSHIPS_PREFIX.len() + slash + 1;
    Some(RelationshipPath {
        prefix: &value[..prefix_len],
        relationship_id,
        field: &value[prefix_len..],
    })
}

fn is_ident_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

fn overlaps(spans: &[Range<usize>], start: usize, end: usize) -> bool {
    spans.iter().any(|s| start < s.end && end > s.start)
}

fn bounded(text: &str, start: usize, end: usize) -> bool {
    let before = text[..start].chars().next_back().is_none_or(|c| !is_ident_char(c));
    let after = text[end..].chars().next().is_none_or(|c| !is_ident_char(c));
    before && after
}

fn trailing_bounded(text: &str, end: usize) -> bool {
    text[end..].chars().next().is_none_or(|c| !is_ident_char(c))
}

/// Replaces literal `needle` occurrences that are not inside a token.
pub(crate) fn replace_outside_tokens(text: &str, needle: &str, replacement: &str, delimited: bool) -> String {
    if needle.is_empty() || !text.contains(needle) {
        return text.to_owned();
    }
    let spans = placeholder_spans(text);
    let mut out = String::with_capacity(text.len());
    let mut last = 0;
    for (start, _) in text.match_indices(needle) {
        let end = start + needle.len();
        if overlaps(&spans, start, end) || (delimited && !bounded(text, start, end)) {
            continue;
        }
        out.push_str(&text[last..start]);
        out.push_str(replacement);
        last = end;
    }
    out.push_str(&text[last..]);
    out
}

/// Replaces regex matches that are not inside a token.
fn replace_pattern(text: &str, pattern: &str, replacement: &str, check_trailing: bool) -> String {
    let re = match Regex::new(pattern) {
        Ok(re) => re,
        Err(e) => {
            tracing::warn!(pattern, error = %e, "skipping unusable field pattern");
            return text.to_owned();
        }
    };
    let spans = placeholder_spans(text);
    let mut out = String::with_capacity(text.len());
    let mut last = 0;
    for m in re.find_iter(text) {
        if overlaps(&spans, m.start(), m.end()) || (check_trailing && !trailing_bounded(text, m.end())) {
            continue;
        }
        out.push_str(&text[last..m.start()]);
        out.push_str(replacement);
        last = m.end();
    }
    out.push_str(&text[last..]);
    out
}
