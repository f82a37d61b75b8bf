//! Placeholder token grammar: `{{` dotted path `}}`.
//!
//! Scanning is done with `nom`. A path is one or more segments joined by
//! `.`; segments never contain braces, dots or whitespace. There is no
//! escape for a literal `{{` in content.

use std::ops::Range;

use nom::{
    IResult, Parser,
    bytes::complete::{tag, take_while1},
    character::complete::char,
    combinator::recognize,
    multi::many0,
    sequence::delimited,
};
use solclone_common::constants::{
    FIELDS, ITEM_ID, LAYER_PREFIX, NAME, PLACEHOLDER_CLOSE, PLACEHOLDER_OPEN, URL,
};

/// A piece of scanned text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Segment<'a> {
    /// Plain text.
    Literal(&'a str),
    /// The path inside a `{{...}}` token.
    Placeholder(&'a str),
}

fn is_segment_char(c: char) -> bool {
    !matches!(c, '{' | '}' | '.') && !c.is_whitespace()
}

fn path_segment(input: &str) -> IResult<&str, &str> {
    take_while1(is_segment_char).parse(input)
}

fn path(input: &str) -> IResult<&str, &str> {
    recognize((path_segment, many0((char('.'), path_segment)))).parse(input)
}

/// Parses one placeholder at the start of `input`, returning its path.
fn placeholder(input: &str) -> IResult<&str, &str> {
    delimited(tag(PLACEHOLDER_OPEN), path, tag(PLACEHOLDER_CLOSE)).parse(input)
}

/// Splits `text` into literal and placeholder segments.
///
/// `{{{a.b}}}` yields `{`, the placeholder `a.b`, then `}`.
#[must_use]
pub fn segments(text: &str) -> Vec<Segment<'_>> {
    let mut out = Vec::new();
    let mut literal_start = 0;
    let mut idx = 0;
    while idx < text.len() {
        let rest = &text[idx..];
        if rest.starts_with(PLACEHOLDER_OPEN) {
            if let Ok((remaining, path)) = placeholder(rest) {
                if literal_start < idx {
                    out.push(Segment::Literal(&text[literal_start..idx]));
                }
                out.push(Segment::Placeholder(path));
                idx = text.len() - remaining.len();
                literal_start = idx;
                continue;
            }
        }
        idx += rest.chars().next().map_or(1, char::len_utf8);
    }
    if literal_start < text.len() {
        out.push(Segment::Literal(&text[literal_start..]));
    }
    out
}

/// Byte ranges of every complete placeholder token in `text`.
#[must_use]
pub fn placeholder_spans(text: &str) -> Vec<Range<usize>> {
    let mut spans = Vec::new();
    let mut offset = 0;
    for segment in segments(text) {
        let len = match segment {
            Segment::Literal(s) => s.len(),
            Segment::Placeholder(p) => {
                let len = p.len() + PLACEHOLDER_OPEN.len() + PLACEHOLDER_CLOSE.len();
                spans.push(offset..offset + len);
                len
            }
        };
        offset += len;
    }
    spans
}

/// Returns the path when `text` is exactly one placeholder token.
#[must_use]
pub fn whole_placeholder_path(text: &str) -> Option<&str> {
    match placeholder(text) {
        Ok(("", path)) => Some(path),
        _ => None,
    }
}

/// Whether `text` contains at least one placeholder token.
#[must_use]
pub fn contains_placeholder(text: &str) -> bool {
    segments(text)
        .iter()
        .any(|s| matches!(s, Segment::Placeholder(_)))
}

/// Wraps a dotted path in placeholder delimiters.
#[must_use]
pub fn token(path: &str) -> String {
    format!("{PLACEHOLDER_OPEN}{path}{PLACEHOLDER_CLOSE}")
}

/// `{{key.itemId}}`
#[must_use]
pub fn item_id(key: &str) -> String {
    token(&format!("{key}.{ITEM_ID}"))
}

/// `{{key.url}}`
#[must_use]
pub fn item_url(key: &str) -> String {
    token(&format!("{key}.{URL}"))
}

/// `{{key.name}}`
#[must_use]
pub fn item_name(key: &str) -> String {
    token(&format!("{key}.{NAME}"))
}

/// `{{key.layer<n>.url}}`
#[must_use]
pub fn layer_url(key: &str, layer_id: u64) -> String {
    token(&format!("{key}.{LAYER_PREFIX}{layer_id}.{URL}"))
}

/// `key.layer<n>.fields`, the base path of field reference tokens.
#[must_use]
pub fn field_base_path(key: &str, layer_id: u64) -> String {
    format!("{key}.{LAYER_PREFIX}{layer_id}.{FIELDS}")
}

/// Whether a raw field name can sit in the field position of a token.
///
/// A dotted name spans several path segments; each part must be a valid
/// segment, so names with whitespace or braces are rejected.
#[must_use]
pub fn is_field_segment(name: &str) -> bool {
    !name.is_empty()
        && name
            .split('.')
            .all(|part| !part.is_empty() && part.chars().all(is_segment_char))
}

/// `{{base.<lowercased field>.name}}`
#[must_use]
pub fn field_token(base_path: &str, raw_field: &str) -> String {
    token(&format!("{base_path}.{}.{NAME}", raw_field.to_lowercase()))
}

/// A parsed field reference token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldRef<'a> {
    /// Key of the item owning the layer.
    pub key: &'a str,
    /// Layer id within the item.
    pub layer_id: u64,
    /// Lower-cased field name.
    pub field: String,
}

/// Parses `<key>.layer<n>.fields.<field>.name`.
///
/// Segments are matched by position from the left and the final segment
/// must be `name`, so `X.layer0.fields.name.name` names the field `name`.
#[must_use]
pub fn parse_field_ref(path: &str) -> Option<FieldRef<'_>> {
    let parts: Vec<&str> = path.split('.').collect();
    if parts.len() < 5 || parts[2] != FIELDS || parts[parts.len() - 1] != NAME {
        return None;
    }
    let layer_id = parts[1].strip_prefix(LAYER_PREFIX)?.parse().ok()?;
    Some(FieldRef {
        key: parts[0],
        layer_id,
        field: parts[3..parts.len() - 1].join("."),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn segments_split_literals_and_tokens() {
        assert_eq!(
            segments("a {{x.itemId}} b"),
            vec![
                Segment::Literal("a "),
                Segment::Placeholder("x.itemId"),
                Segment::Literal(" b"),
            ]
        );
    }

    #[test]
    fn triple_braces_leave_outer_braces_literal() {
        assert_eq!(
            segments("{{{x.layer0.fields.a.name}}}"),
            vec![
                Segment::Literal("{"),
                Segment::Placeholder("x.layer0.fields.a.name"),
                Segment::Literal("}"),
            ]
        );
    }

    #[test]
    fn malformed_tokens_are_literal() {
        assert_eq!(segments("{{ a }}"), vec![Segment::Literal("{{ a }}")]);
        assert_eq!(segments("{{a..b}}"), vec![Segment::Literal("{{a..b}}")]);
        assert_eq!(segments("{{}}"), vec![Segment::Literal("{{}}")]);
        assert_eq!(segments("{{a"), vec![Segment::Literal("{{a")]);
    }

    #[test]
    fn spans_cover_whole_tokens() {
        let text = "{A} {{k.url}}";
        let spans = placeholder_spans(text);
        assert_eq!(spans.len(), 1);
        assert_eq!(&text[spans[0].clone()], "{{k.url}}");
    }

    #[test]
    fn whole_placeholder_detection() {
        assert_eq!(whole_placeholder_path("{{solutionExtent}}"), Some("solutionExtent"));
        assert!(whole_placeholder_path("x{{solutionExtent}}").is_none());
        assert!(whole_placeholder_path("{{a}} {{b}}").is_none());
        assert_eq!(whole_placeholder_path("{{a.b}}"), Some("a.b"));
        assert!(contains_placeholder("see {{a.b}}"));
        assert!(!contains_placeholder("see {a.b}"));
    }

    #[test]
    fn builders_produce_documented_tokens() {
        assert_eq!(item_id("abc"), "{{abc.itemId}}");
        assert_eq!(item_url("abc"), "{{abc.url}}");
        assert_eq!(item_name("abc"), "{{abc.name}}");
        assert_eq!(layer_url("abc", 2), "{{abc.layer2.url}}");
        let base = field_base_path("X", 0);
        assert_eq!(field_token(&base, "BoardReview"), "{{X.layer0.fields.boardreview.name}}");
    }

    #[test]
    fn field_named_name_parses_positionally() {
        let r = parse_field_ref("X.layer3.fields.name.name").expect("field ref");
        assert_eq!(r.key, "X");
        assert_eq!(r.layer_id, 3);
        assert_eq!(r.field, "name");
    }

    #[test]
    fn field_segment_validity() {
        assert!(is_field_segment("APN"));
        assert!(is_field_segment("Parcels.APN"));
        assert!(!is_field_segment("owner name"));
        assert!(!is_field_segment("a{b}"));
        assert!(!is_field_segment("Parcels..APN"));
        assert!(!is_field_segment(""));
    }

    #[test]
    fn dotted_field_parses_as_one_field() {
        let r = parse_field_ref("X.layer0.fields.parcels.apn.name").expect("field ref");
        assert_eq!(r.field, "parcels.apn");
    }

    #[test]
    fn non_field_paths_are_rejected() {
        assert!(parse_field_ref("X.layer0.url").is_none());
        assert!(parse_field_ref("X.itemId").is_none());
        assert!(parse_field_ref("X.layerA.fields.f.name").is_none());
        assert!(parse_field_ref("X.layer0.fields.f.alias").is_none());
    }
}
