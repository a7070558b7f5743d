//! Global node reference parsing for mutation records.
//!
//! Handles `^Global(key,sub,...)="v1|v2|..."` and the bare reference form
//! used by removals. Key tokens may be double-quoted strings holding `,`,
//! `(` or `)` as literal content, so the key list is scanned with an
//! explicit quote state instead of splitting on structural characters.

use crate::ParseError;

const GLOBAL_MARKER: char = '^';
const VALUE_DELIMITER: char = '|';

/// Parsed node reference and, for assignments, its value list.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NodeReference {
    pub global: String,
    pub key: String,
    pub sub_keys: Vec<String>,
    pub values: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum QuoteState {
    Outside,
    Inside,
}

/// Parse an assignment `^G(k,...)="v|v|..."`.
pub fn parse_assignment(input: &str) -> Result<NodeReference, ParseError> {
    let (mut node, rest) = parse_reference_prefix(input)?;
    let offset = input.len() - rest.len();

    let Some(literal) = rest.strip_prefix('=') else {
        return Err(malformed(offset, "expected `=` after key list"));
    };
    node.values = parse_value_literal(literal, offset + 1)?;
    Ok(node)
}

/// Parse a bare reference `^G(k,...)` with nothing after the key list.
pub fn parse_reference(input: &str) -> Result<NodeReference, ParseError> {
    let (node, rest) = parse_reference_prefix(input)?;
    if !rest.is_empty() {
        return Err(malformed(
            input.len() - rest.len(),
            "unexpected text after key list",
        ));
    }
    Ok(node)
}

/// Reads `^Global(keys)` and returns the remainder after `)`.
fn parse_reference_prefix(input: &str) -> Result<(NodeReference, &str), ParseError> {
    let Some(body) = input.strip_prefix(GLOBAL_MARKER) else {
        return Err(malformed(0, "missing `^` global marker"));
    };
    let Some(open) = body.find('(') else {
        return Err(malformed(input.len(), "missing `(` after global name"));
    };

    let global = &body[..open];
    if global.is_empty() || global.contains('"') {
        return Err(malformed(1, "invalid global name"));
    }

    // byte offset of the first key character within `input`
    let keys_start = 1 + open + 1;
    let (mut tokens, consumed) = scan_key_list(&input[keys_start..], keys_start)?;

    let key = tokens.remove(0);
    let node = NodeReference {
        global: global.to_string(),
        key,
        sub_keys: tokens,
        values: Vec::new(),
    };
    Ok((node, &input[keys_start + consumed..]))
}

/// Splits the key list up to its closing `)`.
///
/// Returns the tokens (never empty) and the number of bytes consumed,
/// including the `)`.
fn scan_key_list(list: &str, base: usize) -> Result<(Vec<String>, usize), ParseError> {
    let mut state = QuoteState::Outside;
    let mut tokens = Vec::new();
    let mut token_start = 0;

    for (idx, ch) in list.char_indices() {
        match (state, ch) {
            (QuoteState::Outside, '"') => state = QuoteState::Inside,
            (QuoteState::Inside, '"') => state = QuoteState::Outside,
            (QuoteState::Outside, ',') => {
                tokens.push(take_token(list, token_start, idx, base)?);
                token_start = idx + 1;
            }
            (QuoteState::Outside, ')') => {
                tokens.push(take_token(list, token_start, idx, base)?);
                return Ok((tokens, idx + 1));
            }
            _ => {}
        }
    }

    Err(match state {
        QuoteState::Inside => malformed(base + list.len(), "unterminated quoted key"),
        QuoteState::Outside => malformed(base + list.len(), "missing `)` after key list"),
    })
}

fn take_token(list: &str, start: usize, end: usize, base: usize) -> Result<String, ParseError> {
    let token = &list[start..end];
    if token.is_empty() {
        return Err(malformed(base + start, "empty key"));
    }
    Ok(token.to_string())
}

/// Splits the interior of `"v1|v2|..."`, keeping empty entries.
fn parse_value_literal(literal: &str, base: usize) -> Result<Vec<String>, ParseError> {
    let interior = literal
        .strip_prefix('"')
        .and_then(|rest| rest.strip_suffix('"'))
        .ok_or_else(|| malformed(base, "value is not a quoted string"))?;

    let mut segment_start = base + 1;
    interior
        .split(VALUE_DELIMITER)
        .map(|segment| {
            let start = segment_start;
            segment_start += segment.len() + VALUE_DELIMITER.len_utf8();
            unescape_value(segment, start)
        })
        .collect()
}

/// Collapses doubled quotes; a lone quote means the literal ended early.
fn unescape_value(segment: &str, base: usize) -> Result<String, ParseError> {
    if !segment.contains('"') {
        return Ok(segment.to_string());
    }

    let mut out = String::with_capacity(segment.len());
    let mut chars = segment.char_indices();
    while let Some((idx, ch)) = chars.next() {
        if ch == '"' && chars.next().map(|(_, next)| next) != Some('"') {
            return Err(malformed(base + idx, "unbalanced quote in value"));
        }
        out.push(ch);
    }
    Ok(out)
}

fn malformed(position: usize, reason: &'static str) -> ParseError {
    ParseError::MalformedNodeReference { position, reason }
}
