//! # Tokenizer
//!
//! Lightweight scanning of generator output.
//!
//! The generator emits a JSON array of flat objects whose keys are only known
//! at runtime. Rather than deserializing into a fixed type, the tokenizer
//! splits the array into object fragments and each fragment into raw
//! top-level key/value pairs. Both passes share one scanner that tracks
//! string, escape and bracket-depth state, so commas, braces and `},{`
//! sequences inside strings or nested values never split anything.
//!
//! Malformed input degrades instead of failing: an unterminated element is
//! cut at the next `},{` boundary so later elements survive, and
//! [`check_fragment_balance`] lets callers reject the broken fragment.

use log::debug;
use std::collections::BTreeMap;

/// Raw top-level pairs of one object, values kept as unparsed text.
pub type RawFields = BTreeMap<String, String>;

/// Structural problems detected in an object fragment.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum FragmentError {
    #[error("unterminated string")]
    UnterminatedString,

    #[error("unbalanced brackets (depth {depth} at end of fragment)")]
    UnbalancedBrackets { depth: i32 },

    #[error("closing bracket without a matching opener")]
    UnexpectedClose,
}

/// Lexical state carried across characters.
#[derive(Debug, Default, Clone, Copy)]
struct ScanState {
    in_string: bool,
    escaped: bool,
    depth: i32,
}

impl ScanState {
    fn advance(&mut self, c: char) {
        if self.in_string {
            if self.escaped {
                self.escaped = false;
            } else if c == '\\' {
                self.escaped = true;
            } else if c == '"' {
                self.in_string = false;
            }
            return;
        }

        match c {
            '"' => self.in_string = true,
            '{' | '[' => self.depth += 1,
            '}' | ']' => self.depth -= 1,
            _ => {}
        }
    }

    fn at_top_level(&self) -> bool {
        !self.in_string && self.depth == 0
    }
}

/// Splits the text of a whole generator file into object fragments.
///
/// One outer `[`/`]` pair is stripped if present. Fragments are returned in
/// source order, each starting with `{` and ending with `}`. Empty input
/// yields no fragments.
///
/// # Examples
///
/// ```
/// use itemforge::split_top_level_objects;
///
/// let fragments = split_top_level_objects(r#"[{"id":"a","tags":"x},{y"},{"id":"b"}]"#);
/// assert_eq!(fragments, vec![r#"{"id":"a","tags":"x},{y"}"#, r#"{"id":"b"}"#]);
/// ```
pub fn split_top_level_objects(array_text: &str) -> Vec<String> {
    let body = strip_array_brackets(array_text);
    let mut fragments = Vec::new();
    let mut cursor = 0;

    while let Some(offset) = body[cursor..].find('{') {
        let start = cursor + offset;

        if let Some(end) = find_object_end(body, start) {
            push_fragment(&mut fragments, &body[start..=end]);
            cursor = end + 1;
            continue;
        }

        // Unterminated element: resynchronize at the next `},{` boundary
        match find_boundary(body, start + 1) {
            Some((close, next_open)) => {
                debug!("Resynchronizing after unterminated element at byte {}", start);
                push_fragment(&mut fragments, &body[start..=close]);
                cursor = next_open;
            }
            None => {
                push_fragment(&mut fragments, &body[start..]);
                break;
            }
        }
    }

    fragments
}

/// Parses one object fragment into its raw top-level pairs.
///
/// Quoted keys and values lose one layer of quotes and have JSON escapes
/// decoded; numbers, booleans, `null` and nested values are returned as their
/// raw text. Duplicate keys keep the last value. Pairs without a `:` are
/// dropped.
///
/// # Examples
///
/// ```
/// use itemforge::parse_object_fragment;
///
/// let fields = parse_object_fragment(r#"{"a":"x,y","b":{"c":1,"d":2}}"#);
/// assert_eq!(fields.len(), 2);
/// assert_eq!(fields["a"], "x,y");
/// assert_eq!(fields["b"], r#"{"c":1,"d":2}"#);
/// ```
pub fn parse_object_fragment(object_text: &str) -> RawFields {
    let trimmed = object_text.trim();
    let inner = trimmed.strip_prefix('{').unwrap_or(trimmed);
    let inner = inner.strip_suffix('}').unwrap_or(inner);

    let mut fields = RawFields::new();
    for pair in split_top_level(inner, ',') {
        let pair = pair.trim();
        if pair.is_empty() {
            continue;
        }

        let Some(colon) = find_top_level(pair, ':') else {
            debug!("Dropping pair without separator: {}", pair);
            continue;
        };

        let key = unquote(pair[..colon].trim());
        let value = unquote(pair[colon + 1..].trim());
        fields.insert(key, value);
    }

    fields
}

/// Verifies that a fragment closes every string and bracket it opens.
pub fn check_fragment_balance(fragment: &str) -> Result<(), FragmentError> {
    let mut state = ScanState::default();

    for c in fragment.chars() {
        state.advance(c);
        if state.depth < 0 {
            return Err(FragmentError::UnexpectedClose);
        }
    }

    if state.in_string {
        Err(FragmentError::UnterminatedString)
    } else if state.depth != 0 {
        Err(FragmentError::UnbalancedBrackets { depth: state.depth })
    } else {
        Ok(())
    }
}

fn strip_array_brackets(text: &str) -> &str {
    let text = text.trim();
    let text = text.strip_prefix('[').unwrap_or(text);
    text.strip_suffix(']').unwrap_or(text).trim()
}

/// Byte index of the bracket that closes the object opened at `start`.
fn find_object_end(text: &str, start: usize) -> Option<usize> {
    let mut state = ScanState::default();

    for (idx, c) in text[start..].char_indices() {
        state.advance(c);
        if state.at_top_level() {
            return Some(start + idx);
        }
    }

    None
}

/// Finds the next `}` `,` `{` sequence (whitespace allowed) at or after `from`.
///
/// Returns the byte indices of the `}` and the `{`.
fn find_boundary(text: &str, from: usize) -> Option<(usize, usize)> {
    let mut search = from;

    while let Some(offset) = text[search..].find('}') {
        let close = search + offset;
        let after_comma = text[close + 1..].trim_start().strip_prefix(',');

        if let Some(rest) = after_comma.map(str::trim_start) {
            if rest.starts_with('{') {
                return Some((close, text.len() - rest.len()));
            }
        }

        search = close + 1;
    }

    None
}

fn push_fragment(fragments: &mut Vec<String>, raw: &str) {
    let raw = raw.trim();
    if raw.is_empty() {
        return;
    }

    let mut fragment = String::with_capacity(raw.len() + 2);
    if !raw.starts_with('{') {
        fragment.push('{');
    }
    fragment.push_str(raw);
    if !raw.ends_with('}') {
        fragment.push('}');
    }
    fragments.push(fragment);
}

/// Splits on `delimiter` wherever it appears outside strings and brackets.
fn split_top_level(text: &str, delimiter: char) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut state = ScanState::default();
    let mut start = 0;

    for (idx, c) in text.char_indices() {
        if c == delimiter && state.at_top_level() {
            parts.push(&text[start..idx]);
            start = idx + c.len_utf8();
            continue;
        }
        state.advance(c);
    }
    parts.push(&text[start..]);

    parts
}

fn find_top_level(text: &str, target: char) -> Option<usize> {
    let mut state = ScanState::default();

    for (idx, c) in text.char_indices() {
        if c == target && state.at_top_level() {
            return Some(idx);
        }
        state.advance(c);
    }

    None
}

/// Strips one layer of surrounding quotes, decoding escapes inside them.
///
/// Strings `serde_json` rejects (bad escapes, raw control characters) keep
/// their inner text verbatim.
fn unquote(text: &str) -> String {
    if text.len() >= 2 && text.starts_with('"') && text.ends_with('"') {
        serde_json::from_str(text).unwrap_or_else(|_| text[1..text.len() - 1].to_string())
    } else {
        text.to_string()
    }
}
