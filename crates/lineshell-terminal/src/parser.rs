//! Line tokenizer.
//!
//! A [`LineParser`] splits one input line into the command word, the
//! positional remainder, and `key:value` pairs. It performs no semantic
//! validation; interpreters decide what the pieces mean.

use crate::descriptor::{ArgKind, ArgSpec};

/// Tokenizer over one trimmed input line.
///
/// The cursor is 1-based: with cursor `n` the line is split into at most
/// `n + 1` whitespace-delimited pieces, piece `n - 1` is the token and
/// piece `n` is the remainder.
#[derive(Debug, Clone)]
pub struct LineParser {
    line: String,
    cursor: usize,
}

impl LineParser {
    pub fn new(line: &str) -> Self {
        Self {
            line: line.trim().to_string(),
            cursor: 1,
        }
    }

    /// The trimmed line.
    pub fn line(&self) -> &str {
        &self.line
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Move the cursor. Out-of-range values yield empty results.
    pub fn set_cursor(&mut self, cursor: usize) -> &mut Self {
        self.cursor = cursor;
        self
    }

    /// The token at the cursor, or `None`.
    pub fn token(&self) -> Option<&str> {
        let index = self.cursor.checked_sub(1)?;
        split_limit(&self.line, self.cursor.checked_add(1)?)
            .get(index)
            .map(|piece| piece.trim())
            .filter(|piece| !piece.is_empty())
    }

    /// Everything after the token at the cursor, or `None`.
    pub fn args(&self) -> Option<&str> {
        if self.cursor == 0 {
            return None;
        }
        split_limit(&self.line, self.cursor.checked_add(1)?)
            .get(self.cursor)
            .map(|piece| piece.trim())
            .filter(|piece| !piece.is_empty())
    }

    /// [`args`](Self::args) split on whitespace.
    pub fn arg_list(&self) -> Vec<&str> {
        self.args()
            .map(|args| args.split_whitespace().collect())
            .unwrap_or_default()
    }

    /// [`args`](Self::args) read as comma-separated `key:value` pairs.
    ///
    /// Pieces without a colon are dropped.
    pub fn arg_map(&self) -> ArgMap {
        let mut map = ArgMap::default();
        let Some(args) = self.args() else {
            return map;
        };
        for piece in args.split(',') {
            if let Some((key, value)) = piece.split_once(':') {
                map.insert(key.trim(), value.trim());
            }
        }
        map
    }

    /// Convert the [`arg_map`](Self::arg_map) entries named by `specs` to
    /// their declared types.
    ///
    /// Entries that fail to convert, or whose type has no conversion, are
    /// logged and skipped; the rest are still converted.
    pub fn typed_arg_map<'a>(&self, specs: &'a [ArgSpec]) -> TypedArgs<'a> {
        let map = self.arg_map();
        let mut typed = TypedArgs::default();
        for spec in specs.iter().filter(|spec| !spec.positional) {
            let Some(raw) = map.get(&spec.key) else {
                continue;
            };
            match convert(spec.kind, raw) {
                Ok(value) => typed.entries.push((spec, value)),
                Err(reason) => {
                    log::warn!("argument {}: {reason}", spec.key);
                },
            }
        }
        typed
    }
}

fn convert(kind: ArgKind, raw: &str) -> Result<ArgValue, String> {
    match kind {
        ArgKind::Bool => Ok(ArgValue::Bool(raw.eq_ignore_ascii_case("true"))),
        ArgKind::Double => raw
            .parse::<f64>()
            .map(ArgValue::Double)
            .map_err(|e| format!("cannot read {raw:?} as double: {e}")),
        ArgKind::Int => raw
            .parse::<i32>()
            .map(ArgValue::Int)
            .map_err(|e| format!("cannot read {raw:?} as int: {e}")),
        ArgKind::String => Ok(ArgValue::Str(raw.to_string())),
        ArgKind::Char => Err(format!("type {kind} is not supported")),
    }
}

/// Split `text` at the first `limit - 1` whitespace runs.
///
/// The last piece keeps the rest of the line. `text` must already be
/// trimmed.
fn split_limit(text: &str, limit: usize) -> Vec<&str> {
    let mut pieces = Vec::new();
    if limit == 0 {
        return pieces;
    }
    let mut rest = text;
    while pieces.len() + 1 < limit {
        match rest.find(char::is_whitespace) {
            Some(end) => {
                pieces.push(&rest[..end]);
                rest = rest[end..].trim_start();
            },
            None => break,
        }
    }
    pieces.push(rest);
    pieces
}

/// Insertion-ordered `key:value` map with unique keys.
///
/// Re-inserting a key keeps its original position and replaces the value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ArgMap {
    entries: Vec<(String, String)>,
}

impl ArgMap {
    fn insert(&mut self, key: &str, value: &str) {
        match self.entries.iter_mut().find(|(k, _)| k == key) {
            Some(entry) => entry.1 = value.to_string(),
            None => self.entries.push((key.to_string(), value.to_string())),
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

/// A converted argument value.
#[derive(Debug, Clone, PartialEq)]
pub enum ArgValue {
    Bool(bool),
    Double(f64),
    Int(i32),
    Str(String),
}

/// Result of [`LineParser::typed_arg_map`]: descriptor to converted value.
#[derive(Debug, Default)]
pub struct TypedArgs<'a> {
    entries: Vec<(&'a ArgSpec, ArgValue)>,
}

impl<'a> TypedArgs<'a> {
    /// Value converted for the descriptor with `key`.
    pub fn get(&self, key: &str) -> Option<&ArgValue> {
        self.entries
            .iter()
            .find(|(spec, _)| spec.key == key)
            .map(|(_, value)| value)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries in descriptor order.
    pub fn iter(&self) -> impl Iterator<Item = (&'a ArgSpec, &ArgValue)> {
        self.entries.iter().map(|(spec, value)| (*spec, value))
    }
}
