//! Keys and dotted key paths.

use std::fmt;
use std::fmt::Display;
use std::hash::{Hash, Hasher};

use crate::internals::chars;
use crate::types::{KeyKind, ParseError};

/// A single key of a key/value pair or table header.
///
/// Equality and hashing use only the semantic `name`; the quoting style and
/// the verbatim `=` separator are carried along for emission but two keys
/// spelled `foo` and `"foo"` are the same key.
///
/// # Examples
///
/// ```
/// use tomldoc::key::Key;
///
/// let bare = Key::new("foo");
/// let quoted = Key::basic("foo");
/// assert_eq!(bare, quoted);
/// assert_eq!(quoted.as_string(), "\"foo\"");
/// ```
#[derive(Debug, Clone)]
pub struct Key {
    /// Quoting style.
    pub kind: KeyKind,
    /// The verbatim separator between the key and its value, `" = "` by
    /// default.
    pub sep: String,
    name: String,
    dotted: bool,
}

impl Key {
    /// Creates a key from `name`, choosing bare or basic quoting depending on
    /// the characters it contains.
    pub fn new<S>(name: S) -> Key
        where S: Into<String>
    {
        let name = name.into();
        let kind = if !name.is_empty() && name.chars().all(chars::is_bare_key_char) {
            KeyKind::Bare
        } else {
            KeyKind::Basic
        };
        Key { kind, sep: " = ".to_string(), name, dotted: false }
    }

    /// Creates a bare key without inspecting `name`.
    pub fn bare<S>(name: S) -> Key
        where S: Into<String>
    {
        Key { kind: KeyKind::Bare, sep: " = ".to_string(), name: name.into(), dotted: false }
    }

    /// Creates a `"`-quoted key.
    pub fn basic<S>(name: S) -> Key
        where S: Into<String>
    {
        Key { kind: KeyKind::Basic, sep: " = ".to_string(), name: name.into(), dotted: false }
    }

    /// Creates a `'`-quoted key.
    pub fn literal<S>(name: S) -> Key
        where S: Into<String>
    {
        Key { kind: KeyKind::Literal, sep: " = ".to_string(), name: name.into(), dotted: false }
    }

    /// The semantic (unquoted) name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether this key was materialized from a dotted key/value assignment.
    /// Such keys re-emit joined with `.` instead of producing table headers.
    pub fn is_dotted(&self) -> bool {
        self.dotted
    }

    pub(crate) fn set_dotted(&mut self, dotted: bool) {
        self.dotted = dotted;
    }

    pub(crate) fn with_sep<S>(mut self, sep: S) -> Key
        where S: Into<String>
    {
        self.sep = sep.into();
        self
    }

    /// The key as it appears in the source, quotes included.
    pub fn as_string(&self) -> String {
        format!("{}{}{}", self.kind.delimiter(), self.name, self.kind.delimiter())
    }
}

impl Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.as_string())
    }
}

impl PartialEq for Key {
    fn eq(&self, other: &Key) -> bool {
        self.name == other.name
    }
}

impl Eq for Key {}

impl Hash for Key {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.name.hash(state);
    }
}

impl<'a> From<&'a str> for Key {
    fn from(name: &'a str) -> Key {
        Key::new(name)
    }
}

impl From<String> for Key {
    fn from(name: String) -> Key {
        Key::new(name)
    }
}

/// One step of a lookup path: a named key or a numeric index into an array
/// or array of tables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum PathSegment {
    Name(Key),
    Index(usize),
}

/// Splits a lookup expression such as `servers[0]."a.b".name` into segments.
///
/// Quoted segments may contain dots; `[n]` suffixes index into arrays and
/// arrays of tables.
pub(crate) fn parse_path(expr: &str) -> Result<Vec<PathSegment>, ParseError> {
    let mut segments = Vec::new();
    let mut current = String::new();
    let mut kind = KeyKind::Bare;
    let mut has_current = false;
    let mut iter = expr.chars().peekable();

    let flush = |segments: &mut Vec<PathSegment>,
                 current: &mut String,
                 kind: &mut KeyKind,
                 has_current: &mut bool| {
        if *has_current {
            let mut key = match kind {
                KeyKind::Bare => Key::bare(current.clone()),
                KeyKind::Basic => Key::basic(current.clone()),
                KeyKind::Literal => Key::literal(current.clone()),
            };
            key.sep = String::new();
            segments.push(PathSegment::Name(key));
            current.clear();
            *kind = KeyKind::Bare;
            *has_current = false;
        }
    };

    while let Some(c) = iter.next() {
        match c {
            '.' => {
                if !has_current && !matches!(segments.last(), Some(PathSegment::Index(_))) {
                    return Err(empty_path_error(expr));
                }
                flush(&mut segments, &mut current, &mut kind, &mut has_current);
            },
            '\'' | '"' => {
                if has_current {
                    return Err(path_char_error(c));
                }
                kind = if c == '\'' { KeyKind::Literal } else { KeyKind::Basic };
                has_current = true;
                let mut closed = false;
                while let Some(inner) = iter.next() {
                    if inner == c {
                        closed = true;
                        break;
                    }
                    current.push(inner);
                }
                if !closed {
                    return Err(empty_path_error(expr));
                }
            },
            '[' => {
                flush(&mut segments, &mut current, &mut kind, &mut has_current);
                let mut digits = String::new();
                let mut closed = false;
                while let Some(inner) = iter.next() {
                    if inner == ']' {
                        closed = true;
                        break;
                    }
                    digits.push(inner);
                }
                if !closed || digits.is_empty() || !digits.chars().all(|d| d.is_ascii_digit()) {
                    return Err(path_char_error('['));
                }
                segments.push(PathSegment::Index(digits.parse().unwrap_or(0)));
            },
            c if chars::is_bare_key_char(c) => {
                has_current = true;
                current.push(c);
            },
            c => return Err(path_char_error(c)),
        }
    }

    if has_current {
        flush(&mut segments, &mut current, &mut kind, &mut has_current);
    } else if !matches!(segments.last(), Some(PathSegment::Index(_))) {
        return Err(empty_path_error(expr));
    }

    Ok(segments)
}

fn empty_path_error(expr: &str) -> ParseError {
    ParseError::NonExistentKey { key: expr.to_string() }
}

fn path_char_error(character: char) -> ParseError {
    ParseError::UnexpectedChar { line: 1, col: 1, character }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::types::KeyKind;

    #[test]
    fn test_key_equality_ignores_quoting() {
        assert_eq!(Key::new("key"), Key::basic("key"));
        assert_eq!(Key::literal("key"), Key::bare("key"));
        assert_ne!(Key::new("key"), Key::new("Key"));
    }

    #[test]
    fn test_key_auto_kind() {
        assert_eq!(Key::new("Key-2_0").kind, KeyKind::Bare);
        assert_eq!(Key::new("A Key").kind, KeyKind::Basic);
        assert_eq!(Key::new("ƒúñƙ¥").kind, KeyKind::Basic);
        assert_eq!(Key::new("A Key").as_string(), "\"A Key\"");
    }

    #[test]
    fn test_parse_path_simple() {
        let path = parse_path("table.key").unwrap();
        assert_eq!(
            path,
            vec![
                PathSegment::Name(Key::bare("table")),
                PathSegment::Name(Key::bare("key")),
            ]
        );
    }

    #[test]
    fn test_parse_path_quoted_and_indexed() {
        let path = parse_path("tables[0].'a.b'.\"A Key\"").unwrap();
        assert_eq!(
            path,
            vec![
                PathSegment::Name(Key::bare("tables")),
                PathSegment::Index(0),
                PathSegment::Name(Key::literal("a.b")),
                PathSegment::Name(Key::basic("A Key")),
            ]
        );
    }

    #[test]
    fn test_parse_path_rejects_garbage() {
        assert!(parse_path("a..b").is_err());
        assert!(parse_path("").is_err());
        assert!(parse_path("a[b]").is_err());
        assert!(parse_path("a[0").is_err());
        assert!(parse_path("a b").is_err());
    }
}
