//! The top-level TOML document: a thin façade over the root container with
//! dotted-path lookup and mutation.

use std::fmt;
use std::fmt::Display;

use crate::container::{Container, OutOfOrderTableProxy};
use crate::items::Item;
use crate::key::{parse_path, Key};
use crate::types::{ParseError, Value};

/// A parsed (or hand-built) TOML document.
///
/// Lookups take dotted path expressions in the same shape the source uses:
/// bare segments, quoted segments for names with dots or spaces
/// (`foo."a.b".c`), and `[n]` indexes into arrays and arrays of tables
/// (`servers[0].name`).
///
/// # Examples
///
/// ```
/// use tomldoc::parse;
/// use tomldoc::items::Item;
///
/// let doc = parse("[tool.poetry]\nname = \"foo\"\n").unwrap();
/// assert_eq!(doc.get_value("tool.poetry.name").and_then(Item::as_str), Some("foo"));
/// ```
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TOMLDocument {
    body: Container,
}

impl TOMLDocument {
    /// An empty document ready for building.
    pub fn new() -> TOMLDocument {
        TOMLDocument { body: Container::new() }
    }

    pub(crate) fn from_container(body: Container) -> TOMLDocument {
        TOMLDocument { body }
    }

    pub fn container(&self) -> &Container {
        &self.body
    }

    pub fn container_mut(&mut self) -> &mut Container {
        &mut self.body
    }

    /// The number of top-level keys.
    pub fn len(&self) -> usize {
        self.body.len()
    }

    pub fn is_empty(&self) -> bool {
        self.body.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Item)> {
        self.body.iter()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.body.keys()
    }

    /// Looks up a single top-level key (no path syntax).
    pub fn get(&self, key: &str) -> Option<&Item> {
        self.body.get(key)
    }

    pub fn get_mut(&mut self, key: &str) -> Option<&mut Item> {
        self.body.get_mut(key)
    }

    /// Looks up a dotted path expression. Returns `None` when the path does
    /// not resolve (or is not a well-formed expression).
    pub fn get_path(&self, expr: &str) -> Option<&Item> {
        let segments = parse_path(expr).ok()?;
        self.body.get_path(&segments)
    }

    pub fn get_path_mut(&mut self, expr: &str) -> Option<&mut Item> {
        let segments = parse_path(expr).ok()?;
        self.body.get_path_mut(&segments)
    }

    /// `get_path` under its traditional name.
    pub fn get_value(&self, expr: &str) -> Option<&Item> {
        self.get_path(expr)
    }

    /// Sets the value at a dotted path. All path segments but the last must
    /// already exist; the final segment is replaced when present (keeping
    /// its formatting) and appended otherwise.
    pub fn set_value<V>(&mut self, expr: &str, value: V) -> Result<(), ParseError>
        where V: Into<Item>
    {
        let segments = parse_path(expr)?;
        self.body.set_path(&segments, value.into())
    }

    /// Removes the value at a dotted path, leaving a tombstone in the
    /// containing body.
    pub fn remove_path(&mut self, expr: &str) -> Result<(), ParseError> {
        let segments = parse_path(expr)?;
        self.body.remove_path(&segments)
    }

    /// Inserts or replaces a top-level entry.
    pub fn set<K, V>(&mut self, key: K, value: V) -> Result<(), ParseError>
        where K: Into<Key>,
              V: Into<Item>
    {
        self.body.set(key.into(), value.into())
    }

    /// Appends a top-level entry, failing on duplicates that cannot merge.
    pub fn append<K, V>(&mut self, key: K, value: V) -> Result<(), ParseError>
        where K: Into<Key>,
              V: Into<Item>
    {
        self.body.append(key, value)
    }

    /// Appends a keyless whitespace or comment item.
    pub fn add(&mut self, item: Item) -> Result<(), ParseError> {
        self.body.add(item)
    }

    /// Removes a top-level entry.
    pub fn remove(&mut self, key: &str) -> Result<(), ParseError> {
        self.body.remove(key)
    }

    /// Whether a top-level table was declared in non-adjacent blocks.
    pub fn is_out_of_order(&self, key: &str) -> bool {
        self.body.is_out_of_order(key)
    }

    /// The joined view over an out-of-order table's sibling blocks.
    pub fn proxy(&mut self, key: &str) -> Option<OutOfOrderTableProxy> {
        self.body.proxy(key)
    }

    /// Re-assembles the document's source text.
    pub fn as_string(&self) -> String {
        self.body.as_string(None)
    }

    /// A deep copy of the document as plain host values.
    pub fn unwrap(&self) -> Value {
        Value::Table(self.body.unwrap())
    }
}

impl Display for TOMLDocument {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.as_string())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::internals::parser::Parser;
    use crate::items::Item;

    fn parse(input: &str) -> TOMLDocument {
        Parser::new(input).parse().unwrap()
    }

    #[test]
    fn test_set_value_preserves_surroundings() {
        let mut doc = parse("[table] # çô₥₥èñƭ\n  key = \"A Value\" # indented\n");
        doc.set_value("table.key", 9.876).unwrap();
        assert_eq!(
            doc.as_string(),
            "[table] # çô₥₥èñƭ\n  key = 9.876 # indented\n"
        );
    }

    #[test]
    fn test_set_value_missing_parent_fails() {
        let mut doc = parse("a = 1\n");
        assert!(doc.set_value("missing.key", 2).is_err());
    }

    #[test]
    fn test_self_assignment_is_identity() {
        let input = "[tool.poetry]\nname = \"foo\" # keep me\n";
        let mut doc = parse(input);
        let current = doc.get_path("tool.poetry.name").unwrap().clone();
        doc.set_value("tool.poetry.name", current).unwrap();
        assert_eq!(doc.as_string(), input);
    }

    #[test]
    fn test_remove_path() {
        let mut doc = parse("[t]\nx = 1\ny = 2\n");
        doc.remove_path("t.x").unwrap();
        assert_eq!(doc.as_string(), "[t]\ny = 2\n");
        assert!(doc.remove_path("t.x").is_err());
    }

    #[test]
    fn test_unwrap_projection() {
        let doc = parse("[tool.poetry]\nname = \"foo\"\n");
        let value = doc.unwrap();
        let tool = value.as_table().unwrap().get("tool").unwrap();
        let poetry = tool.as_table().unwrap().get("poetry").unwrap();
        assert_eq!(
            poetry.as_table().unwrap().get("name").and_then(|v| v.as_str()),
            Some("foo")
        );
    }

    #[test]
    fn test_out_of_order_proxy() {
        let mut doc = parse("[a.a]\nk = 1\n[a.b]\nv = 2\n[a.a.c]\n");
        let outer = doc.get_mut("a").and_then(Item::as_table_mut).unwrap();
        assert!(outer.container().is_out_of_order("a"));
        let proxy = outer.container_mut().proxy("a").unwrap();
        assert!(proxy.contains_key("k"));
        assert!(proxy.contains_key("c"));
    }

    #[test]
    fn test_display_matches_as_string() {
        let doc = parse("a = \"δôçú₥èñƭ\"\n");
        assert_eq!(format!("{}", doc), doc.as_string());
    }

    #[test]
    fn test_set_into_empty_table_adds_header_newline() {
        let mut doc = parse("[section.sub]");
        assert_eq!(doc.as_string(), "[section.sub]");
        doc.set_value("section.sub.foo", "bar").unwrap();
        assert_eq!(doc.as_string(), "[section.sub]\nfoo = \"bar\"\n");
    }
}
