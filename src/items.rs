//! The lossless item model. Every value parsed out of a document becomes an
//! `Item` carrying both its semantic value and enough of the original text
//! (raw number forms, string escapes, surrounding trivia) to reproduce the
//! source byte-for-byte.

use std::collections::HashMap;

use crate::container::Container;
use crate::key::Key;
use crate::types::{Date, DateTime, StrType, Time, Value};

/// Formatting metadata attached to every value-carrying item.
///
/// `indent` is the whitespace before the value (or table header), `comment_ws`
/// the whitespace between the value and an inline `#`, `comment` the full
/// comment including the `#`, and `trail` the trailing whitespace up to and
/// including the next newline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Trivia {
    pub indent: String,
    pub comment_ws: String,
    pub comment: String,
    pub trail: String,
}

impl Default for Trivia {
    fn default() -> Trivia {
        Trivia {
            indent: String::new(),
            comment_ws: String::new(),
            comment: String::new(),
            trail: "\n".to_string(),
        }
    }
}

impl Trivia {
    /// Trivia with every field empty, including the trail.
    pub fn empty() -> Trivia {
        Trivia {
            indent: String::new(),
            comment_ws: String::new(),
            comment: String::new(),
            trail: String::new(),
        }
    }

    pub fn new<S>(indent: S, comment_ws: S, comment: S, trail: S) -> Trivia
        where S: Into<String>
    {
        Trivia {
            indent: indent.into(),
            comment_ws: comment_ws.into(),
            comment: comment.into(),
            trail: trail.into(),
        }
    }
}

/// An item within a TOML document.
///
/// Leaf variants hold their decoded value next to the raw text they were
/// parsed from; `as_string` always reproduces the raw form.
#[derive(Debug, Clone, PartialEq)]
pub enum Item {
    /// Inter-item whitespace, newlines included.
    Whitespace { s: String },
    /// A full-line comment; the text lives in the trivia.
    Comment { trivia: Trivia },
    Integer { value: i64, raw: String, trivia: Trivia },
    Float { value: f64, raw: String, trivia: Trivia },
    Bool { value: bool, trivia: Trivia },
    Date { value: Date, raw: String, trivia: Trivia },
    Time { value: Time, raw: String, trivia: Trivia },
    DateTime { value: DateTime, raw: String, trivia: Trivia },
    /// A string of any of the four quoting kinds; `original` is the verbatim
    /// source text between the delimiters.
    Str { kind: StrType, value: String, original: String, trivia: Trivia },
    Array(Array),
    InlineTable(InlineTable),
    Table(Table),
    AoT(AoT),
    /// Tombstone left behind by a deletion so body indices stay valid.
    Null,
}

impl Item {
    /// A type tag used for array homogeneity checks and diagnostics.
    pub fn discriminant(&self) -> i32 {
        match self {
            Item::Null => -1,
            Item::Whitespace { .. } => 0,
            Item::Comment { .. } => 1,
            Item::Integer { .. } => 2,
            Item::Float { .. } => 3,
            Item::Bool { .. } => 4,
            Item::DateTime { .. } => 5,
            Item::Date { .. } => 6,
            Item::Time { .. } => 7,
            Item::Array(_) => 8,
            Item::Table(_) => 9,
            Item::InlineTable(_) => 10,
            Item::Str { .. } => 11,
            Item::AoT(_) => 12,
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Item::Null => "null",
            Item::Whitespace { .. } => "whitespace",
            Item::Comment { .. } => "comment",
            Item::Integer { .. } => "integer",
            Item::Float { .. } => "float",
            Item::Bool { .. } => "bool",
            Item::DateTime { .. } => "datetime",
            Item::Date { .. } => "date",
            Item::Time { .. } => "time",
            Item::Array(_) => "array",
            Item::Table(_) => "table",
            Item::InlineTable(_) => "inline table",
            Item::Str { .. } => "string",
            Item::AoT(_) => "array of tables",
        }
    }

    /// The trivia attached to the item. Whitespace, AoT and Null carry none.
    pub fn trivia(&self) -> Option<&Trivia> {
        match self {
            Item::Comment { trivia }
            | Item::Integer { trivia, .. }
            | Item::Float { trivia, .. }
            | Item::Bool { trivia, .. }
            | Item::Date { trivia, .. }
            | Item::Time { trivia, .. }
            | Item::DateTime { trivia, .. }
            | Item::Str { trivia, .. } => Some(trivia),
            Item::Array(array) => Some(&array.trivia),
            Item::InlineTable(table) => Some(&table.trivia),
            Item::Table(table) => Some(&table.trivia),
            _ => None,
        }
    }

    pub fn trivia_mut(&mut self) -> Option<&mut Trivia> {
        match self {
            Item::Comment { trivia }
            | Item::Integer { trivia, .. }
            | Item::Float { trivia, .. }
            | Item::Bool { trivia, .. }
            | Item::Date { trivia, .. }
            | Item::Time { trivia, .. }
            | Item::DateTime { trivia, .. }
            | Item::Str { trivia, .. } => Some(trivia),
            Item::Array(array) => Some(&mut array.trivia),
            Item::InlineTable(table) => Some(&mut table.trivia),
            Item::Table(table) => Some(&mut table.trivia),
            _ => None,
        }
    }

    /// The item's value rendered as source text, trivia excluded. Container
    /// emitters add trivia and keys around this.
    pub fn as_string(&self) -> String {
        match self {
            Item::Null => String::new(),
            Item::Whitespace { s } => s.clone(),
            Item::Comment { trivia } => {
                format!("{}{}{}", trivia.indent, trivia.comment, trivia.trail)
            },
            Item::Integer { raw, .. }
            | Item::Float { raw, .. }
            | Item::Date { raw, .. }
            | Item::Time { raw, .. }
            | Item::DateTime { raw, .. } => raw.clone(),
            Item::Bool { value, .. } => value.to_string(),
            Item::Str { kind, original, .. } => {
                format!("{}{}{}", kind.delimiter(), original, kind.delimiter())
            },
            Item::Array(array) => array.as_string(),
            Item::InlineTable(table) => table.as_string(),
            Item::Table(table) => table.container().as_string(table.name()),
            Item::AoT(aot) => aot.as_string(),
        }
    }

    /// Projects the item into a plain host value, stripping all formatting.
    /// Whitespace, comments and tombstones have no value and yield `None`.
    pub fn unwrap(&self) -> Option<Value> {
        match self {
            Item::Whitespace { .. } | Item::Comment { .. } | Item::Null => None,
            Item::Integer { value, .. } => Some(Value::Integer(*value)),
            Item::Float { value, .. } => Some(Value::Float(*value)),
            Item::Bool { value, .. } => Some(Value::Boolean(*value)),
            Item::Date { value, .. } => Some(Value::Date(*value)),
            Item::Time { value, .. } => Some(Value::Time(*value)),
            Item::DateTime { value, .. } => Some(Value::DateTime(*value)),
            Item::Str { value, .. } => Some(Value::Str(value.clone())),
            Item::Array(array) => {
                Some(Value::Array(array.values().filter_map(Item::unwrap).collect()))
            },
            Item::InlineTable(table) => Some(Value::Table(table.container().unwrap())),
            Item::Table(table) => Some(Value::Table(table.container().unwrap())),
            Item::AoT(aot) => {
                let mut values = Vec::with_capacity(aot.len());
                for table in aot.iter() {
                    values.push(Value::Table(table.container().unwrap()));
                }
                Some(Value::Array(values))
            },
        }
    }

    pub fn is_whitespace(&self) -> bool {
        matches!(self, Item::Whitespace { .. })
    }

    pub fn is_comment(&self) -> bool {
        matches!(self, Item::Comment { .. })
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Item::Null)
    }

    pub fn is_table(&self) -> bool {
        matches!(self, Item::Table(_))
    }

    pub fn is_aot(&self) -> bool {
        matches!(self, Item::AoT(_))
    }

    /// Tables and AoTs sort after leaves inside a table body.
    pub(crate) fn is_table_like(&self) -> bool {
        self.is_table() || self.is_aot()
    }

    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Item::Integer { value, .. } => Some(*value),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f64> {
        match self {
            Item::Float { value, .. } => Some(*value),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Item::Bool { value, .. } => Some(*value),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Item::Str { value, .. } => Some(value),
            _ => None,
        }
    }

    pub fn as_date(&self) -> Option<Date> {
        match self {
            Item::Date { value, .. } => Some(*value),
            _ => None,
        }
    }

    pub fn as_time(&self) -> Option<Time> {
        match self {
            Item::Time { value, .. } => Some(*value),
            _ => None,
        }
    }

    pub fn as_datetime(&self) -> Option<DateTime> {
        match self {
            Item::DateTime { value, .. } => Some(*value),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&Array> {
        match self {
            Item::Array(array) => Some(array),
            _ => None,
        }
    }

    pub fn as_array_mut(&mut self) -> Option<&mut Array> {
        match self {
            Item::Array(array) => Some(array),
            _ => None,
        }
    }

    pub fn as_inline_table(&self) -> Option<&InlineTable> {
        match self {
            Item::InlineTable(table) => Some(table),
            _ => None,
        }
    }

    pub fn as_inline_table_mut(&mut self) -> Option<&mut InlineTable> {
        match self {
            Item::InlineTable(table) => Some(table),
            _ => None,
        }
    }

    pub fn as_table(&self) -> Option<&Table> {
        match self {
            Item::Table(table) => Some(table),
            _ => None,
        }
    }

    pub fn as_table_mut(&mut self) -> Option<&mut Table> {
        match self {
            Item::Table(table) => Some(table),
            _ => None,
        }
    }

    pub fn as_aot(&self) -> Option<&AoT> {
        match self {
            Item::AoT(aot) => Some(aot),
            _ => None,
        }
    }

    pub fn as_aot_mut(&mut self) -> Option<&mut AoT> {
        match self {
            Item::AoT(aot) => Some(aot),
            _ => None,
        }
    }

    /// Attaches an inline comment to the item. A missing `#` is supplied.
    pub fn set_comment<S>(&mut self, comment: S) -> &mut Item
        where S: Into<String>
    {
        let mut text = comment.into();
        if !text.trim_start().starts_with('#') {
            text = format!("# {}", text);
        }
        if let Some(trivia) = self.trivia_mut() {
            trivia.comment_ws = " ".to_string();
            trivia.comment = text;
        }
        self
    }

    /// Replaces the item's indentation with `indent` spaces, keeping a
    /// leading newline if one was there.
    pub fn set_indent(&mut self, indent: usize) -> &mut Item {
        if let Some(trivia) = self.trivia_mut() {
            let spaces = " ".repeat(indent);
            if trivia.indent.starts_with('\n') {
                trivia.indent = format!("\n{}", spaces);
            } else {
                trivia.indent = spaces;
            }
        }
        self
    }
}

fn float_raw(value: f64) -> String {
    if value.is_nan() {
        if value.is_sign_negative() { "-nan".to_string() } else { "nan".to_string() }
    } else if value.is_infinite() {
        if value.is_sign_negative() { "-inf".to_string() } else { "inf".to_string() }
    } else {
        let raw = format!("{:?}", value);
        if raw.contains('.') || raw.contains('e') || raw.contains('E') {
            raw
        } else {
            format!("{}.0", raw)
        }
    }
}

/// Escapes `s` for a single-line basic string: quotes, backslashes and
/// control characters become escape sequences, everything else is verbatim.
pub(crate) fn escape_basic(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\u{8}' => out.push_str("\\b"),
            '\t' => out.push_str("\\t"),
            '\n' => out.push_str("\\n"),
            '\u{c}' => out.push_str("\\f"),
            '\r' => out.push_str("\\r"),
            c if (c as u32) < 0x20 || c as u32 == 0x7F => {
                out.push_str(&format!("\\u{:04X}", c as u32));
            },
            c => out.push(c),
        }
    }
    out
}

/// Escapes `s` for a multi-line basic string: backslashes and control
/// characters other than tab and newline become escape sequences, and a
/// `"""` run is broken so it cannot close the string early.
pub(crate) fn escape_ml_basic(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\u{8}' => out.push_str("\\b"),
            '\u{c}' => out.push_str("\\f"),
            '\r' => out.push_str("\\r"),
            '\n' | '\t' => out.push(c),
            c if (c as u32) < 0x20 || c as u32 == 0x7F => {
                out.push_str(&format!("\\u{:04X}", c as u32));
            },
            c => out.push(c),
        }
    }
    out.replace("\"\"\"", "\"\"\\\"")
}

impl From<i64> for Item {
    fn from(value: i64) -> Item {
        Item::Integer { value, raw: value.to_string(), trivia: Trivia::default() }
    }
}

impl From<i32> for Item {
    fn from(value: i32) -> Item {
        Item::from(i64::from(value))
    }
}

impl From<f64> for Item {
    fn from(value: f64) -> Item {
        Item::Float { value, raw: float_raw(value), trivia: Trivia::default() }
    }
}

impl From<bool> for Item {
    fn from(value: bool) -> Item {
        Item::Bool { value, trivia: Trivia::default() }
    }
}

impl<'a> From<&'a str> for Item {
    fn from(value: &'a str) -> Item {
        Item::Str {
            kind: StrType::Basic,
            original: escape_basic(value),
            value: value.to_string(),
            trivia: Trivia::default(),
        }
    }
}

impl From<String> for Item {
    fn from(value: String) -> Item {
        Item::from(value.as_str())
    }
}

impl From<Date> for Item {
    fn from(value: Date) -> Item {
        Item::Date { raw: value.to_string(), value, trivia: Trivia::default() }
    }
}

impl From<Time> for Item {
    fn from(value: Time) -> Item {
        Item::Time { raw: value.to_string(), value, trivia: Trivia::default() }
    }
}

impl From<DateTime> for Item {
    fn from(value: DateTime) -> Item {
        Item::DateTime { raw: value.to_string(), value, trivia: Trivia::default() }
    }
}

impl<V> From<Vec<V>> for Item
    where V: Into<Item>
{
    fn from(values: Vec<V>) -> Item {
        let mut array = Array::new();
        for value in values {
            array.push(value);
        }
        Item::Array(array)
    }
}

impl From<Array> for Item {
    fn from(array: Array) -> Item {
        Item::Array(array)
    }
}

impl From<InlineTable> for Item {
    fn from(table: InlineTable) -> Item {
        Item::InlineTable(table)
    }
}

impl From<Table> for Item {
    fn from(table: Table) -> Item {
        Item::Table(table)
    }
}

impl From<AoT> for Item {
    fn from(aot: AoT) -> Item {
        Item::AoT(aot)
    }
}

/// An array literal. The body interleaves value items with `Whitespace` and
/// `Comment` items holding the commas, spacing and comments of the source.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Array {
    pub(crate) items: Vec<Item>,
    pub(crate) trivia: Trivia,
    pub(crate) multiline: bool,
}

impl Array {
    pub fn new() -> Array {
        Array { items: Vec::new(), trivia: Trivia::default(), multiline: false }
    }

    pub(crate) fn with_items(items: Vec<Item>, trivia: Trivia) -> Array {
        let multiline = items.iter().any(|item| match item {
            Item::Whitespace { s } => s.contains('\n'),
            Item::Comment { .. } => true,
            _ => false,
        });
        Array { items, trivia, multiline }
    }

    /// Whether the array spans several lines in the source.
    pub fn is_multiline(&self) -> bool {
        self.multiline
    }

    /// The number of values, whitespace and comments excluded.
    pub fn len(&self) -> usize {
        self.values().count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Iterates the value items only.
    pub fn values(&self) -> impl Iterator<Item = &Item> {
        self.items
            .iter()
            .filter(|item| !item.is_whitespace() && !item.is_comment() && !item.is_null())
    }

    pub fn get(&self, idx: usize) -> Option<&Item> {
        self.values().nth(idx)
    }

    pub fn get_mut(&mut self, idx: usize) -> Option<&mut Item> {
        self.items
            .iter_mut()
            .filter(|item| !item.is_whitespace() && !item.is_comment() && !item.is_null())
            .nth(idx)
    }

    /// Every type tag in the array is the same.
    pub fn is_homogeneous(&self) -> bool {
        let mut discriminants =
            self.values().map(Item::discriminant).collect::<Vec<_>>();
        discriminants.dedup();
        discriminants.len() <= 1
    }

    /// Appends a value, synthesizing a `", "` separator in single-line
    /// arrays and a `",\n" + indent` separator in multiline ones.
    pub fn push<V>(&mut self, value: V)
        where V: Into<Item>
    {
        let item = value.into();
        let last_value_idx = self
            .items
            .iter()
            .rposition(|i| !i.is_whitespace() && !i.is_comment() && !i.is_null());
        match last_value_idx {
            None => self.items.push(item),
            Some(idx) if self.multiline => {
                let indent = self.element_indent(idx);
                self.items
                    .insert(idx + 1, Item::Whitespace { s: format!(",\n{}", indent) });
                self.items.insert(idx + 2, item);
            },
            Some(_) => {
                self.items.push(Item::Whitespace { s: ", ".to_string() });
                self.items.push(item);
            },
        }
    }

    pub fn extend<I, V>(&mut self, values: I)
        where I: IntoIterator<Item = V>,
              V: Into<Item>
    {
        for value in values {
            self.push(value);
        }
    }

    /// Removes the idx-th value and the separator that preceded or followed
    /// it.
    pub fn remove(&mut self, idx: usize) -> Option<Item> {
        let mut seen = 0;
        let mut body_idx = None;
        for (i, item) in self.items.iter().enumerate() {
            if !item.is_whitespace() && !item.is_comment() && !item.is_null() {
                if seen == idx {
                    body_idx = Some(i);
                    break;
                }
                seen += 1;
            }
        }
        let body_idx = body_idx?;
        let removed = self.items.remove(body_idx);
        // Drop the separator after it, or before it for the last element.
        if body_idx < self.items.len() {
            if let Item::Whitespace { s } = &self.items[body_idx] {
                if s.contains(',') {
                    self.items.remove(body_idx);
                }
            }
        } else if body_idx > 0 {
            if let Item::Whitespace { s } = &self.items[body_idx - 1] {
                if s.contains(',') {
                    self.items.remove(body_idx - 1);
                }
            }
        }
        Some(removed)
    }

    fn element_indent(&self, value_idx: usize) -> String {
        if value_idx == 0 {
            return String::new();
        }
        if let Item::Whitespace { s } = &self.items[value_idx - 1] {
            if let Some(pos) = s.rfind('\n') {
                return s[pos + 1..].to_string();
            }
        }
        String::new()
    }

    pub fn as_string(&self) -> String {
        let mut out = String::from("[");
        for item in &self.items {
            out.push_str(&item.as_string());
        }
        out.push(']');
        out
    }
}

/// An inline table literal: `{ key = value, ... }` on a single line.
#[derive(Debug, Clone, PartialEq)]
pub struct InlineTable {
    pub(crate) container: Container,
    pub(crate) trivia: Trivia,
}

impl Default for InlineTable {
    fn default() -> InlineTable {
        InlineTable::new()
    }
}

impl InlineTable {
    pub fn new() -> InlineTable {
        let mut container = Container::new();
        container.set_inline();
        InlineTable { container, trivia: Trivia::default() }
    }

    pub(crate) fn with_container(mut container: Container, trivia: Trivia) -> InlineTable {
        container.set_inline();
        InlineTable { container, trivia }
    }

    pub fn container(&self) -> &Container {
        &self.container
    }

    pub fn get(&self, key: &str) -> Option<&Item> {
        self.container.get(key)
    }

    pub fn get_mut(&mut self, key: &str) -> Option<&mut Item> {
        self.container.get_mut(key)
    }

    pub fn len(&self) -> usize {
        self.container.len()
    }

    pub fn is_empty(&self) -> bool {
        self.container.is_empty()
    }

    /// Inserts or replaces a pair, synthesizing a `", "` separator when the
    /// table already has entries.
    pub fn set<K, V>(&mut self, key: K, value: V)
        where K: Into<Key>,
              V: Into<Item>
    {
        let _ = self.container.set(key.into(), value.into());
    }

    /// Removes a pair along with its orphaned separator.
    pub fn remove(&mut self, key: &str) -> Result<(), crate::types::ParseError> {
        self.container.remove_with_separator(key)
    }

    pub fn as_string(&self) -> String {
        let mut out = String::from("{");
        for (key, item) in self.container.body() {
            match key {
                None => out.push_str(&item.as_string()),
                Some(key) => match item {
                    // A pair assigned through a dotted key.
                    Item::Table(table) => {
                        out.push_str(&crate::container::render_dotted(&key.as_string(), table));
                    },
                    Item::Null => {},
                    leaf => {
                        let trivia = leaf.trivia().cloned().unwrap_or_else(Trivia::empty);
                        out.push_str(&trivia.indent);
                        out.push_str(&key.as_string());
                        out.push_str(&key.sep);
                        out.push_str(&leaf.as_string());
                    },
                },
            }
        }
        out.push('}');
        out
    }
}

/// A table literal, declared by a `[header]` or materialized as the parent
/// of a deeper header.
#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    pub(crate) container: Container,
    pub(crate) trivia: Trivia,
    is_aot_element: bool,
    is_super_table: bool,
    pub(crate) name: Option<String>,
    pub(crate) display_name: Option<String>,
}

impl Default for Table {
    fn default() -> Table {
        Table::new(Container::new(), Trivia::default(), false)
    }
}

impl Table {
    pub fn new(container: Container, trivia: Trivia, is_aot_element: bool) -> Table {
        Table {
            container,
            trivia,
            is_aot_element,
            is_super_table: false,
            name: None,
            display_name: None,
        }
    }

    pub(crate) fn new_super(container: Container, trivia: Trivia, is_aot_element: bool) -> Table {
        let mut table = Table::new(container, trivia, is_aot_element);
        table.is_super_table = true;
        table
    }

    pub fn container(&self) -> &Container {
        &self.container
    }

    pub fn container_mut(&mut self) -> &mut Container {
        &mut self.container
    }

    /// Whether the table is an element of an array of tables.
    pub fn is_aot_element(&self) -> bool {
        self.is_aot_element
    }

    pub(crate) fn set_aot_element(&mut self, is_aot_element: bool) {
        self.is_aot_element = is_aot_element;
    }

    /// Whether the table exists only as a prefix in child headers.
    pub fn is_super_table(&self) -> bool {
        self.is_super_table
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub(crate) fn set_name<S>(&mut self, name: S)
        where S: Into<String>
    {
        self.name = Some(name.into());
    }

    /// The dotted path used verbatim when emitting this table's header.
    pub fn display_name(&self) -> Option<&str> {
        self.display_name.as_deref()
    }

    pub(crate) fn set_display_name(&mut self, name: Option<String>) {
        self.display_name = name;
    }

    pub fn get(&self, key: &str) -> Option<&Item> {
        self.container.get(key)
    }

    pub fn get_mut(&mut self, key: &str) -> Option<&mut Item> {
        self.container.get_mut(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.container.contains_key(&Key::new(key))
    }

    /// Inserts or replaces an entry, inheriting this table's indentation.
    pub fn set<K, V>(&mut self, key: K, value: V) -> Result<(), crate::types::ParseError>
        where K: Into<Key>,
              V: Into<Item>
    {
        self.container.set(key.into(), value.into())
    }

    pub fn append<K, V>(&mut self, key: K, value: V) -> Result<(), crate::types::ParseError>
        where K: Into<Key>,
              V: Into<Item>
    {
        self.container.append(key.into(), value.into())
    }

    pub fn remove(&mut self, key: &str) -> Result<(), crate::types::ParseError> {
        self.container.remove(key)
    }

    pub fn len(&self) -> usize {
        self.container.len()
    }

    pub fn is_empty(&self) -> bool {
        self.container.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Item)> {
        self.container.iter()
    }

    /// The table body as source text, this table's own header excluded.
    pub fn as_string(&self) -> String {
        self.container.as_string(self.name.as_deref())
    }
}

/// An array of tables: the sequence of `[[name]]` blocks sharing one name.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct AoT {
    pub(crate) body: Vec<Table>,
    pub(crate) name: Option<String>,
    pub(crate) parsed: bool,
}

impl AoT {
    pub fn new() -> AoT {
        AoT { body: Vec::new(), name: None, parsed: false }
    }

    pub(crate) fn with_tables(body: Vec<Table>, name: Option<String>, parsed: bool) -> AoT {
        AoT { body, name, parsed }
    }

    pub fn len(&self) -> usize {
        self.body.len()
    }

    pub fn is_empty(&self) -> bool {
        self.body.is_empty()
    }

    pub fn get(&self, idx: usize) -> Option<&Table> {
        self.body.get(idx)
    }

    pub fn get_mut(&mut self, idx: usize) -> Option<&mut Table> {
        self.body.get_mut(idx)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Table> {
        self.body.iter()
    }

    pub fn push(&mut self, mut table: Table) {
        table.set_aot_element(true);
        self.body.push(table);
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// The concatenated bodies of every element, headers excluded.
    pub fn as_string(&self) -> String {
        let mut out = String::new();
        for table in &self.body {
            out.push_str(&table.as_string());
        }
        out
    }
}

/// Deep host-value projections for table-like containers.
impl Container {
    pub(crate) fn unwrap(&self) -> HashMap<String, Value> {
        let mut map = HashMap::new();
        for (key, item) in self.iter() {
            if let Some(value) = item.unwrap() {
                map.insert(key.to_string(), value);
            }
        }
        map
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::types::StrType;

    #[test]
    fn test_integer_coercion_keeps_raw() {
        let item = Item::from(5_000);
        assert_eq!(item.as_string(), "5000");
        assert_eq!(item.as_integer(), Some(5000));
    }

    #[test]
    fn test_float_coercion() {
        assert_eq!(Item::from(9.876).as_string(), "9.876");
        assert_eq!(Item::from(3.0).as_string(), "3.0");
        assert_eq!(Item::from(std::f64::NAN).as_string(), "nan");
        assert_eq!(Item::from(-std::f64::NAN).as_string(), "-nan");
        assert_eq!(Item::from(std::f64::INFINITY).as_string(), "inf");
    }

    #[test]
    fn test_string_coercion_escapes() {
        let item = Item::from("say \"hello\"\nworld");
        assert_eq!(item.as_string(), "\"say \\\"hello\\\"\\nworld\"");
        assert_eq!(item.as_str(), Some("say \"hello\"\nworld"));
        match &item {
            Item::Str { kind, .. } => assert_eq!(*kind, StrType::Basic),
            _ => panic!("expected a string"),
        }
    }

    #[test]
    fn test_escape_control_chars() {
        assert_eq!(escape_basic("\u{1}"), "\\u0001");
        assert_eq!(escape_basic("\u{7f}"), "\\u007F");
        assert_eq!(escape_basic("tab\there"), "tab\\there");
    }

    #[test]
    fn test_array_push_single_line() {
        let mut array = Array::new();
        array.push(1);
        array.push(2);
        assert_eq!(array.as_string(), "[1, 2]");
        assert_eq!(array.len(), 2);
        assert!(array.is_homogeneous());
    }

    #[test]
    fn test_array_mixed_discriminants() {
        let mut array = Array::new();
        array.push(5);
        array.push(true);
        assert!(!array.is_homogeneous());
    }

    #[test]
    fn test_array_remove_drops_separator() {
        let mut array = Array::new();
        array.extend(vec![1, 2, 3]);
        array.remove(1);
        assert_eq!(array.as_string(), "[1, 3]");
        array.remove(1);
        assert_eq!(array.as_string(), "[1]");
        array.remove(0);
        assert_eq!(array.as_string(), "[]");
    }

    #[test]
    fn test_vec_coercion() {
        let item = Item::from(vec!["á", "β", "ç"]);
        assert_eq!(item.as_string(), "[\"á\", \"β\", \"ç\"]");
    }

    #[test]
    fn test_inline_table_set_and_remove() {
        let mut table = InlineTable::new();
        table.set("first", 1);
        table.set("second", 2);
        assert_eq!(table.as_string(), "{first = 1, second = 2}");
        table.remove("first").unwrap();
        assert_eq!(table.as_string(), "{second = 2}");
    }

    #[test]
    fn test_set_comment() {
        let mut item = Item::from(1);
        item.set_comment("the loneliest number");
        let trivia = item.trivia().unwrap();
        assert_eq!(trivia.comment, "# the loneliest number");
        assert_eq!(trivia.comment_ws, " ");
    }

    #[test]
    fn test_unwrap_projection() {
        let mut array = Array::new();
        array.extend(vec![1, 2]);
        let value = Item::Array(array).unwrap().unwrap();
        assert_eq!(
            value,
            crate::types::Value::Array(vec![
                crate::types::Value::Integer(1),
                crate::types::Value::Integer(2),
            ])
        );
    }
}
