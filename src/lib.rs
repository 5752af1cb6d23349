
//! Parse and manipulate TOML documents while preserving whitespace and comments with tomldoc.
//!
//! tomldoc is a Rust library for parsing, manipulating and outputting TOML documents. tomldoc strives to preserve
//! the original layout of your document, including optional whitespace, comments, key ordering and the exact
//! spelling of numbers and strings. A document parsed and emitted unchanged reproduces its source byte for byte;
//! a mutated document keeps every piece of formatting the mutation did not touch.
//!
//! Here's a quick example of how you parse a document, then get and set some values:
//!
//! # Examples
//!
//! ```
//! use tomldoc::parse;
//! use tomldoc::items::Item;
//!
//! let toml_doc = r#"[table] # This is a comment
//!   "Key One" = "A Value" # This line is indented
//!     Key2 = 1918-07-02 # This line is indented twice
//! "#;
//! let mut doc = parse(toml_doc).unwrap();
//! let value = doc.get_value("table.\"Key One\"");
//! assert_eq!(value.and_then(Item::as_str), Some("A Value"));
//! doc.set_value("table.\"Key One\"", 9.876).unwrap();
//! doc.set_value("table.Key2", false).unwrap();
//! assert_eq!(&format!("{}", doc), r#"[table] # This is a comment
//!   "Key One" = 9.876 # This line is indented
//!     Key2 = false # This line is indented twice
//! "#);
//! ```
//!
//! Documents can also be built from scratch:
//!
//! ```
//! use tomldoc::{comment, document, nl};
//!
//! let mut doc = document();
//! doc.add(comment("Hi")).unwrap();
//! doc.add(nl()).unwrap();
//! doc.set("t", 1).unwrap();
//! assert_eq!(doc.as_string(), "# Hi\n\nt = 1\n");
//! ```
//!
//! All parse failures carry the line and column where parsing stopped:
//!
//! ```
//! use tomldoc::parse;
//!
//! let err = parse("[table]\nkey = \"ok\"\nbad = [5, true]\n").unwrap_err();
//! assert_eq!(err.line(), Some(3));
//! ```

#![warn(clippy::all, clippy::pedantic)]
#![allow(clippy::manual_strip)]
#![allow(clippy::match_same_arms)]
#![allow(clippy::match_wildcard_for_single_variants)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::return_self_not_must_use)]
#![allow(clippy::too_many_lines)]

#[macro_use]
extern crate lazy_static;
#[macro_use]
extern crate log;
extern crate regex;

pub mod container;
pub mod document;
pub mod items;
pub mod key;
pub mod toml_file;
pub mod types;
mod internals;

use std::io;
use std::io::{Read, Write};

use regex::Regex;

use crate::internals::parser::Parser;
pub use crate::container::{Container, OutOfOrderTableProxy};
pub use crate::document::TOMLDocument;
pub use crate::items::{AoT, Array, InlineTable, Item, Table, Trivia};
pub use crate::key::Key;
pub use crate::toml_file::TOMLFile;
pub use crate::types::ParseError;

use crate::types::{Date, DateTime, PosNeg, StrType, Time, TimeOffset, TimeOffsetAmount};

lazy_static! {
  static ref RFC_3339_DATETIME: Regex = Regex::new(
    r"^(\d{4})-(0[1-9]|1[012])-(0[1-9]|[12][0-9]|3[01])[Tt ]([01][0-9]|2[0-3]):([0-5][0-9]):([0-5][0-9]|60)(\.([0-9]+))?(([Zz])|([+-])([01][0-9]|2[0-3]):([0-5][0-9]))?$"
  ).expect("datetime pattern");
  static ref RFC_3339_DATE: Regex =
    Regex::new(r"^(\d{4})-(0[1-9]|1[012])-(0[1-9]|[12][0-9]|3[01])$").expect("date pattern");
  static ref RFC_3339_TIME: Regex =
    Regex::new(r"^([01][0-9]|2[0-3]):([0-5][0-9]):([0-5][0-9]|60)(\.([0-9]+))?$")
      .expect("time pattern");
}

/// Parses a TOML document.
///
/// # Examples
///
/// ```
/// use tomldoc::parse;
///
/// let doc = parse("[table]\nAKey = \"A Value\"\n").unwrap();
/// assert_eq!(doc.as_string(), "[table]\nAKey = \"A Value\"\n");
/// ```
pub fn parse(input: &str) -> Result<TOMLDocument, ParseError> {
  Parser::new(input).parse()
}

/// Parses a TOML document. Alias for `parse`.
pub fn loads(input: &str) -> Result<TOMLDocument, ParseError> {
  parse(input)
}

/// Re-assembles a document's source text.
pub fn emit(doc: &TOMLDocument) -> String {
  doc.as_string()
}

/// Re-assembles a document's source text. With `sort_keys`, leaves are
/// re-ordered alphabetically within each table at emit time only; the
/// document itself keeps its ordering.
pub fn dumps(doc: &TOMLDocument, sort_keys: bool) -> String {
  if !sort_keys {
    return doc.as_string();
  }
  let mut sorted = doc.clone();
  sorted.container_mut().sort_leaves();
  sorted.as_string()
}

/// Reads a whole stream and parses it. Parse failures surface as
/// `io::ErrorKind::InvalidData`.
pub fn load<R>(reader: &mut R) -> io::Result<TOMLDocument>
  where R: Read
{
  let mut input = String::new();
  reader.read_to_string(&mut input)?;
  parse(&input).map_err(|error| io::Error::new(io::ErrorKind::InvalidData, error))
}

/// Writes a document's source text to a stream.
pub fn dump<W>(doc: &TOMLDocument, writer: &mut W) -> io::Result<()>
  where W: Write
{
  writer.write_all(doc.as_string().as_bytes())
}

/// Returns a new empty document.
pub fn document() -> TOMLDocument {
  TOMLDocument::new()
}

/// Creates an `Item` from any coercible host value.
///
/// # Examples
///
/// ```
/// use tomldoc::item;
///
/// assert_eq!(item(5_000).as_string(), "5000");
/// assert_eq!(item(vec![1, 2]).as_string(), "[1, 2]");
/// ```
pub fn item<V>(value: V) -> Item
  where V: Into<Item>
{
  value.into()
}

/// Parses a standalone value expression, e.g. `"[1, 2, 3]"`.
pub fn value(raw: &str) -> Result<Item, ParseError> {
  Parser::new(raw).parse_standalone_value()
}

/// Parses a standalone `key = value` expression.
pub fn key_value(raw: &str) -> Result<(Key, Item), ParseError> {
  Parser::new(raw).parse_standalone_key_value()
}

/// Creates an Integer item from its TOML source form, preserving
/// underscores and base prefixes.
///
/// # Examples
///
/// ```
/// use tomldoc::integer;
///
/// let item = integer("5_000").unwrap();
/// assert_eq!(item.as_integer(), Some(5000));
/// assert_eq!(item.as_string(), "5_000");
/// assert!(integer("_989_721_").is_err());
/// ```
pub fn integer(raw: &str) -> Result<Item, ParseError> {
  match value(raw) {
    Ok(item @ Item::Integer { .. }) => Ok(item),
    _ => {
      warn!("cannot parse {:?} as an integer", raw);
      Err(ParseError::InvalidNumber { line: 1, col: 1 })
    },
  }
}

/// Creates a Float item from its TOML source form.
pub fn float(raw: &str) -> Result<Item, ParseError> {
  match value(raw) {
    Ok(item @ Item::Float { .. }) => Ok(item),
    _ => {
      warn!("cannot parse {:?} as a float", raw);
      Err(ParseError::InvalidNumber { line: 1, col: 1 })
    },
  }
}

/// Creates a Bool item from `"true"` or `"false"`.
pub fn boolean(raw: &str) -> Result<Item, ParseError> {
  match raw {
    "true" => Ok(item(true)),
    "false" => Ok(item(false)),
    _ => {
      warn!("cannot parse {:?} as a boolean", raw);
      Err(ParseError::InvalidString { message: format!("{:?} is not a boolean", raw) })
    },
  }
}

/// Options for the `string_custom` factory.
#[derive(Debug, Clone, Copy)]
pub struct StringOptions {
  /// Use triple delimiters and allow raw newlines.
  pub multiline: bool,
  /// Use literal (`'`) quoting; no escape sequences exist in the output.
  pub literal: bool,
  /// Escape quotes, backslashes and control characters (basic strings
  /// only). When false the content must already be representable verbatim.
  pub escape: bool,
}

impl Default for StringOptions {
  fn default() -> StringOptions {
    StringOptions { multiline: false, literal: false, escape: true }
  }
}

/// Creates a single-line basic String item, escaping as needed.
pub fn string<S>(s: S) -> Item
  where S: Into<String>
{
  let value = s.into();
  let original = items::escape_basic(&value);
  Item::Str { kind: StrType::Basic, value, original, trivia: Trivia::default() }
}

/// Creates a String item with explicit quoting options. Content that the
/// requested quoting cannot represent is rejected with `InvalidString`.
///
/// # Examples
///
/// ```
/// use tomldoc::{string_custom, StringOptions};
///
/// let opts = StringOptions { literal: true, ..StringOptions::default() };
/// let item = string_custom("C:\\Users", opts).unwrap();
/// assert_eq!(item.as_string(), "'C:\\Users'");
/// assert!(string_custom("don't", opts).is_err());
/// ```
pub fn string_custom<S>(s: S, options: StringOptions) -> Result<Item, ParseError>
  where S: Into<String>
{
  let value = s.into();
  let kind = match (options.multiline, options.literal) {
    (false, false) => StrType::Basic,
    (true, false) => StrType::MLBasic,
    (false, true) => StrType::Literal,
    (true, true) => StrType::MLLiteral,
  };

  let invalid = |message: String| {
    warn!("{}", message);
    ParseError::InvalidString { message }
  };

  let original = match kind {
    StrType::Literal => {
      if value.contains('\'') {
        return Err(invalid(format!("{:?} cannot be held in a literal string", value)));
      }
      if value.chars().any(|c| c == '\n' || c == '\r' || internals::chars::is_control(c)) {
        return Err(invalid(format!("{:?} cannot be held in a literal string", value)));
      }
      value.clone()
    },
    StrType::MLLiteral => {
      if value.contains("'''")
        || value.chars().any(|c| c != '\n' && internals::chars::is_control(c))
      {
        return Err(invalid(format!(
          "{:?} cannot be held in a multi-line literal string",
          value
        )));
      }
      value.clone()
    },
    StrType::Basic => {
      if options.escape {
        items::escape_basic(&value)
      } else {
        let needs_escape = value
          .chars()
          .any(|c| c == '"' || c == '\\' || c == '\n' || c == '\r'
            || internals::chars::is_control(c));
        if needs_escape {
          return Err(invalid(format!("{:?} requires escaping", value)));
        }
        value.clone()
      }
    },
    StrType::MLBasic => {
      if options.escape {
        items::escape_ml_basic(&value)
      } else {
        let needs_escape = value.contains("\"\"\"")
          || value
            .chars()
            .any(|c| c == '\\' || (c != '\n' && internals::chars::is_control(c)));
        if needs_escape {
          return Err(invalid(format!("{:?} requires escaping", value)));
        }
        value.clone()
      }
    },
  };

  Ok(Item::Str { kind, value, original, trivia: Trivia::default() })
}

/// Creates a single-line basic String item. Same content rules as
/// `string`.
pub fn basic_string<S>(s: S) -> Item
  where S: Into<String>
{
  string(s)
}

/// Creates a multi-line basic String item.
pub fn ml_basic_string<S>(s: S) -> Result<Item, ParseError>
  where S: Into<String>
{
  string_custom(s, StringOptions { multiline: true, ..StringOptions::default() })
}

/// Creates a literal String item.
pub fn literal_string<S>(s: S) -> Result<Item, ParseError>
  where S: Into<String>
{
  string_custom(s, StringOptions { literal: true, ..StringOptions::default() })
}

/// Creates a multi-line literal String item.
pub fn ml_literal_string<S>(s: S) -> Result<Item, ParseError>
  where S: Into<String>
{
  string_custom(s, StringOptions { multiline: true, literal: true, escape: true })
}

/// Creates a Date item from an RFC 3339 date string.
///
/// # Examples
///
/// ```
/// use tomldoc::date;
///
/// assert_eq!(date("1979-05-27").unwrap().as_string(), "1979-05-27");
/// assert!(date("1979-02-30").is_err());
/// ```
pub fn date(raw: &str) -> Result<Item, ParseError> {
  let captures = RFC_3339_DATE
    .captures(raw)
    .ok_or(ParseError::InvalidDate { line: 1, col: 1 })?;
  let value = Date {
    year: capture_num(&captures, 1)? as u16,
    month: capture_num(&captures, 2)? as u8,
    day: capture_num(&captures, 3)? as u8,
  };
  if !value.validate() {
    warn!("invalid date {:?}", raw);
    return Err(ParseError::InvalidDate { line: 1, col: 1 });
  }
  Ok(Item::Date { value, raw: raw.to_string(), trivia: Trivia::default() })
}

/// Creates a Time item from an RFC 3339 time string.
pub fn time(raw: &str) -> Result<Item, ParseError> {
  let captures = RFC_3339_TIME
    .captures(raw)
    .ok_or(ParseError::InvalidTime { line: 1, col: 1 })?;
  let value = Time {
    hour: capture_num(&captures, 1)? as u8,
    minute: capture_num(&captures, 2)? as u8,
    second: capture_num(&captures, 3)? as u8,
    microsecond: fraction_to_micros(captures.get(5).map(|m| m.as_str())),
  };
  if !value.validate() {
    warn!("invalid time {:?}", raw);
    return Err(ParseError::InvalidTime { line: 1, col: 1 });
  }
  Ok(Item::Time { value, raw: raw.to_string(), trivia: Trivia::default() })
}

/// Creates a DateTime item from an RFC 3339 datetime string, with an
/// optional `Z` or `±HH:MM` offset.
///
/// # Examples
///
/// ```
/// use tomldoc::datetime;
///
/// let item = datetime("1979-05-27T07:32:00Z").unwrap();
/// assert_eq!(item.as_string(), "1979-05-27T07:32:00Z");
/// ```
pub fn datetime(raw: &str) -> Result<Item, ParseError> {
  let captures = RFC_3339_DATETIME
    .captures(raw)
    .ok_or(ParseError::InvalidDateTime { line: 1, col: 1 })?;
  let date = Date {
    year: capture_num(&captures, 1)? as u16,
    month: capture_num(&captures, 2)? as u8,
    day: capture_num(&captures, 3)? as u8,
  };
  let time = Time {
    hour: capture_num(&captures, 4)? as u8,
    minute: capture_num(&captures, 5)? as u8,
    second: capture_num(&captures, 6)? as u8,
    microsecond: fraction_to_micros(captures.get(8).map(|m| m.as_str())),
  };
  let offset = if captures.get(10).is_some() {
    Some(TimeOffset::Zulu)
  } else if captures.get(11).is_some() {
    let pos_neg = if captures.get(11).map(|m| m.as_str()) == Some("-") {
      PosNeg::Neg
    } else {
      PosNeg::Pos
    };
    Some(TimeOffset::Time(TimeOffsetAmount {
      pos_neg,
      hour: capture_num(&captures, 12)? as u8,
      minute: capture_num(&captures, 13)? as u8,
    }))
  } else {
    None
  };
  let value = DateTime { date, time, offset };
  if !value.validate() {
    warn!("invalid datetime {:?}", raw);
    return Err(ParseError::InvalidDateTime { line: 1, col: 1 });
  }
  Ok(Item::DateTime { value, raw: raw.to_string(), trivia: Trivia::default() })
}

fn capture_num(captures: &regex::Captures, group: usize) -> Result<u32, ParseError> {
  captures
    .get(group)
    .and_then(|m| m.as_str().parse().ok())
    .ok_or(ParseError::InternalParser {
      line: 1,
      col: 1,
      message: "RFC 3339 capture group missing".to_string(),
    })
}

fn fraction_to_micros(fraction: Option<&str>) -> u32 {
  match fraction {
    None => 0,
    Some(digits) => {
      let padded = format!("{:0<6}", digits);
      padded[..6].parse().unwrap_or(0)
    },
  }
}

/// Returns an empty Array item.
pub fn array() -> Item {
  Item::Array(Array::new())
}

/// Parses an Array item from its source form.
pub fn array_from(raw: &str) -> Result<Item, ParseError> {
  match value(raw) {
    Ok(item @ Item::Array(_)) => Ok(item),
    Ok(_) => Err(ParseError::InvalidString {
      message: format!("{:?} is not an array", raw),
    }),
    Err(error) => Err(error),
  }
}

/// Returns an empty Table item.
pub fn table() -> Item {
  Item::Table(Table::default())
}

/// Returns an empty InlineTable item.
pub fn inline_table() -> Item {
  Item::InlineTable(InlineTable::new())
}

/// Returns an empty array-of-tables item.
pub fn aot() -> Item {
  Item::AoT(AoT::new())
}

/// Creates a single key, choosing bare or quoted spelling from its
/// characters.
pub fn key<S>(name: S) -> Key
  where S: Into<String>
{
  Key::new(name)
}

/// Creates a Whitespace item.
pub fn ws<S>(s: S) -> Item
  where S: Into<String>
{
  Item::Whitespace { s: s.into() }
}

/// Creates a newline Whitespace item.
pub fn nl() -> Item {
  ws("\n")
}

/// Creates a full-line Comment item; a missing leading `#` is supplied.
pub fn comment<S>(text: S) -> Item
  where S: Into<String>
{
  let mut text = text.into();
  if !text.trim_start().starts_with('#') {
    text = format!("# {}", text);
  }
  Item::Comment {
    trivia: Trivia {
      indent: String::new(),
      comment_ws: "  ".to_string(),
      comment: text,
      trail: "\n".to_string(),
    },
  }
}

#[cfg(test)]
mod test {
  use super::*;

  #[ctor::ctor]
  fn init_test_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
  }

  #[test]
  fn test_round_trip_unmodified() {
    let input = r#"# Tλïƨ ïƨ á TÓM£ δôçú₥èñƭ.

title = "TÓM£ Éжá₥ƥℓè"

[owner]
name = "Tô₥ Þřèƨƭôñ-Wèřñèř"

[database]
server = "192.168.1.1"
ports = [ 8001, 8001, 8002 ]
connection_max = 5000
enabled = true
"#;
    let doc = parse(input).unwrap();
    assert_eq!(emit(&doc), input);
  }

  #[test]
  fn test_reparse_equals_original_parse() {
    let input = "a = 1 # ôñè\n[t.u]\nb = [ true, false ]\nc = { d = 'x', e = 2 }\n";
    let doc = parse(input).unwrap();
    let doc2 = parse(&emit(&doc)).unwrap();
    assert_eq!(doc, doc2);
  }

  #[test]
  fn test_adding_value_appends_line() {
    let mut doc = parse("a = 1\n").unwrap();
    assert_eq!(doc.get("a").and_then(Item::as_integer), Some(1));
    doc.set("b", 2).unwrap();
    assert_eq!(doc.as_string(), "a = 1\nb = 2\n");
  }

  #[test]
  fn test_set_then_delete_restores_text() {
    let mut doc = parse("a = 1\n").unwrap();
    doc.set("b", 2).unwrap();
    doc.remove("b").unwrap();
    assert_eq!(doc.as_string(), "a = 1\n");
  }

  #[test]
  fn test_inserting_after_element_with_no_newline_adds_one() {
    let mut doc = parse("foo = 10").unwrap();
    doc.set("bar", 11).unwrap();
    assert_eq!(doc.as_string(), "foo = 10\nbar = 11\n");

    let mut doc = parse("# Comment").unwrap();
    doc.set("bar", 11).unwrap();
    assert_eq!(doc.as_string(), "# Comment\nbar = 11\n");
  }

  #[test]
  fn test_mutating_nested_value_keeps_header() {
    let mut doc = parse("[tool.poetry]\nname = \"foo\"\n").unwrap();
    doc.set_value("tool.poetry.name", "bar").unwrap();
    assert_eq!(doc.as_string(), "[tool.poetry]\nname = \"bar\"\n");
  }

  #[test]
  fn test_out_of_order_update_keeps_declaration_order() {
    let mut doc = parse("[a.a]\nk = 1\n[a.b]\n[a.a.c]\n").unwrap();
    doc.set_value("a.a.k", 2).unwrap();
    assert_eq!(doc.as_string(), "[a.a]\nk = 2\n[a.b]\n[a.a.c]\n");
  }

  #[test]
  fn test_array_extension_keeps_comment() {
    let mut doc = parse("a = [1, 2] # Comment\n").unwrap();
    doc
      .get_mut("a")
      .and_then(Item::as_array_mut)
      .unwrap()
      .extend(vec![3, 4]);
    assert_eq!(doc.as_string(), "a = [1, 2, 3, 4] # Comment\n");
  }

  #[test]
  fn test_building_from_scratch() {
    let mut doc = document();
    doc.add(comment("Hi")).unwrap();
    doc.add(nl()).unwrap();
    doc.set("t", 1).unwrap();
    assert_eq!(doc.as_string(), "# Hi\n\nt = 1\n");
  }

  #[test]
  fn test_deleting_leading_value_before_table() {
    let mut doc = parse("foo = \"bar\"\n[t]\nx = 1\n").unwrap();
    doc.remove("foo").unwrap();
    assert_eq!(doc.as_string(), "[t]\nx = 1\n");
  }

  #[test]
  fn test_dumps_sorted_leaves() {
    let doc = parse("b = 2\na = 1\n[t]\nz = 1\ny = 2\n").unwrap();
    assert_eq!(dumps(&doc, true), "a = 1\nb = 2\n[t]\ny = 2\nz = 1\n");
    // The document itself is untouched.
    assert_eq!(dumps(&doc, false), "b = 2\na = 1\n[t]\nz = 1\ny = 2\n");
  }

  #[test]
  fn test_load_and_dump() {
    let mut input = "a = 1\n".as_bytes();
    let doc = load(&mut input).unwrap();
    let mut out = Vec::new();
    dump(&doc, &mut out).unwrap();
    assert_eq!(out, b"a = 1\n");
  }

  #[test]
  fn test_value_factory() {
    assert_eq!(value("[1, 2, 3]").unwrap().as_string(), "[1, 2, 3]");
    assert!(value("[1, 2,").is_err());
    assert!(value("1 trailing").is_err());
  }

  #[test]
  fn test_key_value_factory() {
    let (k, v) = key_value("amount = 9_000").unwrap();
    assert_eq!(k.name(), "amount");
    assert_eq!(v.as_integer(), Some(9000));
  }

  #[test]
  fn test_float_factory() {
    assert_eq!(float("1e6").unwrap().as_float(), Some(1e6));
    assert!(float("1").is_err());
    assert!(float("huge").is_err());
  }

  #[test]
  fn test_boolean_factory() {
    assert_eq!(boolean("true").unwrap().as_bool(), Some(true));
    assert!(boolean("True").is_err());
  }

  #[test]
  fn test_string_factories() {
    assert_eq!(string("a \"quote\"").as_string(), "\"a \\\"quote\\\"\"");
    assert_eq!(
      ml_basic_string("two\nlines").unwrap().as_string(),
      "\"\"\"two\nlines\"\"\""
    );
    assert_eq!(literal_string("verbatim\\").unwrap().as_string(), "'verbatim\\'");
    assert!(literal_string("new\nline").is_err());
    assert!(ml_literal_string("has ''' inside").is_err());
  }

  #[test]
  fn test_string_no_escape_rejects_controls() {
    let opts = StringOptions { escape: false, ..StringOptions::default() };
    assert!(string_custom("plain", opts).is_ok());
    assert!(string_custom("with \"quote\"", opts).is_err());
    assert!(string_custom("with \u{1} control", opts).is_err());
  }

  #[test]
  fn test_datetime_factory() {
    let item = datetime("1979-05-27T07:32:00.999999-08:00").unwrap();
    let dt = item.as_datetime().unwrap();
    assert_eq!(dt.time.microsecond, 999_999);
    assert_eq!(
      dt.offset,
      Some(TimeOffset::Time(TimeOffsetAmount {
        pos_neg: PosNeg::Neg,
        hour: 8,
        minute: 0,
      }))
    );
    assert!(datetime("1979-05-27").is_err());
    // Fractions beyond microseconds truncate.
    let item = datetime("1979-05-27T00:00:00.123456789Z").unwrap();
    assert_eq!(item.as_datetime().unwrap().time.microsecond, 123_456);
  }

  #[test]
  fn test_time_factory() {
    assert_eq!(
      time("07:32:00").unwrap().as_time(),
      Some(Time { hour: 7, minute: 32, second: 0, microsecond: 0 })
    );
    assert!(time("25:00:00").is_err());
  }

  #[test]
  fn test_replace_leaf_with_table_moves_to_end() {
    let mut doc = parse("leaf = 1\nother = 2\n").unwrap();
    doc.set("leaf", table()).unwrap();
    let emitted = doc.as_string();
    let leaf_pos = emitted.find("[leaf]").expect("table header emitted");
    let other_pos = emitted.find("other = 2").expect("other key kept");
    assert!(leaf_pos > other_pos);
  }

  #[test]
  fn test_unwrap_of_nan_is_host_nan() {
    let doc = parse("a = nan\n").unwrap();
    match doc.unwrap() {
      types::Value::Table(map) => match map.get("a") {
        Some(types::Value::Float(f)) => assert!(f.is_nan()),
        other => panic!("unexpected {:?}", other),
      },
      other => panic!("unexpected {:?}", other),
    }
  }
}
