//! Shared public types: the error hierarchy, string and key kinds, date and
//! time values, and the plain `Value` projection returned by `unwrap`.

use std::collections::HashMap;
use std::error::Error;
use std::fmt;
use std::fmt::Display;

/// Errors produced while parsing or building TOML documents.
///
/// Parse-side variants carry the line and column (both 1-based) where the
/// error was encountered. Mutation-side variants (`KeyAlreadyPresent`,
/// `NonExistentKey`) and the builder-side `InvalidString` carry no position.
///
/// # Examples
///
/// ```
/// use tomldoc::parse;
///
/// let err = parse("a = !").unwrap_err();
/// assert_eq!(err.line(), Some(1));
/// assert_eq!(err.column(), Some(5));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// A character that the grammar does not allow at this position.
    UnexpectedChar { line: usize, col: usize, character: char },
    /// The input ended in the middle of a statement.
    UnexpectedEof { line: usize, col: usize },
    /// A key/value pair or table header with an empty key.
    EmptyKey { line: usize, col: usize },
    /// A `[]` or `[[]]` header with no name inside.
    EmptyTableName { line: usize, col: usize },
    /// A bug in the parser itself; should never be seen by callers.
    InternalParser { line: usize, col: usize, message: String },
    /// An integer or float that violates the number grammar.
    InvalidNumber { line: usize, col: usize },
    /// A date with out-of-range fields.
    InvalidDate { line: usize, col: usize },
    /// A time with out-of-range fields.
    InvalidTime { line: usize, col: usize },
    /// A datetime with out-of-range fields.
    InvalidDateTime { line: usize, col: usize },
    /// An invalid character inside a string, e.g. a bad escape.
    InvalidCharInString { line: usize, col: usize, character: char },
    /// A raw control character inside a string.
    InvalidControlChar { line: usize, col: usize, character: char },
    /// A string builder was given content that cannot be represented with
    /// the requested quoting.
    InvalidString { message: String },
    /// An array containing two or more element types.
    MixedArrayTypes { line: usize, col: usize },
    /// An attempt to define a key twice in the same body.
    KeyAlreadyPresent { key: String },
    /// A lookup or removal of a key that does not exist.
    NonExistentKey { key: String },
}

impl ParseError {
    /// The 1-based line the error was found on, if the error is positional.
    pub fn line(&self) -> Option<usize> {
        match self {
            ParseError::UnexpectedChar { line, .. }
            | ParseError::UnexpectedEof { line, .. }
            | ParseError::EmptyKey { line, .. }
            | ParseError::EmptyTableName { line, .. }
            | ParseError::InternalParser { line, .. }
            | ParseError::InvalidNumber { line, .. }
            | ParseError::InvalidDate { line, .. }
            | ParseError::InvalidTime { line, .. }
            | ParseError::InvalidDateTime { line, .. }
            | ParseError::InvalidCharInString { line, .. }
            | ParseError::InvalidControlChar { line, .. }
            | ParseError::MixedArrayTypes { line, .. } => Some(*line),
            _ => None,
        }
    }

    /// The 1-based column the error was found at, if the error is positional.
    pub fn column(&self) -> Option<usize> {
        match self {
            ParseError::UnexpectedChar { col, .. }
            | ParseError::UnexpectedEof { col, .. }
            | ParseError::EmptyKey { col, .. }
            | ParseError::EmptyTableName { col, .. }
            | ParseError::InternalParser { col, .. }
            | ParseError::InvalidNumber { col, .. }
            | ParseError::InvalidDate { col, .. }
            | ParseError::InvalidTime { col, .. }
            | ParseError::InvalidDateTime { col, .. }
            | ParseError::InvalidCharInString { col, .. }
            | ParseError::InvalidControlChar { col, .. }
            | ParseError::MixedArrayTypes { col, .. } => Some(*col),
            _ => None,
        }
    }

    fn message(&self) -> String {
        match self {
            ParseError::UnexpectedChar { character, .. } => {
                format!("Unexpected character: {:?}", character)
            },
            ParseError::UnexpectedEof { .. } => "Unexpected end of file".to_string(),
            ParseError::EmptyKey { .. } => "Empty key".to_string(),
            ParseError::EmptyTableName { .. } => "Empty table name".to_string(),
            ParseError::InternalParser { message, .. } => {
                format!("Internal parser error: {}", message)
            },
            ParseError::InvalidNumber { .. } => "Invalid number format".to_string(),
            ParseError::InvalidDate { .. } => "Invalid date format".to_string(),
            ParseError::InvalidTime { .. } => "Invalid time format".to_string(),
            ParseError::InvalidDateTime { .. } => "Invalid datetime format".to_string(),
            ParseError::InvalidCharInString { character, .. } => {
                format!("Invalid character {:?} in string", character)
            },
            ParseError::InvalidControlChar { character, .. } => {
                format!("Control character U+{:04X} must be escaped", *character as u32)
            },
            ParseError::InvalidString { message } => message.clone(),
            ParseError::MixedArrayTypes { .. } => "Mixed types found in array".to_string(),
            ParseError::KeyAlreadyPresent { key } => {
                format!("Key {:?} already exists", key)
            },
            ParseError::NonExistentKey { key } => {
                format!("Key {:?} does not exist", key)
            },
        }
    }
}

impl Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match (self.line(), self.column()) {
            (Some(line), Some(col)) => {
                write!(f, "{} at line {} col {}", self.message(), line, col)
            },
            _ => write!(f, "{}", self.message()),
        }
    }
}

impl Error for ParseError {}

/// Represents the 4 different types of strings that are allowed in TOML
/// documents.
#[derive(Debug, Eq, PartialEq, Copy, Clone, Hash)]
pub enum StrType {
    /// A basic string, delimited by `"`.
    Basic,
    /// A multi-line basic string, delimited by `"""`.
    MLBasic,
    /// A literal string, delimited by `'`.
    Literal,
    /// A multi-line literal string, delimited by `'''`.
    MLLiteral,
}

impl StrType {
    /// The full opening/closing delimiter.
    pub fn delimiter(self) -> &'static str {
        match self {
            StrType::Basic => "\"",
            StrType::MLBasic => "\"\"\"",
            StrType::Literal => "'",
            StrType::MLLiteral => "'''",
        }
    }

    /// The single delimiter character (`"` or `'`).
    pub fn unit(self) -> char {
        match self {
            StrType::Basic | StrType::MLBasic => '"',
            StrType::Literal | StrType::MLLiteral => '\'',
        }
    }

    pub fn is_basic(self) -> bool {
        match self {
            StrType::Basic | StrType::MLBasic => true,
            _ => false,
        }
    }

    pub fn is_multiline(self) -> bool {
        match self {
            StrType::MLBasic | StrType::MLLiteral => true,
            _ => false,
        }
    }

    /// Converts a single-line type to its multi-line counterpart.
    pub fn toggle(self) -> StrType {
        match self {
            StrType::Basic => StrType::MLBasic,
            StrType::MLBasic => StrType::Basic,
            StrType::Literal => StrType::MLLiteral,
            StrType::MLLiteral => StrType::Literal,
        }
    }
}

/// The quoting style of a key.
#[derive(Debug, Eq, PartialEq, Copy, Clone, Hash)]
pub enum KeyKind {
    /// An unquoted key of `A-Za-z0-9_-` characters.
    Bare,
    /// A key quoted with `"`, following basic string escaping rules.
    Basic,
    /// A key quoted with `'`, taken verbatim.
    Literal,
}

impl KeyKind {
    pub fn delimiter(self) -> &'static str {
        match self {
            KeyKind::Bare => "",
            KeyKind::Basic => "\"",
            KeyKind::Literal => "'",
        }
    }
}

/// Represents a plus sign or minus sign for positive and negative timezone
/// offsets.
#[derive(Debug, Eq, PartialEq, Clone, Copy, Hash)]
pub enum PosNeg {
    /// A plus sign representing a positive timezone offset.
    Pos,
    /// A minus sign representing a negative timezone offset.
    Neg,
}

impl Display for PosNeg {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            PosNeg::Pos => write!(f, "+"),
            PosNeg::Neg => write!(f, "-"),
        }
    }
}

/// A positive or negative amount of hours and minutes offset from UTC.
#[derive(Debug, Eq, PartialEq, Clone, Copy, Hash)]
pub struct TimeOffsetAmount {
    /// Whether the offset is positive or negative.
    pub pos_neg: PosNeg,
    /// Hours offset from UTC. Must be between 0 and 23 inclusive.
    pub hour: u8,
    /// Minutes offset from UTC. Must be between 0 and 59 inclusive.
    pub minute: u8,
}

impl Display for TimeOffsetAmount {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}{:02}:{:02}", self.pos_neg, self.hour, self.minute)
    }
}

impl TimeOffsetAmount {
    pub fn validate(&self) -> bool {
        self.hour <= 23 && self.minute <= 59
    }
}

/// Represents either a timezone of Zulu or an hour plus minute timezone
/// offset from UTC.
#[derive(Debug, Eq, PartialEq, Clone, Copy, Hash)]
pub enum TimeOffset {
    /// Timezone Zulu, also known as Coordinated Universal Time (UTC).
    Zulu,
    /// Hours and minutes offset from UTC.
    Time(TimeOffsetAmount),
}

impl Display for TimeOffset {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            TimeOffset::Zulu => write!(f, "Z"),
            TimeOffset::Time(amount) => write!(f, "{}", amount),
        }
    }
}

impl TimeOffset {
    pub fn validate(&self) -> bool {
        match self {
            TimeOffset::Zulu => true,
            TimeOffset::Time(amount) => amount.validate(),
        }
    }
}

/// A calendar date.
///
/// # Examples
///
/// ```
/// use tomldoc::types::Date;
///
/// let date = Date { year: 1979, month: 5, day: 27 };
/// assert!(date.validate());
/// assert_eq!(format!("{}", date), "1979-05-27");
/// ```
#[derive(Debug, Eq, PartialEq, Clone, Copy, Hash)]
pub struct Date {
    pub year: u16,
    pub month: u8,
    pub day: u8,
}

impl Date {
    /// Validates the date: a real month, and a day that exists in that month
    /// of that year (leap years included).
    pub fn validate(&self) -> bool {
        if self.month == 0 || self.month > 12 || self.day == 0 {
            return false;
        }
        self.day <= days_in_month(self.year, self.month)
    }
}

impl Display for Date {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{:04}-{:02}-{:02}", self.year, self.month, self.day)
    }
}

fn is_leap_year(year: u16) -> bool {
    year % 4 == 0 && (year % 100 != 0 || year % 400 == 0)
}

fn days_in_month(year: u16, month: u8) -> u8 {
    match month {
        1 | 3 | 5 | 7 | 8 | 10 | 12 => 31,
        4 | 6 | 9 | 11 => 30,
        2 if is_leap_year(year) => 29,
        2 => 28,
        _ => 0,
    }
}

/// A clock time with microsecond precision.
#[derive(Debug, Eq, PartialEq, Clone, Copy, Hash)]
pub struct Time {
    pub hour: u8,
    pub minute: u8,
    pub second: u8,
    /// Fractional seconds, truncated or padded to microseconds.
    pub microsecond: u32,
}

impl Time {
    pub fn validate(&self) -> bool {
        self.hour <= 23 && self.minute <= 59 && self.second <= 60 && self.microsecond < 1_000_000
    }
}

impl Display for Time {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{:02}:{:02}:{:02}", self.hour, self.minute, self.second)?;
        if self.microsecond != 0 {
            write!(f, ".{:06}", self.microsecond)?;
        }
        Ok(())
    }
}

/// A date, a time, and an optional offset from UTC.
#[derive(Debug, Eq, PartialEq, Clone, Copy, Hash)]
pub struct DateTime {
    pub date: Date,
    pub time: Time,
    pub offset: Option<TimeOffset>,
}

impl DateTime {
    pub fn validate(&self) -> bool {
        self.date.validate()
            && self.time.validate()
            && self.offset.map_or(true, |offset| offset.validate())
    }
}

impl Display for DateTime {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}T{}", self.date, self.time)?;
        if let Some(offset) = self.offset {
            write!(f, "{}", offset)?;
        }
        Ok(())
    }
}

/// The host-native projection of a document: plain numbers, strings, dates
/// and containers, with all formatting stripped.
///
/// Produced by `TOMLDocument::unwrap` and `Item::unwrap`.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Integer(i64),
    Float(f64),
    Boolean(bool),
    Str(String),
    Date(Date),
    Time(Time),
    DateTime(DateTime),
    Array(Vec<Value>),
    Table(HashMap<String, Value>),
}

impl Value {
    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Value::Integer(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f64> {
        match self {
            Value::Float(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Boolean(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[Value]> {
        match self {
            Value::Array(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_table(&self) -> Option<&HashMap<String, Value>> {
        match self {
            Value::Table(v) => Some(v),
            _ => None,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_error_position() {
        let err = ParseError::UnexpectedChar { line: 3, col: 7, character: '!' };
        assert_eq!(err.line(), Some(3));
        assert_eq!(err.column(), Some(7));
        assert_eq!(format!("{}", err), "Unexpected character: '!' at line 3 col 7");

        let err = ParseError::NonExistentKey { key: "παράδειγμα".to_string() };
        assert_eq!(err.line(), None);
        assert_eq!(format!("{}", err), "Key \"παράδειγμα\" does not exist");
    }

    #[test]
    fn test_str_type() {
        assert_eq!(StrType::Basic.toggle(), StrType::MLBasic);
        assert_eq!(StrType::Literal.toggle(), StrType::MLLiteral);
        assert_eq!(StrType::MLBasic.delimiter(), "\"\"\"");
        assert!(StrType::MLBasic.is_basic() && StrType::MLBasic.is_multiline());
        assert!(!StrType::Literal.is_basic());
        assert_eq!(StrType::Literal.unit(), '\'');
    }

    #[test]
    fn test_date_validation() {
        assert!(Date { year: 2016, month: 2, day: 29 }.validate());
        assert!(!Date { year: 2015, month: 2, day: 29 }.validate());
        assert!(Date { year: 2000, month: 2, day: 29 }.validate());
        assert!(!Date { year: 1900, month: 2, day: 29 }.validate());
        assert!(!Date { year: 2015, month: 13, day: 1 }.validate());
        assert!(!Date { year: 2015, month: 4, day: 31 }.validate());
        assert!(!Date { year: 2015, month: 1, day: 0 }.validate());
    }

    #[test]
    fn test_time_display() {
        let time = Time { hour: 7, minute: 32, second: 0, microsecond: 0 };
        assert_eq!(format!("{}", time), "07:32:00");
        let time = Time { hour: 7, minute: 32, second: 0, microsecond: 999_900 };
        assert_eq!(format!("{}", time), "07:32:00.999900");
    }

    #[test]
    fn test_offset_validation() {
        let amount = TimeOffsetAmount { pos_neg: PosNeg::Neg, hour: 8, minute: 0 };
        assert!(TimeOffset::Time(amount).validate());
        assert_eq!(format!("{}", TimeOffset::Time(amount)), "-08:00");
        let wrong = TimeOffsetAmount { pos_neg: PosNeg::Pos, hour: 31, minute: 30 };
        assert!(!wrong.validate());
    }

    #[test]
    fn test_datetime_display() {
        let dt = DateTime {
            date: Date { year: 1979, month: 5, day: 27 },
            time: Time { hour: 7, minute: 32, second: 0, microsecond: 0 },
            offset: Some(TimeOffset::Zulu),
        };
        assert_eq!(format!("{}", dt), "1979-05-27T07:32:00Z");
    }

    #[test]
    fn test_nan_value_inequality() {
        let nan = Value::Float(std::f64::NAN);
        assert_ne!(nan, nan.clone());
    }
}
