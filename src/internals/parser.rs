//! The recursive-descent TOML parser.
//!
//! Value recognition is speculative: each reader runs under a cursor
//! savepoint and signals `Backtrack::Restore` to hand the input to the next
//! reader in line. Real grammar violations are `Backtrack::Fatal` and
//! surface to the caller unchanged.

use crate::container::Container;
use crate::document::TOMLDocument;
use crate::internals::chars;
use crate::internals::source::Source;
use crate::items::{AoT, Array, InlineTable, Item, Table, Trivia};
use crate::key::Key;
use crate::types::{
    Date, DateTime, KeyKind, ParseError, PosNeg, StrType, Time, TimeOffset, TimeOffsetAmount,
};

/// The private control-flow signal of the speculative readers. `Restore`
/// unwinds to the nearest savepoint; `Fatal` carries a real error out.
pub(crate) enum Backtrack {
    Restore,
    Fatal(ParseError),
}

impl From<ParseError> for Backtrack {
    fn from(error: ParseError) -> Backtrack {
        Backtrack::Fatal(error)
    }
}

type Speculative<T> = Result<T, Backtrack>;

/// Values may nest (arrays in arrays, inline tables in arrays, ...) only
/// this deep before parsing stops; beyond it the recursion would threaten
/// the call stack.
const MAX_NESTING: usize = 512;

pub struct Parser {
    src: Source,
    aot_stack: Vec<String>,
    depth: usize,
}

impl Parser {
    pub fn new(input: &str) -> Parser {
        Parser { src: Source::new(input), aot_stack: Vec::new(), depth: 0 }
    }

    /// Parses the whole input into a document.
    pub fn parse(mut self) -> Result<TOMLDocument, ParseError> {
        let mut body = Container::new_parsing();

        // Everything before the first table header.
        while !self.src.end() {
            if self.src.current() == '[' {
                break;
            }
            let item = match self.parse_item()? {
                Some(item) => item,
                None => break,
            };
            let (parts, value) = item;
            match parts {
                Some(parts) if parts.len() > 1 => {
                    self.handle_dotted_key(&mut body, &parts, value)?
                },
                Some(mut parts) => {
                    body.append_item(Some(parts.remove(0)), value)?;
                },
                None => {
                    if !merge_ws(&mut body, &value) {
                        body.append_item(None, value)?;
                    }
                },
            }
            self.src.mark();
        }

        // Table and AoT sections.
        while !self.src.end() {
            let (key, value) = self.parse_table(None)?;
            let value = match value {
                Item::Table(table) if table.is_aot_element() => {
                    let name = key.as_string();
                    Item::AoT(self.parse_aot(table, &name)?)
                },
                other => other,
            };
            body.append_item(Some(key), value)?;
        }

        body.set_parsing(false);
        debug!("parsed document with {} top-level keys", body.len());
        Ok(TOMLDocument::from_container(body))
    }

    /// Parses a standalone value expression, requiring the input to be fully
    /// consumed. Backs the `value()` factory.
    pub(crate) fn parse_standalone_value(mut self) -> Result<Item, ParseError> {
        let item = self.parse_value()?;
        if !self.src.end() {
            return Err(self.unexpected_char());
        }
        Ok(item)
    }

    /// Parses a standalone `key = value` expression. Backs the `key_value()`
    /// factory; dotted keys are not accepted here.
    pub(crate) fn parse_standalone_key_value(mut self) -> Result<(Key, Item), ParseError> {
        let (mut parts, item) = self.parse_key_value(true)?;
        if !self.src.end() {
            return Err(self.unexpected_char());
        }
        if parts.len() != 1 {
            return Err(self.unexpected_char());
        }
        Ok((parts.remove(0), item))
    }

    // ----- error helpers ----------------------------------------------

    fn position(&self) -> (usize, usize) {
        self.src.line_col(self.src.idx())
    }

    fn unexpected_char(&self) -> ParseError {
        let (line, col) = self.position();
        ParseError::UnexpectedChar { line, col, character: self.src.current() }
    }

    fn unexpected_eof(&self) -> ParseError {
        let (line, col) = self.position();
        ParseError::UnexpectedEof { line, col }
    }

    fn internal_error(&self, message: &str) -> ParseError {
        let (line, col) = self.position();
        ParseError::InternalParser { line, col, message: message.to_string() }
    }

    // ----- cursor helpers ---------------------------------------------

    /// Runs a speculative reader under a savepoint. `Restore` rewinds the
    /// cursor and yields `None`; success commits; fatal errors propagate.
    fn attempt<T, F>(&mut self, f: F) -> Result<Option<T>, ParseError>
        where F: FnOnce(&mut Parser) -> Speculative<T>
    {
        let state = self.src.state();
        match f(self) {
            Ok(value) => Ok(Some(value)),
            Err(Backtrack::Restore) => {
                self.src.restore(state);
                Ok(None)
            },
            Err(Backtrack::Fatal(error)) => Err(error),
        }
    }

    fn attempt_spec<T, F>(&mut self, f: F) -> Speculative<Option<T>>
        where F: FnOnce(&mut Parser) -> Speculative<T>
    {
        self.attempt(f).map_err(Backtrack::Fatal)
    }

    /// Advances one char; reaching the end of input is a hard error.
    fn inc_req(&mut self) -> Speculative<()> {
        if self.src.inc() {
            Ok(())
        } else {
            Err(Backtrack::Fatal(self.unexpected_eof()))
        }
    }

    /// `consume` with the shortfall mapped to the restorable signal.
    fn consume(&mut self, set: &str, min: usize, max: Option<usize>) -> Speculative<usize> {
        self.src.consume(set, min, max).ok_or(Backtrack::Restore)
    }

    // ----- items -------------------------------------------------------

    /// Parses the next whitespace run, comment line or key/value pair.
    /// Returns `None` when a table header is next; the cursor then rests on
    /// the `[` with the marker at the start of its indentation.
    #[allow(clippy::type_complexity)]
    fn parse_item(&mut self) -> Result<Option<(Option<Vec<Key>>, Item)>, ParseError> {
        self.src.mark();
        let state = self.src.state();
        loop {
            let c = self.src.current();
            if c == '\n' {
                self.src.inc();
                return Ok(Some((None, Item::Whitespace { s: self.src.extract() })));
            } else if c == ' ' || c == '\t' || c == '\r' {
                if !self.src.inc() {
                    return Ok(Some((None, Item::Whitespace { s: self.src.extract() })));
                }
            } else if c == '#' {
                let indent = self.src.extract();
                let (comment_ws, comment, trail) = self.parse_comment_trail()?;
                return Ok(Some((
                    None,
                    Item::Comment { trivia: Trivia::new(indent, comment_ws, comment, trail) },
                )));
            } else if c == '[' {
                return Ok(None);
            } else {
                // Start of a key/value pair; rewind so the whitespace is
                // taken as its indentation.
                self.src.restore(state);
                break;
            }
        }
        let (parts, value) = self.parse_key_value(true)?;
        Ok(Some((Some(parts), value)))
    }

    /// Reads `(comment_ws, comment, trail)` from the cursor to the end of
    /// the line. Both comment fields are empty when there is no comment.
    fn parse_comment_trail(&mut self) -> Result<(String, String, String), ParseError> {
        if self.src.end() {
            return Ok((String::new(), String::new(), String::new()));
        }

        let mut comment = String::new();
        let mut comment_ws = String::new();
        self.src.mark();

        loop {
            let c = self.src.current();
            if c == '\n' {
                break;
            } else if c == '#' {
                comment_ws = self.src.extract();
                self.src.mark();
                self.src.inc(); // Skip #
                while !self.src.end() && !chars::is_nl(self.src.current()) && self.src.inc() {}
                comment = self.src.extract();
                self.src.mark();
                break;
            } else if c == ' ' || c == '\t' || c == '\r' {
                self.src.inc();
            } else {
                return Err(self.unexpected_char());
            }
            if self.src.end() {
                break;
            }
        }

        while chars::is_spaces(self.src.current()) && self.src.inc() {}
        if self.src.current() == '\r' {
            self.src.inc();
        }
        if self.src.current() == '\n' {
            self.src.inc();
        }

        let trail = if self.src.idx() != self.src.marker() || chars::is_ws(self.src.current()) {
            self.src.extract()
        } else {
            String::new()
        };
        Ok((comment_ws, comment, trail))
    }

    /// Parses `key = value`, optionally with its trailing comment. Returns
    /// the key path (more than one part for dotted keys, separator on the
    /// last part) and the value item.
    fn parse_key_value(&mut self, parse_comment: bool) -> Result<(Vec<Key>, Item), ParseError> {
        self.src.mark();
        while chars::is_spaces(self.src.current()) && self.src.inc() {}
        let indent = self.src.extract();

        let mut parts = self.parse_key()?;
        if parts
            .iter()
            .any(|part| part.kind == KeyKind::Bare && part.name().is_empty())
        {
            let (line, col) = self.position();
            return Err(ParseError::EmptyKey { line, col });
        }

        self.src.mark();
        let mut found_equals = self.src.current() == '=';
        while chars::is_kv_sep(self.src.current()) {
            if !self.src.inc() {
                break;
            }
            if self.src.current() == '=' {
                if found_equals {
                    return Err(self.unexpected_char());
                }
                found_equals = true;
            }
        }
        if !found_equals {
            return Err(self.unexpected_char());
        }
        let sep = self.src.extract();
        if let Some(last) = parts.last_mut() {
            last.sep = sep;
        }

        let mut value = self.parse_value()?;

        if parse_comment {
            let (comment_ws, comment, trail) = self.parse_comment_trail()?;
            if let Some(trivia) = value.trivia_mut() {
                trivia.comment_ws = comment_ws;
                trivia.comment = comment;
                trivia.trail = trail;
            }
        } else if let Some(trivia) = value.trivia_mut() {
            trivia.trail = String::new();
        }
        if let Some(trivia) = value.trivia_mut() {
            trivia.indent = indent;
        }

        Ok((parts, value))
    }

    /// Parses a key at the cursor: one or more single keys joined by dots
    /// with optional surrounding whitespace.
    fn parse_key(&mut self) -> Result<Vec<Key>, ParseError> {
        let mut parts = Vec::new();
        loop {
            let key = if self.src.current() == '"' || self.src.current() == '\'' {
                self.parse_quoted_key()?
            } else {
                self.parse_bare_key()?
            };
            parts.push(key);

            let state = self.src.state();
            while chars::is_spaces(self.src.current()) && self.src.inc() {}
            if self.src.current() == '.' {
                self.src.inc();
                while chars::is_spaces(self.src.current()) && self.src.inc() {}
            } else {
                self.src.restore(state);
                break;
            }
        }
        Ok(parts)
    }

    fn parse_bare_key(&mut self) -> Result<Key, ParseError> {
        self.src.mark();
        while chars::is_bare_key_char(self.src.current()) && self.src.inc() {}
        Ok(Key::bare(self.src.extract()))
    }

    fn parse_quoted_key(&mut self) -> Result<Key, ParseError> {
        let quote = self.src.current();
        self.src.inc();
        self.src.mark();
        while self.src.current() != quote {
            if !self.src.inc() {
                return Err(self.unexpected_eof());
            }
        }
        let name = self.src.extract();
        self.src.inc(); // closing quote
        Ok(if quote == '\'' { Key::literal(name) } else { Key::basic(name) })
    }

    /// Materializes the intermediate segments of a dotted assignment as
    /// super-tables and stores the value at the deepest leaf.
    fn handle_dotted_key(
        &self,
        container: &mut Container,
        parts: &[Key],
        value: Item,
    ) -> Result<(), ParseError> {
        if parts.len() == 1 {
            return container.append_item(Some(parts[0].clone()), value);
        }
        let mut first = parts[0].clone();
        first.set_dotted(true);
        first.sep = String::new();

        if !container.contains_key(&first) {
            let table =
                Table::new_super(Container::new_parsing(), Trivia::default(), false);
            container.append_item(Some(first.clone()), Item::Table(table))?;
        }
        match container.get_mut(first.name()) {
            Some(Item::Table(table)) => {
                self.handle_dotted_key(table.container_mut(), &parts[1..], value)
            },
            _ => Err(ParseError::KeyAlreadyPresent { key: first.name().to_string() }),
        }
    }

    // ----- values ------------------------------------------------------

    /// Attempts, under independent savepoints: basic string, literal
    /// string, datetime, date, time, float, integer. Then booleans, arrays
    /// and inline tables, which are unambiguous from their first character.
    fn parse_value(&mut self) -> Result<Item, ParseError> {
        self.depth += 1;
        if self.depth > MAX_NESTING {
            self.depth -= 1;
            return Err(self.internal_error("value nesting exceeds the supported depth"));
        }
        let value = self.parse_value_inner();
        self.depth -= 1;
        value
    }

    fn parse_value_inner(&mut self) -> Result<Item, ParseError> {
        self.src.mark();

        if let Some(item) = self.attempt(|p| p.parse_string(StrType::Basic))? {
            return Ok(item);
        }
        if let Some(item) = self.attempt(|p| p.parse_string(StrType::Literal))? {
            return Ok(item);
        }
        if let Some(item) = self.attempt(Parser::parse_datetime)? {
            return Ok(item);
        }
        if let Some(item) = self.attempt(Parser::parse_date)? {
            return Ok(item);
        }
        if let Some(item) = self.attempt(Parser::parse_time)? {
            return Ok(item);
        }
        if let Some(item) = self.attempt(Parser::parse_float)? {
            return Ok(item);
        }
        if let Some(item) = self.attempt(Parser::parse_integer)? {
            return Ok(item);
        }

        let c = self.src.current();
        if c == 't' && self.src.matches("true") {
            self.src.inc_n(4);
            return Ok(Item::Bool { value: true, trivia: Trivia::default() });
        }
        if c == 'f' && self.src.matches("false") {
            self.src.inc_n(5);
            return Ok(Item::Bool { value: false, trivia: Trivia::default() });
        }
        if c == '[' {
            return self.parse_array();
        }
        if c == '{' {
            return self.parse_inline_table();
        }
        Err(self.unexpected_char())
    }

    fn parse_array(&mut self) -> Result<Item, ParseError> {
        let mut elems: Vec<Item> = Vec::new();
        self.src.inc(); // [

        while self.src.current() != ']' {
            if self.src.end() {
                return Err(self.unexpected_eof());
            }
            self.src.mark();
            while chars::is_ws(self.src.current()) || self.src.current() == ',' {
                if !self.src.inc() {
                    return Err(self.unexpected_eof());
                }
            }
            if self.src.idx() != self.src.marker() {
                elems.push(Item::Whitespace { s: self.src.extract() });
            }
            if self.src.current() == ']' {
                break;
            }
            if self.src.current() == '#' {
                let (comment_ws, comment, trail) = self.parse_comment_trail()?;
                elems.push(Item::Comment {
                    trivia: Trivia::new(String::new(), comment_ws, comment, trail),
                });
            } else {
                elems.push(self.parse_value()?);
            }
        }
        self.src.inc(); // ]

        let array = Array::with_items(elems, Trivia::default());
        if !array.is_homogeneous() {
            let (line, col) = self.position();
            return Err(ParseError::MixedArrayTypes { line, col });
        }
        Ok(Item::Array(array))
    }

    fn parse_inline_table(&mut self) -> Result<Item, ParseError> {
        let mut elems = Container::new_parsing();
        self.src.inc(); // {

        while self.src.current() != '}' {
            if self.src.end() {
                return Err(self.unexpected_eof());
            }
            if chars::is_nl(self.src.current()) {
                return Err(self.unexpected_char());
            }
            self.src.mark();
            let mut commas = 0;
            while chars::is_spaces(self.src.current()) || self.src.current() == ',' {
                if self.src.current() == ',' {
                    commas += 1;
                }
                if !self.src.inc() {
                    return Err(self.unexpected_eof());
                }
            }
            if commas > 1 {
                return Err(self.unexpected_char());
            }
            let has_pairs = elems.last_value_index().is_some();
            if commas == 1 && !has_pairs {
                // Leading comma.
                return Err(self.unexpected_char());
            }
            if self.src.idx() != self.src.marker() {
                elems.append_item(None, Item::Whitespace { s: self.src.extract() })?;
            }
            if self.src.current() == '}' {
                if commas == 1 {
                    // Trailing comma.
                    return Err(self.unexpected_char());
                }
                break;
            }
            if has_pairs && commas == 0 {
                // Two pairs with no comma between them.
                return Err(self.unexpected_char());
            }
            let (parts, value) = self.parse_key_value(false)?;
            if parts.len() > 1 {
                self.handle_dotted_key(&mut elems, &parts, value)?;
            } else {
                let mut parts = parts;
                elems.append_item(Some(parts.remove(0)), value)?;
            }
        }
        self.src.inc(); // }

        Ok(Item::InlineTable(InlineTable::with_container(elems, Trivia::default())))
    }

    // ----- numbers -----------------------------------------------------

    fn get_sign(&mut self) -> Speculative<String> {
        let c = self.src.current();
        if c == '+' || c == '-' {
            // A bare trailing sign is never valid.
            self.inc_req()?;
            return Ok(c.to_string());
        }
        Ok(String::new())
    }

    /// Consumes a leading zero, rejecting `0` followed by another digit.
    fn is_zero(&mut self) -> Speculative<bool> {
        if self.src.current() == '0' {
            self.src.inc();
            if self.src.current().is_ascii_digit() {
                return Err(Backtrack::Restore);
            }
            return Ok(true);
        }
        Ok(false)
    }

    /// Strips underscores, requiring each to sit between two digits of the
    /// active set.
    fn remove_underscores(raw: &str, digits: &str) -> Speculative<String> {
        let cs: Vec<char> = raw.chars().collect();
        let mut clean = String::with_capacity(cs.len());
        for (i, &c) in cs.iter().enumerate() {
            if c != '_' {
                clean.push(c);
                continue;
            }
            let prev_ok = i > 0 && digits.contains(cs[i - 1]);
            let next_ok = i + 1 < cs.len() && digits.contains(cs[i + 1]);
            if !(prev_ok && next_ok) {
                return Err(Backtrack::Restore);
            }
        }
        Ok(clean)
    }

    fn get_base(&mut self, sign: &str, zero: bool) -> Speculative<(u32, &'static str)> {
        let c = self.src.current();
        if zero && (c == 'b' || c == 'o' || c == 'x') {
            if !sign.is_empty() {
                return Err(Backtrack::Restore);
            }
            let (base, digits) = match c {
                'b' => (2, chars::BIN_DIGITS),
                'o' => (8, chars::OCT_DIGITS),
                _ => (16, chars::HEX_DIGITS),
            };
            self.inc_req()?;
            return Ok((base, digits));
        }
        Ok((10, chars::DIGITS))
    }

    fn parse_integer(&mut self) -> Speculative<Item> {
        let sign = self.get_sign()?;
        if !self.src.current().is_ascii_digit() {
            return Err(Backtrack::Restore);
        }
        let mark = self.src.idx();

        let zero = self.is_zero()?;
        let (base, digits) = self.get_base(&sign, zero)?;
        let digits_u = format!("{}_", digits);
        self.consume(&digits_u, if zero { 0 } else { 1 }, None)?;

        let raw = self.src.slice(mark, self.src.idx());
        let clean = Parser::remove_underscores(&raw, digits)?;
        let stripped = if base == 10 {
            clean.as_str()
        } else {
            // Drop the 0b/0o/0x prefix for radix parsing.
            &clean[2..]
        };
        let parsed = if sign == "-" {
            i64::from_str_radix(&format!("-{}", stripped), base)
        } else {
            i64::from_str_radix(stripped, base)
        };
        match parsed {
            Ok(value) => Ok(Item::Integer {
                value,
                raw: format!("{}{}", sign, raw),
                trivia: Trivia::default(),
            }),
            Err(_) => Err(Backtrack::Restore),
        }
    }

    fn parse_special_float(&mut self, word: &str, sign: &str) -> Speculative<Item> {
        let mark = self.src.idx();
        for c in word.chars() {
            self.consume(&c.to_string(), 1, Some(1))?;
        }
        let raw = self.src.slice(mark, self.src.idx());
        let magnitude = if word == "inf" { std::f64::INFINITY } else { std::f64::NAN };
        let value = if sign == "-" { -magnitude } else { magnitude };
        Ok(Item::Float { value, raw: format!("{}{}", sign, raw), trivia: Trivia::default() })
    }

    fn parse_float(&mut self) -> Speculative<Item> {
        let sign = self.get_sign()?;

        let sign_for_inf = sign.clone();
        if let Some(item) =
            self.attempt_spec(move |p| p.parse_special_float("inf", &sign_for_inf))?
        {
            return Ok(item);
        }
        let sign_for_nan = sign.clone();
        if let Some(item) =
            self.attempt_spec(move |p| p.parse_special_float("nan", &sign_for_nan))?
        {
            return Ok(item);
        }

        if !self.src.current().is_ascii_digit() {
            return Err(Backtrack::Restore);
        }
        let mark = self.src.idx();

        let zero = self.is_zero()?;
        let digits_u = "0123456789_";
        self.consume(digits_u, if zero { 0 } else { 1 }, None)?;

        let mut decimal = false;
        let mut exponent = false;
        if self.src.current() == '.' {
            decimal = true;
            self.inc_req()?;
            self.consume(digits_u, 1, None)?;
        }
        if self.src.current() == 'e' || self.src.current() == 'E' {
            exponent = true;
            self.inc_req()?;
            self.get_sign()?;
            self.consume(digits_u, 1, None)?;
        }
        if !decimal && !exponent {
            return Err(Backtrack::Restore);
        }

        let raw = self.src.slice(mark, self.src.idx());
        let clean = Parser::remove_underscores(&raw, chars::DIGITS)?;
        match format!("{}{}", sign, clean).parse::<f64>() {
            Ok(value) => Ok(Item::Float {
                value,
                raw: format!("{}{}", sign, raw),
                trivia: Trivia::default(),
            }),
            Err(_) => Err(Backtrack::Restore),
        }
    }

    // ----- dates and times ---------------------------------------------

    fn get_date(&mut self) -> Speculative<Date> {
        let mark = self.src.idx();
        self.consume(chars::DIGITS, 1, None)?;
        let year = self.src.slice(mark, self.src.idx());

        self.consume("-", 1, Some(1))?;

        let mark = self.src.idx();
        match self.src.current() {
            '0' => {
                self.inc_req()?;
                self.consume("123456789", 1, Some(1))?;
            },
            '1' => {
                self.inc_req()?;
                self.consume("012", 1, Some(1))?;
            },
            _ => return Err(Backtrack::Restore),
        }
        let month = self.src.slice(mark, self.src.idx());

        self.consume("-", 1, Some(1))?;

        let mark = self.src.idx();
        match self.src.current() {
            '0' => {
                self.inc_req()?;
                self.consume("123456789", 1, Some(1))?;
            },
            '1' | '2' => {
                self.inc_req()?;
                self.consume(chars::DIGITS, 1, Some(1))?;
            },
            '3' => {
                self.inc_req()?;
                self.consume("01", 1, Some(1))?;
            },
            _ => return Err(Backtrack::Restore),
        }
        let day = self.src.slice(mark, self.src.idx());

        Ok(Date {
            year: year.parse().map_err(|_| Backtrack::Restore)?,
            month: month.parse().map_err(|_| Backtrack::Restore)?,
            day: day.parse().map_err(|_| Backtrack::Restore)?,
        })
    }

    fn get_time(&mut self) -> Speculative<Time> {
        let mark = self.src.idx();
        match self.src.current() {
            '0' | '1' => {
                self.inc_req()?;
                self.consume(chars::DIGITS, 1, Some(1))?;
            },
            '2' => {
                self.inc_req()?;
                self.consume("0123", 1, Some(1))?;
            },
            _ => return Err(Backtrack::Restore),
        }
        let hour = self.src.slice(mark, self.src.idx());

        self.consume(":", 1, Some(1))?;

        let mark = self.src.idx();
        match self.src.current() {
            '0'..='5' => {
                self.inc_req()?;
                self.consume(chars::DIGITS, 1, Some(1))?;
            },
            _ => return Err(Backtrack::Restore),
        }
        let minute = self.src.slice(mark, self.src.idx());

        self.consume(":", 1, Some(1))?;

        let mark = self.src.idx();
        match self.src.current() {
            '0'..='5' => {
                self.inc_req()?;
                self.consume(chars::DIGITS, 1, Some(1))?;
            },
            '6' => {
                self.inc_req()?;
                self.consume("0", 1, Some(1))?;
            },
            _ => return Err(Backtrack::Restore),
        }
        let second = self.src.slice(mark, self.src.idx());

        // Fractional seconds, truncated (or padded) to microseconds.
        let mut microsecond = 0;
        if self.src.current() == '.' {
            self.inc_req()?;
            let mark = self.src.idx();
            self.consume(chars::DIGITS, 1, None)?;
            let fraction = self.src.slice(mark, self.src.idx());
            let padded = format!("{:0<6}", fraction);
            microsecond = padded[..6].parse().map_err(|_| Backtrack::Restore)?;
        }

        Ok(Time {
            hour: hour.parse().map_err(|_| Backtrack::Restore)?,
            minute: minute.parse().map_err(|_| Backtrack::Restore)?,
            second: second.parse().map_err(|_| Backtrack::Restore)?,
            microsecond,
        })
    }

    fn get_offset(&mut self) -> Speculative<TimeOffset> {
        let pos_neg = if self.src.current() == '-' { PosNeg::Neg } else { PosNeg::Pos };
        self.inc_req()?;

        let mark = self.src.idx();
        match self.src.current() {
            '0' | '1' => {
                self.inc_req()?;
                self.consume(chars::DIGITS, 1, Some(1))?;
            },
            '2' => {
                self.inc_req()?;
                self.consume("0123", 1, Some(1))?;
            },
            _ => return Err(Backtrack::Restore),
        }
        let hour = self.src.slice(mark, self.src.idx());

        self.consume(":", 1, Some(1))?;

        let mark = self.src.idx();
        match self.src.current() {
            '0'..='5' => {
                self.inc_req()?;
                self.consume(chars::DIGITS, 1, Some(1))?;
            },
            _ => return Err(Backtrack::Restore),
        }
        let minute = self.src.slice(mark, self.src.idx());

        Ok(TimeOffset::Time(TimeOffsetAmount {
            pos_neg,
            hour: hour.parse().map_err(|_| Backtrack::Restore)?,
            minute: minute.parse().map_err(|_| Backtrack::Restore)?,
        }))
    }

    fn parse_datetime(&mut self) -> Speculative<Item> {
        let mark = self.src.idx();
        let date = self.get_date()?;
        self.consume("Tt ", 1, Some(1))?;
        let time = self.get_time()?;

        let mut offset = None;
        let c = self.src.current();
        if c == 'Z' || c == 'z' {
            self.src.inc();
            offset = Some(TimeOffset::Zulu);
        } else if c == '+' || c == '-' {
            offset = Some(self.get_offset()?);
        }

        let value = DateTime { date, time, offset };
        if !value.validate() {
            let (line, col) = self.src.line_col(mark);
            return Err(Backtrack::Fatal(ParseError::InvalidDateTime { line, col }));
        }
        let raw = self.src.slice(mark, self.src.idx());
        trace!("datetime {:?}", raw);
        Ok(Item::DateTime { value, raw, trivia: Trivia::default() })
    }

    fn parse_date(&mut self) -> Speculative<Item> {
        let mark = self.src.idx();
        let value = self.get_date()?;
        if !value.validate() {
            let (line, col) = self.src.line_col(mark);
            return Err(Backtrack::Fatal(ParseError::InvalidDate { line, col }));
        }
        let raw = self.src.slice(mark, self.src.idx());
        Ok(Item::Date { value, raw, trivia: Trivia::default() })
    }

    fn parse_time(&mut self) -> Speculative<Item> {
        let mark = self.src.idx();
        let value = self.get_time()?;
        if !value.validate() {
            let (line, col) = self.src.line_col(mark);
            return Err(Backtrack::Fatal(ParseError::InvalidTime { line, col }));
        }
        let raw = self.src.slice(mark, self.src.idx());
        Ok(Item::Time { value, raw, trivia: Trivia::default() })
    }

    // ----- strings -----------------------------------------------------

    fn parse_string(&mut self, mut delim: StrType) -> Speculative<Item> {
        let unit = delim.unit();
        if self.src.current() != unit {
            return Err(Backtrack::Restore);
        }
        self.inc_req()?;

        if self.src.current() == unit {
            if !self.src.inc() || self.src.current() != unit {
                // Empty single-line string.
                return Ok(Item::Str {
                    kind: delim,
                    value: String::new(),
                    original: String::new(),
                    trivia: Trivia::default(),
                });
            }
            self.inc_req()?;
            delim = delim.toggle();
        }

        self.src.mark();
        let mut value = String::new();

        // A newline immediately after the opening multi-line delimiter is
        // trimmed from the value (but kept in the original).
        if delim.is_multiline() && self.src.current() == '\n' {
            self.inc_req()?;
        }

        let mut escaped = false;
        loop {
            let c = self.src.current();
            if !delim.is_multiline() && chars::is_nl(c) {
                return Err(Backtrack::Fatal(self.invalid_char_in_string(c)));
            }
            if self.src.end() {
                return Err(Backtrack::Fatal(self.unexpected_eof()));
            }
            if chars::is_control(c) && !chars::is_nl(c) {
                let (line, col) = self.position();
                return Err(Backtrack::Fatal(ParseError::InvalidControlChar {
                    line,
                    col,
                    character: c,
                }));
            }
            if !escaped && c == unit {
                let original = self.src.extract();
                let mut close = String::new();
                if delim.is_multiline() {
                    for last in [false, false, true].iter() {
                        if self.src.current() != unit {
                            // Not a closing triple; keep the quotes read so
                            // far as content.
                            value.push_str(&close);
                            close.clear();
                            break;
                        }
                        close.push(unit);
                        if *last {
                            self.src.inc();
                        } else {
                            self.inc_req()?;
                        }
                    }
                    if close.is_empty() {
                        continue;
                    }
                } else {
                    self.src.inc();
                }
                return Ok(Item::Str { kind: delim, value, original, trivia: Trivia::default() });
            } else if delim.is_basic() && escaped {
                value.push_str(&self.parse_escaped_char(delim.is_multiline())?);
                escaped = false;
            } else if delim.is_basic() && c == '\\' {
                escaped = true;
                self.inc_req()?;
            } else {
                value.push(c);
                self.inc_req()?;
            }
        }
    }

    fn invalid_char_in_string(&self, character: char) -> ParseError {
        let (line, col) = self.position();
        ParseError::InvalidCharInString { line, col, character }
    }

    fn parse_escaped_char(&mut self, multiline: bool) -> Speculative<String> {
        let c = self.src.current();

        if multiline && chars::is_ws(c) {
            // A backslash ending a line eats all whitespace through the
            // next non-whitespace character.
            let mut eaten = String::new();
            while chars::is_ws(self.src.current()) {
                eaten.push(self.src.current());
                self.inc_req()?;
            }
            if !eaten.contains('\n') {
                return Err(Backtrack::Fatal(
                    self.invalid_char_in_string(self.src.current()),
                ));
            }
            return Ok(String::new());
        }

        let mapped = match c {
            'b' => Some('\u{8}'),
            't' => Some('\t'),
            'n' => Some('\n'),
            'f' => Some('\u{c}'),
            'r' => Some('\r'),
            'e' => Some('\u{1b}'),
            '"' => Some('"'),
            '\\' => Some('\\'),
            _ => None,
        };
        if let Some(mapped) = mapped {
            self.inc_req()?;
            return Ok(mapped.to_string());
        }

        if c == 'u' || c == 'U' {
            if let (Some(decoded), Some(extracted)) = self.peek_unicode(c == 'U')? {
                self.src.inc_n(extracted.chars().count() + 1);
                return Ok(decoded.to_string());
            }
        }

        Err(Backtrack::Fatal(self.invalid_char_in_string(c)))
    }

    /// Looks ahead at a `\uXXXX` / `\UXXXXXXXX` sequence without moving the
    /// cursor. Returns the decoded character and the hex digits when valid.
    fn peek_unicode(&mut self, is_long: bool) -> Speculative<(Option<char>, Option<String>)> {
        let state = self.src.state();
        if self.src.current() != 'u' && self.src.current() != 'U' {
            return Err(Backtrack::Fatal(
                self.internal_error("peek_unicode() entered on a non-unicode escape"),
            ));
        }
        self.src.inc();
        self.src.mark();

        let digits = if is_long { 8 } else { 4 };
        let result = if !self.src.inc_n(digits) && self.src.idx() - self.src.marker() < digits {
            (None, None)
        } else {
            let extracted = self.src.extract();
            let decoded = if extracted.chars().all(|c| c.is_ascii_hexdigit()) {
                u32::from_str_radix(&extracted, 16).ok().and_then(std::char::from_u32)
            } else {
                None
            };
            (decoded, Some(extracted))
        };

        self.src.restore(state);
        Ok(result)
    }

    // ----- tables ------------------------------------------------------

    /// Splits a table header name into its single keys, honoring quoting
    /// and whitespace around the dots.
    fn split_table_name(&self, name: &str) -> Result<Vec<Key>, ParseError> {
        let mut parts: Vec<Key> = Vec::new();
        let mut current = String::new();
        let mut kind = KeyKind::Bare;
        let mut has_current = false;
        let mut in_name = false;
        let mut quote = '"';
        let mut boundary = false;

        for c in name.chars() {
            if in_name {
                if kind == KeyKind::Literal && c == '"' {
                    current.push(c);
                } else if c == quote {
                    in_name = false;
                } else if c == '\'' || c == '"' {
                    current.push(c);
                } else {
                    current.push(c);
                }
                continue;
            }
            match c {
                '.' => {
                    if !has_current {
                        return Err(self.unexpected_char());
                    }
                    parts.push(self.single_key(kind, &current));
                    current.clear();
                    kind = KeyKind::Bare;
                    has_current = false;
                    boundary = false;
                },
                '\'' | '"' => {
                    if has_current {
                        return Err(self.unexpected_char());
                    }
                    in_name = true;
                    quote = c;
                    kind = if c == '\'' { KeyKind::Literal } else { KeyKind::Basic };
                    has_current = true;
                },
                ' ' | '\t' => {
                    if has_current {
                        boundary = true;
                    }
                },
                c if chars::is_bare_key_char(c) => {
                    if boundary {
                        return Err(self.unexpected_char());
                    }
                    current.push(c);
                    has_current = true;
                },
                _ => return Err(self.unexpected_char()),
            }
        }
        if in_name {
            return Err(self.unexpected_eof());
        }
        if has_current {
            parts.push(self.single_key(kind, &current));
        }
        if parts.is_empty() {
            let (line, col) = self.position();
            return Err(ParseError::EmptyTableName { line, col });
        }
        Ok(parts)
    }

    fn single_key(&self, kind: KeyKind, name: &str) -> Key {
        let key = match kind {
            KeyKind::Bare => Key::bare(name),
            KeyKind::Basic => Key::basic(name),
            KeyKind::Literal => Key::literal(name),
        };
        key.with_sep("")
    }

    /// Whether `child` is strictly under `parent`. AoT siblings are not
    /// children of one another.
    fn is_child(&self, parent: &str, child: &str) -> Result<bool, ParseError> {
        let parent_parts = self.split_table_name(parent)?;
        let child_parts = self.split_table_name(child)?;
        if parent_parts == child_parts {
            return Ok(false);
        }
        Ok(child_parts.len() > parent_parts.len()
            && child_parts[..parent_parts.len()] == parent_parts[..])
    }

    /// Parses a `[header]` or `[[header]]` section along with its body and
    /// any child sections.
    fn parse_table(&mut self, parent_name: Option<&str>) -> Result<(Key, Item), ParseError> {
        if self.src.current() != '[' {
            return Err(self.internal_error("parse_table() called on a non-bracket character"));
        }
        let indent = self.src.extract();
        self.src.inc(); // opening bracket
        if self.src.end() {
            return Err(self.unexpected_eof());
        }

        let mut is_aot = false;
        if self.src.current() == '[' {
            if !self.src.inc() {
                return Err(self.unexpected_eof());
            }
            is_aot = true;
        }

        self.src.mark();
        while self.src.current() != ']' {
            if !self.src.inc() {
                return Err(self.unexpected_eof());
            }
        }
        let name = self.src.extract();
        if name.trim().is_empty() {
            let (line, col) = self.position();
            return Err(ParseError::EmptyTableName { line, col });
        }
        debug!("parsing table [{}{}]", if is_aot { "[" } else { "" }, name);

        let name_parts = self.split_table_name(&name)?;
        let parent_len = match parent_name {
            Some(parent) => self.split_table_name(parent)?.len(),
            None => 0,
        };
        let name_parts = name_parts[parent_len.min(name_parts.len())..].to_vec();

        self.src.inc(); // closing bracket
        if is_aot {
            if self.src.current() != ']' {
                return Err(self.unexpected_char());
            }
            self.src.inc();
        }

        let (comment_ws, comment, trail) = self.parse_comment_trail()?;
        let trivia = Trivia::new(indent, comment_ws, comment, trail);

        // Body of this section, plus any child sections that follow it.
        let mut values = Container::new_parsing();
        while !self.src.end() {
            match self.parse_item()? {
                Some((parts, item)) => {
                    if merge_ws(&mut values, &item) {
                        continue;
                    }
                    match parts {
                        Some(parts) if parts.len() > 1 => {
                            self.handle_dotted_key(&mut values, &parts, item)?
                        },
                        Some(mut parts) => {
                            values.append_item(Some(parts.remove(0)), item)?;
                        },
                        None => values.append_item(None, item)?,
                    }
                },
                None => {
                    if self.src.current() != '[' {
                        return Err(self
                            .internal_error("parse_item() returned None off a bracket"));
                    }
                    let (_, name_next) = self.peek_table()?;
                    if self.is_child(&name, &name_next)? {
                        let (key_next, table_next) = self.parse_table(Some(&name))?;
                        values.append_item(Some(key_next), table_next)?;

                        // Pick up any further siblings under this table.
                        while !self.src.end() {
                            let (_, name_next) = self.peek_table()?;
                            if !self.is_child(&name, &name_next)? {
                                break;
                            }
                            let (key_next, table_next) = self.parse_table(Some(&name))?;
                            values.append_item(Some(key_next), table_next)?;
                        }
                    }
                    break;
                },
            }
        }

        if name_parts.len() > 1 {
            // A header like [a.b.c] with undeclared parents: materialize
            // the missing super-tables from the outside in.
            let last = name_parts.len() - 1;
            let leaf_key = name_parts[last].clone();
            let mut leaf = Table::new(values, trivia.clone(), is_aot);
            leaf.set_name(leaf_key.as_string());
            leaf.set_display_name(Some(name.clone()));
            let mut child: Item = if is_aot {
                Item::AoT(AoT::with_tables(vec![leaf], Some(leaf_key.as_string()), true))
            } else {
                Item::Table(leaf)
            };
            let mut child_key = leaf_key;
            for part in name_parts[1..last].iter().rev() {
                let mut container = Container::new_parsing();
                container.append_item(Some(child_key), child)?;
                let mut table = Table::new_super(container, trivia.clone(), false);
                table.set_name(part.as_string());
                child = Item::Table(table);
                child_key = part.clone();
            }
            let mut container = Container::new_parsing();
            container.append_item(Some(child_key), child)?;
            let first = name_parts[0].clone();
            let mut table = Table::new_super(
                container,
                trivia,
                is_aot && self.aot_stack.iter().any(|n| n == first.name()),
            );
            table.set_name(first.as_string());
            return Ok((first, Item::Table(table)));
        }

        let key = name_parts
            .first()
            .cloned()
            .unwrap_or_else(|| Key::bare(name.clone()).with_sep(""));
        let mut table = Table::new(values, trivia, is_aot);
        table.set_name(name.clone());
        table.set_display_name(Some(name.clone()));

        if is_aot && self.aot_stack.last().map(String::as_str) != Some(name.as_str()) {
            let aot = self.parse_aot(table, &name)?;
            return Ok((key, Item::AoT(aot)));
        }
        Ok((key, Item::Table(table)))
    }

    /// Peeks the next table header without moving the cursor. Returns
    /// whether it is an AoT header and its name.
    fn peek_table(&mut self) -> Result<(bool, String), ParseError> {
        let state = self.src.state();
        if self.src.current() != '[' {
            return Err(self.internal_error("peek_table() entered on a non-bracket character"));
        }
        self.src.inc();
        let mut is_aot = false;
        if self.src.current() == '[' {
            self.src.inc();
            is_aot = true;
        }
        self.src.mark();
        let mut table_name = String::new();
        while self.src.current() != ']' && self.src.inc() {
            table_name = self.src.extract();
        }
        self.src.restore(state);
        Ok((is_aot, table_name))
    }

    /// Bundles the contiguous run of `[[name]]` siblings that follows
    /// `first` into an array of tables.
    fn parse_aot(&mut self, first: Table, name_first: &str) -> Result<AoT, ParseError> {
        let mut payload = vec![first];
        self.aot_stack.push(name_first.to_string());
        while !self.src.end() {
            let (is_aot_next, name_next) = self.peek_table()?;
            if !is_aot_next || name_next != name_first {
                break;
            }
            let (_, item) = self.parse_table(Some(name_first))?;
            match item {
                Item::Table(table) => payload.push(table),
                _ => {
                    return Err(
                        self.internal_error("array-of-tables sibling did not parse as a table")
                    )
                },
            }
        }
        self.aot_stack.pop();
        Ok(AoT::with_tables(payload, Some(name_first.to_string()), true))
    }
}

/// Merges a whitespace item into a trailing whitespace slot, keeping runs of
/// blank lines as a single body entry.
fn merge_ws(container: &mut Container, item: &Item) -> bool {
    if let Item::Whitespace { s } = item {
        if let Some((_, last)) = container.body_mut().last_mut() {
            if let Item::Whitespace { s: last_s } = last {
                last_s.push_str(s);
                return true;
            }
        }
    }
    false
}

#[cfg(test)]
mod test {
    use super::*;

    fn parse_str(input: &str) -> TOMLDocument {
        Parser::new(input).parse().unwrap()
    }

    #[test]
    fn test_empty_input() {
        let doc = parse_str("");
        assert_eq!(doc.as_string(), "");
        assert!(doc.is_empty());
    }

    #[test]
    fn test_simple_key_value() {
        let doc = parse_str("a = 1\n");
        assert_eq!(doc.get("a").and_then(Item::as_integer), Some(1));
        assert_eq!(doc.as_string(), "a = 1\n");
    }

    #[test]
    fn test_integer_forms() {
        let doc = parse_str("a = +0\nb = -0\nc = 0\nd = 0x0\ne = 0b0\nf = 0o0\n");
        for key in &["a", "b", "c", "d", "e", "f"] {
            assert_eq!(doc.get(key).and_then(Item::as_integer), Some(0), "key {}", key);
        }
        // Emission preserves the source forms.
        assert_eq!(doc.as_string(), "a = +0\nb = -0\nc = 0\nd = 0x0\ne = 0b0\nf = 0o0\n");
    }

    #[test]
    fn test_integer_bases_and_underscores() {
        let doc = parse_str("hex = 0xDEADbeef\noct = 0o755\nbin = 0b1010\nbig = 5_349_221\n");
        assert_eq!(doc.get("hex").and_then(Item::as_integer), Some(0xDEAD_BEEF));
        assert_eq!(doc.get("oct").and_then(Item::as_integer), Some(0o755));
        assert_eq!(doc.get("bin").and_then(Item::as_integer), Some(10));
        assert_eq!(doc.get("big").and_then(Item::as_integer), Some(5_349_221));
        assert_eq!(doc.get("big").unwrap().as_string(), "5_349_221");
    }

    #[test]
    fn test_bad_underscores_rejected() {
        assert!(Parser::new("a = _1\n").parse().is_err());
        assert!(Parser::new("a = 1_\n").parse().is_err());
        assert!(Parser::new("a = 1__2\n").parse().is_err());
    }

    #[test]
    fn test_leading_zero_rejected() {
        assert!(Parser::new("a = 012\n").parse().is_err());
    }

    #[test]
    fn test_floats() {
        let doc = parse_str("pi = 3.1415\nexp = 5e+22\nboth = 6.626e-34\ninf = inf\nneg = -inf\nnot = nan\n");
        assert_eq!(doc.get("pi").and_then(Item::as_float), Some(3.1415));
        assert_eq!(doc.get("exp").and_then(Item::as_float), Some(5e22));
        assert_eq!(doc.get("both").and_then(Item::as_float), Some(6.626e-34));
        assert_eq!(doc.get("inf").and_then(Item::as_float), Some(std::f64::INFINITY));
        assert_eq!(doc.get("neg").and_then(Item::as_float), Some(std::f64::NEG_INFINITY));
        assert!(doc.get("not").and_then(Item::as_float).unwrap().is_nan());
        assert_eq!(doc.get("exp").unwrap().as_string(), "5e+22");
    }

    #[test]
    fn test_nan_serializes_with_sign() {
        let doc = parse_str("a = nan\nb = -nan\n");
        assert_eq!(doc.as_string(), "a = nan\nb = -nan\n");
    }

    #[test]
    fn test_booleans() {
        let doc = parse_str("yes = true\nno = false\n");
        assert_eq!(doc.get("yes").and_then(Item::as_bool), Some(true));
        assert_eq!(doc.get("no").and_then(Item::as_bool), Some(false));
    }

    #[test]
    fn test_basic_string_escapes() {
        let doc = parse_str(r#"s = "I'm a \"string\". Tab: \t. Uni: \u00E9.""#);
        assert_eq!(
            doc.get("s").and_then(Item::as_str),
            Some("I'm a \"string\". Tab: \t. Uni: é.")
        );
        // Original escapes survive emission.
        assert_eq!(doc.as_string(), r#"s = "I'm a \"string\". Tab: \t. Uni: \u00E9.""#);
    }

    #[test]
    fn test_literal_string() {
        let doc = parse_str("path = 'C:\\Users\\nodejs'\n");
        assert_eq!(doc.get("path").and_then(Item::as_str), Some("C:\\Users\\nodejs"));
    }

    #[test]
    fn test_multiline_basic_string() {
        let doc = parse_str("s = \"\"\"\nRoses are red\nViolets are blue\"\"\"\n");
        assert_eq!(
            doc.get("s").and_then(Item::as_str),
            Some("Roses are red\nViolets are blue")
        );
        assert_eq!(doc.as_string(), "s = \"\"\"\nRoses are red\nViolets are blue\"\"\"\n");
    }

    #[test]
    fn test_multiline_line_ending_backslash() {
        let doc = parse_str("s = \"\"\"\\\n    hello \\\n    world\"\"\"\n");
        assert_eq!(doc.get("s").and_then(Item::as_str), Some("hello world"));
    }

    #[test]
    fn test_two_quotes_before_closing_triple() {
        let doc = parse_str("s = \"\"\"two \"\" quotes\"\"\"\n");
        assert_eq!(doc.get("s").and_then(Item::as_str), Some("two \"\" quotes"));
    }

    #[test]
    fn test_control_char_rejected() {
        let err = Parser::new("a = \"bad\u{1}\"\n").parse().unwrap_err();
        match err {
            ParseError::InvalidControlChar { .. } => {},
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[test]
    fn test_empty_keys_quoted() {
        let doc = parse_str("'' = 1\n");
        assert_eq!(doc.get("").and_then(Item::as_integer), Some(1));
        assert_eq!(doc.as_string(), "'' = 1\n");
        let doc = parse_str("\"\" = 1\n");
        assert_eq!(doc.as_string(), "\"\" = 1\n");
    }

    #[test]
    fn test_bare_empty_key_rejected() {
        let err = Parser::new("= 1\n").parse().unwrap_err();
        match err {
            ParseError::EmptyKey { .. } => {},
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[test]
    fn test_dates_and_times() {
        let doc = parse_str(
            "odt = 1979-05-27T07:32:00Z\nldt = 1979-05-27T00:32:00.999999\nld = 1979-05-27\nlt = 07:32:00\n",
        );
        let odt = doc.get("odt").and_then(Item::as_datetime).unwrap();
        assert_eq!(odt.date, Date { year: 1979, month: 5, day: 27 });
        assert_eq!(odt.offset, Some(TimeOffset::Zulu));
        let ldt = doc.get("ldt").and_then(Item::as_datetime).unwrap();
        assert_eq!(ldt.time.microsecond, 999_999);
        assert_eq!(ldt.offset, None);
        let ld = doc.get("ld").and_then(Item::as_date).unwrap();
        assert_eq!(ld, Date { year: 1979, month: 5, day: 27 });
        let lt = doc.get("lt").and_then(Item::as_time).unwrap();
        assert_eq!(lt, Time { hour: 7, minute: 32, second: 0, microsecond: 0 });
    }

    #[test]
    fn test_datetime_with_offset() {
        let doc = parse_str("dob = 1979-05-27T07:32:00-08:00 # Fïřƨƭ çℓáƨƨ δáƭèƨ\n");
        let dt = doc.get("dob").and_then(Item::as_datetime).unwrap();
        assert_eq!(
            dt.offset,
            Some(TimeOffset::Time(TimeOffsetAmount {
                pos_neg: PosNeg::Neg,
                hour: 8,
                minute: 0,
            }))
        );
        assert_eq!(doc.as_string(), "dob = 1979-05-27T07:32:00-08:00 # Fïřƨƭ çℓáƨƨ δáƭèƨ\n");
    }

    #[test]
    fn test_invalid_date_is_fatal() {
        let err = Parser::new("d = 2021-02-30\n").parse().unwrap_err();
        match err {
            ParseError::InvalidDate { .. } => {},
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[test]
    fn test_arrays_preserve_layout() {
        let input = "data = [ [\"gamma\", \"delta\"], [1, 2] ] # Comment\n";
        let doc = parse_str(input);
        assert_eq!(doc.as_string(), input);
        let data = doc.get("data").and_then(Item::as_array).unwrap();
        assert_eq!(data.len(), 2);
    }

    #[test]
    fn test_multiline_array_with_comments() {
        let input = "hosts = [\n  \"alpha\", # first\n  \"omega\",\n]\n";
        let doc = parse_str(input);
        assert_eq!(doc.as_string(), input);
        let hosts = doc.get("hosts").and_then(Item::as_array).unwrap();
        assert!(hosts.is_multiline());
        assert_eq!(hosts.len(), 2);
    }

    #[test]
    fn test_mixed_array_rejected() {
        let err = Parser::new("a = [5, true]\n").parse().unwrap_err();
        match err {
            ParseError::MixedArrayTypes { .. } => {},
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[test]
    fn test_inline_table_round_trip() {
        let input = "name = { first = \"Tô₥\", last = \"Þřèƨƭôñ\" }\n";
        let doc = parse_str(input);
        assert_eq!(doc.as_string(), input);
        let name = doc.get("name").and_then(Item::as_inline_table).unwrap();
        assert_eq!(name.get("first").and_then(Item::as_str), Some("Tô₥"));
    }

    #[test]
    fn test_inline_table_rejects_newline() {
        assert!(Parser::new("a = { x = 1,\n y = 2 }\n").parse().is_err());
    }

    #[test]
    fn test_inline_table_rejects_bad_commas() {
        assert!(Parser::new("a = { x = 1,, y = 2 }\n").parse().is_err());
        assert!(Parser::new("a = { , x = 1 }\n").parse().is_err());
        assert!(Parser::new("a = { x = 1, }\n").parse().is_err());
        assert!(Parser::new("a = { x = 1 y = 2 }\n").parse().is_err());
    }

    #[test]
    fn test_table_with_indented_entries() {
        let input = "[table] # This is a comment\n  \"Key One\" = \"A Value\" # indented\n    Key2 = 1918-07-02\n";
        let doc = parse_str(input);
        assert_eq!(doc.as_string(), input);
        assert_eq!(
            doc.get_path("table.\"Key One\"").and_then(Item::as_str),
            Some("A Value")
        );
    }

    #[test]
    fn test_dotted_header_creates_supers() {
        let doc = parse_str("[tool.poetry]\nname = \"foo\"\n");
        assert_eq!(
            doc.get_path("tool.poetry.name").and_then(Item::as_str),
            Some("foo")
        );
        assert_eq!(doc.as_string(), "[tool.poetry]\nname = \"foo\"\n");
        let tool = doc.get("tool").and_then(Item::as_table).unwrap();
        assert!(tool.is_super_table());
    }

    #[test]
    fn test_dotted_keys() {
        let input = "physical.color = \"orange\"\nphysical.shape = \"round\"\nsite.\"google.com\" = true\n";
        let doc = parse_str(input);
        assert_eq!(
            doc.get_path("physical.color").and_then(Item::as_str),
            Some("orange")
        );
        assert_eq!(
            doc.get_path("site.\"google.com\"").and_then(Item::as_bool),
            Some(true)
        );
        assert_eq!(doc.as_string(), input);
    }

    #[test]
    fn test_nested_tables() {
        let input = "[servers]\n\n[servers.alpha]\nip = \"10.0.0.1\"\n\n[servers.beta]\nip = \"10.0.0.2\"\n";
        let doc = parse_str(input);
        assert_eq!(doc.as_string(), input);
        assert_eq!(
            doc.get_path("servers.alpha.ip").and_then(Item::as_str),
            Some("10.0.0.1")
        );
        assert_eq!(
            doc.get_path("servers.beta.ip").and_then(Item::as_str),
            Some("10.0.0.2")
        );
    }

    #[test]
    fn test_aot_round_trip() {
        let input = "[[products]]\nname = \"Hammer\"\nsku = 738594937\n\n[[products]]\nname = \"Nail\"\nsku = 284758393\ncolor = \"gray\"\n";
        let doc = parse_str(input);
        assert_eq!(doc.as_string(), input);
        let products = doc.get("products").and_then(Item::as_aot).unwrap();
        assert_eq!(products.len(), 2);
        assert_eq!(
            doc.get_path("products[1].color").and_then(Item::as_str),
            Some("gray")
        );
    }

    #[test]
    fn test_aot_with_nested_tables() {
        let input = "[[fruit]]\nname = \"apple\"\n\n[fruit.physical]\ncolor = \"red\"\n\n[[fruit]]\nname = \"banana\"\n";
        let doc = parse_str(input);
        assert_eq!(doc.as_string(), input);
        assert_eq!(
            doc.get_path("fruit[0].physical.color").and_then(Item::as_str),
            Some("red")
        );
        assert_eq!(
            doc.get_path("fruit[1].name").and_then(Item::as_str),
            Some("banana")
        );
    }

    #[test]
    fn test_out_of_order_tables() {
        let input = "[a.a]\nk = 1\n[a.b]\nv = 2\n[a.a.c]\nw = 3\n";
        let doc = parse_str(input);
        assert_eq!(doc.as_string(), input);
        assert_eq!(doc.get_path("a.a.k").and_then(Item::as_integer), Some(1));
        assert_eq!(doc.get_path("a.b.v").and_then(Item::as_integer), Some(2));
        assert_eq!(doc.get_path("a.a.c.w").and_then(Item::as_integer), Some(3));
    }

    #[test]
    fn test_duplicate_key_rejected() {
        let err = Parser::new("a = 1\na = 2\n").parse().unwrap_err();
        assert_eq!(err, ParseError::KeyAlreadyPresent { key: "a".to_string() });
    }

    #[test]
    fn test_duplicate_table_rejected() {
        assert!(Parser::new("[a]\nx = 1\n[a]\ny = 2\n").parse().is_err());
    }

    #[test]
    fn test_empty_table_name_rejected() {
        let err = Parser::new("[]\n").parse().unwrap_err();
        match err {
            ParseError::EmptyTableName { .. } => {},
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[test]
    fn test_error_position() {
        let err = Parser::new("valid = 1\nbad = !\n").parse().unwrap_err();
        assert_eq!(err.line(), Some(2));
        assert_eq!(err.column(), Some(7));
    }

    #[test]
    fn test_unexpected_eof_in_string() {
        let err = Parser::new("a = \"unterminated").parse().unwrap_err();
        match err {
            ParseError::UnexpectedEof { .. } => {},
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[test]
    fn test_full_document_round_trip() {
        let input = r#"# Tλïƨ ïƨ á TÓM£ δôçú₥èñƭ.

title = "TÓM£ Éжá₥ƥℓè"

[owner]
name = "Tô₥ Þřèƨƭôñ-Wèřñèř"
dob = 1979-05-27T07:32:00-08:00 # Fïřƨƭ çℓáƨƨ δáƭèƨ

[database]
server = "192.168.1.1"
ports = [ 8001, 8001, 8002 ]
connection_max = 5000
enabled = true
"#;
        let doc = parse_str(input);
        assert_eq!(doc.as_string(), input);
        assert_eq!(
            doc.get_path("database.ports[2]").and_then(Item::as_integer),
            Some(8002)
        );
    }

    #[test]
    fn test_reparse_emission_is_stable() {
        let input = "[a.a]\nk = 1\n[a.b]\n[a.a.c]\n";
        let doc = parse_str(input);
        let emitted = doc.as_string();
        let doc2 = parse_str(&emitted);
        assert_eq!(doc, doc2);
        assert_eq!(doc2.as_string(), emitted);
    }

    #[test]
    fn test_crlf_round_trip() {
        let input = "a = 1\r\nb = 2\r\n";
        let doc = parse_str(input);
        assert_eq!(doc.as_string(), input);
    }

    #[test]
    fn test_nesting_depth_is_bounded() {
        let mut input = String::from("a = ");
        for _ in 0..(MAX_NESTING + 8) {
            input.push('[');
        }
        let err = Parser::new(&input).parse().unwrap_err();
        match err {
            ParseError::InternalParser { .. } => {},
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[test]
    fn test_whitespace_only_document() {
        let doc = parse_str("\n\n  \n");
        assert_eq!(doc.as_string(), "\n\n  \n");
        assert!(doc.is_empty());
    }
}
