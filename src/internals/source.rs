//! The character cursor the parser drives. Tracks an index and a marker into
//! a decoded code-point buffer, hands out savepoints for speculative reads,
//! and derives line/column positions on demand.

/// Sentinel returned by `current` once the input is exhausted.
pub const EOF: char = '\0';

/// A snapshot of the cursor, restorable after failed speculation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct State {
    idx: usize,
    marker: usize,
}

#[derive(Debug, Clone)]
pub struct Source {
    chars: Vec<char>,
    idx: usize,
    marker: usize,
}

impl Source {
    pub fn new(input: &str) -> Source {
        Source { chars: input.chars().collect(), idx: 0, marker: 0 }
    }

    /// The character under the cursor, or `EOF` past the end.
    pub fn current(&self) -> char {
        self.chars.get(self.idx).copied().unwrap_or(EOF)
    }

    pub fn idx(&self) -> usize {
        self.idx
    }

    pub fn end(&self) -> bool {
        self.idx >= self.chars.len()
    }

    /// Advances one code point. Returns false once the end is reached.
    pub fn inc(&mut self) -> bool {
        if self.idx < self.chars.len() {
            self.idx += 1;
        }
        !self.end()
    }

    /// Advances `n` code points, stopping at the end.
    pub fn inc_n(&mut self, n: usize) -> bool {
        for _ in 0..n {
            if !self.inc() {
                return false;
            }
        }
        true
    }

    /// Sets the marker to the cursor position.
    pub fn mark(&mut self) {
        self.marker = self.idx;
    }

    pub fn marker(&self) -> usize {
        self.marker
    }

    /// The text between the marker and the cursor.
    pub fn extract(&self) -> String {
        self.slice(self.marker, self.idx)
    }

    pub fn slice(&self, from: usize, to: usize) -> String {
        self.chars[from.min(self.chars.len())..to.min(self.chars.len())]
            .iter()
            .collect()
    }

    /// Whether the input at the cursor starts with `expected`.
    pub fn matches(&self, expected: &str) -> bool {
        let mut idx = self.idx;
        for c in expected.chars() {
            if self.chars.get(idx) != Some(&c) {
                return false;
            }
            idx += 1;
        }
        true
    }

    /// Captures `(idx, marker)` for later restoration.
    pub fn state(&self) -> State {
        State { idx: self.idx, marker: self.marker }
    }

    pub fn restore(&mut self, state: State) {
        self.idx = state.idx;
        self.marker = state.marker;
    }

    /// Advances while the current character is in `set`, consuming at most
    /// `max` characters (unbounded when `None`). Returns the count consumed,
    /// or `None` when fewer than `min` characters matched; the cursor is not
    /// rewound on failure, the enclosing savepoint handles that.
    pub fn consume(&mut self, set: &str, min: usize, max: Option<usize>) -> Option<usize> {
        let mut count = 0;
        loop {
            if let Some(max) = max {
                if count >= max {
                    break;
                }
            }
            if self.end() || !set.contains(self.current()) {
                break;
            }
            self.inc();
            count += 1;
        }
        if count < min {
            return None;
        }
        Some(count)
    }

    /// Derives the 1-based line and column of `idx` by counting newlines.
    pub fn line_col(&self, idx: usize) -> (usize, usize) {
        let idx = idx.min(self.chars.len());
        let mut line = 1;
        let mut col = 1;
        for &c in &self.chars[..idx] {
            if c == '\n' {
                line += 1;
                col = 1;
            } else {
                col += 1;
            }
        }
        (line, col)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_mark_and_extract() {
        let mut src = Source::new("key = value");
        src.mark();
        src.inc_n(3);
        assert_eq!(src.extract(), "key");
        assert_eq!(src.current(), ' ');
    }

    #[test]
    fn test_eof_behavior() {
        let mut src = Source::new("ab");
        assert!(src.inc());
        assert!(!src.inc());
        assert!(src.end());
        assert_eq!(src.current(), EOF);
        assert!(!src.inc());
    }

    #[test]
    fn test_state_restore() {
        let mut src = Source::new("1979-05-27");
        src.mark();
        let state = src.state();
        src.inc_n(4);
        src.mark();
        assert_eq!(src.idx(), 4);
        src.restore(state);
        assert_eq!(src.idx(), 0);
        assert_eq!(src.marker(), 0);
    }

    #[test]
    fn test_consume_bounds() {
        let mut src = Source::new("12345abc");
        assert_eq!(src.consume("0123456789", 1, Some(3)), Some(3));
        assert_eq!(src.idx(), 3);
        assert_eq!(src.consume("0123456789", 1, None), Some(2));
        assert_eq!(src.consume("0123456789", 1, None), None);
        assert_eq!(src.current(), 'a');
    }

    #[test]
    fn test_multibyte_code_points() {
        let mut src = Source::new("δôçú₥èñƭ");
        src.mark();
        src.inc_n(3);
        assert_eq!(src.extract(), "δôç");
        assert_eq!(src.line_col(src.idx()), (1, 4));
    }

    #[test]
    fn test_line_col() {
        let src = Source::new("a = 1\nb = 2\nc = 3");
        assert_eq!(src.line_col(0), (1, 1));
        assert_eq!(src.line_col(6), (2, 1));
        assert_eq!(src.line_col(10), (2, 5));
    }

    #[test]
    fn test_matches() {
        let mut src = Source::new("true]");
        assert!(src.matches("true"));
        assert!(!src.matches("true]x"));
        src.inc();
        assert!(src.matches("rue"));
    }
}
