//! Core position and diagnostic types.
//!
//! These types are designed to be:
//! - Transport-agnostic (no LSP protocol dependencies)
//! - Easily serializable to JSON (analyzer wire format, tests)
//! - Easily convertible to `lsp-types` (in the server crate)
//!
//! Lines are 1-based and characters are 0-based throughout, matching
//! the coordinates the external analyzer reports. The conversion to
//! LSP's 0-based lines lives in the server crate.

use serde::{Deserialize, Serialize};

/// A position in a source file: 1-based line, 0-based character offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub struct Position {
    /// One-based line number.
    pub line: u32,
    /// Zero-based character offset within the line.
    pub character: u32,
}

impl Position {
    /// Create a new position.
    pub fn new(line: u32, character: u32) -> Self {
        Self { line, character }
    }
}

impl PartialOrd for Position {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Position {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        match self.line.cmp(&other.line) {
            std::cmp::Ordering::Equal => self.character.cmp(&other.character),
            ord => ord,
        }
    }
}

/// A range in a source file, expressed as start and end positions.
///
/// The end character is treated as *inclusive* by [`Range::contains`]:
/// clicking exactly at a token's trailing edge still resolves to the
/// token. This differs from LSP's exclusive-end convention on purpose.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub struct Range {
    /// The range's start position.
    pub start: Position,
    /// The range's end position (end character inclusive for hit tests).
    pub end: Position,
}

impl Range {
    /// Create a new range.
    pub fn new(start: Position, end: Position) -> Self {
        Self { start, end }
    }

    /// Create a range spanning a single position (zero-width).
    pub fn point(pos: Position) -> Self {
        Self {
            start: pos,
            end: pos,
        }
    }

    /// Check if this range contains a position.
    ///
    /// The line must lie within `[start.line, end.line]`; on the start
    /// line the character must be `>= start.character`, and on the end
    /// line the character must be `<= end.character` (inclusive).
    pub fn contains(&self, pos: Position) -> bool {
        if pos.line < self.start.line || pos.line > self.end.line {
            return false;
        }
        if pos.line == self.start.line && pos.character < self.start.character {
            return false;
        }
        if pos.line == self.end.line && pos.character > self.end.character {
            return false;
        }
        true
    }

    /// Grow this range to also cover `other` (min of starts, max of ends).
    pub fn expand_to(&mut self, other: Range) {
        if other.start < self.start {
            self.start = other.start;
        }
        if other.end > self.end {
            self.end = other.end;
        }
    }
}

/// Diagnostic severity levels, matching LSP DiagnosticSeverity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiagnosticSeverity {
    /// Reports an error.
    Error = 1,
    /// Reports a warning.
    Warning = 2,
    /// Reports an information.
    Information = 3,
    /// Reports a hint.
    Hint = 4,
}

/// A positioned message about analyzed source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    /// One-based line the diagnostic applies to.
    pub line: u32,
    /// Zero-based character offset within the line.
    pub character: u32,
    /// The diagnostic's message.
    pub message: String,
    /// The diagnostic's severity.
    pub severity: DiagnosticSeverity,
}

impl Diagnostic {
    /// Create a new diagnostic.
    pub fn new(
        line: u32,
        character: u32,
        severity: DiagnosticSeverity,
        message: impl Into<String>,
    ) -> Self {
        Self {
            line,
            character,
            message: message.into(),
            severity,
        }
    }

    /// Create an error diagnostic.
    pub fn error(line: u32, character: u32, message: impl Into<String>) -> Self {
        Self::new(line, character, DiagnosticSeverity::Error, message)
    }

    /// Create a warning diagnostic.
    pub fn warning(line: u32, character: u32, message: impl Into<String>) -> Self {
        Self::new(line, character, DiagnosticSeverity::Warning, message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn position_ordering() {
        let p1 = Position::new(1, 5);
        let p2 = Position::new(1, 10);
        let p3 = Position::new(2, 0);

        assert!(p1 < p2);
        assert!(p2 < p3);
        assert!(p1 < p3);
    }

    #[test]
    fn range_contains_inclusive_end() {
        let range = Range::new(Position::new(3, 4), Position::new(3, 10));

        assert!(range.contains(Position::new(3, 4)));
        assert!(range.contains(Position::new(3, 7)));
        // End character is inclusive: the trailing edge still resolves.
        assert!(range.contains(Position::new(3, 10)));
        assert!(!range.contains(Position::new(3, 11)));
        assert!(!range.contains(Position::new(3, 3)));
        assert!(!range.contains(Position::new(2, 7)));
        assert!(!range.contains(Position::new(4, 0)));
    }

    #[test]
    fn range_contains_multiline() {
        let range = Range::new(Position::new(2, 5), Position::new(4, 3));

        // Interior lines match regardless of character.
        assert!(range.contains(Position::new(3, 0)));
        assert!(range.contains(Position::new(3, 999)));
        // Boundary lines respect the character bounds.
        assert!(range.contains(Position::new(2, 5)));
        assert!(!range.contains(Position::new(2, 4)));
        assert!(range.contains(Position::new(4, 3)));
        assert!(!range.contains(Position::new(4, 4)));
    }

    #[test]
    fn range_expand_to() {
        let mut range = Range::new(Position::new(3, 0), Position::new(3, 8));
        range.expand_to(Range::new(Position::new(5, 0), Position::new(6, 2)));
        assert_eq!(range.start, Position::new(3, 0));
        assert_eq!(range.end, Position::new(6, 2));

        range.expand_to(Range::new(Position::new(1, 4), Position::new(2, 0)));
        assert_eq!(range.start, Position::new(1, 4));
        assert_eq!(range.end, Position::new(6, 2));
    }

    #[test]
    fn diagnostic_serialization() {
        let diag = Diagnostic::error(1, 0, "syntax error");
        let json = serde_json::to_string(&diag).unwrap();
        assert!(json.contains("\"severity\":\"error\""));
        assert!(json.contains("\"line\":1"));
    }
}
