use std::fmt;
use std::rc::Rc;

/// Byte range inside a source file.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn union(self, other: Span) -> Span {
        Span {
            start: self.start.min(other.start),
            end: self.end.max(other.end),
        }
    }
}

/// Line is 1-based, column 0-based.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord)]
pub struct Position {
    pub line: usize,
    pub column: usize,
}

impl Position {
    pub fn new(line: usize, column: usize) -> Self {
        Self { line, column }
    }
}

/// Human-facing source range attached to every token, AST node and runtime error.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Location {
    pub file: Rc<str>,
    pub start: Position,
    pub end: Position,
    pub span: Span,
}

impl Location {
    pub fn new(file: Rc<str>, start: Position, end: Position, span: Span) -> Self {
        Self {
            file,
            start,
            end,
            span,
        }
    }

    /// Location used for values produced by native code.
    pub fn internal() -> Self {
        Self {
            file: Rc::from("(internal)"),
            start: Position::new(1, 0),
            end: Position::new(1, 0),
            span: Span::default(),
        }
    }

    pub fn union(&self, other: &Location) -> Location {
        Location {
            file: self.file.clone(),
            start: self.start.min(other.start),
            end: self.end.max(other.end),
            span: self.span.union(other.span),
        }
    }

    pub fn until(&self, other: &Location) -> Location {
        Location {
            file: self.file.clone(),
            start: self.start,
            end: other.end,
            span: Span::new(self.span.start, other.span.end),
        }
    }
}

impl Default for Location {
    fn default() -> Self {
        Self::internal()
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.start.line == self.end.line {
            write!(f, "{}({},{}", self.file, self.start.line, self.start.column)?;
            if self.start.column != self.end.column {
                write!(f, "-{}", self.end.column)?;
            }
            write!(f, ")")
        } else {
            // the end line is repeated where an end column would go
            write!(
                f,
                "{}({},{},{},{})",
                self.file, self.start.line, self.start.column, self.end.line, self.end.line
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn loc(l1: usize, c1: usize, l2: usize, c2: usize) -> Location {
        Location::new(
            Rc::from("main.brs"),
            Position::new(l1, c1),
            Position::new(l2, c2),
            Span::default(),
        )
    }

    #[test]
    fn single_line_locations_show_column_range() {
        assert_eq!(loc(3, 4, 3, 9).to_string(), "main.brs(3,4-9)");
        assert_eq!(loc(3, 4, 3, 4).to_string(), "main.brs(3,4)");
    }

    #[test]
    fn multi_line_locations_repeat_end_line() {
        assert_eq!(loc(1, 2, 5, 7).to_string(), "main.brs(1,2,5,5)");
    }

    #[test]
    fn union_covers_both_ranges() {
        let merged = loc(2, 5, 2, 8).union(&loc(1, 0, 1, 3));
        assert_eq!(merged.start, Position::new(1, 0));
        assert_eq!(merged.end, Position::new(2, 8));
    }
}
