use std::fmt;
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

/// Where something is declared or where something happened.
///
/// Equality and hashing only look at `(file, line)`; the span records how many
/// lines a declaration covers so a single line inside it can be picked later.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Location {
    pub file: String,
    pub line: u32,
    #[serde(default = "default_span")]
    pub span: u32,
}

fn default_span() -> u32 {
    1
}

impl Location {
    pub fn new(file: impl Into<String>, line: u32, span: u32) -> Self {
        Self {
            file: file.into(),
            line,
            span: span.max(1),
        }
    }

    /// A single-line location.
    pub fn at(file: impl Into<String>, line: u32) -> Self {
        Self::new(file, line, 1)
    }

    /// Whether `(file, line)` falls inside the recorded span.
    pub fn contains(&self, file: &str, line: u32) -> bool {
        self.file == file && line >= self.line && line < self.line + self.span
    }

    /// Narrow to a single line if `site` lies inside this span, else keep `self`.
    pub fn narrow_in_span(&self, site: &Location) -> Location {
        if self.contains(&site.file, site.line) {
            Location::at(site.file.clone(), site.line)
        } else {
            self.clone()
        }
    }
}

impl PartialEq for Location {
    fn eq(&self, other: &Self) -> bool {
        self.file == other.file && self.line == other.line
    }
}

impl Eq for Location {}

impl Hash for Location {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.file.hash(state);
        self.line.hash(state);
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.file, self.line)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_equality_ignores_span() {
        assert_eq!(Location::new("a.py", 3, 10), Location::at("a.py", 3));
        assert_ne!(Location::at("a.py", 3), Location::at("b.py", 3));
    }

    #[test]
    fn test_narrow_inside_span() {
        let decl = Location::new("lib.py", 10, 5);
        let narrowed = decl.narrow_in_span(&Location::at("lib.py", 13));
        assert_eq!(narrowed.line, 13);
        assert_eq!(narrowed.span, 1);
    }

    #[test]
    fn test_narrow_outside_span_keeps_declaration() {
        let decl = Location::new("lib.py", 10, 5);
        assert_eq!(decl.narrow_in_span(&Location::at("lib.py", 15)).line, 10);
        assert_eq!(decl.narrow_in_span(&Location::at("other.py", 12)).line, 10);
    }

    #[test]
    fn test_zero_span_is_clamped() {
        assert_eq!(Location::new("a.py", 1, 0).span, 1);
    }

    #[test]
    fn test_display() {
        assert_eq!(Location::at("src/main.py", 42).to_string(), "src/main.py:42");
    }
}
