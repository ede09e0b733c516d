use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::location::Location;

/// Source lines used to show code next to rendered locations.
///
/// Files are either registered up front with [`SourceCache::insert`] or read
/// from disk on first use. Unreadable files are remembered as empty.
#[derive(Debug, Default)]
pub struct SourceCache {
    files: Mutex<HashMap<String, Arc<Vec<String>>>>,
}

impl SourceCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, file: impl Into<String>, text: &str) {
        let lines = text.lines().map(str::to_string).collect();
        self.files.lock().insert(file.into(), Arc::new(lines));
    }

    fn lines(&self, file: &str) -> Arc<Vec<String>> {
        let mut files = self.files.lock();
        files
            .entry(file.to_string())
            .or_insert_with(|| {
                let text = std::fs::read_to_string(file).unwrap_or_default();
                Arc::new(text.lines().map(str::to_string).collect())
            })
            .clone()
    }

    /// The 1-based `line` of `file`, without surrounding whitespace.
    pub fn line(&self, file: &str, line: u32) -> Option<String> {
        if line == 0 {
            return None;
        }
        self.lines(file)
            .get(line as usize - 1)
            .map(|l| l.trim().to_string())
    }

    /// `file:line` followed by the code on that line, when known.
    pub fn format_with_code(&self, loc: &Location) -> String {
        match self.line(&loc.file, loc.line) {
            Some(code) if !code.is_empty() => format!("{loc}\n  | {code}"),
            _ => loc.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_inserted_lines() {
        let cache = SourceCache::new();
        cache.insert("m.py", "def f():\n    return 1\n");
        assert_eq!(cache.line("m.py", 2).as_deref(), Some("return 1"));
        assert_eq!(cache.line("m.py", 3), None);
        assert_eq!(cache.line("m.py", 0), None);
    }

    #[test]
    fn test_format_with_code() {
        let cache = SourceCache::new();
        cache.insert("m.py", "x = f(1)\n");
        assert_eq!(
            cache.format_with_code(&Location::at("m.py", 1)),
            "m.py:1\n  | x = f(1)"
        );
        assert_eq!(cache.format_with_code(&Location::at("m.py", 7)), "m.py:7");
    }

    #[test]
    fn test_reads_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mod.py");
        std::fs::write(&path, "a = 1\nb = 2\n").unwrap();
        let cache = SourceCache::new();
        let file = path.to_string_lossy().to_string();
        assert_eq!(cache.line(&file, 2).as_deref(), Some("b = 2"));
    }

    #[test]
    fn test_missing_file_has_no_lines() {
        let cache = SourceCache::new();
        assert_eq!(cache.line("/nonexistent/file.py", 1), None);
    }
}
