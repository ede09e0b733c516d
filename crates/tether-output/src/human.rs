use std::sync::Arc;

use tether_core::error::RenderOptions;
use tether_core::source::SourceCache;
use tether_core::{BuildError, ContractError};

use crate::OutputFormatter;

/// The full message as a developer reads it in a terminal or test log.
#[derive(Debug, Default, Clone)]
pub struct HumanFormatter {
    options: RenderOptions,
    sources: Option<Arc<SourceCache>>,
}

impl HumanFormatter {
    pub fn new(options: RenderOptions) -> Self {
        Self {
            options,
            sources: None,
        }
    }

    /// Show the code next to each location, read through `sources`.
    pub fn with_sources(mut self, sources: Arc<SourceCache>) -> Self {
        self.sources = Some(sources);
        self
    }
}

impl OutputFormatter for HumanFormatter {
    fn format_violation(&self, err: &ContractError) -> String {
        let mut out = err.render_with(&self.options, self.sources.as_deref());
        out.push('\n');
        out
    }

    fn format_build_error(&self, err: &BuildError) -> String {
        format!("error: {err}\n")
    }

    fn format_violations(&self, errs: &[ContractError]) -> String {
        if errs.is_empty() {
            return String::new();
        }
        let mut out = String::new();
        for err in errs {
            out.push_str(&self.format_violation(err));
            out.push('\n');
        }
        let files: std::collections::BTreeSet<&str> = errs
            .iter()
            .filter_map(|e| e.blamed())
            .map(|l| l.file.as_str())
            .collect();
        out.push_str(&format!(
            "{} violation(s) in {} file(s)\n",
            errs.len(),
            files.len()
        ));
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tether_core::{BuildErrorKind, Frame, Location};

    fn violation(file: &str, line: u32) -> ContractError {
        ContractError::new(Some("'x'".to_string()), "int").with_frame(Frame::new(
            "list[int]".to_string(),
            Some("     ^^^ ".to_string()),
            Some(Location::at(file, 1)),
            Some(Location::at(file, line)),
        ))
    }

    #[test]
    fn test_violation_ends_with_newline() {
        let out = HumanFormatter::default().format_violation(&violation("app.py", 4));
        assert!(out.starts_with("got value of wrong type"));
        assert!(out.contains("given:    'x'"));
        assert!(out.ends_with("caused by: app.py:4\n"));
    }

    #[test]
    fn test_source_lines_shown() {
        let sources = Arc::new(SourceCache::new());
        sources.insert("app.py", "xs: list[int] = load()\nprint(xs)\nys = 1\nxs[2] + 1\n");
        let fmt = HumanFormatter::default().with_sources(sources);
        let out = fmt.format_violation(&violation("app.py", 4));
        assert!(out.contains("caused by: app.py:4\n  | xs[2] + 1"));
        assert!(out.contains("declared at: app.py:1\n  | xs: list[int] = load()"));
    }

    #[test]
    fn test_source_lines_can_be_disabled() {
        let sources = Arc::new(SourceCache::new());
        sources.insert("app.py", "a\nb\nc\nd\n");
        let fmt = HumanFormatter::new(RenderOptions {
            show_source: false,
            max_given_chars: 200,
        })
        .with_sources(sources);
        let out = fmt.format_violation(&violation("app.py", 4));
        assert!(!out.contains("  | "));
    }

    #[test]
    fn test_summary_counts_files() {
        let errs = vec![
            violation("a.py", 2),
            violation("a.py", 3),
            violation("b.py", 2),
        ];
        let out = HumanFormatter::default().format_violations(&errs);
        assert!(out.ends_with("3 violation(s) in 2 file(s)\n"));
        assert!(HumanFormatter::default().format_violations(&[]).is_empty());
    }

    #[test]
    fn test_build_error() {
        let err = BuildError::new(BuildErrorKind::UnresolvedName("Node".to_string()))
            .with_location(Location::at("graph.py", 3));
        let out = HumanFormatter::default().format_build_error(&err);
        assert_eq!(out, "error: unresolved name 'Node'\n\ndeclared at: graph.py:3\n");
    }
}
