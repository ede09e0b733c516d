//! Output formatters for tether violations.
//!
//! [`human::HumanFormatter`] renders the full multi-section message,
//! optionally with the offending source lines.

pub mod human;

use tether_core::{BuildError, ContractError};

pub trait OutputFormatter {
    fn format_violation(&self, err: &ContractError) -> String;
    fn format_build_error(&self, err: &BuildError) -> String;

    /// Several violations, e.g. collected by a test run. Empty input gives
    /// empty output.
    fn format_violations(&self, errs: &[ContractError]) -> String {
        errs.iter()
            .map(|e| self.format_violation(e))
            .collect::<Vec<_>>()
            .join("\n")
    }
}
