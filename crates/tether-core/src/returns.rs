//! Return-site table.
//!
//! Instrumented code registers every `return` statement once, receiving a
//! [`ReturnSiteId`], and calls [`ReturnSiteTable::record`] right before the
//! statement runs. When a returned value later fails its declared type, the
//! most recently recorded sites are used to narrow the blame from the whole
//! function to the exact line. A caller takes a [`ReturnMark`] before running
//! a body so that returns recorded by earlier calls are never consulted.

use std::collections::VecDeque;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::location::Location;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ReturnSiteId(pub u32);

/// Position in the stream of recorded returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct ReturnMark(u64);

#[derive(Debug, Default)]
struct ReturnState {
    sites: Vec<Location>,
    recent: VecDeque<(u64, ReturnSiteId)>,
    recorded: u64,
}

/// Process-wide id-to-location mapping plus the recent-return window.
#[derive(Debug)]
pub struct ReturnSiteTable {
    state: Mutex<ReturnState>,
    lookback: usize,
}

impl Default for ReturnSiteTable {
    fn default() -> Self {
        Self::new(2)
    }
}

impl ReturnSiteTable {
    /// `lookback` is how many recorded returns are consulted; at least one.
    pub fn new(lookback: usize) -> Self {
        Self {
            state: Mutex::new(ReturnState::default()),
            lookback: lookback.max(1),
        }
    }

    pub fn lookback(&self) -> usize {
        self.lookback
    }

    /// Assign an id to the return statement at `(file, line)`.
    pub fn register(&self, file: &str, line: u32) -> ReturnSiteId {
        let mut state = self.state.lock();
        let id = ReturnSiteId(state.sites.len() as u32);
        state.sites.push(Location::at(file, line));
        tracing::debug!(id = id.0, file, line, "registered return site");
        id
    }

    /// Note that the statement `id` is about to return.
    pub fn record(&self, id: ReturnSiteId) {
        let mut state = self.state.lock();
        state.recorded += 1;
        let seq = state.recorded;
        state.recent.push_front((seq, id));
        state.recent.truncate(self.lookback);
    }

    /// The current position; returns recorded from now on come after it.
    pub fn mark(&self) -> ReturnMark {
        ReturnMark(self.state.lock().recorded)
    }

    pub fn site(&self, id: ReturnSiteId) -> Option<Location> {
        self.state.lock().sites.get(id.0 as usize).cloned()
    }

    /// Recently recorded sites, most recent first.
    pub fn recent(&self) -> Vec<Location> {
        self.recent_since(ReturnMark(0))
    }

    /// Recent sites recorded after `mark`, most recent first.
    pub fn recent_since(&self, mark: ReturnMark) -> Vec<Location> {
        let state = self.state.lock();
        state
            .recent
            .iter()
            .take_while(|(seq, _)| *seq > mark.0)
            .filter_map(|(_, id)| state.sites.get(id.0 as usize).cloned())
            .collect()
    }

    /// Narrow `declared` (a function's span) to a return inside it that was
    /// recorded after `since`. Falls back to `declared` when that call left
    /// the function without a recorded return.
    pub fn narrow(&self, declared: &Location, since: ReturnMark) -> Location {
        narrow_to_recent(declared, &self.recent_since(since))
    }
}

/// Narrow `declared` to the first of `recent` that lies inside its span.
pub fn narrow_to_recent(declared: &Location, recent: &[Location]) -> Location {
    recent
        .iter()
        .find(|site| declared.contains(&site.file, site.line))
        .map(|site| declared.narrow_in_span(site))
        .unwrap_or_else(|| declared.clone())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_assigns_increasing_ids() {
        let table = ReturnSiteTable::default();
        let a = table.register("m.py", 3);
        let b = table.register("m.py", 5);
        assert_eq!(a, ReturnSiteId(0));
        assert_eq!(b, ReturnSiteId(1));
        assert_eq!(table.site(b), Some(Location::at("m.py", 5)));
        assert_eq!(table.site(ReturnSiteId(9)), None);
    }

    #[test]
    fn test_recent_is_bounded_by_lookback() {
        let table = ReturnSiteTable::new(2);
        let ids: Vec<_> = (1..=3).map(|l| table.register("m.py", l)).collect();
        for id in &ids {
            table.record(*id);
        }
        assert_eq!(
            table.recent(),
            vec![Location::at("m.py", 3), Location::at("m.py", 2)]
        );
    }

    #[test]
    fn test_zero_lookback_is_clamped() {
        assert_eq!(ReturnSiteTable::new(0).lookback(), 1);
    }

    #[test]
    fn test_narrow_picks_return_inside_function() {
        let table = ReturnSiteTable::new(2);
        let inner = table.register("m.py", 12);
        let outer = table.register("other.py", 40);
        table.record(inner);
        table.record(outer);
        let declared = Location::new("m.py", 10, 5);
        assert_eq!(table.narrow(&declared, ReturnMark(0)).line, 12);
    }

    #[test]
    fn test_narrow_outside_window_keeps_declaration() {
        let table = ReturnSiteTable::new(1);
        let inner = table.register("m.py", 12);
        let outer = table.register("other.py", 40);
        table.record(inner);
        table.record(outer);
        let declared = Location::new("m.py", 10, 5);
        assert_eq!(table.narrow(&declared, ReturnMark(0)).line, 10);
    }

    #[test]
    fn test_narrow_ignores_returns_before_mark() {
        let table = ReturnSiteTable::new(2);
        let inner = table.register("m.py", 12);
        table.record(inner);
        let mark = table.mark();
        let declared = Location::new("m.py", 10, 5);
        assert_eq!(table.narrow(&declared, mark).line, 10);
        assert!(table.recent_since(mark).is_empty());

        table.record(inner);
        assert_eq!(table.narrow(&declared, mark).line, 12);
        assert_eq!(table.recent().len(), 2);
    }
}
