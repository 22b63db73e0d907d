//! Search-driven visibility over the session log.

use crate::types::LogEntry;

/// Case-insensitive substring predicate over [`LogEntry::raw_message`].
/// An empty term matches every entry.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LogFilter {
    term: String,
}

impl LogFilter {
    pub fn new(term: &str) -> Self {
        Self {
            term: term.trim().to_lowercase(),
        }
    }

    pub fn term(&self) -> &str {
        &self.term
    }

    pub fn is_empty(&self) -> bool {
        self.term.is_empty()
    }

    pub fn matches(&self, entry: &LogEntry) -> bool {
        self.matches_text(&entry.raw_message)
    }

    pub fn matches_text(&self, text: &str) -> bool {
        self.term.is_empty() || text.to_lowercase().contains(&self.term)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Verdict;
    use chrono::Utc;

    fn entry(raw: &str) -> LogEntry {
        LogEntry {
            raw_message: raw.to_string(),
            received_at: Utc::now(),
            matched_function: None,
            verdict: Verdict::Info,
            counted: false,
        }
    }

    #[test]
    fn empty_term_matches_everything() {
        let filter = LogFilter::new("   ");
        assert!(filter.is_empty());
        assert!(filter.matches(&entry("anything")));
        assert!(filter.matches(&entry("")));
    }

    #[test]
    fn matches_case_insensitively() {
        let filter = LogFilter::new("GetGenv");
        assert!(filter.matches(&entry("\u{274C} getgenv failed")));
        assert!(filter.matches(&entry("GETGENV passed")));
        assert!(!filter.matches(&entry("getrenv passed")));
    }
}
