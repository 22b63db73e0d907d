use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::progress::Progress;

// ─── Verdict ──────────────────────────────────────────────────────

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Verdict {
    Pass,
    Fail,
    Neutral,
    #[default]
    Info,
}

impl Verdict {
    pub const ALL: [Self; 4] = [Self::Pass, Self::Fail, Self::Neutral, Self::Info];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pass => "pass",
            Self::Fail => "fail",
            Self::Neutral => "neutral",
            Self::Info => "info",
        }
    }

    /// Whether a verdict of this kind contributes to a counter.
    pub fn is_countable(self) -> bool {
        !matches!(self, Self::Info)
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ─── Classification ───────────────────────────────────────────────

/// Outcome of classifying one harness line. Transient: consumed by the
/// aggregator and never stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    pub function: Option<String>,
    pub is_result: bool,
    pub verdict: Verdict,
}

impl Classification {
    /// Non-result classification (noise, banners, unknown functions).
    pub fn info(function: Option<String>) -> Self {
        Self {
            function,
            is_result: false,
            verdict: Verdict::Info,
        }
    }
}

// ─── Log ──────────────────────────────────────────────────────────

/// One received harness line. Created once, never mutated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    pub raw_message: String,
    pub received_at: DateTime<Utc>,
    pub matched_function: Option<String>,
    pub verdict: Verdict,
    /// True when this line incremented a counter.
    pub counted: bool,
}

// ─── Stats ────────────────────────────────────────────────────────

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stats {
    pub passed: u32,
    pub timeout: u32,
    pub failed: u32,
}

impl Stats {
    pub fn total(&self) -> u32 {
        self.passed + self.timeout + self.failed
    }
}

// ─── Events ───────────────────────────────────────────────────────

/// Change notifications emitted by the aggregator to the presentation side.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum SessionEvent {
    LogAppended(LogEntry),
    StatsChanged(Stats),
    ProgressChanged(Progress),
}

impl SessionEvent {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::LogAppended(_) => "log_appended",
            Self::StatsChanged(_) => "stats_changed",
            Self::ProgressChanged(_) => "progress_changed",
        }
    }
}
