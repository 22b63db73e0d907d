//! Session aggregation: applies classified lines to the per-run tally.
//!
//! A [`Session`] is one run's state. [`SessionAggregator`] owns it together
//! with the classifier, deduplicates functions, keeps the counters in step
//! with the dedup set, and reports every change through an [`EventSink`].

use std::collections::BTreeSet;
use std::num::NonZeroU32;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::classify::MessageClassifier;
use crate::error::TallyError;
use crate::filter::LogFilter;
use crate::progress::{DEFAULT_TOTAL_EXPECTED, Progress};
use crate::registry::FunctionRegistry;
use crate::types::{LogEntry, SessionEvent, Stats, Verdict};

// ─── Event sink ──────────────────────────────────────────────────

/// Receiver of aggregator change events.
pub trait EventSink {
    fn emit(&mut self, event: SessionEvent);
}

impl EventSink for Vec<SessionEvent> {
    fn emit(&mut self, event: SessionEvent) {
        self.push(event);
    }
}

impl<T: EventSink + ?Sized> EventSink for &mut T {
    fn emit(&mut self, event: SessionEvent) {
        (**self).emit(event);
    }
}

// ─── Session ─────────────────────────────────────────────────────

/// Aggregate state of one run.
///
/// Invariants: `passed + timeout + failed == actual_count` and
/// `processed_functions.len() == actual_count`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    passed: u32,
    timeout: u32,
    failed: u32,
    total_expected: NonZeroU32,
    processed_functions: BTreeSet<String>,
    actual_count: u32,
    active: bool,
    /// Set by `finish`; selects the completion display.
    finished: bool,
    log: Vec<LogEntry>,
}

impl Session {
    /// An idle session that has not started a run.
    pub fn new(total_expected: NonZeroU32) -> Self {
        Self {
            passed: 0,
            timeout: 0,
            failed: 0,
            total_expected,
            processed_functions: BTreeSet::new(),
            actual_count: 0,
            active: false,
            finished: false,
            log: Vec::new(),
        }
    }

    fn started(total_expected: NonZeroU32) -> Self {
        Self {
            active: true,
            ..Self::new(total_expected)
        }
    }

    pub fn stats(&self) -> Stats {
        Stats {
            passed: self.passed,
            timeout: self.timeout,
            failed: self.failed,
        }
    }

    /// Current progress. After `finish` the run always displays as complete;
    /// a run that counted nothing shows `total/total` of the configured total.
    pub fn progress(&self) -> Progress {
        if self.finished && self.actual_count == 0 {
            Progress::complete(self.total_expected)
        } else {
            Progress::compute(self.actual_count, self.total_expected)
        }
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    pub fn total_expected(&self) -> NonZeroU32 {
        self.total_expected
    }

    pub fn actual_count(&self) -> u32 {
        self.actual_count
    }

    pub fn processed_functions(&self) -> &BTreeSet<String> {
        &self.processed_functions
    }

    pub fn is_processed(&self, function: &str) -> bool {
        self.processed_functions.contains(function)
    }

    pub fn log(&self) -> &[LogEntry] {
        &self.log
    }

    pub fn filtered_log<'a>(
        &'a self,
        filter: &'a LogFilter,
    ) -> impl Iterator<Item = &'a LogEntry> + 'a {
        self.log.iter().filter(move |entry| filter.matches(entry))
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new(DEFAULT_TOTAL_EXPECTED)
    }
}

// ─── Aggregator ──────────────────────────────────────────────────

/// Single-writer owner of the live [`Session`].
#[derive(Debug, Clone)]
pub struct SessionAggregator {
    classifier: MessageClassifier,
    session: Session,
}

impl SessionAggregator {
    pub fn new(registry: Arc<FunctionRegistry>) -> Self {
        Self {
            classifier: MessageClassifier::new(registry),
            session: Session::default(),
        }
    }

    pub fn classifier(&self) -> &MessageClassifier {
        &self.classifier
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Start a fresh run. Rejected while a run is still active.
    pub fn reset(&mut self, total_expected: NonZeroU32) -> Result<(), TallyError> {
        if self.session.active {
            tracing::warn!(
                actual_count = self.session.actual_count,
                "reset rejected: run already in progress"
            );
            return Err(TallyError::RunInProgress);
        }
        self.session = Session::started(total_expected);
        tracing::debug!(total_expected = total_expected.get(), "session reset");
        Ok(())
    }

    /// Apply one harness line received now.
    pub fn record(
        &mut self,
        message: &str,
        sink: &mut impl EventSink,
    ) -> Result<LogEntry, TallyError> {
        self.record_at(message, Utc::now(), sink)
    }

    /// Apply one harness line with an explicit arrival time.
    pub fn record_at(
        &mut self,
        message: &str,
        received_at: DateTime<Utc>,
        sink: &mut impl EventSink,
    ) -> Result<LogEntry, TallyError> {
        if !self.session.active {
            tracing::warn!("line dropped: no active run");
            return Err(TallyError::SessionInactive);
        }

        let classification = self.classifier.classify(message);
        let counted = classification.is_result
            && classification.verdict.is_countable()
            && classification
                .function
                .as_deref()
                .is_some_and(|f| !self.session.is_processed(f));

        if counted && let Some(function) = classification.function.as_ref() {
            let session = &mut self.session;
            session.processed_functions.insert(function.clone());
            session.actual_count += 1;
            match classification.verdict {
                Verdict::Pass => session.passed += 1,
                Verdict::Fail => session.failed += 1,
                Verdict::Neutral => session.timeout += 1,
                Verdict::Info => {}
            }
            debug_assert_eq!(session.stats().total(), session.actual_count);
            debug_assert_eq!(
                session.processed_functions.len(),
                session.actual_count as usize
            );
            tracing::debug!(
                function = %function,
                verdict = %classification.verdict,
                actual_count = session.actual_count,
                "function counted"
            );
        }

        let entry = LogEntry {
            raw_message: message.to_string(),
            received_at,
            matched_function: classification.function,
            verdict: classification.verdict,
            counted,
        };
        self.session.log.push(entry.clone());

        if counted {
            sink.emit(SessionEvent::StatsChanged(self.session.stats()));
            sink.emit(SessionEvent::ProgressChanged(self.session.progress()));
        }
        sink.emit(SessionEvent::LogAppended(entry.clone()));

        Ok(entry)
    }

    /// Apply one raw line of harness output. Non-UTF-8 input is rejected
    /// without touching the session.
    pub fn record_bytes(
        &mut self,
        bytes: &[u8],
        sink: &mut impl EventSink,
    ) -> Result<LogEntry, TallyError> {
        let text = match std::str::from_utf8(bytes) {
            Ok(text) => text,
            Err(e) => {
                tracing::warn!(error = %e, len = bytes.len(), "non-text harness line rejected");
                return Err(TallyError::InvalidInput(e.to_string()));
            }
        };
        self.record(text.trim_end_matches(['\n', '\r']), sink)
    }

    /// End the run. The displayed total locks to what was observed; a run
    /// that observed nothing keeps its configured total and shows complete.
    pub fn finish(&mut self, sink: &mut impl EventSink) -> Progress {
        if !self.session.active {
            return self.session.progress();
        }
        let session = &mut self.session;
        session.active = false;
        session.finished = true;
        if let Some(observed) = NonZeroU32::new(session.actual_count) {
            session.total_expected = observed;
        } else {
            tracing::warn!(
                total_expected = session.total_expected.get(),
                "run finished without any counted results"
            );
        }

        let progress = session.progress();
        let stats = session.stats();
        tracing::info!(
            passed = stats.passed,
            failed = stats.failed,
            timeout = stats.timeout,
            progress = %progress.label(),
            "run finished"
        );
        sink.emit(SessionEvent::ProgressChanged(progress));
        progress
    }
}

// ─── Tests ──────────────────────────────────────────────────────
