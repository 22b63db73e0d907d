//! Terminal and JSON-lines rendering of session events.

use std::io::Write;

use fntally_core::{EventSink, LogEntry, LogFilter, Progress, Session, SessionEvent, Stats, Verdict};
use serde::Serialize;

use crate::config::OutputMode;

/// Renders aggregator events as they arrive.
pub struct Reporter<W: Write> {
    out: W,
    mode: OutputMode,
    filter: LogFilter,
    stats: Stats,
    write_failed: bool,
}

#[derive(Serialize)]
struct Summary<'a> {
    event: &'static str,
    #[serde(flatten)]
    stats: Stats,
    progress: Progress,
    log_len: usize,
    processed_functions: Vec<&'a str>,
}

impl<W: Write> Reporter<W> {
    pub fn new(out: W, mode: OutputMode, filter: LogFilter) -> Self {
        Self {
            out,
            mode,
            filter,
            stats: Stats::default(),
            write_failed: false,
        }
    }

    #[cfg(test)]
    pub fn into_inner(self) -> W {
        self.out
    }

    fn color(&self) -> bool {
        matches!(self.mode, OutputMode::Human { color: true })
    }

    fn paint(&self, code: &str, text: &str) -> String {
        if self.color() {
            format!("\x1b[{code}m{text}\x1b[0m")
        } else {
            text.to_string()
        }
    }

    fn verdict_tag(&self, verdict: Verdict) -> String {
        let padded = format!("{:<7}", verdict.as_str().to_uppercase());
        match verdict {
            Verdict::Pass => self.paint("32", &padded),
            Verdict::Fail => self.paint("1;31", &padded),
            Verdict::Neutral => self.paint("33", &padded),
            Verdict::Info => self.paint("2", &padded),
        }
    }

    fn format_log(&self, entry: &LogEntry) -> String {
        let time = entry.received_at.format("%H:%M:%S");
        let marker = if entry.counted { "*" } else { " " };
        format!(
            "{} {}{marker} {}",
            self.paint("2", &time.to_string()),
            self.verdict_tag(entry.verdict),
            entry.raw_message
        )
    }

    fn format_progress(&self, progress: &Progress) -> String {
        let head = format!("[{:>3}%] {}", progress.percentage, progress.label());
        format!(
            "{}  passed {}  timeout {}  failed {}",
            self.paint("1", &head),
            self.stats.passed,
            self.stats.timeout,
            self.stats.failed
        )
    }

    fn write_line(&mut self, line: &str) {
        if self.write_failed {
            return;
        }
        if let Err(e) = writeln!(self.out, "{line}") {
            tracing::warn!(error = %e, "report output failed, further output suppressed");
            self.write_failed = true;
        }
    }

    fn write_json<T: Serialize>(&mut self, value: &T) {
        match serde_json::to_string(value) {
            Ok(line) => self.write_line(&line),
            Err(e) => tracing::warn!(error = %e, "event serialization failed"),
        }
    }

    /// Final summary after `finish`.
    pub fn summary(&mut self, session: &Session) {
        let progress = session.progress();
        match self.mode {
            OutputMode::Json => {
                let summary = Summary {
                    event: "summary",
                    stats: session.stats(),
                    progress,
                    log_len: session.log().len(),
                    processed_functions: session
                        .processed_functions()
                        .iter()
                        .map(String::as_str)
                        .collect(),
                };
                self.write_json(&summary);
            }
            OutputMode::Human { .. } => {
                self.stats = session.stats();
                let line = format!(
                    "{} {}",
                    self.paint("1", "done"),
                    self.format_progress(&progress)
                );
                self.write_line(&line);
            }
        }
        if let Err(e) = self.out.flush() {
            tracing::debug!(error = %e, "report flush failed");
        }
    }
}

impl<W: Write> EventSink for Reporter<W> {
    fn emit(&mut self, event: SessionEvent) {
        if let SessionEvent::StatsChanged(stats) = &event {
            self.stats = *stats;
        }
        if let SessionEvent::LogAppended(entry) = &event
            && !self.filter.matches(entry)
        {
            return;
        }
        match self.mode {
            OutputMode::Json => self.write_json(&event),
            OutputMode::Human { .. } => match &event {
                SessionEvent::LogAppended(entry) => {
                    let line = self.format_log(entry);
                    self.write_line(&line);
                }
                SessionEvent::ProgressChanged(progress) => {
                    let line = self.format_progress(progress);
                    self.write_line(&line);
                }
                SessionEvent::StatsChanged(_) => {}
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn entry(raw: &str, verdict: Verdict, counted: bool) -> LogEntry {
        LogEntry {
            raw_message: raw.to_string(),
            received_at: Utc::now(),
            matched_function: None,
            verdict,
            counted,
        }
    }

    fn output(reporter: Reporter<Vec<u8>>) -> String {
        String::from_utf8(reporter.into_inner()).expect("utf-8")
    }

    #[test]
    fn human_log_line_has_tag_and_count_marker() {
        let mut r = Reporter::new(Vec::new(), OutputMode::Human { color: false }, LogFilter::default());

        r.emit(SessionEvent::LogAppended(entry("getgenv passed", Verdict::Pass, true)));

        let out = output(r);
        assert!(out.contains("PASS   * getgenv passed"), "got: {out}");
    }

    #[test]
    fn human_progress_line_uses_latest_stats() {
        let mut r = Reporter::new(Vec::new(), OutputMode::Human { color: false }, LogFilter::default());

        r.emit(SessionEvent::StatsChanged(Stats {
            passed: 3,
            timeout: 1,
            failed: 2,
        }));
        r.emit(SessionEvent::ProgressChanged(Progress {
            percentage: 6,
            current: 6,
            total: 90,
        }));

        let out = output(r);
        assert_eq!(out, "[  6%] 6/90  passed 3  timeout 1  failed 2\n");
    }

    #[test]
    fn filter_hides_non_matching_log_lines_only() {
        let mut r = Reporter::new(
            Vec::new(),
            OutputMode::Json,
            LogFilter::new("getrenv"),
        );

        r.emit(SessionEvent::LogAppended(entry("getgenv passed", Verdict::Pass, true)));
        r.emit(SessionEvent::LogAppended(entry("getrenv passed", Verdict::Pass, true)));
        r.emit(SessionEvent::ProgressChanged(Progress {
            percentage: 2,
            current: 2,
            total: 90,
        }));

        let out = output(r);
        let lines: Vec<serde_json::Value> = out
            .lines()
            .map(|l| serde_json::from_str(l).expect("json line"))
            .collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0]["raw_message"], "getrenv passed");
        assert_eq!(lines[1]["event"], "progress_changed");
    }

    #[test]
    fn color_wraps_tags() {
        let mut r = Reporter::new(Vec::new(), OutputMode::Human { color: true }, LogFilter::default());

        r.emit(SessionEvent::LogAppended(entry("x", Verdict::Fail, false)));

        assert!(output(r).contains("\x1b[1;31mFAIL   \x1b[0m"));
    }
}
