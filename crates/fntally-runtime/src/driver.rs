//! Run driver: wires harness → capture → aggregator → reporter for one run.

use fntally_core::{EventSink, Progress, SessionAggregator, TallyError};
use tokio::time::Instant;

use crate::capture::OutputSlot;
use crate::config::RunConfig;
use crate::harness::Harness;

/// Drive a single run to completion.
///
/// The run ends when the completion policy's deadline passes or on Ctrl-C.
/// Harness failures become log lines in the session; they never abort the
/// run, which always reaches `finish`. The only error is starting a run
/// while another is still active.
pub async fn run_session<H, S>(
    agg: &mut SessionAggregator,
    config: &RunConfig,
    harness: H,
    slot: &OutputSlot,
    sink: &mut S,
) -> Result<Progress, TallyError>
where
    H: Harness,
    S: EventSink,
{
    agg.reset(config.total_expected)?;

    let (guard, mut lines) = slot.on_line();
    let launched_at = Instant::now();
    let deadline = config.completion.deadline(launched_at);
    tracing::info!(
        harness = %config.harness.describe(),
        total_expected = config.total_expected.get(),
        "run started"
    );

    let harness_slot = slot.clone();
    let mut harness_task = tokio::spawn(harness.run(harness_slot));
    let mut harness_done = false;

    let settle = tokio::time::sleep_until(deadline);
    tokio::pin!(settle);

    loop {
        tokio::select! {
            Some(line) = lines.recv() => ingest(agg, &line, sink),
            joined = &mut harness_task, if !harness_done => {
                harness_done = true;
                // Lines printed before the harness returned come first.
                while let Ok(line) = lines.try_recv() {
                    ingest(agg, &line, sink);
                }
                let failure = match joined {
                    Ok(Ok(())) => None,
                    Ok(Err(e)) => Some(e.to_string()),
                    Err(e) => Some(format!("harness task aborted: {e}")),
                };
                match failure {
                    None => tracing::debug!(
                        elapsed_ms = launched_at.elapsed().as_millis() as u64,
                        "harness finished, waiting out settle period"
                    ),
                    Some(reason) => {
                        tracing::error!(error = %reason, "harness failed");
                        report_failure(agg, &reason, sink);
                    }
                }
            }
            () = &mut settle => break,
            _ = tokio::signal::ctrl_c() => {
                tracing::warn!("interrupted, finishing run early");
                break;
            }
        }
    }

    // Stop the harness before restoring the original sink so nothing it
    // prints late reaches the passthrough output.
    if !harness_done {
        harness_task.abort();
        if let Err(e) = (&mut harness_task).await
            && !e.is_cancelled()
        {
            tracing::debug!(error = %e, "harness task ended abnormally");
        }
    }
    drop(guard);
    while let Ok(line) = lines.try_recv() {
        ingest(agg, &line, sink);
    }

    Ok(agg.finish(sink))
}

fn ingest<S: EventSink>(agg: &mut SessionAggregator, line: &[u8], sink: &mut S) {
    if let Err(e) = agg.record_bytes(line, sink) {
        tracing::debug!(error = %e, "harness line not recorded");
    }
}

fn report_failure<S: EventSink>(agg: &mut SessionAggregator, reason: &str, sink: &mut S) {
    let message = format!("\u{274C} harness error: {reason}");
    if let Err(e) = agg.record(&message, sink) {
        tracing::debug!(error = %e, "harness failure not recorded");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::num::NonZeroU32;
    use std::sync::Arc;
    use std::time::Duration;

    use fntally_core::{FunctionRegistry, SessionEvent, Verdict};

    use crate::capture::LineSink;
    use crate::config::{CompletionPolicy, HarnessSource, OutputMode};
    use crate::harness::HarnessError;

    struct ScriptedHarness {
        lines: Vec<Vec<u8>>,
        fail_with: Option<&'static str>,
    }

    impl ScriptedHarness {
        fn lines(lines: &[&str]) -> Self {
            Self {
                lines: lines.iter().map(|l| l.as_bytes().to_vec()).collect(),
                fail_with: None,
            }
        }
    }

    impl Harness for ScriptedHarness {
        async fn run(self, slot: OutputSlot) -> Result<(), HarnessError> {
            for line in &self.lines {
                slot.print(line);
            }
            match self.fail_with {
                Some(reason) => Err(HarnessError::Io(std::io::Error::other(reason))),
                None => Ok(()),
            }
        }
    }

    #[derive(Clone, Default)]
    struct Sink(Arc<std::sync::Mutex<Vec<Vec<u8>>>>);

    impl LineSink for Sink {
        fn write_line(&mut self, line: &[u8]) {
            self.0.lock().expect("lock").push(line.to_vec());
        }
    }

    fn config(settle_ms: u64) -> RunConfig {
        RunConfig {
            total_expected: NonZeroU32::new(90).expect("non-zero"),
            completion: CompletionPolicy::FixedDelay(Duration::from_millis(settle_ms)),
            output: OutputMode::Json,
            filter: Default::default(),
            harness: HarnessSource::Stdin,
        }
    }

    fn aggregator() -> SessionAggregator {
        SessionAggregator::new(Arc::new(FunctionRegistry::builtin()))
    }

    #[tokio::test]
    async fn run_counts_harness_output() {
        let mut agg = aggregator();
        let slot = OutputSlot::new(Box::new(Sink::default()));
        let mut events = Vec::new();
        let harness = ScriptedHarness::lines(&[
            "Getting ready to run tests...",
            "checkcaller passed",
            "checkcaller passed",
            "\u{274C} getgenv failed",
        ]);

        let progress = run_session(&mut agg, &config(50), harness, &slot, &mut events)
            .await
            .expect("run");

        let session = agg.session();
        assert!(!session.is_active());
        assert_eq!(session.log().len(), 4);
        assert_eq!(session.stats().passed, 1);
        assert_eq!(session.stats().failed, 1);
        assert_eq!(progress.percentage, 100);
        assert_eq!(progress.label(), "2/2");
    }

    #[tokio::test]
    async fn silent_run_falls_back_to_configured_total() {
        let mut agg = aggregator();
        let slot = OutputSlot::new(Box::new(Sink::default()));
        let mut events = Vec::new();

        let progress = run_session(
            &mut agg,
            &config(20),
            ScriptedHarness::lines(&[]),
            &slot,
            &mut events,
        )
        .await
        .expect("run");

        assert_eq!(progress.percentage, 100);
        assert_eq!(progress.label(), "90/90");
        assert_eq!(
            events.last(),
            Some(&SessionEvent::ProgressChanged(progress))
        );
    }

    #[tokio::test]
    async fn harness_failure_is_logged_and_run_finishes() {
        let mut agg = aggregator();
        let slot = OutputSlot::new(Box::new(Sink::default()));
        let mut events = Vec::new();
        let harness = ScriptedHarness {
            lines: vec![b"getgenv passed".to_vec()],
            fail_with: Some("script fetch failed"),
        };

        let progress = run_session(&mut agg, &config(50), harness, &slot, &mut events)
            .await
            .expect("run");

        let session = agg.session();
        let last = session.log().last().expect("failure line");
        assert!(last.raw_message.contains("script fetch failed"));
        assert_eq!(last.verdict, Verdict::Info);
        assert!(!last.counted);
        assert_eq!(progress.label(), "1/1");
    }

    #[tokio::test]
    async fn original_sink_restored_after_run() {
        let mut agg = aggregator();
        let original = Sink::default();
        let slot = OutputSlot::new(Box::new(original.clone()));
        let mut events = Vec::new();

        run_session(
            &mut agg,
            &config(20),
            ScriptedHarness::lines(&["getgenv passed"]),
            &slot,
            &mut events,
        )
        .await
        .expect("run");
        slot.print(b"after run");

        let seen = original.0.lock().expect("lock").clone();
        assert_eq!(seen, vec![b"after run".to_vec()]);
    }

    struct EndlessHarness;

    impl Harness for EndlessHarness {
        async fn run(self, slot: OutputSlot) -> Result<(), HarnessError> {
            loop {
                slot.print(b"getgenv passed");
                tokio::time::sleep(Duration::from_millis(1)).await;
            }
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn running_harness_stopped_before_sink_restored() {
        let mut agg = aggregator();
        let original = Sink::default();
        let slot = OutputSlot::new(Box::new(original.clone()));
        let mut events = Vec::new();

        run_session(&mut agg, &config(30), EndlessHarness, &slot, &mut events)
            .await
            .expect("run");
        tokio::time::sleep(Duration::from_millis(20)).await;

        assert!(original.0.lock().expect("lock").is_empty());
        assert!(!agg.session().log().is_empty());
        assert_eq!(agg.session().actual_count(), 1);
    }

    #[tokio::test]
    async fn non_text_lines_are_skipped() {
        let mut agg = aggregator();
        let slot = OutputSlot::new(Box::new(Sink::default()));
        let mut events = Vec::new();
        let harness = ScriptedHarness {
            lines: vec![vec![0xff, 0xfe], b"getrenv passed".to_vec()],
            fail_with: None,
        };

        run_session(&mut agg, &config(50), harness, &slot, &mut events)
            .await
            .expect("run");

        assert_eq!(agg.session().log().len(), 1);
        assert_eq!(agg.session().actual_count(), 1);
    }

    #[tokio::test]
    async fn second_run_after_finish_starts_clean() {
        let mut agg = aggregator();
        let slot = OutputSlot::new(Box::new(Sink::default()));
        let mut events = Vec::new();

        run_session(
            &mut agg,
            &config(20),
            ScriptedHarness::lines(&["getgenv passed"]),
            &slot,
            &mut events,
        )
        .await
        .expect("first run");
        run_session(
            &mut agg,
            &config(20),
            ScriptedHarness::lines(&["getrenv passed", "getsenv passed"]),
            &slot,
            &mut events,
        )
        .await
        .expect("second run");

        let session = agg.session();
        assert_eq!(session.actual_count(), 2);
        assert!(!session.is_processed("getgenv"));
    }
}
