//! Scoped capture of harness output.
//!
//! The harness writes every line into an [`OutputSlot`]. Normally the slot
//! forwards to the terminal; during a run the driver installs a capturing
//! sink with [`OutputSlot::intercept`] and gets back a [`CaptureGuard`] that
//! puts the original sink back when dropped, whichever way the run ends.

use std::io::Write;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::mpsc;

/// Destination for one line of harness output (without its line ending).
pub trait LineSink: Send {
    fn write_line(&mut self, line: &[u8]);
}

/// Forwards lines to stdout unchanged.
#[derive(Debug, Default)]
pub struct PassthroughSink;

impl LineSink for PassthroughSink {
    fn write_line(&mut self, line: &[u8]) {
        let mut out = std::io::stdout().lock();
        if let Err(e) = out.write_all(line).and_then(|()| out.write_all(b"\n")) {
            tracing::debug!(error = %e, "passthrough write failed");
        }
    }
}

/// Forwards lines to the driver over an unbounded channel.
#[derive(Debug)]
pub struct ChannelSink {
    tx: mpsc::UnboundedSender<Vec<u8>>,
}

impl LineSink for ChannelSink {
    fn write_line(&mut self, line: &[u8]) {
        if self.tx.send(line.to_vec()).is_err() {
            tracing::debug!("capture receiver gone, line dropped");
        }
    }
}

// ─── Slot ────────────────────────────────────────────────────────

/// Shared, swappable output sink the harness prints through.
#[derive(Clone)]
pub struct OutputSlot {
    sink: Arc<Mutex<Box<dyn LineSink>>>,
}

impl OutputSlot {
    pub fn new(sink: Box<dyn LineSink>) -> Self {
        Self {
            sink: Arc::new(Mutex::new(sink)),
        }
    }

    /// Slot writing straight to the terminal.
    pub fn passthrough() -> Self {
        Self::new(Box::new(PassthroughSink))
    }

    fn lock(&self) -> MutexGuard<'_, Box<dyn LineSink>> {
        // A panic inside a sink leaves it usable; keep going with it.
        self.sink.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn print(&self, line: &[u8]) {
        self.lock().write_line(line);
    }

    /// Replace the current sink until the returned guard is dropped.
    #[must_use = "dropping the guard immediately ends the capture"]
    pub fn intercept(&self, sink: Box<dyn LineSink>) -> CaptureGuard {
        let original = std::mem::replace(&mut *self.lock(), sink);
        tracing::debug!("output capture installed");
        CaptureGuard {
            slot: self.clone(),
            original: Some(original),
        }
    }

    /// Subscribe to every printed line for the lifetime of the guard.
    #[must_use = "dropping the guard immediately ends the capture"]
    pub fn on_line(&self) -> (CaptureGuard, mpsc::UnboundedReceiver<Vec<u8>>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (self.intercept(Box::new(ChannelSink { tx })), rx)
    }
}

/// Restores the intercepted sink on drop.
pub struct CaptureGuard {
    slot: OutputSlot,
    original: Option<Box<dyn LineSink>>,
}

impl Drop for CaptureGuard {
    fn drop(&mut self) {
        if let Some(original) = self.original.take() {
            *self.slot.lock() = original;
            tracing::debug!("output capture released");
        }
    }
}
