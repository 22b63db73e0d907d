//! Harness launching: pumps harness output line by line into an [`OutputSlot`].

use std::future::Future;
use std::process::{ExitStatus, Stdio};

use thiserror::Error;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Command;

use crate::capture::OutputSlot;
use crate::config::HarnessSource;

#[derive(Debug, Error)]
pub enum HarnessError {
    #[error("failed to launch `{program}`: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to open transcript {path}: {source}")]
    Open {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("harness io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("harness exited with {0}")]
    Exit(ExitStatus),
}

/// Something that produces harness output. Enables scripted harnesses in tests.
pub trait Harness: Send + 'static {
    fn run(self, slot: OutputSlot) -> impl Future<Output = Result<(), HarnessError>> + Send;
}

impl Harness for HarnessSource {
    async fn run(self, slot: OutputSlot) -> Result<(), HarnessError> {
        match self {
            Self::Stdin => pump_lines(tokio::io::stdin(), &slot).await,
            Self::File(path) => {
                let file = tokio::fs::File::open(&path)
                    .await
                    .map_err(|source| HarnessError::Open {
                        path: path.display().to_string(),
                        source,
                    })?;
                pump_lines(file, &slot).await
            }
            Self::Command { program, args } => run_command(&program, &args, &slot).await,
        }
    }
}

async fn run_command(program: &str, args: &[String], slot: &OutputSlot) -> Result<(), HarnessError> {
    let mut child = Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .map_err(|source| HarnessError::Spawn {
            program: program.to_string(),
            source,
        })?;
    tracing::info!(program, pid = ?child.id(), "harness launched");

    let stdout = child.stdout.take();
    let stderr = child.stderr.take();
    let (out_res, err_res) = tokio::join!(
        async {
            match stdout {
                Some(s) => pump_lines(s, slot).await,
                None => Ok(()),
            }
        },
        async {
            match stderr {
                Some(s) => pump_lines(s, slot).await,
                None => Ok(()),
            }
        },
    );
    out_res?;
    err_res?;

    let status = child.wait().await?;
    if status.success() {
        Ok(())
    } else {
        Err(HarnessError::Exit(status))
    }
}

/// Read `reader` to EOF, printing each line (line ending stripped) into `slot`.
/// Bytes are forwarded as-is; text validation happens at the aggregator.
pub async fn pump_lines<R>(reader: R, slot: &OutputSlot) -> Result<(), HarnessError>
where
    R: AsyncRead + Unpin,
{
    let mut reader = BufReader::new(reader);
    let mut buf = Vec::new();
    loop {
        buf.clear();
        let n = reader.read_until(b'\n', &mut buf).await?;
        if n == 0 {
            return Ok(());
        }
        while matches!(buf.last(), Some(b'\n' | b'\r')) {
            buf.pop();
        }
        slot.print(&buf);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::LineSink;
    use std::sync::{Arc, Mutex};

    #[derive(Clone, Default)]
    struct Collect(Arc<Mutex<Vec<Vec<u8>>>>);

    impl LineSink for Collect {
        fn write_line(&mut self, line: &[u8]) {
            self.0.lock().expect("lock").push(line.to_vec());
        }
    }

    #[tokio::test]
    async fn pump_splits_and_strips_line_endings() {
        let sink = Collect::default();
        let slot = OutputSlot::new(Box::new(sink.clone()));
        let input: &[u8] = b"first\r\nsecond\n\nlast-no-newline";

        pump_lines(input, &slot).await.expect("pump");

        let lines = sink.0.lock().expect("lock").clone();
        assert_eq!(
            lines,
            vec![
                b"first".to_vec(),
                b"second".to_vec(),
                Vec::new(),
                b"last-no-newline".to_vec(),
            ]
        );
    }

    #[tokio::test]
    async fn pump_forwards_invalid_utf8_untouched() {
        let sink = Collect::default();
        let slot = OutputSlot::new(Box::new(sink.clone()));
        let input: &[u8] = b"ok\n\xff\xfe\n";

        pump_lines(input, &slot).await.expect("pump");

        let lines = sink.0.lock().expect("lock").clone();
        assert_eq!(lines[1], vec![0xff, 0xfe]);
    }

    #[tokio::test]
    async fn missing_program_is_spawn_error() {
        let slot = OutputSlot::new(Box::new(Collect::default()));
        let source = HarnessSource::Command {
            program: "fntally-definitely-not-a-real-binary".to_string(),
            args: Vec::new(),
        };

        let err = source.run(slot).await.expect_err("spawn must fail");

        assert!(matches!(err, HarnessError::Spawn { .. }));
    }

    #[tokio::test]
    async fn missing_transcript_is_open_error() {
        let slot = OutputSlot::new(Box::new(Collect::default()));
        let source = HarnessSource::File("/nonexistent/fntally/transcript.log".into());

        let err = source.run(slot).await.expect_err("open must fail");

        assert!(matches!(err, HarnessError::Open { .. }));
        assert!(err.to_string().contains("transcript.log"));
    }
}
