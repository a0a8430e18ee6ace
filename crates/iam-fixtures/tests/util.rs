use futures::future::BoxFuture;
use futures::FutureExt;
use iam_fixtures::{commands, gcloud};
use std::sync::{Arc, Mutex};

#[derive(Debug, PartialEq, serde::Serialize)]
pub enum TraceEntry {
    Cmd(&'static str, String),
    Stdout(String),
}

pub type Trace = Arc<Mutex<Vec<TraceEntry>>>;

/// Mock RunCmdFn which records each command into `trace`, and fails
/// commands whose stream is listed in `fail_streams`.
pub fn mock_run_cmd_fn(trace: Trace, fail_streams: &'static [&'static str]) -> gcloud::RunCmdFn {
    Box::new(
        move |cmd, stream| -> BoxFuture<'static, anyhow::Result<()>> {
            trace
                .lock()
                .unwrap()
                .push(TraceEntry::Cmd(stream, commands::display(&cmd)));

            let result = if fail_streams.contains(&stream) {
                Err(anyhow::anyhow!(
                    "{stream} failed (exit status: 1): ERROR: (gcloud) PERMISSION_DENIED"
                ))
            } else {
                Ok(())
            };
            futures::future::ready(result).boxed()
        },
    )
}

pub fn mock_gcloud(trace: Trace, fail_streams: &'static [&'static str]) -> gcloud::Gcloud {
    gcloud::Gcloud::new(gcloud::GCLOUD, mock_run_cmd_fn(trace, fail_streams))
}

/// Writer which records each complete line into the trace,
/// interleaved with recorded commands.
pub struct TraceWriter {
    trace: Trace,
    partial: Vec<u8>,
}

impl TraceWriter {
    pub fn new(trace: Trace) -> Self {
        Self {
            trace,
            partial: Vec::new(),
        }
    }
}

impl std::io::Write for TraceWriter {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        for &b in buf {
            if b == b'\n' {
                let line = String::from_utf8_lossy(&self.partial).into_owned();
                self.trace.lock().unwrap().push(TraceEntry::Stdout(line));
                self.partial.clear();
            } else {
                self.partial.push(b);
            }
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}
