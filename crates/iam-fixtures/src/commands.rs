pub use std::process::{Command, ExitStatus, Stdio};

use anyhow::Context;
use itertools::Itertools;
use shared_child::SharedChild;
use std::collections::VecDeque;
use std::ffi::OsStr;
use std::os::fd::OwnedFd;
use std::sync::Arc;
use tokio::io::AsyncBufReadExt;

// We cannot use tokio's "process" feature: https://github.com/tokio-rs/tokio/issues/3520
// Child instead waits on a blocking thread through a SharedChild,
// which can still be signaled while the wait is pending.
pub struct Child {
    inner: Arc<SharedChild>,

    pub stdout: Option<ChildStdio>,
    pub stderr: Option<ChildStdio>,
}

pub type ChildStdio = tokio::fs::File;

/// Number of trailing stderr lines retained for error messages.
const STDERR_TAIL: usize = 20;

impl Child {
    pub fn spawn(cmd: &mut Command) -> std::io::Result<Self> {
        let mut inner = cmd.spawn()?;
        let stdout = map_stdio(inner.stdout.take());
        let stderr = map_stdio(inner.stderr.take());

        Ok(Self {
            inner: Arc::new(SharedChild::new(inner)?),
            stdout,
            stderr,
        })
    }

    pub fn wait(&self) -> impl std::future::Future<Output = std::io::Result<ExitStatus>> {
        let cloned_inner = self.inner.clone();
        let handle = tokio::runtime::Handle::current().spawn_blocking(move || cloned_inner.wait());
        async move {
            handle
                .await
                .map_err(|err| std::io::Error::new(std::io::ErrorKind::Other, err))?
        }
    }
}

impl Drop for Child {
    fn drop(&mut self) {
        if let Ok(Some(_status)) = self.inner.try_wait() {
            return; // Already exited.
        }
        let pid = self.inner.id();

        use shared_child::unix::SharedChildExt;

        // Note that send_signal() returns Ok() if the child has been waited on.
        if let Err(error) = self.inner.send_signal(libc::SIGTERM) {
            tracing::error!(%pid, ?error, "failed to deliver SIGTERM to child process");
        } else {
            tracing::warn!(%pid, "sent SIGTERM to abandoned child process");
        }
    }
}

/// Iterate over the program and then the arguments of `cmd`.
pub fn args(cmd: &Command) -> impl Iterator<Item = &OsStr> {
    std::iter::once(cmd.get_program()).chain(cmd.get_args())
}

/// Render `cmd` as a single space-separated line, for logs and traces.
pub fn display(cmd: &Command) -> String {
    args(cmd).map(|s| s.to_string_lossy()).join(" ")
}

/// Returns true if the program and leading arguments of `cmd` are `prefix`.
pub fn starts_with(cmd: &Command, prefix: &[&str]) -> bool {
    let args: Vec<&OsStr> = args(cmd).collect();
    args.len() >= prefix.len() && args.iter().zip(prefix).all(|(a, p)| *a == OsStr::new(p))
}

/// Run `cmd` to completion, logging each line of its stdout and stderr
/// under `stream`. A non-zero exit status is an error which includes
/// the final lines of stderr.
pub async fn run(mut cmd: Command, stream: &'static str) -> anyhow::Result<()> {
    let line = display(&cmd);
    tracing::info!(stream, command = %line, "running command");

    cmd.stdin(Stdio::null());
    cmd.stdout(Stdio::piped());
    cmd.stderr(Stdio::piped());

    let mut child = Child::spawn(&mut cmd)
        .with_context(|| format!("failed to spawn {:?}", cmd.get_program()))?;

    let stdout = child.stdout.take().context("child is missing stdout")?;
    let stderr = child.stderr.take().context("child is missing stderr")?;

    let mut stderr_tail = VecDeque::new();

    let (stdout_r, stderr_r, wait) = tokio::join!(
        capture_lines(stream, "stdout", stdout, None),
        capture_lines(stream, "stderr", stderr, Some(&mut stderr_tail)),
        child.wait(),
    );
    let status = wait.context("failed to wait for child process")?;
    () = stdout_r.context("failed to read child stdout")?;
    () = stderr_r.context("failed to read child stderr")?;

    if !status.success() {
        anyhow::bail!(
            "{stream} failed ({status}): {}",
            stderr_tail.iter().join("\n")
        );
    }
    tracing::debug!(stream, %status, "command completed");

    Ok(())
}

/// Stand-in for run() which logs but does not spawn `cmd`.
pub async fn dry_run(cmd: Command, stream: &'static str) -> anyhow::Result<()> {
    let line = display(&cmd);
    tracing::info!(stream, command = %line, "dry-run: skipping command");
    Ok(())
}

// capture_lines consumes newline-delimited lines from the AsyncRead, logging
// each and retaining the final STDERR_TAIL of them within `tail`, if present.
async fn capture_lines<R>(
    stream: &'static str,
    fd: &'static str,
    reader: R,
    mut tail: Option<&mut VecDeque<String>>,
) -> std::io::Result<()>
where
    R: tokio::io::AsyncRead + Unpin,
{
    let mut splits = tokio::io::BufReader::new(reader).split(b'\n');
    while let Some(line) = splits.next_segment().await? {
        // Attempt a direct conversion to String without a copy.
        // Fall back to a lossy UTF8 replacement.
        let line = String::from_utf8(line)
            .unwrap_or_else(|err| String::from_utf8_lossy(err.as_bytes()).into_owned());

        tracing::info!(stream, fd, "{line}");

        if let Some(tail) = tail.as_deref_mut() {
            if tail.len() == STDERR_TAIL {
                tail.pop_front();
            }
            tail.push_back(line);
        }
    }
    Ok(())
}

fn map_stdio<F>(f: Option<F>) -> Option<ChildStdio>
where
    F: Into<OwnedFd>,
{
    let f: Option<OwnedFd> = f.map(Into::into);
    let f: Option<std::fs::File> = f.map(Into::into);
    f.map(Into::into)
}

#[cfg(test)]
mod test {
    use super::*;

    #[tokio::test]
    async fn test_wait() {
        let child = Child::spawn(&mut Command::new("true")).unwrap();
        assert!(child.wait().await.unwrap().success());
        let child = Child::spawn(&mut Command::new("false")).unwrap();
        assert!(!child.wait().await.unwrap().success());
    }

    #[tokio::test]
    async fn test_drop_cancellation() {
        // Sleep for six hours.
        let child = Child::spawn(Command::new("sleep").arg("21600")).unwrap();
        let wait = child.wait();

        std::mem::drop(child);

        assert_eq!(wait.await.unwrap().to_string(), "signal: 15 (SIGTERM)");
    }

    #[tokio::test]
    async fn test_run_success() {
        let mut cmd = Command::new("sh");
        cmd.arg("-c").arg("echo created; echo progress >&2");

        run(cmd, "test-step").await.unwrap();
    }

    #[tokio::test]
    async fn test_run_failure_includes_stderr_tail() {
        let mut cmd = Command::new("sh");
        cmd.arg("-c")
            .arg("echo one >&2; echo ALREADY_EXISTS: pool exists >&2; exit 1");

        let err = run(cmd, "create-pool").await.unwrap_err();
        insta::assert_snapshot!(err.to_string(), @r###"
        create-pool failed (exit status: 1): one
        ALREADY_EXISTS: pool exists
        "###);
    }

    #[tokio::test]
    async fn test_run_missing_program() {
        let err = run(Command::new("/this/program/does/not/exist"), "set-project")
            .await
            .unwrap_err();

        assert_eq!(
            err.to_string(),
            r#"failed to spawn "/this/program/does/not/exist""#
        );
    }

    #[tokio::test]
    async fn test_dry_run_does_not_spawn() {
        dry_run(Command::new("/this/program/does/not/exist"), "set-project")
            .await
            .unwrap();
    }

    #[test]
    fn test_args_and_prefix() {
        let mut cmd = Command::new("gcloud");
        cmd.args(["config", "set", "project", "my-project"]);

        assert_eq!(display(&cmd), "gcloud config set project my-project");
        assert!(starts_with(&cmd, &["gcloud", "config", "set"]));
        assert!(!starts_with(&cmd, &["gcloud", "iam"]));
        assert!(!starts_with(
            &cmd,
            &["gcloud", "config", "set", "project", "my-project", "extra"]
        ));
    }
}
