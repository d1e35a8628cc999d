//! Structured process invocations and the runner seam.
//!
//! Every external tool (git, `manage.py`, `checkbox-cli`, `bumpversion`) is
//! described by an [`Invocation`] and executed through a [`ProcessRunner`].
//! Production code uses [`crate::SystemRunner`]; tests use
//! [`crate::fakes::FakeRunner`].

use std::collections::BTreeMap;
use std::ffi::OsString;
use std::fmt;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::{debug, error};

use crate::error::{CoreError, Result};

// ---------------------------------------------------------------------------
// Invocation
// ---------------------------------------------------------------------------

/// How the child's stdout/stderr are wired.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputMode {
    /// Pipe both streams and return them in [`ProcessOutput`].
    #[default]
    Capture,
    /// Let the child write straight to our terminal.
    Inherit,
    /// Send both streams to `/dev/null`.
    Discard,
}

/// A single external command: executable, arguments, working directory and
/// environment overlay.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub program: String,
    pub args: Vec<String>,
    pub cwd: Option<PathBuf>,
    /// Variables set on top of the inherited environment.
    pub env: BTreeMap<String, OsString>,
    pub output: OutputMode,
}

impl Invocation {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            cwd: None,
            env: BTreeMap::new(),
            output: OutputMode::Capture,
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn current_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.cwd = Some(dir.as_ref().to_path_buf());
        self
    }

    pub fn env(mut self, key: impl Into<String>, value: impl Into<OsString>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    pub fn envs<I, K, V>(mut self, vars: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<OsString>,
    {
        for (key, value) in vars {
            self.env.insert(key.into(), value.into());
        }
        self
    }

    pub fn output(mut self, mode: OutputMode) -> Self {
        self.output = mode;
        self
    }

    /// Space-joined command line, used for logging and error messages.
    pub fn command_line(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

impl fmt::Display for Invocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.command_line())
    }
}

// ---------------------------------------------------------------------------
// Output
// ---------------------------------------------------------------------------

/// Outcome of a finished process.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProcessOutput {
    /// Exit code (-1 when killed by a signal).
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
}

impl ProcessOutput {
    pub fn success(stdout: impl Into<String>) -> Self {
        Self {
            exit_code: 0,
            stdout: stdout.into(),
            stderr: String::new(),
        }
    }

    pub fn failure(exit_code: i32, stderr: impl Into<String>) -> Self {
        Self {
            exit_code,
            stdout: String::new(),
            stderr: stderr.into(),
        }
    }

    pub fn succeeded(&self) -> bool {
        self.exit_code == 0
    }

    /// stdout followed by stderr.
    pub fn combined(&self) -> String {
        match (self.stdout.is_empty(), self.stderr.is_empty()) {
            (_, true) => self.stdout.clone(),
            (true, false) => self.stderr.clone(),
            (false, false) => format!("{}{}", self.stdout, self.stderr),
        }
    }
}

// ---------------------------------------------------------------------------
// Background processes
// ---------------------------------------------------------------------------

/// Low-level handle on a process running concurrently with the caller.
pub trait ProcessHandle: Send {
    /// Whether the process has already terminated.
    fn has_exited(&mut self) -> Result<bool>;

    /// Ask the process (group) to terminate. Must succeed when the process is
    /// already gone.
    fn terminate(&mut self) -> Result<()>;
}

/// Scoped background process. Released exactly once: either through
/// [`BackgroundProcess::release`] or when dropped.
pub struct BackgroundProcess {
    command: String,
    handle: Box<dyn ProcessHandle>,
    released: bool,
}

impl BackgroundProcess {
    pub fn new(command: impl Into<String>, handle: Box<dyn ProcessHandle>) -> Self {
        Self {
            command: command.into(),
            handle,
            released: false,
        }
    }

    pub fn command(&self) -> &str {
        &self.command
    }

    pub fn has_exited(&mut self) -> Result<bool> {
        self.handle.has_exited()
    }

    /// Terminate the process now. Later calls (and the drop) are no-ops.
    pub fn release(&mut self) -> Result<()> {
        if self.released {
            return Ok(());
        }
        self.released = true;
        debug!(command = %self.command, "terminating background process");
        self.handle.terminate()
    }
}

impl fmt::Debug for BackgroundProcess {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BackgroundProcess")
            .field("command", &self.command)
            .field("released", &self.released)
            .finish()
    }
}

impl Drop for BackgroundProcess {
    fn drop(&mut self) {
        if let Err(e) = self.release() {
            tracing::warn!(command = %self.command, error = %e, "failed to terminate background process");
        }
    }
}

// ---------------------------------------------------------------------------
// Runner trait
// ---------------------------------------------------------------------------

/// Executes invocations. Every call blocks (awaits) until the child exits.
#[async_trait]
pub trait ProcessRunner: Send + Sync {
    /// Run to completion. A non-zero exit is not an error here.
    async fn run(&self, invocation: &Invocation) -> Result<ProcessOutput>;

    /// Start `invocation` in its own process group and return immediately.
    /// Output is never captured: `OutputMode::Capture` behaves as `Discard`.
    async fn spawn_background(&self, invocation: &Invocation) -> Result<BackgroundProcess>;

    /// Run to completion and turn a non-zero exit into
    /// [`CoreError::CommandFailed`]. The command line and its output are
    /// logged at debug level; failures are logged at error level.
    async fn run_checked(&self, invocation: &Invocation) -> Result<ProcessOutput> {
        debug!("{}", invocation);
        let output = self.run(invocation).await?;
        let combined = output.combined();
        if !combined.is_empty() {
            debug!("{}", combined.trim_end());
        }
        if !output.succeeded() {
            error!(
                "Command '{}' returned non-zero exit status {}.\n{}",
                invocation, output.exit_code, combined
            );
            return Err(CoreError::CommandFailed {
                command: invocation.command_line(),
                code: output.exit_code,
                output: combined,
            });
        }
        Ok(output)
    }
}
