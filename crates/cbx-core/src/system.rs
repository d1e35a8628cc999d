//! [`ProcessRunner`] backed by real child processes.

use std::process::Stdio;

use async_trait::async_trait;
use tokio::process::{Child, Command};

use crate::error::{CoreError, Result};
use crate::process::{BackgroundProcess, Invocation, OutputMode, ProcessHandle, ProcessOutput, ProcessRunner};

/// Runs invocations with `tokio::process`.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemRunner;

impl SystemRunner {
    pub fn new() -> Self {
        Self
    }
}

fn build_command(invocation: &Invocation) -> Command {
    let mut cmd = Command::new(&invocation.program);
    cmd.args(&invocation.args).stdin(Stdio::null());
    if let Some(dir) = &invocation.cwd {
        cmd.current_dir(dir);
    }
    cmd.envs(&invocation.env);
    match invocation.output {
        OutputMode::Capture => {
            cmd.stdout(Stdio::piped()).stderr(Stdio::piped());
        }
        OutputMode::Inherit => {
            cmd.stdout(Stdio::inherit()).stderr(Stdio::inherit());
        }
        OutputMode::Discard => {
            cmd.stdout(Stdio::null()).stderr(Stdio::null());
        }
    }
    cmd
}

#[async_trait]
impl ProcessRunner for SystemRunner {
    async fn run(&self, invocation: &Invocation) -> Result<ProcessOutput> {
        let child = build_command(invocation)
            .spawn()
            .map_err(|source| CoreError::Spawn {
                command: invocation.command_line(),
                source,
            })?;

        let output = child.wait_with_output().await?;

        Ok(ProcessOutput {
            exit_code: output.status.code().unwrap_or(-1),
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        })
    }

    /// Nothing reads a background child's pipes, so `Capture` is downgraded
    /// to `Discard`; a full pipe would otherwise block the child.
    async fn spawn_background(&self, invocation: &Invocation) -> Result<BackgroundProcess> {
        let mut cmd = if invocation.output == OutputMode::Capture {
            tracing::debug!(command = %invocation, "background output is not captured, discarding it");
            build_command(&invocation.clone().output(OutputMode::Discard))
        } else {
            build_command(invocation)
        };
        // Own process group, so the whole tree can be signalled at once.
        cmd.process_group(0);
        let child = cmd.spawn().map_err(|source| CoreError::Spawn {
            command: invocation.command_line(),
            source,
        })?;
        tracing::debug!(command = %invocation, pid = ?child.id(), "started background process");
        Ok(BackgroundProcess::new(
            invocation.command_line(),
            Box::new(ProcessGroup { child }),
        ))
    }
}

/// A child that leads its own process group.
struct ProcessGroup {
    child: Child,
}

impl ProcessHandle for ProcessGroup {
    fn has_exited(&mut self) -> Result<bool> {
        Ok(self.child.try_wait()?.is_some())
    }

    fn terminate(&mut self) -> Result<()> {
        // `id()` is None once the child has been reaped.
        let Some(pid) = self.child.id() else {
            return Ok(());
        };
        signal_group(pid, libc::SIGTERM)
    }
}

/// Send `signal` to the process group led by `pgid`. A group that no longer
/// exists is not an error.
fn signal_group(pgid: u32, signal: libc::c_int) -> Result<()> {
    let pgid = libc::pid_t::try_from(pgid)
        .map_err(|_| CoreError::Io(std::io::Error::other(format!("invalid pgid {pgid}"))))?;
    // SAFETY: kill(2) with a negative pid only signals the group; no memory is touched.
    let rc = unsafe { libc::kill(-pgid, signal) };
    if rc == 0 {
        return Ok(());
    }
    let err = std::io::Error::last_os_error();
    if err.raw_os_error() == Some(libc::ESRCH) {
        return Ok(());
    }
    Err(CoreError::Io(err))
}
