//! Scripted process runner for tests.
//!
//! `FakeRunner` records every invocation and answers from a list of rules
//! matched against the command line (and optionally the working directory).
//! Unmatched invocations succeed with empty output.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::error::Result;
use crate::process::{BackgroundProcess, Invocation, ProcessHandle, ProcessOutput, ProcessRunner};

type Responder = Box<dyn Fn(&Invocation) -> ProcessOutput + Send + Sync>;

struct Rule {
    prefix: String,
    cwd: Option<PathBuf>,
    responder: Responder,
}

impl Rule {
    fn matches(&self, invocation: &Invocation) -> bool {
        if !invocation.command_line().starts_with(&self.prefix) {
            return false;
        }
        match (&self.cwd, &invocation.cwd) {
            (None, _) => true,
            (Some(want), Some(got)) => want == got,
            (Some(_), None) => false,
        }
    }
}

// ---------------------------------------------------------------------------
// FakeRunner
// ---------------------------------------------------------------------------

/// In-memory [`ProcessRunner`].
#[derive(Default)]
pub struct FakeRunner {
    rules: Mutex<Vec<Rule>>,
    calls: Mutex<Vec<Invocation>>,
    background: Mutex<Vec<Invocation>>,
    background_exits_early: AtomicBool,
    terminations: Arc<AtomicU32>,
}

impl FakeRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer invocations whose command line starts with `prefix`.
    /// Earlier rules win.
    pub fn on(&self, prefix: &str, output: ProcessOutput) -> &Self {
        self.push_rule(prefix, None, Box::new(move |_| output.clone()))
    }

    /// Like [`FakeRunner::on`], restricted to one working directory.
    pub fn on_in(&self, cwd: impl AsRef<Path>, prefix: &str, output: ProcessOutput) -> &Self {
        self.push_rule(
            prefix,
            Some(cwd.as_ref().to_path_buf()),
            Box::new(move |_| output.clone()),
        )
    }

    /// Answer with a closure, e.g. to create the directory a clone would.
    pub fn on_with<F>(&self, prefix: &str, responder: F) -> &Self
    where
        F: Fn(&Invocation) -> ProcessOutput + Send + Sync + 'static,
    {
        self.push_rule(prefix, None, Box::new(responder))
    }

    fn push_rule(&self, prefix: &str, cwd: Option<PathBuf>, responder: Responder) -> &Self {
        self.rules.lock().unwrap().push(Rule {
            prefix: prefix.to_string(),
            cwd,
            responder,
        });
        self
    }

    /// Make every background process report that it already exited.
    pub fn background_exits_early(&self, exits: bool) {
        self.background_exits_early.store(exits, Ordering::SeqCst);
    }

    /// Every foreground invocation, in order.
    pub fn calls(&self) -> Vec<Invocation> {
        self.calls.lock().unwrap().clone()
    }

    /// Command lines of every foreground invocation, in order.
    pub fn command_lines(&self) -> Vec<String> {
        self.calls().iter().map(Invocation::command_line).collect()
    }

    /// Foreground invocations whose command line starts with `prefix`.
    pub fn calls_matching(&self, prefix: &str) -> Vec<Invocation> {
        self.calls()
            .into_iter()
            .filter(|c| c.command_line().starts_with(prefix))
            .collect()
    }

    /// Every background invocation, in order.
    pub fn background_calls(&self) -> Vec<Invocation> {
        self.background.lock().unwrap().clone()
    }

    /// How many background processes have been terminated.
    pub fn terminations(&self) -> u32 {
        self.terminations.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ProcessRunner for FakeRunner {
    async fn run(&self, invocation: &Invocation) -> Result<ProcessOutput> {
        self.calls.lock().unwrap().push(invocation.clone());
        let rules = self.rules.lock().unwrap();
        let output = rules
            .iter()
            .find(|rule| rule.matches(invocation))
            .map(|rule| (rule.responder)(invocation))
            .unwrap_or_default();
        Ok(output)
    }

    async fn spawn_background(&self, invocation: &Invocation) -> Result<BackgroundProcess> {
        self.background.lock().unwrap().push(invocation.clone());
        Ok(BackgroundProcess::new(
            invocation.command_line(),
            Box::new(FakeHandle {
                exited: self.background_exits_early.load(Ordering::SeqCst),
                terminations: self.terminations.clone(),
            }),
        ))
    }
}

struct FakeHandle {
    exited: bool,
    terminations: Arc<AtomicU32>,
}

impl ProcessHandle for FakeHandle {
    fn has_exited(&mut self) -> Result<bool> {
        Ok(self.exited)
    }

    fn terminate(&mut self) -> Result<()> {
        self.terminations.fetch_add(1, Ordering::SeqCst);
        self.exited = true;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_first_matching_rule_wins() {
        let runner = FakeRunner::new();
        runner
            .on("git describe", ProcessOutput::success("snap-2024-01-01T0000\n"))
            .on("git", ProcessOutput::failure(1, "nope"));

        let out = runner
            .run(&Invocation::new("git").args(["describe", "--tags"]))
            .await
            .unwrap();
        assert_eq!(out.stdout, "snap-2024-01-01T0000\n");

        let out = runner
            .run(&Invocation::new("git").arg("status"))
            .await
            .unwrap();
        assert_eq!(out.exit_code, 1);
        assert_eq!(runner.calls().len(), 2);
    }

    #[tokio::test]
    async fn test_cwd_scoped_rule() {
        let runner = FakeRunner::new();
        runner.on_in("/work/a", "git log", ProcessOutput::success("+ fix a"));

        let in_a = Invocation::new("git").arg("log").current_dir("/work/a");
        let in_b = Invocation::new("git").arg("log").current_dir("/work/b");
        assert_eq!(runner.run(&in_a).await.unwrap().stdout, "+ fix a");
        assert_eq!(runner.run(&in_b).await.unwrap().stdout, "");
    }

    #[tokio::test]
    async fn test_unmatched_invocation_succeeds() {
        let runner = FakeRunner::new();
        let out = runner.run(&Invocation::new("mk-venv")).await.unwrap();
        assert!(out.succeeded());
        assert_eq!(runner.command_lines(), vec!["mk-venv".to_string()]);
    }

    #[tokio::test]
    async fn test_background_termination_counted() {
        let runner = FakeRunner::new();
        {
            let mut bg = runner
                .spawn_background(&Invocation::new("checkbox-cli").arg("slave"))
                .await
                .unwrap();
            assert!(!bg.has_exited().unwrap());
        }
        assert_eq!(runner.terminations(), 1);
        assert_eq!(runner.background_calls().len(), 1);
    }
}
