//! Shared plumbing for the Checkbox release tools.
//!
//! - [`process`]: structured invocations, the [`ProcessRunner`] seam and
//!   scoped background processes
//! - [`system`]: the real runner
//! - [`fakes`]: a scripted runner for tests
//! - [`git`], [`venv`]: the external tools every script drives
//! - [`telemetry`]: logging setup

pub mod error;
pub mod fakes;
pub mod git;
pub mod process;
pub mod system;
pub mod telemetry;
pub mod venv;

pub use error::{CoreError, Result};
pub use git::{repo_basename, DescribeOptions, Git};
pub use process::{
    BackgroundProcess, Invocation, OutputMode, ProcessHandle, ProcessOutput, ProcessRunner,
};
pub use system::SystemRunner;
pub use telemetry::{build_subscriber, init_tracing, ConsoleStyle, LogConfig};
pub use venv::Venv;
