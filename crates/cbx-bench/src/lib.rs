//! Benchmark harness for Checkbox launchers.
//!
//! Every `launcher-<scenario>` file of the benchmarking provider is run once
//! locally (`checkbox-cli <launcher>`) and once remotely (`checkbox-cli master
//! localhost <launcher>` against a background `checkbox-cli slave`), and the
//! wall-clock time of each run is reported.

pub mod error;
pub mod harness;
pub mod report;
pub mod scenario;

pub use error::{BenchError, Result, RunMode};
pub use harness::{run_benchmark, BenchConfig, BenchHarness};
pub use report::BenchResults;
pub use scenario::{check_provider, discover_scenarios, Scenario};
