//! Provider comparison tool.
//!
//! Clones two revisions of a Checkbox provider, installs each into its own
//! venv and compares what `checkbox-cli` lists for them: the static job list,
//! the test plans and, when the test plans match, the bootstrapped job list
//! of every test plan.

pub mod compare;
pub mod config;
pub mod error;
pub mod listing;
pub mod report;
pub mod workspace;

pub use compare::{compare_sets, SetDiff};
pub use config::{AdditionalProvider, ComparisonConfig, ProviderSource};
pub use error::{DiffError, Result};
pub use report::{run_comparisons, Comparison, DiffReport, Subject};
pub use workspace::{SetupOptions, Side, Workspace};
