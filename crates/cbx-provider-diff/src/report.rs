//! The three comparison passes and their report.

use std::fmt;

use cbx_core::ProcessRunner;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::compare::{compare_sets, same_elements, SetDiff};
use crate::error::Result;
use crate::listing::{bootstrapped_jobs, job_definitions, test_plans};
use crate::workspace::{Side, Workspace};

/// What a comparison looked at.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Subject {
    StaticJobList,
    TestPlans,
    BootstrappedTestPlan { test_plan: String },
}

impl fmt::Display for Subject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Subject::StaticJobList => f.write_str("Comparing static job list"),
            Subject::TestPlans => f.write_str("Comparing test plans"),
            Subject::BootstrappedTestPlan { test_plan } => {
                write!(f, "Comparing bootstrapped test plan {test_plan}")
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Comparison {
    pub subject: Subject,
    pub diff: SetDiff,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiffReport {
    pub comparisons: Vec<Comparison>,
    /// Set when the test plans differ, so no bootstrapped lists were compared.
    pub bootstrapped_skipped: bool,
}

impl DiffReport {
    pub fn has_differences(&self) -> bool {
        self.comparisons.iter().any(|c| !c.diff.is_empty())
    }

    fn push(&mut self, subject: Subject, diff: SetDiff) {
        self.comparisons.push(Comparison { subject, diff });
    }
}

impl fmt::Display for DiffReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for comparison in &self.comparisons {
            writeln!(f, "{}", comparison.subject)?;
            write!(f, "{}", comparison.diff)?;
        }
        Ok(())
    }
}

/// Static job list, test plans, then (if the plans match) every plan's
/// bootstrapped job list.
pub async fn run_comparisons(runner: &dyn ProcessRunner, workspace: &Workspace) -> Result<DiffReport> {
    let mut report = DiffReport::default();

    let before = job_definitions(runner, workspace, Side::Before).await?;
    let after = job_definitions(runner, workspace, Side::After).await?;
    debug!("{}", Subject::StaticJobList);
    report.push(Subject::StaticJobList, compare_sets(&before, &after));

    let before_plans = test_plans(runner, workspace, Side::Before).await?;
    let after_plans = test_plans(runner, workspace, Side::After).await?;
    debug!("{}", Subject::TestPlans);
    report.push(Subject::TestPlans, compare_sets(&before_plans, &after_plans));

    if !same_elements(&before_plans, &after_plans) {
        info!("Test plans differ, skipping bootstrapped comparisons");
        report.bootstrapped_skipped = true;
        return Ok(report);
    }

    for plan in &before_plans {
        let subject = Subject::BootstrappedTestPlan {
            test_plan: plan.clone(),
        };
        debug!("{subject}");
        let before = bootstrapped_jobs(runner, workspace, Side::Before, plan).await?;
        let after = bootstrapped_jobs(runner, workspace, Side::After, plan).await?;
        report.push(subject, compare_sets(&before, &after));
    }
    Ok(report)
}
