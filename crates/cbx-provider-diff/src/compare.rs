//! List comparison.

use std::collections::HashSet;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Items present on only one side.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SetDiff {
    pub only_in_before: Vec<String>,
    pub only_in_after: Vec<String>,
}

impl SetDiff {
    pub fn is_empty(&self) -> bool {
        self.only_in_before.is_empty() && self.only_in_after.is_empty()
    }
}

/// Elements of `before` missing from `after` and vice versa, each in the
/// order of its own list.
pub fn compare_sets(before: &[String], after: &[String]) -> SetDiff {
    let before_set: HashSet<&str> = before.iter().map(String::as_str).collect();
    let after_set: HashSet<&str> = after.iter().map(String::as_str).collect();
    SetDiff {
        only_in_before: before
            .iter()
            .filter(|x| !after_set.contains(x.as_str()))
            .cloned()
            .collect(),
        only_in_after: after
            .iter()
            .filter(|x| !before_set.contains(x.as_str()))
            .cloned()
            .collect(),
    }
}

/// Whether both lists hold the same elements, ignoring order and repeats.
pub fn same_elements(a: &[String], b: &[String]) -> bool {
    let a: HashSet<&str> = a.iter().map(String::as_str).collect();
    let b: HashSet<&str> = b.iter().map(String::as_str).collect();
    a == b
}

impl fmt::Display for SetDiff {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return writeln!(f, "No differences");
        }
        if !self.only_in_before.is_empty() {
            writeln!(f, "Found only in the 'before' commit:")?;
            writeln!(f, "\t{}", self.only_in_before.join("\n\t"))?;
        }
        if !self.only_in_after.is_empty() {
            writeln!(f, "Found only in the 'after' commit:")?;
            writeln!(f, "\t{}", self.only_in_after.join("\n\t"))?;
        }
        Ok(())
    }
}
