//! Benchmark result mapping.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::RunMode;

/// `local-<scenario>` / `remote-<scenario>` → elapsed seconds.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BenchResults {
    timings: BTreeMap<String, f64>,
}

impl BenchResults {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn key(mode: RunMode, scenario: &str) -> String {
        match mode {
            RunMode::Local => format!("local-{scenario}"),
            RunMode::Remote => format!("remote-{scenario}"),
        }
    }

    pub fn record(&mut self, mode: RunMode, scenario: &str, seconds: f64) {
        self.timings.insert(Self::key(mode, scenario), seconds);
    }

    pub fn get(&self, key: &str) -> Option<f64> {
        self.timings.get(key).copied()
    }

    pub fn len(&self) -> usize {
        self.timings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timings.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.timings.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.timings.iter().map(|(k, v)| (k.as_str(), *v))
    }
}

impl fmt::Display for BenchResults {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let width = self.keys().map(str::len).max().unwrap_or(0);
        for (key, seconds) in self.iter() {
            writeln!(f, "{key:<width$}  {seconds:.3}s")?;
        }
        Ok(())
    }
}
