//! Aggregated simulation results.
//!
//! A [`SimulationReport`] is the immutable output of one engine run:
//! per-procedure empirical alpha/power with binomial confidence intervals
//! and the full p-value sequences both passes produced. Reporting
//! consumers only read it; an empty report renders without error.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Per-procedure outcome of a simulation run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrialResult {
    /// Empirical false-positive rate: fraction of null-pass p-values
    /// below the alpha level.
    pub alpha: f64,
    /// Binomial confidence interval for `alpha`.
    pub alpha_ci: (f64, f64),
    /// Empirical true-positive rate: fraction of effect-pass p-values
    /// below the alpha level.
    pub power: f64,
    /// Binomial confidence interval for `power`.
    pub power_ci: (f64, f64),
    /// P-values from the null (AA) passes, one per trial.
    pub null_pvalues: Vec<f64>,
    /// P-values from the injected-effect (AB) passes, one per trial.
    pub effect_pvalues: Vec<f64>,
}

impl TrialResult {
    /// Whether the procedure held its nominal alpha and reached the
    /// target power, judged on the confidence intervals: a procedure
    /// fails when the alpha CI sits entirely above the nominal level or
    /// the power CI sits entirely below the target.
    pub fn meets_targets(&self, alpha_level: f64, target_power: f64) -> bool {
        !(self.alpha_ci.0 > alpha_level || target_power > self.power_ci.1)
    }
}

/// Report of one simulation run: procedure name -> [`TrialResult`].
///
/// Iteration order is deterministic (sorted by name). Re-running a
/// procedure replaces its previous result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationReport {
    results: BTreeMap<String, TrialResult>,
    /// Alpha level the run was configured with.
    pub alpha_level: f64,
    /// Target power the run was configured with.
    pub target_power: f64,
    /// When the run finished.
    pub generated_at: DateTime<Utc>,
}

impl SimulationReport {
    pub(crate) fn new(alpha_level: f64, target_power: f64) -> Self {
        Self {
            results: BTreeMap::new(),
            alpha_level,
            target_power,
            generated_at: Utc::now(),
        }
    }

    /// Store a procedure result, replacing any prior result for the name.
    pub(crate) fn insert(&mut self, name: impl Into<String>, result: TrialResult) {
        self.results.insert(name.into(), result);
        self.generated_at = Utc::now();
    }

    pub fn get(&self, name: &str) -> Option<&TrialResult> {
        self.results.get(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &TrialResult)> {
        self.results.iter().map(|(name, r)| (name.as_str(), r))
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    /// Procedure names, sorted.
    pub fn names(&self) -> Vec<&str> {
        self.results.keys().map(String::as_str).collect()
    }
}

impl fmt::Display for SimulationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.results.is_empty() {
            return writeln!(f, "no procedures simulated");
        }
        for (name, result) in &self.results {
            let verdict = if result.meets_targets(self.alpha_level, self.target_power) {
                "ok"
            } else {
                "FAIL"
            };
            writeln!(
                f,
                "'{name}': alpha={:.4} ci [{:.4}; {:.4}], power={:.4} ci [{:.4}; {:.4}] {verdict}",
                result.alpha,
                result.alpha_ci.0,
                result.alpha_ci.1,
                result.power,
                result.power_ci.0,
                result.power_ci.1,
            )?;
        }
        Ok(())
    }
}
