//! Shared trial loop for AA/AB simulations.
//!
//! One procedure is simulated as `experiments_num` independent trials.
//! Every trial runs two passes: a null pass with effect 0 (the AA test)
//! and an effect pass with the configured mde (the AB test). The two
//! passes redraw their control/treatment groups independently rather than
//! sharing indices. Success counts below the alpha level become the
//! empirical alpha and power, each bounded by a binomial confidence
//! interval over the trial count.

use statrs::distribution::Normal;
use tracing::{debug, info};

use crate::config::META_CI_ALPHA;
use crate::discrete::sizing::estimate_ci_binomial;
use crate::errors::SimulationError;
use crate::report::TrialResult;

/// Standard normal distribution, with statrs' construction error mapped
/// into the crate error type.
pub(crate) fn standard_normal() -> Result<Normal, SimulationError> {
    Normal::new(0.0, 1.0).map_err(|e| SimulationError::Numeric(format!("standard normal: {e}")))
}

/// Run all trials for one procedure. `pass` maps an injected effect to a
/// p-value, drawing fresh groups on every call; any pass failure aborts
/// the run with the procedure and trial index attached.
pub(crate) fn simulate_procedure<F>(
    procedure: &str,
    experiments_num: usize,
    alpha_level: f64,
    mde: f64,
    mut pass: F,
) -> Result<TrialResult, SimulationError>
where
    F: FnMut(f64) -> Result<f64, SimulationError>,
{
    if experiments_num == 0 {
        return Err(SimulationError::InvalidConfiguration(
            "experiments_num must be a positive integer".to_string(),
        ));
    }

    info!(procedure, experiments_num, mde, "simulating procedure");

    let mut null_pvalues = Vec::with_capacity(experiments_num);
    let mut effect_pvalues = Vec::with_capacity(experiments_num);
    let mut null_successes = 0usize;
    let mut effect_successes = 0usize;

    for trial in 0..experiments_num {
        let p_value = pass(0.0).map_err(|e| e.at_trial(procedure, trial))?;
        if p_value < alpha_level {
            null_successes += 1;
        }
        null_pvalues.push(p_value);

        let p_value = pass(mde).map_err(|e| e.at_trial(procedure, trial))?;
        if p_value < alpha_level {
            effect_successes += 1;
        }
        effect_pvalues.push(p_value);
    }

    let alpha = null_successes as f64 / experiments_num as f64;
    let power = effect_successes as f64 / experiments_num as f64;

    let alpha_ci = estimate_ci_binomial(alpha, experiments_num, META_CI_ALPHA)?;
    let power_ci = estimate_ci_binomial(power, experiments_num, META_CI_ALPHA)?;

    debug!(procedure, alpha, power, "procedure simulated");

    Ok(TrialResult {
        alpha,
        alpha_ci,
        power,
        power_ci,
        null_pvalues,
        effect_pvalues,
    })
}
