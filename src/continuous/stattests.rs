//! Statistical test procedures for continuous metrics.
//!
//! Pure functions mapping (control sample, treatment sample, auxiliary
//! data, alternative) to a p-value in [0, 1]:
//!
//! - [`ttest`]: pooled two-sample t-test
//! - [`difference_ttest`]: t-test on current minus previous-period values
//! - [`cuped_ttest`]: t-test on CUPED residuals
//! - [`regression_test`]: treated coefficient in `y ~ 1 + treated`
//! - [`did_regression_test`]: difference-in-differences interaction term
//! - [`additional_vars_regression_test`]: treated coefficient controlling
//!   for extra variables
//!
//! Regression p-values get a one-sided correction: when the fitted effect
//! points against the alternative's direction the hypothesis can never be
//! supported, so the p-value is forced to 1.

use nalgebra::linalg::Cholesky;
use nalgebra::{DMatrix, DVector};
use statrs::distribution::{ContinuousCDF, StudentsT};

use crate::config::Alternative;
use crate::errors::SimulationError;
use crate::series::{mean, sample_cov, sample_var};

/// A named auxiliary sample for [`additional_vars_regression_test`].
#[derive(Debug, Clone)]
pub struct AuxSample {
    pub name: String,
    pub values: Vec<f64>,
}

impl AuxSample {
    pub fn new(name: impl Into<String>, values: Vec<f64>) -> Self {
        Self {
            name: name.into(),
            values,
        }
    }
}

/// Force a regression p-value to 1 when the fitted coefficient points
/// against the alternative's direction.
fn corrected_regression_pvalue(value: f64, p_value: f64, alternative: Alternative) -> f64 {
    match alternative {
        Alternative::Less if value < 0.0 => 1.0,
        Alternative::Greater if value > 0.0 => 1.0,
        _ => p_value,
    }
}

fn students_t(df: f64) -> Result<StudentsT, SimulationError> {
    StudentsT::new(0.0, 1.0, df)
        .map_err(|e| SimulationError::Numeric(format!("t-distribution (df={df}): {e}")))
}

/// Pooled two-sample t-test.
pub fn ttest(
    control: &[f64],
    treatment: &[f64],
    alternative: Alternative,
) -> Result<f64, SimulationError> {
    let (n1, n2) = (control.len(), treatment.len());
    if n1 < 2 || n2 < 2 {
        return Err(SimulationError::InsufficientData(format!(
            "t-test needs at least 2 observations per group, got {n1} and {n2}"
        )));
    }

    let df = (n1 + n2 - 2) as f64;
    let (v1, v2) = (sample_var(control), sample_var(treatment));
    let (m1, m2) = (mean(control), mean(treatment));

    let pooled = ((n1 - 1) as f64 * v1 + (n2 - 1) as f64 * v2) / df;
    let denom = (pooled * (1.0 / n1 as f64 + 1.0 / n2 as f64)).sqrt();
    if !(denom > 0.0) {
        return Err(SimulationError::InsufficientData(
            "pooled variance is zero, t-statistic undefined".to_string(),
        ));
    }
    let t = (m1 - m2) / denom;

    let dist = students_t(df)?;
    let p_value = match alternative {
        Alternative::Less => dist.cdf(t),
        Alternative::Greater => dist.cdf(-t),
        Alternative::TwoSided => 2.0 * dist.cdf(-t.abs()),
    };
    Ok(p_value)
}

/// T-test on (current - previous) differences. Previous-period values
/// must be row-aligned with the samples.
pub fn difference_ttest(
    control: &[f64],
    control_pre: &[f64],
    treatment: &[f64],
    treatment_pre: &[f64],
    alternative: Alternative,
) -> Result<f64, SimulationError> {
    if control.len() != control_pre.len() || treatment.len() != treatment_pre.len() {
        return Err(SimulationError::InvalidConfiguration(
            "previous-period values must align row-wise with the samples".to_string(),
        ));
    }

    let control_diff: Vec<f64> = control
        .iter()
        .zip(control_pre)
        .map(|(now, pre)| now - pre)
        .collect();
    let treatment_diff: Vec<f64> = treatment
        .iter()
        .zip(treatment_pre)
        .map(|(now, pre)| now - pre)
        .collect();

    ttest(&control_diff, &treatment_diff, alternative)
}

/// CUPED-adjusted t-test: subtracts `theta * covariate` from both groups,
/// with theta estimated on the pooled sample as cov(covariate, outcome)
/// over var(covariate).
pub fn cuped_ttest(
    control: &[f64],
    control_covariate: &[f64],
    treatment: &[f64],
    treatment_covariate: &[f64],
    alternative: Alternative,
) -> Result<f64, SimulationError> {
    if control.len() != control_covariate.len() || treatment.len() != treatment_covariate.len() {
        return Err(SimulationError::InvalidConfiguration(
            "covariate values must align row-wise with the samples".to_string(),
        ));
    }

    let full_value: Vec<f64> = control.iter().chain(treatment).copied().collect();
    let full_covariate: Vec<f64> = control_covariate
        .iter()
        .chain(treatment_covariate)
        .copied()
        .collect();

    let var = sample_var(&full_covariate);
    if !(var > 0.0) {
        return Err(SimulationError::InsufficientData(
            "covariate variance is zero, theta undefined".to_string(),
        ));
    }
    let theta = sample_cov(&full_covariate, &full_value) / var;

    let cuped_control: Vec<f64> = control
        .iter()
        .zip(control_covariate)
        .map(|(y, x)| y - theta * x)
        .collect();
    let cuped_treatment: Vec<f64> = treatment
        .iter()
        .zip(treatment_covariate)
        .map(|(y, x)| y - theta * x)
        .collect();

    ttest(&cuped_control, &cuped_treatment, alternative)
}

/// OLS fit via the normal equations; returns (coefficient, two-sided
/// p-value) for one column of the design matrix.
fn ols_coefficient_pvalue(
    x: DMatrix<f64>,
    y: DVector<f64>,
    coefficient: usize,
) -> Result<(f64, f64), SimulationError> {
    let (n, k) = (x.nrows(), x.ncols());
    if n <= k {
        return Err(SimulationError::InsufficientData(format!(
            "regression with {k} coefficients needs more than {k} observations, got {n}"
        )));
    }

    let xtx = x.transpose() * &x;
    let xty = x.transpose() * &y;
    let chol = Cholesky::new(xtx).ok_or_else(|| {
        SimulationError::InsufficientData(
            "degenerate regression design (X'X is not positive definite)".to_string(),
        )
    })?;
    let beta = chol.solve(&xty);

    let residuals = &y - &x * &beta;
    let df = (n - k) as f64;
    let s2 = residuals.dot(&residuals) / df;
    let xtx_inv = chol.inverse();
    let var = s2 * xtx_inv[(coefficient, coefficient)];
    if !(var > 0.0) {
        return Err(SimulationError::InsufficientData(
            "zero residual variance, coefficient t-statistic undefined".to_string(),
        ));
    }

    let t = beta[coefficient] / var.sqrt();
    let dist = students_t(df)?;
    Ok((beta[coefficient], 2.0 * dist.cdf(-t.abs())))
}

/// Treatment effect estimation via linear regression: p-value of the
/// treated indicator in `y ~ 1 + treated`.
pub fn regression_test(
    control: &[f64],
    treatment: &[f64],
    alternative: Alternative,
) -> Result<f64, SimulationError> {
    let n = control.len() + treatment.len();
    let x = DMatrix::from_fn(n, 2, |row, col| match col {
        0 => 1.0,
        _ => {
            if row < control.len() {
                0.0
            } else {
                1.0
            }
        }
    });
    let y = DVector::from_iterator(n, control.iter().chain(treatment).copied());

    let (coef, p_value) = ols_coefficient_pvalue(x, y, 1)?;
    Ok(corrected_regression_pvalue(coef, p_value, alternative))
}

/// Difference-in-differences estimation: p-value of the treated-by-after
/// interaction in `y ~ 1 + after + treated + treated*after` over the
/// stacked pre/post observations.
pub fn did_regression_test(
    control: &[f64],
    control_pre: &[f64],
    treatment: &[f64],
    treatment_pre: &[f64],
    alternative: Alternative,
) -> Result<f64, SimulationError> {
    if control.len() != control_pre.len() || treatment.len() != treatment_pre.len() {
        return Err(SimulationError::InvalidConfiguration(
            "previous-period values must align row-wise with the samples".to_string(),
        ));
    }

    // Stack order: control pre, control post, treatment pre, treatment post.
    let blocks = [
        (control_pre, 0.0, 0.0),
        (control, 0.0, 1.0),
        (treatment_pre, 1.0, 0.0),
        (treatment, 1.0, 1.0),
    ];

    let n: usize = blocks.iter().map(|(b, _, _)| b.len()).sum();
    let mut rows = Vec::with_capacity(n);
    let mut y_values = Vec::with_capacity(n);
    for (block, treated, after) in blocks {
        for &value in block {
            rows.push([1.0, after, treated, treated * after]);
            y_values.push(value);
        }
    }

    let x = DMatrix::from_fn(n, 4, |row, col| rows[row][col]);
    let y = DVector::from_vec(y_values);

    let (coef, p_value) = ols_coefficient_pvalue(x, y, 3)?;
    Ok(corrected_regression_pvalue(coef, p_value, alternative))
}

/// Treatment effect estimation controlling for additional variables:
/// p-value of the treated indicator in `y ~ 1 + treated + vars…`.
///
/// Control and treatment must carry the same non-empty set of variable
/// names; anything else is a [`SimulationError::MismatchedAuxiliaryData`].
pub fn additional_vars_regression_test(
    control: &[f64],
    control_vars: &[AuxSample],
    treatment: &[f64],
    treatment_vars: &[AuxSample],
    alternative: Alternative,
) -> Result<f64, SimulationError> {
    let mut control_names: Vec<String> = control_vars.iter().map(|v| v.name.clone()).collect();
    let mut treatment_names: Vec<String> = treatment_vars.iter().map(|v| v.name.clone()).collect();
    control_names.sort();
    treatment_names.sort();

    if treatment_names.is_empty() || control_names != treatment_names {
        return Err(SimulationError::MismatchedAuxiliaryData {
            control: control_names,
            treatment: treatment_names,
        });
    }

    for (vars, expected) in [(control_vars, control.len()), (treatment_vars, treatment.len())] {
        for var in vars {
            if var.values.len() != expected {
                return Err(SimulationError::InvalidConfiguration(format!(
                    "additional variable '{}' must align row-wise with its sample",
                    var.name
                )));
            }
        }
    }

    // Columns: intercept, treated, one per variable (treatment name order).
    let n = control.len() + treatment.len();
    let k = 2 + treatment_vars.len();
    let mut x = DMatrix::zeros(n, k);
    let y = DVector::from_iterator(n, control.iter().chain(treatment).copied());

    for row in 0..n {
        x[(row, 0)] = 1.0;
        x[(row, 1)] = if row < control.len() { 0.0 } else { 1.0 };
    }
    for (j, treatment_var) in treatment_vars.iter().enumerate() {
        // Sort check above guarantees the matching control variable exists.
        let control_var = control_vars
            .iter()
            .find(|v| v.name == treatment_var.name)
            .ok_or_else(|| SimulationError::MismatchedAuxiliaryData {
                control: control_vars.iter().map(|v| v.name.clone()).collect(),
                treatment: treatment_vars.iter().map(|v| v.name.clone()).collect(),
            })?;
        for (row, &value) in control_var.values.iter().enumerate() {
            x[(row, 2 + j)] = value;
        }
        for (row, &value) in treatment_var.values.iter().enumerate() {
            x[(control.len() + row, 2 + j)] = value;
        }
    }

    let (coef, p_value) = ols_coefficient_pvalue(x, y, 1)?;
    Ok(corrected_regression_pvalue(coef, p_value, alternative))
}
