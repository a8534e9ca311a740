//! Statistical test procedures for binary metrics.
//!
//! - [`conversion_ztest`]: pooled-variance z-test on two proportions
//! - [`chi_square_test`]: 2x2 contingency chi-square (df = 1)
//! - [`bayesian_test`]: closed-form Beta-posterior comparison

use statrs::distribution::{ChiSquared, ContinuousCDF};
use statrs::function::gamma::ln_gamma;

use crate::config::Alternative;
use crate::engine::standard_normal;
use crate::errors::SimulationError;

/// Minimum observations per contingency cell for the chi-square
/// approximation to hold.
const CHI_SQUARE_MIN_CELL: f64 = 5.0;

fn validate_counts(
    control_count: u64,
    control_n: u64,
    treatment_count: u64,
    treatment_n: u64,
) -> Result<(), SimulationError> {
    if control_n == 0 || treatment_n == 0 {
        return Err(SimulationError::InvalidConfiguration(
            "group sizes must be positive".to_string(),
        ));
    }
    if control_count > control_n || treatment_count > treatment_n {
        return Err(SimulationError::InvalidConfiguration(
            "positive counts cannot exceed group sizes".to_string(),
        ));
    }
    Ok(())
}

/// Pooled-variance z-test on two binomial proportions.
pub fn conversion_ztest(
    control_count: u64,
    control_n: u64,
    treatment_count: u64,
    treatment_n: u64,
    alternative: Alternative,
) -> Result<f64, SimulationError> {
    validate_counts(control_count, control_n, treatment_count, treatment_n)?;

    let (n1, n2) = (control_n as f64, treatment_n as f64);
    let diff = control_count as f64 / n1 - treatment_count as f64 / n2;
    let p_pooled = (control_count + treatment_count) as f64 / (n1 + n2);
    let std_diff = (p_pooled * (1.0 - p_pooled) * (1.0 / n1 + 1.0 / n2)).sqrt();
    if !(std_diff > 0.0) {
        return Err(SimulationError::InsufficientData(
            "pooled proportion variance is zero, z-statistic undefined".to_string(),
        ));
    }
    let z = diff / std_diff;

    let normal = standard_normal()?;
    let p_value = match alternative {
        Alternative::Less => normal.cdf(z),
        Alternative::Greater => 1.0 - normal.cdf(z),
        Alternative::TwoSided => 2.0 * (1.0 - normal.cdf(z.abs())),
    };
    Ok(p_value)
}

/// Chi-square test on the 2x2 conversion contingency table.
///
/// The approximation breaks down on sparse tables, so any observed or
/// expected cell below 5 aborts with `InsufficientData`.
pub fn chi_square_test(
    control_count: u64,
    control_n: u64,
    treatment_count: u64,
    treatment_n: u64,
) -> Result<f64, SimulationError> {
    validate_counts(control_count, control_n, treatment_count, treatment_n)?;

    let (n1, n2) = (control_n as f64, treatment_n as f64);
    let (x1, x2) = (control_count as f64, treatment_count as f64);

    let p_pooled = (x1 + x2) / (n1 + n2);
    let expected = [
        n1 * p_pooled,
        n1 * (1.0 - p_pooled),
        n2 * p_pooled,
        n2 * (1.0 - p_pooled),
    ];
    let observed = [x1, n1 - x1, x2, n2 - x2];

    for cell in observed.iter().chain(&expected) {
        if *cell < CHI_SQUARE_MIN_CELL {
            return Err(SimulationError::InsufficientData(format!(
                "chi-square cell count {cell:.1} is below {CHI_SQUARE_MIN_CELL}"
            )));
        }
    }

    let statistic: f64 = observed
        .iter()
        .zip(&expected)
        .map(|(o, e)| (o - e).powi(2) / e)
        .sum();

    let dist = ChiSquared::new(1.0)
        .map_err(|e| SimulationError::Numeric(format!("chi-square distribution: {e}")))?;
    Ok(1.0 - dist.cdf(statistic))
}

/// Probability that `Beta(a1, b1)` exceeds `Beta(a2, b2)`.
///
/// Closed form built from the log-gamma recursion over the second
/// distribution's beta parameter; exact for integer parameters.
pub fn compare_beta_distributions(a1: u64, b1: u64, a2: u64, b2: u64) -> f64 {
    let (a1, b1, a2) = (a1 as f64, b1 as f64, a2 as f64);

    let ap = (ln_gamma(a1 + b1) + ln_gamma(a1 + a2) - (ln_gamma(a1 + b1 + a2) + ln_gamma(a1)))
        .exp();

    let mut s = 0.0;
    let mut b2 = b2 as f64;
    while b2 > 1.0 {
        b2 -= 1.0;
        let num = ln_gamma(a1 + a2) + ln_gamma(b1 + b2) + ln_gamma(a1 + b1) + ln_gamma(a2 + b2);
        let den = ln_gamma(a1)
            + ln_gamma(b1)
            + ln_gamma(a2)
            + ln_gamma(b2)
            + ln_gamma(a1 + b1 + a2 + b2);
        s += (num - den).exp() / b2;
    }

    ap + s
}

/// Bayesian comparison of two conversion rates via their Beta posteriors.
///
/// Returns the posterior probability that the data are consistent with
/// the null, i.e. small values support the alternative: for `less`,
/// 1 - P(treatment > control); for `greater`, 1 - P(control > treatment);
/// for `two-sided`, twice the smaller of the two.
pub fn bayesian_test(
    control_count: u64,
    control_n: u64,
    treatment_count: u64,
    treatment_n: u64,
    alternative: Alternative,
    prior_positives: u64,
    prior_negatives: u64,
) -> Result<f64, SimulationError> {
    validate_counts(control_count, control_n, treatment_count, treatment_n)?;
    if prior_positives == 0 || prior_negatives == 0 {
        return Err(SimulationError::InvalidConfiguration(
            "bayesian priors must be positive integers".to_string(),
        ));
    }

    let a_control = control_count + prior_positives;
    let b_control = control_n - control_count + prior_negatives;
    let a_treatment = treatment_count + prior_positives;
    let b_treatment = treatment_n - treatment_count + prior_negatives;

    let treatment_better =
        compare_beta_distributions(a_treatment, b_treatment, a_control, b_control);

    let p_value = match alternative {
        Alternative::Less => 1.0 - treatment_better,
        Alternative::Greater => treatment_better,
        Alternative::TwoSided => 2.0 * treatment_better.min(1.0 - treatment_better),
    };
    Ok(p_value.clamp(0.0, 1.0))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ztest_equal_proportions() {
        let p = conversion_ztest(100, 1000, 100, 1000, Alternative::TwoSided).unwrap();
        assert!((p - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_ztest_detects_clear_difference() {
        let p = conversion_ztest(100, 1000, 200, 1000, Alternative::TwoSided).unwrap();
        assert!(p < 1e-6);

        // Control conversion below treatment supports 'less'.
        let p_less = conversion_ztest(100, 1000, 200, 1000, Alternative::Less).unwrap();
        assert!(p_less < 1e-6);
        let p_greater = conversion_ztest(100, 1000, 200, 1000, Alternative::Greater).unwrap();
        assert!(p_greater > 0.999);
    }

    #[test]
    fn test_ztest_rejects_impossible_counts() {
        assert!(conversion_ztest(10, 5, 1, 5, Alternative::TwoSided).is_err());
        assert!(conversion_ztest(1, 0, 1, 5, Alternative::TwoSided).is_err());
    }

    #[test]
    fn test_chi_square_matches_ztest_squared() {
        // For a 2x2 table the chi-square statistic is the squared z, so
        // the two-sided p-values agree.
        let p_chi = chi_square_test(100, 1000, 150, 1000).unwrap();
        let p_z = conversion_ztest(100, 1000, 150, 1000, Alternative::TwoSided).unwrap();
        assert!((p_chi - p_z).abs() < 1e-9, "{p_chi} vs {p_z}");
    }

    #[test]
    fn test_chi_square_sparse_cells_rejected() {
        let err = chi_square_test(2, 5, 2, 5).unwrap_err();
        assert!(matches!(err, SimulationError::InsufficientData(_)));
    }

    #[test]
    fn test_compare_beta_uniform_vs_skewed() {
        // Beta(2,1) (density 2x) against the uniform Beta(1,1):
        // P(X > U) = 2/3 exactly.
        let p = compare_beta_distributions(2, 1, 1, 1);
        assert!((p - 2.0 / 3.0).abs() < 1e-9);

        // Symmetric case.
        let p = compare_beta_distributions(1, 1, 1, 1);
        assert!((p - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_bayesian_equal_counts_is_null() {
        let p = bayesian_test(50, 250, 50, 250, Alternative::TwoSided, 1, 1).unwrap();
        assert!(p > 0.95, "p = {p}");
    }

    #[test]
    fn test_bayesian_detects_clear_difference() {
        let p = bayesian_test(20, 100, 80, 100, Alternative::Less, 1, 1).unwrap();
        assert!(p < 1e-6, "p = {p}");

        let p = bayesian_test(20, 100, 80, 100, Alternative::Greater, 1, 1).unwrap();
        assert!(p > 0.999, "p = {p}");
    }

    #[test]
    fn test_bayesian_priors_validated() {
        assert!(bayesian_test(5, 10, 5, 10, Alternative::TwoSided, 0, 1).is_err());
    }
}
