//! Test-design estimators for continuous metrics: sample size, minimal
//! detectable effect and the design confidence interval around a mean.

use statrs::distribution::ContinuousCDF;

use crate::config::Alternative;
use crate::engine::standard_normal;
use crate::errors::SimulationError;

fn design_z(alpha: f64, power: f64, alternative: Alternative) -> Result<f64, SimulationError> {
    let alpha = match alternative {
        Alternative::TwoSided => alpha / 2.0,
        Alternative::Less | Alternative::Greater => alpha,
    };
    let normal = standard_normal()?;
    Ok(normal.inverse_cdf(1.0 - alpha) + normal.inverse_cdf(power))
}

/// Sample size per group needed for a t-test to detect `mde` on a
/// variable with standard deviation `std`.
pub fn estimate_sample_size_by_mde(
    std: f64,
    alpha: f64,
    power: f64,
    mde: f64,
    alternative: Alternative,
) -> Result<usize, SimulationError> {
    if std <= 0.0 {
        return Err(SimulationError::InvalidConfiguration(format!(
            "standard deviation must be positive, got {std}"
        )));
    }
    if mde == 0.0 {
        return Err(SimulationError::InvalidConfiguration(
            "mde must be non-zero".to_string(),
        ));
    }
    let z = design_z(alpha, power, alternative)?;
    let size = 2.0 * (std * z / mde).powi(2);

    Ok(size.round() as usize + 1)
}

/// Minimal detectable effect given a per-group sample size.
pub fn estimate_mde_by_sample_size(
    std: f64,
    alpha: f64,
    power: f64,
    sample_size: usize,
    alternative: Alternative,
) -> Result<f64, SimulationError> {
    if std <= 0.0 {
        return Err(SimulationError::InvalidConfiguration(format!(
            "standard deviation must be positive, got {std}"
        )));
    }
    if sample_size == 0 {
        return Err(SimulationError::InvalidConfiguration(
            "sample_size must be a positive integer".to_string(),
        ));
    }
    let z = design_z(alpha, power, alternative)?;

    Ok(std * z / (sample_size as f64 / 2.0).sqrt())
}

/// Design confidence interval around a sample mean at the given alpha and
/// power: `mean -/+ z * std / sqrt(n)`.
pub fn estimate_confidence_interval(
    mean: f64,
    std: f64,
    sample_size: usize,
    alpha: f64,
    power: f64,
    alternative: Alternative,
) -> Result<(f64, f64), SimulationError> {
    if sample_size == 0 {
        return Err(SimulationError::InvalidConfiguration(
            "sample_size must be a positive integer".to_string(),
        ));
    }
    let z = design_z(alpha, power, alternative)?;
    let se = z * std / (sample_size as f64).sqrt();

    Ok((mean - se, mean + se))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sample_size_for_t_test() {
        // std = 3, mde = 2, alpha = 0.05, power = 0.8, two-sided:
        // 2 * (3 * 2.8016 / 2)^2 rounds to 35, plus one.
        let n = estimate_sample_size_by_mde(3.0, 0.05, 0.8, 2.0, Alternative::TwoSided).unwrap();
        assert_eq!(n, 36);
    }

    #[test]
    fn test_one_sided_needs_fewer_samples() {
        let two = estimate_sample_size_by_mde(3.0, 0.05, 0.8, 2.0, Alternative::TwoSided).unwrap();
        let one = estimate_sample_size_by_mde(3.0, 0.05, 0.8, 2.0, Alternative::Less).unwrap();
        assert!(one < two, "one-sided {one} vs two-sided {two}");
    }

    #[test]
    fn test_mde_for_sample_size() {
        let mde =
            estimate_mde_by_sample_size(3.0, 0.05, 0.8, 36, Alternative::TwoSided).unwrap();
        assert!((mde - 1.981).abs() < 0.01, "mde = {mde}");
    }

    #[test]
    fn test_confidence_interval_brackets_mean() {
        let (low, high) =
            estimate_confidence_interval(10.0, 3.0, 36, 0.05, 0.8, Alternative::TwoSided).unwrap();
        assert!(low < 10.0 && 10.0 < high);
        assert!(((high - low) / 2.0 - 2.8016 * 3.0 / 6.0).abs() < 0.01);
    }

    #[test]
    fn test_degenerate_inputs_rejected() {
        assert!(estimate_sample_size_by_mde(0.0, 0.05, 0.8, 2.0, Alternative::TwoSided).is_err());
        assert!(estimate_sample_size_by_mde(3.0, 0.05, 0.8, 0.0, Alternative::TwoSided).is_err());
        assert!(estimate_mde_by_sample_size(3.0, 0.05, 0.8, 0, Alternative::TwoSided).is_err());
    }
}
