//! Shared configuration types: alternative hypothesis and group allocation.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::errors::SimulationError;

/// Default alpha level for A/B tests.
pub const DEFAULT_ALPHA_LEVEL: f64 = 0.05;

/// Default target power for A/B tests.
pub const DEFAULT_POWER: f64 = 0.8;

/// Alpha level for the confidence intervals the engine computes over its
/// own empirical alpha/power estimates.
pub const META_CI_ALPHA: f64 = 0.05;

/// Alternative hypothesis direction.
///
/// * `TwoSided`: means/conversions are equal;
/// * `Less`: the control mean is less than the treatment mean;
/// * `Greater`: the control mean is greater than the treatment mean.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Alternative {
    Less,
    Greater,
    #[serde(rename = "two-sided")]
    TwoSided,
}

impl Alternative {
    pub fn as_str(&self) -> &'static str {
        match self {
            Alternative::Less => "less",
            Alternative::Greater => "greater",
            Alternative::TwoSided => "two-sided",
        }
    }
}

impl fmt::Display for Alternative {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Alternative {
    type Err = SimulationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "less" => Ok(Alternative::Less),
            "greater" => Ok(Alternative::Greater),
            "two-sided" => Ok(Alternative::TwoSided),
            other => Err(SimulationError::InvalidConfiguration(format!(
                "alternative must be 'less', 'greater' or 'two-sided', got '{other}'"
            ))),
        }
    }
}

/// Control/treatment group sizing.
///
/// Two sizing modes exist in the wild: a single symmetric sample size, and
/// an asymmetric allocation where the control size is either given
/// directly or derived from the treatment size and a split proportion.
/// All three are exposed explicitly.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum Allocation {
    /// Same size for control and treatment.
    Balanced { sample_size: usize },
    /// Treatment size plus the share of traffic sent to treatment;
    /// control size is derived as `treatment_size * (1 - split) / split`,
    /// rounded to the nearest integer.
    Split { treatment_size: usize, split: f64 },
    /// Both sizes given directly.
    Explicit {
        control_size: usize,
        treatment_size: usize,
    },
}

impl Allocation {
    pub fn balanced(sample_size: usize) -> Self {
        Allocation::Balanced { sample_size }
    }

    pub fn split(treatment_size: usize, split: f64) -> Self {
        Allocation::Split {
            treatment_size,
            split,
        }
    }

    pub fn explicit(control_size: usize, treatment_size: usize) -> Self {
        Allocation::Explicit {
            control_size,
            treatment_size,
        }
    }

    /// Resolve to (control_size, treatment_size), validating positivity
    /// and the split range.
    pub fn group_sizes(&self) -> Result<(usize, usize), SimulationError> {
        match *self {
            Allocation::Balanced { sample_size } => {
                if sample_size == 0 {
                    return Err(SimulationError::InvalidConfiguration(
                        "sample_size must be a positive integer".to_string(),
                    ));
                }
                Ok((sample_size, sample_size))
            }
            Allocation::Split {
                treatment_size,
                split,
            } => {
                if treatment_size == 0 {
                    return Err(SimulationError::InvalidConfiguration(
                        "treatment_size must be a positive integer".to_string(),
                    ));
                }
                if !(split > 0.0 && split < 1.0) {
                    return Err(SimulationError::InvalidConfiguration(format!(
                        "split proportion must be in (0, 1), got {split}"
                    )));
                }
                let control_size = (treatment_size as f64 * (1.0 - split) / split).round() as usize;
                if control_size == 0 {
                    return Err(SimulationError::InvalidConfiguration(format!(
                        "derived control size rounds to zero \
                         (treatment_size={treatment_size}, split={split})"
                    )));
                }
                Ok((control_size, treatment_size))
            }
            Allocation::Explicit {
                control_size,
                treatment_size,
            } => {
                if control_size == 0 || treatment_size == 0 {
                    return Err(SimulationError::InvalidConfiguration(
                        "control and treatment sizes must be positive integers".to_string(),
                    ));
                }
                Ok((control_size, treatment_size))
            }
        }
    }
}

/// Check that an alpha level lies in (0, 1).
pub(crate) fn validate_alpha(alpha: f64) -> Result<(), SimulationError> {
    if alpha > 0.0 && alpha < 1.0 {
        Ok(())
    } else {
        Err(SimulationError::InvalidConfiguration(format!(
            "alpha level must be in (0, 1), got {alpha}"
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_alternative_wire_names() {
        assert_eq!(
            serde_json::to_string(&Alternative::TwoSided).unwrap(),
            "\"two-sided\""
        );
        assert_eq!(
            serde_json::from_str::<Alternative>("\"less\"").unwrap(),
            Alternative::Less
        );
        assert_eq!("greater".parse::<Alternative>().unwrap(), Alternative::Greater);
        assert!("both".parse::<Alternative>().is_err());
    }

    #[test]
    fn test_balanced_allocation() {
        assert_eq!(Allocation::balanced(36).group_sizes().unwrap(), (36, 36));
        assert!(Allocation::balanced(0).group_sizes().is_err());
    }

    #[test]
    fn test_split_allocation_derives_control() {
        // 100 treated at a 20% split -> 400 control.
        let (control, treatment) = Allocation::split(100, 0.2).group_sizes().unwrap();
        assert_eq!(control, 400);
        assert_eq!(treatment, 100);

        // 50/50 split matches balanced sizing.
        assert_eq!(Allocation::split(36, 0.5).group_sizes().unwrap(), (36, 36));
    }

    #[test]
    fn test_split_bounds() {
        assert!(Allocation::split(100, 0.0).group_sizes().is_err());
        assert!(Allocation::split(100, 1.0).group_sizes().is_err());
        // Control rounds to zero when nearly all traffic is treated.
        assert!(Allocation::split(1, 0.9).group_sizes().is_err());
    }

    #[test]
    fn test_alpha_validation() {
        assert!(validate_alpha(0.05).is_ok());
        assert!(validate_alpha(0.0).is_err());
        assert!(validate_alpha(1.0).is_err());
    }
}
