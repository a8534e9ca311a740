//! AA/AB simulation for continuous metrics.
//!
//! Resamples control and treatment groups from a primary variable,
//! injects a synthetic effect into the treatment group, runs the
//! configured statistical procedures and aggregates empirical alpha and
//! power. Paired procedures look auxiliary series up by the drawn keys,
//! so rows stay aligned; the null and effect passes of one trial redraw
//! their groups independently.
//!
//! # Example
//!
//! ```ignore
//! let report = ContinuousSimulation::builder(variable)
//!     .with_procedures(["ttest", "diff_ttest"])
//!     .with_allocation(Allocation::balanced(36))
//!     .with_experiments_num(200)
//!     .with_mde(2.0)
//!     .with_previous_values(previous)
//!     .with_seed(42)
//!     .build()?
//!     .run()?;
//! println!("{report}");
//! ```

use crate::config::{
    validate_alpha, Allocation, Alternative, DEFAULT_ALPHA_LEVEL, DEFAULT_POWER,
};
use crate::continuous::stattests::{
    additional_vars_regression_test, cuped_ttest, did_regression_test, difference_ttest,
    regression_test, ttest, AuxSample,
};
use crate::engine::simulate_procedure;
use crate::errors::SimulationError;
use crate::registry::ProcedureRegistry;
use crate::report::SimulationReport;
use crate::sampling::{inject_effect, Sampler};
use crate::series::Series;

/// Statistical procedures available for continuous metrics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContinuousProcedure {
    TTest,
    DifferenceTTest,
    CupedTTest,
    RegressionTest,
    DidRegressionTest,
    AdditionalVarsRegressionTest,
}

impl ContinuousProcedure {
    /// Canonical registry name.
    pub fn name(&self) -> &'static str {
        match self {
            Self::TTest => "ttest",
            Self::DifferenceTTest => "diff_ttest",
            Self::CupedTTest => "cuped_ttest",
            Self::RegressionTest => "regression_test",
            Self::DidRegressionTest => "did_regression_test",
            Self::AdditionalVarsRegressionTest => "additional_vars_regression_test",
        }
    }

    pub const ALL: [ContinuousProcedure; 6] = [
        Self::TTest,
        Self::DifferenceTTest,
        Self::CupedTTest,
        Self::RegressionTest,
        Self::DidRegressionTest,
        Self::AdditionalVarsRegressionTest,
    ];

    /// Registry with every procedure under its canonical name.
    pub fn default_registry() -> ProcedureRegistry<Self> {
        let mut registry = ProcedureRegistry::new();
        for procedure in Self::ALL {
            registry.register(procedure.name(), procedure);
        }
        registry
    }
}

/// Simulation of AA and AB tests for a continuous variable.
#[derive(Debug)]
pub struct ContinuousSimulation {
    variable: Series,
    alternative: Alternative,
    procedures: Vec<String>,
    allocation: Allocation,
    experiments_num: usize,
    mde: f64,
    alpha_level: f64,
    target_power: f64,
    seed: Option<u64>,
    previous_values: Option<Series>,
    cuped_covariate: Option<Series>,
    additional_vars: Vec<Series>,
    registry: ProcedureRegistry<ContinuousProcedure>,
}

impl ContinuousSimulation {
    pub fn builder(variable: Series) -> ContinuousSimulationBuilder {
        ContinuousSimulationBuilder::new(variable)
    }

    /// Registry used to resolve procedure names; exposed so callers can
    /// register aliases before running.
    pub fn registry_mut(&mut self) -> &mut ProcedureRegistry<ContinuousProcedure> {
        &mut self.registry
    }

    /// Run every configured procedure and aggregate the results.
    ///
    /// Unknown procedure names and missing auxiliary series fail here,
    /// before any trial executes. Re-running produces a fresh report; a
    /// fixed seed reproduces identical p-value sequences.
    pub fn run(&self) -> Result<SimulationReport, SimulationError> {
        let (control_size, treatment_size) = self.allocation.group_sizes()?;

        // Fail fast: resolve all names and check auxiliary coverage
        // before the first trial.
        let mut resolved = Vec::with_capacity(self.procedures.len());
        for name in &self.procedures {
            let procedure = self.registry.resolve(name)?;
            self.check_auxiliary(name, procedure)?;
            resolved.push((name.as_str(), procedure));
        }

        let mut sampler = Sampler::new(self.seed);
        let mut report = SimulationReport::new(self.alpha_level, self.target_power);

        for (name, procedure) in resolved {
            let result = simulate_procedure(
                name,
                self.experiments_num,
                self.alpha_level,
                self.mde,
                |effect| {
                    self.run_pass(procedure, &mut sampler, control_size, treatment_size, effect)
                },
            )?;
            report.insert(name, result);
        }

        Ok(report)
    }

    fn check_auxiliary(
        &self,
        name: &str,
        procedure: ContinuousProcedure,
    ) -> Result<(), SimulationError> {
        let missing = |kind| {
            Err(SimulationError::MissingAuxiliary {
                procedure: name.to_string(),
                kind,
            })
        };
        match procedure {
            ContinuousProcedure::DifferenceTTest | ContinuousProcedure::DidRegressionTest
                if self.previous_values.is_none() =>
            {
                missing("previous-period values")
            }
            ContinuousProcedure::CupedTTest if self.cuped_covariate.is_none() => {
                missing("a CUPED covariate")
            }
            ContinuousProcedure::AdditionalVarsRegressionTest
                if self.additional_vars.is_empty() =>
            {
                missing("additional variables")
            }
            _ => Ok(()),
        }
    }

    fn previous_values(&self, name: &str) -> Result<&Series, SimulationError> {
        self.previous_values
            .as_ref()
            .ok_or(SimulationError::MissingAuxiliary {
                procedure: name.to_string(),
                kind: "previous-period values",
            })
    }

    /// One pass: draw fresh control/treatment groups, inject the effect
    /// and run the procedure.
    fn run_pass(
        &self,
        procedure: ContinuousProcedure,
        sampler: &mut Sampler,
        control_size: usize,
        treatment_size: usize,
        effect: f64,
    ) -> Result<f64, SimulationError> {
        let control_keys = sampler.draw_keys(&self.variable, control_size)?;
        let treatment_keys = sampler.draw_keys(&self.variable, treatment_size)?;

        let control = self.variable.values_at(&control_keys)?;
        let mut treatment = self.variable.values_at(&treatment_keys)?;
        inject_effect(&mut treatment, effect);

        match procedure {
            ContinuousProcedure::TTest => ttest(&control, &treatment, self.alternative),
            ContinuousProcedure::RegressionTest => {
                regression_test(&control, &treatment, self.alternative)
            }
            ContinuousProcedure::DifferenceTTest => {
                let previous = self.previous_values(procedure.name())?;
                let control_pre = previous.values_at(&control_keys)?;
                let treatment_pre = previous.values_at(&treatment_keys)?;
                difference_ttest(
                    &control,
                    &control_pre,
                    &treatment,
                    &treatment_pre,
                    self.alternative,
                )
            }
            ContinuousProcedure::DidRegressionTest => {
                let previous = self.previous_values(procedure.name())?;
                let control_pre = previous.values_at(&control_keys)?;
                let treatment_pre = previous.values_at(&treatment_keys)?;
                did_regression_test(
                    &control,
                    &control_pre,
                    &treatment,
                    &treatment_pre,
                    self.alternative,
                )
            }
            ContinuousProcedure::CupedTTest => {
                let covariate =
                    self.cuped_covariate
                        .as_ref()
                        .ok_or(SimulationError::MissingAuxiliary {
                            procedure: procedure.name().to_string(),
                            kind: "a CUPED covariate",
                        })?;
                let control_covariate = covariate.values_at(&control_keys)?;
                let treatment_covariate = covariate.values_at(&treatment_keys)?;
                cuped_ttest(
                    &control,
                    &control_covariate,
                    &treatment,
                    &treatment_covariate,
                    self.alternative,
                )
            }
            ContinuousProcedure::AdditionalVarsRegressionTest => {
                let mut control_vars = Vec::with_capacity(self.additional_vars.len());
                let mut treatment_vars = Vec::with_capacity(self.additional_vars.len());
                for series in &self.additional_vars {
                    control_vars.push(AuxSample::new(
                        series.name(),
                        series.values_at(&control_keys)?,
                    ));
                    treatment_vars.push(AuxSample::new(
                        series.name(),
                        series.values_at(&treatment_keys)?,
                    ));
                }
                additional_vars_regression_test(
                    &control,
                    &control_vars,
                    &treatment,
                    &treatment_vars,
                    self.alternative,
                )
            }
        }
    }
}

/// Builder for [`ContinuousSimulation`].
pub struct ContinuousSimulationBuilder {
    variable: Series,
    alternative: Alternative,
    procedures: Vec<String>,
    allocation: Allocation,
    experiments_num: usize,
    mde: f64,
    alpha_level: f64,
    target_power: f64,
    seed: Option<u64>,
    previous_values: Option<Series>,
    cuped_covariate: Option<Series>,
    additional_vars: Vec<Series>,
}

impl ContinuousSimulationBuilder {
    pub fn new(variable: Series) -> Self {
        Self {
            variable,
            alternative: Alternative::TwoSided,
            procedures: Vec::new(),
            allocation: Allocation::balanced(0),
            experiments_num: 0,
            mde: 0.0,
            alpha_level: DEFAULT_ALPHA_LEVEL,
            target_power: DEFAULT_POWER,
            seed: None,
            previous_values: None,
            cuped_covariate: None,
            additional_vars: Vec::new(),
        }
    }

    pub fn with_alternative(mut self, alternative: Alternative) -> Self {
        self.alternative = alternative;
        self
    }

    pub fn with_procedures<I, S>(mut self, procedures: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.procedures = procedures.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_allocation(mut self, allocation: Allocation) -> Self {
        self.allocation = allocation;
        self
    }

    pub fn with_experiments_num(mut self, experiments_num: usize) -> Self {
        self.experiments_num = experiments_num;
        self
    }

    /// Minimal detectable effect added to the treatment group in the
    /// effect pass.
    pub fn with_mde(mut self, mde: f64) -> Self {
        self.mde = mde;
        self
    }

    pub fn with_alpha_level(mut self, alpha_level: f64) -> Self {
        self.alpha_level = alpha_level;
        self
    }

    pub fn with_target_power(mut self, target_power: f64) -> Self {
        self.target_power = target_power;
        self
    }

    /// Fixed RNG seed for reproducible p-value sequences.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn with_previous_values(mut self, previous_values: Series) -> Self {
        self.previous_values = Some(previous_values);
        self
    }

    pub fn with_cuped_covariate(mut self, cuped_covariate: Series) -> Self {
        self.cuped_covariate = Some(cuped_covariate);
        self
    }

    pub fn with_additional_var(mut self, additional_var: Series) -> Self {
        self.additional_vars.push(additional_var);
        self
    }

    pub fn build(self) -> Result<ContinuousSimulation, SimulationError> {
        validate_alpha(self.alpha_level)?;
        if !(self.target_power > 0.0 && self.target_power < 1.0) {
            return Err(SimulationError::InvalidConfiguration(format!(
                "target power must be in (0, 1), got {}",
                self.target_power
            )));
        }
        if self.experiments_num == 0 {
            return Err(SimulationError::InvalidConfiguration(
                "experiments_num must be a positive integer".to_string(),
            ));
        }
        if !self.mde.is_finite() {
            return Err(SimulationError::InvalidConfiguration(format!(
                "mde must be finite, got {}",
                self.mde
            )));
        }
        self.allocation.group_sizes()?;
        if self.variable.is_empty() {
            return Err(SimulationError::InvalidConfiguration(
                "primary variable must not be empty".to_string(),
            ));
        }

        Ok(ContinuousSimulation {
            variable: self.variable,
            alternative: self.alternative,
            procedures: self.procedures,
            allocation: self.allocation,
            experiments_num: self.experiments_num,
            mde: self.mde,
            alpha_level: self.alpha_level,
            target_power: self.target_power,
            seed: self.seed,
            previous_values: self.previous_values,
            cuped_covariate: self.cuped_covariate,
            additional_vars: self.additional_vars,
            registry: ContinuousProcedure::default_registry(),
        })
    }
}
