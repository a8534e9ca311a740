//! AA/AB simulation for binary metrics.
//!
//! The base dataset is summarized by its positive count and object
//! count; each pass draws fresh binomial conversion counts for control
//! (at the base rate) and treatment (at the base rate plus the injected
//! effect) and runs the configured procedure on them.

use rand_distr::{Binomial, Distribution};

use crate::config::{
    validate_alpha, Allocation, Alternative, DEFAULT_ALPHA_LEVEL, DEFAULT_POWER,
};
use crate::discrete::stattests::{bayesian_test, chi_square_test, conversion_ztest};
use crate::engine::simulate_procedure;
use crate::errors::SimulationError;
use crate::registry::ProcedureRegistry;
use crate::report::SimulationReport;
use crate::sampling::Sampler;

/// Default Beta prior pseudo-counts for the Bayesian procedure.
pub const DEFAULT_BAYESIAN_PRIOR: u64 = 1;

/// Statistical procedures available for binary metrics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiscreteProcedure {
    ConversionZTest,
    ChiSquareTest,
    BayesianTest,
}

impl DiscreteProcedure {
    /// Canonical registry name.
    pub fn name(&self) -> &'static str {
        match self {
            Self::ConversionZTest => "conversion_ztest",
            Self::ChiSquareTest => "chi_square_test",
            Self::BayesianTest => "bayesian_test",
        }
    }

    pub const ALL: [DiscreteProcedure; 3] = [
        Self::ConversionZTest,
        Self::ChiSquareTest,
        Self::BayesianTest,
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

/// Simulation of AA and AB tests for a conversion-style variable.
#[derive(Debug)]
pub struct DiscreteSimulation {
    count: u64,
    objects_num: u64,
    alternative: Alternative,
    procedures: Vec<String>,
    allocation: Allocation,
    experiments_num: usize,
    mde: f64,
    alpha_level: f64,
    target_power: f64,
    seed: Option<u64>,
    prior_positives: u64,
    prior_negatives: u64,
    registry: ProcedureRegistry<DiscreteProcedure>,
}

impl DiscreteSimulation {
    pub fn builder(count: u64, objects_num: u64) -> DiscreteSimulationBuilder {
        DiscreteSimulationBuilder::new(count, objects_num)
    }

    /// Base conversion rate of the dataset.
    pub fn conversion_rate(&self) -> f64 {
        self.count as f64 / self.objects_num as f64
    }

    /// Registry used to resolve procedure names; exposed so callers can
    /// register aliases before running.
    pub fn registry_mut(&mut self) -> &mut ProcedureRegistry<DiscreteProcedure> {
        &mut self.registry
    }

    /// Run every configured procedure and aggregate the results.
    pub fn run(&self) -> Result<SimulationReport, SimulationError> {
        let (control_size, treatment_size) = self.allocation.group_sizes()?;
        let p = self.conversion_rate();

        let mut resolved = Vec::with_capacity(self.procedures.len());
        for name in &self.procedures {
            resolved.push((name.as_str(), self.registry.resolve(name)?));
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
                    self.run_pass(procedure, &mut sampler, control_size, treatment_size, p, effect)
                },
            )?;
            report.insert(name, result);
        }

        Ok(report)
    }

    /// One pass: draw fresh binomial counts for both groups and run the
    /// procedure on them.
    fn run_pass(
        &self,
        procedure: DiscreteProcedure,
        sampler: &mut Sampler,
        control_size: usize,
        treatment_size: usize,
        p: f64,
        effect: f64,
    ) -> Result<f64, SimulationError> {
        let control_count = draw_binomial(sampler, control_size as u64, p)?;
        let treatment_count = draw_binomial(sampler, treatment_size as u64, p + effect)?;

        match procedure {
            DiscreteProcedure::ConversionZTest => conversion_ztest(
                control_count,
                control_size as u64,
                treatment_count,
                treatment_size as u64,
                self.alternative,
            ),
            DiscreteProcedure::ChiSquareTest => chi_square_test(
                control_count,
                control_size as u64,
                treatment_count,
                treatment_size as u64,
            ),
            DiscreteProcedure::BayesianTest => bayesian_test(
                control_count,
                control_size as u64,
                treatment_count,
                treatment_size as u64,
                self.alternative,
                self.prior_positives,
                self.prior_negatives,
            ),
        }
    }
}

fn draw_binomial(sampler: &mut Sampler, n: u64, p: f64) -> Result<u64, SimulationError> {
    let binomial = Binomial::new(n, p)
        .map_err(|e| SimulationError::Numeric(format!("binomial(n={n}, p={p}): {e}")))?;
    Ok(binomial.sample(sampler.rng()))
}

/// Builder for [`DiscreteSimulation`].
pub struct DiscreteSimulationBuilder {
    count: u64,
    objects_num: u64,
    alternative: Alternative,
    procedures: Vec<String>,
    allocation: Allocation,
    experiments_num: usize,
    mde: f64,
    alpha_level: f64,
    target_power: f64,
    seed: Option<u64>,
    prior_positives: u64,
    prior_negatives: u64,
}

impl DiscreteSimulationBuilder {
    pub fn new(count: u64, objects_num: u64) -> Self {
        Self {
            count,
            objects_num,
            alternative: Alternative::TwoSided,
            procedures: Vec::new(),
            allocation: Allocation::balanced(0),
            experiments_num: 0,
            mde: 0.0,
            alpha_level: DEFAULT_ALPHA_LEVEL,
            target_power: DEFAULT_POWER,
            seed: None,
            prior_positives: DEFAULT_BAYESIAN_PRIOR,
            prior_negatives: DEFAULT_BAYESIAN_PRIOR,
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

    /// Minimal detectable effect added to the treatment conversion rate
    /// in the effect pass.
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

    /// Beta prior pseudo-counts for the Bayesian procedure.
    pub fn with_bayesian_priors(mut self, positives: u64, negatives: u64) -> Self {
        self.prior_positives = positives;
        self.prior_negatives = negatives;
        self
    }

    pub fn build(self) -> Result<DiscreteSimulation, SimulationError> {
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
        if self.objects_num == 0 || self.count == 0 || self.count >= self.objects_num {
            return Err(SimulationError::InvalidConfiguration(format!(
                "dataset must have a conversion rate strictly inside (0, 1), \
                 got {} of {}",
                self.count, self.objects_num
            )));
        }
        let p = self.count as f64 / self.objects_num as f64;
        if !(0.0..=1.0).contains(&(p + self.mde)) {
            return Err(SimulationError::InvalidConfiguration(format!(
                "conversion rate with injected effect must stay in [0, 1], \
                 got {}",
                p + self.mde
            )));
        }
        self.allocation.group_sizes()?;

        Ok(DiscreteSimulation {
            count: self.count,
            objects_num: self.objects_num,
            alternative: self.alternative,
            procedures: self.procedures,
            allocation: self.allocation,
            experiments_num: self.experiments_num,
            mde: self.mde,
            alpha_level: self.alpha_level,
            target_power: self.target_power,
            seed: self.seed,
            prior_positives: self.prior_positives,
            prior_negatives: self.prior_negatives,
            registry: DiscreteProcedure::default_registry(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_builder() -> DiscreteSimulationBuilder {
        DiscreteSimulation::builder(400, 2000)
            .with_allocation(Allocation::balanced(500))
            .with_experiments_num(5)
            .with_mde(0.05)
    }

    #[test]
    fn test_conversion_rate() {
        let sim = base_builder().build().unwrap();
        assert!((sim.conversion_rate() - 0.2).abs() < 1e-12);
    }

    #[test]
    fn test_unknown_procedure_fails_before_trials() {
        let sim = base_builder().with_procedures(["ttest"]).build().unwrap();
        assert!(matches!(
            sim.run(),
            Err(SimulationError::UnknownProcedure { .. })
        ));
    }

    #[test]
    fn test_all_procedures_produce_results() {
        let sim = base_builder()
            .with_procedures(DiscreteProcedure::ALL.map(|p| p.name()))
            .with_seed(11)
            .build()
            .unwrap();

        let report = sim.run().unwrap();
        assert_eq!(report.len(), 3);
        for (name, result) in report.iter() {
            assert_eq!(result.null_pvalues.len(), 5, "procedure {name}");
            for p in result.null_pvalues.iter().chain(&result.effect_pvalues) {
                assert!((0.0..=1.0).contains(p), "procedure {name} p = {p}");
            }
        }
    }

    #[test]
    fn test_builder_validation() {
        assert!(DiscreteSimulation::builder(0, 2000)
            .with_allocation(Allocation::balanced(500))
            .with_experiments_num(5)
            .build()
            .is_err());
        assert!(DiscreteSimulation::builder(2000, 2000)
            .with_allocation(Allocation::balanced(500))
            .with_experiments_num(5)
            .build()
            .is_err());
        // Injected effect pushes the rate past 1.
        assert!(base_builder().with_mde(0.9).build().is_err());
        assert!(base_builder().with_experiments_num(0).build().is_err());
    }

    #[test]
    fn test_unbalanced_allocation_runs() {
        let sim = base_builder()
            .with_allocation(Allocation::split(400, 0.2))
            .with_procedures(["conversion_ztest"])
            .with_seed(5)
            .build()
            .unwrap();
        let report = sim.run().unwrap();
        assert_eq!(report.len(), 1);
    }
}
