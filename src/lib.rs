//! Monte Carlo design tooling for A/B experiments.
//!
//! Estimates the empirical alpha (false positive rate under a null
//! effect) and empirical power (detection rate under an injected
//! effect) of statistical testing procedures by simulating many AA and
//! AB experiments over a base dataset.
//!
//! ## Features
//!
//! - **Continuous metrics**: t-test, paired difference t-test, CUPED,
//!   and OLS regression procedures (plain, difference-in-differences,
//!   additional covariates) resampled from a [`Series`]
//! - **Binary metrics**: proportions z-test, chi-square test, and a
//!   Bayesian Beta comparison over binomially redrawn conversion counts
//! - **Sample sizing**: analytic sample size and MDE calculators for
//!   both metric kinds
//! - **Reports**: per-procedure alpha and power with binomial
//!   confidence intervals, serializable and displayable
//!
//! ## Example
//!
//! ```rust,ignore
//! use absim::{Allocation, ContinuousSimulation, Series};
//!
//! let variable = Series::from_values("revenue", values);
//! let report = ContinuousSimulation::builder(variable)
//!     .with_procedures(["ttest"])
//!     .with_allocation(Allocation::balanced(36))
//!     .with_experiments_num(1000)
//!     .with_mde(2.0)
//!     .with_seed(42)
//!     .build()?
//!     .run()?;
//! println!("{report}");
//! ```

pub mod config;
pub mod continuous;
pub mod discrete;
mod engine;
pub mod errors;
pub mod registry;
pub mod report;
mod sampling;
pub mod series;

pub use config::{Allocation, Alternative, DEFAULT_ALPHA_LEVEL, DEFAULT_POWER};
pub use continuous::{ContinuousProcedure, ContinuousSimulation, ContinuousSimulationBuilder};
pub use discrete::{DiscreteProcedure, DiscreteSimulation, DiscreteSimulationBuilder};
pub use errors::SimulationError;
pub use registry::ProcedureRegistry;
pub use report::{SimulationReport, TrialResult};
pub use series::Series;
