//! Simulation and statistical procedures for continuous metrics.

pub mod simulation;
pub mod sizing;
pub mod stattests;

pub use simulation::{ContinuousProcedure, ContinuousSimulation, ContinuousSimulationBuilder};
