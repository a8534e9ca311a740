//! Simulation and statistical procedures for binary (conversion) metrics.

pub mod simulation;
pub mod sizing;
pub mod stattests;

pub use simulation::{DiscreteProcedure, DiscreteSimulation, DiscreteSimulationBuilder};
