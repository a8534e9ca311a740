//! Error types for simulation configuration and execution.
//!
//! A run either completes in full for a procedure or stops with one of
//! these errors; there is no per-trial recovery or retry.

/// Errors raised while configuring or running a simulation.
#[derive(Debug, thiserror::Error)]
pub enum SimulationError {
    /// Procedure name not present in the registry. Raised before any
    /// trial executes.
    #[error("unknown procedure '{name}', known procedures: {known:?}")]
    UnknownProcedure { name: String, known: Vec<String> },

    /// Invalid sample size, split proportion, alpha level or effect size.
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// A procedure requires an auxiliary series the caller did not supply.
    #[error("procedure '{procedure}' requires {kind}, but none was supplied")]
    MissingAuxiliary {
        procedure: String,
        kind: &'static str,
    },

    /// An auxiliary series does not cover a key drawn from the primary
    /// variable, breaking row alignment.
    #[error("series '{series}' has no value for key {key}")]
    MissingKey { series: String, key: i64 },

    /// Too little data for the statistic to be defined (degrees of
    /// freedom, contingency cell counts).
    #[error("insufficient data: {0}")]
    InsufficientData(String),

    /// Control and treatment additional-variable name sets differ, or
    /// both are empty.
    #[error(
        "control and treatment additional variables must match and be non-empty: \
         control {control:?}, treatment {treatment:?}"
    )]
    MismatchedAuxiliaryData {
        control: Vec<String>,
        treatment: Vec<String>,
    },

    /// A statistical procedure failed inside the trial loop. Carries the
    /// offending procedure and trial index.
    #[error("procedure '{procedure}' failed at trial {trial}")]
    TrialFailed {
        procedure: String,
        trial: usize,
        #[source]
        source: Box<SimulationError>,
    },

    /// A distribution or numerical routine could not be constructed.
    #[error("numerical routine failed: {0}")]
    Numeric(String),
}

impl SimulationError {
    /// Attach procedure and trial context to an error from the trial loop.
    pub(crate) fn at_trial(self, procedure: &str, trial: usize) -> Self {
        Self::TrialFailed {
            procedure: procedure.to_string(),
            trial,
            source: Box::new(self),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trial_context_preserves_source() {
        let err = SimulationError::InsufficientData("df = 0".to_string());
        let wrapped = err.at_trial("ttest", 17);

        match wrapped {
            SimulationError::TrialFailed {
                procedure, trial, ..
            } => {
                assert_eq!(procedure, "ttest");
                assert_eq!(trial, 17);
            }
            other => panic!("expected TrialFailed, got {other:?}"),
        }
    }

    #[test]
    fn test_error_messages_name_the_series() {
        let err = SimulationError::MissingKey {
            series: "prev".to_string(),
            key: 42,
        };
        let msg = err.to_string();
        assert!(msg.contains("prev"));
        assert!(msg.contains("42"));
    }
}
