//! Name -> procedure lookup.
//!
//! Procedure sets are closed enums; the registry maps the wire names used
//! in configuration to enum variants, so an unknown name fails the run
//! before any trial executes.

use std::collections::HashMap;

use crate::errors::SimulationError;

/// Registry mapping procedure names to procedure variants.
#[derive(Debug, Clone, Default)]
pub struct ProcedureRegistry<P> {
    entries: HashMap<String, P>,
}

impl<P: Copy> ProcedureRegistry<P> {
    pub fn new() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }

    /// Register a procedure under a name. Re-registering a name replaces
    /// the previous entry.
    pub fn register(&mut self, name: impl Into<String>, procedure: P) {
        self.entries.insert(name.into(), procedure);
    }

    /// Look up a procedure by name.
    pub fn resolve(&self, name: &str) -> Result<P, SimulationError> {
        self.entries
            .get(name)
            .copied()
            .ok_or_else(|| SimulationError::UnknownProcedure {
                name: name.to_string(),
                known: self.names(),
            })
    }

    /// Registered names, sorted for deterministic reporting.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.entries.keys().cloned().collect();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    enum Dummy {
        A,
        B,
    }

    #[test]
    fn test_register_and_resolve() {
        let mut registry = ProcedureRegistry::new();
        registry.register("a", Dummy::A);
        registry.register("b", Dummy::B);

        assert_eq!(registry.resolve("a").unwrap(), Dummy::A);
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn test_unknown_name_lists_known() {
        let mut registry = ProcedureRegistry::new();
        registry.register("b", Dummy::B);
        registry.register("a", Dummy::A);

        match registry.resolve("c") {
            Err(SimulationError::UnknownProcedure { name, known }) => {
                assert_eq!(name, "c");
                assert_eq!(known, vec!["a".to_string(), "b".to_string()]);
            }
            other => panic!("expected UnknownProcedure, got {other:?}"),
        }
    }

    #[test]
    fn test_reregister_replaces() {
        let mut registry = ProcedureRegistry::new();
        registry.register("x", Dummy::A);
        registry.register("x", Dummy::B);
        assert_eq!(registry.resolve("x").unwrap(), Dummy::B);
        assert_eq!(registry.len(), 1);
    }
}
