// Copyright 2026 QubitOS Contributors
// SPDX-License-Identifier: Apache-2.0

//! Solver registry.
//!
//! Maps solver names to implementations so a run can select its solver
//! by name. Additional solvers can be registered at runtime.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::{debug, info, warn};

use super::{McSolver, MeSolver, Solver, SolverKind};
use crate::config::SolverConfig;
use crate::error::{Error, Result, SolverError};

/// Thread-safe solver registry.
///
/// # Example
///
/// ```ignore
/// use qubit_os_processor::config::Config;
/// use qubit_os_processor::solver::SolverRegistry;
///
/// let config = Config::default();
/// let registry = SolverRegistry::with_defaults(&config.solver);
/// let solver = registry.get("mesolve")?;
/// ```
pub struct SolverRegistry {
    solvers: RwLock<HashMap<String, Arc<dyn Solver>>>,
    default_solver: RwLock<Option<String>>,
}

impl SolverRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self {
            solvers: RwLock::new(HashMap::new()),
            default_solver: RwLock::new(None),
        }
    }

    /// A registry holding `mesolve` and `mcsolve`, configured from `config`.
    ///
    /// The configured default is used when it names a registered solver;
    /// otherwise `mesolve` stays the default.
    pub fn with_defaults(config: &SolverConfig) -> Self {
        let registry = Self::new();
        registry.register(Arc::new(MeSolver::new(config.substeps)));
        registry.register(Arc::new(McSolver::new(
            config.ntraj,
            config.substeps,
            config.seed,
        )));
        if let Err(e) = registry.set_default(&config.default_solver) {
            warn!(
                solver = %config.default_solver,
                error = %e,
                "Configured default solver is not registered, keeping mesolve"
            );
        }
        registry
    }

    /// Register a solver, replacing any solver of the same name.
    pub fn register(&self, solver: Arc<dyn Solver>) {
        let name = solver.name().to_string();
        info!(solver = %name, kind = %solver.kind(), "Registering solver");

        let mut solvers = self.solvers.write();
        solvers.insert(name.clone(), solver);

        let mut default = self.default_solver.write();
        if default.is_none() {
            debug!(solver = %name, "Setting as default solver");
            *default = Some(name);
        }
    }

    pub fn set_default(&self, name: &str) -> Result<()> {
        let solvers = self.solvers.read();
        if !solvers.contains_key(name) {
            return Err(Error::Solver(SolverError::NotFound(name.to_string())));
        }

        let mut default = self.default_solver.write();
        *default = Some(name.to_string());
        debug!(solver = %name, "Set as default solver");
        Ok(())
    }

    pub fn get(&self, name: &str) -> Result<Arc<dyn Solver>> {
        let solvers = self.solvers.read();
        solvers
            .get(name)
            .cloned()
            .ok_or_else(|| Error::Solver(SolverError::NotFound(name.to_string())))
    }

    pub fn get_default(&self) -> Result<Arc<dyn Solver>> {
        let default = self.default_solver.read();
        match default.as_ref() {
            Some(name) => self.get(name),
            None => Err(Error::Solver(SolverError::NotFound(
                "No default solver configured".to_string(),
            ))),
        }
    }

    /// Look up `name`, or the default solver if `name` is None.
    pub fn get_or_default(&self, name: Option<&str>) -> Result<Arc<dyn Solver>> {
        match name {
            Some(n) => self.get(n),
            None => self.get_default(),
        }
    }

    /// Registered names, sorted.
    pub fn list(&self) -> Vec<String> {
        let solvers = self.solvers.read();
        let mut names: Vec<String> = solvers.keys().cloned().collect();
        names.sort();
        names
    }

    pub fn list_with_kinds(&self) -> Vec<(String, SolverKind)> {
        let solvers = self.solvers.read();
        let mut out: Vec<(String, SolverKind)> = solvers
            .iter()
            .map(|(name, solver)| (name.clone(), solver.kind()))
            .collect();
        out.sort_by(|a, b| a.0.cmp(&b.0));
        out
    }

    pub fn contains(&self, name: &str) -> bool {
        self.solvers.read().contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.solvers.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn unregister(&self, name: &str) -> Option<Arc<dyn Solver>> {
        let mut solvers = self.solvers.write();
        let removed = solvers.remove(name);

        if removed.is_some() {
            info!(solver = %name, "Unregistered solver");

            let mut default = self.default_solver.write();
            if default.as_deref() == Some(name) {
                warn!(solver = %name, "Unregistered default solver");
                *default = None;
            }
        }

        removed
    }

    pub fn default_solver_name(&self) -> Option<String> {
        self.default_solver.read().clone()
    }
}

impl fmt::Debug for SolverRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SolverRegistry")
            .field("solvers", &self.list())
            .field("default", &self.default_solver_name())
            .finish()
    }
}

impl Default for SolverRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::MockSolver;

    #[test]
    fn test_registry_register_and_get() {
        let registry = SolverRegistry::default();
        registry.register(MockSolver::deterministic("test"));

        assert!(registry.contains("test"));
        assert!(!registry.is_empty());
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.get("test").unwrap().name(), "test");
    }

    #[test]
    fn test_registry_default_solver() {
        let registry = SolverRegistry::default();
        registry.register(MockSolver::deterministic("first"));
        assert_eq!(registry.default_solver_name(), Some("first".to_string()));

        registry.register(MockSolver::stochastic("second"));
        assert_eq!(registry.default_solver_name(), Some("first".to_string()));

        registry.set_default("second").unwrap();
        assert_eq!(registry.default_solver_name(), Some("second".to_string()));
        assert!(registry.set_default("missing").is_err());
    }

    #[test]
    fn test_registry_unknown_name() {
        let registry = SolverRegistry::default();
        assert!(matches!(
            registry.get("sesolve"),
            Err(Error::Solver(SolverError::NotFound(_)))
        ));
        assert!(registry.get_or_default(None).is_err());
    }

    #[test]
    fn test_registry_unregister_default() {
        let registry = SolverRegistry::default();
        registry.register(MockSolver::deterministic("test"));

        assert!(registry.unregister("test").is_some());
        assert!(registry.is_empty());
        assert_eq!(registry.default_solver_name(), None);
        assert!(registry.unregister("test").is_none());
    }

    #[test]
    fn test_with_defaults() {
        let config = SolverConfig::default();
        let registry = SolverRegistry::with_defaults(&config);
        assert_eq!(registry.list(), vec!["mcsolve".to_string(), "mesolve".to_string()]);
        assert_eq!(registry.default_solver_name(), Some("mesolve".to_string()));
        assert_eq!(
            registry.list_with_kinds(),
            vec![
                ("mcsolve".to_string(), SolverKind::Stochastic),
                ("mesolve".to_string(), SolverKind::Deterministic),
            ]
        );
    }

    #[test]
    fn test_with_defaults_honors_configured_default() {
        let config = SolverConfig {
            default_solver: "mcsolve".into(),
            ..SolverConfig::default()
        };
        let registry = SolverRegistry::with_defaults(&config);
        assert_eq!(registry.get_default().unwrap().name(), "mcsolve");

        let config = SolverConfig {
            default_solver: "nonexistent".into(),
            ..SolverConfig::default()
        };
        let registry = SolverRegistry::with_defaults(&config);
        assert_eq!(registry.default_solver_name(), Some("mesolve".to_string()));
    }
}
