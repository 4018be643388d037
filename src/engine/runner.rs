//! The run loop.
//!
//! Expands the requested root analyzers, builds the action graph over the
//! loaded units, executes it on a rayon pool, and aggregates every pass's
//! outcome into a [`RunOutcome`] with deterministic ordering.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use rayon::prelude::*;

use crate::analyzer::Registry;
use crate::diag::{self, Diagnostic};
use crate::engine::cache::ActionGraph;
use crate::engine::facts::FactStore;
use crate::engine::pass::{PassStatus, SkipReason};
use crate::error::Result;
use crate::unit::{FrontendError, UnitHandle, UnitId};

/// A pass execution failure, isolated to one (analyzer, unit) pair.
#[derive(Debug, Clone)]
pub struct PassError {
    pub analyzer: String,
    pub unit: UnitId,
    pub message: String,
}

/// A pass that was suppressed rather than executed.
#[derive(Debug, Clone)]
pub struct SkippedPass {
    pub analyzer: String,
    pub unit: UnitId,
    pub reason: SkipReason,
}

/// Aggregated outcome of one run.
pub struct RunOutcome {
    /// All diagnostics, sorted by file path then position.
    pub diagnostics: Vec<Diagnostic>,
    /// Front-end errors surfaced because they suppressed at least one pass.
    pub frontend_errors: Vec<FrontendError>,
    /// Per-pass failures.
    pub errors: Vec<PassError>,
    /// Passes suppressed by front-end errors or missing prerequisites.
    pub skipped: Vec<SkippedPass>,
    /// The run's fact store, for dumping or inspection.
    pub facts: FactStore,
}

impl std::fmt::Debug for RunOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RunOutcome")
            .field("diagnostics", &self.diagnostics)
            .field("frontend_errors", &self.frontend_errors)
            .field("errors", &self.errors)
            .field("skipped", &self.skipped)
            .finish_non_exhaustive()
    }
}

impl RunOutcome {
    /// Exit status for the driver shell: 0 only when the run is clean.
    ///
    /// Skips alone do not fail the run, but the front-end errors that caused
    /// them do; a broken unit analyzed only by despite-errors analyzers
    /// yields 0.
    pub fn exit_code(&self) -> i32 {
        if self.diagnostics.is_empty() && self.frontend_errors.is_empty() && self.errors.is_empty()
        {
            0
        } else {
            1
        }
    }
}

/// Orchestrates one run over a fixed registry and unit set.
///
/// The registry and units are read-only for the duration of the run; the
/// only shared mutable state is the action graph's memoization table and the
/// fact store, both internally synchronized.
pub struct Runner {
    roots: Vec<String>,
}

impl Runner {
    /// Create a runner for the given root analyzer names.
    pub fn new<I, S>(roots: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            roots: roots.into_iter().map(Into::into).collect(),
        }
    }

    /// Run the root analyzers over every unit.
    ///
    /// Configuration errors (cycles, duplicate or unknown names) abort here,
    /// before any pass executes and with no partial side effects. Per-pass
    /// failures never abort sibling work.
    pub fn run(&self, registry: &Registry, units: &[UnitHandle]) -> Result<RunOutcome> {
        let plan = super::schedule::plan(registry, &self.roots)?;

        let mut units_by_id: HashMap<UnitId, UnitHandle> = HashMap::new();
        for unit in units {
            units_by_id.insert(unit.id.clone(), Arc::clone(unit));
        }
        let reachable = reachable_sets(units);

        // Build the full graph up front; executing the requested roots pulls
        // in every dependency action.
        let graph = ActionGraph::new();
        let store = FactStore::new();
        let roots: Vec<_> = plan
            .iter()
            .filter(|a| self.roots.iter().any(|r| r == a.name()))
            .flat_map(|analyzer| {
                units
                    .iter()
                    .map(|unit| graph.action(registry, analyzer, unit, &units_by_id))
                    .collect::<Vec<_>>()
            })
            .collect();

        roots.par_iter().for_each(|action| {
            action.execute(&store, &reachable);
        });

        // Aggregate in deterministic key order; execution order across
        // independent pairs is unspecified.
        let mut diagnostics = Vec::new();
        let mut errors = Vec::new();
        let mut skipped = Vec::new();
        let mut broken_units: Vec<UnitId> = Vec::new();

        for action in graph.all() {
            let Some(outcome) = action.outcome() else {
                continue;
            };
            match &outcome.status {
                PassStatus::Ran => {
                    diagnostics.extend(outcome.diagnostics.iter().cloned());
                }
                PassStatus::Skipped(reason) => {
                    if *reason == SkipReason::FrontendErrors {
                        broken_units.push(action.key.unit.clone());
                    }
                    skipped.push(SkippedPass {
                        analyzer: action.key.analyzer.clone(),
                        unit: action.key.unit.clone(),
                        reason: reason.clone(),
                    });
                }
                PassStatus::Failed(message) => {
                    errors.push(PassError {
                        analyzer: action.key.analyzer.clone(),
                        unit: action.key.unit.clone(),
                        message: message.clone(),
                    });
                }
            }
        }

        diag::sort_diagnostics(&mut diagnostics);

        // Surface each suppressing unit's front-end errors once.
        broken_units.sort();
        broken_units.dedup();
        let mut frontend_errors = Vec::new();
        for unit_id in broken_units {
            if let Some(unit) = units_by_id.get(&unit_id) {
                frontend_errors.extend(unit.errors.iter().cloned());
            }
        }

        Ok(RunOutcome {
            diagnostics,
            frontend_errors,
            errors,
            skipped,
            facts: store,
        })
    }
}

/// Transitive import closure per unit, over the loaded set.
///
/// The front end guarantees the import graph is acyclic, so a depth-first
/// accumulation terminates.
fn reachable_sets(units: &[UnitHandle]) -> HashMap<UnitId, HashSet<UnitId>> {
    let by_id: HashMap<UnitId, UnitHandle> =
        units.iter().map(|u| (u.id.clone(), Arc::clone(u))).collect();
    let mut sets: HashMap<UnitId, HashSet<UnitId>> = HashMap::new();

    fn visit(
        id: &UnitId,
        by_id: &HashMap<UnitId, UnitHandle>,
        sets: &mut HashMap<UnitId, HashSet<UnitId>>,
    ) {
        if sets.contains_key(id) {
            return;
        }
        // Placeholder marks in-progress before recursion.
        sets.insert(id.clone(), HashSet::new());
        let mut set = HashSet::new();
        if let Some(unit) = by_id.get(id) {
            for import in unit.imports.clone() {
                set.insert(import.clone());
                if by_id.contains_key(&import) {
                    visit(&import, by_id, sets);
                    if let Some(transitive) = sets.get(&import) {
                        set.extend(transitive.iter().cloned());
                    }
                }
            }
        }
        sets.insert(id.clone(), set);
    }

    for unit in units {
        visit(&unit.id, &by_id, &mut sets);
    }
    sets
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::unit::{SymbolTable, Unit};

    fn unit(id: &str, imports: &[&str]) -> UnitHandle {
        Arc::new(Unit {
            id: UnitId::from(id),
            files: vec![],
            symbols: SymbolTable::default(),
            imports: imports.iter().map(|&i| UnitId::from(i)).collect(),
            errors: vec![],
        })
    }

    #[test]
    fn test_reachable_sets_are_transitive() {
        let units = vec![unit("a", &[]), unit("b", &["a"]), unit("c", &["b"])];
        let sets = reachable_sets(&units);
        assert!(sets[&UnitId::from("c")].contains(&UnitId::from("a")));
        assert!(sets[&UnitId::from("c")].contains(&UnitId::from("b")));
        assert!(sets[&UnitId::from("b")].contains(&UnitId::from("a")));
        assert!(!sets[&UnitId::from("a")].contains(&UnitId::from("b")));
    }

    #[test]
    fn test_reachable_ignores_unloaded_imports_transitively() {
        // "b" imports a unit that was not loaded; "a" is still unreachable
        // from "b" through it.
        let units = vec![unit("a", &[]), unit("b", &["ghost"])];
        let sets = reachable_sets(&units);
        assert!(sets[&UnitId::from("b")].contains(&UnitId::from("ghost")));
        assert!(!sets[&UnitId::from("b")].contains(&UnitId::from("a")));
    }
}
