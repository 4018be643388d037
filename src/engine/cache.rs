//! Per-(analyzer, unit) result cache.
//!
//! Every (analyzer, unit) pair is one action node. Executing an action first
//! executes its dependencies, then runs the pass exactly once:
//! the `OnceLock` gives single-flight semantics, so concurrent requesters for
//! the same key block until the first computation finishes and then share the
//! memoized outcome. At-most-once execution is a correctness requirement:
//! run functions emit diagnostics that must not duplicate.
//!
//! The cache's lifetime is one run; there is no eviction and no cross-run
//! persistence.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, OnceLock};

use crate::analyzer::{AnalyzerHandle, Registry};
use crate::engine::facts::FactStore;
use crate::engine::pass::{self, PassInputs, PassOutcome};
use crate::unit::{UnitHandle, UnitId};

/// Cache key: one analyzer applied to one unit.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ActionKey {
    pub analyzer: String,
    pub unit: UnitId,
}

/// One node of the execution graph.
pub struct Action {
    pub key: ActionKey,
    analyzer: AnalyzerHandle,
    unit: UnitHandle,
    /// Same-unit requirements, then (for fact-declaring analyzers) the same
    /// analyzer over each imported unit.
    deps: Vec<Arc<Action>>,
    outcome: OnceLock<Arc<PassOutcome>>,
}

impl Action {
    /// Execute this action and everything it depends on, memoized.
    pub fn execute(&self, store: &FactStore, reachable: &HashMap<UnitId, HashSet<UnitId>>) -> Arc<PassOutcome> {
        let outcome = self.outcome.get_or_init(|| {
            // Deps run sequentially inside the init closure: a rayon join
            // here could steal a task that re-enters this cell on the same
            // thread and deadlock. Parallelism comes from the root actions.
            for dep in &self.deps {
                dep.execute(store, reachable);
            }

            // Gather prerequisite outcomes for the same unit. A dependency
            // that skipped or failed is unavailable, which skips this pass
            // in turn.
            let mut dep_results = HashMap::new();
            for name in self.analyzer.requirements() {
                let dep = self
                    .deps
                    .iter()
                    .find(|d| d.key.analyzer == *name && d.key.unit == self.unit.id)
                    .expect("same-unit requirement built into deps");
                let outcome = dep
                    .outcome
                    .get()
                    .expect("dependency executed before dependent");
                let state = match &outcome.status {
                    pass::PassStatus::Ran => pass::DepOutcome::Ran(outcome.result.clone()),
                    _ => pass::DepOutcome::Unavailable,
                };
                dep_results.insert(name.clone(), state);
            }

            static EMPTY: OnceLock<HashSet<UnitId>> = OnceLock::new();
            let empty = EMPTY.get_or_init(HashSet::new);
            let unit_reachable = reachable.get(&self.unit.id).unwrap_or(empty);

            Arc::new(pass::execute(PassInputs {
                analyzer: &self.analyzer,
                unit: &self.unit,
                dep_results,
                reachable: unit_reachable,
                store,
            }))
        });
        Arc::clone(outcome)
    }

    /// The memoized outcome, if this action has executed.
    pub fn outcome(&self) -> Option<Arc<PassOutcome>> {
        self.outcome.get().cloned()
    }
}

/// Builds and owns the action graph for one run.
pub struct ActionGraph {
    actions: Mutex<HashMap<ActionKey, Arc<Action>>>,
}

impl ActionGraph {
    pub fn new() -> Self {
        Self {
            actions: Mutex::new(HashMap::new()),
        }
    }

    /// Get or build the action for (analyzer, unit), including its
    /// dependency subgraph.
    ///
    /// Termination: the analyzer requirement graph is validated acyclic
    /// before any action is built, and the unit import graph is acyclic by
    /// the front end's contract.
    pub fn action(
        &self,
        registry: &Registry,
        analyzer: &AnalyzerHandle,
        unit: &UnitHandle,
        units_by_id: &HashMap<UnitId, UnitHandle>,
    ) -> Arc<Action> {
        let key = ActionKey {
            analyzer: analyzer.name().to_string(),
            unit: unit.id.clone(),
        };
        {
            let actions = self.actions.lock().unwrap();
            if let Some(action) = actions.get(&key) {
                return Arc::clone(action);
            }
        }

        let mut deps = Vec::new();
        for name in analyzer.requirements() {
            let dep_analyzer = registry
                .get(name)
                .expect("requirement validated by the scheduler");
            deps.push(self.action(registry, dep_analyzer, unit, units_by_id));
        }
        if analyzer.declares_facts() {
            // Facts flow down the import graph, so the same analyzer must
            // have finished on every imported unit first.
            for import in &unit.imports {
                if let Some(imported) = units_by_id.get(import) {
                    deps.push(self.action(registry, analyzer, imported, units_by_id));
                }
            }
        }

        let action = Arc::new(Action {
            key: key.clone(),
            analyzer: Arc::clone(analyzer),
            unit: Arc::clone(unit),
            deps,
            outcome: OnceLock::new(),
        });

        let mut actions = self.actions.lock().unwrap();
        // A concurrent builder may have won the race; keep the first entry so
        // every requester shares one memoization cell.
        Arc::clone(actions.entry(key).or_insert(action))
    }

    /// All built actions, sorted by key for deterministic aggregation.
    pub fn all(&self) -> Vec<Arc<Action>> {
        let actions = self.actions.lock().unwrap();
        let mut all: Vec<_> = actions.values().cloned().collect();
        all.sort_by(|a, b| a.key.cmp(&b.key));
        all
    }
}

impl Default for ActionGraph {
    fn default() -> Self {
        Self::new()
    }
}
