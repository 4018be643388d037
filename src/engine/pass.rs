//! Pass construction and execution.
//!
//! A [`Pass`] binds one analyzer to one unit for a single execution. It is
//! created fresh per (analyzer, unit) pair and discarded after the run
//! function returns; its diagnostics and exported facts outlive it.

use std::any::TypeId;
use std::collections::{HashMap, HashSet};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

use crate::analyzer::{AnalyzerHandle, AnalyzerResult};
use crate::diag::Diagnostic;
use crate::engine::facts::{Fact, FactEntry, FactKey, FactStore};
use crate::error::{Error, Result};
use crate::unit::{Unit, UnitHandle, UnitId};

/// Why a pass did not execute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// The unit has front-end errors and the analyzer did not opt in to
    /// running despite them.
    FrontendErrors,
    /// A required analyzer did not produce a result on this unit.
    MissingPrerequisite(String),
}

/// Outcome of one (analyzer, unit) execution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PassStatus {
    /// The run function completed without error.
    Ran,
    /// Execution was suppressed; not a failure of the run by itself.
    Skipped(SkipReason),
    /// The run function returned an error, panicked, or reported an invalid
    /// diagnostic. Isolated to this (analyzer, unit) pair.
    Failed(String),
}

/// Everything one execution leaves behind.
pub struct PassOutcome {
    pub status: PassStatus,
    /// Shareable result for dependent analyzers, if any.
    pub result: Option<AnalyzerResult>,
    /// Diagnostics reported by the run function (empty unless `Ran`).
    pub diagnostics: Vec<Diagnostic>,
}

/// The execution context handed to an analyzer's run function.
pub struct Pass<'a> {
    analyzer: &'a AnalyzerHandle,
    unit: &'a UnitHandle,
    results: &'a HashMap<String, AnalyzerResult>,
    reachable: &'a HashSet<UnitId>,
    store: &'a FactStore,
    diagnostics: Vec<Diagnostic>,
}

impl<'a> Pass<'a> {
    /// The unit under analysis.
    pub fn unit(&self) -> &Unit {
        self.unit
    }

    /// Shared handle to the unit, for results that need to outlive the pass.
    pub fn unit_handle(&self) -> UnitHandle {
        Arc::clone(self.unit)
    }

    /// Name of the owning analyzer.
    pub fn analyzer_name(&self) -> &str {
        self.analyzer.name()
    }

    /// Report a finding. Position validity is checked when the executor
    /// ingests the pass's diagnostics.
    pub fn report(&mut self, diagnostic: Diagnostic) {
        self.diagnostics.push(diagnostic);
    }

    /// Recover the typed result of a declared requirement for this unit.
    ///
    /// Fails if `name` was not declared in `requires`, if the producing pass
    /// did not run, or if the result is not a `T`.
    pub fn result_of<T: Send + Sync + 'static>(&self, name: &str) -> Result<Arc<T>> {
        if !self.analyzer.requirements().iter().any(|r| r == name) {
            return Err(Error::NoResult {
                analyzer: self.analyzer.name().to_string(),
                requirement: name.to_string(),
                unit: self.unit.id.clone(),
            });
        }
        let result = self.results.get(name).ok_or_else(|| Error::NoResult {
            analyzer: self.analyzer.name().to_string(),
            requirement: name.to_string(),
            unit: self.unit.id.clone(),
        })?;
        Arc::clone(result)
            .downcast::<T>()
            .map_err(|_| Error::ResultType {
                requirement: name.to_string(),
                unit: self.unit.id.clone(),
                expected: std::any::type_name::<T>(),
            })
    }

    /// Attach a fact to a symbol declared in this pass's own unit.
    ///
    /// The fact type must have been declared on the analyzer, and the symbol
    /// must exist in the unit's symbol table.
    pub fn export_fact<T: Fact>(&mut self, symbol: &str, fact: T) -> Result<()> {
        let declared = self
            .analyzer
            .declared_fact(TypeId::of::<T>())
            .ok_or_else(|| Error::UndeclaredFactType {
                analyzer: self.analyzer.name().to_string(),
                fact_type: std::any::type_name::<T>(),
            })?;
        if self.unit.symbols.lookup(symbol).is_none() {
            return Err(Error::UnknownFactSymbol {
                analyzer: self.analyzer.name().to_string(),
                symbol: symbol.to_string(),
                unit: self.unit.id.clone(),
            });
        }
        let key = FactKey {
            analyzer: self.analyzer.name().to_string(),
            unit: self.unit.id.clone(),
            symbol: symbol.to_string(),
        };
        let entry = FactEntry {
            encoded: fact.encode(),
            type_name: declared.name,
            value: Arc::new(fact),
        };
        self.store.insert(key, entry);
        Ok(())
    }

    /// Read a fact this analyzer previously exported while analyzing a unit
    /// that this pass's unit (transitively) imports.
    ///
    /// Reads outside the import graph are rejected; an absent fact is
    /// `Ok(None)`.
    pub fn fact_of<T: Fact>(&self, unit: &UnitId, symbol: &str) -> Result<Option<Arc<T>>> {
        if *unit != self.unit.id && !self.reachable.contains(unit) {
            return Err(Error::FactOutOfScope {
                reader: self.unit.id.clone(),
                producer: unit.clone(),
                symbol: symbol.to_string(),
            });
        }
        let Some((value, _type_name)) = self.store.get(self.analyzer.name(), unit, symbol) else {
            return Ok(None);
        };
        value
            .downcast::<T>()
            .map(Some)
            .map_err(|_| Error::FactType {
                unit: unit.clone(),
                symbol: symbol.to_string(),
                expected: std::any::type_name::<T>(),
            })
    }
}

/// State of one same-unit requirement at pass construction.
pub enum DepOutcome {
    /// The requirement executed; it may or may not have produced a
    /// shareable result.
    Ran(Option<AnalyzerResult>),
    /// The requirement was skipped or failed; the dependent cannot run.
    Unavailable,
}

/// Inputs required to execute one pass.
pub struct PassInputs<'a> {
    pub analyzer: &'a AnalyzerHandle,
    pub unit: &'a UnitHandle,
    /// Outcomes of the analyzer's same-unit requirements, keyed by name.
    pub dep_results: HashMap<String, DepOutcome>,
    /// Units transitively imported by `unit`, for fact visibility.
    pub reachable: &'a HashSet<UnitId>,
    pub store: &'a FactStore,
}

/// Execute one (analyzer, unit) pair.
///
/// Skips (without failing) when the unit has front-end errors the analyzer
/// did not opt in to, or when a prerequisite result is unavailable. Errors
/// and panics from the run function are captured as a `Failed` status.
pub fn execute(inputs: PassInputs<'_>) -> PassOutcome {
    let analyzer = inputs.analyzer;
    let unit = inputs.unit;

    if unit.has_errors() && !analyzer.runs_despite_errors() {
        return PassOutcome {
            status: PassStatus::Skipped(SkipReason::FrontendErrors),
            result: None,
            diagnostics: Vec::new(),
        };
    }

    let mut results = HashMap::new();
    for (name, outcome) in inputs.dep_results {
        match outcome {
            DepOutcome::Ran(Some(r)) => {
                results.insert(name, r);
            }
            DepOutcome::Ran(None) => {}
            DepOutcome::Unavailable => {
                return PassOutcome {
                    status: PassStatus::Skipped(SkipReason::MissingPrerequisite(name)),
                    result: None,
                    diagnostics: Vec::new(),
                };
            }
        }
    }

    let mut pass = Pass {
        analyzer,
        unit,
        results: &results,
        reachable: inputs.reachable,
        store: inputs.store,
        diagnostics: Vec::new(),
    };

    let run = analyzer.run_fn();
    let run_result = catch_unwind(AssertUnwindSafe(|| run(&mut pass)));

    let mut diagnostics = std::mem::take(&mut pass.diagnostics);
    drop(pass);

    let result = match run_result {
        Ok(Ok(result)) => result,
        Ok(Err(err)) => {
            return PassOutcome {
                status: PassStatus::Failed(format!("{err:#}")),
                result: None,
                diagnostics: Vec::new(),
            };
        }
        Err(payload) => {
            let msg = panic_message(payload.as_ref());
            return PassOutcome {
                status: PassStatus::Failed(format!("panicked: {msg}")),
                result: None,
                diagnostics: Vec::new(),
            };
        }
    };

    // Validate positions before the diagnostics enter the run-wide
    // collection; one bad span fails the whole pass.
    for diagnostic in &mut diagnostics {
        diagnostic.analyzer = analyzer.name().to_string();
        if let Err(err) = diagnostic.validate(analyzer.name(), unit) {
            return PassOutcome {
                status: PassStatus::Failed(err.to_string()),
                result: None,
                diagnostics: Vec::new(),
            };
        }
    }

    PassOutcome {
        status: PassStatus::Ran,
        result,
        diagnostics,
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzer::Analyzer;
    use crate::span::Span;
    use crate::tree::{SyntaxNode, SyntaxTree};
    use crate::unit::{FrontendError, SourceFile, SymbolTable, Unit};

    fn unit(id: &str, errors: Vec<FrontendError>) -> UnitHandle {
        let text = "package a\n".to_string();
        let span = Span {
            start_byte: 0,
            end_byte: text.len(),
            start_line: 1,
            start_col: 1,
            end_line: 1,
            end_col: text.len() + 1,
        };
        Arc::new(Unit {
            id: UnitId::from(id),
            files: vec![SourceFile {
                path: format!("{id}/a.go"),
                text,
                tree: SyntaxTree {
                    root: SyntaxNode {
                        kind: "source_file".to_string(),
                        span,
                        children: vec![],
                    },
                },
            }],
            symbols: SymbolTable::default(),
            imports: vec![],
            errors,
        })
    }

    fn run_one(analyzer: Analyzer, unit: &UnitHandle) -> PassOutcome {
        let handle = Arc::new(analyzer);
        let store = FactStore::new();
        let reachable = HashSet::new();
        execute(PassInputs {
            analyzer: &handle,
            unit,
            dep_results: HashMap::new(),
            reachable: &reachable,
            store: &store,
        })
    }

    fn broken_unit(id: &str) -> UnitHandle {
        unit(
            id,
            vec![FrontendError {
                file: format!("{id}/a.go"),
                span: Span::point(0, 1, 1),
                message: "syntax error".to_string(),
            }],
        )
    }

    #[test]
    fn test_skip_on_frontend_errors() {
        let analyzer = Analyzer::new("strict", "skips broken units", |_pass| Ok(None));
        let outcome = run_one(analyzer, &broken_unit("bad"));
        assert_eq!(
            outcome.status,
            PassStatus::Skipped(SkipReason::FrontendErrors)
        );
    }

    #[test]
    fn test_run_despite_errors_executes() {
        let analyzer = Analyzer::new("tolerant", "runs on broken units", |_pass| Ok(None))
            .run_despite_errors(true);
        let outcome = run_one(analyzer, &broken_unit("bad"));
        assert_eq!(outcome.status, PassStatus::Ran);
    }

    #[test]
    fn test_run_error_is_captured() {
        let analyzer = Analyzer::new("failing", "always errors", |_pass| {
            anyhow::bail!("boom")
        });
        let outcome = run_one(analyzer, &unit("ok", vec![]));
        assert!(matches!(outcome.status, PassStatus::Failed(msg) if msg.contains("boom")));
    }

    #[test]
    fn test_panic_is_captured() {
        let analyzer = Analyzer::new("panicky", "always panics", |_pass| panic!("kaboom"));
        let outcome = run_one(analyzer, &unit("ok", vec![]));
        assert!(matches!(outcome.status, PassStatus::Failed(msg) if msg.contains("kaboom")));
    }

    #[test]
    fn test_invalid_diagnostic_fails_pass() {
        let analyzer = Analyzer::new("sloppy", "reports outside the unit", |pass| {
            pass.report(Diagnostic::new("elsewhere.go", Span::point(0, 1, 1), "bad"));
            Ok(None)
        });
        let outcome = run_one(analyzer, &unit("ok", vec![]));
        assert!(matches!(outcome.status, PassStatus::Failed(_)));
        assert!(outcome.diagnostics.is_empty());
    }

    #[test]
    fn test_missing_prerequisite_skips() {
        let analyzer = Analyzer::new("dependent", "needs base", |_pass| Ok(None))
            .requires(["base"]);
        let handle = Arc::new(analyzer);
        let store = FactStore::new();
        let reachable = HashSet::new();
        let u = unit("ok", vec![]);
        let mut dep_results = HashMap::new();
        dep_results.insert("base".to_string(), DepOutcome::Unavailable);
        let outcome = execute(PassInputs {
            analyzer: &handle,
            unit: &u,
            dep_results,
            reachable: &reachable,
            store: &store,
        });
        assert_eq!(
            outcome.status,
            PassStatus::Skipped(SkipReason::MissingPrerequisite("base".to_string()))
        );
    }

    #[test]
    fn test_undeclared_requirement_is_an_error() {
        let analyzer = Analyzer::new("greedy", "asks for undeclared results", |pass| {
            let err = pass.result_of::<u32>("never-declared").unwrap_err();
            assert!(matches!(err, Error::NoResult { .. }));
            Ok(None)
        });
        let outcome = run_one(analyzer, &unit("ok", vec![]));
        assert_eq!(outcome.status, PassStatus::Ran);
    }
}
