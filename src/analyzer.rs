//! Analyzer descriptors and the registry.
//!
//! An [`Analyzer`] is one pluggable rule: a name, documentation, the names of
//! the analyzers it requires, the fact types it may export, and a run
//! function. Descriptors are built once at startup and immutable afterwards.
//!
//! Registration is an explicit [`Registry`] value threaded through the
//! engine; there is no process-wide mutable registration.

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::engine::Pass;
use crate::error::{Error, Result};

/// Opaque result of one analyzer over one unit.
///
/// The scheduler treats results as opaque; the consuming analyzer recovers
/// the concrete type through [`Pass::result_of`].
pub type AnalyzerResult = Arc<dyn Any + Send + Sync>;

/// An analyzer's run function.
///
/// Returning `Ok(None)` means the analyzer produced no shareable result
/// (diagnostics and facts are still collected from the pass).
pub type RunFn = Arc<dyn Fn(&mut Pass<'_>) -> anyhow::Result<Option<AnalyzerResult>> + Send + Sync>;

/// A fact type an analyzer declared it may export.
#[derive(Debug, Clone, Copy)]
pub struct FactType {
    pub(crate) id: TypeId,
    pub(crate) name: &'static str,
}

/// Metadata and behavior for one pluggable analysis rule.
pub struct Analyzer {
    name: String,
    doc: String,
    requires: Vec<String>,
    fact_types: Vec<FactType>,
    run_despite_errors: bool,
    run: RunFn,
}

impl fmt::Debug for Analyzer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Analyzer")
            .field("name", &self.name)
            .field("requires", &self.requires)
            .field("run_despite_errors", &self.run_despite_errors)
            .finish()
    }
}

impl Analyzer {
    /// Start building an analyzer with the given unique name and one-line doc.
    pub fn new(
        name: impl Into<String>,
        doc: impl Into<String>,
        run: impl Fn(&mut Pass<'_>) -> anyhow::Result<Option<AnalyzerResult>> + Send + Sync + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            doc: doc.into(),
            requires: Vec::new(),
            fact_types: Vec::new(),
            run_despite_errors: false,
            run: Arc::new(run),
        }
    }

    /// Declare required analyzers, by name. Their results are available to
    /// this analyzer's passes via [`Pass::result_of`].
    pub fn requires<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.requires.extend(names.into_iter().map(Into::into));
        self
    }

    /// Declare a fact type this analyzer may export. Exporting an undeclared
    /// fact type is a pass error.
    pub fn fact_type<T: Any>(mut self) -> Self {
        self.fact_types.push(FactType {
            id: TypeId::of::<T>(),
            name: std::any::type_name::<T>(),
        });
        self
    }

    /// Run this analyzer even on units with front-end errors. Defaults to
    /// false (such units are skipped, not failed).
    pub fn run_despite_errors(mut self, yes: bool) -> Self {
        self.run_despite_errors = yes;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn doc(&self) -> &str {
        &self.doc
    }

    pub fn requirements(&self) -> &[String] {
        &self.requires
    }

    pub fn runs_despite_errors(&self) -> bool {
        self.run_despite_errors
    }

    /// Whether the analyzer declared any fact types. Fact-declaring analyzers
    /// are additionally ordered after themselves on imported units.
    pub fn declares_facts(&self) -> bool {
        !self.fact_types.is_empty()
    }

    pub(crate) fn declared_fact(&self, id: TypeId) -> Option<&FactType> {
        self.fact_types.iter().find(|ft| ft.id == id)
    }

    pub(crate) fn run_fn(&self) -> RunFn {
        Arc::clone(&self.run)
    }
}

/// Shared handle to an immutable analyzer descriptor.
pub type AnalyzerHandle = Arc<Analyzer>;

/// An explicit set of analyzers, constructed at startup.
///
/// Rejects duplicate names at registration; lookups are by name.
#[derive(Default)]
pub struct Registry {
    analyzers: Vec<AnalyzerHandle>,
    by_name: HashMap<String, usize>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an analyzer. Fails on a duplicate name.
    pub fn register(&mut self, analyzer: Analyzer) -> Result<()> {
        if self.by_name.contains_key(analyzer.name()) {
            return Err(Error::DuplicateAnalyzer(analyzer.name().to_string()));
        }
        let handle = Arc::new(analyzer);
        self.by_name
            .insert(handle.name().to_string(), self.analyzers.len());
        self.analyzers.push(handle);
        Ok(())
    }

    /// Look up an analyzer by name.
    pub fn get(&self, name: &str) -> Option<&AnalyzerHandle> {
        self.by_name.get(name).map(|&i| &self.analyzers[i])
    }

    /// All registered analyzers, in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &AnalyzerHandle> {
        self.analyzers.iter()
    }

    /// All registered names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<_> = self.analyzers.iter().map(|a| a.name()).collect();
        names.sort_unstable();
        names
    }

    pub fn len(&self) -> usize {
        self.analyzers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.analyzers.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn noop(name: &str) -> Analyzer {
        Analyzer::new(name, "no-op", |_pass| Ok(None))
    }

    #[test]
    fn test_duplicate_name_rejected() {
        let mut reg = Registry::new();
        reg.register(noop("a")).unwrap();
        let err = reg.register(noop("a")).unwrap_err();
        assert!(matches!(err, Error::DuplicateAnalyzer(name) if name == "a"));
    }

    #[test]
    fn test_lookup_and_sorted_names() {
        let mut reg = Registry::new();
        reg.register(noop("zeta")).unwrap();
        reg.register(noop("alpha")).unwrap();
        assert!(reg.get("zeta").is_some());
        assert!(reg.get("missing").is_none());
        assert_eq!(reg.names(), vec!["alpha", "zeta"]);
    }

    #[test]
    fn test_fact_type_declaration() {
        #[derive(Debug)]
        struct Marker;
        let a = noop("facts").fact_type::<Marker>();
        assert!(a.declares_facts());
        assert!(a.declared_fact(TypeId::of::<Marker>()).is_some());
        assert!(a.declared_fact(TypeId::of::<String>()).is_none());
    }
}
