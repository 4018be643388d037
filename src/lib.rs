//! Multicheck - a multi-analyzer static analysis driver.
//!
//! Multicheck orchestrates pluggable analyzers over already-parsed source
//! units. It resolves the analyzer dependency graph, runs each
//! (analyzer, unit) pair at most once, shares typed results between
//! dependent analyzers, propagates serializable facts along the unit import
//! graph, collects diagnostics deterministically, and can materialize
//! suggested fixes into file rewrites.
//!
//! # Architecture
//!
//! - `unit`: the immutable unit model (sources, symbols, imports)
//! - `tree`: generic syntax trees with pre-order traversal
//! - `analyzer`: analyzer descriptors and the explicit registry
//! - `engine`: scheduling, memoized execution, passes, and facts
//! - `fix`: materializing suggested fixes into file edits
//! - `load`: the front-end interface and the tree-sitter Go loader
//! - `passes`: infrastructure analyzers (`inspect`)
//! - `report`: output formatting (pretty, JSON)
//!
//! # Writing an Analyzer
//!
//! Build an [`analyzer::Analyzer`] with a name, a doc string, and a run
//! function; declare requirements by name and recover their typed results
//! with [`engine::Pass::result_of`]. Register everything in an
//! [`analyzer::Registry`] and hand it to [`engine::Runner`].

pub mod analyzer;
pub mod cli;
pub mod diag;
pub mod engine;
pub mod error;
pub mod fix;
pub mod load;
pub mod passes;
pub mod report;
pub mod span;
pub mod tree;
pub mod unit;

pub use analyzer::{Analyzer, AnalyzerResult, Registry};
pub use diag::{Diagnostic, SuggestedFix, TextEdit};
pub use engine::{Fact, Pass, RunOutcome, Runner};
pub use error::Error;
pub use load::{GoLoader, Loader, Target};
pub use span::Span;
pub use unit::{Unit, UnitId};
