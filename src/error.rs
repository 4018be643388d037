//! Error taxonomy for the engine.
//!
//! Configuration errors abort the run before any pass executes. Pass errors
//! are isolated per (analyzer, unit). Fix conflicts are fatal only for the
//! affected file.

use thiserror::Error;

use crate::unit::UnitId;

/// Errors raised by the scheduler, executor, fact store, and fix collector.
#[derive(Error, Debug)]
pub enum Error {
    /// The requirement graph contains a cycle. The string names the cycle
    /// path, e.g. `"a -> b -> a"`.
    #[error("analyzer requirement cycle: {0}")]
    RequirementCycle(String),

    /// Two analyzers were registered under the same name.
    #[error("duplicate analyzer name {0:?}")]
    DuplicateAnalyzer(String),

    /// An analyzer requires a name that is not in the registry.
    #[error("analyzer {analyzer:?} requires unknown analyzer {requirement:?}")]
    UnknownRequirement { analyzer: String, requirement: String },

    /// A requested root analyzer is not in the registry.
    #[error("unknown analyzer {0:?}")]
    UnknownAnalyzer(String),

    /// A pass asked for a prerequisite result it did not declare, or whose
    /// producing pass did not run.
    #[error("analyzer {analyzer:?} has no result for requirement {requirement:?} on {unit}")]
    NoResult {
        analyzer: String,
        requirement: String,
        unit: UnitId,
    },

    /// A prerequisite result had a different type than the consumer expected.
    #[error("result of {requirement:?} on {unit} is not a {expected}")]
    ResultType {
        requirement: String,
        unit: UnitId,
        expected: &'static str,
    },

    /// A pass exported a fact of a type its analyzer did not declare.
    #[error("analyzer {analyzer:?} exported undeclared fact type {fact_type}")]
    UndeclaredFactType {
        analyzer: String,
        fact_type: &'static str,
    },

    /// A pass exported a fact for a symbol not declared in its own unit.
    #[error("analyzer {analyzer:?} exported a fact for unknown symbol {symbol:?} in {unit}")]
    UnknownFactSymbol {
        analyzer: String,
        symbol: String,
        unit: UnitId,
    },

    /// A pass read a fact from a unit its own unit does not import.
    #[error("unit {reader} does not import {producer}; fact for {symbol:?} is out of scope")]
    FactOutOfScope {
        reader: UnitId,
        producer: UnitId,
        symbol: String,
    },

    /// A stored fact had a different type than the reader expected.
    #[error("fact for {symbol:?} in {unit} is not a {expected}")]
    FactType {
        unit: UnitId,
        symbol: String,
        expected: &'static str,
    },

    /// A diagnostic carried a span outside the unit under analysis.
    #[error("analyzer {analyzer:?} reported an invalid span in {file}: {detail}")]
    InvalidSpan {
        analyzer: String,
        file: String,
        detail: String,
    },

    /// Two selected text edits in the same file overlap.
    #[error(
        "conflicting fixes in {file}: edit at {first} overlaps edit at {second}"
    )]
    FixConflict {
        file: String,
        first: String,
        second: String,
    },

    /// A selected text edit starts or ends inside a multi-byte character.
    #[error("fix edit in {file} at {edit} splits a UTF-8 character")]
    FixEditBoundary { file: String, edit: String },

    /// A target pattern matched no unit.
    #[error("no units match pattern {0:?}")]
    NoMatch(String),

    /// A malformed target pattern.
    #[error("malformed target pattern {0:?}: {1}")]
    BadPattern(String, String),
}

pub type Result<T> = std::result::Result<T, Error>;
