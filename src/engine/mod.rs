//! The pass orchestration engine.
//!
//! Given a registry of analyzers, a requested root set, and a set of units,
//! the engine computes a dependency-respecting execution plan, runs each
//! (analyzer, unit) pair at most once, shares typed results between
//! dependent analyzers, propagates facts along the unit import graph, and
//! aggregates diagnostics deterministically.

mod cache;
mod facts;
mod pass;
mod runner;
mod schedule;

pub use cache::{Action, ActionGraph, ActionKey};
pub use facts::{Fact, FactStore};
pub use pass::{execute, DepOutcome, Pass, PassInputs, PassOutcome, PassStatus, SkipReason};
pub use runner::{PassError, RunOutcome, Runner, SkippedPass};
pub use schedule::plan;
