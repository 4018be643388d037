//! Front-end interface: turning target patterns into units.
//!
//! The engine consumes already-parsed units; a [`Loader`] is the collaborator
//! that produces them. Targets address either whole package directories or a
//! single file (`file=<path>`), which resolves to the unit containing that
//! file. Fix application uses the file form to locate one file's content to
//! rewrite.

use std::path::PathBuf;

use crate::error::{Error, Result};
use crate::unit::UnitHandle;

mod golang;

pub use golang::GoLoader;

/// One parsed target pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    /// A package directory.
    Dir(PathBuf),
    /// `file=<path>`: the unit containing this file.
    File(PathBuf),
}

impl Target {
    /// Parse a command-line pattern.
    pub fn parse(pattern: &str) -> Result<Target> {
        if let Some(rest) = pattern.strip_prefix("file=") {
            if rest.is_empty() {
                return Err(Error::BadPattern(
                    pattern.to_string(),
                    "empty file path".to_string(),
                ));
            }
            return Ok(Target::File(PathBuf::from(rest)));
        }
        if pattern.is_empty() {
            return Err(Error::BadPattern(
                pattern.to_string(),
                "empty pattern".to_string(),
            ));
        }
        Ok(Target::Dir(PathBuf::from(pattern)))
    }

    /// The pattern text, for failure reporting.
    pub fn pattern(&self) -> String {
        match self {
            Target::Dir(p) => p.display().to_string(),
            Target::File(p) => format!("file={}", p.display()),
        }
    }
}

/// A target pattern that matched no unit.
#[derive(Debug, Clone)]
pub struct LoadFailure {
    pub pattern: String,
    pub message: String,
}

/// Everything a loader produced for one set of targets.
#[derive(Default)]
pub struct LoadResult {
    pub units: Vec<UnitHandle>,
    /// Patterns that failed to match or load. A failed pattern contributes
    /// no partial units.
    pub failures: Vec<LoadFailure>,
}

impl LoadResult {
    pub fn has_failures(&self) -> bool {
        !self.failures.is_empty()
    }
}

/// Produces units from target patterns.
pub trait Loader {
    fn load(&self, targets: &[Target]) -> anyhow::Result<LoadResult>;
}
