//! Diagnostics and suggested fixes.

use std::fmt;

use crate::error::Error;
use crate::span::Span;
use crate::unit::Unit;

/// A single proposed text replacement.
#[derive(Debug, Clone)]
pub struct TextEdit {
    /// File the edit applies to (a file of the unit under analysis).
    pub file: String,
    /// Byte range to replace.
    pub span: Span,
    /// Replacement text.
    pub new_text: String,
}

/// A proposed repair: a message plus the edits that implement it.
///
/// Edits within one fix must not overlap; the collector verifies this before
/// anything is written.
#[derive(Debug, Clone)]
pub struct SuggestedFix {
    pub message: String,
    pub edits: Vec<TextEdit>,
}

/// One reported finding.
#[derive(Debug, Clone)]
pub struct Diagnostic {
    /// File the finding is in.
    pub file: String,
    /// Position of the finding.
    pub span: Span,
    /// Finding text.
    pub message: String,
    /// Name of the analyzer that reported it (filled in by the executor).
    pub analyzer: String,
    /// Proposed repairs, possibly empty.
    pub fixes: Vec<SuggestedFix>,
}

impl Diagnostic {
    /// Create a diagnostic with no fixes. The owning analyzer name is filled
    /// in when the pass ingests it.
    pub fn new(file: impl Into<String>, span: Span, message: impl Into<String>) -> Self {
        Self {
            file: file.into(),
            span,
            message: message.into(),
            analyzer: String::new(),
            fixes: Vec::new(),
        }
    }

    /// Attach a suggested fix.
    pub fn with_fix(mut self, fix: SuggestedFix) -> Self {
        self.fixes.push(fix);
        self
    }

    /// Sort key giving deterministic output: file, then position, then
    /// analyzer, then message.
    pub fn sort_key(&self) -> (&str, usize, usize, &str, &str) {
        (
            &self.file,
            self.span.start_byte,
            self.span.end_byte,
            &self.analyzer,
            &self.message,
        )
    }

    /// Check that the diagnostic's positions resolve inside the unit it was
    /// reported against.
    pub fn validate(&self, analyzer: &str, unit: &Unit) -> Result<(), Error> {
        let file = unit.file(&self.file).ok_or_else(|| Error::InvalidSpan {
            analyzer: analyzer.to_string(),
            file: self.file.clone(),
            detail: "file does not belong to the unit under analysis".to_string(),
        })?;
        if !self.span.fits(file.text.len()) {
            return Err(Error::InvalidSpan {
                analyzer: analyzer.to_string(),
                file: self.file.clone(),
                detail: format!(
                    "byte range {}..{} outside file of {} bytes",
                    self.span.start_byte,
                    self.span.end_byte,
                    file.text.len()
                ),
            });
        }
        for fix in &self.fixes {
            for edit in &fix.edits {
                let target = unit.file(&edit.file).ok_or_else(|| Error::InvalidSpan {
                    analyzer: analyzer.to_string(),
                    file: edit.file.clone(),
                    detail: "fix edits a file outside the unit under analysis".to_string(),
                })?;
                if !edit.span.fits(target.text.len()) {
                    return Err(Error::InvalidSpan {
                        analyzer: analyzer.to_string(),
                        file: edit.file.clone(),
                        detail: format!(
                            "fix edit range {}..{} outside file of {} bytes",
                            edit.span.start_byte,
                            edit.span.end_byte,
                            target.text.len()
                        ),
                    });
                }
            }
        }
        Ok(())
    }
}

impl fmt::Display for Diagnostic {
    /// Renders `<file>:<line>:<column>: <message>`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}:{}: {}",
            self.file, self.span.start_line, self.span.start_col, self.message
        )
    }
}

/// Sort diagnostics into their canonical output order.
pub fn sort_diagnostics(diags: &mut [Diagnostic]) {
    diags.sort_by(|a, b| a.sort_key().cmp(&b.sort_key()));
}
