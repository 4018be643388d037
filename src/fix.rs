//! Materializing suggested fixes into file edits.
//!
//! After a run, fix mode collects the selected `SuggestedFix` edits per
//! file, verifies none overlap, applies them in descending position order
//! (so earlier offsets stay valid), and writes each file back all-or-nothing.
//! Overlapping edits are a conflict error for that file only; other files
//! still apply. An I/O failure while persisting aborts the whole run.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use crate::diag::{Diagnostic, TextEdit};
use crate::error::Error;
use crate::unit::UnitHandle;

/// Result of applying fixes for one run.
#[derive(Debug, Default)]
pub struct FixReport {
    /// Files rewritten, with the number of edits applied to each.
    pub applied: Vec<(String, usize)>,
    /// Per-file errors (overlaps, boundary violations); the named files were
    /// left untouched.
    pub conflicts: Vec<Error>,
}

impl FixReport {
    pub fn has_conflicts(&self) -> bool {
        !self.conflicts.is_empty()
    }
}

/// Select fixes from `diagnostics` and apply them to disk.
///
/// When `filter` is given, only fixes whose message contains it are
/// selected; otherwise every fix from the run is a candidate. Edits apply
/// against the unit text the diagnostics were produced from, so a stale file
/// on disk is overwritten, never merged.
pub fn apply_fixes(
    units: &[UnitHandle],
    diagnostics: &[Diagnostic],
    filter: Option<&str>,
) -> anyhow::Result<FixReport> {
    // Group selected edits by file. BTreeMap keeps file order stable.
    let mut edits_by_file: BTreeMap<String, Vec<TextEdit>> = BTreeMap::new();
    for diagnostic in diagnostics {
        for fix in &diagnostic.fixes {
            if let Some(needle) = filter {
                if !fix.message.contains(needle) {
                    continue;
                }
            }
            for edit in &fix.edits {
                edits_by_file
                    .entry(edit.file.clone())
                    .or_default()
                    .push(edit.clone());
            }
        }
    }

    let mut report = FixReport::default();

    for (file, mut edits) in edits_by_file {
        // Identical edits proposed by multiple diagnostics collapse to one.
        edits.sort_by_key(|e| (e.span.start_byte, e.span.end_byte, e.new_text.clone()));
        edits.dedup_by(|a, b| a.span == b.span && a.new_text == b.new_text);

        if let Some((first, second)) = find_overlap(&edits) {
            report.conflicts.push(Error::FixConflict {
                file: file.clone(),
                first: describe(first),
                second: describe(second),
            });
            continue;
        }

        // Diagnostics were validated against their units, so a miss here
        // means the caller passed a different unit set.
        let Some(text) = file_text(units, &file) else {
            anyhow::bail!("fix targets {file:?}, which is not a file of any loaded unit");
        };

        // Span validation checks byte bounds only; an in-bounds offset can
        // still land inside a multi-byte character, which replace_range
        // would panic on.
        if let Some(edit) = find_split_char(text, &edits) {
            report.conflicts.push(Error::FixEditBoundary {
                file: file.clone(),
                edit: describe(edit),
            });
            continue;
        }

        let new_text = apply_edits(text, &edits);
        fs::write(Path::new(&file), new_text)?;
        report.applied.push((file, edits.len()));
    }

    Ok(report)
}

/// First edit whose byte range does not fall on character boundaries.
fn find_split_char<'a>(text: &str, edits: &'a [TextEdit]) -> Option<&'a TextEdit> {
    edits.iter().find(|e| {
        !text.is_char_boundary(e.span.start_byte) || !text.is_char_boundary(e.span.end_byte)
    })
}

/// First overlapping pair among position-sorted edits, if any.
fn find_overlap(edits: &[TextEdit]) -> Option<(&TextEdit, &TextEdit)> {
    for pair in edits.windows(2) {
        if pair[0].span.overlaps(&pair[1].span) {
            return Some((&pair[0], &pair[1]));
        }
    }
    None
}

/// Apply non-overlapping, position-sorted edits to `text`.
///
/// Applied in descending order so earlier byte offsets stay valid.
fn apply_edits(text: &str, edits: &[TextEdit]) -> String {
    let mut out = text.to_string();
    for edit in edits.iter().rev() {
        out.replace_range(edit.span.start_byte..edit.span.end_byte, &edit.new_text);
    }
    out
}

fn file_text<'a>(units: &'a [UnitHandle], path: &str) -> Option<&'a str> {
    units
        .iter()
        .find_map(|u| u.file(path))
        .map(|f| f.text.as_str())
}

fn describe(edit: &TextEdit) -> String {
    format!(
        "{}..{} -> {:?}",
        edit.span.start_byte, edit.span.end_byte, edit.new_text
    )
}
