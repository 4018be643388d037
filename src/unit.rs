//! The unit model: one compiled package as the front end delivered it.
//!
//! Units are immutable once constructed and shared read-only (behind `Arc`)
//! for the whole run. The front end guarantees the import graph is acyclic at
//! the unit level.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::span::Span;
use crate::tree::SyntaxTree;

/// Stable identifier for a unit: its import path.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct UnitId(pub String);

impl UnitId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UnitId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for UnitId {
    fn from(s: &str) -> Self {
        UnitId(s.to_string())
    }
}

/// One source file of a unit: the raw text plus its immutable parse tree.
#[derive(Debug)]
pub struct SourceFile {
    /// Path used in diagnostics (absolute or run-relative, as loaded).
    pub path: String,
    /// Raw file contents.
    pub text: String,
    /// Parse tree over `text`.
    pub tree: SyntaxTree,
}

/// Kind of declared symbol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SymbolKind {
    Function,
    Method,
    Type,
    Const,
    Var,
}

impl SymbolKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SymbolKind::Function => "function",
            SymbolKind::Method => "method",
            SymbolKind::Type => "type",
            SymbolKind::Const => "const",
            SymbolKind::Var => "var",
        }
    }
}

impl fmt::Display for SymbolKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A declared symbol extracted by the front end.
#[derive(Debug, Clone)]
pub struct Symbol {
    pub name: String,
    pub kind: SymbolKind,
    /// File the declaration lives in (index into the unit's files).
    pub file: usize,
    pub span: Span,
    /// Whether the symbol is visible outside the unit.
    pub exported: bool,
}

/// Resolved symbol information for one unit.
#[derive(Debug, Default)]
pub struct SymbolTable {
    symbols: Vec<Symbol>,
}

impl SymbolTable {
    pub fn new(mut symbols: Vec<Symbol>) -> Self {
        // Stable order keeps downstream iteration deterministic.
        symbols.sort_by(|a, b| (a.file, a.span.start_byte, &a.name).cmp(&(b.file, b.span.start_byte, &b.name)));
        Self { symbols }
    }

    pub fn iter(&self) -> impl Iterator<Item = &Symbol> {
        self.symbols.iter()
    }

    /// Look up a declaration by name.
    pub fn lookup(&self, name: &str) -> Option<&Symbol> {
        self.symbols.iter().find(|s| s.name == name)
    }

    /// All symbols visible outside the unit.
    pub fn exported(&self) -> impl Iterator<Item = &Symbol> {
        self.symbols.iter().filter(|s| s.exported)
    }
}

/// A syntax or type error the front end hit while building a unit.
#[derive(Debug, Clone)]
pub struct FrontendError {
    /// File the error was found in.
    pub file: String,
    pub span: Span,
    pub message: String,
}

impl fmt::Display for FrontendError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}:{}: {}",
            self.file, self.span.start_line, self.span.start_col, self.message
        )
    }
}

/// One compiled package: sources, symbols, imports, and front-end errors.
#[derive(Debug)]
pub struct Unit {
    pub id: UnitId,
    /// Source files in load order.
    pub files: Vec<SourceFile>,
    /// Extracted declarations.
    pub symbols: SymbolTable,
    /// Directly imported units, by identifier.
    pub imports: Vec<UnitId>,
    /// Syntax/type errors the front end encountered (empty for a clean unit).
    pub errors: Vec<FrontendError>,
}

impl Unit {
    /// Whether the front end reported any errors for this unit.
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    /// Find a file of this unit by path.
    pub fn file(&self, path: &str) -> Option<&SourceFile> {
        self.files.iter().find(|f| f.path == path)
    }

    /// Index of a file of this unit by path.
    pub fn file_index(&self, path: &str) -> Option<usize> {
        self.files.iter().position(|f| f.path == path)
    }
}

/// Shared handle to an immutable unit.
pub type UnitHandle = Arc<Unit>;
