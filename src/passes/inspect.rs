//! The `inspect` analyzer: a shared pre-order traversal.
//!
//! Walking a unit's syntax trees is cheap but not free; analyzers that all
//! need node-level access share one [`Inspector`] result instead of each
//! re-walking. Depend on it with `.requires([INSPECT])` and recover it with
//! `pass.result_of::<Inspector>(INSPECT)`.

use std::sync::Arc;

use crate::analyzer::{Analyzer, AnalyzerResult};
use crate::tree::SyntaxNode;
use crate::unit::{SourceFile, UnitHandle};

/// Name of the inspect analyzer.
pub const INSPECT: &str = "inspect";

/// Traversal handle over one unit's syntax trees.
///
/// Holds the unit, so it stays valid after the producing pass is discarded.
pub struct Inspector {
    unit: UnitHandle,
}

impl Inspector {
    /// Visit every node of every file in pre-order.
    pub fn preorder(&self) -> impl Iterator<Item = (&SourceFile, &SyntaxNode)> {
        self.unit
            .files
            .iter()
            .flat_map(|file| file.tree.preorder().map(move |node| (file, node)))
    }

    /// Visit nodes of the given kinds in pre-order.
    pub fn preorder_kinds<'a>(
        &'a self,
        kinds: &'a [&'a str],
    ) -> impl Iterator<Item = (&'a SourceFile, &'a SyntaxNode)> + 'a {
        self.unit
            .files
            .iter()
            .flat_map(move |file| file.tree.preorder_kinds(kinds).map(move |node| (file, node)))
    }
}

/// Build the inspect analyzer.
///
/// Runs despite front-end errors: a partially broken tree is still
/// traversable, and tolerant dependents decide for themselves.
pub fn inspect_analyzer() -> Analyzer {
    Analyzer::new(
        INSPECT,
        "optimize syntax tree traversal: build a reusable pre-order inspector",
        |pass| {
            let inspector = Inspector {
                unit: pass.unit_handle(),
            };
            Ok(Some(Arc::new(inspector) as AnalyzerResult))
        },
    )
    .run_despite_errors(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::span::Span;
    use crate::tree::{SyntaxNode, SyntaxTree};
    use crate::unit::{SymbolTable, Unit, UnitId};

    fn leaf(kind: &str, start: usize) -> SyntaxNode {
        SyntaxNode {
            kind: kind.to_string(),
            span: Span::point(start, 1, start + 1),
            children: vec![],
        }
    }

    #[test]
    fn test_inspector_walks_all_files_in_order() {
        let unit = Arc::new(Unit {
            id: UnitId::from("pkg"),
            files: vec![
                SourceFile {
                    path: "a.go".to_string(),
                    text: String::new(),
                    tree: SyntaxTree {
                        root: SyntaxNode {
                            kind: "source_file".to_string(),
                            span: Span::point(0, 1, 1),
                            children: vec![leaf("identifier", 1)],
                        },
                    },
                },
                SourceFile {
                    path: "b.go".to_string(),
                    text: String::new(),
                    tree: SyntaxTree {
                        root: leaf("source_file", 0),
                    },
                },
            ],
            symbols: SymbolTable::default(),
            imports: vec![],
            errors: vec![],
        });

        let inspector = Inspector { unit };
        let visited: Vec<_> = inspector
            .preorder()
            .map(|(f, n)| (f.path.clone(), n.kind.clone()))
            .collect();
        assert_eq!(
            visited,
            vec![
                ("a.go".to_string(), "source_file".to_string()),
                ("a.go".to_string(), "identifier".to_string()),
                ("b.go".to_string(), "source_file".to_string()),
            ]
        );

        let idents = inspector.preorder_kinds(&["identifier"]).count();
        assert_eq!(idents, 1);
    }
}
