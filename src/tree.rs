//! Immutable syntax trees and pre-order traversal.
//!
//! The front end converts whatever concrete parse tree it produces into this
//! generic form, so the engine and analyzers stay independent of the parser.
//! Traversal is an explicit iterator rather than a callback walk: it is lazy,
//! finite, and restartable (calling `preorder` again starts over), and visits
//! nodes in pre-order, which analyzers rely on for position-ordered output.

use crate::span::Span;

/// One node of an immutable syntax tree.
#[derive(Debug, Clone)]
pub struct SyntaxNode {
    /// Grammar kind name (e.g. "identifier", "function_declaration").
    pub kind: String,
    /// Source span covered by this node.
    pub span: Span,
    /// Child nodes in source order.
    pub children: Vec<SyntaxNode>,
}

impl SyntaxNode {
    /// The node's source text, sliced from the file it was parsed from.
    pub fn text<'a>(&self, source: &'a str) -> &'a str {
        source
            .get(self.span.start_byte..self.span.end_byte)
            .unwrap_or("")
    }
}

/// An immutable parse tree for one source file.
#[derive(Debug, Clone)]
pub struct SyntaxTree {
    /// Root node, covering the whole file.
    pub root: SyntaxNode,
}

impl SyntaxTree {
    /// Iterate all nodes in pre-order.
    pub fn preorder(&self) -> Preorder<'_> {
        Preorder {
            stack: vec![&self.root],
            kinds: None,
        }
    }

    /// Iterate nodes of the given kinds in pre-order.
    ///
    /// Filtering happens on yield; children of non-matching nodes are still
    /// descended into.
    pub fn preorder_kinds<'a>(&'a self, kinds: &'a [&'a str]) -> Preorder<'a> {
        Preorder {
            stack: vec![&self.root],
            kinds: Some(kinds),
        }
    }
}

/// Lazy pre-order iterator over a [`SyntaxTree`].
pub struct Preorder<'a> {
    stack: Vec<&'a SyntaxNode>,
    kinds: Option<&'a [&'a str]>,
}

impl<'a> Iterator for Preorder<'a> {
    type Item = &'a SyntaxNode;

    fn next(&mut self) -> Option<Self::Item> {
        while let Some(node) = self.stack.pop() {
            // Push children reversed so the leftmost child pops first.
            for child in node.children.iter().rev() {
                self.stack.push(child);
            }
            match self.kinds {
                Some(kinds) if !kinds.contains(&node.kind.as_str()) => continue,
                _ => return Some(node),
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(kind: &str, start: usize, end: usize, children: Vec<SyntaxNode>) -> SyntaxNode {
        SyntaxNode {
            kind: kind.to_string(),
            span: Span {
                start_byte: start,
                end_byte: end,
                start_line: 1,
                start_col: start + 1,
                end_line: 1,
                end_col: end + 1,
            },
            children,
        }
    }

    fn sample() -> SyntaxTree {
        // root
        //   decl [ident(a), block(ident(b))]
        //   ident(c)
        SyntaxTree {
            root: node(
                "source_file",
                0,
                10,
                vec![
                    node(
                        "decl",
                        0,
                        8,
                        vec![
                            node("identifier", 0, 1, vec![]),
                            node("block", 2, 8, vec![node("identifier", 3, 4, vec![])]),
                        ],
                    ),
                    node("identifier", 9, 10, vec![]),
                ],
            ),
        }
    }

    #[test]
    fn test_preorder_visits_all_nodes_in_order() {
        let tree = sample();
        let kinds: Vec<_> = tree.preorder().map(|n| n.kind.clone()).collect();
        assert_eq!(
            kinds,
            vec![
                "source_file",
                "decl",
                "identifier",
                "block",
                "identifier",
                "identifier"
            ]
        );
    }

    #[test]
    fn test_preorder_kind_filter_descends_past_non_matches() {
        let tree = sample();
        let idents: Vec<_> = tree
            .preorder_kinds(&["identifier"])
            .map(|n| n.span.start_byte)
            .collect();
        // All three identifiers, in source order.
        assert_eq!(idents, vec![0, 3, 9]);
    }

    #[test]
    fn test_preorder_is_restartable() {
        let tree = sample();
        let first = tree.preorder().count();
        let again = tree.preorder().count();
        assert_eq!(first, again);
    }
}
