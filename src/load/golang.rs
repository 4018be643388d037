//! Go front end using tree-sitter.
//!
//! Each directory containing `.go` files is loaded as one unit. Parse trees
//! are converted to the engine's generic [`SyntaxTree`]; exported
//! declarations become the unit's symbol table; syntax errors become
//! front-end errors on the unit. Imports are resolved against the other
//! loaded units by path-component suffix, so `example.com/demo/util`
//! resolves to the loaded `demo/util` package.

use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::{Path, PathBuf};

use streaming_iterator::StreamingIterator;
use tree_sitter::{Language, Parser, Query, QueryCursor};
use walkdir::WalkDir;

use super::{LoadFailure, LoadResult, Loader, Target};
use crate::span::Span;
use crate::tree::{SyntaxNode, SyntaxTree};
use crate::unit::{
    FrontendError, SourceFile, Symbol, SymbolKind, SymbolTable, Unit, UnitId,
};

/// Tree-sitter query for extracting Go declarations.
const DECLARATION_QUERY: &str = r#"
; Function declarations
(function_declaration
  name: (identifier) @func_name
) @function

; Method declarations (with receiver)
(method_declaration
  name: (field_identifier) @method_name
) @method

; Type declarations
(type_declaration
  (type_spec
    name: (type_identifier) @type_name
  )
) @type

; Constant declarations
(const_declaration
  (const_spec
    name: (identifier) @const_name
  )
) @const

; Variable declarations
(var_declaration
  (var_spec
    name: (identifier) @var_name
  )
) @var
"#;

/// Tree-sitter query for extracting imports.
const IMPORT_QUERY: &str = r#"
(import_spec
  path: (interpreted_string_literal) @path
)
"#;

/// Loads Go packages from the filesystem.
pub struct GoLoader {
    language: Language,
}

impl GoLoader {
    pub fn new() -> Self {
        Self {
            language: tree_sitter_go::LANGUAGE.into(),
        }
    }

    /// Create a parser for this call; tree-sitter parsers are not `Sync`.
    fn create_parser(&self) -> anyhow::Result<Parser> {
        let mut parser = Parser::new();
        parser.set_language(&self.language)?;
        Ok(parser)
    }

    /// Parse one source file into its generic form plus extracted facts.
    fn parse_file(&self, path: &Path) -> anyhow::Result<ParsedGoFile> {
        let text = fs::read_to_string(path)?;
        let mut parser = self.create_parser()?;
        let ts_tree = parser
            .parse(text.as_bytes(), None)
            .ok_or_else(|| anyhow::anyhow!("failed to parse Go source: {}", path.display()))?;

        let display_path = path.display().to_string();
        let root = ts_tree.root_node();

        let mut errors = Vec::new();
        if root.has_error() {
            collect_syntax_errors(root, &display_path, &mut errors);
        }

        let symbols = self.extract_symbols(&ts_tree, &text)?;
        let imports = self.extract_imports(&ts_tree, &text)?;
        let tree = SyntaxTree {
            root: convert_node(root),
        };

        Ok(ParsedGoFile {
            file: SourceFile {
                path: display_path,
                text,
                tree,
            },
            symbols,
            imports,
            errors,
        })
    }

    fn extract_symbols(
        &self,
        tree: &tree_sitter::Tree,
        source: &str,
    ) -> anyhow::Result<Vec<(String, SymbolKind, Span)>> {
        let query = Query::new(&self.language, DECLARATION_QUERY)?;
        let mut cursor = QueryCursor::new();
        let mut matches = cursor.matches(&query, tree.root_node(), source.as_bytes());

        let mut symbols = Vec::new();
        while let Some(m) = matches.next() {
            let mut name = String::new();
            let mut kind = SymbolKind::Function;
            let mut span = None;

            for capture in m.captures {
                let capture_name = query.capture_names()[capture.index as usize];
                match capture_name {
                    "func_name" => {
                        name = node_text(capture.node, source);
                        kind = SymbolKind::Function;
                    }
                    "method_name" => {
                        name = node_text(capture.node, source);
                        kind = SymbolKind::Method;
                    }
                    "type_name" => {
                        name = node_text(capture.node, source);
                        kind = SymbolKind::Type;
                    }
                    "const_name" => {
                        name = node_text(capture.node, source);
                        kind = SymbolKind::Const;
                    }
                    "var_name" => {
                        name = node_text(capture.node, source);
                        kind = SymbolKind::Var;
                    }
                    "function" | "method" | "type" | "const" | "var" => {
                        span = Some(Span::from_node(capture.node));
                    }
                    _ => {}
                }
            }

            if !name.is_empty() {
                if let Some(span) = span {
                    symbols.push((name, kind, span));
                }
            }
        }

        // Sort by position for deterministic output.
        symbols.sort_by(|a, b| (a.2.start_byte, &a.0).cmp(&(b.2.start_byte, &b.0)));
        symbols.dedup_by(|a, b| a.0 == b.0 && a.2 == b.2);
        Ok(symbols)
    }

    fn extract_imports(&self, tree: &tree_sitter::Tree, source: &str) -> anyhow::Result<Vec<String>> {
        let query = Query::new(&self.language, IMPORT_QUERY)?;
        let mut cursor = QueryCursor::new();
        let mut matches = cursor.matches(&query, tree.root_node(), source.as_bytes());

        let mut imports = Vec::new();
        while let Some(m) = matches.next() {
            for capture in m.captures {
                let name = query.capture_names()[capture.index as usize];
                if name == "path" {
                    let raw = node_text(capture.node, source);
                    imports.push(raw.trim_matches('"').to_string());
                }
            }
        }
        imports.sort();
        imports.dedup();
        Ok(imports)
    }

    /// Build one unit from a package directory.
    fn build_unit(&self, dir: &Path) -> anyhow::Result<PendingUnit> {
        let mut go_files: Vec<PathBuf> = fs::read_dir(dir)?
            .filter_map(|e| e.ok())
            .map(|e| e.path())
            .filter(|p| {
                p.is_file() && p.extension().map(|e| e == "go").unwrap_or(false)
            })
            .collect();
        go_files.sort();

        let mut files = Vec::new();
        let mut symbols = Vec::new();
        let mut imports = Vec::new();
        let mut errors = Vec::new();

        for path in go_files {
            let parsed = self.parse_file(&path)?;
            let file_index = files.len();
            for (name, kind, span) in parsed.symbols {
                let exported = name.chars().next().map(char::is_uppercase).unwrap_or(false);
                symbols.push(Symbol {
                    name,
                    kind,
                    file: file_index,
                    span,
                    exported,
                });
            }
            imports.extend(parsed.imports);
            errors.extend(parsed.errors);
            files.push(parsed.file);
        }

        imports.sort();
        imports.dedup();

        Ok(PendingUnit {
            id: dir.display().to_string(),
            files,
            symbols,
            raw_imports: imports,
            errors,
        })
    }
}

impl Default for GoLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl Loader for GoLoader {
    fn load(&self, targets: &[Target]) -> anyhow::Result<LoadResult> {
        let mut result = LoadResult::default();
        // BTreeMap keyed by unit id dedups across targets and keeps load
        // order deterministic.
        let mut dirs: BTreeMap<String, PathBuf> = BTreeMap::new();

        for target in targets {
            match target {
                Target::Dir(path) => {
                    if !path.is_dir() {
                        result.failures.push(LoadFailure {
                            pattern: target.pattern(),
                            message: "no such directory".to_string(),
                        });
                        continue;
                    }
                    let found = package_dirs_under(path);
                    if found.is_empty() {
                        result.failures.push(LoadFailure {
                            pattern: target.pattern(),
                            message: "no Go packages found".to_string(),
                        });
                        continue;
                    }
                    for dir in found {
                        dirs.insert(dir.display().to_string(), dir);
                    }
                }
                Target::File(path) => {
                    let is_go = path.extension().map(|e| e == "go").unwrap_or(false);
                    if !path.is_file() || !is_go {
                        result.failures.push(LoadFailure {
                            pattern: target.pattern(),
                            message: "no such Go file".to_string(),
                        });
                        continue;
                    }
                    let dir = path.parent().unwrap_or(Path::new(".")).to_path_buf();
                    dirs.insert(dir.display().to_string(), dir);
                }
            }
        }

        let mut pending = Vec::new();
        for dir in dirs.values() {
            pending.push(self.build_unit(dir)?);
        }

        // Resolve imports against the other loaded units.
        let ids: Vec<String> = pending.iter().map(|p| p.id.clone()).collect();
        let mut resolved: Vec<ResolvedUnit> = pending
            .into_iter()
            .map(|unit| {
                let imports = unit
                    .raw_imports
                    .iter()
                    .filter_map(|imp| resolve_import(imp, &unit.id, &ids))
                    .collect();
                ResolvedUnit {
                    id: UnitId(unit.id),
                    files: unit.files,
                    symbols: unit.symbols,
                    imports,
                    errors: unit.errors,
                }
            })
            .collect();

        // The engine requires an acyclic unit graph; mutually-importing
        // packages are invalid Go but still parse cleanly.
        break_import_cycles(&mut resolved);

        for unit in resolved {
            result.units.push(std::sync::Arc::new(Unit {
                id: unit.id,
                files: unit.files,
                symbols: SymbolTable::new(unit.symbols),
                imports: unit.imports,
                errors: unit.errors,
            }));
        }

        Ok(result)
    }
}

struct ParsedGoFile {
    file: SourceFile,
    symbols: Vec<(String, SymbolKind, Span)>,
    imports: Vec<String>,
    errors: Vec<FrontendError>,
}

struct PendingUnit {
    id: String,
    files: Vec<SourceFile>,
    symbols: Vec<Symbol>,
    raw_imports: Vec<String>,
    errors: Vec<FrontendError>,
}

struct ResolvedUnit {
    id: UnitId,
    files: Vec<SourceFile>,
    symbols: Vec<Symbol>,
    imports: Vec<UnitId>,
    errors: Vec<FrontendError>,
}

#[derive(Clone, Copy, PartialEq)]
enum CycleMark {
    New,
    Visiting,
    Done,
}

/// Drop import edges that close a cycle among the loaded units, recording a
/// front-end error on each unit whose edge was dropped.
///
/// Import cycles are invalid Go, but the sources still parse cleanly, so
/// nothing upstream catches them. The engine requires an acyclic unit graph.
fn break_import_cycles(units: &mut [ResolvedUnit]) {
    let index: HashMap<UnitId, usize> = units
        .iter()
        .enumerate()
        .map(|(i, u)| (u.id.clone(), i))
        .collect();
    let mut marks = vec![CycleMark::New; units.len()];

    fn visit(
        i: usize,
        units: &mut [ResolvedUnit],
        index: &HashMap<UnitId, usize>,
        marks: &mut [CycleMark],
    ) {
        marks[i] = CycleMark::Visiting;
        let imports = std::mem::take(&mut units[i].imports);
        let mut kept = Vec::with_capacity(imports.len());
        for import in imports {
            match index.get(&import).map(|&j| (j, marks[j])) {
                Some((_, CycleMark::Visiting)) => {
                    let file = units[i]
                        .files
                        .first()
                        .map(|f| f.path.clone())
                        .unwrap_or_else(|| units[i].id.to_string());
                    units[i].errors.push(FrontendError {
                        file,
                        span: Span::point(0, 1, 1),
                        message: format!(
                            "import cycle not allowed: {} imports {}",
                            units[i].id, import
                        ),
                    });
                    continue;
                }
                Some((j, CycleMark::New)) => visit(j, units, index, marks),
                Some((_, CycleMark::Done)) | None => {}
            }
            kept.push(import);
        }
        units[i].imports = kept;
        marks[i] = CycleMark::Done;
    }

    for i in 0..units.len() {
        if marks[i] == CycleMark::New {
            visit(i, units, &index, &mut marks);
        }
    }
}

/// Every directory under `root` (inclusive) that contains `.go` files,
/// skipping hidden, vendor, and testdata directories.
fn package_dirs_under(root: &Path) -> Vec<PathBuf> {
    let mut dirs = Vec::new();
    for entry in WalkDir::new(root)
        .follow_links(true)
        .into_iter()
        .filter_entry(|e| {
            let name = e.file_name().to_string_lossy();
            if e.file_type().is_dir() && e.depth() > 0 {
                if name.starts_with('.') || name == "vendor" || name == "testdata" {
                    return false;
                }
            }
            true
        })
        .filter_map(|e| e.ok())
    {
        if entry.file_type().is_dir() {
            let has_go = fs::read_dir(entry.path())
                .map(|mut it| {
                    it.any(|e| {
                        e.map(|e| {
                            e.path().extension().map(|x| x == "go").unwrap_or(false)
                        })
                        .unwrap_or(false)
                    })
                })
                .unwrap_or(false);
            if has_go {
                dirs.push(entry.path().to_path_buf());
            }
        }
    }
    dirs.sort();
    dirs
}

/// Resolve an import path to a loaded unit by path-component suffix match.
///
/// The longest match wins; ties break lexicographically by unit id.
fn resolve_import(import: &str, self_id: &str, ids: &[String]) -> Option<UnitId> {
    let imp: Vec<&str> = import.split('/').filter(|c| !c.is_empty()).collect();
    let mut best: Option<(usize, &String)> = None;

    for id in ids {
        if id == self_id {
            continue;
        }
        let idc: Vec<String> = Path::new(id)
            .components()
            .map(|c| c.as_os_str().to_string_lossy().to_string())
            .collect();
        // Longest run of matching trailing components.
        let overlap = imp
            .iter()
            .rev()
            .zip(idc.iter().rev())
            .take_while(|&(a, b)| *a == b.as_str())
            .count();
        if overlap == 0 {
            continue;
        }
        let better = match best {
            Some((len, id_so_far)) => overlap > len || (overlap == len && id < id_so_far),
            None => true,
        };
        if better {
            best = Some((overlap, id));
        }
    }

    best.map(|(_, id)| UnitId(id.clone()))
}

/// Convert a tree-sitter node (named children only) into the generic tree.
fn convert_node(node: tree_sitter::Node) -> SyntaxNode {
    let mut children = Vec::new();
    let mut cursor = node.walk();
    for child in node.named_children(&mut cursor) {
        children.push(convert_node(child));
    }
    SyntaxNode {
        kind: node.kind().to_string(),
        span: Span::from_node(node),
        children,
    }
}

/// Collect syntax errors (ERROR and missing nodes) from a broken tree.
fn collect_syntax_errors(node: tree_sitter::Node, path: &str, out: &mut Vec<FrontendError>) {
    if node.is_error() {
        out.push(FrontendError {
            file: path.to_string(),
            span: Span::from_node(node),
            message: "syntax error".to_string(),
        });
        return;
    }
    if node.is_missing() {
        out.push(FrontendError {
            file: path.to_string(),
            span: Span::from_node(node),
            message: format!("missing {}", node.kind()),
        });
        return;
    }
    if !node.has_error() {
        return;
    }
    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        collect_syntax_errors(child, path, out);
    }
}

fn node_text(node: tree_sitter::Node, source: &str) -> String {
    node.utf8_text(source.as_bytes()).unwrap_or("").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn write(dir: &Path, name: &str, content: &str) {
        fs::write(dir.join(name), content).unwrap();
    }

    #[test]
    fn test_load_single_package() {
        let temp = TempDir::new().unwrap();
        write(
            temp.path(),
            "main.go",
            "package main\n\nfunc Main() {}\n\nfunc helper() {}\n",
        );

        let loader = GoLoader::new();
        let result = loader
            .load(&[Target::Dir(temp.path().to_path_buf())])
            .unwrap();
        assert!(result.failures.is_empty());
        assert_eq!(result.units.len(), 1);

        let unit = &result.units[0];
        assert_eq!(unit.files.len(), 1);
        assert!(!unit.has_errors());
        assert!(unit.symbols.lookup("Main").unwrap().exported);
        assert!(!unit.symbols.lookup("helper").unwrap().exported);
    }

    #[test]
    fn test_load_file_target_resolves_to_containing_unit() {
        let temp = TempDir::new().unwrap();
        write(temp.path(), "main.go", "package main\nfunc main() {}\n");

        let loader = GoLoader::new();
        let result = loader
            .load(&[Target::File(temp.path().join("main.go"))])
            .unwrap();
        assert_eq!(result.units.len(), 1);
        assert_eq!(result.units[0].files.len(), 1);
    }

    #[test]
    fn test_missing_pattern_fails_without_partial_units() {
        let loader = GoLoader::new();
        let result = loader
            .load(&[Target::Dir(PathBuf::from("/definitely/not/here"))])
            .unwrap();
        assert!(result.units.is_empty());
        assert_eq!(result.failures.len(), 1);
    }

    #[test]
    fn test_syntax_error_becomes_frontend_error() {
        let temp = TempDir::new().unwrap();
        write(temp.path(), "bad.go", "package main\n\nfunc broken( {\n");

        let loader = GoLoader::new();
        let result = loader
            .load(&[Target::Dir(temp.path().to_path_buf())])
            .unwrap();
        assert_eq!(result.units.len(), 1);
        assert!(result.units[0].has_errors());
    }

    #[test]
    fn test_import_graph_between_loaded_packages() {
        let temp = TempDir::new().unwrap();
        let util = temp.path().join("util");
        let app = temp.path().join("app");
        fs::create_dir_all(&util).unwrap();
        fs::create_dir_all(&app).unwrap();
        write(&util, "util.go", "package util\n\nfunc Do() {}\n");
        write(
            &app,
            "app.go",
            "package app\n\nimport \"example.com/demo/util\"\n\nfunc Run() { util.Do() }\n",
        );

        let loader = GoLoader::new();
        let result = loader
            .load(&[Target::Dir(temp.path().to_path_buf())])
            .unwrap();
        assert_eq!(result.units.len(), 2);

        let app_unit = result
            .units
            .iter()
            .find(|u| u.id.as_str().ends_with("app"))
            .unwrap();
        assert_eq!(app_unit.imports.len(), 1);
        assert!(app_unit.imports[0].as_str().ends_with("util"));
    }

    #[test]
    fn test_import_cycle_is_broken_and_reported() {
        let temp = TempDir::new().unwrap();
        let alpha = temp.path().join("alpha");
        let beta = temp.path().join("beta");
        fs::create_dir_all(&alpha).unwrap();
        fs::create_dir_all(&beta).unwrap();
        write(
            &alpha,
            "alpha.go",
            "package alpha\n\nimport \"example.com/x/beta\"\n\nfunc A() { beta.B() }\n",
        );
        write(
            &beta,
            "beta.go",
            "package beta\n\nimport \"example.com/x/alpha\"\n\nfunc B() { alpha.A() }\n",
        );

        let loader = GoLoader::new();
        let result = loader
            .load(&[Target::Dir(temp.path().to_path_buf())])
            .unwrap();
        assert_eq!(result.units.len(), 2);

        let a = result
            .units
            .iter()
            .find(|u| u.id.as_str().ends_with("alpha"))
            .unwrap();
        let b = result
            .units
            .iter()
            .find(|u| u.id.as_str().ends_with("beta"))
            .unwrap();

        // The back edge was dropped, so the pair is no longer mutual.
        assert!(!(a.imports.contains(&b.id) && b.imports.contains(&a.id)));

        // Exactly one unit carries the cycle error.
        let errored: Vec<_> = result.units.iter().filter(|u| u.has_errors()).collect();
        assert_eq!(errored.len(), 1);
        assert!(errored[0].errors[0].message.contains("import cycle"));
    }

    #[test]
    fn test_self_import_edge_is_never_created() {
        // resolve_import skips the importing unit itself, so a package that
        // names its own path gets no edge rather than a self-cycle.
        let ids = vec!["x/alpha".to_string()];
        assert!(resolve_import("example.com/x/alpha", "x/alpha", &ids).is_none());
    }

    #[test]
    fn test_resolve_import_prefers_longest_suffix() {
        let ids = vec!["a/util".to_string(), "b/demo/util".to_string()];
        let resolved = resolve_import("example.com/demo/util", "self", &ids).unwrap();
        assert_eq!(resolved.as_str(), "b/demo/util");
    }
}
