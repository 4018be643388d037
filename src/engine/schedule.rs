//! Requirement-graph resolution.
//!
//! Expands a requested root set of analyzers to its full transitive closure
//! and computes an execution order in which every analyzer appears after all
//! of its requirements. Cycles and unknown names are configuration errors
//! detected here, before any pass runs.
//!
//! Ordering is deterministic: root names are visited in sorted order and each
//! analyzer's requirements in declaration order, so a fixed registry and root
//! set always yield the same plan.

use std::collections::HashMap;

use crate::analyzer::{AnalyzerHandle, Registry};
use crate::error::{Error, Result};

#[derive(Clone, Copy, PartialEq)]
enum Mark {
    Visiting,
    Done,
}

/// Compute the transitive closure of `roots` in topological order
/// (requirements first).
pub fn plan(registry: &Registry, roots: &[String]) -> Result<Vec<AnalyzerHandle>> {
    let mut sorted_roots: Vec<&String> = roots.iter().collect();
    sorted_roots.sort();
    sorted_roots.dedup();

    let mut marks: HashMap<String, Mark> = HashMap::new();
    let mut order: Vec<AnalyzerHandle> = Vec::new();

    for root in sorted_roots {
        let analyzer = registry
            .get(root)
            .ok_or_else(|| Error::UnknownAnalyzer(root.clone()))?;
        let mut path = Vec::new();
        visit(registry, analyzer, &mut marks, &mut path, &mut order)?;
    }

    Ok(order)
}

fn visit(
    registry: &Registry,
    analyzer: &AnalyzerHandle,
    marks: &mut HashMap<String, Mark>,
    path: &mut Vec<String>,
    order: &mut Vec<AnalyzerHandle>,
) -> Result<()> {
    match marks.get(analyzer.name()) {
        Some(Mark::Done) => return Ok(()),
        Some(Mark::Visiting) => {
            // Reconstruct the cycle from the point it closes.
            let start = path
                .iter()
                .position(|n| n == analyzer.name())
                .unwrap_or(0);
            let mut cycle = path[start..].to_vec();
            cycle.push(analyzer.name().to_string());
            return Err(Error::RequirementCycle(cycle.join(" -> ")));
        }
        None => {}
    }

    marks.insert(analyzer.name().to_string(), Mark::Visiting);
    path.push(analyzer.name().to_string());

    for requirement in analyzer.requirements() {
        let dep = registry
            .get(requirement)
            .ok_or_else(|| Error::UnknownRequirement {
                analyzer: analyzer.name().to_string(),
                requirement: requirement.clone(),
            })?;
        visit(registry, dep, marks, path, order)?;
    }

    path.pop();
    marks.insert(analyzer.name().to_string(), Mark::Done);
    order.push(std::sync::Arc::clone(analyzer));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzer::Analyzer;

    fn noop(name: &str, requires: &[&str]) -> Analyzer {
        Analyzer::new(name, "no-op", |_pass| Ok(None))
            .requires(requires.iter().copied())
    }

    fn registry(analyzers: Vec<Analyzer>) -> Registry {
        let mut reg = Registry::new();
        for a in analyzers {
            reg.register(a).unwrap();
        }
        reg
    }

    fn names(plan: &[AnalyzerHandle]) -> Vec<&str> {
        plan.iter().map(|a| a.name()).collect()
    }

    #[test]
    fn test_requirements_precede_dependents() {
        let reg = registry(vec![
            noop("c", &["b"]),
            noop("b", &["a"]),
            noop("a", &[]),
        ]);
        let plan = plan(&reg, &["c".to_string()]).unwrap();
        assert_eq!(names(&plan), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_diamond_runs_shared_requirement_once() {
        let reg = registry(vec![
            noop("base", &[]),
            noop("left", &["base"]),
            noop("right", &["base"]),
            noop("top", &["left", "right"]),
        ]);
        let plan = plan(&reg, &["top".to_string()]).unwrap();
        assert_eq!(names(&plan), vec!["base", "left", "right", "top"]);
    }

    #[test]
    fn test_order_is_deterministic_for_independent_roots() {
        let reg = registry(vec![noop("zeta", &[]), noop("alpha", &[])]);
        let roots = vec!["zeta".to_string(), "alpha".to_string()];
        let first = names(&plan(&reg, &roots).unwrap()).join(",");
        // Roots are visited in sorted order regardless of request order.
        assert_eq!(first, "alpha,zeta");
        let reversed = vec!["alpha".to_string(), "zeta".to_string()];
        let second = plan(&reg, &reversed).unwrap();
        assert_eq!(names(&second).join(","), first);
    }

    #[test]
    fn test_cycle_is_rejected_and_named() {
        let reg = registry(vec![noop("a", &["b"]), noop("b", &["a"])]);
        let err = plan(&reg, &["a".to_string()]).unwrap_err();
        match err {
            Error::RequirementCycle(cycle) => {
                assert_eq!(cycle, "a -> b -> a");
            }
            other => panic!("expected cycle error, got {other}"),
        }
    }

    #[test]
    fn test_self_cycle_is_rejected() {
        let reg = registry(vec![noop("selfish", &["selfish"])]);
        assert!(matches!(
            plan(&reg, &["selfish".to_string()]),
            Err(Error::RequirementCycle(_))
        ));
    }

    #[test]
    fn test_unknown_requirement() {
        let reg = registry(vec![noop("a", &["ghost"])]);
        let err = plan(&reg, &["a".to_string()]).unwrap_err();
        assert!(matches!(err, Error::UnknownRequirement { .. }));
    }

    #[test]
    fn test_unknown_root() {
        let reg = registry(vec![noop("a", &[])]);
        assert!(matches!(
            plan(&reg, &["ghost".to_string()]),
            Err(Error::UnknownAnalyzer(_))
        ));
    }
}
