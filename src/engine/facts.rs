//! Cross-unit facts.
//!
//! A fact is a serializable conclusion one analyzer attaches to an exported
//! symbol of a unit. Facts flow down the import graph: a pass analyzing unit
//! B sees facts produced for any unit B transitively imports, for the same
//! analyzer. Visibility is enforced by the pass's view, not by callers.

use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, RwLock};

use crate::unit::UnitId;

/// A serializable analysis conclusion attached to one exported symbol.
///
/// `encode` produces the wire form; the store snapshots it at export time so
/// facts can be dumped or persisted without revisiting the producing pass.
pub trait Fact: Any + Send + Sync + fmt::Debug {
    fn encode(&self) -> serde_json::Value;
}

/// Key for one stored fact: (analyzer, unit, symbol).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub(crate) struct FactKey {
    pub analyzer: String,
    pub unit: UnitId,
    pub symbol: String,
}

pub(crate) struct FactEntry {
    pub value: Arc<dyn Any + Send + Sync>,
    pub encoded: serde_json::Value,
    pub type_name: &'static str,
}

/// Run-scoped fact storage. Lives exactly as long as one run.
#[derive(Default)]
pub struct FactStore {
    facts: RwLock<HashMap<FactKey, FactEntry>>,
}

impl FactStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn insert(&self, key: FactKey, entry: FactEntry) {
        let mut facts = self.facts.write().unwrap();
        facts.insert(key, entry);
    }

    pub(crate) fn get(
        &self,
        analyzer: &str,
        unit: &UnitId,
        symbol: &str,
    ) -> Option<(Arc<dyn Any + Send + Sync>, &'static str)> {
        let facts = self.facts.read().unwrap();
        let key = FactKey {
            analyzer: analyzer.to_string(),
            unit: unit.clone(),
            symbol: symbol.to_string(),
        };
        facts
            .get(&key)
            .map(|e| (Arc::clone(&e.value), e.type_name))
    }

    /// Encoded snapshot of every stored fact, in deterministic key order.
    pub fn dump(&self) -> serde_json::Value {
        let facts = self.facts.read().unwrap();
        let mut entries: Vec<_> = facts.iter().collect();
        entries.sort_by(|a, b| a.0.cmp(b.0));

        let rows: Vec<serde_json::Value> = entries
            .into_iter()
            .map(|(key, entry)| {
                serde_json::json!({
                    "analyzer": key.analyzer,
                    "unit": key.unit.as_str(),
                    "symbol": key.symbol,
                    "fact": entry.encoded,
                })
            })
            .collect();
        serde_json::Value::Array(rows)
    }

    pub fn len(&self) -> usize {
        self.facts.read().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct Exported(bool);

    impl Fact for Exported {
        fn encode(&self) -> serde_json::Value {
            serde_json::json!({ "exported": self.0 })
        }
    }

    fn key(analyzer: &str, unit: &str, symbol: &str) -> FactKey {
        FactKey {
            analyzer: analyzer.to_string(),
            unit: UnitId::from(unit),
            symbol: symbol.to_string(),
        }
    }

    fn entry(fact: Exported) -> FactEntry {
        FactEntry {
            encoded: fact.encode(),
            type_name: std::any::type_name::<Exported>(),
            value: Arc::new(fact),
        }
    }

    #[test]
    fn test_store_and_fetch() {
        let store = FactStore::new();
        store.insert(key("x", "a", "Foo"), entry(Exported(true)));

        let (value, type_name) = store.get("x", &UnitId::from("a"), "Foo").unwrap();
        assert!(type_name.contains("Exported"));
        let fact = value.downcast::<Exported>().unwrap();
        assert!(fact.0);

        // Different analyzer does not see it.
        assert!(store.get("y", &UnitId::from("a"), "Foo").is_none());
    }

    #[test]
    fn test_dump_is_sorted() {
        let store = FactStore::new();
        store.insert(key("x", "b", "Bar"), entry(Exported(false)));
        store.insert(key("x", "a", "Foo"), entry(Exported(true)));

        let dump = store.dump();
        let rows = dump.as_array().unwrap();
        assert_eq!(rows[0]["unit"], "a");
        assert_eq!(rows[1]["unit"], "b");
    }
}
