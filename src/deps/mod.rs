// Copyright (c) 2022 Huawei Technologies Co.,Ltd. All rights reserved.
//
// svcmaster is licensed under Mulan PSL v2.
// You can use this software according to the terms and conditions of the Mulan
// PSL v2.
// You may obtain a copy of Mulan PSL v2 at:
//         http://license.coscl.org.cn/MulanPSL2
// THIS SOFTWARE IS PROVIDED ON AN "AS IS" BASIS, WITHOUT WARRANTIES OF ANY
// KIND, EITHER EXPRESS OR IMPLIED, INCLUDING BUT NOT LIMITED TO
// NON-INFRINGEMENT, MERCHANTABILITY OR FIT FOR A PARTICULAR PURPOSE.
// See the Mulan PSL v2 for more details.

//! Dependency edges as supplied by loaders. A source answers the forward
//! query (what does this unit require) and the reverse query (who requires
//! this unit); the reverse view is computed by scanning, never stored.

use crate::unit::{UnitDescriptor, UnitId};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

pub trait DependencySource: Send + Sync {
    /// Declared dependency edges of `unit`, in declaration order.
    fn edges(&self, unit: &UnitId) -> Vec<UnitId>;

    /// Units that declare a dependency on `unit`.
    fn dependents(&self, unit: &UnitId) -> Vec<UnitId>;
}

/// In-memory dependency source, the shape a configuration loader fills in.
#[derive(Default)]
pub struct DepTable {
    // key: source unit, value: target units in declaration order
    t: Mutex<HashMap<UnitId, Vec<UnitId>>>,
}

impl DepTable {
    pub fn new() -> DepTable {
        DepTable::default()
    }

    pub fn add_edge(&self, source: UnitId, target: UnitId) {
        if source == target {
            return;
        }
        let mut t = self.t.lock().expect("dep table lock poisoned");
        let targets = t.entry(source).or_default();
        if !targets.contains(&target) {
            targets.push(target);
        }
    }

    /// Takes the `requires` list of a descriptor as this unit's edges.
    pub fn add_descriptor(&self, descriptor: &UnitDescriptor) {
        let source = descriptor.id();
        for target in &descriptor.requires {
            self.add_edge(source.clone(), target.clone());
        }
    }

    pub fn remove_unit(&self, unit: &UnitId) {
        let mut t = self.t.lock().expect("dep table lock poisoned");
        t.remove(unit);
        for targets in t.values_mut() {
            targets.retain(|u| u != unit);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.t.lock().expect("dep table lock poisoned").is_empty()
    }
}

impl DependencySource for DepTable {
    fn edges(&self, unit: &UnitId) -> Vec<UnitId> {
        self.t
            .lock()
            .expect("dep table lock poisoned")
            .get(unit)
            .cloned()
            .unwrap_or_default()
    }

    fn dependents(&self, unit: &UnitId) -> Vec<UnitId> {
        let t = self.t.lock().expect("dep table lock poisoned");
        let mut out: Vec<UnitId> = t
            .iter()
            .filter(|(_, targets)| targets.contains(unit))
            .map(|(source, _)| source.clone())
            .collect();
        out.sort();
        out
    }
}

/// Whether `source` transitively depends on `target`, expanding declared
/// edges over all `sources`. The seen set bounds the walk, so a cyclic
/// declaration terminates instead of recursing forever.
pub fn is_depends(sources: &[Arc<dyn DependencySource>], source: &UnitId, target: &UnitId) -> bool {
    let mut seen: HashSet<UnitId> = HashSet::new();
    let mut stack: Vec<UnitId> = edges_over(sources, source);
    while let Some(next) = stack.pop() {
        if next == *target {
            return true;
        }
        if seen.insert(next.clone()) {
            stack.extend(edges_over(sources, &next));
        }
    }
    false
}

fn edges_over(sources: &[Arc<dyn DependencySource>], unit: &UnitId) -> Vec<UnitId> {
    let mut out = Vec::new();
    for source in sources {
        out.extend(source.edges(unit));
    }
    out
}

/// Reverse query over every source.
pub fn dependents_over(sources: &[Arc<dyn DependencySource>], unit: &UnitId) -> Vec<UnitId> {
    let mut out = Vec::new();
    for source in sources {
        for dependent in source.dependents(unit) {
            if !out.contains(&dependent) {
                out.push(dependent);
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(name: &str) -> UnitId {
        UnitId::new("r", name)
    }

    fn table(edges: &[(&str, &str)]) -> Arc<DepTable> {
        let t = DepTable::new();
        for (s, d) in edges {
            t.add_edge(id(s), id(d));
        }
        Arc::new(t)
    }

    #[test]
    fn edges_keep_declaration_order() {
        let t = DepTable::new();
        t.add_edge(id("api"), id("db"));
        t.add_edge(id("api"), id("cache"));
        t.add_edge(id("api"), id("db")); // duplicate
        assert_eq!(t.edges(&id("api")), vec![id("db"), id("cache")]);
    }

    #[test]
    fn self_edge_is_ignored() {
        let t = DepTable::new();
        t.add_edge(id("a"), id("a"));
        assert!(t.is_empty());
    }

    #[test]
    fn dependents_are_computed_by_scan() {
        let t = table(&[("api", "db"), ("worker", "db"), ("api", "cache")]);
        assert_eq!(t.dependents(&id("db")), vec![id("api"), id("worker")]);
        assert!(t.dependents(&id("api")).is_empty());
    }

    #[test]
    fn transitive_walk_short_circuits() {
        let t = table(&[("a", "b"), ("b", "c"), ("c", "d")]);
        let sources: Vec<Arc<dyn DependencySource>> = vec![t];
        assert!(is_depends(&sources, &id("a"), &id("d")));
        assert!(is_depends(&sources, &id("b"), &id("c")));
        assert!(!is_depends(&sources, &id("d"), &id("a")));
    }

    #[test]
    fn cyclic_declaration_terminates() {
        let t = table(&[("a", "b"), ("b", "c"), ("c", "a")]);
        let sources: Vec<Arc<dyn DependencySource>> = vec![t];
        assert!(is_depends(&sources, &id("a"), &id("a")));
        assert!(is_depends(&sources, &id("c"), &id("b")));
        assert!(!is_depends(&sources, &id("a"), &id("zzz")));
    }

    #[test]
    fn edges_merge_across_sources() {
        let t1 = table(&[("api", "db")]);
        let t2 = table(&[("api", "cache")]);
        let sources: Vec<Arc<dyn DependencySource>> = vec![t1, t2];
        assert!(is_depends(&sources, &id("api"), &id("db")));
        assert!(is_depends(&sources, &id("api"), &id("cache")));
        assert_eq!(
            dependents_over(&sources, &id("db")),
            vec![id("api")]
        );
    }

    #[test]
    fn removing_a_unit_drops_both_directions() {
        let t = table(&[("api", "db"), ("db", "disk")]);
        t.remove_unit(&id("db"));
        assert!(t.edges(&id("db")).is_empty());
        assert!(t.edges(&id("api")).is_empty());
    }
}
