//! Which file manifests were added as dependencies of which others.
//!
//! Keys are dependency manifest paths, values the manifests depending on them,
//! e.g. `mods/fabric-api.sculk.json -> [mods/sodium.sculk.json]`. A key whose
//! dependant list is empty is orphaned and can be removed from the pack.

use crate::layout::PackLayout;
use crate::{write_atomic, StoreError};
use sculk_schema::encode_json;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use tracing::debug;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DependencyGraph(BTreeMap<String, Vec<String>>);

impl DependencyGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load `dependency-graph.sculk.json`, or an empty graph if the pack has none yet.
    pub fn load(layout: &PackLayout) -> Result<Self, StoreError> {
        let path = layout.dependency_graph();
        if !path.exists() {
            return Ok(Self::new());
        }
        let content = fs::read(&path)?;
        Ok(serde_json::from_slice(&content)?)
    }

    pub fn save(&self, layout: &PackLayout) -> Result<(), StoreError> {
        write_atomic(&layout.dependency_graph(), &encode_json(self)?)
    }

    /// Record that `dependant` relies on `dependency`.
    pub fn add_dependency(&mut self, dependency: &str, dependant: &str) {
        if dependency == dependant {
            return;
        }
        let dependants = self.0.entry(dependency.to_owned()).or_default();
        if !dependants.iter().any(|d| d == dependant) {
            dependants.push(dependant.to_owned());
        }
    }

    /// Strip `dependant` from every dependency's dependant list.
    pub fn remove_dependant_from_all(&mut self, dependant: &str) {
        for dependants in self.0.values_mut() {
            dependants.retain(|d| d != dependant);
        }
    }

    pub fn remove_dependency(&mut self, dependency: &str) -> Option<Vec<String>> {
        self.0.remove(dependency)
    }

    pub fn is_file_dependency(&self, path: &str) -> bool {
        self.0.contains_key(path)
    }

    pub fn dependants(&self, dependency: &str) -> Option<&[String]> {
        self.0.get(dependency).map(Vec::as_slice)
    }

    /// Dependencies nothing depends on any more, in path order.
    pub fn unused_dependencies(&self) -> Vec<String> {
        self.0
            .iter()
            .filter(|(_, dependants)| dependants.is_empty())
            .map(|(dependency, _)| dependency.clone())
            .collect()
    }

    /// Drop `path` from the graph entirely and cascade to orphaned dependencies.
    ///
    /// Returns every dependency that became unused, transitively, in the order
    /// it was freed. Dependencies with at least one remaining dependant are kept.
    pub fn release(&mut self, path: &str) -> Vec<String> {
        self.remove_dependency(path);
        self.remove_dependant_from_all(path);

        let mut freed = Vec::new();
        loop {
            let unused = self.unused_dependencies();
            if unused.is_empty() {
                break;
            }
            for dependency in unused {
                self.remove_dependency(&dependency);
                self.remove_dependant_from_all(&dependency);
                debug!("dependency {dependency} is no longer used");
                freed.push(dependency);
            }
        }
        freed
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_dependant_keeps_dependency_alive() {
        let mut graph = DependencyGraph::new();
        graph.add_dependency("fabric-api.sculk.json", "sodium.sculk.json");
        assert!(graph.unused_dependencies().is_empty());

        graph.remove_dependant_from_all("sodium.sculk.json");
        assert_eq!(graph.unused_dependencies(), vec!["fabric-api.sculk.json"]);
    }

    #[test]
    fn add_dependency_deduplicates() {
        let mut graph = DependencyGraph::new();
        graph.add_dependency("a", "b");
        graph.add_dependency("a", "b");
        assert_eq!(graph.dependants("a").unwrap(), ["b".to_owned()]);
    }

    #[test]
    fn self_edges_are_ignored() {
        let mut graph = DependencyGraph::new();
        graph.add_dependency("a", "a");
        assert!(graph.is_empty());
    }

    #[test]
    fn no_unused_when_every_key_has_dependants() {
        let mut graph = DependencyGraph::new();
        graph.add_dependency("a", "x");
        graph.add_dependency("b", "x");
        graph.add_dependency("b", "y");
        graph.add_dependency("c", "a");
        assert!(graph.unused_dependencies().is_empty());
    }

    #[test]
    fn release_cascades_through_chain() {
        // c depends on b depends on a
        let mut graph = DependencyGraph::new();
        graph.add_dependency("a", "b");
        graph.add_dependency("b", "c");

        let freed = graph.release("c");
        assert_eq!(freed, vec!["b".to_owned(), "a".to_owned()]);
        assert!(graph.is_empty());
    }

    #[test]
    fn release_keeps_shared_dependency() {
        let mut graph = DependencyGraph::new();
        graph.add_dependency("fabric-api", "sodium");
        graph.add_dependency("fabric-api", "lithium");
        graph.add_dependency("indium", "sodium");

        let freed = graph.release("sodium");
        assert_eq!(freed, vec!["indium".to_owned()]);
        assert_eq!(graph.dependants("fabric-api").unwrap(), ["lithium".to_owned()]);
        assert!(!graph.is_file_dependency("indium"));
    }

    #[test]
    fn release_of_a_dependency_drops_its_key() {
        let mut graph = DependencyGraph::new();
        graph.add_dependency("fabric-api", "sodium");
        let freed = graph.release("fabric-api");
        assert!(freed.is_empty());
        assert!(graph.is_empty());
    }

    #[test]
    fn load_missing_is_empty_and_save_roundtrips() {
        let dir = tempfile::tempdir().unwrap();
        let layout = PackLayout::new(dir.path());
        assert!(DependencyGraph::load(&layout).unwrap().is_empty());

        let mut graph = DependencyGraph::new();
        graph.add_dependency("mods/fabric-api.sculk.json", "mods/sodium.sculk.json");
        graph.save(&layout).unwrap();

        let text = fs::read_to_string(layout.dependency_graph()).unwrap();
        assert!(text.ends_with("]\n}\n"));
        assert_eq!(DependencyGraph::load(&layout).unwrap(), graph);
    }
}
