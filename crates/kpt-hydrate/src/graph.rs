//! The per-run package map and its `Dry | Hydrating | Wet` state machine
//! (spec.md §4.4 step 1-2, I3).
//!
//! Grounded on `sherpack-kube::release::StoredRelease`'s state-machine style
//! (enum variants carrying timing metadata, `is_terminal`-style predicate
//! methods), narrowed here to the three hydration states. The package map
//! itself (`HashMap<PathBuf, PackageNode>`) is owned by one
//! `Hydrator::hydrate` call and never shared (§9).

use std::collections::HashMap;
use std::path::PathBuf;

use kpt_core::Resource;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeState {
    Dry,
    Hydrating,
    Wet,
}

impl NodeState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, NodeState::Wet)
    }
}

/// One package's hydration progress, keyed by its path relative to the
/// render root.
pub struct PackageNode {
    pub state: NodeState,
    /// Populated once `state == Wet`.
    pub output: Vec<Resource>,
    /// Paths seen in this package's input before the pipeline ran.
    pub input_files: Vec<String>,
}

impl PackageNode {
    fn new() -> Self {
        Self {
            state: NodeState::Dry,
            output: Vec::new(),
            input_files: Vec::new(),
        }
    }
}

/// The run-scoped map from package path to its node, per spec.md §4.4 step 1.
#[derive(Default)]
pub struct PackageMap {
    nodes: HashMap<PathBuf, PackageNode>,
}

impl PackageMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Looks up the current state of `path`, if it has been visited.
    pub fn state_of(&self, path: &PathBuf) -> Option<NodeState> {
        self.nodes.get(path).map(|n| n.state)
    }

    pub fn mark_hydrating(&mut self, path: PathBuf) {
        self.nodes.entry(path).or_insert_with(PackageNode::new).state = NodeState::Hydrating;
    }

    pub fn mark_wet(&mut self, path: &PathBuf, output: Vec<Resource>, input_files: Vec<String>) {
        if let Some(node) = self.nodes.get_mut(path) {
            node.state = NodeState::Wet;
            node.output = output;
            node.input_files = input_files;
        }
    }

    pub fn cached_output(&self, path: &PathBuf) -> Option<&[Resource]> {
        self.nodes
            .get(path)
            .filter(|n| n.state == NodeState::Wet)
            .map(|n| n.output.as_slice())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unvisited_package_has_no_state() {
        let map = PackageMap::new();
        assert_eq!(map.state_of(&PathBuf::from("a")), None);
    }

    #[test]
    fn mark_hydrating_then_wet_transitions_correctly() {
        let mut map = PackageMap::new();
        let path = PathBuf::from("a");
        map.mark_hydrating(path.clone());
        assert_eq!(map.state_of(&path), Some(NodeState::Hydrating));
        map.mark_wet(&path, vec![], vec![]);
        assert_eq!(map.state_of(&path), Some(NodeState::Wet));
        assert!(map.cached_output(&path).is_some());
    }

    #[test]
    fn wet_is_terminal() {
        assert!(NodeState::Wet.is_terminal());
        assert!(!NodeState::Hydrating.is_terminal());
    }
}
