use super::swap_path::SwapPath;
use std::collections::HashSet;

#[derive(Default)]
pub struct SwapPathSet {
    pub set: HashSet<SwapPath>,
}

/// A set of swap paths that makes sure that there are no duplicates
impl SwapPathSet {
    /// Create a new empty swap path set
    pub fn new() -> SwapPathSet {
        SwapPathSet { set: HashSet::new() }
    }

    /// Insert a swap path
    pub fn insert(&mut self, path: SwapPath) {
        self.set.insert(path);
    }

    /// Shortest paths first, equal lengths ordered by path hash. The order does not depend on insertion.
    pub fn sorted_vec(self) -> Vec<SwapPath> {
        let mut paths: Vec<SwapPath> = self.set.into_iter().collect();
        paths.sort_by(|a, b| a.len().cmp(&b.len()).then_with(|| a.swap_path_hash.cmp(&b.swap_path_hash)));
        paths
    }

    pub fn len(&self) -> usize {
        self.set.len()
    }

    pub fn is_empty(&self) -> bool {
        self.set.is_empty()
    }
}
