use std::{
    collections::HashMap,
    path::{Path, PathBuf},
};

/// Ordered list of image paths with a derived path-to-index map.
#[derive(Debug, Default)]
pub struct Sequence {
    paths: Vec<PathBuf>,
    index: HashMap<PathBuf, usize>,
}

impl Sequence {
    pub fn new(paths: Vec<PathBuf>) -> Self {
        let mut sequence = Self {
            paths,
            index: HashMap::new(),
        };
        sequence.rebuild_index();
        sequence
    }

    pub fn paths(&self) -> &[PathBuf] {
        &self.paths
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    pub fn index_of(&self, path: &Path) -> Option<usize> {
        self.index.get(path).copied()
    }

    pub fn get(&self, index: usize) -> Option<&PathBuf> {
        self.paths.get(index)
    }

    /// Append a path; duplicates are ignored.
    pub fn push(&mut self, path: PathBuf) {
        if self.index.contains_key(&path) {
            return;
        }
        self.index.insert(path.clone(), self.paths.len());
        self.paths.push(path);
    }

    /// Remove a path, returning the index it occupied.
    pub fn remove(&mut self, path: &Path) -> Option<usize> {
        let idx = self.index_of(path)?;
        self.paths.remove(idx);
        self.rebuild_index();
        Some(idx)
    }

    pub fn clear(&mut self) {
        self.paths.clear();
        self.index.clear();
    }

    fn rebuild_index(&mut self) {
        self.index = self
            .paths
            .iter()
            .enumerate()
            .map(|(i, p)| (p.clone(), i))
            .collect();
    }
}
