use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use super::edit::Annotation;

/// Unsaved annotations keyed by absolute file path.
///
/// Entries are replaced wholesale, never merged, and are only removed all at
/// once after a successful commit. Iteration is in path order so a commit
/// always processes files in the same sequence.
#[derive(Debug, Clone, Default)]
pub struct StagingArea {
    pending: BTreeMap<PathBuf, Annotation>,
}

impl StagingArea {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a snapshot for `path`, replacing any earlier one
    pub fn stage(&mut self, path: &Path, annotation: Annotation) {
        self.pending.insert(path.to_path_buf(), annotation);
    }

    pub fn get(&self, path: &Path) -> Option<&Annotation> {
        self.pending.get(path)
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Path, &Annotation)> {
        self.pending.iter().map(|(path, annotation)| (path.as_path(), annotation))
    }

    pub fn clear(&mut self) {
        self.pending.clear();
    }
}
