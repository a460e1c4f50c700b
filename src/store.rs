use crate::domain::Document;
use std::cmp::Reverse;
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::SystemTime;

/// Position of a record: newest modification first, then most recent insert.
type SortKey = (Reverse<SystemTime>, Reverse<u64>);

/// The ordered set of live documents, keyed by path.
///
/// The store only keeps order and uniqueness. Pairing every mutation with the
/// search backend is the caller's job.
#[derive(Debug, Default)]
pub struct IndexStore {
    keys: HashMap<PathBuf, SortKey>,
    ordered: BTreeMap<SortKey, Arc<Document>>,
    next_seq: u64,
}

impl IndexStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts `doc`, replacing any record with the same path. Returns the
    /// replaced record.
    pub fn upsert(&mut self, doc: Arc<Document>) -> Option<Arc<Document>> {
        let previous = self.remove(doc.path());

        let key = (Reverse(doc.modified_at()), Reverse(self.next_seq));
        self.next_seq += 1;

        self.keys.insert(doc.path().to_path_buf(), key);
        self.ordered.insert(key, doc);

        previous
    }

    /// Removes the record for `path`. Absent paths are not an error.
    pub fn remove(&mut self, path: &Path) -> Option<Arc<Document>> {
        let key = self.keys.remove(path)?;
        self.ordered.remove(&key)
    }

    pub fn get(&self, path: &Path) -> Option<Arc<Document>> {
        self.keys
            .get(path)
            .and_then(|key| self.ordered.get(key))
            .cloned()
    }

    pub fn contains(&self, path: &Path) -> bool {
        self.keys.contains_key(path)
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Live paths strictly below `dir`.
    pub fn paths_under(&self, dir: &Path) -> Vec<PathBuf> {
        self.keys
            .keys()
            .filter(|path| path.as_path() != dir && path.starts_with(dir))
            .cloned()
            .collect()
    }

    /// An owned copy of the records, newest first.
    pub fn snapshot(&self) -> Vec<Arc<Document>> {
        self.ordered.values().cloned().collect()
    }
}
