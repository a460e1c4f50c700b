use crate::domain::Document;
use crate::error::{DocQueryError, DocQueryResult};
use crate::index::IndexEvent;
use crate::search::SearchBackend;
use crate::store::IndexStore;
use crate::watcher::scan::{DocumentFilter, scan_documents};
use crate::watcher::{WatchEvent, WatchKind};
use log::{debug, warn};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::{RwLock, broadcast};

/// The index store and the search backend, always mutated together.
///
/// Both halves sit behind one lock in the engine; holding the write guard
/// across an `evict` + `insert` pair is what makes an event atomic to readers.
pub struct Indexed {
    pub(crate) store: IndexStore,
    pub(crate) backend: Box<dyn SearchBackend>,
}

impl Indexed {
    pub fn new(backend: Box<dyn SearchBackend>) -> Self {
        Self {
            store: IndexStore::new(),
            backend,
        }
    }

    pub fn store(&self) -> &IndexStore {
        &self.store
    }

    pub fn backend(&self) -> &dyn SearchBackend {
        self.backend.as_ref()
    }

    /// Adds `doc` to the backend, then to the store. The path must have been
    /// evicted first.
    pub async fn insert(&mut self, doc: Arc<Document>) -> DocQueryResult<()> {
        self.backend.index(&doc).await?;
        self.store.upsert(doc);
        Ok(())
    }

    /// Removes `path` from the backend, then from the store.
    pub async fn evict(&mut self, path: &Path) -> DocQueryResult<Option<Arc<Document>>> {
        self.backend.remove(path).await?;
        Ok(self.store.remove(path))
    }
}

/// Applies watch events to an [`Indexed`] and publishes what changed.
#[derive(Clone)]
pub struct FileIndexHandler {
    filter: DocumentFilter,
    events: broadcast::Sender<IndexEvent>,
}

impl FileIndexHandler {
    pub fn new(filter: DocumentFilter, events: broadcast::Sender<IndexEvent>) -> Self {
        Self { filter, events }
    }

    pub fn filter(&self) -> &DocumentFilter {
        &self.filter
    }

    pub async fn handle(&self, indexed: &RwLock<Indexed>, event: WatchEvent) -> DocQueryResult<()> {
        match event.kind {
            WatchKind::Created => self.handle_create(indexed, &event.path).await,
            WatchKind::Modified => self.handle_modify(indexed, &event.path).await,
            WatchKind::Deleted => self.handle_remove(indexed, &event.path).await,
        }
    }

    pub async fn handle_create(&self, indexed: &RwLock<Indexed>, path: &Path) -> DocQueryResult<()> {
        if !self.filter.accepts(path) {
            return self.handle_other(indexed, path).await;
        }

        let doc = match Document::load(path.to_path_buf()).await {
            Ok(doc) => doc,
            Err(e) if e.is_vanished() => {
                debug!("dropping create event: {e}");
                return Ok(());
            }
            Err(e) => {
                warn!("Failed to open document for indexing: {e}");
                return Ok(());
            }
        };

        let mut guard = indexed.write().await;
        if guard
            .store
            .get(path)
            .is_some_and(|current| current.same_revision(&doc))
        {
            return Ok(());
        }
        self.replace(&mut guard, doc).await
    }

    pub async fn handle_modify(&self, indexed: &RwLock<Indexed>, path: &Path) -> DocQueryResult<()> {
        if !self.filter.accepts(path) {
            return self.handle_other(indexed, path).await;
        }

        let loaded = Document::load(path.to_path_buf()).await;

        let mut guard = indexed.write().await;
        match loaded {
            Ok(doc) => self.replace(&mut guard, doc).await,
            Err(e) => {
                if !e.is_vanished() {
                    warn!("dropping unreadable document from index: {e}");
                }
                if let Some(old) = guard.evict(path).await? {
                    self.emit(IndexEvent::Removed(old));
                }
                Ok(())
            }
        }
    }

    pub async fn handle_remove(&self, indexed: &RwLock<Indexed>, path: &Path) -> DocQueryResult<()> {
        let mut guard = indexed.write().await;

        let targets: Vec<PathBuf> = if guard.store.contains(path) {
            vec![path.to_path_buf()]
        } else {
            // a removed or renamed directory only reports itself
            guard.store.paths_under(path)
        };

        if targets.is_empty() {
            debug!("delete for unindexed path {}", path.display());
        }

        for target in targets {
            if let Some(old) = guard.evict(&target).await? {
                self.emit(IndexEvent::Removed(old));
            }
        }
        Ok(())
    }

    /// A path that is not itself a document. Directories, and any path that
    /// still has documents indexed beneath it, are reconciled with the disk.
    async fn handle_other(&self, indexed: &RwLock<Indexed>, path: &Path) -> DocQueryResult<()> {
        if !self.filter.in_scope(path) {
            return Ok(());
        }
        if is_real_dir(path) || !indexed.read().await.store.paths_under(path).is_empty() {
            return self.reconcile_dir(indexed, path).await;
        }
        Ok(())
    }

    /// Brings everything indexed under `dir` in line with what is on disk now.
    ///
    /// Covers a directory moved in from outside the root, and one replaced in
    /// place (a delete and a create merged into a single modify).
    async fn reconcile_dir(&self, indexed: &RwLock<Indexed>, dir: &Path) -> DocQueryResult<()> {
        let docs = if is_real_dir(dir) {
            let filter = self.filter.clone();
            let start = dir.to_path_buf();
            tokio::task::spawn_blocking(move || scan_documents(&filter, &start))
                .await
                .map_err(|e| DocQueryError::Other(e.to_string()))?
        } else {
            Vec::new()
        };

        let mut guard = indexed.write().await;

        let on_disk: HashSet<&Path> = docs.iter().map(|doc| doc.path()).collect();
        let stale: Vec<PathBuf> = guard
            .store
            .paths_under(dir)
            .into_iter()
            .filter(|path| !on_disk.contains(path.as_path()))
            .collect();
        for path in stale {
            if let Some(old) = guard.evict(&path).await? {
                self.emit(IndexEvent::Removed(old));
            }
        }

        for doc in docs {
            if guard
                .store
                .get(doc.path())
                .is_some_and(|current| current.same_revision(&doc))
            {
                continue;
            }
            if let Err(e) = self.replace(&mut guard, doc).await {
                warn!("failed to index document under {}: {e}", dir.display());
            }
        }
        Ok(())
    }

    /// Swaps in `doc`: the old record leaves both halves before the new one
    /// enters either.
    async fn replace(&self, indexed: &mut Indexed, doc: Document) -> DocQueryResult<()> {
        let doc = Arc::new(doc);
        let previous = indexed.evict(doc.path()).await?;

        match indexed.insert(doc.clone()).await {
            Ok(()) => {
                self.emit(IndexEvent::Added(doc));
                Ok(())
            }
            Err(e) => {
                if let Some(old) = previous {
                    self.emit(IndexEvent::Removed(old));
                }
                Err(e)
            }
        }
    }

    fn emit(&self, event: IndexEvent) {
        // NOTE: no receivers is fine
        let _ = self.events.send(event);
    }
}

/// A directory that is not reached through a symlink.
fn is_real_dir(path: &Path) -> bool {
    fs::symlink_metadata(path).is_ok_and(|meta| meta.is_dir())
}
