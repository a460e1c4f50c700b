use crate::config::{IndexOptions, resolve_root};
use crate::domain::Document;
use crate::error::{DocQueryError, DocQueryResult};
use crate::search::index::FtsIndex;
use crate::search::{SearchBackend, SearchOptions};
use crate::watcher::WatchSource;
use crate::watcher::debounce::Debouncer;
use crate::watcher::handler::{FileIndexHandler, Indexed};
use crate::watcher::scan::DocumentFilter;
use crate::watcher::service::{Phase, Shared, SyncService};
use crate::watcher::source::NotifySource;
use log::{info, warn};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock, broadcast, mpsc, watch};
use tokio::task::JoinHandle;
use uuid::Uuid;

/// Notifications published by an index, in the order it applied them.
#[derive(Debug, Clone)]
pub enum IndexEvent {
    /// The initial scan finished. Sent exactly once, before anything else.
    Ready,
    /// A document was indexed, either new or as the replacement of a
    /// modified one.
    Added(Arc<Document>),
    /// A document left the index.
    Removed(Arc<Document>),
}

/// A live, searchable index of the documents under one directory.
///
/// Opening an index takes the watch subscription and starts the initial scan
/// in the background. Queries issued before the scan completes wait for it.
/// Each instance owns its own watcher, store and backend; two indexes over
/// the same root do not share anything.
pub struct DocIndex {
    id: Uuid,
    root: PathBuf,
    shared: Arc<Shared>,
    source: Mutex<Option<Box<dyn WatchSource>>>,
    shutdown: watch::Sender<bool>,
    worker: Mutex<Option<JoinHandle<()>>>,
    debouncer: Mutex<Option<JoinHandle<()>>>,
}

impl DocIndex {
    /// Opens an index over `root`, watched with `notify` and searched with an
    /// in-memory FTS5 backend.
    ///
    /// # Errors
    /// - [`DocQueryError::InvalidRoot`] if `root` is not an existing directory
    /// - [`DocQueryError::WatchSource`] if the watcher cannot be started
    /// - [`DocQueryError::Db`] if the search backend cannot be created
    pub async fn open(root: impl AsRef<Path>, options: IndexOptions) -> DocQueryResult<Self> {
        let backend = FtsIndex::in_memory().await?;
        Self::with_parts(root, options, Box::new(NotifySource::new()), Box::new(backend)).await
    }

    /// Opens an index with explicit collaborators.
    pub async fn with_parts(
        root: impl AsRef<Path>,
        options: IndexOptions,
        mut source: Box<dyn WatchSource>,
        backend: Box<dyn SearchBackend>,
    ) -> DocQueryResult<Self> {
        let root = match resolve_root(root.as_ref()) {
            Ok(root) => root,
            Err(e) => {
                backend.close().await;
                return Err(e);
            }
        };
        let id = Uuid::new_v4();

        let (raw_tx, raw_rx) = mpsc::unbounded_channel();
        if let Err(e) = source.subscribe(&root, options.recursive, raw_tx) {
            backend.close().await;
            return Err(e.into());
        }

        let (event_rx, debouncer) = if options.debounce.is_zero() {
            (raw_rx, None)
        } else {
            let (debounced_tx, debounced_rx) = mpsc::unbounded_channel();
            let debouncer = Debouncer::new(debounced_tx, options.debounce);
            (debounced_rx, Some(tokio::spawn(debouncer.run(raw_rx))))
        };

        let (events, _) = broadcast::channel(options.event_capacity.max(1));
        let (phase, _) = watch::channel(Phase::Initializing);
        let shared = Arc::new(Shared {
            indexed: RwLock::new(Indexed::new(backend)),
            phase,
            events: events.clone(),
        });

        let handler = FileIndexHandler::new(DocumentFilter::new(&root, &options), events);
        let (shutdown, shutdown_rx) = watch::channel(false);
        let service = SyncService::new(id, shared.clone(), handler);
        let worker = tokio::spawn(service.run(event_rx, shutdown_rx));

        info!(
            "[{id}] opened index at {} (recursive: {})",
            root.display(),
            options.recursive
        );

        Ok(DocIndex {
            id,
            root,
            shared,
            source: Mutex::new(Some(source)),
            shutdown,
            worker: Mutex::new(Some(worker)),
            debouncer: Mutex::new(debouncer),
        })
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    /// The canonical root documents are keyed under.
    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn phase(&self) -> Phase {
        self.shared.phase.borrow().clone()
    }

    /// Receives every notification sent after this call.
    ///
    /// `Ready` is only seen by receivers created before the scan finished;
    /// use [`DocIndex::ready`] to wait for it without racing.
    pub fn subscribe(&self) -> broadcast::Receiver<IndexEvent> {
        self.shared.events.subscribe()
    }

    /// Waits until the initial scan has completed.
    ///
    /// # Errors
    /// - [`DocQueryError::Closed`] if the index was closed first
    /// - [`DocQueryError::WatchSource`] if the watcher died before the scan finished
    pub async fn ready(&self) -> DocQueryResult<()> {
        let mut rx = self.shared.phase.subscribe();
        let phase = rx
            .wait_for(|phase| *phase != Phase::Initializing)
            .await
            .map_err(|_| DocQueryError::Closed)?
            .clone();
        phase.check()
    }

    /// Documents matching `text`, most relevant first.
    pub async fn search(&self, text: &str) -> DocQueryResult<Vec<Arc<Document>>> {
        self.search_with_options(text, &SearchOptions::default())
            .await
    }

    pub async fn search_with_options(
        &self,
        text: &str,
        options: &SearchOptions,
    ) -> DocQueryResult<Vec<Arc<Document>>> {
        self.ready().await?;

        let indexed = self.shared.indexed.read().await;
        let paths = match indexed.backend().query(text, options).await {
            Ok(paths) => paths,
            Err(e) => {
                self.phase().check()?;
                return Err(e);
            }
        };

        Ok(paths
            .iter()
            .filter_map(|path| indexed.store().get(path))
            .collect())
    }

    /// Every indexed document, newest modification first.
    ///
    /// The returned vector is a copy; later changes to the index do not
    /// affect it.
    pub async fn documents(&self) -> DocQueryResult<Vec<Arc<Document>>> {
        self.ready().await?;
        Ok(self.shared.indexed.read().await.store().snapshot())
    }

    /// Looks up one document. Relative paths are taken relative to the root.
    pub async fn document(&self, path: impl AsRef<Path>) -> DocQueryResult<Option<Arc<Document>>> {
        self.ready().await?;
        let path = self.root.join(path.as_ref());
        Ok(self.shared.indexed.read().await.store().get(&path))
    }

    /// Titles starting with `prefix` (case-insensitive), alphabetically.
    ///
    /// `limit` defaults to 10.
    pub async fn suggest(&self, prefix: &str, limit: Option<usize>) -> DocQueryResult<Vec<String>> {
        self.ready().await?;
        let prefix = prefix.to_lowercase();

        let mut titles: Vec<String> = self
            .shared
            .indexed
            .read()
            .await
            .store()
            .snapshot()
            .iter()
            .filter(|doc| doc.title().to_lowercase().starts_with(&prefix))
            .map(|doc| doc.title().to_owned())
            .collect();

        titles.sort();
        titles.dedup();
        titles.truncate(limit.unwrap_or(10));
        Ok(titles)
    }

    /// Closes the index.
    ///
    /// The watch subscription is released and the worker has stopped by the
    /// time this returns; an event that was being applied is finished first.
    /// Every later call on this instance fails with [`DocQueryError::Closed`].
    ///
    /// # Errors
    /// - [`DocQueryError::Closed`] if the index is already closed
    /// - [`DocQueryError::WatchSource`] if releasing the watcher failed
    pub async fn close(&self) -> DocQueryResult<()> {
        let closing = self.shared.phase.send_if_modified(|phase| {
            if *phase == Phase::Closed {
                false
            } else {
                *phase = Phase::Closed;
                true
            }
        });
        if !closing {
            return Err(DocQueryError::Closed);
        }

        let released = match self.source.lock().await.take() {
            Some(mut source) => source.unsubscribe(),
            None => Ok(()),
        };

        self.shutdown.send_replace(true);
        if let Some(worker) = self.worker.lock().await.take() {
            if let Err(e) = worker.await {
                warn!("[{}] worker ended abnormally: {e}", self.id);
            }
        }
        if let Some(debouncer) = self.debouncer.lock().await.take() {
            debouncer.abort();
        }

        self.shared.indexed.read().await.backend().close().await;
        info!("[{}] closed index at {}", self.id, self.root.display());

        released.map_err(DocQueryError::from)
    }
}
