use crate::domain::Document;
use crate::error::{DocQueryError, DocQueryResult};
use crate::index::IndexEvent;
use crate::watcher::handler::{FileIndexHandler, Indexed};
use crate::watcher::scan::scan_documents;
use crate::watcher::{WatchError, WatchEvent, WatchMessage};
use log::{debug, error, info, warn};
use std::sync::Arc;
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::sync::mpsc::error::TryRecvError;
use tokio::sync::{RwLock, broadcast, watch};
use uuid::Uuid;

/// Lifecycle of an index instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Phase {
    Initializing,
    Ready,
    Closed,
    /// The watch source died before the initial scan finished.
    Failed(String),
}

impl Phase {
    /// `Ok` only for `Ready`.
    pub fn check(&self) -> DocQueryResult<()> {
        match self {
            Phase::Ready => Ok(()),
            Phase::Closed => Err(DocQueryError::Closed),
            Phase::Failed(reason) => Err(WatchError::Failed(reason.clone()).into()),
            Phase::Initializing => Err(DocQueryError::NotReady),
        }
    }
}

/// State shared between the façade and the worker.
pub(crate) struct Shared {
    pub(crate) indexed: RwLock<Indexed>,
    pub(crate) phase: watch::Sender<Phase>,
    pub(crate) events: broadcast::Sender<IndexEvent>,
}

/// The single worker that owns every mutation of an index.
pub(crate) struct SyncService {
    id: Uuid,
    shared: Arc<Shared>,
    handler: FileIndexHandler,
}

impl SyncService {
    pub(crate) fn new(id: Uuid, shared: Arc<Shared>, handler: FileIndexHandler) -> Self {
        Self {
            id,
            shared,
            handler,
        }
    }

    /// Scans, publishes `Ready`, then applies events one at a time until the
    /// source ends or `shutdown` flips.
    pub(crate) async fn run(
        self,
        mut events: UnboundedReceiver<WatchMessage>,
        mut shutdown: watch::Receiver<bool>,
    ) {
        let root = self.handler.filter().root().to_path_buf();
        info!("[{}] scanning {}", self.id, root.display());

        let filter = self.handler.filter().clone();
        let scan = tokio::task::spawn_blocking(move || scan_documents(&filter, &root));

        let docs = tokio::select! {
            res = scan => match res {
                Ok(docs) => docs,
                Err(e) => {
                    self.fail(format!("initial scan aborted: {e}"));
                    return;
                }
            },
            _ = shutdown.changed() => return,
        };

        let count = self.load(docs).await;

        // NOTE: anything reported while scanning is queued until Ready.
        let mut backlog: Vec<WatchEvent> = Vec::new();
        loop {
            match events.try_recv() {
                Ok(Ok(event)) => backlog.push(event),
                Ok(Err(e)) => {
                    self.fail(e.to_string());
                    return;
                }
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    self.fail("watch source ended before the index was ready".to_string());
                    return;
                }
            }
        }

        if !self.publish_ready() {
            return;
        }
        info!(
            "[{}] ready with {count} documents, {} queued changes",
            self.id,
            backlog.len()
        );

        for event in backlog {
            if *shutdown.borrow() {
                return;
            }
            self.apply(event).await;
        }

        loop {
            tokio::select! {
                biased;
                _ = shutdown.changed() => break,
                msg = events.recv() => match msg {
                    Some(Ok(event)) => self.apply(event).await,
                    Some(Err(e)) => error!("[{}] watch source error: {e}", self.id),
                    None => {
                        info!("[{}] watch source ended", self.id);
                        break;
                    }
                },
            }
        }

        debug!("[{}] worker stopped", self.id);
    }

    async fn load(&self, docs: Vec<Document>) -> usize {
        let mut guard = self.shared.indexed.write().await;
        for doc in docs {
            let path = doc.path().to_path_buf();
            if let Err(e) = guard.insert(Arc::new(doc)).await {
                warn!("[{}] failed to index {}: {e}", self.id, path.display());
            }
        }
        guard.store.len()
    }

    async fn apply(&self, event: WatchEvent) {
        let path = event.path.clone();
        if let Err(e) = self.handler.handle(&self.shared.indexed, event).await {
            warn!("[{}] failed to apply change to {}: {e}", self.id, path.display());
        }
    }

    /// Moves `Initializing` to `Ready` and announces it. Returns false if the
    /// index was closed in the meantime.
    fn publish_ready(&self) -> bool {
        let moved = self.shared.phase.send_if_modified(|phase| {
            if *phase == Phase::Initializing {
                *phase = Phase::Ready;
                true
            } else {
                false
            }
        });

        if moved {
            let _ = self.shared.events.send(IndexEvent::Ready);
        }
        moved
    }

    fn fail(&self, reason: String) {
        let message = reason.clone();
        let failed = self.shared.phase.send_if_modified(|phase| {
            if *phase == Phase::Initializing {
                *phase = Phase::Failed(reason);
                true
            } else {
                false
            }
        });

        if failed {
            error!("[{}] index failed: {message}", self.id);
        } else {
            debug!("[{}] stopped before ready: {message}", self.id);
        }
    }
}
