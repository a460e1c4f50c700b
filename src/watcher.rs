//! Filesystem watching and index synchronization.
//!
//! - [`source`]: the `notify`-backed [`WatchSource`]
//! - [`debounce`]: per-path coalescing of raw events
//! - [`scan`]: the initial directory walk and the document filter
//! - [`handler`]: applies one event to the store and search backend
//! - [`service`]: the worker task driving all of the above

pub mod debounce;
pub mod handler;
pub mod scan;
pub mod service;
pub mod source;

use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::sync::mpsc::UnboundedSender;

#[derive(Debug, Error)]
pub enum WatchError {
    #[error(transparent)]
    Notify(#[from] notify::Error),

    #[error("watch source is not subscribed")]
    NotSubscribed,

    #[error("watch source failed: {0}")]
    Failed(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WatchKind {
    Created,
    Modified,
    Deleted,
}

/// A raw change reported by a [`WatchSource`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchEvent {
    pub kind: WatchKind,
    pub path: PathBuf,
}

impl WatchEvent {
    pub fn new(kind: WatchKind, path: impl Into<PathBuf>) -> Self {
        Self {
            kind,
            path: path.into(),
        }
    }

    pub fn created(path: impl Into<PathBuf>) -> Self {
        Self::new(WatchKind::Created, path)
    }

    pub fn modified(path: impl Into<PathBuf>) -> Self {
        Self::new(WatchKind::Modified, path)
    }

    pub fn deleted(path: impl Into<PathBuf>) -> Self {
        Self::new(WatchKind::Deleted, path)
    }
}

/// What travels from a source to the engine. An `Err` means the source itself
/// is in trouble, not a single file.
pub type WatchMessage = Result<WatchEvent, WatchError>;

/// A filesystem notifier.
///
/// The engine subscribes exactly once, before its initial scan, and
/// unsubscribes on close. Dropping the last clone of the sender tells the
/// engine the source has ended.
pub trait WatchSource: Send {
    fn subscribe(
        &mut self,
        root: &Path,
        recursive: bool,
        events: UnboundedSender<WatchMessage>,
    ) -> Result<(), WatchError>;

    fn unsubscribe(&mut self) -> Result<(), WatchError>;
}
