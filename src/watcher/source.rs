use crate::watcher::{WatchError, WatchEvent, WatchMessage, WatchSource};
use notify::event::{ModifyKind, RenameMode};
use notify::{Config, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::path::{Path, PathBuf};
use tokio::sync::mpsc::UnboundedSender;

/// [`WatchSource`] backed by the platform's recommended `notify` watcher.
#[derive(Default)]
pub struct NotifySource {
    watcher: Option<RecommendedWatcher>,
    root: Option<PathBuf>,
}

impl NotifySource {
    pub fn new() -> Self {
        Self::default()
    }
}

impl WatchSource for NotifySource {
    fn subscribe(
        &mut self,
        root: &Path,
        recursive: bool,
        events: UnboundedSender<WatchMessage>,
    ) -> Result<(), WatchError> {
        let event_handler = move |res: Result<Event, notify::Error>| match res {
            Ok(event) => {
                for change in translate(event) {
                    let _ = events.send(Ok(change));
                }
            }
            Err(e) => {
                let _ = events.send(Err(WatchError::Notify(e)));
            }
        };

        let mode = if recursive {
            RecursiveMode::Recursive
        } else {
            RecursiveMode::NonRecursive
        };

        let mut watcher = RecommendedWatcher::new(event_handler, Config::default())?;
        watcher.watch(root, mode)?;

        self.watcher = Some(watcher);
        self.root = Some(root.to_path_buf());
        Ok(())
    }

    fn unsubscribe(&mut self) -> Result<(), WatchError> {
        let mut watcher = self.watcher.take().ok_or(WatchError::NotSubscribed)?;
        let root = self.root.take().ok_or(WatchError::NotSubscribed)?;

        // NOTE: dropping the watcher drops the handler and with it the sender,
        // which ends the engine's event stream.
        let result = watcher.unwatch(&root);
        drop(watcher);

        match result {
            Ok(()) => Ok(()),
            // The root itself is gone; the kernel already released the watch.
            Err(notify::Error {
                kind: notify::ErrorKind::WatchNotFound,
                ..
            }) => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// Maps a `notify` event onto zero or more engine events.
pub fn translate(event: Event) -> Vec<WatchEvent> {
    match event.kind {
        EventKind::Create(_) => event.paths.into_iter().map(WatchEvent::created).collect(),
        EventKind::Remove(_) => event.paths.into_iter().map(WatchEvent::deleted).collect(),
        EventKind::Modify(ModifyKind::Name(RenameMode::From)) => {
            event.paths.into_iter().map(WatchEvent::deleted).collect()
        }
        EventKind::Modify(ModifyKind::Name(RenameMode::To)) => {
            event.paths.into_iter().map(WatchEvent::created).collect()
        }
        EventKind::Modify(ModifyKind::Name(RenameMode::Both)) => {
            let mut paths = event.paths.into_iter();
            let mut out = Vec::with_capacity(2);
            if let Some(from) = paths.next() {
                out.push(WatchEvent::deleted(from));
            }
            if let Some(to) = paths.next() {
                out.push(WatchEvent::created(to));
            }
            out
        }
        EventKind::Modify(ModifyKind::Name(_)) => event
            .paths
            .into_iter()
            .map(|path| {
                if path.exists() {
                    WatchEvent::created(path)
                } else {
                    WatchEvent::deleted(path)
                }
            })
            .collect(),
        EventKind::Modify(_) => event.paths.into_iter().map(WatchEvent::modified).collect(),
        EventKind::Access(_) | EventKind::Any | EventKind::Other => Vec::new(),
    }
}
