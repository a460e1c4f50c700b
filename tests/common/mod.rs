#![allow(dead_code)]

use async_trait::async_trait;
use docquery_core::domain::Document;
use docquery_core::error::DocQueryResult;
use docquery_core::search::index::FtsIndex;
use docquery_core::search::{SearchBackend, SearchOptions};
use docquery_core::watcher::{WatchError, WatchEvent, WatchMessage, WatchSource};
use docquery_core::{DocIndex, IndexEvent};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, SystemTime};
use tokio::sync::{broadcast, mpsc::UnboundedSender, watch};

pub const WAIT: Duration = Duration::from_secs(10);

/// Writes `body` to `root/rel` and pins its mtime to `age` before now.
pub fn write_aged(root: &Path, rel: &str, body: &str, age: Duration) -> PathBuf {
    let path = root.join(rel);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(&path, body).unwrap();
    fs::File::options()
        .write(true)
        .open(&path)
        .unwrap()
        .set_modified(SystemTime::now() - age)
        .unwrap();
    path
}

/// Four documents (two at the root, two under `top-5/`) plus files the
/// default filter must skip. `top-5/movies.md` is the newest.
pub fn fixture(root: &Path) {
    write_aged(root, "welcome.md", "Welcome to the docs index", Duration::from_secs(400));
    write_aged(root, "recipes.md", "pancakes and waffles", Duration::from_secs(300));
    write_aged(
        root,
        "top-5/burgers.md",
        "The best cheeseburger in town",
        Duration::from_secs(200),
    );
    write_aged(
        root,
        "top-5/movies.md",
        "Top five movies of all time",
        Duration::from_secs(100),
    );

    write_aged(root, "notes.txt", "plain text, not a document", Duration::from_secs(50));
    write_aged(root, ".hidden.md", "hidden cheeseburger", Duration::from_secs(50));
    write_aged(root, ".drafts/draft.md", "draft cheeseburger", Duration::from_secs(50));
}

/// A watch source driven by the test.
#[derive(Clone, Default)]
pub struct ManualSource {
    sender: Arc<Mutex<Option<UnboundedSender<WatchMessage>>>>,
    unsubscribed: Arc<AtomicBool>,
    refuse: bool,
    broken: bool,
}

impl ManualSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fails `subscribe` outright.
    pub fn refusing() -> Self {
        Self {
            refuse: true,
            ..Self::default()
        }
    }

    /// Subscribes, then immediately reports a source failure.
    pub fn broken() -> Self {
        Self {
            broken: true,
            ..Self::default()
        }
    }

    pub fn emit(&self, event: WatchEvent) {
        let guard = self.sender.lock().unwrap();
        guard
            .as_ref()
            .expect("source is not subscribed")
            .send(Ok(event))
            .unwrap();
    }

    pub fn is_unsubscribed(&self) -> bool {
        self.unsubscribed.load(Ordering::SeqCst)
    }

    pub fn boxed(&self) -> Box<dyn WatchSource> {
        Box::new(self.clone())
    }
}

impl WatchSource for ManualSource {
    fn subscribe(
        &mut self,
        _root: &Path,
        _recursive: bool,
        events: UnboundedSender<WatchMessage>,
    ) -> Result<(), WatchError> {
        if self.refuse {
            return Err(WatchError::Failed("refused".into()));
        }
        if self.broken {
            let _ = events.send(Err(WatchError::Failed("source died".into())));
        }
        *self.sender.lock().unwrap() = Some(events);
        Ok(())
    }

    fn unsubscribe(&mut self) -> Result<(), WatchError> {
        self.sender.lock().unwrap().take();
        self.unsubscribed.store(true, Ordering::SeqCst);
        Ok(())
    }
}

/// Wraps an [`FtsIndex`] and holds every `index` call until the gate opens.
pub struct GatedBackend {
    inner: FtsIndex,
    gate: watch::Receiver<bool>,
}

impl GatedBackend {
    pub async fn new() -> (Self, watch::Sender<bool>) {
        let (tx, rx) = watch::channel(false);
        let inner = FtsIndex::in_memory().await.unwrap();
        (Self { inner, gate: rx }, tx)
    }
}

#[async_trait]
impl SearchBackend for GatedBackend {
    async fn index(&self, doc: &Document) -> DocQueryResult<()> {
        let mut gate = self.gate.clone();
        while !*gate.borrow_and_update() {
            if gate.changed().await.is_err() {
                break;
            }
        }
        self.inner.index(doc).await
    }

    async fn remove(&self, path: &Path) -> DocQueryResult<bool> {
        self.inner.remove(path).await
    }

    async fn query(&self, text: &str, options: &SearchOptions) -> DocQueryResult<Vec<PathBuf>> {
        self.inner.query(text, options).await
    }

    async fn close(&self) {
        self.inner.close().await
    }
}

pub async fn manual_index(root: &Path, options: docquery_core::IndexOptions) -> (DocIndex, ManualSource) {
    let source = ManualSource::new();
    let backend = FtsIndex::in_memory().await.unwrap();
    let index = DocIndex::with_parts(root, options, source.boxed(), Box::new(backend))
        .await
        .unwrap();
    (index, source)
}

/// Next notification, failing the test if none arrives in time.
pub async fn next_event(rx: &mut broadcast::Receiver<IndexEvent>) -> IndexEvent {
    tokio::time::timeout(WAIT, rx.recv())
        .await
        .expect("timed out waiting for index event")
        .expect("event channel closed")
}

/// Skips notifications until `pick` accepts one.
pub async fn wait_for<F>(rx: &mut broadcast::Receiver<IndexEvent>, mut pick: F) -> Arc<Document>
where
    F: FnMut(&IndexEvent) -> Option<Arc<Document>>,
{
    loop {
        let event = next_event(rx).await;
        if let Some(doc) = pick(&event) {
            return doc;
        }
    }
}

pub fn added(path: &Path) -> impl FnMut(&IndexEvent) -> Option<Arc<Document>> + '_ {
    move |event| match event {
        IndexEvent::Added(doc) if doc.path() == path => Some(doc.clone()),
        _ => None,
    }
}

pub fn removed(path: &Path) -> impl FnMut(&IndexEvent) -> Option<Arc<Document>> + '_ {
    move |event| match event {
        IndexEvent::Removed(doc) if doc.path() == path => Some(doc.clone()),
        _ => None,
    }
}

pub fn titles(docs: &[Arc<Document>]) -> Vec<&str> {
    docs.iter().map(|doc| doc.title()).collect()
}
