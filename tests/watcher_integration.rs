mod common;

use common::{added, fixture, removed, wait_for};
use docquery_core::watcher::source::{NotifySource, translate};
use docquery_core::watcher::{WatchError, WatchEvent, WatchSource};
use docquery_core::{DocIndex, IndexOptions};
use notify::event::{CreateKind, DataChange, ModifyKind, RemoveKind, RenameMode};
use notify::{Event, EventKind};
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;
use tokio::sync::mpsc;

#[test]
fn translate_maps_notify_kinds() {
    let path = PathBuf::from("/docs/a.md");
    let other = PathBuf::from("/docs/b.md");

    let create = Event::new(EventKind::Create(CreateKind::File)).add_path(path.clone());
    assert_eq!(translate(create), vec![WatchEvent::created(&path)]);

    let write = Event::new(EventKind::Modify(ModifyKind::Data(DataChange::Content)))
        .add_path(path.clone());
    assert_eq!(translate(write), vec![WatchEvent::modified(&path)]);

    let remove = Event::new(EventKind::Remove(RemoveKind::File)).add_path(path.clone());
    assert_eq!(translate(remove), vec![WatchEvent::deleted(&path)]);

    let rename = Event::new(EventKind::Modify(ModifyKind::Name(RenameMode::Both)))
        .add_path(path.clone())
        .add_path(other.clone());
    assert_eq!(
        translate(rename),
        vec![WatchEvent::deleted(&path), WatchEvent::created(&other)]
    );

    let from = Event::new(EventKind::Modify(ModifyKind::Name(RenameMode::From)))
        .add_path(path.clone());
    assert_eq!(translate(from), vec![WatchEvent::deleted(&path)]);

    let to = Event::new(EventKind::Modify(ModifyKind::Name(RenameMode::To))).add_path(other.clone());
    assert_eq!(translate(to), vec![WatchEvent::created(&other)]);

    let access = Event::new(EventKind::Access(notify::event::AccessKind::Read)).add_path(path);
    assert!(translate(access).is_empty());
}

#[test]
fn notify_source_unsubscribe_requires_subscription() {
    let mut source = NotifySource::new();
    assert!(matches!(source.unsubscribe(), Err(WatchError::NotSubscribed)));
}

#[tokio::test]
async fn notify_source_reports_new_files() {
    let tmpdir = TempDir::new().unwrap();
    let root = tmpdir.path().canonicalize().unwrap();

    let (tx, mut rx) = mpsc::unbounded_channel();
    let mut source = NotifySource::new();
    source.subscribe(&root, true, tx).unwrap();

    let path = root.join("fresh.md");
    fs::write(&path, "fresh").unwrap();

    let seen = tokio::time::timeout(common::WAIT, async {
        while let Some(msg) = rx.recv().await {
            if let Ok(event) = msg {
                if event.path == path {
                    return true;
                }
            }
        }
        false
    })
    .await
    .unwrap();
    assert!(seen);

    source.unsubscribe().unwrap();
}

#[tokio::test]
async fn watcher_round_trip_through_the_filesystem() {
    let tmpdir = TempDir::new().unwrap();
    fixture(tmpdir.path());

    let index = DocIndex::open(tmpdir.path(), IndexOptions::default())
        .await
        .unwrap();
    index.ready().await.unwrap();
    let mut events = index.subscribe();

    let docs = index.documents().await.unwrap();
    assert_eq!(docs.len(), 4);
    assert_eq!(docs[0].title(), "movies");

    let path = index.root().join("tempfile.md");
    fs::write(&path, "temp file").unwrap();

    loop {
        let doc = wait_for(&mut events, added(&path)).await;
        if doc.body() == "temp file" {
            assert_eq!(doc.title(), "tempfile");
            assert_eq!(doc.file_name(), "tempfile.md");
            break;
        }
    }

    let hits = index.search("temp").await.unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].title(), "tempfile");
    let docs = index.documents().await.unwrap();
    assert_eq!(docs.len(), 5);
    assert_eq!(docs[0].title(), "tempfile");

    fs::remove_file(&path).unwrap();
    wait_for(&mut events, removed(&path)).await;

    assert!(index.search("temp").await.unwrap().is_empty());
    let docs = index.documents().await.unwrap();
    assert_eq!(docs.len(), 4);
    assert_eq!(docs[0].title(), "movies");

    index.close().await.unwrap();
}

#[tokio::test]
async fn watcher_picks_up_edits_and_nested_files() {
    let tmpdir = TempDir::new().unwrap();
    fixture(tmpdir.path());

    let index = DocIndex::open(tmpdir.path(), IndexOptions::default())
        .await
        .unwrap();
    index.ready().await.unwrap();
    let mut events = index.subscribe();

    let recipes = index.root().join("recipes.md");
    fs::write(&recipes, "crepes only").unwrap();
    loop {
        let doc = wait_for(&mut events, added(&recipes)).await;
        if doc.body() == "crepes only" {
            break;
        }
    }
    assert!(index.search("pancakes").await.unwrap().is_empty());
    assert_eq!(index.search("crepes").await.unwrap().len(), 1);

    let nested = index.root().join("top-5/foo.md");
    fs::write(&nested, "nested sushi").unwrap();
    loop {
        let doc = wait_for(&mut events, added(&nested)).await;
        if doc.body() == "nested sushi" {
            break;
        }
    }
    assert_eq!(index.documents().await.unwrap().len(), 5);

    index.close().await.unwrap();
}
