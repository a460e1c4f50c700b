//! # docquery_core
//!
//! A live, searchable index over a directory of text documents. The index is
//! built by an initial scan and then kept in step with the filesystem as files
//! are created, modified and deleted.
//!
//! ## Features
//!
//! - **Initial scan**: recursive or direct-children-only, filtered by extension
//! - **Live updates**: `notify`-based watching with per-path debouncing
//! - **Full-text search**: SQLite FTS5 in memory, BM25 ranking, prefix terms
//! - **Ordered listing**: documents newest-first by modification time
//! - **Notifications**: `Ready`, `Added` and `Removed` over a broadcast channel
//! - **Consistent reads**: queries never see a half-applied change
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use docquery_core::{DocIndex, IndexOptions};
//!
//! # async fn run() -> Result<(), docquery_core::DocQueryError> {
//! let index = DocIndex::open("~/notes", IndexOptions::default()).await?;
//! index.ready().await?;
//!
//! for doc in index.search("cheeseburger").await? {
//!     println!("{} ({})", doc.title(), doc.path().display());
//! }
//!
//! if let Some(newest) = index.documents().await?.first() {
//!     println!("last edited: {}", newest.title());
//! }
//! index.close().await?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Following changes
//!
//! ```rust,no_run
//! use docquery_core::{DocIndex, IndexEvent, IndexOptions};
//!
//! # async fn run() -> Result<(), docquery_core::DocQueryError> {
//! let index = DocIndex::open("/srv/docs", IndexOptions::default().with_recursive(false)).await?;
//! let mut events = index.subscribe();
//!
//! while let Ok(event) = events.recv().await {
//!     match event {
//!         IndexEvent::Ready => println!("scan finished"),
//!         IndexEvent::Added(doc) => println!("indexed {}", doc.file_name()),
//!         IndexEvent::Removed(doc) => println!("dropped {}", doc.file_name()),
//!     }
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! - **[`domain`]**: the [`Document`] record and how it is read from disk
//! - **[`store`]**: the ordered in-memory [`store::IndexStore`]
//! - **[`search`]**: the [`search::SearchBackend`] trait and the FTS5 backend
//! - **[`watcher`]**: watch sources, debouncing, scanning and the sync worker
//! - **[`index`]**: the public [`DocIndex`] façade
//! - **[`config`]**: [`IndexOptions`] and root resolution
//! - **[`error`]**: the crate-wide [`DocQueryError`]
//!
//! The library logs through the `log` facade and installs no logger.

pub mod config;
pub mod domain;
pub mod error;
pub mod index;
pub mod search;
pub mod store;
pub mod watcher;

pub use config::IndexOptions;
pub use domain::{Document, ReadError};
pub use error::{DocQueryError, DocQueryResult};
pub use index::{DocIndex, IndexEvent};
pub use watcher::service::Phase;
