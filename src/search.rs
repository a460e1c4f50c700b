//! Full-text search over indexed documents.
//!
//! The synchronization engine treats ranking as a black box behind the
//! [`SearchBackend`] trait: it hands over every document it indexes, removes
//! documents by path, and asks for paths ranked by relevance. The façade then
//! resolves those paths back into full records through the index store.
//!
//! # Default backend
//!
//! [`index::FtsIndex`] keeps an in-memory SQLite database with an FTS5 table
//! and ranks hits with BM25. Nothing is written to disk; the index is rebuilt
//! by the initial scan every time a `DocIndex` is opened.
//!
//! # Query syntax
//!
//! User text is not passed to FTS5 verbatim. [`query::fts_query`] splits it
//! into alphanumeric terms and turns each into a prefix match, so
//!
//! - `temp` matches `temp file` and the title `tempfile`
//! - `cheese burger` matches documents containing both terms
//! - punctuation such as `"`, `-` or `:` never reaches the FTS5 parser
//!
//! # Usage
//!
//! ```rust,no_run
//! use docquery_core::search::{SearchBackend, SearchOptions, index::FtsIndex};
//!
//! # async fn run() -> Result<(), docquery_core::DocQueryError> {
//! let fts = FtsIndex::in_memory().await?;
//! let paths = fts.query("cheeseburger", &SearchOptions::default()).await?;
//! # Ok(())
//! # }
//! ```

pub mod index;
pub mod query;

use crate::domain::Document;
use crate::error::DocQueryResult;
use async_trait::async_trait;
use std::path::{Path, PathBuf};

/// A full-text index keyed by document path.
///
/// Implementations must keep at most one entry per path: indexing a path
/// that is already present replaces its entry.
#[async_trait]
pub trait SearchBackend: Send + Sync {
    /// Adds `doc`, replacing any entry stored under the same path.
    async fn index(&self, doc: &Document) -> DocQueryResult<()>;

    /// Removes the entry for `path`. Returns whether one existed.
    async fn remove(&self, path: &Path) -> DocQueryResult<bool>;

    /// Paths matching `text`, best match first.
    async fn query(&self, text: &str, options: &SearchOptions) -> DocQueryResult<Vec<PathBuf>>;

    /// Releases backend resources. Called once when the owning index closes.
    async fn close(&self) {}
}

/// Paging controls for search queries.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchOptions {
    /// Maximum number of results to return.
    ///
    /// `None` returns every match.
    pub limit: Option<u32>,

    /// Number of ranked results to skip.
    ///
    /// Used together with `limit` for paginated results.
    pub offset: Option<u32>,
}

impl SearchOptions {
    pub fn page(limit: u32, offset: u32) -> Self {
        Self {
            limit: Some(limit),
            offset: Some(offset),
        }
    }
}
