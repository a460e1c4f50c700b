use crate::error::{DocQueryError, DocQueryResult};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Options controlling what an index watches and how it reports changes.
///
/// Every field has an explicit default; see [`IndexOptions::default`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexOptions {
    /// Descend into sub-folders of the root. When `false` only the root's
    /// direct children are indexed, however deep the tree goes.
    pub recursive: bool,

    /// Accepted file extensions, matched case-insensitively and without the
    /// leading dot.
    pub extensions: Vec<String>,

    /// Index dot-files and files that live under dot-directories.
    pub include_hidden: bool,

    /// Per-path coalescing window for raw watch events. Zero disables it.
    pub debounce: Duration,

    /// Buffer size of the notification channel handed out by `subscribe`.
    pub event_capacity: usize,
}

impl Default for IndexOptions {
    fn default() -> Self {
        Self {
            recursive: true,
            extensions: vec!["md".to_string()],
            include_hidden: false,
            debounce: Duration::from_millis(50),
            event_capacity: 256,
        }
    }
}

impl IndexOptions {
    pub fn with_recursive(mut self, recursive: bool) -> Self {
        self.recursive = recursive;
        self
    }

    /// Replaces the accepted extensions. Leading dots are stripped, so both
    /// `"md"` and `".md"` work.
    pub fn with_extensions<I, S>(mut self, extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.extensions = extensions
            .into_iter()
            .map(|ext| ext.as_ref().trim_start_matches('.').to_ascii_lowercase())
            .filter(|ext| !ext.is_empty())
            .collect();
        self
    }

    pub fn with_hidden(mut self, include_hidden: bool) -> Self {
        self.include_hidden = include_hidden;
        self
    }

    pub fn with_debounce(mut self, debounce: Duration) -> Self {
        self.debounce = debounce;
        self
    }

    pub fn with_event_capacity(mut self, capacity: usize) -> Self {
        self.event_capacity = capacity.max(1);
        self
    }
}

/// Resolves a user-supplied root into the canonical directory an index keys
/// its documents under.
///
/// A leading `~` expands to the home directory. Returns
/// [`DocQueryError::InvalidRoot`] if the home directory is unknown, or if the
/// path does not exist or is not a directory.
pub fn resolve_root(root: &Path) -> DocQueryResult<PathBuf> {
    let expanded = match root.strip_prefix("~") {
        Ok(rest) => dirs::home_dir()
            .ok_or_else(|| DocQueryError::InvalidRoot(root.to_path_buf()))?
            .join(rest),
        Err(_) => root.to_path_buf(),
    };

    let canonical = expanded
        .canonicalize()
        .map_err(|_| DocQueryError::InvalidRoot(root.to_path_buf()))?;

    if !canonical.is_dir() {
        return Err(DocQueryError::InvalidRoot(root.to_path_buf()));
    }

    Ok(canonical)
}
