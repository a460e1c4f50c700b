use crate::config::IndexOptions;
use crate::domain::Document;
use log::{debug, warn};
use std::path::{Component, Path, PathBuf};
use walkdir::WalkDir;

/// Decides which paths under a root count as documents.
#[derive(Debug, Clone)]
pub struct DocumentFilter {
    root: PathBuf,
    recursive: bool,
    extensions: Vec<String>,
    include_hidden: bool,
}

impl DocumentFilter {
    pub fn new(root: &Path, options: &IndexOptions) -> Self {
        Self {
            root: root.to_path_buf(),
            recursive: options.recursive,
            extensions: options
                .extensions
                .iter()
                .map(|ext| ext.trim_start_matches('.').to_ascii_lowercase())
                .collect(),
            include_hidden: options.include_hidden,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Whether `path` is inside the watched scope, ignoring its extension.
    pub fn in_scope(&self, path: &Path) -> bool {
        let Ok(rel) = path.strip_prefix(&self.root) else {
            return false;
        };

        let mut depth = 0;
        for component in rel.components() {
            let Component::Normal(name) = component else {
                return false;
            };
            if !self.include_hidden && name.to_string_lossy().starts_with('.') {
                return false;
            }
            depth += 1;
        }

        depth > 0 && (self.recursive || depth == 1)
    }

    pub fn accepts(&self, path: &Path) -> bool {
        self.in_scope(path) && self.has_extension(path)
    }

    fn has_extension(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| self.extensions.iter().any(|x| x.eq_ignore_ascii_case(ext)))
    }
}

/// Walks `start` (the filter's root, or a directory below it) and reads every
/// accepted file.
///
/// Unreadable entries are logged and skipped. Blocking; run it off the async
/// executor.
pub fn scan_documents(filter: &DocumentFilter, start: &Path) -> Vec<Document> {
    let max_depth = if filter.recursive { usize::MAX } else { 1 };
    let include_hidden = filter.include_hidden;

    let walker = WalkDir::new(start)
        .max_depth(max_depth)
        .into_iter()
        .filter_entry(move |entry| {
            entry.depth() == 0
                || include_hidden
                || !entry.file_name().to_string_lossy().starts_with('.')
        });

    let mut docs = Vec::new();
    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                warn!("skipping unreadable entry during scan: {e}");
                continue;
            }
        };

        // links to files are read through, as on a live create; linked
        // directories are never entered
        let is_file = entry.file_type().is_file()
            || (entry.path_is_symlink() && entry.path().is_file());
        if !is_file || !filter.accepts(entry.path()) {
            continue;
        }

        match Document::read(entry.path()) {
            Ok(doc) => docs.push(doc),
            Err(e) if e.is_vanished() => debug!("{e}"),
            Err(e) => warn!("skipping document during scan: {e}"),
        }
    }

    docs
}
