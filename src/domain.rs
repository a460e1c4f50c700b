use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ReadError {
    #[error("file vanished before it could be read: {0}")]
    Vanished(PathBuf),
    #[error("invalid document path: {0}")]
    InvalidPath(PathBuf),
    #[error("not a regular file: {0}")]
    NotAFile(PathBuf),
    #[error("not valid UTF-8 text: {0}")]
    NotText(PathBuf),
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl ReadError {
    /// Whether the file disappeared between notification and read. Such
    /// errors mean "treat as deleted" rather than "something is wrong".
    pub fn is_vanished(&self) -> bool {
        matches!(self, ReadError::Vanished(_))
    }

    fn from_io(path: &Path, err: std::io::Error) -> Self {
        if err.kind() == ErrorKind::NotFound {
            ReadError::Vanished(path.to_path_buf())
        } else {
            ReadError::Io {
                path: path.to_path_buf(),
                source: err,
            }
        }
    }
}

/// One text document as it was last read from disk.
///
/// `file_name` and `title` are derived from `path` when the record is built
/// and cannot be set on their own. Records are never edited in place: a change
/// on disk produces a fresh `Document` that replaces the old one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    path: PathBuf,
    file_name: String,
    title: String,
    body: String,
    modified_at: SystemTime,
}

impl Document {
    /// Builds a record from already-read parts.
    ///
    /// Returns `ReadError::InvalidPath` if `path` has no UTF-8 file name.
    pub fn new(path: PathBuf, body: String, modified_at: SystemTime) -> Result<Self, ReadError> {
        let file_name = path
            .file_name()
            .and_then(|name| name.to_str())
            .ok_or_else(|| ReadError::InvalidPath(path.clone()))?
            .to_owned();

        let title = Path::new(&file_name)
            .file_stem()
            .and_then(|stem| stem.to_str())
            .unwrap_or(&file_name)
            .to_owned();

        Ok(Document {
            path,
            file_name,
            title,
            body,
            modified_at,
        })
    }

    /// Reads a document from disk.
    ///
    /// A missing file maps to `ReadError::Vanished`, content that is not
    /// UTF-8 to `ReadError::NotText`.
    /// Symlinks are followed.
    pub fn read(path: &Path) -> Result<Self, ReadError> {
        let metadata = fs::metadata(path).map_err(|e| ReadError::from_io(path, e))?;
        if !metadata.is_file() {
            return Err(ReadError::NotAFile(path.to_path_buf()));
        }

        let modified_at = metadata
            .modified()
            .map_err(|e| ReadError::from_io(path, e))?;
        let bytes = fs::read(path).map_err(|e| ReadError::from_io(path, e))?;
        let body = String::from_utf8(bytes).map_err(|_| ReadError::NotText(path.to_path_buf()))?;

        Document::new(path.to_path_buf(), body, modified_at)
    }

    /// Reads a document on the blocking pool.
    pub async fn load(path: PathBuf) -> Result<Self, ReadError> {
        let fallback = path.clone();
        tokio::task::spawn_blocking(move || Document::read(&path))
            .await
            .unwrap_or_else(|e| {
                Err(ReadError::Io {
                    path: fallback,
                    source: std::io::Error::other(e),
                })
            })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn body(&self) -> &str {
        &self.body
    }

    pub fn modified_at(&self) -> SystemTime {
        self.modified_at
    }

    /// True when both records describe the same file contents at the same
    /// modification time.
    pub fn same_revision(&self, other: &Document) -> bool {
        self.path == other.path && self.modified_at == other.modified_at && self.body == other.body
    }
}
