use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DocQueryError {
    #[error(transparent)]
    Read(#[from] crate::domain::ReadError),

    #[error(transparent)]
    WatchSource(#[from] crate::watcher::WatchError),

    #[error("index is closed")]
    Closed,

    #[error("index is still initializing")]
    NotReady,

    #[error("invalid index root: {0}")]
    InvalidRoot(PathBuf),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("Database error: {0}")]
    Db(#[from] sqlx::Error),

    #[error("Other error: {0}")]
    Other(String),
}

pub type DocQueryResult<T> = Result<T, DocQueryError>;
