use std::fmt;

use knock_core::KnockError;

#[derive(Debug)]
pub enum StoreError {
    Sqlite(rusqlite::Error),
    Io(std::io::Error),
    Config(String),
    /// A recoverable knock failure (missing or malformed pattern).
    Knock(KnockError),
}

impl StoreError {
    /// Knock failures restart capture; everything else is a storage fault.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, StoreError::Knock(_))
    }

    pub fn as_knock(&self) -> Option<&KnockError> {
        match self {
            StoreError::Knock(e) => Some(e),
            _ => None,
        }
    }
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreError::Sqlite(e) => write!(f, "SQLite error: {e}"),
            StoreError::Io(e) => write!(f, "I/O error: {e}"),
            StoreError::Config(msg) => write!(f, "invalid settings: {msg}"),
            StoreError::Knock(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for StoreError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            StoreError::Sqlite(e) => Some(e),
            StoreError::Io(e) => Some(e),
            StoreError::Config(_) => None,
            StoreError::Knock(e) => Some(e),
        }
    }
}

impl From<rusqlite::Error> for StoreError {
    fn from(e: rusqlite::Error) -> Self {
        StoreError::Sqlite(e)
    }
}

impl From<std::io::Error> for StoreError {
    fn from(e: std::io::Error) -> Self {
        StoreError::Io(e)
    }
}

impl From<KnockError> for StoreError {
    fn from(e: KnockError) -> Self {
        StoreError::Knock(e)
    }
}

pub type Result<T> = std::result::Result<T, StoreError>;
