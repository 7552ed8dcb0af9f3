use std::path::PathBuf;

use thiserror::Error;

use crate::session::Slot;

/// Corpus could not be loaded. Callers fall back to running without a corpus.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("corpus file not found: {0}")]
    NotFound(PathBuf),

    #[error("read corpus {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("unsupported corpus format: {0}")]
    UnsupportedFormat(String),

    #[error("corpus archive error: {0}")]
    Archive(#[from] zip::result::ZipError),

    #[error("corpus xml error: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("malformed corpus: {0}")]
    Malformed(String),
}

/// A translation backend failed. Recorded as a sentinel in the affected slot only.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("unexpected status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("response parsing failed: {0}")]
    Response(String),

    #[error("remote error: {0}")]
    Remote(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Writing or reading the feedback sink failed.
#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("feedback io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("feedback serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("feedback row {line} is malformed: {message}")]
    Malformed { line: usize, message: String },
}

/// A rating or correction action was rejected.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("no history record at index {0}")]
    UnknownRecord(usize),

    #[error("{slot} of record {index} does not accept a correction (rate it 普通 or 不佳 first)")]
    CorrectionNotAccepted { index: usize, slot: Slot },

    #[error("correction text is empty")]
    EmptyCorrection,

    #[error(transparent)]
    Persistence(#[from] PersistenceError),
}
