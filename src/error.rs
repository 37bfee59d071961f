use std::path::PathBuf;
use thiserror::Error;

/// Failures while reading an EPUB archive.
#[derive(Error, Debug)]
pub enum EpubError {
    #[error("invalid EPUB: {0}")]
    InvalidEpub(String),

    #[error("XML error: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("ZIP error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Failures that abort a single conversion.
#[derive(Error, Debug)]
pub enum ConvertError {
    #[error("failed to load EPUB {}: {source}", path.display())]
    Load {
        path: PathBuf,
        #[source]
        source: EpubError,
    },

    #[error("conversion produced no content")]
    EmptyOutput,

    #[error("failed to write {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

pub type Result<T> = std::result::Result<T, EpubError>;
