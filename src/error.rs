//! Error types for comicmeta operations.

use thiserror::Error;

/// Errors that can occur while reading or writing comic metadata.
#[derive(Error, Debug)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("ZIP error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("malformed XML document: {0}")]
    Malformed(#[from] xmltree::ParseError),

    #[error("XML serialization error: {0}")]
    XmlWrite(String),

    #[error("not an ACBF document")]
    NotAcbf,

    #[error("unsupported ACBF version: {0}")]
    UnsupportedVersion(String),

    #[error("archive does not support named file storage")]
    UnsupportedArchive,

    #[error("failed to write entry {0} to archive")]
    ArchiveWrite(String),

    #[error("UTF-8 decoding error: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),
}

pub type Result<T> = std::result::Result<T, Error>;
