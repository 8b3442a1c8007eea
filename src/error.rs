//! Error types for sectionrank.

use std::io;
use thiserror::Error;

/// Result type alias for sectionrank operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error types that can occur while extracting, ranking, or refining sections.
#[derive(Error, Debug)]
pub enum Error {
    /// I/O error when reading or writing files.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The file format is not recognized as PDF.
    #[error("Unknown file format: not a valid PDF")]
    UnknownFormat,

    /// The PDF version is not supported.
    #[error("Unsupported PDF version: {0}")]
    UnsupportedVersion(String),

    /// Error parsing PDF structure.
    #[error("PDF parsing error: {0}")]
    PdfParse(String),

    /// The PDF document is encrypted.
    #[error("Document is encrypted")]
    Encrypted,

    /// The PDF structure is corrupted or malformed.
    #[error("Corrupted PDF structure: {0}")]
    Corrupted(String),

    /// Error extracting text content.
    #[error("Text extraction error: {0}")]
    TextExtract(String),

    /// The embedding service failed to produce vectors.
    #[error("Embedding error: {0}")]
    Embedding(String),

    /// The persona/task query cannot be built.
    #[error("Invalid query: {0}")]
    InvalidQuery(String),

    /// A configuration value is out of range.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Every requested document failed to extract.
    #[error("No readable documents ({0} failed)")]
    NoReadableDocuments(usize),

    /// The challenge input descriptor is missing or malformed.
    #[error("Challenge input error: {0}")]
    Challenge(String),

    /// Error serializing the analysis result.
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl Error {
    /// Whether this error belongs to a single document and can be isolated
    /// by skipping that document.
    pub fn is_document_error(&self) -> bool {
        matches!(
            self,
            Error::Io(_)
                | Error::UnknownFormat
                | Error::UnsupportedVersion(_)
                | Error::PdfParse(_)
                | Error::Encrypted
                | Error::Corrupted(_)
                | Error::TextExtract(_)
        )
    }
}

impl From<lopdf::Error> for Error {
    fn from(err: lopdf::Error) -> Self {
        match err {
            lopdf::Error::IO(e) => Error::Io(e),
            lopdf::Error::Decryption(_) => Error::Encrypted,
            _ => Error::PdfParse(err.to_string()),
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Serialization(err.to_string())
    }
}
