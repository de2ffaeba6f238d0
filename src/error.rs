use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("{0}")]
    Usage(String),

    #[error("Input file not found: {}", .0.display())]
    InputNotFound(PathBuf),

    #[error("Failed to open input file: {0}")]
    InputFileError(String),

    #[error("Failed to parse XML: {0}")]
    XmlParseError(String),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Malformed record of type {record_type}: {reason}")]
    MalformedRecord { record_type: String, reason: String },

    #[error("No {0} found in the export")]
    NoRecords(String),

    #[error("Failed to render PDF: {0}")]
    PdfError(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to read ZIP archive: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("Threading error: {0}")]
    ThreadError(String),

    #[error("Unknown error: {0}")]
    Unknown(String),
}

impl From<tokio::task::JoinError> for AppError {
    fn from(e: tokio::task::JoinError) -> Self {
        AppError::ThreadError(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
