use thiserror::Error;

use crate::export::ExportKind;

#[derive(Error, Debug)]
pub enum StudioError {
    /// Wrong media type, non-UTF-8 bytes or unparsable vector markup
    #[error("Invalid input format: {0}")]
    InvalidInputFormat(String),
    #[error("Export failed: {0}")]
    ExportFailure(String),
    #[error("No model to export")]
    NoModelToExport,
    #[error("Export already in progress: {0}")]
    ExportInProgress(ExportKind),
    #[error("Cannot load a new document while a video export is active")]
    RecordingActive,
    #[error(transparent)]
    Io(#[from] std::io::Error),
}
