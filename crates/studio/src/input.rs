//! Upload acceptance: only SVG documents reach the parser.

use std::path::Path;

use crate::errors::StudioError;

pub const SVG_MEDIA_TYPE: &str = "image/svg+xml";

/// A user-supplied file: name, declared media type and raw bytes
#[derive(Debug, Clone)]
pub struct Upload {
    pub file_name: String,
    pub media_type: String,
    pub bytes: Vec<u8>,
}

impl Upload {
    pub fn new(
        file_name: impl Into<String>,
        media_type: impl Into<String>,
        bytes: Vec<u8>,
    ) -> Self {
        Self {
            file_name: file_name.into(),
            media_type: media_type.into(),
            bytes,
        }
    }

    /// An upload declared as SVG markup
    pub fn svg(file_name: impl Into<String>, text: &str) -> Self {
        Self::new(file_name, SVG_MEDIA_TYPE, text.as_bytes().to_vec())
    }

    /// Read a file from disk; the media type is inferred from its extension
    pub fn from_path(path: &Path) -> Result<Self, StudioError> {
        let bytes = std::fs::read(path)?;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        Ok(Self::new(file_name, media_type_for_path(path), bytes))
    }

    /// Check the media type and decode the markup
    pub fn into_svg_text(self) -> Result<String, StudioError> {
        if !self.media_type.trim().eq_ignore_ascii_case(SVG_MEDIA_TYPE) {
            return Err(StudioError::InvalidInputFormat(format!(
                "'{}' has media type '{}', expected {}",
                self.file_name, self.media_type, SVG_MEDIA_TYPE
            )));
        }
        String::from_utf8(self.bytes).map_err(|e| {
            StudioError::InvalidInputFormat(format!(
                "'{}' is not UTF-8 text: {}",
                self.file_name, e
            ))
        })
    }
}

/// Media type guessed from a file extension
pub fn media_type_for_path(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());
    match ext.as_deref() {
        Some("svg") => SVG_MEDIA_TYPE,
        Some("png") => "image/png",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("json") => "application/json",
        Some("txt") => "text/plain",
        _ => "application/octet-stream",
    }
}
