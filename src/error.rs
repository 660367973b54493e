use std::io;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSV output is not valid UTF-8: {0}")]
    OutputEncoding(#[from] std::string::FromUtf8Error),

    #[error("failed to load PDF: {0}")]
    PdfLoad(#[from] lopdf::Error),

    #[error("failed to extract PDF text: {0}")]
    PdfExtract(String),

    #[error("invalid page selection: {0}")]
    InvalidPageSelection(String),

    #[error("invalid option: {0}")]
    InvalidOption(String),

    #[error("no pages available after applying selection")]
    NoPagesSelected,

    #[error("table on page {page} is too ambiguous (confidence={confidence:.2})")]
    AmbiguousTable { page: u32, confidence: f32 },

    #[error("external tool '{tool}' failed: {message}")]
    ExternalTool { tool: String, message: String },

    #[error("malformed OCR output: {0}")]
    OcrOutput(String),

    #[error(transparent)]
    InvalidToken(#[from] InvalidTokenError),
}

/// A token handed over by the OCR side that lacks a required field.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("token {index} is invalid: {reason} '{field}'")]
pub struct InvalidTokenError {
    pub index: usize,
    pub field: &'static str,
    pub reason: TokenFieldIssue,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenFieldIssue {
    Missing,
    NotFinite,
}

impl std::fmt::Display for TokenFieldIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Missing => f.write_str("missing field"),
            Self::NotFinite => f.write_str("non-finite value in"),
        }
    }
}

impl ExtractError {
    pub(crate) fn tool(tool: &str, message: impl Into<String>) -> Self {
        Self::ExternalTool {
            tool: tool.to_string(),
            message: message.into(),
        }
    }
}
