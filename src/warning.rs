use std::fmt::{Display, Formatter};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WarningCode {
    LowConfidence,
    HeaderInferenceLowConfidence,
    NoTablesDetected,
    EmptyOcrPage,
}

impl WarningCode {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::LowConfidence => "low_confidence",
            Self::HeaderInferenceLowConfidence => "header_low_confidence",
            Self::NoTablesDetected => "no_tables",
            Self::EmptyOcrPage => "empty_ocr_page",
        }
    }
}

/// Non-fatal finding collected while extracting one document.
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractWarning {
    pub code: WarningCode,
    pub message: String,
    pub page: Option<u32>,
    pub table_id: Option<usize>,
    pub confidence: Option<f32>,
}

impl ExtractWarning {
    #[must_use]
    pub fn new(code: WarningCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            page: None,
            table_id: None,
            confidence: None,
        }
    }

    #[must_use]
    pub fn with_page(mut self, page: u32) -> Self {
        self.page = Some(page);
        self
    }

    #[must_use]
    pub fn with_table_id(mut self, table_id: usize) -> Self {
        self.table_id = Some(table_id);
        self
    }

    #[must_use]
    pub fn with_confidence(mut self, confidence: f32) -> Self {
        self.confidence = Some(confidence);
        self
    }
}

impl Display for ExtractWarning {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}]", self.code.as_str())?;
        if let Some(page) = self.page {
            write!(f, " page={page}")?;
        }
        if let Some(table_id) = self.table_id {
            write!(f, " table={table_id}")?;
        }
        if let Some(confidence) = self.confidence {
            write!(f, " confidence={confidence:.2}")?;
        }
        write!(f, ": {}", self.message)
    }
}
