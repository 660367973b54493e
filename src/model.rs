#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageText {
    pub page_number: u32,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DetectedTable {
    pub page: u32,
    pub rows: Vec<Vec<String>>,
    pub confidence: f32,
}

/// A cleaned table ready for a sheet writer. Rows may be ragged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedTable {
    pub page: u32,
    pub table_id: usize,
    pub header: Option<Vec<String>>,
    pub rows: Vec<Vec<String>>,
}

impl ExtractedTable {
    /// Widest row, header included.
    #[must_use]
    pub fn width(&self) -> usize {
        self.rows
            .iter()
            .chain(self.header.iter())
            .map(Vec::len)
            .max()
            .unwrap_or(0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergedOutput {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
    pub table_count: usize,
    pub row_count: usize,
}
