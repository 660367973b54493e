use std::ops::RangeInclusive;
use std::path::PathBuf;
use std::str::FromStr;

use crate::cluster::DEFAULT_BUCKET_SIZE;

/// DPI the default bucket size is calibrated for.
pub const REFERENCE_DPI: u32 = 300;

/// PDF user space is 72 units per inch.
pub const PDF_UNITS_PER_INCH: u32 = 72;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeaderMode {
    AutoDetect,
    HasHeader,
    NoHeader,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QualityMode {
    BestEffort,
    Strict,
    SkipAmbiguous,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SheetLayout {
    /// One CSV file per table.
    PerTable,
    /// A single CSV with `page` and `table_id` columns in front.
    Merged,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PdfKind {
    Text,
    Scanned,
}

impl FromStr for PdfKind {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "" | "text" => Ok(Self::Text),
            "scanned" => Ok(Self::Scanned),
            other => Err(format!("unknown PDF type '{other}', expected text or scanned")),
        }
    }
}

/// 1-based pages kept by a `"1-3,5"` style selection, stored as ranges.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageSelection {
    ranges: Vec<RangeInclusive<u32>>,
}

impl PageSelection {
    #[must_use]
    pub fn contains(&self, page: u32) -> bool {
        self.ranges.iter().any(|range| range.contains(&page))
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }
}

impl FromStr for PageSelection {
    type Err = String;

    fn from_str(selection: &str) -> Result<Self, Self::Err> {
        let mut ranges = Vec::new();
        for token in selection.split(',').map(str::trim).filter(|s| !s.is_empty()) {
            if let Some((start, end)) = token.split_once('-') {
                let start: u32 = start
                    .trim()
                    .parse()
                    .map_err(|_| format!("invalid page range start: '{start}'"))?;
                let end: u32 = end
                    .trim()
                    .parse()
                    .map_err(|_| format!("invalid page range end: '{end}'"))?;
                if start == 0 || end == 0 {
                    return Err("pages are 1-based".to_string());
                }
                if end < start {
                    return Err(format!(
                        "invalid range '{token}': end is smaller than start"
                    ));
                }
                ranges.push(start..=end);
            } else {
                let page: u32 = token
                    .parse()
                    .map_err(|_| format!("invalid page number: '{token}'"))?;
                if page == 0 {
                    return Err("pages are 1-based".to_string());
                }
                ranges.push(page..=page);
            }
        }

        if ranges.is_empty() {
            return Err("page selection cannot be empty".to_string());
        }

        Ok(Self { ranges })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExtractOptions {
    pub pages: Option<PageSelection>,
    pub delimiter: u8,
    pub header_mode: HeaderMode,
    pub quality_mode: QualityMode,
    pub min_cols: usize,
    /// Row bucket height for scanned pages. `None` scales the default with the render DPI.
    pub bucket_size: Option<f64>,
    pub layout: SheetLayout,
}

impl Default for ExtractOptions {
    fn default() -> Self {
        Self {
            pages: None,
            delimiter: b',',
            header_mode: HeaderMode::AutoDetect,
            quality_mode: QualityMode::BestEffort,
            min_cols: 2,
            bucket_size: None,
            layout: SheetLayout::PerTable,
        }
    }
}

/// Locations and settings of the external rendering and OCR tools.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolConfig {
    pub tesseract_path: PathBuf,
    pub pdftoppm_path: PathBuf,
    pub language: String,
    pub dpi: u32,
}

impl Default for ToolConfig {
    fn default() -> Self {
        Self {
            tesseract_path: PathBuf::from("tesseract"),
            pdftoppm_path: PathBuf::from("pdftoppm"),
            language: "eng".to_string(),
            dpi: REFERENCE_DPI,
        }
    }
}

impl ToolConfig {
    /// Defaults overridden by `TESSERACT_CMD`, `PDFTOPPM_CMD` and `OCR_LANG`.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let non_empty = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());
        Self {
            tesseract_path: non_empty("TESSERACT_CMD")
                .map_or(defaults.tesseract_path, PathBuf::from),
            pdftoppm_path: non_empty("PDFTOPPM_CMD").map_or(defaults.pdftoppm_path, PathBuf::from),
            language: non_empty("OCR_LANG").unwrap_or(defaults.language),
            dpi: defaults.dpi,
        }
    }

    /// Scale from PDF units to rendered pixels.
    #[must_use]
    pub fn render_scale(&self) -> f64 {
        f64::from(self.dpi) / f64::from(PDF_UNITS_PER_INCH)
    }

    /// The default bucket size rescaled from the reference DPI to `self.dpi`.
    #[must_use]
    pub fn scaled_bucket_size(&self) -> f64 {
        DEFAULT_BUCKET_SIZE * f64::from(self.dpi) / f64::from(REFERENCE_DPI)
    }
}

#[cfg(test)]
mod tests {
    use super::{PageSelection, PdfKind, ToolConfig};
    use std::path::PathBuf;
    use std::str::FromStr;

    #[test]
    fn parse_page_selection_range_and_single() {
        let selection = PageSelection::from_str("1-3,5").expect("selection should parse");
        assert!(selection.contains(1));
        assert!(selection.contains(2));
        assert!(selection.contains(3));
        assert!(selection.contains(5));
        assert!(!selection.contains(4));
    }

    #[test]
    fn wide_page_range_is_parsed_without_expanding_it() {
        let selection =
            PageSelection::from_str("2-4000000000").expect("selection should parse");
        assert!(!selection.contains(1));
        assert!(selection.contains(2));
        assert!(selection.contains(4_000_000_000));
        assert!(!selection.contains(4_000_000_001));
    }

    #[test]
    fn reject_invalid_page_selection() {
        let err = PageSelection::from_str("3-1").expect_err("invalid range should fail");
        assert!(err.contains("invalid range"));
        assert!(PageSelection::from_str("0").is_err());
        assert!(PageSelection::from_str(" , ").is_err());
    }

    #[test]
    fn parse_pdf_kind() {
        assert_eq!(PdfKind::from_str("Scanned"), Ok(PdfKind::Scanned));
        assert_eq!(PdfKind::from_str(""), Ok(PdfKind::Text));
        assert!(PdfKind::from_str("invoice").is_err());
    }

    #[test]
    fn tool_paths_come_from_environment_lookup() {
        let config = ToolConfig::from_lookup(|key| match key {
            "TESSERACT_CMD" => Some("/opt/ocr/bin/tesseract".to_string()),
            "PDFTOPPM_CMD" => Some("  ".to_string()),
            _ => None,
        });
        assert_eq!(config.tesseract_path, PathBuf::from("/opt/ocr/bin/tesseract"));
        assert_eq!(config.pdftoppm_path, PathBuf::from("pdftoppm"));
        assert_eq!(config.language, "eng");
    }

    #[test]
    fn reference_dpi_matches_reference_scale() {
        let config = ToolConfig::default();
        assert!((config.render_scale() - 300.0 / 72.0).abs() < 1e-12);
        assert!((config.scaled_bucket_size() - 20.0).abs() < 1e-12);

        let half = ToolConfig {
            dpi: 150,
            ..ToolConfig::default()
        };
        assert!((half.scaled_bucket_size() - 10.0).abs() < 1e-12);
    }
}
