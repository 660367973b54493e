pub mod batch;
pub mod cluster;
mod error;
pub mod files;
mod header;
mod model;
pub mod ocr;
mod options;
pub mod render;
pub mod scanned;
pub mod search;
pub mod sheet;
mod table_detect;
mod table_parse;
pub mod text_cache;
pub mod text_layer;
pub mod token;
mod warning;

use std::path::{Path, PathBuf};

use tracing::info;

use crate::cluster::TokenClusterer;
use crate::header::split_header;
use crate::ocr::OcrEngine;
use crate::render::PageRenderer;
use crate::table_detect::{apply_quality_mode, detect_tables};
use crate::table_parse::clean_rows;
use crate::text_layer::{PdfSource, read_pdf_pages};

pub use error::{ExtractError, InvalidTokenError, TokenFieldIssue};
pub use model::{ExtractedTable, MergedOutput, PageText};
pub use options::{
    ExtractOptions, HeaderMode, PDF_UNITS_PER_INCH, PageSelection, PdfKind, QualityMode,
    REFERENCE_DPI, SheetLayout, ToolConfig,
};
pub use warning::{ExtractWarning, WarningCode};

#[derive(Debug, Clone, PartialEq)]
pub struct ExtractionReport {
    pub tables: Vec<ExtractedTable>,
    pub row_count: usize,
    pub table_count: usize,
    pub warnings: Vec<ExtractWarning>,
}

impl ExtractionReport {
    fn new(tables: Vec<ExtractedTable>, mut warnings: Vec<ExtractWarning>) -> Self {
        if tables.is_empty() {
            warnings.push(ExtractWarning::new(
                WarningCode::NoTablesDetected,
                "no table rows were detected in the selected pages",
            ));
        }
        Self {
            row_count: tables.iter().map(|table| table.rows.len()).sum(),
            table_count: tables.len(),
            tables,
            warnings,
        }
    }
}

fn validate_options(options: &ExtractOptions) -> Result<(), ExtractError> {
    if options.min_cols < 2 {
        return Err(ExtractError::InvalidOption(
            "min_cols must be at least 2".to_string(),
        ));
    }
    Ok(())
}

/// Bucket size for a render resolution: the explicit option, or the default
/// rescaled from 300 DPI.
pub fn clusterer_for(options: &ExtractOptions, dpi: u32) -> Result<TokenClusterer, ExtractError> {
    let bucket_size = options.bucket_size.unwrap_or_else(|| {
        ToolConfig {
            dpi,
            ..ToolConfig::default()
        }
        .scaled_bucket_size()
    });
    TokenClusterer::new(bucket_size)
}

/// Tables from the text layer of a digital PDF.
pub fn extract_text_tables(
    source: PdfSource<'_>,
    options: &ExtractOptions,
) -> Result<ExtractionReport, ExtractError> {
    validate_options(options)?;

    let pages = read_pdf_pages(source, options.pages.as_ref())?;
    let mut warnings = Vec::new();
    let detected = detect_tables(&pages, options.min_cols);
    let detected = apply_quality_mode(detected, options.quality_mode, &mut warnings)?;

    let mut tables = Vec::new();
    for table in detected {
        let rows = clean_rows(&table.rows);
        if rows.is_empty() {
            continue;
        }
        let table_id = tables.len() + 1;
        let (header, rows) =
            split_header(rows, options.header_mode, table.page, table_id, &mut warnings);
        tables.push(ExtractedTable {
            page: table.page,
            table_id,
            header,
            rows,
        });
    }

    info!(tables = tables.len(), "text-layer extraction finished");
    Ok(ExtractionReport::new(tables, warnings))
}

/// One table per scanned page, rebuilt from OCR word positions.
pub fn extract_ocr_tables(
    pdf: &Path,
    options: &ExtractOptions,
    renderer: &dyn PageRenderer,
    ocr: &dyn OcrEngine,
) -> Result<ExtractionReport, ExtractError> {
    let clusterer = clusterer_for(options, renderer.dpi())?;
    let page_count = text_layer::page_count(PdfSource::Path(pdf))?;
    let pages = scanned::selected_pages(page_count, options.pages.as_ref())?;
    let page_tables = scanned::extract_scanned_tables(pdf, &pages, renderer, ocr, clusterer)?;

    // OCR rows carry no reliable header signal; only an explicit request splits one off.
    let header_mode = match options.header_mode {
        HeaderMode::AutoDetect => HeaderMode::NoHeader,
        mode => mode,
    };

    let mut warnings = Vec::new();
    let mut tables = Vec::new();
    for page_table in page_tables {
        if page_table.rows.is_empty() {
            warnings.push(
                ExtractWarning::new(WarningCode::EmptyOcrPage, "OCR found no words on page")
                    .with_page(page_table.page),
            );
            continue;
        }
        let table_id = tables.len() + 1;
        let (header, rows) = split_header(
            page_table.rows,
            header_mode,
            page_table.page,
            table_id,
            &mut warnings,
        );
        tables.push(ExtractedTable {
            page: page_table.page,
            table_id,
            header,
            rows,
        });
    }

    info!(tables = tables.len(), "OCR extraction finished");
    Ok(ExtractionReport::new(tables, warnings))
}

/// OCR text of the selected pages, joined with page markers.
pub fn extract_ocr_text(
    pdf: &Path,
    pages: Option<&PageSelection>,
    renderer: &dyn PageRenderer,
    ocr: &dyn OcrEngine,
) -> Result<String, ExtractError> {
    let page_count = text_layer::page_count(PdfSource::Path(pdf))?;
    let selected = scanned::selected_pages(page_count, pages)?;
    let texts = scanned::ocr_page_texts(pdf, &selected, renderer, ocr)?;
    Ok(text_cache::join_page_texts(&texts))
}

/// Writes the report's tables as sheets under `output`.
///
/// `output` is a directory for [`SheetLayout::PerTable`] and a file path
/// (`.csv` appended when missing) for [`SheetLayout::Merged`].
pub fn write_tables(
    report: &ExtractionReport,
    output: &Path,
    options: &ExtractOptions,
) -> Result<Vec<PathBuf>, ExtractError> {
    match options.layout {
        SheetLayout::PerTable => sheet::write_per_table(output, &report.tables, options.delimiter),
        SheetLayout::Merged => {
            let path = if output.extension().is_some() {
                output.to_path_buf()
            } else {
                output.with_extension("csv")
            };
            let merged = sheet::merge_tables(&report.tables);
            sheet::write_merged(&path, &merged, options.delimiter)?;
            Ok(vec![path])
        }
    }
}
