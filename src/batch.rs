//! Folder processing: every PDF in a folder to sheets, plus a summary CSV.

use std::path::{Path, PathBuf};

use csv::WriterBuilder;
use serde::Serialize;
use tracing::{error, info, warn};

use crate::error::ExtractError;
use crate::files::{list_pdf_files, move_processed, output_stem};
use crate::ocr::OcrEngine;
use crate::options::{ExtractOptions, PdfKind, SheetLayout};
use crate::render::PageRenderer;
use crate::text_layer::PdfSource;
use crate::{ExtractionReport, extract_ocr_tables, extract_text_tables, write_tables};

/// Rendering and OCR collaborators for scanned documents.
#[derive(Clone, Copy)]
pub struct OcrTools<'a> {
    pub renderer: &'a dyn PageRenderer,
    pub ocr: &'a dyn OcrEngine,
}

#[derive(Debug, Clone)]
pub struct BatchJob {
    pub input_dir: PathBuf,
    pub output_dir: PathBuf,
    /// Successfully processed PDFs are moved here when set.
    pub processed_dir: Option<PathBuf>,
    pub kind: PdfKind,
    pub options: ExtractOptions,
    /// Suffix for output names, e.g. `20240309_070501`.
    pub timestamp: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OutcomeStatus {
    Success,
    Empty,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProcessOutcome {
    pub file: String,
    pub status: OutcomeStatus,
    pub tables: usize,
    pub rows: usize,
    pub output: Option<String>,
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchSummary {
    pub outcomes: Vec<ProcessOutcome>,
    pub summary_path: Option<PathBuf>,
}

impl BatchSummary {
    #[must_use]
    pub fn count(&self, status: OutcomeStatus) -> usize {
        self.outcomes
            .iter()
            .filter(|outcome| outcome.status == status)
            .count()
    }
}

pub fn extract_report(
    pdf: &Path,
    kind: PdfKind,
    options: &ExtractOptions,
    tools: OcrTools<'_>,
) -> Result<ExtractionReport, ExtractError> {
    match kind {
        PdfKind::Text => extract_text_tables(PdfSource::Path(pdf), options),
        PdfKind::Scanned => extract_ocr_tables(pdf, options, tools.renderer, tools.ocr),
    }
}

fn sheet_target(job: &BatchJob, pdf: &Path) -> PathBuf {
    let stem = output_stem(&job.output_dir, pdf, "_tables", &job.timestamp);
    match job.options.layout {
        SheetLayout::PerTable => stem,
        SheetLayout::Merged => {
            // Stems may contain dots, so the extension is appended rather than set.
            let mut name = stem.into_os_string();
            name.push(".csv");
            PathBuf::from(name)
        }
    }
}

/// Extracts one PDF and writes its sheets. Never fails; errors become outcomes.
pub fn process_pdf(pdf: &Path, job: &BatchJob, tools: OcrTools<'_>) -> ProcessOutcome {
    let file = pdf.display().to_string();
    info!(pdf = %file, kind = ?job.kind, "processing PDF");

    let result = extract_report(pdf, job.kind, &job.options, tools).and_then(|report| {
        if report.table_count == 0 {
            return Ok((report, None));
        }
        let target = sheet_target(job, pdf);
        write_tables(&report, &target, &job.options)?;
        Ok((report, Some(target)))
    });

    match result {
        Ok((report, output)) => {
            for warning in &report.warnings {
                warn!(pdf = %file, "{warning}");
            }
            if let Some(processed_dir) = &job.processed_dir {
                move_processed(pdf, processed_dir);
            }
            ProcessOutcome {
                file,
                status: if report.table_count > 0 {
                    OutcomeStatus::Success
                } else {
                    OutcomeStatus::Empty
                },
                tables: report.table_count,
                rows: report.row_count,
                output: output.map(|path| path.display().to_string()),
                error: None,
            }
        }
        Err(err) => {
            error!(pdf = %file, error = %err, "PDF processing failed");
            ProcessOutcome {
                file,
                status: OutcomeStatus::Failed,
                tables: 0,
                rows: 0,
                output: None,
                error: Some(err.to_string()),
            }
        }
    }
}

pub fn write_summary(path: &Path, outcomes: &[ProcessOutcome]) -> Result<(), ExtractError> {
    let mut writer = WriterBuilder::new().from_path(path)?;
    for outcome in outcomes {
        writer.serialize(outcome)?;
    }
    writer.flush()?;
    Ok(())
}

/// Processes every PDF in `job.input_dir`; one failing file never stops the rest.
pub fn process_folder(job: &BatchJob, tools: OcrTools<'_>) -> Result<BatchSummary, ExtractError> {
    let pdf_files = list_pdf_files(&job.input_dir)?;
    if pdf_files.is_empty() {
        warn!(dir = %job.input_dir.display(), "no PDF files found");
        return Ok(BatchSummary {
            outcomes: Vec::new(),
            summary_path: None,
        });
    }

    info!(count = pdf_files.len(), "found PDF files to process");
    std::fs::create_dir_all(&job.output_dir)?;

    let outcomes = pdf_files
        .iter()
        .map(|pdf| process_pdf(pdf, job, tools))
        .collect::<Vec<_>>();

    let summary_path = job
        .output_dir
        .join(format!("summary_{}.csv", job.timestamp));
    write_summary(&summary_path, &outcomes)?;
    info!(summary = %summary_path.display(), "batch finished");

    Ok(BatchSummary {
        outcomes,
        summary_path: Some(summary_path),
    })
}
