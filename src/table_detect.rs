use tracing::debug;

use crate::error::ExtractError;
use crate::model::{DetectedTable, PageText};
use crate::options::QualityMode;
use crate::table_parse::{modal_width, soft_split_line_into_cells, split_line_into_cells};
use crate::warning::{ExtractWarning, WarningCode};

pub(crate) const LOW_CONFIDENCE_THRESHOLD: f32 = 0.60;

/// Soft-split lines wider than this are only accepted when they contain digits.
const MAX_SOFT_SPLIT_TEXT_CELLS: usize = 6;

#[allow(clippy::cast_precision_loss)]
pub(crate) fn table_confidence(rows: &[Vec<String>]) -> f32 {
    if rows.len() < 2 {
        return 0.0;
    }

    let modal = modal_width(rows);
    if modal == 0 {
        return 0.0;
    }

    let consistent =
        rows.iter().filter(|row| row.len() == modal).count() as f32 / rows.len() as f32;
    let max_width = rows.iter().map(Vec::len).max().unwrap_or(modal);
    let min_width = rows.iter().map(Vec::len).min().unwrap_or(modal);
    let uniformity = if max_width == 0 {
        0.0
    } else {
        1.0 - ((max_width - min_width) as f32 / max_width as f32)
    };

    (consistent * 0.75 + uniformity * 0.25).clamp(0.0, 1.0)
}

fn line_cells(line: &str, min_cols: usize) -> Option<Vec<String>> {
    let cells = split_line_into_cells(line);
    if cells.len() >= min_cols {
        return Some(cells);
    }

    let soft_cells = soft_split_line_into_cells(line);
    let has_numeric = soft_cells
        .iter()
        .any(|cell| cell.chars().any(|ch| ch.is_ascii_digit()));
    let looks_like_sentence = line.trim_end().ends_with(['.', '!', '?']);
    let accepted = soft_cells.len() >= min_cols
        && !looks_like_sentence
        && (has_numeric || soft_cells.len() <= MAX_SOFT_SPLIT_TEXT_CELLS);
    accepted.then_some(soft_cells)
}

/// Tables are runs of at least two consecutive multi-cell lines.
fn detect_tables_in_page(page: &PageText, min_cols: usize) -> Vec<DetectedTable> {
    let mut tables = Vec::new();
    let mut run: Vec<Vec<String>> = Vec::new();

    let close_run = |run: &mut Vec<Vec<String>>, tables: &mut Vec<DetectedTable>| {
        if run.len() >= 2 {
            let confidence = table_confidence(run);
            tables.push(DetectedTable {
                page: page.page_number,
                rows: std::mem::take(run),
                confidence,
            });
        } else {
            run.clear();
        }
    };

    for line in page.text.lines() {
        match line_cells(line, min_cols) {
            Some(cells) => run.push(cells),
            None => close_run(&mut run, &mut tables),
        }
    }
    close_run(&mut run, &mut tables);

    debug!(
        page = page.page_number,
        tables = tables.len(),
        "detected text-layer tables"
    );
    tables
}

pub(crate) fn detect_tables(pages: &[PageText], min_cols: usize) -> Vec<DetectedTable> {
    pages
        .iter()
        .flat_map(|page| detect_tables_in_page(page, min_cols.max(2)))
        .collect()
}

pub(crate) fn apply_quality_mode(
    tables: Vec<DetectedTable>,
    mode: QualityMode,
    warnings: &mut Vec<ExtractWarning>,
) -> Result<Vec<DetectedTable>, ExtractError> {
    let mut kept = Vec::with_capacity(tables.len());

    for table in tables {
        if table.confidence >= LOW_CONFIDENCE_THRESHOLD {
            kept.push(table);
            continue;
        }

        match mode {
            QualityMode::BestEffort => {
                warnings.push(
                    ExtractWarning::new(
                        WarningCode::LowConfidence,
                        "table confidence is low; exported in best-effort mode",
                    )
                    .with_page(table.page)
                    .with_confidence(table.confidence),
                );
                kept.push(table);
            }
            QualityMode::Strict => {
                return Err(ExtractError::AmbiguousTable {
                    page: table.page,
                    confidence: table.confidence,
                });
            }
            QualityMode::SkipAmbiguous => {
                warnings.push(
                    ExtractWarning::new(WarningCode::LowConfidence, "skipping low-confidence table")
                        .with_page(table.page)
                        .with_confidence(table.confidence),
                );
            }
        }
    }

    Ok(kept)
}
