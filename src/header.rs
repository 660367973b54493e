use crate::options::HeaderMode;
use crate::warning::{ExtractWarning, WarningCode};

const HEADER_CONFIDENCE_THRESHOLD: f32 = 0.55;

fn is_numeric(value: &str) -> bool {
    let trimmed = value
        .trim()
        .trim_start_matches(['$', '€', '£'])
        .trim_end_matches('%')
        .replace(',', "");
    !trimmed.is_empty() && trimmed.parse::<f64>().is_ok()
}

#[allow(clippy::cast_precision_loss)]
fn non_numeric_ratio(cells: &[String]) -> f32 {
    if cells.is_empty() {
        return 0.0;
    }

    let non_numeric = cells.iter().filter(|cell| !is_numeric(cell)).count();
    non_numeric as f32 / cells.len() as f32
}

/// Guesses whether the first row labels the columns below it.
pub(crate) fn infer_has_header(rows: &[Vec<String>]) -> (bool, f32) {
    let Some(first) = rows.first() else {
        return (false, 0.0);
    };

    let first = non_numeric_ratio(first);
    let second = rows.get(1).map_or(0.0, |row| non_numeric_ratio(row));

    let confidence = (first * 0.6 + (1.0 - second) * 0.4).clamp(0.0, 1.0);
    let has_header = first >= 0.6 && second <= 0.7;
    (has_header, confidence)
}

/// Separates the header row from the data rows according to `mode`.
pub(crate) fn split_header(
    mut rows: Vec<Vec<String>>,
    mode: HeaderMode,
    page: u32,
    table_id: usize,
    warnings: &mut Vec<ExtractWarning>,
) -> (Option<Vec<String>>, Vec<Vec<String>>) {
    if rows.is_empty() {
        return (None, rows);
    }

    let take_first = match mode {
        HeaderMode::HasHeader => true,
        HeaderMode::NoHeader => false,
        HeaderMode::AutoDetect => {
            let (has_header, confidence) = infer_has_header(&rows);
            if confidence < HEADER_CONFIDENCE_THRESHOLD {
                warnings.push(
                    ExtractWarning::new(
                        WarningCode::HeaderInferenceLowConfidence,
                        "header inference confidence is low; keeping the first row as data",
                    )
                    .with_page(page)
                    .with_table_id(table_id)
                    .with_confidence(confidence),
                );
            }
            has_header && confidence >= HEADER_CONFIDENCE_THRESHOLD
        }
    };

    if take_first {
        let header = rows.remove(0);
        (Some(header), rows)
    } else {
        (None, rows)
    }
}

#[cfg(test)]
mod tests {
    use super::{infer_has_header, split_header};
    use crate::options::HeaderMode;
    use crate::warning::WarningCode;

    fn owned(rows: &[&[&str]]) -> Vec<Vec<String>> {
        rows.iter()
            .map(|row| row.iter().map(|cell| (*cell).to_string()).collect())
            .collect()
    }

    #[test]
    fn infers_headers_for_text_then_numeric_rows() {
        let rows = owned(&[&["Name", "Age"], &["Alice", "30"]]);
        let (has_header, confidence) = infer_has_header(&rows);
        assert!(has_header);
        assert!(confidence > 0.5);
    }

    #[test]
    fn currency_and_percent_cells_count_as_numeric() {
        let rows = owned(&[&["Item", "Total", "Tax"], &["12", "$1,200.50", "8%"]]);
        let (has_header, _) = infer_has_header(&rows);
        assert!(has_header);
    }

    #[test]
    fn auto_detect_moves_header_out_of_rows() {
        let mut warnings = Vec::new();
        let (header, rows) = split_header(
            owned(&[&["Qty", "Price"], &["2", "9.50"]]),
            HeaderMode::AutoDetect,
            1,
            1,
            &mut warnings,
        );
        assert_eq!(header, Some(vec!["Qty".to_string(), "Price".to_string()]));
        assert_eq!(rows, owned(&[&["2", "9.50"]]));
        assert!(warnings.is_empty());
    }

    #[test]
    fn numeric_first_row_stays_data_with_warning() {
        let mut warnings = Vec::new();
        let (header, rows) = split_header(
            owned(&[&["1", "2"], &["3", "4"]]),
            HeaderMode::AutoDetect,
            2,
            5,
            &mut warnings,
        );
        assert!(header.is_none());
        assert_eq!(rows.len(), 2);
        assert_eq!(warnings[0].code, WarningCode::HeaderInferenceLowConfidence);
        assert_eq!(warnings[0].table_id, Some(5));
    }

    #[test]
    fn explicit_modes_skip_inference() {
        let mut warnings = Vec::new();
        let (header, rows) =
            split_header(owned(&[&["1", "2"]]), HeaderMode::HasHeader, 1, 1, &mut warnings);
        assert_eq!(header, Some(vec!["1".to_string(), "2".to_string()]));
        assert!(rows.is_empty());

        let (header, rows) =
            split_header(owned(&[&["a", "b"]]), HeaderMode::NoHeader, 1, 1, &mut warnings);
        assert!(header.is_none());
        assert_eq!(rows.len(), 1);
        assert!(warnings.is_empty());
    }
}
