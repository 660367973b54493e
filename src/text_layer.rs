//! Page text for digital PDFs.
//!
//! Several extractors are tried per page and the candidate that looks most
//! like tabular text wins; `pdf-extract` keeps column spacing better, while
//! walking the content stream survives fonts it cannot decode.

use std::collections::BTreeMap;
use std::path::Path;

use encoding_rs::{BIG5, UTF_16BE};
use lopdf::content::Content;
use lopdf::{Document, Object, ObjectId};
use tracing::{debug, warn};

use crate::error::ExtractError;
use crate::model::PageText;
use crate::options::PageSelection;
use crate::table_parse::{soft_split_line_into_cells, split_line_into_cells};

const FORM_FEED: char = '\u{000C}';

/// Below this score the first page also considers the whole-document text.
const WEAK_PAGE_SCORE: i64 = 80;

#[derive(Debug, Clone, Copy)]
pub enum PdfSource<'a> {
    Path(&'a Path),
    Bytes(&'a [u8]),
}

impl PdfSource<'_> {
    fn load(self) -> Result<Document, ExtractError> {
        Ok(match self {
            Self::Path(path) => Document::load(path)?,
            Self::Bytes(bytes) => Document::load_mem(bytes)?,
        })
    }

    fn extract_all_text(self) -> Result<String, ExtractError> {
        let result = match self {
            Self::Path(path) => pdf_extract::extract_text(path),
            Self::Bytes(bytes) => pdf_extract::extract_text_from_mem(bytes),
        };
        result.map_err(|error| ExtractError::PdfExtract(error.to_string()))
    }
}

fn split_text_into_pages(raw_text: &str) -> Vec<String> {
    let mut pages = raw_text
        .split(FORM_FEED)
        .map(str::to_string)
        .collect::<Vec<_>>();
    if pages.last().is_some_and(String::is_empty) {
        pages.pop();
    }
    pages
}

fn looks_decoding_broken(text: &str) -> bool {
    if text.contains("?Identity-H Unimplemented?") {
        return true;
    }

    let total = text.chars().count();
    if total == 0 {
        return false;
    }

    let replacement = text.matches('\u{FFFD}').count();
    let control = text
        .chars()
        .filter(|ch| ch.is_control() && !matches!(*ch, '\n' | '\r' | '\t' | FORM_FEED))
        .count();

    replacement * 8 > total || control * 5 > total
}

fn decode_pdf_bytes(encoding: Option<&str>, bytes: &[u8]) -> String {
    let decoded = Document::decode_text(encoding, bytes);
    if !looks_decoding_broken(&decoded) {
        return decoded;
    }

    let utf16_hint = bytes.starts_with(&[0xFE, 0xFF])
        || encoding.is_some_and(|name| {
            let lower = name.to_ascii_lowercase();
            ["utf16", "ucs2", "identity-h", "unicode"]
                .iter()
                .any(|hint| lower.contains(hint))
        });
    if utf16_hint {
        let payload = bytes.strip_prefix(&[0xFE, 0xFF]).unwrap_or(bytes);
        let (utf16, had_errors) = UTF_16BE.decode_without_bom_handling(payload);
        if !had_errors && !utf16.is_empty() {
            return utf16.into_owned();
        }
    }

    if encoding.is_some_and(|name| {
        let lower = name.to_ascii_lowercase();
        lower.contains("big5") || lower.contains("b5")
    }) {
        let (big5, _, had_errors) = BIG5.decode(bytes);
        if !had_errors && !big5.is_empty() {
            return big5.into_owned();
        }
    }

    String::from_utf8_lossy(bytes).into_owned()
}

/// Higher for text whose lines split into several cells.
pub(crate) fn tabular_score(text: &str) -> i64 {
    if text.trim().is_empty() {
        return i64::MIN / 4;
    }

    let mut non_empty_lines = 0_i64;
    let mut multi_cell_lines = 0_i64;
    let mut numeric_lines = 0_i64;

    for line in text.lines().map(str::trim).filter(|line| !line.is_empty()) {
        non_empty_lines += 1;
        if split_line_into_cells(line).len() >= 2 || soft_split_line_into_cells(line).len() >= 3 {
            multi_cell_lines += 1;
        }
        if line.chars().any(|ch| ch.is_ascii_digit()) {
            numeric_lines += 1;
        }
    }

    let broken_penalty = if looks_decoding_broken(text) { 800 } else { 0 };
    multi_cell_lines * 50 + numeric_lines * 15 + non_empty_lines - broken_penalty
}

fn content_stream_text(document: &Document, page_id: ObjectId) -> Option<String> {
    fn collect_text(text: &mut String, encoding: Option<&str>, operands: &[Object]) {
        for operand in operands {
            match operand {
                Object::String(bytes, _) => text.push_str(&decode_pdf_bytes(encoding, bytes)),
                Object::Array(items) => {
                    collect_text(text, encoding, items);
                    text.push(' ');
                }
                // Large negative kerning in a TJ array is a visual gap.
                Object::Integer(value) if *value < -100 => text.push(' '),
                _ => {}
            }
        }
    }

    let raw_content = document.get_page_content(page_id).ok()?;
    let content = Content::decode(&raw_content).ok()?;
    let encodings = document
        .get_page_fonts(page_id)
        .into_iter()
        .map(|(name, font)| (name, font.get_font_encoding()))
        .collect::<BTreeMap<Vec<u8>, &str>>();

    let mut lines = Vec::new();
    let mut current = String::new();
    let mut current_encoding = None;
    for operation in content.operations {
        match operation.operator.as_str() {
            "Tf" => {
                current_encoding = operation
                    .operands
                    .first()
                    .and_then(|operand| operand.as_name().ok())
                    .and_then(|font_name| encodings.get(font_name).copied());
            }
            "Tj" | "TJ" | "'" | "\"" => {
                collect_text(&mut current, current_encoding, &operation.operands);
            }
            "T*" | "Td" | "TD" | "ET" if !current.trim().is_empty() => {
                lines.push(std::mem::take(&mut current));
            }
            _ => {}
        }
    }

    if !current.trim().is_empty() {
        lines.push(current);
    }

    (!lines.is_empty()).then(|| lines.join("\n"))
}

/// Number of pages in the document.
pub fn page_count(source: PdfSource<'_>) -> Result<usize, ExtractError> {
    Ok(source.load()?.get_pages().len())
}

/// Reads the text layer of every selected page.
pub fn read_pdf_pages(
    source: PdfSource<'_>,
    page_selection: Option<&PageSelection>,
) -> Result<Vec<PageText>, ExtractError> {
    let document = source.load()?;
    let pages_map = document.get_pages();

    let (per_page, whole_document) = match source.extract_all_text() {
        Ok(text) => {
            let pages = split_text_into_pages(&text);
            if pages.len() == pages_map.len() {
                (Some(pages), None)
            } else {
                debug!(
                    split = pages.len(),
                    expected = pages_map.len(),
                    "pdf-extract page split does not match page tree"
                );
                (None, Some(text))
            }
        }
        Err(error) => {
            warn!(%error, "pdf-extract failed; falling back to content streams");
            (None, None)
        }
    };

    let mut pages = Vec::new();
    for (index, (&page_no, &page_id)) in pages_map.iter().enumerate() {
        if page_selection.is_some_and(|selection| !selection.contains(page_no)) {
            continue;
        }

        let mut candidates = Vec::new();
        if let Some(text) = per_page
            .as_ref()
            .and_then(|texts| texts.get(index))
            .filter(|text| !text.trim().is_empty())
        {
            candidates.push(text.clone());
        }
        if let Some(text) = content_stream_text(&document, page_id) {
            candidates.push(text);
        }
        if let Some(text) = document
            .extract_text(&[page_no])
            .ok()
            .filter(|text| !text.trim().is_empty())
        {
            candidates.push(text);
        }

        let best_score = candidates
            .iter()
            .map(|text| tabular_score(text))
            .max()
            .unwrap_or(i64::MIN / 4);
        if index == 0
            && best_score < WEAK_PAGE_SCORE
            && let Some(text) = whole_document.as_ref().filter(|text| !text.trim().is_empty())
        {
            candidates.push(text.clone());
        }

        let text = candidates
            .into_iter()
            .max_by_key(|text| tabular_score(text))
            .unwrap_or_default();

        pages.push(PageText {
            page_number: page_no,
            text,
        });
    }

    if pages.is_empty() {
        return Err(ExtractError::NoPagesSelected);
    }

    Ok(pages)
}
