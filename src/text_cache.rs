use std::collections::HashMap;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::ExtractError;
use crate::model::PageText;
use crate::text_layer::{PdfSource, read_pdf_pages};

/// Joins page texts with `--- PAGE n ---` separators, skipping blank pages.
#[must_use]
pub fn join_page_texts(pages: &[PageText]) -> String {
    pages
        .iter()
        .filter(|page| !page.text.trim().is_empty())
        .map(|page| format!("\n--- PAGE {} ---\n{}\n", page.page_number, page.text))
        .collect()
}

/// Full-document text memoized per path.
///
/// The cache lives as long as the value the caller holds; nothing is shared
/// between separate caches.
#[derive(Debug, Default)]
pub struct TextCache {
    entries: HashMap<PathBuf, String>,
}

impl TextCache {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the cached text for `path`, loading it with `load` on a miss.
    pub fn get_or_load<F>(&mut self, path: &Path, load: F) -> Result<&str, ExtractError>
    where
        F: FnOnce(&Path) -> Result<String, ExtractError>,
    {
        if !self.entries.contains_key(path) {
            let text = load(path)?;
            debug!(path = %path.display(), chars = text.len(), "cached document text");
            self.entries.insert(path.to_path_buf(), text);
        } else {
            debug!(path = %path.display(), "document text cache hit");
        }
        Ok(self
            .entries
            .get(path)
            .map(String::as_str)
            .unwrap_or_default())
    }

    /// Text-layer text of a digital PDF.
    pub fn full_text(&mut self, path: &Path) -> Result<&str, ExtractError> {
        self.get_or_load(path, |path| {
            let pages = read_pdf_pages(PdfSource::Path(path), None)?;
            Ok(join_page_texts(&pages))
        })
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
