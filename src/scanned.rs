//! Scanned-PDF pipeline: render each page, OCR it, cluster the words.
//!
//! Pages are independent, so they run in parallel; each worker owns its image
//! and token list and the clusterer is `Copy`.

use std::fs;
use std::path::Path;

use rayon::prelude::*;
use tracing::{debug, info};

use crate::cluster::TokenClusterer;
use crate::error::ExtractError;
use crate::model::PageText;
use crate::ocr::OcrEngine;
use crate::options::PageSelection;
use crate::render::PageRenderer;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OcrPageTable {
    pub page: u32,
    pub rows: Vec<Vec<String>>,
}

/// 1-based page numbers of a `page_count`-page document kept by `selection`.
pub fn selected_pages(
    page_count: usize,
    selection: Option<&PageSelection>,
) -> Result<Vec<u32>, ExtractError> {
    let last = u32::try_from(page_count)
        .map_err(|_| ExtractError::InvalidOption(format!("too many pages: {page_count}")))?;
    let pages = (1..=last)
        .filter(|page| selection.is_none_or(|selection| selection.contains(*page)))
        .collect::<Vec<_>>();
    if pages.is_empty() {
        return Err(ExtractError::NoPagesSelected);
    }
    Ok(pages)
}

/// Renders one page, runs `recognize` on the image and deletes the image.
///
/// The image is removed whether or not recognition succeeds, so scratch
/// space holds at most one image per page in flight.
fn recognize_page<T>(
    renderer: &dyn PageRenderer,
    pdf: &Path,
    page: u32,
    workdir: &Path,
    recognize: impl FnOnce(&Path) -> Result<T, ExtractError>,
) -> Result<T, ExtractError> {
    let image = renderer.render_page(pdf, page, workdir)?;
    let result = recognize(&image);
    if let Err(error) = fs::remove_file(&image) {
        debug!(page, image = %image.display(), %error, "could not remove page image");
    }
    result
}

pub fn extract_scanned_tables(
    pdf: &Path,
    pages: &[u32],
    renderer: &dyn PageRenderer,
    ocr: &dyn OcrEngine,
    clusterer: TokenClusterer,
) -> Result<Vec<OcrPageTable>, ExtractError> {
    let workdir = tempfile::tempdir()?;
    info!(
        pdf = %pdf.display(),
        pages = pages.len(),
        dpi = renderer.dpi(),
        bucket_size = clusterer.bucket_size(),
        "running OCR table extraction"
    );

    pages
        .par_iter()
        .map(|&page| -> Result<OcrPageTable, ExtractError> {
            let tokens = recognize_page(renderer, pdf, page, workdir.path(), |image| {
                ocr.recognize_words(image)
            })?;
            let rows = clusterer.cluster(&tokens);
            debug!(page, words = tokens.len(), rows = rows.len(), "page clustered");
            Ok(OcrPageTable { page, rows })
        })
        .collect()
}

pub fn ocr_page_texts(
    pdf: &Path,
    pages: &[u32],
    renderer: &dyn PageRenderer,
    ocr: &dyn OcrEngine,
) -> Result<Vec<PageText>, ExtractError> {
    let workdir = tempfile::tempdir()?;
    pages
        .par_iter()
        .map(|&page| -> Result<PageText, ExtractError> {
            Ok(PageText {
                page_number: page,
                text: recognize_page(renderer, pdf, page, workdir.path(), |image| {
                    ocr.recognize_text(image)
                })?,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use std::path::{Path, PathBuf};

    use tempfile::tempdir;

    use super::{extract_scanned_tables, ocr_page_texts, recognize_page, selected_pages};
    use crate::cluster::TokenClusterer;
    use crate::error::ExtractError;
    use crate::ocr::OcrEngine;
    use crate::options::PageSelection;
    use crate::render::PageRenderer;
    use crate::token::Token;

    struct NamingRenderer;

    impl PageRenderer for NamingRenderer {
        fn dpi(&self) -> u32 {
            300
        }

        fn render_page(
            &self,
            _pdf: &Path,
            page: u32,
            out_dir: &Path,
        ) -> Result<PathBuf, ExtractError> {
            Ok(out_dir.join(format!("page-{page}.png")))
        }
    }

    /// Emits the page number as words laid out on two rows.
    struct PageEchoOcr;

    impl PageEchoOcr {
        fn page_of(image: &Path) -> String {
            image
                .file_stem()
                .and_then(|stem| stem.to_str())
                .and_then(|stem| stem.strip_prefix("page-"))
                .unwrap_or("?")
                .to_string()
        }
    }

    impl OcrEngine for PageEchoOcr {
        fn recognize_words(&self, image: &Path) -> Result<Vec<Token>, ExtractError> {
            let page = Self::page_of(image);
            if page == "3" {
                return Err(ExtractError::OcrOutput("unreadable page".to_string()));
            }
            Ok(vec![
                Token::new(format!("p{page}b"), 200.0, 40.0, 10.0, 10.0),
                Token::new("head", 10.0, 2.0, 10.0, 10.0),
                Token::new(format!("p{page}a"), 10.0, 41.0, 10.0, 10.0),
            ])
        }

        fn recognize_text(&self, image: &Path) -> Result<String, ExtractError> {
            Ok(format!("text of page {}", Self::page_of(image)))
        }
    }

    #[test]
    fn clusters_every_page_in_order() {
        let tables = extract_scanned_tables(
            Path::new("scan.pdf"),
            &[1, 2],
            &NamingRenderer,
            &PageEchoOcr,
            TokenClusterer::default(),
        )
        .expect("pages should cluster");

        assert_eq!(tables.len(), 2);
        assert_eq!(tables[1].page, 2);
        assert_eq!(tables[1].rows, vec![vec!["head"], vec!["p2a", "p2b"]]);
    }

    #[test]
    fn ocr_failure_fails_the_document() {
        let err = extract_scanned_tables(
            Path::new("scan.pdf"),
            &[1, 3],
            &NamingRenderer,
            &PageEchoOcr,
            TokenClusterer::default(),
        )
        .expect_err("page 3 fails");
        assert!(matches!(err, ExtractError::OcrOutput(_)));
    }

    #[test]
    fn page_texts_follow_page_order() {
        let pages = ocr_page_texts(Path::new("scan.pdf"), &[2, 1], &NamingRenderer, &PageEchoOcr)
            .expect("text OCR");
        assert_eq!(pages[0].page_number, 2);
        assert_eq!(pages[1].text, "text of page 1");
    }

    /// Writes a real placeholder file per page.
    struct FileRenderer;

    impl PageRenderer for FileRenderer {
        fn dpi(&self) -> u32 {
            300
        }

        fn render_page(
            &self,
            _pdf: &Path,
            page: u32,
            out_dir: &Path,
        ) -> Result<PathBuf, ExtractError> {
            let image = out_dir.join(format!("page-{page}.png"));
            std::fs::write(&image, b"png")?;
            Ok(image)
        }
    }

    fn dir_is_empty(dir: &Path) -> bool {
        std::fs::read_dir(dir)
            .expect("scratch dir should be readable")
            .next()
            .is_none()
    }

    #[test]
    fn page_image_is_removed_after_recognition() {
        let scratch = tempdir().expect("tempdir should be created");

        let words = recognize_page(&FileRenderer, Path::new("scan.pdf"), 4, scratch.path(), |image| {
            assert!(image.is_file());
            Ok(vec![Token::new("x", 0.0, 0.0, 1.0, 1.0)])
        })
        .expect("recognition should succeed");
        assert_eq!(words.len(), 1);
        assert!(dir_is_empty(scratch.path()));

        let err = recognize_page(&FileRenderer, Path::new("scan.pdf"), 5, scratch.path(), |_| {
            Err::<Vec<Token>, _>(ExtractError::OcrOutput("unreadable".to_string()))
        })
        .expect_err("recognition should fail");
        assert!(matches!(err, ExtractError::OcrOutput(_)));
        assert!(dir_is_empty(scratch.path()));
    }

    #[test]
    fn selection_filters_page_numbers() {
        let selection = "2-3,9".parse::<PageSelection>().expect("valid selection");
        assert_eq!(selected_pages(4, Some(&selection)).expect("pages"), vec![2, 3]);
        assert_eq!(selected_pages(2, None).expect("pages"), vec![1, 2]);
        let wide = "3-4000000000".parse::<PageSelection>().expect("valid selection");
        assert_eq!(selected_pages(4, Some(&wide)).expect("pages"), vec![3, 4]);
        assert!(matches!(
            selected_pages(1, Some(&selection)),
            Err(ExtractError::NoPagesSelected)
        ));
    }
}
