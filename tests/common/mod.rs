#![allow(dead_code)]

use std::path::{Path, PathBuf};

use lopdf::content::{Content, Operation};
use lopdf::{Document, Object, Stream, dictionary};
use pdf_data_extractor::ExtractError;
use pdf_data_extractor::ocr::OcrEngine;
use pdf_data_extractor::render::PageRenderer;
use pdf_data_extractor::token::Token;

/// Writes a Courier text PDF with one page per entry, one text line per string.
pub fn create_text_pdf(path: &Path, pages: &[Vec<&str>]) -> Result<(), Box<dyn std::error::Error>> {
    let mut doc = Document::with_version("1.5");

    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Courier",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! { "F1" => font_id },
    });

    let mut page_ids = Vec::with_capacity(pages.len());
    for lines in pages {
        let mut operations = vec![
            Operation::new("BT", vec![]),
            Operation::new("Tf", vec!["F1".into(), 12.into()]),
            Operation::new("TL", vec![16.into()]),
            Operation::new("Td", vec![50.into(), 780.into()]),
        ];
        for (index, line) in lines.iter().enumerate() {
            if index > 0 {
                operations.push(Operation::new("T*", vec![]));
            }
            operations.push(Operation::new("Tj", vec![Object::string_literal(*line)]));
        }
        operations.push(Operation::new("ET", vec![]));

        let content = Content { operations };
        let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode()?));
        page_ids.push(doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
        }));
    }

    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => page_ids.iter().map(|id| (*id).into()).collect::<Vec<_>>(),
            "Count" => i64::try_from(page_ids.len())?,
            "Resources" => resources_id,
            "MediaBox" => vec![0.into(), 0.into(), 595.into(), 842.into()],
        }),
    );

    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);
    doc.compress();

    doc.save(path)?;
    Ok(())
}

/// Blank pages standing in for a scanned document; content comes from [`ScriptedOcr`].
pub fn create_blank_pdf(path: &Path, page_count: usize) -> Result<(), Box<dyn std::error::Error>> {
    let pages = vec![Vec::new(); page_count];
    create_text_pdf(path, &pages)
}

/// Writes `page-<n>.img` files containing the page number instead of pixels.
pub struct PageNumberRenderer;

impl PageRenderer for PageNumberRenderer {
    fn dpi(&self) -> u32 {
        300
    }

    fn render_page(&self, _pdf: &Path, page: u32, out_dir: &Path) -> Result<PathBuf, ExtractError> {
        let image = out_dir.join(format!("page-{page}.img"));
        std::fs::write(&image, page.to_string())?;
        Ok(image)
    }
}

/// Returns preset tokens for the page number stored in the image file.
pub struct ScriptedOcr {
    pub pages: Vec<Vec<Token>>,
}

impl ScriptedOcr {
    fn page_tokens(&self, image: &Path) -> Result<&[Token], ExtractError> {
        let page = std::fs::read_to_string(image)?
            .trim()
            .parse::<usize>()
            .map_err(|error| ExtractError::OcrOutput(error.to_string()))?;
        Ok(page
            .checked_sub(1)
            .and_then(|index| self.pages.get(index))
            .map(Vec::as_slice)
            .unwrap_or_default())
    }
}

impl OcrEngine for ScriptedOcr {
    fn recognize_words(&self, image: &Path) -> Result<Vec<Token>, ExtractError> {
        Ok(self.page_tokens(image)?.to_vec())
    }

    fn recognize_text(&self, image: &Path) -> Result<String, ExtractError> {
        let words = self
            .page_tokens(image)?
            .iter()
            .map(|token| token.text.as_str())
            .collect::<Vec<_>>();
        Ok(words.join(" "))
    }
}

pub fn word(text: &str, left: f64, top: f64) -> Token {
    Token::new(text, left, top, 40.0, 18.0)
}
