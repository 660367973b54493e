//! OCR collaborator: image in, positioned words out.

use std::path::{Path, PathBuf};
use std::process::Command;

use csv::ReaderBuilder;
use serde::Deserialize;
use tracing::debug;

use crate::error::ExtractError;
use crate::token::{RawToken, Token};

/// Tesseract's `level` value for word boxes.
const WORD_LEVEL: u8 = 5;

/// Recognizes text on a rendered page image.
///
/// Token coordinates are expected in the image's pixel space.
pub trait OcrEngine: Sync {
    fn recognize_words(&self, image: &Path) -> Result<Vec<Token>, ExtractError>;

    fn recognize_text(&self, image: &Path) -> Result<String, ExtractError>;
}

#[derive(Debug, Clone)]
pub struct TesseractOcr {
    binary: PathBuf,
    language: String,
}

impl TesseractOcr {
    #[must_use]
    pub fn new(binary: impl Into<PathBuf>, language: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
            language: language.into(),
        }
    }

    fn run(&self, image: &Path, extra_args: &[&str]) -> Result<String, ExtractError> {
        let tool = self.binary.display().to_string();
        let output = Command::new(&self.binary)
            .arg(image)
            .arg("stdout")
            .arg("-l")
            .arg(&self.language)
            .args(extra_args)
            .output()
            .map_err(|error| {
                ExtractError::tool(&tool, format!("failed to start (is it installed?): {error}"))
            })?;

        if !output.status.success() {
            return Err(ExtractError::tool(
                &tool,
                format!(
                    "exit code {}: {}",
                    output.status.code().unwrap_or(-1),
                    String::from_utf8_lossy(&output.stderr).trim()
                ),
            ));
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

impl OcrEngine for TesseractOcr {
    fn recognize_words(&self, image: &Path) -> Result<Vec<Token>, ExtractError> {
        let tsv = self.run(image, &["tsv"])?;
        let tokens = parse_tesseract_tsv(&tsv)?;
        debug!(image = %image.display(), words = tokens.len(), "tesseract finished");
        Ok(tokens)
    }

    fn recognize_text(&self, image: &Path) -> Result<String, ExtractError> {
        self.run(image, &[])
    }
}

#[derive(Debug, Deserialize)]
struct TsvRow {
    #[serde(default)]
    level: Option<u8>,
    #[serde(default)]
    left: Option<f64>,
    #[serde(default)]
    top: Option<f64>,
    #[serde(default)]
    width: Option<f64>,
    #[serde(default)]
    height: Option<f64>,
    #[serde(default)]
    text: Option<String>,
}

/// Parses Tesseract `tsv` output into word tokens.
///
/// Page, block, paragraph and line summary rows are skipped; word rows with a
/// missing coordinate fail with the row's position among the word rows.
pub fn parse_tesseract_tsv(tsv: &str) -> Result<Vec<Token>, ExtractError> {
    let mut reader = ReaderBuilder::new()
        .delimiter(b'\t')
        .quoting(false)
        .flexible(true)
        .from_reader(tsv.as_bytes());

    let headers = reader.headers()?.clone();
    if !headers.iter().any(|name| name == "text") {
        return Err(ExtractError::OcrOutput(
            "TSV header does not contain a 'text' column".to_string(),
        ));
    }

    let mut tokens = Vec::new();
    for record in reader.deserialize::<TsvRow>() {
        let row = record?;
        if row.level.is_some_and(|level| level != WORD_LEVEL) {
            continue;
        }
        let raw = RawToken {
            text: row.text,
            left: row.left,
            top: row.top,
            width: row.width,
            height: row.height,
        };
        tokens.push(raw.validate(tokens.len())?);
    }

    Ok(tokens)
}
