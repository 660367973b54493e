use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use tracing::{info, warn};

use crate::error::ExtractError;

const TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S";

#[must_use]
pub fn timestamp(now: DateTime<Local>) -> String {
    now.format(TIMESTAMP_FORMAT).to_string()
}

#[must_use]
pub fn timestamp_now() -> String {
    timestamp(Local::now())
}

/// PDF files directly inside `folder`, sorted by path.
pub fn list_pdf_files(folder: &Path) -> Result<Vec<PathBuf>, ExtractError> {
    let mut files = fs::read_dir(folder)?
        .filter_map(Result::ok)
        .map(|entry| entry.path())
        .filter(|path| {
            path.is_file()
                && path
                    .extension()
                    .and_then(|ext| ext.to_str())
                    .is_some_and(|ext| ext.eq_ignore_ascii_case("pdf"))
        })
        .collect::<Vec<_>>();
    files.sort();
    Ok(files)
}

/// `<output_dir>/<stem><suffix>_<timestamp>`, extension left to the caller.
#[must_use]
pub fn output_stem(output_dir: &Path, pdf: &Path, suffix: &str, timestamp: &str) -> PathBuf {
    let stem = pdf
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_else(|| "document".to_string());
    output_dir.join(format!("{stem}{suffix}_{timestamp}"))
}

/// Moves `pdf` into `processed_dir`. Failures are logged and reported as `None`.
pub fn move_processed(pdf: &Path, processed_dir: &Path) -> Option<PathBuf> {
    let file_name = pdf.file_name()?;
    let dest = processed_dir.join(file_name);
    let moved = fs::create_dir_all(processed_dir).and_then(|()| fs::rename(pdf, &dest));
    match moved {
        Ok(()) => {
            info!(from = %pdf.display(), to = %dest.display(), "moved processed PDF");
            Some(dest)
        }
        Err(error) => {
            warn!(pdf = %pdf.display(), %error, "could not move processed PDF");
            None
        }
    }
}
