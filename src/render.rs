use std::path::{Path, PathBuf};
use std::process::Command;

use tracing::debug;

use crate::error::ExtractError;

/// Rasterizes single PDF pages to image files.
pub trait PageRenderer: Sync {
    /// Resolution of the produced images; bucket sizes are tuned against it.
    fn dpi(&self) -> u32;

    /// Renders 1-based `page` of `pdf` into `out_dir`, returning the image path.
    fn render_page(&self, pdf: &Path, page: u32, out_dir: &Path) -> Result<PathBuf, ExtractError>;
}

/// Renders through poppler's `pdftoppm`.
#[derive(Debug, Clone)]
pub struct PdftoppmRenderer {
    binary: PathBuf,
    dpi: u32,
}

impl PdftoppmRenderer {
    #[must_use]
    pub fn new(binary: impl Into<PathBuf>, dpi: u32) -> Self {
        Self {
            binary: binary.into(),
            dpi,
        }
    }
}

impl PageRenderer for PdftoppmRenderer {
    fn dpi(&self) -> u32 {
        self.dpi
    }

    fn render_page(&self, pdf: &Path, page: u32, out_dir: &Path) -> Result<PathBuf, ExtractError> {
        let tool = self.binary.display().to_string();
        let prefix = out_dir.join(format!("page-{page}"));
        let output = Command::new(&self.binary)
            .arg("-png")
            .arg("-r")
            .arg(self.dpi.to_string())
            .arg("-f")
            .arg(page.to_string())
            .arg("-l")
            .arg(page.to_string())
            .arg("-singlefile")
            .arg(pdf)
            .arg(&prefix)
            .output()
            .map_err(|error| {
                ExtractError::tool(&tool, format!("failed to start (is it installed?): {error}"))
            })?;

        if !output.status.success() {
            return Err(ExtractError::tool(
                &tool,
                format!(
                    "page {page}: {}",
                    String::from_utf8_lossy(&output.stderr).trim()
                ),
            ));
        }

        let image = prefix.with_extension("png");
        if !image.is_file() {
            return Err(ExtractError::tool(
                &tool,
                format!("page {page}: no image written to {}", image.display()),
            ));
        }

        debug!(page, dpi = self.dpi, image = %image.display(), "rendered page");
        Ok(image)
    }
}
