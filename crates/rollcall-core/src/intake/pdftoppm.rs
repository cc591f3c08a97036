use crate::error::RollcallError;
use crate::intake::{PageRasterizer, SheetFile};
use std::io::Write;
use std::path::Path;
use std::process::Command;

/// PDF rasterization backend using pdftoppm (from poppler-utils).
///
/// Renders each page to a JPEG at `dpi`.
pub struct PdftoppmRasterizer {
    pub dpi: u32,
}

impl PdftoppmRasterizer {
    pub fn new(dpi: u32) -> Self {
        PdftoppmRasterizer { dpi }
    }

    /// Check if pdftoppm is available on the system.
    pub fn is_available() -> bool {
        Command::new("pdftoppm")
            .arg("-v")
            .output()
            .map(|o| o.status.success() || !o.stderr.is_empty())
            .unwrap_or(false)
    }
}

impl Default for PdftoppmRasterizer {
    fn default() -> Self {
        Self::new(144)
    }
}

impl PageRasterizer for PdftoppmRasterizer {
    fn rasterize(&self, pdf: &SheetFile) -> Result<Vec<SheetFile>, RollcallError> {
        let mut tmpfile =
            tempfile::NamedTempFile::new().map_err(|e| RollcallError::Rasterize(e.to_string()))?;
        tmpfile
            .write_all(&pdf.bytes)
            .map_err(|e| RollcallError::Rasterize(e.to_string()))?;
        let out_dir = tempfile::tempdir().map_err(|e| RollcallError::Rasterize(e.to_string()))?;
        let prefix = out_dir.path().join("page");

        let output = Command::new("pdftoppm")
            .arg("-jpeg")
            .arg("-r")
            .arg(self.dpi.to_string())
            .arg(tmpfile.path())
            .arg(&prefix)
            .output()
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    RollcallError::PdftoppmNotFound
                } else {
                    RollcallError::Rasterize(format!("pdftoppm failed: {}", e))
                }
            })?;

        if !output.status.success() {
            let code = output.status.code().unwrap_or(-1);
            let stderr = String::from_utf8_lossy(&output.stderr).to_string();
            return Err(RollcallError::PdftoppmFailed { code, stderr });
        }

        let mut rendered = collect_pages(out_dir.path())?;
        if rendered.is_empty() {
            return Err(RollcallError::EmptyPdf);
        }
        rendered.sort_by_key(|(n, _)| *n);

        let stem = pdf.stem();
        let mut pages = Vec::with_capacity(rendered.len());
        for (page_number, path) in rendered {
            let bytes = std::fs::read(&path)?;
            tracing::debug!(page = page_number, bytes = bytes.len(), "rendered page");
            pages.push(SheetFile::new(
                format!("{stem}_page_{page_number}.jpg"),
                "image/jpeg",
                bytes,
            ));
        }

        Ok(pages)
    }

    fn backend_name(&self) -> &str {
        "pdftoppm"
    }
}

/// pdftoppm names its output `page-1.jpg`, or `page-01.jpg` once the
/// document has ten or more pages.
fn collect_pages(dir: &Path) -> Result<Vec<(usize, std::path::PathBuf)>, RollcallError> {
    let mut out = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        let Some(name) = path.file_name().map(|n| n.to_string_lossy().into_owned()) else {
            continue;
        };
        if let Some(n) = page_number_from_name(&name) {
            out.push((n, path));
        }
    }
    Ok(out)
}

fn page_number_from_name(name: &str) -> Option<usize> {
    let base = name.strip_suffix(".jpg")?;
    let (_, digits) = base.rsplit_once('-')?;
    digits.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_padded_and_unpadded_page_numbers() {
        assert_eq!(page_number_from_name("page-1.jpg"), Some(1));
        assert_eq!(page_number_from_name("page-07.jpg"), Some(7));
        assert_eq!(page_number_from_name("page-12.jpg"), Some(12));
        assert_eq!(page_number_from_name("page.ppm"), None);
    }

    #[test]
    fn collects_and_orders_rendered_files() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["page-10.jpg", "page-02.jpg", "page-01.jpg", "stray.txt"] {
            std::fs::write(dir.path().join(name), b"x").unwrap();
        }
        let mut pages = collect_pages(dir.path()).unwrap();
        pages.sort_by_key(|(n, _)| *n);
        let numbers: Vec<_> = pages.iter().map(|(n, _)| *n).collect();
        assert_eq!(numbers, [1, 2, 10]);
    }
}
