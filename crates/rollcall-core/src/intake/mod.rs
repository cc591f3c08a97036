pub mod pdftoppm;

use std::path::Path;

use crate::error::RollcallError;

/// Image MIME types the model accepts for sheet analysis.
pub const ALLOWED_IMAGE_TYPES: &[&str] = &["image/jpeg", "image/jpg", "image/png", "image/webp"];

pub const PDF_MIME: &str = "application/pdf";

/// An uploaded sheet: an image, or a PDF that still has to be rasterized.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SheetFile {
    pub name: String,
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

impl SheetFile {
    pub fn new(name: impl Into<String>, mime_type: impl Into<String>, bytes: Vec<u8>) -> Self {
        SheetFile {
            name: name.into(),
            mime_type: mime_type.into(),
            bytes,
        }
    }

    /// Read a file from disk, inferring its MIME type from the extension
    /// and falling back to the leading bytes.
    pub fn from_path(path: &Path) -> Result<SheetFile, RollcallError> {
        let bytes = std::fs::read(path)?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        let mime_type = path
            .extension()
            .and_then(|ext| mime_from_extension(&ext.to_string_lossy()))
            .or_else(|| sniff_mime(&bytes))
            .unwrap_or("application/octet-stream");
        Ok(SheetFile::new(name, mime_type, bytes))
    }

    pub fn size(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_pdf(&self) -> bool {
        self.mime_type == PDF_MIME
    }

    /// File name without its final extension.
    pub fn stem(&self) -> &str {
        match self.name.rfind('.') {
            Some(idx) if idx > 0 => &self.name[..idx],
            _ => &self.name,
        }
    }
}

/// Trait for PDF rasterization backends.
pub trait PageRasterizer: Send + Sync {
    /// Render every page of a PDF into an image, in page order.
    fn rasterize(&self, pdf: &SheetFile) -> Result<Vec<SheetFile>, RollcallError>;

    /// Name of this rasterization backend (for diagnostics).
    fn backend_name(&self) -> &str;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SizeLimits {
    pub max_image_bytes: usize,
    pub max_pdf_bytes: usize,
}

impl Default for SizeLimits {
    fn default() -> Self {
        SizeLimits {
            max_image_bytes: 5 * 1024 * 1024,
            max_pdf_bytes: 50 * 1024 * 1024,
        }
    }
}

pub fn mime_from_extension(ext: &str) -> Option<&'static str> {
    match ext.to_ascii_lowercase().as_str() {
        "jpg" | "jpeg" => Some("image/jpeg"),
        "png" => Some("image/png"),
        "webp" => Some("image/webp"),
        "pdf" => Some(PDF_MIME),
        _ => None,
    }
}

/// Detect the MIME type from magic bytes.
pub fn sniff_mime(bytes: &[u8]) -> Option<&'static str> {
    if bytes.starts_with(b"%PDF") {
        Some(PDF_MIME)
    } else if bytes.starts_with(&[0xFF, 0xD8, 0xFF]) {
        Some("image/jpeg")
    } else if bytes.starts_with(&[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A]) {
        Some("image/png")
    } else if bytes.len() >= 12 && &bytes[..4] == b"RIFF" && &bytes[8..12] == b"WEBP" {
        Some("image/webp")
    } else {
        None
    }
}

pub fn validate_image(file: &SheetFile, max_bytes: usize) -> Result<(), RollcallError> {
    if file.bytes.is_empty() {
        return Err(RollcallError::NoFile);
    }
    if !ALLOWED_IMAGE_TYPES.contains(&file.mime_type.as_str()) {
        return Err(RollcallError::InvalidFileType(file.mime_type.clone()));
    }
    check_size(file, max_bytes)
}

pub fn validate_pdf(file: &SheetFile, max_bytes: usize) -> Result<(), RollcallError> {
    if file.bytes.is_empty() {
        return Err(RollcallError::NoFile);
    }
    if !file.is_pdf() {
        return Err(RollcallError::InvalidFileType(file.mime_type.clone()));
    }
    check_size(file, max_bytes)
}

fn check_size(file: &SheetFile, max_bytes: usize) -> Result<(), RollcallError> {
    if file.size() > max_bytes {
        return Err(RollcallError::FileTooLarge {
            size: format_bytes(file.size() as u64),
            limit: format_bytes(max_bytes as u64),
        });
    }
    Ok(())
}

/// Result of expanding a batch of uploads into page images.
#[derive(Debug, Default)]
pub struct ExpandedInputs {
    pub pages: Vec<SheetFile>,
    /// Inputs that could not be turned into pages, with the reason.
    pub rejected: Vec<(String, RollcallError)>,
}

/// Validate every input and rasterize PDFs into one image per page.
pub fn expand_inputs(
    files: Vec<SheetFile>,
    rasterizer: &dyn PageRasterizer,
    limits: SizeLimits,
) -> ExpandedInputs {
    let mut out = ExpandedInputs::default();

    for file in files {
        if file.is_pdf() {
            let pages = validate_pdf(&file, limits.max_pdf_bytes)
                .and_then(|_| rasterizer.rasterize(&file));
            match pages {
                Ok(pages) => {
                    tracing::info!(
                        file = %file.name,
                        pages = pages.len(),
                        backend = rasterizer.backend_name(),
                        "expanded PDF into page images"
                    );
                    out.pages.extend(pages);
                }
                Err(e) => out.rejected.push((file.name, e)),
            }
        } else {
            match validate_image(&file, limits.max_image_bytes) {
                Ok(()) => out.pages.push(file),
                Err(e) => out.rejected.push((file.name, e)),
            }
        }
    }

    out
}

/// Human-readable byte count, e.g. "1.5 MB".
pub fn format_bytes(bytes: u64) -> String {
    if bytes == 0 {
        return "0 Bytes".into();
    }
    const SIZES: [&str; 4] = ["Bytes", "KB", "MB", "GB"];
    let mut value = bytes as f64;
    let mut idx = 0;
    while value >= 1024.0 && idx < SIZES.len() - 1 {
        value /= 1024.0;
        idx += 1;
    }
    let rounded = (value * 100.0).round() / 100.0;
    format!("{rounded} {}", SIZES[idx])
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedPages(usize);

    impl PageRasterizer for FixedPages {
        fn rasterize(&self, pdf: &SheetFile) -> Result<Vec<SheetFile>, RollcallError> {
            Ok((1..=self.0)
                .map(|n| {
                    SheetFile::new(
                        format!("{}_page_{n}.jpg", pdf.stem()),
                        "image/jpeg",
                        vec![0xFF, 0xD8, 0xFF],
                    )
                })
                .collect())
        }

        fn backend_name(&self) -> &str {
            "fixed"
        }
    }

    #[test]
    fn sniffs_common_signatures() {
        assert_eq!(sniff_mime(b"%PDF-1.7"), Some(PDF_MIME));
        assert_eq!(sniff_mime(&[0xFF, 0xD8, 0xFF, 0xE0]), Some("image/jpeg"));
        assert_eq!(sniff_mime(b"RIFF\0\0\0\0WEBPVP8 "), Some("image/webp"));
        assert_eq!(sniff_mime(b"hello"), None);
    }

    #[test]
    fn rejects_unsupported_image_type() {
        let gif = SheetFile::new("sheet.gif", "image/gif", vec![1, 2, 3]);
        assert!(matches!(
            validate_image(&gif, 1024),
            Err(RollcallError::InvalidFileType(_))
        ));
    }

    #[test]
    fn rejects_oversized_image() {
        let big = SheetFile::new("sheet.jpg", "image/jpeg", vec![0; 2048]);
        let err = validate_image(&big, 1024).unwrap_err();
        match err {
            RollcallError::FileTooLarge { size, limit } => {
                assert_eq!(size, "2 KB");
                assert_eq!(limit, "1 KB");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn rejects_empty_file() {
        let empty = SheetFile::new("sheet.png", "image/png", vec![]);
        assert!(matches!(validate_image(&empty, 1024), Err(RollcallError::NoFile)));
    }

    #[test]
    fn format_bytes_rounds_to_two_decimals() {
        assert_eq!(format_bytes(0), "0 Bytes");
        assert_eq!(format_bytes(1536), "1.5 KB");
        assert_eq!(format_bytes(5 * 1024 * 1024), "5 MB");
    }

    #[test]
    fn stem_strips_last_extension() {
        let f = SheetFile::new("week.2.pdf", PDF_MIME, vec![]);
        assert_eq!(f.stem(), "week.2");
    }

    #[test]
    fn expand_inputs_splits_pdfs_and_keeps_images() {
        let files = vec![
            SheetFile::new("a.jpg", "image/jpeg", vec![0xFF, 0xD8, 0xFF]),
            SheetFile::new("packet.pdf", PDF_MIME, b"%PDF-1.4".to_vec()),
            SheetFile::new("notes.txt", "text/plain", b"hi".to_vec()),
        ];
        let out = expand_inputs(files, &FixedPages(2), SizeLimits::default());

        let names: Vec<_> = out.pages.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, ["a.jpg", "packet_page_1.jpg", "packet_page_2.jpg"]);
        assert_eq!(out.rejected.len(), 1);
        assert_eq!(out.rejected[0].0, "notes.txt");
    }
}
