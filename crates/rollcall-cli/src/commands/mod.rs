pub mod analyze;
pub mod bulk;
pub mod match_lot;
pub mod status;

use std::path::PathBuf;

use rollcall_core::intake::pdftoppm::PdftoppmRasterizer;
use rollcall_core::intake::{expand_inputs, ExpandedInputs, SheetFile};
use rollcall_core::AnalyzerConfig;

/// Read the given files and turn PDFs into page images.
///
/// Files that cannot be read at all are reported as rejected, the same as
/// files that fail validation.
pub fn load_pages(paths: &[PathBuf], config: &AnalyzerConfig) -> ExpandedInputs {
    let mut files = Vec::new();
    let mut unreadable = Vec::new();
    for path in paths {
        match SheetFile::from_path(path) {
            Ok(file) => files.push(file),
            Err(e) => unreadable.push((path.display().to_string(), e)),
        }
    }

    let rasterizer = PdftoppmRasterizer::new(config.pdf_dpi);
    let mut expanded = expand_inputs(files, &rasterizer, config.limits());
    expanded.rejected.extend(unreadable);
    expanded
}
