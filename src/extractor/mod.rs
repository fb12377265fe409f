pub mod types;
mod extractor;

pub use types::*;
pub use extractor::*;

use std::path::Path;

use anyhow::Result;

use crate::utils::read_json;

/// Path of a section document inside an output directory
pub fn section_path(output_dir: &Path, name: &str) -> std::path::PathBuf {
    output_dir.join(format!("{}.json", name))
}

/// Read a previously written section; `Ok(None)` when it was never written
pub fn read_section(output_dir: &Path, name: &str) -> Result<Option<SectionDocument>> {
    read_json(&section_path(output_dir, name))
}
