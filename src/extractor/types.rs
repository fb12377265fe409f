use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::scanner::ScanOutcome;

/// One section as written to `<output>/<name>.json`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SectionDocument {
    /// Line of the section's opening tag
    pub start_at: usize,
    /// Line of the section's closing tag
    pub end_at: usize,
    /// Extracted data
    pub data: Value,
}

/// Where a written section came from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SectionProvenance {
    /// Section name
    pub name: String,
    /// Line of the opening tag
    pub start_at: usize,
    /// Line of the closing tag
    pub end_at: usize,
}

/// Result of one extraction run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractionSummary {
    /// Save file that was scanned
    pub source: PathBuf,
    /// Directory the sections were written to
    pub output_dir: PathBuf,
    /// Sections written, in closing order
    pub sections: Vec<SectionProvenance>,
    /// Lines read
    pub lines: usize,
    /// Line the scan stopped at
    pub stopped_at: usize,
    /// How the scan ended
    pub outcome: ScanOutcome,
    /// Wall-clock duration in milliseconds
    pub elapsed_ms: u64,
}

impl ExtractionSummary {
    pub fn section_names(&self) -> Vec<String> {
        self.sections.iter().map(|s| s.name.clone()).collect()
    }
}
