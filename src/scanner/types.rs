use anyhow::Result;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Receives each section as soon as it closes
pub trait SectionSink {
    /// Called once per closed section with its provenance and data
    fn section_closed(&mut self, name: &str, start_at: usize, end_at: usize, data: Value) -> Result<()>;
}

/// A closed section held in memory
#[derive(Debug, Clone, PartialEq)]
pub struct ClosedSection {
    /// Section name
    pub name: String,
    /// Line of the opening tag
    pub start_at: usize,
    /// Line of the closing tag
    pub end_at: usize,
    /// Accumulated data
    pub data: Value,
}

impl SectionSink for Vec<ClosedSection> {
    fn section_closed(&mut self, name: &str, start_at: usize, end_at: usize, data: Value) -> Result<()> {
        self.push(ClosedSection {
            name: name.to_string(),
            start_at,
            end_at,
            data,
        });
        Ok(())
    }
}

/// How a scan ended
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum ScanOutcome {
    /// End of input reached with no open section or ignored subtree
    Completed,
    /// End of input reached inside a section; the section was dropped
    TruncatedInSection {
        /// The outermost open section
        section: String,
    },
    /// End of input reached inside an ignored subtree
    TruncatedInIgnore {
        /// The ignored tag
        tag: String,
    },
    /// A closing tag did not match the innermost open tag
    Mismatch {
        /// Innermost open tag, if any
        expected: Option<String>,
        /// Closing tag found
        found: String,
    },
}

impl ScanOutcome {
    pub fn is_complete(&self) -> bool {
        matches!(self, ScanOutcome::Completed)
    }
}

impl std::fmt::Display for ScanOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ScanOutcome::Completed => write!(f, "Completed"),
            ScanOutcome::TruncatedInSection { section } => write!(f, "Truncated inside section {}", section),
            ScanOutcome::TruncatedInIgnore { tag } => write!(f, "Truncated inside ignored <{}>", tag),
            ScanOutcome::Mismatch { expected: Some(expected), found } => {
                write!(f, "Found </{}> while <{}> was open", found, expected)
            }
            ScanOutcome::Mismatch { expected: None, found } => {
                write!(f, "Found </{}> with no open tag", found)
            }
        }
    }
}

/// Summary of one scan
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanReport {
    /// Number of lines read
    pub lines: usize,
    /// Line the scan stopped at (last line read)
    pub stopped_at: usize,
    /// Number of sections handed to the sink
    pub sections_closed: usize,
    /// How the scan ended
    pub outcome: ScanOutcome,
}
