use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Freshness metadata stored next to a save's sections
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisCacheEntry {
    /// Modification time of the source the output was built from
    pub source_modified_ms: i64,
    /// When extraction and post-processing completed
    pub analysed_at: DateTime<Utc>,
    /// Sections written by the extraction run
    pub sections: Vec<String>,
}

/// Why a save needs to be processed again
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StaleReason {
    /// No cache entry in the output directory
    Missing,
    /// The cache entry could not be read
    Corrupt,
    /// The source was modified after the entry was written
    Changed,
}

/// Cache state of one save
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", content = "reason", rename_all = "lowercase")]
pub enum Freshness {
    Fresh,
    Stale(StaleReason),
}

impl Freshness {
    pub fn is_fresh(&self) -> bool {
        matches!(self, Freshness::Fresh)
    }
}

impl std::fmt::Display for Freshness {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Freshness::Fresh => write!(f, "fresh"),
            Freshness::Stale(StaleReason::Missing) => write!(f, "stale (not analysed)"),
            Freshness::Stale(StaleReason::Corrupt) => write!(f, "stale (corrupt cache)"),
            Freshness::Stale(StaleReason::Changed) => write!(f, "stale (source changed)"),
        }
    }
}
