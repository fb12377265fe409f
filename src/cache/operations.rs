use std::path::{Path, PathBuf};

use anyhow::Result;
use chrono::Utc;
use log::{debug, info, warn};

use super::types::{AnalysisCacheEntry, Freshness, StaleReason};
use crate::types::SaveIdentity;
use crate::utils::{create_dir_if_not_exists, read_json, remove_file_if_exists, write_json};

/// File name of the cache entry inside a save's output directory
pub const CACHE_FILE_NAME: &str = "analysis.json";

pub fn cache_path(output_dir: &Path) -> PathBuf {
    output_dir.join(CACHE_FILE_NAME)
}

/// Load the cache entry of an output directory
pub fn load_entry(output_dir: &Path) -> Result<Option<AnalysisCacheEntry>> {
    read_json(&cache_path(output_dir))
}

/// Check whether the output of a save matches its source
pub fn check_freshness(save: &SaveIdentity) -> Freshness {
    match load_entry(&save.output_dir) {
        Ok(Some(entry)) if entry.source_modified_ms == save.modified_ms => Freshness::Fresh,
        Ok(Some(entry)) => {
            debug!(
                "Save {} changed: cached {} ms, source {} ms",
                save.name, entry.source_modified_ms, save.modified_ms
            );
            Freshness::Stale(StaleReason::Changed)
        }
        Ok(None) => Freshness::Stale(StaleReason::Missing),
        Err(e) => {
            warn!("Treating unreadable cache of {} as stale: {:#}", save.name, e);
            Freshness::Stale(StaleReason::Corrupt)
        }
    }
}

/// Record that the output of a save is complete
pub fn mark_fresh(save: &SaveIdentity, sections: Vec<String>) -> Result<AnalysisCacheEntry> {
    create_dir_if_not_exists(&save.output_dir)?;
    let entry = AnalysisCacheEntry {
        source_modified_ms: save.modified_ms,
        analysed_at: Utc::now(),
        sections,
    };
    write_json(&cache_path(&save.output_dir), &entry)?;
    info!("Marked {} fresh ({} sections)", save.name, entry.sections.len());
    Ok(entry)
}

/// Drop the cache entry so an interrupted run is never taken as fresh
pub fn invalidate(save: &SaveIdentity) -> Result<()> {
    remove_file_if_exists(&cache_path(&save.output_dir))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn save_in(dir: &Path, modified_ms: i64) -> SaveIdentity {
        SaveIdentity {
            name: "quicksave".to_string(),
            source: dir.join("quicksave.xml.gz"),
            modified_ms,
            output_dir: dir.join("out").join("quicksave"),
        }
    }

    #[test]
    fn test_fresh_after_mark() -> Result<()> {
        let dir = tempdir()?;
        let save = save_in(dir.path(), 1_700_000_000_123);

        assert_eq!(check_freshness(&save), Freshness::Stale(StaleReason::Missing));

        let entry = mark_fresh(&save, vec!["info".to_string(), "log".to_string()])?;
        assert_eq!(entry.source_modified_ms, 1_700_000_000_123);
        assert_eq!(check_freshness(&save), Freshness::Fresh);

        let loaded = load_entry(&save.output_dir)?.expect("entry written");
        assert_eq!(loaded, entry);
        Ok(())
    }

    #[test]
    fn test_changed_source_is_stale() -> Result<()> {
        let dir = tempdir()?;
        mark_fresh(&save_in(dir.path(), 1000), Vec::new())?;

        let newer = save_in(dir.path(), 2000);
        assert_eq!(check_freshness(&newer), Freshness::Stale(StaleReason::Changed));
        Ok(())
    }

    #[test]
    fn test_corrupt_entry_is_stale() -> Result<()> {
        let dir = tempdir()?;
        let save = save_in(dir.path(), 1000);
        create_dir_if_not_exists(&save.output_dir)?;
        std::fs::write(cache_path(&save.output_dir), "{\"sourceModifiedMs\": ")?;

        assert_eq!(check_freshness(&save), Freshness::Stale(StaleReason::Corrupt));
        Ok(())
    }

    #[test]
    fn test_invalidate_removes_entry() -> Result<()> {
        let dir = tempdir()?;
        let save = save_in(dir.path(), 1000);
        mark_fresh(&save, Vec::new())?;

        invalidate(&save)?;
        assert_eq!(check_freshness(&save), Freshness::Stale(StaleReason::Missing));
        invalidate(&save)?;
        Ok(())
    }

    #[test]
    fn test_freshness_serialization() -> Result<()> {
        assert_eq!(serde_json::to_string(&Freshness::Fresh)?, r#"{"state":"fresh"}"#);
        assert_eq!(
            serde_json::to_string(&Freshness::Stale(StaleReason::Changed))?,
            r#"{"state":"stale","reason":"changed"}"#
        );
        Ok(())
    }
}
