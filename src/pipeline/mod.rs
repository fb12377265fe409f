//! Post-processing of extracted sections into derived datasets.
//!
//! Steps only ever read section documents, never each other's output, so
//! they run in parallel. A missing or malformed section yields an empty
//! dataset for the step that needed it.

pub mod types;
mod faction_rollup;
mod hostile_stations;
mod log_categories;
mod ship_losses;

pub use faction_rollup::{FactionRollup, rollup_factions};
pub use hostile_stations::{HostileStations, detect_hostile_stations};
pub use log_categories::{LogCategories, categorize_log};
pub use ship_losses::{ShipLosses, detect_ship_losses, parse_destroyed_title, parse_loss_details};
pub use types::*;

use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{Result, anyhow};
use log::{debug, error, info, warn};
use rayon::prelude::*;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::extractor::read_section;
use crate::types::DerivationConfig;
use crate::utils::{read_json, write_json};

/// Read access to the sections of one output directory
pub struct SectionStore {
    output_dir: PathBuf,
}

impl SectionStore {
    pub fn new(output_dir: &Path) -> Self {
        Self {
            output_dir: output_dir.to_path_buf(),
        }
    }

    /// Data of a section, `None` when missing or unreadable
    pub fn data(&self, name: &str) -> Option<Value> {
        match read_section(&self.output_dir, name) {
            Ok(Some(document)) => Some(document.data),
            Ok(None) => {
                debug!("Section {} not present in {}", name, self.output_dir.display());
                None
            }
            Err(e) => {
                warn!("Ignoring unreadable section {}: {:#}", name, e);
                None
            }
        }
    }
}

/// One derivation from sections to a dataset
pub trait DerivationStep: Send + Sync {
    /// Dataset id, written as `data-<id>.json`
    fn id(&self) -> &'static str;
    /// Build the dataset records
    fn derive(&self, sections: &SectionStore, config: &DerivationConfig) -> Vec<Value>;
}

/// Every derivation step, in registry order
pub fn default_steps() -> Vec<Box<dyn DerivationStep>> {
    vec![
        Box::new(ShipLosses),
        Box::new(HostileStations),
        Box::new(FactionRollup),
        Box::new(LogCategories),
    ]
}

/// Path of a derived dataset inside an output directory
pub fn dataset_path(output_dir: &Path, id: &str) -> PathBuf {
    output_dir.join(format!("data-{}.json", id))
}

/// Read a derived dataset; `Ok(None)` when it was never written
pub fn read_dataset<T: DeserializeOwned>(output_dir: &Path, id: &str) -> Result<Option<Vec<T>>> {
    read_json(&dataset_path(output_dir, id))
}

/// Serialize typed records, dropping any that fail to serialize
pub(crate) fn to_records<T: Serialize>(items: Vec<T>) -> Vec<Value> {
    items
        .into_iter()
        .filter_map(|item| serde_json::to_value(item).ok())
        .collect()
}

/// The registry of derivation steps
pub struct Pipeline {
    steps: Vec<Box<dyn DerivationStep>>,
}

impl Default for Pipeline {
    fn default() -> Self {
        Self::new(default_steps())
    }
}

impl Pipeline {
    pub fn new(steps: Vec<Box<dyn DerivationStep>>) -> Self {
        Self { steps }
    }

    /// Run every step against the sections in `output_dir`.
    ///
    /// All steps are attempted; the run fails if any step could not write
    /// its dataset.
    pub fn run(&self, output_dir: &Path, config: &DerivationConfig) -> Result<PipelineSummary> {
        info!("Running {} derivation steps in {}", self.steps.len(), output_dir.display());
        let start_time = Instant::now();
        let store = SectionStore::new(output_dir);

        let results: Vec<(&'static str, Result<usize>)> = self
            .steps
            .par_iter()
            .map(|step| {
                let records = step.derive(&store, config);
                let written = write_json(&dataset_path(output_dir, step.id()), &records).map(|_| records.len());
                (step.id(), written)
            })
            .collect();

        let mut datasets = Vec::new();
        let mut failed = 0;
        for (id, result) in results {
            match result {
                Ok(records) => {
                    debug!("Dataset {} has {} records", id, records);
                    datasets.push(DatasetSummary {
                        id: id.to_string(),
                        records,
                    });
                }
                Err(e) => {
                    error!("Derivation step {} failed: {:#}", id, e);
                    failed += 1;
                }
            }
        }

        if failed > 0 {
            return Err(anyhow!("{} of {} derivation steps failed", failed, self.steps.len()));
        }

        let summary = PipelineSummary {
            datasets,
            elapsed_ms: start_time.elapsed().as_millis() as u64,
        };
        info!("Derived {} datasets in {} ms", summary.datasets.len(), summary.elapsed_ms);
        Ok(summary)
    }
}

/// Run the default pipeline on `output_dir`
pub fn run_pipeline(output_dir: &Path, config: &DerivationConfig) -> Result<PipelineSummary> {
    Pipeline::default().run(output_dir, config)
}

/// String field of a JSON record, empty when absent
pub(crate) fn str_field<'a>(record: &'a Value, key: &str) -> &'a str {
    record.get(key).and_then(Value::as_str).unwrap_or("")
}

/// Numeric field of a JSON record, accepting numbers and numeric strings
pub(crate) fn f64_field(record: &Value, key: &str) -> f64 {
    match record.get(key) {
        Some(Value::Number(n)) => n.as_f64().unwrap_or(0.0),
        Some(Value::String(s)) => s.parse().unwrap_or(0.0),
        _ => 0.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extractor::{SectionDocument, section_path};
    use serde_json::json;
    use tempfile::tempdir;

    fn write_section(dir: &Path, name: &str, data: Value) -> Result<()> {
        write_json(&section_path(dir, name), &SectionDocument { start_at: 1, end_at: 2, data })
    }

    #[test]
    fn test_pipeline_writes_every_dataset() -> Result<()> {
        let dir = tempdir()?;
        write_section(
            dir.path(),
            "log",
            json!([
                { "time": 10, "category": "upkeep", "title": "Eagle Eye (ABC-123) was destroyed.", "text": "Location: Segaris" },
                { "time": 11, "category": "trade", "title": "Sold" },
            ]),
        )?;

        let summary = run_pipeline(dir.path(), &DerivationConfig::default())?;
        let ids: Vec<&str> = summary.datasets.iter().map(|d| d.id.as_str()).collect();
        assert_eq!(ids, vec!["ship-losses", "hostile-stations", "faction-rollup", "log-categories"]);

        let losses: Vec<ShipLoss> = read_dataset(dir.path(), "ship-losses")?.expect("written");
        assert_eq!(losses.len(), 1);
        assert_eq!(losses[0].location, "Segaris");

        // missing sections still produce an empty dataset file
        let stations: Vec<HostileStation> = read_dataset(dir.path(), "hostile-stations")?.expect("written");
        assert!(stations.is_empty());
        Ok(())
    }

    #[test]
    fn test_malformed_section_yields_empty_dataset() -> Result<()> {
        let dir = tempdir()?;
        std::fs::write(section_path(dir.path(), "log"), "{ truncated")?;
        write_section(dir.path(), "factions", json!({ "unexpected": "shape" }))?;

        let summary = run_pipeline(dir.path(), &DerivationConfig::default())?;
        assert!(summary.datasets.iter().all(|d| d.records == 0));
        Ok(())
    }

    #[test]
    fn test_unwritable_output_fails_run() {
        let dir = tempdir().unwrap();
        let missing = dir.path().join("does-not-exist");
        assert!(run_pipeline(&missing, &DerivationConfig::default()).is_err());
    }

    #[test]
    fn test_field_helpers() {
        let record = json!({ "a": "x", "n": 2.5, "s": "3" });
        assert_eq!(str_field(&record, "a"), "x");
        assert_eq!(str_field(&record, "n"), "");
        assert_eq!(f64_field(&record, "n"), 2.5);
        assert_eq!(f64_field(&record, "s"), 3.0);
        assert_eq!(f64_field(&record, "missing"), 0.0);
    }
}
