use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Result, anyhow};
use serde::{Deserialize, Serialize};

use crate::utils::read_json;

/// Tags whose subtrees are skipped without invoking any handler
pub const DEFAULT_IGNORED_TAGS: &[&str] = &[
    "script",
    "md",
    "shadervalues",
    "shaderparams",
    "orders",
    "terraforming*",
    "aidirector",
];

/// Attributes written as numbers in record-style sections
pub const DEFAULT_NUMERIC_ATTRIBUTES: &[&str] = &["time", "money", "amount", "price", "value"];

/// One save on disk
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaveIdentity {
    /// Name of the save (file name without `.xml` / `.xml.gz`)
    pub name: String,
    /// Path to the save file, possibly gzip-compressed
    pub source: PathBuf,
    /// Modification time of the source in milliseconds since the epoch
    pub modified_ms: i64,
    /// Directory receiving sections and derived datasets
    pub output_dir: PathBuf,
}

impl SaveIdentity {
    /// Same source path and same modification time
    pub fn unchanged(&self, other: &SaveIdentity) -> bool {
        self.source == other.source && self.modified_ms == other.modified_ms
    }
}

/// Configuration for the stream scanner and section handlers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractorConfig {
    /// Tag names skipped together with their subtree (`prefix*` allowed)
    pub ignored_tags: Vec<String>,
    /// Attribute names converted to numbers in record sections
    pub numeric_attributes: Vec<String>,
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            ignored_tags: DEFAULT_IGNORED_TAGS.iter().map(|s| s.to_string()).collect(),
            numeric_attributes: DEFAULT_NUMERIC_ATTRIBUTES.iter().map(|s| s.to_string()).collect(),
        }
    }
}

/// Configuration for the post-processing steps
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DerivationConfig {
    /// Log category of ship destruction notices
    pub upkeep_category: String,
    /// Faction id of hostile stations
    pub hostile_faction: String,
    /// Macro fragment identifying turrets and platforms attached to a station
    pub excluded_platform_fragment: String,
    /// Macro fragment of the primary station subtype
    pub primary_subtype: String,
    /// Subtype assigned to every other hostile station
    pub secondary_subtype: String,
    /// Owner id of player property
    pub player_owner: String,
    /// Display labels for log categories
    pub category_labels: BTreeMap<String, String>,
}

impl Default for DerivationConfig {
    fn default() -> Self {
        let category_labels = [
            ("upkeep", "Upkeep"),
            ("trade", "Trade"),
            ("combat", "Combat"),
            ("missions", "Missions"),
            ("news", "News"),
            ("alerts", "Alerts"),
            ("general", "General"),
            ("tips", "Tips"),
            ("diplomacy", "Diplomacy"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();

        Self {
            upkeep_category: "upkeep".to_string(),
            hostile_faction: "khaak".to_string(),
            excluded_platform_fragment: "weaponplatform".to_string(),
            primary_subtype: "hive".to_string(),
            secondary_subtype: "nest".to_string(),
            player_owner: "player".to_string(),
            category_labels,
        }
    }
}

/// Configuration for the monitor loop
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    /// Directory containing the game's saves
    pub save_dir: PathBuf,
    /// Root directory for per-save output
    pub output_dir: PathBuf,
    /// Seconds between ticks
    pub interval_secs: u64,
    /// Number of losses reported by a status query
    pub recent_losses: usize,
    /// Scanner configuration
    pub extractor: ExtractorConfig,
    /// Post-processing configuration
    pub derivation: DerivationConfig,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            save_dir: PathBuf::from("save"),
            output_dir: PathBuf::from("output"),
            interval_secs: 60,
            recent_losses: 5,
            extractor: ExtractorConfig::default(),
            derivation: DerivationConfig::default(),
        }
    }
}

impl MonitorConfig {
    /// Load a JSON configuration file; absent keys keep their defaults
    pub fn load(path: &Path) -> Result<Self> {
        read_json(path)?.ok_or_else(|| anyhow!("Config file not found: {}", path.display()))
    }

    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs.max(1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unchanged_compares_source_and_timestamp() {
        let a = SaveIdentity {
            name: "quicksave".to_string(),
            source: PathBuf::from("/saves/quicksave.xml.gz"),
            modified_ms: 1000,
            output_dir: PathBuf::from("/out/quicksave"),
        };
        let mut b = a.clone();
        b.output_dir = PathBuf::from("/elsewhere");
        assert!(a.unchanged(&b));

        b.modified_ms = 1001;
        assert!(!a.unchanged(&b));
    }

    #[test]
    fn test_partial_config_falls_back_to_defaults() {
        let config: MonitorConfig = serde_json::from_str(r#"{"interval_secs": 5}"#).unwrap();
        assert_eq!(config.interval_secs, 5);
        assert_eq!(config.recent_losses, 5);
        assert_eq!(config.derivation.hostile_faction, "khaak");
        assert!(config.extractor.ignored_tags.contains(&"script".to_string()));
    }

    #[test]
    fn test_load_config_file() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("miner.json");
        std::fs::write(&path, r#"{"save_dir": "/games/save", "derivation": {"hostile_faction": "xenon"}}"#)?;

        let config = MonitorConfig::load(&path)?;
        assert_eq!(config.save_dir, PathBuf::from("/games/save"));
        assert_eq!(config.derivation.hostile_faction, "xenon");
        assert_eq!(config.derivation.primary_subtype, "hive");

        assert!(MonitorConfig::load(&dir.path().join("missing.json")).is_err());
        Ok(())
    }
}
