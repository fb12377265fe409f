use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A player ship reported destroyed in the event log
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShipLoss {
    /// Game time of the log entry
    pub time: f64,
    /// Log entry title
    pub title: String,
    /// Log entry body
    pub text: String,
    /// Ship name from the title
    pub ship_name: String,
    /// Ship code from the title (`ABC-123`)
    pub ship_code: String,
    /// `Location:` line of the body
    pub location: String,
    /// `Commander:` line of the body
    pub commander: String,
    /// `Destroyed by:` line of the body
    pub destroyed_by: String,
}

/// A player-owned ship or station
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerAsset {
    pub id: String,
    /// `ship` or `station`
    pub kind: String,
    pub class: String,
    pub code: String,
    pub name: String,
    #[serde(rename = "macro")]
    pub macro_name: String,
}

/// A station owned by the hostile faction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HostileStation {
    pub id: String,
    pub code: String,
    #[serde(rename = "macro")]
    pub macro_name: String,
    /// One of the two configured station subtypes
    pub subtype: String,
    pub sector_id: String,
    pub sector_macro: String,
    pub cluster_macro: String,
    /// Player property in the same sector
    pub player_assets: Vec<PlayerAsset>,
}

/// Relations summary of one faction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FactionSummary {
    pub id: String,
    pub active: bool,
    pub relations_locked: bool,
    /// Relation value keyed by other faction id
    pub relations: BTreeMap<String, f64>,
    /// Temporary relation boosters keyed by faction id
    pub boosters: BTreeMap<String, Value>,
    /// Discounts keyed by faction id
    pub discounts: BTreeMap<String, Value>,
    /// Factions granted each licence type
    pub licences: BTreeMap<String, Vec<String>>,
}

/// Event log entries of one category
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategorySummary {
    pub category: String,
    /// Display label of the category
    pub label: String,
    pub count: usize,
    pub first_time: f64,
    pub last_time: f64,
}

/// Outcome of one derivation step
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DatasetSummary {
    /// Dataset id (`data-<id>.json`)
    pub id: String,
    /// Number of records written
    pub records: usize,
}

/// Outcome of a full pipeline run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineSummary {
    pub datasets: Vec<DatasetSummary>,
    pub elapsed_ms: u64,
}
