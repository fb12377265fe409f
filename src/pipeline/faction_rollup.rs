use std::collections::BTreeMap;

use serde_json::Value;

use super::types::FactionSummary;
use super::{DerivationStep, SectionStore, str_field, to_records};
use crate::types::DerivationConfig;

fn object_entries(record: &Value, key: &str) -> Vec<(String, Value)> {
    record
        .get(key)
        .and_then(Value::as_object)
        .map(|map| map.iter().map(|(k, v)| (k.clone(), v.clone())).collect())
        .unwrap_or_default()
}

fn as_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.parse().ok(),
        _ => None,
    }
}

fn summarize(record: &Value) -> Option<FactionSummary> {
    let id = str_field(record, "id");
    if id.is_empty() {
        return None;
    }

    let active = record
        .get("attributes")
        .and_then(|attrs| attrs.get("active"))
        .and_then(Value::as_str)
        .map(|flag| flag != "0" && flag != "false")
        .unwrap_or(true);

    let relations: BTreeMap<String, f64> = object_entries(record, "relations")
        .into_iter()
        .filter_map(|(faction, value)| as_number(&value).map(|v| (faction, v)))
        .collect();

    let licences: BTreeMap<String, Vec<String>> = object_entries(record, "licences")
        .into_iter()
        .map(|(kind, granted)| {
            let factions = granted
                .as_array()
                .map(|list| list.iter().filter_map(Value::as_str).map(str::to_string).collect())
                .unwrap_or_default();
            (kind, factions)
        })
        .collect();

    Some(FactionSummary {
        id: id.to_string(),
        active,
        relations_locked: record.get("relationsLocked").and_then(Value::as_bool).unwrap_or(false),
        relations,
        boosters: object_entries(record, "boosters").into_iter().collect(),
        discounts: object_entries(record, "discounts").into_iter().collect(),
        licences,
    })
}

/// Per-faction summaries of the factions section
pub fn rollup_factions(factions: &Value) -> Vec<FactionSummary> {
    factions
        .as_array()
        .map(|records| records.iter().filter_map(summarize).collect())
        .unwrap_or_default()
}

pub struct FactionRollup;

impl DerivationStep for FactionRollup {
    fn id(&self) -> &'static str {
        "faction-rollup"
    }

    fn derive(&self, sections: &SectionStore, _config: &DerivationConfig) -> Vec<Value> {
        match sections.data("factions") {
            Some(factions) => to_records(rollup_factions(&factions)),
            None => Vec::new(),
        }
    }
}
