use std::collections::HashMap;

use serde_json::Value;

use super::types::{HostileStation, PlayerAsset};
use super::{DerivationStep, SectionStore, str_field, to_records};
use crate::types::DerivationConfig;

fn entities<'a>(universe: &'a Value, key: &str) -> &'a [Value] {
    universe
        .get(key)
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or(&[])
}

fn player_asset(entity: &Value, kind: &str) -> PlayerAsset {
    PlayerAsset {
        id: str_field(entity, "id").to_string(),
        kind: kind.to_string(),
        class: str_field(entity, "class").to_string(),
        code: str_field(entity, "code").to_string(),
        name: str_field(entity, "name").to_string(),
        macro_name: str_field(entity, "macro").to_string(),
    }
}

/// Hostile stations with the player property sharing their sector
pub fn detect_hostile_stations(universe: &Value, config: &DerivationConfig) -> Vec<HostileStation> {
    let stations = entities(universe, "stations");
    let ships = entities(universe, "ships");

    let mut player_by_sector: HashMap<&str, Vec<PlayerAsset>> = HashMap::new();
    let owned = ships
        .iter()
        .map(|ship| (ship, "ship"))
        .chain(stations.iter().map(|station| (station, "station")))
        .filter(|(entity, _)| str_field(entity, "owner") == config.player_owner);
    for (entity, kind) in owned {
        let sector = str_field(entity, "sectorId");
        if !sector.is_empty() {
            player_by_sector
                .entry(sector)
                .or_default()
                .push(player_asset(entity, kind));
        }
    }

    stations
        .iter()
        .filter(|station| str_field(station, "owner") == config.hostile_faction)
        .filter(|station| !str_field(station, "macro").contains(config.excluded_platform_fragment.as_str()))
        .map(|station| {
            let macro_name = str_field(station, "macro");
            let subtype = if macro_name.contains(config.primary_subtype.as_str()) {
                &config.primary_subtype
            } else {
                &config.secondary_subtype
            };
            let sector_id = str_field(station, "sectorId");
            HostileStation {
                id: str_field(station, "id").to_string(),
                code: str_field(station, "code").to_string(),
                macro_name: macro_name.to_string(),
                subtype: subtype.clone(),
                sector_id: sector_id.to_string(),
                sector_macro: str_field(station, "sectorMacro").to_string(),
                cluster_macro: str_field(station, "clusterMacro").to_string(),
                player_assets: player_by_sector.get(sector_id).cloned().unwrap_or_default(),
            }
        })
        .collect()
}

pub struct HostileStations;

impl DerivationStep for HostileStations {
    fn id(&self) -> &'static str {
        "hostile-stations"
    }

    fn derive(&self, sections: &SectionStore, config: &DerivationConfig) -> Vec<Value> {
        match sections.data("universe") {
            Some(universe) => to_records(detect_hostile_stations(&universe, config)),
            None => Vec::new(),
        }
    }
}
