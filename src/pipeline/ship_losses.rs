use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

use super::types::ShipLoss;
use super::{DerivationStep, SectionStore, f64_field, str_field, to_records};
use crate::types::DerivationConfig;

/// `<name> (<CODE>) was destroyed.`
static DESTROYED_TITLE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(.+) \(([A-Z]{3}-[0-9]+)\) was destroyed\.$").expect("destroyed title pattern is valid")
});

/// Split a destruction title into ship name and ship code
pub fn parse_destroyed_title(title: &str) -> Option<(String, String)> {
    let caps = DESTROYED_TITLE_RE.captures(title)?;
    Some((caps[1].to_string(), caps[2].to_string()))
}

/// Pull `Location:`, `Commander:` and `Destroyed by:` out of a loss notice.
///
/// Labels match case-insensitively at the start of a line; the value is
/// everything after the first `:`. Missing labels give empty strings.
pub fn parse_loss_details(text: &str) -> (String, String, String) {
    let mut location = None;
    let mut commander = None;
    let mut destroyed_by = None;

    for line in text.lines() {
        let line = line.trim();
        let Some((label, value)) = line.split_once(':') else {
            continue;
        };
        let label = label.trim().to_lowercase();
        let value = value.trim().to_string();
        let slot = if label.starts_with("location") {
            &mut location
        } else if label.starts_with("commander") {
            &mut commander
        } else if label.starts_with("destroyed by") {
            &mut destroyed_by
        } else {
            continue;
        };
        slot.get_or_insert(value);
    }

    (
        location.unwrap_or_default(),
        commander.unwrap_or_default(),
        destroyed_by.unwrap_or_default(),
    )
}

/// Ship losses from the event log, oldest first
pub fn detect_ship_losses(log: &Value, config: &DerivationConfig) -> Vec<ShipLoss> {
    let Some(entries) = log.as_array() else {
        return Vec::new();
    };

    entries
        .iter()
        .filter(|entry| str_field(entry, "category") == config.upkeep_category)
        .filter(|entry| str_field(entry, "title").contains("destroyed"))
        .filter_map(|entry| {
            let title = str_field(entry, "title");
            let (ship_name, ship_code) = parse_destroyed_title(title)?;
            let text = str_field(entry, "text");
            let (location, commander, destroyed_by) = parse_loss_details(text);
            Some(ShipLoss {
                time: f64_field(entry, "time"),
                title: title.to_string(),
                text: text.to_string(),
                ship_name,
                ship_code,
                location,
                commander,
                destroyed_by,
            })
        })
        .collect()
}

pub struct ShipLosses;

impl DerivationStep for ShipLosses {
    fn id(&self) -> &'static str {
        "ship-losses"
    }

    fn derive(&self, sections: &SectionStore, config: &DerivationConfig) -> Vec<Value> {
        match sections.data("log") {
            Some(log) => to_records(detect_ship_losses(&log, config)),
            None => Vec::new(),
        }
    }
}
