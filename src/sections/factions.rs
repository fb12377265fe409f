use serde_json::{Map, Value, json};

use super::{ChildRoutes, RoutedHandler, SectionState, attributes_to_object, number_or_string};
use crate::matcher::{Attributes, TagPathSpec};

/// One `<faction>` with its nested groups, each keyed by an attribute value
#[derive(Debug, Default)]
struct FactionRecord {
    id: String,
    attributes: Map<String, Value>,
    relations_locked: bool,
    relations: Map<String, Value>,
    boosters: Map<String, Value>,
    discounts: Map<String, Value>,
    moods: Map<String, Value>,
    licences: Map<String, Value>,
}

impl FactionRecord {
    fn into_value(self) -> Value {
        json!({
            "id": self.id,
            "attributes": self.attributes,
            "relationsLocked": self.relations_locked,
            "relations": self.relations,
            "boosters": self.boosters,
            "discounts": self.discounts,
            "moods": self.moods,
            "licences": self.licences,
        })
    }
}

#[derive(Debug, Default)]
pub struct FactionsState {
    current: Option<FactionRecord>,
    factions: Vec<Value>,
}

impl FactionsState {
    fn open_faction(&mut self, attrs: &Attributes) {
        let mut attributes = attributes_to_object(attrs, &[]);
        attributes.remove("id");
        self.current = Some(FactionRecord {
            id: attrs.get_or_empty("id").to_string(),
            attributes,
            ..FactionRecord::default()
        });
    }

    fn close_faction(&mut self) {
        if let Some(record) = self.current.take() {
            self.factions.push(record.into_value());
        }
    }

    fn relations(&mut self, attrs: &Attributes) {
        if let Some(record) = self.current.as_mut() {
            record.relations_locked = attrs.get("locked") == Some("1");
        }
    }

    fn relation(&mut self, attrs: &Attributes) {
        let (Some(record), Some(other)) = (self.current.as_mut(), attrs.get("faction")) else {
            return;
        };
        record
            .relations
            .insert(other.to_string(), number_or_string(attrs.get("relation").unwrap_or("0")));
    }

    fn booster(&mut self, attrs: &Attributes) {
        let (Some(record), Some(other)) = (self.current.as_mut(), attrs.get("faction")) else {
            return;
        };
        record.boosters.insert(
            other.to_string(),
            json!({
                "relation": number_or_string(attrs.get("relation").unwrap_or("0")),
                "time": number_or_string(attrs.get("time").unwrap_or("0")),
            }),
        );
    }

    fn discount(&mut self, attrs: &Attributes) {
        let Some(record) = self.current.as_mut() else {
            return;
        };
        let Some(key) = attrs.get("id").or_else(|| attrs.get("faction")) else {
            return;
        };
        let mut entry = attributes_to_object(attrs, &["amount".to_string(), "time".to_string()]);
        entry.remove("id");
        record.discounts.insert(key.to_string(), Value::Object(entry));
    }

    fn mood(&mut self, attrs: &Attributes) {
        let (Some(record), Some(kind)) = (self.current.as_mut(), attrs.get("type")) else {
            return;
        };
        record
            .moods
            .insert(kind.to_string(), Value::String(attrs.get_or_empty("level").to_string()));
    }

    fn licence(&mut self, attrs: &Attributes) {
        let (Some(record), Some(kind)) = (self.current.as_mut(), attrs.get("type")) else {
            return;
        };
        let granted: Vec<Value> = attrs
            .get_or_empty("factions")
            .split_whitespace()
            .map(|f| Value::String(f.to_string()))
            .collect();
        record.licences.insert(kind.to_string(), Value::Array(granted));
    }
}

impl SectionState for FactionsState {
    fn take(&mut self) -> Value {
        self.current = None;
        Value::Array(std::mem::take(&mut self.factions))
    }
}

pub fn factions_handler() -> RoutedHandler<FactionsState> {
    let routes = ChildRoutes::new()
        .on_open("faction", FactionsState::open_faction)
        .on_close("faction", FactionsState::close_faction)
        .on_open("faction.relations", FactionsState::relations)
        .on_open("faction.relations.relation", FactionsState::relation)
        .on_open("faction.relations.booster", FactionsState::booster)
        .on_open("faction.discounts.discount", FactionsState::discount)
        .on_open("faction.moods.mood", FactionsState::mood)
        .on_open("faction.licences.licence", FactionsState::licence);
    RoutedHandler::new(
        "factions",
        TagPathSpec::parse("universe.factions"),
        routes,
        FactionsState::default(),
    )
}
