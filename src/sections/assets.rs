//! Player blueprints and inventory. Both live inside the player character
//! component deep in the universe, so both sections open on that component
//! by attribute rather than by path. Other characters carry inventories too.

use serde_json::{Value, json};

use super::{ChildRoutes, RoutedHandler, SectionState, number_or_string};
use crate::matcher::{Attributes, TagPathSpec};

fn player_component() -> TagPathSpec {
    TagPathSpec::predicate("component", [("class", "player")])
}

#[derive(Debug, Default)]
pub struct BlueprintsState {
    wares: Vec<Value>,
}

impl BlueprintsState {
    fn blueprint(&mut self, attrs: &Attributes) {
        if let Some(ware) = attrs.get("ware") {
            self.wares.push(json!({ "ware": ware }));
        }
    }
}

impl SectionState for BlueprintsState {
    fn take(&mut self) -> Value {
        Value::Array(std::mem::take(&mut self.wares))
    }
}

pub fn blueprints_handler() -> RoutedHandler<BlueprintsState> {
    let routes = ChildRoutes::new().on_open("blueprints.blueprint", BlueprintsState::blueprint);
    RoutedHandler::new("blueprints", player_component(), routes, BlueprintsState::default())
}

#[derive(Debug, Default)]
pub struct InventoryState {
    numeric_amount: bool,
    wares: Vec<Value>,
}

impl InventoryState {
    fn ware(&mut self, attrs: &Attributes) {
        let Some(ware) = attrs.get("ware") else {
            return;
        };
        let raw = attrs.get("amount").unwrap_or("1");
        let amount = if self.numeric_amount {
            number_or_string(raw)
        } else {
            Value::String(raw.to_string())
        };
        self.wares.push(json!({ "ware": ware, "amount": amount }));
    }
}

impl SectionState for InventoryState {
    fn take(&mut self) -> Value {
        Value::Array(std::mem::take(&mut self.wares))
    }
}

pub fn inventory_handler(numeric: &[String]) -> RoutedHandler<InventoryState> {
    let routes = ChildRoutes::new().on_open("inventory.ware", InventoryState::ware);
    let state = InventoryState {
        numeric_amount: numeric.iter().any(|n| n == "amount"),
        wares: Vec::new(),
    };
    RoutedHandler::new("inventory", player_component(), routes, state)
}
