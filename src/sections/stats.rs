use serde_json::{Map, Value};

use super::{ChildRoutes, RoutedHandler, SectionState, number_or_string};
use crate::matcher::{Attributes, TagPathSpec};

/// Game statistics, `<stat id=".." value=".."/>` flattened into one mapping
#[derive(Debug, Default)]
pub struct StatsState {
    values: Map<String, Value>,
}

impl StatsState {
    fn stat(&mut self, attrs: &Attributes) {
        let Some(id) = attrs.get("id") else {
            return;
        };
        let value = match attrs.get("value") {
            Some(raw) => number_or_string(raw),
            None => Value::from(0),
        };
        self.values.insert(id.to_string(), value);
    }
}

impl SectionState for StatsState {
    fn take(&mut self) -> Value {
        Value::Object(std::mem::take(&mut self.values))
    }
}

pub fn stats_handler() -> RoutedHandler<StatsState> {
    let routes = ChildRoutes::new().on_open("stat", StatsState::stat);
    RoutedHandler::new("stats", TagPathSpec::parse("stats"), routes, StatsState::default())
}
