use serde_json::{Value, json};

use super::{ChildRoutes, RoutedHandler, SectionState};
use crate::matcher::{Attributes, TagPathSpec};

#[derive(Debug, Clone, Default)]
struct ComponentFrame {
    class: String,
    id: String,
    macro_name: String,
    code: String,
}

impl ComponentFrame {
    fn from_attrs(attrs: &Attributes) -> Self {
        Self {
            class: attrs.get_or_empty("class").to_string(),
            id: attrs.get_or_empty("id").to_string(),
            macro_name: attrs.get_or_empty("macro").to_string(),
            code: attrs.get_or_empty("code").to_string(),
        }
    }
}

/// Catalog of sectors, stations and ships inside the galaxy component.
///
/// Components nest without bound (galaxy, cluster, sector, zone, station,
/// docked ship, ...), so the state keeps a stack of open components and
/// tags every entity with its enclosing sector and cluster.
#[derive(Debug, Default)]
pub struct UniverseState {
    stack: Vec<ComponentFrame>,
    sectors: Vec<Value>,
    stations: Vec<Value>,
    ships: Vec<Value>,
}

impl UniverseState {
    fn enclosing(&self, class: &str) -> Option<&ComponentFrame> {
        self.stack.iter().rev().find(|frame| frame.class == class)
    }

    fn entity(&self, attrs: &Attributes, frame: &ComponentFrame) -> Value {
        let sector = self.enclosing("sector").cloned().unwrap_or_default();
        let cluster = self.enclosing("cluster").cloned().unwrap_or_default();
        json!({
            "id": frame.id,
            "class": frame.class,
            "macro": frame.macro_name,
            "code": frame.code,
            "owner": attrs.get_or_empty("owner"),
            "name": attrs.get_or_empty("name"),
            "sectorId": sector.id,
            "sectorMacro": sector.macro_name,
            "clusterId": cluster.id,
            "clusterMacro": cluster.macro_name,
        })
    }

    fn open_component(&mut self, attrs: &Attributes) {
        let frame = ComponentFrame::from_attrs(attrs);
        match frame.class.as_str() {
            "sector" => {
                let record = self.entity(attrs, &frame);
                self.sectors.push(record);
            }
            "station" => {
                let record = self.entity(attrs, &frame);
                self.stations.push(record);
            }
            class if class.starts_with("ship_") => {
                let record = self.entity(attrs, &frame);
                self.ships.push(record);
            }
            _ => {}
        }
        self.stack.push(frame);
    }

    fn close_component(&mut self) {
        self.stack.pop();
    }
}

impl SectionState for UniverseState {
    fn take(&mut self) -> Value {
        self.stack.clear();
        let sectors = std::mem::take(&mut self.sectors);
        let stations = std::mem::take(&mut self.stations);
        let ships = std::mem::take(&mut self.ships);
        if sectors.is_empty() && stations.is_empty() && ships.is_empty() {
            return json!({});
        }
        json!({
            "sectors": sectors,
            "stations": stations,
            "ships": ships,
        })
    }
}

pub fn universe_handler() -> RoutedHandler<UniverseState> {
    let routes = ChildRoutes::new()
        .on_open("**.component", UniverseState::open_component)
        .on_close("**.component", UniverseState::close_component);
    RoutedHandler::new(
        "universe",
        TagPathSpec::parse("universe.component"),
        routes,
        UniverseState::default(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sections::SectionHandler;

    fn component(pairs: &[(&str, &str)]) -> Attributes {
        pairs.iter().copied().collect()
    }

    #[test]
    fn test_entities_carry_enclosing_sector() {
        let mut handler = universe_handler();
        handler.open(&component(&[("class", "galaxy")]));

        let cluster = "connections.connection.component";
        let sector = "connections.connection.component.connections.connection.component";
        let zone = format!("{sector}.connections.connection.component");
        let station = format!("{zone}.connections.connection.component");
        let docked = format!("{station}.connections.connection.component");

        handler.child_open(cluster, &component(&[("class", "cluster"), ("id", "[0x1]"), ("macro", "cluster_01_macro")]));
        handler.child_open(sector, &component(&[("class", "sector"), ("id", "[0x2]"), ("macro", "cluster_01_sector001_macro")]));
        handler.child_open(&zone, &component(&[("class", "zone"), ("id", "[0x3]")]));
        handler.child_open(
            &station,
            &component(&[("class", "station"), ("id", "[0x4]"), ("macro", "station_kha_hive_01_macro"), ("owner", "khaak")]),
        );
        handler.child_open(&docked, &component(&[("class", "ship_s"), ("id", "[0x5]"), ("owner", "player"), ("code", "ABC-123")]));
        handler.child_close(&docked);
        handler.child_close(&station);
        handler.child_close(&zone);
        handler.child_close(sector);
        handler.child_open(sector, &component(&[("class", "sector"), ("id", "[0x6]")]));
        handler.child_open(&zone, &component(&[("class", "ship_m"), ("id", "[0x7]")]));

        let data = handler.finish();
        assert_eq!(data["sectors"].as_array().map(Vec::len), Some(2));
        assert_eq!(data["sectors"][0]["clusterId"], "[0x1]");
        assert_eq!(data["stations"][0]["sectorId"], "[0x2]");
        assert_eq!(data["stations"][0]["owner"], "khaak");
        assert_eq!(data["ships"][0]["sectorId"], "[0x2]");
        assert_eq!(data["ships"][0]["code"], "ABC-123");
        assert_eq!(data["ships"][1]["sectorId"], "[0x6]");
    }

    #[test]
    fn test_empty_galaxy_is_empty() {
        let mut handler = universe_handler();
        handler.open(&component(&[("class", "galaxy")]));
        assert_eq!(handler.finish(), json!({}));
    }
}
