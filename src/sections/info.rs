use serde_json::{Value, json};

use super::{ChildRoutes, RoutedHandler, SectionState, float_or_zero, int_or_zero};
use crate::matcher::{Attributes, TagPathSpec};

/// Save and player summary from `<info>`
#[derive(Debug, Default)]
pub struct InfoState {
    seen: bool,
    save_name: String,
    save_date: i64,
    game_id: String,
    game_version: String,
    game_build: String,
    game_time: f64,
    game_code: String,
    game_seed: String,
    name: String,
    location: String,
    money: i64,
    extensions: Vec<Value>,
}

impl InfoState {
    fn save(&mut self, attrs: &Attributes) {
        self.seen = true;
        self.save_name = attrs.get_or_empty("name").to_string();
        self.save_date = int_or_zero(attrs, "date");
    }

    fn game(&mut self, attrs: &Attributes) {
        self.seen = true;
        self.game_id = attrs.get_or_empty("id").to_string();
        self.game_version = attrs.get_or_empty("version").to_string();
        self.game_build = attrs.get_or_empty("build").to_string();
        self.game_time = float_or_zero(attrs, "time");
        self.game_code = attrs.get_or_empty("code").to_string();
        self.game_seed = attrs.get_or_empty("seed").to_string();
    }

    fn player(&mut self, attrs: &Attributes) {
        self.seen = true;
        self.name = attrs.get_or_empty("name").to_string();
        self.location = attrs.get_or_empty("location").to_string();
        self.money = int_or_zero(attrs, "money");
    }

    fn patch(&mut self, attrs: &Attributes) {
        self.seen = true;
        self.extensions.push(json!({
            "extension": attrs.get_or_empty("extension"),
            "version": attrs.get_or_empty("version"),
            "name": attrs.get_or_empty("name"),
        }));
    }
}

impl SectionState for InfoState {
    fn take(&mut self) -> Value {
        let state = std::mem::take(self);
        if !state.seen {
            return json!({});
        }
        json!({
            "saveName": state.save_name,
            "saveDate": state.save_date,
            "gameId": state.game_id,
            "gameVersion": state.game_version,
            "gameBuild": state.game_build,
            "gameTime": state.game_time,
            "gameCode": state.game_code,
            "gameSeed": state.game_seed,
            "name": state.name,
            "location": state.location,
            "money": state.money,
            "extensions": state.extensions,
        })
    }
}

pub fn info_handler() -> RoutedHandler<InfoState> {
    let routes = ChildRoutes::new()
        .on_open("save", InfoState::save)
        .on_open("game", InfoState::game)
        .on_open("player", InfoState::player)
        .on_open("patches.patch", InfoState::patch);
    RoutedHandler::new("info", TagPathSpec::parse("info"), routes, InfoState::default())
}
