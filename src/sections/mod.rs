//! Section handlers.
//!
//! Every recognised section owns one handler. The scanner feeds it the
//! section's opening tag, every nested open/close with its path relative to
//! the section root, and finally asks it for the accumulated data.
//!
//! Handlers are assembled from a per-section state type and a [`ChildRoutes`]
//! table mapping relative child paths to callbacks on that state.

mod assets;
mod factions;
mod info;
mod records;
mod stats;
mod universe;

pub use assets::{blueprints_handler, inventory_handler};
pub use factions::factions_handler;
pub use info::info_handler;
pub use records::{RecordGroup, RecordListState, record_list_handler};
pub use stats::stats_handler;
pub use universe::universe_handler;

use std::collections::HashMap;

use serde_json::{Map, Number, Value};

use crate::matcher::{Attributes, TagPathSpec};
use crate::types::ExtractorConfig;

/// The capability the scanner drives for each section
pub trait SectionHandler: Send {
    /// Output key of the section (`<name>.json`)
    fn name(&self) -> &str;
    /// Which tag paths open this section
    fn path_spec(&self) -> &TagPathSpec;
    /// The section root tag was opened
    fn open(&mut self, attrs: &Attributes);
    /// A tag beneath the root was opened; `rel_path` is dot-joined and
    /// relative to the root
    fn child_open(&mut self, rel_path: &str, attrs: &Attributes);
    /// A tag beneath the root was closed
    fn child_close(&mut self, rel_path: &str);
    /// Take the accumulated data, leaving the handler empty.
    /// An empty object or array means there is nothing to write.
    fn finish(&mut self) -> Value;
}

/// State accumulated by one section type
pub trait SectionState: Send {
    /// Called with the attributes of the section root tag
    fn open(&mut self, _attrs: &Attributes) {}
    /// Drain the accumulated data into a JSON value
    fn take(&mut self) -> Value;
}

pub type OpenCallback<S> = fn(&mut S, &Attributes);
pub type CloseCallback<S> = fn(&mut S);

/// Lookup table from relative child path to callback.
///
/// Keys are exact relative paths (`faction.relations.relation`) or
/// wildcards of the form `**.tag`, which match any relative path whose last
/// segment is `tag`. Exact keys win.
pub struct ChildRoutes<S> {
    open: HashMap<String, OpenCallback<S>>,
    close: HashMap<String, CloseCallback<S>>,
    wildcard_open: HashMap<String, OpenCallback<S>>,
    wildcard_close: HashMap<String, CloseCallback<S>>,
}

impl<S> Default for ChildRoutes<S> {
    fn default() -> Self {
        Self {
            open: HashMap::new(),
            close: HashMap::new(),
            wildcard_open: HashMap::new(),
            wildcard_close: HashMap::new(),
        }
    }
}

impl<S> ChildRoutes<S> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a callback for when `path` opens
    pub fn on_open(mut self, path: &str, callback: OpenCallback<S>) -> Self {
        match path.strip_prefix("**.") {
            Some(tag) => self.wildcard_open.insert(tag.to_string(), callback),
            None => self.open.insert(path.to_string(), callback),
        };
        self
    }

    /// Register a callback for when `path` closes
    pub fn on_close(mut self, path: &str, callback: CloseCallback<S>) -> Self {
        match path.strip_prefix("**.") {
            Some(tag) => self.wildcard_close.insert(tag.to_string(), callback),
            None => self.close.insert(path.to_string(), callback),
        };
        self
    }

    pub fn open_route(&self, rel_path: &str) -> Option<OpenCallback<S>> {
        self.open
            .get(rel_path)
            .or_else(|| self.wildcard_open.get(last_segment(rel_path)))
            .copied()
    }

    pub fn close_route(&self, rel_path: &str) -> Option<CloseCallback<S>> {
        self.close
            .get(rel_path)
            .or_else(|| self.wildcard_close.get(last_segment(rel_path)))
            .copied()
    }
}

fn last_segment(path: &str) -> &str {
    path.rsplit('.').next().unwrap_or(path)
}

/// A [`SectionHandler`] built from a state and its route table
pub struct RoutedHandler<S> {
    name: String,
    spec: TagPathSpec,
    routes: ChildRoutes<S>,
    state: S,
}

impl<S: SectionState> RoutedHandler<S> {
    pub fn new(name: &str, spec: TagPathSpec, routes: ChildRoutes<S>, state: S) -> Self {
        Self {
            name: name.to_string(),
            spec,
            routes,
            state,
        }
    }

    pub fn state(&self) -> &S {
        &self.state
    }
}

impl<S: SectionState> SectionHandler for RoutedHandler<S> {
    fn name(&self) -> &str {
        &self.name
    }

    fn path_spec(&self) -> &TagPathSpec {
        &self.spec
    }

    fn open(&mut self, attrs: &Attributes) {
        self.state.open(attrs);
    }

    fn child_open(&mut self, rel_path: &str, attrs: &Attributes) {
        if let Some(callback) = self.routes.open_route(rel_path) {
            callback(&mut self.state, attrs);
        }
    }

    fn child_close(&mut self, rel_path: &str) {
        if let Some(callback) = self.routes.close_route(rel_path) {
            callback(&mut self.state);
        }
    }

    fn finish(&mut self) -> Value {
        self.state.take()
    }
}

/// All handlers of a full extraction run
pub fn default_handlers(config: &ExtractorConfig) -> Vec<Box<dyn SectionHandler>> {
    let numeric = &config.numeric_attributes;
    vec![
        Box::new(info_handler()),
        Box::new(stats_handler()),
        Box::new(record_list_handler("log", "log", "entry", None, numeric)),
        Box::new(record_list_handler("messages", "messages", "entry", None, numeric)),
        Box::new(record_list_handler(
            "economylog",
            "economylog",
            "entries.log",
            Some(RecordGroup::new("entries", "type")),
            numeric,
        )),
        Box::new(record_list_handler("missions", "missions", "mission", None, numeric)),
        Box::new(factions_handler()),
        Box::new(universe_handler()),
        Box::new(blueprints_handler()),
        Box::new(inventory_handler(numeric)),
    ]
}

/// Whether a finished section holds anything worth writing
pub fn is_empty_data(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Object(map) => map.is_empty(),
        Value::Array(items) => items.is_empty(),
        _ => false,
    }
}

/// Integer if it parses as one, float if finite, the raw string otherwise
pub fn number_or_string(raw: &str) -> Value {
    if let Ok(i) = raw.parse::<i64>() {
        return Value::Number(i.into());
    }
    raw.parse::<f64>()
        .ok()
        .and_then(Number::from_f64)
        .map(Value::Number)
        .unwrap_or_else(|| Value::String(raw.to_string()))
}

/// Integer value of an attribute, zero when absent or unparsable
pub fn int_or_zero(attrs: &Attributes, key: &str) -> i64 {
    let raw = attrs.get_or_empty(key);
    raw.parse::<i64>()
        .or_else(|_| raw.parse::<f64>().map(|f| f as i64))
        .unwrap_or(0)
}

/// Float value of an attribute, zero when absent or unparsable
pub fn float_or_zero(attrs: &Attributes, key: &str) -> f64 {
    attrs
        .get_or_empty(key)
        .parse::<f64>()
        .ok()
        .filter(|f| f.is_finite())
        .unwrap_or(0.0)
}

/// All attributes as a JSON object, converting the listed names to numbers
pub fn attributes_to_object(attrs: &Attributes, numeric: &[String]) -> Map<String, Value> {
    attrs
        .iter()
        .map(|(k, v)| {
            let value = if numeric.iter().any(|n| n == k) {
                number_or_string(v)
            } else {
                Value::String(v.to_string())
            };
            (k.to_string(), value)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[derive(Default)]
    struct Counter {
        opened: Vec<String>,
        closed: usize,
    }

    impl SectionState for Counter {
        fn take(&mut self) -> Value {
            json!({ "opened": std::mem::take(&mut self.opened), "closed": self.closed })
        }
    }

    #[test]
    fn test_exact_routes_win_over_wildcards() {
        let routes = ChildRoutes::<Counter>::new()
            .on_open("a.item", |s, _| s.opened.push("exact".into()))
            .on_open("**.item", |s, _| s.opened.push("wild".into()))
            .on_close("**.item", |s| s.closed += 1);

        let mut handler = RoutedHandler::new("t", TagPathSpec::parse("root"), routes, Counter::default());
        let attrs = Attributes::new();
        handler.child_open("a.item", &attrs);
        handler.child_open("b.c.item", &attrs);
        handler.child_open("item", &attrs);
        handler.child_open("a.other", &attrs);
        handler.child_close("a.item");
        handler.child_close("a.other");

        assert_eq!(handler.state().opened, vec!["exact", "wild", "wild"]);
        assert_eq!(handler.state().closed, 1);
    }

    #[test]
    fn test_number_or_string() {
        assert_eq!(number_or_string("42"), json!(42));
        assert_eq!(number_or_string("-1.5"), json!(-1.5));
        assert_eq!(number_or_string("NaN"), json!("NaN"));
        assert_eq!(number_or_string("abc"), json!("abc"));
    }

    #[test]
    fn test_defaults_for_missing_numbers() {
        let attrs: Attributes = [("money", "12.7"), ("bad", "x")].into_iter().collect();
        assert_eq!(int_or_zero(&attrs, "money"), 12);
        assert_eq!(int_or_zero(&attrs, "bad"), 0);
        assert_eq!(int_or_zero(&attrs, "missing"), 0);
        assert_eq!(float_or_zero(&attrs, "missing"), 0.0);
    }

    #[test]
    fn test_default_handler_names_are_unique() {
        let handlers = default_handlers(&ExtractorConfig::default());
        let mut names: Vec<&str> = handlers.iter().map(|h| h.name()).collect();
        let total = names.len();
        names.sort();
        names.dedup();
        assert_eq!(names.len(), total);
    }
}
