use serde_json::{Map, Value};

use super::{ChildRoutes, RoutedHandler, SectionState, attributes_to_object};
use crate::matcher::{Attributes, TagPathSpec};

/// An enclosing tag whose attribute is copied onto every record inside it
#[derive(Debug, Clone)]
pub struct RecordGroup {
    /// Relative path of the grouping tag
    pub path: String,
    /// Attribute copied from the grouping tag
    pub attribute: String,
}

impl RecordGroup {
    pub fn new(path: &str, attribute: &str) -> Self {
        Self {
            path: path.to_string(),
            attribute: attribute.to_string(),
        }
    }
}

/// Ordered list of records, one per repeating child tag
#[derive(Debug)]
pub struct RecordListState {
    group: Option<RecordGroup>,
    numeric: Vec<String>,
    group_value: Option<String>,
    current: Option<Map<String, Value>>,
    records: Vec<Value>,
}

impl RecordListState {
    fn open_group(&mut self, attrs: &Attributes) {
        if let Some(group) = &self.group {
            self.group_value = attrs.get(&group.attribute).map(str::to_string);
        }
    }

    fn close_group(&mut self) {
        self.group_value = None;
    }

    fn open_record(&mut self, attrs: &Attributes) {
        let mut record = attributes_to_object(attrs, &self.numeric);
        if let (Some(group), Some(value)) = (&self.group, &self.group_value) {
            record
                .entry(group.attribute.clone())
                .or_insert_with(|| Value::String(value.clone()));
        }
        self.current = Some(record);
    }

    fn close_record(&mut self) {
        if let Some(record) = self.current.take() {
            self.records.push(Value::Object(record));
        }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl SectionState for RecordListState {
    fn take(&mut self) -> Value {
        self.current = None;
        self.group_value = None;
        Value::Array(std::mem::take(&mut self.records))
    }
}

/// Handler collecting one record per `record_path` child of `section_path`
pub fn record_list_handler(
    name: &str,
    section_path: &str,
    record_path: &str,
    group: Option<RecordGroup>,
    numeric: &[String],
) -> RoutedHandler<RecordListState> {
    let mut routes = ChildRoutes::new()
        .on_open(record_path, RecordListState::open_record)
        .on_close(record_path, RecordListState::close_record);
    if let Some(group) = &group {
        routes = routes
            .on_open(&group.path, RecordListState::open_group)
            .on_close(&group.path, RecordListState::close_group);
    }

    let state = RecordListState {
        group,
        numeric: numeric.to_vec(),
        group_value: None,
        current: None,
        records: Vec::new(),
    };
    RoutedHandler::new(name, TagPathSpec::parse(section_path), routes, state)
}
