use std::collections::HashMap;

use serde_json::Value;

use super::types::CategorySummary;
use super::{DerivationStep, SectionStore, f64_field, str_field, to_records};
use crate::types::DerivationConfig;

/// Group the event log by category, most frequent first
pub fn categorize_log(log: &Value, config: &DerivationConfig) -> Vec<CategorySummary> {
    let Some(entries) = log.as_array() else {
        return Vec::new();
    };

    let mut groups: HashMap<&str, CategorySummary> = HashMap::new();
    for entry in entries {
        let category = str_field(entry, "category");
        let time = f64_field(entry, "time");
        let summary = groups.entry(category).or_insert_with(|| CategorySummary {
            category: category.to_string(),
            label: config
                .category_labels
                .get(category)
                .cloned()
                .unwrap_or_else(|| category.to_string()),
            count: 0,
            first_time: time,
            last_time: time,
        });
        summary.count += 1;
        summary.first_time = summary.first_time.min(time);
        summary.last_time = summary.last_time.max(time);
    }

    let mut summaries: Vec<CategorySummary> = groups.into_values().collect();
    summaries.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.category.cmp(&b.category)));
    summaries
}

pub struct LogCategories;

impl DerivationStep for LogCategories {
    fn id(&self) -> &'static str {
        "log-categories"
    }

    fn derive(&self, sections: &SectionStore, config: &DerivationConfig) -> Vec<Value> {
        match sections.data("log") {
            Some(log) => to_records(categorize_log(&log, config)),
            None => Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_categories_counted_and_labelled() {
        let log = json!([
            { "time": 30, "category": "trade" },
            { "time": 10, "category": "trade" },
            { "time": 20, "category": "upkeep" },
            { "time": 40, "category": "custom_event" },
            { "time": 50, "category": "trade" },
        ]);

        let categories = categorize_log(&log, &DerivationConfig::default());
        let order: Vec<(&str, &str, usize)> = categories
            .iter()
            .map(|c| (c.category.as_str(), c.label.as_str(), c.count))
            .collect();
        assert_eq!(
            order,
            vec![("trade", "Trade", 3), ("custom_event", "custom_event", 1), ("upkeep", "Upkeep", 1)]
        );
        assert_eq!(categories[0].first_time, 10.0);
        assert_eq!(categories[0].last_time, 50.0);
    }
}
