use serde::{Deserialize, Serialize};

/// Ordered attribute list captured from one opening tag.
///
/// Keys keep the position of their first occurrence; a repeated key
/// overwrites the value in place.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attributes {
    pairs: Vec<(String, String)>,
}

impl Attributes {
    /// Create an empty attribute list
    pub fn new() -> Self {
        Self { pairs: Vec::new() }
    }

    /// Insert a pair, keeping first-seen order and last-seen value
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        match self.pairs.iter_mut().find(|(k, _)| *k == key) {
            Some(slot) => slot.1 = value,
            None => self.pairs.push((key, value)),
        }
    }

    /// Get the value of an attribute
    pub fn get(&self, key: &str) -> Option<&str> {
        self.pairs
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Get the value of an attribute or an empty string
    pub fn get_or_empty(&self, key: &str) -> &str {
        self.get(key).unwrap_or("")
    }

    /// Iterate over the pairs in first-seen order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.pairs.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Attributes {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut attrs = Attributes::new();
        for (k, v) in iter {
            attrs.insert(k, v);
        }
        attrs
    }
}

/// One tag found on an input line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TagToken {
    /// `<name ...>` or `<name .../>`
    Open {
        /// Tag name
        name: String,
        /// Attributes found on the line
        attrs: Attributes,
        /// Whether the tag closes itself (`/>`)
        self_closing: bool,
    },
    /// `</name>`
    Close {
        /// Tag name
        name: String,
    },
}

impl TagToken {
    /// Name of the tag, for both opening and closing tokens
    pub fn name(&self) -> &str {
        match self {
            TagToken::Open { name, .. } | TagToken::Close { name } => name,
        }
    }
}

/// Declarative rule deciding which tag paths belong to a section
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TagPathSpec {
    /// Matches when the current path starts with these segments
    Prefix(Vec<String>),
    /// Matches when the last path segment is `tag` and every attribute
    /// predicate holds on the current line
    Predicate {
        /// Required tag name of the last segment
        tag: String,
        /// Required `attribute == value` pairs
        attrs: Vec<(String, String)>,
    },
}
