//! Tag path matching and tag extraction from raw save lines.
//!
//! The save format is close enough to XML that a line usually holds exactly
//! one tag, but nothing here relies on that: [`tokenize_line`] returns every
//! tag found on a line, in order. Text content, comments and processing
//! instructions are dropped.

pub mod types;
mod tokenizer;

pub use tokenizer::{extract_attributes, tokenize_line, unescape};
pub use types::*;

/// Root tag of a full save. Prefix specs written without it also match
/// beneath it, so `info` matches both `info` and `savegame.info`.
pub const DOCUMENT_ROOT: &str = "savegame";

impl TagPathSpec {
    /// Build a prefix spec from a dot-joined path such as `universe.factions`
    pub fn parse(path: &str) -> Self {
        TagPathSpec::Prefix(
            path.split('.')
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect(),
        )
    }

    /// Build a predicate spec for `tag` with the given attribute predicates
    pub fn predicate<I, K, V>(tag: &str, attrs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        TagPathSpec::Predicate {
            tag: tag.to_string(),
            attrs: attrs.into_iter().map(|(k, v)| (k.into(), v.into())).collect(),
        }
    }

    /// Whether this is a predicate path (may match at any depth)
    pub fn is_predicate(&self) -> bool {
        matches!(self, TagPathSpec::Predicate { .. })
    }

    /// Check this path against the current path stack and the attributes of
    /// the line that produced the last segment.
    pub fn matches(&self, path: &[String], attrs: &Attributes) -> bool {
        match self {
            TagPathSpec::Prefix(segments) => {
                let rooted = segments.first().is_some_and(|s| s == DOCUMENT_ROOT);
                let path = match path.split_first() {
                    Some((root, rest)) if root == DOCUMENT_ROOT && !rooted => rest,
                    _ => path,
                };
                !segments.is_empty()
                    && path.len() >= segments.len()
                    && segments.iter().zip(path).all(|(want, have)| want == have)
            }
            TagPathSpec::Predicate { tag, attrs: predicates } => {
                path.last().is_some_and(|last| last == tag)
                    && predicates
                        .iter()
                        .all(|(k, v)| attrs.get(k) == Some(v.as_str()))
            }
        }
    }
}

impl std::fmt::Display for TagPathSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TagPathSpec::Prefix(segments) => write!(f, "{}", segments.join(".")),
            TagPathSpec::Predicate { tag, attrs } => {
                write!(f, "{}", tag)?;
                for (k, v) in attrs {
                    write!(f, "[{}={}]", k, v)?;
                }
                Ok(())
            }
        }
    }
}

/// Check a tag name against an ignore set. Entries ending in `*` match by
/// prefix (`terraforming*`).
pub fn is_ignored(name: &str, ignore: &[String]) -> bool {
    ignore.iter().any(|pattern| match pattern.strip_suffix('*') {
        Some(prefix) => name.starts_with(prefix),
        None => name == pattern,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn path(p: &str) -> Vec<String> {
        p.split('.').map(str::to_string).collect()
    }

    #[test]
    fn test_prefix_spec_matches_on_segment_boundary() {
        let spec = TagPathSpec::parse("savegame.log");
        let empty = Attributes::new();

        assert!(spec.matches(&path("savegame.log"), &empty));
        assert!(spec.matches(&path("savegame.log.entry"), &empty));
        assert!(!spec.matches(&path("savegame.logbook"), &empty));
        assert!(!spec.matches(&path("savegame"), &empty));
        assert!(!spec.matches(&path("other.log"), &empty));
    }

    #[test]
    fn test_prefix_spec_with_optional_document_root() {
        let spec = TagPathSpec::parse("universe.factions");
        let empty = Attributes::new();

        assert!(spec.matches(&path("universe.factions"), &empty));
        assert!(spec.matches(&path("savegame.universe.factions.faction"), &empty));
        assert!(!spec.matches(&path("savegame"), &empty));
        assert!(!spec.matches(&path("savegame.md.universe.factions"), &empty));
        assert!(!spec.matches(&path("other.universe.factions"), &empty));
    }

    #[test]
    fn test_predicate_spec_requires_tag_and_all_attributes() {
        let spec = TagPathSpec::predicate("component", [("class", "player"), ("owner", "player")]);
        let p = path("savegame.universe.component.connections.connection.component");

        let both: Attributes = [("class", "player"), ("owner", "player")].into_iter().collect();
        let partial: Attributes = [("class", "player")].into_iter().collect();
        let wrong: Attributes = [("class", "player"), ("owner", "argon")].into_iter().collect();

        assert!(spec.matches(&p, &both));
        assert!(!spec.matches(&p, &partial));
        assert!(!spec.matches(&p, &wrong));
        assert!(!spec.matches(&path("savegame.universe.component.connections"), &both));
    }

    #[test]
    fn test_predicate_without_attributes_matches_any_depth() {
        let spec = TagPathSpec::predicate("blueprints", Vec::<(String, String)>::new());
        let empty = Attributes::new();
        assert!(spec.matches(&path("a.b.c.blueprints"), &empty));
        assert!(!spec.matches(&path("a.blueprints.blueprint"), &empty));
    }

    #[test]
    fn test_ignore_set_wildcards() {
        let ignore = vec!["script".to_string(), "terraforming*".to_string()];
        assert!(is_ignored("script", &ignore));
        assert!(is_ignored("terraformingprojects", &ignore));
        assert!(!is_ignored("scripts", &ignore));
        assert!(!is_ignored("log", &ignore));
    }

    #[test]
    fn test_spec_display() {
        assert_eq!(TagPathSpec::parse("savegame.universe.factions").to_string(), "savegame.universe.factions");
        assert_eq!(
            TagPathSpec::predicate("component", [("class", "player")]).to_string(),
            "component[class=player]"
        );
    }
}
