use once_cell::sync::Lazy;
use regex::Regex;

use super::types::{Attributes, TagToken};

/// `name="value"`; values may hold `>` but no unescaped quote
static ATTRIBUTE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"([A-Za-z_][\w:.\-]*)\s*=\s*"([^"]*)""#).expect("attribute pattern is valid")
});

/// Capture every `name="value"` pair on a line.
///
/// Pairs come back in first-seen order; a repeated name keeps its last
/// value. Values are XML-unescaped.
pub fn extract_attributes(line: &str) -> Attributes {
    let mut attrs = Attributes::new();
    for caps in ATTRIBUTE_RE.captures_iter(line) {
        attrs.insert(&caps[1], unescape(&caps[2]));
    }
    attrs
}

/// Split one line into the tags it contains.
///
/// An opening tag whose `>` is not on this line is returned as an open tag
/// carrying whatever attributes the line holds. Multi-line opening tags are
/// not supported beyond that.
pub fn tokenize_line(line: &str) -> Vec<TagToken> {
    let bytes = line.as_bytes();
    let mut tokens = Vec::new();
    let mut pos = 0;

    while let Some(offset) = line[pos..].find('<') {
        let start = pos + offset;
        let rest = &line[start + 1..];

        if rest.starts_with("!--") {
            pos = match rest.find("-->") {
                Some(end) => start + 1 + end + 3,
                None => break,
            };
            continue;
        }
        if rest.starts_with('!') || rest.starts_with('?') {
            pos = match rest.find('>') {
                Some(end) => start + 1 + end + 1,
                None => break,
            };
            continue;
        }

        if let Some(close) = rest.strip_prefix('/') {
            let name_len = tag_name_len(close);
            if name_len == 0 {
                pos = start + 1;
                continue;
            }
            tokens.push(TagToken::Close { name: close[..name_len].to_string() });
            pos = match close.find('>') {
                Some(end) => start + 2 + end + 1,
                None => break,
            };
            continue;
        }

        let name_len = tag_name_len(rest);
        if name_len == 0 {
            pos = start + 1;
            continue;
        }
        let name = rest[..name_len].to_string();

        // find the terminating '>' outside quoted values
        let body_start = start + 1 + name_len;
        let mut in_quotes = false;
        let mut end = None;
        for (i, &b) in bytes[body_start..].iter().enumerate() {
            match b {
                b'"' => in_quotes = !in_quotes,
                b'>' if !in_quotes => {
                    end = Some(body_start + i);
                    break;
                }
                _ => {}
            }
        }

        match end {
            Some(end) => {
                let body = &line[body_start..end];
                let self_closing = body.trim_end().ends_with('/');
                tokens.push(TagToken::Open {
                    name,
                    attrs: extract_attributes(body),
                    self_closing,
                });
                pos = end + 1;
            }
            None => {
                tokens.push(TagToken::Open {
                    name,
                    attrs: extract_attributes(&line[body_start..]),
                    self_closing: false,
                });
                break;
            }
        }
    }

    tokens
}

fn tag_name_len(s: &str) -> usize {
    let mut chars = s.char_indices();
    match chars.next() {
        Some((_, c)) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return 0,
    }
    chars
        .find(|(_, c)| !(c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.' | ':')))
        .map(|(i, _)| i)
        .unwrap_or(s.len())
}

/// Resolve the XML entities used in attribute values
pub fn unescape(value: &str) -> String {
    if !value.contains('&') {
        return value.to_string();
    }

    let mut out = String::with_capacity(value.len());
    let mut rest = value;
    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        let tail = &rest[amp..];
        let Some(semi) = tail.find(';') else {
            out.push_str(tail);
            return out;
        };
        let entity = &tail[1..semi];
        let decoded = match entity {
            "quot" => Some('"'),
            "amp" => Some('&'),
            "lt" => Some('<'),
            "gt" => Some('>'),
            "apos" => Some('\''),
            _ => entity
                .strip_prefix("#x")
                .or_else(|| entity.strip_prefix("#X"))
                .and_then(|hex| u32::from_str_radix(hex, 16).ok())
                .or_else(|| entity.strip_prefix('#').and_then(|dec| dec.parse().ok()))
                .and_then(char::from_u32),
        };
        match decoded {
            Some(c) => {
                out.push(c);
                rest = &tail[semi + 1..];
            }
            None => {
                out.push('&');
                rest = &tail[1..];
            }
        }
    }
    out.push_str(rest);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn pairs(attrs: &Attributes) -> Vec<(String, String)> {
        attrs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[test]
    fn test_extract_attributes_in_order() {
        let attrs = extract_attributes(r#"<tag a="1" b="2">"#);
        assert_eq!(
            pairs(&attrs),
            vec![("a".to_string(), "1".to_string()), ("b".to_string(), "2".to_string())]
        );
    }

    #[test]
    fn test_duplicate_attribute_keeps_last_value() {
        let attrs = extract_attributes(r#"<tag a="1" a="2">"#);
        assert_eq!(pairs(&attrs), vec![("a".to_string(), "2".to_string())]);
    }

    #[test]
    fn test_duplicate_keeps_first_position() {
        let attrs = extract_attributes(r#"<tag a="1" b="2" a="3">"#);
        let keys: Vec<&str> = attrs.iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["a", "b"]);
        assert_eq!(attrs.get("a"), Some("3"));
    }

    #[test]
    fn test_values_may_contain_angle_brackets() {
        let tokens = tokenize_line(r#"<entry title="a > b" text="x"/>"#);
        assert_eq!(tokens.len(), 1);
        match &tokens[0] {
            TagToken::Open { name, attrs, self_closing } => {
                assert_eq!(name, "entry");
                assert_eq!(attrs.get("title"), Some("a > b"));
                assert_eq!(attrs.get("text"), Some("x"));
                assert!(*self_closing);
            }
            other => panic!("unexpected token {:?}", other),
        }
    }

    #[test]
    fn test_tokenize_open_close_and_compact_lines() {
        let tokens = tokenize_line(r#"<info><save name="X" date="123"/></info>"#);
        let names: Vec<&str> = tokens.iter().map(TagToken::name).collect();
        assert_eq!(names, vec!["info", "save", "info"]);
        assert!(matches!(tokens[0], TagToken::Open { self_closing: false, .. }));
        assert!(matches!(tokens[1], TagToken::Open { self_closing: true, .. }));
        assert!(matches!(tokens[2], TagToken::Close { .. }));
    }

    #[test]
    fn test_tokenize_skips_declarations_comments_and_text() {
        assert!(tokenize_line(r#"<?xml version="1.0" encoding="UTF-8"?>"#).is_empty());
        assert!(tokenize_line("<!-- <log> -->").is_empty());
        assert!(tokenize_line("   plain text with a < b   ").is_empty());
    }

    #[test]
    fn test_unterminated_open_tag_is_reported_open() {
        let tokens = tokenize_line(r#"  <component class="ship_s" id="[0x1]""#);
        assert_eq!(tokens.len(), 1);
        match &tokens[0] {
            TagToken::Open { attrs, self_closing, .. } => {
                assert!(!self_closing);
                assert_eq!(attrs.get("class"), Some("ship_s"));
            }
            other => panic!("unexpected token {:?}", other),
        }
    }

    #[test]
    fn test_unescape_entities() {
        assert_eq!(unescape("Location: A&#10;Commander: B"), "Location: A\nCommander: B");
        assert_eq!(unescape("&quot;x&quot; &amp; &lt;y&gt; &#x41;"), "\"x\" & <y> A");
        assert_eq!(unescape("broken & entity"), "broken & entity");
        assert_eq!(unescape("&unknown;"), "&unknown;");
    }
}
