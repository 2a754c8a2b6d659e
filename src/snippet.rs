//! Field lookup inside nested API snippets.
//!
//! News APIs disagree on where they put the article URL and title: some keep
//! them at the top level, others bury them under `meta`, `links` or arrays of
//! variants. [`extract`] walks the whole tree breadth-first, so the shallowest
//! occurrence of a key wins and sibling branches are never skipped.
//!
//! Traversal order: the keys of the current object first, then each nested
//! object or array of the next depth, level by level. Within one object,
//! children are visited in `serde_json::Map` order (sorted by key).

use crate::error::{Error, Result};
use serde_json::Value;
use std::collections::VecDeque;

/// First value stored under `field`, searching breadth-first.
pub fn extract<'a>(snippet: &'a Value, field: &str) -> Result<&'a Value> {
    let mut queue: VecDeque<&Value> = VecDeque::new();
    queue.push_back(snippet);

    while let Some(node) = queue.pop_front() {
        match node {
            Value::Object(map) => {
                if let Some(value) = map.get(field) {
                    return Ok(value);
                }
                queue.extend(map.values().filter(|v| is_container(v)));
            }
            Value::Array(items) => queue.extend(items.iter().filter(|v| is_container(v))),
            _ => {}
        }
    }

    Err(Error::FieldNotFound(field.to_string()))
}

/// Like [`extract`], but the value must be a JSON string.
pub fn extract_str<'a>(snippet: &'a Value, field: &str) -> Result<&'a str> {
    extract(snippet, field)?
        .as_str()
        .ok_or_else(|| Error::FieldNotFound(field.to_string()))
}

/// Top-level `language` code of a snippet, if present.
pub fn language(snippet: &Value) -> Option<&str> {
    snippet.get("language").and_then(Value::as_str)
}

fn is_container(value: &Value) -> bool {
    value.is_object() || value.is_array()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_top_level_field() {
        let snippet = json!({"url": "https://yahoo.com/news/x", "title": "T", "language": "en"});
        assert_eq!(extract_str(&snippet, "url").unwrap(), "https://yahoo.com/news/x");
        assert_eq!(extract_str(&snippet, "title").unwrap(), "T");
    }

    #[test]
    fn test_nested_field() {
        let snippet = json!({"language": "en", "meta": {"links": {"url": "https://a.com/1"}}});
        assert_eq!(extract_str(&snippet, "url").unwrap(), "https://a.com/1");
    }

    #[test]
    fn test_searches_every_branch() {
        // Single-branch descent would give up after exploring "author".
        let snippet = json!({
            "author": {"name": "someone"},
            "source": {"info": {"url": "https://b.com/2"}}
        });
        assert_eq!(extract_str(&snippet, "url").unwrap(), "https://b.com/2");
    }

    #[test]
    fn test_shallowest_match_wins() {
        let snippet = json!({
            "a": {"b": {"title": "deep"}},
            "z": {"title": "shallow"}
        });
        assert_eq!(extract_str(&snippet, "title").unwrap(), "shallow");
    }

    #[test]
    fn test_descends_into_arrays() {
        let snippet = json!({"variants": [{"lang": "fr"}, {"url": "https://c.com/3"}]});
        assert_eq!(extract_str(&snippet, "url").unwrap(), "https://c.com/3");
    }

    #[test]
    fn test_missing_field() {
        let snippet = json!({"title": "T", "meta": {"x": 1}});
        let err = extract(&snippet, "url").unwrap_err();
        assert!(matches!(err, Error::FieldNotFound(f) if f == "url"));
    }

    #[test]
    fn test_scalar_root() {
        assert!(extract(&json!("url"), "url").is_err());
        assert!(extract(&json!(null), "url").is_err());
    }

    #[test]
    fn test_non_string_value() {
        let snippet = json!({"url": 42});
        assert!(extract(&snippet, "url").is_ok());
        assert!(matches!(extract_str(&snippet, "url"), Err(Error::FieldNotFound(_))));
    }

    #[test]
    fn test_language() {
        assert_eq!(language(&json!({"language": "en"})), Some("en"));
        assert_eq!(language(&json!({"meta": {"language": "en"}})), None);
        assert_eq!(language(&json!({"language": null})), None);
    }
}
