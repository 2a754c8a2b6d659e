//! Small helpers shared by the pipeline stages.
//!
//! - String truncation for log lines that would otherwise carry whole pages
//! - Parent directory creation for staging files and the article database

use crate::error::{Error, Result};
use std::path::Path;
use tokio::fs;
use tracing::{debug, instrument};

/// Cut `s` to at most `max` bytes (on a char boundary) and note what was dropped.
pub fn truncate_for_log(s: &str, max: usize) -> String {
    if s.len() <= max {
        return s.to_string();
    }
    let mut end = max;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}…(+{} bytes)", &s[..end], s.len() - end)
}

/// Create the directory that will hold `path`, if it has one.
#[instrument(level = "debug", skip_all, fields(path = %path.display()))]
pub async fn ensure_parent_dir(path: &Path) -> Result<()> {
    let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) else {
        return Ok(());
    };
    fs::create_dir_all(parent)
        .await
        .map_err(|e| Error::io(parent, e))?;
    debug!("Parent directory ready");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_for_log_short_string() {
        let s = "Hello, world!";
        assert_eq!(truncate_for_log(s, 100), "Hello, world!");
    }

    #[test]
    fn test_truncate_for_log_long_string() {
        let s = "a".repeat(500);
        let result = truncate_for_log(&s, 100);
        assert!(result.starts_with(&"a".repeat(100)));
        assert!(result.contains("…(+400 bytes)"));
    }

    #[test]
    fn test_truncate_for_log_respects_char_boundaries() {
        // "é" is two bytes; cutting at 1 would split it.
        assert_eq!(truncate_for_log("éa", 1), "…(+3 bytes)");
        assert_eq!(truncate_for_log("aé", 2), "a…(+2 bytes)");
    }

    #[tokio::test]
    async fn test_ensure_parent_dir() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("a/b/c.jsonl");
        ensure_parent_dir(&file).await.unwrap();
        assert!(dir.path().join("a/b").is_dir());
        ensure_parent_dir(Path::new("bare.jsonl")).await.unwrap();
    }
}
