use anyhow::{Context, Result};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::persist;

/// Category names mapped to every URL ever saved under them, in submission
/// order. Categories sort alphabetically so the JSON file diffs cleanly.
pub type LinkMap = BTreeMap<String, Vec<String>>;

/// On-disk registry of saved links. The whole map is read and rewritten on
/// every save; the file is small and the rewrite keeps it human-editable.
pub struct LinkRegistry {
    path: PathBuf,
}

impl LinkRegistry {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads the registry. A missing file is an empty registry; a file that
    /// exists but cannot be read or parsed is an error.
    pub fn load(&self) -> Result<LinkMap> {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                return Ok(LinkMap::new());
            }
            Err(err) => {
                return Err(err).with_context(|| {
                    format!("Failed to read link registry: {}", self.path.display())
                });
            }
        };
        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse link registry: {}", self.path.display()))
    }

    /// Appends the URLs to the category, creating it on first use, and
    /// rewrites the file. Repeated URLs are kept; deduplication is left to
    /// whoever consumes the registry.
    pub fn save(&self, category: &str, urls: &[String]) -> Result<()> {
        let mut links = self.load()?;
        links
            .entry(category.to_string())
            .or_default()
            .extend(urls.iter().cloned());
        let json =
            serde_json::to_string_pretty(&links).context("Failed to serialize link registry")?;
        persist::write_atomic(&self.path, json.as_bytes())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry_in(dir: &tempfile::TempDir) -> LinkRegistry {
        LinkRegistry::new(dir.path().join("saved_links.json"))
    }

    fn urls(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_load_missing_file_is_empty() {
        let dir = tempfile::TempDir::new().unwrap();
        let registry = registry_in(&dir);
        assert!(registry.load().unwrap().is_empty());
    }

    #[test]
    fn test_save_appends_to_existing_category() {
        let dir = tempfile::TempDir::new().unwrap();
        let registry = registry_in(&dir);
        registry.save("news", &urls(&["http://a.example/1"])).unwrap();
        registry.save("news", &urls(&["http://a.example/2"])).unwrap();
        let links = registry.load().unwrap();
        assert_eq!(
            links["news"],
            urls(&["http://a.example/1", "http://a.example/2"])
        );
    }

    #[test]
    fn test_save_keeps_duplicate_urls() {
        let dir = tempfile::TempDir::new().unwrap();
        let registry = registry_in(&dir);
        registry.save("news", &urls(&["http://a.example/1"])).unwrap();
        registry.save("news", &urls(&["http://a.example/1"])).unwrap();
        assert_eq!(registry.load().unwrap()["news"].len(), 2);
    }

    #[test]
    fn test_save_preserves_other_categories() {
        let dir = tempfile::TempDir::new().unwrap();
        let registry = registry_in(&dir);
        registry.save("news", &urls(&["http://a.example/1"])).unwrap();
        registry.save("recipes", &urls(&["http://b.example/1"])).unwrap();
        let links = registry.load().unwrap();
        assert_eq!(links.len(), 2);
        assert_eq!(links["news"], urls(&["http://a.example/1"]));
        assert_eq!(links["recipes"], urls(&["http://b.example/1"]));
    }

    #[test]
    fn test_categories_differing_in_whitespace_are_distinct() {
        let dir = tempfile::TempDir::new().unwrap();
        let registry = registry_in(&dir);
        registry.save("news", &urls(&["http://a.example/1"])).unwrap();
        registry.save("news ", &urls(&["http://a.example/2"])).unwrap();
        let links = registry.load().unwrap();
        assert_eq!(links.len(), 2);
        assert_eq!(links["news"], urls(&["http://a.example/1"]));
        assert_eq!(links["news "], urls(&["http://a.example/2"]));
    }

    #[test]
    fn test_file_is_pretty_printed_with_sorted_keys() {
        let dir = tempfile::TempDir::new().unwrap();
        let registry = registry_in(&dir);
        registry.save("zebra", &urls(&["http://z.example"])).unwrap();
        registry.save("apple", &urls(&["http://a.example"])).unwrap();
        let content = std::fs::read_to_string(registry.path()).unwrap();
        assert!(content.contains("\n  \"apple\""));
        let apple = content.find("\"apple\"").unwrap();
        let zebra = content.find("\"zebra\"").unwrap();
        assert!(apple < zebra);
    }

    #[test]
    fn test_corrupt_file_is_an_error() {
        let dir = tempfile::TempDir::new().unwrap();
        let registry = registry_in(&dir);
        std::fs::write(registry.path(), "not json").unwrap();
        let err = registry.load().unwrap_err();
        assert!(err.to_string().contains("Failed to parse link registry"));
    }
}
