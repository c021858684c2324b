use anyhow::{bail, Context, Result};
use globset::{Glob, GlobSet, GlobSetBuilder};
use std::path::Path;
use walkdir::WalkDir;

/// One article file loaded from the article directory. `name` is the path
/// relative to that directory and doubles as the document id in the index.
#[derive(Debug, Clone)]
pub struct ArticleDoc {
    pub name: String,
    pub body: String,
}

/// Loads every file under `dir` whose relative path matches one of the
/// include globs, sorted by name for deterministic indexing. An empty
/// result is an error: indexing nothing would silently produce an index
/// that can never answer anything.
pub fn load_articles(dir: &Path, include_globs: &[String]) -> Result<Vec<ArticleDoc>> {
    if !dir.exists() {
        bail!("Article directory does not exist: {}", dir.display());
    }

    let include_set = build_globset(include_globs)?;

    let mut docs = Vec::new();
    for entry in WalkDir::new(dir) {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }

        let path = entry.path();
        let relative = path.strip_prefix(dir).unwrap_or(path);
        let rel_str = relative.to_string_lossy().to_string();

        if !include_set.is_match(&rel_str) {
            continue;
        }

        let body = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read article: {}", path.display()))?;
        docs.push(ArticleDoc {
            name: rel_str,
            body,
        });
    }

    // Sort for deterministic ordering
    docs.sort_by(|a, b| a.name.cmp(&b.name));

    if docs.is_empty() {
        bail!("No articles found under {}", dir.display());
    }

    Ok(docs)
}

fn build_globset(patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        builder.add(Glob::new(pattern)?);
    }
    Ok(builder.build()?)
}
