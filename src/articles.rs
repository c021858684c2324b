use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

use crate::fetch::PageFetcher;

/// What happened to one URL during an article run. `file` is the path the
/// text landed in, or `None` when the server refused the page and the URL
/// was skipped.
#[derive(Debug, Clone)]
pub struct ArticleOutcome {
    pub position: usize,
    pub url: String,
    pub file: Option<PathBuf>,
}

impl ArticleOutcome {
    pub fn is_stored(&self) -> bool {
        self.file.is_some()
    }
}

/// File name for the article at a position in the submitted URL list.
/// Positions restart at zero every run, so a later run with fewer URLs
/// overwrites the early slots and leaves stale files behind in the rest.
pub fn article_file_name(position: usize) -> String {
    format!("article_{}.txt", position)
}

/// Fetches each URL in order and writes the text to `article_<n>.txt` under
/// `dir`. Skipped URLs produce no file but keep their position, so the
/// mapping from file name back to URL stays readable. A page with no
/// paragraphs still produces its (empty) file.
pub async fn store_articles(
    fetcher: &PageFetcher,
    urls: &[String],
    dir: &Path,
) -> Result<Vec<ArticleOutcome>> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create article directory: {}", dir.display()))?;

    let mut outcomes = Vec::with_capacity(urls.len());
    for (position, url) in urls.iter().enumerate() {
        let file = match fetcher.fetch(url).await? {
            Some(text) => {
                let path = dir.join(article_file_name(position));
                std::fs::write(&path, &text)
                    .with_context(|| format!("Failed to write article: {}", path.display()))?;
                Some(path)
            }
            None => None,
        };
        outcomes.push(ArticleOutcome {
            position,
            url: url.clone(),
            file,
        });
    }
    Ok(outcomes)
}
