//! Retrieval index construction and querying.
//!
//! [`IndexBuilder`] turns a directory of article files into a
//! [`RetrievalIndex`]; both sides are traits so the question pipeline can
//! run against a fake index in tests. The real implementation embeds every
//! non-empty chunk of every article and scores queries by cosine similarity.
//!
//! Each build starts from scratch: the whole article directory is reloaded,
//! re-chunked, and re-embedded, and the previous snapshot is replaced. With
//! a handful of articles per run that costs little and guarantees the index
//! never drifts from the files on disk.

use anyhow::{bail, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::chunk::chunk_text;
use crate::embedding::{cosine_similarity, embed_query, EmbeddingProvider};
use crate::loader::load_articles;
use crate::persist;

/// File name of the snapshot written into the index directory.
pub const INDEX_FILE: &str = "index.json";

/// A retrieved piece of article text with its similarity score.
#[derive(Debug, Clone)]
pub struct Passage {
    pub article: String,
    pub chunk_index: usize,
    pub text: String,
    pub score: f64,
}

/// Builds a queryable index over a directory of article files.
#[async_trait]
pub trait IndexBuilder: Send + Sync {
    async fn build(&self, articles_dir: &Path) -> Result<Box<dyn RetrievalIndex>>;
}

/// A built index that can return the passages most similar to a question.
#[async_trait]
pub trait RetrievalIndex: Send + Sync {
    async fn retrieve(&self, question: &str, top_k: usize) -> Result<Vec<Passage>>;
}

#[derive(Debug, Serialize, Deserialize)]
struct StoredPassage {
    article: String,
    chunk_index: usize,
    text: String,
    embedding: Vec<f32>,
}

#[derive(Debug, Serialize, Deserialize)]
struct IndexSnapshot {
    model: String,
    dims: usize,
    built_at: String,
    articles: usize,
    passages: Vec<StoredPassage>,
}

fn default_include_globs() -> Vec<String> {
    vec!["**/*.txt".to_string()]
}

/// [`IndexBuilder`] that chunks articles, embeds each chunk through the
/// configured provider, and persists the result as a JSON snapshot under
/// the index directory.
pub struct VectorIndexBuilder {
    provider: Arc<dyn EmbeddingProvider>,
    index_dir: PathBuf,
    max_tokens: usize,
    batch_size: usize,
}

impl VectorIndexBuilder {
    pub fn new(
        provider: Arc<dyn EmbeddingProvider>,
        index_dir: PathBuf,
        max_tokens: usize,
        batch_size: usize,
    ) -> Self {
        Self {
            provider,
            index_dir,
            max_tokens,
            batch_size,
        }
    }
}

#[async_trait]
impl IndexBuilder for VectorIndexBuilder {
    async fn build(&self, articles_dir: &Path) -> Result<Box<dyn RetrievalIndex>> {
        let docs = load_articles(articles_dir, &default_include_globs())?;

        let mut pending: Vec<(String, usize, String)> = Vec::new();
        for doc in &docs {
            for chunk in chunk_text(&doc.body, self.max_tokens) {
                // Paragraph-less pages store empty article files, and hosted
                // embedding APIs reject empty input. The article still counts
                // in the snapshot; it just contributes no passages.
                if chunk.text.is_empty() {
                    continue;
                }
                pending.push((doc.name.clone(), chunk.index, chunk.text));
            }
        }

        let mut passages = Vec::with_capacity(pending.len());
        for batch in pending.chunks(self.batch_size.max(1)) {
            let texts: Vec<String> = batch.iter().map(|(_, _, text)| text.clone()).collect();
            let vectors = self.provider.embed(&texts).await?;
            if vectors.len() != batch.len() {
                bail!(
                    "Embedding count mismatch: sent {} texts, got {} vectors",
                    batch.len(),
                    vectors.len()
                );
            }
            for ((article, chunk_index, text), embedding) in batch.iter().zip(vectors) {
                passages.push(StoredPassage {
                    article: article.clone(),
                    chunk_index: *chunk_index,
                    text: text.clone(),
                    embedding,
                });
            }
        }

        let snapshot = IndexSnapshot {
            model: self.provider.model_name().to_string(),
            dims: self.provider.dims(),
            built_at: chrono::Utc::now().to_rfc3339(),
            articles: docs.len(),
            passages,
        };

        let path = self.index_dir.join(INDEX_FILE);
        let json = serde_json::to_vec(&snapshot)?;
        persist::write_atomic(&path, &json)?;

        Ok(Box::new(VectorIndex {
            provider: Arc::clone(&self.provider),
            passages: snapshot.passages,
        }))
    }
}

/// In-memory cosine-similarity index over embedded passages.
pub struct VectorIndex {
    provider: Arc<dyn EmbeddingProvider>,
    passages: Vec<StoredPassage>,
}

#[async_trait]
impl RetrievalIndex for VectorIndex {
    async fn retrieve(&self, question: &str, top_k: usize) -> Result<Vec<Passage>> {
        let query = embed_query(self.provider.as_ref(), question).await?;

        let mut results: Vec<Passage> = self
            .passages
            .iter()
            .map(|p| Passage {
                article: p.article.clone(),
                chunk_index: p.chunk_index,
                text: p.text.clone(),
                score: cosine_similarity(&p.embedding, &query) as f64,
            })
            .collect();

        // Sort: score desc, then article/chunk asc (deterministic)
        results.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(a.article.cmp(&b.article))
                .then(a.chunk_index.cmp(&b.chunk_index))
        });
        results.truncate(top_k);

        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Embeds each text as a two-axis keyword indicator so rankings in
    /// tests are exact rather than approximate.
    struct KeywordProvider;

    #[async_trait]
    impl EmbeddingProvider for KeywordProvider {
        fn model_name(&self) -> &str {
            "keyword-test"
        }
        fn dims(&self) -> usize {
            2
        }
        async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
            Ok(texts
                .iter()
                .map(|t| {
                    vec![
                        if t.contains("granite") { 1.0 } else { 0.0 },
                        if t.contains("meadow") { 1.0 } else { 0.0 },
                    ]
                })
                .collect())
        }
    }

    fn builder_for(dir: &tempfile::TempDir) -> VectorIndexBuilder {
        VectorIndexBuilder::new(
            Arc::new(KeywordProvider),
            dir.path().join("storage"),
            700,
            64,
        )
    }

    #[tokio::test]
    async fn test_build_writes_snapshot_and_indexes_all_articles() {
        let dir = tempfile::TempDir::new().unwrap();
        let articles = dir.path().join("web_articles");
        std::fs::create_dir_all(&articles).unwrap();
        std::fs::write(articles.join("article_0.txt"), "granite cliffs").unwrap();
        std::fs::write(articles.join("article_1.txt"), "meadow flowers").unwrap();

        let builder = builder_for(&dir);
        builder.build(&articles).await.unwrap();

        let snapshot: serde_json::Value = serde_json::from_str(
            &std::fs::read_to_string(dir.path().join("storage").join(INDEX_FILE)).unwrap(),
        )
        .unwrap();
        assert_eq!(snapshot["model"], "keyword-test");
        assert_eq!(snapshot["dims"], 2);
        assert_eq!(snapshot["articles"], 2);
        assert_eq!(snapshot["passages"].as_array().unwrap().len(), 2);
        assert!(snapshot["built_at"].as_str().unwrap().contains('T'));
    }

    #[tokio::test]
    async fn test_retrieve_ranks_matching_passage_first() {
        let dir = tempfile::TempDir::new().unwrap();
        let articles = dir.path().join("web_articles");
        std::fs::create_dir_all(&articles).unwrap();
        std::fs::write(articles.join("article_0.txt"), "meadow flowers bloom").unwrap();
        std::fs::write(articles.join("article_1.txt"), "granite cliffs rise").unwrap();

        let index = builder_for(&dir).build(&articles).await.unwrap();
        let passages = index.retrieve("what about granite?", 4).await.unwrap();

        assert_eq!(passages[0].article, "article_1.txt");
        assert!(passages[0].score > passages[1].score);
    }

    #[tokio::test]
    async fn test_retrieve_truncates_to_top_k() {
        let dir = tempfile::TempDir::new().unwrap();
        let articles = dir.path().join("web_articles");
        std::fs::create_dir_all(&articles).unwrap();
        for i in 0..5 {
            std::fs::write(
                articles.join(format!("article_{}.txt", i)),
                format!("granite sample {}", i),
            )
            .unwrap();
        }

        let index = builder_for(&dir).build(&articles).await.unwrap();
        let passages = index.retrieve("granite", 2).await.unwrap();
        assert_eq!(passages.len(), 2);
    }

    #[tokio::test]
    async fn test_tied_scores_order_by_article_name() {
        let dir = tempfile::TempDir::new().unwrap();
        let articles = dir.path().join("web_articles");
        std::fs::create_dir_all(&articles).unwrap();
        std::fs::write(articles.join("article_1.txt"), "granite two").unwrap();
        std::fs::write(articles.join("article_0.txt"), "granite one").unwrap();

        let index = builder_for(&dir).build(&articles).await.unwrap();
        let passages = index.retrieve("granite", 4).await.unwrap();
        assert_eq!(passages[0].article, "article_0.txt");
        assert_eq!(passages[1].article, "article_1.txt");
    }

    #[tokio::test]
    async fn test_build_fails_on_empty_directory() {
        let dir = tempfile::TempDir::new().unwrap();
        let articles = dir.path().join("web_articles");
        std::fs::create_dir_all(&articles).unwrap();

        let err = match builder_for(&dir).build(&articles).await {
            Ok(_) => panic!("build should fail on an empty directory"),
            Err(err) => err,
        };
        assert!(err.to_string().contains("No articles found"));
    }

    /// Rejects empty input the way hosted embedding APIs do.
    struct RejectsEmptyProvider;

    #[async_trait]
    impl EmbeddingProvider for RejectsEmptyProvider {
        fn model_name(&self) -> &str {
            "rejects-empty-test"
        }
        fn dims(&self) -> usize {
            2
        }
        async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
            if texts.iter().any(|t| t.is_empty()) {
                bail!("'$.input' is invalid: empty string");
            }
            Ok(texts.iter().map(|_| vec![1.0, 0.0]).collect())
        }
    }

    #[tokio::test]
    async fn test_empty_article_is_counted_but_not_embedded() {
        let dir = tempfile::TempDir::new().unwrap();
        let articles = dir.path().join("web_articles");
        std::fs::create_dir_all(&articles).unwrap();
        std::fs::write(articles.join("article_0.txt"), "").unwrap();
        std::fs::write(articles.join("article_1.txt"), "granite cliffs").unwrap();

        let builder = VectorIndexBuilder::new(
            Arc::new(RejectsEmptyProvider),
            dir.path().join("storage"),
            700,
            64,
        );
        builder.build(&articles).await.unwrap();

        let snapshot: serde_json::Value = serde_json::from_str(
            &std::fs::read_to_string(dir.path().join("storage").join(INDEX_FILE)).unwrap(),
        )
        .unwrap();
        assert_eq!(snapshot["articles"], 2);
        let passages = snapshot["passages"].as_array().unwrap();
        assert_eq!(passages.len(), 1);
        assert_eq!(passages[0]["article"], "article_1.txt");
    }
}
