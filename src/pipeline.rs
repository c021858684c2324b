//! The submission pipeline shared by the web form and the CLI.
//!
//! A submission runs through fixed stages: save the links, fetch and store
//! the articles, rebuild the index over everything stored so far, then
//! answer the question if one was asked. Stages are not transactional; a
//! failure mid-run leaves the earlier stages' output in place, which is
//! what makes re-running a submission safe.

use anyhow::Result;
use std::fmt;
use std::path::PathBuf;

use crate::articles::{store_articles, ArticleOutcome};
use crate::config::Config;
use crate::embedding::create_provider;
use crate::fetch::PageFetcher;
use crate::index::{IndexBuilder, VectorIndexBuilder};
use crate::qa::{answer_question, ChatCompleter, OpenAiChat};
use crate::registry::LinkRegistry;

/// One user submission: a category, the URLs to file under it, and an
/// optional question to answer afterwards.
#[derive(Debug, Clone)]
pub struct Submission {
    pub category: String,
    pub urls: Vec<String>,
    pub question: Option<String>,
}

/// Rejection reasons for a submission that never reaches the pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    EmptyCategory,
    EmptyUrls,
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationError::EmptyCategory => write!(f, "Please enter a category for the links."),
            ValidationError::EmptyUrls => write!(f, "Please enter at least one valid URL."),
        }
    }
}

impl std::error::Error for ValidationError {}

impl Submission {
    /// Checks the submission is worth running. The category check is
    /// textual only; whitespace-only names are accepted and stored as-is.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.category.is_empty() {
            return Err(ValidationError::EmptyCategory);
        }
        if self.urls.is_empty() {
            return Err(ValidationError::EmptyUrls);
        }
        Ok(())
    }
}

/// Splits textarea-style input into URLs, one per line, dropping blank
/// lines and surrounding whitespace.
pub fn parse_url_lines(input: &str) -> Vec<String> {
    input
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(String::from)
        .collect()
}

/// What a pipeline run produced, for rendering back to the user.
#[derive(Debug)]
pub struct SubmissionOutcome {
    pub category: String,
    pub articles: Vec<ArticleOutcome>,
    pub answer: Option<String>,
}

impl SubmissionOutcome {
    pub fn stored_count(&self) -> usize {
        self.articles.iter().filter(|a| a.is_stored()).count()
    }

    pub fn skipped_count(&self) -> usize {
        self.articles.len() - self.stored_count()
    }
}

/// Wires the registry, fetcher, index builder, and chat backend together.
/// Fields are trait objects where a test needs to substitute behavior.
pub struct Pipeline {
    pub registry: LinkRegistry,
    pub fetcher: PageFetcher,
    pub builder: Box<dyn IndexBuilder>,
    pub chat: Box<dyn ChatCompleter>,
    pub articles_dir: PathBuf,
    pub top_k: usize,
}

impl Pipeline {
    /// Builds the production pipeline from configuration.
    pub fn from_config(config: &Config) -> Result<Self> {
        let provider = create_provider(&config.embedding)?;
        Ok(Self {
            registry: LinkRegistry::new(config.storage.links_path.clone()),
            fetcher: PageFetcher::new(&config.fetch)?,
            builder: Box::new(VectorIndexBuilder::new(
                provider,
                config.storage.index_dir.clone(),
                config.chunking.max_tokens,
                config.embedding.batch_size,
            )),
            chat: Box::new(OpenAiChat::new(&config.chat)?),
            articles_dir: config.storage.articles_dir.clone(),
            top_k: config.retrieval.top_k,
        })
    }

    /// Runs one validated submission end to end.
    ///
    /// The links are saved before any fetching starts, so the registry
    /// keeps every submitted URL even when a later stage fails. The index
    /// is rebuilt over the whole article directory, stale files included.
    pub async fn run(&self, submission: &Submission) -> Result<SubmissionOutcome> {
        self.registry.save(&submission.category, &submission.urls)?;

        let articles =
            store_articles(&self.fetcher, &submission.urls, &self.articles_dir).await?;

        let index = self.builder.build(&self.articles_dir).await?;

        let answer = match submission.question.as_deref().filter(|q| !q.is_empty()) {
            Some(question) => Some(
                answer_question(index.as_ref(), self.chat.as_ref(), question, self.top_k)
                    .await?,
            ),
            None => None,
        };

        Ok(SubmissionOutcome {
            category: submission.category.clone(),
            articles,
            answer,
        })
    }
}
