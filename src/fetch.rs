use anyhow::{Context, Result};
use scraper::{Html, Selector};
use std::time::Duration;

use crate::config::FetchConfig;

/// HTTP client for pulling article text out of web pages.
///
/// Many news sites serve an empty page to clients without a browser-looking
/// `User-Agent`, so the configured one defaults to `Mozilla/5.0`.
pub struct PageFetcher {
    client: reqwest::Client,
}

impl PageFetcher {
    pub fn new(config: &FetchConfig) -> Result<Self> {
        let mut builder = reqwest::Client::builder().user_agent(&config.user_agent);
        if let Some(secs) = config.timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }
        let client = builder.build().context("Failed to build HTTP client")?;
        Ok(Self { client })
    }

    /// Fetches a page and returns its paragraph text.
    ///
    /// Returns `None` when the server answers with anything other than 200,
    /// so a dead link can be skipped without aborting the batch. Transport
    /// failures (DNS, refused connection, timeout) are errors.
    pub async fn fetch(&self, url: &str) -> Result<Option<String>> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .with_context(|| format!("Failed to fetch {}", url))?;

        if response.status() != reqwest::StatusCode::OK {
            return Ok(None);
        }

        let body = response
            .text()
            .await
            .with_context(|| format!("Failed to read response body from {}", url))?;
        Ok(Some(extract_paragraph_text(&body)))
    }
}

/// Collects the text of every `<p>` element, one space between paragraphs.
///
/// Text nodes inside a paragraph are concatenated without separators, so
/// inline markup like `<a>` and `<em>` does not introduce extra spaces.
/// A page without paragraphs yields an empty string, which still counts as
/// a successfully fetched article.
pub fn extract_paragraph_text(html: &str) -> String {
    let document = Html::parse_document(html);
    let selector = match Selector::parse("p") {
        Ok(selector) => selector,
        Err(_) => return String::new(),
    };
    document
        .select(&selector)
        .map(|paragraph| paragraph.text().collect::<Vec<_>>().join(""))
        .collect::<Vec<_>>()
        .join(" ")
}
