//! Question answering over retrieved passages.
//!
//! Retrieval output is packed into the system message, the question goes
//! in as the user message, and the completion comes back verbatim. The
//! [`ChatCompleter`] seam exists so tests can swap the OpenAI call for a
//! canned reply.

use anyhow::{bail, Result};
use async_trait::async_trait;
use std::time::Duration;

use crate::config::ChatConfig;
use crate::index::{Passage, RetrievalIndex};

/// Trait for chat-completion backends.
#[async_trait]
pub trait ChatCompleter: Send + Sync {
    async fn complete(&self, system: &str, user: &str) -> Result<String>;
}

/// Chat completions via the OpenAI-compatible `/chat/completions` endpoint.
///
/// `api_base` is configurable so any compatible server works; the key is
/// read from `OPENAI_API_KEY` at request time.
pub struct OpenAiChat {
    model: String,
    api_base: String,
    client: reqwest::Client,
}

impl OpenAiChat {
    pub fn new(config: &ChatConfig) -> Result<Self> {
        let mut builder = reqwest::Client::builder();
        if let Some(secs) = config.timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }
        Ok(Self {
            model: config.model.clone(),
            api_base: config.api_base.trim_end_matches('/').to_string(),
            client: builder.build()?,
        })
    }
}

#[async_trait]
impl ChatCompleter for OpenAiChat {
    async fn complete(&self, system: &str, user: &str) -> Result<String> {
        let api_key = std::env::var("OPENAI_API_KEY")
            .map_err(|_| anyhow::anyhow!("OPENAI_API_KEY not set"))?;

        let body = serde_json::json!({
            "model": self.model,
            "messages": [
                { "role": "system", "content": system },
                { "role": "user", "content": user },
            ],
        });

        let response = self
            .client
            .post(format!("{}/chat/completions", self.api_base))
            .header("Authorization", format!("Bearer {}", api_key))
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body_text = response.text().await.unwrap_or_default();
            bail!("Chat API error {}: {}", status, body_text);
        }

        let json: serde_json::Value = response.json().await?;
        parse_chat_response(&json)
    }
}

fn parse_chat_response(json: &serde_json::Value) -> Result<String> {
    json.get("choices")
        .and_then(|c| c.get(0))
        .and_then(|c| c.get("message"))
        .and_then(|m| m.get("content"))
        .and_then(|t| t.as_str())
        .map(|s| s.to_string())
        .ok_or_else(|| anyhow::anyhow!("Invalid chat response: missing message content"))
}

/// Joins passage texts with blank lines, most similar first.
pub fn context_block(passages: &[Passage]) -> String {
    passages
        .iter()
        .map(|p| p.text.as_str())
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// The instruction the model answers under. The retrieved context rides in
/// the system message so the user message stays the bare question.
pub fn system_prompt(context: &str) -> String {
    format!("Use this context: {}", context)
}

/// Answers `question` using the `top_k` most similar passages from the index.
pub async fn answer_question(
    index: &dyn RetrievalIndex,
    chat: &dyn ChatCompleter,
    question: &str,
    top_k: usize,
) -> Result<String> {
    let passages = index.retrieve(question, top_k).await?;
    let system = system_prompt(&context_block(&passages));
    chat.complete(&system, question).await
}
