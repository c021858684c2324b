//! # linkrag
//!
//! Save web links under named categories, pull the article text out of each
//! page, and ask questions answered from those articles.
//!
//! Every submission follows the same pipeline: the URLs are appended to a
//! JSON registry, each page's paragraph text is stored as a local file, a
//! retrieval index is rebuilt over everything stored so far, and an optional
//! question is answered by a chat model fed the most similar passages.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────┐   ┌─────────────┐   ┌───────────────┐
//! │ Registry │   │   Fetcher   │──▶│ web_articles/ │
//! │  (JSON)  │   │ reqwest+<p> │   │ article_N.txt │
//! └────▲─────┘   └─────────────┘   └───────┬───────┘
//!      │                                   ▼
//!      │         ┌──────────────────────────────────┐
//!      │         │  Index: chunk ▸ embed ▸ cosine   │
//!      │         └───────────────┬──────────────────┘
//!      │                         ▼
//! ┌────┴─────┐            ┌────────────┐
//! │ Web form │            │ Chat model │
//! │  + CLI   │◀───────────│  (answer)  │
//! └──────────┘            └────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! lrag serve                    # form UI on 127.0.0.1:8501
//! lrag ask --category news \
//!      --url https://example.com/story \
//!      --question "What happened?"
//! lrag links                    # print the saved registry
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`fetch`] | Page fetching and paragraph extraction |
//! | [`articles`] | Writing fetched text to the article directory |
//! | [`registry`] | The category-to-URLs JSON registry |
//! | [`chunk`] | Text chunking |
//! | [`loader`] | Reading article files back for indexing |
//! | [`embedding`] | Embedding provider abstraction |
//! | [`index`] | Index construction and similarity retrieval |
//! | [`qa`] | Prompt assembly and chat completion |
//! | [`pipeline`] | The submission pipeline shared by UI and CLI |
//! | [`server`] | Form-based web UI |
//! | [`persist`] | Atomic file writes |

pub mod articles;
pub mod chunk;
pub mod config;
pub mod embedding;
pub mod fetch;
pub mod index;
pub mod loader;
pub mod persist;
pub mod pipeline;
pub mod qa;
pub mod registry;
pub mod server;
