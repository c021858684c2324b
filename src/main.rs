//! # linkrag CLI (`lrag`)
//!
//! The `lrag` binary drives the link pipeline from the terminal: run a
//! submission end to end, inspect the saved registry, or start the web UI.
//!
//! ## Usage
//!
//! ```bash
//! lrag --config ./config/lrag.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `lrag serve` | Start the form-based web UI |
//! | `lrag ask` | Save links, index their articles, optionally ask a question |
//! | `lrag links` | Print every saved category and its URLs |
//!
//! ## Examples
//!
//! ```bash
//! # Save two links under "news" and ask about them
//! lrag ask --category news \
//!      --url https://example.com/a \
//!      --url https://example.com/b \
//!      --question "What do these articles report?"
//!
//! # Save links without asking anything
//! lrag ask --category recipes --url https://example.com/pie
//!
//! # Inspect the registry
//! lrag links
//!
//! # Start the web UI
//! lrag serve --config ./config/lrag.toml
//! ```

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use linkrag::config;
use linkrag::pipeline::{Pipeline, Submission, SubmissionOutcome};
use linkrag::registry::LinkRegistry;
use linkrag::server;

/// linkrag CLI — save web links by category, index their article text,
/// and ask questions over them.
///
/// All commands accept a `--config` flag pointing to a TOML configuration
/// file. See `config/lrag.example.toml` for a full example.
#[derive(Parser)]
#[command(
    name = "lrag",
    about = "Save web links by category, index their article text, and ask questions over them",
    version,
    long_about = "linkrag files submitted web links under categories in a JSON registry, \
    scrapes each page's paragraph text into a local article directory, rebuilds a vector \
    retrieval index over everything stored so far, and answers questions over the index \
    through an OpenAI-compatible chat endpoint. The same pipeline backs the web form and \
    the CLI."
)]
struct Cli {
    /// Path to configuration file (TOML).
    ///
    /// Defaults to `./config/lrag.toml`. Storage paths, embedding, chat,
    /// and server settings are read from this file.
    #[arg(long, global = true, default_value = "./config/lrag.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

/// Top-level CLI commands.
#[derive(Subcommand)]
enum Commands {
    /// Start the form-based web UI.
    ///
    /// Binds to the address configured in `[server].bind` and serves the
    /// submission form and saved-link gallery.
    Serve,

    /// Save links under a category, fetch and index their articles, and
    /// optionally answer a question over them.
    ///
    /// URLs whose pages cannot be served are skipped but stay in the
    /// registry. The question runs against everything in the article
    /// directory, earlier runs included.
    Ask {
        /// Category to file the links under.
        #[arg(long)]
        category: Option<String>,

        /// A URL to save. Repeat the flag for multiple URLs.
        #[arg(long = "url")]
        urls: Vec<String>,

        /// Question to answer once the articles are indexed.
        #[arg(long)]
        question: Option<String>,
    },

    /// Print every saved category and its URLs.
    Links,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let cfg = config::load_config(&cli.config)?;

    match cli.command {
        Commands::Serve => {
            server::run_server(&cfg).await?;
        }
        Commands::Ask {
            category,
            urls,
            question,
        } => {
            let submission = Submission {
                category: category.unwrap_or_default(),
                urls,
                question,
            };
            // Invalid submissions get the same gentle treatment as in the
            // web UI: a message, no pipeline run, success exit.
            if let Err(reason) = submission.validate() {
                println!("{}", reason);
                return Ok(());
            }

            let pipeline = Pipeline::from_config(&cfg)?;
            let outcome = pipeline.run(&submission).await?;
            print_outcome(&cfg, &outcome);
        }
        Commands::Links => {
            let registry = LinkRegistry::new(cfg.storage.links_path.clone());
            let links = registry.load()?;
            if links.is_empty() {
                println!("No saved links.");
            } else {
                for (category, urls) in &links {
                    println!("{} ({})", category, urls.len());
                    for url in urls {
                        println!("  {}", url);
                    }
                }
            }
        }
    }

    Ok(())
}

fn print_outcome(cfg: &config::Config, outcome: &SubmissionOutcome) {
    println!(
        "Saved {} links under \"{}\"",
        outcome.articles.len(),
        outcome.category
    );
    for article in &outcome.articles {
        match &article.file {
            Some(path) => println!("  [{}] stored {}", article.position, path.display()),
            None => println!(
                "  [{}] skipped (page unavailable): {}",
                article.position, article.url
            ),
        }
    }
    println!(
        "Index rebuilt under {}",
        cfg.storage.index_dir.display()
    );
    match &outcome.answer {
        Some(answer) => {
            println!("\nAnswer:");
            println!("{}", answer);
        }
        None => println!("No question asked; articles are saved and indexed."),
    }
}
