//! Web UI tests: serve the real router on an ephemeral port and drive it
//! with an HTTP client. The pipeline underneath uses the same fixture site
//! and fakes as the pipeline tests.

use anyhow::Result;
use async_trait::async_trait;
use axum::{http::StatusCode, response::Html, routing::get, Router};
use std::path::PathBuf;
use std::sync::Arc;
use tempfile::TempDir;

use linkrag::config::FetchConfig;
use linkrag::embedding::EmbeddingProvider;
use linkrag::fetch::PageFetcher;
use linkrag::index::VectorIndexBuilder;
use linkrag::pipeline::Pipeline;
use linkrag::qa::ChatCompleter;
use linkrag::registry::LinkRegistry;
use linkrag::server;

const GRANITE_HTML: &str =
    "<html><body><p>Granite forms deep underground.</p></body></html>";

async fn spawn_fixture_site() -> String {
    let app = Router::new()
        .route("/granite", get(|| async { Html(GRANITE_HTML) }))
        .route("/missing", get(|| async { (StatusCode::NOT_FOUND, "gone") }));
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}", addr)
}

struct UniformProvider;

#[async_trait]
impl EmbeddingProvider for UniformProvider {
    fn model_name(&self) -> &str {
        "uniform-test"
    }
    fn dims(&self) -> usize {
        2
    }
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|_| vec![1.0, 0.0]).collect())
    }
}

struct CannedChat(String);

#[async_trait]
impl ChatCompleter for CannedChat {
    async fn complete(&self, _system: &str, _user: &str) -> Result<String> {
        Ok(self.0.clone())
    }
}

struct App {
    _tmp: TempDir,
    links_path: PathBuf,
    base_url: String,
    client: reqwest::Client,
}

async fn spawn_app(reply: &str) -> App {
    let tmp = TempDir::new().unwrap();
    let links_path = tmp.path().join("saved_links.json");

    let pipeline = Arc::new(Pipeline {
        registry: LinkRegistry::new(links_path.clone()),
        fetcher: PageFetcher::new(&FetchConfig::default()).unwrap(),
        builder: Box::new(VectorIndexBuilder::new(
            Arc::new(UniformProvider),
            tmp.path().join("storage"),
            700,
            64,
        )),
        chat: Box::new(CannedChat(reply.to_string())),
        articles_dir: tmp.path().join("web_articles"),
        top_k: 4,
    });

    let router = server::app(pipeline);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });

    App {
        _tmp: tmp,
        links_path,
        base_url: format!("http://{}", addr),
        client: reqwest::Client::new(),
    }
}

#[tokio::test]
async fn test_home_page_shows_form_and_empty_gallery() {
    let app = spawn_app("ok").await;

    let body = app
        .client
        .get(&app.base_url)
        .send()
        .await
        .unwrap()
        .text()
        .await
        .unwrap();

    assert!(body.contains("name=\"category\""));
    assert!(body.contains("name=\"urls\""));
    assert!(body.contains("name=\"question\""));
    assert!(body.contains("No links saved yet."));
}

#[tokio::test]
async fn test_submit_saves_links_and_shows_answer() {
    let site = spawn_fixture_site().await;
    let app = spawn_app("Granite cools slowly underground.").await;
    let article_url = format!("{}/granite", site);

    let body = app
        .client
        .post(&app.base_url)
        .form(&[
            ("category", "geology"),
            ("urls", article_url.as_str()),
            ("question", "What is granite?"),
        ])
        .send()
        .await
        .unwrap()
        .text()
        .await
        .unwrap();

    assert!(body.contains("Granite cools slowly underground."));
    assert!(body.contains("<summary>geology (1)</summary>"));
    assert!(body.contains(&article_url));

    let links: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&app.links_path).unwrap()).unwrap();
    assert_eq!(links["geology"][0], article_url);
}

#[tokio::test]
async fn test_submit_without_urls_rejected_before_saving() {
    let app = spawn_app("ok").await;

    let body = app
        .client
        .post(&app.base_url)
        .form(&[("category", "news"), ("urls", ""), ("question", "")])
        .send()
        .await
        .unwrap()
        .text()
        .await
        .unwrap();

    assert!(body.contains("Please enter at least one valid URL."));
    assert!(!app.links_path.exists());
}

#[tokio::test]
async fn test_submit_without_category_rejected() {
    let app = spawn_app("ok").await;

    let body = app
        .client
        .post(&app.base_url)
        .form(&[("category", ""), ("urls", "http://a.example/1")])
        .send()
        .await
        .unwrap()
        .text()
        .await
        .unwrap();

    assert!(body.contains("Please enter a category for the links."));
    assert!(!app.links_path.exists());
}

#[tokio::test]
async fn test_submit_without_question_prompts_for_one() {
    let site = spawn_fixture_site().await;
    let app = spawn_app("should not appear").await;
    let article_url = format!("{}/granite", site);

    let body = app
        .client
        .post(&app.base_url)
        .form(&[("category", "news"), ("urls", article_url.as_str())])
        .send()
        .await
        .unwrap()
        .text()
        .await
        .unwrap();

    assert!(body.contains("Please enter a question."));
    assert!(!body.contains("should not appear"));
    assert!(app.links_path.exists());
}

#[tokio::test]
async fn test_pipeline_failure_shows_error_and_keeps_links() {
    let site = spawn_fixture_site().await;
    let app = spawn_app("ok").await;
    let dead_url = format!("{}/missing", site);

    let body = app
        .client
        .post(&app.base_url)
        .form(&[("category", "news"), ("urls", dead_url.as_str())])
        .send()
        .await
        .unwrap()
        .text()
        .await
        .unwrap();

    // The only URL was skipped, so indexing found nothing and failed, but
    // the link was already saved and the gallery shows it.
    assert!(body.contains("Submission failed"));
    assert!(body.contains("<summary>news (1)</summary>"));
    assert!(body.contains(&dead_url));
}

#[tokio::test]
async fn test_user_text_is_escaped_in_rendered_page() {
    let site = spawn_fixture_site().await;
    let app = spawn_app("ok").await;
    let article_url = format!("{}/granite", site);

    let body = app
        .client
        .post(&app.base_url)
        .form(&[
            ("category", "<script>alert(1)</script>"),
            ("urls", article_url.as_str()),
            ("question", ""),
        ])
        .send()
        .await
        .unwrap()
        .text()
        .await
        .unwrap();

    assert!(!body.contains("<script>alert(1)</script>"));
    assert!(body.contains("&lt;script&gt;alert(1)&lt;/script&gt;"));
}

#[tokio::test]
async fn test_health_endpoint() {
    let app = spawn_app("ok").await;

    let health: serde_json::Value = app
        .client
        .get(format!("{}/health", app.base_url))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    assert_eq!(health["status"], "ok");
    assert!(health["version"].is_string());
}
