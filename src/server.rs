//! Form-based web UI.
//!
//! Serves a single page with the submission form and a gallery of every
//! saved category. Submissions post back to the same page and the result
//! (answer, validation message, or failure) renders above the form.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET`  | `/` | Submission form plus saved-link gallery |
//! | `POST` | `/` | Run a submission and re-render the page |
//! | `GET`  | `/health` | Health check (returns version) |
//!
//! Validation failures re-render the form with a message and never reach
//! the pipeline. Pipeline failures surface as a single error line; the
//! gallery always reflects what the registry holds after the attempt.
//!
//! All user-supplied text is HTML-escaped before rendering.
//!
//! # CORS
//!
//! All origins, methods, and headers are permitted to support browser-based
//! clients.

use axum::{
    extract::{Form, State},
    response::Html,
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

use crate::config::Config;
use crate::pipeline::{parse_url_lines, Pipeline, Submission, SubmissionOutcome};
use crate::registry::LinkMap;

/// Shared application state passed to all route handlers via Axum's `State` extractor.
#[derive(Clone)]
struct AppState {
    pipeline: Arc<Pipeline>,
}

/// Starts the web UI on the address configured in `[server].bind`.
///
/// Runs indefinitely until the process is terminated.
pub async fn run_server(config: &Config) -> anyhow::Result<()> {
    let pipeline = Arc::new(Pipeline::from_config(config)?);
    let bind_addr = config.server.bind.clone();

    let app = app(pipeline);

    println!("Web UI listening on http://{}", bind_addr);

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Builds the router. Split out from [`run_server`] so integration tests
/// can serve it on an ephemeral port with a substitute pipeline.
pub fn app(pipeline: Arc<Pipeline>) -> Router {
    let state = AppState { pipeline };

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(handle_show).post(handle_submit))
        .route("/health", get(handle_health))
        .layer(cors)
        .with_state(state)
}

// ============ GET /health ============

/// JSON response body for `GET /health`.
#[derive(Serialize)]
struct HealthResponse {
    status: String,
    version: String,
}

async fn handle_health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

// ============ GET / and POST / ============

/// Fields of the submission form. Defaults keep a partial post from being
/// rejected before validation can explain what is missing.
#[derive(Debug, Default, Deserialize)]
struct SubmitForm {
    #[serde(default)]
    category: String,
    #[serde(default)]
    urls: String,
    #[serde(default)]
    question: String,
}

/// Everything one render of the page needs.
#[derive(Default)]
struct PageView {
    form: SubmitForm,
    notice: Option<String>,
    error: Option<String>,
    summary: Option<String>,
    skipped: Vec<String>,
    answer: Option<String>,
}

async fn handle_show(State(state): State<AppState>) -> Html<String> {
    let mut view = PageView::default();
    let links = load_links(&state, &mut view);
    Html(render_page(&links, &view))
}

async fn handle_submit(State(state): State<AppState>, Form(form): Form<SubmitForm>) -> Html<String> {
    let submission = Submission {
        category: form.category.clone(),
        urls: parse_url_lines(&form.urls),
        question: if form.question.is_empty() {
            None
        } else {
            Some(form.question.clone())
        },
    };

    let mut view = PageView {
        form,
        ..PageView::default()
    };

    match submission.validate() {
        Err(reason) => view.notice = Some(reason.to_string()),
        Ok(()) => match state.pipeline.run(&submission).await {
            Ok(outcome) => apply_outcome(&mut view, &outcome),
            Err(err) => view.error = Some(format!("Submission failed: {:#}", err)),
        },
    }

    let links = load_links(&state, &mut view);
    Html(render_page(&links, &view))
}

fn load_links(state: &AppState, view: &mut PageView) -> LinkMap {
    match state.pipeline.registry.load() {
        Ok(links) => links,
        Err(err) => {
            view.error = Some(format!("Could not read saved links: {:#}", err));
            LinkMap::new()
        }
    }
}

fn apply_outcome(view: &mut PageView, outcome: &SubmissionOutcome) {
    view.summary = Some(format!(
        "Saved {} links under \"{}\". Stored {} articles, skipped {}.",
        outcome.articles.len(),
        outcome.category,
        outcome.stored_count(),
        outcome.skipped_count(),
    ));
    view.skipped = outcome
        .articles
        .iter()
        .filter(|a| !a.is_stored())
        .map(|a| a.url.clone())
        .collect();
    match &outcome.answer {
        Some(answer) => view.answer = Some(answer.clone()),
        None => view.notice = Some("Please enter a question.".to_string()),
    }
}

// ============ Rendering ============

/// Escapes text for safe embedding in HTML element content and
/// double-quoted attribute values.
fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            other => escaped.push(other),
        }
    }
    escaped
}

fn render_page(links: &LinkMap, view: &PageView) -> String {
    let mut html = String::new();
    html.push_str(
        "<!doctype html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n\
         <title>linkrag</title>\n<style>\n\
         body { font-family: sans-serif; max-width: 48rem; margin: 2rem auto; padding: 0 1rem; }\n\
         label { display: block; margin-top: 1rem; }\n\
         input[type=text], textarea { width: 100%; box-sizing: border-box; }\n\
         .notice { background: #fff3cd; padding: 0.5rem 1rem; }\n\
         .error { background: #f8d7da; padding: 0.5rem 1rem; }\n\
         .summary { background: #d1e7dd; padding: 0.5rem 1rem; }\n\
         .answer { background: #f0f0f0; padding: 1rem; white-space: pre-wrap; }\n\
         </style>\n</head>\n<body>\n\
         <h1>Save web links, ask questions</h1>\n",
    );

    if let Some(error) = &view.error {
        html.push_str(&format!("<p class=\"error\">{}</p>\n", escape_html(error)));
    }
    if let Some(notice) = &view.notice {
        html.push_str(&format!("<p class=\"notice\">{}</p>\n", escape_html(notice)));
    }
    if let Some(summary) = &view.summary {
        html.push_str(&format!(
            "<p class=\"summary\">{}</p>\n",
            escape_html(summary)
        ));
    }
    if !view.skipped.is_empty() {
        html.push_str("<ul>\n");
        for url in &view.skipped {
            html.push_str(&format!("<li>skipped: {}</li>\n", escape_html(url)));
        }
        html.push_str("</ul>\n");
    }
    if let Some(answer) = &view.answer {
        html.push_str(&format!(
            "<h2>Answer</h2>\n<div class=\"answer\">{}</div>\n",
            escape_html(answer)
        ));
    }

    html.push_str(&format!(
        "<form method=\"post\" action=\"/\">\n\
         <label>Category\n<input type=\"text\" name=\"category\" value=\"{}\"></label>\n\
         <label>URLs (one per line)\n<textarea name=\"urls\" rows=\"5\">{}</textarea></label>\n\
         <label>Question (optional)\n<input type=\"text\" name=\"question\" value=\"{}\"></label>\n\
         <button type=\"submit\">Save &amp; Ask</button>\n\
         </form>\n",
        escape_html(&view.form.category),
        escape_html(&view.form.urls),
        escape_html(&view.form.question),
    ));

    html.push_str("<h2>Saved links</h2>\n");
    if links.is_empty() {
        html.push_str("<p>No links saved yet.</p>\n");
    } else {
        for (category, urls) in links {
            html.push_str(&format!(
                "<details>\n<summary>{} ({})</summary>\n<ul>\n",
                escape_html(category),
                urls.len()
            ));
            for url in urls {
                let escaped = escape_html(url);
                html.push_str(&format!(
                    "<li><a href=\"{}\" rel=\"noopener noreferrer\">{}</a></li>\n",
                    escaped, escaped
                ));
            }
            html.push_str("</ul>\n</details>\n");
        }
    }

    html.push_str("</body>\n</html>\n");
    html
}
