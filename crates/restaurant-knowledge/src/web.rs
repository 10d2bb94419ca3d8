//! HTML pages, embedded at build time.
//!
//! Both pages are static; they talk to the JSON API from the browser. The
//! list page keeps the last successful fetch in `localStorage` and falls back
//! to it, with a banner naming the fetch time, when the API is unreachable.

use axum::http::header;
use axum::response::{Html, IntoResponse};
use axum::routing::get;
use axum::Router;

const INDEX_HTML: &str = include_str!("../assets/index.html");
const REGISTER_HTML: &str = include_str!("../assets/register.html");

/// Routes for `/` and `/register`.
pub fn routes<S>() -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    Router::new()
        .route("/", get(index))
        .route("/register", get(register))
}

async fn index() -> impl IntoResponse {
    page(INDEX_HTML)
}

async fn register() -> impl IntoResponse {
    page(REGISTER_HTML)
}

fn page(html: &'static str) -> impl IntoResponse {
    ([(header::CACHE_CONTROL, "no-cache")], Html(html))
}
