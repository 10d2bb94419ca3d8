//! Preview image lookup for linked pages.
//!
//! Fetches a page and picks the social-preview image out of its `<meta>`
//! tags: `og:image` first, then `twitter:image`. The markup is scanned with
//! regular expressions, not parsed.

use std::sync::LazyLock;
use std::time::Duration;

use regex::Regex;
use tracing::{debug, warn};

use crate::error::{Error, Result};

/// A meta tag the preview image can be read from.
#[derive(Debug)]
struct PreviewPattern {
    /// Tag name, for logs.
    name: &'static str,
    /// `<meta ... property="x" ... content="...">`
    attribute_first: Regex,
    /// `<meta ... content="..." ... property="x">`
    content_first: Regex,
}

impl PreviewPattern {
    /// # Panics
    ///
    /// Panics if the generated regex is invalid.
    fn new(name: &'static str) -> Self {
        let tag = regex::escape(name);
        let key = format!(r#"(?:property|name)\s*=\s*["']{tag}["']"#);
        let content = r#"content\s*=\s*["']([^"']+)["']"#;
        Self {
            name,
            attribute_first: Regex::new(&format!(r"(?i)<meta\s+[^>]*?{key}[^>]*?\s{content}"))
                .expect("Invalid regex pattern"),
            content_first: Regex::new(&format!(r"(?i)<meta\s+[^>]*?{content}[^>]*?\s{key}"))
                .expect("Invalid regex pattern"),
        }
    }

    fn find<'a>(&self, html: &'a str) -> Option<&'a str> {
        [&self.attribute_first, &self.content_first]
            .into_iter()
            .find_map(|regex| regex.captures(html))
            .and_then(|captures| captures.get(1))
            .map(|m| m.as_str())
    }
}

static PREVIEW_PATTERNS: LazyLock<[PreviewPattern; 2]> =
    LazyLock::new(|| [PreviewPattern::new("og:image"), PreviewPattern::new("twitter:image")]);

/// Extract the preview image URL from page markup.
///
/// Returns the first `og:image` content, else the first `twitter:image`
/// content, else `None`.
#[must_use]
pub fn extract_preview_image(html: &str) -> Option<String> {
    PREVIEW_PATTERNS.iter().find_map(|pattern| {
        let found = pattern.find(html)?;
        debug!("Preview image found via {}", pattern.name);
        Some(found.trim().to_string())
    })
}

/// Fetches pages and resolves their preview image.
#[derive(Debug, Clone)]
pub struct ThumbnailResolver {
    http: reqwest::Client,
}

impl ThumbnailResolver {
    /// Create a resolver that identifies itself as `user_agent`.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(user_agent: &str, timeout: Option<Duration>) -> Result<Self> {
        let mut builder = reqwest::Client::builder().user_agent(user_agent);
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        Ok(Self {
            http: builder.build()?,
        })
    }

    /// Fetch `url` and return its preview image URL, if it declares one.
    ///
    /// # Errors
    ///
    /// [`Error::Validation`] if `url` is not an absolute http(s) URL;
    /// otherwise an error if the page cannot be fetched or answers with a
    /// non-success status.
    pub async fn resolve(&self, url: &str) -> Result<Option<String>> {
        let url = url.trim();
        let parsed = reqwest::Url::parse(url)
            .map_err(|e| Error::validation(format!("invalid url '{url}': {e}")))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(Error::validation(format!(
                "unsupported url scheme '{}'",
                parsed.scheme()
            )));
        }

        let response = self.http.get(parsed).send().await?;
        let status = response.status();
        if !status.is_success() {
            warn!("Fetching {url} for a preview image returned {status}");
            return Err(Error::RemoteStatus {
                status: status.as_u16(),
                body: String::new(),
            });
        }

        let html = response.text().await?;
        let image = extract_preview_image(&html);
        debug!("Preview image for {url}: {image:?}");
        Ok(image)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::spawn_router;
    use axum::http::{header, HeaderMap, StatusCode};
    use axum::response::Html;
    use axum::routing::get;
    use axum::Router;

    const AGENT: &str = "Mozilla/5.0 (compatible; RestaurantKnowledge/1.0)";

    #[test]
    fn test_og_image() {
        let html = r#"<head><meta property="og:image" content="https://img.example/a.jpg"></head>"#;
        assert_eq!(
            extract_preview_image(html).as_deref(),
            Some("https://img.example/a.jpg")
        );
    }

    #[test]
    fn test_og_image_wins_over_twitter() {
        let html = r#"
            <meta name="twitter:image" content="https://img.example/t.jpg">
            <meta property="og:image" content="https://img.example/o.jpg">
        "#;
        assert_eq!(
            extract_preview_image(html).as_deref(),
            Some("https://img.example/o.jpg")
        );
    }

    #[test]
    fn test_twitter_fallback() {
        let html = r#"<META NAME='twitter:image' CONTENT='https://img.example/t.png' />"#;
        assert_eq!(
            extract_preview_image(html).as_deref(),
            Some("https://img.example/t.png")
        );
    }

    #[test]
    fn test_content_before_property() {
        let html = r#"<meta content="https://img.example/c.jpg" property="og:image">"#;
        assert_eq!(
            extract_preview_image(html).as_deref(),
            Some("https://img.example/c.jpg")
        );
    }

    #[test]
    fn test_other_attributes_between() {
        let html = r#"<meta data-rh="true" property="og:image" itemprop="image" content="/x.jpg">"#;
        assert_eq!(extract_preview_image(html).as_deref(), Some("/x.jpg"));
    }

    #[test]
    fn test_similar_tags_do_not_match() {
        let html = r#"
            <meta property="og:image:width" content="1200">
            <meta property="og:title" content="Shop">
        "#;
        assert!(extract_preview_image(html).is_none());
    }

    #[test]
    fn test_no_meta_tags() {
        assert!(extract_preview_image("<html><body>hi</body></html>").is_none());
        assert!(extract_preview_image("").is_none());
    }

    #[tokio::test]
    async fn test_resolve_against_local_page() {
        let router = Router::new()
            .route(
                "/shop",
                get(|headers: HeaderMap| async move {
                    let agent = headers
                        .get(header::USER_AGENT)
                        .and_then(|v| v.to_str().ok())
                        .unwrap_or_default()
                        .to_string();
                    Html(format!(
                        r#"<meta property="og:image" content="https://img.example/{}.jpg">"#,
                        agent.contains("RestaurantKnowledge")
                    ))
                }),
            )
            .route("/plain", get(|| async { Html("<p>nothing</p>") }))
            .route("/gone", get(|| async { StatusCode::NOT_FOUND }));
        let addr = spawn_router(router).await;
        let resolver = ThumbnailResolver::new(AGENT, Some(Duration::from_secs(5))).unwrap();

        let found = resolver.resolve(&format!("http://{addr}/shop")).await.unwrap();
        assert_eq!(found.as_deref(), Some("https://img.example/true.jpg"));

        let none = resolver.resolve(&format!("http://{addr}/plain")).await.unwrap();
        assert!(none.is_none());

        let err = resolver
            .resolve(&format!("http://{addr}/gone"))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("404"));
    }

    #[tokio::test]
    async fn test_resolve_rejects_non_http_urls() {
        let resolver = ThumbnailResolver::new(AGENT, None).unwrap();

        assert!(resolver.resolve("file:///etc/passwd").await.unwrap_err().is_validation());
        assert!(resolver.resolve("not a url").await.unwrap_err().is_validation());
    }
}
