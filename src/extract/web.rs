//! Web page fetching and visible-text extraction

use super::Extracted;
use crate::config::WebConfig;
use crate::error::{Error, Result};
use reqwest::Client;
use scraper::{Html, Node, Selector};
use std::time::Duration;
use tracing::{debug, info};
use url::Url;

/// Elements whose text never reaches the reader
const HIDDEN_ELEMENTS: &[&str] = &["script", "style", "noscript"];

/// Fetches a single page and reduces it to plain text
pub struct WebFetcher {
    client: Client,
    max_chars: usize,
}

impl WebFetcher {
    pub fn new(config: &WebConfig) -> Result<Self> {
        let client = Client::builder()
            .user_agent(&config.user_agent)
            .timeout(Duration::from_secs(config.timeout_secs))
            .gzip(true)
            .brotli(true)
            .redirect(reqwest::redirect::Policy::limited(5))
            .build()
            .map_err(|e| Error::Config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            max_chars: config.max_chars,
        })
    }

    /// Fetch `url` and extract its visible text
    pub async fn fetch(&self, url: &str) -> Result<Extracted> {
        let parsed = Url::parse(url)?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(Error::SourceUnreadable(format!(
                "Unsupported URL scheme: {}",
                parsed.scheme()
            )));
        }

        debug!("Fetching: {}", url);
        let response = self
            .client
            .get(parsed)
            .send()
            .await
            .map_err(|e| Error::SourceUnreadable(format!("Failed to fetch {}: {}", url, e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::SourceUnreadable(format!("HTTP {}: {}", status, url)));
        }

        let final_url = response.url().to_string();
        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|s| s.to_string());

        let body = response
            .text()
            .await
            .map_err(|e| Error::SourceUnreadable(format!("Failed to read body of {}: {}", url, e)))?;

        let (title, text) = visible_text(&body);
        let (text, truncated) = truncate_chars(&text, self.max_chars);
        if text.trim().is_empty() {
            return Err(Error::SourceUnreadable(format!(
                "No readable text found at {}",
                url
            )));
        }

        let chars = text.chars().count();
        info!(url = %final_url, chars, truncated, "Extracted web page text");

        Ok(Extracted {
            metadata: serde_json::json!({
                "final_url": final_url,
                "status": status.as_u16(),
                "content_type": content_type,
                "title": title,
                "chars": chars,
                "truncated": truncated,
            }),
            text,
        })
    }
}

/// Extract the page title and visible text of an HTML document.
///
/// Text nodes, the title included, are trimmed and joined with single
/// spaces; nodes inside hidden elements are dropped.
pub fn visible_text(html: &str) -> (Option<String>, String) {
    let document = Html::parse_document(html);

    let title = Selector::parse("title").ok().and_then(|selector| {
        document
            .select(&selector)
            .next()
            .map(|elem| elem.text().collect::<String>().trim().to_string())
            .filter(|t| !t.is_empty())
    });

    let mut parts: Vec<&str> = Vec::new();
    for node in document.tree.nodes() {
        let Node::Text(text) = node.value() else {
            continue;
        };
        let hidden = node.ancestors().any(|ancestor| match ancestor.value() {
            Node::Element(elem) => HIDDEN_ELEMENTS.contains(&elem.name()),
            _ => false,
        });
        if hidden {
            continue;
        }
        let trimmed = text.trim();
        if !trimmed.is_empty() {
            parts.push(trimmed);
        }
    }

    (title, parts.join(" "))
}

/// Cut `text` to at most `max_chars` characters
fn truncate_chars(text: &str, max_chars: usize) -> (String, bool) {
    match text.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => (text[..byte_idx].to_string(), true),
        None => (text.to_string(), false),
    }
}
