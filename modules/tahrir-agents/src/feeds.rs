//! Feed and page fetching. RSS/Atom goes through `feed-rs`; scrape-only
//! sources get a lightweight homepage link extraction.

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use scraper::{Html, Selector};
use tracing::warn;
use url::Url;

/// One normalized feed entry, whatever the transport.
#[derive(Debug, Clone, Default)]
pub struct FeedEntry {
    pub title: String,
    pub link: String,
    pub summary: String,
    pub published_at: Option<DateTime<Utc>>,
}

/// Fetch boundary for feeds and article pages. Tests stub this; the
/// production implementation is [`HttpFetcher`].
#[async_trait]
pub trait FeedFetcher: Send + Sync {
    async fn fetch_feed(&self, url: &str) -> Result<Vec<FeedEntry>>;

    /// Homepage scrape: recent same-host article links with their anchor
    /// text as titles.
    async fn scrape_homepage(&self, url: &str) -> Result<Vec<FeedEntry>>;

    /// Paragraph text of one article page. Empty on any failure.
    async fn fetch_article_text(&self, url: &str) -> String;
}

pub struct HttpFetcher {
    http: reqwest::Client,
    timeout: Duration,
}

impl HttpFetcher {
    pub fn new(timeout_secs: u64) -> Self {
        Self {
            http: reqwest::Client::builder()
                .user_agent("TahrirNewsroom/1.0")
                .build()
                .unwrap_or_default(),
            timeout: Duration::from_secs(timeout_secs.max(5)),
        }
    }

    async fn get_text(&self, url: &str) -> Result<String> {
        let resp = self
            .http
            .get(url)
            .timeout(self.timeout)
            .send()
            .await
            .with_context(|| format!("GET {url}"))?;
        if !resp.status().is_success() {
            anyhow::bail!("HTTP {} from {url}", resp.status());
        }
        resp.text().await.context("body read failed")
    }
}

#[async_trait]
impl FeedFetcher for HttpFetcher {
    async fn fetch_feed(&self, url: &str) -> Result<Vec<FeedEntry>> {
        let body = self.get_text(url).await?;
        let feed = feed_rs::parser::parse(body.as_bytes())
            .with_context(|| format!("feed parse failed for {url}"))?;

        Ok(feed
            .entries
            .into_iter()
            .filter_map(|entry| {
                let title = entry.title.map(|t| t.content).unwrap_or_default();
                let link = entry
                    .links
                    .first()
                    .map(|l| l.href.clone())
                    .unwrap_or_default();
                if title.trim().is_empty() || link.trim().is_empty() {
                    return None;
                }
                let summary = entry.summary.map(|s| s.content).unwrap_or_default();
                let published_at = entry.published.or(entry.updated);
                Some(FeedEntry {
                    title,
                    link,
                    summary,
                    published_at,
                })
            })
            .collect())
    }

    async fn scrape_homepage(&self, url: &str) -> Result<Vec<FeedEntry>> {
        let html = self.get_text(url).await?;
        Ok(extract_homepage_links(url, &html))
    }

    async fn fetch_article_text(&self, url: &str) -> String {
        if url.is_empty() {
            return String::new();
        }
        match self.get_text(url).await {
            Ok(html) => extract_paragraph_text(&html),
            Err(e) => {
                warn!(url, error = %e, "Article text fetch failed");
                String::new()
            }
        }
    }
}

/// Non-article path fragments skipped during homepage scraping.
const SKIP_LINK_FRAGMENTS: [&str; 6] = ["/tag/", "/tags/", "/category/", "/author/", "/video/", "#"];
const HOMEPAGE_LINK_CAP: usize = 30;
const MIN_ANCHOR_TITLE_CHARS: usize = 8;

/// Extract same-host article links from homepage HTML.
pub fn extract_homepage_links(base_url: &str, html: &str) -> Vec<FeedEntry> {
    let Ok(base) = Url::parse(base_url) else {
        return Vec::new();
    };
    let Ok(selector) = Selector::parse("a[href]") else {
        return Vec::new();
    };

    let document = Html::parse_document(html);
    let mut seen = std::collections::HashSet::new();
    let mut items = Vec::new();

    for anchor in document.select(&selector) {
        let title: String = anchor.text().collect::<String>().trim().to_string();
        if title.chars().count() < MIN_ANCHOR_TITLE_CHARS {
            continue;
        }
        let Some(href) = anchor.value().attr("href") else {
            continue;
        };
        let Ok(link) = base.join(href) else {
            continue;
        };
        if !matches!(link.scheme(), "http" | "https") {
            continue;
        }
        if link.host_str() != base.host_str() {
            continue;
        }
        let link_str = link.to_string();
        if SKIP_LINK_FRAGMENTS.iter().any(|frag| link_str.contains(frag)) {
            continue;
        }
        if !seen.insert(link_str.clone()) {
            continue;
        }

        items.push(FeedEntry {
            title,
            link: link_str,
            ..Default::default()
        });
        if items.len() >= HOMEPAGE_LINK_CAP {
            break;
        }
    }

    items
}

/// Join the `<p>` contents of a page.
pub fn extract_paragraph_text(html: &str) -> String {
    let Ok(selector) = Selector::parse("p") else {
        return String::new();
    };
    let document = Html::parse_document(html);
    let paragraphs: Vec<String> = document
        .select(&selector)
        .map(|p| p.text().collect::<String>().trim().to_string())
        .filter(|p| !p.is_empty())
        .collect();
    tahrir_common::normalize_whitespace(&paragraphs.join(" "))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn homepage_links_filter_offsite_and_noise() {
        let html = r##"
            <a href="/news/economy-story-2026">قصة اقتصادية مهمة جدا اليوم</a>
            <a href="/tag/economy">وسم الاقتصاد للتصفح فقط</a>
            <a href="https://other.example.com/a">عنوان خارجي طويل بما يكفي</a>
            <a href="/short">قص</a>
            <a href="/news/economy-story-2026">قصة اقتصادية مهمة جدا اليوم</a>
        "##;
        let items = extract_homepage_links("https://example.dz/", html);
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].link, "https://example.dz/news/economy-story-2026");
    }

    #[test]
    fn paragraph_extraction_joins_and_normalizes() {
        let html = "<article><p>الفقرة  الأولى</p><div><p>الفقرة الثانية</p></div></article>";
        assert_eq!(extract_paragraph_text(html), "الفقرة الأولى الفقرة الثانية");
    }
}
