use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, Utc};
use tracing::{info, warn};

use tribuna_common::{CandidateProfile, SourceArticle};

use crate::regional::{region_bias, RegionBias};

/// Results per index query. Strict filters often starve small regional
/// queries, hence the two-pass design below.
const INDEX_PAGE_SIZE: usize = 25;

const FEED_MAX_ITEMS: usize = 25;
const FEED_MAX_AGE_DAYS: i64 = 30;

// ---------------------------------------------------------------------------
// HeadlineIndex — global news-index query service
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct Headline {
    pub title: String,
    pub url: String,
    pub published_at: Option<DateTime<Utc>>,
    /// ISO 3166-1 alpha-2, lowercase, when the provider reports one.
    pub source_country: Option<String>,
}

#[async_trait]
pub trait HeadlineIndex: Send + Sync {
    /// Query the index. Results arrive in provider ranking order.
    async fn search(
        &self,
        query: &str,
        country: Option<&str>,
        language: Option<&str>,
    ) -> Result<Vec<Headline>>;
}

// ---------------------------------------------------------------------------
// Newsdata-style HTTP index
// ---------------------------------------------------------------------------

#[derive(Debug, serde::Deserialize)]
struct NewsdataResponse {
    #[serde(default)]
    results: Vec<NewsdataResult>,
}

#[derive(Debug, serde::Deserialize)]
struct NewsdataResult {
    #[serde(default)]
    title: String,
    #[serde(default)]
    link: String,
    #[serde(rename = "pubDate")]
    pub_date: Option<String>,
    #[serde(default)]
    country: Vec<String>,
}

pub struct NewsdataIndex {
    api_key: String,
    base_url: String,
    client: reqwest::Client,
}

impl NewsdataIndex {
    pub fn new(api_key: &str) -> Self {
        Self {
            api_key: api_key.to_string(),
            base_url: "https://newsdata.io/api/1".to_string(),
            client: reqwest::Client::builder()
                .timeout(Duration::from_secs(8))
                .build()
                .expect("Failed to build headline index HTTP client"),
        }
    }

    pub fn with_base_url(mut self, url: &str) -> Self {
        self.base_url = url.to_string();
        self
    }
}

#[async_trait]
impl HeadlineIndex for NewsdataIndex {
    async fn search(
        &self,
        query: &str,
        country: Option<&str>,
        language: Option<&str>,
    ) -> Result<Vec<Headline>> {
        let url = format!("{}/latest", self.base_url);
        let size = INDEX_PAGE_SIZE.to_string();

        let mut params: Vec<(&str, &str)> =
            vec![("apikey", self.api_key.as_str()), ("q", query), ("size", &size)];
        if let Some(cc) = country {
            params.push(("country", cc));
        }
        if let Some(lang) = language {
            params.push(("language", lang));
        }

        info!(query, country, language, "Headline index query");

        let resp = self
            .client
            .get(&url)
            .query(&params)
            .send()
            .await
            .context("Headline index request failed")?;

        if !resp.status().is_success() {
            anyhow::bail!("Headline index error ({})", resp.status());
        }

        let data: NewsdataResponse = resp
            .json()
            .await
            .context("Failed to parse headline index response")?;

        let headlines: Vec<Headline> = data
            .results
            .into_iter()
            .filter(|r| !r.link.is_empty() && !r.title.is_empty())
            .map(|r| Headline {
                title: r.title,
                url: r.link,
                published_at: r.pub_date.as_deref().and_then(parse_pub_date),
                source_country: r.country.first().map(|c| c.to_lowercase()),
            })
            .collect();

        info!(query, count = headlines.len(), "Headline index query complete");
        Ok(headlines)
    }
}

/// The provider reports `pubDate` as `"YYYY-MM-DD HH:MM:SS"` in UTC;
/// accept RFC 3339 too.
fn parse_pub_date(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(naive) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S") {
        return Some(naive.and_utc());
    }
    DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

// ---------------------------------------------------------------------------
// FeedFetcher — generic web-feed reader
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct FeedItem {
    pub title: Option<String>,
    pub url: String,
    pub pub_date: Option<DateTime<Utc>>,
}

#[async_trait]
pub trait FeedFetcher: Send + Sync {
    async fn feed(&self, url: &str) -> Result<Vec<FeedItem>>;
}

pub struct HttpFeedReader {
    client: reqwest::Client,
}

impl HttpFeedReader {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::builder()
                .timeout(Duration::from_secs(8))
                .build()
                .expect("Failed to build feed HTTP client"),
        }
    }
}

impl Default for HttpFeedReader {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl FeedFetcher for HttpFeedReader {
    async fn feed(&self, feed_url: &str) -> Result<Vec<FeedItem>> {
        let resp = self
            .client
            .get(feed_url)
            .header("User-Agent", "tribuna-pipeline/0.1")
            .send()
            .await
            .context("Feed fetch failed")?;

        let bytes = resp.bytes().await.context("Failed to read feed body")?;
        let feed = feed_rs::parser::parse(&bytes[..]).context("Failed to parse RSS/Atom feed")?;

        let cutoff = Utc::now() - chrono::Duration::days(FEED_MAX_AGE_DAYS);

        let mut items: Vec<FeedItem> = feed
            .entries
            .into_iter()
            .filter_map(|entry| {
                let url = entry
                    .links
                    .first()
                    .map(|l| l.href.clone())
                    .or_else(|| entry.id.starts_with("http").then(|| entry.id.clone()))?;

                let pub_date = entry
                    .published
                    .or(entry.updated)
                    .map(|dt| dt.with_timezone(&Utc));

                if let Some(date) = pub_date {
                    if date < cutoff {
                        return None;
                    }
                }

                Some(FeedItem {
                    url,
                    title: entry.title.map(|t| t.content),
                    pub_date,
                })
            })
            .collect();

        items.sort_by(|a, b| b.pub_date.cmp(&a.pub_date));
        items.truncate(FEED_MAX_ITEMS);

        info!(feed_url, items = items.len(), "Feed parsed");
        Ok(items)
    }
}

// ---------------------------------------------------------------------------
// SourceArbiter
// ---------------------------------------------------------------------------

/// Picks at most one article for a candidate out of the configured feeds
/// and the headline index.
pub struct SourceArbiter {
    index: Arc<dyn HeadlineIndex>,
    feeds: Arc<dyn FeedFetcher>,
    /// Regional feed URLs consulted before the index.
    feed_urls: Vec<String>,
}

impl SourceArbiter {
    pub fn new(
        index: Arc<dyn HeadlineIndex>,
        feeds: Arc<dyn FeedFetcher>,
        feed_urls: Vec<String>,
    ) -> Self {
        Self {
            index,
            feeds,
            feed_urls,
        }
    }

    /// Select one article for the candidate, or none. `exclude_urls` keeps
    /// recently used articles from being re-selected.
    pub async fn select_article(
        &self,
        candidate: &CandidateProfile,
        exclude_urls: &HashSet<String>,
    ) -> Result<Option<SourceArticle>> {
        let bias = region_bias(&candidate.office, &candidate.region);

        // Regional feeds first: a direct mention of the candidate wins.
        if let Some(article) = self.select_from_feeds(candidate, exclude_urls).await {
            return Ok(Some(article));
        }

        let query = build_query(candidate, &bias);

        // Pass 1: filtered. Inline qualifiers in the query suppress the
        // corresponding appended filter.
        let country = bias
            .country
            .filter(|_| !has_inline_qualifier(&query, "country:"));
        let language = bias
            .language
            .filter(|_| !has_inline_qualifier(&query, "language:"));

        match self.index.search(&query, country, language).await {
            Ok(results) => {
                let pool: Vec<&Headline> = results
                    .iter()
                    .filter(|h| !exclude_urls.contains(&h.url))
                    .collect();

                if let Some(cc) = bias.country {
                    if let Some(local) = pool.iter().find(|h| matches_country(h, cc, &bias)) {
                        return Ok(Some(to_article(local)));
                    }
                }
                if let Some(first) = pool.first() {
                    return Ok(Some(to_article(first)));
                }
            }
            Err(e) => {
                warn!(error = %e, "Filtered headline query failed, trying unfiltered");
            }
        }

        // Pass 2: unfiltered fallback — strict filters frequently return
        // zero results for small regional queries.
        let results = match self.index.search(&query, None, None).await {
            Ok(results) => results,
            Err(e) => {
                warn!(error = %e, "Unfiltered headline query failed");
                return Ok(None);
            }
        };

        Ok(results
            .iter()
            .find(|h| !exclude_urls.contains(&h.url))
            .map(to_article))
    }

    async fn select_from_feeds(
        &self,
        candidate: &CandidateProfile,
        exclude_urls: &HashSet<String>,
    ) -> Option<SourceArticle> {
        let needle = candidate.display_name.to_lowercase();

        for feed_url in &self.feed_urls {
            let items = match self.feeds.feed(feed_url).await {
                Ok(items) => items,
                Err(e) => {
                    warn!(feed = feed_url.as_str(), error = %e, "Failed to fetch feed");
                    continue;
                }
            };

            for item in items {
                if exclude_urls.contains(&item.url) {
                    continue;
                }
                let title = match &item.title {
                    Some(t) => t,
                    None => continue,
                };
                if title.to_lowercase().contains(&needle) {
                    info!(feed = feed_url.as_str(), url = item.url.as_str(), "Feed mention selected");
                    return Some(SourceArticle {
                        title: title.clone(),
                        url: item.url,
                        published_at: item.pub_date,
                        source_country: None,
                    });
                }
            }
        }

        None
    }
}

fn build_query(candidate: &CandidateProfile, bias: &RegionBias) -> String {
    if bias.national {
        format!("\"{}\" {}", candidate.display_name, candidate.office)
    } else {
        format!(
            "\"{}\" {} {}",
            candidate.display_name, candidate.office, candidate.region
        )
    }
}

fn has_inline_qualifier(query: &str, qualifier: &str) -> bool {
    query.to_lowercase().contains(qualifier)
}

/// A headline counts as same-country when the provider says so, when its
/// host carries the country TLD, or when it comes from a known local outlet.
fn matches_country(headline: &Headline, cc: &str, bias: &RegionBias) -> bool {
    if headline.source_country.as_deref() == Some(cc) {
        return true;
    }
    if let Ok(parsed) = url::Url::parse(&headline.url) {
        if let Some(host) = parsed.host_str() {
            if host.ends_with(&format!(".{cc}")) {
                return true;
            }
        }
    }
    bias.url_fragments.iter().any(|f| headline.url.contains(f))
}

fn to_article(headline: &Headline) -> SourceArticle {
    SourceArticle {
        title: headline.title.clone(),
        url: headline.url.clone(),
        published_at: headline.published_at,
        source_country: headline.source_country.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{candidate_fixture, MockFeedFetcher, MockHeadlineIndex};

    fn headline(title: &str, url: &str, country: Option<&str>) -> Headline {
        Headline {
            title: title.to_string(),
            url: url.to_string(),
            published_at: None,
            source_country: country.map(str::to_string),
        }
    }

    #[test]
    fn parses_provider_and_rfc3339_pub_dates() {
        let parsed = parse_pub_date("2026-08-20 14:03:00").unwrap();
        assert_eq!(parsed.to_rfc3339(), "2026-08-20T14:03:00+00:00");

        let parsed = parse_pub_date("2026-08-20T14:03:00-05:00").unwrap();
        assert_eq!(parsed.to_rfc3339(), "2026-08-20T19:03:00+00:00");

        assert!(parse_pub_date("20/08/2026").is_none());
    }

    #[tokio::test]
    async fn prefers_same_country_result_in_filtered_pass() {
        let candidate = candidate_fixture("Ana Pérez", "Concejo Municipal", "Antioquia");
        let index = MockHeadlineIndex::new().on_filtered(vec![
            headline("Foreign coverage", "https://example.com/a", Some("us")),
            headline("Local coverage", "https://example.com/b", Some("co")),
        ]);
        let calls = index.calls();
        let arbiter = SourceArbiter::new(
            Arc::new(index),
            Arc::new(MockFeedFetcher::new()),
            Vec::new(),
        );

        let article = arbiter
            .select_article(&candidate, &HashSet::new())
            .await
            .unwrap()
            .unwrap();

        assert_eq!(article.url, "https://example.com/b");
        assert_eq!(calls.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn country_tld_counts_as_local() {
        let candidate = candidate_fixture("Ana Pérez", "Concejo Municipal", "Antioquia");
        let index = MockHeadlineIndex::new().on_filtered(vec![
            headline("Foreign", "https://news.example.org/a", None),
            headline("Local", "https://elheraldo.co/b", None),
        ]);
        let arbiter = SourceArbiter::new(
            Arc::new(index),
            Arc::new(MockFeedFetcher::new()),
            Vec::new(),
        );

        let article = arbiter
            .select_article(&candidate, &HashSet::new())
            .await
            .unwrap()
            .unwrap();

        assert_eq!(article.url, "https://elheraldo.co/b");
    }

    #[tokio::test]
    async fn falls_back_to_unfiltered_pass_when_filtered_is_empty() {
        let candidate = candidate_fixture("Ana Pérez", "Senado", "Bogota");
        let index = MockHeadlineIndex::new()
            .on_filtered(Vec::new())
            .on_unfiltered(vec![headline("Wire story", "https://example.com/w", None)]);
        let calls = index.calls();
        let arbiter = SourceArbiter::new(
            Arc::new(index),
            Arc::new(MockFeedFetcher::new()),
            Vec::new(),
        );

        let article = arbiter
            .select_article(&candidate, &HashSet::new())
            .await
            .unwrap()
            .unwrap();

        assert_eq!(article.url, "https://example.com/w");

        // Filtered then unfiltered: exactly two queries, in that order.
        let calls = calls.lock().unwrap();
        assert_eq!(calls.len(), 2);
        assert!(calls[0].1.is_some());
        assert!(calls[1].1.is_none());
    }

    #[tokio::test]
    async fn both_passes_empty_yields_none() {
        let candidate = candidate_fixture("Ana Pérez", "Senado", "Bogota");
        let index = MockHeadlineIndex::new();
        let arbiter = SourceArbiter::new(
            Arc::new(index),
            Arc::new(MockFeedFetcher::new()),
            Vec::new(),
        );

        let article = arbiter.select_article(&candidate, &HashSet::new()).await.unwrap();
        assert!(article.is_none());
    }

    #[tokio::test]
    async fn excluded_urls_are_never_reselected() {
        let candidate = candidate_fixture("Ana Pérez", "Concejo Municipal", "Antioquia");
        let index = MockHeadlineIndex::new().on_filtered(vec![
            headline("Already used", "https://elcolombiano.com/a", Some("co")),
            headline("Fresh", "https://elcolombiano.com/b", Some("co")),
        ]);
        let arbiter = SourceArbiter::new(
            Arc::new(index),
            Arc::new(MockFeedFetcher::new()),
            Vec::new(),
        );

        let exclude: HashSet<String> = ["https://elcolombiano.com/a".to_string()].into();
        let article = arbiter
            .select_article(&candidate, &exclude)
            .await
            .unwrap()
            .unwrap();

        assert_eq!(article.url, "https://elcolombiano.com/b");
    }

    #[tokio::test]
    async fn feed_mention_wins_over_index() {
        let candidate = candidate_fixture("Ana Pérez", "Concejo Municipal", "Antioquia");
        let index = MockHeadlineIndex::new()
            .on_filtered(vec![headline("Index result", "https://example.com/i", Some("co"))]);
        let calls = index.calls();
        let feeds = MockFeedFetcher::new().on_feed(
            "https://local.example/rss",
            vec![FeedItem {
                title: Some("Ana Pérez presenta su programa".to_string()),
                url: "https://local.example/nota".to_string(),
                pub_date: None,
            }],
        );
        let arbiter = SourceArbiter::new(
            Arc::new(index),
            Arc::new(feeds),
            vec!["https://local.example/rss".to_string()],
        );

        let article = arbiter
            .select_article(&candidate, &HashSet::new())
            .await
            .unwrap()
            .unwrap();

        assert_eq!(article.url, "https://local.example/nota");
        assert!(calls.lock().unwrap().is_empty());
    }

    #[test]
    fn inline_qualifier_suppresses_filter() {
        assert!(has_inline_qualifier("ana perez country:co", "country:"));
        assert!(!has_inline_qualifier("ana perez", "country:"));
    }
}
