use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use rand::Rng;
use tracing::{info, warn};

use tribuna_common::ImageResult;

/// License strings (lowercased prefixes) compatible with republication.
const LICENSE_ALLOW_LIST: &[&str] = &[
    "cc0",
    "cc by",
    "cc-by",
    "cc by-sa",
    "cc-by-sa",
    "public domain",
    "pd",
];

/// Upper bound on the HTML prefix scanned for page metadata. Open Graph
/// tags live in <head>; anything past this is body content.
const METADATA_SCAN_LIMIT: usize = 64 * 1024;

const MEDIA_SEARCH_LIMIT: usize = 20;

// ---------------------------------------------------------------------------
// MediaIndex — open-media search service
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct MediaFile {
    pub title: Option<String>,
    pub url: String,
    pub license: Option<String>,
}

#[async_trait]
pub trait MediaIndex: Send + Sync {
    /// Search the file namespace with extended metadata.
    async fn search(&self, query: &str) -> Result<Vec<MediaFile>>;
}

// ---------------------------------------------------------------------------
// MediaWiki-style commons index
// ---------------------------------------------------------------------------

#[derive(Debug, serde::Deserialize)]
struct CommonsResponse {
    #[serde(default)]
    query: Option<CommonsQuery>,
}

#[derive(Debug, serde::Deserialize)]
struct CommonsQuery {
    #[serde(default)]
    pages: std::collections::HashMap<String, CommonsPage>,
}

#[derive(Debug, serde::Deserialize)]
struct CommonsPage {
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    imageinfo: Vec<CommonsImageInfo>,
}

#[derive(Debug, serde::Deserialize)]
struct CommonsImageInfo {
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    extmetadata: Option<CommonsExtMetadata>,
}

#[derive(Debug, serde::Deserialize)]
struct CommonsExtMetadata {
    #[serde(rename = "LicenseShortName")]
    license_short_name: Option<CommonsMetaValue>,
}

#[derive(Debug, serde::Deserialize)]
struct CommonsMetaValue {
    #[serde(default)]
    value: String,
}

pub struct CommonsMediaIndex {
    base_url: String,
    client: reqwest::Client,
}

impl CommonsMediaIndex {
    pub fn new() -> Self {
        Self {
            base_url: "https://commons.wikimedia.org/w/api.php".to_string(),
            client: reqwest::Client::builder()
                .timeout(Duration::from_secs(8))
                .build()
                .expect("Failed to build media index HTTP client"),
        }
    }

    pub fn with_base_url(mut self, url: &str) -> Self {
        self.base_url = url.to_string();
        self
    }
}

impl Default for CommonsMediaIndex {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MediaIndex for CommonsMediaIndex {
    async fn search(&self, query: &str) -> Result<Vec<MediaFile>> {
        let limit = MEDIA_SEARCH_LIMIT.to_string();
        let params: Vec<(&str, &str)> = vec![
            ("action", "query"),
            ("format", "json"),
            ("generator", "search"),
            ("gsrnamespace", "6"), // File:
            ("gsrsearch", query),
            ("gsrlimit", &limit),
            ("prop", "imageinfo"),
            ("iiprop", "url|extmetadata"),
        ];

        info!(query, "Media index search");

        let resp = self
            .client
            .get(&self.base_url)
            .query(&params)
            .send()
            .await
            .context("Media index request failed")?;

        if !resp.status().is_success() {
            anyhow::bail!("Media index error ({})", resp.status());
        }

        let data: CommonsResponse = resp
            .json()
            .await
            .context("Failed to parse media index response")?;

        let files: Vec<MediaFile> = data
            .query
            .map(|q| q.pages)
            .unwrap_or_default()
            .into_values()
            .filter_map(|page| {
                let info = page.imageinfo.into_iter().next()?;
                let url = info.url?;
                let license = info
                    .extmetadata
                    .and_then(|m| m.license_short_name)
                    .map(|v| v.value);
                Some(MediaFile {
                    title: page.title,
                    url,
                    license,
                })
            })
            .collect();

        info!(query, count = files.len(), "Media index search complete");
        Ok(files)
    }
}

// ---------------------------------------------------------------------------
// ImagePicker
// ---------------------------------------------------------------------------

pub struct ImagePicker {
    index: Arc<dyn MediaIndex>,
    client: reqwest::Client,
}

impl ImagePicker {
    pub fn new(index: Arc<dyn MediaIndex>) -> Self {
        Self {
            index,
            client: reqwest::Client::builder()
                .timeout(Duration::from_secs(8))
                .build()
                .expect("Failed to build image picker HTTP client"),
        }
    }

    /// Pick one license-compatible image for the query, or none. Previously
    /// used URLs are avoided unless that would empty the pool — some image
    /// beats never repeating one. Selection is uniform-random: editorial
    /// freshness matters more than relevance ordering for imagery.
    pub async fn pick_image(
        &self,
        query: &str,
        avoid_urls: &HashSet<String>,
    ) -> Result<Option<ImageResult>> {
        let files = match self.index.search(query).await {
            Ok(files) => files,
            Err(e) => {
                warn!(query, error = %e, "Media index search failed");
                return Ok(None);
            }
        };

        let licensed: Vec<MediaFile> = files
            .into_iter()
            .filter(|f| {
                f.license
                    .as_deref()
                    .map(license_is_compatible)
                    .unwrap_or(false)
            })
            .collect();

        if licensed.is_empty() {
            return Ok(None);
        }

        let fresh: Vec<&MediaFile> = licensed
            .iter()
            .filter(|f| !avoid_urls.contains(&f.url))
            .collect();
        let pool: Vec<&MediaFile> = if fresh.is_empty() {
            licensed.iter().collect()
        } else {
            fresh
        };

        let chosen = pool[rand::rng().random_range(0..pool.len())];
        Ok(Some(ImageResult {
            url: chosen.url.clone(),
            title: chosen.title.clone(),
            license: chosen.license.clone(),
        }))
    }

    /// Secondary path: scrape a bounded prefix of the article page for
    /// Open Graph / Twitter Card image metadata. The body is streamed and
    /// capped so an arbitrarily large page never lands in memory whole.
    pub async fn article_image(&self, article_url: &str) -> Result<Option<ImageResult>> {
        let mut resp = match self.client.get(article_url).send().await {
            Ok(resp) if resp.status().is_success() => resp,
            Ok(resp) => {
                warn!(url = article_url, status = %resp.status(), "Article page fetch failed");
                return Ok(None);
            }
            Err(e) => {
                warn!(url = article_url, error = %e, "Article page fetch failed");
                return Ok(None);
            }
        };

        let mut prefix: Vec<u8> = Vec::with_capacity(METADATA_SCAN_LIMIT);
        loop {
            match resp.chunk().await {
                Ok(Some(chunk)) => {
                    if append_capped(&mut prefix, &chunk, METADATA_SCAN_LIMIT) {
                        break;
                    }
                }
                Ok(None) => break,
                Err(e) => {
                    warn!(url = article_url, error = %e, "Failed to read article page");
                    return Ok(None);
                }
            }
        }
        let html = String::from_utf8_lossy(&prefix);

        Ok(extract_page_image(&html).map(|url| ImageResult {
            url,
            title: None,
            license: None,
        }))
    }
}

/// Append `chunk` to `buf` without exceeding `cap` bytes. Returns true once
/// the cap is reached.
fn append_capped(buf: &mut Vec<u8>, chunk: &[u8], cap: usize) -> bool {
    let remaining = cap - buf.len();
    buf.extend_from_slice(&chunk[..chunk.len().min(remaining)]);
    buf.len() >= cap
}

fn license_is_compatible(license: &str) -> bool {
    let lower = license.to_lowercase();
    LICENSE_ALLOW_LIST.iter().any(|allow| lower.starts_with(allow))
}

/// Extract the first og:image / twitter:image meta content from an HTML
/// prefix. Handles both attribute orders; the URL must be http(s).
pub fn extract_page_image(html: &str) -> Option<String> {
    let patterns = [
        r#"<meta[^>]+(?:property|name)\s*=\s*["'](?:og:image|twitter:image)["'][^>]*content\s*=\s*["']([^"']+)["']"#,
        r#"<meta[^>]+content\s*=\s*["']([^"']+)["'][^>]*(?:property|name)\s*=\s*["'](?:og:image|twitter:image)["']"#,
    ];

    for pattern in patterns {
        let re = regex::Regex::new(pattern).expect("valid regex");
        if let Some(cap) = re.captures(html) {
            let raw = cap[1].trim();
            if let Ok(parsed) = url::Url::parse(raw) {
                if parsed.scheme() == "http" || parsed.scheme() == "https" {
                    return Some(raw.to_string());
                }
            }
        }
    }

    None
}
