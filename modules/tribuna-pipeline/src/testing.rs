// Test mocks for the pipeline, one per trait boundary:
// - MockHeadlineIndex (HeadlineIndex) — scripted filtered/unfiltered results
// - MockFeedFetcher (FeedFetcher) — HashMap-based URL→items
// - MockMediaIndex (MediaIndex) — HashMap-based query→files
// - MockBackend (CompletionBackend) — scripted response + call counter
// - MockWorkflowHook (WorkflowHook) — records dispatched payloads
//
// Plus fixtures for CandidateProfile and SocialDestination.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use anyhow::Result;
use async_trait::async_trait;
use uuid::Uuid;

use ai_client::CompletionBackend;
use tribuna_common::{
    AuthorizationStatus, CandidateProfile, SocialDestination, SocialNetwork, TribunaError,
};

use crate::arbiter::{FeedFetcher, FeedItem, Headline, HeadlineIndex};
use crate::images::{MediaFile, MediaIndex};
use crate::publish::{HookPayload, WorkflowHook};

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

pub fn candidate_fixture(name: &str, office: &str, region: &str) -> CandidateProfile {
    CandidateProfile {
        id: Uuid::new_v4(),
        display_name: name.to_string(),
        office: office.to_string(),
        region: region.to_string(),
        ballot_number: None,
        biography: Some("Trayectoria en trabajo comunitario.".to_string()),
        proposals: Some("Educación pública y transporte.".to_string()),
    }
}

/// Active destination in `pending` with a usable contact phone.
pub fn destination_fixture(candidate_id: Uuid) -> SocialDestination {
    SocialDestination {
        id: Uuid::new_v4(),
        candidate_id,
        network: SocialNetwork::Facebook,
        profile_url: "https://facebook.com/pagina.ejemplo".to_string(),
        owner_name: "Carlos".to_string(),
        owner_phone: Some("3105551234".to_string()),
        owner_email: None,
        active: true,
        authorization_status: AuthorizationStatus::Pending,
        last_invite_sent_at: None,
        authorized_at: None,
        revoked_at: None,
    }
}

// ---------------------------------------------------------------------------
// MockHeadlineIndex
// ---------------------------------------------------------------------------

/// Scripted index: one result set for filtered queries (any country or
/// language present), one for unfiltered. Records every call as
/// `(query, country)` so tests can assert pass order and counts.
pub struct MockHeadlineIndex {
    filtered: Vec<Headline>,
    unfiltered: Vec<Headline>,
    calls: Arc<Mutex<Vec<(String, Option<String>)>>>,
}

impl MockHeadlineIndex {
    pub fn new() -> Self {
        Self {
            filtered: Vec::new(),
            unfiltered: Vec::new(),
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn on_filtered(mut self, results: Vec<Headline>) -> Self {
        self.filtered = results;
        self
    }

    pub fn on_unfiltered(mut self, results: Vec<Headline>) -> Self {
        self.unfiltered = results;
        self
    }

    pub fn calls(&self) -> Arc<Mutex<Vec<(String, Option<String>)>>> {
        self.calls.clone()
    }
}

impl Default for MockHeadlineIndex {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl HeadlineIndex for MockHeadlineIndex {
    async fn search(
        &self,
        query: &str,
        country: Option<&str>,
        language: Option<&str>,
    ) -> Result<Vec<Headline>> {
        self.calls
            .lock()
            .expect("calls lock poisoned")
            .push((query.to_string(), country.map(str::to_string)));

        if country.is_some() || language.is_some() {
            Ok(self.filtered.clone())
        } else {
            Ok(self.unfiltered.clone())
        }
    }
}

// ---------------------------------------------------------------------------
// MockFeedFetcher
// ---------------------------------------------------------------------------

/// HashMap-based feed fetcher. Returns `Err` for unregistered URLs.
pub struct MockFeedFetcher {
    feeds: HashMap<String, Vec<FeedItem>>,
}

impl MockFeedFetcher {
    pub fn new() -> Self {
        Self {
            feeds: HashMap::new(),
        }
    }

    pub fn on_feed(mut self, url: &str, items: Vec<FeedItem>) -> Self {
        self.feeds.insert(url.to_string(), items);
        self
    }
}

impl Default for MockFeedFetcher {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl FeedFetcher for MockFeedFetcher {
    async fn feed(&self, url: &str) -> Result<Vec<FeedItem>> {
        self.feeds
            .get(url)
            .cloned()
            .ok_or_else(|| anyhow::anyhow!("MockFeedFetcher: no feed registered for {url}"))
    }
}

// ---------------------------------------------------------------------------
// MockMediaIndex
// ---------------------------------------------------------------------------

/// HashMap-based media index. Returns `Err` for unregistered queries.
pub struct MockMediaIndex {
    searches: HashMap<String, Vec<MediaFile>>,
}

impl MockMediaIndex {
    pub fn new() -> Self {
        Self {
            searches: HashMap::new(),
        }
    }

    pub fn on_search(mut self, query: &str, files: Vec<MediaFile>) -> Self {
        self.searches.insert(query.to_string(), files);
        self
    }
}

impl Default for MockMediaIndex {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MediaIndex for MockMediaIndex {
    async fn search(&self, query: &str) -> Result<Vec<MediaFile>> {
        self.searches
            .get(query)
            .cloned()
            .ok_or_else(|| anyhow::anyhow!("MockMediaIndex: no search registered for {query}"))
    }
}

// ---------------------------------------------------------------------------
// MockBackend
// ---------------------------------------------------------------------------

/// Completion backend returning a scripted response, counting calls.
pub struct MockBackend {
    name: String,
    response: Result<String, String>,
    calls: Arc<AtomicUsize>,
}

impl MockBackend {
    pub fn ok(name: &str, content: &str) -> Self {
        Self {
            name: name.to_string(),
            response: Ok(content.to_string()),
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn err(name: &str, message: &str) -> Self {
        Self {
            name: name.to_string(),
            response: Err(message.to_string()),
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn calls(&self) -> Arc<AtomicUsize> {
        self.calls.clone()
    }
}

#[async_trait]
impl CompletionBackend for MockBackend {
    fn name(&self) -> &str {
        &self.name
    }

    async fn complete(&self, _system: &str, _user: &str, _temperature: f32) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.response {
            Ok(content) => Ok(content.clone()),
            Err(message) => Err(anyhow::anyhow!("{message}")),
        }
    }
}

// ---------------------------------------------------------------------------
// MockWorkflowHook
// ---------------------------------------------------------------------------

/// Records dispatched payloads (serialized, `HookPayload` is write-only).
pub struct MockWorkflowHook {
    dispatched: Arc<Mutex<Vec<serde_json::Value>>>,
}

impl MockWorkflowHook {
    pub fn new() -> Self {
        Self {
            dispatched: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn dispatched(&self) -> Arc<Mutex<Vec<serde_json::Value>>> {
        self.dispatched.clone()
    }
}

impl Default for MockWorkflowHook {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl WorkflowHook for MockWorkflowHook {
    async fn dispatch(&self, payload: &HookPayload) -> Result<(), TribunaError> {
        let value = serde_json::to_value(payload)
            .map_err(|e| TribunaError::Anyhow(e.into()))?;
        self.dispatched
            .lock()
            .expect("dispatched lock poisoned")
            .push(value);
        Ok(())
    }
}
