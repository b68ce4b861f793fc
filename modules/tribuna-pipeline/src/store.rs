// Persistence seams for the records this subsystem mutates. The real
// relational store lives outside this workspace; these traits are the whole
// contract, and MemoryStore is the in-process implementation used by the
// binary and the tests.

use std::collections::HashMap;
use std::sync::Mutex;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use tribuna_common::{
    AuthorizationInvite, GeneratedDraft, InviteDecision, SocialDestination,
};

#[async_trait]
pub trait DestinationStore: Send + Sync {
    async fn destination(&self, id: Uuid) -> Result<Option<SocialDestination>>;

    async fn destinations_for_candidate(
        &self,
        candidate_id: Uuid,
    ) -> Result<Vec<SocialDestination>>;

    async fn update_destination(&self, destination: &SocialDestination) -> Result<()>;

    /// Append an invite. Invites are never deleted, only superseded.
    async fn insert_invite(&self, invite: &AuthorizationInvite) -> Result<()>;

    /// Most recently created invite for a destination.
    async fn latest_invite(&self, destination_id: Uuid) -> Result<Option<AuthorizationInvite>>;

    /// Hash-index lookup; the plaintext token never reaches the store.
    async fn find_invite_by_hash(&self, token_hash: &str) -> Result<Option<AuthorizationInvite>>;

    async fn mark_invite_used(
        &self,
        invite_id: Uuid,
        used_at: DateTime<Utc>,
        decision: InviteDecision,
    ) -> Result<()>;
}

#[async_trait]
pub trait DraftStore: Send + Sync {
    async fn insert_draft(&self, draft: &GeneratedDraft) -> Result<()>;

    async fn draft(&self, id: Uuid) -> Result<Option<GeneratedDraft>>;

    /// URLs of articles already used for this candidate's drafts, so the
    /// arbiter can avoid re-selecting them.
    async fn used_source_urls(&self, candidate_id: Uuid) -> Result<Vec<String>>;

    /// Image URLs already attached to this candidate's drafts.
    async fn used_image_urls(&self, candidate_id: Uuid) -> Result<Vec<String>>;

    /// Record the external post id reported back by the workflow hook and
    /// move the draft to `published`.
    async fn set_published(&self, draft_id: Uuid, post_id: &str) -> Result<()>;
}

// ---------------------------------------------------------------------------
// MemoryStore
// ---------------------------------------------------------------------------

#[derive(Default)]
struct MemoryStoreInner {
    destinations: HashMap<Uuid, SocialDestination>,
    invites: HashMap<Uuid, AuthorizationInvite>,
    drafts: HashMap<Uuid, GeneratedDraft>,
}

/// Mutex-backed in-memory store.
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<MemoryStoreInner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_destinations(destinations: Vec<SocialDestination>) -> Self {
        let store = Self::new();
        {
            let mut inner = store.inner.lock().expect("store lock poisoned");
            for d in destinations {
                inner.destinations.insert(d.id, d);
            }
        }
        store
    }
}

#[async_trait]
impl DestinationStore for MemoryStore {
    async fn destination(&self, id: Uuid) -> Result<Option<SocialDestination>> {
        let inner = self.inner.lock().expect("store lock poisoned");
        Ok(inner.destinations.get(&id).cloned())
    }

    async fn destinations_for_candidate(
        &self,
        candidate_id: Uuid,
    ) -> Result<Vec<SocialDestination>> {
        let inner = self.inner.lock().expect("store lock poisoned");
        let mut found: Vec<SocialDestination> = inner
            .destinations
            .values()
            .filter(|d| d.candidate_id == candidate_id)
            .cloned()
            .collect();
        found.sort_by_key(|d| d.id);
        Ok(found)
    }

    async fn update_destination(&self, destination: &SocialDestination) -> Result<()> {
        let mut inner = self.inner.lock().expect("store lock poisoned");
        inner
            .destinations
            .insert(destination.id, destination.clone());
        Ok(())
    }

    async fn insert_invite(&self, invite: &AuthorizationInvite) -> Result<()> {
        let mut inner = self.inner.lock().expect("store lock poisoned");
        inner.invites.insert(invite.id, invite.clone());
        Ok(())
    }

    async fn latest_invite(&self, destination_id: Uuid) -> Result<Option<AuthorizationInvite>> {
        let inner = self.inner.lock().expect("store lock poisoned");
        Ok(inner
            .invites
            .values()
            .filter(|i| i.destination_id == destination_id)
            .max_by_key(|i| i.created_at)
            .cloned())
    }

    async fn find_invite_by_hash(&self, token_hash: &str) -> Result<Option<AuthorizationInvite>> {
        let inner = self.inner.lock().expect("store lock poisoned");
        Ok(inner
            .invites
            .values()
            .find(|i| i.token_hash == token_hash)
            .cloned())
    }

    async fn mark_invite_used(
        &self,
        invite_id: Uuid,
        used_at: DateTime<Utc>,
        decision: InviteDecision,
    ) -> Result<()> {
        let mut inner = self.inner.lock().expect("store lock poisoned");
        let invite = inner
            .invites
            .get_mut(&invite_id)
            .ok_or_else(|| anyhow::anyhow!("invite {invite_id} not found"))?;
        invite.used_at = Some(used_at);
        invite.decision = Some(decision);
        Ok(())
    }
}

#[async_trait]
impl DraftStore for MemoryStore {
    async fn insert_draft(&self, draft: &GeneratedDraft) -> Result<()> {
        let mut inner = self.inner.lock().expect("store lock poisoned");
        inner.drafts.insert(draft.id, draft.clone());
        Ok(())
    }

    async fn draft(&self, id: Uuid) -> Result<Option<GeneratedDraft>> {
        let inner = self.inner.lock().expect("store lock poisoned");
        Ok(inner.drafts.get(&id).cloned())
    }

    async fn used_source_urls(&self, candidate_id: Uuid) -> Result<Vec<String>> {
        let inner = self.inner.lock().expect("store lock poisoned");
        Ok(inner
            .drafts
            .values()
            .filter(|d| d.candidate_id == candidate_id)
            .filter_map(|d| d.metadata.source_url.clone())
            .collect())
    }

    async fn used_image_urls(&self, candidate_id: Uuid) -> Result<Vec<String>> {
        let inner = self.inner.lock().expect("store lock poisoned");
        Ok(inner
            .drafts
            .values()
            .filter(|d| d.candidate_id == candidate_id)
            .filter_map(|d| d.metadata.image.as_ref().map(|i| i.url.clone()))
            .collect())
    }

    async fn set_published(&self, draft_id: Uuid, post_id: &str) -> Result<()> {
        let mut inner = self.inner.lock().expect("store lock poisoned");
        let draft = inner
            .drafts
            .get_mut(&draft_id)
            .ok_or_else(|| anyhow::anyhow!("draft {draft_id} not found"))?;
        draft.published_post_id = Some(post_id.to_string());
        draft.status = tribuna_common::DraftStatus::Published;
        Ok(())
    }
}
