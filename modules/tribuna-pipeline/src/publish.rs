use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use serde::Serialize;
use tracing::{info, warn};

use tribuna_common::{
    CandidateProfile, GeneratedDraft, SocialDestination, SocialNetwork, TribunaError,
};
use uuid::Uuid;

use crate::authorization::{constant_time_eq, AuthorizationService};
use crate::store::DraftStore;

/// Header carrying the shared secret on outbound hook calls.
const HOOK_SECRET_HEADER: &str = "X-Hook-Secret";

/// Rough token estimate for the downstream automation: four chars per token.
const CHARS_PER_TOKEN: usize = 4;

// ---------------------------------------------------------------------------
// Publication — gate output
// ---------------------------------------------------------------------------

/// Content bundle paired with the destinations allowed to receive it.
#[derive(Debug, Clone)]
pub struct Publication {
    pub draft: GeneratedDraft,
    pub eligible_destinations: Vec<SocialDestination>,
}

/// Filters destinations down to those that may receive generated content
/// right now: `active` and `approved`, evaluated after the expiry sweep.
/// An empty list is reduced fan-out, not a failure — the owned site can
/// still archive the content.
pub struct PublishGate {
    authorization: Arc<AuthorizationService>,
}

impl PublishGate {
    pub fn new(authorization: Arc<AuthorizationService>) -> Self {
        Self { authorization }
    }

    pub async fn prepare_publication(
        &self,
        candidate: &CandidateProfile,
        draft: GeneratedDraft,
    ) -> Result<Publication, TribunaError> {
        let destinations = self.authorization.list_destinations(candidate.id).await?;
        let eligible: Vec<SocialDestination> = destinations
            .into_iter()
            .filter(|d| d.is_eligible())
            .collect();

        info!(
            candidate = %candidate.id,
            eligible = eligible.len(),
            "Publication prepared"
        );

        Ok(Publication {
            draft,
            eligible_destinations: eligible,
        })
    }
}

// ---------------------------------------------------------------------------
// Workflow hook — outbound POST to the automation layer
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
pub struct HookPayload {
    pub candidate_id: Uuid,
    pub content_type: String,
    pub generated_text: String,
    pub token_estimate: usize,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub source: String,
    pub metadata: HookMetadata,
}

#[derive(Debug, Serialize)]
pub struct HookMetadata {
    pub source_url: Option<String>,
    pub image_url: Option<String>,
    pub variants: BTreeMap<SocialNetwork, String>,
    pub keywords: Vec<String>,
    pub destinations: Vec<HookDestination>,
}

#[derive(Debug, Serialize)]
pub struct HookDestination {
    pub id: Uuid,
    pub network: SocialNetwork,
    pub profile_url: String,
}

#[async_trait]
pub trait WorkflowHook: Send + Sync {
    /// Hand a publication to the external automation. Delivery guarantees
    /// beyond this single POST are the automation's responsibility.
    async fn dispatch(&self, payload: &HookPayload) -> Result<(), TribunaError>;
}

/// HTTP hook gated by a feature flag and a shared secret. Missing flag,
/// URL or secret degrades to `workflow_not_configured`, never to silent
/// success.
pub struct HttpWorkflowHook {
    enabled: bool,
    url: Option<String>,
    secret: Option<String>,
    client: reqwest::Client,
}

impl HttpWorkflowHook {
    pub fn new(enabled: bool, url: Option<String>, secret: Option<String>) -> Self {
        Self {
            enabled,
            url,
            secret,
            client: reqwest::Client::builder()
                .timeout(Duration::from_secs(8))
                .build()
                .expect("Failed to build workflow hook HTTP client"),
        }
    }

    /// Verify a secret presented on the hook's callback (the automation
    /// reporting a published post id). Constant-time: this is an
    /// in-process comparison of a bearer credential.
    pub fn verify_callback_secret(&self, presented: &str) -> bool {
        match &self.secret {
            Some(secret) => constant_time_eq(presented.as_bytes(), secret.as_bytes()),
            None => false,
        }
    }
}

#[async_trait]
impl WorkflowHook for HttpWorkflowHook {
    async fn dispatch(&self, payload: &HookPayload) -> Result<(), TribunaError> {
        let (url, secret) = match (self.enabled, &self.url, &self.secret) {
            (true, Some(url), Some(secret)) => (url, secret),
            _ => return Err(TribunaError::WorkflowNotConfigured),
        };

        let resp = self
            .client
            .post(url)
            .header(HOOK_SECRET_HEADER, secret)
            .json(payload)
            .send()
            .await
            .map_err(|e| TribunaError::Anyhow(e.into()))?;

        if !resp.status().is_success() {
            warn!(status = %resp.status(), "Workflow hook rejected the publication");
            return Err(TribunaError::Anyhow(anyhow::anyhow!(
                "workflow hook error ({})",
                resp.status()
            )));
        }

        info!(candidate = %payload.candidate_id, "Publication dispatched to workflow hook");
        Ok(())
    }
}

/// Build the hook payload from a prepared publication.
pub fn hook_payload(publication: &Publication) -> HookPayload {
    let draft = &publication.draft;
    HookPayload {
        candidate_id: draft.candidate_id,
        content_type: draft.kind.to_string(),
        generated_text: draft.body.clone(),
        token_estimate: draft.body.chars().count() / CHARS_PER_TOKEN,
        created_at: draft.created_at,
        source: "tribuna-pipeline".to_string(),
        metadata: HookMetadata {
            source_url: draft.metadata.source_url.clone(),
            image_url: draft.metadata.image.as_ref().map(|i| i.url.clone()),
            variants: draft.metadata.variants.clone(),
            keywords: draft.metadata.keywords.clone(),
            destinations: publication
                .eligible_destinations
                .iter()
                .map(|d| HookDestination {
                    id: d.id,
                    network: d.network,
                    profile_url: d.profile_url.clone(),
                })
                .collect(),
        },
    }
}

/// Record the post id the automation reports back, after verifying its
/// presented secret.
pub async fn record_published(
    hook: &HttpWorkflowHook,
    drafts: &dyn DraftStore,
    presented_secret: &str,
    draft_id: Uuid,
    post_id: &str,
) -> Result<(), TribunaError> {
    if !hook.verify_callback_secret(presented_secret) {
        return Err(TribunaError::Config("invalid hook callback secret".to_string()));
    }
    drafts
        .set_published(draft_id, post_id)
        .await
        .map_err(|e| TribunaError::Store(e.to_string()))
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use tribuna_common::{
        AuthorizationStatus, ContentKind, DraftMetadata, DraftStatus, ManualClock,
    };

    use super::*;
    use crate::store::{DraftStore, MemoryStore};
    use crate::testing::{candidate_fixture, destination_fixture};

    fn draft_fixture(candidate_id: Uuid) -> GeneratedDraft {
        GeneratedDraft {
            id: Uuid::new_v4(),
            candidate_id,
            kind: ContentKind::Blog,
            body: "Texto generado sobre la propuesta.".to_string(),
            metadata: DraftMetadata::default(),
            created_at: Utc::now(),
            status: DraftStatus::Draft,
            published_post_id: None,
        }
    }

    fn gate_for(store: Arc<MemoryStore>) -> PublishGate {
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let auth = Arc::new(AuthorizationService::new(
            store,
            clock,
            "https://campaign.example",
            "57",
        ));
        PublishGate::new(auth)
    }

    #[tokio::test]
    async fn gate_filters_to_active_approved_destinations() {
        let candidate = candidate_fixture("Ana Pérez", "Concejo", "Antioquia");

        let mut approved = destination_fixture(candidate.id);
        approved.authorization_status = AuthorizationStatus::Approved;
        approved.authorized_at = Some(Utc::now());

        let mut inactive = destination_fixture(candidate.id);
        inactive.authorization_status = AuthorizationStatus::Approved;
        inactive.authorized_at = Some(Utc::now());
        inactive.active = false;

        let pending = destination_fixture(candidate.id);

        let store = Arc::new(MemoryStore::with_destinations(vec![
            approved.clone(),
            inactive,
            pending,
        ]));
        let gate = gate_for(store);

        let publication = gate
            .prepare_publication(&candidate, draft_fixture(candidate.id))
            .await
            .unwrap();

        assert_eq!(publication.eligible_destinations.len(), 1);
        assert_eq!(publication.eligible_destinations[0].id, approved.id);
    }

    #[tokio::test]
    async fn empty_destination_list_is_not_an_error() {
        let candidate = candidate_fixture("Ana Pérez", "Concejo", "Antioquia");
        let store = Arc::new(MemoryStore::new());
        let gate = gate_for(store);

        let publication = gate
            .prepare_publication(&candidate, draft_fixture(candidate.id))
            .await
            .unwrap();
        assert!(publication.eligible_destinations.is_empty());
    }

    #[tokio::test]
    async fn unconfigured_hook_reports_not_configured() {
        let hook = HttpWorkflowHook::new(true, None, None);
        let candidate = candidate_fixture("Ana Pérez", "Concejo", "Antioquia");
        let publication = Publication {
            draft: draft_fixture(candidate.id),
            eligible_destinations: Vec::new(),
        };

        let err = hook.dispatch(&hook_payload(&publication)).await.unwrap_err();
        assert_eq!(err.reason(), "workflow_not_configured");

        let disabled = HttpWorkflowHook::new(
            false,
            Some("https://hook.example".to_string()),
            Some("s3cret".to_string()),
        );
        let err = disabled
            .dispatch(&hook_payload(&publication))
            .await
            .unwrap_err();
        assert_eq!(err.reason(), "workflow_not_configured");
    }

    #[tokio::test]
    async fn callback_secret_is_verified_before_recording() {
        let hook = HttpWorkflowHook::new(
            true,
            Some("https://hook.example".to_string()),
            Some("s3cret".to_string()),
        );
        let store = MemoryStore::new();
        let candidate = candidate_fixture("Ana Pérez", "Concejo", "Antioquia");
        let draft = draft_fixture(candidate.id);
        store.insert_draft(&draft).await.unwrap();

        let err = record_published(&hook, &store, "wrong", draft.id, "post-1")
            .await
            .unwrap_err();
        assert_eq!(err.reason(), "config_error");

        record_published(&hook, &store, "s3cret", draft.id, "post-1")
            .await
            .unwrap();
        let updated = store.draft(draft.id).await.unwrap().unwrap();
        assert_eq!(updated.published_post_id.as_deref(), Some("post-1"));
        assert_eq!(updated.status, DraftStatus::Published);
    }

    #[test]
    fn token_estimate_is_chars_over_four() {
        let candidate = candidate_fixture("Ana Pérez", "Concejo", "Antioquia");
        let mut draft = draft_fixture(candidate.id);
        draft.body = "a".repeat(400);
        let publication = Publication {
            draft,
            eligible_destinations: Vec::new(),
        };
        assert_eq!(hook_payload(&publication).token_estimate, 100);
    }
}
